//! Actions, transactions and the signed wire form.

mod action;
mod packed;
mod transaction;

pub use action::{Action, ActionData, PermissionLevel};
pub use packed::{Compression, MAX_UNPACKED_SIZE, PackedTransaction};
pub use transaction::{Extension, ID_LEN, Transaction, parse_id};

/// Serde adapter rendering byte vectors as lowercase hex.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }

    pub mod list {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(items.iter().map(hex::encode))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<u8>>, D::Error> {
            Vec::<String>::deserialize(deserializer)?
                .into_iter()
                .map(|text| hex::decode(text).map_err(serde::de::Error::custom))
                .collect()
        }
    }
}
