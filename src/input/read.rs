//! Input reading implementation.

use crate::cli::InputSpec;
use crate::error::{Error, Result};
use crate::input::InputSource;
use std::fs;
use std::io::{self, Read};

fn read_raw(spec: &InputSpec) -> Result<Vec<u8>> {
    match InputSource::from_spec(spec)? {
        InputSource::File(path) => fs::read(&path).map_err(|e| Error::IoError {
            path: Some(path),
            source: e,
        }),

        InputSource::Literal(text) => Ok(text.into_bytes()),

        InputSource::Stdin => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .map_err(|e| Error::IoError {
                    path: None,
                    source: e,
                })?;
            Ok(buffer)
        }
    }
}

/// Read input as UTF-8 text, trimmed.
pub fn read_text(spec: &InputSpec) -> Result<String> {
    let bytes = read_raw(spec)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::invalid_value("utf-8 text", e.to_string()))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::NoInput);
    }
    Ok(trimmed.to_string())
}

/// Read binary input, decoding it first when it is hex text.
pub fn read_bytes(spec: &InputSpec) -> Result<Vec<u8>> {
    decode_if_hex(read_raw(spec)?)
}

fn decode_if_hex(buffer: Vec<u8>) -> Result<Vec<u8>> {
    let Ok(text) = std::str::from_utf8(&buffer) else {
        return Ok(buffer);
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::NoInput);
    }

    let hex_candidate = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex_candidate.len() % 2 == 0 && hex_candidate.bytes().all(|b| b.is_ascii_hexdigit()) {
        hex::decode(hex_candidate).map_err(Error::from)
    } else {
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_hex_text_is_decoded() {
        assert_eq!(decode_if_hex(b"0e656f73".to_vec()).unwrap(), vec![0x0e, 0x65, 0x6f, 0x73]);
        assert_eq!(decode_if_hex(b"0x0e65\n".to_vec()).unwrap(), vec![0x0e, 0x65]);
    }

    #[test]
    fn test_binary_passes_through() {
        let input = vec![0x0e, 0xff, 0x00];
        assert_eq!(decode_if_hex(input.clone()).unwrap(), input);
        // odd length is not hex
        assert_eq!(decode_if_hex(b"abc".to_vec()).unwrap(), b"abc".to_vec());
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(decode_if_hex(b"  \n".to_vec()), Err(Error::NoInput)));
        assert!(matches!(
            read_text(&InputSpec::Literal("   ".into())),
            Err(Error::NoInput)
        ));
    }

    #[test]
    fn test_read_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  {{\"version\":\"eosio::abi/1.1\"}}").unwrap();
        let spec = InputSpec::File(file.path().to_path_buf());
        assert_eq!(read_text(&spec).unwrap(), r#"{"version":"eosio::abi/1.1"}"#);
    }
}
