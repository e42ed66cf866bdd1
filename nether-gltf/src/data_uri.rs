//! Embedded `data:` URIs

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// A parsed `data:<mime>[;base64],<payload>` URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime_type: &'a str,
    pub base64: bool,
    pub data: &'a str,
}

impl<'a> DataUri<'a> {
    /// Returns `None` when `uri` is not a data URI
    pub fn parse(uri: &'a str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let (mime_type, base64) = match header.strip_suffix(";base64") {
            Some(mime_type) => (mime_type, true),
            None => (header, false),
        };
        Some(DataUri {
            mime_type,
            base64,
            data,
        })
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        if self.base64 {
            STANDARD.decode(self.data)
        } else {
            Ok(self.data.as_bytes().to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base64() {
        let uri = DataUri::parse("data:application/octet-stream;base64,AQID").unwrap();
        assert_eq!(uri.mime_type, "application/octet-stream");
        assert!(uri.base64);
        assert_eq!(uri.decode().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_plain() {
        let uri = DataUri::parse("data:text/plain,abc").unwrap();
        assert!(!uri.base64);
        assert_eq!(uri.decode().unwrap(), b"abc".to_vec());
    }

    #[test]
    fn test_not_a_data_uri() {
        assert!(DataUri::parse("buffers/mesh.bin").is_none());
        assert!(DataUri::parse("").is_none());
        assert!(DataUri::parse("data:no-comma").is_none());
    }

    #[test]
    fn test_invalid_base64() {
        let uri = DataUri::parse("data:application/octet-stream;base64,@@@@").unwrap();
        assert!(uri.decode().is_err());
    }
}
