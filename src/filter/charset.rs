//! Character sets for text-oriented filter stages

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io;
use std::str::FromStr;

/// Charset used to decode source bytes and encode filtered text
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FilteringCharset {
    /// UTF-8
    #[default]
    #[value(name = "utf-8")]
    #[serde(rename = "UTF-8", alias = "utf-8")]
    Utf8,
    /// ISO-8859-1, one byte per character
    #[value(name = "iso-8859-1")]
    #[serde(rename = "ISO-8859-1", alias = "iso-8859-1")]
    Latin1,
}

impl FilteringCharset {
    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
        }
    }

    /// Decode one line of bytes
    pub fn decode(&self, bytes: &[u8]) -> io::Result<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("input is not valid {}: {}", self.name(), e),
                )
            }),
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Encode text, appending to `out`
    pub fn encode(&self, text: &str, out: &mut Vec<u8>) -> io::Result<()> {
        match self {
            Self::Utf8 => {
                out.extend_from_slice(text.as_bytes());
                Ok(())
            }
            Self::Latin1 => {
                for c in text.chars() {
                    let code = u32::from(c);
                    if code > 0xFF {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("character '{}' cannot be encoded as {}", c, self.name()),
                        ));
                    }
                    out.push(code as u8);
                }
                Ok(())
            }
        }
    }
}

impl FromStr for FilteringCharset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Ok(Self::Utf8),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Ok(Self::Latin1),
            other => Err(format!("Unsupported filtering charset: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_rejects_invalid_bytes() {
        let err = FilteringCharset::Utf8.decode(&[0x61, 0xFF]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_latin1_round_trip() {
        let bytes = [0x63, 0x61, 0x66, 0xE9];
        let text = FilteringCharset::Latin1.decode(&bytes).unwrap();
        assert_eq!(text, "café");
        let mut out = Vec::new();
        FilteringCharset::Latin1.encode(&text, &mut out).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_latin1_unmappable() {
        let mut out = Vec::new();
        assert!(FilteringCharset::Latin1.encode("€", &mut out).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("utf-8".parse::<FilteringCharset>().unwrap(), FilteringCharset::Utf8);
        assert_eq!("Latin1".parse::<FilteringCharset>().unwrap(), FilteringCharset::Latin1);
        assert!("koi8-r".parse::<FilteringCharset>().is_err());
    }
}
