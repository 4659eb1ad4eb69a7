//! RFC 2397 `data:` URL decoding for inline file contents.

use base64::Engine;
use percent_encoding::percent_decode;
use thiserror::Error;

const DEFAULT_MEDIA_TYPE: &str = "text/plain;charset=US-ASCII";

#[derive(Error, Debug)]
pub enum DataUrlError {
    #[error("source does not start with 'data:'")]
    MissingScheme,

    #[error("missing ',' between data URL header and payload")]
    MissingComma,

    #[error("invalid percent escape at byte {offset}")]
    InvalidEscape { offset: usize },

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Media type including parameters, e.g. `text/plain;charset=utf-8`.
    pub media_type: String,
    /// Whether the payload was base64 encoded.
    pub is_base64: bool,
    /// The raw payload bytes.
    pub data: Vec<u8>,
}

impl DataUrl {
    /// Parses and decodes a data URL of the form
    /// `data:[<mediatype>][;base64],<data>`.
    pub fn parse(source: &str) -> Result<Self, DataUrlError> {
        let rest = strip_scheme(source).ok_or(DataUrlError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingComma)?;

        // The base64 marker is the last header parameter, in any letter case.
        let (media_type, is_base64) = match header.rsplit_once(';') {
            Some((media, marker)) if marker.eq_ignore_ascii_case("base64") => (media, true),
            None if header.eq_ignore_ascii_case("base64") => ("", true),
            _ => (header, false),
        };

        let media_type = if media_type.is_empty() || media_type.starts_with(';') {
            // Parameters without a type still inherit text/plain.
            let params = media_type.trim_start_matches(';');
            if params.is_empty() {
                DEFAULT_MEDIA_TYPE.to_string()
            } else {
                format!("text/plain;{}", params)
            }
        } else {
            media_type.to_string()
        };

        let unescaped = unescape(payload)?;
        let data = if is_base64 {
            base64::engine::general_purpose::STANDARD.decode(&unescaped)?
        } else {
            unescaped
        };

        Ok(Self {
            media_type,
            is_base64,
            data,
        })
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Decodes a data URL straight to its payload bytes.
pub fn decode(source: &str) -> Result<Vec<u8>, DataUrlError> {
    DataUrl::parse(source).map(DataUrl::into_bytes)
}

fn strip_scheme(source: &str) -> Option<&str> {
    let prefix = source.get(..5)?;
    if prefix.eq_ignore_ascii_case("data:") {
        Some(&source[5..])
    } else {
        None
    }
}

fn unescape(payload: &str) -> Result<Vec<u8>, DataUrlError> {
    let bytes = payload.as_bytes();

    // percent_decode passes malformed escapes through untouched, so reject them up front.
    for (offset, byte) in bytes.iter().enumerate() {
        if *byte == b'%' {
            let valid = bytes
                .get(offset + 1..offset + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(DataUrlError::InvalidEscape { offset });
            }
        }
    }

    Ok(percent_decode(bytes).collect())
}
