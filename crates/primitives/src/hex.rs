//! Request/response text codec.
//!
//! Bytes travel as lowercase, even-length hexadecimal. Operators may also
//! write a quoted literal (`"hi"`), which stands for the UTF-8 bytes of the
//! enclosed text.

#[cfg(test)]
#[path = "tests/hex.rs"]
mod tests;

use std::borrow::Cow;

use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum HexError {
    #[error("odd number of characters ({len})")]
    OddLength { len: usize },

    #[error("invalid character {character:?} at position {index}")]
    InvalidCharacter { character: char, index: usize },
}

/// Lowercase hex, two characters per byte.
#[must_use]
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

pub fn decode(s: &str) -> Result<Vec<u8>, HexError> {
    if let Some((index, character)) = s.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(HexError::InvalidCharacter { character, index });
    }

    hex::decode(s).map_err(|err| match err {
        hex::FromHexError::InvalidHexCharacter { c, index } => HexError::InvalidCharacter {
            character: c,
            index,
        },
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            HexError::OddLength { len: s.len() }
        }
    })
}

#[must_use]
pub fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[must_use]
pub fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

/// Returns the text between the quotes of a quoted literal.
#[must_use]
pub fn unquote(s: &str) -> Option<&str> {
    is_quoted(s).then(|| &s[1..s.len() - 1])
}

/// Rewrites a quoted literal as the hex encoding of its UTF-8 bytes; any
/// other value is returned unchanged.
#[must_use]
pub fn quote_decode(s: &str) -> Cow<'_, str> {
    match unquote(s) {
        Some(text) => Cow::Owned(encode(text)),
        None => Cow::Borrowed(s),
    }
}

/// Decodes a value as written in a configuration source: either a quoted
/// literal or hex.
pub fn decode_value(s: &str) -> Result<Vec<u8>, HexError> {
    match unquote(s) {
        Some(text) => Ok(text.as_bytes().to_vec()),
        None => decode(s),
    }
}
