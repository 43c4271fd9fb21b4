#[cfg(test)]
#[path = "tests/pair.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::hex::{self, HexError};

/// Prefix the kernel module uses when a pair file cannot be rendered.
const KERNEL_ERROR_PREFIX: &str = "ERROR:";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Request,
    Response,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Request => "request",
            Self::Response => "response",
        })
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum PairError {
    #[error("missing '=' between request and response")]
    MissingSeparator,

    #[error("empty {0}")]
    Empty(Side),

    #[error("invalid {side}: {source}")]
    Hex {
        side: Side,
        #[source]
        source: HexError,
    },

    #[error("kernel module reported: {0}")]
    Kernel(String),
}

/// A request and the response the emulated device answers it with.
///
/// Both sides are non-empty byte strings. The text form is
/// `<request-hex>=<response-hex>`, always lowercase.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Pair {
    request: Vec<u8>,
    response: Vec<u8>,
}

impl Pair {
    pub fn new(request: Vec<u8>, response: Vec<u8>) -> Result<Self, PairError> {
        if request.is_empty() {
            return Err(PairError::Empty(Side::Request));
        }

        if response.is_empty() {
            return Err(PairError::Empty(Side::Response));
        }

        Ok(Self { request, response })
    }

    #[must_use]
    pub fn request(&self) -> &[u8] {
        &self.request
    }

    #[must_use]
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    #[must_use]
    pub fn request_hex(&self) -> String {
        hex::encode(&self.request)
    }

    #[must_use]
    pub fn response_hex(&self) -> String {
        hex::encode(&self.response)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.request_hex(), self.response_hex())
    }
}

impl FromStr for Pair {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // sysfs attribute reads may end with a newline
        let s = s.strip_suffix('\n').unwrap_or(s);

        if let Some(message) = s.strip_prefix(KERNEL_ERROR_PREFIX) {
            return Err(PairError::Kernel(message.trim().to_owned()));
        }

        let (request, response) = s.split_once('=').ok_or(PairError::MissingSeparator)?;

        let decode = |side, text: &str| {
            if text.is_empty() {
                return Err(PairError::Empty(side));
            }
            hex::decode(text).map_err(|source| PairError::Hex { side, source })
        };

        Self::new(
            decode(Side::Request, request)?,
            decode(Side::Response, response)?,
        )
    }
}

impl Serialize for Pair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
