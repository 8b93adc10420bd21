//! Envelope codec
//!
//! The stored blob is always written as `{"version": N, "data": {...}}`.
//! Reading accepts three older shapes as well, so stores written by any
//! earlier release still load:
//!
//! | stored text                      | decoded as                          |
//! |----------------------------------|-------------------------------------|
//! | nothing                          | empty tree, version 0               |
//! | JSON without `version`           | whole value is the tree, version 0  |
//! | JSON with `version`, no `data`   | value minus `version`, version read |
//! | `{version, data}`                | as stored                           |
//!
//! Only text that is not JSON at all is a decode error. A `version` that is
//! not a whole non-negative number (`"3"` and `3.0` are read as 3) is logged
//! and read as 0, so the data is kept and every migration runs over it.
//!
//! Encoding never produces the legacy shapes, so the first save after a
//! legacy load upgrades the store for good.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError};

const VERSION_KEY: &str = "version";
const DATA_KEY: &str = "data";

/// Returns an empty data tree (`{}`)
#[inline]
#[must_use]
pub fn empty_tree() -> Value {
    Value::Object(Map::new())
}

/// Shape the stored text was recognised as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeFormat {
    /// Nothing stored yet (first run)
    Empty,
    /// Bare data tree written before envelopes existed
    Legacy,
    /// `version` at the top level next to the data fields
    Transitional,
    /// `{version, data}`
    Current,
}

impl EnvelopeFormat {
    /// Short lowercase name, for logs and CLI output
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Legacy => "legacy",
            Self::Transitional => "transitional",
            Self::Current => "current",
        }
    }
}

impl std::fmt::Display for EnvelopeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of decoding stored text
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Data tree (possibly still at an old schema version)
    pub data: Value,
    /// Schema version the tree was stored at
    pub version: u32,
    /// Shape the stored text was recognised as
    pub format: EnvelopeFormat,
}

impl Decoded {
    /// First-run result: empty tree at version 0
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data: empty_tree(),
            version: 0,
            format: EnvelopeFormat::Empty,
        }
    }
}

/// Encoder/decoder for the stored envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec {
    pretty: bool,
}

impl EnvelopeCodec {
    /// Create codec emitting compact JSON
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Emit indented JSON (backup files meant to be read by people)
    #[inline]
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Decode stored text
    ///
    /// `None` is the normal first-run path and never an error.
    ///
    /// # Errors
    /// Returns [`DecodeError::Malformed`] if the text is not JSON
    pub fn decode(&self, raw: Option<&str>) -> Result<Decoded, DecodeError> {
        let Some(raw) = raw else {
            return Ok(Decoded::empty());
        };

        let parsed: Value = serde_json::from_str(raw)?;

        let mut object = match parsed {
            Value::Object(object) if object.contains_key(VERSION_KEY) => object,
            other => {
                return Ok(Decoded {
                    data: other,
                    version: 0,
                    format: EnvelopeFormat::Legacy,
                });
            }
        };

        let version = object
            .shift_remove(VERSION_KEY)
            .map_or(0, |value| read_version(&value));

        match object.shift_remove(DATA_KEY) {
            Some(data) => Ok(Decoded {
                data,
                version,
                format: EnvelopeFormat::Current,
            }),
            None => Ok(Decoded {
                data: Value::Object(object),
                version,
                format: EnvelopeFormat::Transitional,
            }),
        }
    }

    /// Decode stored text, treating anything unreadable as a first run
    ///
    /// Corrupt storage is logged and replaced by the empty tree. The error is
    /// handed back alongside so callers can record the degradation.
    #[must_use]
    pub fn decode_or_empty(&self, raw: Option<&str>) -> (Decoded, Option<DecodeError>) {
        match self.decode(raw) {
            Ok(decoded) => (decoded, None),
            Err(e) => {
                tracing::warn!("stored envelope unreadable, starting from empty tree: {}", e);
                (Decoded::empty(), Some(e))
            }
        }
    }

    /// Encode a data tree at the given schema version
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn encode(&self, data: &Value, version: u32) -> Result<String, EncodeError> {
        #[derive(Serialize)]
        struct EnvelopeRef<'a> {
            version: u32,
            data: &'a Value,
        }

        let envelope = EnvelopeRef { version, data };
        let text = if self.pretty {
            serde_json::to_string_pretty(&envelope)?
        } else {
            serde_json::to_string(&envelope)?
        };
        Ok(text)
    }
}

fn read_version(value: &Value) -> u32 {
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                .map(|f| f as u64)
        }),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed.and_then(|v| u32::try_from(v).ok()) {
        Some(version) => version,
        None => {
            tracing::warn!("unusable envelope version {}, reading data as version 0", value);
            0
        }
    }
}
