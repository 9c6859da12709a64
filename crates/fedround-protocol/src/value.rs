//! The closed recursive value type carried by envelopes.
//!
//! Content is expressed as a tagged union over exactly three shapes:
//! - [`GenericValue::Single`] — one scalar (integer, float, string, bytes)
//! - [`GenericValue::List`] — an ordered sequence of values
//! - [`GenericValue::Dict`] — a keyed mapping whose keys are uniformly
//!   string or uniformly integer; mixed-key dicts are unconstructible
//!
//! Opaque model blobs are moved, never interpreted: [`encode_blob`] wraps
//! raw bytes as base64 text in a `Single`, and [`decode_payload`] is the
//! one payload-aware seam that resolves a `"model"` dict entry back into
//! raw bytes on the receive path.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::constants::MODEL_KEY;
use crate::error::EncodingError;

/// One scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
    /// Raw bytes; carried on the wire as standard base64 text.
    #[serde(rename = "b64", with = "b64_bytes")]
    Bytes(Vec<u8>),
}

/// A recursively composable value: scalar, sequence, or keyed mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenericValue {
    Single(Scalar),
    List(Vec<GenericValue>),
    Dict(Dict),
}

/// A homogeneously keyed mapping. The two key flavours mirror the wire
/// format's string-key / integer-key dict cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dict {
    Str(BTreeMap<String, GenericValue>),
    Int(BTreeMap<i64, GenericValue>),
}

/// A single dict key, used when building a [`Dict`] from pairs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DictKey {
    Str(String),
    Int(i64),
}

impl From<&str> for DictKey {
    fn from(s: &str) -> Self {
        DictKey::Str(s.to_string())
    }
}

impl From<String> for DictKey {
    fn from(s: String) -> Self {
        DictKey::Str(s)
    }
}

impl From<i64> for DictKey {
    fn from(n: i64) -> Self {
        DictKey::Int(n)
    }
}

impl Dict {
    /// Build a dict from key/value pairs, enforcing key homogeneity.
    ///
    /// The first key fixes the flavour; any key of the other flavour
    /// fails with [`EncodingError::MixedKeyTypes`]. An empty pair set
    /// yields an empty string-keyed dict.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = (DictKey, GenericValue)>,
    {
        let mut iter = pairs.into_iter();
        let Some((first_key, first_value)) = iter.next() else {
            return Ok(Dict::Str(BTreeMap::new()));
        };

        match first_key {
            DictKey::Str(k) => {
                let mut map = BTreeMap::new();
                map.insert(k, first_value);
                for (key, value) in iter {
                    match key {
                        DictKey::Str(k) => {
                            map.insert(k, value);
                        }
                        DictKey::Int(_) => return Err(EncodingError::MixedKeyTypes),
                    }
                }
                Ok(Dict::Str(map))
            }
            DictKey::Int(k) => {
                let mut map = BTreeMap::new();
                map.insert(k, first_value);
                for (key, value) in iter {
                    match key {
                        DictKey::Int(k) => {
                            map.insert(k, value);
                        }
                        DictKey::Str(_) => return Err(EncodingError::MixedKeyTypes),
                    }
                }
                Ok(Dict::Int(map))
            }
        }
    }

    /// Look up a string key; `None` for integer-keyed dicts.
    pub fn get(&self, key: &str) -> Option<&GenericValue> {
        match self {
            Dict::Str(map) => map.get(key),
            Dict::Int(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dict::Str(map) => map.len(),
            Dict::Int(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GenericValue {
    pub fn int(n: i64) -> Self {
        GenericValue::Single(Scalar::Int(n))
    }

    pub fn float(f: f64) -> Self {
        GenericValue::Single(Scalar::Float(f))
    }

    pub fn str(s: impl Into<String>) -> Self {
        GenericValue::Single(Scalar::Str(s.into()))
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        GenericValue::Single(Scalar::Bytes(b.into()))
    }

    /// Shorthand for a string-keyed dict built from pairs.
    pub fn dict<I>(pairs: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = (DictKey, GenericValue)>,
    {
        Dict::from_pairs(pairs).map(GenericValue::Dict)
    }

    /// The dict behind this value, if it is one.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            GenericValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// The raw bytes behind this value, if it is a bytes scalar.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            GenericValue::Single(Scalar::Bytes(b)) => Some(b),
            _ => None,
        }
    }
}

/// Convert a loosely typed JSON value into the closed shape set.
///
/// Numbers become integer or float scalars, strings become string
/// scalars, arrays become lists and objects become string-keyed dicts.
/// Booleans and nulls are outside the shape set and fail with
/// [`EncodingError::UnsupportedValue`].
impl TryFrom<serde_json::Value> for GenericValue {
    type Error = EncodingError;

    fn try_from(value: serde_json::Value) -> Result<Self, EncodingError> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(GenericValue::int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(GenericValue::float(f))
                } else {
                    Err(EncodingError::UnsupportedValue(n.to_string()))
                }
            }
            serde_json::Value::String(s) => Ok(GenericValue::str(s)),
            serde_json::Value::Array(items) => {
                let list = items
                    .into_iter()
                    .map(GenericValue::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(GenericValue::List(list))
            }
            serde_json::Value::Object(map) => {
                let pairs = map
                    .into_iter()
                    .map(|(k, v)| Ok((DictKey::Str(k), GenericValue::try_from(v)?)))
                    .collect::<Result<Vec<_>, EncodingError>>()?;
                GenericValue::dict(pairs)
            }
            serde_json::Value::Bool(_) => {
                Err(EncodingError::UnsupportedValue("bool".to_string()))
            }
            serde_json::Value::Null => Err(EncodingError::UnsupportedValue("null".to_string())),
        }
    }
}

/// Encode opaque bytes as a self-describing base64 string scalar.
pub fn encode_blob(bytes: &[u8]) -> GenericValue {
    GenericValue::Single(Scalar::Str(BASE64.encode(bytes)))
}

/// Decode an opaque blob scalar back into raw bytes.
pub fn decode_blob(value: &GenericValue) -> Result<Vec<u8>, EncodingError> {
    match value {
        GenericValue::Single(Scalar::Str(text)) => BASE64
            .decode(text.as_bytes())
            .map_err(|e| EncodingError::BlobDecode(e.to_string())),
        GenericValue::Single(Scalar::Bytes(raw)) => Ok(raw.clone()),
        other => Err(EncodingError::BlobDecode(format!(
            "expected a blob scalar, got {other:?}"
        ))),
    }
}

/// Receive-side payload seam: if the content is a string-keyed dict with
/// a `"model"` entry, that entry is resolved through the blob decoder
/// into raw bytes. All other content passes through untouched.
pub fn decode_payload(content: GenericValue) -> Result<GenericValue, EncodingError> {
    match content {
        GenericValue::Dict(Dict::Str(mut map)) => {
            if let Some(model) = map.remove(MODEL_KEY) {
                map.insert(MODEL_KEY.to_string(), decode_model_value(model)?);
            }
            Ok(GenericValue::Dict(Dict::Str(map)))
        }
        other => Ok(other),
    }
}

/// Resolve a model entry: dicts are walked recursively, every leaf is
/// blob-decoded into a bytes scalar.
fn decode_model_value(value: GenericValue) -> Result<GenericValue, EncodingError> {
    match value {
        GenericValue::Dict(Dict::Str(map)) => {
            let map = map
                .into_iter()
                .map(|(k, v)| Ok((k, decode_model_value(v)?)))
                .collect::<Result<BTreeMap<_, _>, EncodingError>>()?;
            Ok(GenericValue::Dict(Dict::Str(map)))
        }
        GenericValue::Dict(Dict::Int(map)) => {
            let map = map
                .into_iter()
                .map(|(k, v)| Ok((k, decode_model_value(v)?)))
                .collect::<Result<BTreeMap<_, _>, EncodingError>>()?;
            Ok(GenericValue::Dict(Dict::Int(map)))
        }
        leaf => Ok(GenericValue::Single(Scalar::Bytes(decode_blob(&leaf)?))),
    }
}

mod b64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(D::Error::custom)
    }
}
