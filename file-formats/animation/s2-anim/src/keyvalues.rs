//! Structured data access for already-deserialized resource blocks
//!
//! The decoder never parses resource files itself. It reads named
//! properties, arrays and byte blobs through [`KeyValues`], so the same code
//! path serves data that came from a binary block, a KV3 document or a JSON
//! export.
//!
//! An implementation for [`serde_json::Value`] is provided.

use std::borrow::Cow;

use serde_json::Value;

use crate::error::{AnimError, Result};

/// Read access to a tree of named properties
///
/// Implementors provide the primitive accessors; the `get_*` helpers build
/// on them and turn absent or mistyped values into [`AnimError`]s.
pub trait KeyValues: Sized {
    /// Look up a named child property
    fn child(&self, key: &str) -> Option<&Self>;

    /// Elements of an array value
    fn items(&self) -> Option<&[Self]>;

    /// String value
    fn to_str(&self) -> Option<&str>;

    /// Floating point value (integers convert)
    fn to_f64(&self) -> Option<f64>;

    /// Integer value
    fn to_i64(&self) -> Option<i64>;

    /// Boolean value
    fn to_bool(&self) -> Option<bool>;

    /// Raw byte blob
    ///
    /// The default reads an array of integers in `0..=255`.
    fn to_bytes(&self) -> Option<Cow<'_, [u8]>> {
        let items = self.items()?;
        let mut bytes = Vec::with_capacity(items.len());
        for item in items {
            bytes.push(u8::try_from(item.to_i64()?).ok()?);
        }
        Some(Cow::Owned(bytes))
    }

    /// Components of a vector-like value
    ///
    /// Accepts a plain numeric array or an object keyed `"0"`, `"1"`, ...
    fn to_f32_vec(&self) -> Option<Vec<f32>> {
        if let Some(items) = self.items() {
            return items
                .iter()
                .map(|v| v.to_f64().map(|f| f as f32))
                .collect();
        }

        let mut out = Vec::with_capacity(4);
        while let Some(v) = self.child(&out.len().to_string()) {
            out.push(v.to_f64()? as f32);
        }
        (!out.is_empty()).then_some(out)
    }

    /// Check whether a key is present
    fn contains_key(&self, key: &str) -> bool {
        self.child(key).is_some()
    }

    /// Required child property
    fn property(&self, key: &str) -> Result<&Self> {
        self.child(key)
            .ok_or_else(|| AnimError::MissingKey(key.to_string()))
    }

    /// Required string property
    fn get_str(&self, key: &str) -> Result<&str> {
        self.property(key)?
            .to_str()
            .ok_or_else(|| invalid(key, "string"))
    }

    /// Required float property
    fn get_f32(&self, key: &str) -> Result<f32> {
        self.property(key)?
            .to_f64()
            .map(|v| v as f32)
            .ok_or_else(|| invalid(key, "number"))
    }

    /// Required integer property
    fn get_i64(&self, key: &str) -> Result<i64> {
        self.property(key)?
            .to_i64()
            .ok_or_else(|| invalid(key, "integer"))
    }

    /// Optional boolean property
    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.child(key).and_then(Self::to_bool).unwrap_or(default)
    }

    /// Required array property
    fn get_array(&self, key: &str) -> Result<&[Self]> {
        self.property(key)?
            .items()
            .ok_or_else(|| invalid(key, "array"))
    }

    /// Required integer array property
    fn get_i64_array(&self, key: &str) -> Result<Vec<i64>> {
        self.get_array(key)?
            .iter()
            .map(|v| v.to_i64().ok_or_else(|| invalid(key, "integer array")))
            .collect()
    }

    /// Required string array property
    fn get_str_array(&self, key: &str) -> Result<Vec<&str>> {
        self.get_array(key)?
            .iter()
            .map(|v| v.to_str().ok_or_else(|| invalid(key, "string array")))
            .collect()
    }

    /// Required byte blob property
    fn get_bytes(&self, key: &str) -> Result<Cow<'_, [u8]>> {
        self.property(key)?
            .to_bytes()
            .ok_or_else(|| invalid(key, "byte array"))
    }

    /// Required array of fixed-size float vectors
    fn get_vector_array(&self, key: &str, components: usize) -> Result<Vec<Vec<f32>>> {
        self.get_array(key)?
            .iter()
            .map(|v| match v.to_f32_vec() {
                Some(c) if c.len() >= components => Ok(c),
                _ => Err(invalid(key, "vector array")),
            })
            .collect()
    }
}

fn invalid(key: &str, expected: &str) -> AnimError {
    AnimError::InvalidData(format!("'{key}' is not a {expected}"))
}

impl KeyValues for Value {
    fn child(&self, key: &str) -> Option<&Self> {
        self.as_object()?.get(key)
    }

    fn items(&self) -> Option<&[Self]> {
        self.as_array().map(Vec::as_slice)
    }

    fn to_str(&self) -> Option<&str> {
        self.as_str()
    }

    fn to_f64(&self) -> Option<f64> {
        self.as_f64()
    }

    fn to_i64(&self) -> Option<i64> {
        self.as_i64()
            .or_else(|| self.as_u64().and_then(|v| i64::try_from(v).ok()))
    }

    fn to_bool(&self) -> Option<bool> {
        self.as_bool()
    }

    fn to_bytes(&self) -> Option<Cow<'_, [u8]>> {
        // Exporters write blobs either as integer arrays or as hex strings
        if let Some(text) = self.as_str() {
            let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            return hex::decode(digits).ok().map(Cow::Owned);
        }

        let items = self.as_array()?;
        let mut bytes = Vec::with_capacity(items.len());
        for item in items {
            bytes.push(u8::try_from(item.as_u64()?).ok()?);
        }
        Some(Cow::Owned(bytes))
    }
}
