//! Record value model and its canonical data-section encoding.

use std::collections::BTreeMap;

use crate::binary::{DataType, MAX_ENCODED_SIZE};
use crate::{Error, Result};

/// A record stored in the data section.
///
/// Map keys are kept sorted, so two maps holding the same pairs always
/// encode to the same bytes no matter the order they were built in.
///
/// # Examples
/// ```
/// use k2geo::Value;
///
/// let a = Value::map([("b", Value::from(2u32)), ("a", Value::from("x"))]);
/// let b = Value::map([("a", Value::from("x")), ("b", Value::from(2u32))]);
/// assert_eq!(a, b);
/// assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Map(BTreeMap<String, Value>),
    Array(Vec<Value>),
    String(String),
    Bytes(Vec<u8>),
    Bool(bool),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int32(i32),
}

impl Value {
    /// Build a map value from key/value pairs. Later duplicates win.
    pub fn map<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The data-section type tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Map(_) => DataType::Map,
            Value::Array(_) => DataType::Array,
            Value::String(_) => DataType::String,
            Value::Bytes(_) => DataType::Bytes,
            Value::Bool(_) => DataType::Bool,
            Value::Uint16(_) => DataType::Uint16,
            Value::Uint32(_) => DataType::Uint32,
            Value::Uint64(_) => DataType::Uint64,
            Value::Int32(_) => DataType::Int32,
        }
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Append the canonical encoding of this value to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Value::Map(m) => {
                write_control(buf, DataType::Map, m.len())?;
                for (key, value) in m {
                    write_control(buf, DataType::String, key.len())?;
                    buf.extend_from_slice(key.as_bytes());
                    value.encode(buf)?;
                }
            }
            Value::Array(items) => {
                write_control(buf, DataType::Array, items.len())?;
                for item in items {
                    item.encode(buf)?;
                }
            }
            Value::String(s) => {
                write_control(buf, DataType::String, s.len())?;
                buf.extend_from_slice(s.as_bytes());
            }
            Value::Bytes(b) => {
                write_control(buf, DataType::Bytes, b.len())?;
                buf.extend_from_slice(b);
            }
            // The payload of a boolean lives in the size field.
            Value::Bool(b) => write_control(buf, DataType::Bool, *b as usize)?,
            Value::Uint16(v) => write_uint(buf, DataType::Uint16, &v.to_be_bytes())?,
            Value::Uint32(v) => write_uint(buf, DataType::Uint32, &v.to_be_bytes())?,
            Value::Uint64(v) => write_uint(buf, DataType::Uint64, &v.to_be_bytes())?,
            Value::Int32(v) if *v < 0 => {
                write_control(buf, DataType::Int32, 4)?;
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Value::Int32(v) => write_uint(buf, DataType::Int32, &v.to_be_bytes())?,
        }
        Ok(())
    }
}

/// Write an integer with its leading zero bytes stripped.
fn write_uint(buf: &mut Vec<u8>, data_type: DataType, be_bytes: &[u8]) -> Result<()> {
    let start = be_bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(be_bytes.len());
    let payload = &be_bytes[start..];
    write_control(buf, data_type, payload.len())?;
    buf.extend_from_slice(payload);
    Ok(())
}

/// Write the control byte, the extended type byte and any size extension.
fn write_control(buf: &mut Vec<u8>, data_type: DataType, size: usize) -> Result<()> {
    if size > MAX_ENCODED_SIZE {
        return Err(Error::Serialization(format!(
            "{:?} payload of {} exceeds maximum size {}",
            data_type, size, MAX_ENCODED_SIZE
        )));
    }

    let type_id = data_type as u8;
    let mut control = if type_id <= 7 { type_id << 5 } else { 0 };

    let extension: Vec<u8> = if size < 29 {
        control |= size as u8;
        Vec::new()
    } else if size < 285 {
        control |= 29;
        vec![(size - 29) as u8]
    } else if size < 65_821 {
        control |= 30;
        ((size - 285) as u16).to_be_bytes().to_vec()
    } else {
        control |= 31;
        ((size - 65_821) as u32).to_be_bytes()[1..].to_vec()
    };

    buf.push(control);
    if type_id > 7 {
        buf.push(type_id - 7);
    }
    buf.extend_from_slice(&extension);
    Ok(())
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Uint16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}
