//! Service descriptors, typed tags, and directory URL records.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GridError;

/// A typed service tag value.
///
/// Tags are scalars except for the macro form, which keeps the textual
/// shape `${type}${param}` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
    Macro { kind: String, param: String },
}

impl TagValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Str(s) => Some(s),
            _ => None,
        }
    }

    fn parse_macro(s: &str) -> Option<TagValue> {
        let rest = s.strip_prefix("${")?;
        let (kind, rest) = rest.split_once("}${")?;
        let param = rest.strip_suffix('}')?;
        if param.contains('{') || kind.contains('}') {
            return None;
        }
        Some(TagValue::Macro {
            kind: kind.to_string(),
            param: param.to_string(),
        })
    }
}

impl Serialize for TagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TagValue::Int(v) => serializer.serialize_i64(*v),
            TagValue::Real(v) => serializer.serialize_f64(*v),
            TagValue::Bool(v) => serializer.serialize_bool(*v),
            TagValue::Str(v) => serializer.serialize_str(v),
            TagValue::Macro { kind, param } => {
                serializer.serialize_str(&format!("${{{}}}${{{}}}", kind, param))
            }
        }
    }
}

struct TagValueVisitor;

impl Visitor<'_> for TagValueVisitor {
    type Value = TagValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a scalar tag value")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TagValue, E> {
        Ok(TagValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TagValue, E> {
        Ok(TagValue::Int(v as i64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<TagValue, E> {
        Ok(TagValue::Real(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<TagValue, E> {
        Ok(TagValue::Bool(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TagValue, E> {
        Ok(TagValue::parse_macro(v).unwrap_or_else(|| TagValue::Str(v.to_string())))
    }
}

impl<'de> Deserialize<'de> for TagValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TagValueVisitor)
    }
}

/// A service as registered with the conscience.
///
/// The score is an `i32` with two special values: `0` means just
/// registered (reset), `-1` means locked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(default)]
    pub ns_name: String,
    #[serde(rename = "type", default)]
    pub srv_type: String,
    pub addr: String,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub tags: BTreeMap<String, TagValue>,
}

impl ServiceDescriptor {
    pub fn new(ns_name: &str, srv_type: &str, addr: &str, score: i32) -> Self {
        Self {
            ns_name: ns_name.to_string(),
            srv_type: srv_type.to_string(),
            addr: addr.to_string(),
            score,
            timestamp: 0,
            tags: BTreeMap::new(),
        }
    }

    /// Unique key of the service inside a namespace: `addr@type`.
    pub fn service_key(&self) -> String {
        format!("{}@{}", self.addr, self.srv_type)
    }

    /// The host part of the network address (up to the port separator).
    pub fn host(&self) -> &str {
        self.addr.split(':').next().unwrap_or(&self.addr)
    }

    pub fn tag_str(&self, key: &str) -> Option<&str> {
        self.tags.get(key).and_then(TagValue::as_str)
    }
}

/// One directory entry: a sequence number, a `host:port`, and an opaque
/// argument string. Textual form `seq|host|args`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUrl {
    pub seq: i64,
    #[serde(rename = "url")]
    pub host: String,
    #[serde(default)]
    pub args: String,
}

impl ServiceUrl {
    pub fn new(seq: i64, host: &str, args: &str) -> Self {
        Self {
            seq,
            host: host.to_string(),
            args: args.to_string(),
        }
    }
}

impl FromStr for ServiceUrl {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut it = s.splitn(3, '|');
        let seq = it
            .next()
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| GridError::internal(format!("Invalid directory entry [{}]", s)))?;
        let host = it
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GridError::internal(format!("Invalid directory entry [{}]", s)))?;
        let args = it.next().unwrap_or("");
        Ok(ServiceUrl::new(seq, host, args))
    }
}

impl fmt::Display for ServiceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.seq, self.host, self.args)
    }
}
