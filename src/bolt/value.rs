//! Wire value model.
//!
//! What a connection carries inside messages: statement parameters, RECORD
//! fields and SUCCESS metadata. Graph nodes arrive already decoded into
//! [`PackStreamNode`]; turning bytes into these values is the transport's job.

use std::collections::HashMap;

/// A value as carried by a Bolt message.
#[derive(Debug, Clone, PartialEq)]
pub enum PackStreamValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    String(String),
    /// List of values
    List(Vec<PackStreamValue>),
    /// Map of string keys to values
    Map(HashMap<String, PackStreamValue>),
    /// Graph node
    Node(PackStreamNode),
}

/// A node carried in a RECORD field.
#[derive(Debug, Clone, PartialEq)]
pub struct PackStreamNode {
    /// Node id
    pub id: i64,
    /// Node labels
    pub labels: Vec<String>,
    /// Node properties
    pub properties: HashMap<String, PackStreamValue>,
}

impl PackStreamValue {
    /// Integer payload, if any.
    pub fn as_int(&self) -> Option<i64> {
        if let Self::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// String payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// List payload, if any.
    pub fn as_list(&self) -> Option<&[PackStreamValue]> {
        if let Self::List(items) = self {
            Some(items)
        } else {
            None
        }
    }

    /// Map payload, if any.
    pub fn as_map(&self) -> Option<&HashMap<String, PackStreamValue>> {
        if let Self::Map(entries) = self {
            Some(entries)
        } else {
            None
        }
    }

    /// The string items of a list. Non-string items are skipped, which is how
    /// `fields` and `bookmarks` metadata are read.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        let items = self.as_list()?;
        Some(
            items
                .iter()
                .filter_map(Self::as_str)
                .map(String::from)
                .collect(),
        )
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
            Self::Node(_) => "Node",
        }
    }
}

impl From<bool> for PackStreamValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for PackStreamValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for PackStreamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PackStreamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for PackStreamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<PackStreamValue>> for PackStreamValue {
    fn from(v: Vec<PackStreamValue>) -> Self {
        Self::List(v)
    }
}

impl From<HashMap<String, PackStreamValue>> for PackStreamValue {
    fn from(v: HashMap<String, PackStreamValue>) -> Self {
        Self::Map(v)
    }
}

impl From<PackStreamNode> for PackStreamValue {
    fn from(v: PackStreamNode) -> Self {
        Self::Node(v)
    }
}
