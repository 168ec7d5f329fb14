//! Driver Types
//!
//! 레코드와 파라미터에 쓰는 값. 와이어 값([`PackStreamValue`])과 서로
//! 변환되며, serde로 직렬화할 수 있습니다.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bolt::{PackStreamNode, PackStreamValue};

// ============================================================================
// Value - 그래프 값
// ============================================================================

/// 그래프 값
///
/// `Node`는 `Map`보다 앞에 있어야 역직렬화 시 노드 모양의 객체가 노드로
/// 읽힙니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer (i64)
    Integer(i64),
    /// Float (f64)
    Float(f64),
    /// String
    String(String),
    /// List
    List(Vec<Value>),
    /// Node
    Node(Node),
    /// Map
    Map(HashMap<String, Value>),
}

impl Value {
    /// Null 여부
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean 값
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// Integer 값
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// Float 값 (정수는 넓혀서 반환)
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(f) => Some(f),
            Value::Integer(i) => Some(i as f64),
            _ => None,
        }
    }

    /// String 값
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// List 값
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map 값
    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Node 값
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// 에러 메시지용 타입 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Node(_) => "Node",
            Value::Map(_) => "Map",
        }
    }
}

/// 맵 항목을 키 순서대로 `{k: v, ...}` 형태로 출력
fn write_entries(f: &mut fmt::Formatter<'_>, entries: &HashMap<String, Value>) -> fmt::Result {
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();
    f.write_str("{")?;
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", key, entries[key])?;
    }
    f.write_str("}")
}

/// Cypher 리터럴 형태로 출력
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Node(node) => write!(f, "{}", node),
            Value::Map(entries) => write_entries(f, entries),
        }
    }
}

macro_rules! value_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(v: $source) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from!(
    bool => Boolean,
    i64 => Integer,
    i32 => Integer,
    f64 => Float,
    String => String,
    &str => String,
    Node => Node,
);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// Node - 그래프 노드
// ============================================================================

/// 그래프 노드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// 노드 ID
    pub id: i64,
    /// 레이블
    pub labels: Vec<String>,
    /// 속성
    pub properties: HashMap<String, Value>,
}

impl Node {
    /// 레이블 포함 여부
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for label in &self.labels {
            write!(f, ":{}", label)?;
        }
        if !self.properties.is_empty() {
            if !self.labels.is_empty() {
                f.write_str(" ")?;
            }
            write_entries(f, &self.properties)?;
        }
        f.write_str(")")
    }
}

// ============================================================================
// FromValue - 레코드 값 추출
// ============================================================================

/// 레코드 값에서 꺼낼 수 있는 타입
pub trait FromValue: Sized {
    /// 에러 메시지에 쓰는 타입 이름
    const KIND: &'static str;

    /// 변환 (다른 타입이면 `None`)
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const KIND: &'static str = "Boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const KIND: &'static str = "Integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for f64 {
    const KIND: &'static str = "Float";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for String {
    const KIND: &'static str = "String";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromValue for Node {
    const KIND: &'static str = "Node";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_node().cloned()
    }
}

impl FromValue for Vec<Value> {
    const KIND: &'static str = "List";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_list().map(<[Value]>::to_vec)
    }
}

// ============================================================================
// 와이어 값 변환
// ============================================================================

fn convert_entries<A, B: From<A>>(entries: HashMap<String, A>) -> HashMap<String, B> {
    entries.into_iter().map(|(k, v)| (k, B::from(v))).collect()
}

impl From<PackStreamValue> for Value {
    fn from(wire: PackStreamValue) -> Self {
        match wire {
            PackStreamValue::Null => Value::Null,
            PackStreamValue::Boolean(b) => Value::Boolean(b),
            PackStreamValue::Integer(i) => Value::Integer(i),
            PackStreamValue::Float(f) => Value::Float(f),
            PackStreamValue::String(s) => Value::String(s),
            PackStreamValue::List(items) => Value::List(items.into_iter().map(Value::from).collect()),
            PackStreamValue::Map(entries) => Value::Map(convert_entries(entries)),
            PackStreamValue::Node(node) => Value::Node(Node {
                id: node.id,
                labels: node.labels,
                properties: convert_entries(node.properties),
            }),
        }
    }
}

impl From<Value> for PackStreamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PackStreamValue::Null,
            Value::Boolean(b) => PackStreamValue::Boolean(b),
            Value::Integer(i) => PackStreamValue::Integer(i),
            Value::Float(f) => PackStreamValue::Float(f),
            Value::String(s) => PackStreamValue::String(s),
            Value::List(items) => {
                PackStreamValue::List(items.into_iter().map(PackStreamValue::from).collect())
            }
            Value::Node(node) => PackStreamValue::Node(PackStreamNode {
                id: node.id,
                labels: node.labels,
                properties: convert_entries(node.properties),
            }),
            Value::Map(entries) => PackStreamValue::Map(convert_entries(entries)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
