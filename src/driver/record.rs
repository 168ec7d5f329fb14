//! Record - 쿼리 결과 레코드
//!
//! 한 커서의 모든 레코드는 같은 키 목록을 공유합니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::{DriverError, DriverResult};
use super::types::{FromValue, Node, Value};
use crate::bolt::PackStreamValue;

// ============================================================================
// Record - 단일 레코드
// ============================================================================

/// 쿼리 결과 레코드
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    keys: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// 새 레코드 생성
    pub fn new(keys: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { keys, values }
    }

    /// RECORD 메시지 필드로 생성
    ///
    /// 필드 수가 키 수와 다르면 프로토콜 에러입니다.
    pub(crate) fn from_wire(keys: Arc<[String]>, fields: Vec<PackStreamValue>) -> DriverResult<Self> {
        if fields.len() != keys.len() {
            return Err(DriverError::protocol(format!(
                "Record has {} fields but result has {} keys",
                fields.len(),
                keys.len()
            )));
        }
        Ok(Self::new(keys, fields.into_iter().map(Value::from).collect()))
    }

    /// 키 목록
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// 값 목록
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 레코드 길이
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 빈 레코드 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 키의 위치
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// 키로 값 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index_of(key).and_then(|i| self.values.get(i))
    }

    /// 인덱스로 값 가져오기
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// 키로 타입 변환된 값 가져오기
    pub fn get_as<T: FromValue>(&self, key: &str) -> DriverResult<T> {
        let value = self
            .get(key)
            .ok_or_else(|| DriverError::type_conversion(format!("Key '{}' not found", key)))?;
        T::from_value(value).ok_or_else(|| {
            DriverError::type_conversion(format!(
                "Cannot convert {} to {} for key '{}'",
                value.kind(),
                T::KIND,
                key
            ))
        })
    }

    pub fn get_bool(&self, key: &str) -> DriverResult<bool> {
        self.get_as(key)
    }

    pub fn get_int(&self, key: &str) -> DriverResult<i64> {
        self.get_as(key)
    }

    pub fn get_float(&self, key: &str) -> DriverResult<f64> {
        self.get_as(key)
    }

    pub fn get_string(&self, key: &str) -> DriverResult<String> {
        self.get_as(key)
    }

    pub fn get_node(&self, key: &str) -> DriverResult<Node> {
        self.get_as(key)
    }

    /// Map으로 변환
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.keys
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .keys
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter().zip(self.values.iter())
    }
}

// ============================================================================
// Tests
// ============================================================================
