//! Query & ResultSummary
//!
//! 실행할 문장과 실행 결과 요약

use std::collections::HashMap;
use std::time::Duration;

use super::types::Value;
use crate::bolt::PackStreamValue;

// ============================================================================
// Query - 쿼리
// ============================================================================

/// 쿼리 (텍스트 + 파라미터)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// 쿼리 텍스트
    pub text: String,
    /// 파라미터
    pub parameters: HashMap<String, Value>,
}

impl Query {
    /// 새 쿼리 생성
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: HashMap::new(),
        }
    }

    /// 파라미터 추가
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// 파라미터들 추가
    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.parameters.extend(params);
        self
    }

    /// RUN 메시지용 파라미터
    pub(crate) fn wire_parameters(&self) -> HashMap<String, PackStreamValue> {
        self.parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().into()))
            .collect()
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// ResultSummary - 결과 요약
// ============================================================================

/// 결과 요약
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSummary {
    /// 실행한 쿼리
    pub query: Query,
    /// 쿼리 타입
    pub query_type: QueryType,
    /// 카운터
    pub counters: Counters,
    /// 첫 레코드까지 걸린 시간 (t_first)
    pub result_available_after: Option<Duration>,
    /// 결과 소비에 걸린 시간 (t_last)
    pub result_consumed_after: Option<Duration>,
    /// 데이터베이스 이름
    pub database: Option<String>,
    /// 알림
    pub notifications: Vec<Notification>,
    /// 커밋 북마크 (자동 커밋 실행만)
    pub bookmark: Option<String>,
}

impl ResultSummary {
    /// RUN/PULL SUCCESS 메타데이터로 생성
    pub fn from_metadata(
        query: Query,
        run_metadata: &HashMap<String, PackStreamValue>,
        pull_metadata: &HashMap<String, PackStreamValue>,
    ) -> Self {
        let millis = |meta: &HashMap<String, PackStreamValue>, key: &str| {
            meta.get(key)
                .and_then(|v| v.as_int())
                .filter(|ms| *ms >= 0)
                .map(|ms| Duration::from_millis(ms as u64))
        };

        Self {
            query,
            query_type: pull_metadata
                .get("type")
                .and_then(|v| v.as_str())
                .map(QueryType::parse)
                .unwrap_or_default(),
            counters: pull_metadata
                .get("stats")
                .and_then(|v| v.as_map())
                .map(Counters::from_stats)
                .unwrap_or_default(),
            result_available_after: millis(run_metadata, "t_first"),
            result_consumed_after: millis(pull_metadata, "t_last"),
            database: pull_metadata
                .get("db")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            notifications: pull_metadata
                .get("notifications")
                .and_then(|v| v.as_list())
                .map(|list| list.iter().filter_map(Notification::from_value).collect())
                .unwrap_or_default(),
            bookmark: pull_metadata
                .get("bookmark")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }
}

/// 쿼리 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    /// 읽기 전용
    #[default]
    ReadOnly,
    /// 읽기/쓰기
    ReadWrite,
    /// 쓰기 전용
    WriteOnly,
    /// 스키마 변경
    SchemaWrite,
}

impl QueryType {
    /// 서버 `type` 값 해석
    pub fn parse(s: &str) -> Self {
        match s {
            "rw" => QueryType::ReadWrite,
            "w" => QueryType::WriteOnly,
            "s" => QueryType::SchemaWrite,
            _ => QueryType::ReadOnly,
        }
    }
}

/// 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    /// 생성된 노드 수
    pub nodes_created: i64,
    /// 삭제된 노드 수
    pub nodes_deleted: i64,
    /// 생성된 관계 수
    pub relationships_created: i64,
    /// 삭제된 관계 수
    pub relationships_deleted: i64,
    /// 설정된 속성 수
    pub properties_set: i64,
    /// 추가된 레이블 수
    pub labels_added: i64,
    /// 제거된 레이블 수
    pub labels_removed: i64,
    /// 추가된 인덱스 수
    pub indexes_added: i64,
    /// 제거된 인덱스 수
    pub indexes_removed: i64,
    /// 추가된 제약 조건 수
    pub constraints_added: i64,
    /// 제거된 제약 조건 수
    pub constraints_removed: i64,
}

impl Counters {
    /// `stats` 메타데이터로 생성 (없는 키는 0)
    pub fn from_stats(stats: &HashMap<String, PackStreamValue>) -> Self {
        let count = |key: &str| stats.get(key).and_then(|v| v.as_int()).unwrap_or(0);
        Self {
            nodes_created: count("nodes-created"),
            nodes_deleted: count("nodes-deleted"),
            relationships_created: count("relationships-created"),
            relationships_deleted: count("relationships-deleted"),
            properties_set: count("properties-set"),
            labels_added: count("labels-added"),
            labels_removed: count("labels-removed"),
            indexes_added: count("indexes-added"),
            indexes_removed: count("indexes-removed"),
            constraints_added: count("constraints-added"),
            constraints_removed: count("constraints-removed"),
        }
    }

    /// 변경 사항 존재 여부
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
            || self.labels_added > 0
            || self.labels_removed > 0
            || self.contains_system_updates()
    }

    /// 스키마 변경 존재 여부
    pub fn contains_system_updates(&self) -> bool {
        self.indexes_added > 0
            || self.indexes_removed > 0
            || self.constraints_added > 0
            || self.constraints_removed > 0
    }
}

/// 알림
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub code: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub position: Option<InputPosition>,
}

impl Notification {
    fn from_value(value: &PackStreamValue) -> Option<Self> {
        let map = value.as_map()?;
        let text = |key: &str| {
            map.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let position = map.get("position").and_then(|v| v.as_map()).map(|pos| {
            let at = |key: &str| pos.get(key).and_then(|v| v.as_int()).unwrap_or(0);
            InputPosition {
                offset: at("offset"),
                line: at("line"),
                column: at("column"),
            }
        });

        Some(Self {
            code: text("code"),
            title: text("title"),
            description: text("description"),
            severity: text("severity"),
            position,
        })
    }
}

/// 입력 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPosition {
    pub offset: i64,
    pub line: i64,
    pub column: i64,
}

// ============================================================================
// Tests
// ============================================================================
