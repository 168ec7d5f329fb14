//! Driver Error Types
//!
//! 드라이버 에러 정의

use thiserror::Error;

use crate::bolt::{BoltError, BoltErrorCode, FailureMessage};

// ============================================================================
// ErrorKind - 에러 분류
// ============================================================================

/// 에러 분류
///
/// 재시도 판단은 이 분류와 서버 에러 코드만 봅니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 서버에 연결할 수 없음 (전송 계층 실패)
    ServiceUnavailable,
    /// 세션 만료 (리더 변경, 읽기 전용 데이터베이스)
    SessionExpired,
    /// 일시적 서버 에러
    Transient,
    /// 클라이언트 에러 (잘못된 쿼리, 잘못된 사용)
    Client,
    /// 데이터베이스 에러
    Database,
}

// ============================================================================
// DriverError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// 서비스 불가
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 세션 만료
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// 일시적 서버 에러
    #[error("Transient error: {code} - {message}")]
    Transient { code: String, message: String },

    /// 서버가 보고한 클라이언트 에러
    #[error("Client error: {code} - {message}")]
    Client { code: String, message: String },

    /// 데이터베이스 에러
    #[error("Database error: {code} - {message}")]
    Database { code: String, message: String },

    /// 프로토콜 에러
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 세션 사용 에러
    #[error("Session error: {0}")]
    Session(String),

    /// 트랜잭션 사용 에러
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// 타입 변환 에러
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 재시도 끝에 보고된 에러 (이전 실패들을 함께 보관)
    #[error("{error}")]
    Retried {
        /// 마지막 실패
        error: Box<DriverError>,
        /// 이전 실패들 (시간순)
        suppressed: Vec<DriverError>,
    },
}

impl DriverError {
    /// 서비스 불가 에러 생성
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// 세션 만료 에러 생성
    pub fn session_expired(msg: impl Into<String>) -> Self {
        Self::SessionExpired(msg.into())
    }

    /// 일시적 에러 생성
    pub fn transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 클라이언트 에러 생성
    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Client {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 데이터베이스 에러 생성
    pub fn database(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 프로토콜 에러 생성
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// 세션 에러 생성
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// 트랜잭션 에러 생성
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// 타입 변환 에러 생성
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 서버 에러 코드로 생성
    ///
    /// 클러스터 리더 변경과 읽기 전용 쓰기 거부는 세션 만료로 분류됩니다.
    pub fn from_failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let message = message.into();
        if code == BoltErrorCode::NOT_A_LEADER
            || code == BoltErrorCode::FORBIDDEN_ON_READ_ONLY_DATABASE
        {
            Self::SessionExpired(message)
        } else if code.starts_with(BoltErrorCode::CLIENT_ERROR_PREFIX) {
            Self::Client { code, message }
        } else if code.starts_with(BoltErrorCode::TRANSIENT_ERROR_PREFIX) {
            Self::Transient { code, message }
        } else {
            Self::Database { code, message }
        }
    }

    /// 에러 분류
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            Self::SessionExpired(_) => ErrorKind::SessionExpired,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Database { .. } => ErrorKind::Database,
            Self::Retried { error, .. } => error.kind(),
            Self::Client { .. }
            | Self::Protocol(_)
            | Self::Session(_)
            | Self::Transaction(_)
            | Self::TypeConversion(_)
            | Self::Configuration(_) => ErrorKind::Client,
        }
    }

    /// 서버 에러 코드
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Transient { code, .. } | Self::Client { code, .. } | Self::Database { code, .. } => {
                Some(code)
            }
            Self::Retried { error, .. } => error.code(),
            _ => None,
        }
    }

    /// 재시도 이력을 벗긴 마지막 에러
    pub fn primary(&self) -> &DriverError {
        match self {
            Self::Retried { error, .. } => error.primary(),
            other => other,
        }
    }

    /// 함께 보관된 이전 실패들 (시간순)
    pub fn suppressed(&self) -> &[DriverError] {
        match self {
            Self::Retried { suppressed, .. } => suppressed,
            _ => &[],
        }
    }

    /// 이전 실패들을 앞쪽에 덧붙임
    pub fn with_suppressed(self, earlier: Vec<DriverError>) -> Self {
        if earlier.is_empty() {
            return self;
        }
        match self {
            Self::Retried { error, suppressed } => {
                let mut all = earlier;
                all.extend(suppressed);
                Self::Retried { error, suppressed: all }
            }
            error => Self::Retried {
                error: Box::new(error),
                suppressed: earlier,
            },
        }
    }

    /// 재시도 가능 여부
    pub fn is_retryable(&self) -> bool {
        super::retry::classify(self).is_retryable()
    }

    /// 클라이언트 에러 여부
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Client
    }
}

impl From<&FailureMessage> for DriverError {
    fn from(failure: &FailureMessage) -> Self {
        Self::from_failure(failure.code.clone(), failure.message.clone())
    }
}

impl From<BoltError> for DriverError {
    fn from(err: BoltError) -> Self {
        match err {
            BoltError::Protocol(msg) => DriverError::Protocol(msg),
            BoltError::InvalidState(msg) => {
                DriverError::Protocol(format!("Invalid state: {}", msg))
            }
            other => DriverError::ServiceUnavailable(other.to_string()),
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// 드라이버 결과 타입
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Tests
// ============================================================================
