//! Bolt protocol error types.

use std::fmt;
use std::io;

/// Result type for Bolt operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Errors raised by a Bolt connection.
///
/// Server-side failures travel as FAILURE messages, not as `BoltError`s;
/// this type only covers the transport and the message exchange itself.
#[derive(Debug)]
pub enum BoltError {
    /// I/O error
    Io(io::Error),

    /// Protocol error (unexpected message, broken exchange)
    Protocol(String),

    /// Connection error
    Connection(String),

    /// State machine error (invalid state transition)
    InvalidState(String),

    /// Timeout error
    Timeout,

    /// Connection closed
    ConnectionClosed,
}

impl fmt::Display for BoltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltError::Io(e) => write!(f, "I/O error: {}", e),
            BoltError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            BoltError::Connection(msg) => write!(f, "Connection error: {}", msg),
            BoltError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            BoltError::Timeout => write!(f, "Operation timed out"),
            BoltError::ConnectionClosed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for BoltError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoltError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BoltError {
    fn from(err: io::Error) -> Self {
        BoltError::Io(err)
    }
}

/// Bolt 프로토콜 에러 코드 상수
///
/// 서버 FAILURE 메시지의 에러 코드입니다.
/// 에러 코드는 "Neo.{Classification}.{Category}.{Title}" 형식을 따릅니다.
pub struct BoltErrorCode;

impl BoltErrorCode {
    // Client errors
    pub const SYNTAX_ERROR: &'static str = "Neo.ClientError.Statement.SyntaxError";
    pub const SEMANTIC_ERROR: &'static str = "Neo.ClientError.Statement.SemanticError";
    pub const ARITHMETIC_ERROR: &'static str = "Neo.ClientError.Statement.ArithmeticError";
    pub const PARAMETER_MISSING: &'static str = "Neo.ClientError.Statement.ParameterMissing";
    pub const CONSTRAINT_VIOLATION: &'static str =
        "Neo.ClientError.Schema.ConstraintValidationFailed";
    pub const REQUEST_INVALID: &'static str = "Neo.ClientError.Request.Invalid";
    pub const TRANSACTION_NOT_FOUND: &'static str =
        "Neo.ClientError.Transaction.TransactionNotFound";

    // Client errors surfaced as session expiry
    pub const NOT_A_LEADER: &'static str = "Neo.ClientError.Cluster.NotALeader";
    pub const FORBIDDEN_ON_READ_ONLY_DATABASE: &'static str =
        "Neo.ClientError.General.ForbiddenOnReadOnlyDatabase";

    // Database errors
    pub const GENERAL_ERROR: &'static str = "Neo.DatabaseError.General.UnknownError";
    pub const EXECUTION_FAILED: &'static str = "Neo.DatabaseError.Statement.ExecutionFailed";

    // Transient errors
    pub const DEADLOCK_DETECTED: &'static str = "Neo.TransientError.Transaction.DeadlockDetected";
    pub const DATABASE_UNAVAILABLE: &'static str =
        "Neo.TransientError.General.DatabaseUnavailable";
    pub const TRANSACTION_TERMINATED: &'static str =
        "Neo.TransientError.Transaction.Terminated";
    pub const LOCK_CLIENT_STOPPED: &'static str =
        "Neo.TransientError.Transaction.LockClientStopped";

    /// Classification prefixes
    pub const CLIENT_ERROR_PREFIX: &'static str = "Neo.ClientError.";
    pub const TRANSIENT_ERROR_PREFIX: &'static str = "Neo.TransientError.";
}
