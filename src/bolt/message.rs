//! Bolt protocol messages.
//!
//! A session writes [`BoltRequest`]s and reads [`BoltResponse`]s. Only the
//! messages a session exchanges after authentication are modelled.

use std::collections::HashMap;
use std::time::Duration;

use super::value::PackStreamValue;

/// Access mode for transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Read-write access (default)
    #[default]
    Write,
    /// Read-only access
    Read,
}

impl AccessMode {
    /// Metadata form of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "r",
            AccessMode::Write => "w",
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Requests written by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltRequest {
    /// GOODBYE - Close connection gracefully
    Goodbye,
    /// RESET - Clear failure state and any open transaction
    Reset,
    /// RUN - Execute a query
    Run(RunMessage),
    /// PULL - Pull results
    Pull(PullMessage),
    /// BEGIN - Start transaction
    Begin(BeginMessage),
    /// COMMIT - Commit transaction
    Commit,
    /// ROLLBACK - Rollback transaction
    Rollback,
}

impl BoltRequest {
    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltRequest::Goodbye => "GOODBYE",
            BoltRequest::Reset => "RESET",
            BoltRequest::Run(_) => "RUN",
            BoltRequest::Pull(_) => "PULL",
            BoltRequest::Begin(_) => "BEGIN",
            BoltRequest::Commit => "COMMIT",
            BoltRequest::Rollback => "ROLLBACK",
        }
    }
}

/// Where and how a unit of work runs.
///
/// Sent with BEGIN and with auto-commit RUN. A RUN inside an explicit
/// transaction carries the default (empty) context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestContext {
    /// Bookmarks the server must have seen first
    pub bookmarks: Vec<String>,
    /// Access mode
    pub mode: AccessMode,
    /// Target database, server default when `None`
    pub database: Option<String>,
    /// User to impersonate
    pub impersonated_user: Option<String>,
}

impl RequestContext {
    /// Whether nothing but defaults would be sent.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// RUN message.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMessage {
    /// Query text
    pub query: String,
    /// Query parameters
    pub parameters: HashMap<String, PackStreamValue>,
    /// Auto-commit context
    pub context: RequestContext,
}

impl RunMessage {
    /// RUN with no parameters and an empty context.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: HashMap::new(),
            context: RequestContext::default(),
        }
    }

    /// Set query parameters.
    pub fn with_parameters(mut self, parameters: HashMap<String, PackStreamValue>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the auto-commit context.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// PULL message. Sessions always pull the whole result.
#[derive(Debug, Clone, PartialEq)]
pub struct PullMessage {
    /// Number of records to pull, `-1` for all
    pub n: i64,
}

impl PullMessage {
    /// PULL everything.
    pub fn all() -> Self {
        Self { n: -1 }
    }
}

/// BEGIN message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeginMessage {
    /// Transaction context
    pub context: RequestContext,
    /// Server-side timeout
    pub timeout: Option<Duration>,
    /// Transaction metadata
    pub metadata: HashMap<String, PackStreamValue>,
}

impl BeginMessage {
    /// BEGIN in the given context.
    pub fn new(context: RequestContext) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    /// Set the server-side timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set transaction metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, PackStreamValue>) -> Self {
        self.metadata = metadata;
        self
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Responses read by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    /// SUCCESS - Request completed
    Success(SuccessMessage),
    /// RECORD - One result row
    Record(RecordMessage),
    /// FAILURE - Request failed
    Failure(FailureMessage),
    /// IGNORED - Request skipped while the connection is failed
    Ignored,
}

impl BoltResponse {
    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Failure(_) => "FAILURE",
            BoltResponse::Ignored => "IGNORED",
        }
    }
}

/// SUCCESS message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuccessMessage {
    /// Response metadata
    pub metadata: HashMap<String, PackStreamValue>,
}

impl SuccessMessage {
    /// SUCCESS with empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// SUCCESS answering RUN with the result's field names.
    pub fn with_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        let mut msg = Self::new();
        let names = fields.iter().map(|f| PackStreamValue::from(f.as_ref())).collect::<Vec<_>>();
        msg.insert("fields", names);
        msg
    }

    /// SUCCESS carrying only a bookmark, as sent after COMMIT or at the end
    /// of an auto-commit result.
    pub fn with_bookmark(bookmark: impl Into<String>) -> Self {
        let mut msg = Self::new();
        msg.insert("bookmark", bookmark.into());
        msg
    }

    /// Add a metadata entry.
    pub fn insert(&mut self, key: &str, value: impl Into<PackStreamValue>) {
        self.metadata.insert(key.to_string(), value.into());
    }
}

/// RECORD message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordMessage {
    /// Field values in column order
    pub fields: Vec<PackStreamValue>,
}

impl RecordMessage {
    /// RECORD with the given fields.
    pub fn new(fields: Vec<PackStreamValue>) -> Self {
        Self { fields }
    }
}

/// FAILURE message.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureMessage {
    /// Server status code, e.g. `Neo.ClientError.Statement.SyntaxError`
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl FailureMessage {
    /// FAILURE with a code and message.
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FailureMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
