//! # Bolt Protocol Messages
//!
//! Message-level view of the Bolt protocol used by the driver core.
//!
//! ## Overview
//!
//! A session talks to the server by writing request messages and reading
//! response messages over a single ordered connection:
//!
//! - **Values** - parameters, record fields and metadata
//! - **Requests** - RUN, PULL, BEGIN, COMMIT, ROLLBACK, RESET, GOODBYE
//! - **Responses** - SUCCESS, RECORD, FAILURE, IGNORED
//!
//! ## Exchange Rules
//!
//! - Every request except GOODBYE receives exactly one summary response
//!   (SUCCESS, FAILURE or IGNORED), possibly preceded by RECORDs.
//! - Responses arrive in request order.
//! - After a FAILURE the server ignores everything until it sees RESET.
//!
//! ## Submodules
//!
//! - [`value`] - Wire value model
//! - [`message`] - Bolt message types
//! - [`error`] - Protocol error types

pub mod error;
pub mod message;
pub mod value;

pub use error::{BoltError, BoltErrorCode, BoltResult};
pub use message::{
    AccessMode, BeginMessage, BoltRequest, BoltResponse, FailureMessage, PullMessage,
    RecordMessage, RequestContext, RunMessage, SuccessMessage,
};
pub use value::{PackStreamNode, PackStreamValue};
