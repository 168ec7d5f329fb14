//! # Zeta4G Async Driver
//!
//! Asynchronous execution core for [Zeta4G](https://github.com/zeta9044/zeta4g)
//! Bolt drivers: sessions, streaming result cursors, explicit transactions and
//! retried transaction functions over a single ordered connection.
//!
//! ## Features
//!
//! - **Pipelined execution** - statements are written as soon as they are
//!   submitted; responses are routed back to their cursors in order
//! - **Streaming cursors** - `peek`, `next`, `list`, `for_each` and `summary`
//!   over records buffered as they arrive
//! - **Transactions** - explicit begin/commit/rollback with success and
//!   failure marking
//! - **Transaction functions** - automatic retry of transient failures with
//!   exponential backoff and jitter
//!
//! The byte-level transport is pluggable: anything implementing
//! [`driver::Connection`] (a `Sink` of requests and a `Stream` of responses)
//! can carry a session.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use zeta4g_async_driver::{channel, Session, SessionConfig, RetrySettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (connection, _server) = channel();
//! let session = Session::new(connection, SessionConfig::default(), RetrySettings::default())?;
//!
//! let mut cursor = session.run("UNWIND range(1, 3) AS x RETURN x", None).await?;
//! while let Some(record) = cursor.next().await? {
//!     println!("{}", record);
//! }
//! let summary = cursor.summary().await?;
//! println!("{:?}", summary.counters);
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Transaction Functions
//!
//! Work passed to `write_transaction` runs in a fresh transaction per
//! attempt. It is committed when the work returns `Ok` and rolled back when it
//! returns `Err`; retryable failures start a new attempt after a backoff.
//!
//! ```rust,no_run
//! # use zeta4g_async_driver::{Session, DriverResult};
//! # async fn example(session: &Session) -> DriverResult<()> {
//! let value = session
//!     .write_transaction(|tx| async move {
//!         let mut cursor = tx.run("CREATE (:Node) RETURN 24 AS answer", None).await?;
//!         cursor.single().await?.get_int("answer")
//!     })
//!     .await?;
//! assert_eq!(value, 24);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! # use zeta4g_async_driver::{Session, DriverError};
//! # async fn example(session: &Session) {
//! match session.write_transaction(|tx| async move { tx.run("RETURN 10 / 0", None).await?.list().await }).await {
//!     Ok(records) => println!("{} records", records.len()),
//!     Err(e) => {
//!         eprintln!("failed: {} (retryable: {})", e, e.is_retryable());
//!         for earlier in e.suppressed() {
//!             eprintln!("  after: {}", earlier);
//!         }
//!     }
//! }
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - Sessions, cursors, transactions and retry
//! - [`bolt`] - Bolt message and value model
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod driver;

// Re-exports for convenience
pub use driver::{
    channel, AccessMode, Bookmark, ChannelConnection, Connection, Connector, Cursor, Driver,
    DriverConfig, DriverConfigBuilder, DriverError, DriverResult, ErrorKind, Query, Record,
    ResultSummary, RetrySettings, ServerAddress, ServerEndpoint, Session, SessionConfig,
    SessionConfigBuilder, Transaction, TransactionConfig, TransactionState, Value,
};

pub use bolt::{BoltError, BoltRequest, BoltResponse, PackStreamValue};

/// Config alias for convenience
pub type Config = DriverConfig;
