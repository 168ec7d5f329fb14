//! Driver Module
//!
//! 세션, 커서, 트랜잭션, 재시도
//!
//! # 구성
//!
//! - 연결 추상화 ([`Connection`], [`Connector`]) 와 디스패처
//! - 응답 핸들러 (RUN / PULL / 트랜잭션 PULL)
//! - 결과 커서 ([`Cursor`]): keys, peek, next, list, for_each, summary
//! - 세션 ([`Session`]): 자동 커밋 실행, 트랜잭션 함수, 종료
//! - 명시적 트랜잭션 ([`Transaction`])
//! - 재시도 ([`ExponentialBackoffRetryLogic`], [`classify`])
//!
//! # Example
//!
//! ```ignore
//! use zeta4g_async_driver::driver::{Driver, DriverConfig, SessionConfig};
//!
//! let driver = Driver::new(DriverConfig::new("bolt://localhost:7687")?, connector)?;
//! let session = driver.session(SessionConfig::default()).await?;
//!
//! // 자동 커밋 실행
//! let mut cursor = session.run("MATCH (n) RETURN n LIMIT 10", None).await?;
//! while let Some(record) = cursor.next().await? {
//!     println!("{}", record);
//! }
//!
//! // 재시도되는 트랜잭션 함수
//! let count = session
//!     .write_transaction(|tx| async move {
//!         let mut cursor = tx.run("CREATE (n:Person {name: $name}) RETURN 1", Some(params! {"name" => "Alice"})).await?;
//!         let record = cursor.single().await?;
//!         record.get_int("1")
//!     })
//!     .await?;
//!
//! session.close().await?;
//! ```

pub mod connection;
mod cursor;
mod dispatcher;
mod driver;
mod error;
mod handlers;
mod record;
pub mod retry;
mod session;
mod summary;
mod transaction;
mod types;

// Re-exports
pub use crate::bolt::AccessMode;
pub use connection::{channel, ChannelConnection, Connection, Connector, ServerEndpoint};
pub use cursor::Cursor;
pub use driver::{Driver, DriverConfig, DriverConfigBuilder, ServerAddress, DEFAULT_PORT};
pub use error::{DriverError, DriverResult, ErrorKind};
pub use record::Record;
pub use retry::{
    classify, ExponentialBackoffRetryLogic, RetryDecision, RetrySettings, RetryState, Retryability,
};
pub use session::{Bookmark, Session, SessionConfig, SessionConfigBuilder};
pub use summary::{Counters, InputPosition, Notification, Query, QueryType, ResultSummary};
pub use transaction::{Transaction, TransactionConfig, TransactionState};
pub use types::{FromValue, Node, Value};

/// 파라미터 맵 생성 매크로
#[macro_export]
macro_rules! params {
    () => {
        std::collections::HashMap::<String, $crate::driver::Value>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = std::collections::HashMap::<String, $crate::driver::Value>::new();
        $(
            map.insert($key.to_string(), $crate::driver::Value::from($value));
        )+
        map
    }};
}
