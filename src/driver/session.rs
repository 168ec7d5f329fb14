//! Session
//!
//! 세션 관리
//!
//! 세션은 연결 하나를 디스패처를 통해 독점합니다. 자동 커밋 실행과
//! 명시적 트랜잭션, 재시도되는 트랜잭션 함수를 제공합니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use super::connection::Connection;
use super::cursor::{Cursor, CursorState, SharedCursorState};
use super::dispatcher::ConnectionHandle;
use super::error::{DriverError, DriverResult};
use super::handlers::{CompletionHandler, PullResponseHandler, RunResponseHandler};
use super::retry::{ExponentialBackoffRetryLogic, RetryDecision, RetrySettings};
use super::summary::Query;
use super::transaction::{Transaction, TransactionConfig, TransactionTable};
use super::types::Value;
use crate::bolt::{AccessMode, BoltRequest, PullMessage, RequestContext, RunMessage};

// ============================================================================
// Bookmark - 북마크
// ============================================================================

/// 인과적 일관성 북마크
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bookmark {
    value: String,
}

impl Bookmark {
    /// 새 북마크 생성
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// 북마크 값
    pub fn value(&self) -> &str {
        &self.value
    }

    /// 빈 북마크 여부
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Display for Bookmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<String> for Bookmark {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Bookmark {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// SessionConfig - 세션 설정
// ============================================================================

/// 세션 설정
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// 데이터베이스 이름
    pub database: Option<String>,
    /// 기본 접근 모드 (자동 커밋 실행과 `begin_transaction`에 적용)
    pub default_access_mode: AccessMode,
    /// 시작 북마크
    pub bookmarks: Vec<Bookmark>,
    /// 임퍼손트 사용자
    pub impersonated_user: Option<String>,
}

impl SessionConfig {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 빌더 시작
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// 데이터베이스 설정
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// 접근 모드 설정
    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.default_access_mode = mode;
        self
    }

    /// 북마크 설정
    pub fn with_bookmarks(mut self, bookmarks: Vec<Bookmark>) -> Self {
        self.bookmarks = bookmarks;
        self
    }
}

/// 세션 설정 빌더
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// 새 빌더 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 데이터베이스 설정
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.config.database = Some(database.into());
        self
    }

    /// 읽기 모드로 설정
    pub fn with_read_access(mut self) -> Self {
        self.config.default_access_mode = AccessMode::Read;
        self
    }

    /// 쓰기 모드로 설정
    pub fn with_write_access(mut self) -> Self {
        self.config.default_access_mode = AccessMode::Write;
        self
    }

    /// 북마크 추가
    pub fn with_bookmark(mut self, bookmark: impl Into<Bookmark>) -> Self {
        self.config.bookmarks.push(bookmark.into());
        self
    }

    /// 임퍼손트 사용자 설정
    pub fn with_impersonated_user(mut self, user: impl Into<String>) -> Self {
        self.config.impersonated_user = Some(user.into());
        self
    }

    /// 빌드
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

// ============================================================================
// SessionShared - 세션과 트랜잭션이 공유하는 상태
// ============================================================================

pub(crate) struct SessionShared {
    pub(crate) connection: ConnectionHandle,
    pub(crate) config: SessionConfig,
    pub(crate) transactions: Arc<TransactionTable>,
    pub(crate) last_bookmark: Arc<RwLock<Option<Bookmark>>>,
    pub(crate) retry: ExponentialBackoffRetryLogic,
}

impl SessionShared {
    pub(crate) fn spawn<C: Connection>(
        connection: C,
        config: SessionConfig,
        retry: RetrySettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            connection: ConnectionHandle::spawn(connection),
            config,
            transactions: Arc::new(TransactionTable::new()),
            last_bookmark: Arc::new(RwLock::new(None)),
            retry: ExponentialBackoffRetryLogic::new(retry),
        })
    }

    /// 다음 요청에 실을 북마크 (마지막 북마크가 있으면 그것만)
    /// 자동 커밋 RUN과 BEGIN에 실을 컨텍스트
    pub(crate) fn context(&self, mode: AccessMode) -> RequestContext {
        RequestContext {
            bookmarks: self.bookmarks(),
            mode,
            database: self.config.database.clone(),
            impersonated_user: self.config.impersonated_user.clone(),
        }
    }

    pub(crate) fn bookmarks(&self) -> Vec<String> {
        match &*self.last_bookmark.read() {
            Some(bookmark) => vec![bookmark.value().to_string()],
            None => self
                .config
                .bookmarks
                .iter()
                .filter(|b| !b.is_empty())
                .map(|b| b.value().to_string())
                .collect(),
        }
    }

    pub(crate) fn record_bookmark(&self, value: &str) {
        *self.last_bookmark.write() = Some(Bookmark::new(value));
    }
}

// ============================================================================
// Session - 세션
// ============================================================================

/// 세션
pub struct Session {
    shared: Arc<SessionShared>,
    open: RwLock<bool>,
}

impl Session {
    /// 연결 위에 새 세션 생성
    ///
    /// tokio 런타임 안에서 호출해야 합니다. 재시도 설정이 잘못되었으면
    /// 연결을 쓰지 않고 에러를 반환합니다.
    pub fn new<C: Connection>(
        connection: C,
        config: SessionConfig,
        retry: RetrySettings,
    ) -> DriverResult<Self> {
        retry.validate()?;
        Ok(Self {
            shared: SessionShared::spawn(connection, config, retry),
            open: RwLock::new(true),
        })
    }

    /// 세션 설정
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// 열림 여부
    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    /// 마지막 북마크
    pub fn last_bookmark(&self) -> Option<Bookmark> {
        self.shared.last_bookmark.read().clone()
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if !self.is_open() {
            return Err(DriverError::session("Session is already closed"));
        }
        Ok(())
    }

    /// 자동 커밋 쿼리 실행
    ///
    /// RUN과 PULL은 호출 즉시 전송되므로 실행 순서는 호출 순서와 같습니다.
    /// 반환된 future는 RUN 응답을 받으면 커서로 완료됩니다.
    pub fn run(
        &self,
        query: impl Into<Query>,
        params: Option<HashMap<String, Value>>,
    ) -> impl Future<Output = DriverResult<Cursor>> + Send + 'static {
        let mut query = query.into();
        if let Some(p) = params {
            query = query.with_params(p);
        }
        let submitted = self.submit(query);
        async move { Cursor::open(submitted?).await }
    }

    fn submit(&self, query: Query) -> DriverResult<SharedCursorState> {
        self.ensure_open()?;
        if self.shared.transactions.has_active() {
            return Err(DriverError::session(
                "Statements cannot be run directly on a session with an open transaction; \
                 either run from within the transaction or use a different session.",
            ));
        }

        let run = RunMessage::new(query.text.clone())
            .with_parameters(query.wire_parameters())
            .with_context(self.shared.context(self.shared.config.default_access_mode));

        let cursor = CursorState::shared(query);
        let connection = &self.shared.connection;
        connection.send(
            BoltRequest::Run(run),
            Box::new(RunResponseHandler::new(cursor.clone(), None)),
        );
        connection.send(
            BoltRequest::Pull(PullMessage::all()),
            Box::new(PullResponseHandler::new(
                cursor.clone(),
                Some(self.shared.last_bookmark.clone()),
            )),
        );
        Ok(cursor)
    }

    /// 명시적 트랜잭션 시작
    pub async fn begin_transaction(&self, config: Option<TransactionConfig>) -> DriverResult<Transaction> {
        self.ensure_open()?;
        Transaction::begin(
            self.shared.clone(),
            self.shared.config.default_access_mode,
            config.unwrap_or_default(),
        )
        .await
    }

    /// 읽기 트랜잭션 함수 (재시도 포함)
    pub async fn read_transaction<F, Fut, T>(&self, work: F) -> DriverResult<T>
    where
        F: FnMut(Transaction) -> Fut,
        Fut: Future<Output = DriverResult<T>>,
    {
        self.execute_transaction(AccessMode::Read, work).await
    }

    /// 쓰기 트랜잭션 함수 (재시도 포함)
    pub async fn write_transaction<F, Fut, T>(&self, work: F) -> DriverResult<T>
    where
        F: FnMut(Transaction) -> Fut,
        Fut: Future<Output = DriverResult<T>>,
    {
        self.execute_transaction(AccessMode::Write, work).await
    }

    /// 트랜잭션 함수 실행
    async fn execute_transaction<F, Fut, T>(&self, mode: AccessMode, mut work: F) -> DriverResult<T>
    where
        F: FnMut(Transaction) -> Fut,
        Fut: Future<Output = DriverResult<T>>,
    {
        self.ensure_open()?;

        let mut retry = self.shared.retry.begin();
        loop {
            retry.start_attempt();
            match self.attempt(mode, &mut work).await {
                Ok(value) => return Ok(value),
                Err(error) => match retry.on_failure(error) {
                    RetryDecision::Retry(delay) => tokio::time::sleep(delay).await,
                    RetryDecision::Fail(error) => return Err(error),
                },
            }
        }
    }

    /// 트랜잭션 한 번 시도: 시작, 작업, 커밋 또는 롤백
    async fn attempt<F, Fut, T>(&self, mode: AccessMode, work: &mut F) -> DriverResult<T>
    where
        F: FnMut(Transaction) -> Fut,
        Fut: Future<Output = DriverResult<T>>,
    {
        self.ensure_open()?;
        let tx = Transaction::begin(self.shared.clone(), mode, TransactionConfig::default()).await?;

        match work(tx.clone()).await {
            Ok(value) => {
                if tx.is_open() {
                    tx.commit().await?;
                }
                Ok(value)
            }
            Err(error) => {
                if tx.is_open() {
                    if let Err(rollback_error) = tx.rollback().await {
                        tracing::debug!(error = %rollback_error, "Rollback after failed attempt failed");
                    }
                }
                Err(error)
            }
        }
    }

    /// 세션 닫기
    ///
    /// 열린 트랜잭션은 롤백하고, 이미 보낸 요청이 끝나기를 기다린 뒤
    /// 연결을 닫습니다.
    pub async fn close(&self) -> DriverResult<()> {
        {
            let mut open = self.open.write();
            if !*open {
                return Ok(());
            }
            *open = false;
        }

        if let Some((id, status)) = self.shared.transactions.take_active() {
            let live = status.lock().abandon();
            if live {
                let (handler, completion) = CompletionHandler::new();
                self.shared
                    .connection
                    .send_in(id, BoltRequest::Rollback, handler);
                if let Err(error) = completion.wait().await {
                    tracing::warn!(error = %error, "Rollback of open transaction on session close failed");
                }
            }
        }

        self.shared.connection.close().await;
        tracing::debug!("Session closed");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.shared.config)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
