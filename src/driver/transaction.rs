//! Explicit Transaction
//!
//! 트랜잭션 관리
//!
//! 상태 전이:
//!
//! ```text
//! Active ─┬─ mark_success ─> MarkedSuccess ─┐
//!         ├─ mark_failure ─> MarkedFailed ──┼─> Committed | RolledBack
//!         └─ 서버 실패 ────> Terminated ────┘
//! ```
//!
//! `Terminated`는 서버 쪽 트랜잭션이 이미 RESET으로 끝났다는 뜻이므로
//! 롤백은 로컬에서만 처리합니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::cursor::{Cursor, CursorState, SharedCursorState};
use super::error::{DriverError, DriverResult};
use super::handlers::{
    CompletionHandler, DetachedHandler, Metadata, RunResponseHandler,
    TransactionPullResponseHandler,
};
use super::session::SessionShared;
use super::summary::Query;
use super::types::Value;
use crate::bolt::{AccessMode, BeginMessage, BoltRequest, PullMessage, RunMessage};

// ============================================================================
// TransactionConfig - 트랜잭션 설정
// ============================================================================

/// 트랜잭션 설정
#[derive(Debug, Clone, Default)]
pub struct TransactionConfig {
    /// 서버 측 타임아웃
    pub timeout: Option<Duration>,
    /// 트랜잭션 메타데이터
    pub metadata: HashMap<String, Value>,
}

impl TransactionConfig {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 타임아웃 설정
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 메타데이터 추가
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// TransactionState - 트랜잭션 상태
// ============================================================================

/// 트랜잭션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// 활성 상태
    Active,
    /// 커밋 예정
    MarkedSuccess,
    /// 롤백 예정 (되돌릴 수 없음)
    MarkedFailed,
    /// 서버 실패로 종료됨
    Terminated,
    /// 커밋됨
    Committed,
    /// 롤백됨
    RolledBack,
}

impl TransactionState {
    /// 아직 커밋/롤백되지 않음
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Committed | Self::RolledBack)
    }

    /// 서버 쪽 트랜잭션이 살아 있음
    fn is_live_on_server(&self) -> bool {
        matches!(self, Self::Active | Self::MarkedSuccess | Self::MarkedFailed)
    }
}

/// 공유 트랜잭션 상태
#[derive(Debug)]
pub(crate) struct TransactionStatus {
    state: TransactionState,
    failure: Option<DriverError>,
    finishing: bool,
}

impl TransactionStatus {
    fn new() -> Self {
        Self {
            state: TransactionState::Active,
            failure: None,
            finishing: false,
        }
    }

    pub(crate) fn state(&self) -> TransactionState {
        self.state
    }

    pub(crate) fn failure(&self) -> Option<&DriverError> {
        self.failure.as_ref()
    }

    /// 세션 종료 시 강제 정리. 서버 롤백이 필요한지 반환합니다.
    pub(crate) fn abandon(&mut self) -> bool {
        let live = self.state.is_live_on_server() && !self.finishing;
        if self.state.is_open() {
            self.state = TransactionState::RolledBack;
        }
        live
    }
}

pub(crate) type StateCell = Arc<Mutex<TransactionStatus>>;

// ============================================================================
// TransactionTable - 세션의 트랜잭션 슬롯
// ============================================================================

/// 트랜잭션 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TransactionId(u64);

/// 세션당 하나의 활성 트랜잭션 슬롯
///
/// 핸들러는 트랜잭션 자체 대신 ID를 들고 이 표에서 상태를 찾습니다.
#[derive(Debug, Default)]
pub(crate) struct TransactionTable {
    active: Mutex<Option<(TransactionId, StateCell)>>,
    next_id: AtomicU64,
}

impl TransactionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 새 트랜잭션 슬롯 확보
    pub(crate) fn open(&self) -> DriverResult<(TransactionId, StateCell)> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(DriverError::transaction(
                "You cannot begin a transaction on a session with an open transaction; \
                 either run from within the transaction or use a different session.",
            ));
        }
        let id = TransactionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let status = Arc::new(Mutex::new(TransactionStatus::new()));
        *active = Some((id, status.clone()));
        Ok((id, status))
    }

    pub(crate) fn lookup(&self, id: TransactionId) -> Option<StateCell> {
        match &*self.active.lock() {
            Some((active, status)) if *active == id => Some(status.clone()),
            _ => None,
        }
    }

    pub(crate) fn release(&self, id: TransactionId) {
        let mut active = self.active.lock();
        if matches!(&*active, Some((current, _)) if *current == id) {
            *active = None;
        }
    }

    pub(crate) fn has_active(&self) -> bool {
        self.active.lock().is_some()
    }

    pub(crate) fn take_active(&self) -> Option<(TransactionId, StateCell)> {
        self.active.lock().take()
    }
}

/// 핸들러가 들고 있는 트랜잭션 참조
#[derive(Debug, Clone)]
pub(crate) struct TransactionLink {
    table: Arc<TransactionTable>,
    id: TransactionId,
}

impl TransactionLink {
    pub(crate) fn new(table: Arc<TransactionTable>, id: TransactionId) -> Self {
        Self { table, id }
    }

    /// 서버 실패로 트랜잭션 종료 표시
    pub(crate) fn mark_terminated(&self, error: &DriverError) {
        let Some(status) = self.table.lookup(self.id) else {
            return;
        };
        let mut status = status.lock();
        if status.state.is_live_on_server() {
            status.state = TransactionState::Terminated;
            if status.failure.is_none() {
                status.failure = Some(error.clone());
            }
        }
    }
}

// ============================================================================
// Transaction - 트랜잭션
// ============================================================================

/// 명시적 트랜잭션
///
/// 복제본은 같은 트랜잭션을 가리킵니다. 마지막 복제본이 끝나지 않은 채로
/// 사라지면 ROLLBACK을 보내고 세션 슬롯을 비웁니다.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TransactionInner>,
}

struct TransactionInner {
    session: Arc<SessionShared>,
    id: TransactionId,
    status: StateCell,
}

enum Step {
    Done(DriverResult<()>),
    Send(BoltRequest),
}

impl Transaction {
    /// BEGIN을 보내고 응답을 기다림
    pub(crate) async fn begin(
        session: Arc<SessionShared>,
        mode: AccessMode,
        config: TransactionConfig,
    ) -> DriverResult<Self> {
        let (id, status) = session.transactions.open()?;
        let tx = Self {
            inner: Arc::new(TransactionInner {
                session: session.clone(),
                id,
                status,
            }),
        };

        let mut begin = BeginMessage::new(session.context(mode));
        if let Some(timeout) = config.timeout {
            begin = begin.with_timeout(timeout);
        }
        if !config.metadata.is_empty() {
            begin = begin.with_metadata(
                config
                    .metadata
                    .into_iter()
                    .map(|(k, v)| (k, v.into()))
                    .collect(),
            );
        }

        let (handler, completion) = CompletionHandler::new();
        session.connection.send_in(id, BoltRequest::Begin(begin), handler);
        if let Err(error) = completion.wait().await {
            // 실패한 BEGIN은 서버에 트랜잭션을 남기지 않음
            tx.inner.status.lock().state = TransactionState::Terminated;
            return Err(error);
        }
        tracing::debug!(mode = mode.as_str(), "Transaction started");
        Ok(tx)
    }

    /// 쿼리 실행
    ///
    /// 요청은 호출 즉시 전송됩니다. 반환된 future는 RUN 응답을 받으면 커서로
    /// 완료됩니다.
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
        let state = self.state();
        match state {
            TransactionState::Active | TransactionState::MarkedSuccess => {}
            TransactionState::MarkedFailed => {
                return Err(DriverError::transaction(
                    "Cannot run more statements in this transaction, it has been marked for failure. \
                     Please either rollback or close this transaction",
                ));
            }
            TransactionState::Terminated => {
                return Err(DriverError::transaction(
                    "Cannot run more statements in this transaction, because previous statements in the \
                     transaction has failed and the transaction has been rolled back. \
                     Please start a new transaction to run another statement.",
                ));
            }
            TransactionState::Committed | TransactionState::RolledBack => {
                return Err(DriverError::transaction(format!(
                    "Cannot run more statements in this transaction, it has been {}",
                    if state == TransactionState::Committed { "committed" } else { "rolled back" }
                )));
            }
        }

        let run = RunMessage::new(query.text.clone()).with_parameters(query.wire_parameters());
        let cursor = CursorState::shared(query);
        let link = self.link();
        let connection = &self.inner.session.connection;
        connection.send_in(
            self.inner.id,
            BoltRequest::Run(run),
            Box::new(RunResponseHandler::new(cursor.clone(), Some(link.clone()))),
        );
        connection.send_in(
            self.inner.id,
            BoltRequest::Pull(PullMessage::all()),
            Box::new(TransactionPullResponseHandler::new(cursor.clone(), link)),
        );
        Ok(cursor)
    }

    /// 성공 표시 (close 시 커밋)
    pub fn mark_success(&self) {
        let mut status = self.inner.status.lock();
        if status.state == TransactionState::Active {
            status.state = TransactionState::MarkedSuccess;
        }
    }

    /// 실패 표시 (이후 커밋 불가)
    pub fn mark_failure(&self) {
        let mut status = self.inner.status.lock();
        if matches!(
            status.state,
            TransactionState::Active | TransactionState::MarkedSuccess
        ) {
            status.state = TransactionState::MarkedFailed;
        }
    }

    /// 커밋
    ///
    /// 실패 표시된 트랜잭션은 롤백한 뒤 에러를 반환합니다. 서버 실패로 끝난
    /// 트랜잭션은 그 실패를 그대로 반환합니다.
    pub async fn commit(&self) -> DriverResult<()> {
        let step = {
            let mut status = self.inner.status.lock();
            if status.finishing {
                Step::Done(Err(already_finishing()))
            } else {
                match status.state {
                    TransactionState::Committed => Step::Done(Ok(())),
                    TransactionState::RolledBack => Step::Done(Err(DriverError::transaction(
                        "Can't commit, transaction has been rolled back",
                    ))),
                    TransactionState::Terminated => {
                        status.state = TransactionState::RolledBack;
                        Step::Done(Err(status.failure.clone().unwrap_or_else(|| {
                            DriverError::transaction("Transaction has been terminated")
                        })))
                    }
                    TransactionState::MarkedFailed => {
                        status.finishing = true;
                        Step::Send(BoltRequest::Rollback)
                    }
                    TransactionState::Active | TransactionState::MarkedSuccess => {
                        status.state = TransactionState::MarkedSuccess;
                        status.finishing = true;
                        Step::Send(BoltRequest::Commit)
                    }
                }
            }
        };

        match step {
            Step::Done(result) => {
                self.release_if_finished();
                result
            }
            Step::Send(BoltRequest::Commit) => {
                let metadata = self.finish(BoltRequest::Commit).await?;
                if let Some(bookmark) = metadata.get("bookmark").and_then(|v| v.as_str()) {
                    self.inner.session.record_bookmark(bookmark);
                }
                tracing::debug!("Transaction committed");
                Ok(())
            }
            Step::Send(request) => {
                self.finish(request).await?;
                Err(DriverError::transaction(
                    "Transaction can't be committed. It has been rolled back either because of an error \
                     or explicit termination",
                ))
            }
        }
    }

    /// 롤백 (이미 롤백되었으면 아무것도 하지 않음)
    pub async fn rollback(&self) -> DriverResult<()> {
        let step = {
            let mut status = self.inner.status.lock();
            if status.finishing {
                Step::Done(Err(already_finishing()))
            } else {
                match status.state {
                    TransactionState::RolledBack => Step::Done(Ok(())),
                    TransactionState::Committed => Step::Done(Err(DriverError::transaction(
                        "Can't rollback, transaction has been committed",
                    ))),
                    TransactionState::Terminated => {
                        status.state = TransactionState::RolledBack;
                        Step::Done(Ok(()))
                    }
                    TransactionState::Active
                    | TransactionState::MarkedSuccess
                    | TransactionState::MarkedFailed => {
                        status.finishing = true;
                        Step::Send(BoltRequest::Rollback)
                    }
                }
            }
        };

        match step {
            Step::Done(result) => {
                self.release_if_finished();
                result
            }
            Step::Send(request) => {
                self.finish(request).await?;
                tracing::debug!("Transaction rolled back");
                Ok(())
            }
        }
    }

    /// 닫기 (성공 표시면 커밋, 아니면 롤백)
    pub async fn close(&self) -> DriverResult<()> {
        match self.state() {
            TransactionState::MarkedSuccess => self.commit().await,
            TransactionState::Committed | TransactionState::RolledBack => Ok(()),
            TransactionState::Active
            | TransactionState::MarkedFailed
            | TransactionState::Terminated => self.rollback().await,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> TransactionState {
        self.inner.status.lock().state
    }

    /// 열림 여부
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    fn link(&self) -> TransactionLink {
        TransactionLink::new(self.inner.session.transactions.clone(), self.inner.id)
    }

    async fn finish(&self, request: BoltRequest) -> DriverResult<Metadata> {
        let committing = request == BoltRequest::Commit;
        let (handler, completion) = CompletionHandler::new();
        self.inner.session.connection.send_in(self.inner.id, request, handler);
        let result = completion.wait().await;

        {
            let mut status = self.inner.status.lock();
            status.finishing = false;
            status.state = if committing && result.is_ok() {
                TransactionState::Committed
            } else {
                TransactionState::RolledBack
            };
        }
        self.inner.session.transactions.release(self.inner.id);
        result
    }

    fn release_if_finished(&self) {
        if !self.is_open() {
            self.inner.session.transactions.release(self.inner.id);
        }
    }
}

fn already_finishing() -> DriverError {
    DriverError::transaction("Transaction is already being committed or rolled back")
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for TransactionInner {
    fn drop(&mut self) {
        let rollback = {
            let mut status = self.status.lock();
            let live = status.state.is_live_on_server() && !status.finishing;
            if live {
                status.state = TransactionState::RolledBack;
            }
            live
        };
        if rollback {
            tracing::debug!("Rolling back transaction dropped without commit or rollback");
            self.session.connection.send_in(
                self.id,
                BoltRequest::Rollback,
                DetachedHandler::new("ROLLBACK"),
            );
        }
        self.session.transactions.release(self.id);
    }
}

// ============================================================================
// Tests
// ============================================================================
