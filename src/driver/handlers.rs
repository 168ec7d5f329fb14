//! Response Handlers
//!
//! 요청 하나에 핸들러 하나. 디스패처는 응답이 도착한 순서대로 대기열 맨 앞
//! 핸들러에 전달하고, 종료 응답(SUCCESS/FAILURE/IGNORED)에서 핸들러를
//! 소비합니다.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::oneshot;

use super::cursor::SharedCursorState;
use super::error::{DriverError, DriverResult};
use super::session::Bookmark;
use super::transaction::TransactionLink;
use crate::bolt::PackStreamValue;

/// 서버 응답 메타데이터
pub(crate) type Metadata = HashMap<String, PackStreamValue>;

/// 응답 핸들러
pub(crate) trait ResponseHandler: Send {
    /// RECORD 수신
    fn on_record(&mut self, fields: Vec<PackStreamValue>) {
        tracing::debug!(fields = fields.len(), "Discarding unexpected RECORD");
    }

    /// SUCCESS 수신
    fn on_success(self: Box<Self>, metadata: Metadata);

    /// FAILURE 수신 (IGNORED나 연결 끊김도 여기로 옴)
    fn on_failure(self: Box<Self>, error: DriverError);
}

// ============================================================================
// RunResponseHandler - RUN 응답
// ============================================================================

/// RUN 응답 핸들러
pub(crate) struct RunResponseHandler {
    cursor: SharedCursorState,
    transaction: Option<TransactionLink>,
}

impl RunResponseHandler {
    pub(crate) fn new(cursor: SharedCursorState, transaction: Option<TransactionLink>) -> Self {
        Self { cursor, transaction }
    }
}

impl ResponseHandler for RunResponseHandler {
    fn on_success(self: Box<Self>, metadata: Metadata) {
        self.cursor.lock().on_run_success(metadata);
    }

    fn on_failure(self: Box<Self>, error: DriverError) {
        if let Some(tx) = &self.transaction {
            tx.mark_terminated(&error);
        }
        self.cursor.lock().on_run_failure(error);
    }
}

// ============================================================================
// PullResponseHandler - PULL 응답 (자동 커밋)
// ============================================================================

/// PULL 응답 핸들러
///
/// 자동 커밋 실행은 스트림 종료 시 받은 북마크를 세션에 남깁니다.
pub(crate) struct PullResponseHandler {
    cursor: SharedCursorState,
    bookmark: Option<Arc<RwLock<Option<Bookmark>>>>,
}

impl PullResponseHandler {
    pub(crate) fn new(
        cursor: SharedCursorState,
        bookmark: Option<Arc<RwLock<Option<Bookmark>>>>,
    ) -> Self {
        Self { cursor, bookmark }
    }
}

impl ResponseHandler for PullResponseHandler {
    fn on_record(&mut self, fields: Vec<PackStreamValue>) {
        self.cursor.lock().on_record(fields);
    }

    fn on_success(self: Box<Self>, metadata: Metadata) {
        let bookmark = self.cursor.lock().on_pull_success(metadata);
        if let (Some(slot), Some(value)) = (&self.bookmark, bookmark) {
            *slot.write() = Some(Bookmark::new(value));
        }
    }

    fn on_failure(self: Box<Self>, error: DriverError) {
        self.cursor.lock().on_pull_failure(error);
    }
}

// ============================================================================
// TransactionPullResponseHandler - PULL 응답 (트랜잭션)
// ============================================================================

/// 트랜잭션 안의 PULL 응답 핸들러
///
/// 실패하면 트랜잭션을 종료 상태로 표시합니다. 성공을 표시하지는 않습니다.
pub(crate) struct TransactionPullResponseHandler {
    inner: PullResponseHandler,
    transaction: TransactionLink,
}

impl TransactionPullResponseHandler {
    pub(crate) fn new(cursor: SharedCursorState, transaction: TransactionLink) -> Self {
        Self {
            inner: PullResponseHandler::new(cursor, None),
            transaction,
        }
    }
}

impl ResponseHandler for TransactionPullResponseHandler {
    fn on_record(&mut self, fields: Vec<PackStreamValue>) {
        self.inner.on_record(fields);
    }

    fn on_success(self: Box<Self>, metadata: Metadata) {
        Box::new(self.inner).on_success(metadata);
    }

    fn on_failure(self: Box<Self>, error: DriverError) {
        self.transaction.mark_terminated(&error);
        Box::new(self.inner).on_failure(error);
    }
}

// ============================================================================
// CompletionHandler - BEGIN/COMMIT/ROLLBACK 응답
// ============================================================================

/// 종료 응답을 oneshot으로 넘기는 핸들러
pub(crate) struct CompletionHandler {
    reply: oneshot::Sender<DriverResult<Metadata>>,
}

/// [`CompletionHandler`]의 결과 수신 측
pub(crate) struct Completion {
    rx: oneshot::Receiver<DriverResult<Metadata>>,
}

impl CompletionHandler {
    pub(crate) fn new() -> (Box<Self>, Completion) {
        let (reply, rx) = oneshot::channel();
        (Box::new(Self { reply }), Completion { rx })
    }
}

impl ResponseHandler for CompletionHandler {
    fn on_success(self: Box<Self>, metadata: Metadata) {
        let _ = self.reply.send(Ok(metadata));
    }

    fn on_failure(self: Box<Self>, error: DriverError) {
        let _ = self.reply.send(Err(error));
    }
}

impl Completion {
    /// 응답 대기
    pub(crate) async fn wait(self) -> DriverResult<Metadata> {
        self.rx
            .await
            .map_err(|_| DriverError::service_unavailable("Connection closed before the reply arrived"))?
    }
}

// ============================================================================
// DetachedHandler - 응답을 기다리지 않는 요청
// ============================================================================

/// 결과를 기다리지 않는 요청의 핸들러 (실패는 로그만 남김)
pub(crate) struct DetachedHandler {
    request: &'static str,
}

impl DetachedHandler {
    pub(crate) fn new(request: &'static str) -> Box<Self> {
        Box::new(Self { request })
    }
}

impl ResponseHandler for DetachedHandler {
    fn on_success(self: Box<Self>, _metadata: Metadata) {
        tracing::trace!(request = self.request, "Detached request completed");
    }

    fn on_failure(self: Box<Self>, error: DriverError) {
        tracing::warn!(request = self.request, error = %error, "Detached request failed");
    }
}

// ============================================================================
// Tests
// ============================================================================
