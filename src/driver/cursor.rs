//! Statement Result Cursor
//!
//! 응답 핸들러가 채우고 호출자가 소비하는 스트리밍 결과
//!
//! 핸들러는 디스패처 태스크에서 [`CursorState`]를 갱신하고, [`Cursor`]는
//! 같은 상태를 읽으며 비어 있으면 대기합니다. 대기자는 한 번에 하나뿐이므로
//! 깨울 대상도 하나만 보관합니다.

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures::future::poll_fn;
use futures::Stream;
use parking_lot::Mutex;

use super::error::{DriverError, DriverResult};
use super::record::Record;
use super::summary::{Query, ResultSummary};
use crate::bolt::PackStreamValue;

// ============================================================================
// CursorState - 커서 공유 상태
// ============================================================================

/// 문장 하나의 진행 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// RUN 응답 대기
    AwaitingRunReply,
    /// 레코드 수신 중
    Streaming,
    /// 성공 종료
    Succeeded,
    /// 실패 종료
    Failed,
}

/// 커서와 핸들러가 공유하는 상태
#[derive(Debug)]
pub(crate) struct CursorState {
    query: Query,
    keys: Option<Arc<[String]>>,
    run_metadata: HashMap<String, PackStreamValue>,
    phase: Phase,
    records: VecDeque<Record>,
    summary: Option<ResultSummary>,
    error: Option<DriverError>,
    discarding: bool,
    waker: Option<Waker>,
}

pub(crate) type SharedCursorState = Arc<Mutex<CursorState>>;

impl CursorState {
    pub(crate) fn new(query: Query) -> Self {
        Self {
            query,
            keys: None,
            run_metadata: HashMap::new(),
            phase: Phase::AwaitingRunReply,
            records: VecDeque::new(),
            summary: None,
            error: None,
            discarding: false,
            waker: None,
        }
    }

    pub(crate) fn shared(query: Query) -> SharedCursorState {
        Arc::new(Mutex::new(Self::new(query)))
    }

    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }

    fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Succeeded | Phase::Failed)
    }

    fn fail(&mut self, error: DriverError) {
        // 첫 에러만 보관
        if self.error.is_none() {
            self.error = Some(error);
        }
        self.phase = Phase::Failed;
        self.wake();
    }

    // ------------------------------------------------------------------------
    // 핸들러 쪽
    // ------------------------------------------------------------------------

    pub(crate) fn on_run_success(&mut self, metadata: HashMap<String, PackStreamValue>) {
        let keys: Arc<[String]> = metadata
            .get("fields")
            .and_then(|v| v.as_string_list())
            .unwrap_or_default()
            .into();
        self.keys = Some(keys);
        self.run_metadata = metadata;
        if self.phase == Phase::AwaitingRunReply {
            self.phase = Phase::Streaming;
        }
        self.wake();
    }

    pub(crate) fn on_run_failure(&mut self, error: DriverError) {
        self.fail(error);
    }

    pub(crate) fn on_record(&mut self, fields: Vec<PackStreamValue>) {
        if self.is_done() || self.discarding {
            return;
        }
        let Some(keys) = self.keys.clone() else {
            self.fail(DriverError::protocol("RECORD received before RUN was acknowledged"));
            return;
        };
        match Record::from_wire(keys, fields) {
            Ok(record) => {
                self.records.push_back(record);
                self.wake();
            }
            Err(error) => self.fail(error),
        }
    }

    /// 스트림 성공 종료. 요약의 북마크를 반환합니다.
    pub(crate) fn on_pull_success(&mut self, metadata: HashMap<String, PackStreamValue>) -> Option<String> {
        if self.is_done() {
            return None;
        }
        let summary = ResultSummary::from_metadata(self.query.clone(), &self.run_metadata, &metadata);
        let bookmark = summary.bookmark.clone();
        self.summary = Some(summary);
        self.phase = Phase::Succeeded;
        self.wake();
        bookmark
    }

    pub(crate) fn on_pull_failure(&mut self, error: DriverError) {
        self.fail(error);
    }

    // ------------------------------------------------------------------------
    // 소비자 쪽
    // ------------------------------------------------------------------------

    fn park(&mut self, cx: &mut Context<'_>) {
        self.waker = Some(cx.waker().clone());
    }

    fn poll_run(&mut self, cx: &mut Context<'_>) -> Poll<DriverResult<Arc<[String]>>> {
        if let Some(keys) = &self.keys {
            return Poll::Ready(Ok(keys.clone()));
        }
        if let Some(error) = &self.error {
            return Poll::Ready(Err(error.clone()));
        }
        self.park(cx);
        Poll::Pending
    }

    fn poll_peek(&mut self, cx: &mut Context<'_>) -> Poll<DriverResult<Option<Record>>> {
        if let Some(record) = self.records.front() {
            return Poll::Ready(Ok(Some(record.clone())));
        }
        match self.phase {
            Phase::Failed => Poll::Ready(Err(self.terminal_error())),
            Phase::Succeeded => Poll::Ready(Ok(None)),
            Phase::AwaitingRunReply | Phase::Streaming => {
                self.park(cx);
                Poll::Pending
            }
        }
    }

    fn poll_next_record(&mut self, cx: &mut Context<'_>) -> Poll<DriverResult<Option<Record>>> {
        if let Some(record) = self.records.pop_front() {
            return Poll::Ready(Ok(Some(record)));
        }
        match self.phase {
            Phase::Failed => Poll::Ready(Err(self.terminal_error())),
            Phase::Succeeded => Poll::Ready(Ok(None)),
            Phase::AwaitingRunReply | Phase::Streaming => {
                self.park(cx);
                Poll::Pending
            }
        }
    }

    fn poll_summary(&mut self, cx: &mut Context<'_>) -> Poll<DriverResult<ResultSummary>> {
        self.discarding = true;
        self.records.clear();
        match self.phase {
            Phase::Failed => Poll::Ready(Err(self.terminal_error())),
            Phase::Succeeded => match &self.summary {
                Some(summary) => Poll::Ready(Ok(summary.clone())),
                None => Poll::Ready(Err(DriverError::protocol("Result finished without a summary"))),
            },
            Phase::AwaitingRunReply | Phase::Streaming => {
                self.park(cx);
                Poll::Pending
            }
        }
    }

    fn terminal_error(&self) -> DriverError {
        self.error
            .clone()
            .unwrap_or_else(|| DriverError::protocol("Result failed without an error"))
    }
}

// ============================================================================
// Cursor - 결과 커서
// ============================================================================

/// 문장 실행 결과 커서
///
/// 실행 응답을 받은 뒤에만 만들어지므로 [`keys`](Cursor::keys)는 대기하지 않습니다.
/// 실패를 한 번 관찰하면 이후 모든 소비 호출이 같은 에러를 반환합니다.
#[derive(Debug)]
pub struct Cursor {
    state: SharedCursorState,
    keys: Arc<[String]>,
    stream_finished: bool,
}

impl Cursor {
    /// RUN 응답을 기다려 커서 생성
    pub(crate) async fn open(state: SharedCursorState) -> DriverResult<Self> {
        let keys = poll_fn(|cx| state.lock().poll_run(cx)).await?;
        Ok(Self {
            state,
            keys,
            stream_finished: false,
        })
    }

    /// 결과 컬럼 이름
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// 다음 레코드를 제거하지 않고 반환 (스트림 끝이면 `None`)
    pub async fn peek(&mut self) -> DriverResult<Option<Record>> {
        poll_fn(|cx| self.state.lock().poll_peek(cx)).await
    }

    /// 다음 레코드 (스트림 끝이면 `None`)
    pub async fn next(&mut self) -> DriverResult<Option<Record>> {
        poll_fn(|cx| self.state.lock().poll_next_record(cx)).await
    }

    /// 남은 레코드 전부
    pub async fn list(&mut self) -> DriverResult<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// 남은 레코드를 순서대로 방문하고 요약 반환
    pub async fn for_each<F>(&mut self, mut visitor: F) -> DriverResult<ResultSummary>
    where
        F: FnMut(Record) -> DriverResult<()>,
    {
        while let Some(record) = self.next().await? {
            visitor(record)?;
        }
        self.summary().await
    }

    /// 남은 레코드를 버리고 요약 반환
    pub async fn summary(&mut self) -> DriverResult<ResultSummary> {
        poll_fn(|cx| self.state.lock().poll_summary(cx)).await
    }

    /// 정확히 하나 남은 레코드
    pub async fn single(&mut self) -> DriverResult<Record> {
        let first = self.next().await?.ok_or_else(|| {
            DriverError::client(
                "Neo.ClientError.Statement.ResultNotSingle",
                "Cannot retrieve a single record, because this result is empty.",
            )
        })?;
        if self.peek().await?.is_some() {
            // 나머지는 버림
            self.summary().await?;
            return Err(DriverError::client(
                "Neo.ClientError.Statement.ResultNotSingle",
                "Expected a result with a single record, but this result contains at least one more.",
            ));
        }
        Ok(first)
    }
}

impl Stream for Cursor {
    type Item = DriverResult<Record>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.stream_finished {
            return Poll::Ready(None);
        }
        let polled = self.state.lock().poll_next_record(cx);
        match polled {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(Some(record))) => Poll::Ready(Some(Ok(record))),
            Poll::Ready(Ok(None)) => {
                self.stream_finished = true;
                Poll::Ready(None)
            }
            Poll::Ready(Err(error)) => {
                self.stream_finished = true;
                Poll::Ready(Some(Err(error)))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
