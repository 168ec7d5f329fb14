//! Message Dispatcher
//!
//! 세션 연결을 단독으로 소유하는 tokio 태스크
//!
//! - 요청은 받은 순서대로 씁니다. 쓰기는 별도 태스크가 맡으므로 쓰기가
//!   막혀도 응답 읽기는 계속됩니다.
//! - 응답은 대기열 맨 앞 핸들러로 갑니다 (서버는 요청 순서대로 응답).
//! - FAILURE 뒤에는 RESET을 쓰고, 그 사이의 IGNORED 응답에는 원인이 된
//!   실패를 전달합니다.
//! - 트랜잭션에 묶인 요청은 쓰기 직전에 그 트랜잭션이 서버에서 이미
//!   끝났는지 확인합니다. 끝났다면 RESET 뒤로 쓰지 않고 로컬에서 응답합니다.
//! - 연결이 끊기면 남은 핸들러와 이후 요청은 모두 서비스 불가로 실패합니다.

use std::collections::VecDeque;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::connection::Connection;
use super::error::DriverError;
use super::handlers::{Metadata, ResponseHandler};
use super::transaction::TransactionId;
use crate::bolt::{BoltRequest, BoltResponse};

enum Command {
    Send {
        request: BoltRequest,
        handler: Box<dyn ResponseHandler>,
        scope: Option<TransactionId>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

enum Pending {
    Handler {
        handler: Box<dyn ResponseHandler>,
        scope: Option<TransactionId>,
    },
    Reset,
}

// ============================================================================
// ConnectionHandle - 디스패처 핸들
// ============================================================================

/// 디스패처로 요청을 보내는 핸들
///
/// 모든 핸들이 사라지면 디스패처는 남은 응답을 처리한 뒤 연결을 닫습니다.
#[derive(Clone)]
pub(crate) struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

impl ConnectionHandle {
    /// 연결을 넘겨받아 디스패처 태스크 시작
    pub(crate) fn spawn<C: Connection>(connection: C) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(Dispatcher::new(connection).run(rx));
        Self { commands }
    }

    /// 요청 전송 (호출 즉시 대기열에 들어감)
    pub(crate) fn send(&self, request: BoltRequest, handler: Box<dyn ResponseHandler>) {
        self.enqueue(request, handler, None);
    }

    /// 트랜잭션에 묶인 요청 전송
    ///
    /// 트랜잭션이 서버 실패로 이미 끝났다면 쓰지 않습니다. ROLLBACK은 성공으로,
    /// 나머지는 그 실패로 응답합니다.
    pub(crate) fn send_in(
        &self,
        scope: TransactionId,
        request: BoltRequest,
        handler: Box<dyn ResponseHandler>,
    ) {
        self.enqueue(request, handler, Some(scope));
    }

    fn enqueue(
        &self,
        request: BoltRequest,
        handler: Box<dyn ResponseHandler>,
        scope: Option<TransactionId>,
    ) {
        if let Err(mpsc::error::SendError(Command::Send { handler, .. })) =
            self.commands.send(Command::Send { request, handler, scope })
        {
            handler.on_failure(connection_closed());
        }
    }

    /// 이미 보낸 요청이 끝난 뒤 연결 닫기
    pub(crate) async fn close(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Close { done }).is_ok() {
            let _ = wait.await;
        }
    }

    /// 디스패처 종료 여부
    pub(crate) fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

fn connection_closed() -> DriverError {
    DriverError::service_unavailable("Connection to the database has been closed")
}

// ============================================================================
// Writer - 쓰기 태스크
// ============================================================================

/// 요청을 받은 순서대로 쓰고, 채널이 닫히면 연결의 쓰기 쪽을 닫습니다.
async fn write_requests<C: Connection>(
    mut writer: SplitSink<C, BoltRequest>,
    mut requests: mpsc::UnboundedReceiver<BoltRequest>,
) -> Result<(), DriverError> {
    while let Some(request) = requests.recv().await {
        tracing::trace!("C: {}", request.name());
        writer.send(request).await.map_err(|e| {
            DriverError::service_unavailable(format!("Failed to write to the database: {}", e))
        })?;
    }
    let _ = writer.close().await;
    Ok(())
}

// ============================================================================
// Dispatcher - 디스패처 루프
// ============================================================================

struct Dispatcher<C: Connection> {
    reader: SplitStream<C>,
    requests: mpsc::UnboundedSender<BoltRequest>,
    writer: JoinHandle<Result<(), DriverError>>,
    pending: VecDeque<Pending>,
    /// RESET으로 지워지기 전까지의 마지막 실패
    failure: Option<DriverError>,
    /// 서버 실패로 끝난 마지막 트랜잭션과 그 실패
    terminated: Option<(TransactionId, DriverError)>,
}

impl<C: Connection> Dispatcher<C> {
    fn new(connection: C) -> Self {
        let (writer, reader) = connection.split();
        let (requests, queue) = mpsc::unbounded_channel();
        Self {
            reader,
            requests,
            writer: tokio::spawn(write_requests(writer, queue)),
            pending: VecDeque::new(),
            failure: None,
            terminated: None,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut closing = false;
        let mut waiters = Vec::new();

        let broken = loop {
            if closing && self.pending.is_empty() {
                break None;
            }

            tokio::select! {
                command = commands.recv(), if !closing => match command {
                    Some(Command::Send { request, handler, scope }) => {
                        if let Err(error) = self.submit(request, handler, scope) {
                            break Some(error);
                        }
                    }
                    Some(Command::Close { done }) => {
                        closing = true;
                        waiters.push(done);
                    }
                    None => closing = true,
                },
                response = self.reader.next(), if !self.pending.is_empty() => match response {
                    Some(Ok(response)) => {
                        if let Err(error) = self.dispatch(response) {
                            break Some(error);
                        }
                    }
                    Some(Err(error)) => {
                        break Some(DriverError::service_unavailable(format!(
                            "Connection to the database failed: {}",
                            error
                        )));
                    }
                    None => {
                        break Some(DriverError::service_unavailable(
                            "Connection to the database terminated",
                        ));
                    }
                },
                written = &mut self.writer => {
                    break Some(match written {
                        Ok(Err(error)) => error,
                        _ => DriverError::service_unavailable("Connection writer stopped"),
                    });
                }
            }
        };

        let Self {
            requests,
            writer,
            pending,
            ..
        } = self;

        let error = match broken {
            Some(error) => {
                tracing::debug!(error = %error, "Connection broken");
                writer.abort();
                error
            }
            None => {
                let _ = requests.send(BoltRequest::Goodbye);
                drop(requests);
                let _ = writer.await;
                connection_closed()
            }
        };

        for pending in pending {
            if let Pending::Handler { handler, .. } = pending {
                handler.on_failure(error.clone());
            }
        }

        commands.close();
        while let Ok(command) = commands.try_recv() {
            match command {
                Command::Send { handler, .. } => handler.on_failure(error.clone()),
                Command::Close { done } => waiters.push(done),
            }
        }
        for done in waiters {
            let _ = done.send(());
        }
    }

    /// 요청을 쓰기 대기열에 넣거나, 끝난 트랜잭션의 요청이면 바로 응답
    fn submit(
        &mut self,
        request: BoltRequest,
        handler: Box<dyn ResponseHandler>,
        scope: Option<TransactionId>,
    ) -> Result<(), DriverError> {
        if let (Some(id), Some((terminated, error))) = (scope, &self.terminated) {
            if id == *terminated {
                tracing::debug!(request = request.name(), "Skipping request for terminated transaction");
                match request {
                    BoltRequest::Rollback => handler.on_success(Metadata::new()),
                    _ => handler.on_failure(error.clone()),
                }
                return Ok(());
            }
        }

        if let Err(error) = self.write(request) {
            handler.on_failure(error.clone());
            return Err(error);
        }
        self.pending.push_back(Pending::Handler { handler, scope });
        Ok(())
    }

    fn write(&mut self, request: BoltRequest) -> Result<(), DriverError> {
        self.requests
            .send(request)
            .map_err(|_| DriverError::service_unavailable("Connection writer stopped"))
    }

    fn dispatch(&mut self, response: BoltResponse) -> Result<(), DriverError> {
        tracing::trace!("S: {}", response.name());

        if let BoltResponse::Record(record) = response {
            return match self.pending.front_mut() {
                Some(Pending::Handler { handler, .. }) => {
                    handler.on_record(record.fields);
                    Ok(())
                }
                _ => Err(DriverError::protocol("RECORD received without a pending request")),
            };
        }

        let Some(pending) = self.pending.pop_front() else {
            return Err(DriverError::protocol(format!(
                "{} received without a pending request",
                response.name()
            )));
        };

        match (pending, response) {
            (Pending::Handler { handler, .. }, BoltResponse::Success(success)) => {
                handler.on_success(success.metadata);
            }
            (Pending::Handler { handler, scope }, BoltResponse::Failure(failure)) => {
                let error = DriverError::from(&failure);
                tracing::debug!(code = %failure.code, "Request failed");
                if let Some(id) = scope {
                    self.terminated = Some((id, error.clone()));
                }
                handler.on_failure(error.clone());
                self.failure = Some(error);
                if !self.pending.iter().any(|p| matches!(p, Pending::Reset)) {
                    self.write(BoltRequest::Reset)?;
                    self.pending.push_back(Pending::Reset);
                }
            }
            (Pending::Handler { handler, scope }, BoltResponse::Ignored) => {
                let error = self.failure.clone().unwrap_or_else(|| {
                    DriverError::protocol("Request ignored by the database without a prior failure")
                });
                if let Some(id) = scope {
                    if !matches!(&self.terminated, Some((current, _)) if *current == id) {
                        self.terminated = Some((id, error.clone()));
                    }
                }
                handler.on_failure(error);
            }
            (Pending::Reset, BoltResponse::Success(_)) => {
                self.failure = None;
            }
            (Pending::Reset, other) => {
                return Err(DriverError::protocol(format!(
                    "RESET answered with {}",
                    other.name()
                )));
            }
            (Pending::Handler { handler, .. }, BoltResponse::Record(_)) => {
                handler.on_failure(DriverError::protocol("Unexpected RECORD"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::{FailureMessage, PullMessage, RecordMessage, RunMessage, SuccessMessage};
    use crate::driver::connection::channel;
    use crate::driver::handlers::CompletionHandler;
    use crate::driver::transaction::TransactionTable;
    use crate::bolt::PackStreamValue;
    use std::sync::Arc;
    use parking_lot::Mutex;

    /// 받은 이벤트를 기록하는 핸들러
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn boxed(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Box<Self> {
            Box::new(Self { name, log: log.clone() })
        }
    }

    impl ResponseHandler for Recorder {
        fn on_record(&mut self, fields: Vec<PackStreamValue>) {
            self.log.lock().push(format!("{}:record:{}", self.name, fields.len()));
        }

        fn on_success(self: Box<Self>, _metadata: Metadata) {
            self.log.lock().push(format!("{}:success", self.name));
        }

        fn on_failure(self: Box<Self>, error: DriverError) {
            self.log.lock().push(format!("{}:failure:{}", self.name, error.code().unwrap_or("-")));
        }
    }

    fn run() -> BoltRequest {
        BoltRequest::Run(RunMessage::new("RETURN 1"))
    }

    fn pull() -> BoltRequest {
        BoltRequest::Pull(PullMessage::all())
    }

    fn success() -> BoltResponse {
        BoltResponse::Success(SuccessMessage::new())
    }

    #[tokio::test]
    async fn test_routes_in_fifo_order() {
        let (conn, mut server) = channel();
        let handle = ConnectionHandle::spawn(conn);
        let log = Arc::new(Mutex::new(Vec::new()));

        handle.send(run(), Recorder::boxed("run", &log));
        handle.send(pull(), Recorder::boxed("pull", &log));

        assert_eq!(server.recv().await.unwrap().name(), "RUN");
        assert_eq!(server.recv().await.unwrap().name(), "PULL");
        server.send(success()).unwrap();
        server
            .send(BoltResponse::Record(RecordMessage::new(vec![PackStreamValue::Integer(1)])))
            .unwrap();
        server.send(success()).unwrap();

        let (marker, completion) = CompletionHandler::new();
        handle.send(BoltRequest::Commit, marker);
        assert_eq!(server.recv().await.unwrap().name(), "COMMIT");
        server.send(success()).unwrap();
        completion.wait().await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["run:success", "pull:record:1", "pull:success"]
        );
    }

    #[tokio::test]
    async fn test_failure_triggers_reset_and_ignored() {
        let (conn, mut server) = channel();
        let handle = ConnectionHandle::spawn(conn);
        let log = Arc::new(Mutex::new(Vec::new()));

        handle.send(run(), Recorder::boxed("run", &log));
        handle.send(pull(), Recorder::boxed("pull", &log));
        server.recv().await.unwrap();
        server.recv().await.unwrap();

        server
            .send(BoltResponse::Failure(FailureMessage::new(
                "Neo.ClientError.Statement.SyntaxError",
                "bad",
            )))
            .unwrap();
        server.send(BoltResponse::Ignored).unwrap();

        assert_eq!(server.recv().await.unwrap(), BoltRequest::Reset);
        server.send(success()).unwrap();

        // RESET 이후 정상 동작
        let (marker, completion) = CompletionHandler::new();
        handle.send(BoltRequest::Rollback, marker);
        assert_eq!(server.recv().await.unwrap(), BoltRequest::Rollback);
        server.send(success()).unwrap();
        completion.wait().await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "run:failure:Neo.ClientError.Statement.SyntaxError",
                "pull:failure:Neo.ClientError.Statement.SyntaxError",
            ]
        );
    }

    #[tokio::test]
    async fn test_connection_loss_fails_pending_and_later_requests() {
        let (conn, mut server) = channel();
        let handle = ConnectionHandle::spawn(conn);

        let (first, first_done) = CompletionHandler::new();
        handle.send(BoltRequest::Commit, first);
        server.recv().await.unwrap();
        drop(server);

        let err = first_done.wait().await.unwrap_err();
        assert!(matches!(err, DriverError::ServiceUnavailable(_)));

        let (later, later_done) = CompletionHandler::new();
        handle.send(BoltRequest::Rollback, later);
        assert!(matches!(
            later_done.wait().await.unwrap_err(),
            DriverError::ServiceUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_close_waits_for_pending_then_says_goodbye() {
        let (conn, mut server) = channel();
        let handle = ConnectionHandle::spawn(conn);

        let (marker, completion) = CompletionHandler::new();
        handle.send(BoltRequest::Commit, marker);

        let closer = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.close().await })
        };

        assert_eq!(server.recv().await.unwrap(), BoltRequest::Commit);
        server.send(success()).unwrap();
        assert!(completion.wait().await.is_ok());

        assert_eq!(server.recv().await.unwrap(), BoltRequest::Goodbye);
        assert!(server.recv().await.is_none());
        closer.await.unwrap();
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_ignored_without_failure_is_protocol_error() {
        let (conn, mut server) = channel();
        let handle = ConnectionHandle::spawn(conn);

        let (marker, completion) = CompletionHandler::new();
        handle.send(BoltRequest::Commit, marker);
        server.recv().await.unwrap();
        server.send(BoltResponse::Ignored).unwrap();

        assert!(matches!(
            completion.wait().await.unwrap_err(),
            DriverError::Protocol(_)
        ));
    }

    #[tokio::test]
    async fn test_reset_failure_breaks_connection() {
        let (conn, mut server) = channel();
        let handle = ConnectionHandle::spawn(conn);
        let log = Arc::new(Mutex::new(Vec::new()));

        handle.send(run(), Recorder::boxed("run", &log));
        server.recv().await.unwrap();
        server
            .send(BoltResponse::Failure(FailureMessage::new("Neo.DatabaseError.General.UnknownError", "boom")))
            .unwrap();
        assert_eq!(server.recv().await.unwrap(), BoltRequest::Reset);
        server
            .send(BoltResponse::Failure(FailureMessage::new("Neo.DatabaseError.General.UnknownError", "again")))
            .unwrap();

        // 디스패처가 끝나면 이후 요청은 즉시 실패
        assert!(server.recv().await.is_none());
        let (marker, completion) = CompletionHandler::new();
        handle.send(BoltRequest::Rollback, marker);
        assert!(matches!(
            completion.wait().await.unwrap_err(),
            DriverError::ServiceUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_terminated_transaction_requests_answered_locally() {
        let (conn, mut server) = channel();
        let handle = ConnectionHandle::spawn(conn);
        let table = TransactionTable::new();
        let (tx, _) = table.open().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        handle.send_in(tx, run(), Recorder::boxed("run", &log));
        server.recv().await.unwrap();
        server
            .send(BoltResponse::Failure(FailureMessage::new(
                "Neo.TransientError.Transaction.DeadlockDetected",
                "deadlock",
            )))
            .unwrap();
        assert_eq!(server.recv().await.unwrap(), BoltRequest::Reset);

        // RESET 뒤로는 같은 트랜잭션의 요청을 쓰지 않음
        handle.send_in(tx, run(), Recorder::boxed("late-run", &log));
        handle.send_in(tx, BoltRequest::Commit, Recorder::boxed("commit", &log));
        handle.send_in(tx, BoltRequest::Rollback, Recorder::boxed("rollback", &log));
        server.send(success()).unwrap();

        let (marker, completion) = CompletionHandler::new();
        handle.send(BoltRequest::Rollback, marker);
        assert_eq!(server.recv().await.unwrap(), BoltRequest::Rollback);
        server.send(success()).unwrap();
        completion.wait().await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "run:failure:Neo.TransientError.Transaction.DeadlockDetected",
                "late-run:failure:Neo.TransientError.Transaction.DeadlockDetected",
                "commit:failure:Neo.TransientError.Transaction.DeadlockDetected",
                "rollback:success",
            ]
        );
    }

    #[tokio::test]
    async fn test_other_transactions_still_written() {
        let (conn, mut server) = channel();
        let handle = ConnectionHandle::spawn(conn);
        let table = TransactionTable::new();
        let (failed, _) = table.open().unwrap();
        table.release(failed);
        let (next, _) = table.open().unwrap();

        let (first, first_done) = CompletionHandler::new();
        handle.send_in(failed, BoltRequest::Commit, first);
        server.recv().await.unwrap();
        server
            .send(BoltResponse::Failure(FailureMessage::new(
                "Neo.ClientError.Transaction.TransactionNotFound",
                "gone",
            )))
            .unwrap();
        assert_eq!(server.recv().await.unwrap(), BoltRequest::Reset);
        server.send(success()).unwrap();
        assert!(first_done.wait().await.is_err());

        let (second, second_done) = CompletionHandler::new();
        handle.send_in(next, BoltRequest::Rollback, second);
        assert_eq!(server.recv().await.unwrap(), BoltRequest::Rollback);
        server.send(success()).unwrap();
        assert!(second_done.wait().await.is_ok());
    }

    /// 허용된 수만큼만 쓰기를 받아들이는 연결
    struct GatedConnection {
        inner: crate::driver::connection::ChannelConnection,
        gate: Arc<Mutex<(usize, Option<std::task::Waker>)>>,
    }

    impl futures::Sink<BoltRequest> for GatedConnection {
        type Error = crate::bolt::BoltError;

        fn poll_ready(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            {
                let mut gate = self.gate.lock();
                if gate.0 == 0 {
                    gate.1 = Some(cx.waker().clone());
                    return std::task::Poll::Pending;
                }
            }
            std::pin::Pin::new(&mut self.inner).poll_ready(cx)
        }

        fn start_send(mut self: std::pin::Pin<&mut Self>, item: BoltRequest) -> Result<(), Self::Error> {
            self.gate.lock().0 -= 1;
            std::pin::Pin::new(&mut self.inner).start_send(item)
        }

        fn poll_flush(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            std::pin::Pin::new(&mut self.inner).poll_flush(cx)
        }

        fn poll_close(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Result<(), Self::Error>> {
            std::pin::Pin::new(&mut self.inner).poll_close(cx)
        }
    }

    impl futures::Stream for GatedConnection {
        type Item = crate::bolt::BoltResult<BoltResponse>;

        fn poll_next(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Self::Item>> {
            std::pin::Pin::new(&mut self.inner).poll_next(cx)
        }
    }

    #[tokio::test]
    async fn test_reads_while_a_write_is_blocked() {
        let (inner, mut server) = channel();
        let gate = Arc::new(Mutex::new((1, None)));
        let handle = ConnectionHandle::spawn(GatedConnection { inner, gate: gate.clone() });

        let (first, first_done) = CompletionHandler::new();
        let (second, second_done) = CompletionHandler::new();
        handle.send(BoltRequest::Commit, first);
        handle.send(BoltRequest::Rollback, second);

        // 두 번째 쓰기가 막혀 있어도 첫 응답은 읽힘
        assert_eq!(server.recv().await.unwrap(), BoltRequest::Commit);
        server.send(success()).unwrap();
        first_done.wait().await.unwrap();

        let waker = {
            let mut gate = gate.lock();
            gate.0 = 1;
            gate.1.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        assert_eq!(server.recv().await.unwrap(), BoltRequest::Rollback);
        server.send(success()).unwrap();
        second_done.wait().await.unwrap();
    }
}
