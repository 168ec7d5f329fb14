//! In-memory graph server for integration tests.
//!
//! Speaks the message-level protocol over [`channel`] connections and runs a
//! tiny query language: `UNWIND`, `CREATE`, `MATCH` and `RETURN` clauses over
//! integer, string, list, `range(..)`, `count(..)` and `/` expressions.
//! Transactions buffer their writes until `COMMIT`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Once};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use zeta4g_async_driver::bolt::{
    BoltErrorCode, FailureMessage, PackStreamNode, RecordMessage, SuccessMessage,
};
use zeta4g_async_driver::driver::{
    channel, ChannelConnection, Connector, Driver, DriverConfig, RetrySettings, ServerAddress,
    ServerEndpoint, Session, SessionConfig,
};
use zeta4g_async_driver::{BoltError, BoltRequest, BoltResponse, PackStreamValue};

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Retry settings small enough for tests.
pub fn fast_retry() -> RetrySettings {
    RetrySettings::default()
        .with_initial_delay(Duration::from_millis(5))
        .with_max_retry_time(Duration::from_secs(5))
}

// ============================================================================
// FakeServer
// ============================================================================

#[derive(Debug, Clone)]
struct StoredNode {
    id: i64,
    labels: Vec<String>,
    properties: HashMap<String, PackStreamValue>,
}

impl StoredNode {
    fn to_value(&self) -> PackStreamValue {
        PackStreamValue::Node(PackStreamNode {
            id: self.id,
            labels: self.labels.clone(),
            properties: self.properties.clone(),
        })
    }
}

#[derive(Default)]
struct Database {
    nodes: Vec<StoredNode>,
    next_id: i64,
    bookmark: u64,
    requests: Vec<BoltRequest>,
    connections: usize,
    fail_next_commit: Option<(String, String)>,
    killed: bool,
}

impl Database {
    fn next_bookmark(&mut self) -> String {
        self.bookmark += 1;
        format!("bookmark:{}", self.bookmark)
    }
}

/// Shared fake server; every `connect` opens a new in-memory connection.
#[derive(Clone)]
pub struct FakeServer {
    db: Arc<Mutex<Database>>,
    kill: Arc<watch::Sender<bool>>,
}

impl FakeServer {
    pub fn new() -> Self {
        init_tracing();
        let (kill, _) = watch::channel(false);
        Self {
            db: Arc::new(Mutex::new(Database::default())),
            kill: Arc::new(kill),
        }
    }

    /// Driver with fast retries over this server.
    pub fn driver(&self) -> Driver<FakeServer> {
        let config = DriverConfig::builder("bolt://fake:7687")
            .expect("valid uri")
            .with_retry_settings(fast_retry())
            .build()
            .expect("valid config");
        Driver::new(config, self.clone()).expect("driver")
    }

    /// Session on a fresh connection.
    pub async fn session(&self) -> Session {
        self.driver()
            .session(SessionConfig::default())
            .await
            .expect("session")
    }

    /// Committed nodes carrying `label`.
    pub fn count_nodes(&self, label: &str) -> usize {
        self.db
            .lock()
            .nodes
            .iter()
            .filter(|n| n.labels.iter().any(|l| l == label))
            .count()
    }

    /// Names of every request received so far, in order.
    pub fn request_names(&self) -> Vec<&'static str> {
        self.db.lock().requests.iter().map(|r| r.name()).collect()
    }

    pub fn requests(&self) -> Vec<BoltRequest> {
        self.db.lock().requests.clone()
    }

    pub fn connections(&self) -> usize {
        self.db.lock().connections
    }

    /// Fail the next COMMIT with the given server code.
    pub fn fail_next_commit(&self, code: &str, message: &str) {
        self.db.lock().fail_next_commit = Some((code.to_string(), message.to_string()));
    }

    /// Drop every open connection and refuse new ones.
    pub fn kill(&self) {
        self.db.lock().killed = true;
        let _ = self.kill.send(true);
    }
}

impl Connector for FakeServer {
    type Connection = ChannelConnection;

    async fn connect(&self, address: &ServerAddress) -> Result<ChannelConnection, BoltError> {
        {
            let mut db = self.db.lock();
            if db.killed {
                return Err(BoltError::Connection(format!("{} is down", address)));
            }
            db.connections += 1;
        }
        let (connection, endpoint) = channel();
        let db = self.db.clone();
        let kill = self.kill.subscribe();
        tokio::spawn(serve(endpoint, db, kill));
        Ok(connection)
    }
}

// ============================================================================
// Connection loop
// ============================================================================

#[derive(Default)]
struct ConnectionState {
    failed: bool,
    transaction: Option<Vec<StoredNode>>,
    pending: Option<Statement>,
}

async fn serve(mut endpoint: ServerEndpoint, db: Arc<Mutex<Database>>, mut kill: watch::Receiver<bool>) {
    let mut state = ConnectionState::default();

    loop {
        let request = tokio::select! {
            _ = kill.changed() => break,
            request = endpoint.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };
        db.lock().requests.push(request.clone());

        if state.failed && !matches!(request, BoltRequest::Reset | BoltRequest::Goodbye) {
            let _ = endpoint.send(BoltResponse::Ignored);
            continue;
        }

        match request {
            BoltRequest::Goodbye => break,
            BoltRequest::Reset => {
                state = ConnectionState::default();
                let _ = endpoint.send(success());
            }
            BoltRequest::Begin(_) => {
                if state.transaction.is_some() {
                    fail(&endpoint, &mut state, BoltErrorCode::REQUEST_INVALID, "Transaction already open");
                } else {
                    state.transaction = Some(Vec::new());
                    let _ = endpoint.send(success());
                }
            }
            BoltRequest::Commit => {
                let Some(created) = state.transaction.take() else {
                    fail(&endpoint, &mut state, BoltErrorCode::REQUEST_INVALID, "No open transaction");
                    continue;
                };
                let injected = db.lock().fail_next_commit.take();
                if let Some((code, message)) = injected {
                    fail(&endpoint, &mut state, &code, &message);
                    continue;
                }
                let bookmark = {
                    let mut db = db.lock();
                    db.nodes.extend(created);
                    db.next_bookmark()
                };
                let _ = endpoint.send(BoltResponse::Success(SuccessMessage::with_bookmark(bookmark)));
            }
            BoltRequest::Rollback => {
                state.transaction = None;
                let _ = endpoint.send(success());
            }
            BoltRequest::Run(run) => {
                if run.query.trim() == "CALL test.hang()" {
                    let _ = kill.changed().await;
                    break;
                }
                match Statement::parse(&run.query, run.parameters) {
                    Ok(statement) => {
                        let fields = statement.fields();
                        state.pending = Some(statement);
                        let _ = endpoint.send(BoltResponse::Success(SuccessMessage::with_fields(&fields)));
                    }
                    Err((code, message)) => fail(&endpoint, &mut state, code, &message),
                }
            }
            BoltRequest::Pull(_) => {
                let Some(statement) = state.pending.take() else {
                    fail(&endpoint, &mut state, BoltErrorCode::REQUEST_INVALID, "Nothing to pull");
                    continue;
                };
                pull(&endpoint, &db, &mut state, statement);
            }
        }
    }
}

fn success() -> BoltResponse {
    BoltResponse::Success(SuccessMessage::new())
}

fn fail(endpoint: &ServerEndpoint, state: &mut ConnectionState, code: &str, message: &str) {
    state.failed = true;
    let _ = endpoint.send(BoltResponse::Failure(FailureMessage::new(code, message)));
}

fn pull(endpoint: &ServerEndpoint, db: &Arc<Mutex<Database>>, state: &mut ConnectionState, statement: Statement) {
    let outcome = {
        let mut db = db.lock();
        let mut visible = db.nodes.clone();
        if let Some(pending) = &state.transaction {
            visible.extend(pending.iter().cloned());
        }
        let mut next_id = db.next_id;
        let outcome = statement.execute(&visible, &mut next_id);
        db.next_id = next_id;
        outcome
    };

    for row in outcome.records {
        let _ = endpoint.send(BoltResponse::Record(RecordMessage::new(row)));
    }
    if let Some((code, message)) = outcome.error {
        fail(endpoint, state, code, &message);
        return;
    }

    let mut done = SuccessMessage::new();
    done.insert("type", statement.query_type());
    done.insert("t_last", 0i64);
    if !outcome.created.is_empty() {
        let properties: usize = outcome.created.iter().map(|n| n.properties.len()).sum();
        let labels: usize = outcome.created.iter().map(|n| n.labels.len()).sum();
        let mut stats = HashMap::new();
        stats.insert("nodes-created".to_string(), PackStreamValue::Integer(outcome.created.len() as i64));
        stats.insert("labels-added".to_string(), PackStreamValue::Integer(labels as i64));
        stats.insert("properties-set".to_string(), PackStreamValue::Integer(properties as i64));
        done.insert("stats", stats);
    }

    match &mut state.transaction {
        Some(pending) => pending.extend(outcome.created),
        None => {
            let mut db = db.lock();
            db.nodes.extend(outcome.created);
            let bookmark = db.next_bookmark();
            done.insert("bookmark", bookmark);
        }
    }
    let _ = endpoint.send(BoltResponse::Success(done));
}

// ============================================================================
// Query language
// ============================================================================

type Failure = (&'static str, String);
type Row = HashMap<String, PackStreamValue>;

#[derive(Debug, Clone)]
enum Expr {
    Int(i64),
    Str(String),
    Param(String),
    Var(String),
    List(Vec<Expr>),
    Range(Vec<Expr>),
    Count(String),
    Div(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone)]
enum Clause {
    Unwind { list: Expr, var: String },
    Create { var: Option<String>, label: Option<String>, properties: Vec<(String, Expr)> },
    Match { var: String, label: Option<String> },
    Return { items: Vec<(Expr, String)> },
}

struct Outcome {
    records: Vec<Vec<PackStreamValue>>,
    error: Option<Failure>,
    created: Vec<StoredNode>,
}

struct Statement {
    clauses: Vec<Clause>,
    parameters: HashMap<String, PackStreamValue>,
}

impl Statement {
    fn parse(text: &str, parameters: HashMap<String, PackStreamValue>) -> Result<Self, Failure> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { text, tokens, pos: 0 };
        let mut clauses = Vec::new();
        while !parser.at_end() {
            clauses.push(parser.clause()?);
        }
        if clauses.is_empty() {
            return Err(syntax("Unexpected end of input"));
        }
        Ok(Self { clauses, parameters })
    }

    fn fields(&self) -> Vec<String> {
        match self.clauses.last() {
            Some(Clause::Return { items }) => items.iter().map(|(_, name)| name.clone()).collect(),
            _ => Vec::new(),
        }
    }

    fn query_type(&self) -> &'static str {
        let writes = self.clauses.iter().any(|c| matches!(c, Clause::Create { .. }));
        let reads = matches!(self.clauses.last(), Some(Clause::Return { .. }));
        match (writes, reads) {
            (true, true) => "rw",
            (true, false) => "w",
            _ => "r",
        }
    }

    fn execute(&self, visible: &[StoredNode], next_id: &mut i64) -> Outcome {
        let mut outcome = Outcome {
            records: Vec::new(),
            error: None,
            created: Vec::new(),
        };
        let mut rows: Vec<Row> = vec![Row::new()];

        for clause in &self.clauses {
            match clause {
                Clause::Unwind { list, var } => {
                    let mut expanded = Vec::new();
                    for row in &rows {
                        match self.eval(list, row, 0) {
                            Ok(PackStreamValue::List(items)) => {
                                for item in items {
                                    let mut next = row.clone();
                                    next.insert(var.clone(), item);
                                    expanded.push(next);
                                }
                            }
                            Ok(other) => {
                                outcome.error = Some(type_error(other.kind()));
                                return outcome;
                            }
                            Err(e) => {
                                outcome.error = Some(e);
                                return outcome;
                            }
                        }
                    }
                    rows = expanded;
                }
                Clause::Match { var, label } => {
                    let mut matched = Vec::new();
                    for row in &rows {
                        let candidates = visible.iter().chain(outcome.created.iter());
                        for node in candidates {
                            if label.as_ref().map_or(true, |l| node.labels.contains(l)) {
                                let mut next = row.clone();
                                next.insert(var.clone(), node.to_value());
                                matched.push(next);
                            }
                        }
                    }
                    rows = matched;
                }
                Clause::Create { var, label, properties } => {
                    for row in &mut rows {
                        let mut props = HashMap::new();
                        for (key, expr) in properties {
                            match self.eval(expr, row, 0) {
                                Ok(value) => {
                                    props.insert(key.clone(), value);
                                }
                                Err(e) => {
                                    outcome.error = Some(e);
                                    return outcome;
                                }
                            }
                        }
                        let node = StoredNode {
                            id: *next_id,
                            labels: label.iter().cloned().collect(),
                            properties: props,
                        };
                        *next_id += 1;
                        if let Some(var) = var {
                            row.insert(var.clone(), node.to_value());
                        }
                        outcome.created.push(node);
                    }
                }
                Clause::Return { items } => {
                    let aggregate = items.iter().any(|(e, _)| matches!(e, Expr::Count(_)));
                    if aggregate {
                        let empty = Row::new();
                        let first = rows.first().unwrap_or(&empty);
                        let mut record = Vec::new();
                        for (expr, _) in items {
                            match self.eval(expr, first, rows.len()) {
                                Ok(value) => record.push(value),
                                Err(e) => {
                                    outcome.error = Some(e);
                                    return outcome;
                                }
                            }
                        }
                        outcome.records.push(record);
                    } else {
                        for row in &rows {
                            let mut record = Vec::new();
                            for (expr, _) in items {
                                match self.eval(expr, row, 0) {
                                    Ok(value) => record.push(value),
                                    Err(e) => {
                                        outcome.error = Some(e);
                                        return outcome;
                                    }
                                }
                            }
                            outcome.records.push(record);
                        }
                    }
                }
            }
        }
        outcome
    }

    fn eval(&self, expr: &Expr, row: &Row, count: usize) -> Result<PackStreamValue, Failure> {
        match expr {
            Expr::Int(i) => Ok(PackStreamValue::Integer(*i)),
            Expr::Str(s) => Ok(PackStreamValue::String(s.clone())),
            Expr::Param(name) => self.parameters.get(name).cloned().ok_or_else(|| {
                (
                    BoltErrorCode::PARAMETER_MISSING,
                    format!("Expected parameter(s): {}", name),
                )
            }),
            Expr::Var(name) => row.get(name).cloned().ok_or_else(|| {
                (BoltErrorCode::SYNTAX_ERROR, format!("Variable `{}` not defined", name))
            }),
            Expr::List(items) => items
                .iter()
                .map(|e| self.eval(e, row, count))
                .collect::<Result<Vec<_>, _>>()
                .map(PackStreamValue::List),
            Expr::Range(args) => {
                let ints = args
                    .iter()
                    .map(|e| self.eval(e, row, count).and_then(|v| as_int(&v)))
                    .collect::<Result<Vec<_>, _>>()?;
                let (start, end) = (ints[0], ints[1]);
                let step = ints.get(2).copied().unwrap_or(1);
                if step <= 0 {
                    return Err((BoltErrorCode::ARITHMETIC_ERROR, "Step must be positive".to_string()));
                }
                let mut values = Vec::new();
                let mut i = start;
                while i <= end {
                    values.push(PackStreamValue::Integer(i));
                    i += step;
                }
                Ok(PackStreamValue::List(values))
            }
            Expr::Count(_) => Ok(PackStreamValue::Integer(count as i64)),
            Expr::Div(lhs, rhs) => {
                let lhs = as_int(&self.eval(lhs, row, count)?)?;
                let rhs = as_int(&self.eval(rhs, row, count)?)?;
                if rhs == 0 {
                    return Err((BoltErrorCode::ARITHMETIC_ERROR, "/ by zero".to_string()));
                }
                Ok(PackStreamValue::Integer(lhs / rhs))
            }
        }
    }
}

fn as_int(value: &PackStreamValue) -> Result<i64, Failure> {
    value.as_int().ok_or_else(|| type_error(value.kind()))
}

fn syntax(message: &str) -> Failure {
    (BoltErrorCode::SYNTAX_ERROR, message.to_string())
}

fn type_error(found: &str) -> Failure {
    (
        "Neo.ClientError.Statement.TypeError",
        format!("Unexpected value of type {}", found),
    )
}

// ============================================================================
// Tokenizer / parser
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Int(i64),
    Str(String),
    Param(String),
    Punct(char),
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize, usize)>, Failure> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let mut j = i;
            while j < chars.len() && chars[j].1.is_ascii_digit() {
                j += 1;
            }
            let end = chars.get(j).map_or(text.len(), |(p, _)| *p);
            let value = text[start..end].parse().map_err(|_| syntax("Integer too large"))?;
            tokens.push((Token::Int(value), start, end));
            i = j;
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let mut j = i + 1;
            while j < chars.len() && (chars[j].1.is_alphanumeric() || chars[j].1 == '_' || chars[j].1 == '.') {
                j += 1;
            }
            let end = chars.get(j).map_or(text.len(), |(p, _)| *p);
            let word = &text[start..end];
            let token = match word.strip_prefix('$') {
                Some(name) => Token::Param(name.to_string()),
                None => Token::Word(word.to_string()),
            };
            tokens.push((token, start, end));
            i = j;
        } else if c == '\'' || c == '"' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1 != c {
                j += 1;
            }
            if j == chars.len() {
                return Err(syntax("Unterminated string literal"));
            }
            let end = chars[j].0 + 1;
            tokens.push((Token::Str(text[start + 1..end - 1].to_string()), start, end));
            i = j + 1;
        } else {
            tokens.push((Token::Punct(c), start, start + c.len_utf8()));
            i += 1;
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<(Token, usize, usize)>,
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _, _)| t)
    }

    fn advance(&mut self) -> Result<Token, Failure> {
        let token = self
            .tokens
            .get(self.pos)
            .map(|(t, _, _)| t.clone())
            .ok_or_else(|| syntax("Unexpected end of input"))?;
        self.pos += 1;
        Ok(token)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn at_clause_start(&self) -> bool {
        ["UNWIND", "CREATE", "MATCH", "RETURN"].iter().any(|k| self.is_keyword(k))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), Failure> {
        if self.is_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(syntax(&format!("Expected {}", keyword)))
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<(), Failure> {
        match self.advance()? {
            Token::Punct(p) if p == c => Ok(()),
            other => Err(syntax(&format!("Expected '{}' but found {:?}", c, other))),
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> Result<String, Failure> {
        match self.advance()? {
            Token::Word(w) => Ok(w),
            other => Err(syntax(&format!("Expected identifier but found {:?}", other))),
        }
    }

    fn clause(&mut self) -> Result<Clause, Failure> {
        let keyword = self.word()?.to_ascii_uppercase();
        match keyword.as_str() {
            "UNWIND" => {
                let list = self.expr()?;
                self.expect_keyword("AS")?;
                let var = self.word()?;
                Ok(Clause::Unwind { list, var })
            }
            "CREATE" => {
                let (var, label, properties) = self.node_pattern()?;
                Ok(Clause::Create { var, label, properties })
            }
            "MATCH" => {
                let (var, label, _) = self.node_pattern()?;
                let var = var.ok_or_else(|| syntax("MATCH needs a variable"))?;
                Ok(Clause::Match { var, label })
            }
            "RETURN" => {
                if self.at_end() {
                    return Err(syntax("Unexpected end of input"));
                }
                let mut items = Vec::new();
                loop {
                    let start = self.tokens[self.pos].1;
                    let expr = self.expr()?;
                    let end = self.tokens[self.pos - 1].2;
                    let name = if self.is_keyword("AS") {
                        self.pos += 1;
                        self.word()?
                    } else {
                        self.text[start..end].trim().to_string()
                    };
                    items.push((expr, name));
                    if !self.eat_punct(',') {
                        break;
                    }
                }
                if !self.at_end() && !self.at_clause_start() {
                    return Err(syntax("Unexpected input after RETURN"));
                }
                Ok(Clause::Return { items })
            }
            other => Err(syntax(&format!("Invalid input '{}'", other))),
        }
    }

    fn node_pattern(&mut self) -> Result<(Option<String>, Option<String>, Vec<(String, Expr)>), Failure> {
        self.expect_punct('(')?;
        let mut var = None;
        let mut label = None;
        let mut properties = Vec::new();

        if matches!(self.peek(), Some(Token::Word(_))) {
            var = Some(self.word()?);
        }
        if self.eat_punct(':') {
            label = Some(self.word()?);
        }
        if self.eat_punct('{') {
            if !self.eat_punct('}') {
                loop {
                    let key = self.word()?;
                    self.expect_punct(':')?;
                    properties.push((key, self.expr()?));
                    if !self.eat_punct(',') {
                        break;
                    }
                }
                self.expect_punct('}')?;
            }
        }
        self.expect_punct(')')?;
        Ok((var, label, properties))
    }

    fn expr(&mut self) -> Result<Expr, Failure> {
        let lhs = self.atom()?;
        if self.eat_punct('/') {
            let rhs = self.atom()?;
            return Ok(Expr::Div(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn atom(&mut self) -> Result<Expr, Failure> {
        match self.advance()? {
            Token::Int(i) => Ok(Expr::Int(i)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Param(p) => Ok(Expr::Param(p)),
            Token::Punct('-') => match self.advance()? {
                Token::Int(i) => Ok(Expr::Int(-i)),
                other => Err(syntax(&format!("Invalid input {:?}", other))),
            },
            Token::Punct('[') => {
                let mut items = Vec::new();
                if !self.eat_punct(']') {
                    loop {
                        items.push(self.expr()?);
                        if !self.eat_punct(',') {
                            break;
                        }
                    }
                    self.expect_punct(']')?;
                }
                Ok(Expr::List(items))
            }
            Token::Word(w) if w.eq_ignore_ascii_case("range") => {
                self.expect_punct('(')?;
                let mut args = vec![self.expr()?];
                while self.eat_punct(',') {
                    args.push(self.expr()?);
                }
                self.expect_punct(')')?;
                if !(2..=3).contains(&args.len()) {
                    return Err(syntax("range() takes two or three arguments"));
                }
                Ok(Expr::Range(args))
            }
            Token::Word(w) if w.eq_ignore_ascii_case("count") => {
                self.expect_punct('(')?;
                let var = self.word()?;
                self.expect_punct(')')?;
                Ok(Expr::Count(var))
            }
            Token::Word(w) => Ok(Expr::Var(w)),
            other => Err(syntax(&format!("Invalid input {:?}", other))),
        }
    }
}
