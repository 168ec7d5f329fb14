//! Driver
//!
//! 드라이버 인스턴스 및 설정

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use super::connection::Connector;
use super::error::{DriverError, DriverResult};
use super::retry::RetrySettings;
use super::session::{Session, SessionConfig};

/// 기본 Bolt 포트
pub const DEFAULT_PORT: u16 = 7687;

const SCHEMES: &[&str] = &["bolt", "bolt+s", "bolt+ssc", "zeta4g", "zeta4g+s", "zeta4g+ssc"];

// ============================================================================
// ServerAddress - 서버 주소
// ============================================================================

/// 서버 주소
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
}

impl ServerAddress {
    /// 새 서버 주소 생성
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// URI에서 파싱 (`bolt://host[:port]`, 스킴 생략 가능)
    pub fn from_uri(uri: &str) -> DriverResult<Self> {
        let authority = match uri.split_once("://") {
            Some((scheme, rest)) => {
                if !SCHEMES.contains(&scheme) {
                    return Err(DriverError::configuration(format!(
                        "Unsupported URI scheme: {}",
                        scheme
                    )));
                }
                rest
            }
            None => uri,
        };
        let authority = authority.trim_end_matches('/');

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|_| {
                    DriverError::configuration(format!("Invalid port in address: {}", uri))
                })?;
                (host, port)
            }
            None => (authority, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(DriverError::configuration(format!("Missing host in address: {}", uri)));
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

// ============================================================================
// DriverConfig - 드라이버 설정
// ============================================================================

/// 드라이버 설정
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// 서버 주소
    pub address: ServerAddress,
    /// 연결 타임아웃
    pub connection_timeout: Duration,
    /// 트랜잭션 함수 재시도 설정
    pub retry: RetrySettings,
}

impl DriverConfig {
    /// URI로 설정 생성
    pub fn new(uri: &str) -> DriverResult<Self> {
        Ok(Self {
            address: ServerAddress::from_uri(uri)?,
            ..Self::default()
        })
    }

    /// 빌더 시작
    pub fn builder(uri: &str) -> DriverResult<DriverConfigBuilder> {
        Ok(DriverConfigBuilder {
            config: Self::new(uri)?,
        })
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: ServerAddress::default(),
            connection_timeout: Duration::from_secs(30),
            retry: RetrySettings::default(),
        }
    }
}

/// 드라이버 설정 빌더
#[derive(Debug)]
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    /// 연결 타임아웃 설정
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// 최대 트랜잭션 재시도 시간 설정
    pub fn with_max_transaction_retry_time(mut self, time: Duration) -> Self {
        self.config.retry.max_retry_time = time;
        self
    }

    /// 재시도 설정 전체 교체
    pub fn with_retry_settings(mut self, retry: RetrySettings) -> Self {
        self.config.retry = retry;
        self
    }

    /// 빌드
    pub fn build(self) -> DriverResult<DriverConfig> {
        self.config.retry.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Driver - 드라이버
// ============================================================================

/// 그래프 데이터베이스 드라이버
///
/// 세션마다 [`Connector`]로 새 연결을 엽니다.
pub struct Driver<C: Connector> {
    config: Arc<DriverConfig>,
    connector: C,
    open: RwLock<bool>,
}

impl<C: Connector> Driver<C> {
    /// 새 드라이버 생성
    pub fn new(config: DriverConfig, connector: C) -> DriverResult<Self> {
        config.retry.validate()?;
        Ok(Self {
            config: Arc::new(config),
            connector,
            open: RwLock::new(true),
        })
    }

    /// 세션 생성 (연결을 열 때까지 대기)
    pub async fn session(&self, config: SessionConfig) -> DriverResult<Session> {
        self.ensure_open()?;

        let address = &self.config.address;
        let connection = tokio::time::timeout(
            self.config.connection_timeout,
            self.connector.connect(address),
        )
        .await
        .map_err(|_| {
            DriverError::service_unavailable(format!(
                "Timed out after {:?} connecting to {}",
                self.config.connection_timeout, address
            ))
        })?
        .map_err(|e| {
            DriverError::service_unavailable(format!("Unable to connect to {}: {}", address, e))
        })?;

        tracing::debug!(%address, "Session connection opened");
        Session::new(connection, config, self.config.retry.clone())
    }

    /// 드라이버 설정
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 열림 여부
    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    /// 드라이버 종료
    ///
    /// 새 세션만 막습니다. 이미 만든 세션은 열린 채로 남으므로 각자 닫아야
    /// 합니다.
    pub fn close(&self) {
        *self.open.write() = false;
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DriverError::session("Driver is closed"))
        }
    }
}

impl<C: Connector> fmt::Debug for Driver<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("address", &self.config.address)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
