//! Transaction Retry
//!
//! 트랜잭션 함수 재시도 (지수 백오프 + 지터)
//!
//! 재시도 판단은 두 단계로 나뉩니다.
//!
//! - [`classify`]: 에러 하나를 보고 재시도 가능 여부를 결정하는 순수 함수
//! - [`RetryState`]: 시도 횟수, 경과 시간, 이전 실패를 추적하며 다음 행동을 결정
//!
//! [`ExponentialBackoffRetryLogic::retry`]는 둘을 묶어 작업을 반복 실행합니다.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use super::error::{DriverError, DriverResult, ErrorKind};
use crate::bolt::BoltErrorCode;

// ============================================================================
// RetrySettings - 재시도 설정
// ============================================================================

/// 재시도 설정
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    /// 첫 시도부터 재시도를 멈출 때까지의 최대 시간
    pub max_retry_time: Duration,
    /// 첫 재시도 전 대기 시간
    pub initial_delay: Duration,
    /// 대기 시간 배수
    pub multiplier: f64,
    /// 지터 비율 (0.0 ~ 1.0)
    pub jitter_factor: f64,
}

impl RetrySettings {
    /// 기본 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 최대 재시도 시간 설정
    pub fn with_max_retry_time(mut self, time: Duration) -> Self {
        self.max_retry_time = time;
        self
    }

    /// 초기 대기 시간 설정
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// 배수 설정
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// 지터 비율 설정
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// 재시도 비활성화 (첫 실패를 그대로 보고)
    pub fn disabled() -> Self {
        Self::default().with_max_retry_time(Duration::ZERO)
    }

    /// 설정 검증
    pub fn validate(&self) -> DriverResult<()> {
        if !(self.multiplier >= 1.0) {
            return Err(DriverError::configuration(format!(
                "Retry multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(DriverError::configuration(format!(
                "Retry jitter factor must be within [0.0, 1.0], got {}",
                self.jitter_factor
            )));
        }
        Ok(())
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retry_time: Duration::from_secs(30),
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

// ============================================================================
// Classification - 에러 분류
// ============================================================================

/// 재시도 가능 여부
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// 새 트랜잭션으로 다시 시도 가능
    Retryable,
    /// 즉시 보고
    NonRetryable,
}

impl Retryability {
    /// 재시도 가능 여부
    pub fn is_retryable(self) -> bool {
        self == Retryability::Retryable
    }
}

/// 에러 분류
///
/// 서비스 불가와 세션 만료는 항상 재시도합니다. 일시적 에러는 클라이언트가
/// 스스로 종료한 트랜잭션 코드만 제외합니다.
pub fn classify(error: &DriverError) -> Retryability {
    match error.kind() {
        ErrorKind::ServiceUnavailable | ErrorKind::SessionExpired => Retryability::Retryable,
        ErrorKind::Transient => match error.code() {
            Some(BoltErrorCode::TRANSACTION_TERMINATED)
            | Some(BoltErrorCode::LOCK_CLIENT_STOPPED) => Retryability::NonRetryable,
            _ => Retryability::Retryable,
        },
        ErrorKind::Client | ErrorKind::Database => Retryability::NonRetryable,
    }
}

// ============================================================================
// RetryState - 재시도 상태
// ============================================================================

/// 실패 후 다음 행동
#[derive(Debug)]
pub enum RetryDecision {
    /// 주어진 시간만큼 기다린 뒤 다시 시도
    Retry(Duration),
    /// 이전 실패를 모두 담은 에러로 종료
    Fail(DriverError),
}

/// 재시도 루프 하나의 상태
#[derive(Debug)]
pub struct RetryState {
    settings: RetrySettings,
    start: Instant,
    attempts: u32,
    next_delay: Duration,
    last_delay: Duration,
    errors: Vec<DriverError>,
}

impl RetryState {
    fn new(settings: RetrySettings) -> Self {
        let next_delay = settings.initial_delay;
        Self {
            settings,
            start: Instant::now(),
            attempts: 0,
            next_delay,
            last_delay: Duration::ZERO,
            errors: Vec::new(),
        }
    }

    /// 새 시도 시작 (시도 번호 반환, 1부터)
    pub fn start_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// 지금까지의 시도 횟수
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 지금까지 기록된 실패
    pub fn errors(&self) -> &[DriverError] {
        &self.errors
    }

    /// 실패 처리
    pub fn on_failure(&mut self, error: DriverError) -> RetryDecision {
        if !classify(&error).is_retryable() {
            let earlier = std::mem::take(&mut self.errors);
            return RetryDecision::Fail(error.with_suppressed(earlier));
        }

        let elapsed = self.start.elapsed();
        if elapsed >= self.settings.max_retry_time {
            let earlier = std::mem::take(&mut self.errors);
            return RetryDecision::Fail(error.with_suppressed(earlier));
        }

        let delay = self.compute_delay();
        tracing::warn!(
            attempt = self.attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transaction failed and will be retried"
        );
        self.errors.push(error);
        RetryDecision::Retry(delay)
    }

    fn compute_delay(&mut self) -> Duration {
        // 검증되지 않은 설정도 범위 안으로 고정
        let factor = if self.settings.jitter_factor.is_nan() {
            0.0
        } else {
            self.settings.jitter_factor.clamp(0.0, 1.0)
        };
        let multiplier = if self.settings.multiplier >= 1.0 {
            self.settings.multiplier
        } else {
            1.0
        };

        let base = self.next_delay.as_millis() as f64;
        let jitter = base * factor;
        let lo = (base - jitter).max(0.0) as u64;
        let hi = ((base + jitter) as u64).max(lo);
        let jittered = Duration::from_millis(rand::thread_rng().gen_range(lo..=hi));

        let delay = jittered.max(self.last_delay);
        self.last_delay = delay;
        self.next_delay = Duration::try_from_secs_f64(self.next_delay.as_secs_f64() * multiplier)
            .unwrap_or(Duration::MAX);
        delay
    }
}

// ============================================================================
// ExponentialBackoffRetryLogic - 재시도 실행기
// ============================================================================

/// 지수 백오프 재시도 실행기
#[derive(Debug, Clone, Default)]
pub struct ExponentialBackoffRetryLogic {
    settings: RetrySettings,
}

impl ExponentialBackoffRetryLogic {
    /// 새 실행기 생성
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    /// 설정
    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// 새 재시도 루프 시작
    pub fn begin(&self) -> RetryState {
        RetryState::new(self.settings.clone())
    }

    /// 작업을 성공하거나 재시도를 포기할 때까지 반복 실행
    pub async fn retry<F, Fut, T>(&self, mut work: F) -> DriverResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DriverResult<T>>,
    {
        let mut state = self.begin();
        loop {
            state.start_attempt();
            match work().await {
                Ok(value) => return Ok(value),
                Err(error) => match state.on_failure(error) {
                    RetryDecision::Retry(delay) => tokio::time::sleep(delay).await,
                    RetryDecision::Fail(error) => return Err(error),
                },
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
