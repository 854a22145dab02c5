//! Operation deadline and cancellation / 操作截止时间与取消
//!
//! The caller supplies the context; drivers wrap every backend round-trip
//! with [`OpContext::run`] so an expired deadline or a cancelled token
//! fails the operation promptly instead of waiting on the network.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::ServiceError;

/// Externally supplied deadline / cancellation token / 外部传入的截止时间与取消令牌
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    pub deadline: Option<Instant>,
    pub cancel: Option<CancellationToken>,
}

impl OpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Whether the context can no longer admit work / 是否已过期或被取消
    pub fn is_done(&self) -> bool {
        if let Some(token) = &self.cancel {
            if token.is_cancelled() {
                return true;
            }
        }
        matches!(self.deadline, Some(d) if d <= Instant::now())
    }

    /// Run a backend round-trip under this context / 在上下文约束下执行后端调用
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        if self.is_done() {
            return Err(ServiceError::CancellationOrTimeout);
        }

        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            res = fut => res,
            _ = deadline => Err(ServiceError::CancellationOrTimeout),
            _ = cancelled => Err(ServiceError::CancellationOrTimeout),
        }
    }
}
