//! Portable storage error taxonomy / 通用存储错误分类
//!
//! Drivers translate backend-specific failures into [`ServiceError`] right
//! after a backend call returns, then wrap it with the operation name and
//! the target path in a [`StorageError`].

/// Error kind, for matching without destructuring / 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ObjectNotFound,
    PermissionDenied,
    OperationNotSupported,
    InvalidArgument,
    CancellationOrTimeout,
    BackendError,
}

/// Translated service error / 转换后的服务错误
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("object not exist: {0}")]
    ObjectNotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("operation not supported: {0}")]
    OperationNotSupported(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation cancelled or deadline exceeded")]
    CancellationOrTimeout,

    /// Catch-all; `code` is the backend's original code, `None` when no
    /// response was received.
    #[error("backend error (code {code:?}): {message}")]
    Backend { code: Option<i32>, message: String },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::ObjectNotFound(_) => ErrorKind::ObjectNotFound,
            ServiceError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ServiceError::OperationNotSupported(_) => ErrorKind::OperationNotSupported,
            ServiceError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ServiceError::CancellationOrTimeout => ErrorKind::CancellationOrTimeout,
            ServiceError::Backend { .. } => ErrorKind::BackendError,
        }
    }
}

/// Storage operation error with diagnostics context / 带上下文的存储操作错误
#[derive(Debug, thiserror::Error)]
#[error("{op} [{path}]: {source}")]
pub struct StorageError {
    /// Operation name (`stat`, `list`, ...) / 操作名
    pub op: &'static str,
    /// Caller-visible path or backend key / 路径
    pub path: String,
    #[source]
    pub source: ServiceError,
}

impl StorageError {
    pub fn new(op: &'static str, path: impl Into<String>, source: ServiceError) -> Self {
        Self {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
