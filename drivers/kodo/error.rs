//! Kodo error translation / Kodo错误码转换
//!
//! Kodo codes look like HTTP statuses but are not: the service also
//! returns 6xx/7xx for its own errors, so codes are kept as plain integers
//! and only inspected here.
//! ref: https://developer.qiniu.com/kodo/api/3928/error-responses

use crate::storage::ServiceError;

/// Resource does not exist / 资源不存在
pub const CODE_NOT_FOUND: i32 = 612;
/// Permission denied / 权限不足
pub const CODE_PERMISSION_DENIED: i32 = 403;

/// Raw failure reported by the Kodo backend / Kodo后端原始错误
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Non-success response / 非成功响应
    #[error("kodo code {code}: {message} (reqid: {reqid})")]
    Response {
        code: i32,
        message: String,
        reqid: String,
    },
    /// No response received / 请求未得到响应
    #[error("kodo transport: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn response(code: i32, message: impl Into<String>) -> Self {
        ApiError::Response {
            code,
            message: message.into(),
            reqid: String::new(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

/// Map a backend failure to the portable taxonomy / 转换为通用错误
pub fn translate(err: ApiError) -> ServiceError {
    let message = err.to_string();
    match err {
        ApiError::Response { code: CODE_NOT_FOUND, .. } => ServiceError::ObjectNotFound(message),
        ApiError::Response { code: CODE_PERMISSION_DENIED, .. } => {
            ServiceError::PermissionDenied(message)
        }
        ApiError::Response { code, .. } => ServiceError::Backend {
            code: Some(code),
            message,
        },
        ApiError::Transport(_) => ServiceError::Backend {
            code: None,
            message,
        },
    }
}

/// Delete is idempotent: an absent object counts as deleted / 删除幂等
pub fn ignore_not_found(res: Result<(), ServiceError>) -> Result<(), ServiceError> {
    match res {
        Err(ServiceError::ObjectNotFound(_)) => Ok(()),
        other => other,
    }
}
