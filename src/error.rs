//! 统一的Provider错误
//! 所有托管/透传失败都被规范化为同一形态后再交给调用方

use serde_json::Value;
use thiserror::Error;

use crate::infrastructure::custody_api::CustodyError;

/// JSON-RPC内部错误默认码
pub const CODE_INTERNAL: i64 = -32603;
/// 托管API返回HTTP 401时使用的错误码
pub const CODE_UNAUTHORIZED: i64 = 4100;
/// 明确不支持的JSON-RPC方法
pub const CODE_UNIMPLEMENTED: i64 = 4200;

/// 暴露给JSON-RPC调用方的统一错误形态
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    pub code: i64,
    /// 上游JSON-RPC错误附带的数据
    pub data: Option<Value>,
    /// 触发错误的原始请求报文（诊断用）
    pub payload: Option<Value>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: CODE_INTERNAL,
            data: None,
            payload: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code,
            data: None,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }

    /// 固定码的"方法未实现"错误
    pub fn unimplemented_method(method: &str, payload: Value) -> Self {
        Self::with_code(
            format!("JSON-RPC method ({}) is not implemented in IronVaultWeb3Provider", method),
            CODE_UNIMPLEMENTED,
        )
        .with_payload(payload)
    }
}

impl From<CustodyError> for ProviderError {
    fn from(err: CustodyError) -> Self {
        normalize_custody_error(&err)
    }
}

/// 错误规范化：把托管API层的任意失败转成统一的ProviderError
/// 消息中嵌入上游消息、可选的上游错误码与请求ID，便于支持排查
pub fn normalize_custody_error(err: &CustodyError) -> ProviderError {
    let mut message = format!("IronVault API Error: {}", err.message);
    if let Some(code) = &err.api_code {
        message = format!("{} (Error code: {})", message, code);
    }
    if let Some(request_id) = &err.request_id {
        message = format!("{} (Request ID: {})", message, request_id);
    }

    let code = match err.http_status {
        Some(401) => CODE_UNAUTHORIZED,
        _ => CODE_INTERNAL,
    };

    ProviderError::with_code(message, code)
}
