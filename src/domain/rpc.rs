//! JSON-RPC 2.0报文结构与方法路由
//! 方法路由使用封闭枚举而非字符串分支，保证未实现方法集合可被穷举检查

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 入站JSON-RPC请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC错误对象（节点返回）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// 出站JSON-RPC响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl JsonRpcResponse {
    /// 组装成功响应
    pub fn result(id: Value, result: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result,
            error: None,
        }
    }
}

/// Promise风格调用的入参
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestArguments {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// 方法分派结果：签名敏感方法被翻译为托管调用，其余透传
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    /// eth_accounts / eth_requestAccounts
    Accounts,
    /// eth_sendTransaction
    SendTransaction,
    /// personal_sign / eth_sign（原始消息签名）
    PersonalSign,
    /// eth_signTypedData / _v3 / _v4（EIP-712）
    SignTypedData,
    /// 明确拒绝的方法
    Unimplemented,
    /// 其余方法透传到节点
    Passthrough,
}

impl RpcMethod {
    pub fn classify(method: &str) -> Self {
        match method {
            "eth_requestAccounts" | "eth_accounts" => Self::Accounts,
            "eth_sendTransaction" => Self::SendTransaction,
            "personal_sign" | "eth_sign" => Self::PersonalSign,
            "eth_signTypedData" | "eth_signTypedData_v3" | "eth_signTypedData_v4" => {
                Self::SignTypedData
            }
            "eth_signTypedData_v1" | "eth_signTypedData_v2" | "eth_signTransaction" => {
                Self::Unimplemented
            }
            _ => Self::Passthrough,
        }
    }
}
