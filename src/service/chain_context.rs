//! 链上下文解析
//! chainId惰性解析、仅解析一次；并发首次访问共享同一个在途请求（扇入），
//! 失败同样被缓存并原样交付给后续所有等待者，不做自动重试

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;

use crate::domain::JsonRpcRequest;
use crate::error::ProviderError;
use crate::infrastructure::RpcTransport;

pub struct ChainContext {
    transport: Arc<dyn RpcTransport>,
    chain_id: OnceCell<Result<u64, ProviderError>>,
}

impl ChainContext {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            chain_id: OnceCell::new(),
        }
    }

    /// 解析目标网络的chainId；结果（含失败）被记忆
    pub async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.chain_id
            .get_or_init(|| async { self.resolve().await })
            .await
            .clone()
    }

    async fn resolve(&self) -> Result<u64, ProviderError> {
        let request = JsonRpcRequest::new(1, "eth_chainId", Some(Value::Array(vec![])));
        let payload = serde_json::to_value(&request)
            .map_err(|e| ProviderError::new(format!("Failed to encode eth_chainId request: {}", e)))?;

        let response = self
            .transport
            .send_raw(&payload)
            .await
            .map_err(|e| ProviderError::new(format!("eth_chainId request failed: {}", e)))?;

        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            return Err(ProviderError::new(format!("eth_chainId returned error: {}", error)));
        }

        let result = response
            .get("result")
            .ok_or_else(|| ProviderError::new("eth_chainId response missing result"))?;

        parse_chain_id(result)
    }
}

/// 节点返回的chainId可能是十六进制字符串、十进制字符串或数字
fn parse_chain_id(value: &Value) -> Result<u64, ProviderError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| ProviderError::new(format!("Invalid chain id: {}", n))),
        Value::String(s) => {
            let parsed = if let Some(hex) = s.strip_prefix("0x") {
                u64::from_str_radix(hex, 16)
            } else {
                s.parse::<u64>()
            };
            parsed.map_err(|_| ProviderError::new(format!("Invalid chain id: {}", s)))
        }
        other => Err(ProviderError::new(format!("Invalid chain id: {}", other))),
    }
}
