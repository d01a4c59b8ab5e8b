//! 消息签名提交与结果轮询
//! personal_sign与eth_signTypedData系方法共用这条管线

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::{ChainSymbol, SignStatus};
use crate::error::{normalize_custody_error, ProviderError};
use crate::infrastructure::custody_api::{
    CustodyApi, CustodyResponse, SignMessageArgs, SignResultData,
};
use crate::infrastructure::logging::TARGET_TX_STATUS;

/// 单次轮询的判定结果
enum SignOutcome {
    /// 仍在处理中，继续轮询
    Pending,
    /// 拿到最终签名（失败时为空串）
    Done(String),
}

/// 签名结果判定；与轮询节奏解耦便于单测
fn evaluate(response: &CustodyResponse<SignResultData>) -> SignOutcome {
    if !response.success {
        return SignOutcome::Done(String::new());
    }
    let data = match &response.data {
        Some(data) => data,
        None => return SignOutcome::Pending,
    };
    match SignStatus::from_code(data.state) {
        SignStatus::Pending => SignOutcome::Pending,
        SignStatus::Success => {
            let raw = data.signature.as_deref().unwrap_or("");
            if raw.starts_with("0x") {
                SignOutcome::Done(raw.to_string())
            } else {
                SignOutcome::Done(format!("0x{}", raw))
            }
        }
        // 签名失败按约定返回空串而不是错误
        SignStatus::Failure | SignStatus::Unknown(_) => SignOutcome::Done(String::new()),
    }
}

pub struct SignPoller {
    custody: Arc<dyn CustodyApi>,
    chain_symbol: ChainSymbol,
    polling_interval: Duration,
}

impl SignPoller {
    pub fn new(
        custody: Arc<dyn CustodyApi>,
        chain_symbol: ChainSymbol,
        polling_interval: Duration,
    ) -> Self {
        Self { custody, chain_symbol, polling_interval }
    }

    /// 提交签名请求并轮询到最终结果
    /// `sign_algorithm` 为发起方法名，`hd_path` 来自已解析的账户复合ID
    pub async fn sign_and_wait(
        &self,
        hd_path: &str,
        sign_algorithm: &str,
        message: &str,
    ) -> Result<String, ProviderError> {
        let request_id = Uuid::new_v4().to_string();
        let args = SignMessageArgs {
            request_id: request_id.clone(),
            chain_symbol: self.chain_symbol.as_str().to_string(),
            hd_path: hd_path.to_string(),
            sign_algorithm: sign_algorithm.to_string(),
            message: message.to_string(),
        };

        let response = self
            .custody
            .sign_message(&args)
            .await
            .map_err(|e| normalize_custody_error(&e))?;
        if !response.success {
            let msg = response.msg.unwrap_or_else(|| "unknown error".to_string());
            return Err(ProviderError::new(msg));
        }

        tracing::debug!(
            target: TARGET_TX_STATUS,
            request_id = %request_id,
            method = sign_algorithm,
            "Sign request submitted"
        );

        loop {
            match self.custody.sign_result(&request_id).await {
                Ok(response) => match evaluate(&response) {
                    SignOutcome::Done(signature) => {
                        if signature.is_empty() {
                            tracing::debug!(
                                target: TARGET_TX_STATUS,
                                request_id = %request_id,
                                "Sign request did not produce a signature"
                            );
                        }
                        return Ok(signature);
                    }
                    SignOutcome::Pending => {}
                },
                Err(e) => {
                    let normalized = normalize_custody_error(&e);
                    tracing::debug!(
                        target: TARGET_TX_STATUS,
                        request_id = %request_id,
                        error = %normalized,
                        "Sign result query failed, retrying"
                    );
                }
            }
            tokio::time::sleep(self.polling_interval).await;
        }
    }
}
