//! 交易提交与状态跟踪
//! 提交托管转账后按固定间隔轮询，直到状态离开可轮询集合

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::TransactionStatus;
use crate::error::{normalize_custody_error, ProviderError};
use crate::infrastructure::custody_api::{CustodyApi, TransferArgs};
use crate::infrastructure::logging::TARGET_TX_STATUS;

/// 交易走完可轮询阶段后的最终记录
#[derive(Debug, Clone)]
pub struct TransactionLifecycleRecord {
    pub request_id: String,
    pub status: TransactionStatus,
    pub tx_hash: Option<String>,
}

pub struct TransactionPoller {
    custody: Arc<dyn CustodyApi>,
    polling_interval: Duration,
}

impl TransactionPoller {
    pub fn new(custody: Arc<dyn CustodyApi>, polling_interval: Duration) -> Self {
        Self { custody, polling_interval }
    }

    /// 提交交易并阻塞跟踪到终态
    /// 有input_data走合约调用端点，否则走普通转账端点
    pub async fn submit_and_track(
        &self,
        mut args: TransferArgs,
    ) -> Result<TransactionLifecycleRecord, ProviderError> {
        let request_id = Uuid::new_v4().to_string();
        args.request_id = request_id.clone();

        let response = if args.input_data.is_some() {
            self.custody.create_transaction(&args).await
        } else {
            self.custody.create_transfer(&args).await
        }
        .map_err(|e| normalize_custody_error(&e))?;

        if !response.success {
            let msg = response.msg.unwrap_or_else(|| "unknown error".to_string());
            return Err(ProviderError::new(format!("CreateTransfer error: {}", msg)));
        }

        tracing::debug!(
            target: TARGET_TX_STATUS,
            request_id = %request_id,
            from = %args.from,
            to = %args.to,
            "Transaction submitted"
        );

        self.track(request_id).await
    }

    /// 轮询交易状态直到离开可轮询集合
    /// 查询失败只记录并重试；响应信封失败时停止跟踪
    async fn track(&self, request_id: String) -> Result<TransactionLifecycleRecord, ProviderError> {
        let mut status = TransactionStatus::Submitted;
        let mut tx_hash: Option<String> = None;

        loop {
            match self.custody.transactions_by_request_id(&request_id).await {
                Ok(response) => {
                    if !response.success {
                        tracing::debug!(
                            target: TARGET_TX_STATUS,
                            request_id = %request_id,
                            msg = response.msg.as_deref().unwrap_or(""),
                            "Transaction query rejected, stopping tracking"
                        );
                        break;
                    }
                    if let Some(info) = response.data {
                        let next = TransactionStatus::from_code(info.state);
                        if next != status {
                            tracing::debug!(
                                target: TARGET_TX_STATUS,
                                request_id = %request_id,
                                previous = %status,
                                current = %next,
                                tx_hash = info.tx_hash.as_deref().unwrap_or(""),
                                "Transaction status changed"
                            );
                        }
                        status = next;
                        if info.tx_hash.is_some() {
                            tx_hash = info.tx_hash;
                        }
                    }
                }
                Err(e) => {
                    let normalized = normalize_custody_error(&e);
                    tracing::debug!(
                        target: TARGET_TX_STATUS,
                        request_id = %request_id,
                        error = %normalized,
                        "Transaction status query failed, retrying"
                    );
                }
            }

            if !status.is_pollable() {
                break;
            }
            tokio::time::sleep(self.polling_interval).await;
        }

        if !status.is_final_successful() {
            tracing::warn!(
                target: TARGET_TX_STATUS,
                request_id = %request_id,
                status = %status,
                "Transaction did not reach a successful state"
            );
        }

        Ok(TransactionLifecycleRecord { request_id, status, tx_hash })
    }
}
