//! Web3 Provider入口
//! 签名敏感方法翻译为托管MPC调用，其余方法原样透传到节点

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::domain::{
    JsonRpcRequest, JsonRpcResponse, RequestArguments, RpcErrorObject, RpcMethod,
};
use crate::error::ProviderError;
use crate::infrastructure::logging::{self, TARGET_ERROR, TARGET_REQ_RES};
use crate::infrastructure::{CustodyApi, HttpCustodyApi, HttpTransport, RpcTransport};
use crate::service::transaction_builder::{self, TransactionRequest};
use crate::service::{AccountResolver, ChainContext, SignPoller, TransactionPoller};
use crate::utils::eip712;

const TENDERLY_SIMULATOR_URL: &str = "https://dashboard.tenderly.co/simulator/new";

pub struct IronVaultWeb3Provider {
    config: ProviderConfig,
    transport: Arc<dyn RpcTransport>,
    chain: ChainContext,
    accounts: AccountResolver,
    tx_poller: TransactionPoller,
    sign_poller: SignPoller,
    /// 请求序号，诊断日志用
    request_seq: AtomicU64,
}

impl IronVaultWeb3Provider {
    /// 从配置构建完整的Provider（真实HTTP托管客户端与节点传输）
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        config.validate()?;
        logging::enable_diagnostics(&config);

        let custody = HttpCustodyApi::new(
            config.api_base_url.as_url(),
            &config.private_key,
            &config.public_key,
        )
        .map_err(|e| ProviderError::new(format!("Failed to build custody client: {}", e)))?;

        let transport =
            HttpTransport::new(config.resolved_rpc_url(), config.proxy_path.as_deref())
                .map_err(|e| ProviderError::new(format!("Failed to build rpc transport: {}", e)))?;

        Ok(Self::with_parts(config, Arc::new(custody), Arc::new(transport)))
    }

    /// 从已有组件拼装（依赖注入口，测试也走这里）
    pub fn with_parts(
        config: ProviderConfig,
        custody: Arc<dyn CustodyApi>,
        transport: Arc<dyn RpcTransport>,
    ) -> Self {
        let interval = Duration::from_millis(config.resolved_polling_interval_ms());
        let accounts = AccountResolver::new(
            custody.clone(),
            config.chain_symbol,
            config.resolved_asset_id(),
            config.explicit_vault_wallet_ids(),
        );
        let chain = ChainContext::new(transport.clone());
        let tx_poller = TransactionPoller::new(custody.clone(), interval);
        let sign_poller = SignPoller::new(custody, config.chain_symbol, interval);

        Self {
            config,
            transport,
            chain,
            accounts,
            tx_poller,
            sign_poller,
            request_seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// 目标网络的chainId（惰性解析并缓存）
    pub async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.chain.chain_id().await
    }

    /// Promise风格调用：EIP-1193的request形态
    pub async fn request(&self, args: RequestArguments) -> Result<Value, ProviderError> {
        let seq = self.request_seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.dispatch(seq, &args.method, args.params, Value::from(seq))
            .await
    }

    /// JSON-RPC报文风格调用；错误被折叠进响应信封
    pub async fn send(&self, payload: JsonRpcRequest) -> JsonRpcResponse {
        let seq = self.request_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let id = payload.id.clone();
        match self
            .dispatch(seq, &payload.method, payload.params, id.clone())
            .await
        {
            Ok(result) => JsonRpcResponse::result(id, Some(result)),
            Err(err) => JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id,
                result: None,
                error: Some(RpcErrorObject {
                    code: err.code,
                    message: err.message,
                    data: err.data,
                }),
            },
        }
    }

    async fn dispatch(
        &self,
        seq: u64,
        method: &str,
        mut params: Option<Value>,
        id: Value,
    ) -> Result<Value, ProviderError> {
        if let Some(params) = params.as_mut() {
            normalize_input_alias(params);
        }

        // 宏展开内部会引入tracing::field::Value，这里不能用裸的Value::Null
        let null = serde_json::Value::Null;
        let params_display = params.as_ref().unwrap_or(&null);
        tracing::debug!(
            target: TARGET_REQ_RES,
            seq,
            method,
            params = %params_display,
            "JSON-RPC request"
        );

        let outcome = match RpcMethod::classify(method) {
            RpcMethod::Accounts => {
                let addresses = self.accounts.addresses().await?;
                Ok(json!(addresses))
            }
            RpcMethod::SendTransaction => self.handle_send_transaction(params.as_ref()).await,
            RpcMethod::PersonalSign => {
                // personal_sign/eth_sign的参数序：内容在前，地址在后
                let content = required_string_param(params.as_ref(), 0, method)?;
                let address = required_string_param(params.as_ref(), 1, method)?;
                let signature = self.handle_sign(&address, method, &content).await?;
                Ok(Value::String(signature))
            }
            RpcMethod::SignTypedData => {
                // eth_signTypedData系的参数序：地址在前，类型化数据在后
                let address = required_string_param(params.as_ref(), 0, method)?;
                let raw = params
                    .as_ref()
                    .and_then(|p| p.get(1))
                    .ok_or_else(|| missing_param_error(method, 1))?;
                // 结构化对象先规范化；已经是字符串的载荷原样转发
                let message = match raw {
                    Value::Object(_) => {
                        let typed = eip712::parse_typed_data(raw)?;
                        eip712::canonicalize(&typed)?.to_string()
                    }
                    Value::String(s) => s.clone(),
                    other => {
                        return Err(ProviderError::new(format!("Invalid typed data: {}", other)))
                    }
                };
                let signature = self.handle_sign(&address, method, &message).await?;
                Ok(Value::String(signature))
            }
            RpcMethod::Unimplemented => Err(ProviderError::unimplemented_method(
                method,
                json!({ "method": method, "params": params }),
            )),
            RpcMethod::Passthrough => self.passthrough(method, params.clone(), id).await,
        };

        match &outcome {
            Ok(result) => {
                tracing::debug!(
                    target: TARGET_REQ_RES,
                    seq,
                    method,
                    result = %result,
                    "JSON-RPC response"
                );
            }
            Err(err) => {
                // 错误结果同时落在请求响应通道，保证编号请求有对应的响应记录
                tracing::debug!(
                    target: TARGET_REQ_RES,
                    seq,
                    method,
                    code = err.code,
                    error = %err.message,
                    "JSON-RPC error response"
                );
                tracing::debug!(
                    target: TARGET_ERROR,
                    seq,
                    method,
                    code = err.code,
                    error = %err.message,
                    "JSON-RPC request failed"
                );
            }
        }

        outcome
    }

    /// eth_sendTransaction：解析账户、构建托管转账、提交并跟踪到终态
    async fn handle_send_transaction(
        &self,
        params: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let raw = params
            .and_then(|p| p.get(0))
            .ok_or_else(|| ProviderError::new("eth_sendTransaction requires a transaction object"))?;
        let tx: TransactionRequest = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::new(format!("Invalid transaction object: {}", e)))?;

        let from = tx
            .from
            .as_deref()
            .ok_or_else(|| ProviderError::new("Transaction sent with no \"from\" field"))?;
        let composite_id = self
            .accounts
            .require_composite_id(from, "Transaction sent from an unsupported address: ")
            .await?;

        let chain_id = self.chain.chain_id().await?;
        let args = transaction_builder::build_transfer_args(
            &tx,
            &composite_id,
            chain_id,
            self.config.resolved_asset_id(),
            self.config.chain_symbol,
            self.config.resolved_note(),
        )?;

        let record = match self.tx_poller.submit_and_track(args).await {
            Ok(record) => record,
            Err(err) => return Err(self.enrich_with_simulation(err, &tx, chain_id)),
        };

        Ok(Value::String(record.tx_hash.unwrap_or_default()))
    }

    /// personal_sign与eth_signTypedData共用的签名管线
    async fn handle_sign(
        &self,
        address: &str,
        method: &str,
        message: &str,
    ) -> Result<String, ProviderError> {
        let composite_id = self
            .accounts
            .require_composite_id(address, "Message signed with an unsupported address: ")
            .await?;
        let hd_path = composite_id
            .splitn(3, '_')
            .nth(2)
            .ok_or_else(|| ProviderError::new(format!("Invalid account id: {}", composite_id)))?
            .to_string();

        self.sign_poller.sign_and_wait(&hd_path, method, message).await
    }

    /// 其余方法原样转发到节点
    async fn passthrough(
        &self,
        method: &str,
        params: Option<Value>,
        id: Value,
    ) -> Result<Value, ProviderError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params.clone().unwrap_or_else(|| Value::Array(vec![])),
        });

        let response = self.transport.send_raw(&payload).await.map_err(|e| {
            ProviderError::new(format!("RPC request failed: {}", e)).with_payload(payload.clone())
        })?;

        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            let parsed: RpcErrorObject = serde_json::from_value(error.clone())
                .unwrap_or_else(|_| RpcErrorObject {
                    code: crate::error::CODE_INTERNAL,
                    message: error.to_string(),
                    data: None,
                });
            let mut err = ProviderError::with_code(parsed.message, parsed.code)
                .with_data(parsed.data)
                .with_payload(payload);

            // gas估算失败时附带模拟链接，方便排查revert原因
            if method == "eth_estimateGas" {
                if let Some(tx) = params
                    .as_ref()
                    .and_then(|p| p.get(0))
                    .and_then(|v| serde_json::from_value::<TransactionRequest>(v.clone()).ok())
                {
                    if let Ok(chain_id) = self.chain.chain_id().await {
                        err = self.enrich_with_simulation(err, &tx, chain_id);
                    }
                }
            }
            return Err(err);
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    /// 失败交易附加Tenderly模拟链接（enhancedErrorHandling开启时）
    fn enrich_with_simulation(
        &self,
        mut err: ProviderError,
        tx: &TransactionRequest,
        chain_id: u64,
    ) -> ProviderError {
        if !self.config.enhanced_error_handling {
            return err;
        }
        if let Some(url) = tenderly_simulation_url(tx, chain_id) {
            err.message = format!("{}\nSimulate this transaction on Tenderly: {}", err.message, url);
        }
        err
    }
}

/// `input`是`data`的别名；两者都给时以`data`为准
fn normalize_input_alias(params: &mut Value) {
    if let Some(first) = params.get_mut(0).and_then(Value::as_object_mut) {
        match first.remove("input") {
            Some(input) if !first.contains_key("data") => {
                first.insert("data".to_string(), input);
            }
            _ => {}
        }
    }
}

fn missing_param_error(method: &str, index: usize) -> ProviderError {
    ProviderError::new(format!("{} is missing parameter at index {}", method, index))
}

fn required_string_param(
    params: Option<&Value>,
    index: usize,
    method: &str,
) -> Result<String, ProviderError> {
    params
        .and_then(|p| p.get(index))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing_param_error(method, index))
}

fn tenderly_simulation_url(tx: &TransactionRequest, chain_id: u64) -> Option<String> {
    let mut url = reqwest::Url::parse(TENDERLY_SIMULATOR_URL).ok()?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(from) = &tx.from {
            query.append_pair("from", from);
        }
        if let Some(to) = &tx.to {
            query.append_pair("contractAddress", to);
        }
        query.append_pair("rawFunctionInput", tx.data.as_deref().unwrap_or("0x"));
        if let Ok(value) = transaction_builder::normalize_value(tx.value.as_ref()) {
            query.append_pair("value", &value);
        }
        query.append_pair("network", &chain_id.to_string());
        if let Some(gas) = tx.gas.as_ref().and_then(|g| transaction_builder::parse_quantity(g).ok())
        {
            query.append_pair("gas", &gas.to_string());
        }
        let price = tx.gas_price.as_ref().or(tx.max_fee_per_gas.as_ref());
        if let Some(price) = price.and_then(|p| transaction_builder::parse_quantity(p).ok()) {
            query.append_pair("gasPrice", &price.to_string());
        }
    }
    Some(url.to_string())
}
