//! 测试辅助模块
//! 提供脚本化的托管API与节点传输的测试替身

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use ironvault_web3_provider::config::{ProviderConfig, VaultWalletIds};
use ironvault_web3_provider::domain::ChainSymbol;
use ironvault_web3_provider::infrastructure::custody_api::{
    AddressInfo, CustodyApi, CustodyError, CustodyResponse, SignMessageArgs, SignResultData,
    TransactionPollInfo, TransferArgs, VaultInfo, WalletInfo,
};
use ironvault_web3_provider::infrastructure::RpcTransport;
use ironvault_web3_provider::provider::IronVaultWeb3Provider;

/// 测试账户地址（Sepolia）
pub const TEST_ADDRESS: &str = "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B";
/// 测试账户的派生路径
pub const TEST_HD_PATH: &str = "m/44'/60'/0'/0/0";
/// Sepolia的chainId
pub const TEST_CHAIN_ID_HEX: &str = "0xaa36a7";

pub fn ok<T>(data: Option<T>) -> CustodyResponse<T> {
    CustodyResponse { success: true, code: None, msg: None, data }
}

pub fn rejected<T>(msg: &str) -> CustodyResponse<T> {
    CustodyResponse {
        success: false,
        code: Some("1001".to_string()),
        msg: Some(msg.to_string()),
        data: None,
    }
}

/// 脚本化的托管API替身
/// 默认行为：金库v1下钱包w1持有TEST_ADDRESS，交易与签名一轮完成
pub struct MockCustodyApi {
    pub addresses: Mutex<Vec<AddressInfo>>,
    /// 设置后地址枚举以该消息失败
    pub address_error: Mutex<Option<String>>,
    /// 提交转账/合约调用的脚本响应
    pub submit_response: Mutex<CustodyResponse<()>>,
    /// 轮询返回的状态序列（耗尽后返回COMPLETED）
    pub poll_states: Mutex<Vec<CustodyResponse<TransactionPollInfo>>>,
    /// 前N次交易轮询以传输错误失败
    pub poll_errors_before: Mutex<u32>,
    /// 签名提交的脚本响应
    pub sign_submit_response: Mutex<CustodyResponse<()>>,
    /// 签名结果序列（耗尽后返回成功签名）
    pub sign_results: Mutex<Vec<CustodyResponse<SignResultData>>>,
    /// 前N次签名结果轮询以传输错误失败
    pub sign_errors_before: Mutex<u32>,

    // 捕获与计数
    pub captured_transfers: Mutex<Vec<TransferArgs>>,
    pub captured_signs: Mutex<Vec<SignMessageArgs>>,
    pub transfer_calls: Mutex<u32>,
    pub transaction_calls: Mutex<u32>,
    pub list_address_calls: Mutex<u32>,
    pub list_vault_calls: Mutex<u32>,
    pub poll_calls: Mutex<u32>,
    pub sign_poll_calls: Mutex<u32>,
}

impl Default for MockCustodyApi {
    fn default() -> Self {
        Self {
            addresses: Mutex::new(vec![AddressInfo {
                address: TEST_ADDRESS.to_string(),
                hd_path: TEST_HD_PATH.to_string(),
            }]),
            address_error: Mutex::new(None),
            submit_response: Mutex::new(ok(None)),
            poll_states: Mutex::new(Vec::new()),
            poll_errors_before: Mutex::new(0),
            sign_submit_response: Mutex::new(ok(None)),
            sign_results: Mutex::new(Vec::new()),
            sign_errors_before: Mutex::new(0),
            captured_transfers: Mutex::new(Vec::new()),
            captured_signs: Mutex::new(Vec::new()),
            transfer_calls: Mutex::new(0),
            transaction_calls: Mutex::new(0),
            list_address_calls: Mutex::new(0),
            list_vault_calls: Mutex::new(0),
            poll_calls: Mutex::new(0),
            sign_poll_calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl CustodyApi for MockCustodyApi {
    async fn list_vaults(&self) -> Result<Vec<VaultInfo>, CustodyError> {
        *self.list_vault_calls.lock().unwrap() += 1;
        Ok(vec![VaultInfo { vault_id: "v1".to_string(), vault_name: Some("Vault One".to_string()) }])
    }

    async fn list_wallets(
        &self,
        _vault_id: &str,
        _page_index: u32,
        _page_size: u32,
    ) -> Result<Vec<WalletInfo>, CustodyError> {
        Ok(vec![WalletInfo { wallet_id: "w1".to_string(), wallet_name: Some("Wallet One".to_string()) }])
    }

    async fn list_addresses(
        &self,
        _vault_id: &str,
        _wallet_id: &str,
        _chain_symbol: ChainSymbol,
        _page_index: u32,
        _page_size: u32,
    ) -> Result<Vec<AddressInfo>, CustodyError> {
        *self.list_address_calls.lock().unwrap() += 1;
        if let Some(msg) = self.address_error.lock().unwrap().clone() {
            return Err(CustodyError::message(msg));
        }
        Ok(self.addresses.lock().unwrap().clone())
    }

    async fn create_transfer(
        &self,
        args: &TransferArgs,
    ) -> Result<CustodyResponse<()>, CustodyError> {
        *self.transfer_calls.lock().unwrap() += 1;
        self.captured_transfers.lock().unwrap().push(args.clone());
        Ok(self.submit_response.lock().unwrap().clone())
    }

    async fn create_transaction(
        &self,
        args: &TransferArgs,
    ) -> Result<CustodyResponse<()>, CustodyError> {
        *self.transaction_calls.lock().unwrap() += 1;
        self.captured_transfers.lock().unwrap().push(args.clone());
        Ok(self.submit_response.lock().unwrap().clone())
    }

    async fn sign_message(
        &self,
        args: &SignMessageArgs,
    ) -> Result<CustodyResponse<()>, CustodyError> {
        self.captured_signs.lock().unwrap().push(args.clone());
        Ok(self.sign_submit_response.lock().unwrap().clone())
    }

    async fn sign_result(
        &self,
        _request_id: &str,
    ) -> Result<CustodyResponse<SignResultData>, CustodyError> {
        *self.sign_poll_calls.lock().unwrap() += 1;
        {
            let mut errors = self.sign_errors_before.lock().unwrap();
            if *errors > 0 {
                *errors -= 1;
                return Err(CustodyError::message("gateway timeout"));
            }
        }
        let mut results = self.sign_results.lock().unwrap();
        if results.is_empty() {
            Ok(ok(Some(SignResultData { state: 1, signature: Some("ab12cd34".to_string()) })))
        } else {
            Ok(results.remove(0))
        }
    }

    async fn transactions_by_request_id(
        &self,
        _request_id: &str,
    ) -> Result<CustodyResponse<TransactionPollInfo>, CustodyError> {
        *self.poll_calls.lock().unwrap() += 1;
        {
            let mut errors = self.poll_errors_before.lock().unwrap();
            if *errors > 0 {
                *errors -= 1;
                return Err(CustodyError::message("gateway timeout"));
            }
        }
        let mut states = self.poll_states.lock().unwrap();
        if states.is_empty() {
            Ok(ok(Some(TransactionPollInfo {
                state: 10,
                tx_hash: Some("0xfeedface".to_string()),
            })))
        } else {
            Ok(states.remove(0))
        }
    }
}

/// 按方法名返回脚本响应的节点传输替身
pub struct MockTransport {
    /// 方法名 -> 完整JSON-RPC响应对象
    pub responses: Mutex<HashMap<String, Value>>,
    /// 收到的原始报文
    pub received: Mutex<Vec<Value>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            "eth_chainId".to_string(),
            json!({ "jsonrpc": "2.0", "id": 1, "result": TEST_CHAIN_ID_HEX }),
        );
        Self { responses: Mutex::new(responses), received: Mutex::new(Vec::new()) }
    }
}

impl MockTransport {
    pub fn respond_to(&self, method: &str, response: Value) {
        self.responses.lock().unwrap().insert(method.to_string(), response);
    }

    pub fn calls_for(&self, method: &str) -> usize {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p["method"] == method)
            .count()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn send_raw(&self, payload: &Value) -> anyhow::Result<Value> {
        self.received.lock().unwrap().push(payload.clone());
        let method = payload["method"].as_str().unwrap_or_default().to_string();
        match self.responses.lock().unwrap().get(&method) {
            Some(response) => Ok(response.clone()),
            None => anyhow::bail!("no scripted response for {}", method),
        }
    }
}

/// 显式配置v1_w1、1ms轮询间隔的测试配置
pub fn test_config() -> ProviderConfig {
    let mut config = ProviderConfig::new("test-private-key", "test-public-key", ChainSymbol::Sepolia);
    config.polling_interval = Some(1);
    config.vault_wallet_ids = Some(VaultWalletIds::One("v1_w1".to_string()));
    config
}

pub fn build_provider(
    config: ProviderConfig,
    custody: Arc<MockCustodyApi>,
    transport: Arc<MockTransport>,
) -> IronVaultWeb3Provider {
    IronVaultWeb3Provider::with_parts(config, custody, transport)
}

pub fn default_provider() -> (IronVaultWeb3Provider, Arc<MockCustodyApi>, Arc<MockTransport>) {
    let custody = Arc::new(MockCustodyApi::default());
    let transport = Arc::new(MockTransport::default());
    let provider = build_provider(test_config(), custody.clone(), transport.clone());
    (provider, custody, transport)
}
