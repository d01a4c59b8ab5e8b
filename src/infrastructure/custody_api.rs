//! 托管API客户端门面
//! 对MPC托管后端REST接口的薄类型封装：金库/钱包/地址枚举、转账与合约调用
//! 创建、消息签名及结果轮询。trait边界用于测试替身注入。

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::ChainSymbol;

type HmacSha256 = Hmac<Sha256>;

const HTTP_TIMEOUT_SECS: u64 = 30;

const PATH_VAULT_LIST: &str = "/v1/waas/mpc/wallet/get_vault_list";
const PATH_WALLET_LIST: &str = "/v1/waas/mpc/wallet/get_wallet_list";
const PATH_ADDRESS_LIST: &str = "/v1/waas/mpc/wallet/get_address_list";
const PATH_CREATE_TRANSFER: &str = "/v1/waas/mpc/web3/create_transfer";
const PATH_CREATE_TRANSACTION: &str = "/v1/waas/mpc/web3/create_transaction";
const PATH_SIGN_MESSAGE: &str = "/v1/waas/mpc/web3/sign";
const PATH_SIGN_RESULT: &str = "/v1/waas/mpc/web3/sign_result";
const PATH_TRANSACTIONS_BY_REQUEST_IDS: &str = "/v1/waas/mpc/web3/transactions_by_request_ids";

/// 托管API层的失败：HTTP错误、网络错误或响应解析错误
/// 保留上游错误码与请求ID，供错误规范化层拼接诊断消息
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CustodyError {
    pub message: String,
    pub http_status: Option<u16>,
    pub api_code: Option<String>,
    pub request_id: Option<String>,
}

impl CustodyError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            http_status: None,
            api_code: None,
            request_id: None,
        }
    }
}

impl From<reqwest::Error> for CustodyError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            http_status: err.status().map(|s| s.as_u16()),
            api_code: None,
            request_id: None,
        }
    }
}

/// 托管API统一响应信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultInfo {
    pub vault_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub wallet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfo {
    pub address: String,
    pub hd_path: String,
}

/// 转账/合约调用创建参数（由交易构建器产出）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferArgs {
    pub request_id: String,
    pub vault_id: String,
    pub wallet_id: String,
    pub asset_id: String,
    pub chain_symbol: String,
    pub from: String,
    pub to: String,
    /// 最小单位整数字符串（wei）
    pub amount: String,
    pub note: String,
    /// 合约调用数据；存在时走create_transaction端点
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_data: Option<String>,
    /// legacy手续费（gwei小数字符串）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    /// gas上限（十进制字符串）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
}

/// 消息签名请求参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageArgs {
    pub request_id: String,
    pub chain_symbol: String,
    pub hd_path: String,
    /// 发起签名的JSON-RPC方法名（personal_sign / eth_signTypedData_v4 等）
    pub sign_algorithm: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResultData {
    pub state: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// 按请求ID轮询到的交易信息（已扁平化）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPollInfo {
    pub state: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// 托管后端的类型化调用契约
#[async_trait]
pub trait CustodyApi: Send + Sync {
    async fn list_vaults(&self) -> Result<Vec<VaultInfo>, CustodyError>;

    async fn list_wallets(
        &self,
        vault_id: &str,
        page_index: u32,
        page_size: u32,
    ) -> Result<Vec<WalletInfo>, CustodyError>;

    async fn list_addresses(
        &self,
        vault_id: &str,
        wallet_id: &str,
        chain_symbol: ChainSymbol,
        page_index: u32,
        page_size: u32,
    ) -> Result<Vec<AddressInfo>, CustodyError>;

    /// 简单转账创建（无input_data）
    async fn create_transfer(&self, args: &TransferArgs)
        -> Result<CustodyResponse<()>, CustodyError>;

    /// 合约调用创建（有input_data）
    async fn create_transaction(
        &self,
        args: &TransferArgs,
    ) -> Result<CustodyResponse<()>, CustodyError>;

    async fn sign_message(
        &self,
        args: &SignMessageArgs,
    ) -> Result<CustodyResponse<()>, CustodyError>;

    async fn sign_result(
        &self,
        request_id: &str,
    ) -> Result<CustodyResponse<SignResultData>, CustodyError>;

    async fn transactions_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<CustodyResponse<TransactionPollInfo>, CustodyError>;
}

// ---- 分页与列表的线格式 ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    vault_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wallet_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_symbol: Option<&'a str>,
    page_index: u32,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct ListData<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionEntry {
    state: i64,
    #[serde(default)]
    transaction: Option<TransactionBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBody {
    #[serde(default)]
    tx_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestIdQuery<'a> {
    request_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestIdsQuery<'a> {
    request_ids: &'a str,
}

/// 私钥/公钥对认证的HTTP实现
/// 请求体以HMAC-SHA256(私钥, timestamp + path + body)签名，公钥随头部传递
pub struct HttpCustodyApi {
    client: reqwest::Client,
    base_url: String,
    private_key: String,
    public_key: String,
}

impl HttpCustodyApi {
    pub fn new(base_url: &str, private_key: &str, public_key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            private_key: private_key.to_string(),
            public_key: public_key.to_string(),
        })
    }

    fn sign_request(&self, timestamp: i64, path: &str, body: &str) -> Result<String, CustodyError> {
        let mut mac = HmacSha256::new_from_slice(self.private_key.as_bytes())
            .map_err(|e| CustodyError::message(format!("Invalid API private key: {}", e)))?;
        mac.update(format!("{}{}{}", timestamp, path, body).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<CustodyResponse<T>, CustodyError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let body_json = serde_json::to_string(body)
            .map_err(|e| CustodyError::message(format!("Failed to encode request: {}", e)))?;
        let timestamp = chrono::Utc::now().timestamp_millis();
        let signature = self.sign_request(timestamp, path, &body_json)?;

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .header("BIZ-API-KEY", &self.public_key)
            .header("BIZ-API-NONCE", uuid::Uuid::new_v4().to_string())
            .header("BIZ-API-TIMESTAMP", timestamp.to_string())
            .header("BIZ-API-SIGNATURE", signature)
            .body(body_json)
            .send()
            .await?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let text = response.text().await?;

        if !status.is_success() {
            // 尽量从错误体里捞出后端的消息与业务码
            let parsed: Option<serde_json::Value> = serde_json::from_str(&text).ok();
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("msg"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("HTTP {} from custody API", status.as_u16()));
            let api_code = parsed
                .as_ref()
                .and_then(|v| v.get("code"))
                .map(|c| c.to_string().trim_matches('"').to_string());

            return Err(CustodyError {
                message,
                http_status: Some(status.as_u16()),
                api_code,
                request_id,
            });
        }

        serde_json::from_str(&text).map_err(|e| CustodyError {
            message: format!("Failed to parse custody API response: {}", e),
            http_status: Some(status.as_u16()),
            api_code: None,
            request_id,
        })
    }
}

#[async_trait]
impl CustodyApi for HttpCustodyApi {
    async fn list_vaults(&self) -> Result<Vec<VaultInfo>, CustodyError> {
        let resp: CustodyResponse<ListData<VaultInfo>> =
            self.post(PATH_VAULT_LIST, &serde_json::json!({})).await?;
        Ok(resp.data.map(|d| d.list).unwrap_or_default())
    }

    async fn list_wallets(
        &self,
        vault_id: &str,
        page_index: u32,
        page_size: u32,
    ) -> Result<Vec<WalletInfo>, CustodyError> {
        let query = PageQuery {
            vault_id: Some(vault_id),
            wallet_id: None,
            chain_symbol: None,
            page_index,
            page_size,
        };
        let resp: CustodyResponse<ListData<WalletInfo>> =
            self.post(PATH_WALLET_LIST, &query).await?;
        Ok(resp.data.map(|d| d.list).unwrap_or_default())
    }

    async fn list_addresses(
        &self,
        vault_id: &str,
        wallet_id: &str,
        chain_symbol: ChainSymbol,
        page_index: u32,
        page_size: u32,
    ) -> Result<Vec<AddressInfo>, CustodyError> {
        let query = PageQuery {
            vault_id: Some(vault_id),
            wallet_id: Some(wallet_id),
            chain_symbol: Some(chain_symbol.as_str()),
            page_index,
            page_size,
        };
        let resp: CustodyResponse<ListData<AddressInfo>> =
            self.post(PATH_ADDRESS_LIST, &query).await?;
        Ok(resp.data.map(|d| d.list).unwrap_or_default())
    }

    async fn create_transfer(
        &self,
        args: &TransferArgs,
    ) -> Result<CustodyResponse<()>, CustodyError> {
        self.post(PATH_CREATE_TRANSFER, args).await
    }

    async fn create_transaction(
        &self,
        args: &TransferArgs,
    ) -> Result<CustodyResponse<()>, CustodyError> {
        self.post(PATH_CREATE_TRANSACTION, args).await
    }

    async fn sign_message(
        &self,
        args: &SignMessageArgs,
    ) -> Result<CustodyResponse<()>, CustodyError> {
        self.post(PATH_SIGN_MESSAGE, args).await
    }

    async fn sign_result(
        &self,
        request_id: &str,
    ) -> Result<CustodyResponse<SignResultData>, CustodyError> {
        self.post(PATH_SIGN_RESULT, &RequestIdQuery { request_id }).await
    }

    async fn transactions_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<CustodyResponse<TransactionPollInfo>, CustodyError> {
        let resp: CustodyResponse<ListData<TransactionEntry>> = self
            .post(PATH_TRANSACTIONS_BY_REQUEST_IDS, &RequestIdsQuery { request_ids: request_id })
            .await?;

        // 后端按请求ID列表查询；单ID查询只取首条
        let info = resp.data.and_then(|d| d.list.into_iter().next()).map(|entry| {
            TransactionPollInfo {
                state: entry.state,
                tx_hash: entry.transaction.and_then(|t| t.tx_hash),
            }
        });

        Ok(CustodyResponse {
            success: resp.success,
            code: resp.code,
            msg: resp.msg,
            data: info,
        })
    }
}
