//! Provider配置
//! 必填项缺失在构造时立即失败，而不是等到第一次调用

use serde::{Deserialize, Serialize};

use crate::domain::{asset_for, ApiBaseUrl, ChainSymbol};
use crate::error::ProviderError;

pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_NOTE: &str = "Created by IronVault Web3 Provider";

/// 金库钱包标识：单个字符串或列表，格式 `vaultId_walletId`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VaultWalletIds {
    One(String),
    Many(Vec<String>),
}

impl VaultWalletIds {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(id) => vec![id],
            Self::Many(ids) => ids,
        }
    }
}

/// Provider构造配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    // ---- 必填 ----
    /// 托管API请求签名私钥
    pub private_key: String,
    /// 托管API公钥
    pub public_key: String,
    pub chain_symbol: ChainSymbol,

    // ---- 可选 ----
    /// 不提供时使用链的默认公共节点
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// 非原生代币时可指定托管assetId
    #[serde(default)]
    pub asset_id: Option<String>,
    /// 不提供时动态加载前10个金库钱包；建议显式配置以减少API调用
    #[serde(default)]
    pub vault_wallet_ids: Option<VaultWalletIds>,
    #[serde(default)]
    pub api_base_url: ApiBaseUrl,
    /// 附加到每笔托管交易上的备注
    #[serde(default)]
    pub note: Option<String>,
    /// 托管后端状态轮询间隔（毫秒）
    #[serde(default)]
    pub polling_interval: Option<u64>,
    #[serde(default)]
    pub log_transaction_status_changes: bool,
    #[serde(default)]
    pub log_requests_and_responses: bool,
    /// 默认开启：失败交易输出额外调试信息（Tenderly模拟链接等）
    #[serde(default = "default_true")]
    pub enhanced_error_handling: bool,
    /// `http(s)://user:pass@server` 格式的代理
    #[serde(default)]
    pub proxy_path: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ProviderConfig {
    pub fn new(private_key: &str, public_key: &str, chain_symbol: ChainSymbol) -> Self {
        Self {
            private_key: private_key.to_string(),
            public_key: public_key.to_string(),
            chain_symbol,
            rpc_url: None,
            asset_id: None,
            vault_wallet_ids: None,
            api_base_url: ApiBaseUrl::default(),
            note: None,
            polling_interval: None,
            log_transaction_status_changes: false,
            log_requests_and_responses: false,
            enhanced_error_handling: true,
            proxy_path: None,
        }
    }

    /// 从环境变量加载（测试与CLI场景）
    pub fn from_env() -> Result<Self, ProviderError> {
        dotenvy::dotenv().ok();

        let private_key = std::env::var("IRONVAULT_API_PRIVATE_KEY").unwrap_or_default();
        let public_key = std::env::var("IRONVAULT_API_PUBLIC_KEY").unwrap_or_default();
        // 未设置时回退到测试网；设置了但不认识的符号直接报错，而不是悄悄降级
        let chain = match std::env::var("IRONVAULT_CHAIN_SYMBOL") {
            Ok(symbol) => Self::ensure_supported_chain(&symbol)?,
            Err(_) => ChainSymbol::Sepolia,
        };

        let mut config = Self::new(&private_key, &public_key, chain);
        config.rpc_url = std::env::var("IRONVAULT_RPC_URL").ok();
        config.asset_id = std::env::var("IRONVAULT_ASSET_ID").ok();
        config.vault_wallet_ids = std::env::var("IRONVAULT_VAULT_WALLET_IDS")
            .ok()
            .map(VaultWalletIds::One);
        if let Ok(url) = std::env::var("IRONVAULT_API_BASE_URL") {
            config.api_base_url = ApiBaseUrl::Custom(url);
        }
        config.proxy_path = std::env::var("PROXY_PATH").ok();
        config.validate()?;
        Ok(config)
    }

    /// 校验必填项；构造期快速失败
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.private_key.is_empty() || self.public_key.is_empty() {
            return Err(ProviderError::new(
                "privateKey and publicKey is required in the ironvault-web3-provider config",
            ));
        }
        Ok(())
    }

    /// 校验链符号字符串（反序列化前的配置入口用）
    pub fn ensure_supported_chain(symbol: &str) -> Result<ChainSymbol, ProviderError> {
        ChainSymbol::parse(symbol).ok_or_else(|| {
            let supported: Vec<&str> = ChainSymbol::ALL.iter().map(|c| c.as_str()).collect();
            ProviderError::new(format!(
                "Unsupported chain symbol: {}.\nSupported chains ids: {}",
                symbol,
                supported.join(", ")
            ))
        })
    }

    /// 生效的节点RPC地址
    pub fn resolved_rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| asset_for(self.chain_symbol).rpc_url)
    }

    /// 生效的托管assetId
    pub fn resolved_asset_id(&self) -> &str {
        self.asset_id
            .as_deref()
            .unwrap_or_else(|| asset_for(self.chain_symbol).asset_id)
    }

    pub fn resolved_note(&self) -> &str {
        self.note.as_deref().unwrap_or(DEFAULT_NOTE)
    }

    pub fn resolved_polling_interval_ms(&self) -> u64 {
        self.polling_interval.unwrap_or(DEFAULT_POLLING_INTERVAL_MS)
    }

    /// 显式配置的金库钱包ID列表
    pub fn explicit_vault_wallet_ids(&self) -> Option<Vec<String>> {
        self.vault_wallet_ids.clone().map(VaultWalletIds::into_vec)
    }
}
