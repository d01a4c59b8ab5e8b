//! 账户解析
//! 发现并缓存托管侧（金库、钱包、派生路径）标识到链上地址的映射。
//! 整个Provider生命周期内只填充一次；并发首次访问共享同一次解析。

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::OnceCell;

use crate::domain::ChainSymbol;
use crate::error::ProviderError;
use crate::infrastructure::CustodyApi;

/// 自动发现时每个金库加载的钱包页大小
const WALLET_PAGE_SIZE: u32 = 10;
/// 每个钱包加载的地址页大小
const ADDRESS_PAGE_SIZE: u32 = 50;

/// 账户映射：`vaultId_walletId_hdPath` -> 链上地址
pub type AccountMap = BTreeMap<String, String>;

pub struct AccountResolver {
    custody: Arc<dyn CustodyApi>,
    chain_symbol: ChainSymbol,
    asset_id: String,
    /// 显式配置的 `vaultId_walletId` 列表；None时走自动发现
    explicit_ids: Option<Vec<String>>,
    accounts: OnceCell<Result<AccountMap, ProviderError>>,
    populate_started: AtomicBool,
}

impl AccountResolver {
    pub fn new(
        custody: Arc<dyn CustodyApi>,
        chain_symbol: ChainSymbol,
        asset_id: &str,
        explicit_ids: Option<Vec<String>>,
    ) -> Self {
        Self {
            custody,
            chain_symbol,
            asset_id: asset_id.to_string(),
            explicit_ids,
            accounts: OnceCell::new(),
            populate_started: AtomicBool::new(false),
        }
    }

    /// 解析账户映射；首次调用触发填充，之后返回缓存
    pub async fn accounts(&self) -> Result<AccountMap, ProviderError> {
        self.accounts
            .get_or_init(|| async { self.populate().await })
            .await
            .clone()
    }

    /// 已知地址列表（eth_accounts的返回值）
    pub async fn addresses(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.accounts().await?.values().cloned().collect())
    }

    /// 地址反查复合标识（大小写不敏感）
    pub async fn composite_id_for(&self, address: &str) -> Result<Option<String>, ProviderError> {
        let accounts = self.accounts().await?;
        Ok(accounts
            .iter()
            .find(|(_, addr)| addr.eq_ignore_ascii_case(address))
            .map(|(id, _)| id.clone()))
    }

    /// 地址反查，未命中时给出带上下文的诊断错误
    pub async fn require_composite_id(
        &self,
        address: &str,
        error_prefix: &str,
    ) -> Result<String, ProviderError> {
        match self.composite_id_for(address).await? {
            Some(id) => Ok(id),
            None => {
                let accounts = self.accounts().await?;
                Err(self.unsupported_address_error(&accounts, address, error_prefix))
            }
        }
    }

    fn unsupported_address_error(
        &self,
        accounts: &AccountMap,
        address: &str,
        error_prefix: &str,
    ) -> ProviderError {
        let configured = match &self.explicit_ids {
            Some(ids) => format!("vaultWalletIds provided in the configuration: {}", ids.join(", ")),
            None => "vaultWalletIds was not provided in the configuration. When that happens, \
                     the provider loads the first 10 vault accounts found. It is advised to \
                     explicitly pass the required vaultWalletIds in the configuration to the \
                     provider"
                .to_string(),
        };
        let known: Vec<&str> = accounts.values().map(|s| s.as_str()).collect();
        ProviderError::new(format!(
            "{}{}. \n{}.\nAvailable addresses: {}.",
            error_prefix,
            address,
            configured,
            known.join(", ")
        ))
    }

    /// 自动发现：第一页金库，每个金库第一页（最多10个）钱包
    async fn discover_vault_wallet_ids(&self) -> Result<Vec<String>, ProviderError> {
        let vaults = self.custody.list_vaults().await.map_err(ProviderError::from)?;

        let mut ids = Vec::new();
        for vault in vaults {
            let wallets = self
                .custody
                .list_wallets(&vault.vault_id, 1, WALLET_PAGE_SIZE)
                .await
                .map_err(ProviderError::from)?;
            for wallet in wallets {
                ids.push(format!("{}_{}", vault.vault_id, wallet.wallet_id));
            }
        }
        Ok(ids)
    }

    async fn populate(&self) -> Result<AccountMap, ProviderError> {
        // 填充只允许发生一次；重复进入说明调用方绕过了缓存
        if self.populate_started.swap(true, Ordering::SeqCst) {
            return Err(ProviderError::new("Accounts already populated"));
        }

        let ids = match &self.explicit_ids {
            Some(ids) => ids.clone(),
            None => self.discover_vault_wallet_ids().await?,
        };

        // 各钱包的地址列表互不依赖，并发拉取
        let fetches = ids.iter().map(|vault_wallet_id| async move {
            let mut parts = vault_wallet_id.splitn(3, '_');
            let vault_id = parts.next().unwrap_or_default();
            let wallet_id = parts.next().unwrap_or_default();

            let addresses = self
                .custody
                .list_addresses(vault_id, wallet_id, self.chain_symbol, 1, ADDRESS_PAGE_SIZE)
                .await
                .map_err(ProviderError::from)?;
            Ok::<_, ProviderError>((vault_wallet_id, addresses))
        });

        let mut accounts = AccountMap::new();
        for (vault_wallet_id, addresses) in try_join_all(fetches).await? {
            for info in addresses {
                accounts.insert(format!("{}_{}", vault_wallet_id, info.hd_path), info.address);
            }
        }

        if self.explicit_ids.is_some() && accounts.is_empty() {
            return Err(ProviderError::new(format!(
                "No {} asset wallet found for vault account",
                self.asset_id
            )));
        }

        Ok(accounts)
    }
}
