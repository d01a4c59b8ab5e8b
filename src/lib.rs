//! IronVault Web3 Provider
//!
//! 把签名敏感的以太坊JSON-RPC方法（eth_sendTransaction、personal_sign、
//! eth_signTypedData系）路由到IronVault托管MPC服务，其余方法透传到节点。
//! 私钥永不出托管侧；本地只持有API调用凭证

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod provider;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use config::{ProviderConfig, VaultWalletIds};
pub use error::ProviderError;
pub use provider::IronVaultWeb3Provider;

// 统一模块导出
pub mod prelude {
    pub use crate::{
        config::{ProviderConfig, VaultWalletIds},
        domain::{ApiBaseUrl, ChainSymbol, JsonRpcRequest, JsonRpcResponse, RequestArguments},
        error::ProviderError,
        provider::IronVaultWeb3Provider,
    };
}
