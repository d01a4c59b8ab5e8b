//! 链标识与默认资产配置
//! 每个支持的链都有默认的托管assetId与公共RPC节点，可被配置覆盖

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// 支持的EVM链标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainSymbol {
    Eth,
    Bnb,
    Polygon,
    Arbitrum,
    Optimism,
    Avalanche,
    Scroll,

    Sepolia,
    BnbTest,
}

impl ChainSymbol {
    /// 全部支持的链（用于配置错误提示）
    pub const ALL: [ChainSymbol; 9] = [
        Self::Eth,
        Self::Bnb,
        Self::Polygon,
        Self::Arbitrum,
        Self::Optimism,
        Self::Avalanche,
        Self::Scroll,
        Self::Sepolia,
        Self::BnbTest,
    ];

    /// 托管API使用的链标识字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eth => "ETH",
            Self::Bnb => "BNB",
            Self::Polygon => "POLYGON",
            Self::Arbitrum => "ARBITRUM",
            Self::Optimism => "OPTIMISM",
            Self::Avalanche => "AVALANCHE",
            Self::Scroll => "SCROLL",
            Self::Sepolia => "SEPOLIA",
            Self::BnbTest => "BNB_TEST",
        }
    }

    /// 从配置字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ChainSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 链的默认资产：托管后端的assetId与公共RPC节点
#[derive(Debug, Clone)]
pub struct Asset {
    pub asset_id: &'static str,
    pub rpc_url: &'static str,
}

static ASSETS: Lazy<HashMap<ChainSymbol, Asset>> = Lazy::new(|| {
    use ChainSymbol::*;

    let mut m = HashMap::new();
    m.insert(Eth, Asset { asset_id: "ETH_ETH", rpc_url: "https://cloudflare-eth.com" });
    m.insert(Bnb, Asset { asset_id: "BNB_BNB", rpc_url: "https://bsc-dataseed.binance.org" });
    m.insert(Polygon, Asset { asset_id: "MATIC_POLYGON", rpc_url: "https://polygon-rpc.com" });
    m.insert(Arbitrum, Asset { asset_id: "ETH_ARBITRUM", rpc_url: "https://rpc.ankr.com/arbitrum" });
    m.insert(Optimism, Asset { asset_id: "ETH_OPTIMISM", rpc_url: "https://rpc.ankr.com/optimism" });
    m.insert(Avalanche, Asset {
        asset_id: "AVAX_AVALANCHE",
        rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    });
    m.insert(Scroll, Asset { asset_id: "ETH_SCROLL", rpc_url: "https://rpc.scroll.io" });
    m.insert(Sepolia, Asset { asset_id: "ETH_SEPOLIA", rpc_url: "https://rpc.sepolia.org" });
    m.insert(BnbTest, Asset {
        asset_id: "BNB_BNB_TEST",
        rpc_url: "https://data-seed-prebsc-1-s1.binance.org:8545",
    });
    m
});

/// 查询链的默认资产配置
pub fn asset_for(chain: ChainSymbol) -> &'static Asset {
    // ALL中的每个链都在表里注册
    ASSETS.get(&chain).expect("chain registered in asset table")
}

/// 托管API的命名环境
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiBaseUrl {
    Production,
    Sandbox,
    Pre,
    Qa,
    /// 自定义环境（私有化部署）
    Custom(String),
}

impl ApiBaseUrl {
    pub fn as_url(&self) -> &str {
        match self {
            Self::Production => "https://api.ironvault.io",
            Self::Sandbox => "https://api-sandbox.ironvault.io",
            Self::Pre => "https://api-pre.ironvault.io",
            Self::Qa => "https://api-sandbox-qa1.ironvault.io",
            Self::Custom(url) => url,
        }
    }
}

impl Default for ApiBaseUrl {
    fn default() -> Self {
        Self::Production
    }
}
