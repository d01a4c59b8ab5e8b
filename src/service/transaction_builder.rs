//! 交易构建器
//! 把通用的交易对象（to/value/data/gas字段）映射为托管后端的
//! 转账/合约调用创建参数，并区分legacy与EIP-1559两种手续费风格

use ethers::types::U256;
use ethers::utils::{format_units, parse_ether};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ChainSymbol;
use crate::error::ProviderError;
use crate::infrastructure::custody_api::TransferArgs;

/// 无`to`的合约创建交易使用的哨兵地址
const CONTRACT_CREATION_DESTINATION: &str = "0x0";

/// 调用方提交的通用交易对象
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<Value>,
    pub data: Option<String>,
    pub gas: Option<Value>,
    pub gas_price: Option<Value>,
    pub max_fee_per_gas: Option<Value>,
    pub max_priority_fee_per_gas: Option<Value>,
    pub chain_id: Option<Value>,
}

/// JSON-RPC数量字段：十六进制字符串、十进制字符串或数字
pub fn parse_quantity(value: &Value) -> Result<U256, ProviderError> {
    match value {
        Value::Number(n) => {
            let as_u128 = n
                .as_u64()
                .map(u128::from)
                .or_else(|| n.as_i64().filter(|v| *v >= 0).map(|v| v as u128));
            match as_u128 {
                Some(v) => Ok(U256::from(v)),
                None => Err(ProviderError::new(format!("Invalid quantity: {}", n))),
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x") {
                U256::from_str_radix(hex, 16)
                    .map_err(|_| ProviderError::new(format!("Invalid hex quantity: {}", s)))
            } else {
                U256::from_dec_str(s)
                    .map_err(|_| ProviderError::new(format!("Invalid quantity: {}", s)))
            }
        }
        other => Err(ProviderError::new(format!("Invalid quantity: {}", other))),
    }
}

/// 金额规范化为最小单位整数字符串（wei）
/// 十六进制/整数按wei处理；带小数点的十进制字符串按ether解析
pub fn normalize_value(value: Option<&Value>) -> Result<String, ProviderError> {
    let value = match value {
        None | Some(Value::Null) => return Ok("0".to_string()),
        Some(v) => v,
    };

    if let Value::String(s) = value {
        if s.contains('.') {
            let wei = parse_ether(s.as_str())
                .map_err(|e| ProviderError::new(format!("Invalid value {}: {}", s, e)))?;
            return Ok(wei.to_string());
        }
    }

    Ok(parse_quantity(value)?.to_string())
}

/// 数量字段转gwei小数字符串（托管后端的手续费单位）
fn to_gwei_string(value: &Value) -> Result<String, ProviderError> {
    let quantity = parse_quantity(value)?;
    format_units(quantity, "gwei")
        .map_err(|e| ProviderError::new(format!("Failed to convert fee to gwei: {}", e)))
}

/// 手续费风格分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeStyle {
    /// maxFeePerGas + maxPriorityFeePerGas + gas 全部给出
    Eip1559,
    /// gasPrice + gas 给出且非EIP-1559
    Legacy,
    /// 交给托管后端估算
    Unspecified,
}

/// 两种风格独立判定；同时满足时优先EIP-1559
pub fn classify_fee(tx: &TransactionRequest) -> FeeStyle {
    let has_gas = tx.gas.is_some();
    let is_eip1559 =
        tx.max_fee_per_gas.is_some() && tx.max_priority_fee_per_gas.is_some() && has_gas;
    let is_legacy = tx.gas_price.is_some() && has_gas && !is_eip1559;

    if is_eip1559 {
        FeeStyle::Eip1559
    } else if is_legacy {
        FeeStyle::Legacy
    } else {
        FeeStyle::Unspecified
    }
}

/// 构建托管转账/合约调用参数
/// `composite_id` 为已解析的 `vaultId_walletId_hdPath`；requestId由提交管线填充
pub fn build_transfer_args(
    tx: &TransactionRequest,
    composite_id: &str,
    chain_id: u64,
    asset_id: &str,
    chain_symbol: ChainSymbol,
    note: &str,
) -> Result<TransferArgs, ProviderError> {
    if let Some(tx_chain_id) = &tx.chain_id {
        let tx_chain_id = parse_quantity(tx_chain_id)?;
        if tx_chain_id != U256::from(chain_id) {
            return Err(ProviderError::new(format!(
                "Chain ID of the transaction ({}) does not match IronVaultWeb3Provider ({})",
                tx_chain_id, chain_id
            )));
        }
    }

    let from = tx
        .from
        .as_deref()
        .ok_or_else(|| ProviderError::new("Transaction sent with no \"from\" field"))?;

    let mut parts = composite_id.splitn(3, '_');
    let vault_id = parts.next().unwrap_or_default().to_string();
    let wallet_id = parts.next().unwrap_or_default().to_string();

    let to = match tx.to.as_deref() {
        Some(to) if !to.is_empty() => to.to_string(),
        _ => CONTRACT_CREATION_DESTINATION.to_string(),
    };

    let mut args = TransferArgs {
        request_id: String::new(),
        vault_id,
        wallet_id,
        asset_id: asset_id.to_string(),
        chain_symbol: chain_symbol.as_str().to_string(),
        from: from.to_string(),
        to,
        amount: normalize_value(tx.value.as_ref())?,
        note: note.to_string(),
        input_data: tx.data.clone().filter(|d| !d.is_empty()),
        fee: None,
        gas_limit: None,
    };

    let style = classify_fee(tx);
    if style == FeeStyle::Legacy {
        args.fee = tx.gas_price.as_ref().map(to_gwei_string).transpose()?;
    }
    if style != FeeStyle::Unspecified {
        let gas = tx
            .gas
            .as_ref()
            .ok_or_else(|| ProviderError::new("Missing gas for fee-bearing transaction"))?;
        args.gas_limit = Some(parse_quantity(gas)?.to_string());
    }

    Ok(args)
}
