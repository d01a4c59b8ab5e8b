//! eth_sendTransaction完整路径测试
//! 覆盖托管转账参数映射、端点选择、状态跟踪与失败诊断

mod common;

use serde_json::{json, Value};

use common::{default_provider, ok, rejected, TEST_ADDRESS};
use ironvault_web3_provider::domain::RequestArguments;
use ironvault_web3_provider::infrastructure::custody_api::TransactionPollInfo;

const RECIPIENT: &str = "0x2222222222222222222222222222222222222222";

fn send_tx(tx: Value) -> RequestArguments {
    RequestArguments { method: "eth_sendTransaction".to_string(), params: Some(json!([tx])) }
}

fn poll(state: i64, tx_hash: Option<&str>) -> ironvault_web3_provider::infrastructure::custody_api::CustodyResponse<TransactionPollInfo> {
    ok(Some(TransactionPollInfo { state, tx_hash: tx_hash.map(String::from) }))
}

#[tokio::test]
async fn test_transfer_args_mapping() {
    let (provider, custody, _) = default_provider();
    let result = provider
        .request(send_tx(json!({
            "from": TEST_ADDRESS,
            "to": RECIPIENT,
            "value": "0xde0b6b3a7640000"
        })))
        .await
        .unwrap();
    assert_eq!(result, json!("0xfeedface"));

    let captured = custody.captured_transfers.lock().unwrap();
    assert_eq!(captured.len(), 1);
    let args = &captured[0];
    assert_eq!(args.vault_id, "v1");
    assert_eq!(args.wallet_id, "w1");
    assert_eq!(args.asset_id, "ETH_SEPOLIA");
    assert_eq!(args.chain_symbol, "SEPOLIA");
    assert_eq!(args.from, TEST_ADDRESS);
    assert_eq!(args.to, RECIPIENT);
    assert_eq!(args.amount, "1000000000000000000");
    assert_eq!(args.note, "Created by IronVault Web3 Provider");
    assert!(!args.request_id.is_empty());
    assert!(args.input_data.is_none());
}

#[tokio::test]
async fn test_tracks_status_until_completed() {
    let (provider, custody, _) = default_provider();
    *custody.poll_states.lock().unwrap() = vec![
        poll(0, None),
        poll(1, None),
        poll(10, Some("0xdeadbeef")),
    ];
    let result = provider
        .request(send_tx(json!({ "from": TEST_ADDRESS, "to": RECIPIENT, "value": "0x1" })))
        .await
        .unwrap();
    assert_eq!(result, json!("0xdeadbeef"));
    assert!(custody.poll_states.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_tracking_survives_transient_transport_errors() {
    let (provider, custody, _) = default_provider();
    // 前两次查询抛出传输层错误，轮询应继续而不是放弃追踪
    *custody.poll_errors_before.lock().unwrap() = 2;
    *custody.poll_states.lock().unwrap() = vec![poll(10, Some("0xdeadbeef"))];
    let result = provider
        .request(send_tx(json!({ "from": TEST_ADDRESS, "to": RECIPIENT, "value": "0x1" })))
        .await
        .unwrap();
    assert_eq!(result, json!("0xdeadbeef"));
    assert_eq!(*custody.poll_calls.lock().unwrap(), 3);
}

#[tokio::test]
async fn test_contract_call_uses_transaction_endpoint() {
    let (provider, custody, _) = default_provider();
    provider
        .request(send_tx(json!({
            "from": TEST_ADDRESS,
            "to": RECIPIENT,
            "data": "0xa9059cbb"
        })))
        .await
        .unwrap();
    assert_eq!(*custody.transaction_calls.lock().unwrap(), 1);
    assert_eq!(*custody.transfer_calls.lock().unwrap(), 0);
    let captured = custody.captured_transfers.lock().unwrap();
    assert_eq!(captured[0].input_data.as_deref(), Some("0xa9059cbb"));
}

#[tokio::test]
async fn test_input_alias_selects_transaction_endpoint() {
    let (provider, custody, _) = default_provider();
    provider
        .request(send_tx(json!({
            "from": TEST_ADDRESS,
            "to": RECIPIENT,
            "input": "0xa9059cbb"
        })))
        .await
        .unwrap();
    assert_eq!(*custody.transaction_calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_missing_to_becomes_contract_creation_sentinel() {
    let (provider, custody, _) = default_provider();
    provider
        .request(send_tx(json!({ "from": TEST_ADDRESS, "data": "0x6080" })))
        .await
        .unwrap();
    let captured = custody.captured_transfers.lock().unwrap();
    assert_eq!(captured[0].to, "0x0");
}

#[tokio::test]
async fn test_legacy_fee_and_gas_limit_forwarded() {
    let (provider, custody, _) = default_provider();
    provider
        .request(send_tx(json!({
            "from": TEST_ADDRESS,
            "to": RECIPIENT,
            "gasPrice": "0x4a817c800",
            "gas": "0x5208"
        })))
        .await
        .unwrap();
    let captured = custody.captured_transfers.lock().unwrap();
    assert_eq!(captured[0].fee.as_deref(), Some("20.000000000"));
    assert_eq!(captured[0].gas_limit.as_deref(), Some("21000"));
}

#[tokio::test]
async fn test_eip1559_omits_legacy_fee() {
    let (provider, custody, _) = default_provider();
    provider
        .request(send_tx(json!({
            "from": TEST_ADDRESS,
            "to": RECIPIENT,
            "maxFeePerGas": "0x77359400",
            "maxPriorityFeePerGas": "0x3b9aca00",
            "gas": "0x5208"
        })))
        .await
        .unwrap();
    let captured = custody.captured_transfers.lock().unwrap();
    assert!(captured[0].fee.is_none());
    assert_eq!(captured[0].gas_limit.as_deref(), Some("21000"));
}

#[tokio::test]
async fn test_chain_id_mismatch_rejected_before_submission() {
    let (provider, custody, _) = default_provider();
    let err = provider
        .request(send_tx(json!({
            "from": TEST_ADDRESS,
            "to": RECIPIENT,
            "chainId": "0x1"
        })))
        .await
        .unwrap_err();
    assert!(err.message.contains("does not match"));
    assert!(custody.captured_transfers.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_from_rejected() {
    let (provider, _, _) = default_provider();
    let err = provider
        .request(send_tx(json!({ "to": RECIPIENT })))
        .await
        .unwrap_err();
    assert!(err.message.contains("no \"from\" field"));
}

#[tokio::test]
async fn test_unsupported_from_address_lists_alternatives() {
    let (provider, _, _) = default_provider();
    let err = provider
        .request(send_tx(json!({
            "from": "0x0000000000000000000000000000000000000001",
            "to": RECIPIENT
        })))
        .await
        .unwrap_err();
    assert!(err.message.starts_with("Transaction sent from an unsupported address: "));
    assert!(err.message.contains("Available addresses"));
    assert!(err.message.contains(TEST_ADDRESS));
}

#[tokio::test]
async fn test_submit_rejection_carries_simulation_link() {
    let (provider, custody, _) = default_provider();
    *custody.submit_response.lock().unwrap() = rejected("insufficient balance");
    let err = provider
        .request(send_tx(json!({
            "from": TEST_ADDRESS,
            "to": RECIPIENT,
            "value": "0x1"
        })))
        .await
        .unwrap_err();
    assert!(err.message.contains("CreateTransfer error: insufficient balance"));
    assert!(err
        .message
        .contains("Simulate this transaction on Tenderly: https://dashboard.tenderly.co/simulator/new?"));
}

#[tokio::test]
async fn test_simulation_link_suppressed_when_disabled() {
    let custody = std::sync::Arc::new(common::MockCustodyApi::default());
    let transport = std::sync::Arc::new(common::MockTransport::default());
    let mut config = common::test_config();
    config.enhanced_error_handling = false;
    let provider = common::build_provider(config, custody.clone(), transport);

    *custody.submit_response.lock().unwrap() = rejected("insufficient balance");
    let err = provider
        .request(send_tx(json!({ "from": TEST_ADDRESS, "to": RECIPIENT })))
        .await
        .unwrap_err();
    assert!(!err.message.contains("Tenderly"));
}

#[tokio::test]
async fn test_failed_terminal_status_returns_without_hash() {
    let (provider, custody, _) = default_provider();
    *custody.poll_states.lock().unwrap() = vec![poll(5, None)];
    // 失败终态不报错，只是没有交易哈希
    let result = provider
        .request(send_tx(json!({ "from": TEST_ADDRESS, "to": RECIPIENT, "value": "0x1" })))
        .await
        .unwrap();
    assert_eq!(result, json!(""));
}

#[tokio::test]
async fn test_estimate_gas_failure_carries_simulation_link() {
    let (provider, _, transport) = default_provider();
    transport.respond_to(
        "eth_estimateGas",
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": 3, "message": "execution reverted" }
        }),
    );
    let err = provider
        .request(RequestArguments {
            method: "eth_estimateGas".to_string(),
            params: Some(json!([{ "from": TEST_ADDRESS, "to": RECIPIENT, "data": "0x01" }])),
        })
        .await
        .unwrap_err();
    assert!(err.message.contains("execution reverted"));
    assert!(err.message.contains("dashboard.tenderly.co/simulator/new?"));
    assert!(err.message.contains("network=11155111"));
}

#[tokio::test]
async fn test_decimal_ether_value_normalized_to_wei() {
    let (provider, custody, _) = default_provider();
    provider
        .request(send_tx(json!({ "from": TEST_ADDRESS, "to": RECIPIENT, "value": "1.5" })))
        .await
        .unwrap();
    let captured = custody.captured_transfers.lock().unwrap();
    assert_eq!(captured[0].amount, "1500000000000000000");
}
