//! 领域类型：链标识、JSON-RPC报文、托管生命周期状态机

pub mod chain;
pub mod rpc;
pub mod sign_status;
pub mod transaction_status;

pub use chain::{asset_for, ApiBaseUrl, Asset, ChainSymbol};
pub use rpc::{JsonRpcRequest, JsonRpcResponse, RequestArguments, RpcErrorObject, RpcMethod};
pub use sign_status::SignStatus;
pub use transaction_status::TransactionStatus;
