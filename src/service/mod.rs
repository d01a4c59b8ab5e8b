//! 业务服务层：账户发现、链上下文、交易构建与两条轮询管线

pub mod account_resolver;
pub mod chain_context;
pub mod sign_poller;
pub mod transaction_builder;
pub mod transaction_poller;

pub use account_resolver::{AccountMap, AccountResolver};
pub use chain_context::ChainContext;
pub use sign_poller::SignPoller;
pub use transaction_builder::{build_transfer_args, classify_fee, FeeStyle, TransactionRequest};
pub use transaction_poller::{TransactionLifecycleRecord, TransactionPoller};
