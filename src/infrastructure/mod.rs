//! 基础设施层：HTTP传输、托管API客户端、日志

pub mod custody_api;
pub mod http_transport;
pub mod logging;

pub use custody_api::{CustodyApi, CustodyError, HttpCustodyApi};
pub use http_transport::{HttpTransport, RpcTransport};
