//! 通用工具

pub mod eip712;

pub use eip712::{canonicalize, parse_typed_data, TypedDataPayload};

