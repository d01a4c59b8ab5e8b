//! 签名请求生命周期状态

use serde::{Deserialize, Serialize};

/// 托管后端的签名请求状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignStatus {
    /// 等待MPC签名完成
    Pending,
    /// 签名成功，签名值可用
    Success,
    /// 签名失败
    Failure,
    /// 未知状态码（按终态处理）
    Unknown(i64),
}

impl SignStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Success,
            2 => Self::Failure,
            other => Self::Unknown(other),
        }
    }

    /// 是否仍需继续轮询
    pub fn is_pollable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}
