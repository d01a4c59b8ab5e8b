//! 托管交易状态机
//! 状态码与托管后端的序数编码一一对应

use std::fmt;

use serde::{Deserialize, Serialize};

/// 托管后端的交易生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// 交易已提交，等待审批
    Submitted,
    /// 交易已通过审批
    Auditted,
    /// 交易广播中
    Broadcasting,
    /// 交易被风控拦截
    Blocked,
    /// 交易失败
    Failed,
    /// 广播超时
    BroadcastTimeout,
    /// 交易已上链完成
    Completed,
    /// 交易回滚
    Rollback,
    /// 等待审批超时
    WaitAudit,
    /// 审批被拒绝
    Rejected,
    /// 交易已取消
    Cancelled,
    /// 后端返回了未知状态码（保守地按终态处理）
    Unknown(i64),
}

impl TransactionStatus {
    /// 从托管后端的状态码解析
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Submitted,
            1 => Self::Auditted,
            2 => Self::Broadcasting,
            4 => Self::Blocked,
            5 => Self::Failed,
            6 => Self::BroadcastTimeout,
            10 => Self::Completed,
            11 => Self::Rollback,
            12 => Self::WaitAudit,
            13 => Self::Rejected,
            14 => Self::Cancelled,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Submitted => 0,
            Self::Auditted => 1,
            Self::Broadcasting => 2,
            Self::Blocked => 4,
            Self::Failed => 5,
            Self::BroadcastTimeout => 6,
            Self::Completed => 10,
            Self::Rollback => 11,
            Self::WaitAudit => 12,
            Self::Rejected => 13,
            Self::Cancelled => 14,
            Self::Unknown(code) => *code,
        }
    }

    /// 是否仍需继续轮询
    pub fn is_pollable(&self) -> bool {
        matches!(self, Self::Submitted | Self::Auditted | Self::Broadcasting)
    }

    /// 是否为最终成功状态
    /// 广播中即视为成功：交易已离开托管审批流，哈希已可用
    pub fn is_final_successful(&self) -> bool {
        matches!(self, Self::Completed | Self::Broadcasting | Self::Rollback)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submitted => "SUBMITTED",
            Self::Auditted => "AUDITTED",
            Self::Broadcasting => "BROADCASTING",
            Self::Blocked => "BLOCKED",
            Self::Failed => "FAILED",
            Self::BroadcastTimeout => "BROADCAST_TIMEOUT",
            Self::Completed => "COMPLETED",
            Self::Rollback => "ROLLBACK",
            Self::WaitAudit => "WAITAUDIT",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown(code) => return write!(f, "UNKNOWN({})", code),
        };
        write!(f, "{}({})", name, self.code())
    }
}
