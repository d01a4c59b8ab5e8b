//! 诊断日志配置
//! 三个诊断目标对应三类输出：请求/响应对、交易状态变迁、增强错误信息
//! 既可通过配置开关启用，也可用RUST_LOG环境变量直接控制

use tracing_subscriber::EnvFilter;

use crate::config::ProviderConfig;

/// 编号的请求/响应对
pub const TARGET_REQ_RES: &str = "ironvault_web3_provider::req_res";
/// 交易状态变迁
pub const TARGET_TX_STATUS: &str = "ironvault_web3_provider::status";
/// 增强错误处理（模拟链接等调试辅助）
pub const TARGET_ERROR: &str = "ironvault_web3_provider::error";

/// 根据配置开关组装过滤指令
pub fn filter_directives(config: &ProviderConfig) -> String {
    let mut directives: Vec<String> = Vec::new();
    if let Ok(env) = std::env::var("RUST_LOG") {
        if !env.is_empty() {
            directives.push(env);
        }
    }
    if config.log_transaction_status_changes {
        directives.push(format!("{}=debug", TARGET_TX_STATUS));
    }
    if config.enhanced_error_handling {
        directives.push(format!("{}=debug", TARGET_ERROR));
    }
    if config.log_requests_and_responses {
        directives.push(format!("{}=debug", TARGET_REQ_RES));
    }
    directives.join(",")
}

/// 安装全局subscriber；宿主程序已装有subscriber时静默跳过
pub fn enable_diagnostics(config: &ProviderConfig) {
    let directives = filter_directives(config);
    if directives.is_empty() {
        return;
    }
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .ok();
}
