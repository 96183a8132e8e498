use std::time::Duration;

use tracing::debug;

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 请求间隔等待，零时长直接返回
pub async fn polite_pause(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    debug!("💤 等待 {:?}", delay);
    tokio::time::sleep(delay).await;
}
