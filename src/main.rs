use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use tracing::{error, info};

use mirror_translator::config::{Cli, MirrorConfig};
use mirror_translator::orchestrator::SiteMirror;
use mirror_translator::stats::{format_duration, print_crawl_report, MirrorInventory};
use mirror_translator::translator::GeminiBackend;
use mirror_translator::utils::init_logging;
use mirror_translator::web_crawler::{validate_start_url, WebCrawler};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    // 启动前完成所有校验，任何一项失败都不开始抓取
    let start_url = match validate_start_url(&cli.url) {
        Ok(url) => url,
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let config = MirrorConfig::from_cli(&cli);
    if let Err(e) = config.validate() {
        error!("❌ {}", e);
        std::process::exit(1);
    }

    let backend = match GeminiBackend::from_env(&config) {
        Ok(backend) => backend,
        Err(e) => {
            error!("❌ 无法初始化翻译后端: {}", e);
            std::process::exit(1);
        }
    };

    let crawler = WebCrawler::from_config(&config)?;

    if !cli.quiet {
        info!("🚀 启动镜像翻译");
        info!("🌐 起始URL: {}", start_url);
        info!("📂 输出目录: {}", config.output_dir().display());
        info!("🔤 目标语言: {} ({})", config.target_language_name(), config.target_lang());
        match config.max_new_translations() {
            0 => info!("📏 新翻译页数上限: 不限"),
            limit => info!("📏 新翻译页数上限: {}", limit),
        }
    }

    let total_start = Instant::now();
    let stats = SiteMirror::new(&config, &crawler, &backend)
        .run(start_url)
        .await?;
    let total_duration = total_start.elapsed();

    if !cli.quiet {
        info!(
            "✅ 抓取结束: 新翻译 {} 页，跳过 {} 页，失败 {} 页，耗时 {}",
            stats.pages_translated,
            stats.pages_skipped,
            stats.pages_failed,
            format_duration(total_duration)
        );
    }

    // 显示运行统计
    if cli.stats || cli.verbose {
        let inventory = MirrorInventory::scan(config.output_dir());
        print_crawl_report(&stats, &inventory, total_duration);
    }

    Ok(())
}
