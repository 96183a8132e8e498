use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use walkdir::WalkDir;

use crate::api_constants::output_config::ORIGINAL_SUFFIX;

/// 镜像中视为图片的文件扩展名
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico"];

/// 一次抓取运行的统计
#[derive(Debug, Clone)]
pub struct CrawlStats {
    pub started_at: DateTime<Local>,
    pub pages_translated: usize,
    pub pages_skipped: usize,
    pub pages_failed: usize,
    pub chunks: usize,
    pub chunk_fallbacks: usize,
    pub diagram_batches: usize,
    pub images_downloaded: usize,
    pub images_failed: usize,
    pub placeholders_lost: usize,
    /// 结束时队列中剩余的URL数
    pub urls_pending: usize,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            pages_translated: 0,
            pages_skipped: 0,
            pages_failed: 0,
            chunks: 0,
            chunk_fallbacks: 0,
            diagram_batches: 0,
            images_downloaded: 0,
            images_failed: 0,
            placeholders_lost: 0,
            urls_pending: 0,
        }
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

/// 输出目录中的产物清点结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorInventory {
    pub translated_pages: usize,
    pub original_pages: usize,
    pub images: usize,
}

impl MirrorInventory {
    /// 遍历输出目录统计页面和图片
    pub fn scan(root: &Path) -> Self {
        let original_marker = format!("{}.html", ORIGINAL_SUFFIX);
        let mut inventory = Self::default();

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            let extension = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            if name.ends_with(&original_marker) {
                inventory.original_pages += 1;
            } else if extension == "html" {
                inventory.translated_pages += 1;
            } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
                inventory.images += 1;
            }
        }

        inventory
    }
}

/// 打印运行统计
pub fn print_crawl_report(stats: &CrawlStats, inventory: &MirrorInventory, total_duration: Duration) {
    println!("\n📊 镜像翻译报告:");
    println!("═══════════════════════════════════════");
    println!("🕐 开始时间: {}", stats.started_at.format("%Y-%m-%d %H:%M:%S"));
    println!("   总耗时: {}", format_duration(total_duration));

    // 页面统计
    println!("\n📄 页面统计:");
    println!("   新翻译: {} 页", stats.pages_translated);
    println!("   已存在跳过: {} 页", stats.pages_skipped);
    println!("   失败: {} 页", stats.pages_failed);
    println!("   队列剩余: {} 个", stats.urls_pending);

    // 翻译统计
    println!("\n🔤 翻译统计:");
    println!("   分块: {} 个", stats.chunks);
    println!("   回退原文: {} 个", stats.chunk_fallbacks);
    println!("   SVG批次: {} 个", stats.diagram_batches);
    if stats.placeholders_lost > 0 {
        println!("   ⚠️  丢失占位符: {} 个", stats.placeholders_lost);
    }
    if stats.chunks > 0 {
        let success_rate = 1.0 - stats.chunk_fallbacks as f64 / stats.chunks as f64;
        println!("   成功率: {:.1}%", success_rate * 100.0);
    }

    // 图片统计
    println!("\n🖼️  图片统计:");
    println!("   新下载: {} 个", stats.images_downloaded);
    println!("   下载失败: {} 个", stats.images_failed);

    // 输出目录
    println!("\n💾 输出目录:");
    println!("   译文页面: {} 个", inventory.translated_pages);
    println!("   原文页面: {} 个", inventory.original_pages);
    println!("   图片文件: {} 个", inventory.images);
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
