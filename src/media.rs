//! 图片本地化模块
//!
//! 把页面引用的图片下载到镜像目录，并把 `src` 改写为相对当前页面的路径，
//! 使离线浏览时图片可以正常显示。已经存在的文件不会重复下载。

// 标准库导入
use std::path::Path;

// 第三方crate导入
use markup5ever_rcdom::Handle;
use tracing::{debug, warn};
use url::Url;

// 本地模块导入
use crate::html_processor::{find_elements, get_attr, remove_attr, set_attr};
use crate::mirror_path::{asset_path, relative_path};
use crate::web_crawler::WebCrawler;

/// 响应式图片属性，指向的资源不会被镜像
const RESPONSIVE_ATTRS: &[&str] = &["srcset", "sizes"];

/// 单个图片的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOutcome {
    /// 新下载
    Downloaded,
    /// 镜像中已存在
    Cached,
    /// 下载或写入失败，引用保持不变
    Failed,
    /// 无需处理（缺少src、data URI、无法解析等）
    Skipped,
}

/// 一个页面的图片处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaSummary {
    pub downloaded: usize,
    pub cached: usize,
    pub failed: usize,
}

impl MediaSummary {
    fn record(&mut self, outcome: MediaOutcome) {
        match outcome {
            MediaOutcome::Downloaded => self.downloaded += 1,
            MediaOutcome::Cached => self.cached += 1,
            MediaOutcome::Failed => self.failed += 1,
            MediaOutcome::Skipped => {}
        }
    }
}

/// 图片本地化器
pub struct MediaLocalizer<'a> {
    crawler: &'a WebCrawler,
    output_dir: &'a Path,
}

impl<'a> MediaLocalizer<'a> {
    pub fn new(crawler: &'a WebCrawler, output_dir: &'a Path) -> Self {
        Self { crawler, output_dir }
    }

    /// 处理单个 `<img>` 元素
    ///
    /// `page_dir` 是当前页面在镜像树中的目录（相对于输出根目录）。
    pub async fn localize_image(&self, img: &Handle, base_url: &Url, page_dir: &Path) -> MediaOutcome {
        let Some(src) = get_attr(img, "src") else {
            return MediaOutcome::Skipped;
        };
        if src.trim().is_empty() || src.starts_with("data:") {
            return MediaOutcome::Skipped;
        }

        let image_url = match base_url.join(src.trim()) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url,
            Ok(_) => return MediaOutcome::Skipped,
            Err(e) => {
                warn!("    [图片错误] 无法解析 {}: {}", src, e);
                return MediaOutcome::Skipped;
            }
        };
        let Some(relative) = asset_path(&image_url) else {
            return MediaOutcome::Skipped;
        };
        let full_path = self.output_dir.join(&relative);

        let outcome = if full_path.exists() {
            debug!("图片已存在，跳过下载: {}", full_path.display());
            MediaOutcome::Cached
        } else {
            match self.download(&image_url, &full_path).await {
                Ok(()) => MediaOutcome::Downloaded,
                Err(e) => {
                    warn!("    [图片错误] {}: {}", src, e);
                    return MediaOutcome::Failed;
                }
            }
        };

        set_attr(img, "src", &relative_path(page_dir, &relative));
        for attr in RESPONSIVE_ATTRS {
            remove_attr(img, attr);
        }
        outcome
    }

    async fn download(&self, url: &Url, full_path: &Path) -> crate::error::Result<()> {
        let bytes = self.crawler.fetch_bytes(url).await?;
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::mirror_error!(file_op, parent.display(), "创建目录", e))?;
        }
        std::fs::write(full_path, &bytes)
            .map_err(|e| crate::mirror_error!(file_op, full_path.display(), "写入", e))?;
        debug!("⬇️ 图片已保存: {} ({} 字节)", full_path.display(), bytes.len());
        Ok(())
    }

    /// 处理 `root` 下的所有图片
    pub async fn localize_images(&self, root: &Handle, base_url: &Url, page_dir: &Path) -> MediaSummary {
        let mut summary = MediaSummary::default();
        for img in find_elements(root, &["img"]) {
            let outcome = self.localize_image(&img, base_url, page_dir).await;
            summary.record(outcome);
        }
        summary
    }
}
