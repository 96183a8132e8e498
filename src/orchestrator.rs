//! 抓取调度模块
//!
//! 按先进先出顺序处理队列中的URL：已翻译的页面只重新收集链接，
//! 未翻译的页面经过规范化、分块翻译后写出两个语言版本。
//! 新翻译页数达到上限或队列为空时结束。

// 第三方crate导入
use tracing::{error, info, warn};
use url::Url;

// 本地模块导入
use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};
use crate::frontier::{Frontier, VisitedSet};
use crate::normalizer::ContentNormalizer;
use crate::output::{OutputMaterializer, Variant};
use crate::stats::CrawlStats;
use crate::translator::{TranslationBackend, TranslationClient};
use crate::utils::polite_pause;
use crate::web_crawler::WebCrawler;

/// 单个页面的处理结果
#[derive(Debug)]
pub enum PageOutcome {
    /// 新翻译完成
    Translated { links: Vec<Url> },
    /// 译文已存在，只收集了链接
    AlreadyTranslated { links: Vec<Url> },
    /// 页面抓取失败
    FetchFailed,
}

/// 站点镜像调度器
pub struct SiteMirror<'a, B: TranslationBackend> {
    config: &'a MirrorConfig,
    crawler: &'a WebCrawler,
    backend: &'a B,
    frontier: Frontier,
    visited: VisitedSet,
    stats: CrawlStats,
}

impl<'a, B: TranslationBackend> SiteMirror<'a, B> {
    pub fn new(config: &'a MirrorConfig, crawler: &'a WebCrawler, backend: &'a B) -> Self {
        Self {
            config,
            crawler,
            backend,
            frontier: Frontier::new(),
            visited: VisitedSet::new(),
            stats: CrawlStats::new(),
        }
    }

    /// 从起始URL开始抓取，返回本次运行的统计
    pub async fn run(mut self, start_url: Url) -> Result<CrawlStats> {
        let output = OutputMaterializer::new(self.config);
        let stylesheet = output.write_stylesheet()?;
        info!("🎨 样式表: {}", stylesheet.display());

        let normalizer = ContentNormalizer::new(self.config, self.crawler, self.backend);
        let limit = self.config.max_new_translations();
        self.frontier.push(start_url);

        loop {
            if limit > 0 && self.stats.pages_translated >= limit {
                info!("🛑 已达到新翻译页数上限 ({})，结束抓取", limit);
                break;
            }
            let Some(url) = self.frontier.pop() else {
                break;
            };
            if self.visited.contains(&url) {
                continue;
            }

            let links = match self.process_page(&normalizer, &output, &url).await {
                Ok(PageOutcome::Translated { links }) => {
                    self.visited.insert(&url);
                    self.stats.pages_translated += 1;
                    if limit > 0 {
                        info!("  (进度: {}/{})", self.stats.pages_translated, limit);
                    }
                    polite_pause(self.config.page_delay()).await;
                    links
                }
                Ok(PageOutcome::AlreadyTranslated { links }) => {
                    self.visited.insert(&url);
                    self.stats.pages_skipped += 1;
                    links
                }
                Ok(PageOutcome::FetchFailed) => {
                    self.stats.pages_failed += 1;
                    continue;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("❌ 页面处理失败 {}: {}", url, e);
                    self.stats.pages_failed += 1;
                    continue;
                }
            };

            self.enqueue(links);
        }

        self.stats.urls_pending = self.frontier.len();
        if self.stats.urls_pending > 0 {
            info!("📋 队列中还有 {} 个未处理的URL", self.stats.urls_pending);
        }
        Ok(self.stats)
    }

    /// 把未访问且未排队的链接加入队列
    fn enqueue(&mut self, links: Vec<Url>) {
        let mut added = 0;
        for link in links {
            if !self.visited.contains(&link) && self.frontier.push(link) {
                added += 1;
            }
        }
        if added > 0 {
            info!("🔗 新增 {} 个待处理链接 (队列: {})", added, self.frontier.len());
        }
    }

    /// 处理单个页面
    ///
    /// 抓取失败返回 `FetchFailed`，写文件等其他错误向上返回。
    pub async fn process_page(
        &mut self,
        normalizer: &ContentNormalizer<'a, B>,
        output: &OutputMaterializer<'_>,
        url: &Url,
    ) -> Result<PageOutcome> {
        if output.is_translated(url) {
            info!("⏭️ [跳过] 已翻译: {}", url);
            return match normalizer.fetch_and_harvest(url).await {
                Ok(links) => Ok(PageOutcome::AlreadyTranslated { links }),
                Err(e) => fetch_failure(url, e),
            };
        }

        info!("🚀 [开始处理] {}", url);
        let document = match normalizer.fetch_and_normalize(url).await {
            Ok(document) => document,
            Err(e) => return fetch_failure(url, e),
        };
        self.stats.images_downloaded += document.media.downloaded;
        self.stats.images_failed += document.media.failed;
        self.stats.diagram_batches += document.diagram_batches;

        output.write_variant(url, &document.markdown, &document.placeholders, Variant::Original)?;

        let client = TranslationClient::new(self.backend, self.config);
        let translation = client.translate_document(&document.markdown).await;
        self.stats.chunks += translation.chunks;
        self.stats.chunk_fallbacks += translation.fallbacks;
        if translation.fallbacks > 0 {
            warn!(
                "⚠️ {} 个分块使用了原文 (共 {} 个)",
                translation.fallbacks, translation.chunks
            );
        }

        let missing = document.placeholders.missing_tokens(&translation.text);
        if !missing.is_empty() {
            warn!("⚠️ 译文中丢失了 {} 个占位符: {}", missing.len(), missing.join(", "));
            self.stats.placeholders_lost += missing.len();
        }
        output.write_variant(url, &translation.text, &document.placeholders, Variant::Translated)?;

        info!("✅ 翻译完成: {}", url);
        Ok(PageOutcome::Translated {
            links: document.links,
        })
    }
}

/// 网络错误只影响当前页面，其他错误继续向上返回
fn fetch_failure(url: &Url, e: MirrorError) -> Result<PageOutcome> {
    match e {
        MirrorError::Network { .. } => {
            warn!("🌐 [抓取失败] {}: {}", url, e);
            Ok(PageOutcome::FetchFailed)
        }
        other => Err(other),
    }
}
