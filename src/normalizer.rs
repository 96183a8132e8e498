//! 内容规范化模块
//!
//! 把抓取到的页面转换为可翻译的Markdown文档：
//! 1. 删除 script/style/nav/footer
//! 2. 收集同站且在收录范围内的链接（改写前的绝对URL）
//! 3. 把这些链接改写为指向镜像译文页面的相对路径
//! 4. 本地化图片
//! 5. 翻译SVG内部文本
//! 6. 用占位符保护表格、图片和SVG
//! 7. 转换为Markdown

// 第三方crate导入
use markup5ever_rcdom::{Handle, RcDom};
use tracing::{debug, info};
use url::Url;

// 本地模块导入
use crate::config::MirrorConfig;
use crate::diagram::translate_diagrams;
use crate::error::Result;
use crate::html_processor::{detach, find_elements, find_first, get_attr, parse_html, serialize_node, set_attr};
use crate::media::{MediaLocalizer, MediaSummary};
use crate::mirror_error;
use crate::mirror_path::{relative_path, MirrorPath};
use crate::protector::{protect_structures, ProtectedSet};
use crate::translator::{TranslationBackend, TranslationClient};
use crate::web_crawler::WebCrawler;

/// 转换前删除的非正文元素
const STRIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer"];

/// 镜像中页面链接的扩展名（指向译文页面）
const PAGE_LINK_EXTENSION: &str = ".html";

/// 规范化后的文档
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    /// 来源URL
    pub source_url: Url,
    /// 含占位符的Markdown文本
    pub markdown: String,
    /// 占位符表
    pub placeholders: ProtectedSet,
    /// 发现的收录范围内链接
    pub links: Vec<Url>,
    /// 图片处理统计
    pub media: MediaSummary,
    /// SVG文本翻译批次数
    pub diagram_batches: usize,
}

/// 两个URL是否同一主机（含端口）
pub fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// 目标URL是否为收录范围内的同站链接
pub fn is_in_scope(target: &Url, base: &Url, scope_pattern: &str) -> bool {
    same_host(target, base) && target.path().contains(scope_pattern)
}

/// 删除非正文元素
pub fn strip_non_content(root: &Handle) {
    for element in find_elements(root, STRIPPED_TAGS) {
        detach(&element);
    }
}

/// 收集收录范围内的链接，返回改写前的绝对URL
///
/// 含 `#` 的链接只指向页面内的位置，不参与发现。
pub fn discover_links(root: &Handle, base_url: &Url, scope_pattern: &str) -> Vec<Url> {
    let mut links: Vec<Url> = Vec::new();
    for anchor in find_elements(root, &["a"]) {
        let Some(href) = get_attr(&anchor, "href") else {
            continue;
        };
        if href.contains('#') {
            continue;
        }
        if let Ok(target) = base_url.join(&href) {
            if is_in_scope(&target, base_url, scope_pattern) && !links.contains(&target) {
                links.push(target);
            }
        }
    }
    links
}

/// 把收录范围内的链接改写为镜像内的相对路径，保留片段标识
///
/// 返回改写的链接数量。
pub fn rewrite_links(root: &Handle, base_url: &Url, scope_pattern: &str) -> usize {
    let current_dir = MirrorPath::resolve(base_url).directory;
    let mut rewritten = 0;

    for anchor in find_elements(root, &["a"]) {
        let Some(href) = get_attr(&anchor, "href") else {
            continue;
        };
        let Ok(target) = base_url.join(&href) else {
            continue;
        };
        if !is_in_scope(&target, base_url, scope_pattern) {
            continue;
        }

        let target_path = MirrorPath::resolve(&target).base_path();
        let mut new_href = format!(
            "{}{}",
            relative_path(&current_dir, &target_path),
            PAGE_LINK_EXTENSION
        );
        if let Some(fragment) = target.fragment().filter(|f| !f.is_empty()) {
            new_href.push('#');
            new_href.push_str(fragment);
        }
        set_attr(&anchor, "href", &new_href);
        rewritten += 1;
    }

    rewritten
}

/// 页面正文根节点（没有body时退回整个文档）
fn content_root(dom: &RcDom) -> Handle {
    find_first(&dom.document, "body").unwrap_or_else(|| dom.document.clone())
}

/// 把HTML转换为Markdown
pub fn html_to_markdown(html: &str) -> Result<String> {
    htmd::convert(html).map_err(|e| mirror_error!(html_parse, format!("Markdown转换失败: {}", e)))
}

/// 内容规范化器
pub struct ContentNormalizer<'a, B: TranslationBackend> {
    config: &'a MirrorConfig,
    crawler: &'a WebCrawler,
    client: TranslationClient<'a, B>,
}

impl<'a, B: TranslationBackend> ContentNormalizer<'a, B> {
    pub fn new(config: &'a MirrorConfig, crawler: &'a WebCrawler, backend: &'a B) -> Self {
        Self {
            config,
            crawler,
            client: TranslationClient::new(backend, config),
        }
    }

    /// 抓取并完整规范化页面
    pub async fn fetch_and_normalize(&self, url: &Url) -> Result<NormalizedDocument> {
        let html = self.crawler.fetch_html(url).await?;
        self.normalize(&html, url).await
    }

    /// 抓取页面，只收集链接（不下载图片，不调用翻译后端）
    pub async fn fetch_and_harvest(&self, url: &Url) -> Result<Vec<Url>> {
        let html = self.crawler.fetch_html(url).await?;
        let dom = parse_html(&html)?;
        strip_non_content(&dom.document);
        Ok(discover_links(&dom.document, url, self.config.scope_pattern()))
    }

    /// 规范化已抓取的HTML
    pub async fn normalize(&self, html: &str, base_url: &Url) -> Result<NormalizedDocument> {
        let dom = parse_html(html)?;
        let scope = self.config.scope_pattern();

        strip_non_content(&dom.document);
        let links = discover_links(&dom.document, base_url, scope);
        let rewritten = rewrite_links(&dom.document, base_url, scope);
        debug!("🔗 发现 {} 个链接，改写 {} 个", links.len(), rewritten);

        let page_dir = MirrorPath::resolve(base_url).directory;
        let localizer = MediaLocalizer::new(self.crawler, self.config.output_dir());
        let media = localizer
            .localize_images(&dom.document, base_url, &page_dir)
            .await;
        if media.downloaded + media.failed > 0 {
            info!(
                "🖼️ 图片: 新下载 {}，已存在 {}，失败 {}",
                media.downloaded, media.cached, media.failed
            );
        }

        let diagram_batches = translate_diagrams(&dom.document, &self.client).await;

        let root = content_root(&dom);
        let placeholders = protect_structures(&root)?;
        let body_html = serialize_node(&root)?;
        let markdown = html_to_markdown(&body_html)?;

        Ok(NormalizedDocument {
            source_url: base_url.clone(),
            markdown,
            placeholders,
            links,
            media,
            diagram_batches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::BackendOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const BASE: &str = "https://www.example.com/x86/add.html";

    fn anchors_after_rewrite(html: &str) -> Vec<String> {
        let dom = parse_html(html).unwrap();
        let base = Url::parse(BASE).unwrap();
        rewrite_links(&dom.document, &base, "/x86/");
        find_elements(&dom.document, &["a"])
            .iter()
            .filter_map(|a| get_attr(a, "href"))
            .collect()
    }

    #[test]
    fn test_in_scope_link_is_rewritten_with_fragment() {
        let hrefs = anchors_after_rewrite(
            r##"<a href="sub.html#flags">SUB</a><a href="/x86/">index</a><a href="#top">top</a>"##,
        );
        assert_eq!(hrefs, vec!["sub.html#flags", "index.html", "add.html#top"]);
    }

    #[test]
    fn test_out_of_scope_and_cross_host_links_untouched() {
        let hrefs = anchors_after_rewrite(
            r#"<a href="/about.html">about</a><a href="https://other.org/x86/add.html">other</a><a href="mailto:a@b.c">mail</a>"#,
        );
        assert_eq!(
            hrefs,
            vec!["/about.html", "https://other.org/x86/add.html", "mailto:a@b.c"]
        );
    }

    #[test]
    fn test_discover_links_skips_fragments_and_duplicates() {
        let dom = parse_html(
            r##"<a href="sub.html">a</a><a href="sub.html">b</a><a href="mov.html#x">c</a><a href="/other/">d</a>"##,
        )
        .unwrap();
        let base = Url::parse(BASE).unwrap();
        let links = discover_links(&dom.document, &base, "/x86/");
        assert_eq!(
            links,
            vec![Url::parse("https://www.example.com/x86/sub.html").unwrap()]
        );
    }

    #[test]
    fn test_strip_non_content_removes_navigation() {
        let dom = parse_html(
            r#"<body><nav><a href="/x86/nav.html">n</a></nav><p>keep</p><script>x()</script><footer>f</footer></body>"#,
        )
        .unwrap();
        strip_non_content(&dom.document);
        let base = Url::parse(BASE).unwrap();
        assert!(discover_links(&dom.document, &base, "/x86/").is_empty());
        let html = crate::html_processor::serialize_dom_to_html(&dom).unwrap();
        assert!(html.contains("keep"));
        assert!(!html.contains("x()"));
        assert!(!html.contains("<footer"));
    }

    struct CountingBackend(AtomicUsize);

    #[async_trait]
    impl TranslationBackend for CountingBackend {
        async fn generate(&self, _prompt: &str) -> BackendOutcome {
            self.0.fetch_add(1, Ordering::SeqCst);
            BackendOutcome::Failed("offline".to_string())
        }
    }

    #[tokio::test]
    async fn test_normalize_protects_table_and_restores_exactly() {
        let out = tempfile::tempdir().unwrap();
        let config = MirrorConfig::new()
            .with_output_dir(out.path())
            .with_delays(Duration::ZERO, Duration::ZERO, Duration::ZERO);
        let crawler = WebCrawler::from_config(&config).unwrap();
        let backend = CountingBackend(AtomicUsize::new(0));
        let normalizer = ContentNormalizer::new(&config, &crawler, &backend);

        let html = r#"<html><body><h1>ADD</h1><p>Adds <a href="sub.html">SUB</a>.</p><table><tr><td>Opcode</td><td>Instruction</td></tr><tr><td>04 ib</td><td>ADD AL, imm8</td></tr></table></body></html>"#;
        let base = Url::parse(BASE).unwrap();
        let doc = normalizer.normalize(html, &base).await.unwrap();

        assert!(doc.markdown.contains("@@TABLE0@@"));
        assert!(!doc.markdown.contains("<table"));
        assert!(doc.markdown.contains("ADD"));
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.diagram_batches, 0);
        assert_eq!(backend.0.load(Ordering::SeqCst), 0);

        let raw_table = doc.placeholders.get("@@TABLE0@@").unwrap();
        assert!(raw_table.starts_with("<table>"));
        assert!(raw_table.contains("<td>ADD AL, imm8</td>"));
        assert!(doc.placeholders.restore(&doc.markdown).contains(raw_table));
    }
}
