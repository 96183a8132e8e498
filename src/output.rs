//! 输出模块
//!
//! 把某个语言版本的页面写入镜像目录：Markdown还原占位符后写入，
//! 同时渲染为引用共享样式表的HTML页面。

// 标准库导入
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// 第三方crate导入
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use tracing::info;
use url::Url;

// 本地模块导入
use crate::api_constants::output_config::TRANSLATED_SUFFIX;
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::mirror_error;
use crate::mirror_path::{relative_path, MirrorPath};
use crate::protector::ProtectedSet;

/// 共享样式表内容
const STYLESHEET: &str = r#"body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
    line-height: 1.6;
    padding: 20px;
    max-width: 96%;
    margin: 0 auto;
    color: #333;
    background-color: #f9f9f9;
}
h1 { border-bottom: 2px solid #eaecef; padding-bottom: .3em; }
h2 { border-bottom: 1px solid #eaecef; padding-bottom: .3em; margin-top: 24px; }
table { border-collapse: collapse; width: 100%; margin: 16px 0; overflow-x: auto; display: block; }
th, td { border: 1px solid #dfe2e5; padding: 6px 13px; min-width: 100px; }
th { background-color: #f6f8fa; font-weight: bold; }
tr:nth-child(2n) { background-color: #f6f8fa; }
img, svg { max-width: 100%; height: auto; display: block; margin: 1em 0; }
text, tspan { font-family: sans-serif; }
code { background-color: transparent; font-family: Consolas, "Courier New", monospace; font-weight: bold; color: #d63384; }
pre { background-color: #f6f8fa; padding: 16px; overflow: auto; border-radius: 6px; }
pre code { color: inherit; }
a { color: #0366d6; text-decoration: none; }
a:hover { text-decoration: underline; }

@media (prefers-color-scheme: dark) {
    body { background-color: #0d1117; color: #c9d1d9; }
    th { background-color: #161b22; border-color: #30363d; }
    td { border-color: #30363d; }
    tr:nth-child(2n) { background-color: #161b22; }
    code { color: #ff7b72; }
    pre { background-color: #161b22; }
    h1, h2 { border-color: #21262d; }
    a { color: #58a6ff; }
    img, svg { background-color: white; padding: 10px; border-radius: 4px; }
}
"#;

/// 页面的语言版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// 原文
    Original,
    /// 译文
    Translated,
}

fn caps_token_regex() -> &'static Regex {
    static CAPS: OnceLock<Regex> = OnceLock::new();
    CAPS.get_or_init(|| Regex::new(r"<([A-Z0-9][A-Z0-9_:-]*)>").expect("大写标记正则表达式无效"))
}

/// 把裸露的全大写尖括号标记（如 `<EAX>`）转义为可见文本
pub fn escape_caps_tokens(html: &str) -> String {
    caps_token_regex()
        .replace_all(html, "&lt;$1&gt;")
        .into_owned()
}

/// Markdown渲染为HTML片段
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut body = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut body, parser);
    escape_caps_tokens(&body)
}

/// 输出写入器
pub struct OutputMaterializer<'a> {
    config: &'a MirrorConfig,
}

impl<'a> OutputMaterializer<'a> {
    pub fn new(config: &'a MirrorConfig) -> Self {
        Self { config }
    }

    fn suffix(&self, variant: Variant) -> &str {
        match variant {
            Variant::Original => self.config.original_suffix(),
            Variant::Translated => TRANSLATED_SUFFIX,
        }
    }

    fn lang(&self, variant: Variant) -> &str {
        match variant {
            Variant::Original => "en",
            Variant::Translated => self.config.target_lang(),
        }
    }

    /// 在输出根目录写入共享样式表
    pub fn write_stylesheet(&self) -> Result<PathBuf> {
        let root = self.config.output_dir();
        fs::create_dir_all(root).map_err(|e| mirror_error!(file_op, root.display(), "创建目录", e))?;
        let path = root.join(self.config.stylesheet_name());
        fs::write(&path, STYLESHEET).map_err(|e| mirror_error!(file_op, path.display(), "写入", e))?;
        Ok(path)
    }

    /// 译文HTML的完整路径，它的存在表示页面已翻译
    pub fn translated_html_path(&self, url: &Url) -> PathBuf {
        self.config
            .output_dir()
            .join(MirrorPath::resolve(url).artifact(TRANSLATED_SUFFIX, "html"))
    }

    /// 页面是否已经翻译过
    pub fn is_translated(&self, url: &Url) -> bool {
        self.translated_html_path(url).exists()
    }

    /// 从页面目录指向共享样式表的相对路径
    pub fn stylesheet_href(&self, page_dir: &Path) -> String {
        relative_path(page_dir, Path::new(self.config.stylesheet_name()))
    }

    /// 生成完整的HTML页面
    ///
    /// `markdown` 中的占位符在渲染之后才替换为原始HTML，
    /// 避免表格或SVG中的空行把后续内容变成代码块。
    pub fn render_page(
        &self,
        markdown: &str,
        placeholders: &ProtectedSet,
        title: &str,
        stylesheet_href: &str,
        variant: Variant,
    ) -> String {
        let body = placeholders.restore_rendered(&markdown_to_html(markdown));
        format!(
            r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="{css}">
</head>
<body>
{body}
</body>
</html>
"#,
            lang = self.lang(variant),
            title = title,
            css = stylesheet_href,
            body = body,
        )
    }

    /// 写入一个语言版本的 `.md` 和 `.html`，返回两个文件的路径
    ///
    /// `markdown` 含占位符；`.md` 写入还原后的文本。
    pub fn write_variant(
        &self,
        url: &Url,
        markdown: &str,
        placeholders: &ProtectedSet,
        variant: Variant,
    ) -> Result<(PathBuf, PathBuf)> {
        let mirror = MirrorPath::resolve(url);
        let suffix = self.suffix(variant);
        let root = self.config.output_dir();

        let directory = root.join(&mirror.directory);
        fs::create_dir_all(&directory)
            .map_err(|e| mirror_error!(file_op, directory.display(), "创建目录", e))?;

        let md_path = root.join(mirror.artifact(suffix, "md"));
        fs::write(&md_path, placeholders.restore(markdown)).map_err(|e| mirror_error!(file_op, md_path.display(), "写入", e))?;

        let title = format!("{}{}", mirror.basename, suffix);
        let page = self.render_page(
            markdown,
            placeholders,
            &title,
            &self.stylesheet_href(&mirror.directory),
            variant,
        );
        let html_path = root.join(mirror.artifact(suffix, "html"));
        fs::write(&html_path, page).map_err(|e| mirror_error!(file_op, html_path.display(), "写入", e))?;

        let label = match variant {
            Variant::Original => "原文",
            Variant::Translated => "译文",
        };
        info!("  -> {}保存完成: {}", label, html_path.display());
        Ok((md_path, html_path))
    }
}
