//! 结构保护模块
//!
//! 在转换为Markdown之前，把表格、图片和SVG整体替换为占位符，
//! 翻译完成后再按原样还原，避免翻译后端改写或破坏这些结构。

// 第三方crate导入
use markup5ever_rcdom::Handle;
use tracing::debug;

// 本地模块导入
use crate::error::Result;
use crate::html_processor::{find_elements, is_descendant_of, replace_with_text, serialize_node};

/// 受保护结构的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedKind {
    Table,
    Image,
    VectorGraphic,
}

impl ProtectedKind {
    /// 对应的HTML标签名
    pub fn tag(self) -> &'static str {
        match self {
            ProtectedKind::Table => "table",
            ProtectedKind::Image => "img",
            ProtectedKind::VectorGraphic => "svg",
        }
    }

    /// 占位符中的类别标记
    fn label(self) -> &'static str {
        match self {
            ProtectedKind::Table => "TABLE",
            ProtectedKind::Image => "IMG",
            ProtectedKind::VectorGraphic => "SVG",
        }
    }

    /// 生成占位符，如 `@@TABLE0@@`
    pub fn placeholder(self, index: usize) -> String {
        format!("@@{}{}@@", self.label(), index)
    }
}

/// 单个受保护的结构
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedElement {
    /// 占位符
    pub token: String,
    /// 类别
    pub kind: ProtectedKind,
    /// 原始HTML
    pub raw: String,
}

/// 按替换顺序排列的占位符表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedSet {
    elements: Vec<ProtectedElement>,
}

impl ProtectedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProtectedElement> {
        self.elements.iter()
    }

    /// 按占位符查找原始HTML
    pub fn get(&self, token: &str) -> Option<&str> {
        self.elements
            .iter()
            .find(|element| element.token == token)
            .map(|element| element.raw.as_str())
    }

    fn push(&mut self, kind: ProtectedKind, index: usize, raw: String) {
        self.elements.push(ProtectedElement {
            token: kind.placeholder(index),
            kind,
            raw,
        });
    }

    /// 将文本中的每个占位符替换回原始HTML
    pub fn restore(&self, text: &str) -> String {
        self.elements
            .iter()
            .fold(text.to_string(), |acc, element| {
                acc.replace(&element.token, &element.raw)
            })
    }

    /// 在渲染后的HTML中还原占位符
    ///
    /// 单独成段的占位符连同外层 `<p>` 一起替换，原始HTML不再经过Markdown解析。
    pub fn restore_rendered(&self, html: &str) -> String {
        self.elements.iter().fold(html.to_string(), |acc, element| {
            acc.replace(&format!("<p>{}</p>", element.token), &element.raw)
                .replace(&element.token, &element.raw)
        })
    }

    /// 文本中缺失的占位符（翻译后端删掉了它们）
    pub fn missing_tokens(&self, text: &str) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|element| !text.contains(&element.token))
            .map(|element| element.token.as_str())
            .collect()
    }
}

/// 保护 `root` 下的所有表格、图片和SVG
///
/// 先处理表格，再处理图片，最后处理SVG。嵌套在表格里的图片会随表格
/// 一起被序列化，不会再单独生成占位符。
pub fn protect_structures(root: &Handle) -> Result<ProtectedSet> {
    let mut protected = ProtectedSet::new();

    for kind in [
        ProtectedKind::Table,
        ProtectedKind::Image,
        ProtectedKind::VectorGraphic,
    ] {
        let mut index = 0;
        for element in find_elements(root, &[kind.tag()]) {
            // 嵌套在同类结构中的元素已随外层一起被替换
            if !is_descendant_of(&element, root) {
                continue;
            }
            let raw = serialize_node(&element)?;
            let token = kind.placeholder(index);
            if replace_with_text(&element, &token) {
                protected.push(kind, index, raw);
                index += 1;
            }
        }
        debug!("🛡️ 保护 {} 个 <{}> 结构", index, kind.tag());
    }

    Ok(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html_processor::{parse_html, serialize_dom_to_html};

    #[test]
    fn test_placeholder_format() {
        assert_eq!(ProtectedKind::Table.placeholder(0), "@@TABLE0@@");
        assert_eq!(ProtectedKind::Image.placeholder(12), "@@IMG12@@");
        assert_eq!(ProtectedKind::VectorGraphic.placeholder(3), "@@SVG3@@");
    }

    #[test]
    fn test_protect_and_restore_round_trip() {
        let html = "<html><body><p>Intro</p><table>\n  <tr><td>a</td>  <td>b</td></tr>\n</table><p>After <img src=\"i.png\" alt=\"fig\"></p></body></html>";
        let dom = parse_html(html).unwrap();
        let body = crate::html_processor::find_first(&dom.document, "body").unwrap();
        let before = serialize_dom_to_html(&dom).unwrap();

        let protected = protect_structures(&body).unwrap();
        assert_eq!(protected.len(), 2);

        let after = serialize_dom_to_html(&dom).unwrap();
        assert!(after.contains("@@TABLE0@@"));
        assert!(after.contains("@@IMG0@@"));
        assert!(!after.contains("<table"));

        assert_eq!(protected.restore(&after), before);
    }

    #[test]
    fn test_image_inside_table_is_not_protected_separately() {
        let html = "<body><table><tr><td><img src=\"inner.png\"></td></tr></table><img src=\"outer.png\"></body>";
        let dom = parse_html(html).unwrap();
        let protected = protect_structures(&dom.document).unwrap();

        let tokens: Vec<&str> = protected.iter().map(|e| e.token.as_str()).collect();
        assert_eq!(tokens, vec!["@@TABLE0@@", "@@IMG0@@"]);
        assert!(protected.get("@@TABLE0@@").unwrap().contains("inner.png"));
        assert!(protected.get("@@IMG0@@").unwrap().contains("outer.png"));
    }

    #[test]
    fn test_restore_ignores_surrounding_changes() {
        let html = "<body><p>Hello</p><svg><text>Label</text></svg></body>";
        let dom = parse_html(html).unwrap();
        let protected = protect_structures(&dom.document).unwrap();
        let raw = protected.get("@@SVG0@@").unwrap().to_string();

        let translated = "こんにちは\n\n@@SVG0@@\n";
        let restored = protected.restore(translated);
        assert_eq!(restored, format!("こんにちは\n\n{}\n", raw));
    }

    #[test]
    fn test_nested_tables_get_single_placeholder() {
        let html = "<body><table><tr><td><table><tr><td>inner</td></tr></table></td></tr></table></body>";
        let dom = parse_html(html).unwrap();
        let protected = protect_structures(&dom.document).unwrap();
        assert_eq!(protected.len(), 1);
        assert!(protected.get("@@TABLE0@@").unwrap().contains("inner"));
    }

    #[test]
    fn test_missing_tokens() {
        let html = "<body><table><tr><td>x</td></tr></table><img src=\"a.png\"></body>";
        let dom = parse_html(html).unwrap();
        let protected = protect_structures(&dom.document).unwrap();
        assert_eq!(protected.missing_tokens("@@TABLE0@@ only"), vec!["@@IMG0@@"]);
        assert!(protected.missing_tokens("@@TABLE0@@ @@IMG0@@").is_empty());
    }

    #[test]
    fn test_restore_rendered_replaces_wrapping_paragraph() {
        let html = "<body><table>\n  <tr><td>a</td></tr>\n\n    <tr><td>b</td></tr>\n</table><img src=\"i.png\"></body>";
        let dom = parse_html(html).unwrap();
        let protected = protect_structures(&dom.document).unwrap();
        let table = protected.get("@@TABLE0@@").unwrap().to_string();
        let image = protected.get("@@IMG0@@").unwrap().to_string();

        let rendered = "<h1>T</h1>\n<p>@@TABLE0@@</p>\n<p>Figure @@IMG0@@ here</p>\n";
        assert_eq!(
            protected.restore_rendered(rendered),
            format!("<h1>T</h1>\n{}\n<p>Figure {} here</p>\n", table, image)
        );
    }
}
