//! 文本分块模块
//!
//! 把过长的文档按安全边界切分为多个分块，每块不超过字符数上限。
//! 只在结构标签闭合处或换行处切分，拼接所有分块可以还原原文。

// 标准库导入
use std::sync::OnceLock;

// 第三方crate导入
use regex::Regex;

/// 安全切分边界：结构闭合标签和换行
const BOUNDARY_PATTERN: &str = r"</tr>|</table>|</thead>|</tbody>|</div>|</p>|</svg>|</text>|\n";

fn boundary_regex() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(BOUNDARY_PATTERN).expect("边界正则表达式无效"))
}

/// 按边界把文本拆成记号，边界本身作为单独的记号保留
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for boundary in boundary_regex().find_iter(text) {
        if boundary.start() > last {
            tokens.push(&text[last..boundary.start()]);
        }
        tokens.push(boundary.as_str());
        last = boundary.end();
    }
    if last < text.len() {
        tokens.push(&text[last..]);
    }

    tokens
}

/// 将文本切分为不超过 `budget` 个字符的分块
///
/// 文本长度不超过上限时原样返回一个分块。单个记号本身超过上限时
/// 单独成块，不会从记号中间切开。
pub fn split_into_chunks(text: &str, budget: usize) -> Vec<String> {
    if text.chars().count() <= budget {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for token in tokenize(text) {
        let token_len = token.chars().count();
        if current_len + token_len > budget && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(token);
        current_len += token_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let text = "# Title\n\nShort body.\n";
        assert_eq!(split_into_chunks(text, 12000), vec![text.to_string()]);
        assert_eq!(split_into_chunks("", 10), vec![String::new()]);
    }

    #[test]
    fn test_tokenize_keeps_boundaries() {
        let tokens = tokenize("<p>a</p>b\nc");
        assert_eq!(tokens, vec!["<p>a", "</p>", "b", "\n", "c"]);
    }

    #[test]
    fn test_split_is_lossless() {
        let text = "<table><tr><td>1</td></tr>\n<tr><td>2</td></tr></table>\nline one\nline two\n<div>x</div>";
        for budget in [5, 10, 20, 40] {
            let chunks = split_into_chunks(text, budget);
            assert_eq!(chunks.concat(), text, "budget {}", budget);
        }
    }

    #[test]
    fn test_large_document_respects_budget() {
        let line = format!("{}\n", "x".repeat(99));
        let text = line.repeat(250);
        assert_eq!(text.chars().count(), 25000);

        let chunks = split_into_chunks(&text, 12000);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12000));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_oversized_token_is_emitted_alone() {
        let long = "y".repeat(50);
        let text = format!("ab\n{}\ncd", long);
        let chunks = split_into_chunks(&text, 10);

        assert!(chunks.contains(&long));
        assert!(chunks
            .iter()
            .filter(|c| **c != long)
            .all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_budget_counts_characters_not_bytes() {
        let text = "あいう\nえお\n";
        // 7 个字符，但超过 7 个字节
        assert_eq!(split_into_chunks(text, 7).len(), 1);
    }
}
