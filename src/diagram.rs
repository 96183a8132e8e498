//! SVG文本翻译模块
//!
//! 收集每个SVG中 `<text>`/`<tspan>` 的非空文本，一次性批量发送给翻译后端，
//! 再原地写回。返回结果长度不一致时整批使用原文。

// 第三方crate导入
use markup5ever_rcdom::Handle;
use tracing::{debug, info};

// 本地模块导入
use crate::html_processor::{child_text_nodes, find_elements, set_text_content, text_content};
use crate::translator::{TranslationBackend, TranslationClient};

/// SVG中的可翻译文本节点，按文档顺序排列
pub fn collect_diagram_texts(svg: &Handle) -> Vec<(Handle, String)> {
    find_elements(svg, &["text", "tspan"])
        .iter()
        .flat_map(child_text_nodes)
        .filter_map(|node| {
            let text = text_content(&node)?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some((node.clone(), trimmed.to_string()))
            }
        })
        .collect()
}

/// 翻译 `root` 下所有SVG内的文本，返回发送的批次数量
pub async fn translate_diagrams<B: TranslationBackend>(
    root: &Handle,
    client: &TranslationClient<'_, B>,
) -> usize {
    let svgs = find_elements(root, &["svg"]);
    if svgs.is_empty() {
        return 0;
    }
    info!("🖼️ 正在翻译SVG图像内部文本 ({} 个)...", svgs.len());

    let mut batches = 0;
    for (index, svg) in svgs.iter().enumerate() {
        let targets = collect_diagram_texts(svg);
        if targets.is_empty() {
            continue;
        }

        let originals: Vec<String> = targets.iter().map(|(_, text)| text.clone()).collect();
        let translated = client.translate_list_batch(&originals).await;
        batches += 1;

        for ((node, _), text) in targets.iter().zip(translated.iter()) {
            set_text_content(node, text);
        }
        debug!("SVG {} : 写回 {} 个文本节点", index + 1, targets.len());
    }

    batches
}
