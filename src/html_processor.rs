//! HTML处理模块
//!
//! 提供文档树的基本能力：解析、按标签查询、删除子树、替换子树、
//! 读写属性以及序列化。其余模块只通过这些函数操作DOM。

// 标准库导入
use std::cell::RefCell;
use std::rc::Rc;

// 第三方crate导入
use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

// 本地模块导入
use crate::error::Result;
use crate::mirror_error;

/// 解析HTML文档
pub fn parse_html(html_content: &str) -> Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html_content.as_bytes())
        .map_err(|e| mirror_error!(html_parse, format!("{:?}", e)))
}

/// 元素的标签名，非元素节点返回 `None`
pub fn tag_name(node: &Handle) -> Option<&str> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 按文档顺序查找 `root` 下（含自身）所有指定标签的元素
pub fn find_elements(root: &Handle, tags: &[&str]) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if let Some(name) = tag_name(&node) {
            if tags.contains(&name) {
                found.push(node.clone());
            }
        }
        // 逆序压栈，保证先序遍历即文档顺序
        for child in node.children.borrow().iter().rev() {
            stack.push(child.clone());
        }
    }

    found
}

/// 查找第一个指定标签的元素
pub fn find_first(root: &Handle, tag: &str) -> Option<Handle> {
    find_elements(root, &[tag]).into_iter().next()
}

/// 获取父节点
fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

/// 判断 `node` 是否仍挂在 `root` 之下（含 `root` 本身）
pub fn is_descendant_of(node: &Handle, root: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, root) {
            return true;
        }
        current = parent_of(&candidate);
    }
    false
}

/// 将节点及其子树从文档中移除
pub fn detach(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 用一个文本节点替换整个子树，返回是否替换成功
pub fn replace_with_text(node: &Handle, text: &str) -> bool {
    let Some(parent) = parent_of(node) else {
        return false;
    };

    let replacement = Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    });
    replacement.parent.set(Some(Rc::downgrade(&parent)));

    let mut children = parent.children.borrow_mut();
    match children.iter().position(|child| Rc::ptr_eq(child, node)) {
        Some(index) => {
            children[index] = replacement;
            node.parent.set(None);
            true
        }
        None => false,
    }
}

/// 读取属性值
pub fn get_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref() == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 修改已有属性的值，属性不存在时不做任何事
pub fn set_attr(node: &Handle, attr_name: &str, value: &str) -> bool {
    if let NodeData::Element { ref attrs, .. } = node.data {
        for attr in attrs.borrow_mut().iter_mut() {
            if attr.name.local.as_ref() == attr_name {
                attr.value = StrTendril::from_slice(value);
                return true;
            }
        }
    }
    false
}

/// 删除属性
pub fn remove_attr(node: &Handle, attr_name: &str) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        attrs
            .borrow_mut()
            .retain(|attr| attr.name.local.as_ref() != attr_name);
    }
}

/// 直接子节点中的文本节点
pub fn child_text_nodes(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Text { .. }))
        .cloned()
        .collect()
}

/// 读取文本节点内容
pub fn text_content(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Text { ref contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 改写文本节点内容
pub fn set_text_content(node: &Handle, text: &str) {
    if let NodeData::Text { ref contents } = node.data {
        let mut content_ref = contents.borrow_mut();
        content_ref.clear();
        content_ref.push_slice(text);
    }
}

/// 序列化节点本身（含标签）为HTML字符串
pub fn serialize_node(node: &Handle) -> Result<String> {
    serialize_with_scope(node, TraversalScope::IncludeNode)
}

/// 序列化整个文档为HTML字符串
pub fn serialize_dom_to_html(dom: &RcDom) -> Result<String> {
    serialize_with_scope(&dom.document, TraversalScope::ChildrenOnly(None))
}

fn serialize_with_scope(node: &Handle, traversal_scope: TraversalScope) -> Result<String> {
    let mut buffer = Vec::new();

    serialize(
        &mut buffer,
        &SerializableHandle::from(node.clone()),
        SerializeOpts {
            traversal_scope,
            ..Default::default()
        },
    )
    .map_err(|e| mirror_error!(html_parse, format!("HTML序列化失败: {:?}", e)))?;

    String::from_utf8(buffer).map_err(|e| mirror_error!(html_parse, format!("UTF-8转换失败: {}", e)))
}
