//! 抓取队列
//!
//! 先进先出的待处理URL队列，以及已处理页面集合。
//! 两者都用去掉末尾 `/` 的URL作为去重标识。

// 标准库导入
use std::collections::{HashSet, VecDeque};

// 第三方crate导入
use url::Url;

// 本地模块导入
use crate::mirror_path::normalize_url_key;

/// 待处理URL队列
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Url>,
    queued: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队，已在队列中时返回 `false`
    pub fn push(&mut self, url: Url) -> bool {
        if !self.queued.insert(normalize_url_key(url.as_str())) {
            return false;
        }
        self.queue.push_back(url);
        true
    }

    /// 取出队首URL
    pub fn pop(&mut self) -> Option<Url> {
        let url = self.queue.pop_front()?;
        self.queued.remove(&normalize_url_key(url.as_str()));
        Some(url)
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.queued.contains(&normalize_url_key(url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// 已处理（翻译或确认已翻译）的页面
#[derive(Debug, Default)]
pub struct VisitedSet {
    keys: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &Url) -> bool {
        self.keys.insert(normalize_url_key(url.as_str()))
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.keys.contains(&normalize_url_key(url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
