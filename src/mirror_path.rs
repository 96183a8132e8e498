//! 镜像路径解析模块
//!
//! 将源URL映射为输出目录下确定的相对路径。页面、图片和样式表引用
//! 都通过这里计算，保证相互之间的相对链接一致。

// 标准库导入
use std::path::{Component, Path, PathBuf};

// 第三方crate导入
use url::Url;

// 本地模块导入
use crate::api_constants::output_config::INDEX_BASENAME;

/// 页面在镜像树中的位置（相对于输出根目录）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MirrorPath {
    /// 所在目录，以主机名开头
    pub directory: PathBuf,
    /// 不含后缀和扩展名的文件名
    pub basename: String,
}

impl MirrorPath {
    /// 解析页面URL对应的镜像路径
    ///
    /// 空路径或以 `/` 结尾的路径映射为 `index`，末尾的 `.html` 会被去掉。
    pub fn resolve(url: &Url) -> Self {
        let mut path = url.path().trim_start_matches('/').to_string();
        if path.is_empty() || path.ends_with('/') {
            path.push_str(INDEX_BASENAME);
        }
        if let Some(stripped) = path.strip_suffix(".html") {
            path = stripped.to_string();
        }

        let mut directory = PathBuf::from(host_dir(url));
        let mut segments: Vec<&str> = path.split('/').collect();
        let basename = segments.pop().unwrap_or(INDEX_BASENAME).to_string();
        for segment in segments.into_iter().filter(|s| !s.is_empty()) {
            directory.push(segment);
        }

        Self { directory, basename }
    }

    /// 不含后缀的基础路径，如 `host/x86/add`
    pub fn base_path(&self) -> PathBuf {
        self.directory.join(&self.basename)
    }

    /// 某个产物文件的相对路径，如 `host/x86/add_en.md`
    pub fn artifact(&self, suffix: &str, extension: &str) -> PathBuf {
        self.directory
            .join(format!("{}{}.{}", self.basename, suffix, extension))
    }
}

/// URL的主机部分（带端口时保留端口）
pub fn host_dir(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown");
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// 图片等静态资源的镜像路径：`host/原始路径`
///
/// 路径为空或指向目录时返回 `None`。
pub fn asset_path(url: &Url) -> Option<PathBuf> {
    let path = url.path().trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') {
        return None;
    }
    let mut result = PathBuf::from(host_dir(url));
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        result.push(segment);
    }
    Some(result)
}

/// 计算从 `from_dir` 目录指向 `target` 的相对路径，使用 `/` 分隔
///
/// 两个路径都必须相对于同一个根目录。
pub fn relative_path(from_dir: &Path, target: &Path) -> String {
    let from: Vec<Component> = from_dir
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let to: Vec<Component> = target
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &to[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// 去重用的URL标识：去掉末尾的 `/`
pub fn normalize_url_key(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
