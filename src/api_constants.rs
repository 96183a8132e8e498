/// 镜像翻译常量配置
///
/// 该文件定义了翻译后端、爬取和输出相关的默认值，方便统一管理和维护

/// 翻译后端配置
pub mod api_config {
    /// 默认翻译后端地址（Gemini REST API）
    pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// 默认模型名称
    pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

    /// API密钥环境变量名
    pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

    /// 请求超时时间（秒）
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 120;
}

/// 翻译服务配置
pub mod service_config {
    /// 默认目标语言代码
    pub const DEFAULT_TARGET_LANG: &str = "ja";

    /// 默认目标语言名称（写入提示词）
    pub const DEFAULT_TARGET_LANGUAGE_NAME: &str = "Japanese";

    /// 默认专业领域（写入提示词）
    pub const DEFAULT_SUBJECT: &str = "x86 assembly language";

    /// 单个分块的字符数上限
    pub const DEFAULT_CHUNK_SIZE: usize = 12000;

    /// 默认最大尝试次数
    pub const DEFAULT_MAX_RETRIES: usize = 3;

    /// 限流后的等待时间（秒）
    pub const RATE_LIMIT_BACKOFF_SECONDS: u64 = 10;

    /// 每个分块处理后的等待时间（毫秒）
    pub const CHUNK_DELAY_MS: u64 = 1000;
}

/// 网页爬取配置
pub mod crawler_config {
    /// 默认爬取超时时间（秒）
    pub const DEFAULT_FETCH_TIMEOUT: u64 = 10;

    /// 默认User-Agent
    pub const DEFAULT_USER_AGENT: &str =
        "Mozilla/5.0 (compatible; SiteMirrorTranslator/0.1.0)";

    /// 默认收录路径模式
    pub const DEFAULT_SCOPE_PATTERN: &str = "/x86/";

    /// 默认新翻译页面数上限（0 表示不限）
    pub const DEFAULT_MAX_NEW_TRANSLATIONS: usize = 5;

    /// 每翻译完一个页面后的等待时间（毫秒）
    pub const PAGE_DELAY_MS: u64 = 2000;
}

/// 输出目录配置
pub mod output_config {
    /// 默认输出根目录
    pub const DEFAULT_OUTPUT_DIR: &str = "translated_site";

    /// 共享样式表文件名
    pub const STYLESHEET_NAME: &str = "style.css";

    /// 原文产物的文件名后缀
    pub const ORIGINAL_SUFFIX: &str = "_en";

    /// 译文产物的文件名后缀
    pub const TRANSLATED_SUFFIX: &str = "";

    /// 目录或空路径对应的文件名
    pub const INDEX_BASENAME: &str = "index";
}

/// 验证API地址是否有效
pub fn is_valid_api_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 将命令行的页面上限转换为内部表示，0 或负数表示不限
pub fn normalize_limit(limit: i64) -> usize {
    if limit <= 0 {
        0
    } else {
        limit as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_validation() {
        assert!(is_valid_api_url("https://example.com"));
        assert!(is_valid_api_url("http://localhost:8080"));
        assert!(!is_valid_api_url("ftp://example.com"));
        assert!(!is_valid_api_url("invalid-url"));
    }

    #[test]
    fn test_limit_normalization() {
        assert_eq!(normalize_limit(5), 5);
        assert_eq!(normalize_limit(0), 0);
        assert_eq!(normalize_limit(-3), 0);
    }
}
