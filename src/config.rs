//! 配置管理模块
//!
//! 提供CLI参数解析和镜像翻译的运行配置。配置在启动时构建一次，
//! 之后以只读方式传入整个流水线。

// 标准库导入
use std::path::{Path, PathBuf};
use std::time::Duration;

// 第三方crate导入
use clap::Parser;

// 本地模块导入
use crate::api_constants::{api_config, crawler_config, output_config, service_config};
use crate::error::Result;
use crate::mirror_error;

/// 镜像翻译运行配置
///
/// 支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use mirror_translator::config::MirrorConfig;
///
/// let config = MirrorConfig::new()
///     .with_output_dir("mirror")
///     .with_scope_pattern("/x86/")
///     .with_chunk_size(8000)
///     .with_max_new_translations(10);
/// assert_eq!(config.chunk_size(), 8000);
/// ```
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// 输出根目录
    output_dir: PathBuf,
    /// 共享样式表文件名
    stylesheet_name: String,
    /// 翻译后端地址
    api_base: String,
    /// 模型名称
    model: String,
    /// 单个分块的字符数上限
    chunk_size: usize,
    /// 收录路径模式（URL路径中的子串）
    scope_pattern: String,
    /// 新翻译页面数上限，0 表示不限
    max_new_translations: usize,
    /// 单个分块的最大尝试次数
    max_retries: usize,
    /// 限流后的等待时间
    rate_limit_backoff: Duration,
    /// 每个分块处理后的等待时间
    chunk_delay: Duration,
    /// 每个页面翻译完成后的等待时间
    page_delay: Duration,
    /// 抓取超时时间
    fetch_timeout: Duration,
    /// 用户代理字符串
    user_agent: String,
    /// 目标语言代码
    target_lang: String,
    /// 目标语言名称
    target_language_name: String,
    /// 文档所属专业领域
    subject: String,
    /// 原文产物的文件名后缀
    original_suffix: String,
}

impl MirrorConfig {
    /// 创建具有默认值的配置实例
    pub fn new() -> Self {
        Self {
            output_dir: PathBuf::from(output_config::DEFAULT_OUTPUT_DIR),
            stylesheet_name: output_config::STYLESHEET_NAME.to_string(),
            api_base: api_config::DEFAULT_API_BASE.to_string(),
            model: api_config::DEFAULT_MODEL.to_string(),
            chunk_size: service_config::DEFAULT_CHUNK_SIZE,
            scope_pattern: crawler_config::DEFAULT_SCOPE_PATTERN.to_string(),
            max_new_translations: crawler_config::DEFAULT_MAX_NEW_TRANSLATIONS,
            max_retries: service_config::DEFAULT_MAX_RETRIES,
            rate_limit_backoff: Duration::from_secs(service_config::RATE_LIMIT_BACKOFF_SECONDS),
            chunk_delay: Duration::from_millis(service_config::CHUNK_DELAY_MS),
            page_delay: Duration::from_millis(crawler_config::PAGE_DELAY_MS),
            fetch_timeout: Duration::from_secs(crawler_config::DEFAULT_FETCH_TIMEOUT),
            user_agent: crawler_config::DEFAULT_USER_AGENT.to_string(),
            target_lang: service_config::DEFAULT_TARGET_LANG.to_string(),
            target_language_name: service_config::DEFAULT_TARGET_LANGUAGE_NAME.to_string(),
            subject: service_config::DEFAULT_SUBJECT.to_string(),
            original_suffix: output_config::ORIGINAL_SUFFIX.to_string(),
        }
    }

    /// 从命令行参数构建配置
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = Self::new()
            .with_output_dir(&cli.output_dir)
            .with_model(&cli.model)
            .with_chunk_size(cli.chunk_size)
            .with_scope_pattern(&cli.scope)
            .with_max_new_translations(crate::api_constants::normalize_limit(cli.limit))
            .with_target_language(&cli.lang, &cli.language_name)
            .with_subject(&cli.subject)
            .with_fetch_timeout(Duration::from_secs(cli.timeout))
            .with_user_agent(&cli.user_agent);
        if let Some(api_base) = &cli.api_base {
            config = config.with_api_base(api_base);
        }
        config
    }

    /// 校验配置的合法性
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(mirror_error!(config, "chunk_size", "分块上限必须大于0"));
        }
        if self.scope_pattern.is_empty() {
            return Err(mirror_error!(config, "scope_pattern", "收录路径模式不能为空"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(mirror_error!(config, "output_dir", "输出目录不能为空"));
        }
        if !crate::api_constants::is_valid_api_url(&self.api_base) {
            return Err(mirror_error!(config, "api_base", "翻译后端地址必须以http://或https://开头"));
        }
        if self.max_retries == 0 {
            return Err(mirror_error!(config, "max_retries", "最大尝试次数必须大于0"));
        }
        Ok(())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn stylesheet_name(&self) -> &str {
        &self.stylesheet_name
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn scope_pattern(&self) -> &str {
        &self.scope_pattern
    }

    /// 新翻译页面数上限，0 表示不限
    pub fn max_new_translations(&self) -> usize {
        self.max_new_translations
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        self.rate_limit_backoff
    }

    pub fn chunk_delay(&self) -> Duration {
        self.chunk_delay
    }

    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn target_language_name(&self) -> &str {
        &self.target_language_name
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn original_suffix(&self) -> &str {
        &self.original_suffix
    }

    /// 设置输出根目录
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// 设置翻译后端地址
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// 设置模型名称
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// 设置分块字符数上限
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// 设置收录路径模式
    pub fn with_scope_pattern(mut self, pattern: &str) -> Self {
        self.scope_pattern = pattern.to_string();
        self
    }

    /// 设置新翻译页面数上限
    pub fn with_max_new_translations(mut self, limit: usize) -> Self {
        self.max_new_translations = limit;
        self
    }

    /// 设置最大尝试次数
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// 设置各类等待时间（限流退避、分块间隔、页面间隔）
    pub fn with_delays(mut self, rate_limit_backoff: Duration, chunk: Duration, page: Duration) -> Self {
        self.rate_limit_backoff = rate_limit_backoff;
        self.chunk_delay = chunk;
        self.page_delay = page;
        self
    }

    /// 设置抓取超时
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// 设置用户代理
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// 设置目标语言代码和名称
    pub fn with_target_language(mut self, code: &str, name: &str) -> Self {
        self.target_lang = code.to_string();
        self.target_language_name = name.to_string();
        self
    }

    /// 设置专业领域
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// CLI参数结构
#[derive(Parser, Debug)]
#[command(author, version, about = "技术参考网站镜像翻译工具 - 保留表格、图片和矢量图并生成原文/译文两套页面", long_about = None)]
pub struct Cli {
    /// 开始爬取的URL
    #[arg(value_name = "URL")]
    pub url: String,

    /// 本次运行新翻译页面数上限 (0 或负数表示不限)
    #[arg(long, default_value = "5", allow_negative_numbers = true)]
    pub limit: i64,

    /// 输出根目录
    #[arg(short, long, default_value = output_config::DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// 翻译模型名称
    #[arg(short, long, default_value = api_config::DEFAULT_MODEL)]
    pub model: String,

    /// 翻译后端地址 (可选，默认使用Gemini官方地址)
    #[arg(long)]
    pub api_base: Option<String>,

    /// 单个分块的字符数上限
    #[arg(long, default_value_t = service_config::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// 收录路径模式 (URL路径中包含该子串的链接才会被爬取)
    #[arg(long, default_value = crawler_config::DEFAULT_SCOPE_PATTERN)]
    pub scope: String,

    /// 目标语言代码 (如: ja, zh, ko)
    #[arg(short, long, default_value = service_config::DEFAULT_TARGET_LANG)]
    pub lang: String,

    /// 目标语言名称 (写入提示词)
    #[arg(long, default_value = service_config::DEFAULT_TARGET_LANGUAGE_NAME)]
    pub language_name: String,

    /// 文档所属专业领域 (写入提示词)
    #[arg(long, default_value = service_config::DEFAULT_SUBJECT)]
    pub subject: String,

    /// 页面和图片抓取超时 (秒)
    #[arg(long, default_value_t = crawler_config::DEFAULT_FETCH_TIMEOUT)]
    pub timeout: u64,

    /// 抓取时使用的User-Agent
    #[arg(long, default_value = crawler_config::DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// 详细输出模式
    #[arg(short, long)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long)]
    pub quiet: bool,

    /// 显示运行统计
    #[arg(long)]
    pub stats: bool,
}
