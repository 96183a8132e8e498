//! 翻译客户端模块
//!
//! 负责与翻译后端交互：构造提示词、按分块调用后端、处理限流重试，
//! 以及在失败时回退为原文。后端调用结果用 [`BackendOutcome`] 明确区分
//! 成功、限流和其他失败三种情况。

// 标准库导入
use std::sync::OnceLock;
use std::time::Duration;

// 第三方crate导入
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// 本地模块导入
use crate::api_constants::api_config;
use crate::chunker::split_into_chunks;
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::mirror_error;
use crate::utils::polite_pause;

/// 提示词中输入内容前的标题行
pub const PAYLOAD_HEADER: &str = "# Input\n";

/// 单次后端调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOutcome {
    /// 成功返回文本
    Success(String),
    /// 被限流，可以稍后重试
    RateLimited,
    /// 其他失败，不再重试
    Failed(String),
}

/// 翻译后端：接收一段自由文本提示词，返回模型输出
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> BackendOutcome;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini REST API 后端
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiBackend {
    /// 创建后端实例
    pub fn new(api_key: &str, config: &MirrorConfig) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(mirror_error!(config, api_config::API_KEY_ENV, "API密钥为空"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(api_config::REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.api_base(),
                config.model()
            ),
        })
    }

    /// 从环境变量读取API密钥并创建后端，密钥缺失时返回配置错误
    pub fn from_env(config: &MirrorConfig) -> Result<Self> {
        let api_key = std::env::var(api_config::API_KEY_ENV).map_err(|_| {
            mirror_error!(config, api_config::API_KEY_ENV, "环境变量未设置")
        })?;
        Self::new(&api_key, config)
    }
}

#[async_trait]
impl TranslationBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> BackendOutcome {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = match self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return BackendOutcome::Failed(format!("发送翻译请求失败: {}", e)),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return BackendOutcome::RateLimited;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = mirror_error!(translation_api, status.as_u16(), body);
            return BackendOutcome::Failed(error.to_string());
        }

        let parsed: GenerateResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => return BackendOutcome::Failed(format!("解析响应失败: {}", e)),
        };

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            BackendOutcome::Failed("响应中没有候选文本".to_string())
        } else {
            BackendOutcome::Success(text)
        }
    }
}

/// 一个文档的翻译结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTranslation {
    /// 按原顺序拼接的译文
    pub text: String,
    /// 分块数量
    pub chunks: usize,
    /// 回退为原文的分块数量
    pub fallbacks: usize,
}

/// 翻译客户端
///
/// 对单个分块最多尝试 `max_retries` 次：限流时等待固定时间后重试，
/// 其他失败或重试耗尽时直接使用原文，不会让整个页面失败。
pub struct TranslationClient<'a, B: TranslationBackend> {
    backend: &'a B,
    config: &'a MirrorConfig,
}

impl<'a, B: TranslationBackend> TranslationClient<'a, B> {
    pub fn new(backend: &'a B, config: &'a MirrorConfig) -> Self {
        Self { backend, config }
    }

    /// 带限流重试的后端调用，失败时返回 `None`
    async fn generate_with_retry(&self, prompt: &str, label: &str) -> Option<String> {
        let max_retries = self.config.max_retries();

        for attempt in 1..=max_retries {
            match self.backend.generate(prompt).await {
                BackendOutcome::Success(text) => return Some(text),
                BackendOutcome::RateLimited if attempt == max_retries => {
                    warn!("⏳ [{}] API限流 ({}/{})", label, attempt, max_retries);
                }
                BackendOutcome::RateLimited => {
                    warn!(
                        "⏳ [{}] API限流，等待 {:?} 后重试 ({}/{})",
                        label,
                        self.config.rate_limit_backoff(),
                        attempt,
                        max_retries
                    );
                    tokio::time::sleep(self.config.rate_limit_backoff()).await;
                }
                BackendOutcome::Failed(reason) => {
                    warn!("❌ [{}] 翻译失败: {}", label, reason);
                    return None;
                }
            }
        }

        warn!("❌ [{}] 重试 {} 次后仍被限流，使用原文", label, max_retries);
        None
    }

    /// 翻译一个分块，失败时返回原文
    ///
    /// 返回值的第二项表示是否回退为原文。
    pub async fn translate_chunk(&self, chunk: &str, index: usize, total: usize) -> (String, bool) {
        if chunk.trim().is_empty() {
            return (chunk.to_string(), false);
        }

        let prompt = build_chunk_prompt(self.config, chunk, index, total);
        let label = format!("分块 {}/{}", index + 1, total);

        match self.generate_with_retry(&prompt, &label).await {
            Some(raw) => {
                let cleaned = clean_model_output(&raw);
                if cleaned.trim().is_empty() {
                    warn!("⚠️ [{}] 模型输出为空，使用原文", label);
                    (chunk.to_string(), true)
                } else {
                    (reattach_whitespace(chunk, &cleaned), false)
                }
            }
            None => (chunk.to_string(), true),
        }
    }

    /// 分块翻译整个文档，按原顺序拼接结果
    pub async fn translate_document(&self, content: &str) -> DocumentTranslation {
        let chunks = split_into_chunks(content, self.config.chunk_size());
        let total = chunks.len();
        if total > 1 {
            info!(
                "✂️ 分块翻译: {} 字符 -> {} 个分块",
                content.chars().count(),
                total
            );
        }

        let mut translated = String::with_capacity(content.len());
        let mut fallbacks = 0;

        for (index, chunk) in chunks.iter().enumerate() {
            if total > 1 {
                info!("    - 正在翻译第 {}/{} 部分...", index + 1, total);
            }
            let (text, fell_back) = self.translate_chunk(chunk, index, total).await;
            if fell_back {
                fallbacks += 1;
            }
            translated.push_str(&text);
            polite_pause(self.config.chunk_delay()).await;
        }

        DocumentTranslation {
            text: translated,
            chunks: total,
            fallbacks,
        }
    }

    /// 批量翻译短文本，结果与输入等长且顺序一致
    ///
    /// 后端失败、返回无法解析的内容或长度不一致时，原样返回输入。
    pub async fn translate_list_batch(&self, texts: &[String]) -> Vec<String> {
        if texts.is_empty() {
            return Vec::new();
        }

        let prompt = match build_batch_prompt(self.config, texts) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("❌ 构造批量翻译请求失败: {}", e);
                return texts.to_vec();
            }
        };

        let Some(raw) = self.generate_with_retry(&prompt, "SVG文本").await else {
            return texts.to_vec();
        };

        match parse_batch_response(&raw) {
            Some(translated) if translated.len() == texts.len() => translated,
            Some(translated) => {
                warn!(
                    "⚠️ 批量翻译结果长度不一致 ({} != {})，使用原文",
                    translated.len(),
                    texts.len()
                );
                texts.to_vec()
            }
            None => {
                warn!("⚠️ 批量翻译结果不是合法的JSON字符串数组，使用原文");
                texts.to_vec()
            }
        }
    }
}

/// 构造分块翻译提示词
pub fn build_chunk_prompt(config: &MirrorConfig, chunk: &str, index: usize, total: usize) -> String {
    format!(
        "You are an expert in {subject}.\n\
         Translate the following text (a mix of Markdown and HTML) into {language}.\n\
         \n\
         This is part {part} of {total} of a long document that was split into pieces.\n\
         The input may begin or end in the middle of an HTML element (for example inside <tr> or <td>).\n\
         \n\
         # Strict rules\n\
         1. Do not complete or invent tags: output only the tags present in the input.\n\
         2. Keep the HTML structure unchanged.\n\
         3. Keep placeholder tokens such as @@TABLE0@@, @@IMG0@@ and @@SVG0@@ exactly as they are.\n\
         4. Output the translation only, with no greeting or explanation.\n\
         5. Keep the Markdown formatting and do not wrap the output in a code block.\n\
         \n\
         {header}{chunk}",
        subject = config.subject(),
        language = config.target_language_name(),
        part = index + 1,
        total = total,
        header = PAYLOAD_HEADER,
        chunk = chunk,
    )
}

/// 构造短文本批量翻译提示词，输入为JSON字符串数组
pub fn build_batch_prompt(config: &MirrorConfig, texts: &[String]) -> Result<String> {
    let json_text = serde_json::to_string(texts)
        .map_err(|e| mirror_error!(input_validation, "svg texts", e))?;

    Ok(format!(
        "You are an expert in {subject}.\n\
         Translate the technical terms and short phrases in the following JSON list into {language}.\n\
         \n\
         # Rules\n\
         1. Output a JSON list with the same length as the input.\n\
         2. Do not change the order.\n\
         3. Leave mnemonics and numbers unchanged.\n\
         4. Output JSON only.\n\
         \n\
         {header}{json}",
        subject = config.subject(),
        language = config.target_language_name(),
        header = PAYLOAD_HEADER,
        json = json_text,
    ))
}

fn code_fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"^```(?:json)?\s*|\s*```$").expect("代码块正则表达式无效"))
}

fn preamble_regex() -> &'static Regex {
    static PREAMBLE: OnceLock<Regex> = OnceLock::new();
    PREAMBLE.get_or_init(|| {
        Regex::new(r"(?i)^(Here|Sure|Okay|The following|Translation|Part)")
            .expect("开场白正则表达式无效")
    })
}

/// 解析批量翻译的返回，允许外层包裹代码块
fn parse_batch_response(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim();
    let cleaned = if trimmed.starts_with("```") {
        code_fence_regex().replace_all(trimmed, "").to_string()
    } else {
        trimmed.to_string()
    };
    serde_json::from_str(&cleaned).ok()
}

/// 清理模型输出：去掉开头的寒暄语句和外层代码块
pub fn clean_model_output(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut lines: Vec<&str> = trimmed.split('\n').collect();
    let mut start_index = 0;

    for (i, line) in lines.iter().enumerate() {
        let l = line.trim();
        if l.starts_with('#') || l.starts_with('<') || l.starts_with('|') || l.starts_with("```") {
            start_index = i;
            break;
        }
        if preamble_regex().is_match(l) || l.is_empty() {
            continue;
        }
        start_index = i;
        break;
    }

    let mut lines = lines.split_off(start_index);
    if lines.is_empty() {
        return String::new();
    }

    if lines[0].trim().starts_with("```") {
        lines.remove(0);
        if lines.last().map(|l| l.trim() == "```").unwrap_or(false) {
            lines.pop();
        }
    }

    debug!("清理后的模型输出: {} 行", lines.len());
    lines.join("\n")
}

/// 把原分块首尾的空白补回到译文上，保证分块拼接后行结构不变
fn reattach_whitespace(original: &str, translated: &str) -> String {
    let leading = &original[..original.len() - original.trim_start().len()];
    let trailing = &original[original.trim_end().len()..];
    format!("{}{}{}", leading, translated.trim(), trailing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 按顺序返回预设结果的后端
    struct ScriptedBackend {
        outcomes: Mutex<Vec<BackendOutcome>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(outcomes: Vec<BackendOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TranslationBackend for ScriptedBackend {
        async fn generate(&self, prompt: &str) -> BackendOutcome {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                BackendOutcome::Failed("no more outcomes".to_string())
            } else {
                outcomes.remove(0)
            }
        }
    }

    fn fast_config() -> MirrorConfig {
        MirrorConfig::new().with_delays(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_clean_model_output_strips_preamble_and_fence() {
        let raw = "Sure, here is the translation:\n\n```markdown\n# 見出し\n本文\n```";
        assert_eq!(clean_model_output(raw), "# 見出し\n本文");
    }

    #[test]
    fn test_clean_model_output_keeps_plain_text() {
        assert_eq!(clean_model_output("  加算命令\n説明  "), "加算命令\n説明");
        assert_eq!(clean_model_output("   "), "");
    }

    #[test]
    fn test_reattach_whitespace() {
        assert_eq!(reattach_whitespace("\n\nHello\n", "こんにちは"), "\n\nこんにちは\n");
    }

    #[test]
    fn test_parse_batch_response_with_fence() {
        let raw = "```json\n[\"加算\", \"減算\"]\n```";
        assert_eq!(
            parse_batch_response(raw),
            Some(vec!["加算".to_string(), "減算".to_string()])
        );
        assert_eq!(parse_batch_response("not json"), None);
    }

    #[test]
    fn test_chunk_prompt_mentions_part_and_placeholders() {
        let prompt = build_chunk_prompt(&fast_config(), "body", 1, 3);
        assert!(prompt.contains("part 2 of 3"));
        assert!(prompt.contains("@@TABLE0@@"));
        assert!(prompt.ends_with("# Input\nbody"));
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let backend = ScriptedBackend::new(vec![
            BackendOutcome::RateLimited,
            BackendOutcome::Success("翻訳済み".to_string()),
        ]);
        let config = fast_config();
        let client = TranslationClient::new(&backend, &config);

        let (text, fell_back) = client.translate_chunk("translated\n", 0, 1).await;
        assert_eq!(text, "翻訳済み\n");
        assert!(!fell_back);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fall_back_to_original() {
        let backend = ScriptedBackend::new(vec![
            BackendOutcome::RateLimited,
            BackendOutcome::RateLimited,
            BackendOutcome::RateLimited,
            BackendOutcome::Success("too late".to_string()),
        ]);
        let config = fast_config();
        let client = TranslationClient::new(&backend, &config);

        let (text, fell_back) = client.translate_chunk("original", 0, 1).await;
        assert_eq!(text, "original");
        assert!(fell_back);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_other_failure_is_not_retried() {
        let backend = ScriptedBackend::new(vec![BackendOutcome::Failed("500".to_string())]);
        let config = fast_config();
        let client = TranslationClient::new(&backend, &config);

        let (text, fell_back) = client.translate_chunk("original", 0, 1).await;
        assert_eq!(text, "original");
        assert!(fell_back);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_document_keeps_chunk_order_with_partial_failure() {
        let backend = ScriptedBackend::new(vec![
            BackendOutcome::Success("一".to_string()),
            BackendOutcome::Failed("boom".to_string()),
            BackendOutcome::Success("三".to_string()),
        ]);
        let config = fast_config().with_chunk_size(4);
        let client = TranslationClient::new(&backend, &config);

        let result = client.translate_document("one\ntwo\nsix\n").await;
        assert_eq!(result.chunks, 3);
        assert_eq!(result.fallbacks, 1);
        assert_eq!(result.text, "一\ntwo\n三\n");
    }

    #[tokio::test]
    async fn test_batch_length_mismatch_returns_original() {
        let backend = ScriptedBackend::new(vec![BackendOutcome::Success("[\"only one\"]".to_string())]);
        let config = fast_config();
        let client = TranslationClient::new(&backend, &config);

        let input = vec!["Load".to_string(), "Store".to_string()];
        assert_eq!(client.translate_list_batch(&input).await, input);
    }

    #[tokio::test]
    async fn test_batch_success() {
        let backend = ScriptedBackend::new(vec![BackendOutcome::Success(
            "```json\n[\"ロード\", \"ストア\"]\n```".to_string(),
        )]);
        let config = fast_config();
        let client = TranslationClient::new(&backend, &config);

        let input = vec!["Load".to_string(), "Store".to_string()];
        assert_eq!(
            client.translate_list_batch(&input).await,
            vec!["ロード".to_string(), "ストア".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_call() {
        let backend = ScriptedBackend::new(vec![]);
        let config = fast_config();
        let client = TranslationClient::new(&backend, &config);
        assert!(client.translate_list_batch(&[]).await.is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_backoff_after_last_rate_limited_attempt() {
        let backend = ScriptedBackend::new(vec![BackendOutcome::RateLimited]);
        let config = MirrorConfig::new()
            .with_max_retries(1)
            .with_delays(Duration::from_millis(500), Duration::ZERO, Duration::ZERO);
        let client = TranslationClient::new(&backend, &config);

        let start = std::time::Instant::now();
        let (text, fell_back) = client.translate_chunk("original", 0, 1).await;
        assert!(start.elapsed() < Duration::from_millis(400));
        assert_eq!(text, "original");
        assert!(fell_back);
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_blank_api_key_is_fatal_configuration_error() {
        let err = GeminiBackend::new("  ", &MirrorConfig::new())
            .err()
            .expect("blank key must be rejected");
        assert!(matches!(err, crate::error::MirrorError::Configuration { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_api_key_env_is_fatal_configuration_error() {
        std::env::remove_var(api_config::API_KEY_ENV);
        let err = GeminiBackend::from_env(&MirrorConfig::new())
            .err()
            .expect("missing key must be rejected");
        match &err {
            crate::error::MirrorError::Configuration { field, .. } => {
                assert_eq!(field, api_config::API_KEY_ENV)
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(err.is_fatal());
    }
}
