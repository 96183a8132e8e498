//! 网页抓取模块
//!
//! 此模块负责：
//! - 抓取页面HTML
//! - 下载图片等二进制资源
//! - 校验起始URL
//!
//! 抓取失败只返回错误，由调用方决定跳过当前页面或保留原始引用。

// 标准库导入
use std::time::Duration;

// 第三方crate导入
use reqwest::Client;
use tracing::debug;
use url::Url;

// 本地模块导入
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::mirror_error;

/// 页面和资源抓取器
#[derive(Clone)]
pub struct WebCrawler {
    client: Client,
}

impl WebCrawler {
    /// 创建新的抓取器
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    /// 根据运行配置创建抓取器
    pub fn from_config(config: &MirrorConfig) -> Result<Self> {
        Self::new(config.fetch_timeout(), config.user_agent())
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        debug!("🌐 GET {}", url);
        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(mirror_error!(network, format!("HTTP {} for {}", status, url), status.as_u16()));
        }
        Ok(response)
    }

    /// 抓取页面HTML
    pub async fn fetch_html(&self, url: &Url) -> Result<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    /// 下载二进制资源
    pub async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// 校验并解析起始URL
pub fn validate_start_url(input: &str) -> Result<Url> {
    if input.is_empty() {
        return Err(mirror_error!(input_validation, input, "URL不能为空"));
    }

    let url = Url::parse(input).map_err(|e| mirror_error!(input_validation, input, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(mirror_error!(input_validation, input, "URL必须以http://或https://开头"));
    }
    if url.host_str().is_none() {
        return Err(mirror_error!(input_validation, input, "URL缺少主机名"));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MirrorError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_url_validation() {
        assert!(validate_start_url("").is_err());
        assert!(validate_start_url("ftp://example.com").is_err());
        assert!(validate_start_url("example.com").is_err());
        assert!(validate_start_url("https://example.com/x86/").is_ok());
        assert!(validate_start_url("http://test.org").is_ok());
    }

    #[tokio::test]
    async fn test_fetch_html_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x86/add.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>ADD</p>"))
            .mount(&server)
            .await;

        let crawler = WebCrawler::new(Duration::from_secs(5), "test-agent").unwrap();
        let url = Url::parse(&format!("{}/x86/add.html", server.uri())).unwrap();
        assert_eq!(crawler.fetch_html(&url).await.unwrap(), "<p>ADD</p>");
    }

    #[tokio::test]
    async fn test_fetch_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let crawler = WebCrawler::new(Duration::from_secs(5), "test-agent").unwrap();
        let url = Url::parse(&format!("{}/missing.png", server.uri())).unwrap();
        match crawler.fetch_bytes(&url).await {
            Err(MirrorError::Network { status_code, .. }) => assert_eq!(status_code, Some(404)),
            other => panic!("unexpected result: {:?}", other.map(|b| b.len())),
        }
    }
}
