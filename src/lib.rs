//! Site Mirror Translator - 保留结构的站点镜像翻译工具库
//!
//! 抓取指定站点收录范围内的页面，在翻译前用占位符保护表格、图片和SVG，
//! 按安全边界分块调用翻译后端，最后写出原文和译文两套互相链接的镜像。

pub mod api_constants;
pub mod chunker;
pub mod config;
pub mod diagram;
pub mod error;
pub mod frontier;
pub mod html_processor;
pub mod media;
pub mod mirror_path;
pub mod normalizer;
pub mod orchestrator;
pub mod output;
pub mod protector;
pub mod stats;
pub mod translator;
pub mod utils;
pub mod web_crawler;

pub use config::{Cli, MirrorConfig};
pub use error::{MirrorError, Result};
pub use orchestrator::SiteMirror;
pub use translator::{BackendOutcome, GeminiBackend, TranslationBackend};
