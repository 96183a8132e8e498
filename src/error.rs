//! 统一错误处理模块
//!
//! 定义镜像翻译流程中可能出现的错误类型。除缺少API密钥外，
//! 其余错误只影响单个页面或单个资源，不会终止整个爬取过程。

// 标准库导入
use std::fmt;

// 第三方crate导入
use anyhow::Error as AnyhowError;

/// 镜像翻译统一错误类型
#[derive(Debug)]
pub enum MirrorError {
    /// 网络请求相关错误（页面或图片抓取）
    Network {
        /// 错误消息
        message: String,
        /// HTTP状态码（如果适用）
        status_code: Option<u16>,
    },

    /// HTML解析或序列化错误
    HtmlParse {
        /// 具体错误信息
        details: String,
    },

    /// 文件操作相关错误
    FileOperation {
        /// 文件路径
        path: String,
        /// 操作类型（读取、写入、创建等）
        operation: String,
        /// 底层错误信息
        source: String,
    },

    /// 翻译后端返回的错误
    TranslationApi {
        /// API响应状态码
        status_code: u16,
        /// 错误消息
        message: String,
    },

    /// 配置相关错误
    Configuration {
        /// 配置项名称
        field: String,
        /// 错误原因
        reason: String,
    },

    /// 输入验证错误
    InputValidation {
        /// 输入值
        input: String,
        /// 验证失败原因
        reason: String,
    },

    /// 内部处理错误（包装anyhow::Error）
    Internal {
        /// 包装的错误
        source: AnyhowError,
    },
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::Network { message, status_code } => {
                if let Some(code) = status_code {
                    write!(f, "网络请求失败 [{}]: {}", code, message)
                } else {
                    write!(f, "网络请求失败: {}", message)
                }
            }
            MirrorError::HtmlParse { details } => {
                write!(f, "HTML解析失败: {}", details)
            }
            MirrorError::FileOperation { path, operation, source } => {
                write!(f, "文件{}操作失败 [{}]: {}", operation, path, source)
            }
            MirrorError::TranslationApi { status_code, message } => {
                write!(f, "翻译API错误 [{}]: {}", status_code, message)
            }
            MirrorError::Configuration { field, reason } => {
                write!(f, "配置错误 [{}]: {}", field, reason)
            }
            MirrorError::InputValidation { input, reason } => {
                write!(f, "输入验证失败 [{}]: {}", input, reason)
            }
            MirrorError::Internal { source } => {
                write!(f, "内部处理错误: {}", source)
            }
        }
    }
}

impl std::error::Error for MirrorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MirrorError::Internal { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// 镜像翻译结果类型别名
pub type Result<T> = std::result::Result<T, MirrorError>;

/// 便捷的错误创建宏
#[macro_export]
macro_rules! mirror_error {
    (network, $msg:expr) => {
        $crate::error::MirrorError::Network {
            message: $msg.to_string(),
            status_code: None,
        }
    };
    (network, $msg:expr, $code:expr) => {
        $crate::error::MirrorError::Network {
            message: $msg.to_string(),
            status_code: Some($code),
        }
    };
    (html_parse, $details:expr) => {
        $crate::error::MirrorError::HtmlParse {
            details: $details.to_string(),
        }
    };
    (file_op, $path:expr, $op:expr, $source:expr) => {
        $crate::error::MirrorError::FileOperation {
            path: $path.to_string(),
            operation: $op.to_string(),
            source: $source.to_string(),
        }
    };
    (translation_api, $code:expr, $msg:expr) => {
        $crate::error::MirrorError::TranslationApi {
            status_code: $code,
            message: $msg.to_string(),
        }
    };
    (config, $field:expr, $reason:expr) => {
        $crate::error::MirrorError::Configuration {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
    (input_validation, $input:expr, $reason:expr) => {
        $crate::error::MirrorError::InputValidation {
            input: $input.to_string(),
            reason: $reason.to_string(),
        }
    };
}

/// 从anyhow::Error转换为MirrorError
impl From<AnyhowError> for MirrorError {
    fn from(error: AnyhowError) -> Self {
        MirrorError::Internal { source: error }
    }
}

/// 从reqwest::Error转换为MirrorError
impl From<reqwest::Error> for MirrorError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        MirrorError::Network {
            message: error.to_string(),
            status_code,
        }
    }
}

/// 从std::io::Error转换为MirrorError
impl From<std::io::Error> for MirrorError {
    fn from(error: std::io::Error) -> Self {
        MirrorError::FileOperation {
            path: "unknown".to_string(),
            operation: "io".to_string(),
            source: error.to_string(),
        }
    }
}

impl MirrorError {
    /// 是否为致命错误（需要终止整个进程）
    pub fn is_fatal(&self) -> bool {
        matches!(self, MirrorError::Configuration { .. })
    }
}
