use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（启动前检查，致命）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 导航错误（就绪标记超时等）
    #[error("导航错误: {0}")]
    Navigation(#[from] NavigationError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 子资源（评论 / 回复）获取错误
    #[error("子资源错误: {0}")]
    SubResource(#[from] SubResourceError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少平台凭据
    #[error("平台 {platform} 缺少凭据环境变量: {}", .missing.join(", "))]
    MissingCredentials {
        platform: String,
        missing: Vec<String>,
    },
    /// 不支持的平台
    #[error("不支持的平台: {0}")]
    UnsupportedPlatform(String),
    /// 平台不支持该模式
    #[error("平台 {platform} 不支持 {mode} 模式")]
    UnsupportedMode { platform: String, mode: String },
    /// 无效的目标链接
    #[error("无效的目标链接 ({platform}): {locator}")]
    InvalidLocator { platform: String, locator: String },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值无效
    #[error("配置项 {key} 无效: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    LaunchFailed(String),
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    #[error("创建页面失败: {0}")]
    PageCreationFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// 执行脚本失败
    #[error("执行脚本失败: {0}")]
    ScriptExecutionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// 页面元素操作失败
    #[error("元素操作失败 ({selector}): {reason}")]
    ElementAction { selector: String, reason: String },
    /// 会话状态应用失败
    #[error("会话状态应用失败: {0}")]
    SessionApplyFailed(String),
}

/// 导航错误
#[derive(Debug, Error)]
pub enum NavigationError {
    /// 页面加载失败
    #[error("导航到 {url} 失败: {reason}")]
    LoadFailed { url: String, reason: String },
    /// 就绪标记在超时内未出现
    #[error("等待 {url} 的就绪标记 `{marker}` 超时 ({waited:?})")]
    ReadinessTimeout {
        url: String,
        marker: String,
        waited: Duration,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// JSON 解析 / 序列化失败
    #[error("JSON处理失败: {0}")]
    Json(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 子资源获取错误
#[derive(Debug, Error)]
pub enum SubResourceError {
    /// 接口返回了无法识别的数据
    #[error("{resource} 返回了无效数据: {reason}")]
    BadPayload { resource: String, reason: String },
    /// 接口返回错误状态
    #[error("{resource} 返回错误状态: {status}")]
    BadStatus { resource: String, status: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed(Box::new(err)))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::Json(Box::new(err)))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Other(format!("URL解析失败: {}", err))
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Other(format!("正则表达式无效: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建元素操作错误
    pub fn element_action(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Browser(BrowserError::ElementAction {
            selector: selector.into(),
            reason: reason.into(),
        })
    }

    /// 创建子资源数据错误
    pub fn bad_payload(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::SubResource(SubResourceError::BadPayload {
            resource: resource.into(),
            reason: reason.into(),
        })
    }

    /// 是否为导航错误（发现模式下可跳过）
    pub fn is_navigation(&self) -> bool {
        matches!(self, AppError::Navigation(_))
    }

    /// 是否为配置错误（启动前致命）
    pub fn is_config(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_lists_every_key() {
        let err = AppError::from(ConfigError::MissingCredentials {
            platform: "facebook".to_string(),
            missing: vec!["FB_EMAIL".to_string(), "FB_PASSWORD".to_string()],
        });
        let msg = err.to_string();
        assert!(msg.contains("FB_EMAIL, FB_PASSWORD"));
        assert!(err.is_config());
        assert!(!err.is_navigation());
    }
}
