use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 滚动后的稳定判定方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// 固定等待 `scroll_settle_max_ms`
    Fixed,
    /// 轮询链接数量 / 页面高度，直到不再变化或达到 `scroll_settle_max_ms`
    Stable,
}

/// 程序配置文件
///
/// 加载顺序：默认值 → TOML 文件（可选） → `HARVEST_*` 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 输出目录（`<platform>_output.json`）
    pub output_dir: PathBuf,
    /// 会话目录（`<platform>_storage_state.json`）
    pub session_dir: PathBuf,
    /// 是否无头模式
    pub headless: bool,
    /// 浏览器可执行文件路径（为空时由 chromiumoxide 自动查找）
    pub chrome_executable: Option<PathBuf>,
    /// 浏览器调试端口；设置后连接已有浏览器而不是启动新实例
    pub browser_debug_port: Option<u16>,

    // --- 超时 ---
    /// 页面就绪标记等待时间（秒）
    pub navigation_timeout_secs: u64,
    /// 登录表单出现的等待时间（秒）
    pub login_form_timeout_secs: u64,
    /// 登录后跳转的等待时间（秒）
    pub login_redirect_timeout_secs: u64,
    /// 人工验证（二次验证 / 验证码）固定等待时间（秒）
    pub manual_step_delay_secs: u64,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,

    // --- 滚动发现 ---
    /// 最大滚动轮数
    pub max_scroll_iterations: usize,
    /// 每次滚动的像素
    pub scroll_step_px: i64,
    /// 稳定判定方式
    pub settle_mode: SettleMode,
    /// 稳定判定采样间隔（毫秒）
    pub scroll_settle_interval_ms: u64,
    /// 单次滚动后的最长等待（毫秒）
    pub scroll_settle_max_ms: u64,
    /// 发现模式默认数量
    pub discovery_limit: usize,

    // --- 子资源 ---
    /// 每个父记录最多获取的评论数
    pub comment_cap: usize,
    /// 每条评论最多获取的回复数
    pub reply_cap: usize,
    /// 评论获取的最大尝试次数
    pub retry_attempts: usize,
    /// 重试退避下限（毫秒）
    pub backoff_min_ms: u64,
    /// 重试退避上限（毫秒）
    pub backoff_max_ms: u64,

    // --- 平台相关 ---
    /// 个人主页最多收集的帖子链接数
    pub profile_post_limit: usize,
    /// TikTok 个人主页最多抓取的视频数
    pub video_count: usize,
    /// Facebook 主页帖子收集的滚动轮数
    pub post_scroll_passes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            session_dir: PathBuf::from("session"),
            headless: true,
            chrome_executable: None,
            browser_debug_port: None,
            navigation_timeout_secs: 30,
            login_form_timeout_secs: 15,
            login_redirect_timeout_secs: 60,
            manual_step_delay_secs: 30,
            poll_interval_ms: 500,
            max_scroll_iterations: 5,
            scroll_step_px: 3000,
            settle_mode: SettleMode::Stable,
            scroll_settle_interval_ms: 500,
            scroll_settle_max_ms: 2000,
            discovery_limit: 10,
            comment_cap: 50,
            reply_cap: 3,
            retry_attempts: 3,
            backoff_min_ms: 2000,
            backoff_max_ms: 5000,
            profile_post_limit: 5,
            video_count: 10,
            post_scroll_passes: 5,
        }
    }
}

impl Config {
    /// 从 TOML 文件加载（未提供时使用默认值），再叠加环境变量
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// 解析 TOML 文件
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AppError::File(crate::error::FileError::TomlParseFailed { source, .. }) => {
                AppError::File(crate::error::FileError::TomlParseFailed {
                    path: path.display().to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    /// 解析 TOML 字符串
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 叠加环境变量覆盖
    ///
    /// `lookup` 通常是 `std::env::var`，测试中可替换
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        if let Some(v) = lookup("HARVEST_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("HARVEST_SESSION_DIR") {
            self.session_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("HARVEST_CHROME_EXECUTABLE") {
            self.chrome_executable = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HARVEST_BROWSER_DEBUG_PORT") {
            self.browser_debug_port = Some(parse_env("HARVEST_BROWSER_DEBUG_PORT", &v, "u16")?);
        }
        if let Some(v) = lookup("HARVEST_HEADLESS") {
            self.headless = parse_env("HARVEST_HEADLESS", &v, "bool")?;
        }
        if let Some(v) = lookup("HARVEST_NAVIGATION_TIMEOUT_SECS") {
            self.navigation_timeout_secs = parse_env("HARVEST_NAVIGATION_TIMEOUT_SECS", &v, "u64")?;
        }
        if let Some(v) = lookup("HARVEST_MANUAL_STEP_DELAY_SECS") {
            self.manual_step_delay_secs = parse_env("HARVEST_MANUAL_STEP_DELAY_SECS", &v, "u64")?;
        }
        if let Some(v) = lookup("HARVEST_MAX_SCROLL_ITERATIONS") {
            self.max_scroll_iterations = parse_env("HARVEST_MAX_SCROLL_ITERATIONS", &v, "usize")?;
        }
        if let Some(v) = lookup("HARVEST_DISCOVERY_LIMIT") {
            self.discovery_limit = parse_env("HARVEST_DISCOVERY_LIMIT", &v, "usize")?;
        }
        if let Some(v) = lookup("HARVEST_RETRY_ATTEMPTS") {
            self.retry_attempts = parse_env("HARVEST_RETRY_ATTEMPTS", &v, "usize")?;
        }
        self.validate()?;
        Ok(self)
    }

    /// 校验配置项之间的约束
    pub fn validate(&self) -> AppResult<()> {
        if self.max_scroll_iterations == 0 {
            return Err(invalid("max_scroll_iterations", "必须至少为 1"));
        }
        if self.retry_attempts == 0 {
            return Err(invalid("retry_attempts", "必须至少为 1"));
        }
        if self.discovery_limit == 0 {
            return Err(invalid("discovery_limit", "必须至少为 1"));
        }
        if self.backoff_min_ms > self.backoff_max_ms {
            return Err(invalid("backoff_min_ms", "不能大于 backoff_max_ms"));
        }
        Ok(())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn login_form_timeout(&self) -> Duration {
        Duration::from_secs(self.login_form_timeout_secs)
    }

    pub fn login_redirect_timeout(&self) -> Duration {
        Duration::from_secs(self.login_redirect_timeout_secs)
    }

    pub fn manual_step_delay(&self) -> Duration {
        Duration::from_secs(self.manual_step_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn backoff_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.backoff_min_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, value: &str, expected_type: &str) -> AppResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        }
        .into()
    })
}

fn invalid(key: &str, reason: &str) -> AppError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
