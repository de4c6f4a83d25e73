use std::str::FromStr;

use crate::error::{AppError, AppResult, ConfigError};
use crate::models::PlatformId;

/// 抓取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 抓取单个目标
    Single,
    /// 先在列表页滚动发现目标，再逐个抓取
    Discovery,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Single => "single",
            Mode::Discovery => "discovery",
        }
    }
}

impl FromStr for Mode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Mode::Single),
            "discovery" | "discover" => Ok(Mode::Discovery),
            other => Err(ConfigError::InvalidValue {
                key: "mode".to_string(),
                reason: format!("未知模式 {}", other),
            }
            .into()),
        }
    }
}

/// 一次抓取的目标
#[derive(Debug, Clone)]
pub struct ExtractionTarget {
    pub platform: PlatformId,
    /// 链接或账号名；发现模式下为空时使用平台默认列表页
    pub locator: Option<String>,
    pub mode: Mode,
    /// 仅发现模式使用
    pub limit: usize,
}

impl ExtractionTarget {
    pub fn single(platform: PlatformId, locator: impl Into<String>) -> Self {
        Self {
            platform,
            locator: Some(locator.into()),
            mode: Mode::Single,
            limit: 1,
        }
    }

    pub fn discovery(platform: PlatformId, locator: Option<String>, limit: usize) -> Self {
        Self {
            platform,
            locator,
            mode: Mode::Discovery,
            limit,
        }
    }

    /// 启动前校验
    pub fn validate(&self) -> AppResult<()> {
        if self.mode == Mode::Discovery && self.limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "limit".to_string(),
                reason: "发现模式的数量必须至少为 1".to_string(),
            }
            .into());
        }
        if self.mode == Mode::Single
            && self.locator.as_deref().map_or(true, |l| l.trim().is_empty())
        {
            return Err(ConfigError::InvalidLocator {
                platform: self.platform.to_string(),
                locator: String::new(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mode_requires_locator() {
        let target = ExtractionTarget {
            platform: PlatformId::Facebook,
            locator: None,
            mode: Mode::Single,
            limit: 1,
        };
        assert!(target.validate().unwrap_err().is_config());
    }

    #[test]
    fn discovery_limit_must_be_positive() {
        let target = ExtractionTarget::discovery(PlatformId::FacebookEvent, None, 0);
        assert!(target.validate().is_err());
        let target = ExtractionTarget::discovery(PlatformId::FacebookEvent, None, 3);
        assert!(target.validate().is_ok());
    }
}
