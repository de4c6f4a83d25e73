use std::str::FromStr;

use crate::error::{AppError, ConfigError};

/// 平台枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformId {
    /// Facebook 主页 / 个人资料
    Facebook,
    /// Facebook 活动
    FacebookEvent,
    /// Instagram 个人主页
    Instagram,
    /// TikTok 个人主页 / 视频
    TikTok,
}

impl PlatformId {
    pub const ALL: [PlatformId; 4] = [
        PlatformId::Facebook,
        PlatformId::FacebookEvent,
        PlatformId::Instagram,
        PlatformId::TikTok,
    ];

    /// 获取标准名称（也用于输出文件名）
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformId::Facebook => "facebook",
            PlatformId::FacebookEvent => "facebook-event",
            PlatformId::Instagram => "instagram",
            PlatformId::TikTok => "tiktok",
        }
    }

    /// 会话文件使用的名称
    ///
    /// Facebook 活动与 Facebook 主页共用同一个登录会话
    pub fn session_key(self) -> &'static str {
        match self {
            PlatformId::Facebook | PlatformId::FacebookEvent => "facebook",
            other => other.as_str(),
        }
    }

    /// 登录所需的环境变量
    pub fn credential_keys(self) -> &'static [&'static str] {
        match self {
            PlatformId::Facebook | PlatformId::FacebookEvent => &["FB_EMAIL", "FB_PASSWORD"],
            PlatformId::Instagram => &["INSTAGRAM_USERNAME", "INSTAGRAM_PASSWORD"],
            PlatformId::TikTok => &[],
        }
    }
}

impl FromStr for PlatformId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "facebook" | "fb" => Ok(PlatformId::Facebook),
            "facebook-event" | "facebook_event" | "fb-event" => Ok(PlatformId::FacebookEvent),
            "instagram" | "insta" | "ig" => Ok(PlatformId::Instagram),
            "tiktok" => Ok(PlatformId::TikTok),
            other => Err(ConfigError::UnsupportedPlatform(other.to_string()).into()),
        }
    }
}

impl std::fmt::Display for PlatformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_names() {
        for id in PlatformId::ALL {
            assert_eq!(id.as_str().parse::<PlatformId>().unwrap(), id);
        }
    }

    #[test]
    fn unknown_platform_is_config_error() {
        let err = "x".parse::<PlatformId>().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn facebook_event_shares_facebook_session() {
        assert_eq!(PlatformId::FacebookEvent.session_key(), "facebook");
        assert_eq!(
            PlatformId::FacebookEvent.credential_keys(),
            PlatformId::Facebook.credential_keys()
        );
    }
}
