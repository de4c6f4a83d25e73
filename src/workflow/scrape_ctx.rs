//! 抓取上下文
//!
//! 封装"我正在以哪个账号抓取哪个平台"这一信息，启动时构建一次，按引用传递

use std::fmt::Display;
use std::path::PathBuf;

use crate::config::Config;
use crate::models::{Credentials, PlatformId};
use crate::services::{AuthTimings, Navigator, ScrollDiscoveryEngine, SubResourceFetcher};

/// 抓取上下文
///
/// 包含单次运行所需的全部上下文：平台、凭据、会话文件位置和各项参数
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// 平台
    pub platform: PlatformId,

    /// 登录凭据（启动时解析）
    pub credentials: Credentials,

    /// 会话文件路径
    pub session_path: PathBuf,

    /// 运行参数
    pub config: Config,
}

impl SessionContext {
    pub fn new(
        platform: PlatformId,
        credentials: Credentials,
        session_path: PathBuf,
        config: Config,
    ) -> Self {
        Self {
            platform,
            credentials,
            session_path,
            config,
        }
    }

    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.config.navigation_timeout(), self.config.poll_interval())
    }

    pub fn auth_timings(&self) -> AuthTimings {
        AuthTimings::from(&self.config)
    }

    pub fn discovery_engine(&self) -> ScrollDiscoveryEngine {
        ScrollDiscoveryEngine::from_config(&self.config)
    }

    pub fn sub_resources(&self) -> SubResourceFetcher {
        SubResourceFetcher::from_config(&self.config)
    }
}

impl Display for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[平台 {}]", self.platform)
    }
}
