//! 会话存储服务 - 业务能力层
//!
//! 只负责"读写会话文件"能力：不校验、不过期、不判断有效性

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{PlatformId, SessionState};

/// 会话存储服务
pub struct SessionManager {
    session_dir: PathBuf,
}

impl SessionManager {
    pub fn new(session_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_dir: session_dir.into(),
        }
    }

    /// `session/<platform>_storage_state.json`
    pub fn path_for(&self, platform: PlatformId) -> PathBuf {
        self.session_dir
            .join(format!("{}_storage_state.json", platform.session_key()))
    }

    /// 读取会话
    ///
    /// 文件不存在返回 `None`；文件存在但无法解析时返回空会话，
    /// 让后续导航以未登录状态进行并自然失败 / 降级
    pub async fn load(&self, path: &Path) -> AppResult<Option<SessionState>> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("会话文件不存在: {}", path.display());
            return Ok(None);
        }

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        match serde_json::from_slice::<SessionState>(&content) {
            Ok(state) => {
                info!(
                    "🔑 已加载会话: {} ({} 个 cookie)",
                    path.display(),
                    state.cookies.len()
                );
                Ok(Some(state))
            }
            Err(e) => {
                warn!("⚠️ 会话文件无法解析，将以空会话继续: {} ({})", path.display(), e);
                Ok(Some(SessionState::default()))
            }
        }
    }

    /// 保存会话，必要时创建目录
    pub async fn save(&self, path: &Path, state: &SessionState) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }

        let content = serde_json::to_string_pretty(state)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        info!("✅ 会话已保存: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoredCookie;

    fn cookie(name: &str) -> StoredCookie {
        StoredCookie {
            name: name.to_string(),
            value: "v".to_string(),
            domain: ".example.com".to_string(),
            path: "/".to_string(),
            expires: -1.0,
            http_only: false,
            secure: true,
            same_site: None,
        }
    }

    #[tokio::test]
    async fn save_creates_directory_and_load_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SessionManager::new(dir.path().join("nested/session"));
        let path = manager.path_for(PlatformId::Instagram);
        assert!(path.ends_with("instagram_storage_state.json"));

        let state = SessionState {
            cookies: vec![cookie("sessionid")],
            origins: Vec::new(),
        };
        manager.save(&path, &state).await.unwrap();
        assert_eq!(manager.load(&path).await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SessionManager::new(dir.path());
        let path = manager.path_for(PlatformId::TikTok);
        assert_eq!(manager.load(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SessionManager::new(dir.path());
        let path = manager.path_for(PlatformId::Facebook);
        std::fs::write(&path, "{not json").unwrap();
        let loaded = manager.load(&path).await.unwrap().unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn non_utf8_file_loads_as_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SessionManager::new(dir.path());
        let path = manager.path_for(PlatformId::Facebook);
        std::fs::write(&path, [0xff, 0xfe, b'{', b'}']).unwrap();
        let loaded = manager.load(&path).await.unwrap().unwrap();
        assert!(loaded.is_empty());
    }
}
