use serde::{Deserialize, Serialize};

/// 持久化的登录会话
///
/// 与 Playwright 的 storage state 格式兼容：
/// `{ "cookies": [...], "origins": [{ "origin": ..., "localStorage": [{ "name", "value" }] }] }`。
/// 程序不检查其有效性，只有后续导航失败才能说明它已过期。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub origins: Vec<OriginStorage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix 秒；-1 表示会话 cookie
    #[serde(default = "default_expires")]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginStorage {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageItem {
    pub name: String,
    pub value: String,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_expires() -> f64 {
    -1.0
}

impl SessionState {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.is_empty()
    }

    /// 查找某个 origin 的 localStorage
    pub fn origin(&self, origin: &str) -> Option<&OriginStorage> {
        let origin = origin.trim_end_matches('/');
        self.origins
            .iter()
            .find(|o| o.origin.trim_end_matches('/') == origin)
    }
}

/// 会话新鲜度
///
/// 不主动校验；只有使用已保存会话后的导航失败才会将其标记为 `Stale`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_playwright_storage_state() {
        let raw = r#"{
            "cookies": [
                {"name": "c_user", "value": "1", "domain": ".facebook.com", "path": "/",
                 "expires": 1767225600.5, "httpOnly": false, "secure": true, "sameSite": "None"}
            ],
            "origins": [
                {"origin": "https://www.facebook.com", "localStorage": [{"name": "k", "value": "v"}]}
            ]
        }"#;
        let state: SessionState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.cookies[0].name, "c_user");
        assert!(state.cookies[0].secure);
        assert_eq!(state.origin("https://www.facebook.com/").unwrap().local_storage.len(), 1);
    }

    #[test]
    fn minimal_cookie_gets_defaults() {
        let state: SessionState =
            serde_json::from_str(r#"{"cookies":[{"name":"a","value":"b"}]}"#).unwrap();
        assert_eq!(state.cookies[0].path, "/");
        assert_eq!(state.cookies[0].expires, -1.0);
        assert!(state.origins.is_empty());
    }
}
