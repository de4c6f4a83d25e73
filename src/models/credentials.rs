use std::collections::HashMap;
use std::fmt;

use crate::error::{AppResult, ConfigError};
use crate::models::PlatformId;

/// 平台登录凭据
///
/// 启动时从环境变量解析一次，之后按引用传递
#[derive(Clone, Default)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    /// 解析平台所需的全部凭据，任一缺失即返回配置错误
    pub fn resolve(
        platform: PlatformId,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let mut values = HashMap::new();
        let mut missing = Vec::new();

        for key in platform.credential_keys() {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(value) => {
                    values.insert(key.to_string(), value);
                }
                None => missing.push(key.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials {
                platform: platform.to_string(),
                missing,
            }
            .into());
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

// 不在日志里输出凭据内容
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Credentials").field("keys", &keys).finish()
    }
}
