//! 登录状态机 - 业务能力层
//!
//! ```text
//! Anonymous → SubmittingCredentials → AwaitingRedirect ─┬─→ Authenticated
//!                                                       └─→ AwaitingManualStep → Authenticated
//! Anonymous → AwaitingManualStep → Authenticated          (无表单字段，交由人工登录)
//! ```
//!
//! 跳转等待超时不是错误：进入人工验证状态，固定等待一段时间后直接视为已登录，不再复查。

use std::time::Duration;

use regex::Regex;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, NavigationError};
use crate::infrastructure::PageDriver;
use crate::models::{Credentials, PlatformId};
use crate::services::wait::poll_until;

/// 登录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    SubmittingCredentials,
    AwaitingRedirect,
    AwaitingManualStep,
    Authenticated,
}

/// 平台登录页描述
#[derive(Debug, Clone)]
pub struct LoginSpec {
    pub platform: PlatformId,
    pub login_url: &'static str,
    /// 表单就绪标记；为空时直接填写
    pub form_ready: Option<&'static str>,
    /// (输入框选择器, 凭据键)；为空时整个登录由人工完成
    pub fields: Vec<(&'static str, &'static str)>,
    pub submit: Option<&'static str>,
    /// 登录成功后的目标地址
    pub success_url: Regex,
    /// 覆盖配置中的人工验证等待时间
    pub manual_wait: Option<Duration>,
}

/// 登录相关的等待时间
#[derive(Debug, Clone, Copy)]
pub struct AuthTimings {
    pub form_timeout: Duration,
    pub redirect_timeout: Duration,
    pub manual_step_delay: Duration,
    pub poll_interval: Duration,
}

impl From<&Config> for AuthTimings {
    fn from(config: &Config) -> Self {
        Self {
            form_timeout: config.login_form_timeout(),
            redirect_timeout: config.login_redirect_timeout(),
            manual_step_delay: config.manual_step_delay(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// 登录结果
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub state: AuthState,
    /// 是否经历了人工验证等待
    pub manual_step: bool,
    /// 状态迁移历史
    pub history: Vec<AuthState>,
}

/// 登录状态机
pub struct AuthenticationStateMachine<'a> {
    spec: &'a LoginSpec,
    timings: AuthTimings,
    state: AuthState,
    history: Vec<AuthState>,
}

impl<'a> AuthenticationStateMachine<'a> {
    pub fn new(spec: &'a LoginSpec, timings: AuthTimings) -> Self {
        Self {
            spec,
            timings,
            state: AuthState::Anonymous,
            history: vec![AuthState::Anonymous],
        }
    }

    fn transition(&mut self, next: AuthState) {
        self.state = next;
        self.history.push(next);
    }

    /// 执行完整的登录流程
    pub async fn run(
        mut self,
        page: &dyn PageDriver,
        credentials: &Credentials,
    ) -> AppResult<AuthOutcome> {
        let spec = self.spec;

        // 先确认凭据齐全，再触碰页面
        let mut inputs = Vec::with_capacity(spec.fields.len());
        for (selector, key) in &spec.fields {
            let value = credentials.get(key).ok_or_else(|| ConfigError::MissingCredentials {
                platform: spec.platform.to_string(),
                missing: vec![key.to_string()],
            })?;
            inputs.push((*selector, value));
        }

        info!("🟢 正在登录: {}", spec.login_url);
        page.goto(spec.login_url).await?;

        if let Some(form_ready) = spec.form_ready {
            let interval = self.timings.poll_interval;
            let ready = poll_until(self.timings.form_timeout, interval, move || async move {
                Ok::<_, AppError>(page.count(form_ready).await? > 0)
            })
            .await;
            if !ready {
                return Err(NavigationError::ReadinessTimeout {
                    url: spec.login_url.to_string(),
                    marker: form_ready.to_string(),
                    waited: self.timings.form_timeout,
                }
                .into());
            }
        }

        let manual_wait = spec.manual_wait.unwrap_or(self.timings.manual_step_delay);
        let manual_step = if inputs.is_empty() {
            self.transition(AuthState::AwaitingManualStep);
            info!("🙋 请在浏览器中手动登录，等待 {:?}...", manual_wait);
            sleep(manual_wait).await;
            true
        } else {
            self.transition(AuthState::SubmittingCredentials);
            for (selector, value) in inputs {
                page.fill(selector, value).await?;
            }
            if let Some(submit) = spec.submit {
                page.click(submit).await?;
            }

            self.transition(AuthState::AwaitingRedirect);
            let success_url = &spec.success_url;
            let redirected = poll_until(
                self.timings.redirect_timeout,
                self.timings.poll_interval,
                move || async move {
                    Ok::<_, AppError>(success_url.is_match(&page.current_url().await?))
                },
            )
            .await;

            if !redirected {
                self.transition(AuthState::AwaitingManualStep);
                warn!(
                    "⚠️ 未在 {:?} 内跳转，等待 {:?} 供人工完成验证...",
                    self.timings.redirect_timeout, manual_wait
                );
                sleep(manual_wait).await;
            }
            !redirected
        };

        self.transition(AuthState::Authenticated);
        info!("✅ 登录流程结束 (人工验证: {})", manual_step);

        Ok(AuthOutcome {
            state: self.state,
            manual_step,
            history: self.history,
        })
    }
}
