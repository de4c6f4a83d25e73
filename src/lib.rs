//! # Social Harvest
//!
//! 通过持久化登录会话驱动无头浏览器，从社交平台抓取结构化记录并合并写入 JSON 文件
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 浏览器能力接口 `PageDriver` / `BrowserSession`
//! - `JsExecutor` - 唯一的 page owner，基于 chromiumoxide 实现 `PageDriver`
//! - `browser/` - 启动无头浏览器或连接调试端口
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个页面 / 单条记录
//! - `SessionManager` - 读写会话文件
//! - `AuthenticationStateMachine` - 登录及人工验证等待
//! - `Navigator` - 链接规范化、导航、就绪等待
//! - `FieldExtractor` - 按策略顺序提取字段，失败为 null
//! - `ScrollDiscoveryEngine` - 滚动发现目标链接
//! - `SubResourceFetcher` - 评论 / 回复的重试获取
//! - `ResultAggregator` - 合并写入输出文件
//!
//! ### ③ 平台层（Platforms）
//! - `platforms/` - 每个平台实现同一个 `Platform` 接口，由 `PlatformRegistry` 查找
//!
//! ### ④ 流程层（Workflow）
//! - `SessionContext` - 单次运行的上下文（平台 + 凭据 + 会话路径 + 参数）
//! - `ScrapeFlow` - 单条记录的完整流程（打开 → 会话 → 导航 → 提取 → 子资源 → 关闭）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator::App` - 启动前检查、会话准备、模式分发、写入与统计
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod platforms;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::ChromeBrowser;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{BrowserSession, JsExecutor, PageDriver};
pub use models::{ExtractionTarget, Mode, PlatformId, Record, SessionState};
pub use orchestrator::{App, RunStats};
pub use platforms::{Platform, PlatformRegistry};
pub use workflow::{ScrapeFlow, SessionContext};
