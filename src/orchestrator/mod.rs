//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次抓取任务的调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (检查 / 会话 / 模式分发 / 写入 / 统计)
//!     ↓
//! workflow::ScrapeFlow (处理单条记录)
//!     ↓
//! platforms (平台能力：登录 / 导航 / 提取 / 发现 / 子资源)
//!     ↓
//! services (通用能力：状态机 / 字段提取 / 滚动发现 / 重试 / 存储)
//!     ↓
//! infrastructure (基础设施：PageDriver / JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有浏览器
//! 2. **向下依赖**：编排层 → workflow → platforms → services → infrastructure
//! 3. **顺序执行**：发现的目标逐个处理，不并发
//! 4. **无业务逻辑**：只做调度和统计，不做具体提取判断

pub mod app;

pub use app::{App, RunStats, SkippedTarget};
