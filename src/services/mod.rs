//! 业务能力层（Services）
//!
//! 每个服务只描述"我能做什么"，处理单个页面 / 单条记录，不关心流程顺序。

pub mod auth;
pub mod field_extractor;
pub mod navigator;
pub mod result_aggregator;
pub mod scroll_discovery;
pub mod session_manager;
pub mod sub_resource;
pub mod wait;

pub use auth::{AuthOutcome, AuthState, AuthTimings, AuthenticationStateMachine, LoginSpec};
pub use field_extractor::{FieldExtractor, FieldSpec, Strategy};
pub use navigator::{normalize_locator, Navigator, Readiness};
pub use result_aggregator::ResultAggregator;
pub use scroll_discovery::{DiscoveryOutcome, LinkPattern, ScrollDiscoveryEngine, SettleStrategy};
pub use session_manager::SessionManager;
pub use sub_resource::{
    paginate, retry_with_backoff, Comment, PageChunk, Reply, RetryPolicy, SubResourceFetcher,
    ThreadSource,
};
