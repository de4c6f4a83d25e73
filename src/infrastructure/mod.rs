pub mod driver;
pub mod js_executor;

pub use driver::{BrowserSession, PageDriver};
pub use js_executor::{js_str, JsExecutor};
