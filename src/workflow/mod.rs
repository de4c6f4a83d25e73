pub mod scrape_ctx;
pub mod scrape_flow;

pub use scrape_ctx::SessionContext;
pub use scrape_flow::ScrapeFlow;
