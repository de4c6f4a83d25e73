use std::time::Duration;

use social_harvest::config::Config;
use social_harvest::models::{ExtractionTarget, PlatformId};
use social_harvest::services::{FieldExtractor, FieldSpec, Navigator, Readiness};
use social_harvest::utils::logging;
use social_harvest::{App, BrowserSession, ChromeBrowser};

const DEMO_PAGE: &str = "data:text/html,<main><h1>Hello <b>harvest</b></h1><p title='t'>1,024 followers</p></main>";

#[tokio::test]
#[ignore] // 默认忽略，需要本机 Chrome：cargo test -- --ignored
async fn test_extract_from_local_page() {
    logging::init(true);

    let config = Config::default();
    let browser = ChromeBrowser::from_config(&config)
        .await
        .expect("启动浏览器失败");
    let page = browser.open_page().await.expect("打开页面失败");

    Navigator::new(Duration::from_secs(10), Duration::from_millis(200))
        .open(
            page.as_ref(),
            DEMO_PAGE,
            Readiness {
                marker: "main",
                dismiss: None,
            },
        )
        .await
        .expect("页面未就绪");

    let extractor = FieldExtractor::new(page.as_ref());
    let heading = extractor
        .resolve(&FieldSpec::new("heading").text("h1"))
        .await;
    let missing = extractor
        .resolve(&FieldSpec::new("missing").text("h2").attr("p", "data-none"))
        .await;

    assert_eq!(heading.as_deref(), Some("Hello harvest"));
    assert_eq!(missing, None);

    let _ = page.close().await;
    browser.shutdown().await;
}

#[tokio::test]
#[ignore] // 需要 .env 中的 FB_EMAIL / FB_PASSWORD 以及网络
async fn test_scrape_facebook_event_discovery() {
    logging::init(true);
    let _ = dotenvy::dotenv();

    let config = Config::load(None).expect("加载配置失败");
    let target = ExtractionTarget::discovery(PlatformId::FacebookEvent, None, 3);

    let stats = App::new(config)
        .run(&target)
        .await
        .expect("抓取失败");

    println!("发现 {} 个，成功 {} 个", stats.discovered, stats.scraped);
    assert!(stats.scraped + stats.skipped.len() == stats.discovered);
}
