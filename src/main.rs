use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use social_harvest::utils::logging;
use social_harvest::{App, Config, ExtractionTarget, Mode, PlatformId};

/// 社交平台数据抓取
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// 平台: facebook | facebook-event | instagram | tiktok
    #[arg(long)]
    platform: PlatformId,

    /// 目标链接或账号名（发现模式下为列表页，可省略）
    #[arg(long)]
    link: Option<String>,

    /// 模式: single | discovery
    #[arg(long, default_value = "single")]
    mode: Mode,

    /// 发现模式的数量上限（默认取配置）
    #[arg(long)]
    limit: Option<usize>,

    /// TOML 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    logging::init(cli.verbose);

    // 读取 .env（不存在时忽略）
    if let Ok(path) = dotenvy::dotenv() {
        debug!("已加载环境变量文件: {}", path.display());
    }

    // 加载配置
    let config = Config::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("加载配置失败: {}", path.display()),
        None => "加载配置失败".to_string(),
    })?;
    logging::log_startup(config.headless, &config.output_dir);

    let target = match cli.mode {
        Mode::Single => ExtractionTarget::single(cli.platform, cli.link.unwrap_or_default()),
        Mode::Discovery => ExtractionTarget::discovery(
            cli.platform,
            cli.link,
            cli.limit.unwrap_or(config.discovery_limit),
        ),
    };

    // 初始化并运行应用
    let app = App::new(config);
    app.run(&target).await?;

    Ok(())
}
