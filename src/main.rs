use std::path::PathBuf;

use anyhow::Result;
use doc_assistant::config::{Config, DEFAULT_CONFIG_FILE};
use doc_assistant::{logger, App};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config_path =
        std::env::var("DOC_ASSISTANT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let config = Config::load_with_env(&config_path)?;

    // 初始化日志
    logger::init(&config);

    // 命令行第一个参数作为待上传的文档
    let initial_document = std::env::args().nth(1).map(PathBuf::from);

    // 初始化并运行应用
    App::initialize(config)?.run(initial_document).await?;

    Ok(())
}
