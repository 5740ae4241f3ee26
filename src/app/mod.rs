//! 终端前端（编排层）
//!
//! 读取命令 → 调用会话容器 → 渲染快照。
//! 所有错误都在这里转换成提示文本，不会让主循环退出

pub mod command;
pub mod render;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::clients::{AssistantApi, AssistantClient};
use crate::config::Config;
use crate::models::UploadFile;
use crate::utils::log_startup;
use crate::workflow::SessionContainer;

pub use command::Command;

/// 应用主结构
pub struct App {
    config: Config,
    session: SessionContainer,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let client = AssistantClient::new(&config)?;
        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// 使用指定的服务实现创建应用
    pub fn with_api(config: Config, api: Arc<dyn AssistantApi>) -> Self {
        let session = SessionContainer::new(api, &config);
        Self { config, session }
    }

    /// 运行交互主循环
    ///
    /// # 参数
    /// - `initial_document`: 命令行传入的文档路径，启动后先上传
    pub async fn run(&self, initial_document: Option<PathBuf>) -> Result<()> {
        println!("{}", render::render_help(&self.config));

        if let Some(path) = initial_document {
            print_output(&self.execute(Command::Upload(path)).await);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => print_output(&self.execute(command).await),
                Err(message) => println!("{}", message),
            }
        }

        info!("👋 会话结束");
        Ok(())
    }

    /// 执行一条命令，返回要展示的文本（可能为空）
    pub async fn execute(&self, command: Command) -> String {
        match command {
            Command::Empty | Command::Quit => String::new(),
            Command::Help => render::render_help(&self.config),
            Command::Upload(path) => self.upload(&path).await,
            Command::Summary => self.summary(),
            Command::Ask(question) => self.ask(&question).await,
            Command::Challenge => self.challenge().await,
            Command::Answer { index, text } => self.answer(index, &text).await,
            Command::Draft { index, text } => self.draft(index, &text),
            Command::Progress => self.progress(),
        }
    }

    async fn upload(&self, path: &Path) -> String {
        let file = match UploadFile::from_path(path).await {
            Ok(file) => file,
            Err(err) => {
                warn!("读取文档失败: {}", err);
                return format!("❌ {}", err);
            }
        };

        println!("⏳ 正在处理文档 {}，请稍候...", file.name);
        match self.session.upload(file).await {
            Ok(workspace) => render::render_summary(workspace.document()),
            Err(err) if err.is_validation() => {
                render::render_upload(&self.session.uploader().snapshot())
            }
            Err(err) => format!("❌ {}", err),
        }
    }

    fn summary(&self) -> String {
        match self.session.require_workspace() {
            Ok(workspace) => render::render_summary(workspace.document()),
            Err(err) => format!("❌ {}", err),
        }
    }

    async fn ask(&self, question: &str) -> String {
        let workspace = match self.session.require_workspace() {
            Ok(workspace) => workspace,
            Err(err) => return format!("❌ {}", err),
        };

        if let Err(err) = workspace.answerer().ask(question).await {
            warn!("提问失败: {}", err);
        }
        render::render_answer(&workspace.answerer().snapshot())
    }

    async fn challenge(&self) -> String {
        let workspace = match self.session.require_workspace() {
            Ok(workspace) => workspace,
            Err(err) => return format!("❌ {}", err),
        };

        println!("⏳ 正在根据文档生成题目...");
        if let Err(err) = workspace.challenge().generate_questions().await {
            warn!("生成题目失败: {}", err);
        }
        render::render_challenge(&workspace.challenge().snapshot())
    }

    async fn answer(&self, index: usize, text: &str) -> String {
        let workspace = match self.session.require_workspace() {
            Ok(workspace) => workspace,
            Err(err) => return format!("❌ {}", err),
        };

        let challenge = workspace.challenge();
        match challenge.submit_answer(index, text).await {
            Ok(_) => render::render_challenge(&challenge.snapshot()),
            Err(err) => format!("❌ {}", err),
        }
    }

    fn draft(&self, index: usize, text: &str) -> String {
        let workspace = match self.session.require_workspace() {
            Ok(workspace) => workspace,
            Err(err) => return format!("❌ {}", err),
        };

        let challenge = workspace.challenge();
        match challenge.update_answer(index, text) {
            Ok(()) => render::render_challenge(&challenge.snapshot()),
            Err(err) => format!("❌ {}", err),
        }
    }

    fn progress(&self) -> String {
        match self.session.require_workspace() {
            Ok(workspace) => render::render_progress(&workspace.challenge().snapshot()),
            Err(err) => format!("❌ {}", err),
        }
    }
}

fn print_output(output: &str) {
    if !output.is_empty() {
        println!("{}", output);
    }
}
