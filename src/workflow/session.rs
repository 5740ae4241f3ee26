//! 会话容器 - 流程层
//!
//! 核心职责：持有"文档是否已上传"这道闸门
//!
//! 流程顺序：
//! 1. 上传始终可用
//! 2. 上传成功后闸门打开（只打开一次），文件名和摘要从此不变
//! 3. 闸门打开后才能拿到摘要、问答和挑战模式

use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::clients::AssistantApi;
use crate::config::Config;
use crate::error::{AppResult, SessionError};
use crate::models::{DocumentInfo, UploadFile};
use crate::services::{ChallengeRunner, QuestionAnswerer, UploadCoordinator};

/// 会话状态快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub uploaded: bool,
    pub filename: String,
    pub summary: String,
}

/// 上传成功后才会出现的工作区
///
/// 问答器和挑战模式各自独立，互不共享状态
pub struct DocumentWorkspace {
    document: DocumentInfo,
    answerer: QuestionAnswerer,
    challenge: ChallengeRunner,
}

impl DocumentWorkspace {
    fn new(document: DocumentInfo, api: Arc<dyn AssistantApi>) -> Self {
        Self {
            document,
            answerer: QuestionAnswerer::new(Arc::clone(&api)),
            challenge: ChallengeRunner::new(api),
        }
    }

    pub fn document(&self) -> &DocumentInfo {
        &self.document
    }

    pub fn answerer(&self) -> &QuestionAnswerer {
        &self.answerer
    }

    pub fn challenge(&self) -> &ChallengeRunner {
        &self.challenge
    }
}

/// 会话容器
pub struct SessionContainer {
    api: Arc<dyn AssistantApi>,
    uploader: UploadCoordinator,
    workspace: OnceLock<DocumentWorkspace>,
}

impl SessionContainer {
    /// 创建新的会话
    pub fn new(api: Arc<dyn AssistantApi>, config: &Config) -> Self {
        Self {
            uploader: UploadCoordinator::new(Arc::clone(&api), config.max_upload_bytes),
            api,
            workspace: OnceLock::new(),
        }
    }

    /// 上传文档并打开闸门
    ///
    /// 一个会话只能加载一个文档，闸门打开后再上传会直接被拒绝，不会发出请求
    pub async fn upload(&self, file: UploadFile) -> AppResult<&DocumentWorkspace> {
        if let Some(workspace) = self.workspace.get() {
            return Err(SessionError::DocumentAlreadyUploaded {
                filename: workspace.document.filename.clone(),
            }
            .into());
        }

        let document = self.uploader.submit_file(file).await?;
        self.open(document)
    }

    /// 唯一的一次状态切换：未上传 → 已上传
    fn open(&self, document: DocumentInfo) -> AppResult<&DocumentWorkspace> {
        let mut opened = false;
        let workspace = self.workspace.get_or_init(|| {
            opened = true;
            DocumentWorkspace::new(document, Arc::clone(&self.api))
        });

        if !opened {
            return Err(SessionError::DocumentAlreadyUploaded {
                filename: workspace.document.filename.clone(),
            }
            .into());
        }

        info!("📄 文档已就绪: {}", workspace.document.filename);
        Ok(workspace)
    }

    pub fn is_uploaded(&self) -> bool {
        self.workspace.get().is_some()
    }

    /// 上传成功后的工作区，未上传时为 None
    pub fn workspace(&self) -> Option<&DocumentWorkspace> {
        self.workspace.get()
    }

    /// 需要文档的操作通过这里获取工作区
    pub fn require_workspace(&self) -> AppResult<&DocumentWorkspace> {
        self.workspace
            .get()
            .ok_or_else(|| SessionError::DocumentNotUploaded.into())
    }

    pub fn uploader(&self) -> &UploadCoordinator {
        &self.uploader
    }

    /// 当前会话快照
    pub fn snapshot(&self) -> Session {
        match self.workspace.get() {
            Some(workspace) => Session {
                uploaded: true,
                filename: workspace.document.filename.clone(),
                summary: workspace.document.summary.clone(),
            },
            None => Session::default(),
        }
    }
}
