//! 上传服务 - 业务能力层
//!
//! 只负责"校验并上传一个文件"能力，上传成功后的会话切换由 workflow 层完成

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

use crate::clients::AssistantApi;
use crate::error::{AppError, AppResult, UploadError, ValidationError};
use crate::models::{extract_error_message, is_supported_document, DocumentInfo, UploadFile};

/// 服务端没有给出原因时的提示
const UNKNOWN_UPLOAD_ERROR: &str = "未知错误";
/// 网络错误无法解析时的提示
const UPLOAD_FALLBACK: &str = "上传文件出错";

/// 上传状态（供界面展示）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadState {
    /// 是否有文件正在上传
    pub busy: bool,
    /// 正在上传的文件名
    pub current_file: Option<String>,
    /// 最近一次失败的原因
    pub error: Option<String>,
}

/// 上传协调器
///
/// 职责：
/// - 在发出请求前校验文件类型
/// - 同一时间只允许一个上传，`busy` 同时也是互斥标志，不排队
/// - 把失败转换成可展示的错误信息
pub struct UploadCoordinator {
    api: Arc<dyn AssistantApi>,
    state: Mutex<UploadState>,
    max_upload_bytes: u64,
}

/// 上传结束时清除 busy 标志（包括 future 被丢弃的情况）
struct BusyGuard<'a> {
    state: &'a Mutex<UploadState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.busy = false;
        state.current_file = None;
    }
}

impl UploadCoordinator {
    /// 创建新的上传协调器
    pub fn new(api: Arc<dyn AssistantApi>, max_upload_bytes: u64) -> Self {
        Self {
            api,
            state: Mutex::new(UploadState::default()),
            max_upload_bytes,
        }
    }

    /// 校验并上传文件
    ///
    /// # 参数
    /// - `file`: 待上传的文件
    ///
    /// # 返回
    /// 成功时返回文件名和服务端生成的摘要
    ///
    /// # 错误
    /// - `ValidationError`: 文件名为空或扩展名不是 `.pdf`/`.txt`，不会发出请求
    /// - `UploadError::Busy`: 已有文件正在上传
    /// - `UploadError::Transfer`: 请求失败或服务端返回 `success=false`
    pub async fn submit_file(&self, file: UploadFile) -> AppResult<DocumentInfo> {
        let _guard = self.begin(&file)?;

        if file.len() as u64 > self.max_upload_bytes {
            warn!(
                "⚠️ 文件 {} 大小为 {} 字节，超过建议上限 {} 字节",
                file.name,
                file.len(),
                self.max_upload_bytes
            );
        }

        info!("📤 正在上传文档: {}", file.name);
        let result = self.api.upload(&file).await;

        let message = match result {
            Ok(resp) if resp.success => {
                info!("✓ 文档上传成功: {}", file.name);
                return Ok(DocumentInfo {
                    filename: file.name,
                    summary: resp.summary.unwrap_or_default(),
                });
            }
            Ok(resp) => extract_error_message(resp.detail.as_ref(), None, UNKNOWN_UPLOAD_ERROR),
            Err(err) => {
                error!("上传失败 ({}): {}", file.name, err);
                err.user_message(UPLOAD_FALLBACK)
            }
        };

        let err = AppError::from(UploadError::Transfer { message });
        self.lock().error = Some(err.to_string());
        Err(err)
    }

    /// 是否有文件正在上传
    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// 最近一次失败的原因
    pub fn last_error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> UploadState {
        self.lock().clone()
    }

    /// 检查互斥与文件类型，通过后置为 busy
    fn begin(&self, file: &UploadFile) -> AppResult<BusyGuard<'_>> {
        let mut state = self.lock();
        if state.busy {
            warn!("已有文件正在上传，忽略 {}", file.name);
            return Err(UploadError::Busy.into());
        }

        if let Err(err) = validate(file) {
            warn!("文件校验失败: {}", err);
            state.error = Some(err.to_string());
            return Err(err.into());
        }

        state.busy = true;
        state.current_file = Some(file.name.clone());
        state.error = None;

        Ok(BusyGuard { state: &self.state })
    }

    fn lock(&self) -> MutexGuard<'_, UploadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate(file: &UploadFile) -> Result<(), ValidationError> {
    if file.name.trim().is_empty() {
        return Err(ValidationError::EmptyFileName);
    }
    if !is_supported_document(&file.name) {
        return Err(ValidationError::UnsupportedFileType {
            filename: file.name.clone(),
        });
    }
    Ok(())
}
