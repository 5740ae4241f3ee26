//! 文档相关的数据模型

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult, FileError};

/// 允许上传的文件扩展名（不区分大小写）
pub const SUPPORTED_EXTENSIONS: [&str; 2] = [".pdf", ".txt"];

/// 检查文件名是否为支持的文档类型
pub fn is_supported_document(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// 待上传的文件
///
/// 命令行参数和交互输入两种方式都会构造出这个结构，
/// 之后统一交给 `UploadCoordinator::submit_file`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// 从磁盘读取文件
    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                AppError::File(FileError::MissingFileName {
                    path: path.display().to_string(),
                })
            })?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        Ok(Self { name, bytes })
    }

    /// 文件大小（字节）
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 根据扩展名推断 MIME 类型
    pub fn mime_type(&self) -> &'static str {
        let lower = self.name.to_lowercase();
        if lower.ends_with(".pdf") {
            "application/pdf"
        } else if lower.ends_with(".txt") {
            "text/plain"
        } else {
            "application/octet-stream"
        }
    }
}

/// 上传接口的返回
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub detail: Option<Value>,
}

/// 已加载的文档：文件名 + 摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub summary: String,
}
