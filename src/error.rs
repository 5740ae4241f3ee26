//! 错误类型定义
//!
//! 每个状态容器在自己的边界上把错误转换成展示文本，
//! 同时把结构化的错误返回给调用方。

use serde_json::Value;
use thiserror::Error;

use crate::models::error_detail::extract_error_message;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验错误（发生在任何网络请求之前）
    #[error("{0}")]
    Validation(#[from] ValidationError),
    /// 远程服务调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文档上传错误
    #[error("上传失败: {0}")]
    Upload(#[from] UploadError),
    /// 问答错误
    #[error("{0}")]
    Ask(#[from] AskError),
    /// 挑战模式错误
    #[error("{0}")]
    Challenge(#[from] ChallengeError),
    /// 会话状态错误
    #[error("{0}")]
    Session(#[from] SessionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 输入校验错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 文件类型不受支持
    #[error("仅支持 PDF 和 TXT 文件: {filename}")]
    UnsupportedFileType { filename: String },
    /// 文件名为空
    #[error("未提供文件")]
    EmptyFileName,
}

/// 远程服务调用错误
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    /// 网络层失败（连接失败、超时、读取响应失败）
    #[error("请求 {endpoint} 失败: {message}")]
    Transport { endpoint: String, message: String },
    /// 服务端返回非 2xx 状态
    #[error("请求 {endpoint} 失败，状态码 {status}")]
    Rejected {
        endpoint: String,
        status: u16,
        detail: Option<Value>,
    },
    /// 返回内容无法识别
    #[error("{endpoint} 返回了无法识别的数据: {message}")]
    InvalidPayload { endpoint: String, message: String },
}

impl ApiError {
    /// 服务端返回的结构化错误详情（`detail` 字段）
    pub fn detail(&self) -> Option<&Value> {
        match self {
            ApiError::Rejected { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    /// 请求的端点
    pub fn endpoint(&self) -> &str {
        match self {
            ApiError::Transport { endpoint, .. }
            | ApiError::Rejected { endpoint, .. }
            | ApiError::InvalidPayload { endpoint, .. } => endpoint,
        }
    }

    /// 提取可展示给用户的错误信息
    ///
    /// 优先使用服务端的 `detail`，其次是网络层的错误文本，最后使用 `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        let transport_text = self.to_string();
        extract_error_message(self.detail(), Some(&transport_text), fallback)
    }
}

/// 上传错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// 已有文件正在上传
    #[error("已有文件正在上传，请稍候")]
    Busy,
    /// 服务端拒绝或返回 success=false
    #[error("{message}")]
    Transfer { message: String },
}

/// 问答错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AskError {
    #[error("{message}")]
    Failed { message: String },
}

/// 挑战模式错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// 生成题目失败
    #[error("{message}")]
    Generation { message: String },
    /// 题目正在生成中
    #[error("题目正在生成中，请稍候")]
    GenerationInFlight,
    /// 评分失败
    #[error("第 {} 题评分失败: {message}", .index + 1)]
    Evaluation { index: usize, message: String },
    /// 题目不存在
    #[error("第 {} 题不存在（共 {count} 题）", .index + 1)]
    NoSuchQuestion { index: usize, count: usize },
    /// 该题已评分
    #[error("第 {} 题已经评分，不能重复提交", .index + 1)]
    AlreadyEvaluated { index: usize },
    /// 已有答案正在评分
    #[error("第 {} 题正在评分，请稍候", .index + 1)]
    EvaluationInFlight { index: usize },
    /// 题目已重新生成，本次结果作废
    #[error("题目已重新生成，本次结果已丢弃")]
    Superseded,
}

/// 会话错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("请先上传文档")]
    DocumentNotUploaded,
    #[error("当前会话已加载文档: {filename}")]
    DocumentAlreadyUploaded { filename: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 路径中没有文件名
    #[error("路径中没有文件名: {path}")]
    MissingFileName { path: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否属于输入校验错误
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
