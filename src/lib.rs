//! # Doc Assistant
//!
//! 文档问答助手的客户端：上传文档获取摘要，针对文档提问，以及挑战模式答题
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - 持有 HTTP 客户端，只暴露远程调用能力
//! - `AssistantApi` - 上传 / 问答 / 生成题目 / 评分 四个远程操作
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 各自独立的状态容器，只通过 `AssistantApi` 访问服务
//! - `UploadCoordinator` - 校验并上传单个文件
//! - `QuestionAnswerer` - 单槽位问答，最新请求优先
//! - `ChallengeRunner` - 挑战题、作答、评分和进度
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 会话闸门，上传成功后才开放问答和挑战模式
//!
//! ### ④ 编排层（App）
//! - `app/` - 终端交互循环，负责命令解析和渲染
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
mod test_support;

// 重新导出常用类型
pub use app::App;
pub use clients::{AssistantApi, AssistantClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{DocumentInfo, Feedback, UploadFile};
pub use services::{ChallengeRunner, QuestionAnswerer, UploadCoordinator};
pub use workflow::{DocumentWorkspace, Session, SessionContainer};
