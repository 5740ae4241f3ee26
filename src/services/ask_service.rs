//! 问答服务 - 业务能力层
//!
//! 单槽位的"提问 → 回答"循环，不保留历史

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use crate::clients::AssistantApi;
use crate::error::{AppResult, AskError};
use crate::models::AskAnswer;
use crate::utils::logging::truncate_text;

/// 无法解析错误时的提示
const ASK_FALLBACK: &str = "获取回答失败";

/// 问答状态（供界面展示）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskState {
    /// 最近一次提交的问题
    pub question: Option<String>,
    pub answer: Option<String>,
    /// 支撑回答的原文片段
    pub context: Option<String>,
    pub error: Option<String>,
    pub loading: bool,
}

struct AskInner {
    view: AskState,
    /// 最近一次请求的序号
    latest_seq: u64,
}

/// 问答器
///
/// 每次提问都会覆盖上一次的回答、原文和错误。
/// 请求带有递增序号，只有最新请求的响应会写回状态
pub struct QuestionAnswerer {
    api: Arc<dyn AssistantApi>,
    inner: Mutex<AskInner>,
}

impl QuestionAnswerer {
    pub fn new(api: Arc<dyn AssistantApi>) -> Self {
        Self {
            api,
            inner: Mutex::new(AskInner {
                view: AskState::default(),
                latest_seq: 0,
            }),
        }
    }

    /// 提问
    ///
    /// # 参数
    /// - `question`: 问题文本，首尾空白会被去掉
    ///
    /// # 返回
    /// - `Ok(None)`: 问题为空，不发请求也不改状态
    /// - `Ok(Some(answer))`: 服务端的回答；如果期间已有更新的提问，回答只返回给调用方
    pub async fn ask(&self, question: &str) -> AppResult<Option<AskAnswer>> {
        let question = question.trim();
        if question.is_empty() {
            debug!("问题为空，忽略");
            return Ok(None);
        }

        let seq = {
            let mut inner = self.lock();
            inner.latest_seq += 1;
            inner.view = AskState {
                question: Some(question.to_string()),
                loading: true,
                ..AskState::default()
            };
            inner.latest_seq
        };

        info!("❓ 提问 #{}: {}", seq, truncate_text(question, 80));
        let result = self.api.ask(question).await;

        let mut inner = self.lock();
        let is_latest = inner.latest_seq == seq;
        if !is_latest {
            debug!("提问 #{} 已被更新的提问取代，结果不写回", seq);
        }

        match result {
            Ok(resp) => {
                let answer = AskAnswer::from(resp);
                if is_latest {
                    info!("✓ 提问 #{} 已回答", seq);
                    inner.view.loading = false;
                    inner.view.answer = Some(answer.answer.clone());
                    inner.view.context =
                        Some(answer.context.clone()).filter(|c| !c.trim().is_empty());
                }
                Ok(Some(answer))
            }
            Err(err) => {
                error!("提问 #{} 失败: {}", seq, err);
                let message = err.user_message(ASK_FALLBACK);
                if is_latest {
                    inner.view.loading = false;
                    inner.view.error = Some(message.clone());
                }
                Err(AskError::Failed { message }.into())
            }
        }
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> AskState {
        self.lock().view.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().view.loading
    }

    fn lock(&self) -> MutexGuard<'_, AskInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
