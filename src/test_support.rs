//! 单元测试用的脚本化服务

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::clients::AssistantApi;
use crate::error::ApiError;
use crate::models::{
    AskResponse, ChallengeQuestion, EvaluationResponse, UploadFile, UploadResponse,
};

/// 记录下来的调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload(String),
    Ask(String),
    Challenge,
    Evaluate { question: String, answer: String },
}

struct Reply<T> {
    gate: Option<oneshot::Receiver<()>>,
    result: Result<T, ApiError>,
}

/// 按顺序返回预设结果的假服务
///
/// 带 gate 的回复会一直挂起，直到测试发出放行信号，用来控制响应到达的先后
#[derive(Default)]
pub struct FakeApi {
    uploads: Mutex<VecDeque<Reply<UploadResponse>>>,
    asks: Mutex<VecDeque<Reply<AskResponse>>>,
    challenges: Mutex<VecDeque<Reply<Vec<ChallengeQuestion>>>>,
    evaluations: Mutex<VecDeque<Reply<EvaluationResponse>>>,
    calls: Mutex<Vec<Call>>,
}

fn push<T>(queue: &Mutex<VecDeque<Reply<T>>>, result: Result<T, ApiError>) {
    queue.lock().unwrap().push_back(Reply { gate: None, result });
}

fn push_gated<T>(
    queue: &Mutex<VecDeque<Reply<T>>>,
    result: Result<T, ApiError>,
) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    queue.lock().unwrap().push_back(Reply {
        gate: Some(rx),
        result,
    });
    tx
}

async fn pop<T>(queue: &Mutex<VecDeque<Reply<T>>>, endpoint: &str) -> Result<T, ApiError> {
    let reply = queue.lock().unwrap().pop_front();
    let Some(reply) = reply else {
        return Err(ApiError::Transport {
            endpoint: endpoint.to_string(),
            message: "没有预设的回复".to_string(),
        });
    };
    if let Some(gate) = reply.gate {
        let _ = gate.await;
    }
    reply.result
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_upload(&self, result: Result<UploadResponse, ApiError>) {
        push(&self.uploads, result);
    }

    pub fn push_upload_gated(&self, result: Result<UploadResponse, ApiError>) -> oneshot::Sender<()> {
        push_gated(&self.uploads, result)
    }

    pub fn push_ask(&self, result: Result<AskResponse, ApiError>) {
        push(&self.asks, result);
    }

    pub fn push_ask_gated(&self, result: Result<AskResponse, ApiError>) -> oneshot::Sender<()> {
        push_gated(&self.asks, result)
    }

    pub fn push_challenge(&self, result: Result<Vec<ChallengeQuestion>, ApiError>) {
        push(&self.challenges, result);
    }

    pub fn push_challenge_gated(
        &self,
        result: Result<Vec<ChallengeQuestion>, ApiError>,
    ) -> oneshot::Sender<()> {
        push_gated(&self.challenges, result)
    }

    pub fn push_evaluation(&self, result: Result<EvaluationResponse, ApiError>) {
        push(&self.evaluations, result);
    }

    pub fn push_evaluation_gated(
        &self,
        result: Result<EvaluationResponse, ApiError>,
    ) -> oneshot::Sender<()> {
        push_gated(&self.evaluations, result)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AssistantApi for FakeApi {
    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ApiError> {
        self.record(Call::Upload(file.name.clone()));
        pop(&self.uploads, "/upload").await
    }

    async fn ask(&self, question: &str) -> Result<AskResponse, ApiError> {
        self.record(Call::Ask(question.to_string()));
        pop(&self.asks, "/ask").await
    }

    async fn generate_challenge(&self) -> Result<Vec<ChallengeQuestion>, ApiError> {
        self.record(Call::Challenge);
        pop(&self.challenges, "/challenge").await
    }

    async fn evaluate(
        &self,
        question: &str,
        user_answer: &str,
    ) -> Result<EvaluationResponse, ApiError> {
        self.record(Call::Evaluate {
            question: question.to_string(),
            answer: user_answer.to_string(),
        });
        pop(&self.evaluations, "/evaluate").await
    }
}

// ========== 构造测试数据 ==========

pub fn upload_ok(summary: &str) -> Result<UploadResponse, ApiError> {
    Ok(UploadResponse {
        success: true,
        filename: None,
        summary: Some(summary.to_string()),
        detail: None,
    })
}

pub fn ask_ok(answer: &str, context: &str) -> Result<AskResponse, ApiError> {
    Ok(AskResponse {
        question: None,
        answer: answer.to_string(),
        context: context.to_string(),
    })
}

pub fn questions(count: usize) -> Vec<ChallengeQuestion> {
    (0..count)
        .map(|i| ChallengeQuestion {
            question: format!("问题 {}", i + 1),
            answer: format!("答案 {}", i + 1),
            context: format!("原文 {}", i + 1),
        })
        .collect()
}

pub fn evaluation(is_correct: bool) -> Result<EvaluationResponse, ApiError> {
    Ok(EvaluationResponse {
        is_correct,
        feedback: if is_correct { "回答正确" } else { "回答不完整" }.to_string(),
        reference: "参考原文".to_string(),
    })
}

pub fn rejected(endpoint: &str, detail: serde_json::Value) -> ApiError {
    ApiError::Rejected {
        endpoint: endpoint.to_string(),
        status: 400,
        detail: Some(detail),
    }
}
