//! 问答与挑战模式的数据模型

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// 服务端生成的挑战题目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeQuestion {
    pub question: String,
    /// 参考答案
    #[serde(default, deserialize_with = "null_as_empty")]
    pub answer: String,
    /// 出题所依据的原文片段
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context: String,
}

/// 题目标识
///
/// 每次生成题目都会开启新的一代（generation），同一位置在不同代中是不同的题目，
/// 因此旧题目的评分结果不会落到新题目上
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionId {
    generation: u64,
    position: usize,
}

impl QuestionId {
    pub fn new(generation: u64, position: usize) -> Self {
        Self {
            generation,
            position,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 题目在本代中的位置（从0开始）
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[第{}批 题目#{}]", self.generation, self.position + 1)
    }
}

/// 单题的作答状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerStatus {
    /// 尚未提交
    #[default]
    Unanswered,
    /// 正在评分
    Submitting,
    /// 已评分（终态）
    Evaluated,
    /// 评分失败，可以重新提交
    SubmitError,
}

impl AnswerStatus {
    /// 是否还允许提交答案
    pub fn accepts_submission(&self) -> bool {
        matches!(self, AnswerStatus::Unanswered | AnswerStatus::SubmitError)
    }
}

/// 评分结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub is_correct: bool,
    pub message: String,
    pub reference: String,
}

impl From<EvaluationResponse> for Feedback {
    fn from(resp: EvaluationResponse) -> Self {
        Self {
            is_correct: resp.is_correct,
            message: resp.feedback,
            reference: resp.reference,
        }
    }
}

/// 评分接口的返回
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvaluationResponse {
    pub is_correct: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub feedback: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reference: String,
}

/// 问答接口的返回
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub question: Option<String>,
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context: String,
}

/// 一次问答的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AskAnswer {
    pub answer: String,
    pub context: String,
}

impl From<AskResponse> for AskAnswer {
    fn from(resp: AskResponse) -> Self {
        Self {
            answer: resp.answer,
            context: resp.context,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
