//! 挑战模式服务 - 业务能力层
//!
//! 管理一组生成的题目、每题的作答、评分结果和整体进度
//!
//! ## 状态机
//! - 全局：`Idle → Generating → {Ready | Failed}`，`Ready`/`Failed` 都可以重新生成
//! - 单题：`Unanswered → Submitting → {Evaluated | SubmitError}`，`SubmitError` 可以重新提交
//!
//! 每次生成都会开启新的一代，所有按题目索引的数据一起清空，
//! 旧一代的评分响应到达时直接丢弃

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::clients::AssistantApi;
use crate::error::{AppResult, ChallengeError};
use crate::models::{AnswerStatus, ChallengeQuestion, Feedback, QuestionId, GENERIC_ERROR_MESSAGE};
use crate::utils::logging::truncate_text;

/// 服务端返回空列表时的提示
pub const NO_QUESTIONS_MESSAGE: &str = "未能生成题目，请重试";
/// 生成请求中途被放弃时的提示
pub const GENERATION_CANCELLED_MESSAGE: &str = "题目生成已中断，请重新生成";
/// 评分请求中途被放弃时的提示
pub const EVALUATION_CANCELLED_MESSAGE: &str = "评分已中断，请重新提交";

/// 题目生成阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPhase {
    #[default]
    Idle,
    Generating,
    Ready,
    Failed,
}

/// 单题视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeItemView {
    pub id: QuestionId,
    pub question: String,
    pub user_answer: Option<String>,
    pub status: AnswerStatus,
    pub feedback: Option<Feedback>,
    pub error: Option<String>,
}

/// 挑战模式状态快照
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeSnapshot {
    pub phase: GenerationPhase,
    pub generation_error: Option<String>,
    pub items: Vec<ChallengeItemView>,
    /// 完成比例 0.0 ~ 1.0
    pub progress: f64,
    pub correct: usize,
}

#[derive(Default)]
struct ChallengeInner {
    generation: u64,
    phase: GenerationPhase,
    generation_error: Option<String>,
    questions: Vec<(QuestionId, ChallengeQuestion)>,
    user_answers: BTreeMap<QuestionId, String>,
    feedback: BTreeMap<QuestionId, Feedback>,
    answer_errors: BTreeMap<QuestionId, String>,
    statuses: BTreeMap<QuestionId, AnswerStatus>,
}

impl ChallengeInner {
    /// 开启新的一代，清空所有题目相关的数据
    fn start_generation(&mut self) -> u64 {
        self.generation += 1;
        self.phase = GenerationPhase::Generating;
        self.generation_error = None;
        self.questions.clear();
        self.user_answers.clear();
        self.feedback.clear();
        self.answer_errors.clear();
        self.statuses.clear();
        self.generation
    }

    fn question(&self, index: usize) -> Result<&(QuestionId, ChallengeQuestion), ChallengeError> {
        self.questions
            .get(index)
            .ok_or(ChallengeError::NoSuchQuestion {
                index,
                count: self.questions.len(),
            })
    }

    fn status(&self, id: &QuestionId) -> AnswerStatus {
        self.statuses.get(id).copied().unwrap_or_default()
    }

    fn in_flight(&self) -> Option<QuestionId> {
        self.statuses
            .iter()
            .find(|(_, status)| **status == AnswerStatus::Submitting)
            .map(|(id, _)| *id)
    }

    fn progress(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        self.feedback.len() as f64 / self.questions.len() as f64
    }

    fn correct(&self) -> usize {
        self.feedback.values().filter(|f| f.is_correct).count()
    }
}

fn lock_inner(inner: &Mutex<ChallengeInner>) -> MutexGuard<'_, ChallengeInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 生成请求结束时，阶段仍停在 `Generating` 则改为 `Failed`
///
/// 只有 future 被丢弃（超时、`select!`）时才会走到这里
struct GenerationGuard<'a> {
    inner: &'a Mutex<ChallengeInner>,
    generation: u64,
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        let mut inner = lock_inner(self.inner);
        if inner.generation == self.generation && inner.phase == GenerationPhase::Generating {
            warn!("第 {} 批题目生成被中断", self.generation);
            inner.phase = GenerationPhase::Failed;
            inner.generation_error = Some(GENERATION_CANCELLED_MESSAGE.to_string());
        }
    }
}

/// 评分请求结束时，题目仍停在 `Submitting` 则改为 `SubmitError`
struct SubmissionGuard<'a> {
    inner: &'a Mutex<ChallengeInner>,
    id: QuestionId,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        let mut inner = lock_inner(self.inner);
        if inner.generation == self.id.generation()
            && inner.status(&self.id) == AnswerStatus::Submitting
        {
            warn!("{} 评分被中断", self.id);
            inner.statuses.insert(self.id, AnswerStatus::SubmitError);
            inner
                .answer_errors
                .insert(self.id, EVALUATION_CANCELLED_MESSAGE.to_string());
        }
    }
}

/// 挑战模式运行器
///
/// 评分请求是串行的：同一时间只有一道题处于 `Submitting`
pub struct ChallengeRunner {
    api: Arc<dyn AssistantApi>,
    inner: Mutex<ChallengeInner>,
}

impl ChallengeRunner {
    pub fn new(api: Arc<dyn AssistantApi>) -> Self {
        Self {
            api,
            inner: Mutex::new(ChallengeInner::default()),
        }
    }

    /// 生成一组新题目
    ///
    /// 发出请求前就清空旧题目、作答、评分和错误；
    /// 服务端返回空列表或非数组时视为生成失败
    pub async fn generate_questions(&self) -> AppResult<Vec<ChallengeQuestion>> {
        let generation = {
            let mut inner = self.lock();
            if inner.phase == GenerationPhase::Generating {
                return Err(ChallengeError::GenerationInFlight.into());
            }
            inner.start_generation()
        };
        let _guard = GenerationGuard {
            inner: &self.inner,
            generation,
        };

        info!("🎯 正在生成第 {} 批挑战题目...", generation);
        let result = self.api.generate_challenge().await;

        let mut inner = self.lock();
        let message = match result {
            Ok(questions) if !questions.is_empty() => {
                info!("✓ 第 {} 批生成了 {} 道题目", generation, questions.len());
                inner.questions = questions
                    .iter()
                    .enumerate()
                    .map(|(position, q)| (QuestionId::new(generation, position), q.clone()))
                    .collect();
                inner.phase = GenerationPhase::Ready;
                return Ok(questions);
            }
            Ok(_) => {
                warn!("⚠️ 服务端没有返回任何题目");
                NO_QUESTIONS_MESSAGE.to_string()
            }
            Err(err) => {
                error!("生成题目失败: {}", err);
                err.user_message(GENERIC_ERROR_MESSAGE)
            }
        };

        inner.phase = GenerationPhase::Failed;
        inner.generation_error = Some(message.clone());
        Err(ChallengeError::Generation { message }.into())
    }

    /// 更新某题的草稿答案
    ///
    /// 已评分或正在评分的题目输入框不可编辑
    pub fn update_answer(&self, index: usize, text: &str) -> AppResult<()> {
        let mut inner = self.lock();
        let id = inner.question(index)?.0;
        match inner.status(&id) {
            status if status.accepts_submission() => {}
            AnswerStatus::Submitting => {
                return Err(ChallengeError::EvaluationInFlight { index }.into())
            }
            _ => return Err(ChallengeError::AlreadyEvaluated { index }.into()),
        }
        inner.user_answers.insert(id, text.to_string());
        Ok(())
    }

    /// 提交某题的答案
    ///
    /// # 参数
    /// - `index`: 题目位置（从0开始）
    /// - `answer`: 用户答案，提交时去掉首尾空白
    ///
    /// # 返回
    /// - `Ok(None)`: 答案为空，不发请求也不改状态
    /// - `Ok(Some(feedback))`: 评分结果，已记录到该题
    ///
    /// # 错误
    /// - `NoSuchQuestion` / `AlreadyEvaluated` / `EvaluationInFlight`: 不发请求
    /// - `Evaluation`: 请求失败，错误只记录在该题上
    /// - `Superseded`: 评分期间题目被重新生成
    pub async fn submit_answer(&self, index: usize, answer: &str) -> AppResult<Option<Feedback>> {
        let trimmed = answer.trim();
        if trimmed.is_empty() {
            debug!("第 {} 题答案为空，忽略", index + 1);
            return Ok(None);
        }

        let (id, question) = {
            let mut inner = self.lock();
            let (id, question) = inner.question(index)?.clone();
            if inner.feedback.contains_key(&id) {
                return Err(ChallengeError::AlreadyEvaluated { index }.into());
            }
            if let Some(busy) = inner.in_flight() {
                return Err(ChallengeError::EvaluationInFlight {
                    index: busy.position(),
                }
                .into());
            }

            inner.user_answers.insert(id, answer.to_string());
            inner.answer_errors.remove(&id);
            inner.statuses.insert(id, AnswerStatus::Submitting);
            (id, question)
        };
        let _guard = SubmissionGuard {
            inner: &self.inner,
            id,
        };

        info!("📝 {} 提交答案: {}", id, truncate_text(trimmed, 60));
        let result = self.api.evaluate(&question.question, trimmed).await;

        let mut inner = self.lock();
        if inner.generation != id.generation() {
            warn!("{} 所在的题目已被重新生成，丢弃评分结果", id);
            return Err(ChallengeError::Superseded.into());
        }

        match result {
            Ok(resp) => {
                let feedback = Feedback::from(resp);
                info!(
                    "{} 评分完成: {}",
                    id,
                    if feedback.is_correct { "✅ 正确" } else { "❌ 不正确" }
                );
                inner.feedback.insert(id, feedback.clone());
                inner.statuses.insert(id, AnswerStatus::Evaluated);
                Ok(Some(feedback))
            }
            Err(err) => {
                error!("{} 评分失败: {}", id, err);
                let message = err.user_message(GENERIC_ERROR_MESSAGE);
                inner.answer_errors.insert(id, message.clone());
                inner.statuses.insert(id, AnswerStatus::SubmitError);
                Err(ChallengeError::Evaluation { index, message }.into())
            }
        }
    }

    /// 完成比例：已评分题数 / 题目总数，没有题目时为 0
    pub fn progress(&self) -> f64 {
        self.lock().progress()
    }

    /// 完成百分比 0 ~ 100
    pub fn progress_percent(&self) -> f64 {
        self.progress() * 100.0
    }

    /// 答对的题数
    pub fn correct_count(&self) -> usize {
        self.lock().correct()
    }

    pub fn question_count(&self) -> usize {
        self.lock().questions.len()
    }

    pub fn phase(&self) -> GenerationPhase {
        self.lock().phase
    }

    pub fn generation_error(&self) -> Option<String> {
        self.lock().generation_error.clone()
    }

    /// 某题的作答状态，题目不存在时返回 None
    pub fn status(&self, index: usize) -> Option<AnswerStatus> {
        let inner = self.lock();
        let id = inner.questions.get(index)?.0;
        Some(inner.status(&id))
    }

    /// 某题的评分结果
    pub fn feedback(&self, index: usize) -> Option<Feedback> {
        let inner = self.lock();
        let id = inner.questions.get(index)?.0;
        inner.feedback.get(&id).cloned()
    }

    /// 某题的评分错误
    pub fn answer_error(&self, index: usize) -> Option<String> {
        let inner = self.lock();
        let id = inner.questions.get(index)?.0;
        inner.answer_errors.get(&id).cloned()
    }

    /// 某题的草稿答案
    pub fn user_answer(&self, index: usize) -> Option<String> {
        let inner = self.lock();
        let id = inner.questions.get(index)?.0;
        inner.user_answers.get(&id).cloned()
    }

    /// 各个映射中的条目数：(作答, 评分, 错误)
    pub fn entry_counts(&self) -> (usize, usize, usize) {
        let inner = self.lock();
        (
            inner.user_answers.len(),
            inner.feedback.len(),
            inner.answer_errors.len(),
        )
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> ChallengeSnapshot {
        let inner = self.lock();
        let items = inner
            .questions
            .iter()
            .map(|(id, q)| ChallengeItemView {
                id: *id,
                question: q.question.clone(),
                user_answer: inner.user_answers.get(id).cloned(),
                status: inner.status(id),
                feedback: inner.feedback.get(id).cloned(),
                error: inner.answer_errors.get(id).cloned(),
            })
            .collect();

        ChallengeSnapshot {
            phase: inner.phase,
            generation_error: inner.generation_error.clone(),
            items,
            progress: inner.progress(),
            correct: inner.correct(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChallengeInner> {
        lock_inner(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, AppError};
    use crate::test_support::{evaluation, questions, rejected, Call, FakeApi};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn ready_runner(count: usize) -> (Arc<FakeApi>, ChallengeRunner) {
        let api = Arc::new(FakeApi::new());
        api.push_challenge(Ok(questions(count)));
        let runner = ChallengeRunner::new(api.clone());
        runner.generate_questions().await.unwrap();
        (api, runner)
    }

    #[test]
    fn test_progress_is_zero_without_questions() {
        let runner = ChallengeRunner::new(Arc::new(FakeApi::new()));
        assert_eq!(runner.progress(), 0.0);
        assert_eq!(runner.phase(), GenerationPhase::Idle);
    }

    #[tokio::test]
    async fn test_generation_starts_clean() {
        let (_, runner) = ready_runner(3).await;

        assert_eq!(runner.phase(), GenerationPhase::Ready);
        assert_eq!(runner.question_count(), 3);
        assert_eq!(runner.progress(), 0.0);
        assert_eq!(runner.entry_counts(), (0, 0, 0));
        assert_eq!(runner.status(2), Some(AnswerStatus::Unanswered));
    }

    #[tokio::test]
    async fn test_empty_question_list_is_generation_error() {
        let api = Arc::new(FakeApi::new());
        api.push_challenge(Ok(Vec::new()));
        let runner = ChallengeRunner::new(api.clone());

        let err = runner.generate_questions().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Challenge(ChallengeError::Generation { ref message }) if message == NO_QUESTIONS_MESSAGE
        ));
        assert_eq!(runner.phase(), GenerationPhase::Failed);
        assert_eq!(runner.generation_error().as_deref(), Some(NO_QUESTIONS_MESSAGE));
    }

    #[tokio::test]
    async fn test_non_array_payload_is_generation_error() {
        let api = Arc::new(FakeApi::new());
        api.push_challenge(Err(ApiError::InvalidPayload {
            endpoint: "/challenge".to_string(),
            message: "题目列表不是数组".to_string(),
        }));
        api.push_challenge(Ok(questions(2)));
        let runner = ChallengeRunner::new(api.clone());

        runner.generate_questions().await.unwrap_err();
        assert_eq!(runner.phase(), GenerationPhase::Failed);

        // 失败后可以重新生成
        runner.generate_questions().await.unwrap();
        assert_eq!(runner.phase(), GenerationPhase::Ready);
        assert_eq!(runner.generation_error(), None);
    }

    #[tokio::test]
    async fn test_blank_answer_is_a_no_op() {
        let (api, runner) = ready_runner(2).await;

        assert_eq!(runner.submit_answer(0, "   ").await.unwrap(), None);
        assert_eq!(runner.submit_answer(9, "").await.unwrap(), None);

        assert_eq!(api.calls(), vec![Call::Challenge]);
        assert_eq!(runner.entry_counts(), (0, 0, 0));
        assert_eq!(runner.status(0), Some(AnswerStatus::Unanswered));
    }

    #[tokio::test]
    async fn test_successful_submission_advances_progress_once() {
        let (api, runner) = ready_runner(4).await;
        api.push_evaluation(evaluation(true));

        let feedback = runner.submit_answer(1, "  我的答案 ").await.unwrap().unwrap();
        assert!(feedback.is_correct);
        assert_eq!(runner.feedback(1), Some(feedback));
        assert_eq!(runner.progress(), 0.25);
        assert_eq!(runner.status(1), Some(AnswerStatus::Evaluated));
        assert_eq!(
            api.calls().last(),
            Some(&Call::Evaluate {
                question: "问题 2".to_string(),
                answer: "我的答案".to_string()
            })
        );

        let err = runner.submit_answer(1, "换个答案").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Challenge(ChallengeError::AlreadyEvaluated { index: 1 })
        ));
        assert!(runner.update_answer(1, "改一下").is_err());
        assert_eq!(runner.progress(), 0.25);
    }

    #[tokio::test]
    async fn test_evaluation_error_stays_on_its_question() {
        let (api, runner) = ready_runner(2).await;
        api.push_evaluation(Err(rejected("/evaluate", json!({"msg": "评分服务不可用"}))));
        api.push_evaluation(evaluation(false));
        api.push_evaluation(evaluation(true));

        let err = runner.submit_answer(0, "答案").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Challenge(ChallengeError::Evaluation { index: 0, .. })
        ));
        assert_eq!(runner.answer_error(0).as_deref(), Some("评分服务不可用"));
        assert_eq!(runner.status(0), Some(AnswerStatus::SubmitError));

        // 其他题目不受影响
        assert!(runner.submit_answer(1, "答案").await.unwrap().is_some());

        // 出错的题目可以重新提交，错误随之清除
        assert!(runner.submit_answer(0, "新答案").await.unwrap().is_some());
        assert_eq!(runner.answer_error(0), None);
        assert_eq!(runner.progress(), 1.0);
    }

    #[tokio::test]
    async fn test_unknown_index_is_rejected() {
        let (api, runner) = ready_runner(1).await;

        let err = runner.submit_answer(5, "答案").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Challenge(ChallengeError::NoSuchQuestion { index: 5, count: 1 })
        ));
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_submissions_are_serialized() {
        let (api, runner) = ready_runner(2).await;
        let release = api.push_evaluation_gated(evaluation(true));

        let first = runner.submit_answer(0, "答案一");
        let second = async {
            assert_eq!(runner.status(0), Some(AnswerStatus::Submitting));
            let result = runner.submit_answer(1, "答案二").await;
            release.send(()).unwrap();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.unwrap().is_some());
        assert!(matches!(
            second,
            Err(AppError::Challenge(ChallengeError::EvaluationInFlight { index: 0 }))
        ));
        assert_eq!(runner.status(1), Some(AnswerStatus::Unanswered));
    }

    #[tokio::test]
    async fn test_regeneration_discards_previous_state() {
        let (api, runner) = ready_runner(3).await;
        api.push_evaluation(evaluation(true));
        runner.submit_answer(0, "答案").await.unwrap();
        runner.update_answer(1, "草稿").unwrap();
        assert_eq!(runner.entry_counts(), (2, 1, 0));

        api.push_challenge(Ok(questions(3)));
        runner.generate_questions().await.unwrap();

        assert_eq!(runner.entry_counts(), (0, 0, 0));
        assert_eq!(runner.progress(), 0.0);
        assert_eq!(runner.feedback(0), None);
        assert_eq!(runner.user_answer(1), None);
    }

    #[tokio::test]
    async fn test_late_evaluation_for_old_questions_is_dropped() {
        let (api, runner) = ready_runner(2).await;
        let release = api.push_evaluation_gated(evaluation(true));
        api.push_challenge(Ok(questions(2)));

        let stale = runner.submit_answer(0, "旧答案");
        let regenerate = async {
            let result = runner.generate_questions().await;
            release.send(()).unwrap();
            result
        };
        let (stale, regenerate) = tokio::join!(stale, regenerate);

        regenerate.unwrap();
        assert!(matches!(
            stale,
            Err(AppError::Challenge(ChallengeError::Superseded))
        ));
        assert_eq!(runner.feedback(0), None);
        assert_eq!(runner.status(0), Some(AnswerStatus::Unanswered));
        assert_eq!(runner.progress(), 0.0);
    }

    #[tokio::test]
    async fn test_full_round_with_mixed_results() {
        let (api, runner) = ready_runner(3).await;
        api.push_evaluation(evaluation(true));
        api.push_evaluation(evaluation(false));
        api.push_evaluation(evaluation(true));

        for index in 0..3 {
            runner.submit_answer(index, "答案").await.unwrap();
        }

        assert_eq!(runner.progress_percent(), 100.0);
        assert_eq!(runner.correct_count(), 2);

        let snapshot = runner.snapshot();
        let results: Vec<bool> = snapshot
            .items
            .iter()
            .map(|item| item.feedback.as_ref().unwrap().is_correct)
            .collect();
        assert_eq!(results, vec![true, false, true]);
        assert_eq!(snapshot.correct, 2);
    }

    #[tokio::test]
    async fn test_abandoned_generation_can_be_retried() {
        let api = Arc::new(FakeApi::new());
        let _release = api.push_challenge_gated(Ok(questions(3)));
        let runner = ChallengeRunner::new(api.clone());

        let abandoned = timeout(Duration::from_millis(20), runner.generate_questions()).await;
        assert!(abandoned.is_err());
        assert_eq!(runner.phase(), GenerationPhase::Failed);
        assert_eq!(
            runner.generation_error().as_deref(),
            Some(GENERATION_CANCELLED_MESSAGE)
        );

        api.push_challenge(Ok(questions(2)));
        let retried = runner.generate_questions().await.unwrap();
        assert_eq!(retried.len(), 2);
        assert_eq!(runner.phase(), GenerationPhase::Ready);
        assert_eq!(runner.generation_error(), None);
    }

    #[tokio::test]
    async fn test_abandoned_submission_releases_the_slot() {
        let (api, runner) = ready_runner(2).await;
        let _release = api.push_evaluation_gated(evaluation(true));

        let abandoned = timeout(Duration::from_millis(20), runner.submit_answer(0, "a")).await;
        assert!(abandoned.is_err());
        assert_eq!(runner.status(0), Some(AnswerStatus::SubmitError));
        assert_eq!(
            runner.answer_error(0).as_deref(),
            Some(EVALUATION_CANCELLED_MESSAGE)
        );

        api.push_evaluation(evaluation(false));
        api.push_evaluation(evaluation(true));
        assert!(runner.submit_answer(1, "b").await.unwrap().is_some());
        assert!(runner.submit_answer(0, "a").await.unwrap().is_some());

        assert_eq!(runner.status(0), Some(AnswerStatus::Evaluated));
        assert_eq!(runner.answer_error(0), None);
        assert_eq!(runner.progress(), 1.0);
    }
}
