//! 终端渲染
//!
//! 只把状态快照转换成文本，不修改任何状态

use crate::config::Config;
use crate::models::{AnswerStatus, DocumentInfo, SUPPORTED_EXTENSIONS};
use crate::services::{AskState, ChallengeSnapshot, GenerationPhase, UploadState};

const RULE: &str = "────────────────────────────────────────";

pub fn render_help(config: &Config) -> String {
    format!(
        "可用命令:\n\
         \x20 upload <路径>        上传文档（支持 {}，建议不超过 {} MB）\n\
         \x20 summary              查看文档摘要\n\
         \x20 ask <问题>           针对文档提问\n\
         \x20 challenge            生成一组新的挑战题\n\
         \x20 answer <题号> <答案> 回答挑战题\n\
         \x20 draft <题号> <答案>  暂存答案，稍后再提交\n\
         \x20 progress             查看挑战进度\n\
         \x20 help                 显示帮助\n\
         \x20 quit                 退出",
        SUPPORTED_EXTENSIONS.join(" / "),
        config.max_upload_bytes / (1024 * 1024)
    )
}

pub fn render_upload(state: &UploadState) -> String {
    if let Some(file) = &state.current_file {
        return format!("⏳ 正在处理文档 {}，请稍候...", file);
    }
    match &state.error {
        Some(error) => format!("❌ {}", error),
        None => String::new(),
    }
}

pub fn render_summary(document: &DocumentInfo) -> String {
    format!(
        "{RULE}\n📄 文档摘要 - {}\n{RULE}\n{}",
        document.filename, document.summary
    )
}

pub fn render_answer(state: &AskState) -> String {
    if state.loading {
        return "⏳ 正在分析文档...".to_string();
    }
    if let Some(error) = &state.error {
        return format!("❌ {}", error);
    }

    let Some(answer) = &state.answer else {
        return String::new();
    };

    let mut out = format!("💡 回答\n{}", answer);
    if let Some(context) = &state.context {
        out.push_str(&format!("\n\n📎 原文依据\n{}", context));
    }
    out
}

pub fn render_challenge(snapshot: &ChallengeSnapshot) -> String {
    match snapshot.phase {
        GenerationPhase::Idle => return "还没有题目，输入 challenge 生成".to_string(),
        GenerationPhase::Generating => return "⏳ 正在根据文档生成题目...".to_string(),
        GenerationPhase::Failed => {
            return format!(
                "❌ {}",
                snapshot.generation_error.as_deref().unwrap_or_default()
            )
        }
        GenerationPhase::Ready => {}
    }

    let mut lines = vec![render_progress(snapshot)];
    for (i, item) in snapshot.items.iter().enumerate() {
        lines.push(RULE.to_string());
        lines.push(format!("第 {} 题 [{}]", i + 1, status_label(item.status)));
        lines.push(item.question.clone());

        if let Some(answer) = &item.user_answer {
            lines.push(format!("你的答案: {}", answer));
        }
        if let Some(feedback) = &item.feedback {
            let mark = if feedback.is_correct { "🏆" } else { "⚠️" };
            lines.push(format!("{} {}", mark, feedback.message));
            if !feedback.reference.trim().is_empty() {
                lines.push(format!("📎 参考原文: {}", feedback.reference));
            }
        }
        if let Some(error) = &item.error {
            lines.push(format!("❌ {}", error));
        }
    }
    lines.join("\n")
}

pub fn render_progress(snapshot: &ChallengeSnapshot) -> String {
    let answered = snapshot
        .items
        .iter()
        .filter(|item| item.feedback.is_some())
        .count();
    format!(
        "📊 进度: {}/{} ({:.0}%)，答对 {} 题",
        answered,
        snapshot.items.len(),
        snapshot.progress * 100.0,
        snapshot.correct
    )
}

fn status_label(status: AnswerStatus) -> &'static str {
    match status {
        AnswerStatus::Unanswered => "未作答",
        AnswerStatus::Submitting => "评分中",
        AnswerStatus::Evaluated => "已评分",
        AnswerStatus::SubmitError => "评分失败",
    }
}
