//! 终端命令解析

use std::path::PathBuf;

/// 用户输入的一条命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 上传文档
    Upload(PathBuf),
    /// 查看文档摘要
    Summary,
    /// 提问
    Ask(String),
    /// 生成一组新的挑战题
    Challenge,
    /// 回答第 `index` 题（从0开始）
    Answer { index: usize, text: String },
    /// 暂存第 `index` 题的答案，不提交评分
    Draft { index: usize, text: String },
    /// 查看挑战进度
    Progress,
    Help,
    Quit,
    /// 空行
    Empty,
}

impl Command {
    /// 解析一行输入
    ///
    /// 题号按用户习惯从1开始输入，内部转换为从0开始
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Empty);
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name.to_lowercase().as_str() {
            "upload" | "u" => {
                if rest.is_empty() {
                    Err("用法: upload <文件路径>".to_string())
                } else {
                    Ok(Command::Upload(PathBuf::from(rest)))
                }
            }
            "summary" | "s" => Ok(Command::Summary),
            // 空问题在问答器里按无操作处理
            "ask" | "a" => Ok(Command::Ask(rest.to_string())),
            "challenge" | "c" => Ok(Command::Challenge),
            "answer" | "ans" => {
                let (index, text) = parse_indexed(rest, "用法: answer <题号> <答案>")?;
                Ok(Command::Answer { index, text })
            }
            "draft" | "d" => {
                let (index, text) = parse_indexed(rest, "用法: draft <题号> <答案>")?;
                Ok(Command::Draft { index, text })
            }
            "progress" | "p" => Ok(Command::Progress),
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("未知命令: {}，输入 help 查看帮助", other)),
        }
    }
}

/// 解析 `<题号> <文本>`，返回从0开始的索引
fn parse_indexed(rest: &str, usage: &str) -> Result<(usize, String), String> {
    let (number, text) = match rest.split_once(char::is_whitespace) {
        Some((number, text)) => (number, text.trim()),
        None => (rest, ""),
    };

    let number: usize = number.parse().map_err(|_| usage.to_string())?;
    if number == 0 {
        return Err("题号从 1 开始".to_string());
    }

    Ok((number - 1, text.to_string()))
}
