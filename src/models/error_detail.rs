//! 服务端错误详情的解析
//!
//! 服务端的 `detail` 字段可能是字符串、`{msg}` 数组或单个 `{msg}` 对象

use serde_json::Value;

/// 所有解析都失败时使用的兜底文本
pub const GENERIC_ERROR_MESSAGE: &str = "发生了意外错误";

/// 提取可展示的错误信息
///
/// # 参数
/// - `detail`: 服务端返回的 `detail` 字段
/// - `transport_text`: 网络层的错误文本
/// - `fallback`: 兜底文本
///
/// # 返回
/// 依次尝试 `detail`、`transport_text`、`fallback`，返回第一个非空结果
pub fn extract_error_message(
    detail: Option<&Value>,
    transport_text: Option<&str>,
    fallback: &str,
) -> String {
    if let Some(message) = detail.and_then(detail_message) {
        return message;
    }

    match transport_text.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => fallback.to_string(),
    }
}

fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join(", "))
            }
        }
        Value::Object(map) => map
            .get("msg")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string),
        _ => None,
    }
}
