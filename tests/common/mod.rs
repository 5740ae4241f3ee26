//! 集成测试用的假文档问答服务

use std::collections::HashMap;

use axum::extract::{Multipart, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use doc_assistant::Config;

/// 默认的三道挑战题
pub fn default_questions() -> Value {
    json!([
        {"question": "文档的主题是什么？", "answer": "所有权", "context": "Rust 的核心是所有权。"},
        {"question": "借用检查器负责什么？", "answer": "引用的有效性", "context": "借用检查器保证引用始终有效。"},
        {"question": "生命周期标注的作用？", "answer": "描述引用之间的关系", "context": null}
    ])
}

/// 启动假服务，返回服务地址
///
/// `challenge_body` 是 `/challenge` 的返回内容
pub async fn spawn_fake_service(challenge_body: Value) -> String {
    let challenge = move || {
        let body = challenge_body.clone();
        async move { Json(body) }
    };

    let app = Router::new()
        .route("/upload", post(upload))
        .route("/ask", post(ask))
        .route("/challenge", post(challenge))
        .route("/evaluate", post(evaluate));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://127.0.0.1:{}", port)
}

pub fn config_for(base_url: &str) -> Config {
    Config {
        api_base_url: base_url.to_string(),
        ..Config::default()
    }
}

async fn upload(mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap_or_default();
        let lower = filename.to_lowercase();

        if !(lower.ends_with(".pdf") || lower.ends_with(".txt")) {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "400: Only PDF and TXT files are supported"})),
            )
                .into_response();
        }

        if bytes.is_empty() {
            return Json(json!({"filename": filename, "summary": "", "success": false, "detail": "文档内容为空"}))
                .into_response();
        }

        return Json(json!({
            "filename": filename,
            "summary": format!("{} 共 {} 字节", filename, bytes.len()),
            "success": true
        }))
        .into_response();
    }

    (
        StatusCode::BAD_REQUEST,
        Json(json!({"detail": "No file provided"})),
    )
        .into_response()
}

async fn ask(Json(body): Json<Value>) -> Response {
    let question = body
        .get("question")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match question.as_str() {
        "boom" => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"msg": "Field required"}, {"msg": "Input should be a valid string"}]})),
        )
            .into_response(),
        "plain" => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
        _ => Json(json!({
            "question": question,
            "answer": format!("关于「{}」的回答", question),
            "context": "相关原文"
        }))
        .into_response(),
    }
}

async fn evaluate(Query(params): Query<HashMap<String, String>>) -> Response {
    let (Some(question), Some(user_answer)) = (params.get("question"), params.get("user_answer"))
    else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"msg": "Field required"}]})),
        )
            .into_response();
    };

    Json(json!({
        "is_correct": user_answer.contains("正确"),
        "feedback": format!("{}|{}", question, user_answer),
        "reference": "参考原文"
    }))
    .into_response()
}
