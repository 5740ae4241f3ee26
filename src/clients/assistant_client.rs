/// 文档问答服务客户端
///
/// 封装上传、问答、生成挑战题、评分四个远程调用
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppResult};
use crate::models::{
    AskResponse, ChallengeQuestion, EvaluationResponse, UploadFile, UploadResponse,
};

/// 远程服务能力
///
/// 状态容器只依赖这个 trait，测试时可以替换成脚本化的实现
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// 上传文档并生成摘要
    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ApiError>;

    /// 针对已上传文档提问
    async fn ask(&self, question: &str) -> Result<AskResponse, ApiError>;

    /// 生成挑战题目
    async fn generate_challenge(&self) -> Result<Vec<ChallengeQuestion>, ApiError>;

    /// 对用户答案评分
    async fn evaluate(
        &self,
        question: &str,
        user_answer: &str,
    ) -> Result<EvaluationResponse, ApiError>;
}

/// 基于 reqwest 的服务客户端
pub struct AssistantClient {
    http: reqwest::Client,
    base_url: String,
}

impl AssistantClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http = builder
            .build()
            .map_err(|e| transport_error(&config.api_base_url, e))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// 发送请求并解析 JSON
    ///
    /// 非 2xx 响应会保留服务端的 `detail` 字段，供上层提取错误信息
    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.send(endpoint, request).await?;
        serde_json::from_value(body).map_err(|e| ApiError::InvalidPayload {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        debug!("{} 返回状态 {}", endpoint, status);

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body.get("detail").cloned());
            return Err(ApiError::Rejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::InvalidPayload {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl AssistantApi for AssistantClient {
    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ApiError> {
        let endpoint = self.endpoint("upload");
        debug!("上传文件 {} ({} 字节)", file.name, file.len());

        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(file.mime_type())
            .map_err(|e| transport_error(&endpoint, e))?;
        let form = multipart::Form::new().part("file", part);

        self.send_json(&endpoint, self.http.post(&endpoint).multipart(form))
            .await
    }

    async fn ask(&self, question: &str) -> Result<AskResponse, ApiError> {
        let endpoint = self.endpoint("ask");
        let payload = json!({ "question": question });

        self.send_json(&endpoint, self.http.post(&endpoint).json(&payload))
            .await
    }

    async fn generate_challenge(&self) -> Result<Vec<ChallengeQuestion>, ApiError> {
        let endpoint = self.endpoint("challenge");
        let body = self.send(&endpoint, self.http.post(&endpoint)).await?;

        if !body.is_array() {
            return Err(ApiError::InvalidPayload {
                endpoint,
                message: "题目列表不是数组".to_string(),
            });
        }

        serde_json::from_value(body).map_err(|e| ApiError::InvalidPayload {
            endpoint,
            message: e.to_string(),
        })
    }

    async fn evaluate(
        &self,
        question: &str,
        user_answer: &str,
    ) -> Result<EvaluationResponse, ApiError> {
        let endpoint = self.endpoint("evaluate");
        let request = self
            .http
            .post(&endpoint)
            .query(&[("question", question), ("user_answer", user_answer)]);

        self.send_json(&endpoint, request).await
    }
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> ApiError {
    ApiError::Transport {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}
