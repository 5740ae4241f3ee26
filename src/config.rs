//! 程序配置
//!
//! 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "doc_assistant.toml";

/// 页面上提示的文件大小上限，客户端不做强制校验
pub const ADVERTISED_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// 程序配置
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 文档问答服务地址
    pub api_base_url: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 日志过滤规则（`RUST_LOG` 优先）
    pub log_filter: String,
    /// 请求超时（秒），不设置则不超时
    pub request_timeout_secs: Option<u64>,
    /// 提示给用户的文件大小上限
    pub max_upload_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            verbose_logging: false,
            log_filter: "info".to_string(),
            request_timeout_secs: None,
            max_upload_bytes: ADVERTISED_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// 只从环境变量加载
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 解析 TOML 文本，缺失的字段使用默认值
    pub fn from_toml_str(content: &str, path: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })?;
        Ok(config.normalized())
    }

    /// 从 TOML 文件加载，文件不存在时使用默认值
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// 从 TOML 文件加载，再用环境变量覆盖
    pub fn load_with_env(path: impl AsRef<Path>) -> AppResult<Self> {
        Ok(Self::load(path)?.with_env_overrides())
    }

    /// 用环境变量覆盖当前配置，无法解析的值保持原样
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_base_url: lookup("DOC_ASSISTANT_API_BASE_URL").unwrap_or(self.api_base_url),
            verbose_logging: parse_var(&lookup, "DOC_ASSISTANT_VERBOSE")
                .unwrap_or(self.verbose_logging),
            log_filter: lookup("DOC_ASSISTANT_LOG").unwrap_or(self.log_filter),
            request_timeout_secs: parse_var(&lookup, "DOC_ASSISTANT_TIMEOUT_SECS")
                .or(self.request_timeout_secs),
            max_upload_bytes: parse_var(&lookup, "DOC_ASSISTANT_MAX_UPLOAD_BYTES")
                .unwrap_or(self.max_upload_bytes),
        }
        .normalized()
    }

    fn normalized(mut self) -> Self {
        let trimmed = self.api_base_url.trim().trim_end_matches('/');
        self.api_base_url = trimmed.to_string();
        self
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
