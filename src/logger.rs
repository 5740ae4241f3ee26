//! tracing 日志初始化

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化全局日志
///
/// `RUST_LOG` 优先；否则使用配置中的过滤规则，开启详细日志时为 `debug`。
/// 重复调用不会报错
pub fn init(config: &Config) {
    let default_directive = if config.verbose_logging {
        "debug"
    } else {
        config.log_filter.as_str()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
