//! RelayConfig - Config Loader 输出
//!
//! 描述完整的 relay 配置：属性 ID、传输端点、事件过滤、参数整形、上下文持久化、分发策略。

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// 默认屏蔽的事件名前缀（框架生命周期事件）
pub const DEFAULT_BLOCKED_EVENT_PREFIXES: &[&str] = &["gtm.", "js"];

/// 默认参数黑名单
pub const DEFAULT_PARAM_DENYLIST: &[&str] = &[
    "send_to",
    "eventCallback",
    "eventTimeout",
    "gtm.uniqueEventId",
    "gtm.start",
    "gtm.element",
    "gtm.elementText",
    "gtm.elementId",
];

/// 默认参数黑名单前缀
pub const DEFAULT_PARAM_DENY_PREFIXES: &[&str] = &["gtm"];

/// 默认持久化前缀
pub const DEFAULT_STICKY_PREFIXES: &[&str] = &["browser.", "page.", "user.", "device.", "native."];

/// 传输层原生识别的参数名
pub const DEFAULT_RECOGNIZED_PARAMS: &[&str] = &[
    "page_location",
    "page_referrer",
    "page_title",
    "link_url",
    "link_domain",
    "engagement_time_msec",
    "debug_mode",
    "non_interaction",
    "user_id",
    "session_id",
    "campaign",
    "source",
    "medium",
    "term",
    "content",
    "gclid",
    "dclid",
    "transaction_id",
    "value",
    "currency",
    "tax",
    "shipping",
    "affiliation",
    "coupon",
    "payment_type",
    "shipping_tier",
    "method",
    "items",
    "item_list_name",
    "item_list_id",
    "creative_name",
    "creative_slot",
    "location_id",
    "item_category",
    "item_category2",
    "item_category3",
    "item_category4",
    "item_category5",
    "item_id",
    "item_name",
    "search_term",
    "content_type",
    "content_id",
    "video_title",
    "video_url",
    "video_provider",
];

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 完整的 relay 配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RelayConfig {
    /// 属性 ID (e.g., "G-XXXXXXX")
    #[validate(length(min = 1))]
    pub measurement_id: String,

    /// 服务端容器地址 (可选)
    #[serde(default)]
    pub transport_url: Option<String>,

    /// 是否优先从服务端容器加载传输库
    #[serde(default = "default_true")]
    pub load_from_server: bool,

    /// 传输库命令队列名称
    #[serde(default = "default_relay_queue_name")]
    #[validate(length(min = 1))]
    pub relay_queue_name: String,

    /// 调试日志开关
    #[serde(default)]
    pub debug: bool,

    /// 事件名过滤
    #[serde(default)]
    #[validate(nested)]
    pub filters: FilterConfig,

    /// 参数整形
    #[serde(default)]
    #[validate(nested)]
    pub params: ParamConfig,

    /// 上下文持久化
    #[serde(default)]
    #[validate(nested)]
    pub context: ContextConfig,

    /// 分发策略
    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchConfig,
}

impl RelayConfig {
    /// 以默认值创建配置
    pub fn new(measurement_id: impl Into<String>) -> Self {
        Self {
            measurement_id: measurement_id.into(),
            transport_url: None,
            load_from_server: true,
            relay_queue_name: default_relay_queue_name(),
            debug: false,
            filters: FilterConfig::default(),
            params: ParamConfig::default(),
            context: ContextConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }

    /// 去除末尾斜杠后的传输端点
    pub fn normalized_transport_url(&self) -> Option<String> {
        self.transport_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
    }
}

fn default_true() -> bool {
    true
}

fn default_relay_queue_name() -> String {
    "relayDL".to_string()
}

/// 事件名过滤配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FilterConfig {
    /// 屏蔽前缀（无条件生效）
    #[serde(default = "default_blocked_event_prefixes")]
    pub blocked_event_prefixes: Vec<String>,

    /// 白名单开关
    #[serde(default)]
    pub allowlist_enabled: bool,

    /// 白名单前缀（开启且为空时全部拒绝）
    #[serde(default)]
    pub allowed_event_prefixes: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blocked_event_prefixes: default_blocked_event_prefixes(),
            allowlist_enabled: false,
            allowed_event_prefixes: Vec::new(),
        }
    }
}

fn default_blocked_event_prefixes() -> Vec<String> {
    to_strings(DEFAULT_BLOCKED_EVENT_PREFIXES)
}

/// 参数整形配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ParamConfig {
    /// 事件名字段
    #[serde(default = "default_discriminator")]
    #[validate(length(min = 1))]
    pub discriminator: String,

    /// 打包字段名
    #[serde(default = "default_bundle_field")]
    #[validate(length(min = 1))]
    pub bundle_field: String,

    /// 精确匹配的参数黑名单
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,

    /// 参数黑名单前缀
    #[serde(default = "default_deny_prefixes")]
    pub deny_prefixes: Vec<String>,

    /// 顶层识别参数
    #[serde(default = "default_recognized")]
    pub recognized: Vec<String>,
}

impl Default for ParamConfig {
    fn default() -> Self {
        Self {
            discriminator: default_discriminator(),
            bundle_field: default_bundle_field(),
            denylist: default_denylist(),
            deny_prefixes: default_deny_prefixes(),
            recognized: default_recognized(),
        }
    }
}

fn default_discriminator() -> String {
    "event".to_string()
}

fn default_bundle_field() -> String {
    "datalayer".to_string()
}

fn default_denylist() -> Vec<String> {
    to_strings(DEFAULT_PARAM_DENYLIST)
}

fn default_deny_prefixes() -> Vec<String> {
    to_strings(DEFAULT_PARAM_DENY_PREFIXES)
}

fn default_recognized() -> Vec<String> {
    to_strings(DEFAULT_RECOGNIZED_PARAMS)
}

/// 上下文持久化配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContextConfig {
    /// 按前缀持久化的字段
    #[serde(default = "default_sticky_prefixes")]
    pub sticky_prefixes: Vec<String>,

    /// 按名称持久化的字段
    #[serde(default)]
    pub sticky_fields: Vec<String>,

    /// 最大条目数
    #[serde(default = "default_max_entries")]
    #[validate(range(min = 1))]
    pub max_entries: usize,

    /// 条目过期时间（秒）
    #[serde(default = "default_ttl_secs")]
    #[validate(range(min = 1))]
    pub ttl_secs: u64,
}

impl ContextConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            sticky_prefixes: default_sticky_prefixes(),
            sticky_fields: Vec::new(),
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_sticky_prefixes() -> Vec<String> {
    to_strings(DEFAULT_STICKY_PREFIXES)
}

fn default_max_entries() -> usize {
    200
}

fn default_ttl_secs() -> u64 {
    30 * 60
}

/// 分发策略配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// 单次 flush 的重试集合上限
    #[serde(default = "default_retry_capacity")]
    #[validate(range(min = 1))]
    pub retry_capacity: usize,

    /// 传输库加载前可缓存的命令数
    #[serde(default = "default_buffered_commands")]
    #[validate(range(min = 1))]
    pub buffered_commands: usize,

    /// 合并窗口（毫秒），窗口内无新入队时才执行 flush，0 表示立即执行
    #[serde(default = "default_coalesce_window_ms")]
    #[validate(range(max = 1000))]
    pub coalesce_window_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            retry_capacity: default_retry_capacity(),
            buffered_commands: default_buffered_commands(),
            coalesce_window_ms: default_coalesce_window_ms(),
        }
    }
}

fn default_retry_capacity() -> usize {
    500
}

fn default_buffered_commands() -> usize {
    1000
}

fn default_coalesce_window_ms() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::new("G-TEST");
        assert_eq!(config.relay_queue_name, "relayDL");
        assert_eq!(config.params.discriminator, "event");
        assert_eq!(config.params.bundle_field, "datalayer");
        assert_eq!(config.context.max_entries, 200);
        assert_eq!(config.context.ttl(), Duration::from_secs(1800));
        assert!(!config.filters.allowlist_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalized_transport_url() {
        let mut config = RelayConfig::new("G-TEST");
        assert_eq!(config.normalized_transport_url(), None);

        config.transport_url = Some("https://sst.example.com///".into());
        assert_eq!(
            config.normalized_transport_url().as_deref(),
            Some("https://sst.example.com")
        );

        config.transport_url = Some("/".into());
        assert_eq!(config.normalized_transport_url(), None);
    }

    #[test]
    fn test_validation_rejects_zero_bound() {
        let mut config = RelayConfig::new("G-TEST");
        config.context.max_entries = 0;
        assert!(config.validate().is_err());
    }
}
