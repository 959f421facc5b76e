//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围与长度 (derive)
//! - 前缀列表不含空串（空前缀会匹配所有名称）
//! - 打包字段不与识别参数、黑名单参数或事件名字段冲突
//! - transport_url 使用 http/https

use contracts::{ContractError, RelayConfig};
use ::validator::Validate;

/// 校验 RelayConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_prefixes(config)?;
    validate_bundle_field(config)?;
    validate_transport_url(config)?;
    Ok(())
}

/// 校验字段范围
fn validate_fields(config: &RelayConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let fields = errors
            .errors()
            .keys()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        ContractError::config_validation(fields, errors.to_string())
    })
}

/// 校验前缀列表
fn validate_prefixes(config: &RelayConfig) -> Result<(), ContractError> {
    let lists: [(&str, &[String]); 4] = [
        (
            "filters.blocked_event_prefixes",
            &config.filters.blocked_event_prefixes,
        ),
        (
            "filters.allowed_event_prefixes",
            &config.filters.allowed_event_prefixes,
        ),
        ("params.deny_prefixes", &config.params.deny_prefixes),
        ("context.sticky_prefixes", &config.context.sticky_prefixes),
    ];

    for (field, prefixes) in lists {
        if let Some(idx) = prefixes.iter().position(|p| p.is_empty()) {
            return Err(ContractError::config_validation(
                format!("{field}[{idx}]"),
                "prefix cannot be empty",
            ));
        }
    }
    Ok(())
}

/// 校验打包字段
fn validate_bundle_field(config: &RelayConfig) -> Result<(), ContractError> {
    let params = &config.params;

    if params.bundle_field == params.discriminator {
        return Err(ContractError::config_validation(
            "params.bundle_field",
            "bundle_field must differ from discriminator",
        ));
    }
    if params.recognized.contains(&params.bundle_field) {
        return Err(ContractError::config_validation(
            "params.bundle_field",
            format!("'{}' is also a recognized param", params.bundle_field),
        ));
    }
    let denied = params.denylist.contains(&params.bundle_field)
        || params
            .deny_prefixes
            .iter()
            .any(|prefix| params.bundle_field.starts_with(prefix.as_str()));
    if denied {
        return Err(ContractError::config_validation(
            "params.bundle_field",
            format!("'{}' is a denied param", params.bundle_field),
        ));
    }
    Ok(())
}

/// 校验传输端点
fn validate_transport_url(config: &RelayConfig) -> Result<(), ContractError> {
    if let Some(url) = &config.transport_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ContractError::config_validation(
                "transport_url",
                format!("expected an http(s) url, got '{url}'"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> RelayConfig {
        RelayConfig::new("G-TEST")
    }

    #[test]
    fn test_valid_config() {
        let config = minimal_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_measurement_id() {
        let mut config = minimal_config();
        config.measurement_id = String::new();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("measurement_id"), "got: {err}");
    }

    #[test]
    fn test_zero_ttl() {
        let mut config = minimal_config();
        config.context.ttl_secs = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("context"), "got: {err}");
    }

    #[test]
    fn test_empty_prefix() {
        let mut config = minimal_config();
        config.filters.allowed_event_prefixes = vec!["deposit".into(), String::new()];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("filters.allowed_event_prefixes[1]"), "got: {err}");
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_bundle_field_conflicts() {
        let mut config = minimal_config();
        config.params.bundle_field = "value".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("recognized"), "got: {err}");

        let mut config = minimal_config();
        config.params.bundle_field = "event".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("discriminator"), "got: {err}");
    }

    #[test]
    fn test_bundle_field_must_not_be_denied() {
        let mut config = minimal_config();
        config.params.bundle_field = "gtm_bundle".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("denied"), "got: {err}");

        let mut config = minimal_config();
        config.params.bundle_field = "eventCallback".into();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("denied"), "got: {err}");
    }

    #[test]
    fn test_transport_url_scheme() {
        let mut config = minimal_config();
        config.transport_url = Some("ftp://sst.example.com".into());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("http(s)"), "got: {err}");

        config.transport_url = Some("https://sst.example.com/".into());
        assert!(validate(&config).is_ok());
    }
}
