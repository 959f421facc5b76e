//! Payload shaping: recognized params at top level, everything else bundled.

use std::collections::HashSet;

use contracts::{ObjectMap, Param, ParamConfig, ShapedPayload, Shared, Value};
use tracing::{debug, warn};

use crate::filter::ParamFilter;
use crate::serialize::{safe_stringify, safe_stringify_map};

/// Normalize a recognized parameter value
///
/// Primitives pass through, containers are serialized. A container that
/// cannot be serialized falls back to string coercion.
pub fn normalize(value: &Value) -> Param {
    match value {
        Value::Undefined | Value::Null => Param::Null,
        Value::Bool(b) => Param::Bool(*b),
        Value::Number(n) => Param::Number(*n),
        Value::String(s) => Param::Text(s.clone()),
        container => match safe_stringify(container) {
            Ok(text) => Param::Text(text),
            Err(e) => {
                debug!(error = %e, "Serialization failed, using string coercion");
                Param::Text(container.to_string())
            }
        },
    }
}

/// Builds transport payloads from merged event objects
#[derive(Debug, Clone)]
pub struct PayloadShaper {
    discriminator: String,
    bundle_field: String,
    recognized: HashSet<String>,
    params: ParamFilter,
}

impl PayloadShaper {
    pub fn new(config: &ParamConfig) -> Self {
        Self {
            discriminator: config.discriminator.clone(),
            bundle_field: config.bundle_field.clone(),
            recognized: config.recognized.iter().cloned().collect(),
            params: ParamFilter::new(config),
        }
    }

    pub fn bundle_field(&self) -> &str {
        &self.bundle_field
    }

    /// Shape one merged event
    pub fn shape(&self, merged: &ObjectMap) -> ShapedPayload {
        let mut payload = ShapedPayload::new();
        let mut bundle = ObjectMap::new();

        for (key, value) in merged {
            if *key == self.discriminator || self.params.is_denied(key) {
                continue;
            }
            if self.recognized.contains(key) {
                payload.insert(key.clone(), normalize(value));
            } else {
                bundle.insert(key.clone(), value.clone());
            }
        }

        if !bundle.is_empty() {
            let text = match safe_stringify_map(&bundle) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, fields = bundle.len(), "Bundle serialization failed");
                    Value::Object(Shared::new(bundle)).to_string()
                }
            };
            payload.insert(self.bundle_field.clone(), Param::Text(text));
        }

        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shaper() -> PayloadShaper {
        PayloadShaper::new(&ParamConfig::default())
    }

    fn object(entries: &[(&str, Value)]) -> ObjectMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_normalize_primitives_pass_through() {
        assert_eq!(normalize(&Value::from(50)), Param::Number(50.0));
        assert_eq!(normalize(&Value::from("EUR")), Param::Text("EUR".into()));
        assert_eq!(normalize(&Value::from(true)), Param::Bool(true));
        assert_eq!(normalize(&Value::Undefined), Param::Null);
    }

    #[test]
    fn test_normalize_container_serialized() {
        let items = Value::array([Value::object([("item_id", Value::from("sku-1"))])]);
        assert_eq!(
            normalize(&items),
            Param::Text(r#"[{"item_id":"sku-1"}]"#.into())
        );
    }

    #[test]
    fn test_shape_splits_recognized_and_bundle() {
        let payload = shaper().shape(&object(&[
            ("event", "deposit".into()),
            ("value", 50.into()),
            ("currency", "EUR".into()),
            ("page.title", "Home".into()),
            ("send_to", "G-OTHER".into()),
            ("gtm.uniqueEventId", 7.into()),
        ]));

        assert_eq!(payload.get("value"), Some(&Param::Number(50.0)));
        assert_eq!(payload.get("currency"), Some(&Param::Text("EUR".into())));
        assert!(!payload.contains_key("event"));
        assert!(!payload.contains_key("send_to"));
        assert_eq!(
            payload.get("datalayer"),
            Some(&Param::Text(r#"{"page.title":"Home"}"#.into()))
        );
    }

    #[test]
    fn test_no_bundle_when_nothing_left() {
        let payload = shaper().shape(&object(&[
            ("event", "purchase".into()),
            ("value", 10.into()),
            ("gtmExtra", "x".into()),
        ]));
        assert_eq!(payload.len(), 1);
        assert!(!payload.contains_key("datalayer"));
    }

    #[test]
    fn test_denied_keys_never_shipped() {
        let payload = shaper().shape(&object(&[
            ("eventCallback", "fn".into()),
            ("eventTimeout", 2000.into()),
            ("gtm.start", 1.into()),
            ("custom", "kept".into()),
        ]));
        let bundle = payload.get("datalayer").and_then(Param::as_text).unwrap();
        assert!(!bundle.contains("eventCallback"));
        assert!(!bundle.contains("gtm"));
        assert!(bundle.contains("custom"));
    }

    #[test]
    fn test_self_reference_in_bundle() {
        let obj = Shared::new(ObjectMap::new());
        obj.write()
            .unwrap()
            .insert("self".into(), Value::Object(obj.clone()));

        let payload = shaper().shape(&object(&[("loop", Value::Object(obj))]));
        let bundle = payload.get("datalayer").and_then(Param::as_text).unwrap();
        assert_eq!(bundle, r#"{"loop":{"self":"[Circular]"}}"#);
    }

    #[test]
    fn test_custom_bundle_field() {
        let shaper = PayloadShaper::new(&ParamConfig {
            bundle_field: "extra".into(),
            ..ParamConfig::default()
        });
        let payload = shaper.shape(&object(&[("custom", 1.into())]));
        assert_eq!(shaper.bundle_field(), "extra");
        assert!(payload.contains_key("extra"));
    }
}
