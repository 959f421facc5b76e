//! Event-name gates and parameter-level filtering.

use std::collections::HashSet;

use contracts::{FilterConfig, ParamConfig};

/// Why an event name was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Missing, non-string or blank name
    EmptyName,
    /// Name starts with a blocked prefix
    BlockedPrefix(String),
    /// Allowlist enabled and no allowed prefix matched
    NotAllowed,
}

impl Rejection {
    /// Label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::EmptyName => "empty_name",
            Rejection::BlockedPrefix(_) => "blocked_prefix",
            Rejection::NotAllowed => "not_allowed",
        }
    }
}

/// First matching prefix, if any
fn matching_prefix<'a>(name: &str, prefixes: &'a [String]) -> Option<&'a str> {
    prefixes
        .iter()
        .map(String::as_str)
        .find(|prefix| name.starts_with(prefix))
}

/// Event-name filter
///
/// The block gate is unconditional. The allow gate only applies when
/// enabled, and an enabled gate with no prefixes rejects every name.
#[derive(Debug, Clone)]
pub struct EventFilter {
    blocked_prefixes: Vec<String>,
    allowlist_enabled: bool,
    allowed_prefixes: Vec<String>,
}

impl EventFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            blocked_prefixes: config.blocked_event_prefixes.clone(),
            allowlist_enabled: config.allowlist_enabled,
            allowed_prefixes: config.allowed_event_prefixes.clone(),
        }
    }

    /// Block gate on a trimmed name
    pub fn check_blocked(&self, name: &str) -> Result<(), Rejection> {
        if name.is_empty() {
            return Err(Rejection::EmptyName);
        }
        match matching_prefix(name, &self.blocked_prefixes) {
            Some(prefix) => Err(Rejection::BlockedPrefix(prefix.to_string())),
            None => Ok(()),
        }
    }

    /// Allow gate on a trimmed name
    pub fn check_allowed(&self, name: &str) -> Result<(), Rejection> {
        if !self.allowlist_enabled {
            return Ok(());
        }
        match matching_prefix(name, &self.allowed_prefixes) {
            Some(_) => Ok(()),
            None => Err(Rejection::NotAllowed),
        }
    }

    /// Both gates, block first
    pub fn check(&self, name: &str) -> Result<(), Rejection> {
        self.check_blocked(name)?;
        self.check_allowed(name)
    }
}

/// Parameter key filter
#[derive(Debug, Clone)]
pub struct ParamFilter {
    denylist: HashSet<String>,
    deny_prefixes: Vec<String>,
}

impl ParamFilter {
    pub fn new(config: &ParamConfig) -> Self {
        Self {
            denylist: config.denylist.iter().cloned().collect(),
            deny_prefixes: config.deny_prefixes.clone(),
        }
    }

    /// Exact denylist match or deny-prefix match
    pub fn is_denied(&self, key: &str) -> bool {
        self.denylist.contains(key) || matching_prefix(key, &self.deny_prefixes).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(enabled: bool, allowed: &[&str]) -> EventFilter {
        EventFilter::new(&FilterConfig {
            allowlist_enabled: enabled,
            allowed_event_prefixes: allowed.iter().map(|s| s.to_string()).collect(),
            ..FilterConfig::default()
        })
    }

    #[test]
    fn test_block_gate() {
        let f = filter(false, &[]);
        assert_eq!(f.check(""), Err(Rejection::EmptyName));
        assert_eq!(
            f.check("gtm.dom"),
            Err(Rejection::BlockedPrefix("gtm.".into()))
        );
        assert_eq!(f.check("jsError"), Err(Rejection::BlockedPrefix("js".into())));
        assert_eq!(f.check("pageView"), Ok(()));
    }

    #[test]
    fn test_block_gate_wins_over_allowlist() {
        let f = filter(true, &["gtm."]);
        assert!(matches!(f.check("gtm.load"), Err(Rejection::BlockedPrefix(_))));
    }

    #[test]
    fn test_allowlist_disabled_passes_everything() {
        let f = filter(false, &["deposit"]);
        assert_eq!(f.check("withdraw"), Ok(()));
    }

    #[test]
    fn test_allowlist_enabled() {
        let f = filter(true, &["pageView", "deposit"]);
        assert_eq!(f.check("pageView"), Ok(()));
        assert_eq!(f.check("depositConfirmed"), Ok(()));
        assert_eq!(f.check("withdraw"), Err(Rejection::NotAllowed));
    }

    #[test]
    fn test_allowlist_enabled_empty_fails_closed() {
        let f = filter(true, &[]);
        assert_eq!(f.check("pageView"), Err(Rejection::NotAllowed));
        assert_eq!(f.check("deposit"), Err(Rejection::NotAllowed));
    }

    #[test]
    fn test_param_filter_defaults() {
        let f = ParamFilter::new(&ParamConfig::default());
        assert!(f.is_denied("send_to"));
        assert!(f.is_denied("eventCallback"));
        assert!(f.is_denied("gtm.uniqueEventId"));
        assert!(f.is_denied("gtmCustom"));
        assert!(!f.is_denied("value"));
        assert!(!f.is_denied("page.title"));
    }

    #[test]
    fn test_rejection_reason_labels() {
        assert_eq!(Rejection::EmptyName.reason(), "empty_name");
        assert_eq!(Rejection::BlockedPrefix("js".into()).reason(), "blocked_prefix");
        assert_eq!(Rejection::NotAllowed.reason(), "not_allowed");
    }
}
