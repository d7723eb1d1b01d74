//! Value Objects - Immutable domain primitives

use serde::{Deserialize, Serialize};

/// Loopback address used when a request does not name an instance.
pub const DEFAULT_INSTANCE_ADDRESS: &str = "127.0.0.1";

/// Category of monitored resource.
///
/// The backend kind selects which provisioner builds the collector set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// PostgreSQL database
    Postgres,
    /// Elasticsearch cluster
    Elasticsearch,
}

impl BackendKind {
    /// Parse a backend kind from the `type` path segment.
    ///
    /// Both the singular kind and the API resource plural are accepted.
    /// Returns `None` for anything unrecognized.
    ///
    /// # Examples
    /// ```
    /// use metrics_gateway::BackendKind;
    ///
    /// assert_eq!(BackendKind::parse("postgreses"), Some(BackendKind::Postgres));
    /// assert_eq!(BackendKind::parse("mysql"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgreses" => Some(Self::Postgres),
            "elasticsearch" | "elastic" | "elastics" => Some(Self::Elasticsearch),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Elasticsearch => "elasticsearch",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        let tests = vec![
            ("postgres", Some(BackendKind::Postgres)),
            ("postgreses", Some(BackendKind::Postgres)),
            ("Postgres", Some(BackendKind::Postgres)),
            ("elasticsearch", Some(BackendKind::Elasticsearch)),
            ("elastics", Some(BackendKind::Elasticsearch)),
            ("ELASTIC", Some(BackendKind::Elasticsearch)),
        ];

        for (input, expected) in tests {
            assert_eq!(BackendKind::parse(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_parse_unknown_kind() {
        assert_eq!(BackendKind::parse("mysql"), None);
        assert_eq!(BackendKind::parse(""), None);
    }

    #[test]
    fn test_display_roundtrip() {
        for kind in [BackendKind::Postgres, BackendKind::Elasticsearch] {
            assert_eq!(BackendKind::parse(&kind.to_string()), Some(kind));
        }
    }
}
