//! Topic patterns.

/// Subscription pattern over the dotted topic namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopicPattern {
    /// Matches one topic exactly.
    Exact(String),
    /// `threshold.*` matches any topic under the prefix.
    Prefix(String),
    /// `*` matches everything.
    All,
}

impl TopicPattern {
    /// Parse a pattern string. A `*` is only valid alone or as the final
    /// segment of a dotted prefix.
    pub fn parse(pattern: &str) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }
        if pattern == "*" {
            return Some(Self::All);
        }
        if let Some(prefix) = pattern.strip_suffix(".*") {
            if prefix.is_empty() || prefix.contains('*') {
                return None;
            }
            return Some(Self::Prefix(prefix.to_string()));
        }
        if pattern.contains('*') {
            return None;
        }
        Some(Self::Exact(pattern.to_string()))
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Self::Exact(t) => t == topic,
            Self::Prefix(p) => topic
                .strip_prefix(p.as_str())
                .map(|rest| rest.starts_with('.'))
                .unwrap_or(false),
            Self::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_forms() {
        assert_eq!(
            TopicPattern::parse("threshold.detected"),
            Some(TopicPattern::Exact("threshold.detected".into()))
        );
        assert_eq!(
            TopicPattern::parse("threshold.*"),
            Some(TopicPattern::Prefix("threshold".into()))
        );
        assert_eq!(TopicPattern::parse("*"), Some(TopicPattern::All));
        assert_eq!(TopicPattern::parse(""), None);
        assert_eq!(TopicPattern::parse("a.*.b"), None);
        assert_eq!(TopicPattern::parse(".*"), None);
    }

    #[test]
    fn prefix_requires_segment_boundary() {
        let pattern = TopicPattern::parse("threshold.*").unwrap();
        assert!(pattern.matches("threshold.detected"));
        assert!(pattern.matches("threshold.detected.extra"));
        assert!(!pattern.matches("threshold"));
        assert!(!pattern.matches("thresholds.detected"));
    }

    #[test]
    fn exact_matches_only_itself() {
        let pattern = TopicPattern::parse("circuit.complete").unwrap();
        assert!(pattern.matches("circuit.complete"));
        assert!(!pattern.matches("circuit.cancelled"));
    }
}
