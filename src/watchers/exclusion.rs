use crate::error::ConfigError;
use regex::Regex;

/// Set of full-match name patterns whose objects must never produce alerts
///
/// A name is excluded when at least one pattern matches the *whole* name;
/// `web` excludes `web` but not `web-0`.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    patterns: Vec<Regex>,
}

impl ExclusionFilter {
    /// Compile the given pattern sources
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` for the first pattern that is not a
    /// valid regular expression.
    pub fn new<S: AsRef<str>>(sources: &[S]) -> Result<Self, ConfigError> {
        let patterns = sources
            .iter()
            .map(|source| {
                let source = source.as_ref();
                Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
                    ConfigError::InvalidPattern {
                        pattern: source.to_string(),
                        source: e,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Filter that excludes nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn should_exclude(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(name))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_full_match_only() {
        let filter = ExclusionFilter::new(&["web"]).unwrap();

        assert!(filter.should_exclude("web"));
        assert!(!filter.should_exclude("web-0"));
        assert!(!filter.should_exclude("my-web"));
    }

    #[test]
    fn test_any_pattern_excludes() {
        let filter = ExclusionFilter::new(&["backup-.*", "debug"]).unwrap();

        assert!(filter.should_exclude("backup-28391"));
        assert!(filter.should_exclude("debug"));
        assert!(!filter.should_exclude("vault-0"));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        // Without grouping, `^a|b$` would match any name starting with "a"
        let filter = ExclusionFilter::new(&["a|b"]).unwrap();

        assert!(filter.should_exclude("a"));
        assert!(filter.should_exclude("b"));
        assert!(!filter.should_exclude("abc"));
    }

    #[test]
    fn test_empty_filter_excludes_nothing() {
        let filter = ExclusionFilter::empty();
        assert!(filter.is_empty());
        assert!(!filter.should_exclude(""));
        assert!(!filter.should_exclude("anything"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = ExclusionFilter::new(&["ok", "broken("]).unwrap_err();
        match err {
            ConfigError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "broken("),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[quickcheck]
    fn prop_literal_pattern_matches_only_itself(name: String, other: String) -> bool {
        let filter = ExclusionFilter::new(&[regex::escape(&name)]).unwrap();
        filter.should_exclude(&name) && (other == name || !filter.should_exclude(&other))
    }

    #[quickcheck]
    fn prop_literal_pattern_never_matches_extension(name: String, suffix: String) -> bool {
        if suffix.is_empty() {
            return true;
        }
        let filter = ExclusionFilter::new(&[regex::escape(&name)]).unwrap();
        !filter.should_exclude(&format!("{name}{suffix}"))
    }
}
