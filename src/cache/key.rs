//! Key Module
//!
//! Structured cache keys (`namespace:owner[:variant]`), key validation and
//! the segment-wise pattern matcher used for bulk invalidation.

use std::fmt;

use glob::Pattern;

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{CacheError, Result};

/// Separator between key segments.
pub const SEGMENT_SEPARATOR: char = ':';

/// Namespaces used by the academy screens.
pub mod namespace {
    pub const STUDENTS: &str = "students";
    pub const CLASSES: &str = "classes";
    pub const INSTRUCTORS: &str = "instructors";
    pub const PAYMENTS: &str = "payments";
    pub const MODALITIES: &str = "modalities";
    pub const PLANS: &str = "plans";
    pub const DASHBOARD: &str = "dashboard";
    pub const ANNOUNCEMENTS: &str = "announcements";
    pub const CALENDAR_CLASSES: &str = "calendar_classes";
    pub const STUDENT_DETAILS: &str = "student_details";
    pub const INSTRUCTOR_CLASSES: &str = "instructor_classes";
    pub const INSTRUCTOR_STUDENTS: &str = "instructor_students";
    pub const REPORTS: &str = "reports";
}

// == Key Validation ==
/// Rejects empty, blank and oversized keys.
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

fn validate_segment(kind: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(CacheError::InvalidKey(format!("{} segment is empty", kind)));
    }
    if segment.contains(SEGMENT_SEPARATOR) {
        return Err(CacheError::InvalidKey(format!(
            "{} segment '{}' contains '{}'",
            kind, segment, SEGMENT_SEPARATOR
        )));
    }
    Ok(())
}

// == Cache Key ==
/// A key composed from a namespace, an owning resource and an optional
/// role/variant discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    owner: String,
    variant: Option<String>,
}

impl CacheKey {
    /// Creates an owner-level key (`namespace:owner`).
    pub fn new(namespace: impl Into<String>, owner: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let owner = owner.into();
        validate_segment("Namespace", &namespace)?;
        validate_segment("Owner", &owner)?;

        let key = Self {
            namespace,
            owner,
            variant: None,
        };
        validate_key(&key.to_string())?;
        Ok(key)
    }

    /// Adds a variant discriminator (`namespace:owner:variant`).
    pub fn with_variant(mut self, variant: impl Into<String>) -> Result<Self> {
        let variant = variant.into();
        validate_segment("Variant", &variant)?;
        self.variant = Some(variant);
        validate_key(&self.to_string())?;
        Ok(self)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Pattern matching every variant stored for this key's owner.
    pub fn owner_pattern(&self) -> KeyPattern {
        KeyPattern {
            source: format!("{}{}{}", self.namespace, SEGMENT_SEPARATOR, self.owner),
            segments: vec![
                Segment::Literal(self.namespace.clone()),
                Segment::Literal(self.owner.clone()),
            ],
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, SEGMENT_SEPARATOR, self.owner)?;
        if let Some(variant) = &self.variant {
            write!(f, "{}{}", SEGMENT_SEPARATOR, variant)?;
        }
        Ok(())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

// == Key Pattern ==
#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Glob(Pattern),
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == segment,
            Segment::Glob(pattern) => pattern.matches(segment),
        }
    }
}

/// Structural prefix pattern over key segments.
///
/// Each pattern segment is compared with the key segment at the same
/// position, either literally or as a glob when it contains `*`, `?` or `[`.
/// Keys with more segments than the pattern match on their leading segments.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    segments: Vec<Segment>,
}

impl KeyPattern {
    /// Parses a pattern such as `calendar_classes:A` or `instructor_*:A:*`.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(CacheError::InvalidPattern(
                "Pattern cannot be empty".to_string(),
            ));
        }

        let segments = pattern
            .split(SEGMENT_SEPARATOR)
            .map(|segment| {
                if segment.is_empty() {
                    return Err(CacheError::InvalidPattern(format!(
                        "Pattern '{}' has an empty segment",
                        pattern
                    )));
                }
                if segment.contains(['*', '?', '[']) {
                    Pattern::new(segment).map(Segment::Glob).map_err(|err| {
                        CacheError::InvalidPattern(format!("'{}': {}", segment, err))
                    })
                } else {
                    Ok(Segment::Literal(segment.to_string()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true when `key` starts with segments matching this pattern.
    pub fn matches(&self, key: &str) -> bool {
        let mut key_segments = key.split(SEGMENT_SEPARATOR);
        self.segments.iter().all(|pattern_segment| {
            key_segments
                .next()
                .is_some_and(|key_segment| pattern_segment.matches(key_segment))
        })
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("roster:42").is_ok());
        assert!(matches!(validate_key(""), Err(CacheError::InvalidKey(_))));
        assert!(matches!(validate_key("   "), Err(CacheError::InvalidKey(_))));
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);
        assert!(matches!(validate_key(&long_key), Err(CacheError::InvalidKey(_))));
    }

    #[test]
    fn test_cache_key_rendering() {
        let key = CacheKey::new(namespace::CALENDAR_CLASSES, "A")
            .unwrap()
            .with_variant("admin")
            .unwrap();
        assert_eq!(key.to_string(), "calendar_classes:A:admin");
        assert_eq!(key.variant(), Some("admin"));

        let owner_only = CacheKey::new(namespace::STUDENTS, "A").unwrap();
        assert_eq!(owner_only.to_string(), "students:A");
    }

    #[test]
    fn test_cache_key_rejects_separator_in_segment() {
        assert!(CacheKey::new("calendar:classes", "A").is_err());
        assert!(CacheKey::new("calendar_classes", "").is_err());
        let key = CacheKey::new("calendar_classes", "A").unwrap();
        assert!(key.with_variant("a:b").is_err());
    }

    #[test]
    fn test_owner_pattern_covers_all_variants() {
        let admin = CacheKey::new("calendar_classes", "A")
            .unwrap()
            .with_variant("admin")
            .unwrap();
        let pattern = admin.owner_pattern();
        assert_eq!(pattern.as_str(), "calendar_classes:A");
        assert!(pattern.matches("calendar_classes:A:admin"));
        assert!(pattern.matches("calendar_classes:A:student"));
        assert!(pattern.matches("calendar_classes:A"));
        assert!(!pattern.matches("calendar_classes:B:admin"));
    }

    #[test]
    fn test_pattern_respects_segment_boundaries() {
        let pattern = KeyPattern::parse("calendar_classes:A").unwrap();
        assert!(!pattern.matches("calendar_classes:AB:admin"));
        assert!(!pattern.matches("calendar_classes"));
        assert!(!pattern.matches("other:A:admin"));
    }

    #[test]
    fn test_pattern_globs() {
        let pattern = KeyPattern::parse("instructor_*:A").unwrap();
        assert!(pattern.matches("instructor_classes:A:7"));
        assert!(pattern.matches("instructor_students:A:7"));
        assert!(!pattern.matches("students:A"));

        let any_owner = KeyPattern::parse("calendar_classes:*:admin").unwrap();
        assert!(any_owner.matches("calendar_classes:A:admin"));
        assert!(any_owner.matches("calendar_classes:B:admin"));
        assert!(!any_owner.matches("calendar_classes:B:student"));
    }

    #[test]
    fn test_pattern_rejects_malformed() {
        assert!(matches!(
            KeyPattern::parse(""),
            Err(CacheError::InvalidPattern(_))
        ));
        assert!(matches!(
            KeyPattern::parse("calendar_classes::admin"),
            Err(CacheError::InvalidPattern(_))
        ));
        assert!(matches!(
            KeyPattern::parse("calendar_classes:[A"),
            Err(CacheError::InvalidPattern(_))
        ));
    }
}
