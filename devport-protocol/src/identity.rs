//! `project:role:instance` identities and the glob-shaped patterns that
//! match them. Pure parsing/validation — see spec §4.2.

use std::fmt;

pub const MAX_SEGMENT_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("wildcard in identity")]
    Wildcard,
    #[error("{0} segments")]
    SegmentCount(usize),
    #[error("too long")]
    TooLong,
    #[error("invalid characters")]
    InvalidCharacters,
}

fn validate_segment(segment: &str, allow_wildcard: bool) -> Result<(), IdentityError> {
    if segment == "*" {
        return if allow_wildcard {
            Ok(())
        } else {
            Err(IdentityError::Wildcard)
        };
    }
    if segment.is_empty() || !segment.chars().all(is_segment_char) {
        return Err(IdentityError::InvalidCharacters);
    }
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(IdentityError::TooLong);
    }
    Ok(())
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// A validated `project:role:instance` triple. Never contains a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    segments: [String; 3],
}

impl Identity {
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(IdentityError::SegmentCount(parts.len()));
        }
        for part in &parts {
            validate_segment(part, false)?;
        }
        Ok(Self {
            segments: [parts[0].to_string(), parts[1].to_string(), parts[2].to_string()],
        })
    }

    pub fn project(&self) -> &str {
        &self.segments[0]
    }

    pub fn role(&self) -> &str {
        &self.segments[1]
    }

    pub fn instance(&self) -> &str {
        &self.segments[2]
    }

    pub fn as_str(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.segments[0], self.segments[1], self.segments[2])
    }
}

/// A single pattern segment: either a literal value or `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Wildcard,
}

impl Segment {
    fn matches(&self, value: &str) -> bool {
        match self {
            Segment::Wildcard => true,
            Segment::Literal(s) => s == value,
        }
    }
}

/// An identity-shaped glob. Shorter patterns are padded with wildcards:
/// `myapp:*` parses the same as `myapp:*:*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: [Segment; 3],
}

impl Pattern {
    /// Matches every identity.
    pub fn match_all() -> Self {
        Self {
            segments: [Segment::Wildcard, Segment::Wildcard, Segment::Wildcard],
        }
    }

    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        if s == "*" {
            return Ok(Self::match_all());
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(IdentityError::SegmentCount(parts.len()));
        }

        let mut segments = [Segment::Wildcard, Segment::Wildcard, Segment::Wildcard];
        for (i, part) in parts.iter().enumerate() {
            validate_segment(part, true)?;
            segments[i] = if *part == "*" {
                Segment::Wildcard
            } else {
                Segment::Literal(part.to_string())
            };
        }

        Ok(Self { segments })
    }

    /// A `LIKE`-pattern approximation of this pattern, usable to prune
    /// candidate rows in a SQL `WHERE id LIKE ?` clause before the exact
    /// segment-wise [`Pattern::matches`] check runs in-app. `%` is a
    /// superset match (it can also span a `:`), so callers must still
    /// apply `matches` for correctness.
    pub fn sql_like(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(v) => v.clone(),
                Segment::Wildcard => "%".to_string(),
            })
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn matches(&self, identity: &Identity) -> bool {
        self.segments[0].matches(identity.project())
            && self.segments[1].matches(identity.role())
            && self.segments[2].matches(identity.instance())
    }

    /// True if this pattern can only ever match a single identity (no
    /// wildcard segment) — useful for callers that want an exact lookup.
    pub fn as_exact(&self) -> Option<Identity> {
        let mut out = Vec::with_capacity(3);
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push(s.clone()),
                Segment::Wildcard => return None,
            }
        }
        Some(Identity {
            segments: [out[0].clone(), out[1].clone(), out[2].clone()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_identity() {
        let id = Identity::parse("myapp:api:main").unwrap();
        assert_eq!(id.project(), "myapp");
        assert_eq!(id.role(), "api");
        assert_eq!(id.instance(), "main");
        assert_eq!(id.as_str(), "myapp:api:main");
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let err = Identity::parse("myapp:api").unwrap_err();
        assert!(matches!(err, IdentityError::SegmentCount(2)));
        assert!(err.to_string().contains("segments"));
    }

    #[test]
    fn rejects_wildcard_in_identity() {
        let err = Identity::parse("myapp:*:main").unwrap_err();
        assert_eq!(err, IdentityError::Wildcard);
    }

    #[test]
    fn rejects_overlong_segment() {
        let long = "a".repeat(65);
        let s = format!("myapp:{}:main", long);
        let err = Identity::parse(&s).unwrap_err();
        assert_eq!(err, IdentityError::TooLong);
    }

    #[test]
    fn rejects_invalid_characters() {
        let err = Identity::parse("my app:api:main").unwrap_err();
        assert_eq!(err, IdentityError::InvalidCharacters);
    }

    #[test]
    fn whole_string_wildcard_matches_everything() {
        let pattern = Pattern::parse("*").unwrap();
        assert_eq!(pattern, Pattern::match_all());
        assert!(pattern.matches(&Identity::parse("a:b:c").unwrap()));
    }

    #[test]
    fn short_pattern_pads_with_wildcards() {
        let short = Pattern::parse("myapp:*").unwrap();
        let long = Pattern::parse("myapp:*:*").unwrap();
        assert_eq!(short, long);
        assert!(short.matches(&Identity::parse("myapp:api:main").unwrap()));
        assert!(!short.matches(&Identity::parse("other:api:main").unwrap()));
    }

    #[test]
    fn pattern_segment_wise_match() {
        let pattern = Pattern::parse("myapp:*:main").unwrap();
        assert!(pattern.matches(&Identity::parse("myapp:api:main").unwrap()));
        assert!(!pattern.matches(&Identity::parse("myapp:api:other").unwrap()));
    }

    #[test]
    fn sql_like_substitutes_percent_for_wildcards() {
        assert_eq!(Pattern::parse("myapp:*:main").unwrap().sql_like(), "myapp:%:main");
        assert_eq!(Pattern::parse("*").unwrap().sql_like(), "%:%:%");
    }

    #[test]
    fn exact_pattern_round_trips_identity() {
        let pattern = Pattern::parse("myapp:api:main").unwrap();
        let identity = pattern.as_exact().unwrap();
        assert_eq!(identity.as_str(), "myapp:api:main");

        assert!(Pattern::parse("myapp:*:main").unwrap().as_exact().is_none());
    }
}
