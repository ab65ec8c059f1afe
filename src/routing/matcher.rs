//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse route path patterns (`/lazy/**`, `/users/*/orders`, `/health`)
//! - Match request paths segment by segment
//! - Expose the literal prefix used for specificity ordering and prefix stripping
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `*` matches exactly one segment, `**` matches zero or more
//! - Wildcards are whole segments only; `/files/*.json` is rejected
//! - No regex; matching walks the path without collecting its segments

use std::fmt;

use thiserror::Error;

/// Why a pattern was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with '/': '{0}'")]
    MissingLeadingSlash(String),

    #[error("wildcards must span a whole segment: '{0}'")]
    PartialWildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*`
    Single,
    /// `**`
    Multi,
}

/// A compiled route path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    /// Literal segments before the first wildcard, joined as `/a/b`.
    literal_prefix: String,
}

impl PathPattern {
    /// Compile a pattern.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(raw.to_string()));
        }

        let mut segments = Vec::new();
        for part in raw.split('/').filter(|s| !s.is_empty()) {
            let segment = match part {
                "*" => Segment::Single,
                "**" => Segment::Multi,
                p if p.contains('*') => return Err(PatternError::PartialWildcard(raw.to_string())),
                p => Segment::Literal(p.to_string()),
            };
            segments.push(segment);
        }

        let literal_prefix = segments
            .iter()
            .map_while(|s| match s {
                Segment::Literal(l) => Some(l.as_str()),
                _ => None,
            })
            .fold(String::new(), |mut acc, l| {
                acc.push('/');
                acc.push_str(l);
                acc
            });

        Ok(Self {
            raw: raw.to_string(),
            segments,
            literal_prefix,
        })
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True if the pattern contains no wildcard.
    pub fn is_exact(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Literal path before the first wildcard (`/lazy` for `/lazy/**`).
    pub fn literal_prefix(&self) -> &str {
        &self.literal_prefix
    }

    /// Ordering key: higher sorts first.
    pub(crate) fn specificity(&self) -> (bool, usize) {
        (self.is_exact(), self.literal_prefix.len())
    }

    /// Returns true if `path` matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match_segments(&self.segments, path.split('/').filter(|s| !s.is_empty()))
    }
}

/// Walks the path lazily; `**` backtracks by cloning the segment iterator.
fn match_segments<'a, I>(pattern: &[Segment], mut path: I) -> bool
where
    I: Iterator<Item = &'a str> + Clone,
{
    match pattern.split_first() {
        None => path.next().is_none(),
        Some((Segment::Multi, rest)) => {
            if rest.is_empty() {
                return true;
            }
            loop {
                if match_segments(rest, path.clone()) {
                    return true;
                }
                if path.next().is_none() {
                    return false;
                }
            }
        }
        Some((Segment::Single, rest)) => path.next().is_some() && match_segments(rest, path),
        Some((Segment::Literal(lit), rest)) => {
            path.next() == Some(lit.as_str()) && match_segments(rest, path)
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
