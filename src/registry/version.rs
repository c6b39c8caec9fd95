use crate::error::{Result, SyncError};
use std::cmp::Ordering;
use std::fmt;

/// A mod version as published on the portal or encoded in an archive name.
///
/// Parsed with `semver`, falling back to plain dotted numbers (`1.0`,
/// `0.18.2.1`) so that `1.0` and `1.0.0` compare equal.
#[derive(Debug, Clone)]
pub struct ModVersion {
    pub original: String,
    segments: Vec<u64>,
    semantic: semver::Version,
}

impl ModVersion {
    pub fn parse(version: &str) -> Result<Self> {
        let trimmed = version.trim();
        if let Ok(semantic) = semver::Version::parse(trimmed) {
            let segments = vec![semantic.major, semantic.minor, semantic.patch];
            return Ok(Self {
                original: version.to_string(),
                segments,
                semantic,
            });
        }

        let segments = Self::parse_numeric(trimmed).ok_or_else(|| SyncError::VersionParse {
            version: version.to_string(),
            reason: "expected dotted numeric segments".to_string(),
        })?;

        let at = |i: usize| segments.get(i).copied().unwrap_or(0);
        let semantic = semver::Version::new(at(0), at(1), at(2));

        Ok(Self {
            original: version.to_string(),
            segments,
            semantic,
        })
    }

    fn parse_numeric(version: &str) -> Option<Vec<u64>> {
        if version.is_empty() {
            return None;
        }

        let mut numbers = Vec::new();
        for part in version.split('.') {
            numbers.push(part.parse::<u64>().ok()?);
        }
        Some(numbers)
    }

    /// Segments with trailing zeros removed, used for equality and ordering
    /// of versions that carry more than three numbers.
    fn significant(&self) -> &[u64] {
        let end = self
            .segments
            .iter()
            .rposition(|n| *n != 0)
            .map_or(0, |i| i + 1);
        &self.segments[..end]
    }
}

impl PartialEq for ModVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ModVersion {}

impl PartialOrd for ModVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.semantic.cmp_precedence(&other.semantic) {
            Ordering::Equal => self.significant().cmp(other.significant()),
            ordering => ordering,
        }
    }
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
