//! Versioned document format tags (`<kind>/v<N>`).
//!
//! # Invariants
//! - A tag is a lowercase kind name plus a numeric version.
//! - An importer accepts exactly one tag; there is no migration between
//!   versions.

use crate::archive::error::{ArchiveError, ArchiveResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

static FORMAT_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z][a-z0-9_]*)/v([0-9]+)$").expect("valid format tag regex")
});

/// Root aggregate kind an archive document describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArchiveKind {
    Templates,
    ProjectTypes,
    Projects,
}

impl ArchiveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Templates => "templates",
            Self::ProjectTypes => "projecttypes",
            Self::Projects => "projects",
        }
    }

    /// Tag written by exporters of this kind.
    pub fn current_format(self) -> FormatTag {
        match self {
            Self::Templates => FormatTag::new(self.as_str(), 2),
            Self::ProjectTypes | Self::Projects => FormatTag::new(self.as_str(), 1),
        }
    }
}

impl Display for ArchiveKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatTag {
    kind: String,
    version: u32,
}

impl FormatTag {
    pub fn new(kind: impl Into<String>, version: u32) -> Self {
        Self {
            kind: kind.into(),
            version,
        }
    }

    /// Parses `<kind>/v<N>`; returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        let captures = FORMAT_TAG_RE.captures(value)?;
        let version = captures.get(2)?.as_str().parse::<u32>().ok()?;
        Some(Self::new(captures.get(1)?.as_str(), version))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Checks that `found` is exactly this tag.
    pub fn validate(&self, found: &str) -> ArchiveResult<()> {
        match Self::parse(found) {
            Some(tag) if &tag == self => Ok(()),
            _ => Err(ArchiveError::FormatMismatch {
                expected: self.to_string(),
                found: found.to_string(),
            }),
        }
    }
}

impl Display for FormatTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/v{}", self.kind, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchiveKind, FormatTag};
    use crate::archive::error::ArchiveError;

    #[test]
    fn parses_well_formed_tags() {
        let tag = FormatTag::parse("templates/v2").expect("tag should parse");
        assert_eq!(tag.kind(), "templates");
        assert_eq!(tag.version(), 2);
        assert_eq!(tag.to_string(), "templates/v2");
    }

    #[test]
    fn rejects_malformed_tags() {
        for raw in ["", "templates", "templates/2", "Templates/v2", "templates/v", "/v1", "projects/v1 "] {
            assert!(FormatTag::parse(raw).is_none(), "`{raw}` should not parse");
        }
    }

    #[test]
    fn validate_accepts_only_the_same_tag() {
        let expected = FormatTag::new("templates", 2);
        expected
            .validate("templates/v2")
            .expect("identical tag should validate");

        for found in ["templates/v1", "projects/v2", "garbage"] {
            let err = expected.validate(found).expect_err("tag should mismatch");
            match err {
                ArchiveError::FormatMismatch {
                    expected,
                    found: actual,
                } => {
                    assert_eq!(expected, "templates/v2");
                    assert_eq!(actual, found);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn current_formats_per_kind() {
        assert_eq!(ArchiveKind::Templates.current_format().to_string(), "templates/v2");
        assert_eq!(
            ArchiveKind::ProjectTypes.current_format().to_string(),
            "projecttypes/v1"
        );
        assert_eq!(ArchiveKind::Projects.current_format().to_string(), "projects/v1");
    }
}
