//! Shared value types for archived aggregates.
//!
//! # Invariants
//! - Wire names (`as_str`) are identical in archives and in SQLite columns.
//! - Timestamps are persisted as epoch milliseconds and exchanged as RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report/template language code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en-US")]
    EnglishUs,
    #[serde(rename = "en-GB")]
    EnglishGb,
    #[serde(rename = "de-DE")]
    GermanDe,
    #[serde(rename = "de-AT")]
    GermanAt,
    #[serde(rename = "de-CH")]
    GermanCh,
    #[serde(rename = "fr-FR")]
    French,
    #[serde(rename = "es-ES")]
    Spanish,
    #[serde(rename = "it-IT")]
    Italian,
    #[serde(rename = "nl-NL")]
    Dutch,
    #[serde(rename = "pt-PT")]
    Portuguese,
    #[serde(rename = "sv-SE")]
    Swedish,
    #[serde(rename = "da-DK")]
    Danish,
    #[serde(rename = "pl-PL")]
    Polish,
    #[serde(rename = "uk-UA")]
    Ukrainian,
    #[serde(rename = "zh-CN")]
    Chinese,
    #[serde(rename = "ja-JP")]
    Japanese,
}

const LANGUAGES: &[(Language, &str)] = &[
    (Language::EnglishUs, "en-US"),
    (Language::EnglishGb, "en-GB"),
    (Language::GermanDe, "de-DE"),
    (Language::GermanAt, "de-AT"),
    (Language::GermanCh, "de-CH"),
    (Language::French, "fr-FR"),
    (Language::Spanish, "es-ES"),
    (Language::Italian, "it-IT"),
    (Language::Dutch, "nl-NL"),
    (Language::Portuguese, "pt-PT"),
    (Language::Swedish, "sv-SE"),
    (Language::Danish, "da-DK"),
    (Language::Polish, "pl-PL"),
    (Language::Ukrainian, "uk-UA"),
    (Language::Chinese, "zh-CN"),
    (Language::Japanese, "ja-JP"),
];

impl Language {
    pub fn as_str(self) -> &'static str {
        LANGUAGES
            .iter()
            .find(|(language, _)| *language == self)
            .map_or("en-US", |(_, code)| code)
    }

    pub fn parse(value: &str) -> Option<Self> {
        LANGUAGES
            .iter()
            .find(|(_, code)| *code == value)
            .map(|(language, _)| *language)
    }
}

/// Review state of findings, sections and template translations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    #[default]
    InProgress,
    ReadyForReview,
    NeedsImprovement,
    Finished,
    Deprecated,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::ReadyForReview => "ready-for-review",
            Self::NeedsImprovement => "needs-improvement",
            Self::Finished => "finished",
            Self::Deprecated => "deprecated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in-progress" => Some(Self::InProgress),
            "ready-for-review" => Some(Self::ReadyForReview),
            "needs-improvement" => Some(Self::NeedsImprovement),
            "finished" => Some(Self::Finished),
            "deprecated" => Some(Self::Deprecated),
            _ => None,
        }
    }
}

/// How an aggregate root came into the destination system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Authored locally.
    Created,
    /// Created from an archive document.
    Imported,
    /// Created from an archive as a dependency of another imported root.
    ImportedDependency,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Imported => "imported",
            Self::ImportedDependency => "imported_dependency",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "imported" => Some(Self::Imported),
            "imported_dependency" => Some(Self::ImportedDependency),
            _ => None,
        }
    }
}

/// Converts a timestamp into the epoch-ms representation used by SQLite rows.
pub fn to_epoch_ms(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

/// Converts an epoch-ms column value back into a UTC timestamp.
pub fn from_epoch_ms(value: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value)
}
