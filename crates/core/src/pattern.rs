use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Date layouts a file can be renamed to. Slashes nest the file into
/// subdirectories of its current directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamingPattern {
    /// `YYYY-MM-DD`
    #[default]
    DashedDate,
    /// `YYYY/MM/DD`
    NestedDate,
    /// `YYYY/MM-DD`
    NestedMonth,
}

impl NamingPattern {
    pub const ALL: [NamingPattern; 3] = [Self::DashedDate, Self::NestedDate, Self::NestedMonth];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DashedDate => "YYYY-MM-DD",
            Self::NestedDate => "YYYY/MM/DD",
            Self::NestedMonth => "YYYY/MM-DD",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::ALL
            .into_iter()
            .find(|pattern| pattern.as_str().eq_ignore_ascii_case(input))
    }

    /// Unknown patterns degrade to the default layout instead of failing.
    pub fn parse_or_default(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|| {
            let fallback = Self::default();
            warn!(pattern = input, fallback = %fallback, "unknown naming pattern");
            fallback
        })
    }

    fn chrono_format(self) -> &'static str {
        match self {
            Self::DashedDate => "%Y-%m-%d",
            Self::NestedDate => "%Y/%m/%d",
            Self::NestedMonth => "%Y/%m-%d",
        }
    }

    /// Canonical base name for `date`, before any sequence suffix.
    pub fn format_date(self, date: &DateTime<Local>) -> String {
        date.format(self.chrono_format()).to_string()
    }
}

impl fmt::Display for NamingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
