//! Core domain types: item categories, identifiers, and records.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The fixed set of item classes the pipeline keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Weapon,
    Base,
    Charm,
    Bait,
}

impl Category {
    /// All categories, in output order.
    pub const ALL: [Category; 4] = [
        Category::Weapon,
        Category::Base,
        Category::Charm,
        Category::Bait,
    ];

    /// Match a free-text class label, ignoring case and surrounding whitespace.
    ///
    /// Returns `None` for any label outside the allow-list.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weapon => "weapon",
            Self::Base => "base",
            Self::Charm => "charm",
            Self::Bait => "bait",
        }
    }

    /// Output file name for this category (`weapons.yml`, ...).
    pub fn file_name(&self) -> String {
        format!("{}s.yml", self.as_str())
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ItemId
// ---------------------------------------------------------------------------

/// Numeric item identifier, as used by the game's item pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::num::ParseIntError;

    /// Sheets formatted as numbers export integral ids as `12.0`; a fraction
    /// of all zeros is accepted, anything else after the point is not.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let digits = match s.split_once('.') {
            Some((int, frac)) if !frac.is_empty() && frac.bytes().all(|b| b == b'0') => int,
            _ => s,
        };
        Ok(Self(digits.parse()?))
    }
}

// ---------------------------------------------------------------------------
// ItemRecord
// ---------------------------------------------------------------------------

/// One resolved item, as written to (and read back from) a category file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Display name from the sheet.
    pub name: String,
    /// Item type key scraped from the item page; `None` if the page had none.
    #[serde(default)]
    pub key: Option<String>,
    /// Item identifier.
    pub id: ItemId,
}
