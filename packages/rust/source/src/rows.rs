//! Streaming CSV row reader and category classifier.
//!
//! Rows are decoded lazily, one record at a time, so the sheet never has to
//! be resident in memory. Only the header is validated up front.
//!
//! Header names are trimmed; field values are not. `Name` is kept exactly as
//! exported, while `ID` and `Class` are trimmed when classified.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{DeserializeRecordsIntoIter, ReaderBuilder, Trim};
use serde::Deserialize;

use itemsync_shared::{Category, ItemId, ItemSyncError, Result};

/// Header columns every sheet export must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["ID", "Name", "Class"];

/// One decoded sheet row. Columns other than these three are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Class")]
    pub class: String,
}

/// A row that passed classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRow {
    pub category: Category,
    pub id: ItemId,
    pub name: String,
}

/// Outcome of classifying a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass {
    /// Class is in the allow-list and the id is numeric.
    Accept(ClassifiedRow),
    /// Class is not one the pipeline keeps.
    Discard,
    /// Class is kept but the row cannot be turned into a record.
    Malformed { reason: String },
}

/// Classify a decoded row.
///
/// The class check runs first, so rows of unwanted classes are discarded
/// even when their id is garbage.
pub fn classify(row: RawRow) -> RowClass {
    let Some(category) = Category::parse(&row.class) else {
        return RowClass::Discard;
    };

    match row.id.parse::<ItemId>() {
        Ok(id) => RowClass::Accept(ClassifiedRow {
            category,
            id,
            name: row.name,
        }),
        Err(e) => RowClass::Malformed {
            reason: format!("invalid ID '{}': {e}", row.id),
        },
    }
}

// ---------------------------------------------------------------------------
// RowReader
// ---------------------------------------------------------------------------

/// Lazy, single-pass iterator over the rows of a sheet export.
///
/// Each item is the decoded row or a per-row decode error; a bad row does
/// not end the iteration.
pub struct RowReader<R: Read = File> {
    records: DeserializeRecordsIntoIter<R, RawRow>,
}

impl RowReader<File> {
    /// Open a CSV file and validate its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ItemSyncError::io(path, e))?;
        Self::from_reader(file)
    }
}

impl<R: Read> RowReader<R> {
    /// Wrap any reader producing CSV text and validate its header.
    pub fn from_reader(rdr: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::Headers)
            .flexible(true)
            .from_reader(rdr);

        let headers = reader
            .headers()
            .map_err(|e| ItemSyncError::parse(format!("failed to read CSV header: {e}")))?;

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();

        if !missing.is_empty() {
            return Err(ItemSyncError::validation(format!(
                "CSV header is missing column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            records: reader.into_deserialize(),
        })
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .map(|record| record.map_err(|e| ItemSyncError::parse(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(csv: &str) -> Vec<Result<RawRow>> {
        RowReader::from_reader(csv.as_bytes())
            .expect("valid header")
            .collect()
    }

    #[test]
    fn reads_rows_and_ignores_extra_columns() {
        let parsed = rows("ID,Name,Class,Price\n1,Sword,Weapon,100\n2,Shield,Base,50\n");
        assert_eq!(parsed.len(), 2);
        let first = parsed[0].as_ref().unwrap();
        assert_eq!(first.id, "1");
        assert_eq!(first.name, "Sword");
        assert_eq!(first.class, "Weapon");
    }

    #[test]
    fn reads_quoted_export_format() {
        let csv = "\"ID\",\"Name\",\"Class\"\n\"7\",\"Ancient Box, Rare\",\"Bait\"\n";
        let parsed = rows(csv);
        assert_eq!(parsed[0].as_ref().unwrap().name, "Ancient Box, Rare");
    }

    #[test]
    fn column_order_does_not_matter() {
        let parsed = rows("Class,Name,ID\ncharm,Lucky Charm,9\n");
        let row = parsed[0].as_ref().unwrap();
        assert_eq!(row.id, "9");
        assert_eq!(row.class, "charm");
    }

    #[test]
    fn missing_header_column_is_rejected() {
        let err = RowReader::from_reader("ID,Name\n1,Sword\n".as_bytes())
            .err()
            .expect("header validation should fail");
        assert!(err.to_string().contains("Class"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(RowReader::from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn short_row_is_an_error_but_iteration_continues() {
        let parsed = rows("ID,Name,Class\n1,Sword\n2,Shield,Base\n");
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].is_err());
        assert_eq!(parsed[1].as_ref().unwrap().name, "Shield");
    }

    #[test]
    fn classify_accepts_allowed_classes() {
        let row = RawRow {
            id: "1".into(),
            name: "Sword".into(),
            class: "WEAPON".into(),
        };
        assert_eq!(
            classify(row),
            RowClass::Accept(ClassifiedRow {
                category: Category::Weapon,
                id: ItemId(1),
                name: "Sword".into(),
            })
        );
    }

    #[test]
    fn classify_discards_unknown_class_before_checking_id() {
        let row = RawRow {
            id: "not-a-number".into(),
            name: "Rock".into(),
            class: "Unknown".into(),
        };
        assert_eq!(classify(row), RowClass::Discard);
    }

    #[test]
    fn names_are_kept_verbatim() {
        let parsed = rows("ID , Name ,Class\n 3 ,  Gilded  Charm ,  Charm \n");
        let row = parsed[0].as_ref().unwrap().clone();
        assert_eq!(row.name, "  Gilded  Charm ");

        assert_eq!(
            classify(row),
            RowClass::Accept(ClassifiedRow {
                category: Category::Charm,
                id: ItemId(3),
                name: "  Gilded  Charm ".into(),
            })
        );
    }

    #[test]
    fn classify_accepts_integral_decimal_ids() {
        let row = RawRow {
            id: "1.0".into(),
            name: "Sword".into(),
            class: "Weapon".into(),
        };
        assert!(matches!(classify(row), RowClass::Accept(ClassifiedRow { id: ItemId(1), .. })));
    }

    #[test]
    fn classify_flags_bad_ids() {
        let row = RawRow {
            id: "12a".into(),
            name: "Cheese".into(),
            class: "bait".into(),
        };
        assert!(matches!(classify(row), RowClass::Malformed { reason } if reason.contains("12a")));
    }
}
