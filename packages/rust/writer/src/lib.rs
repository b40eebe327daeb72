//! Category file writer.
//!
//! Each non-empty category is written to `<dir>/<category>s.yml` as a YAML
//! list with one three-line block per item:
//!
//! ```text
//! - name: Sword
//!   key: sword_weapon
//!   id: 1
//!
//! - name: Axe
//!   key: ~
//!   id: 3
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use itemsync_shared::{Category, ItemRecord, ItemSyncError, Result};

/// Rendered form of a missing key (YAML null).
const NULL_SCALAR: &str = "~";

/// A category file written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub category: Category,
    pub path: PathBuf,
    pub items: usize,
    pub bytes: usize,
}

/// Render a category's records into file content.
pub fn render_items(items: &[ItemRecord]) -> Result<String> {
    let blocks = items
        .iter()
        .map(render_item)
        .collect::<Result<Vec<_>>>()?;

    Ok(blocks.join("\n"))
}

/// Write every non-empty category to `dir`, overwriting existing files.
///
/// All content is rendered before the first write. Each file is written to a
/// temp file and renamed into place. Empty categories leave no file behind
/// and do not touch an existing one.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn write_categories<'a>(
    dir: &Path,
    groups: impl IntoIterator<Item = (Category, &'a [ItemRecord])>,
) -> Result<Vec<WrittenFile>> {
    let rendered = groups
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(category, items)| {
            render_items(items).map(|content| (category, items.len(), content))
        })
        .collect::<Result<Vec<_>>>()?;

    if rendered.is_empty() {
        info!("no items to write");
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(dir).map_err(|e| ItemSyncError::io(dir, e))?;

    let mut written = Vec::with_capacity(rendered.len());

    for (category, items, content) in rendered {
        let file_name = category.file_name();
        let target = dir.join(&file_name);
        let temp = dir.join(format!(".{file_name}.tmp"));

        info!(%category, items, file = %file_name, "writing category file");

        std::fs::write(&temp, &content).map_err(|e| ItemSyncError::io(&temp, e))?;
        if let Err(e) = std::fs::rename(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(ItemSyncError::io(&target, e));
        }

        debug!(path = %target.display(), bytes = content.len(), "category file written");

        written.push(WrittenFile {
            category,
            path: target,
            items,
            bytes: content.len(),
        });
    }

    Ok(written)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn render_item(item: &ItemRecord) -> Result<String> {
    let name = yaml_scalar(&item.name)?;
    let key = match &item.key {
        Some(key) => yaml_scalar(key)?,
        None => NULL_SCALAR.to_string(),
    };

    Ok(format!("- name: {name}\n  key: {key}\n  id: {}\n", item.id))
}

/// Render a string as a single-line YAML scalar, quoting only when needed.
fn yaml_scalar(value: &str) -> Result<String> {
    // Line breaks would turn the scalar into a block literal
    let value = if value.contains(['\n', '\r']) {
        debug!(value, "collapsing line breaks in scalar");
        value.replace("\r\n", " ").replace(['\n', '\r'], " ")
    } else {
        value.to_string()
    };

    let rendered = serde_yaml::to_string(&value)
        .map_err(|e| ItemSyncError::Render(format!("cannot render '{value}': {e}")))?;

    Ok(rendered.trim_end_matches('\n').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemsync_shared::ItemId;

    fn record(id: u64, name: &str, key: Option<&str>) -> ItemRecord {
        ItemRecord {
            name: name.into(),
            key: key.map(String::from),
            id: ItemId(id),
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("itemsync-writer-{tag}-{}", uuid::Uuid::now_v7()))
    }

    #[test]
    fn renders_single_block() {
        let out = render_items(&[record(1, "Sword", Some("sword_key"))]).unwrap();
        assert_eq!(out, "- name: Sword\n  key: sword_key\n  id: 1\n");
    }

    #[test]
    fn blocks_are_separated_by_blank_line() {
        let out = render_items(&[
            record(1, "Sword", Some("sword_key")),
            record(2, "Axe", Some("axe_key")),
        ])
        .unwrap();
        assert_eq!(
            out,
            "- name: Sword\n  key: sword_key\n  id: 1\n\n- name: Axe\n  key: axe_key\n  id: 2\n"
        );
    }

    #[test]
    fn missing_key_renders_as_null() {
        let out = render_items(&[record(9, "Mystery Box", None)]).unwrap();
        assert_eq!(out, "- name: Mystery Box\n  key: ~\n  id: 9\n");
    }

    #[test]
    fn ambiguous_names_are_quoted() {
        let out = render_items(&[record(4, "Cheese: Aged", Some("aged_cheese"))]).unwrap();
        assert!(!out.contains("name: Cheese: Aged\n"));

        // The output reads back as the same record
        let parsed: Vec<ItemRecord> = serde_yaml::from_str(&out).unwrap();
        assert_eq!(parsed, vec![record(4, "Cheese: Aged", Some("aged_cheese"))]);
    }

    #[test]
    fn line_breaks_are_collapsed() {
        let out = render_items(&[record(5, "Two\nLines", Some("two_lines"))]).unwrap();
        assert_eq!(out.lines().count(), 3);
        assert!(out.contains("Two Lines"));
    }

    #[test]
    fn rendered_file_parses_as_yaml_list() {
        let records = vec![
            record(1, "Sword", Some("sword_key")),
            record(2, "Mystery Box", None),
            record(3, "123", Some("numeric_name")),
        ];
        let out = render_items(&records).unwrap();
        let parsed: Vec<ItemRecord> = serde_yaml::from_str(&out).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn writes_only_non_empty_categories() {
        let dir = temp_dir("write");
        let weapons = vec![record(1, "Sword", Some("sword_key"))];
        let bases = vec![record(2, "Shield", Some("shield_key"))];

        let written = write_categories(
            &dir,
            [
                (Category::Weapon, weapons.as_slice()),
                (Category::Base, bases.as_slice()),
                (Category::Charm, &[][..]),
            ],
        )
        .unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(written[0].category, Category::Weapon);
        assert_eq!(written[0].items, 1);
        assert_eq!(
            std::fs::read_to_string(dir.join("weapons.yml")).unwrap(),
            "- name: Sword\n  key: sword_key\n  id: 1\n"
        );
        assert!(dir.join("bases.yml").exists());
        assert!(!dir.join("charms.yml").exists());
        assert!(!dir.join(".weapons.yml.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn overwrites_existing_file_and_leaves_empty_categories_alone() {
        let dir = temp_dir("overwrite");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("weapons.yml"), "old content\n").unwrap();
        std::fs::write(dir.join("baits.yml"), "previous run\n").unwrap();

        let weapons = vec![record(1, "Sword", None)];
        write_categories(&dir, [(Category::Weapon, weapons.as_slice())]).unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.join("weapons.yml")).unwrap(),
            "- name: Sword\n  key: ~\n  id: 1\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("baits.yml")).unwrap(),
            "previous run\n"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = temp_dir("rename");
        // A non-empty directory in the target's place cannot be replaced
        std::fs::create_dir_all(dir.join("weapons.yml")).unwrap();
        std::fs::write(dir.join("weapons.yml").join("keep"), "x").unwrap();

        let weapons = vec![record(1, "Sword", Some("sword_key"))];
        let err = write_categories(&dir, [(Category::Weapon, weapons.as_slice())]).unwrap_err();

        assert!(matches!(err, ItemSyncError::Io { .. }));
        assert!(!dir.join(".weapons.yml.tmp").exists());
        assert!(dir.join("weapons.yml").join("keep").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn nothing_to_write_creates_no_directory() {
        let dir = temp_dir("nothing");
        let written =
            write_categories(&dir, std::iter::empty::<(Category, &[ItemRecord])>()).unwrap();
        assert!(written.is_empty());
        assert!(!dir.exists());
    }
}
