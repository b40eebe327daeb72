//! Per-category accumulation of resolved items.

use std::collections::BTreeMap;

use itemsync_shared::{Category, ItemRecord};

/// Ordered item lists, one per category.
///
/// Items keep the order they were pushed in, which the pipeline guarantees
/// is the sheet's row order.
#[derive(Debug, Clone, Default)]
pub struct CategoryBuckets {
    buckets: BTreeMap<Category, Vec<ItemRecord>>,
}

impl CategoryBuckets {
    /// Append a record to a category.
    pub fn push(&mut self, category: Category, record: ItemRecord) {
        self.buckets.entry(category).or_default().push(record);
    }

    /// Records collected for one category.
    pub fn get(&self, category: Category) -> &[ItemRecord] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    /// All categories in output order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[ItemRecord])> {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    /// Total number of records across all categories.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether no record has been pushed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemsync_shared::ItemId;

    fn record(id: u64) -> ItemRecord {
        ItemRecord {
            name: format!("item {id}"),
            key: None,
            id: ItemId(id),
        }
    }

    #[test]
    fn keeps_insertion_order_per_category() {
        let mut buckets = CategoryBuckets::default();
        buckets.push(Category::Bait, record(3));
        buckets.push(Category::Weapon, record(1));
        buckets.push(Category::Bait, record(2));

        let baits: Vec<u64> = buckets.get(Category::Bait).iter().map(|r| r.id.0).collect();
        assert_eq!(baits, [3, 2]);
        assert_eq!(buckets.len(), 3);
        assert!(buckets.get(Category::Charm).is_empty());
    }

    #[test]
    fn iterates_in_output_order() {
        let mut buckets = CategoryBuckets::default();
        buckets.push(Category::Bait, record(1));
        buckets.push(Category::Weapon, record(2));

        let order: Vec<(Category, usize)> = buckets.iter().map(|(c, items)| (c, items.len())).collect();
        assert_eq!(
            order,
            [
                (Category::Weapon, 1),
                (Category::Base, 0),
                (Category::Charm, 0),
                (Category::Bait, 1),
            ]
        );
    }

    #[test]
    fn empty_by_default() {
        assert!(CategoryBuckets::default().is_empty());
    }
}
