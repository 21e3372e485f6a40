use std::collections::{BTreeMap, BTreeSet};

use super::model::{BheId, FieldTable, Vault};

// ---------------------------------------------------------------------------
// Exchanger selection: which BHEs are shown, grouped by vault
// ---------------------------------------------------------------------------

/// Per-vault selection state: maps vault → set of selected exchangers.
/// A vault that is absent or has an empty set contributes nothing.
pub type BheFilter = BTreeMap<Vault, BTreeSet<BheId>>;

/// Initialise a [`BheFilter`] with every exchanger of the table selected.
pub fn init_filter_state(table: &FieldTable) -> BheFilter {
    let mut filter = BheFilter::new();
    for bhe in table.bhes() {
        filter.entry(bhe.vault()).or_default().insert(bhe);
    }
    filter
}

/// Exchangers present in the table, grouped by vault.
pub fn available_by_vault(table: &FieldTable) -> BTreeMap<Vault, Vec<BheId>> {
    let mut grouped: BTreeMap<Vault, Vec<BheId>> = BTreeMap::new();
    for bhe in table.bhes() {
        grouped.entry(bhe.vault()).or_default().push(bhe);
    }
    grouped
}

/// Selected exchangers that the table actually contains, ascending.
pub fn selected_bhes(table: &FieldTable, filter: &BheFilter) -> Vec<BheId> {
    let present = table.bhes();
    filter
        .values()
        .flatten()
        .filter(|b| present.contains(b))
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Channel, ColumnKey, Resolution};

    fn table_with(ids: &[u8]) -> FieldTable {
        let columns = ids
            .iter()
            .map(|id| {
                (
                    ColumnKey::new(BheId::new(*id).unwrap(), Channel::FlowRate),
                    Vec::new(),
                )
            })
            .collect();
        FieldTable::from_parts(Resolution::Raw30s, Vec::new(), columns)
    }

    #[test]
    fn test_init_selects_everything_by_vault() {
        let table = table_with(&[1, 13, 23, 40]);
        let filter = init_filter_state(&table);
        assert_eq!(filter[&Vault::West].len(), 1);
        assert_eq!(filter[&Vault::South].len(), 1);
        assert_eq!(filter[&Vault::East].len(), 2);
        assert_eq!(selected_bhes(&table, &filter).len(), 4);
    }

    #[test]
    fn test_selection_ignores_absent_exchangers() {
        let table = table_with(&[2, 3]);
        let mut filter = BheFilter::new();
        filter.insert(
            Vault::West,
            [2, 5].iter().map(|i| BheId::new(*i).unwrap()).collect(),
        );
        filter.insert(Vault::East, BTreeSet::new());
        assert_eq!(selected_bhes(&table, &filter), vec![BheId::new(2).unwrap()]);
    }
}
