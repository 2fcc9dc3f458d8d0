//! Key → label lookup table (the reference sheet the ledger is VLOOKUP'd
//! against). Built once per run, read-only afterwards.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::error::ReconError;
use crate::model::{Cell, Grid};
use crate::normalize::{to_clean_code_string, to_display_string};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceEntry {
    pub key: f64,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: Vec<ReferenceEntry>,
    index: HashMap<OrderedFloat<f64>, usize>,
    duplicates_dropped: usize,
    rows_skipped: usize,
}

impl ReferenceTable {
    /// Load from a headerless grid: column A = key, column B = label.
    /// Columns beyond B are ignored. On duplicate keys the first row wins.
    pub fn load(grid: &Grid) -> Result<Self, ReconError> {
        if grid.height() == 0 {
            return Err(ReconError::ReferenceLoad(format!(
                "reference source '{}' is empty",
                grid.name
            )));
        }
        let width = grid.width();
        if width < 2 {
            return Err(ReconError::ReferenceLoad(format!(
                "reference source '{}' must have two columns (key, label), found {width}",
                grid.name
            )));
        }
        if width > 2 {
            log::debug!("reference source '{}': ignoring {} extra column(s)", grid.name, width - 2);
        }

        let mut table = Self::default();
        for row in 0..grid.height() {
            let key_cell = grid.cell(row, 0);
            if key_cell.is_blank() {
                continue;
            }
            match coerce_key(key_cell) {
                Some(key) => {
                    let label = to_display_string(grid.cell(row, 1));
                    table.insert(key, label);
                }
                None => {
                    log::debug!("reference row {}: key {:?} is not numeric, skipped", row + 1, key_cell);
                    table.rows_skipped += 1;
                }
            }
        }

        if table.entries.is_empty() {
            return Err(ReconError::ReferenceLoad(format!(
                "reference source '{}' has no numeric keys in column A",
                grid.name
            )));
        }

        log::info!(
            "reference table: {} entries ({} duplicate keys dropped, {} rows skipped)",
            table.entries.len(),
            table.duplicates_dropped,
            table.rows_skipped
        );
        Ok(table)
    }

    /// Build from already-typed pairs, same first-wins rule as [`load`](Self::load).
    pub fn from_entries<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (f64, S)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (key, label) in pairs {
            table.insert(key, label.into());
        }
        table
    }

    fn insert(&mut self, key: f64, label: String) {
        let k = OrderedFloat(key);
        if self.index.contains_key(&k) {
            self.duplicates_dropped += 1;
            return;
        }
        self.index.insert(k, self.entries.len());
        self.entries.push(ReferenceEntry { key, label });
    }

    /// Exact numeric-key lookup.
    pub fn lookup(&self, key: f64) -> Option<&str> {
        self.index
            .get(&OrderedFloat(key))
            .map(|&i| self.entries[i].label.as_str())
    }

    /// Entries in source order.
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn rows_skipped(&self) -> usize {
        self.rows_skipped
    }
}

fn coerce_key(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(_) => to_clean_code_string(cell)
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: Vec<Vec<Cell>>) -> Grid {
        Grid::new("MATRIZ", rows)
    }

    #[test]
    fn first_occurrence_wins() {
        let g = grid(vec![
            vec![Cell::Number(100.0), "Vehicles".into()],
            vec![Cell::Number(200.0), "Computers".into()],
            vec![Cell::Number(100.0), "Boats".into()],
        ]);
        let table = ReferenceTable::load(&g).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(100.0), Some("Vehicles"));
        assert_eq!(table.lookup(200.0), Some("Computers"));
        assert_eq!(table.duplicates_dropped(), 1);
        assert_eq!(table.entries()[0].key, 100.0);
        assert_eq!(table.entries()[1].key, 200.0);
    }

    #[test]
    fn text_keys_are_coerced() {
        let g = grid(vec![
            vec!["123110801".into(), "Bens em almoxarifado".into()],
            vec![" 44905287.0 ".into(), "Equipamentos".into()],
        ]);
        let table = ReferenceTable::load(&g).unwrap();
        assert_eq!(table.lookup(123110801.0), Some("Bens em almoxarifado"));
        assert_eq!(table.lookup(44905287.0), Some("Equipamentos"));
    }

    #[test]
    fn non_numeric_keys_are_skipped() {
        let g = grid(vec![
            vec!["CODIGO".into(), "DESCRICAO".into()],
            vec![Cell::Number(1.0), "One".into()],
            vec![Cell::Empty, "orphan".into()],
        ]);
        let table = ReferenceTable::load(&g).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows_skipped(), 1);
        assert_eq!(table.lookup(0.0), None);
    }

    #[test]
    fn lookup_is_exact() {
        let table = ReferenceTable::from_entries([(100.0, "Vehicles")]);
        assert_eq!(table.lookup(100.0), Some("Vehicles"));
        assert_eq!(table.lookup(100.5), None);
        assert_eq!(table.lookup(1000.0), None);
    }

    #[test]
    fn single_column_source_is_rejected() {
        let g = grid(vec![vec![Cell::Number(1.0)], vec![Cell::Number(2.0)]]);
        let err = ReferenceTable::load(&g).unwrap_err();
        assert!(matches!(err, ReconError::ReferenceLoad(_)));
        assert!(err.to_string().contains("two columns"));
    }

    #[test]
    fn empty_source_is_rejected() {
        let err = ReferenceTable::load(&grid(vec![])).unwrap_err();
        assert!(err.is_run_fatal());
    }

    #[test]
    fn source_without_numeric_keys_is_rejected() {
        let g = grid(vec![vec!["a".into(), "b".into()]]);
        assert!(ReferenceTable::load(&g).is_err());
    }
}
