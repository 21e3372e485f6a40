use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;

use crate::color::ColorMap;
use crate::config::DataLayout;
use crate::data::filter::{BheFilter, init_filter_state, selected_bhes};
use crate::data::loader::{LoadOptions, Period, load_table};
use crate::data::model::{BheId, Channel, FieldTable, Resolution, Vault};
use crate::error::Result;
use crate::figure::{FigureOptions, FigureRenderer};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Where the monthly files are read from.
    pub layout: DataLayout,
    pub resolution: Resolution,

    /// Inclusive day range to load.
    pub start: NaiveDate,
    pub end: NaiveDate,

    /// Blank out no-flow periods while loading.
    pub masked: bool,

    /// Channel shown in the main plot.
    pub channel: Channel,

    /// Loaded data (None until the user loads a period).
    pub table: Option<FieldTable>,

    /// Per-vault exchanger selection.
    pub filter: BheFilter,

    /// Selected exchangers present in the table (cached).
    pub visible: Vec<BheId>,

    pub colors: ColorMap,

    /// Show the flow rate of the visible exchangers below the main plot.
    pub show_flow: bool,

    /// Scale every line to 0..1.
    pub minmax_scaling: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a loading operation is in progress.
    pub loading: bool,
}

impl Default for AppState {
    fn default() -> Self {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        Self {
            layout: DataLayout::default(),
            resolution: Resolution::Prepared5min,
            start: day(2021, 8, 1),
            end: day(2021, 8, 31),
            masked: false,
            channel: Channel::InletTemperature,
            table: None,
            filter: BheFilter::new(),
            visible: Vec::new(),
            colors: ColorMap::default(),
            show_flow: true,
            minmax_scaling: false,
            status_message: None,
            loading: false,
        }
    }
}

impl AppState {
    /// Load options for the current period, every channel included.
    pub fn load_options(&self) -> Result<LoadOptions> {
        let start = self.start.and_hms_opt(0, 0, 0).unwrap_or_default();
        let end = self.end.and_hms_opt(23, 59, 59).unwrap_or_default();
        Ok(LoadOptions {
            period: Some(Period::new(start, end)?),
            bhes: None,
            channels: Channel::ALL.to_vec(),
            masked: self.masked,
        })
    }

    /// Read the current period from disk and replace the loaded table.
    pub fn load(&mut self) -> Result<()> {
        self.loading = true;
        let result = self
            .load_options()
            .and_then(|options| load_table(&self.layout, self.resolution, &options));
        self.loading = false;
        let table = result?;
        if table.is_empty() {
            log::warn!("No samples between {} and {}", self.start, self.end);
        }
        self.set_table(table);
        Ok(())
    }

    /// Ingest a newly loaded table, keeping the selection where possible.
    pub fn set_table(&mut self, table: FieldTable) {
        let previous: BTreeSet<BheId> = self.filter.values().flatten().copied().collect();
        self.filter = init_filter_state(&table);
        if !previous.is_empty() {
            for selected in self.filter.values_mut() {
                selected.retain(|b| previous.contains(b));
            }
        }
        self.table = Some(table);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute `visible` after a selection change.
    pub fn refilter(&mut self) {
        self.visible = match &self.table {
            Some(table) => selected_bhes(table, &self.filter),
            None => Vec::new(),
        };
    }

    pub fn toggle_bhe(&mut self, bhe: BheId) {
        let selected = self.filter.entry(bhe.vault()).or_default();
        if !selected.remove(&bhe) {
            selected.insert(bhe);
        }
        self.refilter();
    }

    /// Select every loaded exchanger of a vault.
    pub fn select_all(&mut self, vault: Vault) {
        let Some(table) = &self.table else {
            return;
        };
        let members: BTreeSet<BheId> = table
            .bhes()
            .into_iter()
            .filter(|b| b.vault() == vault)
            .collect();
        self.filter.insert(vault, members);
        self.refilter();
    }

    pub fn select_none(&mut self, vault: Vault) {
        self.filter.insert(vault, BTreeSet::new());
        self.refilter();
    }

    /// Render the visible exchangers of the current channel to an image
    /// file.
    pub fn export_figure(&self, path: &Path, options: FigureOptions) -> Result<()> {
        let series: Vec<_> = match &self.table {
            Some(table) => self
                .visible
                .iter()
                .filter_map(|b| table.series(*b, self.channel))
                .collect(),
            None => Vec::new(),
        };
        let title = format!(
            "{} ({}, {} to {})",
            self.channel, self.resolution, self.start, self.end
        );
        let renderer = FigureRenderer {
            options,
            colors: self.colors.clone(),
        };
        renderer.overlay(&title, &series)?.save(path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeDelta;

    use super::*;
    use crate::data::model::ColumnKey;
    use crate::error::Error;

    fn table(ids: &[u8]) -> FieldTable {
        let start = NaiveDate::from_ymd_opt(2021, 8, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timestamps = (0..2).map(|i| start + TimeDelta::minutes(5 * i)).collect();
        let columns = ids
            .iter()
            .map(|id| {
                (
                    ColumnKey::new(BheId::new(*id).unwrap(), Channel::InletTemperature),
                    vec![10.0, 10.5],
                )
            })
            .collect::<BTreeMap<_, _>>();
        FieldTable::from_parts(Resolution::Prepared5min, timestamps, columns)
    }

    fn bhe(id: u8) -> BheId {
        BheId::new(id).unwrap()
    }

    #[test]
    fn test_set_table_selects_everything() {
        let mut state = AppState::default();
        state.set_table(table(&[1, 2, 14]));
        assert_eq!(state.visible, vec![bhe(1), bhe(2), bhe(14)]);
    }

    #[test]
    fn test_selection_survives_reload() {
        let mut state = AppState::default();
        state.set_table(table(&[1, 2, 14]));
        state.toggle_bhe(bhe(2));
        assert_eq!(state.visible, vec![bhe(1), bhe(14)]);

        state.set_table(table(&[1, 2, 14, 30]));
        assert_eq!(state.visible, vec![bhe(1), bhe(14)]);
    }

    #[test]
    fn test_vault_select_all_none() {
        let mut state = AppState::default();
        state.set_table(table(&[1, 2, 14]));
        state.select_none(Vault::West);
        assert_eq!(state.visible, vec![bhe(14)]);
        state.select_all(Vault::West);
        assert_eq!(state.visible, vec![bhe(1), bhe(2), bhe(14)]);
    }

    #[test]
    fn test_load_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut state = AppState {
            layout: DataLayout::new(tmp.path()),
            ..AppState::default()
        };
        assert!(matches!(state.load(), Err(Error::MissingData { .. })));
        assert!(state.table.is_none());
        assert!(!state.loading);
    }

    #[test]
    fn test_export_figure_requires_selection() {
        let tmp = tempfile::tempdir().unwrap();
        let mut state = AppState::default();
        state.set_table(table(&[1]));
        let options = FigureOptions {
            width: 200,
            height: 150,
            annotate: false,
        };
        let path = tmp.path().join("plot.png");
        state.export_figure(&path, options).unwrap();
        assert!(path.is_file());

        state.select_none(Vault::West);
        assert!(matches!(
            state.export_figure(&path, options),
            Err(Error::EmptyInput(_))
        ));
    }
}
