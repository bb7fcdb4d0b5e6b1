// Interaction Controller - owns the record store, the filter inputs and the chart
//
// Every recognized event re-reads the inputs and recomputes everything from the
// full store. Nothing is diffed and nothing is debounced.

use crate::chart::{ChartBackend, ChartConfig, ChartSurface};
use crate::error::{DashboardError, Result};
use crate::export::write_export;
use crate::filter::{filter, FilterCriteria, Selection};
use crate::record::{Record, RecordStore};
use crate::table::{render_rows, TableRow};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const LOADING_TITLE: &str = "Chargement des données...";
pub const FETCH_ERROR_TITLE: &str = "Erreur : Le serveur backend n'est pas accessible.";
pub const FETCH_ERROR_HINT: &str =
    "Assurez-vous que le serveur de données (mercuriales-server) est en cours d'exécution.";

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    Ready,
    /// Fetch failed; inert until the next reload
    Failed { reason: String },
}

/// User input the dashboard reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    SearchChanged(String),
    YearChanged(String),
    MarketChanged(String),
    ExportRequested,
}

/// What handling an event did
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Title, table and chart were rebuilt
    Redrawn,
    /// Input stored, view left alone (not ready)
    Inert,
    Exported(PathBuf),
    NothingToExport,
}

pub struct Dashboard<B: ChartBackend> {
    phase: Phase,
    store: RecordStore,
    inputs: FilterCriteria,
    title: String,
    rows: Vec<TableRow>,
    chart: ChartSurface<B>,
    export_dir: PathBuf,
}

impl<B: ChartBackend> Dashboard<B> {
    pub fn new(backend: B, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            phase: Phase::Loading,
            store: RecordStore::new(),
            inputs: FilterCriteria::default(),
            title: LOADING_TITLE.to_string(),
            rows: Vec::new(),
            chart: ChartSurface::new(backend),
            export_dir: export_dir.into(),
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Settle the pending fetch: populate and render, or show the diagnostic.
    pub fn on_fetch_complete(&mut self, result: Result<Vec<Record>>) {
        match result {
            Ok(records) => {
                info!(count = records.len(), "record store loaded");
                self.store.replace(records);
                self.phase = Phase::Ready;
                self.recompute();
            }
            Err(err) => {
                warn!(error = %err, "unable to fetch records");
                self.phase = Phase::Failed { reason: err.to_string() };
                self.title = FETCH_ERROR_TITLE.to_string();
                self.rows = vec![TableRow::notice(FETCH_ERROR_HINT)];
                self.chart.clear();
            }
        }
    }

    /// Drop everything and wait for a new fetch, like reloading the page.
    ///
    /// Filter inputs survive; the caller runs the fetch and hands the result to
    /// `on_fetch_complete`.
    pub fn begin_reload(&mut self) {
        info!("reloading record store");
        self.phase = Phase::Loading;
        self.store.replace(Vec::new());
        self.title = LOADING_TITLE.to_string();
        self.rows.clear();
        self.chart.clear();
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    pub fn handle(&mut self, event: UiEvent) -> Result<Response> {
        debug!(?event, "ui event");

        match event {
            UiEvent::SearchChanged(text) => self.inputs.search_term = text,
            UiEvent::YearChanged(value) => self.inputs.year = Selection::parse(&value),
            UiEvent::MarketChanged(value) => self.inputs.market = Selection::parse(&value),
            UiEvent::ExportRequested => return self.export(),
        }

        if self.recompute() {
            Ok(Response::Redrawn)
        } else {
            Ok(Response::Inert)
        }
    }

    /// Full recompute: filter, title, table, chart. Returns false when not ready.
    pub fn recompute(&mut self) -> bool {
        if self.phase != Phase::Ready {
            return false;
        }

        let filtered = self.filtered();
        self.title = format!("Résultats ({} trouvé(s))", filtered.len());
        self.rows = render_rows(&filtered);
        self.chart
            .replace(ChartConfig::from_records(&filtered, &mut rand::thread_rng()));

        true
    }

    /// Re-filter and write the CSV. An empty selection is a notice, not an error.
    pub fn export(&self) -> Result<Response> {
        let filtered = self.filtered();

        match write_export(&self.export_dir, &filtered) {
            Ok(path) => Ok(Response::Exported(path)),
            Err(DashboardError::NothingToExport) => {
                info!("export requested with an empty selection");
                Ok(Response::NothingToExport)
            }
            Err(err) => Err(err),
        }
    }

    // ========================================================================
    // VIEW
    // ========================================================================

    /// Criteria as currently entered
    pub fn criteria(&self) -> &FilterCriteria {
        &self.inputs
    }

    pub fn filtered(&self) -> Vec<Record> {
        filter(self.store.records(), &self.inputs)
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn chart(&self) -> &ChartSurface<B> {
        &self.chart
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// `all` followed by the years in the store, newest first
    pub fn year_options(&self) -> Vec<Selection> {
        std::iter::once(Selection::All)
            .chain(
                self.store
                    .available_years()
                    .into_iter()
                    .map(|year| Selection::Only(year.to_string())),
            )
            .collect()
    }

    /// `all` followed by the markets in the store
    pub fn market_options(&self) -> Vec<Selection> {
        std::iter::once(Selection::All)
            .chain(self.store.available_markets().into_iter().map(Selection::Only))
            .collect()
    }
}
