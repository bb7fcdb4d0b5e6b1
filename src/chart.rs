// Chart Renderer - per-product price series and the line-chart configuration
//
// The chart itself is drawn by an external component (`ChartBackend`). This module
// only builds the declarative configuration and owns the single live instance.

use crate::record::Record;
use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

/// Value axis title
pub const PRICE_AXIS_TITLE: &str = "Prix (€/kg)";

/// Time axis title
pub const DATE_AXIS_TITLE: &str = "Date";

// ============================================================================
// SERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// Wire date string, parsed by the time axis
    pub x: String,
    pub y: f64,
}

/// All observations of one product, in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<Point>,
}

/// Group by product: one series per distinct product, first-seen order.
///
/// Points are not sorted; callers wanting temporal order sort beforehand.
pub fn group_series(records: &[Record]) -> Vec<Series> {
    let mut by_product: IndexMap<&str, Vec<Point>> = IndexMap::new();

    for record in records {
        by_product.entry(record.product.as_str()).or_default().push(Point {
            x: record.date.clone(),
            y: record.price,
        });
    }

    by_product
        .into_iter()
        .map(|(label, points)| Series {
            label: label.to_string(),
            points,
        })
        .collect()
}

/// `#RRGGBB` with uppercase hex digits. Not stable, not guaranteed distinct.
pub fn random_color<R: Rng>(rng: &mut R) -> String {
    format!("#{:06X}", rng.gen_range(0..=0xFF_FFFFu32))
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Declarative line-chart configuration.
///
/// Serializes to the object shape web chart libraries take
/// (`{ type, data: { datasets }, options }`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Point>,
    pub border_color: String,
    pub background_color: &'static str,
    pub tension: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub maintain_aspect_ratio: bool,
    pub scales: Scales,
    pub plugins: Plugins,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scales {
    pub x: TimeAxis,
    pub y: ValueAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeAxis {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub time: TimeScale,
    pub title: AxisTitle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeScale {
    pub unit: &'static str,
    pub tooltip_format: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueAxis {
    pub begin_at_zero: bool,
    pub title: AxisTitle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTitle {
    pub display: bool,
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plugins {
    pub tooltip: TooltipOptions,
    pub legend: LegendOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipOptions {
    pub mode: &'static str,
    pub intersect: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendOptions {
    pub position: &'static str,
}

impl ChartConfig {
    /// Line chart over `series`, one fresh random color per series.
    pub fn line<R: Rng>(series: Vec<Series>, rng: &mut R) -> Self {
        let datasets = series
            .into_iter()
            .map(|s| Dataset {
                label: s.label,
                data: s.points,
                border_color: random_color(&mut *rng),
                background_color: "rgba(0, 0, 0, 0)",
                tension: 0.1,
            })
            .collect();

        ChartConfig {
            kind: "line",
            data: ChartData { datasets },
            options: ChartOptions {
                responsive: true,
                maintain_aspect_ratio: false,
                scales: Scales {
                    x: TimeAxis {
                        kind: "time",
                        time: TimeScale {
                            unit: "month",
                            tooltip_format: "dd MMM yyyy",
                        },
                        title: AxisTitle { display: true, text: DATE_AXIS_TITLE },
                    },
                    y: ValueAxis {
                        // Small price moves stay visible
                        begin_at_zero: false,
                        title: AxisTitle { display: true, text: PRICE_AXIS_TITLE },
                    },
                },
                plugins: Plugins {
                    tooltip: TooltipOptions { mode: "index", intersect: false },
                    legend: LegendOptions { position: "top" },
                },
            },
        }
    }

    /// Group `records` and build the configuration in one step.
    pub fn from_records<R: Rng>(records: &[Record], rng: &mut R) -> Self {
        Self::line(group_series(records), rng)
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.data.datasets
    }
}

// ============================================================================
// LIVE INSTANCE
// ============================================================================

/// External line-chart component.
pub trait ChartBackend {
    /// Resource held while a chart is displayed
    type Instance;

    fn create(&mut self, config: ChartConfig) -> Self::Instance;

    /// Release everything `instance` holds on the drawing surface.
    fn destroy(&mut self, instance: Self::Instance);
}

/// Owner of the one chart drawn on a surface.
///
/// At most one instance is live: `replace` destroys the previous one before
/// creating the next, and dropping the surface destroys whatever is left.
pub struct ChartSurface<B: ChartBackend> {
    backend: B,
    live: Option<B::Instance>,
    renders: u64,
}

impl<B: ChartBackend> ChartSurface<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            live: None,
            renders: 0,
        }
    }

    /// Dispose the current chart, if any, then draw `config`.
    pub fn replace(&mut self, config: ChartConfig) {
        self.clear();
        debug!(datasets = config.datasets().len(), "creating chart instance");
        self.live = Some(self.backend.create(config));
        self.renders += 1;
    }

    /// Dispose the current chart without drawing a new one.
    pub fn clear(&mut self) {
        if let Some(previous) = self.live.take() {
            debug!("destroying chart instance");
            self.backend.destroy(previous);
        }
    }

    pub fn live(&self) -> Option<&B::Instance> {
        self.live.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Number of charts created over the surface lifetime
    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: ChartBackend> Drop for ChartSurface<B> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Backend that keeps each configuration and counts lifecycle calls.
///
/// Used for headless runs (the configuration is what would be handed to a
/// web renderer) and by tests checking the one-live-instance rule.
#[derive(Debug, Default)]
pub struct RetainedBackend {
    pub created: usize,
    pub destroyed: usize,
}

impl RetainedBackend {
    pub fn live_count(&self) -> usize {
        self.created - self.destroyed
    }
}

impl ChartBackend for RetainedBackend {
    type Instance = ChartConfig;

    fn create(&mut self, config: ChartConfig) -> ChartConfig {
        self.created += 1;
        config
    }

    fn destroy(&mut self, _instance: ChartConfig) {
        self.destroyed += 1;
    }
}
