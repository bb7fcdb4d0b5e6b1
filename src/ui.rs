use crate::chart::{ChartBackend, ChartConfig};
use crate::dashboard::{Dashboard, Phase, Response, UiEvent};
use crate::error::{DashboardError, Result as FetchResult};
use crate::export::NOTHING_TO_EXPORT;
use crate::filter::Selection;
use crate::record::{parse_date, Record};
use crate::table::{TableRow, COLUMNS};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{error, info};

// ============================================================================
// TERMINAL CHART
// ============================================================================

/// Draws chart configurations with ratatui's line chart.
#[derive(Debug, Default)]
pub struct TerminalChartBackend;

/// One product line, x in days since the common era
#[derive(Debug, Clone)]
pub struct PlotSeries {
    pub label: String,
    pub color: Color,
    pub points: Vec<(f64, f64)>,
}

/// Live chart: everything needed to draw the frame, computed once per render
#[derive(Debug, Clone)]
pub struct TerminalChart {
    pub series: Vec<PlotSeries>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_title: &'static str,
    pub y_title: &'static str,
}

impl ChartBackend for TerminalChartBackend {
    type Instance = TerminalChart;

    fn create(&mut self, config: ChartConfig) -> TerminalChart {
        TerminalChart::from_config(config)
    }

    fn destroy(&mut self, instance: TerminalChart) {
        drop(instance);
    }
}

impl TerminalChart {
    fn from_config(config: ChartConfig) -> Self {
        let x_title = config.options.scales.x.title.text;
        let y_title = config.options.scales.y.title.text;

        let series: Vec<PlotSeries> = config
            .data
            .datasets
            .into_iter()
            .map(|dataset| PlotSeries {
                color: hex_color(&dataset.border_color),
                points: dataset
                    .data
                    .iter()
                    .filter_map(|p| parse_date(&p.x).map(|d| (d.num_days_from_ce() as f64, p.y)))
                    .collect(),
                label: dataset.label,
            })
            .collect();

        let xs = series.iter().flat_map(|s| s.points.iter().map(|p| p.0));
        let ys = series.iter().flat_map(|s| s.points.iter().map(|p| p.1));

        TerminalChart {
            x_bounds: padded_bounds(xs, 0.02, 15.0),
            // Value axis does not start at zero
            y_bounds: padded_bounds(ys, 0.05, 0.5),
            series,
            x_title,
            y_title,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    /// Month labels at both ends and the middle of the time axis
    fn x_labels(&self) -> Vec<Span<'static>> {
        let [lo, hi] = self.x_bounds;
        [lo, (lo + hi) / 2.0, hi]
            .iter()
            .map(|days| {
                let label = NaiveDate::from_num_days_from_ce_opt(*days as i32)
                    .map(|d| d.format("%m/%Y").to_string())
                    .unwrap_or_default();
                Span::raw(label)
            })
            .collect()
    }

    fn y_labels(&self) -> Vec<Span<'static>> {
        let [lo, hi] = self.y_bounds;
        [lo, (lo + hi) / 2.0, hi]
            .iter()
            .map(|v| Span::raw(format!("{:.2}", v)))
            .collect()
    }
}

fn padded_bounds(values: impl Iterator<Item = f64>, ratio: f64, flat_pad: f64) -> [f64; 2] {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }

    let pad = if max - min > f64::EPSILON {
        (max - min) * ratio
    } else {
        flat_pad.max(max.abs() * ratio)
    };
    [min - pad, max + pad]
}

/// `#RRGGBB` -> RGB color
pub fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Color::White;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::White,
    }
}

// ============================================================================
// APP STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Search,
    Year,
    Market,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::Search => Focus::Year,
            Focus::Year => Focus::Market,
            Focus::Market => Focus::Search,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Focus::Search => Focus::Market,
            Focus::Year => Focus::Search,
            Focus::Market => Focus::Year,
        }
    }
}

/// Result of a fetch running elsewhere, delivered once
pub type PendingFetch = oneshot::Receiver<FetchResult<Vec<Record>>>;

/// Result of one key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Reload,
    Quit,
}

pub struct App {
    pub dashboard: Dashboard<TerminalChartBackend>,
    pub focus: Focus,
    pub search: String,
    pub year_index: usize,
    pub market_index: usize,
    pub state: TableState,
    pub notice: Option<String>,
    pending: Option<PendingFetch>,
}

impl App {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            dashboard: Dashboard::new(TerminalChartBackend, export_dir),
            focus: Focus::Search,
            search: String::new(),
            year_index: 0,
            market_index: 0,
            state: TableState::default(),
            notice: None,
            pending: None,
        }
    }

    /// Track an in-flight fetch. A previous one is abandoned.
    pub fn await_fetch(&mut self, pending: PendingFetch) {
        self.pending = Some(pending);
    }

    pub fn is_fetching(&self) -> bool {
        self.pending.is_some()
    }

    /// Settle the in-flight fetch if its result has arrived; true when settled.
    pub fn poll_fetch(&mut self) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };

        let result = match pending.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Closed) => Err(DashboardError::FetchAborted),
        };

        self.pending = None;
        self.on_fetch_complete(result);
        true
    }

    pub fn on_fetch_complete(&mut self, result: FetchResult<Vec<Record>>) {
        self.dashboard.on_fetch_complete(result);
        self.sync_selectors();
        self.reset_selection();
    }

    /// Translate a key press into dashboard events
    pub fn on_key(&mut self, key: KeyEvent) -> Result<KeyOutcome> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return Ok(KeyOutcome::Quit),
                KeyCode::Char('e') => {
                    self.export()?;
                    return Ok(KeyOutcome::Continue);
                }
                _ => return Ok(KeyOutcome::Continue),
            }
        }

        match key.code {
            KeyCode::Esc => return Ok(KeyOutcome::Quit),
            KeyCode::Char('q') if self.focus != Focus::Search => return Ok(KeyOutcome::Quit),
            KeyCode::F(5) => return Ok(KeyOutcome::Reload),
            KeyCode::F(2) => self.export()?,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.previous(),
            KeyCode::Char(c) if self.focus == Focus::Search => {
                self.search.push(c);
                self.send(UiEvent::SearchChanged(self.search.clone()))?;
            }
            KeyCode::Backspace if self.focus == Focus::Search => {
                if self.search.pop().is_some() {
                    self.send(UiEvent::SearchChanged(self.search.clone()))?;
                }
            }
            KeyCode::Left if self.focus != Focus::Search => self.cycle_selector(false)?,
            KeyCode::Right if self.focus != Focus::Search => self.cycle_selector(true)?,
            KeyCode::Down => self.next(),
            KeyCode::Up => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.state.select(Some(0)),
            KeyCode::End => {
                let len = self.row_count();
                if len > 0 {
                    self.state.select(Some(len - 1));
                }
            }
            _ => {}
        }

        Ok(KeyOutcome::Continue)
    }

    fn send(&mut self, event: UiEvent) -> Result<()> {
        if self.dashboard.handle(event)? == Response::Redrawn {
            self.reset_selection();
        }
        Ok(())
    }

    fn export(&mut self) -> Result<()> {
        self.notice = Some(match self.dashboard.export() {
            Ok(Response::Exported(path)) => format!("Export : {}", path.display()),
            Ok(_) => NOTHING_TO_EXPORT.to_string(),
            Err(err) => {
                error!(error = %err, "export failed");
                format!("Échec de l'export : {}", err)
            }
        });
        Ok(())
    }

    fn cycle_selector(&mut self, forward: bool) -> Result<()> {
        let (options, index) = match self.focus {
            Focus::Year => (self.dashboard.year_options(), &mut self.year_index),
            Focus::Market => (self.dashboard.market_options(), &mut self.market_index),
            Focus::Search => return Ok(()),
        };

        let len = options.len();
        *index = if forward {
            (*index + 1) % len
        } else {
            (*index + len - 1) % len
        };
        let value = options[*index].to_string();

        let event = match self.focus {
            Focus::Year => UiEvent::YearChanged(value),
            _ => UiEvent::MarketChanged(value),
        };
        self.send(event)
    }

    /// Point the selectors at the current criteria after the store changed
    fn sync_selectors(&mut self) {
        let criteria = self.dashboard.criteria();
        self.year_index = self
            .dashboard
            .year_options()
            .iter()
            .position(|option| option == &criteria.year)
            .unwrap_or(0);
        self.market_index = self
            .dashboard
            .market_options()
            .iter()
            .position(|option| option == &criteria.market)
            .unwrap_or(0);
    }

    fn reset_selection(&mut self) {
        if self.row_count() > 0 {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    fn row_count(&self) -> usize {
        self.dashboard
            .rows()
            .iter()
            .filter(|row| matches!(row, TableRow::Entry { .. }))
            .count()
    }

    fn selector_label(&self, focus: Focus) -> String {
        let criteria = self.dashboard.criteria();
        let (selection, all_label) = match focus {
            Focus::Year => (&criteria.year, "Toutes les années"),
            Focus::Market => (&criteria.market, "Tous les marchés"),
            Focus::Search => return self.search.clone(),
        };
        match selection {
            Selection::Only(value) => value.clone(),
            Selection::All => all_label.to_string(),
        }
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(20),
            None => 0,
        };
        self.state.select(Some(i));
    }
}

// ============================================================================
// EVENT LOOP
// ============================================================================

/// How long the loop waits for a key before checking the pending fetch
const TICK: Duration = Duration::from_millis(100);

/// Run the dashboard until the user quits.
///
/// `fetch` starts the data fetch and returns without waiting for it. It is
/// called once at startup and again on every manual reload; keys stay live
/// while the result is pending.
pub fn run_ui<F>(app: &mut App, mut fetch: F) -> Result<()>
where
    F: FnMut() -> PendingFetch,
{
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, &mut fetch);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B, F>(terminal: &mut Terminal<B>, app: &mut App, fetch: &mut F) -> Result<()>
where
    B: ratatui::backend::Backend,
    F: FnMut() -> PendingFetch,
{
    app.await_fetch(fetch());

    loop {
        app.poll_fetch();
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match app.on_key(key)? {
                KeyOutcome::Quit => return Ok(()),
                KeyOutcome::Reload => {
                    info!("manual reload");
                    app.dashboard.begin_reload();
                    app.notice = None;
                    app.await_fetch(fetch());
                }
                KeyOutcome::Continue => {}
            }
        }
    }
}

// ============================================================================
// DRAWING
// ============================================================================

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Title
            Constraint::Length(3),      // Filters
            Constraint::Min(6),         // Table
            Constraint::Percentage(40), // Chart
            Constraint::Length(3),      // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_filters(f, chunks[1], app);
    render_table(f, chunks[2], app);
    render_chart(f, chunks[3], app);
    render_status_bar(f, chunks[4], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let title_style = match app.dashboard.phase() {
        Phase::Failed { .. } => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Phase::Loading => Style::default().fg(Color::DarkGray),
        Phase::Ready => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    };

    let header_text = vec![Line::from(vec![
        Span::styled("Mercuriales", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("  |  "),
        Span::styled(app.dashboard.title().to_string(), title_style),
    ])];

    let header = Paragraph::new(header_text)
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_filters(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    let fields = [
        (Focus::Search, " Produit ", chunks[0]),
        (Focus::Year, " Année ", chunks[1]),
        (Focus::Market, " Marché ", chunks[2]),
    ];

    for (focus, title, chunk) in fields {
        let border = if focus == app.focus {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let text = if focus == Focus::Search {
            app.search.clone()
        } else {
            format!("◀ {} ▶", app.selector_label(focus))
        };

        let widget = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).border_style(border).title(title));
        f.render_widget(widget, chunk);
    }

    if app.focus == Focus::Search {
        let cursor_x = chunks[0].x + 1 + app.search.chars().count() as u16;
        f.set_cursor(cursor_x.min(chunks[0].right().saturating_sub(2)), chunks[0].y + 1);
    }
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = COLUMNS.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let failed = matches!(app.dashboard.phase(), Phase::Failed { .. });
    let rows = app.dashboard.rows().iter().map(|row| match row {
        TableRow::Notice { text } => {
            let color = if failed { Color::Red } else { Color::DarkGray };
            Row::new(vec![Cell::from(text.clone()).style(Style::default().fg(color))])
        }
        TableRow::Entry { date, product, price, market } => Row::new(vec![
            Cell::from(date.clone()),
            Cell::from(product.clone()),
            Cell::from(price.clone()).style(Style::default().fg(Color::Green)),
            Cell::from(market.clone()),
        ]),
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(24),
            Constraint::Length(16),
            Constraint::Length(18),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Relevés "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_chart(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Évolution des prix ");

    let chart = match app.dashboard.chart().live() {
        Some(chart) if !chart.is_empty() => chart,
        _ => {
            f.render_widget(Paragraph::new("").block(block), area);
            return;
        }
    };

    let datasets: Vec<Dataset> = chart
        .series
        .iter()
        .map(|s| {
            Dataset::default()
                .name(s.label.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(s.color))
                .data(&s.points)
        })
        .collect();

    let widget = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title(chart.x_title)
                .style(Style::default().fg(Color::Gray))
                .bounds(chart.x_bounds)
                .labels(chart.x_labels()),
        )
        .y_axis(
            Axis::default()
                .title(chart.y_title)
                .style(Style::default().fg(Color::Gray))
                .bounds(chart.y_bounds)
                .labels(chart.y_labels()),
        );

    f.render_widget(widget, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Ligne : {}/{} ", selected, app.row_count()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(notice) = &app.notice {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(notice.clone(), Style::default().fg(Color::Green)));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Filtre | "));
    status_spans.push(Span::styled("←/→", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Choix | "));
    status_spans.push(Span::styled("F2", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Export CSV | "));
    status_spans.push(Span::styled("F5", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Recharger | "));
    status_spans.push(Span::styled("Esc", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quitter"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::EXPORT_FILENAME;
    use crate::record::sample_record;
    use ratatui::backend::TestBackend;
    use tempfile::tempdir;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn loaded_app(dir: &std::path::Path) -> App {
        let mut app = App::new(dir);
        app.on_fetch_complete(Ok(vec![
            sample_record("2024-01-10", "Wheat", 1.5, "A", 2024),
            sample_record("2023-06-01", "Corn", 2.0, "B", 2023),
            sample_record("2024-03-10", "Wheat", 1.7, "A", 2024),
        ]));
        app
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#FF8000"), Color::Rgb(255, 128, 0));
        assert_eq!(hex_color("#12"), Color::White);
        assert_eq!(hex_color("#GGGGGG"), Color::White);
    }

    #[test]
    fn test_hex_color_non_ascii() {
        assert_eq!("#ééé".len(), 7);
        assert_eq!(hex_color("#ééé"), Color::White);
        assert_eq!(hex_color("€€"), Color::White);
    }

    #[test]
    fn test_keys_live_while_fetch_pending() {
        let dir = tempdir().unwrap();
        let mut app = App::new(dir.path());
        let (_tx, rx) = oneshot::channel();
        app.await_fetch(rx);

        assert!(!app.poll_fetch());
        assert!(app.is_fetching());
        assert_eq!(app.dashboard.phase(), &Phase::Loading);

        app.on_key(press(KeyCode::Char('w'))).unwrap();
        assert_eq!(app.dashboard.criteria().search_term, "w");
        assert_eq!(app.on_key(press(KeyCode::Esc)).unwrap(), KeyOutcome::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.on_key(ctrl_c).unwrap(), KeyOutcome::Quit);
    }

    #[test]
    fn test_fetch_result_settles_on_poll() {
        let dir = tempdir().unwrap();
        let mut app = App::new(dir.path());
        let (tx, rx) = oneshot::channel();
        app.await_fetch(rx);

        tx.send(Ok(vec![sample_record("2024-01-10", "Wheat", 1.5, "A", 2024)]))
            .unwrap();

        assert!(app.poll_fetch());
        assert!(!app.is_fetching());
        assert_eq!(app.dashboard.phase(), &Phase::Ready);
        assert_eq!(app.row_count(), 1);
        assert!(!app.poll_fetch());
    }

    #[test]
    fn test_dropped_fetch_fails() {
        let dir = tempdir().unwrap();
        let mut app = App::new(dir.path());
        let (tx, rx) = oneshot::channel::<FetchResult<Vec<Record>>>();
        app.await_fetch(rx);
        drop(tx);

        assert!(app.poll_fetch());
        assert!(matches!(app.dashboard.phase(), Phase::Failed { .. }));
    }

    #[test]
    fn test_reload_abandons_previous_fetch() {
        let dir = tempdir().unwrap();
        let mut app = App::new(dir.path());
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();

        app.await_fetch(first_rx);
        app.await_fetch(second_rx);

        assert!(first_tx.send(Ok(Vec::new())).is_err());
        assert!(!app.poll_fetch());

        second_tx
            .send(Ok(vec![sample_record("2023-06-01", "Corn", 2.0, "B", 2023)]))
            .unwrap();
        assert!(app.poll_fetch());
        assert_eq!(app.dashboard.store().len(), 1);
    }

    #[test]
    fn test_terminal_chart_from_config() {
        let records = vec![
            sample_record("2024-01-10", "Wheat", 1.5, "A", 2024),
            sample_record("not a date", "Wheat", 9.0, "A", 2024),
            sample_record("2024-03-10", "Wheat", 1.7, "A", 2024),
        ];
        let config = ChartConfig::from_records(&records, &mut rand::thread_rng());
        let chart = TerminalChartBackend.create(config);

        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].points.len(), 2);
        assert!(chart.y_bounds[0] < 1.5 && chart.y_bounds[1] > 1.7);
        assert!(chart.y_bounds[0] > 0.0);
        assert!(!chart.is_empty());
    }

    #[test]
    fn test_typing_filters_table() {
        let dir = tempdir().unwrap();
        let mut app = loaded_app(dir.path());
        assert_eq!(app.row_count(), 3);

        for c in "co".chars() {
            app.on_key(press(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(app.search, "co");
        assert_eq!(app.row_count(), 1);
        assert_eq!(app.state.selected(), Some(0));

        app.on_key(press(KeyCode::Backspace)).unwrap();
        app.on_key(press(KeyCode::Backspace)).unwrap();
        assert_eq!(app.row_count(), 3);
    }

    #[test]
    fn test_q_types_in_search_but_quits_elsewhere() {
        let dir = tempdir().unwrap();
        let mut app = loaded_app(dir.path());

        assert_eq!(app.on_key(press(KeyCode::Char('q'))).unwrap(), KeyOutcome::Continue);
        assert_eq!(app.search, "q");

        app.on_key(press(KeyCode::Tab)).unwrap();
        assert_eq!(app.focus, Focus::Year);
        assert_eq!(app.on_key(press(KeyCode::Char('q'))).unwrap(), KeyOutcome::Quit);
        assert_eq!(app.on_key(press(KeyCode::Esc)).unwrap(), KeyOutcome::Quit);
        assert_eq!(app.on_key(press(KeyCode::F(5))).unwrap(), KeyOutcome::Reload);
    }

    #[test]
    fn test_selectors_cycle_through_store_values() {
        let dir = tempdir().unwrap();
        let mut app = loaded_app(dir.path());

        app.on_key(press(KeyCode::Tab)).unwrap();
        app.on_key(press(KeyCode::Right)).unwrap();
        assert_eq!(app.selector_label(Focus::Year), "2024");
        assert_eq!(app.row_count(), 2);

        app.on_key(press(KeyCode::Right)).unwrap();
        assert_eq!(app.selector_label(Focus::Year), "2023");
        assert_eq!(app.row_count(), 1);

        // Wraps back to "all"
        app.on_key(press(KeyCode::Right)).unwrap();
        assert_eq!(app.selector_label(Focus::Year), "Toutes les années");
        assert_eq!(app.row_count(), 3);

        app.on_key(press(KeyCode::Tab)).unwrap();
        app.on_key(press(KeyCode::Left)).unwrap();
        assert_eq!(app.selector_label(Focus::Market), "B");
        assert_eq!(app.row_count(), 1);
    }

    #[test]
    fn test_export_keys_set_notice() {
        let dir = tempdir().unwrap();
        let mut app = loaded_app(dir.path());

        app.on_key(press(KeyCode::F(2))).unwrap();
        assert!(dir.path().join(EXPORT_FILENAME).exists());
        assert!(app.notice.as_deref().unwrap().starts_with("Export"));

        for c in "zzz".chars() {
            app.on_key(press(KeyCode::Char(c))).unwrap();
        }
        app.on_key(KeyEvent::new(KeyCode::Char('e'), KeyModifiers::CONTROL)).unwrap();
        assert_eq!(app.notice.as_deref(), Some(NOTHING_TO_EXPORT));
    }

    #[test]
    fn test_navigation_wraps() {
        let dir = tempdir().unwrap();
        let mut app = loaded_app(dir.path());

        app.previous();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(2));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_draws_ready_and_failed_frames() {
        let dir = tempdir().unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();

        let mut app = loaded_app(dir.path());
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let mut failed = App::new(dir.path());
        failed.on_fetch_complete(Err(DashboardError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)));
        terminal.draw(|f| ui(f, &mut failed)).unwrap();
        assert!(failed.dashboard.chart().live().is_none());
    }
}
