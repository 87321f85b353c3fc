use crate::models::QueryRecord;
use crate::services::aggregator;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    symbols,
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset, Gauge, GraphType, List, ListItem,
        Paragraph, Row, Table, Tabs, Wrap,
    },
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tokio::time::sleep;

const TAB_COUNT: usize = 4;

/// Full-screen session dashboard: KPIs, charts, and the history table
pub struct DashboardUI {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    selected_tab: usize,
    scroll_offset: usize,
}

impl DashboardUI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            selected_tab: 0,
            scroll_offset: 0,
        })
    }

    /// Main UI loop over a snapshot of the session history
    pub async fn run(&mut self, records: &[QueryRecord]) -> Result<()> {
        loop {
            let selected_tab = self.selected_tab;
            let scroll_offset = self.scroll_offset;
            self.terminal.draw(|frame| {
                Self::draw_ui_static(frame, records, selected_tab, scroll_offset);
            })?;

            if self.handle_input().await? {
                break;
            }

            // Small delay to prevent excessive CPU usage
            sleep(Duration::from_millis(50)).await;
        }

        Ok(())
    }

    /// Handle keyboard input
    async fn handle_input(&mut self) -> Result<bool> {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(KeyEvent { code, modifiers, .. }) = event::read()? {
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
                    KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(true);
                    }
                    KeyCode::Tab => {
                        self.selected_tab = (self.selected_tab + 1) % TAB_COUNT;
                    }
                    KeyCode::BackTab => {
                        self.selected_tab = if self.selected_tab == 0 {
                            TAB_COUNT - 1
                        } else {
                            self.selected_tab - 1
                        };
                    }
                    KeyCode::Up => {
                        self.scroll_offset = self.scroll_offset.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        self.scroll_offset = self.scroll_offset.saturating_add(1);
                    }
                    _ => {}
                }
            }
        }
        Ok(false)
    }

    /// Draw the main UI (static version for terminal callback)
    fn draw_ui_static(frame: &mut Frame, records: &[QueryRecord], selected_tab: usize, scroll_offset: usize) {
        let size = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(3), // Tabs
                Constraint::Min(10),   // Main content
                Constraint::Length(3), // Footer
            ])
            .split(size);

        Self::draw_header(frame, chunks[0]);
        Self::draw_tabs(frame, chunks[1], selected_tab);

        match selected_tab {
            0 => Self::draw_overview_tab(frame, chunks[2], records),
            1 => Self::draw_charts_tab(frame, chunks[2], records),
            2 => Self::draw_history_tab(frame, chunks[2], records, scroll_offset),
            3 => Self::draw_about_tab(frame, chunks[2]),
            _ => {}
        }

        Self::draw_footer(frame, chunks[3]);
    }

    /// Draw application header
    fn draw_header(frame: &mut Frame, area: Rect) {
        let build_time = env!("AI_ENERGY_MONITOR_BUILD_TIME", "unknown");
        let version = env!("CARGO_PKG_VERSION");

        let header_text = format!("AI Energy Monitor v{version} (Built: {build_time})");

        let title = Paragraph::new(header_text)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Blue)),
            );
        frame.render_widget(title, area);
    }

    /// Draw tab navigation
    fn draw_tabs(frame: &mut Frame, area: Rect, selected_tab: usize) {
        let tab_titles = vec!["Overview", "Charts", "History", "About"];
        let tabs = Tabs::new(tab_titles)
            .block(Block::default().borders(Borders::ALL).title("Navigation"))
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .select(selected_tab);
        frame.render_widget(tabs, area);
    }

    /// Draw overview tab: latest response, its footprint share, session totals
    fn draw_overview_tab(frame: &mut Frame, area: Rect, records: &[QueryRecord]) {
        if records.is_empty() {
            Self::draw_no_data(frame, area);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(8),    // Latest response
                Constraint::Length(3), // CO2 share gauge
                Constraint::Length(9), // Statistics
            ])
            .split(area);

        if let Some(latest) = records.last() {
            Self::draw_latest_response(frame, chunks[0], latest);
            Self::draw_co2_share_gauge(frame, chunks[1], latest, records);
        }
        Self::draw_statistics_table(frame, chunks[2], records);
    }

    /// Draw the latest response with its per-call KPIs
    fn draw_latest_response(frame: &mut Frame, area: Rect, latest: &QueryRecord) {
        let mut lines = vec![
            Line::from(vec![
                Span::raw("Model: "),
                Span::styled(latest.model.clone(), Style::default().fg(Color::Cyan)),
                Span::raw("   Query #"),
                Span::styled(latest.id.to_string(), Style::default().fg(Color::Yellow)),
            ]),
            Line::from(vec![
                Span::raw("Tokens: "),
                Span::styled(
                    format!(
                        "{} in / {} out / {} total",
                        latest.input_tokens, latest.output_tokens, latest.total_tokens
                    ),
                    Style::default().fg(Color::White),
                ),
            ]),
            Line::from(vec![
                Span::raw("Footprint: "),
                Span::styled(
                    format!("{:.6} kWh / {:.6} kg CO2", latest.energy_kwh, latest.co2_kg),
                    Style::default().fg(Color::Green),
                ),
            ]),
            Line::from(""),
        ];
        lines.extend(latest.response.lines().map(|l| Line::from(l.to_string())));

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .title("Latest Response")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Blue)),
            )
            .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, area);
    }

    /// Gauge of the latest call's share of the session's total CO2
    fn draw_co2_share_gauge(frame: &mut Frame, area: Rect, latest: &QueryRecord, records: &[QueryRecord]) {
        let total: f64 = records.iter().map(|r| r.co2_kg).sum();
        let share = if total > 0.0 { latest.co2_kg / total } else { 0.0 };
        let percent = (share * 100.0).clamp(0.0, 100.0) as u16;

        let gauge_color = if share > 0.5 {
            Color::Red
        } else if share > 0.25 {
            Color::Yellow
        } else {
            Color::Green
        };

        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title("Latest Query Share of Session CO2")
                    .borders(Borders::ALL),
            )
            .gauge_style(Style::default().fg(gauge_color))
            .percent(percent)
            .label(format!("{:.6} kg of {:.6} kg ({percent}%)", latest.co2_kg, total));

        frame.render_widget(gauge, area);
    }

    /// Draw session statistics table
    fn draw_statistics_table(frame: &mut Frame, area: Rect, records: &[QueryRecord]) {
        let stats = aggregator::stats(records);

        let rows = vec![
            Row::new(vec![
                Cell::from("Queries"),
                Cell::from(stats.count.to_string()),
            ]),
            Row::new(vec![
                Cell::from("Total Energy"),
                Cell::from(format!("{:.6} kWh", stats.total_energy_kwh)),
            ]),
            Row::new(vec![
                Cell::from("Total CO2"),
                Cell::from(format!("{:.6} kg", stats.total_co2_kg)),
            ]),
            Row::new(vec![
                Cell::from("Avg Tokens/Query"),
                Cell::from(format!("{:.1}", stats.avg_tokens)),
            ]),
            Row::new(vec![
                Cell::from("Avg CO2/Prompt"),
                Cell::from(format!("{:.6} kg", stats.avg_co2_kg)),
            ]),
            Row::new(vec![
                Cell::from("Median CO2/Prompt"),
                Cell::from(format!("{:.6} kg", stats.median_co2_kg)),
            ]),
        ];

        let table = Table::new(rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
            .block(
                Block::default()
                    .title("Session Statistics")
                    .borders(Borders::ALL),
            )
            .header(
                Row::new(vec!["Metric", "Value"])
                    .style(Style::default().add_modifier(Modifier::BOLD))
                    .bottom_margin(1),
            )
            .column_spacing(1);

        frame.render_widget(table, area);
    }

    /// Draw charts tab: per-query token bars, CO2 by model, and the
    /// tokens-vs-CO2 correlation
    fn draw_charts_tab(frame: &mut Frame, area: Rect, records: &[QueryRecord]) {
        if records.is_empty() {
            Self::draw_no_data(frame, area);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(34), // Input vs output per query
                Constraint::Percentage(33), // Total tokens per query
                Constraint::Percentage(33), // CO2 by model + correlation
            ])
            .split(area);

        Self::draw_in_out_charts(frame, chunks[0], records);
        Self::draw_token_chart(frame, chunks[1], records);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2]);
        Self::draw_co2_by_model_chart(frame, bottom[0], records);
        Self::draw_correlation_chart(frame, bottom[1], records);
    }

    /// Side-by-side bar charts of input and output tokens per query
    fn draw_in_out_charts(frame: &mut Frame, area: Rect, records: &[QueryRecord]) {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let series = aggregator::token_series(records);
        let visible = (halves[0].width as usize / 6).max(1);
        let tail = &series[series.len().saturating_sub(visible)..];
        let labels: Vec<String> = tail.iter().map(|(id, _, _)| format!("#{id}")).collect();

        let input: Vec<(&str, u64)> = labels
            .iter()
            .zip(tail.iter())
            .map(|(label, entry)| (label.as_str(), entry.1))
            .collect();
        let output: Vec<(&str, u64)> = labels
            .iter()
            .zip(tail.iter())
            .map(|(label, entry)| (label.as_str(), entry.2))
            .collect();

        let input_chart = BarChart::default()
            .block(
                Block::default()
                    .title("Input Tokens per Query")
                    .borders(Borders::ALL),
            )
            .data(&input)
            .bar_width(5)
            .bar_style(Style::default().fg(Color::Blue))
            .value_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
        frame.render_widget(input_chart, halves[0]);

        let output_chart = BarChart::default()
            .block(
                Block::default()
                    .title("Output Tokens per Query")
                    .borders(Borders::ALL),
            )
            .data(&output)
            .bar_width(5)
            .bar_style(Style::default().fg(Color::Magenta))
            .value_style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
        frame.render_widget(output_chart, halves[1]);
    }

    /// Scatter of total tokens against CO2, CO2 in milligrams
    fn draw_correlation_chart(frame: &mut Frame, area: Rect, records: &[QueryRecord]) {
        let series = aggregator::correlation_series(records);
        let points: Vec<(f64, f64)> = series
            .iter()
            .map(|(tokens, co2, _)| (*tokens as f64, co2 * 1_000_000.0))
            .collect();

        let max_x = points.iter().map(|p| p.0).fold(1.0_f64, f64::max);
        let max_y = points.iter().map(|p| p.1).fold(1.0_f64, f64::max);

        let datasets = vec![Dataset::default()
            .name("queries")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Green))
            .data(&points)];

        let chart = Chart::new(datasets)
            .block(
                Block::default()
                    .title("Tokens vs CO2 (mg)")
                    .borders(Borders::ALL),
            )
            .x_axis(
                Axis::default()
                    .title("tokens")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, max_x])
                    .labels(vec![Line::from("0"), Line::from(format!("{max_x:.0}"))]),
            )
            .y_axis(
                Axis::default()
                    .title("mg")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, max_y])
                    .labels(vec![Line::from("0"), Line::from(format!("{max_y:.2}"))]),
            );

        frame.render_widget(chart, area);
    }

    /// Bar chart of total tokens per query, labeled by query id
    fn draw_token_chart(frame: &mut Frame, area: Rect, records: &[QueryRecord]) {
        // Last entries only so bars fit the width
        let visible = (area.width as usize / 6).max(1);
        let series = aggregator::total_token_series(records);
        let tail = &series[series.len().saturating_sub(visible)..];

        let labels: Vec<String> = tail.iter().map(|(id, _, _)| format!("#{id}")).collect();
        let data: Vec<(&str, u64)> = labels
            .iter()
            .zip(tail.iter())
            .map(|(label, (_, total, _))| (label.as_str(), *total))
            .collect();

        let barchart = BarChart::default()
            .block(
                Block::default()
                    .title("Total Tokens per Query")
                    .borders(Borders::ALL),
            )
            .data(&data)
            .bar_width(5)
            .bar_style(Style::default().fg(Color::Cyan))
            .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));

        frame.render_widget(barchart, area);
    }

    /// Bar chart of CO2 per model, in milligrams so small values stay visible
    fn draw_co2_by_model_chart(frame: &mut Frame, area: Rect, records: &[QueryRecord]) {
        let groups = aggregator::co2_by_model(records);

        let labels: Vec<String> = groups
            .iter()
            .map(|(model, _)| {
                // Drop the vendor prefix to keep labels narrow
                model.rsplit('/').next().unwrap_or(model).to_string()
            })
            .collect();
        let data: Vec<(&str, u64)> = labels
            .iter()
            .zip(groups.iter())
            .map(|(label, (_, co2))| (label.as_str(), (co2 * 1_000_000.0).round() as u64))
            .collect();

        let barchart = BarChart::default()
            .block(
                Block::default()
                    .title("CO2 by Model (mg)")
                    .borders(Borders::ALL),
            )
            .data(&data)
            .bar_width(12)
            .bar_style(Style::default().fg(Color::Yellow))
            .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));

        frame.render_widget(barchart, area);
    }

    /// Draw history tab as a scrollable table
    fn draw_history_tab(frame: &mut Frame, area: Rect, records: &[QueryRecord], scroll_offset: usize) {
        if records.is_empty() {
            Self::draw_no_data(frame, area);
            return;
        }

        let offset = scroll_offset.min(records.len().saturating_sub(1));
        let rows: Vec<Row> = records
            .iter()
            .skip(offset)
            .map(|record| {
                Row::new(vec![
                    Cell::from(record.id.to_string()),
                    Cell::from(record.model.clone()),
                    Cell::from(record.input_tokens.to_string()),
                    Cell::from(record.output_tokens.to_string()),
                    Cell::from(record.total_tokens.to_string()),
                    Cell::from(format!("{:.6}", record.energy_kwh)),
                    Cell::from(format!("{:.6}", record.co2_kg)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Min(24),
                Constraint::Length(7),
                Constraint::Length(7),
                Constraint::Length(7),
                Constraint::Length(10),
                Constraint::Length(10),
            ],
        )
        .block(
            Block::default()
                .title(format!("Query History ({} queries)", records.len()))
                .borders(Borders::ALL),
        )
        .header(
            Row::new(vec!["ID", "Model", "In", "Out", "Total", "kWh", "CO2 kg"])
                .style(Style::default().add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .column_spacing(1);

        frame.render_widget(table, area);
    }

    /// Draw about tab with version and data-flow information
    fn draw_about_tab(frame: &mut Frame, area: Rect) {
        let version = env!("CARGO_PKG_VERSION");
        let build_time = env!("AI_ENERGY_MONITOR_BUILD_TIME", "unknown");

        let about_info = vec![
            format!("AI Energy Monitor v{version}"),
            format!("Built: {build_time}"),
            "".to_string(),
            "How it works:".to_string(),
            "1. Each prompt is sent to the configured chat-completion API".to_string(),
            "2. Token usage is read from the response's usage object".to_string(),
            "3. energy_kwh = total_tokens / 1000 * per-model coefficient".to_string(),
            "4. co2_kg = energy_kwh * grid CO2 intensity".to_string(),
            "5. Each successful query is appended to the session history".to_string(),
            "".to_string(),
            "Energy coefficients are rough configuration values, not".to_string(),
            "measured physical data. History lives only for this session.".to_string(),
        ];

        let items: Vec<ListItem> = about_info
            .iter()
            .map(|s| ListItem::new(Line::from(s.as_str())))
            .collect();

        let list = List::new(items)
            .block(Block::default().title("About").borders(Borders::ALL))
            .style(Style::default().fg(Color::Cyan));

        frame.render_widget(list, area);
    }

    /// Placeholder shown on data tabs while the history is empty
    fn draw_no_data(frame: &mut Frame, area: Rect) {
        let paragraph = Paragraph::new("No queries recorded yet.\n\nRun a prompt first, then open the dashboard.")
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center)
            .block(Block::default().title("No Data").borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    /// Draw footer with controls
    fn draw_footer(frame: &mut Frame, area: Rect) {
        let controls = Paragraph::new("Controls: [Q]uit | [Tab] Switch tabs | [Up/Down] Scroll history")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        frame.render_widget(controls, area);
    }

    /// Clean up terminal
    pub fn cleanup(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for DashboardUI {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
