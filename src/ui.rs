use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use conciliacion::{format_currency, format_date, truncate, Bank, Dashboard, DashboardView, FilterSet, Record};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Payments,
    BankChart,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Payments => Page::BankChart,
            Page::BankChart => Page::Payments,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Payments => "Pagos",
            Page::BankChart => "Total por Banco",
        }
    }
}

/// Which text search is being typed, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Name,
    Code,
    Loan,
}

pub struct App {
    dashboard: Dashboard,
    pub view: DashboardView,
    pub filters: FilterSet,
    pub state: TableState,
    pub current_page: Page,
    pub input_mode: InputMode,
    pub input: String,
    pub user: String,
    pub date_from: NaiveDate,
    pub error: Option<String>,
}

impl App {
    pub fn new(mut dashboard: Dashboard, user: String, default_date_from: Option<NaiveDate>) -> Result<Self> {
        let filters = FilterSet::default();
        let view = dashboard.render(&filters)?;

        let mut state = TableState::default();
        if !view.rows.is_empty() {
            state.select(Some(0));
        }

        let today = Local::now().date_naive();
        let date_from = default_date_from
            .or_else(|| NaiveDate::from_ymd_opt(today.year(), 1, 1))
            .unwrap_or(today);

        Ok(Self {
            dashboard,
            view,
            filters,
            state,
            current_page: Page::Payments,
            input_mode: InputMode::Normal,
            input: String::new(),
            user,
            date_from,
            error: None,
        })
    }

    /// Re-run the pipeline with the current filters
    pub fn rerender(&mut self) {
        match self.dashboard.render(&self.filters) {
            Ok(view) => {
                self.view = view;
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }

        if self.view.rows.is_empty() {
            self.state.select(None);
        } else {
            let last = self.view.rows.len() - 1;
            self.state.select(Some(self.state.selected().unwrap_or(0).min(last)));
        }
    }

    pub fn refresh(&mut self) {
        self.dashboard.refresh();
        self.rerender();
    }

    pub fn clear_filters(&mut self) {
        self.filters = FilterSet::default();
        self.rerender();
    }

    /// No bank → each bank in turn → no bank
    pub fn cycle_bank(&mut self) {
        self.filters.banks = next_choice(&self.view.options.banks, &self.filters.banks);
        self.rerender();
    }

    pub fn cycle_officer(&mut self) {
        self.filters.officers = next_choice(&self.view.options.officers, &self.filters.officers);
        self.rerender();
    }

    pub fn toggle_date_filter(&mut self) {
        self.filters.date_range = match self.filters.date_range {
            Some(_) => None,
            None => Some((self.date_from, Local::now().date_naive())),
        };
        self.rerender();
    }

    pub fn start_input(&mut self, mode: InputMode) {
        self.input = match mode {
            InputMode::Name => self.filters.name.clone(),
            InputMode::Code => self.filters.code.clone(),
            InputMode::Loan => self.filters.loan_id.clone(),
            InputMode::Normal => String::new(),
        };
        self.input_mode = mode;
    }

    pub fn finish_input(&mut self) {
        let query = std::mem::take(&mut self.input);
        match self.input_mode {
            InputMode::Name => self.filters.name = query,
            InputMode::Code => self.filters.code = query,
            InputMode::Loan => self.filters.loan_id = query,
            InputMode::Normal => {}
        }
        self.input_mode = InputMode::Normal;
        self.rerender();
    }

    pub fn cancel_input(&mut self) {
        self.input.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn next(&mut self) {
        let len = self.view.rows.len();
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
        let len = self.view.rows.len();
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
        let len = self.view.rows.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map(|i| (i + 20).min(len - 1)).unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        self.state.select(Some(i));
    }
}

fn next_choice(options: &[String], current: &std::collections::BTreeSet<String>) -> std::collections::BTreeSet<String> {
    let position = current
        .iter()
        .next()
        .and_then(|selected| options.iter().position(|o| o == selected));

    let next = match position {
        None => options.first(),
        Some(i) => options.get(i + 1),
    };

    next.cloned().into_iter().collect()
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let key = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            _ => continue,
        };

        if app.input_mode != InputMode::Normal {
            match key.code {
                KeyCode::Enter => app.finish_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Char(c) => app.input.push(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Tab => app.current_page = app.current_page.next(),
            KeyCode::Char('r') => app.refresh(),
            KeyCode::Char('c') => app.clear_filters(),
            KeyCode::Char('b') => app.cycle_bank(),
            KeyCode::Char('o') => app.cycle_officer(),
            KeyCode::Char('d') => app.toggle_date_filter(),
            KeyCode::Char('/') | KeyCode::Char('n') => app.start_input(InputMode::Name),
            KeyCode::Char('k') => app.start_input(InputMode::Code),
            KeyCode::Char('p') => app.start_input(InputMode::Loan),
            KeyCode::Down => app.next(),
            KeyCode::Up => app.previous(),
            KeyCode::PageDown => app.page_down(),
            KeyCode::PageUp => app.page_up(),
            KeyCode::Home => app.state.select(Some(0)),
            KeyCode::End => {
                if !app.view.rows.is_empty() {
                    app.state.select(Some(app.view.rows.len() - 1));
                }
            }
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with counters
            Constraint::Length(3), // Active filters
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_filters(f, chunks[1], app);

    match app.current_page {
        Page::Payments => render_table(f, chunks[2], app),
        Page::BankChart => render_bank_chart(f, chunks[2], app),
    }

    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];
    for (i, page) in [Page::Payments, Page::BankChart].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("💰 Total Pagado: {}", format_currency(app.view.summary.total_amount)),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("📄 Registros: {}", app.view.summary.record_count),
        Style::default().fg(Color::White),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(format!("👤 {}", app.user), Style::default().fg(Color::Cyan)));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_filters(f: &mut Frame, area: Rect, app: &App) {
    let filters = &app.filters;
    let label = Style::default().fg(Color::Yellow);

    let date = match filters.date_range {
        Some((from, to)) => format!("{} - {}", format_date(Some(from)), format_date(Some(to))),
        None => "todas".to_string(),
    };
    let joined = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "todos".to_string()
        } else {
            set.iter().map(|s| if s.is_empty() { "(sin banco)" } else { s.as_str() }).collect::<Vec<_>>().join(",")
        }
    };

    let mut spans = vec![
        Span::styled("Fecha: ", label),
        Span::raw(date),
        Span::styled("  Banco: ", label),
        Span::raw(joined(&filters.banks)),
        Span::styled("  Oficial: ", label),
        Span::raw(joined(&filters.officers)),
    ];

    let searches = [
        (InputMode::Name, "  Nombre: ", &filters.name),
        (InputMode::Code, "  Código: ", &filters.code),
        (InputMode::Loan, "  Préstamo: ", &filters.loan_id),
    ];
    for (mode, name, value) in searches {
        spans.push(Span::styled(name, label));
        if app.input_mode == mode {
            spans.push(Span::styled(
                format!("{}▏", app.input),
                Style::default().fg(Color::Black).bg(Color::Yellow),
            ));
        } else {
            spans.push(Span::raw(value.clone()));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" 🔎 Filtros ");

    f.render_widget(Paragraph::new(vec![Line::from(spans)]).block(block), area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Fecha", "Nombre", "Código", "Préstamo", "Banco", "Oficial", "Monto"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.view.rows.iter().map(record_row);

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(30),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(13),
            Constraint::Length(16),
            Constraint::Length(16),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Pagos ({} de {}) ", app.view.rows.len(), app.view.total_records)),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn record_row(record: &Record) -> Row<'static> {
    let cells = vec![
        Cell::from(format_date(record.date)),
        Cell::from(truncate(record.name.as_deref().unwrap_or(""), 28)),
        Cell::from(record.code.clone().unwrap_or_default()),
        Cell::from(record.loan_id.clone().unwrap_or_default()),
        Cell::from(record.bank.code()).style(Style::default().fg(bank_color(record.bank.code()))),
        Cell::from(truncate(record.officer.as_deref().unwrap_or(""), 15)),
        Cell::from(format!("{:>15}", format_currency(record.amount))),
    ];

    Row::new(cells).height(1)
}

/// Fixed colors per bank, shared by the table and the chart
fn bank_color(code: &str) -> Color {
    match code {
        "BANRESERVAS" => Color::Rgb(0xFF, 0x7F, 0x50),
        "POPULAR" => Color::Rgb(0x1F, 0x77, 0xB4),
        _ => Color::Gray,
    }
}

/// One bar per bank in its own color. Bars are unsigned, so negative totals
/// are drawn as zero.
fn bank_bars(totals: &[(Bank, f64)]) -> Vec<Bar<'static>> {
    totals
        .iter()
        .map(|(bank, total)| {
            let label = if bank.code().is_empty() { "(sin banco)" } else { bank.code() };
            let color = bank_color(bank.code());
            Bar::default()
                .value(total.max(0.0).round() as u64)
                .text_value(format_currency(*total))
                .label(Line::from(label))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect()
}

fn render_bank_chart(f: &mut Frame, area: Rect, app: &App) {
    let totals = app.view.summary.bank_totals_desc();

    let bars = bank_bars(&totals);

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" 💰 Total Pagos por Banco (Filtros aplicados) "),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(16)
        .bar_gap(4);

    f.render_widget(chart, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let key = Style::default().fg(Color::Yellow);

    let mut spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.view.rows.len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(error) = &app.error {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(format!("❌ {}", error), Style::default().fg(Color::Red)));
    } else if !app.view.warnings.is_empty() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("⚠️ {} archivo(s) omitido(s)", app.view.warnings.len()),
            Style::default().fg(Color::Yellow),
        ));
    }

    for (k, label) in [
        ("b", " Banco "),
        ("o", " Oficial "),
        ("d", " Fecha "),
        ("n", " Nombre "),
        ("k", " Código "),
        ("p", " Préstamo "),
        ("c", " Limpiar "),
        ("r", " Actualizar "),
        ("Tab", " Página "),
    ] {
        spans.push(Span::raw("|"));
        spans.push(Span::styled(format!(" {}", k), key));
        spans.push(Span::raw(label));
    }
    spans.push(Span::raw("| "));
    spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Salir"));

    let status_bar = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::White)));

    f.render_widget(status_bar, area);
}
