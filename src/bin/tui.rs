use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Terminal, widgets::{Block, Borders, List, ListItem, Paragraph, ListState}, layout::{Layout, Constraint, Direction}, style::{Style, Modifier, Color}};

use ordered_todos::{application::todo_service::{TodoService, TodoServiceImpl}, config::AppConfig, domain::{ordering::{Filter, ListQuery}, repository::TodoRepository, todo::{CreateTodo, Patch, Todo, TodoId, UpdateTodo}}, infrastructure::sqlite_repo::{prepare_sqlite_file, SqliteTodoRepository}};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env()?;
    let database_url = config.sqlite_url().to_string();
    prepare_sqlite_file(&database_url)?;
    let repo = SqliteTodoRepository::connect(&database_url).await?;
    repo.init().await?;
    let service = TodoServiceImpl::new(repo);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, service, database_url).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode { View, Create, Edit, Search }

#[derive(Clone, Copy, PartialEq, Eq)]
enum ActiveField { Title, Description }

#[derive(Clone, Copy, PartialEq, Eq)]
enum Theme { Dark, Light }

impl Theme {
    fn text(self) -> Style { match self { Theme::Dark => Style::default().fg(Color::White).bg(Color::Black), Theme::Light => Style::default().fg(Color::Black).bg(Color::White) } }
    fn accent(self) -> Color { match self { Theme::Dark => Color::Cyan, Theme::Light => Color::Blue } }
    fn done(self) -> Style {
        let fg = match self { Theme::Dark => Color::DarkGray, Theme::Light => Color::Gray };
        Style::default().fg(fg).add_modifier(Modifier::CROSSED_OUT)
    }
    fn toggle(self) -> Self { match self { Theme::Dark => Theme::Light, Theme::Light => Theme::Dark } }
}

struct App<R: TodoRepository> {
    service: TodoServiceImpl<R>,
    items: Vec<Todo>,
    active_count: usize,
    total_count: usize,
    query: ListQuery,
    selected: usize,
    last_tick: Instant,
    mode: Mode,
    list_state: ListState,
    field: ActiveField,
    draft_title: String,
    draft_desc: String,
    draft_search: String,
    theme: Theme,
    status: Option<String>,
}

impl<R: TodoRepository> App<R> {
    async fn load(&mut self) -> Result<()> {
        self.items = self.service.list(self.query.clone()).await?;
        let all = self.service.list(ListQuery::all()).await?;
        self.total_count = all.len();
        self.active_count = all.iter().filter(|t| !t.completed).count();
        // Clamp selection within visible bounds
        let len = self.items.len();
        if len == 0 { self.selected = 0; self.list_state.select(None); }
        else { if self.selected >= len { self.selected = len - 1; } self.list_state.select(Some(self.selected)); }
        Ok(())
    }

    fn selected_id(&self) -> Option<TodoId> { self.items.get(self.selected).map(|t| t.id.clone()) }

    /// Reports the outcome of a store call in the footer instead of aborting the UI.
    fn report<T>(&mut self, action: &str, result: ordered_todos::domain::error::TodoResult<T>) -> Option<T> {
        match result {
            Ok(v) => { self.status = None; Some(v) }
            Err(e) => { self.status = Some(format!("{action} failed: {e}")); None }
        }
    }

    /// Swaps the selected item with its visible neighbour and persists the visible order.
    async fn move_selected(&mut self, down: bool) -> Result<()> {
        let len = self.items.len();
        if len < 2 { return Ok(()); }
        let target = if down { if self.selected + 1 >= len { return Ok(()); } self.selected + 1 } else { if self.selected == 0 { return Ok(()); } self.selected - 1 };
        let mut ids: Vec<TodoId> = self.items.iter().map(|t| t.id.clone()).collect();
        ids.swap(self.selected, target);
        let result = self.service.reorder(ids).await;
        if self.report("reorder", result).is_some() { self.selected = target; }
        self.load().await
    }

    fn filter_label(&self) -> String {
        match self.query.search.as_deref() {
            Some(s) if !s.is_empty() => format!("{} / \"{}\"", self.query.filter.as_str(), s),
            _ => self.query.filter.as_str().to_string(),
        }
    }
}

async fn run_app<R: TodoRepository>(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, service: TodoServiceImpl<R>, database_url: String) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut app = App { service, items: vec![], active_count: 0, total_count: 0, query: ListQuery::all(), selected: 0, last_tick: Instant::now(), mode: Mode::View, list_state: ListState::default(), field: ActiveField::Title, draft_title: String::new(), draft_desc: String::new(), draft_search: String::new(), theme: Theme::Dark, status: None };
    app.load().await?;

    loop {
        terminal.draw(|f| {
            let theme = app.theme;
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(1),
                    Constraint::Length(3),
                ])
                .split(f.size());

            let header = Paragraph::new(format!("{} active / {} total  |  space: toggle, n: new, e: edit, d: delete, J/K: move, f: filter, /: search, c: clear done, t: theme, q: quit", app.active_count, app.total_count))
                .style(theme.text())
                .block(Block::default().borders(Borders::ALL).title("todos"));
            f.render_widget(header, chunks[0]);

            let middle = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);

            let list_items: Vec<ListItem> = app.items.iter().map(|t| {
                let mark = if t.completed { "[x]" } else { "[ ]" };
                let item = ListItem::new(format!("{} {}", mark, t.title));
                if t.completed { item.style(theme.done()) } else { item }
            }).collect();
            // Keep list_state selection in sync with current index
            if app.items.is_empty() { app.list_state.select(None); } else { app.list_state.select(Some(app.selected)); }
            let list = List::new(list_items)
                .style(theme.text())
                .block(Block::default().borders(Borders::ALL).title(format!("items [{}]", app.filter_label())))
                .highlight_style(Style::default().fg(theme.accent()).add_modifier(Modifier::BOLD | Modifier::REVERSED))
                .highlight_symbol(">> ");
            f.render_stateful_widget(list, middle[0], &mut app.list_state);

            // Details pane for selected item
            let detail = match app.items.get(app.selected) {
                Some(t) => {
                    let desc = t.description.clone().unwrap_or_else(|| "(no description)".to_string());
                    let due = t.due_date.map(|d| d.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_else(|| "-".to_string());
                    format!("Title:\n{}\n\nStatus: {}\nOrder: {}\nDue: {}\n\nDescription:\n{}", t.title, if t.completed { "Completed" } else { "Active" }, t.order, due, desc)
                }
                None => String::new(),
            };
            let details = Paragraph::new(detail)
                .style(theme.text())
                .block(Block::default().borders(Borders::ALL).title("details"));
            f.render_widget(details, middle[1]);

            let field_label = match app.field { ActiveField::Title => "Title", ActiveField::Description => "Desc" };
            let field_text = match app.field { ActiveField::Title => &app.draft_title, ActiveField::Description => &app.draft_desc };
            let footer_text = match (app.mode, &app.status) {
                (Mode::View, Some(status)) => status.clone(),
                (Mode::View, None) => format!("DATABASE_URL={}  |  Filter=[{}]", database_url, app.filter_label()),
                (Mode::Create, _) => format!("Create — {}: {}_  |  (Tab to switch, Enter to save, Esc to cancel)", field_label, field_text),
                (Mode::Edit, _) => format!("Edit — {}: {}_  |  (Tab to switch, Enter to save, Esc to cancel)", field_label, field_text),
                (Mode::Search, _) => format!("Search: {}_  |  (Enter to apply, empty clears, Esc to cancel)", app.draft_search),
            };
            let footer = Paragraph::new(footer_text)
                .style(theme.text())
                .block(Block::default().borders(Borders::ALL).title(match app.mode { Mode::View => "info", Mode::Create => "create", Mode::Edit => "edit", Mode::Search => "search" }));
            f.render_widget(footer, chunks[2]);
        })?;

        let timeout = tick_rate.saturating_sub(app.last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Only act on key presses; ignore repeats and releases to prevent duplicate input
                if key.kind != KeyEventKind::Press { continue; }
                match app.mode {
                    Mode::View => match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::Up if key.modifiers.contains(KeyModifiers::SHIFT) => app.move_selected(false).await?,
                        KeyCode::Down if key.modifiers.contains(KeyModifiers::SHIFT) => app.move_selected(true).await?,
                        KeyCode::Char('K') => app.move_selected(false).await?,
                        KeyCode::Char('J') => app.move_selected(true).await?,
                        KeyCode::Up | KeyCode::Char('k') => { if app.selected > 0 { app.selected -= 1; } }
                        KeyCode::Down | KeyCode::Char('j') => { let len = app.items.len(); if app.selected + 1 < len { app.selected += 1; } }
                        KeyCode::Enter | KeyCode::Char(' ') => {
                            if let Some(id) = app.selected_id() {
                                let result = app.service.toggle_complete(id).await;
                                app.report("toggle", result);
                                app.load().await?;
                            }
                        }
                        KeyCode::Char('n') => {
                            app.mode = Mode::Create;
                            app.field = ActiveField::Title;
                            app.draft_title.clear();
                            app.draft_desc.clear();
                        }
                        KeyCode::Char('e') => {
                            if let Some(t) = app.items.get(app.selected) {
                                app.draft_title = t.title.clone();
                                app.draft_desc = t.description.clone().unwrap_or_default();
                                app.mode = Mode::Edit;
                                app.field = ActiveField::Title;
                            }
                        }
                        KeyCode::Char('d') => {
                            if let Some(id) = app.selected_id() {
                                let result = app.service.delete(id).await;
                                app.report("delete", result);
                                if app.selected > 0 { app.selected -= 1; }
                                app.load().await?;
                            }
                        }
                        KeyCode::Char('c') => {
                            let result = app.service.clear_completed().await;
                            if let Some(removed) = app.report("clear completed", result) {
                                app.status = Some(format!("removed {removed} completed"));
                            }
                            app.load().await?;
                        }
                        KeyCode::Char('f') => {
                            app.query.filter = app.query.filter.next();
                            app.load().await?;
                        }
                        KeyCode::Char('/') => {
                            app.mode = Mode::Search;
                            app.draft_search = app.query.search.clone().unwrap_or_default();
                        }
                        KeyCode::Char('t') => app.theme = app.theme.toggle(),
                        KeyCode::Esc => {
                            app.query = ListQuery { filter: Filter::All, search: None };
                            app.status = None;
                            app.load().await?;
                        }
                        _ => {}
                    },
                    Mode::Search => match key.code {
                        KeyCode::Esc => { app.mode = Mode::View; app.draft_search.clear(); }
                        KeyCode::Enter => {
                            let search = app.draft_search.trim().to_string();
                            app.query.search = if search.is_empty() { None } else { Some(search) };
                            app.mode = Mode::View;
                            app.selected = 0;
                            app.load().await?;
                        }
                        KeyCode::Backspace => { app.draft_search.pop(); }
                        KeyCode::Char(c) => app.draft_search.push(c),
                        _ => {}
                    },
                    Mode::Create => match key.code {
                        KeyCode::Esc => { app.mode = Mode::View; app.draft_title.clear(); app.draft_desc.clear(); }
                        KeyCode::Enter => {
                            let title = app.draft_title.trim();
                            let desc = app.draft_desc.trim();
                            if !title.is_empty() {
                                let description = if desc.is_empty() { None } else { Some(desc.to_string()) };
                                let result = app.service.create(CreateTodo { title: title.to_string(), description, due_date: None }).await;
                                app.report("create", result);
                            }
                            app.mode = Mode::View;
                            app.draft_title.clear();
                            app.draft_desc.clear();
                            app.load().await?;
                        }
                        KeyCode::Backspace => { match app.field { ActiveField::Title => { app.draft_title.pop(); }, ActiveField::Description => { app.draft_desc.pop(); } } }
                        KeyCode::Char(c) => { match app.field { ActiveField::Title => app.draft_title.push(c), ActiveField::Description => app.draft_desc.push(c) } }
                        KeyCode::Tab => { app.field = match app.field { ActiveField::Title => ActiveField::Description, ActiveField::Description => ActiveField::Title }; }
                        _ => {}
                    },
                    Mode::Edit => match key.code {
                        KeyCode::Esc => { app.mode = Mode::View; app.draft_title.clear(); app.draft_desc.clear(); }
                        KeyCode::Enter => {
                            if let Some(id) = app.selected_id() {
                                let title = app.draft_title.trim().to_string();
                                let desc = app.draft_desc.trim().to_string();
                                let input = UpdateTodo {
                                    title: if title.is_empty() { None } else { Some(title) },
                                    description: if desc.is_empty() { Patch::Clear } else { Patch::Set(desc) },
                                    ..Default::default()
                                };
                                let result = app.service.update(id, input).await;
                                app.report("update", result);
                            }
                            app.mode = Mode::View;
                            app.draft_title.clear();
                            app.draft_desc.clear();
                            app.load().await?;
                        }
                        KeyCode::Backspace => { match app.field { ActiveField::Title => { app.draft_title.pop(); }, ActiveField::Description => { app.draft_desc.pop(); } } }
                        KeyCode::Char(c) => { match app.field { ActiveField::Title => app.draft_title.push(c), ActiveField::Description => app.draft_desc.push(c) } }
                        KeyCode::Tab => { app.field = match app.field { ActiveField::Title => ActiveField::Description, ActiveField::Description => ActiveField::Title }; }
                        _ => {}
                    },
                }
            }
        }
        if app.last_tick.elapsed() >= tick_rate {
            app.last_tick = Instant::now();
        }
    }
    Ok(())
}
