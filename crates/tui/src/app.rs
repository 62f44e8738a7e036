use std::{collections::HashSet, io, ops::Range, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use marquee_core::{
    catalog::{BoxFuture, MovieCatalog},
    config::AppConfig,
    error::ApiError,
    fetch::{FetchController, Producer, Revisions},
    format::{
        format_rating, genre_names, image_url_with_base, sort_by_popularity, sort_by_rating,
        sort_by_release_date, truncate_title, year_from_date,
    },
    models::{Movie, MovieDetails},
    saved::{SavedMovie, SavedStore},
    search::{DebouncedSearch, QuickSearch},
};
use parking_lot::Mutex;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const TICK_RATE: Duration = Duration::from_millis(250);
/// Rows from the end of the list at which the next page is requested.
const LOAD_MORE_THRESHOLD: usize = 5;
const TITLE_MAX_LEN: usize = 40;
const TOP_RANKED: usize = 5;
const LOAD_ERROR_FALLBACK: &str = "Failed to load movies. Please try again later.";
const EMPTY_TITLE: &str = "No movies found";
const EMPTY_HINT: &str = "Try adjusting your search or check back later for new releases.";

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    accent_alt: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Magenta,
            accent_alt: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Discover,
    Search,
    Saved,
}

impl Screen {
    const ALL: [Screen; 3] = [Screen::Discover, Screen::Search, Screen::Saved];

    fn next(self) -> Self {
        match self {
            Screen::Discover => Screen::Search,
            Screen::Search => Screen::Saved,
            Screen::Saved => Screen::Discover,
        }
    }

    fn previous(self) -> Self {
        match self {
            Screen::Discover => Screen::Saved,
            Screen::Search => Screen::Discover,
            Screen::Saved => Screen::Search,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Screen::Discover => "Discover",
            Screen::Search => "Search",
            Screen::Saved => "Saved",
        }
    }

    fn has_query(self) -> bool {
        !matches!(self, Screen::Saved)
    }
}

/// Ordering applied to the saved list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SavedOrder {
    Recent,
    Popularity,
    Rating,
    Release,
}

impl SavedOrder {
    fn next(self) -> Self {
        match self {
            SavedOrder::Recent => SavedOrder::Popularity,
            SavedOrder::Popularity => SavedOrder::Rating,
            SavedOrder::Rating => SavedOrder::Release,
            SavedOrder::Release => SavedOrder::Recent,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SavedOrder::Recent => "recently saved",
            SavedOrder::Popularity => "popularity",
            SavedOrder::Rating => "rating",
            SavedOrder::Release => "release date",
        }
    }

    fn apply(self, saved: &[SavedMovie]) -> Vec<Movie> {
        let movies: Vec<Movie> = saved.iter().map(|entry| entry.movie.clone()).collect();
        match self {
            SavedOrder::Recent => movies,
            SavedOrder::Popularity => sort_by_popularity(&movies),
            SavedOrder::Rating => sort_by_rating(&movies),
            SavedOrder::Release => sort_by_release_date(&movies),
        }
    }
}

/// What a results pane shows.
#[derive(Debug, Clone, PartialEq)]
enum ResultsView {
    Loading,
    Error(String),
    Empty,
    List(Vec<Movie>),
}

impl ResultsView {
    fn new(loading: bool, error: Option<&ApiError>, movies: Vec<Movie>) -> Self {
        if loading && movies.is_empty() {
            ResultsView::Loading
        } else if let Some(error) = error {
            let message = if error.message.trim().is_empty() {
                LOAD_ERROR_FALLBACK.to_string()
            } else {
                error.message.clone()
            };
            ResultsView::Error(message)
        } else if movies.is_empty() {
            ResultsView::Empty
        } else {
            ResultsView::List(movies)
        }
    }

    fn movies(&self) -> &[Movie] {
        match self {
            ResultsView::List(movies) => movies,
            _ => &[],
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    Refresh,
}

/// Terminal front end over the catalog.
pub struct MarqueeApp {
    config: AppConfig,
    discover: DebouncedSearch,
    quick: QuickSearch,
    saved_store: SavedStore,
    saved: Vec<SavedMovie>,
    saved_order: SavedOrder,
    selected: Arc<Mutex<Option<u64>>>,
    details: FetchController<Option<MovieDetails>>,
    screen: Screen,
    state: UiState,
    theme: Theme,
}

impl MarqueeApp {
    pub fn new(
        config: AppConfig,
        catalog: Arc<dyn MovieCatalog>,
        saved_store: SavedStore,
    ) -> Self {
        let discover = DebouncedSearch::new(Arc::clone(&catalog), "", config.search_debounce());
        let quick = QuickSearch::new(Arc::clone(&catalog), "", config.quick_search_debounce());

        let selected = Arc::new(Mutex::new(None::<u64>));
        let producer: Producer<Option<MovieDetails>> = {
            let selected = Arc::clone(&selected);
            Arc::new(move || -> BoxFuture<'static, anyhow::Result<Option<MovieDetails>>> {
                let catalog = Arc::clone(&catalog);
                let id = *selected.lock();
                Box::pin(async move {
                    match id {
                        Some(id) => Ok(Some(catalog.details(id).await?)),
                        None => Ok(None),
                    }
                })
            })
        };
        let details = FetchController::new(producer, true);
        details.set_dependencies(&None::<u64>);

        Self {
            config,
            discover,
            quick,
            saved_store,
            saved: Vec::new(),
            saved_order: SavedOrder::Recent,
            selected,
            details,
            screen: Screen::Discover,
            state: UiState::default(),
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        match self.reload_saved() {
            Ok(()) => self
                .state
                .set_status(format!("{} saved movies", self.saved.len())),
            Err(err) => self.state.set_status(format!("Failed to load saved movies: {err}")),
        }

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        forward_revisions(self.discover.subscribe(), event_tx.clone());
        forward_revisions(self.quick.subscribe(), event_tx.clone());
        forward_revisions(self.details.subscribe(), event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }

            if self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        info!("Terminal restored");
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    error!(?err, "Input handling failed");
                    self.state.set_status(format!("Error: {err}"));
                }
            }
            Some(AppEvent::Tick) | Some(AppEvent::Refresh) => {}
            None => return false,
        }
        self.sync_selection();
        self.maybe_load_more();
        true
    }

    fn reload_saved(&mut self) -> Result<()> {
        self.saved = self.saved_store.list()?;
        debug!(total = self.saved.len(), "Saved movies reloaded");
        Ok(())
    }

    fn results(&self) -> ResultsView {
        match self.screen {
            Screen::Discover => {
                let state = self.discover.snapshot();
                ResultsView::new(state.loading, state.error.as_ref(), state.items)
            }
            Screen::Search => {
                let state = self.quick.snapshot();
                ResultsView::new(
                    state.loading,
                    state.error.as_ref(),
                    state.data.unwrap_or_default(),
                )
            }
            Screen::Saved => ResultsView::new(false, None, self.saved_order.apply(&self.saved)),
        }
    }

    fn current_movie(&self) -> Option<Movie> {
        let cursor = self.state.cursor(self.screen).cursor;
        self.results().movies().get(cursor).cloned()
    }

    /// Point the details pane at the highlighted movie.
    fn sync_selection(&mut self) {
        let len = self.results().movies().len();
        self.state.cursor_mut(self.screen).clamp(len);

        let id = self.current_movie().map(|movie| movie.id);
        {
            let mut selected = self.selected.lock();
            if *selected == id {
                return;
            }
            *selected = id;
        }
        self.details.set_dependencies(&id);
    }

    fn maybe_load_more(&mut self) {
        if self.screen != Screen::Discover {
            return;
        }
        let state = self.discover.snapshot();
        if state.error.is_some() {
            return;
        }
        let len = state.items.len();
        let cursor = self.state.cursor(Screen::Discover).cursor;
        if near_end(cursor, len) && self.discover.load_more().is_some() {
            info!(cursor, len, "Requested next page");
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => match self.state.mode {
                Mode::Query => self.handle_query_key(key),
                Mode::Browse => self.handle_browse_key(key),
            },
            Event::Resize(_, _) => Ok(()),
            Event::Mouse(_) | Event::FocusGained | Event::FocusLost | Event::Paste(_) => Ok(()),
        }
    }

    fn query(&self) -> String {
        match self.screen {
            Screen::Discover => self.discover.query(),
            Screen::Search => self.quick.query(),
            Screen::Saved => String::new(),
        }
    }

    fn set_query(&mut self, query: String) {
        match self.screen {
            Screen::Discover => self.discover.set_query(query),
            Screen::Search => self.quick.set_query(query),
            Screen::Saved => return,
        }
        *self.list() = ListCursor::default();
    }

    fn handle_query_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.set_query(String::new());
                self.state.mode = Mode::Browse;
                self.state.set_status("Query cleared".to_string());
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                self.state.set_status(format!("Query: {}", self.query()));
            }
            KeyCode::Backspace => {
                let mut query = self.query();
                query.pop();
                self.set_query(query);
            }
            KeyCode::Char(c) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    let mut query = self.query();
                    query.push(c);
                    self.set_query(query);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn list(&mut self) -> &mut ListCursor {
        self.state.cursor_mut(self.screen)
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<()> {
        let len = self.results().movies().len();
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                self.state.should_quit = true
            }
            KeyCode::Tab => self.switch_screen(self.screen.next())?,
            KeyCode::BackTab => self.switch_screen(self.screen.previous())?,
            KeyCode::Char('j') | KeyCode::Down => self.list().move_by(1, len),
            KeyCode::Char('k') | KeyCode::Up => self.list().move_by(-1, len),
            KeyCode::Char('g') | KeyCode::Home => self.list().move_to(0, len),
            KeyCode::Char('G') | KeyCode::End => self.list().move_to(len.saturating_sub(1), len),
            KeyCode::PageDown => self.list().page(true, len),
            KeyCode::PageUp => self.list().page(false, len),
            KeyCode::Char('/') if self.screen.has_query() => {
                self.state.mode = Mode::Query;
                self.state.set_status("Type to search, Enter to keep, Esc to clear".to_string());
            }
            KeyCode::Char('r') if key.modifiers.is_empty() => self.refresh()?,
            KeyCode::Char('s') if key.modifiers.is_empty() => self.toggle_saved()?,
            KeyCode::Char('o') if self.screen == Screen::Saved => {
                self.saved_order = self.saved_order.next();
                self.state
                    .set_status(format!("Sorted by {}", self.saved_order.label()));
            }
            _ => {}
        }
        Ok(())
    }

    fn switch_screen(&mut self, screen: Screen) -> Result<()> {
        self.screen = screen;
        if screen == Screen::Saved {
            self.reload_saved()?;
        }
        self.state.mode = if screen == Screen::Search && self.quick.query().is_empty() {
            Mode::Query
        } else {
            Mode::Browse
        };
        self.state.set_status(format!("{} screen", screen.title()));
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        match self.screen {
            Screen::Discover => {
                self.discover.refresh();
            }
            Screen::Search => {
                if !self.quick.query().is_empty() {
                    self.quick.refetch();
                }
            }
            Screen::Saved => self.reload_saved()?,
        }
        self.details.refetch();
        self.state.set_status("Refreshing".to_string());
        Ok(())
    }

    fn toggle_saved(&mut self) -> Result<()> {
        let Some(movie) = self.current_movie() else {
            return Ok(());
        };
        let now_saved = self
            .saved_store
            .toggle(&movie)
            .with_context(|| format!("failed to update saved state of {}", movie.title))?;
        self.reload_saved()?;
        let verb = if now_saved { "Saved" } else { "Removed" };
        self.state.set_status(format!("{verb}: {}", movie.title));
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(size);

        let body_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);

        self.render_header(frame, chunks[0]);
        self.render_results(frame, body_chunks[0]);
        self.render_details(frame, body_chunks[1]);
        self.render_status(frame, chunks[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for screen in Screen::ALL {
            let style = if screen == self.screen {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(self.theme.muted)
            };
            spans.push(Span::styled(format!(" {} ", screen.title()), style));
        }
        if self.screen.has_query() {
            let query = self.query();
            let editing = self.state.mode == Mode::Query;
            spans.push(Span::raw("  │  "));
            let text = if query.is_empty() && !editing {
                Span::styled(
                    "Search for a movie! (press /)",
                    Style::default().fg(self.theme.muted),
                )
            } else {
                Span::styled(
                    format!("{query}{}", if editing { "▏" } else { "" }),
                    Style::default().fg(self.theme.primary_fg),
                )
            };
            spans.push(text);
            if self.screen == Screen::Discover && self.discover.is_searching() {
                spans.push(Span::styled(" …", Style::default().fg(self.theme.warning)));
            }
        }
        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Marquee"));
        frame.render_widget(paragraph, area);
    }

    fn results_title(&self) -> String {
        match self.screen {
            Screen::Discover => {
                let state = self.discover.snapshot();
                let committed = self.discover.committed_query();
                let mut title = if committed.is_empty() {
                    "Popular right now".to_string()
                } else {
                    format!("Results for {committed}")
                };
                if let Some(total) = state.total_pages {
                    title.push_str(&format!(" · page {}/{total}", state.current_page));
                }
                if state.loading && !state.items.is_empty() {
                    title.push_str(" · loading more");
                }
                title
            }
            Screen::Search => {
                let query = self.quick.query();
                if query.is_empty() {
                    "Search".to_string()
                } else {
                    format!("Results for {query}")
                }
            }
            Screen::Saved => {
                format!("Saved ({}) · {}", self.saved.len(), self.saved_order.label())
            }
        }
    }

    fn render_results(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.results_title());
        match self.results() {
            ResultsView::Loading => {
                let paragraph = Paragraph::new("Loading movies...")
                    .block(block)
                    .alignment(Alignment::Center);
                frame.render_widget(paragraph, area);
            }
            ResultsView::Error(message) => {
                let lines = vec![
                    Line::from(Span::styled(
                        "Error loading movies",
                        Style::default()
                            .fg(self.theme.danger)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(message, Style::default().fg(self.theme.muted))),
                    Line::from(""),
                    Line::from("Press r to try again"),
                ];
                let paragraph = Paragraph::new(lines)
                    .block(block)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, area);
            }
            ResultsView::Empty => {
                let lines = vec![
                    Line::from(Span::styled(
                        EMPTY_TITLE,
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(EMPTY_HINT, Style::default().fg(self.theme.muted))),
                ];
                let paragraph = Paragraph::new(lines)
                    .block(block)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, area);
            }
            ResultsView::List(movies) => self.render_movie_list(frame, area, block, &movies),
        }
    }

    fn render_movie_list(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        block: Block,
        movies: &[Movie],
    ) {
        let screen = self.screen;
        let ranked = screen == Screen::Discover && self.discover.committed_query().is_empty();
        let saved_ids: HashSet<u64> = self.saved.iter().map(|entry| entry.movie.id).collect();

        let cursor = self.state.cursor_mut(screen);
        cursor.height = area.height.saturating_sub(2) as usize;
        cursor.clamp(movies.len());
        cursor.ensure_visible(movies.len());
        let cursor = *cursor;

        let visible = cursor.visible_range(movies.len());
        let mut list_state = ListState::default();
        if !visible.is_empty() {
            list_state.select(Some(cursor.cursor - cursor.offset));
        }

        let items: Vec<ListItem> = movies[visible.clone()]
            .iter()
            .enumerate()
            .map(|(idx, movie)| {
                let global_index = visible.start + idx;
                let marker = if global_index == cursor.cursor {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                let mut line = vec![marker];
                if ranked && global_index < TOP_RANKED {
                    line.push(Span::styled(
                        format!("#{} ", global_index + 1),
                        Style::default().fg(self.theme.accent_alt),
                    ));
                }
                line.push(Span::styled(
                    truncate_title(&movie.title, TITLE_MAX_LEN),
                    Style::default()
                        .fg(self.theme.primary_fg)
                        .add_modifier(Modifier::BOLD),
                ));
                line.push(Span::styled(
                    format!(" · {}", year_from_date(&movie.release_date)),
                    Style::default().fg(self.theme.muted),
                ));
                line.push(Span::styled(
                    format!(" ★ {}", format_rating(movie.vote_average)),
                    Style::default().fg(self.theme.warning),
                ));
                if saved_ids.contains(&movie.id) {
                    line.push(Span::styled(" ♥", Style::default().fg(self.theme.success)));
                }
                ListItem::new(Line::from(line))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_details(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Details");
        let Some(movie) = self.current_movie() else {
            let paragraph = Paragraph::new("Nothing selected").block(block);
            frame.render_widget(paragraph, area);
            return;
        };

        let mut lines = vec![Line::from(Span::styled(
            movie.title.clone(),
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        ))];

        let genres = genre_names(&movie.genre_ids).join(", ");
        let mut facts = format!(
            "{} · ★ {} ({} votes)",
            year_from_date(&movie.release_date),
            format_rating(movie.vote_average),
            movie.vote_count
        );
        if !genres.is_empty() {
            facts.push_str(&format!(" · {genres}"));
        }
        lines.push(Line::from(Span::styled(facts, Style::default().fg(self.theme.muted))));

        let state = self.details.snapshot();
        let details = state
            .data
            .flatten()
            .filter(|details| details.id == movie.id);
        match (&details, &state.error) {
            (Some(details), _) => {
                if let Some(tagline) = details.tagline.as_deref().filter(|t| !t.is_empty()) {
                    lines.push(Line::from(Span::styled(
                        tagline.to_string(),
                        Style::default().add_modifier(Modifier::ITALIC),
                    )));
                }
                let mut extra = Vec::new();
                if let Some(runtime) = details.runtime_label() {
                    extra.push(runtime);
                }
                if !details.status.is_empty() {
                    extra.push(details.status.clone());
                }
                if details.budget > 0 {
                    extra.push(format!("budget ${}", details.budget));
                }
                if details.revenue > 0 {
                    extra.push(format!("revenue ${}", details.revenue));
                }
                if !extra.is_empty() {
                    lines.push(Line::from(extra.join(" · ")));
                }
            }
            (None, Some(error)) if !state.loading => {
                lines.push(Line::from(Span::styled(
                    format!("Details unavailable: {error}"),
                    Style::default().fg(self.theme.danger),
                )));
            }
            (None, _) => {
                lines.push(Line::from(Span::styled(
                    "Loading details...",
                    Style::default().fg(self.theme.muted),
                )));
            }
        }

        lines.push(Line::from(""));
        let overview = details
            .as_ref()
            .and_then(|details| details.overview.clone())
            .filter(|overview| !overview.is_empty())
            .unwrap_or_else(|| movie.overview.clone());
        lines.push(Line::from(if overview.is_empty() {
            "No overview available".to_string()
        } else {
            overview
        }));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "Poster: {}",
                image_url_with_base(
                    &self.config.image_base_url,
                    movie.poster_path.as_deref(),
                    self.config.poster_size,
                )
            ),
            Style::default().fg(self.theme.muted),
        )));
        if let Some(homepage) = details
            .as_ref()
            .and_then(|details| details.homepage.as_deref())
            .filter(|homepage| !homepage.is_empty())
        {
            lines.push(Line::from(Span::styled(
                format!("Homepage: {homepage}"),
                Style::default().fg(self.theme.muted),
            )));
        }

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.state.mode == Mode::Query {
            format!("Query: {}", self.query())
        } else {
            self.state.status.clone()
        };
        let secondary = "Tab screens · j/k move · / search · r reload · s save · o sort · q quit";
        let paragraph = Paragraph::new(vec![
            Line::from(primary),
            Line::from(Span::styled(secondary, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

/// Redraw whenever a fetch component changes state.
fn forward_revisions(mut revisions: Revisions, sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        while revisions.changed().await.is_ok() {
            if sender.send(AppEvent::Refresh).await.is_err() {
                break;
            }
        }
    });
}

fn near_end(cursor: usize, len: usize) -> bool {
    len > 0 && cursor + LOAD_MORE_THRESHOLD >= len
}

/// Cursor and scroll offset of one list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ListCursor {
    cursor: usize,
    offset: usize,
    height: usize,
}

impl ListCursor {
    fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let idx = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = idx as usize;
        self.ensure_visible(len);
    }

    fn move_to(&mut self, index: usize, len: usize) {
        if len == 0 {
            return;
        }
        self.cursor = index.min(len - 1);
        self.ensure_visible(len);
    }

    fn page(&mut self, forward: bool, len: usize) {
        if len == 0 || self.height == 0 {
            return;
        }
        let delta = self.height.min(len) as isize;
        self.move_by(if forward { delta } else { -delta }, len);
    }

    fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    fn ensure_visible(&mut self, len: usize) {
        if len == 0 || self.height == 0 {
            self.offset = 0;
            return;
        }
        let max_offset = len.saturating_sub(self.height);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + self.height {
            self.offset = self.cursor + 1 - self.height;
        }
        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }

    fn visible_range(&self, len: usize) -> Range<usize> {
        let start = self.offset.min(len);
        let end = (self.offset + self.height.max(1)).min(len);
        start..end
    }
}

struct UiState {
    lists: [ListCursor; 3],
    status: String,
    mode: Mode,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            lists: [ListCursor::default(); 3],
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
        }
    }
}

impl UiState {
    fn index(screen: Screen) -> usize {
        match screen {
            Screen::Discover => 0,
            Screen::Search => 1,
            Screen::Saved => 2,
        }
    }

    fn cursor(&self, screen: Screen) -> &ListCursor {
        &self.lists[Self::index(screen)]
    }

    fn cursor_mut(&mut self, screen: Screen) -> &mut ListCursor {
        &mut self.lists[Self::index(screen)]
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}
