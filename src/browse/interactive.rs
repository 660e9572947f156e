//! Interactive TUI for browsing the library's albums

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::io;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::logging;
use compactd::datasource::CandidateSource;
use compactd::item::{
    ArtistItem, ArtistSubtitle, ImageContent, ItemContext, ItemLifecycle, ItemProps, ItemView,
    Layout as RowLayout,
};
use compactd::library::BlobRegistry;
use compactd::view::{
    AlbumsListView, Click, History, LayoutMetrics, Level, LibraryRoute, ListEntry, Navigator,
    Notifier, RowCache, StatusLine,
};

const HEADER_HEIGHT: u16 = 3;
const FOOTER_HEIGHT: u16 = 3;

/// Where the browser starts and how rows look
#[derive(Debug, Clone)]
pub struct BrowseOptions {
    pub route: LibraryRoute,
    pub layout: RowLayout,
    pub overscan: usize,
}

/// Browser state
struct BrowserState {
    ctx: ItemContext,
    history: History,
    route: LibraryRoute,
    view: AlbumsListView,
    rows: RowCache,
    /// Header row of the scoped artist
    artist_row: Option<ItemLifecycle>,
    status: Rc<StatusLine>,
    entries: Vec<ListEntry>,
    selected: usize,
    /// First entry on screen
    first: usize,
    filter_mode: bool,
    show_help: bool,
}

impl BrowserState {
    fn new(ctx: ItemContext, source: Arc<dyn CandidateSource>, options: &BrowseOptions) -> Self {
        let status = Rc::new(StatusLine::new());
        let view = AlbumsListView::new(source, status.clone());
        let rows = RowCache::new(ctx.clone(), options.layout, options.overscan);

        Self {
            ctx,
            history: History::new(&options.route.format()),
            route: LibraryRoute::default(),
            view,
            rows,
            artist_row: None,
            status,
            entries: Vec::new(),
            selected: 0,
            first: 0,
            filter_mode: false,
            show_help: false,
        }
    }

    /// Follow the current history entry, fetching when the scope changed
    async fn apply_route(&mut self, force_fetch: bool) {
        let route = match LibraryRoute::parse(self.history.current()) {
            Ok(route) => route,
            Err(e) => {
                self.status.error(&format!("Invalid location: {}", e));
                return;
            }
        };
        let rescoped = force_fetch || route.artist != self.route.artist;
        debug!("Route {} (rescoped: {})", route.format(), rescoped);

        self.view.set_route(&route);
        self.route = route;
        if !rescoped {
            return;
        }

        self.selected = 0;
        self.first = 0;
        self.sync_artist_row();
        if let Err(e) = self.view.fetch(&self.ctx.provider).await {
            self.status.error(&format!("Failed to load albums: {}", e));
        }
    }

    fn sync_artist_row(&mut self) {
        let Some(id) = self.route.artist_id() else {
            self.artist_row = None;
            return;
        };
        match &mut self.artist_row {
            Some(row) => row.set_id(&id),
            None => {
                let item = ArtistItem::new(self.ctx.clone(), ArtistSubtitle::Counters);
                let mut row =
                    ItemLifecycle::new(Box::new(item), ItemProps::new(id, RowLayout::Minimal));
                row.mount(None);
                self.artist_row = Some(row);
            }
        }
    }

    /// Apply background results and reconcile the mounted rows with the screen
    fn refresh(&mut self) -> Result<()> {
        self.view.poll();
        self.rows.poll();
        if let Some(row) = &mut self.artist_row {
            row.poll();
        }

        let (width, height) = crossterm::terminal::size()?;
        let metrics = LayoutMetrics {
            window_height: u32::from(height.saturating_sub(FOOTER_HEIGHT)),
            top: u32::from(HEADER_HEIGHT),
            width: u32::from(width),
        };
        if self.view.compute_height(metrics) {
            debug!("List resized to {:?}x{:?}", self.view.width(), self.view.height());
        }

        self.entries = self.view.items();
        if self.selected >= self.entries.len() {
            self.selected = self.entries.len().saturating_sub(1);
        }
        let visible = self.visible_rows();
        self.first = scroll_to(self.selected, self.first, visible);

        let active = self.active_key();
        self.rows
            .update(&self.entries, self.first, visible, active.as_deref());
        Ok(())
    }

    fn visible_rows(&self) -> usize {
        visible_rows(self.view.height(), self.rows.layout())
    }

    /// Key of the album the route points at
    fn active_key(&self) -> Option<String> {
        self.entries.iter().find_map(|entry| match entry {
            ListEntry::Album(uri) if AlbumsListView::is_active(uri, &self.route) => {
                Some(uri.clone())
            }
            _ => None,
        })
    }

    fn move_up(&mut self) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        self.selected = if self.selected == 0 {
            len - 1
        } else {
            self.selected - 1
        };
    }

    fn move_down(&mut self) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        self.selected = if self.selected >= len - 1 {
            0
        } else {
            self.selected + 1
        };
    }
}

/// Run the interactive browser until the user quits
pub async fn run_browser(
    ctx: ItemContext,
    source: Arc<dyn CandidateSource>,
    options: BrowseOptions,
) -> Result<()> {
    let mut state = BrowserState::new(ctx, source, &options);
    state.apply_route(true).await;

    // Logging would draw over the screen
    logging::set_tui_mode(true);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_browser_loop(&mut terminal, &mut state).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    logging::set_tui_mode(false);

    result
}

async fn run_browser_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut BrowserState,
) -> Result<()> {
    loop {
        state.refresh()?;
        terminal.draw(|f| draw_ui(f, state))?;

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if state.show_help {
                state.show_help = false;
                continue;
            }

            if state.filter_mode {
                handle_filter_key(state, key.code);
                continue;
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Up | KeyCode::Char('k') => state.move_up(),
                KeyCode::Down | KeyCode::Char('j') => state.move_down(),
                KeyCode::Enter | KeyCode::Char('l') => handle_enter(state).await?,
                KeyCode::Backspace | KeyCode::Char('h') => handle_back(state).await,
                KeyCode::Char('a') => {
                    let next = state.route.toggle_all();
                    state.history.replace(&next.format());
                    state.apply_route(false).await;
                }
                KeyCode::Char('/') => {
                    if state.route.artist.is_some() {
                        state.status.info("Filtering applies to the full album list");
                    } else {
                        state.filter_mode = true;
                    }
                }
                KeyCode::Char('?') => state.show_help = true,
                _ => {}
            }
        }
    }
}

fn handle_filter_key(state: &mut BrowserState, code: KeyCode) {
    let mut filter = state.view.filter().to_string();
    match code {
        KeyCode::Esc => {
            state.filter_mode = false;
            filter.clear();
        }
        KeyCode::Enter => state.filter_mode = false,
        KeyCode::Backspace => {
            filter.pop();
        }
        KeyCode::Char(c) => filter.push(c),
        _ => return,
    }
    if filter != state.view.filter() {
        state.view.set_filter(&filter);
        state.selected = 0;
        state.first = 0;
    }
}

async fn handle_enter(state: &mut BrowserState) -> Result<()> {
    match state.entries.get(state.selected).cloned() {
        Some(ListEntry::Album(uri)) => {
            let active = AlbumsListView::is_active(&uri, &state.route);
            if state
                .view
                .handle_album_click(&uri, active, Click::primary(), &mut state.history)?
            {
                state.apply_route(false).await;
            }
        }
        Some(ListEntry::SearchPrompt) => state.view.handle_search_click(),
        Some(ListEntry::Candidate(album)) => {
            state
                .status
                .info(&format!("{} is not in the library", album.name));
        }
        Some(ListEntry::Searching) | None => {}
    }
    Ok(())
}

async fn handle_back(state: &mut BrowserState) {
    if state.history.back() {
        state.apply_route(false).await;
    } else {
        state.status.info("Already at the start");
    }
}

/// Lines one row takes in the given layout
fn row_lines(layout: RowLayout) -> usize {
    match layout {
        RowLayout::Minimal | RowLayout::Compact => 1,
        RowLayout::Medium | RowLayout::Large => 2,
    }
}

/// Rows that fit in a list of `height` lines, borders excluded
fn visible_rows(height: Option<u32>, layout: RowLayout) -> usize {
    let lines = height.unwrap_or(0).saturating_sub(2) as usize;
    (lines / row_lines(layout)).max(1)
}

/// First row to show so that `selected` stays on screen
fn scroll_to(selected: usize, first: usize, visible: usize) -> usize {
    if selected < first {
        selected
    } else if selected >= first + visible {
        selected + 1 - visible
    } else {
        first
    }
}

/// A blob that no longer resolves is drawn as a placeholder
fn image_marker(image: &ImageContent, size: u32, blobs: &BlobRegistry) -> &'static str {
    if size == 0 {
        return "";
    }
    match image {
        ImageContent::Blob(url) if blobs.resolve(url).is_some() => "■",
        ImageContent::Placeholder | ImageContent::Blob(_) => "□",
        ImageContent::Remote(_) => "◆",
    }
}

fn item_lines(view: &ItemView, layout: RowLayout, blobs: &BlobRegistry) -> Vec<Line<'static>> {
    let header_style = if view.header.is_skeleton() {
        Style::default().fg(Color::DarkGray)
    } else if view.has_class("active") {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let mut header = Vec::new();
    let marker = image_marker(&view.image, view.image_size, blobs);
    if !marker.is_empty() {
        header.push(Span::raw(format!("{} ", marker)));
    }
    header.push(Span::styled(view.header.as_str().to_string(), header_style));
    if view.has_class("ds-album-component") {
        header.push(Span::styled(
            " (not in library)",
            Style::default().fg(Color::Yellow),
        ));
    }

    let subtitle = view.subtitle.as_str().to_string();
    let subtitle_style = Style::default().fg(Color::DarkGray);
    match layout {
        RowLayout::Minimal => vec![Line::from(header)],
        RowLayout::Compact => {
            if !subtitle.is_empty() {
                header.push(Span::raw(" · "));
                header.push(Span::styled(subtitle, subtitle_style));
            }
            vec![Line::from(header)]
        }
        RowLayout::Medium | RowLayout::Large => vec![
            Line::from(header),
            Line::from(vec![Span::raw("  "), Span::styled(subtitle, subtitle_style)]),
        ],
    }
}

fn entry_lines(
    entry: &ListEntry,
    view: Option<ItemView>,
    layout: RowLayout,
    blobs: &BlobRegistry,
) -> Vec<Line<'static>> {
    match (entry, view) {
        (ListEntry::SearchPrompt, _) => vec![Line::styled(
            "Search more albums...",
            Style::default().fg(Color::Cyan),
        )],
        (ListEntry::Searching, _) => vec![Line::styled(
            "Searching...",
            Style::default().fg(Color::DarkGray),
        )],
        (_, Some(view)) => item_lines(&view, layout, blobs),
        (entry, None) => vec![Line::from(entry.key())],
    }
}

fn draw_ui(f: &mut Frame, state: &BrowserState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(3),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(f.area());

    // Header
    let scope = if state.route.all { " (all libraries)" } else { "" };
    let header_lines = match &state.artist_row {
        Some(row) => {
            let view = row.render();
            let title_style = if view.header.is_skeleton() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            };
            vec![
                Line::from(vec![
                    Span::styled(view.header.as_str().to_string(), title_style),
                    Span::raw(scope),
                ]),
                Line::styled(
                    view.subtitle.as_str().to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
            ]
        }
        None => vec![Line::from(vec![
            Span::styled(
                "Albums",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(scope),
        ])],
    };
    let header = Paragraph::new(header_lines).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, chunks[0]);

    // List
    let layout = state.rows.layout();
    let visible = state.visible_rows();
    let end = (state.first + visible).min(state.entries.len());
    let items: Vec<ListItem> = state
        .entries
        .get(state.first.min(end)..end)
        .unwrap_or(&[])
        .iter()
        .map(|entry| {
            let view = state.rows.view(&entry.key());
            ListItem::new(entry_lines(entry, view, layout, &state.ctx.blobs))
        })
        .collect();

    let title = format!(" {} ", state.route.format());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut list_state = ListState::default();
    if !state.entries.is_empty() {
        list_state.select(Some(state.selected.saturating_sub(state.first)));
    }
    f.render_stateful_widget(list, chunks[1], &mut list_state);

    // Footer
    let footer = match state.status.current() {
        Some(notice) => {
            let color = match notice.level {
                Level::Info => Color::Yellow,
                Level::Error => Color::Red,
            };
            Paragraph::new(format!("{} {}", notice.at.format("%H:%M:%S"), notice.text))
                .style(Style::default().fg(color))
        }
        None => Paragraph::new(
            "↑/↓: Navigate | Enter: Open | Backspace: Back | a: All libraries | /: Filter | ?: Help | q: Quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    f.render_widget(footer.block(Block::default().borders(Borders::TOP)), chunks[2]);

    // Filter input overlay
    if state.filter_mode || !state.view.filter().is_empty() {
        let filter_text = if state.filter_mode {
            format!("Filter: {}█", state.view.filter())
        } else {
            format!("Filter: {} (/ to edit)", state.view.filter())
        };
        let filter_style = if state.filter_mode {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let filter = Paragraph::new(filter_text)
            .style(filter_style)
            .block(Block::default().borders(Borders::ALL).title("Filter"));
        let area = centered_rect(60, 3, f.area());
        f.render_widget(ratatui::widgets::Clear, area);
        f.render_widget(filter, area);
    }

    // Help overlay
    if state.show_help {
        let help_lines = vec![
            Line::from("Keyboard Shortcuts"),
            Line::from(""),
            Line::styled("Navigation", Style::default().add_modifier(Modifier::BOLD)),
            Line::from("  ↑/k, ↓/j    Move up/down"),
            Line::from("  Enter/l     Open album, or close it when open"),
            Line::from("  Backspace/h Go back"),
            Line::from("  a           Toggle all libraries"),
            Line::from(""),
            Line::styled("Search", Style::default().add_modifier(Modifier::BOLD)),
            Line::from("  /           Filter the album list"),
            Line::from("  Enter       On the search row, suggest missing albums"),
            Line::from("  q, Esc      Quit"),
            Line::from(""),
            Line::styled("Press any key to close", Style::default().fg(Color::DarkGray)),
        ];
        let help_popup = Paragraph::new(help_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .style(Style::default().bg(Color::Black)),
        );
        let area = centered_rect(50, 16, f.area());
        f.render_widget(ratatui::widgets::Clear, area);
        f.render_widget(help_popup, area);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use compactd::item::Content;

    fn view(header: Content, classes: &[&str]) -> ItemView {
        ItemView {
            class_names: classes.iter().map(|c| c.to_string()).collect(),
            image: ImageContent::Placeholder,
            image_size: 56,
            header,
            subtitle: Content::Text("12 tracks".to_string()),
        }
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_scroll_keeps_selection_visible() {
        assert_eq!(scroll_to(0, 0, 5), 0);
        assert_eq!(scroll_to(4, 0, 5), 0);
        assert_eq!(scroll_to(5, 0, 5), 1);
        assert_eq!(scroll_to(2, 4, 5), 2);
        assert_eq!(scroll_to(9, 0, 1), 9);
    }

    #[test]
    fn test_visible_rows() {
        assert_eq!(visible_rows(None, RowLayout::Compact), 1);
        assert_eq!(visible_rows(Some(12), RowLayout::Compact), 10);
        assert_eq!(visible_rows(Some(12), RowLayout::Medium), 5);
    }

    #[test]
    fn test_item_lines_per_layout() {
        let blobs = BlobRegistry::new();
        let album = view(Content::Text("Kid A".to_string()), &["album-component"]);

        let compact = item_lines(&album, RowLayout::Compact, &blobs);
        assert_eq!(compact.len(), 1);
        assert_eq!(text(&compact[0]), "□ Kid A · 12 tracks");

        let medium = item_lines(&album, RowLayout::Medium, &blobs);
        assert_eq!(medium.len(), 2);
        assert_eq!(text(&medium[1]), "  12 tracks");

        let minimal = ItemView {
            image_size: 0,
            ..album
        };
        let lines = item_lines(&minimal, RowLayout::Minimal, &blobs);
        assert_eq!(text(&lines[0]), "Kid A");
    }

    #[test]
    fn test_artwork_marker_follows_blob_lifetime() {
        let blobs = BlobRegistry::new();
        let url = blobs.create(bytes::Bytes::from_static(b"png"));
        let album = ItemView {
            image: ImageContent::Blob(url.clone()),
            ..view(Content::Text("Kid A".to_string()), &["album-component"])
        };

        let lines = item_lines(&album, RowLayout::Minimal, &blobs);
        assert_eq!(text(&lines[0]), "■ Kid A");

        blobs.revoke(&url);
        let lines = item_lines(&album, RowLayout::Minimal, &blobs);
        assert_eq!(text(&lines[0]), "□ Kid A");
    }

    #[test]
    fn test_candidate_marked_missing() {
        let candidate = view(
            Content::Text("In Rainbows".to_string()),
            &["ds-album-component"],
        );
        let lines = item_lines(&candidate, RowLayout::Minimal, &BlobRegistry::new());
        assert!(text(&lines[0]).ends_with("(not in library)"));
    }

    #[test]
    fn test_sentinel_rows() {
        let blobs = BlobRegistry::new();
        let lines = entry_lines(&ListEntry::SearchPrompt, None, RowLayout::Large, &blobs);
        assert_eq!(text(&lines[0]), "Search more albums...");
        let lines = entry_lines(&ListEntry::Searching, None, RowLayout::Large, &blobs);
        assert_eq!(text(&lines[0]), "Searching...");
    }
}
