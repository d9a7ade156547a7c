use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::{macros::format_description, OffsetDateTime};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::{Draft, DraftField, NotesSession, SelectionPhase, TextBuffer};
use crate::api::{Note, NoteSummary};
use crate::highlight::build_highlight_regex;

pub const BRAND: &str = "NotesApp";
pub const UNTITLED: &str = "Untitled";
pub const EMPTY_LIST: &str = "No notes found.";
pub const LOADING: &str = "Loading...";
pub const PLACEHOLDER: &str = "Select or create a note to begin.";
pub const DELETE_PROMPT: &str = "Delete this note?";

/// Everything one frame needs, borrowed from the running app.
pub struct View<'a> {
    pub session: &'a NotesSession,
    pub base_url: &'a str,
    pub search_active: bool,
    pub snippet_chars: usize,
    pub status_message: Option<&'a str>,
}

pub fn draw_app(frame: &mut Frame, view: &View<'_>, list_state: &mut ListState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(frame.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(vertical[0]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(columns[0]);

    render_search(frame, view, sidebar[0]);
    render_list(frame, view, sidebar[1], list_state);
    render_detail(frame, view, columns[1]);

    let status = Paragraph::new(build_status_line(view)).style(Style::default().fg(Color::Gray));
    frame.render_widget(status, vertical[1]);

    if view.session.pending_delete().is_some() {
        render_delete_overlay(frame);
    }
}

fn render_search(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let query = view.session.query();
    let mut spans = Vec::new();
    if query.is_empty() && !view.search_active {
        spans.push(Span::styled(
            "Search notes...",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::raw(query.to_string()));
    }
    if view.search_active {
        spans.push(Span::styled("▌", Style::default().fg(Color::Cyan)));
    }
    let border = if view.search_active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let search = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title("Search (/)")
            .borders(Borders::ALL)
            .border_style(border),
    );
    frame.render_widget(search, area);
}

fn render_list(frame: &mut Frame, view: &View<'_>, area: Rect, list_state: &mut ListState) {
    let session = view.session;
    let summaries = session.summaries();
    let block = Block::default().title("Notes").borders(Borders::ALL);

    if summaries.is_empty() {
        let message = if session.is_list_pending() {
            LOADING
        } else {
            EMPTY_LIST
        };
        let empty = Paragraph::new(Span::styled(message, Style::default().fg(Color::Gray)))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let highlight_regex = build_highlight_regex(session.query());
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let items: Vec<ListItem> = summaries
        .iter()
        .map(|summary| {
            list_item(
                summary,
                session.selected_id() == Some(&summary.id),
                highlight_regex.as_ref(),
                highlight_style,
                view.snippet_chars,
            )
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn list_item(
    summary: &NoteSummary,
    selected: bool,
    regex: Option<&Regex>,
    highlight_style: Style,
    snippet_chars: usize,
) -> ListItem<'static> {
    let mut title_spans = Vec::new();
    if selected {
        title_spans.push(Span::styled(
            "● ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    }
    title_spans.extend(highlight_line(
        display_title(&summary.title),
        regex,
        highlight_style,
        Style::default().add_modifier(Modifier::BOLD),
    ));
    let snippet_line = Line::from(highlight_line(
        &snippet(&summary.content, snippet_chars),
        regex,
        highlight_style,
        Style::default().fg(Color::Gray),
    ));
    ListItem::new(vec![Line::from(title_spans), snippet_line])
}

fn render_detail(frame: &mut Frame, view: &View<'_>, area: Rect) {
    frame.render_widget(Clear, area);
    let session = view.session;
    match session.phase() {
        SelectionPhase::Editing | SelectionPhase::Saving => {
            if let Some(draft) = session.draft() {
                render_editor(frame, draft, session.phase(), area);
            }
        }
        SelectionPhase::Viewing => {
            if let Some(note) = session.selected_note() {
                render_viewer(frame, note, session.query(), area);
            }
        }
        SelectionPhase::LoadingSelection => {
            let loading = Paragraph::new(Span::styled(LOADING, Style::default().fg(Color::Gray)))
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(loading, area);
        }
        SelectionPhase::Idle => {
            let placeholder =
                Paragraph::new(Span::styled(PLACEHOLDER, Style::default().fg(Color::Gray)))
                    .block(Block::default().borders(Borders::ALL));
            frame.render_widget(placeholder, area);
        }
    }
}

fn render_viewer(frame: &mut Frame, note: &Note, query: &str, area: Rect) {
    let regex = build_highlight_regex(query);
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(
            display_title(&note.title).to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(highlight_body(&note.content, regex.as_ref(), highlight_style));
    let viewer = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .title(format!("Note #{}", note.id))
                .borders(Borders::ALL),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(viewer, area);
}

fn render_editor(frame: &mut Frame, draft: &Draft, phase: SelectionPhase, area: Rect) {
    let fields = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);
    let saving = phase == SelectionPhase::Saving;
    let heading = match (draft.note_id(), saving) {
        (_, true) => "Saving...".to_string(),
        (Some(id), false) => format!("Editing #{id}"),
        (None, false) => "New note".to_string(),
    };

    let field_style = |field: DraftField| {
        if !saving && draft.focus() == field {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    };

    let title = Paragraph::new(field_text(draft.title(), "Title")).block(
        Block::default()
            .title(heading)
            .borders(Borders::ALL)
            .border_style(field_style(DraftField::Title)),
    );
    frame.render_widget(title, fields[0]);

    let content = Paragraph::new(field_text(draft.content(), "Your note here...")).block(
        Block::default()
            .title(if draft.is_dirty() { "Content*" } else { "Content" })
            .borders(Borders::ALL)
            .border_style(field_style(DraftField::Content)),
    );
    frame.render_widget(content, fields[1]);

    if !saving {
        let area = match draft.focus() {
            DraftField::Title => fields[0],
            DraftField::Content => fields[1],
        };
        if let Some((x, y)) = caret_position(draft.active(), area) {
            frame.set_cursor(x, y);
        }
    }
}

fn field_text(text: &str, placeholder: &'static str) -> Text<'static> {
    if text.is_empty() {
        return Text::from(Span::styled(
            placeholder,
            Style::default().fg(Color::DarkGray),
        ));
    }
    Text::from(
        text.split('\n')
            .map(|line| Line::from(line.to_string()))
            .collect::<Vec<_>>(),
    )
}

/// Screen cell of the caret inside a bordered, unwrapped field.
fn caret_position(buffer: &TextBuffer, area: Rect) -> Option<(u16, u16)> {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    if inner_width == 0 || inner_height == 0 {
        return None;
    }
    let before = &buffer.text()[..buffer.cursor()];
    let row = before.matches('\n').count();
    let line = before.rsplit('\n').next().unwrap_or_default();
    let col = UnicodeWidthStr::width(line);
    let row = (row as u16).min(inner_height - 1);
    let col = (col as u16).min(inner_width - 1);
    Some((area.x + 1 + col, area.y + 1 + row))
}

fn render_delete_overlay(frame: &mut Frame) {
    let area = centered_rect(50, 25, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            DELETE_PROMPT,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y/Enter confirm • n/Esc cancel",
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(
        Block::default()
            .title("Confirm Delete")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn build_status_line(view: &View<'_>) -> Text<'static> {
    let session = view.session;
    let phase: &'static str = session.phase().into();
    let mut spans = vec![
        Span::styled(
            BRAND,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(view.base_url.to_string()),
        Span::raw(" | "),
        Span::styled(phase, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if session.is_loading() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            "loading…",
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(synced) = session.last_synced() {
        spans.push(Span::raw(" | synced "));
        spans.push(Span::styled(
            format_time_short(synced),
            Style::default().fg(Color::Gray),
        ));
    }

    let message_line = if let Some(error) = session.error_message() {
        Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
    } else if let Some(message) = view.status_message {
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Cyan),
        ))
    } else {
        Line::from("")
    };

    let hints = if session.is_editing() {
        "Tab field • Ctrl-s save • Esc cancel"
    } else if view.search_active {
        "type to search • Enter keep • Esc clear"
    } else {
        "j/k move • Enter open • a add • n new • e edit • d delete • / search • Ctrl-r refresh • q quit"
    };
    let keys_line = Line::from(vec![
        Span::styled(
            "Keys: ",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]);

    Text::from(vec![Line::from(spans), message_line, keys_line])
}

/// Title as shown in the list and viewer.
pub fn display_title(title: &str) -> &str {
    if title.is_empty() {
        UNTITLED
    } else {
        title
    }
}

/// First `max_chars` graphemes of `content` on one line, with "..." appended
/// only when something was cut.
pub fn snippet(content: &str, max_chars: usize) -> String {
    let flat = content.replace(['\r', '\n'], " ");
    let mut graphemes = flat.graphemes(true);
    let head: String = graphemes.by_ref().take(max_chars).collect();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn format_time_short(dt: OffsetDateTime) -> String {
    dt.format(&format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    if let Some(re) = regex {
        let mut spans = Vec::new();
        let mut last = 0;
        for mat in re.find_iter(text) {
            if mat.start() > last {
                spans.push(Span::styled(
                    text[last..mat.start()].to_string(),
                    base_style,
                ));
            }
            spans.push(Span::styled(mat.as_str().to_string(), highlight_style));
            last = mat.end();
        }
        if last < text.len() {
            spans.push(Span::styled(text[last..].to_string(), base_style));
        }
        if spans.is_empty() {
            spans.push(Span::styled(text.to_string(), base_style));
        }
        spans
    } else {
        vec![Span::styled(text.to_string(), base_style)]
    }
}

fn highlight_body(body: &str, regex: Option<&Regex>, highlight_style: Style) -> Vec<Line<'static>> {
    if body.is_empty() {
        return vec![Line::from("")];
    }
    body.lines()
        .map(|line| Line::from(highlight_line(line, regex, highlight_style, Style::default())))
        .collect()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
