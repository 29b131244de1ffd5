use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use mirage_core::ShellState;

use crate::app::{App, SettingsField};
use crate::markup;
use crate::theme;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Columns per icon cell on the desktop grid.
const ICON_CELL_W: u16 = 16;
const ICON_CELL_H: u16 = 4;

pub fn draw(frame: &mut Frame, app: &App) {
    frame.render_widget(Block::default().style(theme::surface_bg()), frame.area());

    let chunks = Layout::vertical([
        Constraint::Length(1), // status bar
        Constraint::Min(3),    // desktop / window / settings
        Constraint::Length(1), // taskbar
        Constraint::Length(1), // help bar
    ])
    .split(frame.area());

    draw_status_bar(frame, app, chunks[0]);
    match app.shell.state() {
        ShellState::Desktop => draw_desktop(frame, app, chunks[1]),
        ShellState::AppOpen(_) => draw_window(frame, app, chunks[1]),
        ShellState::SettingsOpen => draw_settings(frame, app, chunks[1]),
    }
    draw_taskbar(frame, app, chunks[2]);
    draw_help_bar(frame, app, chunks[3]);
}

/// Rows the current content occupies at `width`, for scroll clamping.
pub fn content_height(app: &App, width: u16) -> usize {
    let inner = width.saturating_sub(4) as usize;
    let lines = markup::render_markup(app.shell.content(), None, None);
    markup::wrapped_height(&lines, inner.max(1))
}

pub fn content_viewport_height(height: u16) -> usize {
    // status + taskbar + help + window borders
    height.saturating_sub(5) as usize
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" mirage", theme::app_title()),
        Span::styled(theme::STATUS_SEP, theme::status_separator()),
        Span::styled(app.model.clone(), theme::model_name()),
    ];
    if app.shell.is_loading() {
        spans.push(Span::styled(theme::STATUS_SEP, theme::status_separator()));
        spans.push(Span::styled(
            format!("{} streaming", SPINNER[app.tick % SPINNER.len()]),
            theme::loading(),
        ));
    }
    let settings = app.shell.settings();
    let depth = format!(
        "depth {}{}",
        settings.max_history_len,
        theme::STATUS_SEP
    );
    let cache = format!(
        "cache {} ",
        if settings.cache_enabled { "on" } else { "off" }
    );
    let cache_style = if settings.cache_enabled {
        theme::notice_ok()
    } else {
        theme::model_name()
    };
    let left_width: usize = spans.iter().map(|s| s.content.width()).sum();
    let pad = (area.width as usize).saturating_sub(left_width + depth.width() + cache.width());
    if pad > 0 {
        spans.push(Span::styled(" ".repeat(pad), theme::bar_bg()));
    }
    spans.push(Span::styled(depth, theme::model_name()));
    spans.push(Span::styled(cache, cache_style));

    frame.render_widget(Paragraph::new(Line::from(spans)).style(theme::bar_bg()), area);
}

fn draw_desktop(frame: &mut Frame, app: &App, area: Rect) {
    let cols = (area.width / ICON_CELL_W).max(1) as usize;
    for (i, def) in app.catalog.iter().enumerate() {
        let row = (i / cols) as u16;
        let col = (i % cols) as u16;
        let cell = Rect {
            x: area.x + col * ICON_CELL_W,
            y: area.y + 1 + row * ICON_CELL_H,
            width: ICON_CELL_W.min(area.width.saturating_sub(col * ICON_CELL_W)),
            height: ICON_CELL_H.min(area.height.saturating_sub(1 + row * ICON_CELL_H)),
        };
        if cell.width == 0 || cell.height < 2 {
            continue;
        }
        let selected = i == app.desktop_sel;
        let name_style = if selected {
            theme::icon_selected()
        } else {
            theme::icon_name()
        };
        let lines = vec![
            Line::from(Span::raw(center(&def.glyph, cell.width as usize))),
            Line::from(Span::styled(
                center(&def.name, cell.width as usize),
                name_style,
            )),
        ];
        frame.render_widget(Paragraph::new(lines), cell);
    }
}

fn draw_window(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .shell
        .active_app()
        .map(|a| format!(" {} {} ", a.glyph, a.name))
        .unwrap_or_default();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::window_border())
        .title(Span::styled(title, theme::window_title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut rows = Layout::vertical([Constraint::Length(0), Constraint::Min(1)]).split(inner);
    if app.shell.error().is_some() {
        rows = Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).split(inner);
        let err = app.shell.error().unwrap_or_default();
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                format!("⚠ {err}"),
                theme::error(),
            ))),
            rows[0],
        );
    }
    let body = rows[1];

    if app.shell.is_loading() && app.shell.content().is_empty() {
        let spinner = SPINNER[app.tick % SPINNER.len()];
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                format!("{spinner} Initializing Virtual Application..."),
                theme::loading(),
            ))),
            body,
        );
        return;
    }

    let lines = markup::render_markup(
        app.shell.content(),
        app.selected_element().map(|_| app.element_sel),
        app.input_buffer(),
    );
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll_rows(app.scroll_offset), 0));
    frame.render_widget(paragraph, body);
}

fn draw_settings(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::window_border())
        .title(Span::styled(" ⚙ Settings ", theme::window_title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let draft = &app.settings_draft;
    let field_style = |field: SettingsField| {
        if draft.field == field {
            theme::field_focused()
        } else {
            theme::field_label()
        }
    };

    let depth_marker = if draft.field == SettingsField::Depth { "▸ " } else { "  " };
    let cache_marker = if draft.field == SettingsField::Cache { "▸ " } else { "  " };
    let checkbox = if draft.cache_checked { "[x]" } else { "[ ]" };

    let mut lines = vec![
        Line::default(),
        Line::from(vec![
            Span::raw(depth_marker),
            Span::styled("Memory Depth (0-20): ", field_style(SettingsField::Depth)),
            Span::styled(format!("{}▏", draft.length_input), theme::input_preview()),
        ]),
        Line::default(),
        Line::from(vec![
            Span::raw(cache_marker),
            Span::styled(
                format!("{checkbox} Neural Caching (reuse generated views)"),
                field_style(SettingsField::Cache),
            ),
        ]),
        Line::default(),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(" Save ", field_style(SettingsField::Save)),
            Span::raw("   "),
            Span::styled(" Cancel ", field_style(SettingsField::Cancel)),
        ]),
    ];
    if let Some(ref notice) = draft.notice {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("  {notice}"),
            theme::error(),
        )));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_taskbar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(" ⚙ ", theme::taskbar_idle())];
    let active = app.shell.active_app().map(|a| a.id.clone());
    for (i, def) in app.catalog.iter().take(6).enumerate() {
        let style = if active.as_deref() == Some(def.id.as_str()) {
            theme::taskbar_active()
        } else {
            theme::taskbar_idle()
        };
        spans.push(Span::styled(format!("{} {}", i + 1, def.glyph), style));
        spans.push(Span::raw("  "));
    }

    let clock = chrono::Local::now().format("%H:%M ").to_string();
    let left_width: usize = spans.iter().map(|s| s.content.width()).sum();
    let pad = (area.width as usize).saturating_sub(left_width + clock.width());
    if pad > 0 {
        spans.push(Span::styled(" ".repeat(pad), theme::bar_bg()));
    }
    spans.push(Span::styled(clock, theme::clock()));

    frame.render_widget(Paragraph::new(Line::from(spans)).style(theme::bar_bg()), area);
}

fn draw_help_bar(frame: &mut Frame, app: &App, area: Rect) {
    let keys: &[(&str, &str)] = match app.shell.state() {
        ShellState::Desktop => &[
            ("←→↑↓", "select"),
            ("Enter", "open"),
            ("1-6", "taskbar"),
            ("s", "settings"),
            ("q", "quit"),
        ],
        ShellState::AppOpen(_) => {
            if app.editing {
                &[("type", "edit field"), ("Enter", "submit"), ("Esc", "stop editing")]
            } else {
                &[
                    ("Tab/↑↓", "select"),
                    ("Enter", "activate"),
                    ("Esc", "close"),
                    ("PgUp/PgDn", "scroll"),
                ]
            }
        }
        ShellState::SettingsOpen => &[
            ("↑↓", "field"),
            ("Space", "toggle"),
            ("Enter", "confirm"),
            ("Esc", "close"),
        ],
    };

    let mut spans = vec![Span::raw(" ")];
    for (key, desc) in keys {
        spans.push(Span::styled(*key, theme::help_key()));
        spans.push(Span::styled(format!(" {desc}  "), theme::help_desc()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).style(theme::bar_bg()), area);
}

/// Scroll offset as widget rows, saturating instead of wrapping.
fn scroll_rows(offset: usize) -> u16 {
    u16::try_from(offset).unwrap_or(u16::MAX)
}

fn center(text: &str, width: usize) -> String {
    let w = text.width();
    if w >= width {
        return text.to_string();
    }
    let left = (width - w) / 2;
    format!("{}{}", " ".repeat(left), text)
}
