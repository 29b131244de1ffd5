use ratatui::style::{Color, Modifier, Style};

// ── Slate: cool blue-tinted darks ───────────────────────────────────
pub const SLATE: Color = Color::Rgb(13, 15, 20);
pub const SLATE_RAISED: Color = Color::Rgb(20, 23, 30);

// ── Iron: structural greys ─────────────────────────────────────────
pub const IRON: Color = Color::Rgb(44, 48, 56);
pub const IRON_MID: Color = Color::Rgb(74, 80, 90);
pub const IRON_TEXT: Color = Color::Rgb(96, 102, 112);

// ── Bone: text hierarchy ───────────────────────────────────────────
pub const BONE_DIM: Color = Color::Rgb(126, 132, 140);
pub const BONE_MID: Color = Color::Rgb(190, 196, 204);
pub const BONE: Color = Color::Rgb(224, 228, 236);

// ── Accent colors ──────────────────────────────────────────────────
pub const AZURE: Color = Color::Rgb(92, 156, 232);
pub const MOSS: Color = Color::Rgb(132, 168, 110);
pub const AMBER: Color = Color::Rgb(226, 170, 80);
pub const ERROR: Color = Color::Rgb(208, 80, 80);

pub const STATUS_SEP: &str = " · ";

// ── Style helpers ──────────────────────────────────────────────────

/// "mirage" title in the status bar
pub fn app_title() -> Style {
    Style::default().fg(AZURE).add_modifier(Modifier::BOLD)
}

/// Model name / secondary status text
pub fn model_name() -> Style {
    Style::default().fg(BONE_DIM)
}

pub fn status_separator() -> Style {
    Style::default().fg(IRON_MID)
}

/// Status bar and taskbar background
pub fn bar_bg() -> Style {
    Style::default().bg(SLATE_RAISED)
}

/// Main area background
pub fn surface_bg() -> Style {
    Style::default().bg(SLATE)
}

/// Generated prose in the content view
pub fn content_text() -> Style {
    Style::default().fg(BONE)
}

/// Headings in generated content
pub fn heading() -> Style {
    Style::default().fg(BONE).add_modifier(Modifier::BOLD)
}

/// Badge on an interactive element, e.g. `[3]`
pub fn badge() -> Style {
    Style::default().fg(AZURE)
}

/// Badge on the currently selected interactive element
pub fn badge_selected() -> Style {
    Style::default()
        .fg(SLATE)
        .bg(AZURE)
        .add_modifier(Modifier::BOLD)
}

/// Input-field preview inside generated content
pub fn input_preview() -> Style {
    Style::default().fg(AMBER)
}

/// Desktop icon name
pub fn icon_name() -> Style {
    Style::default().fg(BONE_MID)
}

/// Selected desktop icon
pub fn icon_selected() -> Style {
    Style::default()
        .fg(BONE)
        .bg(IRON)
        .add_modifier(Modifier::BOLD)
}

/// Window frame border
pub fn window_border() -> Style {
    Style::default().fg(IRON_MID)
}

/// Window title
pub fn window_title() -> Style {
    Style::default().fg(BONE).add_modifier(Modifier::BOLD)
}

/// Loading spinner + text
pub fn loading() -> Style {
    Style::default().fg(AZURE)
}

/// Error banner above the content
pub fn error() -> Style {
    Style::default().fg(ERROR)
}

/// Settings field label
pub fn field_label() -> Style {
    Style::default().fg(BONE_MID)
}

/// Focused settings field
pub fn field_focused() -> Style {
    Style::default().fg(AZURE).add_modifier(Modifier::BOLD)
}

/// Enabled/confirmation accents
pub fn notice_ok() -> Style {
    Style::default().fg(MOSS)
}

/// Taskbar clock
pub fn clock() -> Style {
    Style::default().fg(BONE_MID)
}

/// Active app indicator on the taskbar
pub fn taskbar_active() -> Style {
    Style::default().fg(AZURE).add_modifier(Modifier::BOLD)
}

pub fn taskbar_idle() -> Style {
    Style::default().fg(IRON_TEXT)
}

/// Help bar key labels
pub fn help_key() -> Style {
    Style::default().fg(AZURE).add_modifier(Modifier::BOLD)
}

/// Help bar descriptions
pub fn help_desc() -> Style {
    Style::default().fg(IRON_MID)
}
