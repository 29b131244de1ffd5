//! Prompt assembly for the generative backend.
//!
//! Everything here is deterministic string work: the fixed system prompt
//! (parameterized only by the history depth), the interaction log, and the
//! fixed HTML blocks shown for degraded outcomes. Interaction labels and
//! values are interpolated verbatim, no escaping; `format_interaction_line`
//! is the single place a stricter policy would go.

use crate::catalog::{AppDefinition, find_app};
use crate::interaction::InteractionData;

/// Fixed role/format instructions, parameterized only by `max_history`.
pub fn system_prompt(max_history: usize) -> String {
    format!(
        r#"
**Role:**
You are the kernel of Mirage OS, a futuristic web-based operating system.
You generate modern, sleek, and high-quality HTML5/Tailwind-styled content for application windows.

**UI/UX Standards:**
- **Modern Aesthetic:** Use whitespace effectively. Use rounded corners (rounded-xl or rounded-2xl).
- **Interactive:** Every button, card, or icon must be interactive via `data-interaction-id`.
- **Responsive Components:** Use Flexbox (`flex`) and Grid (`grid`) for layout.
- **Glassmorphism:** Where appropriate, use classes like `glass` or `backdrop-blur-sm`.

**Available Apps & Specs:**
1. "System Info": Overview of CPU (AI-powered), RAM (Neural-linked), and OS version. Use stats and progress bars.
2. "Files": A file explorer with folders and file previews.
3. "Notes": A rich-text-like editor interface.
4. "Internet": A browser shell with a search field and result cards.
5. "Calc": A beautiful, neumorphic or flat-designed calculator.
6. "Travel": Maps and trip planners with destination cards.
7. "Store": E-commerce experience with product cards (image, title, price, buy button).
8. "Arcade": A gaming hub. Select from: Snake, Tic-Tac-Toe, Pong, or Tetris.
9. "Weather": Forecast cards with icons and temperatures.
10. "Music": A music player interface with album art, track info, and playback controls.

**HTML constraints:**
- NO `<html>`, `<body>`, or `<head>`.
- Use Tailwind classes (e.g., `text-gray-800`, `p-4`, `bg-white/50`, `shadow-lg`).
- Use `llm-button`, `llm-text`, `llm-title`, `llm-input`, `llm-container`, `llm-row` for standard OS elements.
- Interactivity: EVERY click/input element MUST have `data-interaction-id`.
- Use `data-value-from` to link buttons to inputs.

**History Context (max {max_history}):**
The user interactions are provided to you. Use them to maintain app state (e.g., if a user is in a sub-folder, show that folder's contents).

Your response should be ONLY raw HTML content.
"#
    )
}

/// One history line: `[<app or OS>] <kind> on '<label or id>'<: "value">`.
///
/// Labels and values pass through verbatim, control characters included.
fn format_interaction_line(interaction: &InteractionData) -> String {
    let label = interaction
        .element_text
        .as_deref()
        .unwrap_or(&interaction.id);
    let context = interaction.app_context.as_deref().unwrap_or("OS");
    let mut line = format!("[{context}] {} on '{label}'", interaction.kind.as_str());
    if let Some(value) = &interaction.value {
        line.push_str(&format!(": \"{value}\""));
    }
    line
}

/// Assemble the full prompt: system prompt, current interaction, and the
/// reverse-chronological log of the remaining history entries.
///
/// The first history entry is the current interaction; the rest are listed
/// most-recent-last with 1-based ordinals.
///
/// # Panics
///
/// `history` must be non-empty. An empty history never reaches prompt
/// assembly: the stream short-circuits it to the waiting block first.
pub fn build_prompt(
    history: &[InteractionData],
    max_history: usize,
    catalog: &[AppDefinition],
) -> String {
    let system = system_prompt(max_history);

    let current = &history[0];
    let past = &history[1..];

    let current_app = current
        .app_context
        .as_deref()
        .and_then(|id| find_app(catalog, id));

    let label = current.element_text.as_deref().unwrap_or(&current.id);
    let mut action = format!("User Action: {} on '{label}'", current.kind.as_str());
    if let Some(value) = &current.value {
        action.push_str(&format!(" (Input: \"{value}\")"));
    }

    let context = match current_app {
        Some(app) => format!("Context: Application '{}'", app.name),
        None => "Context: System Desktop".to_string(),
    };

    let mut history_block = String::new();
    if !past.is_empty() {
        history_block.push_str("\n\nSession History (most recent last):");
        for (i, entry) in past.iter().rev().enumerate() {
            history_block.push_str(&format!("\n{}. {}", i + 1, format_interaction_line(entry)));
        }
    }

    format!(
        "{system}\n\nCurrent State:\n{context}\n{action}\n{history_block}\n\nTask: Generate the view layer HTML for the current app state. Focus on aesthetics and usability.\n\nResponse:"
    )
}

/// Shown when no credential is configured. No remote call is made.
pub const CONFIG_ERROR_HTML: &str = r#"<div class="p-6 text-red-700 bg-red-50 rounded-xl border border-red-200">
      <h2 class="font-bold text-xl mb-2">OS Configuration Required</h2>
      <p>The system API key is missing. Please configure your environment to enable Mirage OS features.</p>
    </div>"#;

/// Shown when the history is empty. No remote call is made.
pub const WAITING_HTML: &str = r#"<div class="p-6 text-orange-700 bg-orange-50 rounded-xl">
      <p class="font-bold">Waiting for user input...</p>
    </div>"#;

/// Shown when the remote call fails; embeds the stringified error verbatim.
pub fn kernel_panic_html(error: &str) -> String {
    format!(
        r#"<div class="p-6 text-red-700 bg-red-50 rounded-xl">
      <h3 class="font-bold text-lg mb-2">Kernel Panic</h3>
      <p>The generative engine encountered an error. This usually happens during high load or network instability.</p>
      <p class="mt-4 text-xs font-mono bg-red-100 p-2 rounded">{error}</p>
    </div>"#
    )
}
