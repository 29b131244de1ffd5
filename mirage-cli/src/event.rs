use crossterm::event::Event as TermEvent;
use mirage_core::StreamEvent;

/// Unified event type for the main loop.
pub enum AppEvent {
    Terminal(TermEvent),
    /// One event from the view stream started for `generation`.
    Stream { generation: u64, event: StreamEvent },
    Tick,
    Quit,
}
