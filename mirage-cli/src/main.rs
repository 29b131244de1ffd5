mod app;
mod event;
mod markup;
mod theme;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use crossterm::event::{Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use mirage_core::{
    AppDefinition, Directive, GeminiBackend, GenerativeBackend, Settings, ShellState, StreamEvent,
    builtin_catalog, stream_view,
};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use app::{App, SettingsField};
use event::AppEvent;

#[derive(Parser)]
struct Args {
    /// Gemini API key (falls back to the GEMINI_API_KEY / API_KEY env vars)
    #[arg(long, env = "GEMINI_API_KEY")]
    api_key: Option<String>,

    /// Model name
    #[arg(long, default_value = mirage_core::client::DEFAULT_MODEL)]
    model: String,

    /// Base URL for the generative API
    #[arg(long, default_value = mirage_core::client::DEFAULT_BASE_URL)]
    base_url: String,

    /// Interaction history depth sent with each prompt (0-20)
    #[arg(long, default_value_t = mirage_core::shell::DEFAULT_HISTORY_LEN)]
    history_len: usize,

    /// Start with view caching enabled
    #[arg(long)]
    cache: bool,

    /// Disable mouse scroll support (re-enables terminal text selection)
    #[arg(long)]
    no_mouse: bool,

    /// Run headlessly: open the named app, print the generated view to
    /// stdout, exit
    #[arg(short = 'p', long = "print")]
    print_app: Option<String>,
}

fn cleanup_terminal() {
    ratatui::restore();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up file-based tracing (logs go to ~/.mirage/mirage.log)
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let log_dir = PathBuf::from(&home).join(".mirage");
        std::fs::create_dir_all(&log_dir).ok();
        let log_file = std::fs::File::create(log_dir.join("mirage.log"))?;

        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::try_from_env("MIRAGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(log_file)
            .with_ansi(false)
            .init();
    }

    let args = Args::parse();
    tracing::info!(model = %args.model, "mirage starting");

    let backend: Arc<dyn GenerativeBackend> = Arc::new(match args.api_key {
        Some(ref key) => {
            GeminiBackend::new(key.clone(), args.model.clone(), args.base_url.clone())
        }
        None => GeminiBackend::from_env(Some(args.model.clone()), Some(args.base_url.clone())),
    });

    let settings = Settings {
        max_history_len: args.history_len.min(mirage_core::shell::MAX_HISTORY_LEN),
        cache_enabled: args.cache,
    };
    let catalog = builtin_catalog();

    // ── Headless mode: skip TUI, stream one view, print to stdout ──
    if let Some(ref target) = args.print_app {
        return run_headless(backend, catalog, settings, target).await;
    }

    // Install panic hook that restores the terminal
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        cleanup_terminal();
        default_hook(info);
    }));

    let terminal = ratatui::init();

    if !args.no_mouse {
        crossterm::execute!(std::io::stdout(), crossterm::event::EnableMouseCapture)?;
    }

    let result = run_app(terminal, backend, catalog, settings, args.model.clone()).await;

    if !args.no_mouse {
        let _ = crossterm::execute!(std::io::stdout(), crossterm::event::DisableMouseCapture);
    }
    cleanup_terminal();

    result
}

/// Stream the view for one app open and print fragments as they arrive.
async fn run_headless(
    backend: Arc<dyn GenerativeBackend>,
    catalog: Vec<AppDefinition>,
    settings: Settings,
    target: &str,
) -> anyhow::Result<()> {
    use std::io::Write;

    let app = catalog
        .iter()
        .find(|a| a.id == target || a.name.eq_ignore_ascii_case(target))
        .ok_or_else(|| anyhow::anyhow!("no such app: {target}"))?
        .clone();

    let history = mirage_core::record(
        &[],
        mirage_core::InteractionData::app_open(&app),
        settings.max_history_len,
    );
    let mut stream = stream_view(backend, history, settings.max_history_len, catalog);

    let mut stdout = std::io::stdout();
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Fragment(text) => {
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            StreamEvent::Done { error } => {
                stdout.write_all(b"\n")?;
                if let Some(err) = error {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}

/// Cancel the previous view stream (if any) and spawn a forwarding task for
/// a new one when the directive asks for it.
fn handle_directive(
    directive: Directive,
    backend: &Arc<dyn GenerativeBackend>,
    catalog: &[AppDefinition],
    active_cancel: &mut Option<CancellationToken>,
    app_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    if let Some(token) = active_cancel.take() {
        token.cancel();
    }
    let Directive::Stream {
        history,
        max_history,
        generation,
    } = directive
    else {
        return;
    };

    tracing::debug!(generation, entries = history.len(), "starting view stream");
    let mut stream = stream_view(Arc::clone(backend), history, max_history, catalog.to_vec());
    *active_cancel = Some(stream.cancel_handle());
    let tx = app_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = stream.next().await {
            if tx.send(AppEvent::Stream { generation, event }).is_err() {
                break;
            }
        }
    });
}

async fn run_app(
    mut terminal: DefaultTerminal,
    backend: Arc<dyn GenerativeBackend>,
    catalog: Vec<AppDefinition>,
    settings: Settings,
    model: String,
) -> anyhow::Result<()> {
    let mut app = App::new(model, settings, catalog.clone());

    // Cancellation token for the in-flight view stream
    let mut active_cancel: Option<CancellationToken> = None;

    // Unified event channel
    let (app_tx, mut app_rx) = mpsc::unbounded_channel::<AppEvent>();

    // Stop flag for the event reader thread
    let stop = Arc::new(AtomicBool::new(false));

    // Spawn terminal event reader using poll() with timeout so it can stop
    let term_tx = app_tx.clone();
    let stop_reader = Arc::clone(&stop);
    tokio::task::spawn_blocking(move || {
        while !stop_reader.load(Ordering::Relaxed) {
            if crossterm::event::poll(std::time::Duration::from_millis(50)).unwrap_or(false) {
                match crossterm::event::read() {
                    Ok(ev) => {
                        if term_tx.send(AppEvent::Terminal(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    });

    // Tick timer for spinner animation and the taskbar clock
    let tick_tx = app_tx.clone();
    let stop_tick = Arc::clone(&stop);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(100));
        loop {
            interval.tick().await;
            if stop_tick.load(Ordering::Relaxed) {
                break;
            }
            if tick_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    // SIGTERM handler for graceful shutdown
    let sigterm_tx = app_tx.clone();
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sig) = signal(SignalKind::terminate()) {
            sig.recv().await;
            let _ = sigterm_tx.send(AppEvent::Quit);
        }
    });

    while app.running {
        if app.dirty {
            // Clamp the scroll before the immutable borrow in draw
            let size = terminal.size()?;
            let total = ui::content_height(&app, size.width);
            let viewport = ui::content_viewport_height(size.height);
            app.scroll_offset = app.scroll_offset.min(total.saturating_sub(viewport));

            terminal.draw(|frame| ui::draw(frame, &app))?;
            app.dirty = false;
        }

        let Some(event) = app_rx.recv().await else {
            break;
        };

        match event {
            AppEvent::Terminal(TermEvent::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                app.dirty = true;

                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    break;
                }

                let directive = match app.shell.state().clone() {
                    ShellState::Desktop => handle_desktop_key(key.code, &mut app, &terminal)?,
                    ShellState::AppOpen(_) => handle_app_key(key.code, &mut app, &terminal)?,
                    ShellState::SettingsOpen => handle_settings_key(key.code, &mut app),
                };
                if let Some(directive) = directive {
                    handle_directive(directive, &backend, &catalog, &mut active_cancel, &app_tx);
                }
            }
            AppEvent::Terminal(TermEvent::Mouse(mouse)) => {
                use crossterm::event::MouseEventKind;
                match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        app.scroll_up(3);
                        app.dirty = true;
                    }
                    MouseEventKind::ScrollDown => {
                        let size = terminal.size()?;
                        let total = ui::content_height(&app, size.width);
                        let viewport = ui::content_viewport_height(size.height);
                        app.scroll_down(3, total, viewport);
                        app.dirty = true;
                    }
                    _ => {}
                }
            }
            AppEvent::Terminal(_) => {
                // Resize events, etc.
                app.dirty = true;
            }
            AppEvent::Stream { generation, event } => {
                if let StreamEvent::Done {
                    error: Some(ref err),
                } = event
                {
                    tracing::warn!(generation, "view stream failed: {err}");
                }
                if app.handle_stream(generation, event) {
                    app.dirty = true;
                }
            }
            AppEvent::Tick => {
                app.tick += 1;
                if app.shell.is_loading() || app.tick % 100 == 0 {
                    // Spinner frames while streaming; the clock every 10s.
                    app.dirty = true;
                }
            }
            AppEvent::Quit => break,
        }
    }

    stop.store(true, Ordering::Relaxed);
    Ok(())
}

fn handle_desktop_key(
    code: KeyCode,
    app: &mut App,
    terminal: &DefaultTerminal,
) -> anyhow::Result<Option<Directive>> {
    let cols = (terminal.size()?.width / 16).max(1) as usize;
    let count = app.catalog.len();
    let directive = match code {
        KeyCode::Char('q') => {
            app.running = false;
            None
        }
        KeyCode::Left => {
            app.desktop_sel = app.desktop_sel.saturating_sub(1);
            None
        }
        KeyCode::Right => {
            app.desktop_sel = (app.desktop_sel + 1).min(count.saturating_sub(1));
            None
        }
        KeyCode::Up => {
            app.desktop_sel = app.desktop_sel.saturating_sub(cols);
            None
        }
        KeyCode::Down => {
            app.desktop_sel = (app.desktop_sel + cols).min(count.saturating_sub(1));
            None
        }
        KeyCode::Enter => Some(app.open_desktop_selection()),
        KeyCode::Char('s') => Some(app.toggle_settings()),
        KeyCode::Char(c @ '1'..='6') => {
            let index = c as usize - '1' as usize;
            Some(app.open_app_at(index))
        }
        _ => None,
    };
    Ok(directive)
}

fn handle_app_key(
    code: KeyCode,
    app: &mut App,
    terminal: &DefaultTerminal,
) -> anyhow::Result<Option<Directive>> {
    if app.editing {
        let directive = match code {
            KeyCode::Esc => {
                app.editing = false;
                None
            }
            KeyCode::Enter => {
                app.editing = false;
                Some(app.activate_selected())
            }
            KeyCode::Backspace => {
                app.input_backspace();
                None
            }
            KeyCode::Char(c) => {
                app.input_push(c);
                None
            }
            _ => None,
        };
        return Ok(directive);
    }

    let directive = match code {
        KeyCode::Esc => Some(app.close_app()),
        KeyCode::Tab | KeyCode::Down => {
            app.select_next();
            None
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.select_prev();
            None
        }
        KeyCode::Enter => {
            if app.selected_element().is_some_and(|e| e.is_input()) {
                app.editing = true;
                None
            } else {
                Some(app.activate_selected())
            }
        }
        KeyCode::PageUp => {
            let viewport = ui::content_viewport_height(terminal.size()?.height);
            app.scroll_up(viewport);
            None
        }
        KeyCode::PageDown => {
            let size = terminal.size()?;
            let total = ui::content_height(app, size.width);
            let viewport = ui::content_viewport_height(size.height);
            app.scroll_down(viewport, total, viewport);
            None
        }
        KeyCode::Char('s') => Some(app.toggle_settings()),
        KeyCode::Char(c @ '1'..='6') => {
            let index = c as usize - '1' as usize;
            Some(app.open_app_at(index))
        }
        _ => None,
    };
    Ok(directive)
}

fn handle_settings_key(code: KeyCode, app: &mut App) -> Option<Directive> {
    match code {
        KeyCode::Esc => Some(app.toggle_settings()),
        KeyCode::Down | KeyCode::Tab => {
            app.settings_draft.field = app.settings_draft.field.next();
            None
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.settings_draft.field = app.settings_draft.field.prev();
            None
        }
        KeyCode::Char(' ') if app.settings_draft.field == SettingsField::Cache => {
            app.settings_draft.cache_checked = !app.settings_draft.cache_checked;
            None
        }
        KeyCode::Char(c @ '0'..='9') if app.settings_draft.field == SettingsField::Depth => {
            app.settings_draft.length_input.push(c);
            app.settings_draft.notice = None;
            None
        }
        KeyCode::Backspace if app.settings_draft.field == SettingsField::Depth => {
            app.settings_draft.length_input.pop();
            app.settings_draft.notice = None;
            None
        }
        KeyCode::Enter => match app.settings_draft.field {
            SettingsField::Save => Some(app.save_settings()),
            SettingsField::Cancel => Some(app.toggle_settings()),
            _ => {
                app.settings_draft.field = app.settings_draft.field.next();
                None
            }
        },
        _ => None,
    }
}
