//! The top-level shell controller.
//!
//! One state machine owns everything mutable: the active app, the bounded
//! interaction history, the navigation path, the view cache, and the
//! per-request stream state. All mutations go through named transitions so
//! the machine is testable without a UI. Transitions return a [`Directive`]
//! telling the embedding shell what to do next; the controller itself never
//! performs async work.

use crate::cache::ViewCache;
use crate::catalog::AppDefinition;
use crate::interaction::{InteractionData, NavigationPath, record};

pub const MAX_HISTORY_LEN: usize = 20;
pub const DEFAULT_HISTORY_LEN: usize = 5;

/// User-adjustable parameters, applied atomically via [`Shell::apply_settings`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// History depth, 0–20.
    pub max_history_len: usize,
    /// The view-cache toggle ("statefulness").
    pub cache_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_history_len: DEFAULT_HISTORY_LEN,
            cache_enabled: false,
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("History length must be between 0 and 20.")]
    OutOfRange,
}

/// Shell state. `SettingsOpen` and an open app are mutually exclusive.
#[derive(Clone, Debug, PartialEq)]
pub enum ShellState {
    Desktop,
    AppOpen(AppDefinition),
    SettingsOpen,
}

/// Transient per-request state, reset at the start of every interaction.
#[derive(Debug, Default)]
pub struct StreamState {
    /// Accumulated (possibly partial, mid-stream) markup.
    pub content: String,
    pub loading: bool,
    /// Last stream error, surfaced above the content area.
    pub error: Option<String>,
}

/// What the embedding shell should do after a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    /// Nothing to do (no-op transition or non-streaming state).
    Idle,
    /// A cached view was served; content is already set.
    Served,
    /// Start a new view stream with this context. Fragments must be fed
    /// back through [`Shell::append_fragment`] tagged with `generation`.
    Stream {
        history: Vec<InteractionData>,
        max_history: usize,
        generation: u64,
    },
}

pub struct Shell {
    state: ShellState,
    history: Vec<InteractionData>,
    path: NavigationPath,
    cache: ViewCache,
    stream: StreamState,
    settings: Settings,
    /// Bumped on every transition that invalidates an in-flight stream;
    /// fragments from superseded generations are dropped.
    generation: u64,
}

impl Shell {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: ShellState::Desktop,
            history: Vec::new(),
            path: NavigationPath::new(),
            cache: ViewCache::new(settings.cache_enabled),
            stream: StreamState::default(),
            settings,
            generation: 0,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn active_app(&self) -> Option<&AppDefinition> {
        match &self.state {
            ShellState::AppOpen(app) => Some(app),
            _ => None,
        }
    }

    pub fn history(&self) -> &[InteractionData] {
        &self.history
    }

    pub fn path(&self) -> &NavigationPath {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.stream.content
    }

    pub fn is_loading(&self) -> bool {
        self.stream.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.stream.error.as_deref()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Open an app from the desktop or taskbar. Re-opening the already
    /// active app is a no-op.
    pub fn open_app(&mut self, app: &AppDefinition) -> Directive {
        if self
            .active_app()
            .is_some_and(|active| active.id == app.id)
        {
            return Directive::Idle;
        }

        self.state = ShellState::AppOpen(app.clone());
        self.invalidate_stream();
        // History is rebuilt fresh from the single app-open interaction.
        // At depth 0 the record arithmetic leaves it empty, so the stream
        // short-circuits to the waiting block.
        self.history = record(
            &[],
            InteractionData::app_open(app),
            self.settings.max_history_len,
        );
        self.path.open(&app.id);
        self.cache_or_stream()
    }

    /// Record an in-app interaction from the render surface. Ignored
    /// outside `AppOpen`.
    pub fn interact(&mut self, interaction: InteractionData) -> Directive {
        if !matches!(self.state, ShellState::AppOpen(_)) {
            return Directive::Idle;
        }

        self.path.push(&interaction.id);
        self.history = record(&self.history, interaction, self.settings.max_history_len);
        self.invalidate_stream();
        self.cache_or_stream()
    }

    /// Close the active app and return to the desktop.
    pub fn close_app(&mut self) -> Directive {
        self.state = ShellState::Desktop;
        self.history.clear();
        self.path.clear();
        self.invalidate_stream();
        Directive::Idle
    }

    /// Toggle the settings panel. Entering forcibly closes any open app;
    /// leaving always returns to the desktop as a fresh session.
    pub fn toggle_settings(&mut self) -> Directive {
        self.state = match self.state {
            ShellState::SettingsOpen => ShellState::Desktop,
            _ => ShellState::SettingsOpen,
        };
        self.history.clear();
        self.path.clear();
        self.invalidate_stream();
        Directive::Idle
    }

    /// Validate and apply both settings atomically. Out-of-range or
    /// unparsable input rejects the whole change — neither the depth nor
    /// the cache toggle is applied.
    pub fn apply_settings(
        &mut self,
        raw_history_len: &str,
        cache_enabled: bool,
    ) -> Result<Settings, SettingsError> {
        let len: usize = raw_history_len
            .trim()
            .parse()
            .map_err(|_| SettingsError::OutOfRange)?;
        if len > MAX_HISTORY_LEN {
            return Err(SettingsError::OutOfRange);
        }
        self.settings.max_history_len = len;
        self.settings.cache_enabled = cache_enabled;
        self.cache.set_enabled(cache_enabled);
        Ok(self.settings)
    }

    /// Append a streamed fragment. Fragments tagged with a superseded
    /// generation are dropped — a transition happened since the stream
    /// started. Returns whether the fragment was applied.
    pub fn append_fragment(&mut self, generation: u64, text: &str) -> bool {
        if generation != self.generation {
            return false;
        }
        self.stream.content.push_str(text);
        true
    }

    /// Finish the stream for `generation`. On error-free completion the
    /// accumulated content is written to the view cache (which itself
    /// no-ops while disabled or on unchanged content).
    pub fn finish_stream(&mut self, generation: u64, error: Option<String>) {
        if generation != self.generation {
            return;
        }
        self.stream.loading = false;
        if error.is_none() && !self.path.is_empty() && !self.stream.content.is_empty() {
            self.cache.store(&self.path.key(), &self.stream.content);
        }
        self.stream.error = error;
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &ViewCache {
        &self.cache
    }

    /// Clear per-request state and invalidate any in-flight stream.
    fn invalidate_stream(&mut self) {
        self.stream = StreamState::default();
        self.generation += 1;
    }

    /// Serve from cache or ask the embedding shell to start a stream.
    fn cache_or_stream(&mut self) -> Directive {
        let key = self.path.key();
        if let Some(cached) = self.cache.lookup(&key) {
            self.stream.content = cached.to_string();
            self.stream.loading = false;
            return Directive::Served;
        }
        self.stream.loading = true;
        Directive::Stream {
            history: self.history.clone(),
            max_history: self.settings.max_history_len,
            generation: self.generation,
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use crate::interaction::InteractionKind;

    fn app(id: &str) -> AppDefinition {
        let catalog = builtin_catalog();
        crate::catalog::find_app(&catalog, id).unwrap().clone()
    }

    fn click(id: &str, app_id: &str) -> InteractionData {
        InteractionData {
            id: id.into(),
            kind: InteractionKind::Click,
            element_text: None,
            element_type: Some("button".into()),
            value: None,
            app_context: Some(app_id.into()),
        }
    }

    fn stream_generation(directive: &Directive) -> u64 {
        match directive {
            Directive::Stream { generation, .. } => *generation,
            other => panic!("expected Stream directive, got {other:?}"),
        }
    }

    #[test]
    fn open_app_resets_path_from_any_state() {
        let mut shell = Shell::default();

        shell.open_app(&app("documents"));
        shell.interact(click("folder_1", "documents"));
        shell.interact(click("file_2", "documents"));
        assert_eq!(shell.path().key(), "documents__folder_1__file_2");

        shell.open_app(&app("music_app"));
        assert_eq!(shell.path().segments(), ["music_app"]);

        shell.toggle_settings();
        shell.open_app(&app("documents"));
        assert_eq!(shell.path().segments(), ["documents"]);
        assert!(matches!(shell.state(), ShellState::AppOpen(a) if a.id == "documents"));
    }

    #[test]
    fn open_app_streams_with_single_app_open_interaction() {
        let mut shell = Shell::default();
        let directive = shell.open_app(&app("documents"));
        match directive {
            Directive::Stream { history, max_history, .. } => {
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].kind, InteractionKind::AppOpen);
                assert_eq!(history[0].id, "documents");
                assert_eq!(max_history, DEFAULT_HISTORY_LEN);
            }
            other => panic!("expected Stream, got {other:?}"),
        }
        assert!(shell.is_loading());
        assert_eq!(shell.content(), "");
    }

    #[test]
    fn reopening_active_app_is_noop() {
        let mut shell = Shell::default();
        shell.open_app(&app("documents"));
        let generation = shell.generation();
        assert_eq!(shell.open_app(&app("documents")), Directive::Idle);
        assert_eq!(shell.generation(), generation);
    }

    #[test]
    fn open_app_at_depth_zero_streams_empty_history() {
        let mut shell = Shell::new(Settings {
            max_history_len: 0,
            cache_enabled: false,
        });
        let directive = shell.open_app(&app("documents"));
        match directive {
            Directive::Stream { history, .. } => assert!(history.is_empty()),
            other => panic!("expected Stream, got {other:?}"),
        }
        // The path still tracks the session even though the history is empty.
        assert_eq!(shell.path().segments(), ["documents"]);
    }

    #[test]
    fn interact_ignored_outside_app() {
        let mut shell = Shell::default();
        assert_eq!(shell.interact(click("x", "documents")), Directive::Idle);
        shell.toggle_settings();
        assert_eq!(shell.interact(click("x", "documents")), Directive::Idle);
        assert!(shell.history().is_empty());
    }

    #[test]
    fn interact_records_and_extends_path() {
        let mut shell = Shell::default();
        shell.open_app(&app("documents"));
        let directive = shell.interact(click("folder_1", "documents"));
        match directive {
            Directive::Stream { history, .. } => {
                assert_eq!(history.len(), 2);
                assert_eq!(history[0].id, "folder_1");
                assert_eq!(history[1].id, "documents");
            }
            other => panic!("expected Stream, got {other:?}"),
        }
        assert_eq!(shell.path().key(), "documents__folder_1");
    }

    #[test]
    fn close_app_clears_everything() {
        let mut shell = Shell::default();
        let generation = stream_generation(&shell.open_app(&app("documents")));
        shell.append_fragment(generation, "<div>partial");
        shell.close_app();

        assert_eq!(*shell.state(), ShellState::Desktop);
        assert!(shell.history().is_empty());
        assert!(shell.path().is_empty());
        assert_eq!(shell.content(), "");
        assert!(shell.error().is_none());
        assert!(!shell.is_loading());
    }

    #[test]
    fn toggle_settings_closes_app_and_clears_state() {
        let mut shell = Shell::default();
        shell.open_app(&app("documents"));
        shell.interact(click("folder_1", "documents"));

        shell.toggle_settings();
        assert_eq!(*shell.state(), ShellState::SettingsOpen);
        assert!(shell.history().is_empty());
        assert!(shell.path().is_empty());

        shell.toggle_settings();
        assert_eq!(*shell.state(), ShellState::Desktop);
        assert!(shell.history().is_empty());
    }

    #[test]
    fn settings_rejection_applies_nothing() {
        let mut shell = Shell::default();
        let before = shell.settings();

        assert_eq!(
            shell.apply_settings("25", true),
            Err(SettingsError::OutOfRange)
        );
        assert_eq!(shell.settings(), before);
        assert!(!shell.cache().is_enabled());

        assert_eq!(
            shell.apply_settings("not a number", true),
            Err(SettingsError::OutOfRange)
        );
        assert_eq!(shell.settings(), before);
    }

    #[test]
    fn settings_apply_both_fields() {
        let mut shell = Shell::default();
        let applied = shell.apply_settings("12", true).unwrap();
        assert_eq!(applied.max_history_len, 12);
        assert!(applied.cache_enabled);
        assert!(shell.cache().is_enabled());
    }

    #[test]
    fn stale_generation_fragments_are_dropped() {
        let mut shell = Shell::default();
        let old_gen = stream_generation(&shell.open_app(&app("documents")));

        // A new interaction supersedes the stream before it finished.
        let new_gen = stream_generation(&shell.interact(click("folder_1", "documents")));
        assert_ne!(old_gen, new_gen);

        assert!(!shell.append_fragment(old_gen, "<div>late</div>"));
        assert_eq!(shell.content(), "");
        shell.finish_stream(old_gen, Some("ignored".into()));
        assert!(shell.error().is_none());
        assert!(shell.is_loading());

        assert!(shell.append_fragment(new_gen, "<div>fresh</div>"));
        assert_eq!(shell.content(), "<div>fresh</div>");
    }

    #[test]
    fn finish_stream_caches_successful_content() {
        let mut shell = Shell::new(Settings {
            max_history_len: 5,
            cache_enabled: true,
        });
        let generation = stream_generation(&shell.open_app(&app("documents")));
        shell.append_fragment(generation, "<div>files</div>");
        shell.finish_stream(generation, None);
        assert!(!shell.is_loading());

        // Revisit: close and reopen the same app hits the cache.
        shell.close_app();
        let directive = shell.open_app(&app("documents"));
        assert_eq!(directive, Directive::Served);
        assert_eq!(shell.content(), "<div>files</div>");
        assert!(!shell.is_loading());
    }

    #[test]
    fn finish_stream_with_error_sets_flag_and_skips_cache() {
        let mut shell = Shell::new(Settings {
            max_history_len: 5,
            cache_enabled: true,
        });
        let generation = stream_generation(&shell.open_app(&app("documents")));
        shell.append_fragment(generation, "<div>panic</div>");
        shell.finish_stream(generation, Some("boom".into()));

        assert_eq!(shell.error(), Some("boom"));
        assert!(shell.cache().is_empty());
    }

    #[test]
    fn disabled_cache_never_serves() {
        let mut shell = Shell::default();
        let generation = stream_generation(&shell.open_app(&app("documents")));
        shell.append_fragment(generation, "<div>files</div>");
        shell.finish_stream(generation, None);

        shell.close_app();
        let directive = shell.open_app(&app("documents"));
        assert!(matches!(directive, Directive::Stream { .. }));
    }

    #[test]
    fn fragments_append_in_order() {
        let mut shell = Shell::default();
        let generation = stream_generation(&shell.open_app(&app("documents")));
        shell.append_fragment(generation, "<div>");
        shell.append_fragment(generation, "a");
        shell.append_fragment(generation, "b</div>");
        assert_eq!(shell.content(), "<div>ab</div>");
    }
}
