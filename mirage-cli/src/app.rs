use std::collections::HashMap;

use mirage_core::{
    Directive, InteractiveElement, Settings, Shell, ShellState, StreamEvent, scan_markup,
};

/// Focusable fields on the settings panel, in traversal order.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Depth,
    Cache,
    Save,
    Cancel,
}

impl SettingsField {
    pub fn next(self) -> Self {
        match self {
            Self::Depth => Self::Cache,
            Self::Cache => Self::Save,
            Self::Save => Self::Cancel,
            Self::Cancel => Self::Depth,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Depth => Self::Cancel,
            Self::Cache => Self::Depth,
            Self::Save => Self::Cache,
            Self::Cancel => Self::Save,
        }
    }
}

/// Editable copy of the settings, committed only via Save.
pub struct SettingsDraft {
    pub length_input: String,
    pub cache_checked: bool,
    pub field: SettingsField,
    /// Rejection or confirmation text shown under the fields.
    pub notice: Option<String>,
}

impl SettingsDraft {
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            length_input: settings.max_history_len.to_string(),
            cache_checked: settings.cache_enabled,
            field: SettingsField::Depth,
            notice: None,
        }
    }
}

pub struct App {
    pub shell: Shell,
    pub catalog: Vec<mirage_core::AppDefinition>,
    pub model: String,
    /// Selected icon on the desktop grid.
    pub desktop_sel: usize,
    /// Interactive elements scanned from the current content, in document order.
    pub elements: Vec<InteractiveElement>,
    pub element_sel: usize,
    /// Text typed into input elements, keyed by interaction id. Survives
    /// re-scans so partial input is not lost as fragments arrive.
    pub input_values: HashMap<String, String>,
    /// Whether keystrokes currently edit the selected input element.
    pub editing: bool,
    pub settings_draft: SettingsDraft,
    pub scroll_offset: usize,
    /// Spinner frame counter
    pub tick: usize,
    /// Whether the UI needs a redraw.
    pub dirty: bool,
    pub running: bool,
}

impl App {
    pub fn new(model: String, settings: Settings, catalog: Vec<mirage_core::AppDefinition>) -> Self {
        let draft = SettingsDraft::from_settings(settings);
        Self {
            shell: Shell::new(settings),
            catalog,
            model,
            desktop_sel: 0,
            elements: Vec::new(),
            element_sel: 0,
            input_values: HashMap::new(),
            editing: false,
            settings_draft: draft,
            scroll_offset: 0,
            tick: 0,
            dirty: true,
            running: true,
        }
    }

    /// Re-extract interactive elements after the content changed, keeping the
    /// selection stable by element id where possible.
    pub fn rescan(&mut self) {
        let previous = self
            .elements
            .get(self.element_sel)
            .map(|e| e.id.clone());
        self.elements = scan_markup(self.shell.content());
        self.element_sel = previous
            .and_then(|id| self.elements.iter().position(|e| e.id == id))
            .unwrap_or(0);
        if self.element_sel >= self.elements.len() {
            self.element_sel = 0;
        }
    }

    /// Apply one event from the view stream. Returns true when the event was
    /// for the current generation and changed visible state.
    pub fn handle_stream(&mut self, generation: u64, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Fragment(text) => {
                let applied = self.shell.append_fragment(generation, &text);
                if applied {
                    self.rescan();
                }
                applied
            }
            StreamEvent::Done { error } => {
                if generation != self.shell.generation() {
                    return false;
                }
                self.shell.finish_stream(generation, error);
                self.rescan();
                true
            }
        }
    }

    /// Fresh view context: drop selection, typed input and scroll.
    pub fn reset_view(&mut self) {
        self.elements.clear();
        self.element_sel = 0;
        self.input_values.clear();
        self.editing = false;
        self.scroll_offset = 0;
    }

    pub fn selected_element(&self) -> Option<&InteractiveElement> {
        self.elements.get(self.element_sel)
    }

    pub fn select_next(&mut self) {
        if !self.elements.is_empty() {
            self.element_sel = (self.element_sel + 1) % self.elements.len();
            self.editing = false;
        }
    }

    pub fn select_prev(&mut self) {
        if !self.elements.is_empty() {
            self.element_sel =
                (self.element_sel + self.elements.len() - 1) % self.elements.len();
            self.editing = false;
        }
    }

    /// Buffer for the currently selected input element.
    pub fn input_buffer(&self) -> Option<&str> {
        let element = self.selected_element()?;
        if !element.is_input() {
            return None;
        }
        Some(
            self.input_values
                .get(&element.id)
                .map(String::as_str)
                .unwrap_or(""),
        )
    }

    pub fn input_push(&mut self, c: char) {
        if let Some(element) = self.elements.get(self.element_sel)
            && element.is_input()
        {
            self.input_values.entry(element.id.clone()).or_default().push(c);
        }
    }

    pub fn input_backspace(&mut self) {
        if let Some(element) = self.elements.get(self.element_sel)
            && let Some(buf) = self.input_values.get_mut(&element.id)
        {
            buf.pop();
        }
    }

    /// Activate the selected element: synthesize the interaction (carrying
    /// typed text for inputs and `data-value-from` links) and feed it to the
    /// shell.
    pub fn activate_selected(&mut self) -> Directive {
        let Some(element) = self.elements.get(self.element_sel).cloned() else {
            return Directive::Idle;
        };
        let value = if element.is_input() {
            self.input_values.get(&element.id).cloned()
        } else if let Some(ref source) = element.value_from {
            self.input_values.get(source).cloned()
        } else {
            None
        };
        let app_context = self.shell.active_app().map(|a| a.id.clone());
        let interaction = element.interaction(app_context.as_deref(), value);
        let directive = self.shell.interact(interaction);
        self.dispatch(directive)
    }

    pub fn open_desktop_selection(&mut self) -> Directive {
        let Some(app) = self.catalog.get(self.desktop_sel).cloned() else {
            return Directive::Idle;
        };
        let directive = self.shell.open_app(&app);
        self.dispatch(directive)
    }

    pub fn open_app_at(&mut self, index: usize) -> Directive {
        let Some(app) = self.catalog.get(index).cloned() else {
            return Directive::Idle;
        };
        let directive = self.shell.open_app(&app);
        self.dispatch(directive)
    }

    pub fn close_app(&mut self) -> Directive {
        let directive = self.shell.close_app();
        self.reset_view();
        directive
    }

    pub fn toggle_settings(&mut self) -> Directive {
        let directive = self.shell.toggle_settings();
        self.reset_view();
        if matches!(self.shell.state(), ShellState::SettingsOpen) {
            self.settings_draft = SettingsDraft::from_settings(self.shell.settings());
        }
        directive
    }

    /// Commit the settings draft. Rejection keeps the panel open and shows
    /// the reason; nothing is applied.
    pub fn save_settings(&mut self) -> Directive {
        let draft_len = self.settings_draft.length_input.clone();
        let cache = self.settings_draft.cache_checked;
        match self.shell.apply_settings(&draft_len, cache) {
            Ok(_) => self.toggle_settings(),
            Err(e) => {
                self.settings_draft.notice = Some(e.to_string());
                Directive::Idle
            }
        }
    }

    fn dispatch(&mut self, directive: Directive) -> Directive {
        match &directive {
            Directive::Idle => {}
            Directive::Served => {
                self.reset_view();
                self.rescan();
            }
            Directive::Stream { .. } => self.reset_view(),
        }
        directive
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize, total: usize, viewport: usize) {
        let max = total.saturating_sub(viewport);
        self.scroll_offset = (self.scroll_offset + lines).min(max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::builtin_catalog;

    fn app() -> App {
        App::new(
            "gemini-3-pro-preview".into(),
            Settings::default(),
            builtin_catalog(),
        )
    }

    fn finish_with(app: &mut App, generation: u64, html: &str) {
        app.handle_stream(generation, StreamEvent::Fragment(html.into()));
        app.handle_stream(generation, StreamEvent::Done { error: None });
    }

    fn stream_generation(directive: &Directive) -> u64 {
        match directive {
            Directive::Stream { generation, .. } => *generation,
            other => panic!("expected Stream directive, got {other:?}"),
        }
    }

    #[test]
    fn stream_fragments_rescan_elements() {
        let mut app = app();
        let generation = stream_generation(&app.open_app_at(1));
        app.handle_stream(
            generation,
            StreamEvent::Fragment(r#"<button data-interaction-id="a">A</button>"#.into()),
        );
        assert_eq!(app.elements.len(), 1);
        app.handle_stream(
            generation,
            StreamEvent::Fragment(r#"<button data-interaction-id="b">B</button>"#.into()),
        );
        assert_eq!(app.elements.len(), 2);
    }

    #[test]
    fn stale_stream_events_change_nothing() {
        let mut app = app();
        let old = stream_generation(&app.open_app_at(1));
        let fresh = stream_generation(&app.open_app_at(2));
        assert!(!app.handle_stream(old, StreamEvent::Fragment("<div>late</div>".into())));
        assert!(app.handle_stream(fresh, StreamEvent::Fragment("<div>ok</div>".into())));
        assert_eq!(app.shell.content(), "<div>ok</div>");
    }

    #[test]
    fn selection_wraps_and_tracks_ids_across_rescans() {
        let mut app = app();
        let generation = stream_generation(&app.open_app_at(1));
        app.handle_stream(
            generation,
            StreamEvent::Fragment(
                r#"<button data-interaction-id="a">A</button>
                   <button data-interaction-id="b">B</button>"#
                    .into(),
            ),
        );
        app.select_next();
        assert_eq!(app.selected_element().unwrap().id, "b");
        app.select_next();
        assert_eq!(app.selected_element().unwrap().id, "a");
        app.select_prev();
        assert_eq!(app.selected_element().unwrap().id, "b");

        // A new fragment prepends an element; selection stays on "b".
        app.handle_stream(
            generation,
            StreamEvent::Fragment(r#"<button data-interaction-id="c">C</button>"#.into()),
        );
        assert_eq!(app.selected_element().unwrap().id, "b");
    }

    #[test]
    fn typed_input_is_carried_on_activation() {
        let mut app = app();
        let generation = stream_generation(&app.open_app_at(2));
        finish_with(
            &mut app,
            generation,
            r#"<input data-interaction-id="note" placeholder="Write..." />"#,
        );
        for c in "hello".chars() {
            app.input_push(c);
        }
        app.input_backspace();
        assert_eq!(app.input_buffer(), Some("hell"));

        let directive = app.activate_selected();
        match directive {
            Directive::Stream { history, .. } => {
                assert_eq!(history[0].value.as_deref(), Some("hell"));
            }
            other => panic!("expected Stream, got {other:?}"),
        }
    }

    #[test]
    fn value_from_button_reads_linked_input() {
        let mut app = app();
        let generation = stream_generation(&app.open_app_at(3));
        finish_with(
            &mut app,
            generation,
            r#"<input data-interaction-id="query" placeholder="Search" />
               <button data-interaction-id="go" data-value-from="query">Go</button>"#,
        );
        for c in "rust".chars() {
            app.input_push(c);
        }
        app.select_next();
        let directive = app.activate_selected();
        match directive {
            Directive::Stream { history, .. } => {
                assert_eq!(history[0].id, "go");
                assert_eq!(history[0].value.as_deref(), Some("rust"));
            }
            other => panic!("expected Stream, got {other:?}"),
        }
    }

    #[test]
    fn save_settings_rejection_keeps_panel_open() {
        let mut app = app();
        app.toggle_settings();
        app.settings_draft.length_input = "42".into();
        assert_eq!(app.save_settings(), Directive::Idle);
        assert_eq!(*app.shell.state(), ShellState::SettingsOpen);
        assert!(app.settings_draft.notice.is_some());
        assert_eq!(app.shell.settings(), Settings::default());
    }

    #[test]
    fn save_settings_applies_and_closes() {
        let mut app = app();
        app.toggle_settings();
        app.settings_draft.length_input = "12".into();
        app.settings_draft.cache_checked = true;
        app.save_settings();
        assert_eq!(*app.shell.state(), ShellState::Desktop);
        assert_eq!(app.shell.settings().max_history_len, 12);
        assert!(app.shell.settings().cache_enabled);
    }

    #[test]
    fn settings_field_traversal_cycles() {
        let mut field = SettingsField::Depth;
        for _ in 0..4 {
            field = field.next();
        }
        assert!(field == SettingsField::Depth);
        assert!(SettingsField::Depth.prev() == SettingsField::Cancel);
    }

    #[test]
    fn served_cache_hit_rescans_immediately() {
        let mut app = App::new(
            "gemini-3-pro-preview".into(),
            Settings {
                max_history_len: 5,
                cache_enabled: true,
            },
            builtin_catalog(),
        );
        let generation = stream_generation(&app.open_app_at(1));
        finish_with(
            &mut app,
            generation,
            r#"<button data-interaction-id="open_folder">Open</button>"#,
        );
        app.close_app();
        assert!(app.elements.is_empty());

        let directive = app.open_app_at(1);
        assert_eq!(directive, Directive::Served);
        assert_eq!(app.elements.len(), 1);
    }
}
