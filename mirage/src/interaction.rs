/// Kind of user gesture captured by the render surface or the desktop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    AppOpen,
    Click,
    InputChange,
}

impl InteractionKind {
    /// Wire name used in prompts and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::AppOpen => "app_open",
            InteractionKind::Click => "click",
            InteractionKind::InputChange => "input_change",
        }
    }
}

/// One user gesture, immutable once created.
///
/// Created by the render surface (or the desktop, for app opens) at the
/// moment of user action, appended to history and never mutated after.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InteractionData {
    /// Identifier of the element interacted with (`data-interaction-id`).
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    /// Human-readable label of the element, when one was visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    /// Element role tag (e.g. "icon", "button", "input").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    /// Input value — present only for input-change interactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Id of the app the interaction occurred in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_context: Option<String>,
}

impl InteractionData {
    /// The app-open interaction recorded when an app launches.
    pub fn app_open(app: &crate::catalog::AppDefinition) -> Self {
        Self {
            id: app.id.clone(),
            kind: InteractionKind::AppOpen,
            element_text: Some(app.name.clone()),
            element_type: Some("icon".into()),
            value: None,
            app_context: Some(app.id.clone()),
        }
    }
}

/// Record an interaction into a bounded most-recent-first history.
///
/// Pure prepend-then-truncate: the new interaction goes in front, then the
/// sequence is cut to `max_len`. At `max_len = 0` the result is empty:
/// even the triggering interaction is dropped, and downstream the empty
/// history short-circuits the stream to the waiting block.
pub fn record(
    history: &[InteractionData],
    interaction: InteractionData,
    max_len: usize,
) -> Vec<InteractionData> {
    let mut out = Vec::with_capacity(history.len() + 1);
    out.push(interaction);
    out.extend_from_slice(history);
    out.truncate(max_len);
    out
}

/// Separator for cache keys. Two paths whose joined strings collide are
/// allowed to collide (the built-in catalog never embeds the separator).
const PATH_SEPARATOR: &str = "__";

/// Ordered interaction identifiers since an app was opened.
///
/// Grows by one id per interaction within an app session; reset when the
/// app closes or the settings panel opens. Used only as a cache key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationPath {
    segments: Vec<String>,
}

impl NavigationPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to exactly `[id]` — the start of an app session.
    pub fn open(&mut self, id: &str) {
        self.segments.clear();
        self.segments.push(id.to_string());
    }

    pub fn push(&mut self, id: &str) {
        self.segments.push(id.to_string());
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Cache key: segments joined with the fixed separator.
    pub fn key(&self) -> String {
        self.segments.join(PATH_SEPARATOR)
    }
}
