/// A static catalog entry: one launchable app on the desktop.
///
/// Definitions are loaded once at startup and never mutated. The apps have
/// no logic of their own — the id and name feed the prompt, the glyph and
/// accent color feed the shell.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppDefinition {
    pub id: String,
    pub name: String,
    pub glyph: String,
    /// Accent color as `#rrggbb`.
    pub color: String,
}

impl AppDefinition {
    pub fn new(id: &str, name: &str, glyph: &str, color: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            glyph: glyph.into(),
            color: color.into(),
        }
    }
}

/// The built-in app catalog.
pub fn builtin_catalog() -> Vec<AppDefinition> {
    vec![
        AppDefinition::new("my_computer", "System Info", "💻", "#e3f2fd"),
        AppDefinition::new("documents", "Files", "📁", "#f1f8e9"),
        AppDefinition::new("notepad_app", "Notes", "📝", "#fffde7"),
        AppDefinition::new("web_browser_app", "Internet", "🌐", "#e0f7fa"),
        AppDefinition::new("calculator_app", "Calc", "🧮", "#f5f5f5"),
        AppDefinition::new("travel_app", "Travel", "✈️", "#e8f5e9"),
        AppDefinition::new("shopping_app", "Store", "🛒", "#fff3e0"),
        AppDefinition::new("gaming_app", "Arcade", "🎮", "#f3e5f5"),
        AppDefinition::new("weather_app", "Weather", "☀️", "#fff9c4"),
        AppDefinition::new("music_app", "Music", "🎵", "#fce4ec"),
    ]
}

/// Look up an app definition by id.
pub fn find_app<'a>(catalog: &'a [AppDefinition], id: &str) -> Option<&'a AppDefinition> {
    catalog.iter().find(|app| app.id == id)
}
