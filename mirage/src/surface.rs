//! Render-surface scanning of generated markup.
//!
//! The backend tags every interactive element with `data-interaction-id`
//! (prompt convention, not enforced). The scanner pulls those elements out
//! of possibly partial markup — malformed mid-stream HTML is expected and
//! simply yields whatever complete opening tags exist so far — and turns an
//! activation into an [`InteractionData`] for the next cycle.

use std::sync::LazyLock;

use regex::Regex;

use crate::interaction::{InteractionData, InteractionKind};

static ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([a-zA-Z][a-zA-Z0-9-]*)((?:[^>"]|"[^"]*")*?)\bdata-interaction-id\s*=\s*"([^"]*)"((?:[^>"]|"[^"]*")*?)>"#)
        .expect("static pattern")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_][a-zA-Z0-9_:.-]*)\s*=\s*"([^"]*)""#).expect("static pattern")
});

static TAG_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static pattern"));

/// One element in the current view that can be activated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractiveElement {
    /// The `data-interaction-id` marker value.
    pub id: String,
    /// Tag name, lowercased (doubles as the element role).
    pub tag: String,
    /// Visible label: the element's inner text with tags stripped, or the
    /// placeholder for value elements.
    pub label: Option<String>,
    /// `data-value-from` link to an input element, when present.
    pub value_from: Option<String>,
    /// Whether the backend tagged this as an app-open origin.
    app_open_origin: bool,
}

impl InteractiveElement {
    /// Value elements capture text and fire input-change interactions.
    pub fn is_input(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }

    /// Interaction kind fired on activation.
    pub fn kind(&self) -> InteractionKind {
        if self.is_input() {
            InteractionKind::InputChange
        } else if self.app_open_origin {
            InteractionKind::AppOpen
        } else {
            InteractionKind::Click
        }
    }

    /// Synthesize the interaction record for activating this element.
    /// `value` is the current input value — carried for input elements and
    /// for elements linked to an input via `data-value-from`.
    pub fn interaction(&self, app_context: Option<&str>, value: Option<String>) -> InteractionData {
        InteractionData {
            id: self.id.clone(),
            kind: self.kind(),
            element_text: self.label.clone(),
            element_type: Some(self.tag.clone()),
            value: if self.is_input() || self.value_from.is_some() {
                value
            } else {
                None
            },
            app_context: app_context.map(String::from),
        }
    }
}

/// Extract every element carrying an interaction marker, in document order.
pub fn scan_markup(html: &str) -> Vec<InteractiveElement> {
    let mut elements = Vec::new();
    for caps in ELEMENT_RE.captures_iter(html) {
        let tag = caps[1].to_ascii_lowercase();
        let id = caps[3].to_string();
        if id.is_empty() {
            continue;
        }
        let attrs = format!("{}{}", &caps[2], &caps[4]);
        let open_end = caps.get(0).map(|m| m.end()).unwrap_or(0);

        let label = if matches!(tag.as_str(), "input" | "textarea" | "select") {
            attr_value(&attrs, "placeholder")
        } else {
            inner_text(&html[open_end..], &tag)
        };

        elements.push(InteractiveElement {
            id,
            tag,
            label,
            value_from: attr_value(&attrs, "data-value-from"),
            app_open_origin: attr_value(&attrs, "data-interaction-type").as_deref()
                == Some("app_open"),
        });
    }
    elements
}

fn attr_value(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .map(|caps| caps[2].to_string())
}

/// Inner text up to the matching close tag, with nested tags stripped and
/// whitespace collapsed. Unclosed elements (mid-stream) yield no label.
fn inner_text(rest: &str, tag: &str) -> Option<String> {
    let close = format!("</{tag}");
    let end = rest.to_ascii_lowercase().find(&close)?;
    let stripped = TAG_STRIP_RE.replace_all(&rest[..end], " ");
    let text = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_buttons_in_document_order() {
        let html = r#"
            <div class="llm-container">
              <button class="llm-button" data-interaction-id="open_folder">Open Folder</button>
              <button data-interaction-id="delete_file">Delete</button>
            </div>"#;
        let elements = scan_markup(html);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].id, "open_folder");
        assert_eq!(elements[0].label.as_deref(), Some("Open Folder"));
        assert_eq!(elements[1].id, "delete_file");
        assert_eq!(elements[1].kind(), InteractionKind::Click);
    }

    #[test]
    fn input_elements_use_placeholder_and_input_kind() {
        let html = r#"<input class="llm-input" data-interaction-id="search_box" placeholder="Search the web" />"#;
        let elements = scan_markup(html);
        assert_eq!(elements.len(), 1);
        assert!(elements[0].is_input());
        assert_eq!(elements[0].kind(), InteractionKind::InputChange);
        assert_eq!(elements[0].label.as_deref(), Some("Search the web"));
    }

    #[test]
    fn app_open_origin_tag() {
        let html = r#"<div data-interaction-id="notepad_app" data-interaction-type="app_open">Notes</div>"#;
        let elements = scan_markup(html);
        assert_eq!(elements[0].kind(), InteractionKind::AppOpen);
    }

    #[test]
    fn nested_tags_stripped_from_label() {
        let html = r#"<button data-interaction-id="buy_1"><span class="font-bold">Buy</span> <em>now</em></button>"#;
        let elements = scan_markup(html);
        assert_eq!(elements[0].label.as_deref(), Some("Buy now"));
    }

    #[test]
    fn value_from_link_extracted() {
        let html = r#"<button data-interaction-id="go" data-value-from="search_box">Go</button>"#;
        let elements = scan_markup(html);
        assert_eq!(elements[0].value_from.as_deref(), Some("search_box"));
    }

    #[test]
    fn partial_markup_is_tolerated() {
        // Mid-stream: trailing tag not yet complete, element not yet closed.
        let html = r#"<button data-interaction-id="done">Save</button><div data-interac"#;
        let elements = scan_markup(html);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].id, "done");

        // Complete opening tag but no close yet: element found, no label.
        let html = r#"<button data-interaction-id="pending">Still stream"#;
        let elements = scan_markup(html);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].label, None);
    }

    #[test]
    fn marker_values_with_gt_in_attrs_are_handled() {
        let html = r#"<button title="a > b" data-interaction-id="cmp">Compare</button>"#;
        let elements = scan_markup(html);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].id, "cmp");
        assert_eq!(elements[0].label.as_deref(), Some("Compare"));
    }

    #[test]
    fn empty_marker_is_skipped() {
        let html = r#"<button data-interaction-id="">blank</button>"#;
        assert!(scan_markup(html).is_empty());
    }

    #[test]
    fn click_interaction_synthesis() {
        let html = r#"<button data-interaction-id="play_track">Play</button>"#;
        let element = &scan_markup(html)[0];
        let data = element.interaction(Some("music_app"), None);
        assert_eq!(data.id, "play_track");
        assert_eq!(data.kind, InteractionKind::Click);
        assert_eq!(data.element_text.as_deref(), Some("Play"));
        assert_eq!(data.element_type.as_deref(), Some("button"));
        assert_eq!(data.app_context.as_deref(), Some("music_app"));
        assert_eq!(data.value, None);
    }

    #[test]
    fn input_interaction_carries_value() {
        let html = r#"<input data-interaction-id="note_body" placeholder="Write..." />"#;
        let element = &scan_markup(html)[0];
        let data = element.interaction(Some("notepad_app"), Some("dear diary".into()));
        assert_eq!(data.kind, InteractionKind::InputChange);
        assert_eq!(data.value.as_deref(), Some("dear diary"));
    }

    #[test]
    fn non_input_ignores_value() {
        let html = r#"<button data-interaction-id="go">Go</button>"#;
        let element = &scan_markup(html)[0];
        let data = element.interaction(None, Some("stray".into()));
        assert_eq!(data.value, None);
    }

    #[test]
    fn value_from_button_carries_linked_value() {
        let html = r#"<button data-interaction-id="go" data-value-from="search_box">Go</button>"#;
        let element = &scan_markup(html)[0];
        let data = element.interaction(Some("web_browser_app"), Some("rust tui".into()));
        assert_eq!(data.kind, InteractionKind::Click);
        assert_eq!(data.value.as_deref(), Some("rust tui"));
    }
}
