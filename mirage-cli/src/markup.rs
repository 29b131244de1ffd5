//! Terminal renderer for the generated markup.
//!
//! The backend streams HTML; the terminal shows its text content. Tags are
//! walked with a tolerant scanner (partial, malformed markup is expected
//! mid-stream), block-level tags break lines, headings are emboldened, and
//! every element carrying `data-interaction-id` gets a numbered badge the
//! user can select and activate. Badge numbering matches the order of
//! `mirage_core::scan_markup` so selection indices line up.

use std::sync::LazyLock;

use ratatui::text::{Line, Span};
use regex::Regex;
use unicode_width::UnicodeWidthStr;

use crate::theme;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(/?)([a-zA-Z][a-zA-Z0-9-]*)((?:[^>"]|"[^"]*")*?)>"#).expect("static pattern")
});

static ID_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bdata-interaction-id\s*=\s*"([^"]+)""#).expect("static pattern")
});

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bplaceholder\s*=\s*"([^"]*)""#).expect("static pattern"));

/// Tags that start a fresh output line.
fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "div"
            | "p"
            | "br"
            | "hr"
            | "li"
            | "ul"
            | "ol"
            | "tr"
            | "table"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "main"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    )
}

fn is_heading_tag(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Content that should never reach the terminal (scripts, styles).
fn is_suppressed_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Render generated markup into styled terminal lines.
///
/// `selected` highlights the badge of that interactive element, and
/// `input_preview` shows the text typed so far into the selected input.
pub fn render_markup(
    html: &str,
    selected: Option<usize>,
    input_preview: Option<&str>,
) -> Vec<Line<'static>> {
    let mut out = MarkupRenderer::new(selected, input_preview.map(String::from));
    let mut last_end = 0;
    for caps in TAG_RE.captures_iter(html) {
        let m = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        out.text(&html[last_end..m.0]);
        let closing = !caps[1].is_empty();
        let tag = caps[2].to_ascii_lowercase();
        out.tag(&tag, closing, &caps[3]);
        last_end = m.1;
    }
    // Trailing text; an incomplete trailing tag (mid-stream) is held back.
    let rest = &html[last_end..];
    match rest.find('<') {
        Some(pos) => out.text(&rest[..pos]),
        None => out.text(rest),
    }
    out.finish()
}

/// Visual rows the rendered lines take when wrapped to `width` columns.
pub fn wrapped_height(lines: &[Line<'_>], width: usize) -> usize {
    if width == 0 {
        return lines.len();
    }
    lines
        .iter()
        .map(|line| {
            let w: usize = line.spans.iter().map(|s| s.content.width()).sum();
            if w == 0 { 1 } else { w.div_ceil(width) }
        })
        .sum()
}

struct MarkupRenderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    selected: Option<usize>,
    input_preview: Option<String>,
    /// Index of the next interactive element encountered.
    next_badge: usize,
    heading_depth: usize,
    suppressed_depth: usize,
    /// A space is pending between adjacent text chunks.
    pending_space: bool,
}

impl MarkupRenderer {
    fn new(selected: Option<usize>, input_preview: Option<String>) -> Self {
        Self {
            lines: Vec::new(),
            spans: Vec::new(),
            selected,
            input_preview,
            next_badge: 0,
            heading_depth: 0,
            suppressed_depth: 0,
            pending_space: false,
        }
    }

    fn text(&mut self, raw: &str) {
        if self.suppressed_depth > 0 {
            return;
        }
        let decoded = decode_entities(raw);
        let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return;
        }
        let style = if self.heading_depth > 0 {
            theme::heading()
        } else {
            theme::content_text()
        };
        let mut content = collapsed;
        if self.pending_space && !self.spans.is_empty() {
            content.insert(0, ' ');
        }
        self.pending_space = decoded.ends_with(char::is_whitespace);
        self.spans.push(Span::styled(content, style));
    }

    fn tag(&mut self, tag: &str, closing: bool, attrs: &str) {
        if is_suppressed_tag(tag) {
            if closing {
                self.suppressed_depth = self.suppressed_depth.saturating_sub(1);
            } else {
                self.suppressed_depth += 1;
            }
            return;
        }
        if self.suppressed_depth > 0 {
            return;
        }

        if is_block_tag(tag) {
            self.flush_line();
        }
        if is_heading_tag(tag) {
            if closing {
                self.heading_depth = self.heading_depth.saturating_sub(1);
            } else {
                self.heading_depth += 1;
            }
        }

        if !closing && ID_ATTR_RE.is_match(attrs) {
            self.badge(tag, attrs);
        }
    }

    /// Emit the `[n]` badge for an interactive element; inputs also show a
    /// field preview with the placeholder or the typed text.
    fn badge(&mut self, tag: &str, attrs: &str) {
        let index = self.next_badge;
        self.next_badge += 1;
        let is_selected = self.selected == Some(index);
        let style = if is_selected {
            theme::badge_selected()
        } else {
            theme::badge()
        };
        self.pending_space = false;
        self.spans.push(Span::styled(format!("[{}]", index + 1), style));

        if matches!(tag, "input" | "textarea" | "select") {
            let preview = if is_selected {
                self.input_preview.clone().filter(|t| !t.is_empty())
            } else {
                None
            };
            let text = preview.unwrap_or_else(|| {
                PLACEHOLDER_RE
                    .captures(attrs)
                    .map(|c| c[1].to_string())
                    .unwrap_or_default()
            });
            self.spans
                .push(Span::styled(format!("⟨{text}⟩"), theme::input_preview()));
        }
        self.pending_space = true;
    }

    fn flush_line(&mut self) {
        if !self.spans.is_empty() {
            let spans = std::mem::take(&mut self.spans);
            self.lines.push(Line::from(spans));
        }
        self.pending_space = false;
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn block_tags_break_lines() {
        let html = "<div>first</div><div>second</div>";
        let lines = render_markup(html, None, None);
        assert_eq!(plain(&lines), ["first", "second"]);
    }

    #[test]
    fn inline_tags_stay_on_one_line() {
        let html = "<p>hello <span class=\"font-bold\">world</span>!</p>";
        let lines = render_markup(html, None, None);
        assert_eq!(plain(&lines), ["hello world!"]);
    }

    #[test]
    fn interactive_elements_get_badges_in_order() {
        let html = r#"<div><button data-interaction-id="a">First</button></div>
                      <div><button data-interaction-id="b">Second</button></div>"#;
        let lines = render_markup(html, None, None);
        let text = plain(&lines);
        assert_eq!(text[0], "[1] First");
        assert_eq!(text[1], "[2] Second");
    }

    #[test]
    fn badge_order_matches_scanner_order() {
        let html = r#"<button data-interaction-id="a">A</button>
                      <input data-interaction-id="b" placeholder="B" />
                      <button data-interaction-id="c">C</button>"#;
        let elements = mirage_core::scan_markup(html);
        let rendered = plain(&render_markup(html, None, None)).join(" ");
        for (i, element) in elements.iter().enumerate() {
            assert!(
                rendered.contains(&format!("[{}]", i + 1)),
                "missing badge for {}",
                element.id
            );
        }
    }

    #[test]
    fn input_shows_placeholder_then_typed_preview() {
        let html = r#"<input data-interaction-id="q" placeholder="Search" />"#;
        let lines = render_markup(html, None, None);
        assert!(plain(&lines)[0].contains("⟨Search⟩"));

        let lines = render_markup(html, Some(0), Some("weather"));
        assert!(plain(&lines)[0].contains("⟨weather⟩"));
    }

    #[test]
    fn script_content_is_suppressed() {
        let html = "<div>shown</div><script>var hidden = 1;</script><div>also</div>";
        let lines = render_markup(html, None, None);
        assert_eq!(plain(&lines), ["shown", "also"]);
    }

    #[test]
    fn entities_are_decoded() {
        let html = "<p>a &amp; b &lt;ok&gt;</p>";
        let lines = render_markup(html, None, None);
        assert_eq!(plain(&lines), ["a & b <ok>"]);
    }

    #[test]
    fn partial_trailing_tag_is_held_back() {
        let html = "<div>visible</div><div class=\"p-4";
        let lines = render_markup(html, None, None);
        assert_eq!(plain(&lines), ["visible"]);
    }

    #[test]
    fn wrapped_height_counts_wraps() {
        let lines = render_markup("<div>aaaa bbbb</div><div>cc</div>", None, None);
        assert_eq!(wrapped_height(&lines, 5), 3); // "aaaa bbbb" wraps to 2
        assert_eq!(wrapped_height(&lines, 80), 2);
    }
}
