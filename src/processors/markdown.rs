//! Markdown rendering for `!md` fields.
//!
//! Content fields are usually spliced into the middle of a layout, so a
//! wrapping `<p>` around every paragraph is unwanted. Paragraphs are instead
//! introduced by a `<br>` and emitted bare. Raw HTML in the source is passed
//! through untouched.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

/// Marker emitted in place of an opening `<p>`.
const PARAGRAPH_BREAK: &str = "<br>";

/// Render Markdown to HTML with paragraph wrapping suppressed.
pub fn render(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = Parser::new_ext(source, options).filter_map(|event| match event {
        Event::Start(Tag::Paragraph) => Some(Event::InlineHtml(PARAGRAPH_BREAK.into())),
        Event::End(TagEnd::Paragraph) => None,
        other => Some(other),
    });

    let mut out = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut out, events);
    out
}
