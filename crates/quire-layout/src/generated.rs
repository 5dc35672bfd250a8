//! Evaluation of generated content.
//!
//! [§ 2 'content'](https://www.w3.org/TR/css-content-3/#content-property)
//!
//! Generated boxes, `string-set` values and page margin boxes all turn a
//! list of [`ContentItem`]s into text the same way. Page-dependent items
//! read the state of the page being laid out, so they are evaluated at
//! layout time, never while building the tree.

use crate::context::LayoutContext;
use crate::style::ContentItem;
use crate::tree::{BoxId, BoxKind};

/// Text of `items` for a box owned by `owner`, on the current page.
///
/// `element()` and `leader()` items yield no text; only margin boxes place
/// running elements, and leaders are sized by the line they end up on.
pub(crate) fn evaluate_text(ctx: &mut LayoutContext<'_>, owner: BoxId, items: &[ContentItem]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            ContentItem::Literal(text) => out.push_str(text),
            ContentItem::Counter(name, style) => {
                let value = if name == "pages" {
                    ctx.pages_wanted = true;
                    i32::try_from(ctx.total_pages).unwrap_or(i32::MAX)
                } else {
                    ctx.counters.get(name)
                };
                out.push_str(&style.format(value));
            }
            ContentItem::NamedString(name, keyword) => {
                if let Some(value) = ctx.string_sets.resolve(name, ctx.current_page, *keyword) {
                    out.push_str(value);
                }
            }
            ContentItem::TargetCounter {
                anchor,
                counter,
                style,
            } => {
                let page = ctx.current_page;
                if let Some(value) = ctx.targets.lookup(anchor, counter, page) {
                    out.push_str(&style.format(value));
                }
            }
            ContentItem::ContentText => out.push_str(&content_text(ctx, owner)),
            ContentItem::Element(..) | ContentItem::Leader(_) => {}
        }
    }
    out
}

/// `content(text)`: the text of `owner` itself, without the text that
/// generated content would add.
fn content_text(ctx: &LayoutContext<'_>, owner: BoxId) -> String {
    let tree = ctx.tree;
    let mut out = String::new();
    for id in tree.descendants(owner) {
        if let BoxKind::Text(text) = tree.kind(id) {
            out.push_str(text);
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of a [`BoxKind::Generated`] box: its parent's `content` value.
pub(crate) fn generated_box_text(ctx: &mut LayoutContext<'_>, id: BoxId) -> String {
    let tree = ctx.tree;
    let Some(owner) = tree.parent(id) else {
        return String::new();
    };
    evaluate_text(ctx, owner, &tree.style(owner).content.0)
}

/// A run of a generated box's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GeneratedPart {
    Text(String),
    /// A leader pattern, filled in when its line is built.
    Leader(String),
}

/// Content of a [`BoxKind::Generated`] box, split at its leaders.
pub(crate) fn generated_box_parts(ctx: &mut LayoutContext<'_>, id: BoxId) -> Vec<GeneratedPart> {
    let tree = ctx.tree;
    let Some(owner) = tree.parent(id) else {
        return Vec::new();
    };
    let mut parts = Vec::new();
    let mut text = String::new();
    for item in &tree.style(owner).content.0 {
        if let ContentItem::Leader(pattern) = item {
            if !text.is_empty() {
                parts.push(GeneratedPart::Text(std::mem::take(&mut text)));
            }
            parts.push(GeneratedPart::Leader(pattern.clone()));
        } else {
            text.push_str(&evaluate_text(ctx, owner, std::slice::from_ref(item)));
        }
    }
    if !text.is_empty() {
        parts.push(GeneratedPart::Text(text));
    }
    parts
}

/// Log the `string-set` assignments and the anchor of `id`, which starts
/// on the current page.
pub(crate) fn record_box_start(ctx: &mut LayoutContext<'_>, id: BoxId, at_start: bool) {
    let tree = ctx.tree;
    let style = tree.style(id);
    if ctx.counters.apply(style) {
        log::debug!(target: "quire::pagination", "page counter reset by {}", tree.describe(id));
    }
    for (name, items) in &style.string_set.0 {
        let value = evaluate_text(ctx, id, items);
        ctx.log_event(crate::strings::PageEvent::StringSet {
            name: name.clone(),
            value,
            at_start,
        });
    }
    if let Some(anchor) = &tree.get(id).anchor {
        let counters = ctx.counters.clone();
        ctx.log_event(crate::strings::PageEvent::Anchor {
            name: anchor.clone(),
            counters,
        });
    }
}
