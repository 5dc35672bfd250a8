//! Preferred (intrinsic) widths.
//!
//! [§ 5 Intrinsic Size Determination](https://www.w3.org/TR/css-sizing-3/#intrinsic-sizes)
//!
//! "The min-content inline size of a box is the smallest inline size it
//! can take without overflow that could be avoided by choosing a larger
//! size. The max-content inline size is the narrowest inline size it could
//! take while fitting around its contents if none of the soft wrap
//! opportunities within the box were taken."
//!
//! All widths returned here are outer widths (margin box), memoized per
//! box in the layout context. Percentages of the unknown containing block
//! count as zero.

use crate::context::LayoutContext;
use crate::style::{ComputedStyle, Dimension, LengthPercentage};
use crate::tree::{BoxId, BoxKind};

/// `(min-content, max-content)` outer widths of `id`.
pub fn preferred_widths(ctx: &mut LayoutContext<'_>, id: BoxId) -> (f32, f32) {
    if let Some(widths) = ctx.preferred.get(&id) {
        return *widths;
    }
    let widths = compute(ctx, id);
    let _ = ctx.preferred.insert(id, widths);
    widths
}

/// Min-content outer width.
pub fn min_content_width(ctx: &mut LayoutContext<'_>, id: BoxId) -> f32 {
    preferred_widths(ctx, id).0
}

/// Max-content outer width.
pub fn max_content_width(ctx: &mut LayoutContext<'_>, id: BoxId) -> f32 {
    preferred_widths(ctx, id).1
}

/// [§ 10.3.5 Floating, non-replaced elements](https://www.w3.org/TR/CSS2/visudet.html#float-width)
///
/// "Calculation of the shrink-to-fit width is similar to calculating the
/// width of a table cell using the automatic table layout algorithm.
/// ... the shrink-to-fit width is: min(max(preferred minimum width,
/// available width), preferred width)."
///
/// `available` and the result are outer widths.
pub fn shrink_to_fit(ctx: &mut LayoutContext<'_>, id: BoxId, available: f32) -> f32 {
    let (min, max) = preferred_widths(ctx, id);
    min.max(available).min(max)
}

/// Horizontal margin, border and padding with percentages taken as zero.
pub(crate) fn horizontal_mbp(style: &ComputedStyle) -> f32 {
    let margin = |d: Dimension| d.px().unwrap_or(0.0);
    let padding = |lp: LengthPercentage| match lp {
        LengthPercentage::Px(px) => px.max(0.0),
        LengthPercentage::Percent(_) => 0.0,
    };
    let border = style.border();
    margin(style.margin_left)
        + margin(style.margin_right)
        + padding(style.padding_left)
        + padding(style.padding_right)
        + border.horizontal()
}

/// Text widths: the widest unbreakable piece, and the widest forced line.
pub(crate) fn text_widths(ctx: &mut LayoutContext<'_>, style: &ComputedStyle, text: &str) -> (f32, f32) {
    let ws = style.white_space;
    let mut min: f32 = 0.0;
    let mut max: f32 = 0.0;
    let lines: Vec<&str> = if ws.preserves_newlines() {
        text.split('\n').collect()
    } else {
        vec![text]
    };
    for line in lines {
        let collapsed;
        let line = if ws.collapses_spaces() {
            collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
            collapsed.as_str()
        } else {
            line
        };
        let line_width = ctx.text_width(style, line);
        max = max.max(line_width);
        if ws.wraps() {
            for word in line.split(' ') {
                let word = word.replace('\u{ad}', "");
                min = min.max(ctx.text_width(style, &word));
            }
        } else {
            min = min.max(line_width);
        }
    }
    (min, max)
}

fn compute(ctx: &mut LayoutContext<'_>, id: BoxId) -> (f32, f32) {
    let tree = ctx.tree;
    let style = tree.style(id);
    let (min, max) = match tree.kind(id) {
        BoxKind::Text(text) => return text_widths(ctx, style, text),
        BoxKind::Generated => {
            let text = crate::generated::generated_box_text(ctx, id);
            return text_widths(ctx, style, &text);
        }
        BoxKind::FootnoteCall { label, .. } => {
            let width = ctx.text_width(style, label);
            return (width, width);
        }
        BoxKind::LineBreak => return (0.0, 0.0),
        BoxKind::Replaced(_) => {
            let width = crate::replaced::preferred_content_width(ctx, id);
            (width, width)
        }
        BoxKind::Table | BoxKind::InlineTable => crate::table::preferred_widths(ctx, id),
        BoxKind::Grid | BoxKind::InlineGrid => crate::grid::preferred_widths(ctx, id),
        BoxKind::Flex | BoxKind::InlineFlex => crate::flex::preferred_widths(ctx, id),
        BoxKind::Block if style.is_multicol() => crate::columns::preferred_widths(ctx, id),
        BoxKind::Inline => run_widths(ctx, tree.children(id)),
        _ => match style.width {
            Dimension::Px(px) => {
                let width = content_width_from_declared(style, px);
                (width, width)
            }
            _ => {
                let children = tree.children(id);
                if children.iter().any(|&c| tree.is_inline_level(c)) {
                    run_widths(ctx, children)
                } else {
                    let mut min: f32 = 0.0;
                    let mut max: f32 = 0.0;
                    for &child in children {
                        let child_style = tree.style(child);
                        if child_style.position.is_absolutely_positioned()
                            || matches!(child_style.position, crate::style::Position::Running(_))
                        {
                            continue;
                        }
                        let (cmin, cmax) = preferred_widths(ctx, child);
                        min = min.max(cmin);
                        max = max.max(cmax);
                    }
                    (min, max)
                }
            }
        },
    };
    let (min, max) = clamp(style, min, max.max(min));
    let mbp = horizontal_mbp(style);
    (min + mbp, max + mbp)
}

/// Declared border-box or padding-box widths converted to content width.
fn content_width_from_declared(style: &ComputedStyle, declared: f32) -> f32 {
    let padding = style.padding(0.0).horizontal();
    let border = style.border().horizontal();
    let width = match style.box_sizing {
        crate::style::BoxSizing::ContentBox => declared,
        crate::style::BoxSizing::PaddingBox => declared - padding,
        crate::style::BoxSizing::BorderBox => declared - padding - border,
    };
    width.max(0.0)
}

fn clamp(style: &ComputedStyle, min: f32, max: f32) -> (f32, f32) {
    let lower = match style.min_width {
        LengthPercentage::Px(px) => px,
        LengthPercentage::Percent(_) => 0.0,
    };
    let upper = match style.max_width.0 {
        Some(LengthPercentage::Px(px)) => px,
        _ => f32::INFINITY,
    };
    let clamp = |w: f32| w.min(upper).max(lower);
    (clamp(min), clamp(max))
}

/// Widths of a run of inline-level siblings (block-level ones start their
/// own line).
fn run_widths(ctx: &mut LayoutContext<'_>, children: &[BoxId]) -> (f32, f32) {
    let tree = ctx.tree;
    let mut min: f32 = 0.0;
    let mut max: f32 = 0.0;
    let mut line: f32 = 0.0;
    for &child in children {
        let style = tree.style(child);
        if style.position.is_absolutely_positioned()
            || matches!(style.position, crate::style::Position::Running(_))
        {
            continue;
        }
        match tree.kind(child) {
            BoxKind::LineBreak => {
                max = max.max(line);
                line = 0.0;
            }
            BoxKind::Text(text) if style.white_space.preserves_newlines() && text.contains('\n') => {
                let (cmin, _) = text_widths(ctx, style, text);
                min = min.max(cmin);
                let mut pieces = text.split('\n');
                if let Some(first) = pieces.next() {
                    line += ctx.text_width(style, first);
                }
                for piece in pieces {
                    max = max.max(line);
                    line = ctx.text_width(style, piece);
                }
            }
            _ if !tree.is_inline_level(child) && !style.is_floated() => {
                max = max.max(line);
                line = 0.0;
                let (cmin, cmax) = preferred_widths(ctx, child);
                min = min.max(cmin);
                max = max.max(cmax);
            }
            _ => {
                let (cmin, cmax) = preferred_widths(ctx, child);
                min = min.max(cmin);
                line += cmax;
            }
        }
    }
    (min, max.max(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::resources::StaticImageResolver;
    use crate::text::ApproximateFontMetrics;
    use crate::tree::{BoxNode, BoxTree};

    #[test]
    fn paragraph_widths_are_longest_word_and_whole_line() {
        let node: BoxNode = serde_json::from_value(serde_json::json!({
            "style": { "font-size": "10px", "padding-left": "5px" },
            "children": [{ "text": "ab  abcd" }]
        }))
        .unwrap();
        let tree = BoxTree::from_node(&node);
        let config = LayoutConfig::default();
        let metrics = ApproximateFontMetrics::new();
        let images = StaticImageResolver::new();
        let mut ctx = LayoutContext::new(&tree, &config, &metrics, &images);
        let root = tree.root().unwrap();
        let (min, max) = preferred_widths(&mut ctx, root);
        // 6px per character at 10px.
        assert!((min - (24.0 + 5.0)).abs() < 1e-3, "min {min}");
        assert!((max - (42.0 + 5.0)).abs() < 1e-3, "max {max}");
    }
}
