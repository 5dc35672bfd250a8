//! Page margin boxes.
//!
//! [§ 4 Margin Boxes](https://www.w3.org/TR/css-page-3/#margin-boxes)
//!
//! Sixteen boxes surround the page area: four corners and three boxes
//! along each edge. Corners take the page margins as their size. Boxes
//! along an edge share its length by their max-content size, a center box
//! staying centered with its neighbours splitting what is left.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::block::layout_unbreakable;
use crate::config::PageSetup;
use crate::context::LayoutContext;
use crate::fragment::{Fragment, FragmentKind};
use crate::geometry::{BoxDimensions, ContainingBlock, Rect};
use crate::style::{ComputedStyle, ContentItem, TextAlign, VerticalAlign};
use crate::tree::BoxId;

/// [§ 4.2 Margin box variables](https://www.w3.org/TR/css-page-3/#margin-box-variables)
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum MarginSlot {
    TopLeftCorner,
    TopLeft,
    TopCenter,
    TopRight,
    TopRightCorner,
    RightTop,
    RightMiddle,
    RightBottom,
    BottomRightCorner,
    BottomRight,
    BottomCenter,
    BottomLeft,
    BottomLeftCorner,
    LeftBottom,
    LeftMiddle,
    LeftTop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl MarginSlot {
    /// The three boxes of each edge, start to end.
    const EDGES: [(Edge, [Self; 3]); 4] = [
        (Edge::Top, [Self::TopLeft, Self::TopCenter, Self::TopRight]),
        (Edge::Bottom, [Self::BottomLeft, Self::BottomCenter, Self::BottomRight]),
        (Edge::Left, [Self::LeftTop, Self::LeftMiddle, Self::LeftBottom]),
        (Edge::Right, [Self::RightTop, Self::RightMiddle, Self::RightBottom]),
    ];

    /// Text alignment when the box's style leaves it at `start`.
    const fn default_align(self) -> TextAlign {
        match self {
            Self::TopLeft | Self::BottomLeft | Self::TopLeftCorner | Self::BottomLeftCorner => TextAlign::Left,
            Self::TopRight | Self::BottomRight | Self::TopRightCorner | Self::BottomRightCorner => TextAlign::Right,
            _ => TextAlign::Center,
        }
    }

    /// Vertical alignment when the box's style leaves it at `baseline`.
    const fn default_vertical(self) -> VerticalAlign {
        match self {
            Self::LeftTop | Self::RightTop => VerticalAlign::Top,
            Self::LeftBottom | Self::RightBottom => VerticalAlign::Bottom,
            _ => VerticalAlign::Middle,
        }
    }

    fn corner_rect(self, page: &PageSetup) -> Option<Rect> {
        let right = page.width - page.margin_right;
        let bottom = page.height - page.margin_bottom;
        match self {
            Self::TopLeftCorner => Some(Rect::new(0.0, 0.0, page.margin_left, page.margin_top)),
            Self::TopRightCorner => Some(Rect::new(right, 0.0, page.margin_right, page.margin_top)),
            Self::BottomRightCorner => Some(Rect::new(right, bottom, page.margin_right, page.margin_bottom)),
            Self::BottomLeftCorner => Some(Rect::new(0.0, bottom, page.margin_left, page.margin_bottom)),
            _ => None,
        }
    }
}

/// Content of a margin box, evaluated for the current page.
struct Evaluated {
    text: String,
    running: Vec<BoxId>,
}

fn evaluate(ctx: &mut LayoutContext<'_>, owner: BoxId, style: &ComputedStyle) -> Option<Evaluated> {
    if style.content.0.is_empty() {
        return None;
    }
    let mut text_items = Vec::new();
    let mut running = Vec::new();
    for item in &style.content.0 {
        match item {
            ContentItem::Element(name, keyword) => {
                if let Some(&id) = ctx.running_elements.resolve(name, ctx.current_page, *keyword) {
                    running.push(id);
                }
            }
            other => text_items.push(other.clone()),
        }
    }
    let text = crate::generated::evaluate_text(ctx, owner, &text_items);
    Some(Evaluated { text, running })
}

/// Max-content extent of a box along its edge.
fn preferred_extent(ctx: &mut LayoutContext<'_>, style: &ComputedStyle, content: &Evaluated, horizontal: bool) -> f32 {
    if horizontal {
        let running = content
            .running
            .iter()
            .map(|&id| crate::preferred::max_content_width(ctx, id))
            .fold(0.0, f32::max);
        ctx.text_width(style, &content.text).max(running)
    } else {
        ctx.strut(style).height
    }
}

/// [§ 5.3.2 Margin Box Variable Dimension Computation Rules](https://www.w3.org/TR/css-page-3/#variable-auto-sizing)
///
/// Split `length` between the present boxes of one edge. Returns
/// `(offset, size)` per box.
fn distribute(length: f32, extents: [Option<f32>; 3]) -> [Option<(f32, f32)>; 3] {
    match extents {
        [start, Some(center), end] => {
            let center = center.min(length);
            let side = (length - center) / 2.0;
            [
                start.map(|_| (0.0, side)),
                Some((side, center)),
                end.map(|_| (side + center, side)),
            ]
        }
        [Some(start), None, Some(end)] => {
            let total = start + end;
            let first = if total > 0.0 { length * start / total } else { length / 2.0 };
            [Some((0.0, first)), None, Some((first, length - first))]
        }
        [start, None, end] => [start.map(|_| (0.0, length)), None, end.map(|_| (0.0, length))],
    }
}

/// Lay out the margin boxes of the current page.
pub(crate) fn make_margin_boxes(
    ctx: &mut LayoutContext<'_>,
    owner: BoxId,
    page: &PageSetup,
    rules: &BTreeMap<MarginSlot, ComputedStyle>,
) -> Vec<Fragment> {
    let mut boxes = Vec::new();
    let mut contents: BTreeMap<MarginSlot, Evaluated> = BTreeMap::new();
    for (&slot, style) in rules {
        if let Some(content) = evaluate(ctx, owner, style) {
            let _ = contents.insert(slot, content);
        }
    }

    for (&slot, content) in &contents {
        if let Some(rect) = slot.corner_rect(page) {
            boxes.push(layout_margin_box(ctx, slot, &rules[&slot], content, rect));
        }
    }

    let area = page.content_area();
    for (edge, slots) in MarginSlot::EDGES {
        let horizontal = matches!(edge, Edge::Top | Edge::Bottom);
        let mut extents = [None; 3];
        for (i, slot) in slots.iter().enumerate() {
            if let Some(content) = contents.get(slot) {
                extents[i] = Some(preferred_extent(ctx, &rules[slot], content, horizontal));
            }
        }
        let length = if horizontal { area.width } else { area.height };
        for (i, placed) in distribute(length, extents).into_iter().enumerate() {
            let Some((offset, size)) = placed else {
                continue;
            };
            let rect = match edge {
                Edge::Top => Rect::new(area.x + offset, 0.0, size, page.margin_top),
                Edge::Bottom => Rect::new(area.x + offset, area.bottom(), size, page.margin_bottom),
                Edge::Left => Rect::new(0.0, area.y + offset, page.margin_left, size),
                Edge::Right => Rect::new(area.right(), area.y + offset, page.margin_right, size),
            };
            let slot = slots[i];
            if let Some(content) = contents.get(&slot) {
                boxes.push(layout_margin_box(ctx, slot, &rules[&slot], content, rect));
            }
        }
    }
    boxes
}

/// Place the text and running elements of one box inside `rect`.
fn layout_margin_box(
    ctx: &mut LayoutContext<'_>,
    slot: MarginSlot,
    style: &ComputedStyle,
    content: &Evaluated,
    rect: Rect,
) -> Fragment {
    let mut children = Vec::new();
    let mut y = 0.0;

    if !content.text.is_empty() {
        let strut = ctx.strut(style);
        let width = ctx.text_width(style, &content.text).min(rect.width);
        let align = match style.text_align {
            TextAlign::Start | TextAlign::Justify => slot.default_align(),
            other => other,
        };
        let x = match align {
            TextAlign::Center => rect.x + (rect.width - width) / 2.0,
            TextAlign::Right | TextAlign::End => rect.right() - width,
            _ => rect.x,
        };
        let text_box = BoxDimensions {
            content: Rect::new(x, y + strut.baseline - strut.ascent, width, strut.ascent + strut.descent),
            ..BoxDimensions::default()
        };
        let mut text = Fragment::new(
            None,
            FragmentKind::Text {
                text: content.text.clone(),
                word_spacing: 0.0,
            },
            text_box,
        );
        text.baseline = Some(y + strut.baseline);
        let mut line = Fragment::new(
            None,
            FragmentKind::Line,
            BoxDimensions {
                content: Rect::new(rect.x, y, rect.width, strut.height),
                ..BoxDimensions::default()
            },
        );
        line.baseline = text.baseline;
        line.children.push(text);
        children.push(line);
        y += strut.height;
    }

    let cb = ContainingBlock::from_rect(rect, style.direction).with_indefinite_height();
    for &id in &content.running {
        // Running elements are laid out as copies: whatever they log or
        // count belongs to the page they came from.
        let checkpoint = ctx.checkpoint();
        ctx.push_bfc(id);
        ctx.push_absolute_scope();
        let fragment = layout_unbreakable(ctx, id, &cb, y);
        let _ = ctx.pop_absolute_scope();
        let _ = ctx.pop_bfc();
        ctx.rollback(&checkpoint);
        y = fragment.margin_box().bottom();
        children.push(fragment);
    }

    let vertical = match style.vertical_align {
        VerticalAlign::Baseline => slot.default_vertical(),
        other => other,
    };
    let dy = match vertical {
        VerticalAlign::Top | VerticalAlign::TextTop => rect.y,
        VerticalAlign::Bottom | VerticalAlign::TextBottom => rect.bottom() - y,
        _ => rect.y + (rect.height - y) / 2.0,
    };
    for child in &mut children {
        child.translate(0.0, dy);
    }

    let mut fragment = Fragment::new(
        None,
        FragmentKind::MarginBox { slot },
        BoxDimensions {
            content: rect,
            ..BoxDimensions::default()
        },
    );
    fragment.children = children;
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_center_box_stays_centered() {
        let placed = distribute(600.0, [Some(50.0), Some(100.0), None]);
        assert_eq!(placed[0], Some((0.0, 250.0)));
        assert_eq!(placed[1], Some((250.0, 100.0)));
        assert_eq!(placed[2], None);
    }

    #[test]
    fn side_boxes_share_by_max_content() {
        let placed = distribute(600.0, [Some(100.0), None, Some(300.0)]);
        assert_eq!(placed[0], Some((0.0, 150.0)));
        assert_eq!(placed[2], Some((150.0, 450.0)));
        let alone = distribute(600.0, [None, None, Some(10.0)]);
        assert_eq!(alone[2], Some((0.0, 600.0)));
    }

    #[test]
    fn slots_deserialize_from_kebab_case() {
        let rules: BTreeMap<MarginSlot, ComputedStyle> = serde_json::from_value(serde_json::json!({
            "bottom-center": { "content": "counter(page)" },
            "top-left-corner": {}
        }))
        .unwrap();
        assert!(rules.contains_key(&MarginSlot::BottomCenter));
        assert_eq!(
            MarginSlot::TopLeftCorner.corner_rect(&PageSetup::default()),
            Some(Rect::new(0.0, 0.0, 96.0, 96.0))
        );
    }
}
