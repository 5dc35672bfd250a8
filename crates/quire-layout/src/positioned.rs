//! Positioned layout.
//!
//! [§ 9.3 Positioning schemes](https://www.w3.org/TR/CSS2/visuren.html#positioning-scheme)
//!
//! Relative boxes are laid out in flow and then shifted. Absolute and
//! fixed boxes are collected while their containing block is laid out and
//! placed once its padding box is known; fixed boxes use the page area.

use crate::block::{content_size, layout_unbreakable};
use crate::context::{LayoutContext, PendingAbsolute};
use crate::fragment::Fragment;
use crate::geometry::{ContainingBlock, Direction, Rect};
use crate::style::{ComputedStyle, Dimension, Position};
use crate::tree::BoxKind;

/// [§ 9.3.2 Box offsets](https://www.w3.org/TR/CSS2/visuren.html#position-props)
///
/// `top`, `right`, `bottom` and `left` resolved against a containing
/// block; `None` is `auto`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxOffsets {
    /// Offset of the top margin edge below the containing block's top.
    pub top: Option<f32>,
    /// Offset of the right margin edge left of the containing block's right.
    pub right: Option<f32>,
    /// Offset of the bottom margin edge above the containing block's bottom.
    pub bottom: Option<f32>,
    /// Offset of the left margin edge right of the containing block's left.
    pub left: Option<f32>,
}

impl BoxOffsets {
    /// "The offset is a percentage of the containing block's width (for
    /// 'left' or 'right') or height (for 'top' or 'bottom')."
    #[must_use]
    pub fn resolve(style: &ComputedStyle, width: f32, height: Option<f32>) -> Self {
        let vertical = |d: Dimension| d.resolve_definite(height);
        Self {
            top: vertical(style.top),
            right: style.right.resolve(width),
            bottom: vertical(style.bottom),
            left: style.left.resolve(width),
        }
    }
}

/// [§ 9.4.3 Relative positioning](https://www.w3.org/TR/CSS2/visuren.html#relative-positioning)
///
/// "Once a box has been laid out according to the normal flow, it may be
/// shifted relative to its normal position."
///
/// Returns the `(dx, dy)` shift of a relatively positioned box, `(0, 0)`
/// for every other box.
#[must_use]
pub fn relative_offset(style: &ComputedStyle, cb: &ContainingBlock) -> (f32, f32) {
    if style.position != Position::Relative {
        return (0.0, 0.0);
    }
    let offsets = BoxOffsets::resolve(style, cb.width, cb.height);
    // "If neither 'left' nor 'right' is 'auto', the position is
    // over-constrained, and one of them has to be ignored. If the
    // 'direction' property of the containing block is 'ltr', the value of
    // 'left' wins and 'right' becomes -'left'."
    let dx = match (offsets.left, offsets.right, cb.direction) {
        (None, None, _) => 0.0,
        (Some(left), None, _) | (Some(left), Some(_), Direction::Ltr) => left,
        (None, Some(right), _) | (Some(_), Some(right), Direction::Rtl) => -right,
    };
    // "If neither is 'auto', 'bottom' is ignored."
    let dy = match (offsets.top, offsets.bottom) {
        (None, None) => 0.0,
        (Some(top), _) => top,
        (None, Some(bottom)) => -bottom,
    };
    (dx, dy)
}

/// Used horizontal values of an absolutely positioned box, relative to
/// its containing block.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AbsoluteHorizontal {
    left: f32,
    margin_left: f32,
    width: f32,
    margin_right: f32,
}

/// [§ 10.3.7 Absolutely positioned, non-replaced elements](https://www.w3.org/TR/CSS2/visudet.html#abs-non-replaced-width)
///
/// "'left' + 'margin-left' + 'border-left-width' + 'padding-left' + 'width'
/// + 'padding-right' + 'border-right-width' + 'margin-right' + 'right' =
/// width of containing block"
///
/// `fit` gives the shrink-to-fit content width for an available width.
#[allow(clippy::too_many_arguments)]
fn solve_absolute_horizontal(
    cb_width: f32,
    offsets: BoxOffsets,
    width: Option<f32>,
    margin_left: Option<f32>,
    margin_right: Option<f32>,
    border_padding: f32,
    static_left: f32,
    direction: Direction,
    fit: &mut dyn FnMut(f32) -> f32,
) -> AbsoluteHorizontal {
    let (left, right) = (offsets.left, offsets.right);
    let known_margins = margin_left.unwrap_or(0.0) + margin_right.unwrap_or(0.0);
    match (left, width, right) {
        // "If all three of 'left', 'width', and 'right' are 'auto': First set
        // any 'auto' values for 'margin-left' and 'margin-right' to 0. Then,
        // if the 'direction' property of the element establishing the
        // static-position containing block is 'ltr' set 'left' to the static
        // position and apply rule number three below."
        (None, None, None) => {
            let available = cb_width - static_left - known_margins - border_padding;
            let width = fit(available);
            let left = match direction {
                Direction::Ltr => static_left,
                Direction::Rtl => cb_width - static_left - known_margins - border_padding - width,
            };
            AbsoluteHorizontal {
                left,
                margin_left: margin_left.unwrap_or(0.0),
                width,
                margin_right: margin_right.unwrap_or(0.0),
            }
        }
        // "If none of the three is 'auto': If both 'margin-left' and
        // 'margin-right' are 'auto', solve the equation under the extra
        // constraint that the two margins get equal values, unless this
        // would make them negative, in which case when direction of the
        // containing block is 'ltr' ('rtl'), set 'margin-left'
        // ('margin-right') to zero and solve for 'margin-right'
        // ('margin-left')."
        (Some(left), Some(width), Some(right)) => {
            let remaining = cb_width - left - width - right - border_padding;
            let (margin_left, margin_right) = match (margin_left, margin_right) {
                (None, None) if remaining >= 0.0 => (remaining / 2.0, remaining / 2.0),
                (None, None) => match direction {
                    Direction::Ltr => (0.0, remaining),
                    Direction::Rtl => (remaining, 0.0),
                },
                (None, Some(r)) => (remaining - r, r),
                (Some(l), None) => (l, remaining - l),
                // Over-constrained: ignore 'right' in ltr, 'left' in rtl.
                (Some(l), Some(r)) => match direction {
                    Direction::Ltr => (l, r),
                    Direction::Rtl => {
                        return AbsoluteHorizontal {
                            left: cb_width - right - r - width - border_padding - l,
                            margin_left: l,
                            width,
                            margin_right: r,
                        };
                    }
                },
            };
            AbsoluteHorizontal {
                left,
                margin_left,
                width,
                margin_right,
            }
        }
        // "Otherwise, set 'auto' values for 'margin-left' and
        // 'margin-right' to 0, and pick the one of the following six rules
        // that applies."
        _ => {
            let ml = margin_left.unwrap_or(0.0);
            let mr = margin_right.unwrap_or(0.0);
            let outer = ml + mr + border_padding;
            let (left, width) = match (left, width, right) {
                // 1. "'left' and 'width' are 'auto' and 'right' is not
                // 'auto', then the width is shrink-to-fit. Then solve for
                // 'left'"
                (None, None, Some(right)) => {
                    let width = fit(cb_width - right - outer);
                    (cb_width - right - outer - width, width)
                }
                // 2. "'left' and 'right' are 'auto' and 'width' is not
                // 'auto', then if the 'direction' property of the element
                // establishing the static-position containing block is 'ltr'
                // set 'left' to the static position"
                (None, Some(width), None) => match direction {
                    Direction::Ltr => (static_left, width),
                    Direction::Rtl => (static_left - outer - width, width),
                },
                // 3. "'width' and 'right' are 'auto' and 'left' is not
                // 'auto', then the width is shrink-to-fit."
                (Some(left), None, None) => (left, fit(cb_width - left - outer)),
                // 4. "'left' is 'auto', 'width' and 'right' are not 'auto',
                // then solve for 'left'"
                (None, Some(width), Some(right)) => (cb_width - right - outer - width, width),
                // 5. "'width' is 'auto', 'left' and 'right' are not 'auto',
                // then solve for 'width'"
                (Some(left), None, Some(right)) => (left, (cb_width - left - right - outer).max(0.0)),
                // 6. "'right' is 'auto', 'left' and 'width' are not 'auto',
                // then solve for 'right'"
                (Some(left), Some(width), None) => (left, width),
                (None, None, None) | (Some(_), Some(_), Some(_)) => (static_left, 0.0),
            };
            AbsoluteHorizontal {
                left,
                margin_left: ml,
                width,
                margin_right: mr,
            }
        }
    }
}

/// [§ 10.3.7](https://www.w3.org/TR/CSS2/visudet.html#abs-non-replaced-width)
/// and [§ 10.6.4](https://www.w3.org/TR/CSS2/visudet.html#abs-non-replaced-height)
///
/// Lay out an absolutely positioned or fixed box against `cb_rect`, the
/// padding box of its containing block.
pub(crate) fn layout_absolute(
    ctx: &mut LayoutContext<'_>,
    pending: PendingAbsolute,
    cb_rect: Rect,
    direction: Direction,
) -> Fragment {
    let tree = ctx.tree;
    let id = pending.box_id;
    let style = tree.style(id);
    let cb = ContainingBlock::from_rect(cb_rect, direction);
    let offsets = BoxOffsets::resolve(style, cb.width, cb.height);
    let padding = style.padding(cb.width);
    let border = style.border();
    let (pad_h, border_h) = (padding.horizontal(), border.horizontal());
    let (pad_v, border_v) = (padding.vertical(), border.vertical());

    // STEP 1: Width and horizontal position.
    let replaced = matches!(tree.kind(id), BoxKind::Replaced(_));
    let width = if replaced {
        Some(crate::replaced::used_size(ctx, id, &cb).0)
    } else {
        style
            .width
            .resolve(cb.width)
            .map(|w| content_size(style, w, pad_h, border_h))
    };
    let margin_left = style.margin_left.resolve(cb.width);
    let margin_right = style.margin_right.resolve(cb.width);
    let mbp = margin_left.unwrap_or(0.0) + margin_right.unwrap_or(0.0) + pad_h + border_h;
    let mut fit = |available: f32| {
        // [§ 10.3.7]: "the shrink-to-fit width ... with 'available width'
        // ... the width of the containing block minus the used values of
        // 'left' and 'right' (if not 'auto')".
        (crate::preferred::shrink_to_fit(ctx, id, available + mbp) - mbp).max(0.0)
    };
    let h = solve_absolute_horizontal(
        cb.width,
        offsets,
        width,
        margin_left,
        margin_right,
        pad_h + border_h,
        pending.static_x - cb.x,
        direction,
        &mut fit,
    );

    // STEP 2: Lay the box out at that width. Auto margins are resolved
    // here, so the containing block handed down excludes them.
    let mut inner_x = cb.x + h.left;
    let mut inner_width = h.width + pad_h + border_h;
    match margin_left {
        Some(m) => inner_width += m,
        None => inner_x += h.margin_left,
    }
    if let Some(m) = margin_right {
        inner_width += m;
    }
    let layout_cb = ContainingBlock {
        x: inner_x,
        y: cb.y,
        width: inner_width,
        height: cb.height,
        direction,
    };

    // STEP 3: Vertical position.
    // [§ 10.6.4](https://www.w3.org/TR/CSS2/visudet.html#abs-non-replaced-height)
    // "If all three of 'top', 'height', and 'bottom' are auto, set 'top'
    // to the static position."
    let static_top = pending.static_y - cb.y;
    let margin_top = style.margin_top.resolve(cb.width);
    let margin_bottom = style.margin_bottom.resolve(cb.width);
    let declared_height = style
        .height
        .resolve_definite(cb.height)
        .map(|v| content_size(style, v, pad_v, border_v));
    let top = offsets.top.unwrap_or(static_top);
    let mut fragment = layout_unbreakable(ctx, id, &layout_cb, cb.y + top);

    let cb_height = cb_rect.height;
    let vertical_mbp = margin_top.unwrap_or(0.0) + margin_bottom.unwrap_or(0.0) + pad_v + border_v;
    match (offsets.top, declared_height, offsets.bottom) {
        // "'height' is 'auto', 'top' and 'bottom' are not 'auto', then ...
        // solve for 'height'"
        (Some(t), None, Some(b)) if !replaced => {
            fragment.dimensions.content.height = (cb_height - t - b - vertical_mbp).max(0.0);
        }
        // "'top' is 'auto', 'height' and 'bottom' are not 'auto', then solve
        // for 'top'", and likewise with an auto height.
        (None, _, Some(b)) => {
            let outer = fragment.margin_box().height;
            let y = cb.y + cb_height - b - outer;
            let dy = y - fragment.margin_box().y;
            fragment.translate(0.0, dy);
        }
        // "If none of the three are 'auto': If both 'margin-top' and
        // 'margin-bottom' are 'auto', solve the equation under the extra
        // constraint that the two margins get equal values."
        (Some(t), Some(h), Some(b)) if margin_top.is_none() && margin_bottom.is_none() => {
            let each = ((cb_height - t - b - h - pad_v - border_v) / 2.0).max(0.0);
            fragment.translate(0.0, each);
            fragment.dimensions.margin.top = each;
            fragment.dimensions.margin.bottom = each;
        }
        _ => {}
    }
    log::trace!(
        target: "quire::block",
        "{} positioned at ({}, {})",
        tree.describe(id),
        fragment.border_box().x,
        fragment.border_box().y
    );
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(offsets: BoxOffsets, width: Option<f32>, fit_to: f32) -> AbsoluteHorizontal {
        let mut fit = |available: f32| available.min(fit_to);
        solve_absolute_horizontal(200.0, offsets, width, Some(0.0), Some(0.0), 10.0, 30.0, Direction::Ltr, &mut fit)
    }

    #[test]
    fn all_auto_uses_static_position_and_shrinks() {
        let h = solve(BoxOffsets::default(), None, 50.0);
        assert_eq!((h.left, h.width), (30.0, 50.0));
    }

    #[test]
    fn right_anchored_boxes_solve_for_left() {
        let offsets = BoxOffsets {
            right: Some(20.0),
            ..BoxOffsets::default()
        };
        let h = solve(offsets, Some(40.0), 0.0);
        assert_eq!(h.left, 200.0 - 20.0 - 10.0 - 40.0);
    }

    #[test]
    fn left_and_right_stretch_auto_width() {
        let offsets = BoxOffsets {
            left: Some(10.0),
            right: Some(20.0),
            ..BoxOffsets::default()
        };
        let h = solve(offsets, None, 0.0);
        assert_eq!(h.width, 160.0);
    }

    #[test]
    fn auto_margins_centre_between_offsets() {
        let offsets = BoxOffsets {
            left: Some(0.0),
            right: Some(0.0),
            ..BoxOffsets::default()
        };
        let mut fit = |a: f32| a;
        let h = solve_absolute_horizontal(200.0, offsets, Some(100.0), None, None, 0.0, 0.0, Direction::Ltr, &mut fit);
        assert_eq!((h.margin_left, h.margin_right), (50.0, 50.0));
    }

    #[test]
    fn relative_offsets_prefer_left_and_top() {
        let style = ComputedStyle {
            position: Position::Relative,
            left: Dimension::Px(5.0),
            right: Dimension::Px(50.0),
            bottom: Dimension::Px(7.0),
            ..ComputedStyle::default()
        };
        let cb = ContainingBlock {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: None,
            direction: Direction::Ltr,
        };
        assert_eq!(relative_offset(&style, &cb), (5.0, -7.0));
    }
}
