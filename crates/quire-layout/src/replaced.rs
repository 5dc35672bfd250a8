//! Replaced elements (images).
//!
//! [§ 10.3.2 Inline, replaced elements](https://www.w3.org/TR/CSS2/visudet.html#inline-replaced-width)
//! and [§ 10.6.2](https://www.w3.org/TR/CSS2/visudet.html#inline-replaced-height)

use crate::context::LayoutContext;
use crate::geometry::ContainingBlock;
use crate::resources::IntrinsicSize;
use crate::style::{BoxSizing, ComputedStyle};
use crate::tree::{BoxId, BoxKind};

fn intrinsic(ctx: &mut LayoutContext<'_>, id: BoxId) -> IntrinsicSize {
    match ctx.tree.kind(id) {
        // A failed image has no intrinsic dimensions at all.
        BoxKind::Replaced(url) => {
            let url = url.clone();
            ctx.image_size(&url).unwrap_or_default()
        }
        _ => IntrinsicSize::default(),
    }
}

fn to_content(style: &ComputedStyle, declared: f32, cb_width: f32, vertical: bool) -> f32 {
    let padding = style.padding(cb_width);
    let border = style.border();
    let (padding, border) = if vertical {
        (padding.vertical(), border.vertical())
    } else {
        (padding.horizontal(), border.horizontal())
    };
    let size = match style.box_sizing {
        BoxSizing::ContentBox => declared,
        BoxSizing::PaddingBox => declared - padding,
        BoxSizing::BorderBox => declared - padding - border,
    };
    size.max(0.0)
}

/// Used content width and height of a replaced box.
pub(crate) fn used_size(ctx: &mut LayoutContext<'_>, id: BoxId, cb: &ContainingBlock) -> (f32, f32) {
    let style = ctx.style(id);
    let size = intrinsic(ctx, id);
    let width = style
        .width
        .resolve(cb.width)
        .map(|w| to_content(style, w, cb.width, false));
    let height = style
        .height
        .resolve_definite(cb.height)
        .map(|h| to_content(style, h, cb.width, true));
    let ratio = size.ratio.filter(|r| *r > 0.0);

    let (w, h) = match (width, height) {
        (Some(w), Some(h)) => return (w, h),
        // "if 'width' has a computed value of 'auto', 'height' has some
        // other computed value, and the element does have an intrinsic
        // ratio then the used value of 'width' is: (used height) * (intrinsic ratio)"
        (None, Some(h)) => (ratio.map_or(size.width.unwrap_or(0.0), |r| h * r), h),
        (Some(w), None) => (w, ratio.map_or(size.height.unwrap_or(0.0), |r| w / r)),
        (None, None) => match (size.width, size.height, ratio) {
            (Some(w), Some(h), _) => (w, h),
            (Some(w), None, Some(r)) => (w, w / r),
            (None, Some(h), Some(r)) => (h * r, h),
            (Some(w), None, None) => (w, 0.0),
            (None, Some(h), None) => (0.0, h),
            (None, None, Some(r)) => (cb.width, cb.width / r),
            (None, None, None) => (0.0, 0.0),
        },
    };

    let min_w = style.min_width.resolve(cb.width).max(0.0);
    let max_w = style.max_width.0.map_or(f32::INFINITY, |m| m.resolve(cb.width));
    let min_h = style.min_height.resolve_definite(cb.height).unwrap_or(0.0).max(0.0);
    let max_h = style
        .max_height
        .0
        .and_then(|m| m.resolve_definite(cb.height))
        .unwrap_or(f32::INFINITY);
    if width.is_none() && height.is_none() && w > 0.0 && h > 0.0 {
        // [§ 10.4](https://www.w3.org/TR/CSS2/visudet.html#min-max-widths):
        // constrain both dimensions together to keep the ratio.
        return constrain_keeping_ratio(w, h, min_w, max_w.max(min_w), min_h, max_h.max(min_h));
    }
    (w.min(max_w).max(min_w), h.min(max_h).max(min_h))
}

/// The constraint table of CSS 2 § 10.4 for replaced elements with both
/// `width` and `height` auto.
fn constrain_keeping_ratio(w: f32, h: f32, min_w: f32, max_w: f32, min_h: f32, max_h: f32) -> (f32, f32) {
    if w > max_w && h > max_h {
        if max_w / w <= max_h / h {
            (max_w, min_h.max(max_w * h / w))
        } else {
            (min_w.max(max_h * w / h), max_h)
        }
    } else if w < min_w && h < min_h {
        if min_w / w <= min_h / h {
            (max_w.min(min_h * w / h), min_h)
        } else {
            (min_w, max_h.min(min_w * h / w))
        }
    } else if w < min_w && h > max_h {
        (min_w, max_h)
    } else if w > max_w && h < min_h {
        (max_w, min_h)
    } else if w > max_w {
        (max_w, min_h.max(max_w * h / w))
    } else if w < min_w {
        (min_w, max_h.min(min_w * h / w))
    } else if h > max_h {
        (min_w.max(max_h * w / h), max_h)
    } else if h < min_h {
        (max_w.min(min_h * w / h), min_h)
    } else {
        (w, h)
    }
}

/// Content width used for intrinsic sizing: declared px width, else the
/// intrinsic width (through the ratio when only a height is known).
pub(crate) fn preferred_content_width(ctx: &mut LayoutContext<'_>, id: BoxId) -> f32 {
    let style = ctx.style(id);
    if let Some(px) = style.width.px() {
        return to_content(style, px, 0.0, false);
    }
    let size = intrinsic(ctx, id);
    match (size.width, style.height.px(), size.ratio) {
        (_, Some(h), Some(r)) => to_content(style, h, 0.0, true) * r,
        (Some(w), _, _) => w,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_kept_when_shrinking_to_max_width() {
        let (w, h) = constrain_keeping_ratio(400.0, 200.0, 0.0, 100.0, 0.0, f32::INFINITY);
        assert_eq!((w, h), (100.0, 50.0));
    }

    #[test]
    fn small_images_grow_to_min_height() {
        let (w, h) = constrain_keeping_ratio(20.0, 10.0, 0.0, f32::INFINITY, 30.0, f32::INFINITY);
        assert_eq!((w, h), (60.0, 30.0));
    }
}
