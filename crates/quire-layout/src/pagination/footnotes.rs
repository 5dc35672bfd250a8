//! The footnote area of the page being laid out.
//!
//! [§ 2 Footnotes](https://www.w3.org/TR/css-gcpm-3/#footnotes)
//!
//! The area sits at the bottom of the page area and grows upwards: every
//! footnote placed on the page is laid out again inside it, and the page
//! bottom moves up by the area's height. A footnote that makes the area
//! taller than its cap is reported to the next page, marker and all.

use crate::block::layout_unbreakable;
use crate::context::{LayoutContext, overflows};
use crate::fragment::{Fragment, FragmentKind};
use crate::geometry::{BoxDimensions, ContainingBlock, Rect};
use crate::tree::BoxId;

/// Add `footnote` to the current page's area. Returns whether the area
/// still fits under its cap.
pub(crate) fn place(ctx: &mut LayoutContext<'_>, footnote: BoxId) -> bool {
    if !ctx.footnotes.current_page.contains(&footnote) {
        ctx.footnotes.current_page.push(footnote);
    }
    ctx.footnotes.reported.retain(|&f| f != footnote);
    update_area(ctx)
}

/// Move `footnote` from this page's area to the next page.
pub(crate) fn report(ctx: &mut LayoutContext<'_>, footnote: BoxId) {
    log::trace!(target: "quire::pagination", "footnote {footnote:?} reported to the next page");
    ctx.footnotes.current_page.retain(|&f| f != footnote);
    if !ctx.footnotes.reported.contains(&footnote) {
        ctx.footnotes.reported.push(footnote);
    }
    let _ = update_area(ctx);
}

/// Lay the area out again and move the page bottom to its top edge.
fn update_area(ctx: &mut LayoutContext<'_>) -> bool {
    ctx.page_bottom += ctx.footnotes.area_height;
    ctx.footnotes.area_height = 0.0;
    ctx.footnotes.area = None;
    let Some(page_area) = ctx.footnotes.area_cb else {
        return true;
    };
    if ctx.footnotes.current_page.is_empty() {
        return true;
    }

    let cb = ContainingBlock::from_rect(page_area, ctx.tree.style(ctx.footnotes.current_page[0]).direction)
        .with_indefinite_height();
    let mut children = Vec::with_capacity(ctx.footnotes.current_page.len());
    let mut y = 0.0;
    for footnote in ctx.footnotes.current_page.clone() {
        ctx.push_bfc(footnote);
        ctx.push_absolute_scope();
        let fragment = layout_unbreakable(ctx, footnote, &cb, y);
        let _ = ctx.pop_absolute_scope();
        let _ = ctx.pop_bfc();
        y = fragment.margin_box().bottom();
        children.push(fragment);
    }

    let mut area = Fragment::new(
        None,
        FragmentKind::FootnoteArea,
        BoxDimensions {
            content: Rect::new(page_area.x, 0.0, page_area.width, y),
            ..BoxDimensions::default()
        },
    );
    area.children = children;
    ctx.footnotes.area = Some(area);
    ctx.footnotes.area_height = y;
    ctx.page_bottom -= y;
    !overflows(ctx.footnotes.max_height, y)
}

/// The laid out area, moved to the bottom of the page area.
pub(crate) fn finish_area(ctx: &LayoutContext<'_>) -> Option<Fragment> {
    let mut area = ctx.footnotes.area.clone()?;
    let page_area = ctx.footnotes.area_cb?;
    area.translate(0.0, page_area.bottom() - area.dimensions.content.height);
    Some(area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::resources::StaticImageResolver;
    use crate::text::ApproximateFontMetrics;
    use crate::tree::{BoxNode, BoxTree};

    fn footnote_tree(heights: &[&str]) -> BoxTree {
        let children: Vec<_> = heights
            .iter()
            .map(|h| serde_json::json!({ "style": { "float": "footnote", "height": h } }))
            .collect();
        let node: BoxNode = serde_json::from_value(serde_json::json!({
            "children": [{ "children": children }]
        }))
        .unwrap();
        let mut tree = BoxTree::from_node(&node);
        let _ = tree.extract_footnotes();
        tree
    }

    #[test]
    fn the_area_pushes_the_page_bottom_up() {
        let tree = footnote_tree(&["30px", "50px"]);
        let config = LayoutConfig::default();
        let metrics = ApproximateFontMetrics::new();
        let images = StaticImageResolver::new();
        let mut ctx = LayoutContext::new(&tree, &config, &metrics, &images);
        ctx.page_bottom = 200.0;
        ctx.footnotes.area_cb = Some(Rect::new(0.0, 0.0, 100.0, 200.0));
        ctx.footnotes.max_height = 100.0;

        let notes = tree.footnotes().to_vec();
        assert!(place(&mut ctx, notes[0]));
        assert_eq!(ctx.page_bottom, 170.0);
        // 80px of footnotes still fits under the 100px cap.
        assert!(place(&mut ctx, notes[1]));
        assert_eq!(ctx.page_bottom, 120.0);

        report(&mut ctx, notes[1]);
        assert_eq!(ctx.page_bottom, 170.0);
        assert_eq!(ctx.footnotes.reported, vec![notes[1]]);

        let area = finish_area(&ctx).unwrap();
        assert_eq!(area.dimensions.content, Rect::new(0.0, 170.0, 100.0, 30.0));
    }

    #[test]
    fn a_capped_area_reports_overflow() {
        let tree = footnote_tree(&["60px", "60px"]);
        let config = LayoutConfig::default();
        let metrics = ApproximateFontMetrics::new();
        let images = StaticImageResolver::new();
        let mut ctx = LayoutContext::new(&tree, &config, &metrics, &images);
        ctx.page_bottom = 500.0;
        ctx.footnotes.area_cb = Some(Rect::new(0.0, 0.0, 100.0, 500.0));
        ctx.footnotes.max_height = 100.0;

        let notes = tree.footnotes().to_vec();
        assert!(place(&mut ctx, notes[0]));
        assert!(!place(&mut ctx, notes[1]), "120px of footnotes exceeds the cap");
        report(&mut ctx, notes[1]);
        assert_eq!(ctx.page_bottom, 440.0);
        assert_eq!(ctx.footnotes.current_page, vec![notes[0]]);
    }
}
