//! Multi-column layout.
//!
//! [CSS Multi-column Layout Level 1](https://www.w3.org/TR/css-multicol-1/)
//!
//! The box tree gives a multi-column container one child per segment:
//! anonymous wrappers holding runs of ordinary content, and the
//! `column-span: all` boxes between them. A wrapper is laid out column by
//! column, each column a page of its own whose bottom is the column
//! height. Spanners are laid out across the whole content box.
//!
//! Column height is the available height when `column-fill` is `auto`.
//! Balanced columns search for the lowest height that still takes the
//! whole segment in the given number of columns, each trial a real layout
//! that is rolled back.

use crate::block::{BlockInput, block_level_layout, collapse_margins};
use crate::context::{LayoutContext, overflows};
use crate::fragment::{Fragment, FragmentKind, ResumePoint};
use crate::geometry::{BoxDimensions, ContainingBlock, Direction, Rect};
use crate::style::{ColumnFill, ColumnSpan, ComputedStyle};
use crate::tree::BoxId;

/// Balancing stops once the search interval is this narrow.
const BALANCE_PRECISION: f32 = 0.5;
/// Cap on layout trials while balancing one segment.
const MAX_BALANCE_TRIALS: usize = 24;
/// Cap on the column count derived from `column-width`.
const MAX_COLUMNS: u32 = 1000;
/// Cap on columns laid out to measure a segment.
const MAX_MEASURED_COLUMNS: usize = 1000;

/// [§ 3.4 Pseudo-algorithm](https://www.w3.org/TR/css-multicol-1/#pseudo-algorithm)
///
/// Used column count, width and gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnGeometry {
    /// Number of columns.
    pub count: u32,
    /// Width of each column.
    pub width: f32,
    /// Gap between neighbouring columns.
    pub gap: f32,
}

/// Used column geometry of a container with `available` content width.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn column_geometry(style: &ComputedStyle, available: f32) -> ColumnGeometry {
    let gap = style.column_gap.resolve(available).max(0.0);
    let available = available.max(0.0);
    let fitting = |width: f32| {
        let width = width.max(1.0);
        (((available + gap) / (width + gap)).floor() as u32).clamp(1, MAX_COLUMNS)
    };
    let count = match (style.column_count.0, style.column_width.resolve(available)) {
        (Some(count), None) => count,
        (None, Some(width)) => fitting(width),
        (Some(count), Some(width)) => count.min(fitting(width)),
        (None, None) => 1,
    };
    let n = count as f32;
    ColumnGeometry {
        count,
        width: ((available - (n - 1.0) * gap) / n).max(0.0),
        gap,
    }
}

/// What a multi-column container placed on this page.
#[derive(Debug, Default)]
pub(crate) struct ColumnsOutcome {
    /// Column and spanner fragments.
    pub children: Vec<Fragment>,
    /// Bottom of the placed content.
    pub bottom: f32,
    /// Where to continue on the next page.
    pub resume_at: Option<ResumePoint>,
    /// Nothing fit: the parent moves the whole container.
    pub nothing_fits: bool,
}

/// One wrapper laid out into columns of a given height.
struct Filled {
    columns: Vec<Fragment>,
    /// Tallest column content.
    used: f32,
    resume_at: Option<ResumePoint>,
}

/// Lay out the segments of multi-column container `id` from `skip`,
/// starting at `y` in its content box `cb`.
pub(crate) fn columns_layout(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    y: f32,
    skip: Option<&ResumePoint>,
    page_is_empty: bool,
    bottom_space: f32,
) -> ColumnsOutcome {
    let tree = ctx.tree;
    let style = tree.style(id);
    let geometry = column_geometry(style, cb.width);
    let segments = tree.children(id);
    let (mut index, mut inner) = skip.map_or((0, None), |rp| (rp.index, rp.inner()));
    let mut outcome = ColumnsOutcome {
        bottom: y,
        ..ColumnsOutcome::default()
    };
    let mut page_is_empty = page_is_empty;

    while index < segments.len() {
        let segment = segments[index];
        let resume_here = move |inner: Option<&ResumePoint>| {
            inner.map_or(ResumePoint::at(index), |rp| ResumePoint::nested(index, rp.clone()))
        };
        let checkpoint = ctx.checkpoint();

        if tree.style(segment).column_span == ColumnSpan::All {
            let input = BlockInput {
                position_y: outcome.bottom,
                bottom_space,
                skip: inner.take(),
                page_is_empty,
                adjoining_margins: Vec::new(),
            };
            let skipped = input.skip.cloned();
            let placed = block_level_layout(ctx, segment, cb, input);
            let fits = placed.fragment.as_ref().is_some_and(|f| {
                placed.resume_at.is_some()
                    || page_is_empty
                    || !ctx.overflows_page(bottom_space, f.border_box().bottom())
            });
            let Some(fragment) = placed.fragment.filter(|_| fits) else {
                ctx.rollback(&checkpoint);
                stop(&mut outcome, resume_here(skipped.as_ref()));
                break;
            };
            outcome.bottom = fragment.border_box().bottom() + collapse_margins(&placed.adjoining_margins);
            outcome.children.push(fragment);
            page_is_empty = false;
            if let Some(resume) = placed.resume_at {
                outcome.resume_at = Some(ResumePoint::nested(index, resume));
                break;
            }
            index += 1;
            continue;
        }

        let skipped = inner.take().cloned();
        let available = ctx.page_bottom - bottom_space - outcome.bottom;
        let height = column_height(
            ctx,
            segment,
            (cb, &geometry, style.column_fill),
            outcome.bottom,
            skipped.as_ref(),
            available,
        );
        if height <= 0.0 && !page_is_empty {
            stop(&mut outcome, resume_here(skipped.as_ref()));
            break;
        }
        let filled = fill_columns(
            ctx,
            segment,
            cb,
            &geometry,
            (outcome.bottom, height),
            skipped.as_ref(),
            page_is_empty,
        );
        if filled.columns.is_empty() {
            ctx.rollback(&checkpoint);
            stop(&mut outcome, resume_here(skipped.as_ref()));
            break;
        }
        log::trace!(
            target: "quire::columns",
            "{} segment {index}: {} columns of {height}px",
            tree.describe(id),
            filled.columns.len()
        );
        let top = outcome.bottom;
        for mut column in filled.columns {
            column.dimensions.content.height = filled.used;
            outcome.children.push(column);
        }
        outcome.bottom = top + filled.used;
        page_is_empty = false;
        if let Some(resume) = filled.resume_at {
            outcome.resume_at = Some(ResumePoint::nested(index, resume));
            break;
        }
        index += 1;
    }
    outcome
}

/// End the page before the current segment. With nothing placed yet the
/// whole container moves.
fn stop(outcome: &mut ColumnsOutcome, resume: ResumePoint) {
    if outcome.children.is_empty() {
        outcome.nothing_fits = true;
    }
    outcome.resume_at = Some(resume);
}

/// [§ 7.1 'column-fill'](https://www.w3.org/TR/css-multicol-1/#cf)
///
/// Height of the columns of `wrapper` with `available` height left on the
/// page.
fn column_height(
    ctx: &mut LayoutContext<'_>,
    wrapper: BoxId,
    (cb, geometry, fill): (&ContainingBlock, &ColumnGeometry, ColumnFill),
    y: f32,
    skip: Option<&ResumePoint>,
    available: f32,
) -> f32 {
    let available = match cb.height {
        Some(declared) => available.min(declared),
        None => available,
    };
    if fill == ColumnFill::Auto && available.is_finite() {
        return available;
    }
    let total = measure(ctx, wrapper, cb, geometry, y, skip);
    let mut high = total.min(available);
    let fits = |ctx: &mut LayoutContext<'_>, height: f32| {
        let checkpoint = ctx.checkpoint();
        let filled = fill_columns(ctx, wrapper, cb, geometry, (y, height), skip, true);
        ctx.rollback(&checkpoint);
        filled.resume_at.is_none()
    };
    if !fits(ctx, high) {
        log::trace!(target: "quire::columns", "content of {} does not balance", ctx.tree.describe(wrapper));
        return high;
    }
    #[allow(clippy::cast_precision_loss)]
    let mut low = total / geometry.count as f32;
    for _ in 0..MAX_BALANCE_TRIALS {
        if high - low < BALANCE_PRECISION {
            break;
        }
        let mid = (low + high) / 2.0;
        if fits(ctx, mid) {
            high = mid;
        } else {
            low = mid;
        }
    }
    high
}

/// Height of the whole remaining content of `wrapper` in one column.
fn measure(
    ctx: &mut LayoutContext<'_>,
    wrapper: BoxId,
    cb: &ContainingBlock,
    geometry: &ColumnGeometry,
    y: f32,
    skip: Option<&ResumePoint>,
) -> f32 {
    let checkpoint = ctx.checkpoint();
    let column_cb = ContainingBlock {
        width: geometry.width,
        height: None,
        ..*cb
    };
    let mut total = 0.0;
    let mut skip = skip.cloned();
    for _ in 0..MAX_MEASURED_COLUMNS {
        ctx.page_bottom = f32::INFINITY;
        let input = BlockInput {
            skip: skip.as_ref(),
            ..BlockInput::unbreakable(y)
        };
        let placed = block_level_layout(ctx, wrapper, &column_cb, input);
        if let Some(fragment) = &placed.fragment {
            total += fragment.margin_box().bottom() - y;
        }
        match placed.resume_at {
            Some(resume) if placed.fragment.is_some() => skip = Some(resume),
            _ => break,
        }
    }
    ctx.rollback(&checkpoint);
    total
}

/// Lay `wrapper` out into at most `geometry.count` columns of `height`.
/// The first column is only forced onto a non-empty page when
/// `page_is_empty`.
fn fill_columns(
    ctx: &mut LayoutContext<'_>,
    wrapper: BoxId,
    cb: &ContainingBlock,
    geometry: &ColumnGeometry,
    (y, height): (f32, f32),
    skip: Option<&ResumePoint>,
    page_is_empty: bool,
) -> Filled {
    let mut filled = Filled {
        columns: Vec::new(),
        used: 0.0,
        resume_at: skip.cloned(),
    };
    let mut page_bottom = ctx.page_bottom;
    let column_bottom = y + height;
    let mut skip = skip.cloned();
    for i in 0..geometry.count {
        #[allow(clippy::cast_precision_loss)]
        let offset = i as f32 * (geometry.width + geometry.gap);
        let x = match cb.direction {
            Direction::Ltr => cb.x + offset,
            Direction::Rtl => cb.x + cb.width - offset - geometry.width,
        };
        let column_cb = ContainingBlock {
            x,
            y,
            width: geometry.width,
            height: None,
            direction: cb.direction,
        };
        let limit = column_bottom.min(page_bottom);
        ctx.page_bottom = limit;
        let input = BlockInput {
            skip: skip.as_ref(),
            page_is_empty: page_is_empty || i > 0,
            ..BlockInput::unbreakable(y)
        };
        let placed = block_level_layout(ctx, wrapper, &column_cb, input);
        // Footnotes placed from a column shift the page bottom.
        page_bottom += ctx.page_bottom - limit;
        ctx.page_bottom = page_bottom;
        let Some(fragment) = placed.fragment else {
            break;
        };
        if i == 0 && !page_is_empty && placed.resume_at.is_none() && overflows(limit, fragment.border_box().bottom()) {
            break;
        }
        filled.used = filled.used.max(fragment.margin_box().bottom() - y);
        let mut column = Fragment::new(
            None,
            FragmentKind::Column,
            BoxDimensions {
                content: Rect::new(x, y, geometry.width, 0.0),
                ..BoxDimensions::default()
            },
        );
        column.baseline = fragment.baseline;
        column.children.push(fragment);
        filled.columns.push(column);
        skip = placed.resume_at;
        filled.resume_at.clone_from(&skip);
        if skip.is_none() {
            break;
        }
    }
    filled
}

/// `(min-content, max-content)` widths of a multi-column container's
/// content box.
pub(crate) fn preferred_widths(ctx: &mut LayoutContext<'_>, id: BoxId) -> (f32, f32) {
    let tree = ctx.tree;
    let style = tree.style(id);
    let count = style.column_count.0.unwrap_or(1);
    let gap = style.column_gap.resolve(0.0).max(0.0);
    let mut column: (f32, f32) = (0.0, 0.0);
    let mut spanning: (f32, f32) = (0.0, 0.0);
    for &segment in tree.children(id) {
        let (min, max) = crate::preferred::preferred_widths(ctx, segment);
        let target = if tree.style(segment).column_span == ColumnSpan::All {
            &mut spanning
        } else {
            &mut column
        };
        target.0 = target.0.max(min);
        target.1 = target.1.max(max);
    }
    if let Some(width) = style.column_width.px() {
        column.1 = column.1.max(width);
    }
    #[allow(clippy::cast_precision_loss)]
    let n = count as f32;
    let across = |w: f32| w * n + gap * (n - 1.0);
    (across(column.0).max(spanning.0), across(column.1).max(spanning.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::resources::StaticImageResolver;
    use crate::text::ApproximateFontMetrics;
    use crate::tree::{BoxNode, BoxTree};

    fn style(json: serde_json::Value) -> ComputedStyle {
        serde_json::from_value(json).unwrap()
    }

    fn lay(container: serde_json::Value, page_bottom: f32, skip: Option<&ResumePoint>) -> ColumnsOutcome {
        let node: BoxNode = serde_json::from_value(container).unwrap();
        let tree = BoxTree::from_node(&node);
        let config = LayoutConfig::default();
        let metrics = ApproximateFontMetrics::new();
        let images = StaticImageResolver::new();
        let mut ctx = LayoutContext::new(&tree, &config, &metrics, &images);
        ctx.page_bottom = page_bottom;
        let id = tree.root().unwrap();
        let cb = ContainingBlock {
            x: 0.0,
            y: 0.0,
            width: 420.0,
            height: None,
            direction: Direction::Ltr,
        };
        ctx.push_bfc(id);
        columns_layout(&mut ctx, id, &cb, 0.0, skip, true, 0.0)
    }

    fn blocks(count: usize, height: &str) -> Vec<serde_json::Value> {
        (0..count)
            .map(|_| serde_json::json!({ "style": { "height": height } }))
            .collect()
    }

    #[test]
    fn count_and_width_give_the_used_geometry() {
        let by_count = column_geometry(&style(serde_json::json!({ "column-count": "3", "column-gap": "30px" })), 420.0);
        assert_eq!(by_count, ColumnGeometry { count: 3, width: 120.0, gap: 30.0 });

        let by_width = column_geometry(&style(serde_json::json!({ "column-width": "100px", "column-gap": "20px" })), 420.0);
        assert_eq!(by_width.count, 3, "(420 + 20) / 120 rounds down");
        assert!((by_width.width - 126.666_67).abs() < 0.01);

        let both = column_geometry(
            &style(serde_json::json!({ "column-count": "5", "column-width": "200px" })),
            420.0,
        );
        assert_eq!(both.count, 2);
    }

    #[test]
    fn balanced_columns_share_the_content() {
        let outcome = lay(
            serde_json::json!({
                "style": { "column-count": "2", "column-gap": "20px" },
                "children": blocks(4, "30px")
            }),
            f32::INFINITY,
            None,
        );
        assert!(outcome.resume_at.is_none());
        assert_eq!(outcome.children.len(), 2);
        let (a, b) = (&outcome.children[0], &outcome.children[1]);
        assert_eq!(a.kind, FragmentKind::Column);
        assert_eq!(b.dimensions.content.x, 220.0);
        assert_eq!(a.dimensions.content.height, 60.0);
        assert_eq!(outcome.bottom, 60.0);
        assert_eq!(a.children[0].children.len(), 2);
        assert_eq!(b.children[0].children.len(), 2);
    }

    #[test]
    fn auto_fill_uses_the_whole_height_first() {
        let outcome = lay(
            serde_json::json!({
                "style": { "column-count": "2", "column-fill": "auto" },
                "children": blocks(4, "30px")
            }),
            100.0,
            None,
        );
        assert_eq!(outcome.children.len(), 2);
        assert_eq!(outcome.children[0].children[0].children.len(), 3);
        assert_eq!(outcome.children[1].children[0].children.len(), 1);
    }

    #[test]
    fn content_past_the_last_column_continues_on_the_next_page() {
        let container = serde_json::json!({
            "style": { "column-count": "2" },
            "children": blocks(6, "30px")
        });
        let first = lay(container.clone(), 60.0, None);
        let resume = first.resume_at.clone().expect("columns continue");
        assert_eq!(resume.index, 0);
        assert!(resume.inner().is_some());
        assert_eq!(first.children.len(), 2);

        let second = lay(container, 1000.0, Some(&resume));
        assert!(second.resume_at.is_none());
        let placed: usize = second.children.iter().map(|c| c.children[0].children.len()).sum();
        assert_eq!(placed, 2);
    }

    #[test]
    fn spanners_sit_between_column_sets() {
        let mut children = blocks(2, "20px");
        children.push(serde_json::json!({ "style": { "column-span": "all", "height": "10px" } }));
        children.extend(blocks(2, "20px"));
        let outcome = lay(
            serde_json::json!({ "style": { "column-count": "2" }, "children": children }),
            f32::INFINITY,
            None,
        );
        let kinds: Vec<&FragmentKind> = outcome.children.iter().map(|c| &c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &FragmentKind::Column,
                &FragmentKind::Column,
                &FragmentKind::Block,
                &FragmentKind::Column,
                &FragmentKind::Column
            ]
        );
        assert_eq!(outcome.children[2].border_box().y, 20.0);
        assert_eq!(outcome.children[2].border_box().width, 420.0);
        assert_eq!(outcome.children[3].dimensions.content.y, 30.0);
        assert_eq!(outcome.bottom, 50.0);
    }
}
