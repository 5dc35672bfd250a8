//! Grid layout.
//!
//! [CSS Grid Layout Module Level 1](https://www.w3.org/TR/css-grid-1/)
//!
//! A grid container resolves its explicit grid from the templates, places
//! its items, sizes columns then rows, and lays every item out in one
//! piece inside its grid area. Grids break between rows: an item belongs
//! to the fragment in which its first row lies.

mod placement;
mod sizing;
pub mod template;

pub use placement::{GridArea, PlacedItem, Placement};

use self::sizing::{AvailableSpace, Contribution, size_tracks};
use self::template::TrackSize;
use crate::block::{
    BlockInput, LayoutOutcome, avoid_floats, clamp_height, declared_height, finish_positioned,
    fit_outer_width, horizontal_box, layout_unbreakable, resolve_top, truncates_top_margin,
};
use crate::context::{LayoutContext, PendingAbsolute};
use crate::fragment::{Fragment, FragmentKind, ResumePoint};
use crate::geometry::{ContainingBlock, Direction, Rect};
use crate::strings::PageEvent;
use crate::style::{BoxDecorationBreak, BreakInside, ComputedStyle, Position, SelfAlign};
use crate::tree::{BoxId, BoxKind};

/// Children of a grid container split into grid items and the boxes that
/// leave the grid (absolutely positioned and running elements).
fn grid_items(ctx: &LayoutContext<'_>, id: BoxId) -> (Vec<BoxId>, Vec<BoxId>) {
    ctx.tree.children(id).iter().copied().partition(|&child| {
        let position = &ctx.style(child).position;
        !position.is_absolutely_positioned() && !matches!(position, Position::Running(_))
    })
}

/// Sizing functions of `count` tracks: implicit tracks before the explicit
/// grid cycle backwards through `auto`, those after it forwards.
fn track_sizes(explicit: &[TrackSize], auto: &[TrackSize], offset: usize, count: usize) -> Vec<TrackSize> {
    let cycle = |i: usize| auto.get(i % auto.len().max(1)).copied().unwrap_or(TrackSize::AUTO);
    (0..count)
        .map(|i| {
            if i < offset {
                let back = offset - i;
                cycle((auto.len() - back % auto.len().max(1)) % auto.len().max(1))
            } else if let Some(size) = explicit.get(i - offset) {
                *size
            } else {
                cycle(i - offset - explicit.len())
            }
        })
        .collect()
}

/// Placement and column sizing shared by layout and preferred widths.
struct Columns {
    placement: Placement,
    widths: Vec<f32>,
    gap: f32,
}

fn size_columns(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    items: &[BoxId],
    (width, height): (Option<f32>, Option<f32>),
    space: AvailableSpace,
) -> Columns {
    let style = ctx.style(id);
    let column_gap = style.column_gap.resolve_definite(width).unwrap_or(0.0);
    let row_gap = style.row_gap.resolve_definite(height).unwrap_or(0.0);
    let rows = style.grid_template_rows.expand(height, row_gap);
    let columns = style.grid_template_columns.expand(width, column_gap);
    let placement = placement::place(
        ctx.tree,
        items,
        &rows,
        &columns,
        &style.grid_template_areas,
        style.grid_auto_flow,
        ctx.config.dense_placement_limit,
    );
    let sizes = track_sizes(
        &columns.sizes,
        &style.grid_auto_columns.0,
        placement.column_offset,
        placement.columns,
    );
    let contributions: Vec<Contribution> = placement
        .items
        .iter()
        .map(|item| {
            let (min, max) = crate::preferred::preferred_widths(ctx, item.id);
            Contribution {
                tracks: item.area.columns.clone(),
                min,
                max,
            }
        })
        .collect();
    let widths = size_tracks(&sizes, &contributions, space, width, column_gap);
    Columns {
        placement,
        widths,
        gap: column_gap,
    }
}

#[allow(clippy::cast_precision_loss)]
fn span_size(sizes: &[f32], tracks: &std::ops::Range<usize>, gap: f32) -> f32 {
    let spanned = &sizes[tracks.start.min(sizes.len())..tracks.end.min(sizes.len())];
    spanned.iter().sum::<f32>() + gap * spanned.len().saturating_sub(1) as f32
}

/// Min-content and max-content widths of a grid container's content box.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn preferred_widths(ctx: &mut LayoutContext<'_>, id: BoxId) -> (f32, f32) {
    let (items, _) = grid_items(ctx, id);
    let total = |columns: &Columns| {
        columns.widths.iter().sum::<f32>() + columns.gap * columns.widths.len().saturating_sub(1) as f32
    };
    let min = total(&size_columns(ctx, id, &items, (None, None), AvailableSpace::MinContent));
    let max = total(&size_columns(ctx, id, &items, (None, None), AvailableSpace::MaxContent));
    (min, max.max(min))
}

/// Lay out a grid container.
#[allow(clippy::too_many_lines)]
pub(crate) fn grid_layout(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    input: &BlockInput<'_>,
) -> LayoutOutcome {
    let tree = ctx.tree;
    let style = tree.style(id);
    let is_continuation = input.skip.is_some();
    let clone = style.box_decoration_break == BoxDecorationBreak::Clone;

    // STEP 1: The container box. It never collapses margins with its items.
    let margin = style.margin_or_zero(cb.width);
    let mut margin_top = margin.top;
    if (is_continuation && !clone) || truncates_top_margin(ctx, input) {
        margin_top = 0.0;
    }
    let top = resolve_top(ctx, style.clear, input, margin_top);
    let (border_top, cb) = avoid_floats(ctx, id, cb, top.border_top);
    let mut dims = horizontal_box(tree, id, &cb, None);
    if is_continuation && !clone {
        dims.border.top = 0.0;
        dims.padding.top = 0.0;
    }
    let content_x = dims.content.x;
    let content_y = border_top + dims.border.top + dims.padding.top;
    let width = dims.content.width;
    let declared = declared_height(style, cb.height, &dims);
    let positioned = style.is_positioned();
    if positioned {
        ctx.push_absolute_scope();
    }
    if !is_continuation {
        crate::generated::record_box_start(ctx, id, input.page_is_empty);
    }

    let (items, out_of_flow) = grid_items(ctx, id);
    if !is_continuation {
        for child in out_of_flow {
            match &ctx.style(child).position {
                Position::Running(name) => ctx.log_event(PageEvent::Running {
                    name: name.clone(),
                    box_id: child,
                    at_start: input.page_is_empty,
                }),
                position => {
                    let pending = PendingAbsolute {
                        box_id: child,
                        static_x: content_x,
                        static_y: content_y,
                    };
                    ctx.defer_positioned(pending, *position == Position::Fixed);
                }
            }
        }
    }

    // STEP 2: Placement and columns.
    let columns = size_columns(ctx, id, &items, (Some(width), declared), AvailableSpace::Definite(width));
    let placement = &columns.placement;
    let mut column_x = Vec::with_capacity(columns.widths.len());
    let mut x = 0.0;
    for w in &columns.widths {
        column_x.push(x);
        x += w + columns.gap;
    }
    let area_x = |tracks: &std::ops::Range<usize>| {
        let start = column_x.get(tracks.start).copied().unwrap_or(0.0);
        let span = span_size(&columns.widths, tracks, columns.gap);
        match style.direction {
            Direction::Ltr => content_x + start,
            Direction::Rtl => content_x + width - start - span,
        }
    };

    // STEP 3: Rows. Row contributions are the items' heights at the width
    // of their columns.
    let row_gap = style.row_gap.resolve_definite(declared).unwrap_or(0.0);
    let row_template = style.grid_template_rows.expand(declared, row_gap);
    let row_sizes = track_sizes(
        &row_template.sizes,
        &style.grid_auto_rows.0,
        placement.row_offset,
        placement.rows,
    );
    let checkpoint = ctx.checkpoint();
    let row_items: Vec<Contribution> = placement
        .items
        .iter()
        .map(|item| {
            let measure_cb = ContainingBlock {
                x: 0.0,
                y: 0.0,
                width: span_size(&columns.widths, &item.area.columns, columns.gap),
                height: None,
                direction: style.direction,
            };
            let height = layout_unbreakable(ctx, item.id, &measure_cb, 0.0).margin_box().height;
            Contribution {
                tracks: item.area.rows.clone(),
                min: height,
                max: height,
            }
        })
        .collect();
    ctx.rollback(&checkpoint);
    let row_space = declared.map_or(AvailableSpace::MaxContent, AvailableSpace::Definite);
    let heights = size_tracks(&row_sizes, &row_items, row_space, declared, row_gap);

    // STEP 4: Rows on this page.
    let first_row = input.skip.map_or(0, |rp| rp.index).min(heights.len());
    let mut row_y = vec![0.0; heights.len()];
    let mut y = content_y;
    for r in first_row..heights.len() {
        row_y[r] = y;
        y += heights[r] + row_gap;
    }
    // Only called for areas starting on this page.
    let area_bottom = |tracks: &std::ops::Range<usize>| {
        let last = tracks.end.min(heights.len()).saturating_sub(1);
        row_y[last] + heights[last]
    };
    let bottom_space = input.bottom_space + dims.padding.bottom + dims.border.bottom;
    let mut end_row = heights.len();
    let mut resume_at = None;
    for r in first_row..heights.len() {
        let mut bottom = row_y[r] + heights[r];
        for item in placement.items.iter().filter(|i| i.area.rows.start == r) {
            bottom = bottom.max(area_bottom(&item.area.rows));
        }
        let forced = r == first_row && input.page_is_empty;
        if !forced && ctx.overflows_page(bottom_space, bottom) {
            if r == first_row {
                log::trace!(target: "quire::grid", "{} moves to the next page", tree.describe(id));
                if positioned {
                    let _ = ctx.pop_absolute_scope();
                }
                return LayoutOutcome::default();
            }
            log::trace!(target: "quire::grid", "{} breaks before row {r}", tree.describe(id));
            end_row = r;
            resume_at = Some(ResumePoint::at(r));
            break;
        }
    }
    let broken = resume_at.is_some();
    if broken && style.break_inside == BreakInside::Avoid && !input.page_is_empty {
        if positioned {
            let _ = ctx.pop_absolute_scope();
        }
        return LayoutOutcome::default();
    }

    // STEP 5: Items whose first row is on this page.
    let mut children = Vec::new();
    for item in placement
        .items
        .iter()
        .filter(|i| (first_row..end_row).contains(&i.area.rows.start))
    {
        let area = Rect::new(
            area_x(&item.area.columns),
            row_y[item.area.rows.start],
            span_size(&columns.widths, &item.area.columns, columns.gap),
            area_bottom(&item.area.rows) - row_y[item.area.rows.start],
        );
        children.push(layout_item(ctx, item.id, area, style));
    }

    // STEP 6: Container height.
    let rows_height = if end_row > first_row {
        row_y[end_row - 1] + heights[end_row - 1] - content_y
    } else {
        0.0
    };
    let height = if broken || is_continuation {
        rows_height
    } else {
        clamp_height(style, cb.height, &dims, declared.unwrap_or(rows_height))
    };
    let mut margin_bottom = margin.bottom;
    if broken && !clone {
        dims.padding.bottom = 0.0;
        dims.border.bottom = 0.0;
        margin_bottom = 0.0;
    } else if broken && ctx.config.clone_decoration_margins {
        margin_bottom = 0.0;
    }
    dims.content.y = content_y;
    dims.content.height = height;
    dims.margin.top = margin_top;
    dims.margin.bottom = margin_bottom;

    let mut fragment = Fragment::new(Some(id), FragmentKind::Grid, dims);
    fragment.baseline = children.first().and_then(|c| c.baseline);
    fragment.children = children;
    fragment.clearance = top.clearance;
    fragment.is_continuation = is_continuation;
    fragment.is_broken = broken;
    finish_positioned(ctx, id, &mut fragment, positioned);
    log::trace!(
        target: "quire::grid",
        "{} laid out: {}x{} tracks, rows {first_row}..{end_row}",
        tree.describe(id),
        columns.widths.len(),
        heights.len()
    );

    LayoutOutcome {
        fragment: Some(fragment),
        resume_at,
        next_page: None,
        adjoining_margins: if broken { Vec::new() } else { vec![margin_bottom] },
        collapsing_through: false,
    }
}

/// [§ 10 Alignment](https://www.w3.org/TR/css-grid-1/#alignment)
///
/// Lay out an item in one piece inside `area`, then align it. `stretch`
/// fills the area in both axes when the size is `auto`; other values
/// shrink the item to fit and offset it. `auto` takes the container's
/// `justify-items` and `align-items`.
fn layout_item(ctx: &mut LayoutContext<'_>, item: BoxId, area: Rect, container: &ComputedStyle) -> Fragment {
    let tree = ctx.tree;
    let style = tree.style(item);
    let replaced = matches!(tree.kind(item), BoxKind::Replaced(_));
    let justify = style.justify_self.or(container.justify_items.or(SelfAlign::Stretch));
    let align = style.align_self.or(container.align_items.or(SelfAlign::Stretch));
    let cb = ContainingBlock {
        x: area.x,
        y: area.y,
        width: area.width,
        height: Some(area.height),
        direction: container.direction,
    };
    let fits = (justify != SelfAlign::Stretch || replaced) && style.width.is_auto();
    let item_cb = if fits {
        ContainingBlock {
            width: fit_outer_width(ctx, item, &cb).min(area.width),
            ..cb
        }
    } else {
        cb
    };
    let mut fragment = layout_unbreakable(ctx, item, &item_cb, area.y);
    let outer = fragment.margin_box();

    let free_x = (area.width - outer.width).max(0.0);
    let dx = match justify {
        SelfAlign::Center => free_x / 2.0,
        SelfAlign::End => free_x,
        SelfAlign::Auto | SelfAlign::Start | SelfAlign::Stretch => 0.0,
    };
    let free_y = (area.height - outer.height).max(0.0);
    let dy = match align {
        SelfAlign::Center => free_y / 2.0,
        SelfAlign::End => free_y,
        SelfAlign::Stretch if style.height.is_auto() && !replaced => {
            fragment.dimensions.content.height += free_y;
            0.0
        }
        SelfAlign::Auto | SelfAlign::Start | SelfAlign::Stretch => 0.0,
    };
    fragment.translate(dx, dy);
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::resources::StaticImageResolver;
    use crate::text::ApproximateFontMetrics;
    use crate::tree::{BoxNode, BoxTree};

    fn lay(grid: serde_json::Value, page_bottom: f32, skip: Option<&ResumePoint>) -> LayoutOutcome {
        let node: BoxNode = serde_json::from_value(grid).unwrap();
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
            width: 400.0,
            height: None,
            direction: Direction::Ltr,
        };
        ctx.push_bfc(id);
        let input = BlockInput {
            skip,
            ..BlockInput::unbreakable(0.0)
        };
        grid_layout(&mut ctx, id, &cb, &input)
    }

    fn boxed(height: &str) -> serde_json::Value {
        serde_json::json!({ "style": { "height": height } })
    }

    fn padded(top: &str) -> serde_json::Value {
        serde_json::json!({ "style": { "padding-top": top } })
    }

    #[test]
    fn items_fill_their_areas() {
        let outcome = lay(
            serde_json::json!({
                "style": {
                    "display": "grid",
                    "grid-template-columns": "100px 1fr",
                    "column-gap": "20px"
                },
                "children": [padded("10px"), boxed("30px")]
            }),
            f32::INFINITY,
            None,
        );
        let grid = outcome.fragment.unwrap();
        let (a, b) = (&grid.children[0], &grid.children[1]);
        assert_eq!(a.border_box().width, 100.0);
        assert_eq!(b.border_box().x, 120.0);
        assert_eq!(b.border_box().width, 280.0);
        assert_eq!(a.border_box().height, 30.0, "stretched to the row");
        assert_eq!(grid.dimensions.content.height, 30.0);
    }

    #[test]
    fn rtl_grids_mirror_columns() {
        let outcome = lay(
            serde_json::json!({
                "style": { "display": "grid", "direction": "rtl", "grid-template-columns": "100px 100px" },
                "children": [boxed("10px"), boxed("10px")]
            }),
            f32::INFINITY,
            None,
        );
        let grid = outcome.fragment.unwrap();
        assert_eq!(grid.children[0].border_box().x, 300.0);
        assert_eq!(grid.children[1].border_box().x, 200.0);
    }

    #[test]
    fn grids_break_between_rows() {
        let grid = serde_json::json!({
            "style": { "display": "grid", "grid-auto-rows": "50px", "row-gap": "10px" },
            "children": [boxed("50px"), boxed("50px"), boxed("50px")]
        });
        let first = lay(grid.clone(), 130.0, None);
        let resume = first.resume_at.clone().expect("grid continues");
        assert_eq!(resume.index, 2);
        assert_eq!(first.fragment.as_ref().unwrap().children.len(), 2);

        let second = lay(grid, 1000.0, Some(&resume));
        let fragment = second.fragment.unwrap();
        assert_eq!(fragment.children.len(), 1);
        assert_eq!(fragment.children[0].border_box().y, 0.0);
        assert!(fragment.is_continuation);
    }

    #[test]
    fn implicit_tracks_before_the_grid_use_auto_sizes_backwards() {
        let auto = [
            TrackSize {
                min: template::TrackBreadth::Px(1.0),
                max: template::TrackBreadth::Px(1.0),
            },
            TrackSize {
                min: template::TrackBreadth::Px(2.0),
                max: template::TrackBreadth::Px(2.0),
            },
        ];
        let explicit = [TrackSize::AUTO];
        let sizes = track_sizes(&explicit, &auto, 1, 4);
        assert_eq!(sizes[0], auto[1]);
        assert_eq!(sizes[1], TrackSize::AUTO);
        assert_eq!(sizes[2], auto[0]);
        assert_eq!(sizes[3], auto[1]);
    }
}
