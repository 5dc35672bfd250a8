//! Table layout.
//!
//! [§ 17 Tables](https://www.w3.org/TR/CSS2/tables.html)
//!
//! A table box generates a wrapper fragment holding the captions and the
//! grid fragment. The grid holds row groups, rows and cells. Tables break
//! between rows, and rows break inside their cells; the header and footer
//! groups repeat on every page the table spans.

mod collapse;
mod columns;
mod rows;
pub mod structure;

pub use columns::ColumnWidths;

use self::collapse::CollapsedBorders;
use self::rows::{GridGeometry, GroupInput, layout_group};
use self::structure::{RowGroup, TableStructure};
use crate::block::{
    BlockInput, HorizontalSolution, LayoutOutcome, avoid_floats, content_size, finish_positioned,
    layout_unbreakable, resolve_top, sizes_to_fit, solve_horizontal, truncates_top_margin,
};
use crate::breaks;
use crate::context::LayoutContext;
use crate::fragment::{Fragment, FragmentKind, ResumePoint};
use crate::geometry::{BoxDimensions, ContainingBlock, EdgeSizes, Rect};
use crate::style::{BorderCollapse, BoxDecorationBreak, BreakInside, BreakValue, TableLayout};
use crate::tree::BoxId;

/// Header and footer groups laid out once per table and copied onto every
/// page the table spans.
#[derive(Debug, Clone, Default)]
pub struct RepeatedGroups {
    /// Left edge of the rows they were laid out for.
    pub rows_x: f32,
    /// Width of the rows they were laid out for.
    pub rows_width: f32,
    /// Header group, laid out at `y = 0`.
    pub header: Option<Fragment>,
    /// Footer group, laid out at `y = 0`.
    pub footer: Option<Fragment>,
}

/// Min-content and max-content widths of a table's content box, captions
/// included.
pub(crate) fn preferred_widths(ctx: &mut LayoutContext<'_>, id: BoxId) -> (f32, f32) {
    let structure = TableStructure::build(ctx.tree, id);
    let widths = columns::intrinsic(ctx, id, &structure);
    let (mut min, mut max) = (widths.table_min, widths.table_max);
    for &caption in &structure.captions {
        let (caption_min, _) = crate::preferred::preferred_widths(ctx, caption);
        min = min.max(caption_min);
    }
    max = max.max(min);
    (min, max)
}

/// Lay out a table (or inline table) box.
#[allow(clippy::too_many_lines)]
pub(crate) fn table_layout(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    input: &BlockInput<'_>,
) -> LayoutOutcome {
    let tree = ctx.tree;
    let style = tree.style(id);
    let structure = TableStructure::build(tree, id);
    let is_continuation = input.skip.is_some();
    let clone = style.box_decoration_break == BoxDecorationBreak::Clone;
    let collapse = style.border_collapse == BorderCollapse::Collapse;
    let fixed = style.table_layout == TableLayout::Fixed && !style.width.is_auto();

    // STEP 1: Top edge. Tables never collapse their margins with their
    // content.
    let margin = style.margin_or_zero(cb.width);
    let mut margin_top = margin.top;
    if (is_continuation && !clone) || truncates_top_margin(ctx, input) {
        margin_top = 0.0;
    }
    let top = resolve_top(ctx, style.clear, input, margin_top);
    let (border_top, cb) = avoid_floats(ctx, id, cb, top.border_top);

    // STEP 2: Borders of the grid box.
    let column_count = if fixed {
        structure.fixed_column_count()
    } else {
        structure.grid_width
    };
    let collapsed = collapse.then(|| CollapsedBorders::resolve(tree, id, &structure, column_count));
    let top_row = match (structure.header.is_some(), input.skip) {
        (false, Some(rp)) => structure.rows_before_body(rp.index) + rp.inner().map_or(0, |r| r.index),
        _ => 0,
    };
    let (border, padding) = match &collapsed {
        Some(borders) => (borders.table(top_row, structure.row_count()), EdgeSizes::default()),
        None => (style.border(), style.padding(cb.width)),
    };

    // STEP 3: Column widths.
    let declared = style
        .width
        .resolve(cb.width)
        .map(|w| content_size(style, w, padding.horizontal(), border.horizontal()));
    let margin_left = style.margin_left.resolve(cb.width);
    let margin_right = style.margin_right.resolve(cb.width);
    let used = match declared {
        Some(width) if fixed => columns::fixed_layout(ctx, id, &structure, width),
        _ => {
            let intrinsic = columns::intrinsic(ctx, id, &structure);
            let available = cb.width
                - margin_left.unwrap_or(0.0)
                - margin_right.unwrap_or(0.0)
                - padding.horizontal()
                - border.horizontal();
            columns::auto_layout(&intrinsic, available, declared)
        }
    };

    // STEP 4: The wrapper box.
    let border_box_width = used.table_width + padding.horizontal() + border.horizontal();
    let horizontal = if sizes_to_fit(tree, id) {
        HorizontalSolution {
            width: border_box_width,
            margin_left: margin_left.unwrap_or(0.0),
            margin_right: margin_right.unwrap_or(0.0),
        }
    } else {
        solve_horizontal(
            cb.width,
            Some(border_box_width),
            margin_left,
            margin_right,
            0.0,
            cb.direction,
        )
    };
    let wrapper_x = cb.x + horizontal.margin_left;
    let positioned = style.is_positioned();
    if positioned {
        ctx.push_absolute_scope();
    }
    if !is_continuation {
        crate::generated::record_box_start(ctx, id, input.page_is_empty);
    }

    // STEP 5: Captions go above the grid on the first fragment.
    let mut y = border_top;
    let mut children = Vec::new();
    if !is_continuation {
        let caption_cb = ContainingBlock {
            x: wrapper_x,
            y,
            width: border_box_width,
            height: None,
            direction: style.direction,
        };
        for &caption in &structure.captions {
            let mut fragment = layout_unbreakable(ctx, caption, &caption_cb, y);
            fragment.kind = FragmentKind::TableCaption;
            y = fragment.margin_box().bottom();
            children.push(fragment);
        }
    }

    // STEP 6: The grid box and its rows.
    let (mut top_border, mut top_padding) = (border.top, padding.top);
    if is_continuation && !clone && !collapse {
        top_border = 0.0;
        top_padding = 0.0;
    }
    let grid_top = y;
    let content_x = wrapper_x + border.left + padding.left;
    let content_y = grid_top + top_border + top_padding;
    let spacing = columns::spacing(style);
    let positions = GridGeometry::positions(&used.widths, spacing, content_x, used.table_width, style.direction);
    let geometry = GridGeometry {
        columns: used.widths.clone(),
        positions,
        spacing_x: spacing,
        spacing_y: spacing,
        rows_x: content_x + spacing,
        rows_width: (used.table_width - 2.0 * spacing).max(0.0),
        collapsed,
        direction: style.direction,
    };
    let rows_input = RowsInput {
        y: content_y + spacing,
        bottom_space: input.bottom_space + padding.bottom + border.bottom,
        page_is_empty: input.page_is_empty,
        skip: input.skip,
    };
    let Some(rows) = layout_rows(ctx, id, &structure, &geometry, &rows_input) else {
        log::trace!(target: "quire::table", "{} moves to the next page", tree.describe(id));
        if positioned {
            let _ = ctx.pop_absolute_scope();
        }
        return LayoutOutcome::default();
    };

    let broken = rows.resume_at.is_some();
    if broken && style.break_inside == BreakInside::Avoid && !input.page_is_empty {
        log::trace!(target: "quire::table", "{} avoids breaking inside", tree.describe(id));
        if positioned {
            let _ = ctx.pop_absolute_scope();
        }
        return LayoutOutcome::default();
    }

    // STEP 7: Grid height. A declared height is a minimum on the last
    // fragment.
    let mut content_height = (rows.end_y - content_y).max(0.0);
    if !broken
        && !is_continuation
        && let Some(height) = style.height.resolve_definite(cb.height)
    {
        let declared = content_size(style, height, padding.vertical(), border.vertical());
        content_height = content_height.max(declared);
    }
    let (mut bottom_border, mut bottom_padding, mut margin_bottom) = (border.bottom, padding.bottom, margin.bottom);
    if broken && !clone {
        bottom_border = 0.0;
        bottom_padding = 0.0;
        margin_bottom = 0.0;
    } else if broken && ctx.config.clone_decoration_margins {
        margin_bottom = 0.0;
    }
    let grid_dims = BoxDimensions {
        content: Rect::new(content_x, content_y, used.table_width, content_height),
        padding: EdgeSizes {
            top: top_padding,
            bottom: bottom_padding,
            ..padding
        },
        border: EdgeSizes {
            top: top_border,
            bottom: bottom_border,
            ..border
        },
        margin: EdgeSizes::default(),
    };
    let mut grid = Fragment::new(Some(id), FragmentKind::TableGrid, grid_dims);
    grid.baseline = rows.children.iter().find_map(|group| group.baseline);
    grid.children = rows.children;
    grid.is_continuation = is_continuation;
    grid.is_broken = broken;
    let grid_bottom = grid.border_box().bottom();
    let baseline = grid.baseline;
    children.push(grid);

    // STEP 8: The wrapper fragment.
    let dims = BoxDimensions {
        content: Rect::new(wrapper_x, border_top, border_box_width, grid_bottom - border_top),
        padding: EdgeSizes::default(),
        border: EdgeSizes::default(),
        margin: EdgeSizes {
            top: margin_top,
            right: horizontal.margin_right,
            bottom: margin_bottom,
            left: horizontal.margin_left,
        },
    };
    let mut wrapper = Fragment::new(Some(id), FragmentKind::Table, dims);
    wrapper.children = children;
    wrapper.clearance = top.clearance;
    wrapper.baseline = baseline;
    wrapper.is_continuation = is_continuation;
    wrapper.is_broken = broken;
    finish_positioned(ctx, id, &mut wrapper, positioned);

    log::trace!(
        target: "quire::table",
        "{} laid out: {} columns, {}px wide{}",
        tree.describe(id),
        used.widths.len(),
        border_box_width,
        if broken { ", continues" } else { "" }
    );
    LayoutOutcome {
        fragment: Some(wrapper),
        resume_at: rows.resume_at,
        next_page: rows.next_page,
        adjoining_margins: if broken { Vec::new() } else { vec![margin_bottom] },
        collapsing_through: false,
    }
}

struct RowsInput<'r> {
    y: f32,
    bottom_space: f32,
    page_is_empty: bool,
    skip: Option<&'r ResumePoint>,
}

/// Row groups placed on one page.
#[derive(Debug, Default)]
struct RowsOutcome {
    children: Vec<Fragment>,
    end_y: f32,
    resume_at: Option<ResumePoint>,
    next_page: Option<BreakValue>,
}

/// Lay out the header, body groups and footer on the current page.
///
/// [§ 17.2](https://www.w3.org/TR/CSS2/tables.html#table-display): "Print
/// user agents may repeat header rows on each page spanned by a table."
///
/// Configurations are tried from both repeated groups down to none; the
/// first one that places a body row (or that the page cannot improve on)
/// is kept. `None` means the table moves to the next page.
fn layout_rows(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    structure: &TableStructure,
    geometry: &GridGeometry,
    input: &RowsInput<'_>,
) -> Option<RowsOutcome> {
    let repeated = repeated_groups(ctx, id, structure, geometry);
    let spacing_y = geometry.spacing_y;
    let height = |group: &Fragment| group.border_box().height + spacing_y;
    // On an empty page, a group that cannot fit with nothing else is
    // dropped rather than pushing the whole table forever.
    let fits_alone = |ctx: &LayoutContext<'_>, group: &Fragment| {
        !input.page_is_empty || !ctx.overflows_page(input.bottom_space, input.y + height(group))
    };
    let header = repeated.header.as_ref().filter(|h| fits_alone(ctx, h));
    let footer = repeated.footer.as_ref().filter(|f| fits_alone(ctx, f));
    let has_body_rows = structure.bodies.iter().any(|g| !g.rows.is_empty());
    let dx = geometry.rows_x - repeated.rows_x;

    let options = [(true, true), (true, false), (false, true), (false, false)];
    for (use_header, use_footer) in options {
        if (use_header && header.is_none()) || (use_footer && footer.is_none()) {
            continue;
        }
        let last = !use_header && !use_footer;
        let header_height = header.filter(|_| use_header).map_or(0.0, height);
        let footer_height = footer.filter(|_| use_footer).map_or(0.0, height);
        let checkpoint = ctx.checkpoint();
        let bodies = layout_bodies(
            ctx,
            structure,
            geometry,
            &RowsInput {
                y: input.y + header_height,
                bottom_space: input.bottom_space + footer_height,
                page_is_empty: input.page_is_empty && !use_header,
                skip: input.skip,
            },
        );
        let bodies = match bodies {
            None if !input.page_is_empty => return None,
            None => {
                ctx.rollback(&checkpoint);
                continue;
            }
            Some(bodies) => bodies,
        };
        let acceptable = !bodies.children.is_empty() || !has_body_rows || !input.page_is_empty || last;
        if !acceptable {
            ctx.rollback(&checkpoint);
            continue;
        }

        let mut children = Vec::with_capacity(bodies.children.len() + 2);
        if let Some(header) = header.filter(|_| use_header) {
            children.push(header.duplicate_at(dx, input.y));
        }
        children.extend(bodies.children);
        let mut end_y = bodies.end_y;
        if let Some(footer) = footer.filter(|_| use_footer) {
            children.push(footer.duplicate_at(dx, end_y));
            end_y += footer_height;
        }
        log::trace!(
            target: "quire::table",
            "{}: header {use_header}, footer {use_footer}",
            ctx.tree.describe(id)
        );
        return Some(RowsOutcome {
            children,
            end_y,
            resume_at: bodies.resume_at,
            next_page: bodies.next_page,
        });
    }
    None
}

/// Lay out body groups from `input.skip` until the page is full.
fn layout_bodies(
    ctx: &mut LayoutContext<'_>,
    structure: &TableStructure,
    geometry: &GridGeometry,
    input: &RowsInput<'_>,
) -> Option<RowsOutcome> {
    let tree = ctx.tree;
    let (start, mut inner) = input.skip.map_or((0, None), |rp| (rp.index, rp.inner()));
    let mut y = input.y;
    let mut page_is_empty = input.page_is_empty;
    let mut children: Vec<Fragment> = Vec::new();
    let mut checkpoints = Vec::new();
    let mut resume_at = None;
    let mut next_page = None;
    let mut previous: Option<&RowGroup> = None;

    for g in start..structure.bodies.len() {
        let group = &structure.bodies[g];
        let between = previous
            .and_then(|p| Some((last_box(p)?, first_box(group)?)))
            .map_or(BreakValue::Auto, |(before, after)| breaks::between(tree, before, after));
        if between.is_forced() && !children.is_empty() {
            log::debug!(target: "quire::pagination", "forced break before row group {g}");
            resume_at = Some(ResumePoint::at(g));
            next_page = Some(between);
            break;
        }

        let checkpoint = ctx.checkpoint();
        let outcome = layout_group(
            ctx,
            geometry,
            group,
            structure.rows_before_body(g),
            &GroupInput {
                y,
                bottom_space: input.bottom_space,
                page_is_empty,
                skip: inner.take(),
            },
        );
        let Some(mut fragment) = outcome.fragment else {
            ctx.rollback(&checkpoint);
            if children.is_empty() {
                return None;
            }
            let mut resume = g;
            if between.is_avoid()
                && let Some(index) = breaks::find_earlier_page_break(tree, &children)
            {
                ctx.rollback(&checkpoints[index]);
                children.truncate(index);
                resume = start + index;
                y = children.last().map_or(input.y, |f| f.border_box().bottom() + geometry.spacing_y);
            }
            resume_at = Some(ResumePoint::at(resume));
            break;
        };
        fragment.source_index = Some(g);
        y = outcome.end_y;
        page_is_empty = false;
        children.push(fragment);
        checkpoints.push(checkpoint);
        if let Some(resume) = outcome.resume_at {
            resume_at = Some(ResumePoint::nested(g, resume));
            next_page = outcome.next_page;
            break;
        }
        previous = Some(group);
    }
    Some(RowsOutcome {
        children,
        end_y: y,
        resume_at,
        next_page,
    })
}

fn first_box(group: &RowGroup) -> Option<BoxId> {
    group.id.or_else(|| group.rows.first().map(|r| r.id))
}

fn last_box(group: &RowGroup) -> Option<BoxId> {
    group.id.or_else(|| group.rows.last().map(|r| r.id))
}

/// Header and footer fragments for `table`, laid out at `y = 0` in one
/// piece. Cached per table and reused while the row width holds.
#[allow(clippy::float_cmp)]
fn repeated_groups(
    ctx: &mut LayoutContext<'_>,
    table: BoxId,
    structure: &TableStructure,
    geometry: &GridGeometry,
) -> RepeatedGroups {
    if let Some(cached) = ctx.table_groups.get(&table)
        && cached.rows_width == geometry.rows_width
    {
        return cached.clone();
    }
    let page_bottom = ctx.page_bottom;
    ctx.page_bottom = f32::INFINITY;
    let mut lay = |group: Option<&RowGroup>, first_row: usize| {
        let group = group?;
        let outcome = layout_group(
            ctx,
            geometry,
            group,
            first_row,
            &GroupInput {
                y: 0.0,
                bottom_space: 0.0,
                page_is_empty: true,
                skip: None,
            },
        );
        outcome.fragment
    };
    let header = lay(structure.header.as_ref(), 0);
    let footer = lay(structure.footer.as_ref(), structure.rows_before_body(structure.bodies.len()));
    ctx.page_bottom = page_bottom;
    let groups = RepeatedGroups {
        rows_x: geometry.rows_x,
        rows_width: geometry.rows_width,
        header,
        footer,
    };
    let _ = ctx.table_groups.insert(table, groups.clone());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::resources::StaticImageResolver;
    use crate::text::ApproximateFontMetrics;
    use crate::tree::{BoxNode, BoxTree};

    fn cell(text: &str) -> serde_json::Value {
        serde_json::json!({ "style": { "display": "table-cell" }, "children": [{ "text": text }] })
    }

    fn row(cells: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "style": { "display": "table-row", "height": "40px" },
            "children": cells.iter().map(|c| cell(c)).collect::<Vec<_>>()
        })
    }

    fn lay(
        table: serde_json::Value,
        page_bottom: f32,
        skip: Option<&ResumePoint>,
    ) -> LayoutOutcome {
        let node: BoxNode = serde_json::from_value(table).unwrap();
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
            direction: crate::geometry::Direction::Ltr,
        };
        ctx.push_bfc(id);
        let input = BlockInput {
            skip,
            ..BlockInput::unbreakable(0.0)
        };
        table_layout(&mut ctx, id, &cb, &input)
    }

    fn groups(outcome: &LayoutOutcome) -> Vec<&Fragment> {
        let wrapper = outcome.fragment.as_ref().unwrap();
        let grid = wrapper
            .children
            .iter()
            .find(|f| f.kind == FragmentKind::TableGrid)
            .unwrap();
        grid.children.iter().collect()
    }

    #[test]
    fn fixed_table_splits_width_equally() {
        let outcome = lay(
            serde_json::json!({
                "style": { "display": "table", "table-layout": "fixed", "width": "300px" },
                "children": [row(&["a", "b", "c"])]
            }),
            f32::INFINITY,
            None,
        );
        let rows = &groups(&outcome)[0].children;
        let cells = &rows[0].children;
        assert_eq!(cells.len(), 3);
        for cell in cells {
            assert_eq!(cell.border_box().width, 100.0);
        }
        assert!(outcome.resume_at.is_none());
    }

    #[test]
    fn rows_break_and_the_header_repeats() {
        let table = serde_json::json!({
            "style": { "display": "table", "width": "200px" },
            "children": [
                {
                    "style": { "display": "table-header-group" },
                    "children": [row(&["head"])]
                },
                {
                    "style": { "display": "table-row-group" },
                    "children": [row(&["1"]), row(&["2"]), row(&["3"]), row(&["4"])]
                }
            ]
        });
        let first = lay(table.clone(), 130.0, None);
        let resume = first.resume_at.clone().expect("table continues");
        let first_groups = groups(&first);
        assert_eq!(first_groups.len(), 2, "header and one body");
        assert_eq!(first_groups[1].children.len(), 2, "two body rows fit under the header");

        let second = lay(table, 1000.0, Some(&resume));
        let second_groups = groups(&second);
        assert_eq!(second_groups[0].text(), "head", "header repeated");
        assert_eq!(second_groups[1].children.len(), 2);
        assert!(second.fragment.unwrap().is_continuation);
    }

    #[test]
    fn captions_only_on_the_first_fragment() {
        let table = serde_json::json!({
            "style": { "display": "table" },
            "children": [
                { "style": { "display": "table-caption" }, "children": [{ "text": "Caption" }] },
                row(&["1"]), row(&["2"])
            ]
        });
        let first = lay(table.clone(), 70.0, None);
        let wrapper = first.fragment.as_ref().unwrap();
        assert_eq!(wrapper.children[0].kind, FragmentKind::TableCaption);
        let resume = first.resume_at.clone().expect("second row moves");

        let second = lay(table, 1000.0, Some(&resume));
        let wrapper = second.fragment.unwrap();
        assert!(wrapper.children.iter().all(|f| f.kind != FragmentKind::TableCaption));
    }
}
