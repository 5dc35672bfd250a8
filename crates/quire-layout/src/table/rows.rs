//! Row groups, rows and cells.
//!
//! [§ 17.5.3 Table height algorithms](https://www.w3.org/TR/CSS2/tables.html#height-layout)
//!
//! "The height of a 'table-row' element's box is calculated once the user
//! agent has all the cells in the row available: it is the maximum of the
//! row's computed 'height', the computed 'height' of each cell in the row,
//! and the minimum height (MIN) required by the cells."
//!
//! A cell spanning several rows only counts towards the height of the last
//! row it spans.

use quire_common::warning::warn_once;

use super::collapse::CollapsedBorders;
use super::structure::{CellSlot, RowGroup, RowSlot};
use crate::block::{BlockInput, block_container_layout, content_size};
use crate::breaks;
use crate::context::{Checkpoint, LayoutContext};
use crate::fragment::{Fragment, FragmentKind, ResumePoint};
use crate::geometry::{BoxDimensions, ContainingBlock, Direction, Rect};
use crate::style::{BreakInside, BreakValue, VerticalAlign};

/// Column geometry shared by every row of one table fragment.
#[derive(Debug)]
pub(crate) struct GridGeometry {
    /// Used column widths.
    pub columns: Vec<f32>,
    /// Left edge of each column.
    pub positions: Vec<f32>,
    /// Horizontal border spacing.
    pub spacing_x: f32,
    /// Vertical border spacing.
    pub spacing_y: f32,
    /// Left edge of row boxes.
    pub rows_x: f32,
    /// Width of row boxes.
    pub rows_width: f32,
    /// Collapsed borders, `None` in the separated model.
    pub collapsed: Option<CollapsedBorders>,
    /// Table direction.
    pub direction: Direction,
}

impl GridGeometry {
    /// Column positions for `widths` inside the table content box.
    ///
    /// "In the separated borders model, the column widths ... are the
    /// distances between the edges of the border-spacing."
    pub(crate) fn positions(widths: &[f32], spacing: f32, x: f32, width: f32, direction: Direction) -> Vec<f32> {
        let mut positions = Vec::with_capacity(widths.len());
        match direction {
            Direction::Ltr => {
                let mut x = x;
                for w in widths {
                    x += spacing;
                    positions.push(x);
                    x += w;
                }
            }
            Direction::Rtl => {
                let mut x = x + width;
                for w in widths {
                    x -= spacing + w;
                    positions.push(x);
                }
            }
        }
        positions
    }

    /// Left edge and width of the columns a cell spans.
    #[allow(clippy::cast_precision_loss)]
    fn span(&self, cell: &CellSlot) -> (f32, f32) {
        let columns = cell.col..cell.col + cell.colspan;
        let width = self.columns[columns.clone()].iter().sum::<f32>()
            + self.spacing_x * (cell.colspan - 1) as f32;
        let x = match self.direction {
            Direction::Ltr => self.positions[cell.col],
            Direction::Rtl => self.positions[columns.end - 1],
        };
        (x, width)
    }
}

/// What a row group layout call receives.
#[derive(Debug, Clone)]
pub(crate) struct GroupInput<'r> {
    /// Top of the group.
    pub y: f32,
    /// Space to keep free above the page bottom.
    pub bottom_space: f32,
    /// Whether nothing was placed on the page yet.
    pub page_is_empty: bool,
    /// Row (and cells) to resume at.
    pub skip: Option<&'r ResumePoint>,
}

/// Result of a row group layout call.
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupOutcome {
    /// The group fragment, `None` when the whole group moves on.
    pub fragment: Option<Fragment>,
    /// Row to continue at on the next page.
    pub resume_at: Option<ResumePoint>,
    /// Forced break that ended the group on this page.
    pub next_page: Option<BreakValue>,
    /// Cursor below the group, spacing included.
    pub end_y: f32,
}

struct LaidCell {
    fragment: Fragment,
    slot: CellSlot,
    align: VerticalAlign,
}

struct LaidRow {
    cells: Vec<LaidCell>,
    branches: Vec<(usize, ResumePoint)>,
    all_empty: bool,
}

/// A cell spanning rows below the one holding its fragment.
struct Spanning {
    row: usize,
    child: usize,
    last_row: usize,
    align: VerticalAlign,
}

/// Increase the top padding of a cell, moving its content down.
fn add_top_padding(cell: &mut Fragment, extra: f32) {
    cell.dimensions.padding.top += extra;
    cell.dimensions.content.y += extra;
    if let Some(baseline) = &mut cell.baseline {
        *baseline += extra;
    }
    for child in &mut cell.children {
        child.translate(0.0, extra);
    }
}

/// Stretch a cell to end at `bottom`, honouring `vertical-align`.
fn stretch_cell(cell: &mut Fragment, bottom: f32, align: VerticalAlign) {
    let extra = bottom - cell.border_box().bottom();
    if extra <= 0.0 {
        return;
    }
    match align {
        VerticalAlign::Bottom => add_top_padding(cell, extra),
        VerticalAlign::Middle => {
            add_top_padding(cell, extra / 2.0);
            cell.dimensions.padding.bottom += extra / 2.0;
        }
        _ => cell.dimensions.padding.bottom += extra,
    }
}

/// Distance from the border top of a cell to its first baseline, or to
/// the bottom of its content box when it has no line.
fn cell_baseline(cell: &Fragment) -> f32 {
    let top = cell.border_box().y;
    cell.baseline
        .unwrap_or_else(|| cell.dimensions.content.bottom())
        - top
}

const fn aligns_on_baseline(align: VerticalAlign) -> bool {
    !matches!(
        align,
        VerticalAlign::Top | VerticalAlign::Middle | VerticalAlign::Bottom
    )
}

/// Lay out the cells starting in `row`, each at the top of the row.
#[allow(clippy::too_many_arguments)]
fn layout_cells(
    ctx: &mut LayoutContext<'_>,
    geometry: &GridGeometry,
    row: &RowSlot,
    row_index: usize,
    y: f32,
    bottom_space: f32,
    page_is_empty: bool,
    skip: Option<&ResumePoint>,
) -> LaidRow {
    let tree = ctx.tree;
    let columns = geometry.columns.len();
    let mut laid = LaidRow {
        cells: Vec::with_capacity(row.cells.len()),
        branches: Vec::new(),
        all_empty: true,
    };

    for (k, slot) in row.cells.iter().enumerate() {
        if slot.col >= columns {
            let _ = warn_once(
                "Table",
                &format!(
                    "{} has more cells than the table has columns, {} ignored",
                    tree.describe(row.id),
                    row.cells.len() - k
                ),
            );
            break;
        }
        let slot = CellSlot {
            colspan: slot.colspan.min(columns - slot.col),
            ..*slot
        };
        let style = tree.style(slot.id);
        let (x, width) = geometry.span(&slot);
        let own = style.border();
        let used = geometry.collapsed.as_ref().map_or(own, |c| {
            c.cell(
                row_index..row_index + slot.rowspan,
                slot.col..slot.col + slot.colspan,
            )
        });

        // A split row continues the listed cells; the others are done.
        let finished = ResumePoint::at(tree.children(slot.id).len());
        let cell_skip = skip
            .filter(|rp| !rp.branches.is_empty())
            .map(|rp| rp.branch(k).unwrap_or(&finished));

        let cb = ContainingBlock {
            x: x + used.left - own.left,
            y,
            width: (width - used.horizontal() + own.horizontal()).max(0.0),
            height: None,
            direction: geometry.direction,
        };
        let input = BlockInput {
            position_y: if cell_skip.is_some() { y } else { y + used.top - own.top },
            bottom_space,
            skip: cell_skip,
            page_is_empty,
            adjoining_margins: Vec::new(),
        };
        let checkpoint = ctx.checkpoint();
        let outcome = block_container_layout(ctx, slot.id, &cb, &input);
        let (mut fragment, resume) = if let Some(fragment) = outcome.fragment {
            (fragment, outcome.resume_at)
        } else {
            // Nothing of the cell fits here: leave it empty on this page.
            ctx.rollback(&checkpoint);
            let empty = BlockInput {
                position_y: y,
                skip: Some(&finished),
                page_is_empty: true,
                ..input
            };
            let fragment = block_container_layout(ctx, slot.id, &cb, &empty)
                .fragment
                .unwrap_or_else(|| Fragment::new(Some(slot.id), FragmentKind::TableCell, BoxDimensions::default()));
            (fragment, Some(ResumePoint::at(0)))
        };

        fragment.kind = FragmentKind::TableCell;
        fragment.dimensions.border.left = used.left;
        fragment.dimensions.border.right = used.right;
        if !fragment.is_continuation {
            fragment.dimensions.border.top = used.top;
        }
        if !fragment.is_broken {
            fragment.dimensions.border.bottom = used.bottom;
        }

        // The declared height of a cell is a minimum.
        let dims = fragment.dimensions;
        if let Some(declared) = style.height.px()
            && !fragment.is_broken
            && !fragment.is_continuation
        {
            let min = content_size(style, declared, dims.padding.vertical(), dims.border.vertical());
            let extra = min - dims.content.height;
            if extra > 0.0 {
                let shift = match style.vertical_align {
                    VerticalAlign::Middle => extra / 2.0,
                    VerticalAlign::Bottom => extra,
                    _ => 0.0,
                };
                for child in &mut fragment.children {
                    child.translate(0.0, shift);
                }
                if let Some(baseline) = &mut fragment.baseline {
                    *baseline += shift;
                }
                fragment.dimensions.content.height = min;
            }
        }

        laid.all_empty &= fragment.children.is_empty();
        if let Some(resume) = resume {
            laid.branches.push((k, resume));
        }
        laid.cells.push(LaidCell {
            fragment,
            slot,
            align: style.vertical_align,
        });
    }
    laid
}

/// Align the baseline cells of a row with each other. Returns the row
/// baseline offset from `y`, if any cell aligns on it.
fn align_baselines(cells: &mut [LaidCell]) -> Option<f32> {
    let highest = cells
        .iter()
        .filter(|c| aligns_on_baseline(c.align))
        .map(|c| cell_baseline(&c.fragment))
        .reduce(f32::max)?;
    for cell in cells.iter_mut().filter(|c| aligns_on_baseline(c.align)) {
        let extra = highest - cell_baseline(&cell.fragment);
        if extra > 0.0 {
            add_top_padding(&mut cell.fragment, extra);
        }
    }
    Some(highest)
}

/// Lay out the rows of `group` from `input.y`. `first_row` is the index of
/// the group's first row among all rows of the table.
#[allow(clippy::too_many_lines)]
pub(crate) fn layout_group(
    ctx: &mut LayoutContext<'_>,
    geometry: &GridGeometry,
    group: &RowGroup,
    first_row: usize,
    input: &GroupInput<'_>,
) -> GroupOutcome {
    let tree = ctx.tree;
    let group_checkpoint = ctx.checkpoint();
    let mut y = input.y;
    let mut page_is_empty = input.page_is_empty;
    let (start, mut skip) = input.skip.map_or((0, None), |rp| (rp.index, Some(rp)));
    let mut rows: Vec<Fragment> = Vec::new();
    let mut checkpoints: Vec<Checkpoint> = Vec::new();
    let mut spanning: Vec<Spanning> = Vec::new();
    let mut resume_at = None;
    let mut next_page = None;

    if input.skip.is_none()
        && let Some(id) = group.id
    {
        crate::generated::record_box_start(ctx, id, page_is_empty);
    }

    for r in start..group.rows.len() {
        let row = &group.rows[r];
        if let Some(previous) = rows.last().and_then(|f| f.box_id) {
            let value = breaks::between(tree, previous, row.id);
            if value.is_forced() {
                log::debug!(
                    target: "quire::pagination",
                    "forced {value} break before {}",
                    tree.describe(row.id)
                );
                resume_at = Some(ResumePoint::at(r));
                next_page = Some(value);
                break;
            }
        }

        // STEP 1: Cells at the top of the row.
        let checkpoint = ctx.checkpoint();
        let row_skip = skip.take();
        if row_skip.is_none() {
            crate::generated::record_box_start(ctx, row.id, page_is_empty);
        }
        let mut laid = layout_cells(
            ctx,
            geometry,
            row,
            first_row + r,
            y,
            input.bottom_space,
            page_is_empty,
            row_skip,
        );
        let baseline = align_baselines(&mut laid.cells);

        // STEP 2: Row height from the cells ending here.
        let declared = tree.style(row.id).height.px().unwrap_or(0.0);
        let mut bottom = y + declared;
        for cell in laid.cells.iter().filter(|c| c.slot.rowspan == 1) {
            bottom = bottom.max(cell.fragment.border_box().bottom());
        }
        for span in spanning.iter().filter(|s| s.last_row == r) {
            bottom = bottom.max(rows[span.row].children[span.child].border_box().bottom());
        }

        // STEP 3: Does it fit?
        let broken = !laid.branches.is_empty();
        let gave_up = broken && laid.all_empty;
        let kept_whole = broken && tree.style(row.id).break_inside == BreakInside::Avoid;
        if !page_is_empty
            && (gave_up || kept_whole || ctx.overflows_page(input.bottom_space, bottom))
        {
            #[cfg(feature = "layout-trace")]
            log::trace!(
                target: "quire::table",
                "{} ends at {bottom}, past {}",
                tree.describe(row.id),
                ctx.page_bottom - input.bottom_space
            );
            ctx.rollback(&checkpoint);
            if let Some(previous) = rows.last().and_then(|f| f.box_id) {
                if !breaks::between(tree, previous, row.id).is_avoid() {
                    resume_at = Some(ResumePoint::at(r));
                    break;
                }
                if let Some(at) = breaks::find_earlier_page_break(tree, &rows) {
                    ctx.rollback(&checkpoints[at]);
                    let removed = rows.split_off(at);
                    checkpoints.truncate(at);
                    spanning.retain(|s| s.row < at);
                    let resume = removed[0].source_index.unwrap_or(r);
                    log::debug!(
                        target: "quire::pagination",
                        "break avoided before {}, moved back to row {resume}",
                        tree.describe(row.id)
                    );
                    resume_at = Some(ResumePoint::at(resume));
                    break;
                }
            }
            if input.page_is_empty && !rows.is_empty() {
                resume_at = Some(ResumePoint::at(r));
                break;
            }
            ctx.rollback(&group_checkpoint);
            return GroupOutcome {
                end_y: input.y,
                ..GroupOutcome::default()
            };
        }

        // STEP 4: Stretch the cells ending here to the row bottom.
        let row_index = rows.len();
        let mut fragment = Fragment::new(
            Some(row.id),
            FragmentKind::TableRow,
            BoxDimensions {
                content: Rect::new(geometry.rows_x, y, geometry.rows_width, bottom - y),
                ..BoxDimensions::default()
            },
        );
        fragment.baseline = baseline.map(|b| y + b);
        fragment.source_index = Some(r);
        fragment.is_continuation = row_skip.is_some_and(|rp| !rp.branches.is_empty());
        fragment.is_broken = broken;
        for span in spanning.iter().filter(|s| s.last_row == r) {
            stretch_cell(&mut rows[span.row].children[span.child], bottom, span.align);
        }
        for (child, mut cell) in laid.cells.into_iter().enumerate() {
            if cell.slot.rowspan == 1 || broken {
                stretch_cell(&mut cell.fragment, bottom, cell.align);
            } else {
                spanning.push(Spanning {
                    row: row_index,
                    child,
                    last_row: r + cell.slot.rowspan - 1,
                    align: cell.align,
                });
            }
            fragment.children.push(cell.fragment);
        }
        rows.push(fragment);
        checkpoints.push(checkpoint);
        y = bottom;
        page_is_empty = false;

        if broken {
            resume_at = Some(ResumePoint::split(r, laid.branches));
            break;
        }
        y += geometry.spacing_y;
    }

    // Cells spanning past the last row placed here end with it.
    let rows_bottom = rows.last().map_or(input.y, |row| row.border_box().bottom());
    let placed = rows.len() + start;
    for span in spanning.iter().filter(|s| s.last_row + 1 > placed) {
        stretch_cell(&mut rows[span.row].children[span.child], rows_bottom, span.align);
    }

    let mut fragment = Fragment::new(
        group.id,
        FragmentKind::TableRowGroup,
        BoxDimensions {
            content: Rect::new(geometry.rows_x, input.y, geometry.rows_width, rows_bottom - input.y),
            ..BoxDimensions::default()
        },
    );
    fragment.children = rows;
    fragment.is_continuation = input.skip.is_some();
    fragment.is_broken = resume_at.is_some();
    fragment.baseline = fragment.children.iter().find_map(|row| row.baseline);
    GroupOutcome {
        fragment: Some(fragment),
        resume_at,
        next_page,
        end_y: y,
    }
}
