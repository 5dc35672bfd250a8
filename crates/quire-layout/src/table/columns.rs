//! Column widths.
//!
//! [§ 17.5.2 Table width algorithms](https://www.w3.org/TR/CSS2/tables.html#width-layout)
//!
//! The automatic algorithm follows the intrinsic sizing model of
//! <https://dbaron.org/css/intrinsic/>: per-column min-content, max-content
//! and percentage widths, then four guesses interpolated against the
//! assignable width.

use std::rc::Rc;

use quire_common::warning::warn_once;

use super::structure::TableStructure;
use crate::block::content_size;
use crate::context::LayoutContext;
use crate::preferred;
use crate::style::{BorderCollapse, ComputedStyle, LengthPercentage};
use crate::tree::BoxId;

/// Relative tolerance when comparing guesses to the assignable width.
const GUESS_EPSILON: f32 = 1e-6;
/// Stands in for "an infinitely large number": large, yet finite.
const LARGE_CONTRIBUTION: f32 = 1.0e9;

/// Intrinsic widths of a table and its columns, memoized per table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnWidths {
    /// Min-content width of each column.
    pub min: Vec<f32>,
    /// Max-content width of each column.
    pub max: Vec<f32>,
    /// Intrinsic percentage of each column, 0 to 100.
    pub percentages: Vec<f32>,
    /// Columns with a non-percentage declared width.
    pub constrained: Vec<bool>,
    /// Columns in which at least one cell originates.
    pub occupied: Vec<bool>,
    /// Columns whose cells all have a zero max-content width.
    pub blank: Vec<bool>,
    /// Total horizontal border spacing.
    pub spacing: f32,
    /// Table min-content width, spacing included.
    pub table_min: f32,
    /// Table max-content width, spacing included.
    pub table_max: f32,
}

impl ColumnWidths {
    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.min.len()
    }

    /// Whether the table has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }
}

/// Horizontal border spacing of `style`, 0 when borders collapse.
pub(crate) fn spacing(style: &ComputedStyle) -> f32 {
    match style.border_collapse {
        BorderCollapse::Separate => style.border_spacing.0.max(0.0),
        BorderCollapse::Collapse => 0.0,
    }
}

/// Memoized intrinsic column widths of `table`.
pub(crate) fn intrinsic(
    ctx: &mut LayoutContext<'_>,
    table: BoxId,
    structure: &TableStructure,
) -> Rc<ColumnWidths> {
    if let Some(widths) = ctx.table_widths.get(&table) {
        return Rc::clone(widths);
    }
    let widths = Rc::new(compute(ctx, table, structure));
    let _ = ctx.table_widths.insert(table, Rc::clone(&widths));
    widths
}

/// [Percentage contribution](https://dbaron.org/css/intrinsic/#pct-contrib)
/// of a cell or column: `max(min-width, min(width, max-width))` over the
/// percentage values only.
fn percentage_contribution(style: &ComputedStyle) -> f32 {
    let min = match style.min_width {
        LengthPercentage::Percent(pct) => pct,
        LengthPercentage::Px(_) => 0.0,
    };
    let max = match style.max_width.0 {
        Some(LengthPercentage::Percent(pct)) => pct,
        _ => f32::INFINITY,
    };
    let width = style.width.percent().unwrap_or(0.0);
    min.max(width.min(max))
}

#[allow(clippy::too_many_lines, clippy::cast_precision_loss)]
fn compute(ctx: &mut LayoutContext<'_>, table: BoxId, structure: &TableStructure) -> ColumnWidths {
    let tree = ctx.tree;
    let style = tree.style(table);
    let n = structure.grid_width;
    let mut widths = ColumnWidths {
        min: vec![0.0; n],
        max: vec![0.0; n],
        percentages: vec![0.0; n],
        constrained: vec![false; n],
        occupied: vec![false; n],
        blank: vec![true; n],
        ..ColumnWidths::default()
    };
    if n == 0 {
        return widths;
    }

    // STEP 1: Span-1 contributions from columns, column groups and cells.
    for (i, column) in structure.columns.iter().take(n).enumerate() {
        for id in [column.group, column.id].into_iter().flatten() {
            let (min, max) = preferred::preferred_widths(ctx, id);
            let column_style = tree.style(id);
            widths.min[i] = widths.min[i].max(min);
            widths.max[i] = widths.max[i].max(max);
            widths.percentages[i] = widths.percentages[i].max(percentage_contribution(column_style));
            if column_style.width.px().is_some() {
                widths.constrained[i] = true;
            }
        }
    }
    let mut spanning = Vec::new();
    for cell in structure.cells() {
        let (min, max) = preferred::preferred_widths(ctx, cell.id);
        widths.occupied[cell.col] = true;
        for blank in &mut widths.blank[cell.col..cell.col + cell.colspan] {
            *blank &= max == 0.0;
        }
        if cell.colspan > 1 {
            spanning.push(*cell);
            continue;
        }
        let cell_style = tree.style(cell.id);
        let i = cell.col;
        widths.min[i] = widths.min[i].max(min);
        widths.max[i] = widths.max[i].max(max);
        widths.percentages[i] = widths.percentages[i].max(percentage_contribution(cell_style));
        if cell_style.width.px().is_some() {
            widths.constrained[i] = true;
        }
    }

    // STEP 2: Percentages of spanning cells go to the spanned columns
    // without a percentage, in proportion to their max-content widths.
    for cell in &spanning {
        let range = cell.col..cell.col + cell.colspan;
        let baseline: f32 = widths.percentages[range.clone()].iter().sum();
        let extra = percentage_contribution(tree.style(cell.id)) - baseline;
        if extra <= 0.0 {
            continue;
        }
        let free: Vec<usize> = range.filter(|&i| widths.percentages[i] == 0.0).collect();
        let total: f32 = free.iter().map(|&i| widths.max[i]).sum();
        for &i in &free {
            widths.percentages[i] = if total == 0.0 {
                extra / free.len() as f32
            } else {
                extra * widths.max[i] / total
            };
        }
    }

    // Percentages never add up to more than 100%.
    let mut cumulated = 0.0;
    for percentage in &mut widths.percentages {
        let clipped = percentage.min(100.0 - cumulated).max(0.0);
        cumulated += *percentage;
        *percentage = clipped;
    }

    // STEP 3: Min- and max-content widths of spanning cells.
    let spacing_x = spacing(style);
    for cell in &spanning {
        let (min, max) = preferred::preferred_widths(ctx, cell.id);
        let range = cell.col..cell.col + cell.colspan;
        let inner_spacing = spacing_x * (cell.colspan - 1) as f32;
        let columns_min: f32 = widths.min[range.clone()].iter().sum();
        if min > columns_min + inner_spacing {
            let mut target = widths.min.clone();
            let _ = distribute_excess_width(&widths, &mut target, min - columns_min - inner_spacing, range.clone());
            widths.min = target;
        }
        let columns_max: f32 = widths.max[range.clone()].iter().sum();
        if max > columns_max + inner_spacing {
            let mut target = widths.max.clone();
            let _ = distribute_excess_width(&widths, &mut target, max - columns_max - inner_spacing, range);
            widths.max = target;
        }
    }
    for i in 0..n {
        widths.max[i] = widths.max[i].max(widths.min[i]);
    }

    // STEP 4: Table widths.
    // [Intrinsic widths of the table](https://dbaron.org/css/intrinsic/#autotableintrinsic)
    let occupied = widths.occupied.iter().filter(|o| **o).count();
    widths.spacing = if spacing_x > 0.0 {
        spacing_x * (occupied + 1) as f32
    } else {
        0.0
    };
    let percentage_sum: f32 = widths.percentages.iter().sum();
    let mut small: f32 = 0.0;
    let mut numerator = 0.0;
    for i in 0..n {
        if widths.percentages[i] > 0.0 {
            small = small.max(widths.max[i] / (widths.percentages[i] / 100.0));
        } else {
            numerator += widths.max[i];
        }
    }
    let denominator = (100.0 - percentage_sum) / 100.0;
    // "an infinitely large number if the numerator is nonzero and the
    // denominator of that ratio is 0"
    let large = if denominator <= 0.0 {
        if numerator == 0.0 { 0.0 } else { LARGE_CONTRIBUTION }
    } else {
        numerator / denominator
    };
    let sum_min: f32 = widths.min.iter().sum();
    let sum_max: f32 = widths.max.iter().sum();
    widths.table_min = widths.spacing + sum_min;
    widths.table_max = widths.spacing + sum_max.max(large).max(small);

    // A declared length on the table is a lower bound for both.
    if let Some(declared) = style.width.px() {
        let padding = style.padding(0.0).horizontal();
        let border = style.border().horizontal();
        let declared = content_size(style, declared, padding, border);
        widths.table_min = widths.table_min.max(declared);
        widths.table_max = widths.table_max.max(declared);
    }
    widths.table_max = widths.table_max.max(widths.table_min);
    log::trace!(
        target: "quire::table",
        "{}: {n} columns, min {} max {}",
        tree.describe(table),
        widths.table_min,
        widths.table_max
    );
    widths
}

/// Grow `target` by `excess` over the columns in `range`.
///
/// [Distributing to columns](https://dbaron.org/css/intrinsic/#distributetocols):
/// auto columns with some max-content width first, then all auto columns,
/// then fixed columns, then percentage columns, then blank columns.
/// Returns what could not be distributed.
#[allow(clippy::cast_precision_loss)]
fn distribute_excess_width(
    widths: &ColumnWidths,
    target: &mut [f32],
    mut excess: f32,
    range: std::ops::Range<usize>,
) -> f32 {
    let is_auto = |i: usize| !widths.constrained[i] && widths.percentages[i] == 0.0;

    // Grow towards max-content, scaled down when there is not enough.
    let grow_to_max = |columns: &[usize], target: &mut [f32], excess: &mut f32| {
        let differences: Vec<f32> = columns
            .iter()
            .map(|&i| (widths.max[i] - target[i]).max(0.0))
            .collect();
        let total: f32 = differences.iter().sum();
        let scale = if total > *excess && total > 0.0 { *excess / total } else { 1.0 };
        for (&i, difference) in columns.iter().zip(&differences) {
            target[i] += difference * scale;
        }
        *excess -= total;
    };

    // STEP 1: Auto columns with a non-zero max-content width.
    let columns: Vec<usize> = range
        .clone()
        .filter(|&i| is_auto(i) && widths.max[i] > 0.0)
        .collect();
    if !columns.is_empty() {
        grow_to_max(&columns, target, &mut excess);
    }
    if excess <= 0.0 {
        return 0.0;
    }

    // STEP 2: Any auto column, equally.
    let columns: Vec<usize> = range.clone().filter(|&i| is_auto(i)).collect();
    if !columns.is_empty() {
        let share = excess / columns.len() as f32;
        for i in columns {
            target[i] += share;
        }
        return 0.0;
    }

    // STEP 3: Fixed columns with a non-zero max-content width.
    let columns: Vec<usize> = range
        .clone()
        .filter(|&i| widths.constrained[i] && widths.percentages[i] == 0.0 && widths.max[i] > 0.0)
        .collect();
    if !columns.is_empty() {
        grow_to_max(&columns, target, &mut excess);
    }
    if excess <= 0.0 {
        return 0.0;
    }

    // STEP 4: Percentage columns, towards their percentage of the
    // implied table width.
    let columns: Vec<usize> = range.clone().filter(|&i| widths.percentages[i] > 0.0).collect();
    if !columns.is_empty() {
        let fixed: f32 = (0..target.len())
            .filter(|i| !columns.contains(i))
            .map(|i| target[i])
            .sum();
        let percentage: f32 = columns.iter().map(|&i| widths.percentages[i]).sum();
        let ratio = if fixed == 0.0 || percentage >= 100.0 {
            excess
        } else {
            fixed / (100.0 - percentage)
        };
        let differences: Vec<f32> = columns
            .iter()
            .map(|&i| widths.percentages[i] * ratio - target[i])
            .collect();
        let total: f32 = differences.iter().sum();
        let scale = if total > excess && total > 0.0 { excess / total } else { 1.0 };
        for (&i, difference) in columns.iter().zip(&differences) {
            target[i] += difference * scale;
        }
        excess -= total;
    }
    if excess <= 0.0 {
        return 0.0;
    }

    // STEP 5: Occupied columns whose cells are all blank.
    let columns: Vec<usize> = range
        .filter(|&i| widths.occupied[i] && widths.blank[i] && widths.percentages[i] == 0.0)
        .collect();
    if !columns.is_empty() {
        let share = excess / columns.len() as f32;
        for i in columns {
            target[i] += share;
        }
        return 0.0;
    }
    excess
}

/// Column widths and the used table content width.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UsedColumns {
    /// Width of each column.
    pub widths: Vec<f32>,
    /// Table content width: columns plus spacing.
    pub table_width: f32,
}

/// [§ 17.5.2.2 Automatic table layout](https://www.w3.org/TR/CSS2/tables.html#auto-table-layout)
///
/// `available` is the content width the table may take; `declared` its
/// declared content width, if any.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn auto_layout(widths: &ColumnWidths, available: f32, declared: Option<f32>) -> UsedColumns {
    let mut table_width = match declared {
        None if available <= widths.table_min => widths.table_min,
        None if available < widths.table_max => available,
        None => widths.table_max,
        Some(declared) => declared.max(widths.table_min),
    };
    if widths.is_empty() {
        return UsedColumns {
            widths: Vec::new(),
            table_width,
        };
    }

    // [§ 3.3 Width distribution](https://www.w3.org/TR/css-tables-3/#width-distribution-algorithm)
    let assignable = table_width - widths.spacing;
    let n = widths.len();
    let min_guess = widths.min.clone();
    let mut percentage_guess = widths.min.clone();
    let mut specified_guess = widths.min.clone();
    let mut max_guess = widths.max.clone();
    for i in 0..n {
        if widths.percentages[i] > 0.0 {
            let width = (widths.percentages[i] / 100.0 * assignable).max(widths.min[i]);
            percentage_guess[i] = width;
            specified_guess[i] = width;
            max_guess[i] = width;
        } else if widths.constrained[i] {
            specified_guess[i] = widths.max[i];
        }
    }
    let guesses = [min_guess, percentage_guess, specified_guess, max_guess];
    let sum = |guess: &[f32]| guess.iter().sum::<f32>();

    if assignable <= sum(&guesses[3]) {
        let lower = guesses
            .iter()
            .rposition(|g| sum(g) <= assignable * (1.0 + GUESS_EPSILON))
            .unwrap_or(0);
        let upper = guesses
            .iter()
            .position(|g| sum(g) >= assignable * (1.0 - GUESS_EPSILON))
            .unwrap_or(guesses.len() - 1)
            .max(lower);
        if lower == upper {
            return UsedColumns {
                widths: guesses[upper].clone(),
                table_width,
            };
        }
        let (low, high) = (&guesses[lower], &guesses[upper]);
        let added: f32 = (0..n).map(|i| high[i] - low[i]).sum();
        let ratio = if added == 0.0 { 0.0 } else { (assignable - sum(low)) / added };
        let columns = (0..n).map(|i| low[i] + (high[i] - low[i]) * ratio).collect();
        return UsedColumns {
            widths: columns,
            table_width,
        };
    }

    let [_, _, _, mut columns] = guesses;
    let excess = assignable - sum(&columns);
    let left = distribute_excess_width(widths, &mut columns, excess, 0..n);
    if left > 0.0 {
        if widths.table_min < table_width - left {
            table_width -= left;
        } else {
            let occupied: Vec<usize> = (0..n).filter(|&i| widths.occupied[i]).collect();
            if !occupied.is_empty() {
                let share = left / occupied.len() as f32;
                for i in occupied {
                    columns[i] += share;
                }
            }
        }
    }
    UsedColumns {
        widths: columns,
        table_width,
    }
}

/// [§ 17.5.2.1 Fixed table layout](https://www.w3.org/TR/CSS2/tables.html#fixed-table-layout)
///
/// "In the fixed table layout algorithm, the width of each column is
/// determined as follows: A column element with a value other than 'auto'
/// for the 'width' property sets the width for that column. Otherwise, a
/// cell in the first row with a value other than 'auto' for the 'width'
/// property determines the width for that column. ... Any remaining
/// columns equally divide the remaining horizontal table space."
#[allow(clippy::cast_precision_loss)]
pub(crate) fn fixed_layout(
    ctx: &LayoutContext<'_>,
    table: BoxId,
    structure: &TableStructure,
    table_width: f32,
) -> UsedColumns {
    let tree = ctx.tree;
    let spacing_x = spacing(tree.style(table));
    let first_row = structure.first_row();
    let n = structure.fixed_column_count();
    let mut declared: Vec<Option<f32>> = vec![None; n];

    // STEP 1: Column elements.
    for (i, column) in structure.columns.iter().enumerate() {
        let Some(id) = column.id.or(column.group) else {
            continue;
        };
        declared[i] = tree.style(id).width.resolve(table_width);
    }

    // STEP 2: Cells of the first row, minus the columns already known.
    if let Some(row) = first_row {
        let mut col = 0;
        for cell in &row.cells {
            let style = tree.style(cell.id);
            if let Some(width) = style.width.resolve(table_width) {
                let padding = style.padding(table_width).horizontal();
                let border = style.border().horizontal();
                let mut width = content_size(style, width, padding, border) + padding + border
                    - spacing_x * (cell.colspan - 1) as f32;
                let mut unknown = Vec::new();
                for (j, slot) in declared.iter().enumerate().skip(col).take(cell.colspan) {
                    match slot {
                        Some(known) => width -= known,
                        None => unknown.push(j),
                    }
                }
                if !unknown.is_empty() {
                    let share = width / unknown.len() as f32;
                    for j in unknown {
                        declared[j] = Some(share);
                    }
                }
            }
            col += cell.colspan;
        }
    }

    // STEP 3: The rest of the width goes equally to undeclared columns.
    let all_spacing = spacing_x * (n + 1) as f32;
    let known: f32 = declared.iter().flatten().sum();
    let undeclared = declared.iter().filter(|d| d.is_none()).count();
    let share = if undeclared > 0 && table_width >= known + all_spacing {
        (table_width - known - all_spacing) / undeclared as f32
    } else {
        0.0
    };
    let mut columns: Vec<f32> = declared.into_iter().map(|d| d.unwrap_or(share)).collect();

    // STEP 4: Widen the table, or spread what is left over every column.
    let mut used_width = table_width;
    let extra = table_width - columns.iter().sum::<f32>() - all_spacing;
    if extra <= 0.0 {
        used_width -= extra;
    } else if n > 0 {
        let per_column = extra / n as f32;
        for column in &mut columns {
            *column += per_column;
        }
    }
    if structure.grid_width > n {
        let _ = warn_once(
            "Table",
            &format!(
                "{} has cells beyond its {n} fixed columns, ignored",
                tree.describe(table)
            ),
        );
    }
    UsedColumns {
        widths: columns,
        table_width: used_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widths(min: &[f32], max: &[f32]) -> ColumnWidths {
        let n = min.len();
        ColumnWidths {
            min: min.to_vec(),
            max: max.to_vec(),
            percentages: vec![0.0; n],
            constrained: vec![false; n],
            occupied: vec![true; n],
            blank: vec![false; n],
            spacing: 0.0,
            table_min: min.iter().sum(),
            table_max: max.iter().sum(),
        }
    }

    #[test]
    fn auto_width_takes_max_content_when_it_fits() {
        let used = auto_layout(&widths(&[10.0, 20.0], &[50.0, 100.0]), 500.0, None);
        assert_eq!(used.table_width, 150.0);
        assert_eq!(used.widths, vec![50.0, 100.0]);
    }

    #[test]
    fn narrow_tables_interpolate_between_min_and_max() {
        let used = auto_layout(&widths(&[10.0, 10.0], &[50.0, 150.0]), 100.0, None);
        assert_eq!(used.table_width, 100.0);
        // 80px shared in proportion to the max - min gaps (40 and 140).
        assert!((used.widths[0] - (10.0 + 80.0 * 40.0 / 180.0)).abs() < 1e-3);
        assert!((used.widths.iter().sum::<f32>() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn wide_declared_tables_grow_auto_columns() {
        let used = auto_layout(&widths(&[10.0, 10.0], &[50.0, 50.0]), 500.0, Some(300.0));
        assert_eq!(used.table_width, 300.0);
        assert_eq!(used.widths, vec![150.0, 150.0]);
    }

    #[test]
    fn percentage_columns_resolve_against_the_table() {
        let mut w = widths(&[10.0, 10.0], &[20.0, 20.0]);
        w.percentages[0] = 50.0;
        let used = auto_layout(&w, 400.0, Some(400.0));
        assert!((used.widths[0] - 200.0).abs() < 1e-3, "{:?}", used.widths);
        assert!((used.widths[1] - 200.0).abs() < 1e-3);
    }

    #[test]
    fn excess_skips_constrained_columns_while_auto_ones_exist() {
        let mut w = widths(&[10.0, 10.0], &[40.0, 40.0]);
        w.constrained[0] = true;
        let mut target = w.max.clone();
        let left = distribute_excess_width(&w, &mut target, 20.0, 0..2);
        assert_eq!(left, 0.0);
        assert_eq!(target, vec![40.0, 60.0]);
    }
}
