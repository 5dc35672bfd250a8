//! The collapsing border model.
//!
//! [§ 17.6.2 The collapsing border model](https://www.w3.org/TR/CSS2/tables.html#collapsing-borders)
//!
//! "In this model, the width of the table includes half the table border.
//! ... Borders are centered on the grid lines between the cells."
//!
//! Border conflicts resolve to the widest border among the cell, row, row
//! group, column, column group and table sharing an edge segment.

use super::structure::TableStructure;
use crate::geometry::EdgeSizes;
use crate::tree::{BoxId, BoxTree};

/// Border widths on every grid line segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollapsedBorders {
    /// `horizontal[r][c]`: the line above row `r` (`r == rows` is the
    /// bottom edge) over column `c`.
    horizontal: Vec<Vec<f32>>,
    /// `vertical[r][c]`: the line left of column `c` (`c == columns` is
    /// the right edge) beside row `r`.
    vertical: Vec<Vec<f32>>,
}

impl CollapsedBorders {
    /// Resolve every segment of `table`. Rows count across all groups in
    /// display order.
    #[must_use]
    pub fn resolve(tree: &BoxTree, table: BoxId, structure: &TableStructure, columns: usize) -> Self {
        let rows = structure.row_count();
        let mut borders = Self {
            horizontal: vec![vec![0.0; columns]; rows + 1],
            vertical: vec![vec![0.0; columns + 1]; rows],
        };
        if rows == 0 || columns == 0 {
            return borders;
        }

        // STEP 1: The table's outer edges.
        borders.frame(tree.style(table).border(), 0..rows, 0..columns);

        // STEP 2: Column groups and columns.
        for (c, column) in structure.columns.iter().take(columns).enumerate() {
            for id in [column.group, column.id].into_iter().flatten() {
                let border = tree.style(id).border();
                borders.raise_h(0, c..=c, border.top);
                borders.raise_h(rows, c..=c, border.bottom);
                for r in 0..rows {
                    borders.raise_v(r, c, border.left);
                    borders.raise_v(r, c + 1, border.right);
                }
            }
        }

        // STEP 3: Row groups, rows and cells.
        let mut first_row = 0;
        for group in structure.groups() {
            let end = first_row + group.rows.len();
            if let Some(id) = group.id {
                borders.frame(tree.style(id).border(), first_row..end, 0..columns);
            }
            for (offset, row) in group.rows.iter().enumerate() {
                let r = first_row + offset;
                borders.frame(tree.style(row.id).border(), r..r + 1, 0..columns);
                for cell in &row.cells {
                    if cell.col >= columns {
                        continue;
                    }
                    let last_col = (cell.col + cell.colspan).min(columns);
                    borders.frame(
                        tree.style(cell.id).border(),
                        r..r + cell.rowspan,
                        cell.col..last_col,
                    );
                }
            }
            first_row = end;
        }
        borders
    }

    fn raise_h(&mut self, row: usize, columns: std::ops::RangeInclusive<usize>, width: f32) {
        for c in columns {
            if let Some(slot) = self.horizontal.get_mut(row).and_then(|line| line.get_mut(c)) {
                *slot = slot.max(width);
            }
        }
    }

    fn raise_v(&mut self, row: usize, column: usize, width: f32) {
        if let Some(slot) = self.vertical.get_mut(row).and_then(|line| line.get_mut(column)) {
            *slot = slot.max(width);
        }
    }

    /// Apply the four borders of a box covering `rows` by `columns`.
    fn frame(&mut self, border: EdgeSizes, rows: std::ops::Range<usize>, columns: std::ops::Range<usize>) {
        if columns.is_empty() || rows.is_empty() {
            return;
        }
        let last_col = columns.end - 1;
        self.raise_h(rows.start, columns.start..=last_col, border.top);
        self.raise_h(rows.end, columns.start..=last_col, border.bottom);
        for r in rows {
            self.raise_v(r, columns.start, border.left);
            self.raise_v(r, columns.end, border.right);
        }
    }

    /// Half of the widest segment on each edge of a cell covering `rows`
    /// by `columns`: what the cell's own border box takes.
    #[must_use]
    pub fn cell(&self, rows: std::ops::Range<usize>, columns: std::ops::Range<usize>) -> EdgeSizes {
        let widest_h = |r: usize| {
            self.horizontal
                .get(r)
                .map_or(0.0, |line| line[columns.clone()].iter().copied().fold(0.0, f32::max))
        };
        let widest_v = |c: usize| {
            rows.clone()
                .filter_map(|r| self.vertical.get(r).and_then(|line| line.get(c)))
                .copied()
                .fold(0.0, f32::max)
        };
        EdgeSizes {
            top: widest_h(rows.start) / 2.0,
            right: widest_v(columns.end) / 2.0,
            bottom: widest_h(rows.end) / 2.0,
            left: widest_v(columns.start) / 2.0,
        }
    }

    /// Half of the outer border, on the table's grid box. The top edge is
    /// taken from `first_row`, the first row on the current page.
    #[must_use]
    pub fn table(&self, first_row: usize, last_row: usize) -> EdgeSizes {
        let columns = self.horizontal.first().map_or(0, Vec::len);
        if columns == 0 {
            return EdgeSizes::default();
        }
        let rows = first_row..last_row.max(first_row + 1).min(self.vertical.len());
        let edges = self.cell(rows, 0..columns);
        EdgeSizes {
            top: self.cell(first_row..first_row + 1, 0..columns).top,
            bottom: self
                .horizontal
                .get(last_row)
                .map_or(0.0, |line| line.iter().copied().fold(0.0, f32::max))
                / 2.0,
            ..edges
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::BoxNode;

    #[test]
    fn the_widest_border_wins_each_segment() {
        let cell = |width: &str| {
            serde_json::json!({
                "style": {
                    "display": "table-cell",
                    "border-top-width": width, "border-right-width": width,
                    "border-bottom-width": width, "border-left-width": width
                }
            })
        };
        let node: BoxNode = serde_json::from_value(serde_json::json!({
            "style": { "display": "table", "border-collapse": "collapse", "border-left-width": "6px" },
            "children": [{
                "style": { "display": "table-row" },
                "children": [cell("2px"), cell("4px")]
            }]
        }))
        .unwrap();
        let tree = BoxTree::from_node(&node);
        let table = tree.root().unwrap();
        let structure = TableStructure::build(&tree, table);
        let borders = CollapsedBorders::resolve(&tree, table, &structure, 2);

        let first = borders.cell(0..1, 0..1);
        assert_eq!(first.left, 3.0, "table border is wider");
        assert_eq!(first.right, 2.0, "shared with the 4px cell");
        assert_eq!(first.top, 1.0);
        let table_edges = borders.table(0, 1);
        assert_eq!(table_edges.left, 3.0);
        assert_eq!(table_edges.right, 2.0);
        assert_eq!(table_edges.top, 2.0);
    }
}
