//! The table grid.
//!
//! [§ 17.2 The CSS table model](https://www.w3.org/TR/CSS2/tables.html#table-display)
//!
//! "A table is divided into rows and columns. Row groups (thead, tbody,
//! tfoot) group rows. The intersection of a row and a column is a cell."
//!
//! Rows sit directly in the table or in row groups; consecutive bare rows
//! form an anonymous body group. The first header group and the first
//! footer group repeat on every page; any other header or footer group is
//! laid out as a body group.

use quire_common::warning::warn_once;

use crate::tree::{BoxId, BoxKind, BoxTree, RowGroupKind};

/// Largest `colspan` honoured, as in HTML.
const MAX_COLSPAN: usize = 1000;
/// Largest `rowspan` honoured, as in HTML.
const MAX_ROWSPAN: usize = 65534;

/// A cell and the grid slots it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSlot {
    /// The cell box.
    pub id: BoxId,
    /// First column.
    pub col: usize,
    /// Columns covered.
    pub colspan: usize,
    /// Rows covered, clipped to the end of the group.
    pub rowspan: usize,
}

/// A row and the cells that start in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSlot {
    /// The row box.
    pub id: BoxId,
    /// Cells starting in this row, by column.
    pub cells: Vec<CellSlot>,
}

/// A row group. `id` is `None` for bare rows grouped anonymously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup {
    /// The row group box.
    pub id: Option<BoxId>,
    /// Header, body or footer.
    pub kind: RowGroupKind,
    /// Rows in order.
    pub rows: Vec<RowSlot>,
}

/// A `table-column`, with the column group it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSlot {
    /// The column box, `None` for a group without column children.
    pub id: Option<BoxId>,
    /// The enclosing column group.
    pub group: Option<BoxId>,
}

/// Structure of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStructure {
    /// `table-caption` children.
    pub captions: Vec<BoxId>,
    /// Declared columns, one per grid column they cover.
    pub columns: Vec<ColumnSlot>,
    /// The repeated header group.
    pub header: Option<RowGroup>,
    /// Body groups in order.
    pub bodies: Vec<RowGroup>,
    /// The repeated footer group.
    pub footer: Option<RowGroup>,
    /// Number of grid columns used by cells.
    pub grid_width: usize,
}

impl TableStructure {
    /// Build the grid of `table`.
    #[must_use]
    pub fn build(tree: &BoxTree, table: BoxId) -> Self {
        let mut structure = Self::default();
        let mut bare_rows: Vec<BoxId> = Vec::new();
        let mut groups: Vec<(Option<BoxId>, RowGroupKind, Vec<BoxId>)> = Vec::new();

        let flush = |bare: &mut Vec<BoxId>, groups: &mut Vec<(Option<BoxId>, RowGroupKind, Vec<BoxId>)>| {
            if !bare.is_empty() {
                groups.push((None, RowGroupKind::Body, std::mem::take(bare)));
            }
        };

        for &child in tree.children(table) {
            if tree.style(child).position.is_absolutely_positioned() {
                continue;
            }
            match tree.kind(child) {
                BoxKind::TableCaption => structure.captions.push(child),
                BoxKind::TableColumnGroup => {
                    flush(&mut bare_rows, &mut groups);
                    structure.add_column_group(tree, child);
                }
                BoxKind::TableColumn => {
                    let span = tree.span_attr(child, "span", 1, 1, MAX_COLSPAN);
                    for _ in 0..span {
                        structure.columns.push(ColumnSlot {
                            id: Some(child),
                            group: None,
                        });
                    }
                }
                BoxKind::TableRowGroup(kind) => {
                    flush(&mut bare_rows, &mut groups);
                    let rows = tree
                        .children(child)
                        .iter()
                        .copied()
                        .filter(|&row| is_row(tree, row))
                        .collect();
                    groups.push((Some(child), *kind, rows));
                }
                BoxKind::TableRow => bare_rows.push(child),
                _ => {
                    let _ = warn_once(
                        "Table",
                        &format!(
                            "{} is not a table part, ignored inside {}",
                            tree.describe(child),
                            tree.describe(table)
                        ),
                    );
                }
            }
        }
        flush(&mut bare_rows, &mut groups);

        for (id, kind, rows) in groups {
            let group = structure.place_group(tree, id, kind, &rows);
            match kind {
                RowGroupKind::Header if structure.header.is_none() => structure.header = Some(group),
                RowGroupKind::Footer if structure.footer.is_none() => structure.footer = Some(group),
                _ => structure.bodies.push(RowGroup {
                    kind: RowGroupKind::Body,
                    ..group
                }),
            }
        }
        structure
    }

    fn add_column_group(&mut self, tree: &BoxTree, group: BoxId) {
        let columns: Vec<BoxId> = tree
            .children(group)
            .iter()
            .copied()
            .filter(|&c| *tree.kind(c) == BoxKind::TableColumn)
            .collect();
        if columns.is_empty() {
            let span = tree.span_attr(group, "span", 1, 1, MAX_COLSPAN);
            for _ in 0..span {
                self.columns.push(ColumnSlot {
                    id: None,
                    group: Some(group),
                });
            }
            return;
        }
        for column in columns {
            let span = tree.span_attr(column, "span", 1, 1, MAX_COLSPAN);
            for _ in 0..span {
                self.columns.push(ColumnSlot {
                    id: Some(column),
                    group: Some(group),
                });
            }
        }
    }

    /// [§ 17.5](https://www.w3.org/TR/CSS2/tables.html#table-layout):
    /// assign grid slots to cells. Slots covered by a rowspan from an
    /// earlier row are skipped; rowspans stop at the end of the group.
    fn place_group(
        &mut self,
        tree: &BoxTree,
        id: Option<BoxId>,
        kind: RowGroupKind,
        rows: &[BoxId],
    ) -> RowGroup {
        let mut occupied: Vec<Vec<bool>> = vec![Vec::new(); rows.len()];
        let mut placed = Vec::with_capacity(rows.len());
        for (r, &row) in rows.iter().enumerate() {
            let mut cells = Vec::new();
            let mut col = 0;
            for &cell in tree.children(row) {
                if *tree.kind(cell) != BoxKind::TableCell {
                    let _ = warn_once(
                        "Table",
                        &format!("{} is not a table cell, ignored", tree.describe(cell)),
                    );
                    continue;
                }
                while occupied[r].get(col).copied().unwrap_or(false) {
                    col += 1;
                }
                let colspan = tree.span_attr(cell, "colspan", 1, 1, MAX_COLSPAN);
                let remaining = rows.len() - r;
                // "rowspan=0" spans to the end of the group.
                let rowspan = match tree.span_attr(cell, "rowspan", 1, 0, MAX_ROWSPAN) {
                    0 => remaining,
                    n => n.min(remaining),
                };
                for row_slots in occupied.iter_mut().skip(r).take(rowspan) {
                    if row_slots.len() < col + colspan {
                        row_slots.resize(col + colspan, false);
                    }
                    for slot in &mut row_slots[col..col + colspan] {
                        *slot = true;
                    }
                }
                cells.push(CellSlot {
                    id: cell,
                    col,
                    colspan,
                    rowspan,
                });
                self.grid_width = self.grid_width.max(col + colspan);
                col += colspan;
            }
            placed.push(RowSlot { id: row, cells });
        }
        RowGroup {
            id,
            kind,
            rows: placed,
        }
    }

    /// Every group in display order: header, bodies, footer.
    pub fn groups(&self) -> impl Iterator<Item = &RowGroup> {
        self.header
            .iter()
            .chain(self.bodies.iter())
            .chain(self.footer.iter())
    }

    /// Cells of the first row in display order.
    #[must_use]
    pub fn first_row(&self) -> Option<&RowSlot> {
        self.groups().find_map(|group| group.rows.first())
    }

    /// Every cell with the column index it starts in, in display order.
    pub fn cells(&self) -> impl Iterator<Item = &CellSlot> {
        self.groups()
            .flat_map(|group| group.rows.iter())
            .flat_map(|row| row.cells.iter())
    }

    /// Columns of a fixed-layout table: the declared columns or the
    /// first row, whichever is wider.
    #[must_use]
    pub fn fixed_column_count(&self) -> usize {
        let first_row: usize = self
            .first_row()
            .map_or(0, |row| row.cells.iter().map(|c| c.colspan).sum());
        self.columns.len().max(first_row)
    }

    /// Number of rows before body group `group`, header rows included.
    #[must_use]
    pub fn rows_before_body(&self, group: usize) -> usize {
        self.header.as_ref().map_or(0, |h| h.rows.len())
            + self.bodies.iter().take(group).map(|g| g.rows.len()).sum::<usize>()
    }

    /// Number of rows across all groups.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.groups().map(|g| g.rows.len()).sum()
    }
}

fn is_row(tree: &BoxTree, id: BoxId) -> bool {
    if *tree.kind(id) == BoxKind::TableRow {
        return true;
    }
    let _ = warn_once(
        "Table",
        &format!("{} is not a table row, ignored", tree.describe(id)),
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::BoxNode;

    fn build(json: serde_json::Value) -> (BoxTree, TableStructure) {
        let node: BoxNode = serde_json::from_value(json).unwrap();
        let tree = BoxTree::from_node(&node);
        let table = tree.root().unwrap();
        let structure = TableStructure::build(&tree, table);
        (tree, structure)
    }

    fn row(cells: &[serde_json::Value]) -> serde_json::Value {
        serde_json::json!({ "style": { "display": "table-row" }, "children": cells })
    }

    fn cell(attrs: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "style": { "display": "table-cell" }, "attrs": attrs })
    }

    #[test]
    fn rowspans_push_later_cells_right() {
        let (_, s) = build(serde_json::json!({
            "style": { "display": "table" },
            "children": [
                row(&[cell(serde_json::json!({ "rowspan": "2" })), cell(serde_json::json!({}))]),
                row(&[cell(serde_json::json!({})), cell(serde_json::json!({}))]),
            ]
        }));
        let rows = &s.bodies[0].rows;
        assert_eq!(rows[0].cells[0].rowspan, 2);
        assert_eq!(rows[1].cells[0].col, 1, "slot 0 is taken by the rowspan");
        assert_eq!(s.grid_width, 3);
    }

    #[test]
    fn rowspan_is_clipped_to_its_group() {
        let (_, s) = build(serde_json::json!({
            "style": { "display": "table" },
            "children": [
                row(&[cell(serde_json::json!({ "rowspan": "9" }))]),
                row(&[cell(serde_json::json!({}))]),
            ]
        }));
        assert_eq!(s.bodies[0].rows[0].cells[0].rowspan, 2);
    }

    #[test]
    fn first_header_and_footer_repeat_others_are_bodies() {
        let group = |display: &str| {
            serde_json::json!({
                "style": { "display": display },
                "children": [row(&[cell(serde_json::json!({}))])]
            })
        };
        let (_, s) = build(serde_json::json!({
            "style": { "display": "table" },
            "children": [
                group("table-footer-group"),
                group("table-header-group"),
                group("table-row-group"),
                group("table-header-group"),
            ]
        }));
        assert!(s.header.is_some());
        assert!(s.footer.is_some());
        assert_eq!(s.bodies.len(), 2);
        assert_eq!(s.row_count(), 4);
    }

    #[test]
    fn column_spans_expand_declared_columns() {
        let (_, s) = build(serde_json::json!({
            "style": { "display": "table" },
            "children": [
                { "style": { "display": "table-column" }, "attrs": { "span": "2" } },
                { "style": { "display": "table-column-group" }, "attrs": { "span": "3" } },
            ]
        }));
        assert_eq!(s.columns.len(), 5);
        assert!(s.columns[4].id.is_none());
    }
}
