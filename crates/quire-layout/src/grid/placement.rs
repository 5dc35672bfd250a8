//! Grid item placement.
//!
//! [§ 8 Placing Grid Items](https://www.w3.org/TR/css-grid-1/#placement)
//!
//! Placement works on a "major" axis that grows (rows for
//! `grid-auto-flow: row`) and a "minor" axis whose track count is fixed
//! before auto-placement starts. Coordinates are shifted so that implicit
//! tracks created before the explicit grid get non-negative indices.

use std::collections::HashMap;
use std::ops::Range;

use quire_common::warning::warn_once;

use super::template::{AutoFlow, ExplicitTracks, GridLine, MAX_GRID_LINE, TemplateAreas};
use crate::tree::{BoxId, BoxTree};

/// Track ranges covered by an item, in implicit grid coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridArea {
    /// Row tracks.
    pub rows: Range<usize>,
    /// Column tracks.
    pub columns: Range<usize>,
}

/// An item and its area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedItem {
    /// The grid item.
    pub id: BoxId,
    /// Where it sits.
    pub area: GridArea,
}

/// Every item placed, and the size of the implicit grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    /// Items in document order.
    pub items: Vec<PlacedItem>,
    /// Row tracks of the implicit grid.
    pub rows: usize,
    /// Column tracks of the implicit grid.
    pub columns: usize,
    /// Implicit rows created before the explicit grid.
    pub row_offset: usize,
    /// Implicit columns created before the explicit grid.
    pub column_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

/// Line names of one axis, explicit and implied by named areas.
struct AxisLines<'a> {
    names: &'a [Vec<String>],
    tracks: usize,
    /// `(area, start line, end line)`
    areas: Vec<(&'a str, usize, usize)>,
}

impl<'a> AxisLines<'a> {
    fn new(tracks: &'a ExplicitTracks, areas: &'a TemplateAreas, rows: bool) -> Self {
        let template_tracks = if rows { areas.rows } else { areas.columns };
        Self {
            names: &tracks.line_names,
            tracks: tracks.sizes.len().max(template_tracks),
            areas: areas
                .areas
                .iter()
                .map(|(name, area)| {
                    if rows {
                        (name.as_str(), area.row_start, area.row_end)
                    } else {
                        (name.as_str(), area.column_start, area.column_end)
                    }
                })
                .collect(),
        }
    }

    /// Indices of lines carrying `name`, ascending.
    fn lines_named(&self, name: &str) -> Vec<usize> {
        let mut lines: Vec<usize> = self
            .names
            .iter()
            .enumerate()
            .filter(|(_, names)| names.iter().any(|n| n == name))
            .map(|(i, _)| i)
            .collect();
        // [§ 7.3.2](https://www.w3.org/TR/css-grid-1/#implicit-named-lines):
        // "For each named grid area foo, four implicitly-named lines are
        // created: two named foo-start ... and two named foo-end."
        for &(area, start, end) in &self.areas {
            if name.strip_suffix("-start") == Some(area) {
                lines.push(start);
            }
            if name.strip_suffix("-end") == Some(area) {
                lines.push(end);
            }
        }
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    /// Definite line index (0 is the explicit grid's first line) or `None`
    /// for `auto` and spans.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn resolve(&self, line: &GridLine, side: Side) -> Option<i32> {
        match line {
            GridLine::Auto | GridLine::Span(_) => None,
            GridLine::Line(n) if *n > 0 => Some(n - 1),
            GridLine::Line(n) => Some(self.tracks as i32 + 1 + n),
            GridLine::Named(name, count) => {
                let suffix = match side {
                    Side::Start => "start",
                    Side::End => "end",
                };
                let mut lines = self.lines_named(&format!("{name}-{suffix}"));
                if lines.is_empty() {
                    lines = self.lines_named(name);
                }
                Some(nth_line(&lines, *count, self.tracks))
            }
        }
    }
}

/// [§ 8.3](https://www.w3.org/TR/css-grid-1/#line-placement): "If there
/// are fewer than N lines with that name, all implicit grid lines are
/// assumed to have that name for the purpose of finding this position."
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn nth_line(lines: &[usize], count: i32, tracks: usize) -> i32 {
    let n = count.unsigned_abs() as usize;
    if count > 0 {
        lines
            .get(n - 1)
            .map_or((tracks + n - lines.len()) as i32, |&line| line as i32)
    } else if n <= lines.len() {
        lines[lines.len() - n] as i32
    } else {
        -((n - lines.len()) as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisPlacement {
    Definite(i32, i32),
    Auto(usize),
}

fn span_of(line: &GridLine) -> i32 {
    match line {
        GridLine::Span(n) => i32::try_from(*n).map_or(MAX_GRID_LINE, |n| n.min(MAX_GRID_LINE)),
        _ => 1,
    }
}

/// A definite placement with both lines inside the clamped grid and at
/// least one track between them.
fn definite(start: i32, end: i32) -> AxisPlacement {
    let start = start.clamp(-MAX_GRID_LINE, MAX_GRID_LINE);
    let end = end.clamp(-MAX_GRID_LINE, MAX_GRID_LINE).max(start + 1);
    AxisPlacement::Definite(start, end)
}

/// [§ 8.3.1 Grid Placement Conflict Handling](https://www.w3.org/TR/css-grid-1/#grid-placement-errors)
fn resolve_axis(lines: &AxisLines<'_>, start: &GridLine, end: &GridLine) -> AxisPlacement {
    match (lines.resolve(start, Side::Start), lines.resolve(end, Side::End)) {
        (Some(s), Some(e)) => {
            let (s, e) = if e < s { (e, s) } else { (s, e) };
            definite(s, e)
        }
        (Some(s), None) => definite(s, s.saturating_add(span_of(end))),
        (None, Some(e)) => definite(e.saturating_sub(span_of(start)), e),
        // "If the grid item has an automatic position and a grid span for a
        // named line in a dimension, instead treat the grid span as one."
        (None, None) => AxisPlacement::Auto(if matches!(start, GridLine::Span(_)) {
            span_of(start).unsigned_abs() as usize
        } else {
            span_of(end).unsigned_abs() as usize
        }),
    }
}

/// Occupied cells, one row of flags per major line.
struct Occupancy {
    minor: usize,
    cells: Vec<Vec<bool>>,
}

impl Occupancy {
    fn fits(&self, major: &Range<usize>, minor: &Range<usize>) -> bool {
        minor.end <= self.minor
            && major.clone().all(|m| {
                self.cells
                    .get(m)
                    .is_none_or(|line| line[minor.clone()].iter().all(|taken| !taken))
            })
    }

    fn mark(&mut self, major: &Range<usize>, minor: &Range<usize>) {
        if minor.end > self.minor {
            self.minor = minor.end;
            for line in &mut self.cells {
                line.resize(self.minor, false);
            }
        }
        if self.cells.len() < major.end {
            self.cells.resize(major.end, vec![false; self.minor]);
        }
        for line in &mut self.cells[major.clone()] {
            for cell in &mut line[minor.clone()] {
                *cell = true;
            }
        }
    }
}

struct Pending {
    id: BoxId,
    major: AxisPlacement,
    minor: AxisPlacement,
}

/// [§ 8.5 Grid Item Placement Algorithm](https://www.w3.org/TR/css-grid-1/#auto-placement-algo)
///
/// `items` are the in-flow children in document order. `limit` caps how
/// far along the major axis the auto-placement cursor may search.
#[must_use]
#[allow(
    clippy::too_many_lines,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
pub fn place(
    tree: &BoxTree,
    items: &[BoxId],
    rows: &ExplicitTracks,
    columns: &ExplicitTracks,
    areas: &TemplateAreas,
    flow: AutoFlow,
    limit: usize,
) -> Placement {
    let row_lines = AxisLines::new(rows, areas, true);
    let column_lines = AxisLines::new(columns, areas, false);
    let (explicit_major, explicit_minor) = if flow.column {
        (column_lines.tracks, row_lines.tracks)
    } else {
        (row_lines.tracks, column_lines.tracks)
    };

    // STEP 1: Resolve definite lines.
    let pending: Vec<Pending> = items
        .iter()
        .map(|&id| {
            let [row_start, row_end, column_start, column_end] = tree.style(id).grid_placement();
            let row = resolve_axis(&row_lines, &row_start, &row_end);
            let column = resolve_axis(&column_lines, &column_start, &column_end);
            let (major, minor) = if flow.column { (column, row) } else { (row, column) };
            Pending { id, major, minor }
        })
        .collect();

    let lowest = |pick: fn(&Pending) -> AxisPlacement| {
        pending
            .iter()
            .filter_map(|p| match pick(p) {
                AxisPlacement::Definite(start, _) => Some(start),
                AxisPlacement::Auto(_) => None,
            })
            .fold(0, i32::min)
    };
    let major_offset = (-lowest(|p| p.major)) as usize;
    let minor_offset = (-lowest(|p| p.minor)) as usize;
    let shift = |start: i32, end: i32, offset: usize| {
        (start + offset as i32) as usize..(end + offset as i32) as usize
    };

    // STEP 2: The minor axis holds the explicit tracks, every definite
    // placement and the widest auto span.
    let mut minor_count = explicit_minor + minor_offset;
    for p in &pending {
        minor_count = minor_count.max(match p.minor {
            AxisPlacement::Definite(_, end) => (end + minor_offset as i32) as usize,
            AxisPlacement::Auto(span) => span,
        });
    }
    let mut occupancy = Occupancy {
        minor: minor_count,
        cells: Vec::new(),
    };
    let mut placed: Vec<Option<(Range<usize>, Range<usize>)>> = vec![None; pending.len()];

    // STEP 3: Items with both positions definite.
    for (i, p) in pending.iter().enumerate() {
        if let (AxisPlacement::Definite(ms, me), AxisPlacement::Definite(ns, ne)) = (p.major, p.minor) {
            let area = (shift(ms, me, major_offset), shift(ns, ne, minor_offset));
            occupancy.mark(&area.0, &area.1);
            placed[i] = Some(area);
        }
    }

    // STEP 4: Items locked to a major line.
    let mut line_cursors: HashMap<usize, usize> = HashMap::new();
    for (i, p) in pending.iter().enumerate() {
        let (AxisPlacement::Definite(ms, me), AxisPlacement::Auto(span)) = (p.major, p.minor) else {
            continue;
        };
        let major = shift(ms, me, major_offset);
        let from = if flow.dense {
            0
        } else {
            line_cursors.get(&major.start).copied().unwrap_or(0)
        };
        let start = (from..occupancy.minor)
            .find(|&c| occupancy.fits(&major, &(c..c + span)))
            .unwrap_or(occupancy.minor.max(from));
        let minor = start..start + span;
        occupancy.mark(&major, &minor);
        let _ = line_cursors.insert(major.start, minor.end);
        placed[i] = Some((major, minor));
    }

    // STEP 5: Everything else, with the auto-placement cursor.
    let (mut cursor_major, mut cursor_minor) = (0_usize, 0_usize);
    for (i, p) in pending.iter().enumerate() {
        if placed[i].is_some() {
            continue;
        }
        let AxisPlacement::Auto(major_span) = p.major else {
            continue;
        };
        if flow.dense {
            cursor_major = 0;
            cursor_minor = 0;
        }
        let minor = match p.minor {
            AxisPlacement::Definite(ns, ne) => {
                let minor = shift(ns, ne, minor_offset);
                if !flow.dense && minor.start < cursor_minor {
                    cursor_major += 1;
                }
                while !occupancy.fits(&(cursor_major..cursor_major + major_span), &minor) {
                    if cursor_major >= limit {
                        let _ = warn_once(
                            "Grid",
                            &format!("auto-placement stopped after {limit} implicit tracks"),
                        );
                        break;
                    }
                    cursor_major += 1;
                }
                cursor_minor = minor.start;
                minor
            }
            AxisPlacement::Auto(span) => loop {
                if cursor_minor + span > occupancy.minor {
                    cursor_major += 1;
                    cursor_minor = 0;
                    continue;
                }
                let candidate = cursor_minor..cursor_minor + span;
                if cursor_major >= limit {
                    let _ = warn_once(
                        "Grid",
                        &format!("auto-placement stopped after {limit} implicit tracks"),
                    );
                    break candidate;
                }
                if occupancy.fits(&(cursor_major..cursor_major + major_span), &candidate) {
                    break candidate;
                }
                cursor_minor += 1;
            },
        };
        let major = cursor_major..cursor_major + major_span;
        occupancy.mark(&major, &minor);
        if !flow.dense {
            cursor_minor = minor.end;
        }
        placed[i] = Some((major, minor));
    }

    // STEP 6: Back to rows and columns.
    let mut placement = Placement {
        items: Vec::with_capacity(pending.len()),
        rows: 0,
        columns: 0,
        row_offset: 0,
        column_offset: 0,
    };
    let mut major_count = explicit_major + major_offset;
    for (p, area) in pending.iter().zip(placed) {
        let Some((major, minor)) = area else { continue };
        major_count = major_count.max(major.end);
        minor_count = minor_count.max(minor.end);
        let area = if flow.column {
            GridArea {
                rows: minor,
                columns: major,
            }
        } else {
            GridArea {
                rows: major,
                columns: minor,
            }
        };
        placement.items.push(PlacedItem { id: p.id, area });
    }
    if flow.column {
        placement.rows = minor_count;
        placement.columns = major_count;
        placement.row_offset = minor_offset;
        placement.column_offset = major_offset;
    } else {
        placement.rows = major_count;
        placement.columns = minor_count;
        placement.row_offset = major_offset;
        placement.column_offset = minor_offset;
    }
    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::BoxNode;

    fn grid(style: serde_json::Value, items: Vec<serde_json::Value>) -> (BoxTree, Placement) {
        let node: BoxNode = serde_json::from_value(serde_json::json!({
            "style": style,
            "children": items
        }))
        .unwrap();
        let tree = BoxTree::from_node(&node);
        let root = tree.root().unwrap();
        let style = tree.style(root);
        let rows = style.grid_template_rows.expand(None, 0.0);
        let columns = style.grid_template_columns.expand(None, 0.0);
        let children = tree.children(root).to_vec();
        let placement = place(
            &tree,
            &children,
            &rows,
            &columns,
            &style.grid_template_areas,
            style.grid_auto_flow,
            10_000,
        );
        (tree, placement)
    }

    fn item(style: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "style": style })
    }

    fn areas(placement: &Placement) -> Vec<(Range<usize>, Range<usize>)> {
        placement
            .items
            .iter()
            .map(|i| (i.area.rows.clone(), i.area.columns.clone()))
            .collect()
    }

    #[test]
    fn auto_items_fill_rows_in_order() {
        let (_, placement) = grid(
            serde_json::json!({ "display": "grid", "grid-template-columns": "1fr 1fr" }),
            vec![item(serde_json::json!({})), item(serde_json::json!({})), item(serde_json::json!({}))],
        );
        assert_eq!(areas(&placement), vec![(0..1, 0..1), (0..1, 1..2), (1..2, 0..1)]);
        assert_eq!(placement.rows, 2);
    }

    #[test]
    fn named_areas_place_items() {
        let (_, placement) = grid(
            serde_json::json!({
                "display": "grid",
                "grid-template-areas": "\"head head\" \"side main\""
            }),
            vec![
                item(serde_json::json!({ "grid-area": "main" })),
                item(serde_json::json!({ "grid-area": "head" })),
            ],
        );
        assert_eq!(areas(&placement), vec![(1..2, 1..2), (0..1, 0..2)]);
        assert_eq!(placement.columns, 2);
    }

    #[test]
    fn dense_packing_backfills_holes() {
        let children = || {
            vec![
                item(serde_json::json!({})),
                item(serde_json::json!({ "grid-column": "span 2" })),
                item(serde_json::json!({})),
            ]
        };
        let (_, sparse) = grid(
            serde_json::json!({ "display": "grid", "grid-template-columns": "10px 10px" }),
            children(),
        );
        assert_eq!(areas(&sparse)[2], (2..3, 0..1), "sparse keeps moving forward");

        let (_, dense) = grid(
            serde_json::json!({
                "display": "grid",
                "grid-template-columns": "10px 10px",
                "grid-auto-flow": "row dense"
            }),
            children(),
        );
        assert_eq!(areas(&dense)[2], (0..1, 1..2), "dense fills the first hole");
    }

    #[test]
    fn negative_lines_create_leading_implicit_tracks() {
        let (_, placement) = grid(
            serde_json::json!({ "display": "grid", "grid-template-columns": "10px" }),
            vec![item(serde_json::json!({ "grid-column": "-3 / -2" }))],
        );
        assert_eq!(placement.column_offset, 1);
        assert_eq!(areas(&placement), vec![(0..1, 0..1)]);
        assert_eq!(placement.columns, 2);
    }

    #[test]
    fn huge_lines_are_clamped() {
        let (_, placement) = grid(
            serde_json::json!({ "display": "grid", "grid-template-columns": "10px" }),
            vec![
                item(serde_json::json!({ "grid-row": "2147483647 / span 2" })),
                item(serde_json::json!({ "grid-column": "span 4000000000" })),
            ],
        );
        let max = MAX_GRID_LINE as usize;
        let placed = areas(&placement);
        assert_eq!(placed[0].0, max - 1..max, "the span stops at the last line");
        assert!(placement.rows <= max);
        assert_eq!(placed[1].1.len(), max);
    }

    #[test]
    fn column_flow_fills_columns_first() {
        let (_, placement) = grid(
            serde_json::json!({
                "display": "grid",
                "grid-template-rows": "10px 10px",
                "grid-auto-flow": "column"
            }),
            vec![item(serde_json::json!({})), item(serde_json::json!({})), item(serde_json::json!({}))],
        );
        assert_eq!(areas(&placement), vec![(0..1, 0..1), (1..2, 0..1), (0..1, 1..2)]);
    }
}
