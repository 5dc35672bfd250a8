//! Integration tests for layout on a single tall page: block widths and
//! margins, floats, tables, grids, flex containers and columns.

use quire_layout::{Document, Fragment, FragmentKind, LayoutConfig, PageSetup, layout_document};
use serde_json::{Value, json};

/// One 500px wide page without margins, tall enough for every test.
fn lay_out(root: Value) -> Fragment {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = LayoutConfig {
        page: PageSetup {
            width: 500.0,
            height: 2000.0,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            footnote_max_height: None,
        },
        ..LayoutConfig::default()
    };
    let document: Document = serde_json::from_value(json!({ "root": root })).unwrap();
    let mut paged = layout_document(&document, &config).unwrap();
    assert_eq!(paged.pages.len(), 1);
    paged.pages.remove(0).root.expect("root fragment")
}

fn find_all<'a>(fragment: &'a Fragment, wanted: impl Fn(&FragmentKind) -> bool) -> Vec<&'a Fragment> {
    let mut found = Vec::new();
    fragment.walk(&mut |f| {
        if wanted(&f.kind) {
            found.push(f);
        }
    });
    found
}

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}

// ---------------------------------------------------------------------------
// Block layout
//
// [§ 10.3.3 Block-level, non-replaced elements in normal flow](https://www.w3.org/TR/CSS2/visudet.html#blockwidth)
// ---------------------------------------------------------------------------

#[test]
fn auto_margins_center_a_block() {
    let root = lay_out(json!({ "children": [
        { "style": { "width": "100px", "height": "10px", "margin-left": "auto", "margin-right": "auto" } }
    ] }));
    let child = &root.children[0].dimensions;
    assert!(approx_eq(child.content.x, 200.0));
    assert!(approx_eq(child.margin.left, 200.0));
    assert!(approx_eq(child.margin.right, 200.0));
}

#[test]
fn percentage_width_and_padding() {
    let root = lay_out(json!({ "children": [
        { "style": { "width": "50%", "padding-left": "10px", "height": "10px" } }
    ] }));
    let child = &root.children[0].dimensions;
    assert!(approx_eq(child.content.width, 250.0));
    assert!(approx_eq(child.content.x, 10.0));
}

#[test]
fn auto_width_fills_between_the_parent_margins() {
    let root = lay_out(json!({ "children": [
        { "style": { "width": "100px" }, "children": [
            { "style": { "margin-left": "10px", "margin-right": "10px" }, "children": [
                { "style": { "margin-left": "auto", "margin-right": "auto", "height": "10px" } }
            ] }
        ] }
    ] }));
    let child = &root.children[0].children[0].children[0].dimensions;
    assert!(approx_eq(child.content.width, 80.0));
    assert!(approx_eq(child.content.x, 10.0));
    assert!(approx_eq(child.margin.left, 0.0), "auto margins are 0 next to an auto width");
}

// [§ 8.3.1 Collapsing margins](https://www.w3.org/TR/CSS2/box.html#collapsing-margins)

#[test]
fn adjoining_sibling_margins_collapse() {
    let root = lay_out(json!({ "children": [
        { "style": { "height": "20px", "margin-bottom": "10px" } },
        { "style": { "height": "20px", "margin-top": "15px" } }
    ] }));
    assert!(approx_eq(root.children[1].dimensions.content.y, 35.0), "max(10, 15) between them");
}

#[test]
fn negative_margin_collapses_with_positive() {
    let root = lay_out(json!({ "children": [
        { "style": { "height": "20px", "margin-bottom": "30px" } },
        { "style": { "height": "20px", "margin-top": "-10px" } }
    ] }));
    assert!(approx_eq(root.children[1].dimensions.content.y, 40.0), "30 + (-10)");
}

#[test]
fn negative_margins_collapse_to_the_most_negative() {
    let root = lay_out(json!({ "children": [
        { "style": { "height": "50px" } },
        { "style": { "height": "20px", "margin-bottom": "-10px" } },
        { "style": { "height": "20px", "margin-top": "-15px" } }
    ] }));
    assert!(approx_eq(root.children[2].dimensions.content.y, 55.0), "70 - 15");
}

#[test]
fn margins_collapse_through_an_empty_block() {
    let root = lay_out(json!({ "children": [
        { "style": { "height": "20px", "margin-bottom": "10px" } },
        { "style": { "margin-top": "5px", "margin-bottom": "12px" } },
        { "style": { "height": "20px", "margin-top": "15px" } }
    ] }));
    assert!(approx_eq(root.children[2].dimensions.content.y, 35.0), "max(10, 5, 12, 15)");
}

// [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#block-formatting)

#[test]
fn margins_do_not_collapse_into_a_new_formatting_context() {
    let child = json!({ "style": { "height": "10px", "margin-top": "20px" } });
    let root = lay_out(json!({ "children": [
        { "style": { "overflow": "hidden" }, "children": [child.clone()] },
        { "style": { "height": "100px" } },
        { "children": [child] }
    ] }));

    let bfc = &root.children[0];
    assert!(approx_eq(bfc.dimensions.content.y, 0.0));
    assert!(approx_eq(bfc.children[0].dimensions.content.y, 20.0), "the margin stays inside");
    assert!(approx_eq(bfc.dimensions.content.height, 30.0));

    let plain = &root.children[2];
    assert!(approx_eq(plain.dimensions.content.y, 150.0), "the margin collapses through the parent");
    assert!(approx_eq(plain.dimensions.content.height, 10.0));
}

#[test]
fn formatting_context_root_grows_to_contain_its_floats() {
    let float = json!({ "style": { "float": "left", "width": "100px", "height": "50px" } });
    let root = lay_out(json!({ "children": [
        { "style": { "overflow": "hidden" }, "children": [float.clone()] },
        { "style": { "height": "10px", "clear": "both" } },
        { "children": [float] }
    ] }));
    assert!(approx_eq(root.children[0].dimensions.content.height, 50.0));
    let plain = &root.children[2];
    assert!(approx_eq(plain.dimensions.content.height, 0.0), "floats stick out of an ordinary block");
}

// [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)

fn line_with_tall_box(align: &str) -> Fragment {
    lay_out(json!({ "children": [
        { "style": { "font-size": "10px" }, "children": [
            { "text": "a" },
            { "style": { "display": "inline-block", "width": "10px", "height": "40px", "vertical-align": align } }
        ] }
    ] }))
}

#[test]
fn edge_aligned_atomic_boxes_extend_the_line() {
    let top = line_with_tall_box("top");
    let bottom = line_with_tall_box("bottom");
    for root in [&top, &bottom] {
        assert!(approx_eq(root.children[0].dimensions.content.height, 40.0));
        let tall = find_all(root, |_| true)
            .into_iter()
            .find(|f| approx_eq(f.dimensions.content.height, 40.0) && approx_eq(f.dimensions.content.width, 10.0))
            .expect("inline-block fragment");
        assert!(approx_eq(tall.dimensions.content.y, 0.0));
    }
    let text_y = |root: &Fragment| find_all(root, |k| matches!(k, FragmentKind::Text { .. }))[0].dimensions.content.y;
    assert!(text_y(&top) < 5.0, "text stays near the line top");
    assert!(text_y(&bottom) > 20.0, "text sits on the lowered baseline");
}

// ---------------------------------------------------------------------------
// Floats
//
// [§ 9.5 Floats](https://www.w3.org/TR/CSS2/visuren.html#floats)
// ---------------------------------------------------------------------------

#[test]
fn line_boxes_are_shortened_next_to_a_float() {
    let root = lay_out(json!({ "children": [
        { "style": { "float": "left", "width": "100px", "height": "50px" } },
        { "children": [{ "text": "hello" }] }
    ] }));
    let texts = find_all(&root, |k| matches!(k, FragmentKind::Text { .. }));
    assert_eq!(texts.len(), 1);
    assert!(approx_eq(texts[0].dimensions.content.x, 100.0));
}

#[test]
fn clearance_moves_a_block_below_the_float() {
    let root = lay_out(json!({ "children": [
        { "style": { "float": "left", "width": "100px", "height": "50px" } },
        { "style": { "clear": "left", "height": "10px" } }
    ] }));
    let cleared = root
        .children
        .iter()
        .find(|f| approx_eq(f.dimensions.content.height, 10.0))
        .expect("cleared block");
    assert!(cleared.dimensions.content.y >= 50.0);
}

// ---------------------------------------------------------------------------
// Tables
//
// [§ 17.5.2.1 Fixed table layout](https://www.w3.org/TR/CSS2/tables.html#fixed-table-layout)
// ---------------------------------------------------------------------------

#[test]
fn fixed_table_shares_its_width_between_columns() {
    let cell = json!({ "style": { "display": "table-cell" }, "children": [{ "style": { "height": "20px" } }] });
    let root = lay_out(json!({ "children": [
        { "style": { "display": "table", "table-layout": "fixed", "width": "200px" }, "children": [
            { "style": { "display": "table-row" }, "children": [cell.clone(), cell] }
        ] }
    ] }));
    let cells = find_all(&root, |k| *k == FragmentKind::TableCell);
    assert_eq!(cells.len(), 2);
    assert!(approx_eq(cells[0].dimensions.content.width, 100.0));
    assert!(approx_eq(cells[1].dimensions.content.x, 100.0));
    assert!(approx_eq(cells[1].dimensions.content.width, 100.0));
}

#[test]
fn border_spacing_comes_out_of_a_fixed_table_width() {
    let cell = json!({ "style": { "display": "table-cell" }, "children": [{ "style": { "height": "20px" } }] });
    let root = lay_out(json!({ "children": [
        { "style": { "display": "table", "table-layout": "fixed", "width": "200px", "border-spacing": "10px" },
          "children": [
            { "style": { "display": "table-row" }, "children": [cell.clone(), cell] }
        ] }
    ] }));
    let cells = find_all(&root, |k| *k == FragmentKind::TableCell);
    assert_eq!(cells.len(), 2);
    // 200 - 3 * 10 of spacing, shared by two columns.
    assert!(approx_eq(cells[0].dimensions.content.width, 85.0));
    assert!(approx_eq(cells[1].dimensions.content.width, 85.0));
    assert!(approx_eq(cells[0].dimensions.content.x, 10.0));
    assert!(approx_eq(cells[1].dimensions.content.x, 105.0));
}

// ---------------------------------------------------------------------------
// Grids
//
// [§ 12 Grid Item Sizing](https://www.w3.org/TR/css-grid-1/#layout-algorithm)
// ---------------------------------------------------------------------------

#[test]
fn flexible_track_takes_the_free_space() {
    let item = json!({ "style": { "height": "10px" } });
    let root = lay_out(json!({ "children": [
        { "style": { "display": "grid", "grid-template-columns": "100px 1fr", "width": "300px" },
          "children": [item.clone(), item] }
    ] }));
    let grid = find_all(&root, |k| *k == FragmentKind::Grid);
    assert_eq!(grid.len(), 1);
    let items = &grid[0].children;
    assert_eq!(items.len(), 2);
    assert!(approx_eq(items[0].dimensions.content.width, 100.0));
    assert!(approx_eq(items[1].dimensions.content.x, 100.0));
    assert!(approx_eq(items[1].dimensions.content.width, 200.0));
}

#[test]
fn auto_placement_wraps_onto_implicit_rows() {
    let item = json!({ "style": { "height": "10px" } });
    let root = lay_out(json!({ "children": [
        { "style": { "display": "grid", "grid-template-columns": "1fr 1fr" },
          "children": [item.clone(), item.clone(), item] }
    ] }));
    let grid = find_all(&root, |k| *k == FragmentKind::Grid);
    let items = &grid[0].children;
    assert_eq!(items.len(), 3);
    assert!(approx_eq(items[2].dimensions.content.x, 0.0));
    assert!(approx_eq(items[2].dimensions.content.y, 10.0));
    assert!(approx_eq(grid[0].dimensions.content.height, 20.0));
}

// ---------------------------------------------------------------------------
// Flex containers
//
// [§ 9 Flex Layout Algorithm](https://www.w3.org/TR/css-flexbox-1/#layout-algorithm)
// ---------------------------------------------------------------------------

#[test]
fn growing_item_takes_what_the_others_leave() {
    let root = lay_out(json!({ "children": [
        { "style": { "display": "flex", "width": "300px" }, "children": [
            { "style": { "font-size": "10px" }, "children": [{ "text": "abc" }] },
            { "style": { "flex-grow": "1", "height": "10px" } }
        ] }
    ] }));
    let flex = find_all(&root, |k| *k == FragmentKind::Flex);
    assert_eq!(flex.len(), 1);
    let items = &flex[0].children;
    assert_eq!(items.len(), 2);
    assert!(approx_eq(items[0].dimensions.content.width, 18.0), "sized to its text");
    assert!(approx_eq(items[1].dimensions.content.x, 18.0));
    assert!(approx_eq(items[1].dimensions.content.width, 282.0));
    assert!(approx_eq(flex[0].dimensions.content.height, 12.0), "one line of text");
}

// ---------------------------------------------------------------------------
// Multi-column containers
//
// [§ 3 The Number and Width of Columns](https://www.w3.org/TR/css-multicol-1/#the-number-and-width-of-columns)
// ---------------------------------------------------------------------------

#[test]
fn balanced_columns_sit_side_by_side() {
    let root = lay_out(json!({ "children": [
        { "style": { "column-count": "2", "column-gap": "20px" }, "children": [
            { "style": { "height": "40px" } },
            { "style": { "height": "40px" } }
        ] },
        { "style": { "height": "10px" } }
    ] }));
    let columns = find_all(&root, |k| *k == FragmentKind::Column);
    assert_eq!(columns.len(), 2);
    assert!(approx_eq(columns[0].dimensions.content.width, 240.0));
    assert!(approx_eq(columns[1].dimensions.content.x, 260.0));
    assert!(approx_eq(root.children[0].dimensions.content.height, 40.0), "one block per column");
    assert!(approx_eq(root.children[1].dimensions.content.y, 40.0));
}
