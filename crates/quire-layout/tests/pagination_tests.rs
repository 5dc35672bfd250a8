//! Integration tests for pagination: page breaks, page-dependent content,
//! footnotes, tables, columns and repagination.

use quire_layout::{
    Document, Fragment, FragmentKind, LayoutConfig, PageSetup, PagedDocument, layout_document,
};
use serde_json::{Value, json};

/// 300x300 pages with 50px margins: a 200x200 page area at (50, 50).
fn small_pages() -> LayoutConfig {
    LayoutConfig {
        page: PageSetup {
            width: 300.0,
            height: 300.0,
            margin_top: 50.0,
            margin_right: 50.0,
            margin_bottom: 50.0,
            margin_left: 50.0,
            footnote_max_height: None,
        },
        ..LayoutConfig::default()
    }
}

fn paginate(document: Value) -> PagedDocument {
    paginate_with(document, &small_pages())
}

fn paginate_with(document: Value, config: &LayoutConfig) -> PagedDocument {
    let _ = env_logger::builder().is_test(true).try_init();
    let document: Document = serde_json::from_value(document).unwrap();
    layout_document(&document, config).unwrap()
}

fn block(height: &str) -> Value {
    json!({ "style": { "height": height } })
}

fn root_of(paged: &PagedDocument, page: usize) -> &Fragment {
    paged.pages[page].root.as_ref().expect("page has a root fragment")
}

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}

fn count(fragment: &Fragment, kind: &FragmentKind) -> usize {
    let mut found = 0;
    fragment.walk(&mut |f| {
        if f.kind == *kind {
            found += 1;
        }
    });
    found
}

/// Five one-word lines of 10px text, 12px apart.
fn five_lines(mut style: Value) -> Value {
    style["font-size"] = json!("10px");
    style["width"] = json!("30px");
    json!({ "style": style, "children": [{ "text": "aaaa bbbb cccc dddd eeee" }] })
}

// ---------------------------------------------------------------------------
// Page breaks
//
// [§ 4 Controlling Breaks](https://www.w3.org/TR/css-break-3/#breaking-controls)
// ---------------------------------------------------------------------------

#[test]
fn short_document_takes_one_page_and_one_pass() {
    let paged = paginate(json!({ "root": { "children": [block("50px"), block("50px")] } }));
    assert_eq!(paged.pages.len(), 1);
    assert_eq!(paged.passes, 1, "nothing page-dependent, no replay");
    assert!(paged.stable);
    assert!(paged.pages[0].right, "first page of a left-to-right document is a right page");
}

#[test]
fn blocks_flow_onto_following_pages() {
    let children: Vec<Value> = (0..5).map(|_| block("60px")).collect();
    let paged = paginate(json!({ "root": { "children": children } }));
    assert_eq!(paged.pages.len(), 2);

    let first = root_of(&paged, 0);
    let second = root_of(&paged, 1);
    assert_eq!(first.children.len(), 3, "three 60px blocks fit in 200px");
    assert_eq!(second.children.len(), 2);
    assert!(first.is_broken);
    assert!(second.is_continuation);
    assert!(approx_eq(second.children[0].dimensions.content.y, 50.0));
}

#[test]
fn forced_side_break_inserts_a_blank_page() {
    let paged = paginate(json!({ "root": { "children": [
        block("20px"),
        { "style": { "height": "20px", "break-before": "right" } }
    ] } }));
    assert_eq!(paged.pages.len(), 3);
    assert!(paged.pages[1].blank, "page 2 is a left page: skipped");
    assert!(paged.pages[1].root.is_none());
    assert!(paged.pages[2].right);
    assert_eq!(root_of(&paged, 2).children.len(), 1);
}

#[test]
fn avoided_break_moves_back_to_the_previous_opportunity() {
    let paged = paginate(json!({ "root": { "children": [
        block("40px"),
        { "style": { "height": "120px", "break-after": "avoid" } },
        block("60px")
    ] } }));
    assert_eq!(paged.pages.len(), 2);
    assert_eq!(root_of(&paged, 0).children.len(), 1, "the break before the 120px block is taken");
    assert_eq!(root_of(&paged, 1).children.len(), 2, "the avoided pair stays together");
}

#[test]
fn avoided_break_is_taken_when_nothing_better_exists() {
    let paged = paginate(json!({ "root": { "children": [
        { "style": { "height": "150px", "break-after": "avoid" } },
        block("100px")
    ] } }));
    assert_eq!(paged.pages.len(), 2);
    assert_eq!(root_of(&paged, 0).children.len(), 1);
    assert!(approx_eq(root_of(&paged, 0).children[0].dimensions.content.height, 150.0));
    assert!(approx_eq(root_of(&paged, 1).children[0].dimensions.content.height, 100.0));
}

// [§ 3.3 Breaks Between Lines: orphans, widows](https://www.w3.org/TR/css-break-3/#widows-orphans)

#[test]
fn widows_pull_a_line_onto_the_next_page() {
    // Four lines fit under the 150px block, leaving one widow.
    let paged = paginate(json!({ "root": { "children": [block("150px"), five_lines(json!({}))] } }));
    assert_eq!(paged.pages.len(), 2);
    assert_eq!(count(root_of(&paged, 0), &FragmentKind::Line), 3);
    assert_eq!(count(root_of(&paged, 1), &FragmentKind::Line), 2);
    assert!(root_of(&paged, 1).text().contains("dddd"));
}

#[test]
fn too_few_orphans_push_the_whole_paragraph() {
    // Two lines fit under the 170px block.
    let paged = paginate(json!({ "root": { "children": [
        block("170px"),
        five_lines(json!({ "orphans": 3 }))
    ] } }));
    assert_eq!(paged.pages.len(), 2);
    assert_eq!(count(root_of(&paged, 0), &FragmentKind::Line), 0);
    assert_eq!(count(root_of(&paged, 1), &FragmentKind::Line), 5);
}

// [§ 5.4 'box-decoration-break'](https://www.w3.org/TR/css-break-3/#break-decoration)

#[test]
fn cloned_decorations_keep_or_drop_the_margin_at_a_break() {
    let document = json!({ "root": { "children": [
        { "style": {
            "box-decoration-break": "clone",
            "margin-bottom": "10px",
            "border-bottom-width": "2px"
          },
          "children": [block("150px"), block("150px")] }
    ] } });

    let kept = paginate(document.clone());
    assert_eq!(kept.pages.len(), 2);
    let first = &root_of(&kept, 0).children[0];
    assert!(first.is_broken);
    assert!(approx_eq(first.dimensions.border.bottom, 2.0), "the border is repeated");
    assert!(approx_eq(first.dimensions.margin.bottom, 10.0));

    let mut config = small_pages();
    config.clone_decoration_margins = true;
    let dropped = paginate_with(document, &config);
    let first = &root_of(&dropped, 0).children[0];
    assert!(approx_eq(first.dimensions.border.bottom, 2.0));
    assert!(approx_eq(first.dimensions.margin.bottom, 0.0));
}

// ---------------------------------------------------------------------------
// Tables
//
// [§ 17.2 The CSS table model](https://www.w3.org/TR/CSS2/tables.html#table-display)
// ---------------------------------------------------------------------------

fn table_row(content: Value) -> Value {
    json!({ "style": { "display": "table-row" }, "children": [
        { "style": { "display": "table-cell" }, "children": [content] }
    ] })
}

#[test]
fn footer_taller_than_the_page_is_not_repeated() {
    let text = |t: &str| json!({ "style": { "height": "20px" }, "children": [{ "text": t }] });
    let paged = paginate(json!({ "root": { "children": [
        { "style": { "display": "table", "width": "100px" }, "children": [
            { "style": { "display": "table-header-group" }, "children": [table_row(text("head"))] },
            { "style": { "display": "table-row-group" }, "children": [table_row(text("one")), table_row(text("two"))] },
            { "style": { "display": "table-footer-group" }, "children": [
                table_row(json!({ "style": { "height": "250px" }, "children": [{ "text": "foot" }] }))
            ] }
        ] }
    ] } }));
    assert_eq!(paged.pages.len(), 1);
    let root = root_of(&paged, 0);
    let text = root.text();
    assert!(text.contains("head") && text.contains("one") && text.contains("two"), "{text}");
    assert!(!text.contains("foot"), "{text}");
    assert_eq!(count(root, &FragmentKind::TableRowGroup), 2);
}

// ---------------------------------------------------------------------------
// Multi-column containers
//
// [§ 8 Overflow](https://www.w3.org/TR/css-multicol-1/#overflow)
// ---------------------------------------------------------------------------

#[test]
fn columns_continue_on_the_next_page() {
    let children: Vec<Value> = (0..6).map(|_| block("150px")).collect();
    let paged = paginate(json!({ "root": { "children": [
        { "style": { "column-count": "2" }, "children": children }
    ] } }));
    assert_eq!(paged.pages.len(), 3);
    for page in 0..3 {
        let root = root_of(&paged, page);
        let mut per_column = Vec::new();
        root.walk(&mut |f| {
            if f.kind == FragmentKind::Column {
                per_column.push(f.children[0].children.len());
            }
        });
        assert_eq!(per_column, vec![1, 1], "page {page}");
    }
    assert!(root_of(&paged, 1).children[0].is_continuation);
}

// ---------------------------------------------------------------------------
// Page-dependent content
//
// [CSS Generated Content for Paged Media](https://www.w3.org/TR/css-gcpm-3/)
// ---------------------------------------------------------------------------

#[test]
fn page_total_needs_a_second_pass() {
    let paged = paginate(json!({
        "margin-boxes": {
            "bottom-center": { "content": "counter(page) \" / \" counter(pages)" }
        },
        "root": { "children": [block("150px"), block("150px")] }
    }));
    assert_eq!(paged.pages.len(), 2);
    assert_eq!(paged.passes, 2);
    assert!(paged.stable);
    assert_eq!(paged.pages[0].margin_boxes[0].text(), "1 / 2");
    assert_eq!(paged.pages[1].margin_boxes[0].text(), "2 / 2");

    // Bottom margin: below the page area, centered across it.
    let bottom = paged.pages[1].margin_boxes[0].dimensions.content;
    assert!(approx_eq(bottom.y, 250.0));
    assert!(approx_eq(bottom.x + bottom.width / 2.0, 150.0));
}

#[test]
fn named_strings_reach_the_margin_boxes() {
    let chapter = |title: &str, break_before: &str| {
        json!({
            "style": { "string-set": "chapter content(text)", "break-before": break_before },
            "children": [{ "text": title }]
        })
    };
    let paged = paginate(json!({
        "margin-boxes": { "top-center": { "content": "string(chapter)" } },
        "root": { "children": [
            chapter("One", "auto"),
            block("150px"),
            block("50px"),
            chapter("Two", "page")
        ] }
    }));
    assert_eq!(paged.pages.len(), 3);
    assert_eq!(paged.pages[0].strings.get("chapter").map(String::as_str), Some("One"));
    assert_eq!(paged.pages[1].margin_boxes[0].text(), "One", "carried over from page 1");
    assert_eq!(paged.pages[2].margin_boxes[0].text(), "Two");
}

#[test]
fn forward_target_counter_is_resolved_on_replay() {
    let paged = paginate(json!({ "root": { "children": [
        { "style": { "content": "\"see page \" target-counter(url(#end), page)" } },
        { "style": { "height": "20px", "break-before": "page" } },
        { "id": "end", "style": { "height": "20px", "break-before": "page" } }
    ] } }));
    assert_eq!(paged.pages.len(), 3);
    assert_eq!(paged.passes, 2, "page 1 is laid out again once the anchor is known");
    assert!(paged.stable);
    assert!(root_of(&paged, 0).text().contains("see page 3"), "{}", root_of(&paged, 0).text());
}

#[test]
fn page_counter_reset_renumbers_the_page() {
    let paged = paginate(json!({
        "margin-boxes": { "bottom-right": { "content": "counter(page, lower-roman)" } },
        "root": { "children": [
            block("20px"),
            { "style": { "height": "20px", "break-before": "page", "counter-reset": "page 5" } },
            { "style": { "height": "20px", "break-before": "page" } }
        ] }
    }));
    let numbers: Vec<String> = paged.pages.iter().map(|p| p.margin_boxes[0].text()).collect();
    assert_eq!(numbers, vec!["i", "v", "vi"]);
}

// ---------------------------------------------------------------------------
// Footnotes
//
// [§ 2 Footnotes](https://www.w3.org/TR/css-gcpm-3/#footnotes)
// ---------------------------------------------------------------------------

#[test]
fn footnote_on_its_calls_page() {
    let paged = paginate(json!({ "root": { "children": [
        { "children": [
            { "text": "See" },
            { "style": { "float": "footnote" }, "children": [{ "text": "Note" }] }
        ] }
    ] } }));
    assert_eq!(paged.pages.len(), 1);
    let area = paged.pages[0].footnote_area.as_ref().expect("footnote area");
    assert!(area.text().starts_with("1."), "marker first: {}", area.text());
    assert!(approx_eq(area.dimensions.content.bottom(), 250.0), "area sits on the page area bottom");
    assert!(root_of(&paged, 0).text().contains('1'), "the call stays in the flow");
}

#[test]
fn footnote_without_room_moves_with_its_marker() {
    let paged = paginate(json!({ "root": { "children": [
        block("180px"),
        { "children": [
            { "text": "See" },
            { "style": { "float": "footnote" }, "children": [{ "text": "Note" }] }
        ] }
    ] } }));
    assert_eq!(paged.pages.len(), 2);
    assert!(paged.pages[0].footnote_area.is_none());
    let next = &paged.pages[1];
    assert!(next.blank, "only the footnote is left for page 2");
    let area = next.footnote_area.as_ref().expect("footnote area on page 2");
    let text = area.text();
    assert!(text.starts_with("1.") && text.contains("Note"), "{text}");
}

// [§ 2.5 Footnote policy](https://www.w3.org/TR/css-gcpm-3/#footnote-policy)

fn paragraph_with_tall_footnote(policy: &str) -> Value {
    json!({ "root": { "children": [
        block("150px"),
        { "style": { "font-size": "10px", "width": "40px", "orphans": 1, "widows": 1 }, "children": [
            { "text": "aaaa bbbb" },
            { "style": { "float": "footnote", "footnote-policy": policy }, "children": [block("100px")] }
        ] }
    ] } })
}

#[test]
fn footnote_policy_line_moves_the_calling_line() {
    let paged = paginate(paragraph_with_tall_footnote("line"));
    assert_eq!(paged.pages.len(), 2);
    let first = root_of(&paged, 0).text();
    assert!(first.contains("aaaa") && !first.contains("bbbb"), "{first}");
    assert!(paged.pages[0].footnote_area.is_none());
    assert!(root_of(&paged, 1).text().contains("bbbb"));
    assert!(paged.pages[1].footnote_area.is_some());
}

#[test]
fn footnote_policy_block_moves_the_whole_paragraph() {
    let paged = paginate(paragraph_with_tall_footnote("block"));
    assert_eq!(paged.pages.len(), 2);
    assert!(!root_of(&paged, 0).text().contains("aaaa"));
    let second = root_of(&paged, 1).text();
    assert!(second.contains("aaaa") && second.contains("bbbb"), "{second}");
    assert!(paged.pages[1].footnote_area.is_some());
}

// ---------------------------------------------------------------------------
// Fixed boxes
// ---------------------------------------------------------------------------

#[test]
fn fixed_boxes_are_copied_onto_every_page() {
    let paged = paginate(json!({ "root": { "children": [
        { "style": { "position": "fixed", "top": "0px", "left": "0px", "width": "10px", "height": "10px" } },
        block("150px"),
        block("150px")
    ] } }));
    assert_eq!(paged.pages.len(), 2);
    for page in &paged.pages {
        assert_eq!(page.fixed_boxes.len(), 1, "page {}", page.number);
        let content = page.fixed_boxes[0].dimensions.content;
        assert!(approx_eq(content.x, 50.0) && approx_eq(content.y, 50.0));
    }
}

#[test]
fn repagination_cap_is_respected() {
    let mut config = small_pages();
    config.max_repagination_loops = 1;
    let document: Document = serde_json::from_value(json!({
        "margin-boxes": { "bottom-center": { "content": "counter(pages)" } },
        "root": { "children": [block("150px"), block("150px")] }
    }))
    .unwrap();
    let paged = layout_document(&document, &config).unwrap();
    assert_eq!(paged.passes, 1);
    assert!(!paged.stable, "the page total was still unknown");
    assert_eq!(paged.pages[0].margin_boxes[0].text(), "0");
}
