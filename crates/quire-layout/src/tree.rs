//! The box tree.
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS2/visuren.html#box-gen)
//!
//! Boxes live in an arena and refer to each other by [`BoxId`]. The parent
//! link is for navigation only; children are owned through the arena.
//! The tree is built once per document, then read by every layout pass;
//! geometry never lives here, it goes into [`crate::fragment::Fragment`]s.

use std::collections::BTreeMap;
use std::rc::Rc;

use quire_common::warning::warn_once;
use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};
use crate::style::{ColumnSpan, ComputedStyle, Display, Float, Position};

/// Stable index of a box in its [`BoxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoxId(pub usize);

/// [§ 17.2 The CSS table model](https://www.w3.org/TR/CSS2/tables.html#table-display)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowGroupKind {
    /// `table-header-group`
    Header,
    /// `table-row-group`
    Body,
    /// `table-footer-group`
    Footer,
}

/// What kind of box this is, derived from `display` and the node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BoxKind {
    /// Block container.
    Block,
    /// Inline box.
    Inline,
    /// Atomic inline-level block container.
    InlineBlock,
    /// A run of text.
    Text(String),
    /// A forced line break.
    LineBreak,
    /// A replaced element (image) and its source.
    Replaced(String),
    /// Block-level table.
    Table,
    /// Inline-level table.
    InlineTable,
    /// `table-caption`
    TableCaption,
    /// A row group.
    TableRowGroup(RowGroupKind),
    /// `table-row`
    TableRow,
    /// `table-cell`
    TableCell,
    /// `table-column-group`
    TableColumnGroup,
    /// `table-column`
    TableColumn,
    /// Block-level grid container.
    Grid,
    /// Inline-level grid container.
    InlineGrid,
    /// Block-level flex container.
    Flex,
    /// Inline-level flex container.
    InlineFlex,
    /// Inline text produced from the parent's `content` at layout time.
    Generated,
    /// The in-flow marker of a footnote whose body was moved out of flow.
    FootnoteCall {
        /// The footnote body.
        footnote: BoxId,
        /// The call text (the footnote number).
        label: String,
    },
}

/// A node of the box tree.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    /// Box kind.
    pub kind: BoxKind,
    /// Computed style; `None` only for boxes added by a collaborator that
    /// forgot to style them, which [`BoxTree::validate`] rejects.
    pub style: Option<Rc<ComputedStyle>>,
    /// Ordered children.
    pub children: Vec<BoxId>,
    /// Parent, for navigation.
    pub parent: Option<BoxId>,
    /// Source element name, for diagnostics.
    pub element: Option<String>,
    /// Anchor name (`id` attribute) for target lookups.
    pub anchor: Option<String>,
    /// Raw element attributes (`colspan`, `rowspan`, `span`).
    pub attrs: BTreeMap<String, String>,
}

/// A node of an input document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoxNode {
    /// Computed style. Text nodes without one share their parent's.
    pub style: Option<ComputedStyle>,
    /// Makes this node a text run.
    pub text: Option<String>,
    /// Makes this node a replaced image with this source.
    pub image: Option<String>,
    /// Makes this node a forced line break.
    #[serde(rename = "break")]
    pub line_break: bool,
    /// Element name.
    pub tag: Option<String>,
    /// Anchor name.
    pub id: Option<String>,
    /// Element attributes.
    pub attrs: BTreeMap<String, String>,
    /// Children.
    pub children: Vec<BoxNode>,
}

/// Arena of boxes.
#[derive(Debug, Clone, Default)]
pub struct BoxTree {
    boxes: Vec<LayoutBox>,
    root: Option<BoxId>,
    footnotes: Vec<BoxId>,
}

impl ComputedStyle {
    /// Style for an anonymous or generated box: initial values, with
    /// inherited properties copied from `parent`.
    #[must_use]
    pub fn inherited_from(parent: &Self) -> Self {
        Self {
            display: Display::Inline,
            direction: parent.direction,
            font_family: parent.font_family.clone(),
            font_size: parent.font_size,
            font_weight: parent.font_weight,
            line_height: parent.line_height,
            white_space: parent.white_space,
            text_align: parent.text_align,
            text_indent: parent.text_indent,
            hyphens: parent.hyphens,
            lang: parent.lang.clone(),
            orphans: parent.orphans,
            widows: parent.widows,
            border_collapse: parent.border_collapse,
            border_spacing: parent.border_spacing,
            ..Self::default()
        }
    }
}

impl BoxTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a nested document node.
    ///
    /// `display: none` subtrees generate no boxes. A node with a non-empty
    /// `content` has its children replaced by one generated inline box.
    #[must_use]
    pub fn from_node(node: &BoxNode) -> Self {
        let mut tree = Self::new();
        let initial = Rc::new(ComputedStyle::default());
        let root = tree.build(node, None, &initial);
        tree.root = root;
        tree
    }

    fn build(
        &mut self,
        node: &BoxNode,
        parent: Option<BoxId>,
        parent_style: &Rc<ComputedStyle>,
    ) -> Option<BoxId> {
        if let Some(text) = &node.text {
            let style = node
                .style
                .clone()
                .map_or_else(|| Rc::clone(parent_style), Rc::new);
            return Some(self.push(BoxKind::Text(text.clone()), Some(style), parent));
        }

        let style = Rc::new(node.style.clone().unwrap_or_default());
        if style.display == Display::None {
            return None;
        }
        if node.line_break {
            return Some(self.push(BoxKind::LineBreak, Some(style), parent));
        }
        let kind = match &node.image {
            Some(url) => BoxKind::Replaced(url.clone()),
            None => kind_for_display(style.display),
        };

        let id = self.push(kind, Some(Rc::clone(&style)), parent);
        {
            let layout_box = &mut self.boxes[id.0];
            layout_box.element.clone_from(&node.tag);
            layout_box.anchor.clone_from(&node.id);
            layout_box.attrs.clone_from(&node.attrs);
        }

        if !style.content.0.is_empty() {
            let generated = Rc::new(ComputedStyle::inherited_from(&style));
            let child = self.push(BoxKind::Generated, Some(generated), Some(id));
            self.boxes[id.0].children.push(child);
            return Some(id);
        }
        if matches!(self.boxes[id.0].kind, BoxKind::Replaced(_)) {
            return Some(id);
        }

        for child in &node.children {
            if let Some(child_id) = self.build(child, Some(id), &style) {
                self.boxes[id.0].children.push(child_id);
            }
        }
        match self.boxes[id.0].kind {
            BoxKind::Grid | BoxKind::InlineGrid | BoxKind::Flex | BoxKind::InlineFlex => {
                self.wrap_text_items(id, &style);
            }
            BoxKind::Block if style.is_multicol() => self.wrap_column_content(id, &style),
            _ => {}
        }
        Some(id)
    }

    /// [§ 6 Grid Items](https://www.w3.org/TR/css-grid-1/#grid-items),
    /// [§ 4 Flex Items](https://www.w3.org/TR/css-flexbox-1/#flex-items)
    ///
    /// "Each in-flow child of a grid container becomes a grid item, and each
    /// child text sequence is wrapped in an anonymous block container grid
    /// item. However, if the child text sequence contains only white space
    /// it is instead not rendered."
    fn wrap_text_items(&mut self, container: BoxId, style: &ComputedStyle) {
        let children = std::mem::take(&mut self.boxes[container.0].children);
        let mut items = Vec::with_capacity(children.len());
        let mut run: Vec<BoxId> = Vec::new();
        for child in children {
            if matches!(self.boxes[child.0].kind, BoxKind::Text(_) | BoxKind::LineBreak) {
                run.push(child);
                continue;
            }
            self.flush_run(container, style, &mut run, &mut items, true);
            items.push(child);
        }
        self.flush_run(container, style, &mut run, &mut items, true);
        self.boxes[container.0].children = items;
    }

    /// [§ 6 Spanning columns](https://www.w3.org/TR/css-multicol-1/#spanning-columns)
    ///
    /// Children of a multi-column container between `column-span: all`
    /// boxes are wrapped in anonymous blocks, one per column set.
    fn wrap_column_content(&mut self, container: BoxId, style: &ComputedStyle) {
        let children = std::mem::take(&mut self.boxes[container.0].children);
        let mut segments = Vec::with_capacity(children.len());
        let mut run: Vec<BoxId> = Vec::new();
        for child in children {
            if self.style(child).column_span == ColumnSpan::All && !self.is_inline_level(child) {
                self.flush_run(container, style, &mut run, &mut segments, false);
                segments.push(child);
            } else {
                run.push(child);
            }
        }
        self.flush_run(container, style, &mut run, &mut segments, false);
        self.boxes[container.0].children = segments;
    }

    fn flush_run(
        &mut self,
        container: BoxId,
        style: &ComputedStyle,
        run: &mut Vec<BoxId>,
        items: &mut Vec<BoxId>,
        drop_blank: bool,
    ) {
        let blank = run.iter().all(|&id| match &self.boxes[id.0].kind {
            BoxKind::Text(text) => text.trim().is_empty(),
            _ => false,
        });
        if run.is_empty() || (drop_blank && blank) {
            run.clear();
            return;
        }
        let anonymous = Rc::new(ComputedStyle {
            display: Display::Block,
            ..ComputedStyle::inherited_from(style)
        });
        let wrapper = self.push(BoxKind::Block, Some(anonymous), Some(container));
        for id in run.drain(..) {
            self.append_child(wrapper, id);
        }
        items.push(wrapper);
    }

    /// Append a detached box and return its id.
    pub fn push(
        &mut self,
        kind: BoxKind,
        style: Option<Rc<ComputedStyle>>,
        parent: Option<BoxId>,
    ) -> BoxId {
        let id = BoxId(self.boxes.len());
        self.boxes.push(LayoutBox {
            kind,
            style,
            children: Vec::new(),
            parent,
            element: None,
            anchor: None,
            attrs: BTreeMap::new(),
        });
        id
    }

    /// Append `child` to `parent`'s children.
    pub fn append_child(&mut self, parent: BoxId, child: BoxId) {
        self.boxes[child.0].parent = Some(parent);
        self.boxes[parent.0].children.push(child);
    }

    /// Set the root box.
    pub fn set_root(&mut self, root: BoxId) {
        self.root = Some(root);
    }

    /// Root box, if any.
    #[must_use]
    pub const fn root(&self) -> Option<BoxId> {
        self.root
    }

    /// Number of boxes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Footnote bodies in call order, filled by [`Self::extract_footnotes`].
    #[must_use]
    pub fn footnotes(&self) -> &[BoxId] {
        &self.footnotes
    }

    /// Check the invariants layout relies on: a root exists, every child
    /// link resolves and points back at its parent, every reachable box
    /// has a style.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> LayoutResult<BoxId> {
        let root = self.root.ok_or(LayoutError::NoRootBox)?;
        let mut stack: Vec<BoxId> = vec![root];
        stack.extend(self.footnotes.iter().copied());
        if root.0 >= self.boxes.len() {
            return Err(LayoutError::UnknownBox(root));
        }
        while let Some(id) = stack.pop() {
            let layout_box = self.boxes.get(id.0).ok_or(LayoutError::UnknownBox(id))?;
            if layout_box.style.is_none() {
                return Err(LayoutError::MissingStyle(id));
            }
            for &child in &layout_box.children {
                if child.0 >= self.boxes.len() {
                    return Err(LayoutError::DanglingChild { parent: id, child });
                }
                if self.boxes[child.0].parent != Some(id) {
                    return Err(LayoutError::MissingContainingBlock(child));
                }
                stack.push(child);
            }
        }
        Ok(root)
    }

    /// Box by id.
    ///
    /// Ids handed out by this tree are always valid; layout only runs after
    /// [`Self::validate`].
    #[must_use]
    pub fn get(&self, id: BoxId) -> &LayoutBox {
        &self.boxes[id.0]
    }

    /// Box kind.
    #[must_use]
    pub fn kind(&self, id: BoxId) -> &BoxKind {
        &self.boxes[id.0].kind
    }

    /// Computed style of `id`.
    #[must_use]
    pub fn style(&self, id: BoxId) -> &ComputedStyle {
        match self.boxes[id.0].style.as_deref() {
            Some(style) => style,
            None => ComputedStyle::initial(),
        }
    }

    /// Shared handle to the computed style of `id`.
    #[must_use]
    pub fn style_rc(&self, id: BoxId) -> Rc<ComputedStyle> {
        self.boxes[id.0]
            .style
            .clone()
            .unwrap_or_else(|| Rc::new(ComputedStyle::default()))
    }

    /// Children of `id`.
    #[must_use]
    pub fn children(&self, id: BoxId) -> &[BoxId] {
        &self.boxes[id.0].children
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent(&self, id: BoxId) -> Option<BoxId> {
        self.boxes[id.0].parent
    }

    /// Human-readable label for logs.
    #[must_use]
    pub fn describe(&self, id: BoxId) -> String {
        let layout_box = &self.boxes[id.0];
        match &layout_box.element {
            Some(tag) => format!("<{tag}> #{}", id.0),
            None => format!("{:?} #{}", layout_box.kind, id.0),
        }
    }

    /// [§ 9.2.2 Inline-level elements](https://www.w3.org/TR/CSS2/visuren.html#inline-level)
    ///
    /// Whether the box participates in an inline formatting context.
    #[must_use]
    pub fn is_inline_level(&self, id: BoxId) -> bool {
        match &self.boxes[id.0].kind {
            BoxKind::Inline
            | BoxKind::InlineBlock
            | BoxKind::Text(_)
            | BoxKind::LineBreak
            | BoxKind::InlineTable
            | BoxKind::InlineGrid
            | BoxKind::InlineFlex
            | BoxKind::Generated
            | BoxKind::FootnoteCall { .. } => true,
            BoxKind::Replaced(_) => matches!(
                self.style(id).display,
                Display::Inline | Display::InlineBlock
            ),
            _ => false,
        }
    }

    /// [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#block-formatting)
    ///
    /// "Floats, absolutely positioned elements, block containers (such as
    /// inline-blocks, table-cells, and table-captions) that are not block
    /// boxes, and block boxes with 'overflow' other than 'visible' (except
    /// when that value has been propagated to the viewport) establish new
    /// block formatting contexts for their contents."
    #[must_use]
    pub fn establishes_bfc(&self, id: BoxId) -> bool {
        let style = self.style(id);
        style.is_floated()
            || style.position.is_absolutely_positioned()
            || style.overflow != crate::style::Overflow::Visible
            || Some(id) == self.root
            || matches!(
                self.boxes[id.0].kind,
                BoxKind::InlineBlock
                    | BoxKind::TableCell
                    | BoxKind::TableCaption
                    | BoxKind::Table
                    | BoxKind::InlineTable
                    | BoxKind::Grid
                    | BoxKind::InlineGrid
                    | BoxKind::Flex
                    | BoxKind::InlineFlex
            )
            || (self.boxes[id.0].kind == BoxKind::Block && style.is_multicol())
            || self.boxes[id.0].parent.is_some_and(|p| {
                matches!(
                    self.boxes[p.0].kind,
                    BoxKind::Grid | BoxKind::InlineGrid | BoxKind::Flex | BoxKind::InlineFlex
                ) || (self.boxes[p.0].kind == BoxKind::Block && self.style(p).is_multicol())
            })
            || self.footnotes.contains(&id)
    }

    /// Concatenated text of every text descendant, for `content(text)`.
    #[must_use]
    pub fn text_content(&self, id: BoxId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: BoxId, out: &mut String) {
        match &self.boxes[id.0].kind {
            BoxKind::Text(text) => out.push_str(text),
            BoxKind::FootnoteCall { label, .. } => out.push_str(label),
            _ => {
                for &child in &self.boxes[id.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Parse a positive integer attribute (`colspan`, `rowspan`, `span`).
    ///
    /// A missing attribute yields `default`. A malformed or out-of-range
    /// value yields `default` too, with a warning; values above `max` are
    /// clipped to `max`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub fn span_attr(&self, id: BoxId, name: &str, default: usize, min: usize, max: usize) -> usize {
        let Some(raw) = self.boxes[id.0].attrs.get(name) else {
            return default;
        };
        match raw.trim().parse::<i64>() {
            Ok(value) if value >= min as i64 => {
                let value = value as usize;
                if value > max {
                    let _ = warn_once(
                        "Table",
                        &format!("{name}={value} on {} clipped to {max}", self.describe(id)),
                    );
                    max
                } else {
                    value
                }
            }
            _ => {
                let _ = warn_once(
                    "Table",
                    &format!(
                        "invalid {name}='{raw}' on {}, using {default}",
                        self.describe(id)
                    ),
                );
                default
            }
        }
    }

    /// [§ 2 Footnotes](https://www.w3.org/TR/css-gcpm-3/#footnotes)
    ///
    /// Move every `float: footnote` box out of the flow. Each one is
    /// replaced in its parent by a footnote call carrying its number and
    /// gets a `"N. "` marker as its first inline content. Returns the
    /// footnote bodies in document order.
    pub fn extract_footnotes(&mut self) -> Vec<BoxId> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut found = Vec::new();
        self.find_footnotes(root, &mut found);

        for (index, &footnote) in found.iter().enumerate() {
            let number = index + 1;
            let Some(parent) = self.boxes[footnote.0].parent else {
                continue;
            };
            let parent_style = self.style_rc(parent);
            let call_style = Rc::new(ComputedStyle::inherited_from(&parent_style));
            let call = self.push(
                BoxKind::FootnoteCall {
                    footnote,
                    label: number.to_string(),
                },
                Some(call_style),
                Some(parent),
            );
            if let Some(slot) = self.boxes[parent.0]
                .children
                .iter_mut()
                .find(|c| **c == footnote)
            {
                *slot = call;
            }

            // The body becomes a block laid out in the footnote area.
            self.boxes[footnote.0].parent = None;
            self.boxes[footnote.0].kind = BoxKind::Block;
            if let Some(style) = &self.boxes[footnote.0].style {
                let mut body = ComputedStyle::clone(style);
                body.float = Float::None;
                body.display = Display::Block;
                body.position = Position::Static;
                self.boxes[footnote.0].style = Some(Rc::new(body));
            }

            // Descend through leading block children so the marker starts
            // the first line instead of sitting on its own.
            let mut host = footnote;
            while let Some(&first) = self.boxes[host.0].children.first() {
                if self.is_inline_level(first) || !matches!(self.boxes[first.0].kind, BoxKind::Block) {
                    break;
                }
                host = first;
            }
            let marker_style = Rc::new(ComputedStyle::inherited_from(&self.style_rc(host)));
            let marker = self.push(
                BoxKind::Text(format!("{number}. ")),
                Some(marker_style),
                Some(host),
            );
            self.boxes[host.0].children.insert(0, marker);
        }

        self.footnotes.clone_from(&found);
        found
    }

    fn find_footnotes(&self, id: BoxId, found: &mut Vec<BoxId>) {
        for &child in &self.boxes[id.0].children {
            if self.style(child).float == Float::Footnote {
                found.push(child);
            } else {
                self.find_footnotes(child, found);
            }
        }
    }

    /// Document-order walk of the subtree at `id` (including `id`).
    #[must_use]
    pub fn descendants(&self, id: BoxId) -> Vec<BoxId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.boxes[next.0].children.iter().rev().copied());
        }
        out
    }
}

fn kind_for_display(display: Display) -> BoxKind {
    match display {
        Display::Block | Display::ListItem | Display::None => BoxKind::Block,
        Display::Inline => BoxKind::Inline,
        Display::InlineBlock => BoxKind::InlineBlock,
        Display::Table => BoxKind::Table,
        Display::InlineTable => BoxKind::InlineTable,
        Display::TableCaption => BoxKind::TableCaption,
        Display::TableHeaderGroup => BoxKind::TableRowGroup(RowGroupKind::Header),
        Display::TableRowGroup => BoxKind::TableRowGroup(RowGroupKind::Body),
        Display::TableFooterGroup => BoxKind::TableRowGroup(RowGroupKind::Footer),
        Display::TableRow => BoxKind::TableRow,
        Display::TableCell => BoxKind::TableCell,
        Display::TableColumnGroup => BoxKind::TableColumnGroup,
        Display::TableColumn => BoxKind::TableColumn,
        Display::Grid => BoxKind::Grid,
        Display::InlineGrid => BoxKind::InlineGrid,
        Display::Flex => BoxKind::Flex,
        Display::InlineFlex => BoxKind::InlineFlex,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(json: serde_json::Value) -> BoxTree {
        let node: BoxNode = serde_json::from_value(json).unwrap_or_default();
        BoxTree::from_node(&node)
    }

    #[test]
    fn display_none_generates_no_box() {
        let t = tree(serde_json::json!({
            "children": [
                { "style": { "display": "none" }, "children": [{ "text": "hidden" }] },
                { "text": "shown" }
            ]
        }));
        let root = t.root().unwrap_or(BoxId(0));
        assert_eq!(t.children(root).len(), 1);
        assert_eq!(t.text_content(root), "shown");
    }

    #[test]
    fn footnotes_are_replaced_by_calls_with_markers() {
        let mut t = tree(serde_json::json!({
            "children": [{
                "children": [
                    { "text": "Body" },
                    { "style": { "float": "footnote", "display": "inline" },
                      "children": [{ "text": "Note" }] }
                ]
            }]
        }));
        let notes = t.extract_footnotes();
        assert_eq!(notes.len(), 1);
        assert_eq!(t.text_content(notes[0]), "1. Note");
        assert!(t.parent(notes[0]).is_none());
        let root = t.root().unwrap_or(BoxId(0));
        assert_eq!(t.text_content(root), "Body1");
        assert!(t.validate().is_ok());
    }

    #[test]
    fn bad_span_attributes_fall_back() {
        let t = tree(serde_json::json!({
            "attrs": { "colspan": "x", "rowspan": "0", "span": "5000" }
        }));
        let root = t.root().unwrap_or(BoxId(0));
        assert_eq!(t.span_attr(root, "colspan", 1, 1, 1000), 1);
        assert_eq!(t.span_attr(root, "rowspan", 1, 0, 65534), 0);
        assert_eq!(t.span_attr(root, "span", 1, 1, 1000), 1000);
    }

    #[test]
    fn multicol_content_is_split_around_spanners() {
        let t = tree(serde_json::json!({
            "style": { "column-count": 2 },
            "children": [
                { "text": "one" },
                { "style": { "column-span": "all" } },
                { "children": [{ "text": "two" }] },
                { "text": "three" }
            ]
        }));
        let root = t.root().unwrap_or(BoxId(0));
        let segments = t.children(root);
        assert_eq!(segments.len(), 3);
        assert_eq!(t.text_content(segments[0]), "one");
        assert_eq!(t.style(segments[1]).column_span, ColumnSpan::All);
        assert_eq!(t.text_content(segments[2]), "twothree");
        assert!(t.establishes_bfc(segments[2]));
        assert!(t.validate().is_ok());
    }

    #[test]
    fn flex_text_runs_become_items() {
        let t = tree(serde_json::json!({
            "style": { "display": "flex" },
            "children": [{ "text": "a" }, { "style": { "display": "inline" } }, { "text": "  " }]
        }));
        let root = t.root().unwrap_or(BoxId(0));
        assert_eq!(t.kind(root), &BoxKind::Flex);
        assert_eq!(t.children(root).len(), 2, "blank runs are dropped");
        assert!(t.children(root).iter().all(|&c| t.establishes_bfc(c)));
    }

    #[test]
    fn validate_reports_a_box_without_its_parent_link() {
        let mut t = BoxTree::new();
        let style = Some(Rc::new(ComputedStyle::default()));
        let root = t.push(BoxKind::Block, style.clone(), None);
        let orphan = t.push(BoxKind::Block, style, None);
        t.set_root(root);
        t.boxes[root.0].children.push(orphan);
        assert_eq!(t.validate(), Err(LayoutError::MissingContainingBlock(orphan)));
    }

    #[test]
    fn validate_reports_missing_style() {
        let mut t = BoxTree::new();
        let root = t.push(BoxKind::Block, None, None);
        t.set_root(root);
        assert_eq!(t.validate(), Err(LayoutError::MissingStyle(root)));
    }
}
