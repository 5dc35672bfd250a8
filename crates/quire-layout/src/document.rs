//! Input documents and the layout entry points.

use std::collections::BTreeMap;

use quire_common::warning::clear_warnings;
use serde::Deserialize;

use crate::config::{LayoutConfig, PageSetup};
use crate::context::LayoutContext;
use crate::error::{LayoutResult, TreeError};
use crate::pagination::{MarginSlot, PageTemplate, PagedDocument, paginate};
use crate::resources::{ImageResolver, StaticImageResolver};
use crate::style::ComputedStyle;
use crate::text::{ApproximateFontMetrics, FontMetrics};
use crate::tree::{BoxNode, BoxTree};

/// A styled document ready for layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Document {
    /// Page geometry, overriding the configured one.
    pub page: Option<PageSetup>,
    /// Margin box styles by slot.
    pub margin_boxes: BTreeMap<MarginSlot, ComputedStyle>,
    /// The root box.
    pub root: BoxNode,
    /// Intrinsic sizes of the images the document uses, as `[width, height]`.
    pub images: BTreeMap<String, [f32; 2]>,
}

impl Document {
    /// Parse a document from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Json`] when the text is not a document and
    /// [`TreeError::TextWithChildren`] when a text node has children.
    pub fn from_json_str(text: &str) -> Result<Self, TreeError> {
        let document: Self = serde_json::from_str(text)?;
        check_text_nodes(&document.root)?;
        Ok(document)
    }

    /// Page template from this document, falling back to `config`.
    #[must_use]
    pub fn template(&self, config: &LayoutConfig) -> PageTemplate {
        PageTemplate {
            setup: self.page.unwrap_or(config.page),
            margin_boxes: self.margin_boxes.clone(),
        }
    }

    /// Resolver answering from [`Self::images`].
    #[must_use]
    pub fn image_resolver(&self) -> StaticImageResolver {
        let mut images = StaticImageResolver::new();
        for (url, [width, height]) in &self.images {
            images.insert(url.clone(), *width, *height);
        }
        images
    }
}

fn check_text_nodes(node: &BoxNode) -> Result<(), TreeError> {
    if let Some(text) = &node.text
        && !node.children.is_empty()
    {
        return Err(TreeError::TextWithChildren(text.chars().take(20).collect()));
    }
    node.children.iter().try_for_each(check_text_nodes)
}

/// Lay out an already built tree with the given services.
///
/// Each call starts with an empty warning set, so a problem repeated from
/// an earlier document is logged again.
///
/// # Errors
///
/// Returns a [`crate::LayoutError`] when the tree breaks its invariants
/// (no root, dangling children, boxes without style).
pub fn layout_tree(
    tree: &BoxTree,
    config: &LayoutConfig,
    metrics: &dyn FontMetrics,
    images: &dyn ImageResolver,
    template: &PageTemplate,
) -> LayoutResult<PagedDocument> {
    clear_warnings();
    let root = tree.validate()?;
    let mut ctx = LayoutContext::new(tree, config, metrics, images);
    Ok(paginate(&mut ctx, root, template))
}

/// Build the box tree of `document` and lay it out on pages, measuring
/// text with [`ApproximateFontMetrics`].
///
/// # Errors
///
/// Returns a [`crate::LayoutError`] when the built tree is inconsistent.
pub fn layout_document(document: &Document, config: &LayoutConfig) -> LayoutResult<PagedDocument> {
    let mut tree = BoxTree::from_node(&document.root);
    let footnotes = tree.extract_footnotes();
    log::debug!(target: "quire::pagination", "{} boxes, {} footnotes", tree.len(), footnotes.len());
    let images = document.image_resolver();
    let metrics = ApproximateFontMetrics::new();
    layout_tree(&tree, config, &metrics, &images, &document.template(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_nodes_cannot_have_children() {
        let bad = r#"{ "root": { "children": [{ "text": "hello", "children": [{}] }] } }"#;
        assert!(matches!(Document::from_json_str(bad), Err(TreeError::TextWithChildren(t)) if t == "hello"));
        assert!(matches!(Document::from_json_str("[1]"), Err(TreeError::Json(_))));
    }

    #[test]
    fn document_page_overrides_the_configured_one() {
        let document = Document::from_json_str(
            r#"{ "page": { "width": 400, "height": 300 }, "margin-boxes": { "top-center": { "content": "\"x\"" } } }"#,
        )
        .unwrap();
        let template = document.template(&LayoutConfig::default());
        assert_eq!(template.setup.width, 400.0);
        assert_eq!(template.setup.margin_top, 96.0);
        assert!(template.margin_boxes.contains_key(&MarginSlot::TopCenter));
    }

    #[test]
    fn every_document_gets_its_own_warnings() {
        use quire_common::warning::warn_once;

        let document = Document::from_json_str(
            r#"{ "root": { "children": [{ "style": { "display": "table" }, "children": [
                { "style": { "display": "table-row" }, "children": [
                    { "style": { "display": "table-cell" }, "attrs": { "colspan": "x" } }
                ] }
            ] }] } }"#,
        )
        .unwrap();
        let config = LayoutConfig::default();

        let _ = layout_document(&document, &config).unwrap();
        assert!(warn_once("Table", "seen during the first document"));
        assert!(!warn_once("Table", "seen during the first document"));

        let _ = layout_document(&document, &config).unwrap();
        assert!(
            warn_once("Table", "seen during the first document"),
            "the second layout starts from an empty warning set"
        );
    }
}
