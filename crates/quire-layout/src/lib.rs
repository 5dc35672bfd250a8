//! CSS box layout and pagination for the quire document engine.
//!
//! # Scope
//!
//! This crate turns a styled box tree into positioned fragments on pages:
//! - **Block layout** ([CSS 2.1 § 9.4.1](https://www.w3.org/TR/CSS2/visuren.html#block-formatting))
//!   - Width/margin resolution, margin collapsing, clearance
//!   - Relative, absolute and fixed positioning
//! - **Inline layout** ([CSS 2.1 § 9.4.2](https://www.w3.org/TR/CSS2/visuren.html#inline-formatting))
//!   - Line breaking, hyphenation, `text-align`, `vertical-align`
//!   - Orphans, widows and footnote calls
//! - **Floats** ([CSS 2.1 § 9.5](https://www.w3.org/TR/CSS2/visuren.html#floats))
//! - **Tables** ([CSS 2.1 § 17](https://www.w3.org/TR/CSS2/tables.html))
//!   - Fixed and automatic column widths, spans, collapsing borders
//!   - Repeated headers and footers across pages
//! - **Grids** ([CSS Grid Layout Level 1](https://www.w3.org/TR/css-grid-1/))
//!   - Explicit and implicit tracks, named areas, dense auto-placement
//!   - Track sizing with `fr` under definite and indefinite free space
//! - **Flexbox** ([CSS Flexible Box Layout Level 1](https://www.w3.org/TR/css-flexbox-1/))
//!   - Both directions, wrapping, `order`, grow and shrink, alignment
//!   - Breaks between flex lines
//! - **Multi-column** ([CSS Multi-column Layout Level 1](https://www.w3.org/TR/css-multicol-1/))
//!   - Balanced and sequential fill, spanners, columns across pages
//! - **Leaders** ([CSS GCPM § 4](https://www.w3.org/TR/css-gcpm-3/#leaders))
//! - **Pagination** ([CSS Paged Media Level 3](https://www.w3.org/TR/css-page-3/),
//!   [CSS Fragmentation Level 3](https://www.w3.org/TR/css-break-3/))
//!   - Forced and avoided breaks, footnotes, margin boxes
//!   - Named strings, running elements, page counters, `target-counter()`
//!   - Repagination until page-dependent values settle
//! - **Backgrounds** ([CSS Backgrounds Level 3](https://www.w3.org/TR/css-backgrounds-3/))
//!
//! # Not Implemented
//!
//! - Parsing HTML or CSS (styles arrive computed)
//! - Text shaping (measurement goes through [`FontMetrics`])
//! - Painting

/// Background layers resolved against laid out boxes.
pub mod background;
/// Block-level layout and the width/margin equations.
pub mod block;
/// Break opportunities between block-level siblings.
pub mod breaks;
/// Multi-column layout.
pub mod columns;
/// Engine configuration loaded from TOML.
pub mod config;
/// Per-document layout state.
pub mod context;
/// Counters and cross-references.
pub mod counters;
/// Input documents and the layout entry points.
pub mod document;
/// Error types.
pub mod error;
/// Flex layout.
pub mod flex;
/// Float placement.
pub mod float;
/// Block formatting contexts and their exclusion shapes.
pub mod formatting_context;
/// The fragment tree.
pub mod fragment;
mod generated;
/// Box model geometry.
pub mod geometry;
/// Grid layout.
pub mod grid;
mod inline;
/// Pages, footnotes and margin boxes.
pub mod pagination;
/// Positioned boxes.
pub mod positioned;
/// Min-content and max-content widths.
pub mod preferred;
mod replaced;
/// Image resolution.
pub mod resources;
/// Named strings and running elements.
pub mod strings;
/// Computed style values.
pub mod style;
/// Table layout.
pub mod table;
/// Text measurement.
pub mod text;
/// The box tree.
pub mod tree;

pub use config::{LayoutConfig, PageSetup};
pub use context::LayoutContext;
pub use document::{Document, layout_document, layout_tree};
pub use error::{ConfigError, LayoutError, LayoutResult, StyleParseError, TreeError};
pub use fragment::{Fragment, FragmentKind, ResumePoint};
pub use geometry::{BoxDimensions, ContainingBlock, Direction, EdgeSizes, Rect};
pub use pagination::{MarginSlot, PageBox, PageTemplate, PagedDocument, paginate};
pub use resources::{ImageResolver, IntrinsicSize, StaticImageResolver};
pub use style::ComputedStyle;
pub use text::{ApproximateFontMetrics, FontMetrics};
pub use tree::{BoxId, BoxKind, BoxNode, BoxTree};
