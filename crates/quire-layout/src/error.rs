//! Error types.
//!
//! Input problems (bad spans, missing images, unsatisfiable `avoid`) are
//! recovered where they occur and only logged. The errors here are either
//! malformed input documents or broken invariants between the engine and
//! its callers.

use thiserror::Error;

use crate::tree::BoxId;

/// A style value that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StyleParseError {
    /// The value does not match the property's grammar.
    #[error("invalid {kind} value '{value}'")]
    Invalid {
        /// What kind of value was expected.
        kind: &'static str,
        /// The offending text.
        value: String,
    },
}

impl StyleParseError {
    pub(crate) fn invalid(kind: &'static str, value: &str) -> Self {
        Self::Invalid {
            kind,
            value: value.trim().to_owned(),
        }
    }
}

/// Errors raised while loading an input document.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The JSON did not describe a document.
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    /// A text node was given children.
    #[error("text box {0} cannot have children")]
    TextWithChildren(String),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML could not be parsed or did not match the schema.
    #[error("invalid layout configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// A value parsed but is out of range.
    #[error("invalid layout configuration: {0}")]
    Value(String),
}

/// Fatal layout errors.
///
/// Each variant is an upstream bug (a collaborator handed the engine an
/// inconsistent tree), never a property of the document content.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// A box id does not belong to the tree.
    #[error("box {0:?} is not part of the box tree")]
    UnknownBox(BoxId),
    /// The tree has no root box.
    #[error("box tree has no root")]
    NoRootBox,
    /// A box reached layout without a computed style.
    #[error("box {0:?} has no computed style")]
    MissingStyle(BoxId),
    /// A child link points at a box that is not part of the tree.
    #[error("box {parent:?} lists unknown child {child:?}")]
    DanglingChild {
        /// The box holding the link.
        parent: BoxId,
        /// The missing child.
        child: BoxId,
    },
    /// A reachable box whose parent link does not lead back to the box
    /// listing it, so its containing block cannot be found.
    #[error("box {0:?} has no containing block")]
    MissingContainingBlock(BoxId),
}

/// Result alias for layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;
