//! Crate-level error type

use thiserror::Error;

use crate::engine::EngineError;
use crate::highlight::{ExportError, HighlightError};
use crate::textlayer::AnchorError;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Anchor(#[from] AnchorError),

    #[error(transparent)]
    Highlight(#[from] HighlightError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("no document loaded")]
    NoDocument,

    #[error("scale {0} outside the configured range")]
    InvalidScale(f32),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
