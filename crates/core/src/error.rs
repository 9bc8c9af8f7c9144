//! Error types for deck partitioning.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while splitting a master deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("Failed to access file: {0}")]
    IoError(#[from] std::io::Error),

    /// The presentation host could not be started.
    #[error("Presentation host unavailable: {0}")]
    HostUnavailable(String),

    /// No master deck candidates were found.
    #[error("No presentation files found in {}", .0.display())]
    NoCandidateFiles(PathBuf),

    /// User input did not resolve to a candidate file.
    #[error("Invalid selection: '{0}'")]
    InvalidSelection(String),

    /// A slide carries no classification tag.
    #[error("Slide {slide} has no classification tag; tag it in the master deck and run again")]
    MissingTag {
        /// 1-based slide index in the inspected deck.
        slide: usize,
    },

    /// A slide carries more than one classification tag.
    #[error(
        "Slide {slide} has {} classification tags ({}); keep exactly one and run again",
        .labels.len(),
        .labels.join(", ")
    )]
    AmbiguousTag {
        /// 1-based slide index in the inspected deck.
        slide: usize,
        /// Matched labels in shape order.
        labels: Vec<String>,
    },

    /// A single call against the presentation host failed.
    #[error("{operation} failed{}: {reason}", slide_suffix(.slide))]
    HostOperationFailed {
        operation: HostOperation,
        slide: Option<usize>,
        reason: String,
    },

    /// Invalid or corrupted presentation package.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),
}

impl Error {
    /// Shorthand for a failed host call.
    pub fn host(operation: HostOperation, slide: Option<usize>, reason: impl ToString) -> Self {
        Self::HostOperationFailed {
            operation,
            slide,
            reason: reason.to_string(),
        }
    }

    /// Whether this error comes from slide classification rather than the host.
    pub fn is_classification(&self) -> bool {
        matches!(self, Self::MissingTag { .. } | Self::AmbiguousTag { .. })
    }

    /// The slide this error refers to, when known.
    pub fn slide(&self) -> Option<usize> {
        match self {
            Self::MissingTag { slide } | Self::AmbiguousTag { slide, .. } => Some(*slide),
            Self::HostOperationFailed { slide, .. } => *slide,
            _ => None,
        }
    }
}

/// Host calls that can fail individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOperation {
    CopyFile,
    OpenDeck,
    ReadShapes,
    DeleteSlide,
    DeleteShape,
    CopySlide,
    SaveDeck,
}

impl std::fmt::Display for HostOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CopyFile => "copy file",
            Self::OpenDeck => "open deck",
            Self::ReadShapes => "read shapes",
            Self::DeleteSlide => "delete slide",
            Self::DeleteShape => "delete shape",
            Self::CopySlide => "copy slide",
            Self::SaveDeck => "save deck",
        };
        f.write_str(name)
    }
}

fn slide_suffix(slide: &Option<usize>) -> String {
    slide.map(|s| format!(" on slide {}", s)).unwrap_or_default()
}
