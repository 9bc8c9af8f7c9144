//! PPTX (Office Open XML) presentation host.
//!
//! A `.pptx` file is a ZIP archive of XML parts. [`PptxHost`] edits those
//! parts directly, so decks can be split without PowerPoint installed.

pub mod host;
pub mod package;
pub mod presentation;
pub mod rels;
pub mod slide;
mod xml;

#[cfg(test)]
mod fixture;

pub use host::{PptxDeck, PptxHost};
pub use package::Package;
