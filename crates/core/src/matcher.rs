//! Tag shape detection.

use crate::host::Deck;
use crate::types::{Shape, TagMatch, TagSet};
use crate::Result;

/// Finds tag shapes on slides.
#[derive(Debug, Clone)]
pub struct TagMatcher {
    tags: TagSet,
}

impl TagMatcher {
    /// Create a matcher for the given labels.
    pub fn new(tags: TagSet) -> Self {
        Self { tags }
    }

    /// The labels this matcher looks for.
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Return every shape whose text is exactly a tag label, in shape order.
    pub fn match_shapes(&self, shapes: &[Shape]) -> Vec<TagMatch> {
        shapes
            .iter()
            .filter(|shape| shape.has_text())
            .filter_map(|shape| {
                let text = shape.text.as_deref()?;
                self.tags.kind_of(text).map(|kind| TagMatch {
                    shape_index: shape.index,
                    shape_name: shape.name.clone(),
                    kind,
                })
            })
            .collect()
    }

    /// Read the shapes of a slide from the host and match them.
    pub fn match_slide<D: Deck + ?Sized>(&self, deck: &D, slide: usize) -> Result<Vec<TagMatch>> {
        let shapes = deck.shapes(slide)?;
        Ok(self.match_shapes(&shapes))
    }
}

impl Default for TagMatcher {
    fn default() -> Self {
        Self::new(TagSet::default())
    }
}
