//! Slide classification.
//!
//! A slide is classified once from its tag matches; the classification is
//! then projected onto each target deck as a [`Disposition`].

use crate::types::{Disposition, TagKind, TagMatch, TagSet, Variant};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// How slides with more than one tag shape are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmbiguityPolicy {
    /// Abort the run, naming the slide.
    #[default]
    Strict,
    /// Exclude the slide from every target, strip its tags and keep going.
    Permissive,
}

/// The resolved classification of one slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The slide carries exactly one tag.
    Tagged(TagKind),
    /// The slide carries several tags and the permissive policy is in force.
    Ambiguous,
}

impl Classification {
    /// Project the classification onto a target deck.
    pub fn disposition_for(self, target: Variant) -> Disposition {
        match self {
            Classification::Tagged(TagKind::Both) => Disposition::KeepBoth,
            Classification::Tagged(TagKind::Only(owner)) if owner == target => Disposition::Keep,
            Classification::Tagged(TagKind::Only(_)) => Disposition::Exclude,
            Classification::Ambiguous => Disposition::Exclude,
        }
    }

    /// The targets the slide belongs to, in processing order.
    pub fn targets(self) -> impl Iterator<Item = Variant> {
        Variant::ALL
            .into_iter()
            .filter(move |v| self.disposition_for(*v).is_kept())
    }
}

/// Turns tag matches into classifications under a fixed policy.
#[derive(Debug, Clone)]
pub struct Resolver {
    tags: TagSet,
    policy: AmbiguityPolicy,
}

impl Resolver {
    /// Create a resolver.
    pub fn new(tags: TagSet, policy: AmbiguityPolicy) -> Self {
        Self { tags, policy }
    }

    /// The ambiguity policy in force.
    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    /// Classify a slide from its tag matches.
    ///
    /// `slide` is the 1-based index used in error messages.
    pub fn classify(&self, slide: usize, matches: &[TagMatch]) -> Result<Classification> {
        match matches {
            [] => Err(Error::MissingTag { slide }),
            [only] => Ok(Classification::Tagged(only.kind)),
            many => match self.policy {
                AmbiguityPolicy::Strict => Err(Error::AmbiguousTag {
                    slide,
                    labels: many
                        .iter()
                        .map(|m| self.tags.text(m.kind).to_string())
                        .collect(),
                }),
                AmbiguityPolicy::Permissive => {
                    log::warn!(
                        "Slide {} has {} classification tags; excluding it from every deck",
                        slide,
                        many.len()
                    );
                    Ok(Classification::Ambiguous)
                }
            },
        }
    }

    /// Classify a slide and project it onto one target.
    pub fn resolve(&self, slide: usize, matches: &[TagMatch], target: Variant) -> Result<Disposition> {
        Ok(self.classify(slide, matches)?.disposition_for(target))
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(TagSet::default(), AmbiguityPolicy::default())
    }
}
