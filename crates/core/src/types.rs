//! Domain types shared by the matcher, resolver and partitioner.

use serde::{Deserialize, Serialize};

/// Default label for slides that belong to the test-oriented deck.
pub const DEFAULT_LABEL_A: &str = "test-oriented";

/// Default label for slides that belong to the operations-oriented deck.
pub const DEFAULT_LABEL_B: &str = "operations-oriented";

/// Default label for slides that belong to both decks.
pub const DEFAULT_LABEL_BOTH: &str = "both";

/// One of the two target decks being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    A,
    B,
}

impl Variant {
    /// Both variants, in processing order.
    pub const ALL: [Variant; 2] = [Variant::A, Variant::B];

    /// The other variant.
    pub fn other(self) -> Self {
        match self {
            Variant::A => Variant::B,
            Variant::B => Variant::A,
        }
    }
}

/// Which label a tag shape carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    /// The label owned by one variant.
    Only(Variant),
    /// The label shared by both variants.
    Both,
}

/// The closed set of tag labels in force for a run.
///
/// Labels are compared by exact string equality: no trimming, no case folding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    a: String,
    b: String,
    both: String,
}

impl Default for TagSet {
    fn default() -> Self {
        Self {
            a: DEFAULT_LABEL_A.to_string(),
            b: DEFAULT_LABEL_B.to_string(),
            both: DEFAULT_LABEL_BOTH.to_string(),
        }
    }
}

impl TagSet {
    /// Create a tag set from explicit labels.
    ///
    /// Returns `None` when a label is empty or two labels are equal, since
    /// either would make classification ambiguous by construction.
    pub fn new(a: impl Into<String>, b: impl Into<String>, both: impl Into<String>) -> Option<Self> {
        let set = Self {
            a: a.into(),
            b: b.into(),
            both: both.into(),
        };
        let distinct = set.a != set.b && set.a != set.both && set.b != set.both;
        let non_empty = !set.a.is_empty() && !set.b.is_empty() && !set.both.is_empty();
        (distinct && non_empty).then_some(set)
    }

    /// The label owned by a variant.
    pub fn label(&self, variant: Variant) -> &str {
        match variant {
            Variant::A => &self.a,
            Variant::B => &self.b,
        }
    }

    /// The shared label.
    pub fn both(&self) -> &str {
        &self.both
    }

    /// The label text for a tag kind.
    pub fn text(&self, kind: TagKind) -> &str {
        match kind {
            TagKind::Only(variant) => self.label(variant),
            TagKind::Both => &self.both,
        }
    }

    /// Resolve shape text to a tag kind, if it is exactly one of the labels.
    pub fn kind_of(&self, text: &str) -> Option<TagKind> {
        if text == self.a {
            Some(TagKind::Only(Variant::A))
        } else if text == self.b {
            Some(TagKind::Only(Variant::B))
        } else if text == self.both {
            Some(TagKind::Both)
        } else {
            None
        }
    }
}

/// A snapshot of one shape on a slide, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    /// 1-based position in the slide's shape collection.
    pub index: usize,

    /// Shape name as shown in the selection pane.
    pub name: String,

    /// Text content, or `None` if the shape has no text frame.
    pub text: Option<String>,
}

impl Shape {
    /// Create a shape with a text frame.
    pub fn with_text(index: usize, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            text: Some(text.into()),
        }
    }

    /// Create a shape without a text frame (picture, chart, connector...).
    pub fn without_text(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            text: None,
        }
    }

    /// Whether the shape has a text frame with non-empty text.
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// A tag shape found on a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    /// 1-based position of the tag shape on its slide.
    pub shape_index: usize,

    /// Name of the tag shape.
    pub shape_name: String,

    /// Which label the shape carried.
    pub kind: TagKind,
}

/// What happens to a slide in one target deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// The slide belongs to this target only.
    Keep,
    /// The slide does not belong to this target.
    Exclude,
    /// The slide belongs to every target.
    KeepBoth,
}

impl Disposition {
    /// Whether the slide survives in the target.
    pub fn is_kept(self) -> bool {
        !matches!(self, Disposition::Exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of_exact_match_only() {
        let tags = TagSet::default();

        assert_eq!(tags.kind_of("test-oriented"), Some(TagKind::Only(Variant::A)));
        assert_eq!(
            tags.kind_of("operations-oriented"),
            Some(TagKind::Only(Variant::B))
        );
        assert_eq!(tags.kind_of("both"), Some(TagKind::Both));

        assert_eq!(tags.kind_of("Both"), None);
        assert_eq!(tags.kind_of(" both"), None);
        assert_eq!(tags.kind_of("both\n"), None);
        assert_eq!(tags.kind_of("test"), None);
        assert_eq!(tags.kind_of(""), None);
    }

    #[test]
    fn test_tag_set_rejects_duplicate_or_empty_labels() {
        assert!(TagSet::new("x", "y", "z").is_some());
        assert!(TagSet::new("x", "x", "z").is_none());
        assert!(TagSet::new("x", "y", "y").is_none());
        assert!(TagSet::new("", "y", "z").is_none());
    }

    #[test]
    fn test_label_lookup() {
        let tags = TagSet::new("lab", "ops", "all").unwrap();
        assert_eq!(tags.label(Variant::A), "lab");
        assert_eq!(tags.label(Variant::B), "ops");
        assert_eq!(tags.text(TagKind::Both), "all");
        assert_eq!(tags.text(TagKind::Only(Variant::B)), "ops");
    }

    #[test]
    fn test_shape_has_text() {
        assert!(Shape::with_text(1, "Title", "Hello").has_text());
        assert!(!Shape::with_text(1, "Empty", "").has_text());
        assert!(!Shape::without_text(2, "Picture 1").has_text());
    }

    #[test]
    fn test_variant_other() {
        assert_eq!(Variant::A.other(), Variant::B);
        assert_eq!(Variant::B.other(), Variant::A);
    }
}
