//! Core domain types, tag matching, slide classification and deck
//! partitioning for splitting a tagged master deck into two variants.

pub mod classify;
pub mod error;
pub mod host;
pub mod matcher;
pub mod memory;
pub mod partition;
pub mod types;

pub use classify::{AmbiguityPolicy, Classification, Resolver};
pub use error::{Error, HostOperation, Result};
pub use host::{Deck, HostSession, OpenDeck, PresentationHost};
pub use matcher::TagMatcher;
pub use partition::{PartitionConfig, PartitionMode, PartitionPlan, PartitionReport, Partitioner, Target, TargetReport};
pub use types::{Disposition, Shape, TagKind, TagMatch, TagSet, Variant};
