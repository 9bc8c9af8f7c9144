//! The presentation host contract.
//!
//! The partitioner never touches document bytes itself. Everything it does to
//! a deck goes through these traits, so the same algorithm drives the `.pptx`
//! host and the in-memory host used in tests.
//!
//! Slide and shape indices are 1-based, matching the host's own collections.
//! Deleting slide `i` shifts every later slide down by one.

use crate::types::Shape;
use crate::Result;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// An application that can open, copy and save presentations.
pub trait PresentationHost {
    /// Open deck handle type.
    type Deck: Deck;

    /// List files in `dir` with the given extension, sorted by name.
    fn list_files(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>>;

    /// Copy a file at the filesystem level.
    fn copy_file(&mut self, source: &Path, dest: &Path) -> Result<()>;

    /// Open a presentation.
    fn open_deck(&mut self, path: &Path) -> Result<Self::Deck>;

    /// Called once a deck has been written to `path`.
    ///
    /// Hosts that need to confirm the write (or dismiss anything the
    /// application shows after saving) do it here.
    fn after_save(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    /// Release the application.
    fn quit(&mut self) {}
}

/// An open presentation.
pub trait Deck {
    /// Number of slides currently in the deck.
    fn slide_count(&self) -> usize;

    /// Shapes on a slide, in enumeration order.
    fn shapes(&self, slide: usize) -> Result<Vec<Shape>>;

    /// Delete a slide.
    fn delete_slide(&mut self, slide: usize) -> Result<()>;

    /// Delete a shape from a slide.
    fn delete_shape(&mut self, slide: usize, shape: usize) -> Result<()>;

    /// Append a copy of `source`'s slide to the end of this deck.
    ///
    /// Returns the index of the new slide.
    fn append_slide_from(&mut self, source: &Self, slide: usize) -> Result<usize>
    where
        Self: Sized;

    /// Write the deck to `path`.
    fn save_as(&mut self, path: &Path) -> Result<()>;

    /// Close the deck without saving.
    fn close(&mut self) {}
}

/// Owns a host for the duration of a run and quits it when dropped.
pub struct HostSession<H: PresentationHost> {
    host: H,
}

impl<H: PresentationHost> HostSession<H> {
    /// Take ownership of a started host.
    pub fn new(host: H) -> Self {
        Self { host }
    }
}

impl<H: PresentationHost> Deref for HostSession<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.host
    }
}

impl<H: PresentationHost> DerefMut for HostSession<H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: PresentationHost> Drop for HostSession<H> {
    fn drop(&mut self) {
        log::debug!("Releasing presentation host");
        self.host.quit();
    }
}

/// An open deck that is closed when dropped.
pub struct OpenDeck<D: Deck> {
    deck: D,
    path: PathBuf,
}

impl<D: Deck> OpenDeck<D> {
    /// Open `path` through the host.
    pub fn open<H>(host: &mut H, path: &Path) -> Result<Self>
    where
        H: PresentationHost<Deck = D>,
    {
        let deck = host.open_deck(path)?;
        log::debug!("Opened {} ({} slides)", path.display(), deck.slide_count());
        Ok(Self {
            deck,
            path: path.to_path_buf(),
        })
    }

    /// Path the deck was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<D: Deck> Deref for OpenDeck<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.deck
    }
}

impl<D: Deck> DerefMut for OpenDeck<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.deck
    }
}

impl<D: Deck> Drop for OpenDeck<D> {
    fn drop(&mut self) {
        log::debug!("Closing {}", self.path.display());
        self.deck.close();
    }
}
