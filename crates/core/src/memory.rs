//! In-memory presentation host.
//!
//! Decks are plain values stored under virtual paths. Useful for driving the
//! partitioner without a document application, and for inspecting exactly
//! which slides and shapes ended up in each output.

use crate::host::{Deck, PresentationHost};
use crate::types::Shape;
use crate::{Error, HostOperation, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// One slide of an in-memory deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySlide {
    /// Stable identity used by assertions; not visible to the partitioner.
    pub id: String,
    /// `(name, text)` for each shape; `None` text means no text frame.
    pub shapes: Vec<(String, Option<String>)>,
}

impl MemorySlide {
    /// A slide with a title shape and no tag.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            shapes: vec![("Title 1".to_string(), Some(id.clone()))],
            id,
        }
    }

    /// A slide with a title shape and one tag textbox.
    pub fn tagged(id: impl Into<String>, tag: &str) -> Self {
        Self::new(id).with_text("Tag", tag)
    }

    /// Add a shape with text.
    pub fn with_text(mut self, name: &str, text: &str) -> Self {
        self.shapes.push((name.to_string(), Some(text.to_string())));
        self
    }

    /// Add a shape without a text frame.
    pub fn with_picture(mut self, name: &str) -> Self {
        self.shapes.push((name.to_string(), None));
        self
    }

    /// Text of every shape that has some.
    pub fn texts(&self) -> Vec<&str> {
        self.shapes.iter().filter_map(|(_, t)| t.as_deref()).collect()
    }
}

/// A stored deck: a template name plus slides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDeckData {
    /// Stands in for theme, masters and layouts.
    pub template: String,
    pub slides: Vec<MemorySlide>,
}

impl MemoryDeckData {
    /// Create a deck with the given template.
    pub fn new(template: impl Into<String>, slides: Vec<MemorySlide>) -> Self {
        Self {
            template: template.into(),
            slides,
        }
    }

    /// Slide ids in order.
    pub fn slide_ids(&self) -> Vec<&str> {
        self.slides.iter().map(|s| s.id.as_str()).collect()
    }
}

#[derive(Debug, Default)]
struct HostState {
    files: BTreeMap<PathBuf, MemoryDeckData>,
    open_decks: usize,
    quit: bool,
    saved: Vec<PathBuf>,
    fail_shape_deletes: bool,
    fail_slide_deletes: bool,
}

/// A presentation host backed by a map of virtual files.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    state: Rc<RefCell<HostState>>,
}

impl MemoryHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a deck under `path`.
    pub fn add_file(&self, path: impl Into<PathBuf>, deck: MemoryDeckData) {
        self.state.borrow_mut().files.insert(path.into(), deck);
    }

    /// The stored deck at `path`, if any.
    pub fn file(&self, path: &Path) -> Option<MemoryDeckData> {
        self.state.borrow().files.get(path).cloned()
    }

    /// Make every shape deletion fail from now on.
    pub fn fail_shape_deletes(&self, fail: bool) {
        self.state.borrow_mut().fail_shape_deletes = fail;
    }

    /// Make every slide deletion fail from now on.
    pub fn fail_slide_deletes(&self, fail: bool) {
        self.state.borrow_mut().fail_slide_deletes = fail;
    }

    /// Number of decks opened and not yet closed.
    pub fn open_decks(&self) -> usize {
        self.state.borrow().open_decks
    }

    /// Whether `quit` has been called.
    pub fn has_quit(&self) -> bool {
        self.state.borrow().quit
    }

    /// Paths written by `save_as`, in order.
    pub fn saved(&self) -> Vec<PathBuf> {
        self.state.borrow().saved.clone()
    }
}

impl PresentationHost for MemoryHost {
    type Deck = MemoryDeck;

    fn list_files(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        let state = self.state.borrow();
        Ok(state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(extension))
            })
            .cloned()
            .collect())
    }

    fn copy_file(&mut self, source: &Path, dest: &Path) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let deck = state.files.get(source).cloned().ok_or_else(|| not_found(source))?;
        state.files.insert(dest.to_path_buf(), deck);
        Ok(())
    }

    fn open_deck(&mut self, path: &Path) -> Result<MemoryDeck> {
        let mut state = self.state.borrow_mut();
        let data = state.files.get(path).cloned().ok_or_else(|| not_found(path))?;
        state.open_decks += 1;
        Ok(MemoryDeck {
            data,
            state: Rc::clone(&self.state),
            closed: false,
        })
    }

    fn quit(&mut self) {
        self.state.borrow_mut().quit = true;
    }
}

fn not_found(path: &Path) -> Error {
    Error::IoError(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    ))
}

/// An open in-memory deck.
#[derive(Debug)]
pub struct MemoryDeck {
    data: MemoryDeckData,
    state: Rc<RefCell<HostState>>,
    closed: bool,
}

impl MemoryDeck {
    /// Current contents of the deck.
    pub fn data(&self) -> &MemoryDeckData {
        &self.data
    }

    fn slide_mut(&mut self, slide: usize, op: HostOperation) -> Result<&mut MemorySlide> {
        slide
            .checked_sub(1)
            .and_then(|i| self.data.slides.get_mut(i))
            .ok_or_else(|| Error::host(op, Some(slide), "slide index out of range"))
    }
}

impl Deck for MemoryDeck {
    fn slide_count(&self) -> usize {
        self.data.slides.len()
    }

    fn shapes(&self, slide: usize) -> Result<Vec<Shape>> {
        let s = slide
            .checked_sub(1)
            .and_then(|i| self.data.slides.get(i))
            .ok_or_else(|| {
                Error::host(HostOperation::ReadShapes, Some(slide), "slide index out of range")
            })?;
        Ok(s.shapes
            .iter()
            .enumerate()
            .map(|(i, (name, text))| Shape {
                index: i + 1,
                name: name.clone(),
                text: text.clone(),
            })
            .collect())
    }

    fn delete_slide(&mut self, slide: usize) -> Result<()> {
        if self.state.borrow().fail_slide_deletes {
            return Err(Error::host(HostOperation::DeleteSlide, Some(slide), "slide is locked"));
        }
        self.slide_mut(slide, HostOperation::DeleteSlide)?;
        self.data.slides.remove(slide - 1);
        Ok(())
    }

    fn delete_shape(&mut self, slide: usize, shape: usize) -> Result<()> {
        if self.state.borrow().fail_shape_deletes {
            return Err(Error::host(
                HostOperation::DeleteShape,
                Some(slide),
                "shape is locked",
            ));
        }
        let s = self.slide_mut(slide, HostOperation::DeleteShape)?;
        if shape == 0 || shape > s.shapes.len() {
            return Err(Error::host(
                HostOperation::DeleteShape,
                Some(slide),
                format!("shape {} out of range", shape),
            ));
        }
        s.shapes.remove(shape - 1);
        Ok(())
    }

    fn append_slide_from(&mut self, source: &Self, slide: usize) -> Result<usize> {
        if source.data.template != self.data.template {
            return Err(Error::host(
                HostOperation::CopySlide,
                Some(slide),
                "source deck uses a different template",
            ));
        }
        let copy = slide
            .checked_sub(1)
            .and_then(|i| source.data.slides.get(i))
            .cloned()
            .ok_or_else(|| {
                Error::host(HostOperation::CopySlide, Some(slide), "slide index out of range")
            })?;
        self.data.slides.push(copy);
        Ok(self.data.slides.len())
    }

    fn save_as(&mut self, path: &Path) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.files.insert(path.to_path_buf(), self.data.clone());
        state.saved.push(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.borrow_mut().open_decks -= 1;
        }
    }
}
