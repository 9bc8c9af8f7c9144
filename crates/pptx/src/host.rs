//! File-backed presentation host for `.pptx` packages.
//!
//! Each open deck holds its whole package in memory; nothing touches the
//! file again until [`Deck::save_as`]. Paths are used as given, so relative
//! paths resolve against the process working directory.

use crate::package::{Package, CONTENT_TYPES, SLIDE_CONTENT_TYPE};
use crate::presentation::{self, SlideRef};
use crate::rels::{self, Relationships};
use crate::slide;
use deck_core::{Deck, Error, HostOperation, PresentationHost, Result, Shape};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Presentation host that edits `.pptx` files directly.
#[derive(Debug)]
pub struct PptxHost {
    work_dir: PathBuf,
}

impl PptxHost {
    /// Start a host for the decks in `work_dir`.
    pub fn start(work_dir: impl Into<PathBuf>) -> Result<Self> {
        let work_dir = work_dir.into();
        if !work_dir.is_dir() {
            return Err(Error::HostUnavailable(format!(
                "{} is not an accessible directory",
                work_dir.display()
            )));
        }
        log::debug!("PPTX host started in {}", work_dir.display());
        Ok(Self { work_dir })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Whether both paths exist and are the same file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl PresentationHost for PptxHost {
    type Deck = PptxDeck;

    fn list_files(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if matches && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn copy_file(&mut self, source: &Path, dest: &Path) -> Result<()> {
        if is_same_file(source, dest) {
            return Err(Error::host(
                HostOperation::CopyFile,
                None,
                format!("{} and {} are the same file", source.display(), dest.display()),
            ));
        }
        fs::copy(source, dest).map_err(|e| {
            Error::host(
                HostOperation::CopyFile,
                None,
                format!("{} -> {}: {}", source.display(), dest.display(), e),
            )
        })?;
        Ok(())
    }

    fn open_deck(&mut self, path: &Path) -> Result<PptxDeck> {
        PptxDeck::open(path)
    }

    /// Confirm the written file reads back as a package with the same slides.
    fn after_save(&mut self, path: &Path) -> Result<()> {
        let deck = PptxDeck::open(path).map_err(|e| {
            Error::CorruptedFile(format!("{} did not read back after saving: {}", path.display(), e))
        })?;
        log::debug!("Verified {} ({} slides)", path.display(), deck.slide_count());
        Ok(())
    }

    fn quit(&mut self) {
        log::debug!("PPTX host stopped");
    }
}

/// A slide-to-slide link on a copied slide whose destination has not been
/// copied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingLink {
    part: String,
    rel_id: String,
    /// Linked slide part in the source deck.
    source_target: String,
}

/// An open `.pptx` deck.
#[derive(Debug, Clone)]
pub struct PptxDeck {
    package: Package,
    presentation_part: String,
    slides: Vec<SlideRef>,
    /// Copied slide part -> the source slide part it came from.
    origins: BTreeMap<String, String>,
    pending_links: Vec<PendingLink>,
}

impl PptxDeck {
    /// Open a `.pptx` file.
    pub fn open(path: &Path) -> Result<Self> {
        let package = Package::open(path)
            .map_err(|e| Error::host(HostOperation::OpenDeck, None, format!("{}: {}", path.display(), e)))?;
        Self::from_package(package)
    }

    /// Wrap an already loaded package.
    pub fn from_package(package: Package) -> Result<Self> {
        let package_rels = match package.part("_rels/.rels") {
            Some(_) => Some(Relationships::parse(&package.xml("_rels/.rels")?)?),
            None => None,
        };
        let presentation_part = presentation::presentation_part(package_rels.as_ref());

        let mut deck = Self {
            package,
            presentation_part,
            slides: Vec::new(),
            origins: BTreeMap::new(),
            pending_links: Vec::new(),
        };
        deck.reload_slides()?;
        Ok(deck)
    }

    /// The underlying package.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Slide part names in presentation order.
    pub fn slide_parts(&self) -> Vec<&str> {
        self.slides.iter().map(|s| s.part.as_str()).collect()
    }

    fn reload_slides(&mut self) -> Result<()> {
        let xml = self.package.xml(&self.presentation_part)?;
        let rels = self.read_rels(&self.presentation_part)?;
        self.slides = presentation::slide_list(&xml, &self.presentation_part, &rels)?;
        Ok(())
    }

    fn read_rels(&self, part: &str) -> Result<Relationships> {
        let rels_part = rels::rels_part_for(part);
        if self.package.contains(&rels_part) {
            Relationships::parse(&self.package.xml(&rels_part)?)
        } else {
            Ok(Relationships::default())
        }
    }

    fn write_rels(&mut self, part: &str, rels: &Relationships) {
        let rels_part = rels::rels_part_for(part);
        if rels.is_empty() {
            self.package.remove_part(&rels_part);
        } else {
            self.package.set_part(rels_part, rels.to_xml());
        }
    }

    fn slide_ref(&self, slide: usize, op: HostOperation) -> Result<&SlideRef> {
        slide
            .checked_sub(1)
            .and_then(|i| self.slides.get(i))
            .ok_or_else(|| {
                Error::host(
                    op,
                    Some(slide),
                    format!("deck has {} slide(s)", self.slides.len()),
                )
            })
    }

    /// Remove a part together with its relationships and content type.
    fn drop_part(&mut self, part: &str) -> Result<()> {
        self.package.remove_part(part);
        self.package.remove_part(&rels::rels_part_for(part));
        self.package.remove_override(part)
    }

    /// A slide part name that is not taken yet, next to `like`.
    fn next_slide_part(&self, like: &str) -> String {
        let dir = like.rsplit_once('/').map(|(d, _)| d).unwrap_or("ppt/slides");
        let prefix = format!("{}/slide", dir);
        let max = self
            .package
            .part_names()
            .filter_map(|name| name.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.strip_suffix(".xml"))
            .filter_map(|n| n.parse::<usize>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{}.xml", prefix, max + 1)
    }

    /// The slide part in this deck that holds `source_part` of `source`.
    ///
    /// Copied slides are found through their origin. A slide this deck
    /// already had counts only while its bytes still equal the source's.
    fn counterpart(&self, source: &PptxDeck, source_part: &str) -> Option<String> {
        if let Some((part, _)) = self.origins.iter().find(|(_, origin)| origin.as_str() == source_part) {
            return Some(part.clone());
        }
        let untouched = !self.origins.contains_key(source_part)
            && self.package.part(source_part).is_some()
            && self.package.part(source_part) == source.package.part(source_part);
        untouched.then(|| source_part.to_string())
    }

    /// Point links that were waiting for `source_part` at its copy `part`.
    fn resolve_pending_links(&mut self, source_part: &str, part: &str) -> Result<()> {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_links)
            .into_iter()
            .partition(|link| link.source_target == source_part);
        self.pending_links = waiting;

        for link in ready {
            let mut link_rels = self.read_rels(&link.part)?;
            if let Some(rel) = link_rels.get_mut(&link.rel_id) {
                rel.target = rels::relative_target(&link.part, part);
            }
            self.write_rels(&link.part, &link_rels);
            log::debug!("Linked {} to {}", link.part, part);
        }
        Ok(())
    }

    /// Copy a part (and what it depends on) from `source` when this package
    /// does not have it yet.
    fn import_part(&mut self, source: &PptxDeck, part: &str, seen: &mut HashSet<String>) -> Result<()> {
        if self.package.contains(part) || !seen.insert(part.to_string()) {
            return Ok(());
        }
        let data = source
            .package
            .part(part)
            .ok_or_else(|| Error::CorruptedFile(format!("source part '{}' not found", part)))?
            .to_vec();
        self.package.set_part(part, data);
        if let Some(content_type) = source.package.content_type_override(part)? {
            self.package.set_override(part, &content_type)?;
        }

        let part_rels = source.read_rels(part)?;
        for rel in part_rels.iter().filter(|r| !r.external) {
            let target = rels::resolve_target(part, &rel.target);
            self.import_part(source, &target, seen)?;
        }
        if !part_rels.is_empty() {
            self.write_rels(part, &part_rels);
        }
        log::debug!("Imported part {}", part);
        Ok(())
    }

    /// Remove every part that no internal relationship chain from the
    /// package root reaches, and return their names.
    pub fn drop_unreachable_parts(&mut self) -> Result<Vec<String>> {
        let mut reachable = BTreeSet::new();
        let mut queue = vec![String::new()];
        while let Some(part) = queue.pop() {
            for rel in self.read_rels(&part)?.iter().filter(|r| !r.external) {
                let target = rel.target.split('#').next().unwrap_or_default();
                let target = rels::resolve_target(&part, target);
                if self.package.contains(&target) {
                    if reachable.insert(target.clone()) {
                        queue.push(target);
                    }
                } else if rels::is_type(&rel.rel_type, rels::SLIDE)
                    && !self.pending_links.iter().any(|l| l.part == part && l.rel_id == rel.id)
                {
                    log::warn!("{} links to {}, which is not in this deck", part, target);
                }
            }
        }

        let unreachable: Vec<String> = self
            .package
            .part_names()
            .filter(|name| {
                *name != CONTENT_TYPES
                    && !reachable.contains(*name)
                    && !rels::rels_owner(name).is_some_and(|owner| owner.is_empty() || reachable.contains(&owner))
            })
            .map(str::to_string)
            .collect();

        for part in &unreachable {
            self.package.remove_part(part);
            self.package.remove_override(part)?;
        }
        if !unreachable.is_empty() {
            log::debug!("Dropped {} unreferenced part(s)", unreachable.len());
        }
        Ok(unreachable)
    }
}

impl Deck for PptxDeck {
    fn slide_count(&self) -> usize {
        self.slides.len()
    }

    fn shapes(&self, slide: usize) -> Result<Vec<Shape>> {
        let part = &self.slide_ref(slide, HostOperation::ReadShapes)?.part;
        let xml = self.package.xml(part)?;
        slide::read_shapes(&xml).map_err(|e| Error::host(HostOperation::ReadShapes, Some(slide), e))
    }

    fn delete_slide(&mut self, slide: usize) -> Result<()> {
        let target = self.slide_ref(slide, HostOperation::DeleteSlide)?.clone();

        let xml = self.package.xml(&self.presentation_part)?;
        let xml = presentation::remove_slide_id(&xml, target.id)?;
        self.package.set_part(self.presentation_part.clone(), xml);

        let mut pres_rels = self.read_rels(&self.presentation_part)?;
        pres_rels.remove(&target.rel_id);
        let pres_part = self.presentation_part.clone();
        self.write_rels(&pres_part, &pres_rels);

        // Notes belong to exactly one slide and go with it.
        let slide_rels = self.read_rels(&target.part)?;
        for rel in slide_rels.iter().filter(|r| !r.external && rels::is_type(&r.rel_type, rels::NOTES_SLIDE)) {
            let notes = rels::resolve_target(&target.part, &rel.target);
            self.drop_part(&notes)?;
        }
        self.drop_part(&target.part)?;
        self.origins.remove(&target.part);
        self.pending_links.retain(|l| l.part != target.part);

        self.slides.remove(slide - 1);
        log::debug!("Deleted slide {} ({})", slide, target.part);
        Ok(())
    }

    fn delete_shape(&mut self, slide: usize, shape: usize) -> Result<()> {
        let part = self.slide_ref(slide, HostOperation::DeleteShape)?.part.clone();
        let xml = self.package.xml(&part)?;
        let updated =
            slide::delete_shape(&xml, shape).map_err(|e| Error::host(HostOperation::DeleteShape, Some(slide), e))?;
        self.package.set_part(part, updated);
        Ok(())
    }

    fn append_slide_from(&mut self, source: &Self, slide: usize) -> Result<usize> {
        let src = source.slide_ref(slide, HostOperation::CopySlide)?;
        let data = source
            .package
            .part(&src.part)
            .ok_or_else(|| Error::host(HostOperation::CopySlide, Some(slide), "slide part missing"))?
            .to_vec();

        // Keep the source name when it is free so links between copies stay valid.
        let new_part = if self.package.contains(&src.part) {
            self.next_slide_part(&src.part)
        } else {
            src.part.clone()
        };
        let mut seen = HashSet::new();
        let mut new_rels = Relationships::default();
        for rel in source.read_rels(&src.part)?.iter() {
            let mut rel = rel.clone();
            if !rel.external {
                if rels::is_type(&rel.rel_type, rels::NOTES_SLIDE) {
                    continue;
                }
                let target = rels::resolve_target(&src.part, &rel.target);
                if rels::is_type(&rel.rel_type, rels::SLIDE) {
                    match self.counterpart(source, &target) {
                        Some(part) => rel.target = rels::relative_target(&new_part, &part),
                        None => self.pending_links.push(PendingLink {
                            part: new_part.clone(),
                            rel_id: rel.id.clone(),
                            source_target: target,
                        }),
                    }
                } else {
                    self.import_part(source, &target, &mut seen)?;
                }
            }
            new_rels.push(rel);
        }

        self.package.set_part(new_part.clone(), data);
        self.write_rels(&new_part, &new_rels);
        let content_type = source
            .package
            .content_type_override(&src.part)?
            .unwrap_or_else(|| SLIDE_CONTENT_TYPE.to_string());
        self.package.set_override(&new_part, &content_type)?;
        self.origins.insert(new_part.clone(), src.part.clone());
        self.resolve_pending_links(&src.part, &new_part)?;

        let src_rel_type = source
            .read_rels(&source.presentation_part)?
            .get(&src.rel_id)
            .map(|r| r.rel_type.clone())
            .unwrap_or_else(|| rels::full_type(rels::SLIDE));
        let mut pres_rels = self.read_rels(&self.presentation_part)?;
        let rel_id = pres_rels.add(src_rel_type, rels::relative_target(&self.presentation_part, &new_part));
        let pres_part = self.presentation_part.clone();
        self.write_rels(&pres_part, &pres_rels);

        let id = presentation::next_slide_id(&self.slides);
        let xml = self.package.xml(&self.presentation_part)?;
        let xml = presentation::append_slide_id(&xml, id, &rel_id)?;
        self.package.set_part(pres_part, xml);

        self.reload_slides()?;
        log::debug!("Copied slide {} from {} to {}", slide, src.part, new_part);
        Ok(self.slides.len())
    }

    fn save_as(&mut self, path: &Path) -> Result<()> {
        for link in &self.pending_links {
            log::warn!(
                "{} links to {} in the master, which is not in {}",
                link.part,
                link.source_target,
                path.display()
            );
        }
        self.drop_unreachable_parts()?;
        self.package
            .save(path)
            .map_err(|e| Error::host(HostOperation::SaveDeck, None, format!("{}: {}", path.display(), e)))
    }
}
