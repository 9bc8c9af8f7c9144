//! Deck partitioning.
//!
//! Two algorithms converge the target decks to their slide subsets:
//!
//! - [`PartitionMode::Copy`] clones the master once per target, empties the
//!   clones, then walks the master forward and appends each slide to the
//!   decks it belongs to. Every slide is classified once and the master is
//!   never modified.
//! - [`PartitionMode::Prune`] clones the master once per target and deletes
//!   the slides that do not belong, walking each clone from the last slide to
//!   the first so deletions never shift a slide that is still to be visited.
//!
//! Targets are saved only after every slide has been processed. A
//! classification error therefore never leaves a saved output that reflects
//! partial classification.

use crate::classify::{AmbiguityPolicy, Classification, Resolver};
use crate::host::{Deck, OpenDeck, PresentationHost};
use crate::matcher::TagMatcher;
use crate::types::{TagMatch, TagSet, Variant};
use crate::{Error, HostOperation, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Which partitioning algorithm to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionMode {
    /// Copy slides from the master into emptied clones.
    #[default]
    Copy,
    /// Delete slides from full clones of the master.
    Prune,
}

/// Settings fixed for the duration of a run.
#[derive(Debug, Clone, Default)]
pub struct PartitionConfig {
    tags: TagSet,
    policy: AmbiguityPolicy,
    mode: PartitionMode,
}

impl PartitionConfig {
    /// Default labels, strict policy, copy mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom tag labels.
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Set the ambiguity policy.
    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the partitioning algorithm.
    pub fn with_mode(mut self, mode: PartitionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    pub fn mode(&self) -> PartitionMode {
        self.mode
    }
}

/// One output deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub variant: Variant,
    pub path: PathBuf,
}

/// The master deck and where each variant is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub master: PathBuf,
    pub targets: [Target; 2],
}

impl PartitionPlan {
    /// Name the outputs after their labels, in `out_dir`.
    ///
    /// With `prefix`, each name starts with the master's file stem:
    /// `quarterly.pptx` gives `quarterly_test-oriented.pptx`.
    pub fn new(master: impl Into<PathBuf>, out_dir: &Path, tags: &TagSet, prefix: bool) -> Self {
        let master = master.into();
        let stem = master
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("deck")
            .to_string();
        let ext = master
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("pptx")
            .to_string();

        let target = |variant: Variant| {
            let label = tags.label(variant);
            let name = if prefix {
                format!("{}_{}.{}", stem, label, ext)
            } else {
                format!("{}.{}", label, ext)
            };
            Target {
                variant,
                path: out_dir.join(name),
            }
        };

        Self {
            targets: [target(Variant::A), target(Variant::B)],
            master,
        }
    }

    /// Output path for a variant.
    pub fn path_for(&self, variant: Variant) -> &Path {
        &self.targets[variant_slot(variant)].path
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionReport {
    pub mode: PartitionMode,
    pub policy: AmbiguityPolicy,
    pub master: PathBuf,
    /// Number of slides in the master deck.
    pub slides_examined: usize,
    pub targets: Vec<TargetReport>,
    /// Master slides skipped because they carried several tags.
    pub ambiguous_slides: Vec<usize>,
    /// Tag shapes removed from output slides.
    pub tags_stripped: usize,
    /// Shape or slide deletions the host refused.
    pub failed_deletions: usize,
}

/// What ended up in one output deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    pub variant: Variant,
    pub label: String,
    pub path: PathBuf,
    /// Master slide indices, in output order.
    pub slides: Vec<usize>,
    /// Slides in `slides` that belong to the other variant but could not be
    /// deleted. Their tags are still removed.
    pub retained_on_failure: Vec<usize>,
}

impl PartitionReport {
    fn new(config: &PartitionConfig, plan: &PartitionPlan) -> Self {
        Self {
            mode: config.mode,
            policy: config.policy,
            master: plan.master.clone(),
            slides_examined: 0,
            targets: plan
                .targets
                .iter()
                .map(|t| TargetReport {
                    variant: t.variant,
                    label: config.tags.label(t.variant).to_string(),
                    path: t.path.clone(),
                    slides: Vec::new(),
                    retained_on_failure: Vec::new(),
                })
                .collect(),
            ambiguous_slides: Vec::new(),
            tags_stripped: 0,
            failed_deletions: 0,
        }
    }

    /// The report for one variant.
    pub fn target(&self, variant: Variant) -> &TargetReport {
        &self.targets[variant_slot(variant)]
    }

    fn target_mut(&mut self, variant: Variant) -> &mut TargetReport {
        &mut self.targets[variant_slot(variant)]
    }

    fn note_ambiguous(&mut self, slide: usize) {
        if !self.ambiguous_slides.contains(&slide) {
            self.ambiguous_slides.push(slide);
            self.ambiguous_slides.sort_unstable();
        }
    }
}

fn variant_slot(variant: Variant) -> usize {
    match variant {
        Variant::A => 0,
        Variant::B => 1,
    }
}

type AbortHook<'a> = Box<dyn FnMut(&Error) + 'a>;

/// Splits a master deck into its two variants.
pub struct Partitioner<'a> {
    config: PartitionConfig,
    matcher: TagMatcher,
    resolver: Resolver,
    abort_hook: Option<AbortHook<'a>>,
}

impl<'a> Partitioner<'a> {
    /// Create a partitioner.
    pub fn new(config: PartitionConfig) -> Self {
        Self {
            matcher: TagMatcher::new(config.tags.clone()),
            resolver: Resolver::new(config.tags.clone(), config.policy),
            config,
            abort_hook: None,
        }
    }

    /// Run `hook` when a classification error aborts the run, while every
    /// deck is still open.
    pub fn with_abort_hook(mut self, hook: impl FnMut(&Error) + 'a) -> Self {
        self.abort_hook = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Produce both target decks.
    pub fn run<H: PresentationHost>(&mut self, host: &mut H, plan: &PartitionPlan) -> Result<PartitionReport> {
        for target in &plan.targets {
            if same_file(&target.path, &plan.master) {
                return Err(Error::host(
                    HostOperation::CopyFile,
                    None,
                    format!("output {} would overwrite the master deck", target.path.display()),
                ));
            }
        }

        log::info!(
            "Splitting {} ({:?} mode, {:?} policy)",
            plan.master.display(),
            self.config.mode,
            self.config.policy
        );

        let mut report = PartitionReport::new(&self.config, plan);
        match self.config.mode {
            PartitionMode::Copy => self.run_copy(host, plan, &mut report)?,
            PartitionMode::Prune => self.run_prune(host, plan, &mut report)?,
        }

        for target in &report.targets {
            log::info!(
                "{}: {} slide(s) -> {}",
                target.label,
                target.slides.len(),
                target.path.display()
            );
        }
        Ok(report)
    }

    fn run_prune<H: PresentationHost>(
        &mut self,
        host: &mut H,
        plan: &PartitionPlan,
        report: &mut PartitionReport,
    ) -> Result<()> {
        let mut decks = clone_targets(host, plan)?;

        let mut outcome = Ok(());
        for (target, deck) in plan.targets.iter().zip(decks.iter_mut()) {
            outcome = self.prune_target(&mut **deck, target.variant, report);
            if outcome.is_err() {
                break;
            }
        }
        self.settle(outcome)?;

        save_targets(host, plan, &mut decks)
    }

    fn prune_target<D: Deck>(&self, deck: &mut D, variant: Variant, report: &mut PartitionReport) -> Result<()> {
        let count = deck.slide_count();
        report.slides_examined = count;
        let mut kept = Vec::new();
        let mut retained = Vec::new();

        for slide in (1..=count).rev() {
            let matches = self.matcher.match_slide(&*deck, slide)?;
            let class = self.resolver.classify(slide, &matches)?;
            let disposition = class.disposition_for(variant);
            log::debug!("[{:?}] slide {}: {:?}", variant, slide, disposition);

            if class == Classification::Ambiguous {
                report.note_ambiguous(slide);
            }

            if disposition.is_kept() {
                strip_tags(deck, slide, &matches, report);
                kept.push(slide);
            } else if let Err(e) = deck.delete_slide(slide) {
                log::warn!(
                    "Could not delete slide {} from the {:?} deck, keeping it untagged: {}",
                    slide,
                    variant,
                    e
                );
                report.failed_deletions += 1;
                strip_tags(deck, slide, &matches, report);
                kept.push(slide);
                retained.push(slide);
            }
        }

        kept.reverse();
        retained.reverse();
        let target = report.target_mut(variant);
        target.slides = kept;
        target.retained_on_failure = retained;
        Ok(())
    }

    fn run_copy<H: PresentationHost>(
        &mut self,
        host: &mut H,
        plan: &PartitionPlan,
        report: &mut PartitionReport,
    ) -> Result<()> {
        let mut decks = clone_targets(host, plan)?;
        for deck in decks.iter_mut() {
            clear_slides(&mut **deck)?;
        }

        let master = OpenDeck::open(host, &plan.master)?;
        let outcome = self.copy_slides(&*master, &mut decks, report);
        self.settle(outcome)?;
        drop(master);

        save_targets(host, plan, &mut decks)
    }

    fn copy_slides<D: Deck>(
        &self,
        master: &D,
        decks: &mut [OpenDeck<D>],
        report: &mut PartitionReport,
    ) -> Result<()> {
        let count = master.slide_count();
        report.slides_examined = count;

        for slide in 1..=count {
            let matches = self.matcher.match_slide(master, slide)?;
            let class = self.resolver.classify(slide, &matches)?;
            if class == Classification::Ambiguous {
                report.note_ambiguous(slide);
                continue;
            }

            for variant in class.targets() {
                log::debug!("slide {} -> {:?} ({:?})", slide, variant, class.disposition_for(variant));
                let deck = &mut *decks[variant_slot(variant)];
                let copied = deck.append_slide_from(master, slide)?;
                strip_tags(deck, copied, &matches, report);
                report.target_mut(variant).slides.push(slide);
            }
        }
        Ok(())
    }

    /// Give the abort hook a look at classification errors before the decks
    /// are released.
    fn settle(&mut self, outcome: Result<()>) -> Result<()> {
        if let Err(err) = &outcome {
            if err.is_classification() {
                log::error!("{}", err);
                if let Some(hook) = self.abort_hook.as_mut() {
                    hook(err);
                }
            }
        }
        outcome
    }
}

/// Whether two paths name the same file. Existing files (or the directory a
/// new file would land in) are compared after resolving links and `.`
/// segments; anything else is compared component by component.
fn same_file(a: &Path, b: &Path) -> bool {
    match (canonical(a), canonical(b)) {
        (Some(a), Some(b)) => a == b,
        _ => lexical(a) == lexical(b),
    }
}

fn canonical(path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = path.canonicalize() {
        return Some(resolved);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    parent.canonicalize().ok().map(|dir| dir.join(name))
}

fn lexical(path: &Path) -> PathBuf {
    path.components().filter(|c| !matches!(c, Component::CurDir)).collect()
}

fn clone_targets<H: PresentationHost>(host: &mut H, plan: &PartitionPlan) -> Result<Vec<OpenDeck<H::Deck>>> {
    for target in &plan.targets {
        host.copy_file(&plan.master, &target.path)?;
    }
    plan.targets
        .iter()
        .map(|target| OpenDeck::open(host, &target.path))
        .collect()
}

fn clear_slides<D: Deck>(deck: &mut D) -> Result<()> {
    for slide in (1..=deck.slide_count()).rev() {
        deck.delete_slide(slide)?;
    }
    Ok(())
}

fn save_targets<H: PresentationHost>(
    host: &mut H,
    plan: &PartitionPlan,
    decks: &mut [OpenDeck<H::Deck>],
) -> Result<()> {
    for (target, deck) in plan.targets.iter().zip(decks.iter_mut()) {
        deck.save_as(&target.path)?;
        host.after_save(&target.path)?;
        log::debug!("Saved {}", target.path.display());
    }
    Ok(())
}

/// Remove tag shapes from a surviving slide, highest index first.
fn strip_tags<D: Deck>(deck: &mut D, slide: usize, matches: &[TagMatch], report: &mut PartitionReport) {
    let mut indices: Vec<usize> = matches.iter().map(|m| m.shape_index).collect();
    indices.sort_unstable_by(|a, b| b.cmp(a));

    for index in indices {
        match deck.delete_shape(slide, index) {
            Ok(()) => report.tags_stripped += 1,
            Err(e) => {
                log::warn!("Could not remove tag shape {} from slide {}: {}", index, slide, e);
                report.failed_deletions += 1;
            }
        }
    }
}
