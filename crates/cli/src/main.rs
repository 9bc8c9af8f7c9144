//! CLI tool for splitting a tagged master deck into two variant decks.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use deck_core::{
    AmbiguityPolicy, Error, HostSession, PartitionConfig, PartitionMode, PartitionPlan, PartitionReport, Partitioner,
    PresentationHost, TagSet, Variant,
};
use deck_pptx::PptxHost;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

const EXTENSION: &str = "pptx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Copy tagged slides into emptied clones of the master
    Copy,
    /// Delete untagged-for-this-variant slides from clones of the master
    Prune,
}

impl From<Mode> for PartitionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Copy => PartitionMode::Copy,
            Mode::Prune => PartitionMode::Prune,
        }
    }
}

/// Split a master deck into two decks using the tag textbox on each slide.
#[derive(Parser, Debug)]
#[command(name = "deck-split")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the master deck; outputs are written here too
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Master deck to split (skips the selection prompt)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// How the target decks are built
    #[arg(short, long, value_enum, default_value_t = Mode::Copy)]
    mode: Mode,

    /// Skip slides carrying more than one tag instead of aborting
    #[arg(long)]
    permissive: bool,

    /// Prefix output names with the master's file name
    #[arg(long)]
    prefix: bool,

    /// Tag text of the first variant
    #[arg(long, default_value = deck_core::types::DEFAULT_LABEL_A)]
    label_a: String,

    /// Tag text of the second variant
    #[arg(long, default_value = deck_core::types::DEFAULT_LABEL_B)]
    label_b: String,

    /// Tag text of slides that belong to both variants
    #[arg(long, default_value = deck_core::types::DEFAULT_LABEL_BOTH)]
    label_both: String,

    /// Do not wait for Enter after an aborted run
    #[arg(long)]
    no_pause: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let tags = TagSet::new(&args.label_a, &args.label_b, &args.label_both)
        .context("Tag labels must be non-empty and distinct")?;

    let dir = absolute(&args.dir)?;
    let mut host = HostSession::new(PptxHost::start(&dir)?);

    let master = match &args.input {
        Some(input) => absolute(input)?,
        None => {
            let files = candidates(&*host, &dir, &tags)?;
            let stdin = io::stdin();
            select(&files, &mut stdin.lock(), &mut io::stderr())?
        }
    };
    if !master.is_file() {
        bail!("Master deck {} does not exist", master.display());
    }

    let plan = PartitionPlan::new(&master, &dir, &tags, args.prefix);
    let config = PartitionConfig::new()
        .with_tags(tags)
        .with_mode(args.mode.into())
        .with_policy(if args.permissive {
            AmbiguityPolicy::Permissive
        } else {
            AmbiguityPolicy::Strict
        });

    let pause = !args.no_pause;
    let mut partitioner = Partitioner::new(config).with_abort_hook(|err: &Error| {
        eprintln!("Aborting: {}", err);
        if let Some(slide) = err.slide() {
            eprintln!("Fix the tag textbox on slide {} and run again.", slide);
        }
        if pause {
            wait_for_enter();
        }
    });

    let report = partitioner
        .run(&mut *host, &plan)
        .with_context(|| format!("Failed to split {}", master.display()))?;
    drop(host);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

/// Resolve a command-line path against the current directory.
fn absolute(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Cannot access {}", path.display()))
}

/// Master deck candidates in `dir`: lock files and earlier outputs are skipped.
fn candidates<H: PresentationHost>(host: &H, dir: &Path, tags: &TagSet) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = host
        .list_files(dir, EXTENSION)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .into_iter()
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            !name.starts_with("~$") && !is_output(name, tags)
        })
        .collect();

    if files.is_empty() {
        return Err(Error::NoCandidateFiles(dir.to_path_buf()).into());
    }
    Ok(files)
}

/// Whether `name` looks like a deck this tool wrote.
fn is_output(name: &str, tags: &TagSet) -> bool {
    let Some(stem) = name
        .len()
        .checked_sub(EXTENSION.len() + 1)
        .and_then(|end| name.get(..end))
    else {
        return false;
    };
    Variant::ALL.iter().any(|&v| {
        let label = tags.label(v);
        stem == label || stem.ends_with(&format!("_{}", label))
    })
}

/// Ask for a master deck by number; a single candidate is picked without asking.
fn select<R: BufRead, W: Write>(files: &[PathBuf], input: &mut R, out: &mut W) -> Result<PathBuf> {
    if let [only] = files {
        log::info!("Using {}", only.display());
        return Ok(only.clone());
    }

    loop {
        writeln!(out, "Select the master deck:")?;
        for (i, path) in files.iter().enumerate() {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            writeln!(out, "  {}. {}", i + 1, name)?;
        }
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("No selection made");
        }
        match parse_selection(&line, files.len()) {
            Ok(index) => return Ok(files[index].clone()),
            Err(e) => writeln!(out, "{}", e)?,
        }
    }
}

fn parse_selection(line: &str, count: usize) -> deck_core::Result<usize> {
    let trimmed = line.trim();
    match trimmed.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
        _ => Err(Error::InvalidSelection(trimmed.to_string())),
    }
}

fn wait_for_enter() {
    eprint!("Press Enter to exit...");
    let _ = io::stderr().flush();
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
}

fn print_summary(report: &PartitionReport) {
    println!(
        "Split {} ({} slides, {:?} mode)",
        report.master.display(),
        report.slides_examined,
        report.mode
    );
    for target in &report.targets {
        let slides: Vec<String> = target.slides.iter().map(|s| s.to_string()).collect();
        println!(
            "  {}: {} slide(s) [{}] -> {}",
            target.label,
            target.slides.len(),
            slides.join(", "),
            target.path.display()
        );
    }
    if !report.ambiguous_slides.is_empty() {
        println!("  skipped ambiguous slides: {:?}", report.ambiguous_slides);
    }
    println!("  tag shapes removed: {}", report.tags_stripped);
    if report.failed_deletions > 0 {
        println!("  deletions that failed: {}", report.failed_deletions);
        for target in report.targets.iter().filter(|t| !t.retained_on_failure.is_empty()) {
            println!("    {} still has slide(s) {:?}", target.label, target.retained_on_failure);
        }
    }
}
