use std::{fmt, path::Path, path::PathBuf, process::ExitCode};

use owo_colors::{OwoColorize, Stream};
use tracing::error;

use crate::{
    cli::Settings,
    fetcher::{self, FetchError, FetchOptions},
    page,
    patch::{Change, PatchError, WriteMode},
    provider::Provider,
    script::{self, Block},
};

/// Which update procedure to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Variant {
    /// Metrics, citation graph and publication list.
    #[default]
    Data,
    /// Metrics and citation graph only.
    Citations,
}

impl Variant {
    fn fetch_options(self, settings: &Settings) -> FetchOptions {
        FetchOptions {
            publications: self == Self::Data,
            max_publications: settings.max_publications,
        }
    }

    const fn blocks(self) -> &'static [Block] {
        match self {
            Self::Data => &[Block::CitationSeries, Block::Publications],
            Self::Citations => &[Block::CitationSeries],
        }
    }

    const fn banner(self) -> &'static str {
        match self {
            Self::Data => "Fetching Google Scholar data...",
            Self::Citations => "Fetching Google Scholar citation data...",
        }
    }

    const fn success_line(self) -> &'static str {
        match self {
            Self::Data => "All files updated successfully!",
            Self::Citations => "Citation data updated successfully!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Page,
    Script,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => f.write_str("page"),
            Self::Script => f.write_str("script"),
        }
    }
}

#[derive(Debug)]
pub struct StageOutcome {
    pub stage: Stage,
    pub path: PathBuf,
    pub result: Result<Change, PatchError>,
}

/// Results of every patch stage of one run, in execution order.
#[derive(Debug)]
pub struct Report {
    pub outcomes: Vec<StageOutcome>,
}

impl Report {
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageOutcome> + '_ {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Fetch the profile, then patch the page and the script.
///
/// A fetch failure returns before any file is opened. Once a record exists both patch stages
/// always run, whatever the other one did.
pub fn run(
    provider: &dyn Provider,
    settings: &Settings,
    variant: Variant,
) -> Result<Report, FetchError> {
    println!("{}", variant.banner());
    let record = fetcher::fetch_record(
        provider,
        &settings.scholar_id,
        &variant.fetch_options(settings),
    )?;

    println!(
        "Found: {} citations, h-index: {}, i10-index: {}",
        record.citation_count, record.h_index, record.i10_index
    );
    if variant == Variant::Data {
        println!("Publications: {}", record.publications.len());
    }

    let mode = if settings.dry_run {
        WriteMode::DryRun
    } else {
        WriteMode::Write
    };
    let outcomes = vec![
        run_stage(Stage::Page, &settings.page, mode, || {
            page::patch_page(&settings.page, &record, mode)
        }),
        run_stage(Stage::Script, &settings.script, mode, || {
            script::patch_script(&settings.script, &record, variant.blocks(), mode)
        }),
    ];
    let report = Report { outcomes };

    println!();
    if report.succeeded() {
        println!(
            "{} {}",
            "✓".if_supports_color(Stream::Stdout, |t| t.green()),
            variant.success_line()
        );
    } else {
        let failed: Vec<String> = report
            .failures()
            .map(|o| format!("{} ({})", o.stage, o.path.display()))
            .collect();
        println!(
            "{} Some files failed to update (failed stages: {})",
            "✗".if_supports_color(Stream::Stdout, |t| t.red()),
            failed.join(", ")
        );
    }
    Ok(report)
}

fn run_stage<F>(stage: Stage, path: &Path, mode: WriteMode, patch: F) -> StageOutcome
where
    F: FnOnce() -> Result<Change, PatchError>,
{
    let result = patch();
    match &result {
        Ok(change) => {
            let (what, note) = match (mode, change) {
                (WriteMode::Write, Change::Modified) => ("Updated", ""),
                (WriteMode::Write, Change::Unchanged) => ("Updated", " (no changes)"),
                (WriteMode::DryRun, Change::Modified) => ("Would update", ""),
                (WriteMode::DryRun, Change::Unchanged) => ("Would leave", " (no changes)"),
            };
            println!(
                "{} {what} {}{note}",
                "✓".if_supports_color(Stream::Stdout, |t| t.green()),
                path.display()
            );
        }
        Err(err) => error!(%stage, path = %path.display(), "{err}"),
    }
    StageOutcome {
        stage,
        path: path.to_path_buf(),
        result,
    }
}
