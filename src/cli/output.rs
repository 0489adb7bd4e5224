//! Terminal rendering of perturbation runs and reconstruction reports
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically. Partial
//! effects and errors go to stderr; listings and reports go to stdout.

use std::fmt::Display;
use std::path::Path;

use colored::Colorize;

use crate::application::services::{
    AugmentRequest, AugmentedFile, BatchReport, PerturbOutcome, Skipped,
};
use crate::domain::perturb::StepSummary;
use crate::domain::{swc, PartialEffect, Pipeline, Tree, TreeOutline, TreeSummary};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Warn that an operator fell short on the reconstruction at `subject`.
pub fn partial(subject: &Path, effect: &PartialEffect) {
    eprintln!("{}: {}", "partial".yellow(), partial_line(subject, effect));
}

/// One completed pipeline step, indented under its output file.
pub fn step(summary: &StepSummary) {
    println!("  {} {}", "✓".green(), summary);
}

/// Report a single-file perturbation.
pub fn perturb_outcome(outcome: &PerturbOutcome, pipeline: &Pipeline, seed: u64) {
    println!("{}: {}", "Wrote".green(), outcome.output.display());
    println!(
        "  {}",
        run_line(pipeline, seed, outcome.nodes_before, outcome.nodes_after)
    );
    for summary in &outcome.steps {
        match summary.partial() {
            Some(effect) => partial(&outcome.output, effect),
            None => step(summary),
        }
    }
    println!("  sha256 {}", outcome.fingerprint);
}

/// Report a batch view run: header, one block per reconstruction, skips, totals.
pub fn batch(request: &AugmentRequest, report: &BatchReport) {
    println!("{}", batch_header(request).cyan().bold());
    for file in &report.written {
        augmented(file);
    }
    for item in &report.skipped {
        skipped(item);
    }
    println!("{}", batch_summary(report));
}

fn augmented(file: &AugmentedFile) {
    println!("{} {}", "✓".green(), file.source.display());
    for (view, steps) in file.outputs.iter().zip(&file.steps) {
        println!("  {}", view.display());
        for effect in steps.iter().filter_map(StepSummary::partial) {
            partial(view, effect);
        }
    }
}

/// A reconstruction the batch could not process.
pub fn skipped(item: &Skipped) {
    println!("  {} {}", "✗".red(), skipped_line(item));
}

/// Summary, fingerprint and optional branch outline of a loaded tree.
pub fn reconstruction(path: &Path, tree: &Tree, outline: bool) {
    println!("{}", path.display().to_string().cyan().bold());
    println!("{}", TreeSummary::of(tree));
    println!("sha256:        {}", swc::fingerprint(tree));
    if outline {
        println!("{}", tree.to_outline());
    }
}

/// A file the command created.
pub fn created(path: &Path) {
    println!("{}: {}", "Created".green(), path.display());
}

/// Uncolored text, for config dumps and path listings.
pub fn plain(msg: &(impl Display + ?Sized)) {
    println!("{}", msg);
}

fn partial_line(subject: &Path, effect: &PartialEffect) -> String {
    format!("{}: {effect}", subject.display())
}

fn run_line(pipeline: &Pipeline, seed: u64, before: usize, after: usize) -> String {
    format!("pipeline {pipeline}, seed {seed}, nodes {before} -> {after}")
}

fn skipped_line(item: &Skipped) -> String {
    format!("{}: {}", item.source.display(), item.reason)
}

fn batch_header(request: &AugmentRequest) -> String {
    format!(
        "{} views of {} reconstructions, pipeline {}, seed {}",
        request.views,
        request.inputs.len(),
        request.pipeline,
        request.seed
    )
}

fn batch_summary(report: &BatchReport) -> String {
    let partial = report
        .written
        .iter()
        .flat_map(|f| f.steps.iter().flatten())
        .filter(|s| s.partial().is_some())
        .count();
    format!(
        "{} views written, {} partial steps, {} reconstructions skipped",
        report.views_written(),
        partial,
        report.skipped.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Shortfall;
    use std::path::PathBuf;

    fn drop_step(partial: Option<PartialEffect>) -> StepSummary {
        StepSummary::Drop {
            branches: 0,
            removed: 0,
            partial,
        }
    }

    #[test]
    fn given_batch_with_partial_step_when_summarizing_then_counts_each_kind() {
        // Arrange
        let effect = PartialEffect {
            requested: 4,
            achieved: 0,
            reason: Shortfall::NoEligibleBranches,
        };
        let report = BatchReport {
            written: vec![AugmentedFile {
                source: PathBuf::from("cells/a.swc"),
                outputs: vec![PathBuf::from("a_view1.swc"), PathBuf::from("a_view2.swc")],
                fingerprints: vec!["00".into(), "11".into()],
                steps: vec![vec![drop_step(Some(effect))], vec![drop_step(None)]],
            }],
            skipped: vec![Skipped {
                source: PathBuf::from("cells/b.swc"),
                reason: "line 2: x: invalid float literal".into(),
            }],
        };

        // Act
        let summary = batch_summary(&report);

        // Assert
        assert_eq!(
            summary,
            "2 views written, 1 partial steps, 1 reconstructions skipped"
        );
        assert_eq!(
            skipped_line(&report.skipped[0]),
            "cells/b.swc: line 2: x: invalid float literal"
        );
    }

    #[test]
    fn given_partial_effect_when_rendering_then_names_file_and_reason() {
        let effect = PartialEffect {
            requested: 5,
            achieved: 3,
            reason: Shortfall::OversizedCandidates,
        };

        let line = partial_line(Path::new("out/n1_view2.swc"), &effect);

        assert!(line.starts_with("out/n1_view2.swc: removed 3 of 5"), "got {line}");
        assert!(line.contains("node budget"), "got {line}");
    }
}
