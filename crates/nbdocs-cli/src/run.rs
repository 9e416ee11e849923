//! Batch run for the nbdocs CLI.
//!
//! Wires the Jupyter engines and the gallery converter into a batch pass and
//! prints a summary.

use std::path::Path;
use std::time::Instant;

use nbdocs_core::{
    JupyterExecutor, JupyterToolchain, NbconvertRstExporter, OsFileSystem, ProcessReport,
    Services, process,
};
use nbdocs_gallery::GalleryConverter;

use crate::colors;
use crate::config::Settings;

/// Process `path` with the resolved settings.
pub fn execute(path: &Path, settings: &Settings) -> anyhow::Result<ProcessReport> {
    let start = Instant::now();

    let toolchain = if settings.needs_jupyter() {
        let toolchain = JupyterToolchain::new()?;
        tracing::debug!("Using jupyter at {}", toolchain.jupyter_path().display());
        toolchain
    } else {
        // Never invoked: nothing in this run executes or exports.
        JupyterToolchain::with_path("jupyter")
    };

    let executor = JupyterExecutor::new(toolchain.clone());
    let exporter = NbconvertRstExporter::new(toolchain);
    let scripts = GalleryConverter::new();
    let services = Services {
        fs: &OsFileSystem,
        executor: &executor,
        exporter: &exporter,
        scripts: &scripts,
    };

    print_header(path, settings);
    let report = process(path, &settings.options, &settings.converter, services)?;
    print_summary(&report, start.elapsed().as_secs_f64());

    Ok(report)
}

fn print_header(path: &Path, settings: &Settings) {
    let options = &settings.options;
    let steps: Vec<&str> = [
        (options.link, "link"),
        (options.colab, "colab"),
        (options.execute, "execute"),
        (options.rst, "rst"),
        (options.cleanup, "cleanup"),
    ]
    .into_iter()
    .filter_map(|(enabled, name)| enabled.then_some(name))
    .collect();

    println!(
        "\n{}nbdocs{} - {}",
        colors::BOLD,
        colors::RESET,
        path.display()
    );
    println!(
        "{}steps: {}{}",
        colors::DIM,
        if steps.is_empty() { "none".to_string() } else { steps.join(", ") },
        colors::RESET
    );
    println!("{}", "─".repeat(50));
}

fn print_summary(report: &ProcessReport, seconds: f64) {
    println!("\n{}", "─".repeat(50));

    let rows = [
        ("executed", report.executed),
        ("up to date", report.up_to_date),
        ("errored", report.errored),
        ("materialized", report.materialized),
        ("converted", report.converted),
        ("colab copies", report.cloud_copies),
        ("linked", report.linked),
        ("unexecuted", report.unexecuted),
        ("deleted", report.deleted),
    ];
    let mut quiet = true;
    for (label, count) in rows.into_iter().filter(|(_, count)| *count > 0) {
        println!("  {:<14}{}", label, count);
        quiet = false;
    }
    if quiet {
        println!(
            "  {}nothing to do ({} files skipped){}",
            colors::CYAN,
            report.skipped,
            colors::RESET
        );
    }

    for failure in &report.failures {
        println!(
            "  {}✗{} {}",
            colors::RED,
            colors::RESET,
            failure.display()
        );
    }

    let (color, verdict) = if report.errored > 0 {
        (colors::YELLOW, "Finished with errors")
    } else {
        (colors::GREEN, "Completed")
    };
    println!(
        "{}{}{} in {:.2}s",
        color,
        verdict,
        colors::RESET,
        seconds
    );
}
