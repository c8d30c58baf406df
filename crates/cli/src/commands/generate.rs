use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde_json::{json, Value};
use solquote_core::config::{AppConfig, LoadOptions};
use solquote_core::{
    ChartLayout, Company, CompanyId, GenerationJob, MultiOfferGenerator, StandardCalculationEngine,
};
use solquote_pdf::{
    load_chart_dir, package_offers, shared_chart_cache, DirectoryAttachmentResolver,
    ExtendedPdfGenerator, PdfOfferRenderer,
};
use tracing::{info, warn};

use crate::commands::catalog::load_catalog;
use crate::commands::{runtime, CommandResult};

#[derive(Clone, Debug)]
pub struct GenerateArgs {
    pub job: PathBuf,
    pub output: Option<PathBuf>,
    pub charts_dir: Option<PathBuf>,
}

/// Reads a job file. A job without `settings.pdf.chart_layout` gets the
/// configured default layout.
pub fn read_job(path: &Path, default_layout: ChartLayout) -> Result<GenerationJob> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read job file `{}`", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("job file `{}` is not valid JSON", path.display()))?;
    let has_layout = value.pointer("/settings/pdf/chart_layout").is_some();

    let mut job: GenerationJob = serde_json::from_value(value).with_context(|| {
        format!("job file `{}` does not describe a generation job", path.display())
    })?;
    if !has_layout {
        job.settings.pdf.chart_layout = default_layout;
    }
    Ok(job)
}

/// Companies in job order; an empty selection means every company.
pub fn select_companies(
    companies: &[Company],
    requested: &[CompanyId],
) -> std::result::Result<Vec<Company>, Vec<CompanyId>> {
    if requested.is_empty() {
        return Ok(companies.to_vec());
    }

    let mut selected = Vec::with_capacity(requested.len());
    let mut unknown = Vec::new();
    for id in requested {
        match companies.iter().find(|company| company.id == *id) {
            Some(company) => selected.push(company.clone()),
            None => unknown.push(*id),
        }
    }
    if unknown.is_empty() {
        Ok(selected)
    } else {
        Err(unknown)
    }
}

fn default_archive_path(output_dir: &Path, run_prefix: &str) -> PathBuf {
    output_dir.join(format!("Angebote_{run_prefix}.zip"))
}

pub fn run(args: GenerateArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "generate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let job = match read_job(&args.job, config.pdf.default_chart_layout) {
        Ok(job) => job,
        Err(error) => {
            return CommandResult::failure("generate", "job_input", format!("{error:#}"), 2);
        }
    };

    let analysis = match &args.charts_dir {
        Some(dir) => match load_chart_dir(dir) {
            Ok(charts) => charts,
            Err(error) => {
                return CommandResult::failure(
                    "generate",
                    "job_input",
                    format!("could not read charts from `{}`: {error}", dir.display()),
                    2,
                );
            }
        },
        None => BTreeMap::new(),
    };

    let runtime = match runtime("generate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let snapshot = match runtime.block_on(load_catalog(&config)) {
        Ok(snapshot) => snapshot,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("generate", error_class, message, exit_code);
        }
    };

    let companies = match select_companies(&snapshot.companies, &job.company_ids) {
        Ok(companies) if companies.is_empty() => {
            return CommandResult::failure(
                "generate",
                "domain_validation",
                "no companies to generate offers for",
                2,
            );
        }
        Ok(companies) => companies,
        Err(unknown) => {
            let ids = unknown.iter().map(|id| id.0.to_string()).collect::<Vec<_>>().join(", ");
            return CommandResult::failure(
                "generate",
                "domain_validation",
                format!("unknown company ids: {ids}"),
                2,
            );
        }
    };

    let resolver = DirectoryAttachmentResolver::new(
        &config.paths.datasheet_dir,
        &config.paths.company_docs_base_dir,
        snapshot.catalog.products(),
        &snapshot.documents,
    );
    let chart_cache = shared_chart_cache(config.pdf.chart_cache_max_size);
    let extended =
        ExtendedPdfGenerator::new(resolver, config.financing.clone()).with_chart_cache(chart_cache);
    let mut renderer = match PdfOfferRenderer::new(extended) {
        Ok(renderer) => renderer.with_analysis(analysis),
        Err(error) => {
            return CommandResult::failure("generate", "rendering", error.to_string(), 6);
        }
    };

    let mut generator =
        MultiOfferGenerator::new(StandardCalculationEngine::default(), Local::now().date_naive());
    let report = generator.generate(
        &job.project,
        &job.settings,
        &companies,
        &snapshot.catalog,
        &mut renderer,
    );
    let run_prefix: String = report.run_id.simple().to_string().chars().take(8).collect();

    let archive_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_archive_path(&config.paths.output_dir, &run_prefix));
    let cache_stats = match chart_cache.lock() {
        Ok(cache) => cache.stats(),
        Err(poisoned) => poisoned.into_inner().stats(),
    };
    let mut details = json!({
        "run_id": report.run_id,
        "archive": Value::Null,
        "offers": report.offers,
        "failures": report.failures,
        "pdf_summaries": renderer.summaries(),
        "chart_cache": cache_stats,
    });

    let archive = match package_offers(&report.offers) {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(
                event_name = "cli.generate.package_failed",
                run_id = %report.run_id,
                error = %error,
                "no archive written"
            );
            return CommandResult::partial(
                "generate",
                format!("no offer archive written: {error}"),
                details,
                7,
            );
        }
    };
    if let Err(error) = write_archive(&archive_path, &archive) {
        return CommandResult::failure("generate", "output_io", format!("{error:#}"), 8);
    }
    details["archive"] = json!(archive_path.display().to_string());

    info!(
        event_name = "cli.generate.completed",
        run_id = %report.run_id,
        offers = report.offers.len(),
        failures = report.failures.len(),
        archive = %archive_path.display(),
        "offer archive written"
    );

    let message = format!(
        "{} of {} offers written to {}",
        report.offers.len(),
        companies.len(),
        archive_path.display()
    );
    if report.is_complete() {
        CommandResult::success_with_details("generate", message, Some(details))
    } else {
        CommandResult::partial("generate", message, details, 7)
    }
}

fn write_archive(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create output directory `{}`", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("could not write archive `{}`", path.display()))
}
