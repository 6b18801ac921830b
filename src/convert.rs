use crate::batch::{Batch, BatchOutput};
use crate::error::ConvertError;
use crate::inputs::collect_inputs;
use crate::table_writer::{stage_detail, stage_summary};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

/// Everything a `convert` run needs.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub inputs: Vec<String>,
    pub dir: Option<PathBuf>,
    pub pattern: String,
    pub recursive: bool,
    pub output: PathBuf,
    pub detail_output: Option<PathBuf>,
    pub progress: bool,
}

impl ConvertOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            inputs: Vec::new(),
            dir: None,
            pattern: "*.xml".to_string(),
            recursive: false,
            output: output.into(),
            detail_output: None,
            progress: false,
        }
    }
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    match ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
    {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::debug!("Falling back to the default progress style: {e}"),
    }
    pb
}

/// Reads every input, then writes the summary table and, when requested, the
/// detail table. Nothing is written unless at least one placemark was found,
/// and both tables are fully staged before either replaces its destination.
pub fn run_convert(options: &ConvertOptions) -> Result<BatchOutput> {
    let files = collect_inputs(
        &options.inputs,
        options.dir.as_deref(),
        &options.pattern,
        options.recursive,
    )?;
    if files.is_empty() {
        return Err(ConvertError::NoInputFiles.into());
    }
    log::info!("Found {} input file(s)", files.len());

    let pb = progress_bar(files.len(), options.progress);
    let mut batch = Batch::new(options.detail_output.is_some());
    for path in &files {
        pb.set_message(path.display().to_string());
        batch.add_path(path, &pb);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let output = batch.finish()?;
    if !output.skipped.is_empty() {
        log::warn!("Skipped {} source(s)", output.skipped.len());
    }

    let summary = stage_summary(&options.output, &output.summaries)?;
    let detail = options
        .detail_output
        .as_deref()
        .map(|path| stage_detail(path, &output.details))
        .transpose()?;

    let rows = summary.persist()?;
    log::info!("Wrote {rows} summary row(s) to {}", options.output.display());
    if let (Some(detail), Some(path)) = (detail, &options.detail_output) {
        let rows = detail.persist()?;
        log::info!("Wrote {rows} detail row(s) to {}", path.display());
    }

    Ok(output)
}
