//! Delimited-text output for the summary and detail tables.
//!
//! Both tables are UTF-8 with a byte-order-mark and CRLF line endings, so that
//! spreadsheet tools pick the encoding up without an import dialog. Each file is
//! written next to its destination and renamed into place once complete.

use crate::route::{DetailRecord, SummaryRecord};
use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy)]
pub struct TableFormat {
    pub delimiter: u8,
    pub quote_style: QuoteStyle,
}

impl TableFormat {
    pub const SUMMARY: Self = Self {
        delimiter: b',',
        quote_style: QuoteStyle::Always,
    };

    pub const DETAIL: Self = Self {
        delimiter: b'\t',
        quote_style: QuoteStyle::Necessary,
    };
}

/// A fully written table waiting in a temporary file next to its destination.
#[derive(Debug)]
pub struct StagedTable {
    file: NamedTempFile,
    path: PathBuf,
    rows: usize,
}

impl StagedTable {
    /// Renames the table into place and returns its row count.
    pub fn persist(self) -> Result<usize> {
        self.file
            .persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write output file: {}", self.path.display()))?;
        Ok(self.rows)
    }
}

fn stage_table<const N: usize>(
    path: &Path,
    format: TableFormat,
    header: &[&str; N],
    rows: impl IntoIterator<Item = [String; N]>,
) -> Result<StagedTable> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(UTF8_BOM)?;

    let mut writer = WriterBuilder::new()
        .delimiter(format.delimiter)
        .quote_style(format.quote_style)
        .terminator(Terminator::CRLF)
        .from_writer(file);
    writer.write_record(header)?;
    let mut count = 0;
    for row in rows {
        writer.write_record(&row)?;
        count += 1;
    }
    let file = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(StagedTable {
        file,
        path: path.to_path_buf(),
        rows: count,
    })
}

/// Comma-separated, every field quoted.
pub fn stage_summary(path: &Path, records: &[SummaryRecord]) -> Result<StagedTable> {
    stage_table(
        path,
        TableFormat::SUMMARY,
        &SummaryRecord::HEADER,
        records.iter().map(SummaryRecord::to_row),
    )
}

/// Tab-separated, quoted only where needed. Written with just the header when
/// there are no records.
pub fn stage_detail(path: &Path, records: &[DetailRecord]) -> Result<StagedTable> {
    stage_table(
        path,
        TableFormat::DETAIL,
        &DetailRecord::HEADER,
        records.iter().map(DetailRecord::to_row),
    )
}

pub fn write_summary(path: &Path, records: &[SummaryRecord]) -> Result<usize> {
    stage_summary(path, records)?.persist()
}

pub fn write_detail(path: &Path, records: &[DetailRecord]) -> Result<usize> {
    stage_detail(path, records)?.persist()
}
