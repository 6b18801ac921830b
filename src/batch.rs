//! Merging per-source extractions into the two output tables.

use crate::error::{ConvertError, SourceError};
use crate::inputs::{is_archive, is_xml_entry};
use crate::route::{self, DetailRecord, RouteDocument, SummaryRecord};
use crate::source_text::decode_xml;
use indicatif::ProgressBar;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// A source that contributed nothing, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub name: String,
    pub reason: String,
}

/// Accumulates records source by source. A failing source leaves both tables
/// untouched.
#[derive(Debug, Default)]
pub struct Batch {
    collect_details: bool,
    summaries: Vec<SummaryRecord>,
    details: Vec<DetailRecord>,
    parsed: usize,
    skipped: Vec<SkippedSource>,
}

/// The merged tables of a run.
#[derive(Debug)]
pub struct BatchOutput {
    pub summaries: Vec<SummaryRecord>,
    pub details: Vec<DetailRecord>,
    pub parsed: usize,
    pub skipped: Vec<SkippedSource>,
}

fn parse_source(bytes: &[u8]) -> Result<route::Extraction, SourceError> {
    let text = decode_xml(bytes)?;
    let document = RouteDocument::parse(&text)?;
    route::extract(&document)
}

impl Batch {
    pub fn new(collect_details: bool) -> Self {
        Self {
            collect_details,
            ..Self::default()
        }
    }

    /// Parses one document and appends its records. Returns the number of
    /// placemarks it contributed.
    pub fn add_source(&mut self, name: &str, bytes: &[u8]) -> Result<usize, SourceError> {
        let extraction = parse_source(bytes)?;
        let offset = self.summaries.len();
        let count = extraction.summaries.len();
        self.summaries.extend(extraction.summaries);
        if self.collect_details {
            self.details
                .extend(extraction.details.into_iter().map(|mut d| {
                    d.placemark_index += offset;
                    d
                }));
        }
        self.parsed += 1;
        log::debug!("{name}: {count} placemark(s)");
        Ok(count)
    }

    /// Records a skipped source and logs it as a warning.
    pub fn skip(&mut self, name: &str, error: &SourceError, progress: &ProgressBar) {
        progress.suspend(|| log::warn!("Skipping {name}: {error}"));
        self.skipped.push(SkippedSource {
            name: name.to_string(),
            reason: error.to_string(),
        });
    }

    /// Adds a file, or every XML entry of a zip archive.
    pub fn add_path(&mut self, path: &Path, progress: &ProgressBar) {
        let name = path.display().to_string();
        if is_archive(path) {
            if let Err(e) = self.add_archive(path, progress) {
                self.skip(&name, &e, progress);
            }
            return;
        }

        let result = fs::read(path)
            .map_err(|source| SourceError::Read {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|bytes| self.add_source(&name, &bytes));
        if let Err(e) = result {
            self.skip(&name, &e, progress);
        }
    }

    fn add_archive(&mut self, path: &Path, progress: &ProgressBar) -> Result<(), SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive = ZipArchive::new(file)?;

        let archive_len = archive.len();
        for i in 0..archive_len {
            let mut entry = match archive.by_index(i) {
                Ok(entry) => entry,
                Err(e) => {
                    self.skip(&format!("{}!#{i}", path.display()), &e.into(), progress);
                    continue;
                }
            };
            if entry.is_dir() || !is_xml_entry(entry.name()) {
                continue;
            }
            let name = format!("{}!{}", path.display(), entry.name());
            let mut bytes = Vec::new();
            let result = entry
                .read_to_end(&mut bytes)
                .map_err(|source| SourceError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            drop(entry);
            if let Err(e) = result.and_then(|_| self.add_source(&name, &bytes)) {
                self.skip(&name, &e, progress);
            }
        }
        Ok(())
    }

    /// Fails when no placemark made it into the summary table.
    pub fn finish(self) -> Result<BatchOutput, ConvertError> {
        if self.summaries.is_empty() {
            return Err(ConvertError::NoProcessableInput {
                parsed: self.parsed,
                skipped: self.skipped.len(),
            });
        }
        Ok(BatchOutput {
            summaries: self.summaries,
            details: self.details,
            parsed: self.parsed,
            skipped: self.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ONE_ROUTE: &str = r#"<Document>
      <Placemark>
        <name>A</name>
        <RouteInfo><ViaPoints>
          <ViaPoint><Position>0, 0</Position></ViaPoint>
          <ViaPoint><Position>1, 0</Position></ViaPoint>
        </ViaPoints></RouteInfo>
      </Placemark>
    </Document>"#;

    const TWO_ROUTES: &str = r#"<Document>
      <Placemark><name>B</name>
        <RouteInfo><ViaPoints>
          <ViaPoint><Position>0, 0</Position></ViaPoint>
        </ViaPoints></RouteInfo>
      </Placemark>
      <Placemark><name>C</name>
        <RouteInfo><ViaPoints>
          <ViaPoint><Position>2, 2</Position></ViaPoint>
          <ViaPoint><Position>2, 3</Position></ViaPoint>
          <ViaPoint><Position>2, 4</Position></ViaPoint>
        </ViaPoints></RouteInfo>
      </Placemark>
    </Document>"#;

    #[test]
    fn placemark_index_counts_across_sources() {
        let mut batch = Batch::new(true);
        batch.add_source("one.xml", ONE_ROUTE.as_bytes()).unwrap();
        batch.add_source("two.xml", TWO_ROUTES.as_bytes()).unwrap();
        let out = batch.finish().unwrap();

        let names: Vec<_> = out.summaries.iter().map(|s| s.metadata.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(out.details.len(), 6);
        let indexes: Vec<_> = out.details.iter().map(|d| d.placemark_index).collect();
        assert_eq!(indexes, [0, 0, 1, 2, 2, 2]);
        for detail in &out.details {
            assert_eq!(out.summaries[detail.placemark_index].metadata.name, detail.placemark_name);
        }
    }

    #[test]
    fn details_are_dropped_when_not_requested() {
        let mut batch = Batch::new(false);
        batch.add_source("two.xml", TWO_ROUTES.as_bytes()).unwrap();
        let out = batch.finish().unwrap();
        assert_eq!(out.summaries.len(), 2);
        assert!(out.details.is_empty());
    }

    #[test]
    fn failed_source_leaves_tables_untouched() {
        let progress = ProgressBar::hidden();
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.xml");
        let bad = tmp.path().join("bad.xml");
        fs::write(&good, ONE_ROUTE).unwrap();
        fs::write(&bad, "<Document><Placemark><name>X</name>").unwrap();

        let mut batch = Batch::new(true);
        batch.add_path(&bad, &progress);
        batch.add_path(&good, &progress);
        batch.add_path(&tmp.path().join("missing.xml"), &progress);
        let out = batch.finish().unwrap();

        assert_eq!(out.summaries.len(), 1);
        assert_eq!(out.details.len(), 2);
        assert_eq!(out.parsed, 1);
        assert_eq!(out.skipped.len(), 2);
        assert!(out.skipped[0].name.ends_with("bad.xml"));
        assert!(out.skipped[0].reason.contains("XML parse error"));
        assert!(out.skipped[1].reason.contains("failed to read"));
    }

    #[test]
    fn undecodable_source_contributes_nothing() {
        let mut batch = Batch::new(true);
        batch.add_source("one.xml", ONE_ROUTE.as_bytes()).unwrap();
        let corrupt = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><Document><Placemark><name>A\xFF\xFE</name></Placemark></Document>";
        assert!(matches!(
            batch.add_source("corrupt.xml", corrupt),
            Err(SourceError::Decode { .. })
        ));
        let out = batch.finish().unwrap();
        assert_eq!(out.parsed, 1);
        assert_eq!(out.summaries.len(), 1);
        assert_eq!(out.details.len(), 2);
    }

    #[test]
    fn nothing_processable_is_fatal() {
        let mut batch = Batch::new(true);
        assert!(batch.add_source("bad.xml", b"not xml").is_err());
        batch.add_source("empty.xml", b"<Document/>").unwrap();
        assert!(matches!(
            batch.finish(),
            Err(ConvertError::NoProcessableInput { parsed: 1, skipped: 0 })
        ));
    }

    #[test]
    fn archive_entries_are_separate_sources() {
        let progress = ProgressBar::hidden();
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("routes.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive_path).unwrap());
            let options = zip::write::FileOptions::default();
            zip.start_file("routes/one.xml", options).unwrap();
            zip.write_all(ONE_ROUTE.as_bytes()).unwrap();
            zip.start_file("routes/readme.txt", options).unwrap();
            zip.write_all(b"ignored").unwrap();
            zip.start_file("routes/broken.xml", options).unwrap();
            zip.write_all(b"<Document>").unwrap();
            zip.start_file("routes/two.XML", options).unwrap();
            zip.write_all(TWO_ROUTES.as_bytes()).unwrap();
            zip.finish().unwrap();
        }

        let mut batch = Batch::new(true);
        batch.add_path(&archive_path, &progress);
        let out = batch.finish().unwrap();
        assert_eq!(out.summaries.len(), 3);
        assert_eq!(out.parsed, 2);
        assert_eq!(out.skipped.len(), 1);
        assert!(out.skipped[0].name.ends_with("routes.zip!routes/broken.xml"));
    }

    #[test]
    fn corrupt_archive_is_skipped() {
        let progress = ProgressBar::hidden();
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("broken.zip");
        fs::write(&archive_path, b"PK not really").unwrap();

        let mut batch = Batch::new(false);
        batch.add_path(&archive_path, &progress);
        assert!(matches!(
            batch.finish(),
            Err(ConvertError::NoProcessableInput { parsed: 0, skipped: 1 })
        ));
    }
}
