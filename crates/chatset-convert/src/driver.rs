use chatset_types::FallbackPolicy;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};
use crate::normalize::{normalize_record, ConvertOptions, Outcome, SkipReason};
use crate::samples::fallback_records;

/// Where a conversion reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertJob {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Replace `input` with the result after copying it to `<input>.bak`.
    pub in_place: bool,
    pub dry_run: bool,
}

impl ConvertJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            in_place: false,
            dry_run: false,
        }
    }

    pub fn in_place(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        Self {
            output: input.clone(),
            input,
            in_place: true,
            dry_run: false,
        }
    }

    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.input, ".bak")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    /// Records in the input array.
    pub total: usize,
    /// Records that survived normalization.
    pub converted: usize,
    pub skipped: Vec<SkippedRecord>,
    pub fallback_used: bool,
    /// Records in the written (or, for a dry run, would-be written) array.
    pub written: usize,
    pub output_path: Option<PathBuf>,
    pub backup_path: Option<PathBuf>,
}

/// Normalizes every record, keeping input order. Skips are logged and
/// returned alongside the converted records.
pub fn convert_records(
    records: &[Value],
    options: &ConvertOptions,
) -> (Vec<Value>, Vec<SkippedRecord>) {
    let mut converted = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match normalize_record(record, options) {
            Outcome::Emit(value) => {
                tracing::debug!(index, "converted record");
                converted.push(value);
            }
            Outcome::Skip(reason) => {
                tracing::warn!(index, reason = %reason, "skipping record");
                skipped.push(SkippedRecord { index, reason });
            }
        }
    }

    (converted, skipped)
}

/// Reads a whole dataset; the top level must be a JSON array.
pub fn load_records(path: &Path) -> Result<Vec<Value>> {
    let raw = fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| ConvertError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(ConvertError::NotAnArray {
            path: path.to_path_buf(),
        }),
    }
}

/// Pretty-prints with two-space indentation, leaving non-ASCII unescaped.
pub fn write_records(path: &Path, records: &[Value]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).map_err(ConvertError::Serialize)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
    }
    fs::write(path, json).map_err(|e| ConvertError::io(path, e))
}

/// Writes `records` next to `path` and renames over it. The staging file is
/// removed again when either step fails.
fn replace_records(path: &Path, records: &[Value]) -> Result<()> {
    let staging = with_suffix(path, ".tmp");
    let result = write_records(&staging, records)
        .and_then(|()| fs::rename(&staging, path).map_err(|e| ConvertError::io(path, e)));
    if result.is_err() && staging.exists() {
        if let Err(e) = fs::remove_file(&staging) {
            tracing::warn!(path = %staging.display(), error = %e, "failed to remove staging file");
        }
    }
    result
}

pub fn convert_file(job: &ConvertJob, options: &ConvertOptions) -> Result<ConversionReport> {
    let records = load_records(&job.input)?;
    tracing::info!(
        path = %job.input.display(),
        records = records.len(),
        format = %options.target,
        "loaded dataset"
    );

    let (mut output, skipped) = convert_records(&records, options);
    let mut report = ConversionReport {
        total: records.len(),
        converted: output.len(),
        skipped,
        ..Default::default()
    };

    if options.strict && !report.skipped.is_empty() {
        return Err(ConvertError::RecordsSkipped {
            count: report.skipped.len(),
        });
    }

    if output.is_empty() {
        match options.fallback {
            FallbackPolicy::Error => {
                return Err(ConvertError::NoRecords {
                    total: report.total,
                })
            }
            FallbackPolicy::Samples => {
                output = fallback_records(options.target);
                report.fallback_used = true;
                tracing::warn!(
                    samples = output.len(),
                    "no records converted, writing built-in samples"
                );
            }
            FallbackPolicy::Empty => {
                tracing::warn!("no records converted, writing an empty array");
            }
        }
    }
    report.written = output.len();

    if job.dry_run {
        tracing::info!(records = report.written, "dry run, nothing written");
        return Ok(report);
    }

    if job.in_place {
        let backup = job.backup_path();
        fs::copy(&job.input, &backup).map_err(|e| ConvertError::io(&backup, e))?;
        tracing::info!(path = %backup.display(), "backed up original dataset");

        replace_records(&job.input, &output)?;
        report.backup_path = Some(backup);
        report.output_path = Some(job.input.clone());
    } else {
        write_records(&job.output, &output)?;
        report.output_path = Some(job.output.clone());
    }

    tracing::info!(
        path = %job.output.display(),
        written = report.written,
        skipped = report.skipped.len(),
        "wrote dataset"
    );
    Ok(report)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
