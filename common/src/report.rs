use std::{
    fmt,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use eyre::{Context, Result};
use regex::Regex;
use tokio::fs::{read_to_string, write};
use tracing::{debug, error};

use crate::{
    format::{FieldValue, fixed_width},
    util::find_files,
};

pub const REPORT_FILENAME: &str = "fio_result.RHS";
pub const SUMMARY_FILENAME: &str = "test_summary";
/// block size, iodepth, threads, bandwidth, IOPS, latency
pub const DATA_FIELDS: usize = 6;
/// Fields copied verbatim from the first report, the rest are averaged.
const LEADING_FIELDS: usize = 3;

static DATA_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.?\d*\|").expect("data line pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Column names, or a category marker
    Header,
    Data,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub kind: LineKind,
    pub fields: Vec<String>,
}

impl ReportLine {
    pub fn header<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: LineKind::Header,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn data<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: LineKind::Data,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Classifies a line read back from disk.
    ///
    /// Whitespace is dropped first. A line is data when it starts with a number directly
    /// followed by a pipe, so a header whose first column name is numeric is read as data.
    pub fn parse(line: &str) -> Self {
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let fields = compact
            .split('|')
            .filter(|field| !field.is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>();
        let kind = if DATA_LINE_REGEX.is_match(&compact) {
            LineKind::Data
        } else {
            LineKind::Header
        };
        Self { kind, fields }
    }

    fn value(&self, idx: usize) -> Option<f64> {
        self.fields.get(idx)?.parse().ok()
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            write!(f, "{}|", fixed_width(field.as_str()))?;
        }
        Ok(())
    }
}

/// Output of a single benchmark repetition.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    pub lines: Vec<ReportLine>,
}

impl Report {
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(ReportLine::parse).collect(),
        }
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let content = read_to_string(path)
            .await
            .context(format!("Reading report {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Problems found while aggregating. None of them stop the aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralMismatch {
    LineCount {
        report: usize,
        expected: usize,
        found: usize,
    },
    FieldCount {
        line: usize,
        found: usize,
    },
    MissingValue {
        report: usize,
        line: usize,
        field: usize,
    },
}

impl fmt::Display for StructuralMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralMismatch::LineCount {
                report,
                expected,
                found,
            } => write!(
                f,
                "Unmatched data: report {report} has {found} lines, expected {expected}"
            ),
            StructuralMismatch::FieldCount { line, found } => write!(
                f,
                "Wrong data length on line {line}: {found} fields, expected {DATA_FIELDS}"
            ),
            StructuralMismatch::MissingValue {
                report,
                line,
                field,
            } => write!(
                f,
                "Report {report} has no numeric value for field {field} on line {line}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub lines: Vec<String>,
    pub inputs: usize,
    pub issues: Vec<StructuralMismatch>,
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

fn report_issue(issues: &mut Vec<StructuralMismatch>, issue: StructuralMismatch) {
    error!("{issue}");
    issues.push(issue);
}

/// Averages bandwidth, IOPS and latency of every data line across `reports`.
///
/// Returns `None` for fewer than two reports. The first report decides the line
/// count, the line kinds, the header text and the leading columns of each data line.
/// Each mean is divided by the number of reports that supplied a numeric value for
/// that field, which is the set size unless a `MissingValue` was recorded.
pub fn aggregate(reports: &[Report]) -> Option<SummaryReport> {
    let (first, rest) = reports.split_first()?;
    if rest.is_empty() {
        return None;
    }

    let mut issues = Vec::new();
    for (idx, report) in reports.iter().enumerate().skip(1) {
        if report.len() != first.len() {
            report_issue(
                &mut issues,
                StructuralMismatch::LineCount {
                    report: idx,
                    expected: first.len(),
                    found: report.len(),
                },
            );
        }
    }

    let mut lines = Vec::with_capacity(first.len());
    for (line_idx, line) in first.lines.iter().enumerate() {
        if line.kind == LineKind::Header {
            lines.push(line.to_string());
            continue;
        }

        if line.fields.len() != DATA_FIELDS {
            report_issue(
                &mut issues,
                StructuralMismatch::FieldCount {
                    line: line_idx,
                    found: line.fields.len(),
                },
            );
            if line.fields.len() < DATA_FIELDS {
                lines.push(line.to_string());
                continue;
            }
        }

        let mut output = String::new();
        for field in &line.fields[..LEADING_FIELDS] {
            output.push_str(&fixed_width(field.as_str()));
            output.push('|');
        }

        for field in LEADING_FIELDS..DATA_FIELDS {
            let mut sum = 0.0;
            let mut count = 0usize;
            for (report_idx, report) in reports.iter().enumerate() {
                match report.lines.get(line_idx).and_then(|l| l.value(field)) {
                    Some(value) => {
                        sum += value;
                        count += 1;
                    }
                    None => report_issue(
                        &mut issues,
                        StructuralMismatch::MissingValue {
                            report: report_idx,
                            line: line_idx,
                            field,
                        },
                    ),
                }
            }
            let value = if count == 0 {
                FieldValue::from("-")
            } else {
                FieldValue::Float(sum / count as f64)
            };
            output.push_str(&value.to_string());
            output.push('|');
        }
        lines.push(output);
    }

    Some(SummaryReport {
        lines,
        inputs: reports.len(),
        issues,
    })
}

/// Aggregates every report found below `result_dir` into `result_dir/test_summary`.
///
/// Returns the summary path, or `None` when fewer than two reports exist.
pub async fn summarize_dir(result_dir: &Path) -> Result<Option<PathBuf>> {
    let files = find_files(result_dir, REPORT_FILENAME)?;
    debug!("Report files: {files:?}");

    let mut reports = Vec::with_capacity(files.len());
    for file in &files {
        reports.push(Report::read(file).await?);
    }

    let Some(summary) = aggregate(&reports) else {
        debug!("{} report(s) found, skipping summary", reports.len());
        return Ok(None);
    };

    let summary_path = result_dir.join(SUMMARY_FILENAME);
    write(&summary_path, summary.to_string())
        .await
        .context(format!("Writing summary {}", summary_path.display()))?;
    Ok(Some(summary_path))
}
