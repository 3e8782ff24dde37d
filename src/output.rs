//! Structured output writer supporting JSON Lines and human-readable modes.

use crate::cli_style::{
    batch_summary_table, format_bytes, format_duration, format_rate, BatchSummary, Icons, Theme,
};
use crate::core::{
    BucketStatus, BucketUsage, DestinationOutcome, EventSink, FileUrls, QuotaCheck, UploadEvent,
    UploadResult, UrlReport,
};
use crate::error::{Result, UploadError, EXIT_PARTIAL, EXIT_SUCCESS};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;

/// Output mode for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// A failed file or URL, flattened for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportFailure {
    pub file_name: String,
    pub category: String,
    pub error: String,
}

impl ReportFailure {
    fn new(file_name: &str, error: &UploadError) -> Self {
        Self {
            file_name: file_name.to_string(),
            category: error.category().to_string(),
            error: sanitize_error(&error.to_string()),
        }
    }
}

/// Issued URLs with the context needed to use them later
#[derive(Debug, Clone, Serialize)]
pub struct UrlSummary {
    pub destination: String,
    pub bucket: String,
    pub endpoint: String,
    pub presign_ttl_secs: u64,
    pub generated_at: DateTime<Utc>,
    pub urls: Vec<FileUrls>,
    #[serde(rename = "url_failures")]
    pub failures: Vec<ReportFailure>,
}

impl UrlSummary {
    pub fn new(
        destination: &str,
        bucket: &str,
        endpoint: &str,
        presign_ttl_secs: u64,
        report: &UrlReport,
    ) -> Self {
        Self {
            destination: destination.to_string(),
            bucket: bucket.to_string(),
            endpoint: endpoint.to_string(),
            presign_ttl_secs,
            generated_at: Utc::now(),
            urls: report.entries.clone(),
            failures: report
                .failures
                .iter()
                .map(|f| ReportFailure::new(&f.file_name, &f.error))
                .collect(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Process exit code for a URL-only run
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            EXIT_PARTIAL
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Report of one destination of an upload run
#[derive(Debug, Clone, Serialize)]
pub struct DestinationReport {
    pub provider: String,
    /// Why the destination was left out, when it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_status: Option<BucketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_usage: Option<BucketUsage>,
    /// Space left under the size limit after the upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_bytes: Option<u64>,
    pub files_uploaded: usize,
    pub files_failed: usize,
    pub total_bytes: u64,
    pub duration_secs: f64,
    pub average_rate_bytes_per_sec: f64,
    pub failures: Vec<ReportFailure>,
    #[serde(flatten)]
    pub urls: UrlSummary,
}

impl DestinationReport {
    pub fn new(provider: &str, result: &UploadResult, urls: UrlSummary) -> Self {
        Self {
            provider: provider.to_string(),
            skipped: None,
            bucket_status: None,
            quota: None,
            final_usage: None,
            remaining_bytes: None,
            files_uploaded: result.uploaded.len(),
            files_failed: result.failures.len(),
            total_bytes: result.uploaded_bytes(),
            duration_secs: result.elapsed.as_secs_f64(),
            average_rate_bytes_per_sec: result.average_rate(),
            failures: result
                .failures
                .iter()
                .map(|f| ReportFailure::new(&f.file_name, &f.error))
                .collect(),
            urls,
        }
    }

    /// Report of one destination of a finished pipeline run
    pub fn from_outcome(provider: &str, outcome: &DestinationOutcome, urls: UrlSummary) -> Self {
        let mut report = Self::new(provider, &outcome.upload, urls)
            .with_quota(outcome.quota())
            .with_final_usage(outcome.final_usage);
        report.bucket_status = outcome.bucket_status();
        report.skipped = outcome
            .skip_reason()
            .map(|e| sanitize_error(&e.to_string()));
        report
    }

    pub fn with_bucket_status(mut self, status: BucketStatus) -> Self {
        self.bucket_status = Some(status);
        self
    }

    pub fn with_quota(mut self, quota: Option<QuotaCheck>) -> Self {
        self.quota = quota;
        self.update_remaining();
        self
    }

    pub fn with_final_usage(mut self, usage: Option<BucketUsage>) -> Self {
        self.final_usage = usage;
        self.update_remaining();
        self
    }

    fn update_remaining(&mut self) {
        self.remaining_bytes = match (self.quota, self.final_usage) {
            (Some(quota), Some(usage)) => Some(quota.limit.saturating_sub(usage.bytes)),
            (Some(quota), None) => Some(quota.remaining_after()),
            (None, _) => None,
        };
    }

    pub fn name(&self) -> &str {
        &self.urls.destination
    }

    pub fn has_failures(&self) -> bool {
        self.skipped.is_some() || self.files_failed > 0 || self.urls.has_failures()
    }
}

/// Final report of an upload run, one section per destination
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    /// Files found in the source directory
    pub files: usize,
    /// Bytes found in the source directory
    pub source_bytes: u64,
    pub destinations: Vec<DestinationReport>,
}

impl UploadReport {
    pub fn new(files: usize, source_bytes: u64, destinations: Vec<DestinationReport>) -> Self {
        Self {
            files,
            source_bytes,
            destinations,
        }
    }

    /// Uploads that succeeded, summed over destinations
    pub fn files_uploaded(&self) -> usize {
        self.destinations.iter().map(|d| d.files_uploaded).sum()
    }

    /// URL summaries of the destinations that received files
    pub fn url_summaries(&self) -> Vec<UrlSummary> {
        self.destinations
            .iter()
            .filter(|d| d.files_uploaded > 0)
            .map(|d| d.urls.clone())
            .collect()
    }

    /// 0 when everything succeeded (or there was nothing to do), 1 when a
    /// destination was skipped or some files or URLs failed
    pub fn exit_code(&self) -> i32 {
        if self.destinations.iter().any(DestinationReport::has_failures) {
            EXIT_PARTIAL
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Contents of a JSON URL file
#[derive(Serialize)]
struct UrlFile<'a> {
    destinations: &'a [UrlSummary],
}

/// One line of JSON output
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum OutputRecord<'a> {
    Report(&'a UploadReport),
    Urls(&'a UrlSummary),
    Error {
        category: String,
        message: String,
        exit_code: i32,
    },
}

/// Structured output writer that supports both human-readable and JSON output
#[derive(Debug, Clone)]
pub struct OutputWriter {
    pub mode: OutputMode,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            mode: if json { OutputMode::Json } else { OutputMode::Human },
        }
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Event sink matching the output mode
    pub fn event_sink(&self, verbose: bool) -> Box<dyn EventSink> {
        match self.mode {
            OutputMode::Json => Box::new(JsonLinesSink::new(io::stdout())),
            OutputMode::Human => Box::new(crate::cli_progress::ConsoleRenderer::stdout(verbose)),
        }
    }

    /// Print the final report of an upload run
    pub fn upload_report(&self, report: &UploadReport) {
        match self.mode {
            OutputMode::Json => print_json_line(&OutputRecord::Report(report)),
            OutputMode::Human => print!("{}", render_upload_report(report)),
        }
    }

    /// Print issued URLs without an upload
    pub fn url_summary(&self, summary: &UrlSummary) {
        match self.mode {
            OutputMode::Json => print_json_line(&OutputRecord::Urls(summary)),
            OutputMode::Human => print!("{}", render_urls(summary)),
        }
    }

    /// Print an error message
    pub fn error(&self, err: &UploadError) {
        match self.mode {
            OutputMode::Json => {
                let record = OutputRecord::Error {
                    category: err.category().to_string(),
                    message: sanitize_error(&err.to_string()),
                    exit_code: err.exit_code(),
                };
                if let Ok(json) = serde_json::to_string(&record) {
                    eprintln!("{}", json);
                }
            }
            OutputMode::Human => {
                crate::cli_style::print_error(&sanitize_error(&err.to_string()), hint_for(err));
            }
        }
    }

    /// Print an info message (suppressed in JSON mode)
    pub fn info(&self, msg: &str) {
        if !self.is_json() {
            crate::cli_style::print_info(msg);
        }
    }

    /// Print a success message (suppressed in JSON mode)
    pub fn success(&self, msg: &str) {
        if !self.is_json() {
            crate::cli_style::print_success(msg);
        }
    }

    /// Print a warning (suppressed in JSON mode)
    pub fn warning(&self, msg: &str) {
        if !self.is_json() {
            crate::cli_style::print_warning(msg);
        }
    }

    /// Save issued URLs grouped by destination: plain text, or JSON in
    /// JSON mode
    pub fn save_urls(&self, path: &Path, summaries: &[UrlSummary]) -> Result<()> {
        let contents = match self.mode {
            OutputMode::Json => serde_json::to_string_pretty(&UrlFile {
                destinations: summaries,
            })?,
            OutputMode::Human => render_url_file(summaries),
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn print_json_line<T: Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        println!("{}", json);
    }
}

fn hint_for(err: &UploadError) -> Option<&'static str> {
    match err {
        UploadError::Config(_) => Some("Run 'oci-uploader init' or pass the missing options"),
        UploadError::BucketCheck { .. } => {
            Some("Check the access key, the namespace/endpoint and network access")
        }
        UploadError::QuotaExceeded { .. } => {
            Some("Raise max_size_gb or remove objects from the bucket")
        }
        _ if err.is_transient() => Some("The failure looks temporary; re-run the command"),
        _ => None,
    }
}

/// Writes every upload event as one JSON object per line
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &UploadEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(self.out, "{}", json);
        }
    }
}

/// Human rendering of an upload report
pub fn render_upload_report(report: &UploadReport) -> String {
    let mut out = String::new();
    for destination in &report.destinations {
        out.push_str(&render_destination(destination));
    }
    out
}

fn render_destination(report: &DestinationReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "\n{} {}",
        Icons::CLOUD,
        Theme::header(format!("[{}]", report.name()))
    );
    let _ = writeln!(out, "   Endpoint: {}", report.urls.endpoint);
    let _ = writeln!(out, "   Bucket:   {}", report.urls.bucket);

    if let Some(reason) = &report.skipped {
        let _ = writeln!(
            out,
            "{} {}",
            Theme::warning(Icons::WARNING),
            Theme::warning(format!("Skipped: {}", reason))
        );
        return out;
    }

    if report.bucket_status == Some(BucketStatus::Created) {
        let _ = writeln!(
            out,
            "{} Created bucket '{}'",
            Theme::success(Icons::SUCCESS),
            report.urls.bucket
        );
    }

    let summary = BatchSummary {
        files_uploaded: report.files_uploaded,
        files_failed: report.files_failed,
        urls_failed: report.urls.failures.len(),
        total_size: format_bytes(report.total_bytes),
        duration: format_duration(report.duration_secs),
        speed: format_rate(report.average_rate_bytes_per_sec),
    };
    let _ = writeln!(out, "\n{}", batch_summary_table(&summary));

    match (report.final_usage, report.quota) {
        (Some(usage), quota) => {
            let _ = writeln!(
                out,
                "{} Final bucket size: {} in {} objects",
                Icons::STATS,
                format_bytes(usage.bytes),
                usage.objects
            );
            if let (Some(quota), Some(remaining)) = (quota, report.remaining_bytes) {
                let _ = writeln!(
                    out,
                    "{} Remaining space: {} of {}",
                    Icons::STATS,
                    format_bytes(remaining),
                    format_bytes(quota.limit)
                );
            }
        }
        (None, Some(quota)) => {
            let _ = writeln!(
                out,
                "{} Bucket usage after upload: {} of {} ({} left)",
                Icons::STATS,
                format_bytes(quota.total_after()),
                format_bytes(quota.limit),
                format_bytes(quota.remaining_after())
            );
        }
        (None, None) => {}
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\n{}", Theme::error("Failed uploads"));
        for failure in &report.failures {
            let _ = writeln!(
                out,
                "  {} {}: {}",
                Theme::error(Icons::ERROR),
                failure.file_name,
                failure.error
            );
        }
    }

    out.push_str(&render_urls(&report.urls));
    out
}

/// Human rendering of issued URLs, both kinds per file
pub fn render_urls(summary: &UrlSummary) -> String {
    let mut out = String::new();

    if !summary.urls.is_empty() {
        let _ = writeln!(
            out,
            "\n{} {} {}",
            Icons::LINK,
            Theme::header("Retrieval URLs"),
            Theme::muted(format!("[{}]", summary.destination))
        );
        let _ = writeln!(out, "{}", Theme::muted("─".repeat(50)));
        for entry in &summary.urls {
            let _ = writeln!(out, "{} {}", Icons::BULLET, Theme::bold(&entry.file_name));
            if let Some(public) = &entry.public {
                let _ = writeln!(out, "   Public:     {}", Theme::primary(&public.url));
            }
            if let Some(presigned) = &entry.presigned {
                let _ = writeln!(out, "   Pre-signed: {}", Theme::primary(&presigned.url));
                if let Some(expires) = presigned.expires_at {
                    let _ = writeln!(
                        out,
                        "   {}",
                        Theme::muted(format!("Expires {}", expires.format("%Y-%m-%d %H:%M UTC")))
                    );
                }
            }
        }
    }

    if summary.has_failures() {
        let _ = writeln!(out, "\n{}", Theme::warning("URLs not generated"));
        for failure in &summary.failures {
            let _ = writeln!(
                out,
                "  {} {}: {}",
                Theme::warning(Icons::WARNING),
                failure.file_name,
                failure.error
            );
        }
    }

    out
}

/// Plain-text URL file, one block per destination
pub fn render_url_file(summaries: &[UrlSummary]) -> String {
    let rule = "=".repeat(70);
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "RETRIEVAL URLs");
    let _ = writeln!(out, "{}", rule);
    if let Some(first) = summaries.first() {
        let _ = writeln!(
            out,
            "Generated: {}",
            first.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    for summary in summaries {
        let _ = writeln!(out, "\n{}", "-".repeat(70));
        let _ = writeln!(out, "Destination: {}", summary.destination);
        let _ = writeln!(out, "Endpoint: {}", summary.endpoint);
        let _ = writeln!(out, "Bucket: {}", summary.bucket);
        let _ = writeln!(out, "{}\n", "-".repeat(70));

        for entry in &summary.urls {
            let _ = writeln!(out, "File: {}", entry.file_name);
            if let Some(public) = &entry.public {
                let _ = writeln!(out, "Public URL: {}", public.url);
            }
            if let Some(presigned) = &entry.presigned {
                let _ = writeln!(out, "Pre-signed URL: {}", presigned.url);
            }
            out.push('\n');
        }

        for failure in &summary.failures {
            let _ = writeln!(out, "FAILED: {}: {}", failure.file_name, failure.error);
        }
    }

    if let Some(first) = summaries.first() {
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(
            out,
            "NOTE: Pre-signed URLs expire {} ({} seconds) after generation",
            format_duration(first.presign_ttl_secs as f64),
            first.presign_ttl_secs
        );
    }
    let _ = writeln!(out, "{}", rule);
    out
}

/// Sanitize error messages by collapsing whitespace
pub fn sanitize_error(msg: &str) -> String {
    msg.split_whitespace().collect::<Vec<&str>>().join(" ")
}
