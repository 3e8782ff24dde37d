/*!
 * CLI progress renderer for interactive terminal display
 *
 * Receives upload events and renders them as console output: a single
 * progress line per file and destination, rewritten in place, with rate
 * and ETA.
 */

use crate::cli_style::{format_bytes, format_duration, format_rate, Icons, Theme};
use crate::core::progress::{EventSink, ProgressSnapshot, UploadEvent};
use std::io::{self, Write};

const BAR_WIDTH: usize = 30;

/// Renders upload events to a terminal
pub struct ConsoleRenderer<W: Write = io::Stdout> {
    out: W,
    verbose: bool,
    line_open: bool,
}

impl ConsoleRenderer<io::Stdout> {
    /// Render to standard output
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            line_open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn handle_event(&mut self, event: &UploadEvent) -> io::Result<()> {
        match event {
            UploadEvent::BatchStarted {
                directory,
                files,
                total_bytes,
            } => {
                writeln!(
                    self.out,
                    "\n{} Uploading {} file(s), {} from {}",
                    Icons::FOLDER,
                    Theme::value(files),
                    format_bytes(*total_bytes),
                    directory.display()
                )?;
            }

            UploadEvent::FileStarted {
                file_name,
                index,
                count,
                total_bytes,
                destination,
            } => {
                write!(
                    self.out,
                    "\n{} [{}/{}] {} ({})",
                    Icons::FILE,
                    index + 1,
                    count,
                    Theme::bold(file_name),
                    format_bytes(*total_bytes)
                )?;
                match destination {
                    Some(name) => writeln!(
                        self.out,
                        " {} {}",
                        Icons::ARROW_RIGHT,
                        Theme::primary(name)
                    )?,
                    None => writeln!(self.out)?,
                }
            }

            UploadEvent::Progress(snapshot) => {
                write!(self.out, "\r   {}", progress_line(snapshot))?;
                self.out.flush()?;
                self.line_open = true;
            }

            UploadEvent::FileCompleted {
                bytes, duration_ms, ..
            } => {
                self.close_line()?;
                let secs = *duration_ms as f64 / 1000.0;
                let rate = if secs > 0.0 { *bytes as f64 / secs } else { 0.0 };
                writeln!(
                    self.out,
                    "   {} Complete: {} in {} ({})",
                    Theme::success(Icons::SUCCESS),
                    format_bytes(*bytes),
                    format_duration(secs),
                    format_rate(rate)
                )?;
            }

            UploadEvent::FileFailed {
                error,
                bytes_transferred,
                ..
            } => {
                self.close_line()?;
                writeln!(
                    self.out,
                    "   {} Failed after {}: {}",
                    Theme::error(Icons::ERROR),
                    format_bytes(*bytes_transferred),
                    Theme::error(error)
                )?;
            }

            UploadEvent::BatchCompleted {
                succeeded,
                failed,
                total_bytes,
                duration_ms,
                destination,
            } => {
                self.close_line()?;
                if self.verbose {
                    let label = destination
                        .as_deref()
                        .map(|name| format!("[{}] ", name))
                        .unwrap_or_default();
                    writeln!(
                        self.out,
                        "\n{} {}{} uploaded, {} failed, {} in {}",
                        Icons::STATS,
                        label,
                        succeeded,
                        failed,
                        format_bytes(*total_bytes),
                        format_duration(*duration_ms as f64 / 1000.0)
                    )?;
                }
            }
        }

        Ok(())
    }

    fn close_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        Ok(())
    }
}

impl<W: Write> EventSink for ConsoleRenderer<W> {
    fn emit(&mut self, event: &UploadEvent) {
        // A closed stdout must not abort the upload
        let _ = self.handle_event(event);
    }
}

/// One-line rendering of a snapshot: bar, percent, bytes, rate and ETA
pub fn progress_line(snapshot: &ProgressSnapshot) -> String {
    let percent = snapshot.percent();
    let eta = match snapshot.eta_secs {
        Some(secs) => format_duration(secs),
        None => "--".to_string(),
    };

    format!(
        "{} {:>5.1}%  {}/{}  {:>12}  ETA {}",
        progress_bar(percent, BAR_WIDTH),
        percent,
        format_bytes(snapshot.bytes_transferred),
        format_bytes(snapshot.total_bytes),
        format_rate(snapshot.rate_bytes_per_sec),
        eta
    )
}

/// Text progress bar
fn progress_bar(percentage: f64, width: usize) -> String {
    let filled = (((percentage / 100.0) * width as f64) as usize).min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}
