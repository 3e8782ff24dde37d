/*!
 * CLI style system
 *
 * Shared styling for console output: themed text, icons, boxes, tables
 * and human-readable sizes and durations.
 */

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

// ============================================================================
// THEME COLORS
// ============================================================================

/// Brand colors for consistent styling
pub struct Theme;

impl Theme {
    /// Primary accent color (cyan/blue)
    pub fn primary<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    /// Success color (green)
    pub fn success<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    /// Warning color (yellow)
    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    /// Error color (red)
    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    /// Muted/secondary text (dim)
    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    /// Bold text
    pub fn bold<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).bold()
    }

    /// Header style (bold cyan)
    pub fn header<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }

    /// Value/number highlight (bold white)
    pub fn value<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).white().bold()
    }
}

// ============================================================================
// ICONS
// ============================================================================

/// Unicode icons for visual feedback
pub struct Icons;

impl Icons {
    // Status icons
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";

    // Feature icons
    pub const CLOUD: &'static str = "☁";
    pub const FOLDER: &'static str = "📁";
    pub const FILE: &'static str = "📄";
    pub const LINK: &'static str = "🔗";
    pub const STATS: &'static str = "📊";

    // Arrow indicators
    pub const ARROW_RIGHT: &'static str = "→";
    pub const BULLET: &'static str = "•";
}

// ============================================================================
// BOX DRAWING
// ============================================================================

/// Draw a styled header box
pub fn header_box(title: &str, subtitle: Option<&str>) {
    let width = 64;
    let top = format!("╔{}╗", "═".repeat(width));
    let bottom = format!("╚{}╝", "═".repeat(width));

    println!("{}", Theme::primary(&top));

    let title_display = format!("{} {}", Icons::CLOUD, title);
    print_centered(&title_display, width, |s| Theme::header(s).to_string());

    if let Some(sub) = subtitle {
        print_centered(sub, width, |s| Theme::muted(s).to_string());
    }

    println!("{}", Theme::primary(&bottom));
}

fn print_centered(text: &str, width: usize, paint: impl Fn(&str) -> String) {
    let len = text.chars().count();
    let padding = width.saturating_sub(len) / 2;
    println!(
        "{}{}{}{}{}",
        Theme::primary("║"),
        " ".repeat(padding),
        paint(text),
        " ".repeat(width.saturating_sub(padding + len)),
        Theme::primary("║")
    );
}

// ============================================================================
// TABLES
// ============================================================================

/// Create a styled data table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a minimal table (no outer borders)
pub fn create_minimal_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a key-value table for stats
pub fn stats_table(items: &[(&str, String)]) -> Table {
    let mut table = create_minimal_table();

    for (key, value) in items {
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(value)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
        ]);
    }

    table
}

/// Batch summary data
pub struct BatchSummary {
    pub files_uploaded: usize,
    pub files_failed: usize,
    pub urls_failed: usize,
    pub total_size: String,
    pub duration: String,
    pub speed: String,
}

/// Create a batch summary table
pub fn batch_summary_table(stats: &BatchSummary) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        Cell::new("Upload Summary")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);

    table.add_row(vec![
        Cell::new("Files Uploaded"),
        Cell::new(stats.files_uploaded.to_string())
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);

    if stats.files_failed > 0 {
        table.add_row(vec![
            Cell::new("Files Failed"),
            Cell::new(stats.files_failed.to_string())
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
        ]);
    }

    if stats.urls_failed > 0 {
        table.add_row(vec![
            Cell::new("URLs Failed"),
            Cell::new(stats.urls_failed.to_string()).fg(Color::Yellow),
        ]);
    }

    table.add_row(vec![
        Cell::new("Total Size"),
        Cell::new(stats.total_size.as_str())
            .fg(Color::White)
            .add_attribute(Attribute::Bold),
    ]);

    table.add_row(vec![
        Cell::new("Duration"),
        Cell::new(stats.duration.as_str()).fg(Color::White),
    ]);

    table.add_row(vec![
        Cell::new("Average Speed"),
        Cell::new(stats.speed.as_str())
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
    ]);

    table
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let base = 1024.0_f64;
    let exp = (bytes_f.ln() / base.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f / base.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.2} {}", value, UNITS[exp])
    }
}

/// Format a byte rate into human-readable string
pub fn format_rate(bytes_per_sec: f64) -> String {
    if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
        return "0 B/s".to_string();
    }
    format!("{}/s", format_bytes(bytes_per_sec as u64))
}

/// Format duration into human-readable string
///
/// Rounds before picking the unit, so 59.96s reads "1m 0s" rather than "60.0s".
pub fn format_duration(secs: f64) -> String {
    if !secs.is_finite() || secs <= 0.0 {
        return "0ms".to_string();
    }

    let millis = (secs * 1000.0).round() as u64;
    if millis < 1000 {
        return format!("{}ms", millis);
    }

    let tenths = (secs * 10.0).round() as u64;
    if tenths < 600 {
        return format!("{}.{}s", tenths / 10, tenths % 10);
    }

    let total = secs.round() as u64;
    if total < 3600 {
        format!("{}m {}s", total / 60, total % 60)
    } else {
        format!("{}h {}m", total / 3600, (total % 3600) / 60)
    }
}

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
    eprintln!();
}

/// Print a styled warning message
pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

/// Print a styled success message
pub fn print_success(message: &str) {
    println!(
        "{} {}",
        Theme::success(Icons::SUCCESS.to_string()),
        Theme::success(message)
    );
}

/// Print a styled info message
pub fn print_info(message: &str) {
    println!("{} {}", Theme::primary(Icons::INFO.to_string()), message);
}

// ============================================================================
// TESTS
// ============================================================================
