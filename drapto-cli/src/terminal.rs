// ============================================================================
// drapto-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: hierarchical CLI output styling, and a progress bar driven
// off the orchestrator's on-disk `progress.json` (§4.11, §6). There is no
// in-process progress-event channel between drapto-core and the CLI; the
// pipeline runs a job to completion behind a blocking call, so progress is
// observed the same way a `tail -f` would: by polling the state file.
//
// AI-ASSISTANT-INFO: terminal UI components for the CLI (sections, status
// lines, a polling progress bar).

use console::{style, Term};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{error, info};
use once_cell::sync::Lazy;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::sync::Mutex;
use std::time::Duration;
use supports_color::Stream;
use unicode_width::UnicodeWidthStr;

/// Visual hierarchy levels for CLI output.
#[derive(Debug, Clone, Copy)]
pub enum OutputLevel {
    Section,
    Subsection,
    Progress,
    Status,
}

impl OutputLevel {
    fn indent(&self) -> &'static str {
        match self {
            OutputLevel::Section => "",
            OutputLevel::Subsection => "  ",
            OutputLevel::Progress => "    ",
            OutputLevel::Status => "      ",
        }
    }
}

struct TerminalState {
    current_progress: Option<ProgressBar>,
    use_color: bool,
}

impl TerminalState {
    fn new() -> Self {
        let use_color = if std::env::var("NO_COLOR").is_ok() || !std::io::stderr().is_terminal() {
            false
        } else {
            supports_color::on(Stream::Stderr).is_some()
        };
        Self { current_progress: None, use_color }
    }
}

static TERMINAL_STATE: Lazy<Mutex<TerminalState>> = Lazy::new(|| Mutex::new(TerminalState::new()));

pub fn set_color(enable: bool) {
    if let Ok(mut state) = TERMINAL_STATE.lock() {
        state.use_color = enable;
    }
}

fn should_use_color() -> bool {
    TERMINAL_STATE.lock().map(|state| state.use_color).unwrap_or(false)
}

/// Print a section header for a major workflow phase.
pub fn print_section(title: &str) {
    info!("");
    if should_use_color() {
        info!("===== {} =====", title.to_uppercase().cyan().bold());
    } else {
        info!("===== {} =====", title.to_uppercase());
    }
    info!("");
}

pub fn print_item(level: OutputLevel, symbol: Option<&str>, text: &str, bold: bool) {
    let indent = level.indent();
    if should_use_color() && bold {
        info!("{}{} {}", indent, symbol.unwrap_or(""), style(text).bold());
    } else if let Some(sym) = symbol {
        info!("{}{} {}", indent, sym, text);
    } else {
        info!("{}{}", indent, text);
    }
}

pub fn print_processing(message: &str) {
    info!("");
    print_item(OutputLevel::Subsection, Some("»"), message, true);
}

pub fn print_subsection(title: &str) {
    print_item(OutputLevel::Subsection, None, title, true);
}

pub fn print_success(message: &str) {
    info!("");
    if should_use_color() {
        info!("  ✓ {}", message.green());
    } else {
        info!("  ✓ {}", message);
    }
}

/// Print a status line (key-value pair), padded for alignment.
pub fn print_status(label: &str, value: &str, highlight: bool) {
    let label_width = 15;
    let padding = if label.width() < label_width { label_width - label.width() } else { 1 };
    if should_use_color() && highlight {
        info!("{}{}:{} {}", OutputLevel::Status.indent(), label, " ".repeat(padding), value.bold());
    } else {
        info!("{}{}:{} {}", OutputLevel::Status.indent(), label, " ".repeat(padding), value);
    }
}

pub fn print_error(title: &str, message: &str, suggestion: Option<&str>) {
    if should_use_color() {
        error!("✗ {}", title.red().bold());
    } else {
        error!("✗ {}", title);
    }
    error!("  Message: {}", message);
    if let Some(suggestion_text) = suggestion {
        error!("  Suggestion: {}", suggestion_text);
    }
}

pub fn print_warning(message: &str) {
    if should_use_color() {
        info!("  ⚠ {}", message.yellow());
    } else {
        info!("  ⚠ {}", message);
    }
}

pub fn print_file_list(header: &str, files: &[std::path::PathBuf]) {
    if files.is_empty() {
        info!("No files found to process.");
        return;
    }
    info!("{}", header);
    for file in files {
        info!("  - {}", file.display());
    }
}

// ============================================================================
// PROGRESS BAR
// ============================================================================

fn init_progress_bar(total_frames: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_frames.max(1));
    let term_width = Term::stderr().size().1 as usize;
    let style = if term_width >= 100 {
        ProgressStyle::default_bar()
            .template("Encoding: {percent:>5.1}% [{bar:30}] frame {pos}/{len} ({elapsed_precise} / {eta_precise})")
            .unwrap()
            .progress_chars("##.")
    } else {
        ProgressStyle::default_bar()
            .template("Encoding: {percent:>5.1}% [{bar:20}]")
            .unwrap()
            .progress_chars("##.")
    };
    pb.set_style(style);
    if !std::io::stderr().is_terminal() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.enable_steady_tick(Duration::from_millis(150));
    pb
}

/// Advances (creating on first call) the job progress bar to `current_frame`
/// out of `total_frames`, as read from the orchestrator's `progress.json`.
pub fn update_progress_bar(current_frame: u64, total_frames: u64) {
    let mut state = TERMINAL_STATE.lock().unwrap();
    if state.current_progress.is_none() {
        state.current_progress = Some(init_progress_bar(total_frames));
    }
    if let Some(pb) = state.current_progress.as_ref() {
        pb.set_length(total_frames.max(1));
        pb.set_position(current_frame.min(total_frames));
    }
}

pub fn clear_progress_bar() {
    if let Ok(mut state) = TERMINAL_STATE.lock() {
        if let Some(pb) = state.current_progress.take() {
            pb.finish_and_clear();
        }
    }
}

/// Prints the terminal-state summary for a completed job (§4.16's own
/// message content, mirrored here for interactive stdout/stderr display).
pub fn print_job_summary(input_size: u64, output_size: u64, elapsed: Duration) {
    clear_progress_bar();
    let reduction = if input_size > 0 { 100 - (output_size.saturating_mul(100) / input_size) } else { 0 };
    info!("");
    info!("  {:<13} {}", "Encode time:", format_duration(elapsed));
    info!("  {:<13} {}", "Input size:", format_bytes(input_size));
    info!("  {:<13} {}", "Output size:", format_bytes(output_size));
    let reduction_str = format!("{reduction}%");
    if should_use_color() && reduction >= 50 {
        info!("  {:<13} {}", "Reduced by:", reduction_str.green());
    } else {
        info!("  {:<13} {}", "Reduced by:", reduction_str);
    }
    info!("");
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
