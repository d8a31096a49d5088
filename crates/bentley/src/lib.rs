//! Bentley - colored, level-prefixed terminal logging
//!
//! ## Features
//!
//! - Level-prefixed logging (verbose, debug, info, warn, error, success)
//! - Multi-line message support with consistent formatting
//! - A process-wide verbosity gate for `verbose` and `debug` output
//! - All output to stderr so stdout stays clean for results
//!
//! ## Usage
//!
//! Prefer the macros, which accept `format!` arguments:
//!
//! ```
//! bentley::info!("loaded {} records", 42);
//! bentley::verbose!("only shown when verbosity is enabled");
//! ```

use chrono::Local;
use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable `verbose` and `debug` output for the whole process
pub fn set_verbose(enabled: bool) {
  VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
  VERBOSE.load(Ordering::Relaxed)
}

/// Turn verbosity on when the named environment variable is set to a truthy value
pub fn init_from_env(var: &str) {
  if let Ok(value) = std::env::var(var) {
    set_verbose(is_truthy(&value));
  }
}

fn is_truthy(value: &str) -> bool {
  matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Core logging function that handles the actual output
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a colored prefix for log messages
fn format_prefix(color: Color, prefix: &str) -> String {
  let pad = 7usize.saturating_sub(prefix.len() + 2);
  format!("[{}]{:<pad$}", prefix.color(color).bold(), "")
}

fn emit(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Verbose logging - timestamped, only when verbosity is enabled
pub fn verbose(message: &str) {
  if !is_verbose() {
    return;
  }
  let timestamp = Local::now().format("%H:%M:%S").to_string();
  emit(Color::Cyan, "verb", &format!("{} {message}", timestamp.dimmed()));
}

/// Debug level logging - detailed diagnostics, only when verbosity is enabled
pub fn debug(message: &str) {
  if is_verbose() {
    emit(Color::Magenta, "debug", message);
  }
}

/// Info level logging - general information
pub fn info(message: &str) {
  emit(Color::Blue, "info", message);
}

/// Warning level logging - something needs attention
pub fn warn(message: &str) {
  emit(Color::Yellow, "warn", message);
}

/// Error level logging - something went wrong
pub fn error(message: &str) {
  emit(Color::Red, "error", message);
}

/// Success level logging - something completed successfully
pub fn success(message: &str) {
  emit(Color::Green, "sccs", message);
}

/// Human-readable duration for timing messages
pub fn format_elapsed(elapsed: Duration) -> String {
  let millis = elapsed.as_millis();
  if millis >= 1000 {
    format!("{:.2}s", elapsed.as_secs_f64())
  } else {
    format!("{millis}ms")
  }
}

/// Macros for coverage-excluded logging - these expand with LCOV_EXCL_LINE at call sites
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! verbose {
  ($($arg:tt)*) => {
    $crate::verbose(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => {
    $crate::debug(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}
