//! Formatting for durations, compile times and the build summary.

use super::colors_enabled;
use console::Term;
use owo_colors::OwoColorize;
use quiver_config::QuiverConfig;
use std::path::Path;
use std::time::Duration;

/// Format a duration as `50ms`, `1.50s` or `2m 5s`.
///
/// ```
/// use std::time::Duration;
/// use quiver_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// How a compile time is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileSpeed {
    Fast,
    Slow,
    VerySlow,
}

/// Only development builds are judged; production timings are never flagged.
pub fn compile_speed(duration_ms: u64, development: bool) -> CompileSpeed {
    if !development {
        CompileSpeed::Fast
    } else if duration_ms > 1000 {
        CompileSpeed::VerySlow
    } else if duration_ms > 500 {
        CompileSpeed::Slow
    } else {
        CompileSpeed::Fast
    }
}

/// Compile time text, red above one second and yellow above half a second in development.
pub fn format_compile_time(duration_ms: u64, development: bool) -> String {
    let text = format_duration(Duration::from_millis(duration_ms));
    if !colors_enabled() {
        return text;
    }
    match compile_speed(duration_ms, development) {
        CompileSpeed::VerySlow => text.red().to_string(),
        CompileSpeed::Slow => text.yellow().to_string(),
        CompileSpeed::Fast => text,
    }
}

/// Print where the build went and which transports it serves.
pub fn print_build_summary(config: &QuiverConfig, project_root: &Path, tools: usize) {
    let width = (Term::stderr().size().1 as usize).min(80);
    let out_dir = project_root.join(&config.bundler.out_dir);

    let http = match config.http.resolve() {
        Some(http) => format!("http://{}:{}{}", http.host, http.port, http.endpoint),
        None => "disabled".to_string(),
    };
    let stdio = if config.stdio { "enabled" } else { "disabled" };
    let adapter = config
        .experimental
        .adapter
        .map(|kind| format!("{kind:?}").to_lowercase())
        .unwrap_or_else(|| "none".to_string());

    let rows = [
        ("Tools", tools.to_string()),
        ("Output", out_dir.display().to_string()),
        ("HTTP", http),
        ("STDIO", stdio.to_string()),
        ("Adapter", adapter),
    ];

    if colors_enabled() {
        eprintln!("\n{}", "Build Summary".bold().underline());
    } else {
        eprintln!("\nBuild Summary");
    }
    eprintln!("{}", "─".repeat(width));
    for (label, value) in rows {
        if colors_enabled() {
            eprintln!("  {} {:<8} {}", "▸".blue(), label.bold(), value);
        } else {
            eprintln!("  ▸ {:<8} {}", label, value);
        }
    }
    eprintln!("{}", "─".repeat(width));
}
