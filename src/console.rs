//! Colorful console output for startup and render summaries.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::domain::Dataset;
use crate::session::RenderOutcome;

/// ASCII art banner for server startup.
pub fn print_banner() {
    let banner = r#"
  ____                      __  __
 |  _ \ _   _  __ _ ___    |  \/  | __ _ _ __
 | |_) | | | |/ _` / __|   | |\/| |/ _` | '_ \
 |  _ <| |_| | (_| \__ \   | |  | | (_| | |_) |
 |_| \_\\__,_|\__,_|___/   |_|  |_|\__,_| .__/
                                        |_|
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "Ruas Jalan Map".bright_cyan()
    );
}

/// Prints the dataset summary after loading.
pub fn print_dataset_loaded(source: &Path, dataset: &Dataset) {
    println!(
        "{} {} {} Dataset {}: records ({}), skipped ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Dataset]".bright_cyan(),
        source.display().white().bold(),
        dataset.len().to_formatted_string(&Locale::en).bright_yellow(),
        dataset.skipped.to_formatted_string(&Locale::en).yellow()
    );
}

/// Prints a failed dataset load.
pub fn print_dataset_failed(source: &Path, error: &dyn std::fmt::Display) {
    println!(
        "{} {} {} Gagal load GeoJSON Jalan {}: {}",
        timestamp().bright_black(),
        "ERROR".bright_red(),
        "[Dataset]".bright_cyan(),
        source.display().white().bold(),
        error.to_string().bright_red()
    );
}

/// Prints where the server listens.
pub fn print_listening(addr: SocketAddr, routing_url: &str) {
    println!(
        "{} {} {} Listening on {} (routing via {})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Server]".bright_cyan(),
        format!("http://{}", addr).bright_magenta().bold(),
        routing_url.white()
    );
}

/// Prints a one-line render summary.
pub fn print_render(ruas_id: Option<&str>, outcome: &RenderOutcome, elapsed: Duration) {
    let mode = match ruas_id {
        Some(id) => format!("ruasId {}", id),
        None => "overview".to_string(),
    };
    let status = if outcome.found {
        "found".bright_green().to_string()
    } else {
        "not found".bright_red().to_string()
    };

    println!(
        "{} {} {} Rendered {} in {}: roads ({}), OSRM requests ({}), fallbacks ({}), {}",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Map]".bright_cyan(),
        mode.white().bold(),
        format_duration(elapsed).yellow(),
        outcome.drawn.to_formatted_string(&Locale::en).bright_yellow(),
        outcome.route_requests.to_formatted_string(&Locale::en).bright_yellow(),
        outcome.fallbacks.to_formatted_string(&Locale::en).yellow(),
        status
    );
}

/// Formats a duration nicely.
fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

/// Returns a timestamp string.
fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}
