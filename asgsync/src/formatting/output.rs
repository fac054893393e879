//! General output formatting utilities.

use asgsync_core::Difference;
use owo_colors::OwoColorize;

/// Prints a summary box with one line per item.
pub fn print_summary_box(title: &str, items: &[(&str, &str)]) {
    let title_colored = title.cyan().bold().to_string();
    let separator = "─".repeat(50);
    println!("┌─ {} {}", title_colored, separator.bright_black());
    for (key, value) in items {
        println!("│ {} {}", key.bright_black().bold(), value.bold().white());
    }
    println!("└{}", "─".repeat(60).bright_black());
}

pub fn print_key_value(key: &str, value: &str) {
    println!("  {} {}", key.bright_black().bold(), value.bold().white());
}

/// Prints every difference as `Difference detected in key K: live != desired`.
pub fn print_differences(differences: &[Difference]) {
    for diff in differences {
        println!(
            "  {} Difference detected in key {}: {} != {}",
            "~".yellow(),
            diff.key.bold(),
            diff.live.red(),
            diff.desired.green()
        );
    }
}
