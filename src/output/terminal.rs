// Colored terminal output for the `check` and `status` commands.

use colored::Colorize;

use crate::classifier::download::model_files_present;
use crate::config::{ClassifierBackend, Config};
use crate::moderation::{Verdict, OFFENSIVE_THRESHOLD, TRACKED_LABELS};

use super::truncate_chars;

/// Display per-label scores and the verdict for one checked text.
pub fn display_verdict(text: &str, verdict: &Verdict) {
    println!("\n{} {}", "Text:".bold(), truncate_chars(text, 120));
    println!();

    println!("  {:<18} {:>7}", "Label".dimmed(), "Score".dimmed());
    println!("  {}", "-".repeat(27).dimmed());

    for (label, score) in verdict.scores.iter() {
        let tracked = TRACKED_LABELS.contains(&label);
        let score_str = format!("{score:>7.3}");
        let score_str = if tracked && score > OFFENSIVE_THRESHOLD {
            score_str.red().bold()
        } else if tracked {
            score_str.normal()
        } else {
            score_str.dimmed()
        };
        let marker = if tracked { "*" } else { " " };
        println!("  {marker}{label:<17} {score_str}");
    }

    println!();
    println!(
        "  {}",
        format!("* tracked labels (offensive above {OFFENSIVE_THRESHOLD})").dimmed()
    );

    let verdict_str = if verdict.offensive {
        "OFFENSIVE".red().bold()
    } else {
        "ok".green().bold()
    };
    println!("\n{} {}", "Verdict:".bold(), verdict_str);
}

/// Display the effective configuration and model availability.
pub fn display_status(config: &Config) {
    println!("{}", "=== feedback-guard status ===".bold());
    println!("Listen address: {}:{}", config.bind_addr, config.port);
    println!("Classify timeout: {}s", config.classify_timeout.as_secs());

    match config.classifier_backend {
        ClassifierBackend::Onnx => {
            println!("Classifier: local ONNX model");
            println!("  Model dir: {}", config.model_dir.display());
            if model_files_present(&config.model_dir) {
                println!("  Model files: {}", "present".green());
            } else {
                println!("  Model files: {}", "missing".red());
                println!("  Run `feedback-guard download-model` to fetch them");
            }
        }
        ClassifierBackend::Perspective => {
            println!("Classifier: Perspective API");
            if config.perspective_api_key.is_empty() {
                println!("  API key: {}", "not set".red());
            } else {
                println!("  API key: {}", "set".green());
            }
        }
    }
}
