//! Build script for growstation-node
//!
//! Validates the embedded node.toml at compile time, so a broken default
//! configuration never reaches a binary.

use std::fs;
use std::path::Path;

#[path = "src/banner.rs"]
mod banner;

fn main() {
    println!("cargo:rerun-if-changed=node.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let config_path = Path::new("node.toml");
    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read node.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in node.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    validate_node(&config, &mut errors);
    validate_analog(&config, &mut errors);
    if !errors.is_empty() {
        fail("Invalid values in node.toml", &errors);
    }
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| format!("║  • {:<62} ║", banner::fit_line(line, 62)))
        .collect::<Vec<_>>()
        .join("\n");

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}

fn integer(table: &toml::Value, key: &str) -> Option<i64> {
    table.get(key).and_then(toml::Value::as_integer)
}

/// Validate the [node] section
fn validate_node(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(node) = config.get("node") else {
        return;
    };

    for key in ["sample_period_ms", "idle_timeout_ms"] {
        if let Some(value) = integer(node, key) {
            if value <= 0 || value > i64::from(u32::MAX) {
                errors.push(format!("[node] {} must be 1-{}", key, u32::MAX));
            }
        }
    }

    if let Some(port) = integer(node, "http_port") {
        if !(1..=65535).contains(&port) {
            errors.push("[node] http_port must be 1-65535".to_string());
        }
    }

    if let Some(calibration) = node.get("calibration") {
        let wet = integer(calibration, "wet").unwrap_or(700);
        let dry = integer(calibration, "dry").unwrap_or(1400);
        if wet >= dry {
            errors.push(format!(
                "[node.calibration] wet ({}) must be below dry ({})",
                wet, dry
            ));
        }
    }
}

/// Validate the [analog] section
fn validate_analog(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(raw) = config.get("analog").and_then(|a| a.get("raw")) else {
        return;
    };

    match raw.as_array() {
        Some(values) if values.len() == 4 => {
            let in_range = values
                .iter()
                .all(|v| v.as_integer().is_some_and(|v| (0..=i64::from(i16::MAX)).contains(&v)));
            if !in_range {
                errors.push("[analog] raw values must be 0-32767".to_string());
            }
        }
        _ => errors.push("[analog] raw must list exactly 4 values".to_string()),
    }
}
