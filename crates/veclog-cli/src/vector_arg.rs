//! Parsing and formatting of vector arguments.

use anyhow::{bail, Context};

/// Parses a vector from either a JSON array (`"[0.1, 0.2]"`) or a bare
/// comma-separated list (`"0.1,0.2"`).
pub fn parse(input: &str) -> anyhow::Result<Vec<f32>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("vector argument is empty");
    }

    if trimmed.starts_with('[') {
        let values: Vec<f32> =
            serde_json::from_str(trimmed).context("vector is not a valid JSON array")?;
        return Ok(values);
    }

    trimmed
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .with_context(|| format!("'{part}' is not a number"))
        })
        .collect()
}

/// Formats a vector for display, eliding long tails.
pub fn format(data: &[f32]) -> String {
    const SHOWN: usize = 8;
    let head: Vec<String> = data.iter().take(SHOWN).map(|v| format!("{v:.4}")).collect();
    if data.len() > SHOWN {
        format!("[{}, ... {} more]", head.join(", "), data.len() - SHOWN)
    } else {
        format!("[{}]", head.join(", "))
    }
}
