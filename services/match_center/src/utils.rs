use anyhow::{Context, Result};

/// Parses a `"X-Y"` score into home and away goal counts.
pub fn parse_score(score: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = score.split('-').collect();
    if parts.len() != 2 {
        anyhow::bail!("Invalid score format: {}", score);
    }

    let home_score = parts[0]
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid home score: {}", parts[0]))?;
    let away_score = parts[1]
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid away score: {}", parts[1]))?;

    Ok((home_score, away_score))
}

pub fn capitalize_words(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn display_name(first_name: &str, last_name: &str) -> String {
    capitalize_words(&format!("{} {}", first_name.trim(), last_name.trim()))
}

/// Trimmed shirt number, or `None` when nothing usable was entered.
pub fn normalize_shirt_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('#').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Splits a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
