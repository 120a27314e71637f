use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Parses a "H:A" score string into a goal pair.
pub fn parse_score(score: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = score.split(':').collect();
    if parts.len() != 2 {
        anyhow::bail!("Invalid score format: {}", score);
    }

    let home = parts[0]
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid home goals: {}", parts[0]))?;
    let away = parts[1]
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid away goals: {}", parts[1]))?;

    Ok((home, away))
}

/// Normalizes a round label like "Matchday 3." or "3. Jornada" to 3.
pub fn normalize_matchday(label: &str) -> Result<u32> {
    let digits: String = label.chars().filter(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<u32>()
        .with_context(|| format!("No matchday number in label: {}", label))
}

/// Extracts the minute from a substitution marker like "76." → 76.
pub fn extract_minute(text: &str) -> Option<u32> {
    static MINUTE_RE: OnceLock<Regex> = OnceLock::new();
    let re = MINUTE_RE.get_or_init(|| Regex::new(r"(\d+)\.").unwrap());
    re.captures(text)
        .and_then(|cap| cap[1].parse::<u32>().ok())
}

/// Resolves an href against the site base URL.
pub fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        href.trim_start_matches('/')
    )
}
