use serde::{Deserialize, Serialize};
use std::fmt;

/// One fixture from the season index page. A missing score means the match
/// has not been played yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub jornada: u32,
    pub fecha: String,
    pub local: String,
    pub visitante: String,
    pub resultado: Option<(u32, u32)>,
    pub lineup_url: Option<String>,
}

impl Match {
    pub fn resultado_text(&self) -> String {
        match self.resultado {
            Some((home, away)) => format!("{}:{}", home, away),
            None => String::new(),
        }
    }

    /// Key used by the processed-match store. Falls back to a composed
    /// string for fixtures that never got a lineup link.
    pub fn key(&self) -> String {
        match &self.lineup_url {
            Some(url) => url.clone(),
            None => format!("{} vs {} ({})", self.local, self.visitante, self.jornada),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerKey {
    pub nombre: String,
    pub equipo: String,
}

/// A single player's contribution in a single match, produced by the
/// lineup extractor and folded into the ledger by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAppearance {
    pub nombre: String,
    pub equipo: String,
    pub minutos: u32,
    pub goles: u32,
}

/// One named metric for one match, as read from the team-statistics page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamStatRow {
    pub jornada: u32,
    pub fecha: String,
    pub local: String,
    pub visitante: String,
    pub stat: String,
    pub valor_local: StatValue,
    pub valor_visitante: StatValue,
}

/// Stat values come off the page as text. Numeric-looking values are
/// coerced, everything else is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl StatValue {
    /// Strips percentage signs, maps the decimal comma to a dot, then
    /// tries integer and float parses. A comma is always a decimal
    /// separator: a grouped value like "1,234" parses as 1.234. The source
    /// pages only emit plain integers, comma decimals and percentages, so
    /// grouping never occurs there. Unparseable text survives as-is.
    pub fn coerce(raw: &str) -> StatValue {
        let cleaned = raw.trim().replace(',', ".").replace('%', "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return StatValue::Null;
        }
        if cleaned.contains('.') {
            if let Ok(f) = cleaned.parse::<f64>() {
                return StatValue::Float(f);
            }
        } else if let Ok(i) = cleaned.parse::<i64>() {
            return StatValue::Int(i);
        }
        StatValue::Text(raw.trim().to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Int(i) => Some(*i as f64),
            StatValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Int(i) => write!(f, "{}", i),
            StatValue::Float(v) => write!(f, "{}", v),
            StatValue::Text(s) => write!(f, "{}", s),
            StatValue::Null => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Done,
    NoLineup,
    Failed,
    FailedParse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_integer() {
        assert_eq!(StatValue::coerce("14"), StatValue::Int(14));
    }

    #[test]
    fn test_coerce_decimal_comma() {
        assert_eq!(StatValue::coerce("3,5"), StatValue::Float(3.5));
    }

    #[test]
    fn test_coerce_percentage() {
        assert_eq!(StatValue::coerce("62%"), StatValue::Int(62));
    }

    #[test]
    fn test_coerce_comma_is_always_decimal() {
        assert_eq!(StatValue::coerce("1,234"), StatValue::Float(1.234));
    }

    #[test]
    fn test_coerce_empty_is_null() {
        assert_eq!(StatValue::coerce("  "), StatValue::Null);
    }

    #[test]
    fn test_coerce_text_passthrough() {
        assert_eq!(
            StatValue::coerce("n/a"),
            StatValue::Text("n/a".to_string())
        );
    }

    #[test]
    fn test_match_key_without_lineup_url() {
        let m = Match {
            jornada: 7,
            fecha: "12/01/2025".to_string(),
            local: "Sevilla".to_string(),
            visitante: "Valencia".to_string(),
            resultado: None,
            lineup_url: None,
        };
        assert_eq!(m.key(), "Sevilla vs Valencia (7)");
    }
}
