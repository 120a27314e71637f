use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::types::{Match, MatchStatus, PlayerAppearance, PlayerKey};

/// Season-to-date totals for one (player, team) key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerEntry {
    pub minutos_totales: u32,
    pub goles_totales: u32,
    pub partidos_jugados: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerRow {
    nombre: String,
    equipo: String,
    minutos_totales: u32,
    goles_totales: u32,
    partidos_jugados: u32,
}

/// Durable accumulator of per-player totals, persisted as CSV and merged
/// additively across runs. The ledger itself does not guard against a
/// double fold of the same match; the processed-match store does.
#[derive(Debug)]
pub struct PlayerLedger {
    path: PathBuf,
    entries: HashMap<PlayerKey, LedgerEntry>,
}

impl PlayerLedger {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries = HashMap::new();

        if path.exists() {
            let mut reader = csv::Reader::from_path(&path)
                .with_context(|| format!("Failed to open ledger {:?}", path))?;
            for row in reader.deserialize() {
                let row: LedgerRow = row.context("Malformed ledger row")?;
                entries.insert(
                    PlayerKey {
                        nombre: row.nombre,
                        equipo: row.equipo,
                    },
                    LedgerEntry {
                        minutos_totales: row.minutos_totales,
                        goles_totales: row.goles_totales,
                        partidos_jugados: row.partidos_jugados,
                    },
                );
            }
        }

        Ok(Self { path, entries })
    }

    /// Additive merge. Minutes and goals always accumulate; a match played
    /// is only counted when the appearance has minutes.
    pub fn fold(&mut self, appearance: &PlayerAppearance) {
        let entry = self
            .entries
            .entry(PlayerKey {
                nombre: appearance.nombre.clone(),
                equipo: appearance.equipo.clone(),
            })
            .or_default();
        entry.minutos_totales += appearance.minutos;
        entry.goles_totales += appearance.goles;
        if appearance.minutos > 0 {
            entry.partidos_jugados += 1;
        }
    }

    pub fn get(&self, key: &PlayerKey) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &HashMap<PlayerKey, LedgerEntry> {
        &self.entries
    }

    /// Overwrites the CSV with the full ledger, sorted for stable diffs.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to write ledger {:?}", self.path))?;

        let mut keys: Vec<&PlayerKey> = self.entries.keys().collect();
        keys.sort_by(|a, b| (&a.equipo, &a.nombre).cmp(&(&b.equipo, &b.nombre)));

        for key in keys {
            let entry = &self.entries[key];
            writer.serialize(LedgerRow {
                nombre: key.nombre.clone(),
                equipo: key.equipo.clone(),
                minutos_totales: entry.minutos_totales,
                goles_totales: entry.goles_totales,
                partidos_jugados: entry.partidos_jugados,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Context recorded alongside a processed match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitante: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resultado: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreState {
    matches: HashMap<String, ProcessedRecord>,
    last_run: DateTime<Utc>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            matches: HashMap::new(),
            last_run: Utc::now(),
        }
    }
}

/// Tracks which matches have already been folded into the ledger, keyed by
/// lineup URL (or a composed key when no URL exists). This is what makes
/// re-runs over the same season idempotent.
#[derive(Debug)]
pub struct ProcessedStore {
    path: PathBuf,
    state: StoreState,
}

impl ProcessedStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            serde_json::from_str(&json).unwrap_or_default()
        } else {
            StoreState::default()
        };
        Ok(Self { path, state })
    }

    /// `done` matches are complete; `no_lineup` matches cannot succeed
    /// without a link appearing in the source, so both are skipped.
    /// `failed` and `failed_parse` are retried on the next run.
    pub fn is_settled(&self, key: &str) -> bool {
        matches!(
            self.state.matches.get(key).map(|r| r.status),
            Some(MatchStatus::Done) | Some(MatchStatus::NoLineup)
        )
    }

    pub fn get(&self, key: &str) -> Option<&ProcessedRecord> {
        self.state.matches.get(key)
    }

    pub fn mark(&mut self, key: &str, status: MatchStatus) {
        self.state.matches.insert(
            key.to_string(),
            ProcessedRecord {
                status,
                local: None,
                visitante: None,
                resultado: None,
            },
        );
    }

    /// `done` records keep a snapshot of the teams and result.
    pub fn mark_done(&mut self, key: &str, m: &Match) {
        self.state.matches.insert(
            key.to_string(),
            ProcessedRecord {
                status: MatchStatus::Done,
                local: Some(m.local.clone()),
                visitante: Some(m.visitante.clone()),
                resultado: Some(m.resultado_text()),
            },
        );
    }

    pub fn save(&mut self) -> Result<()> {
        self.state.last_run = Utc::now();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample_appearance() -> PlayerAppearance {
        PlayerAppearance {
            nombre: "Isco".to_string(),
            equipo: "Real Betis".to_string(),
            minutos: 80,
            goles: 1,
        }
    }

    #[test]
    fn test_fold_is_additive() {
        let dir = tempdir().unwrap();
        let mut ledger = PlayerLedger::load(dir.path().join("players_stats.csv")).unwrap();
        let appearance = sample_appearance();

        for _ in 0..3 {
            ledger.fold(&appearance);
        }

        let entry = ledger
            .get(&PlayerKey {
                nombre: "Isco".to_string(),
                equipo: "Real Betis".to_string(),
            })
            .unwrap();
        assert_eq!(entry.minutos_totales, 240);
        assert_eq!(entry.goles_totales, 3);
        assert_eq!(entry.partidos_jugados, 3);
    }

    #[test]
    fn test_zero_minutes_does_not_count_a_match() {
        let dir = tempdir().unwrap();
        let mut ledger = PlayerLedger::load(dir.path().join("players_stats.csv")).unwrap();
        ledger.fold(&PlayerAppearance {
            nombre: "Fran Vieites".to_string(),
            equipo: "Real Betis".to_string(),
            minutos: 0,
            goles: 0,
        });

        let entry = ledger
            .get(&PlayerKey {
                nombre: "Fran Vieites".to_string(),
                equipo: "Real Betis".to_string(),
            })
            .unwrap();
        assert_eq!(entry.partidos_jugados, 0);
    }

    #[test]
    fn test_ledger_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("players_stats.csv");

        let mut ledger = PlayerLedger::load(&path).unwrap();
        ledger.fold(&sample_appearance());
        ledger.save().unwrap();

        let reloaded = PlayerLedger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        let entry = reloaded
            .get(&PlayerKey {
                nombre: "Isco".to_string(),
                equipo: "Real Betis".to_string(),
            })
            .unwrap();
        assert_eq!(entry.minutos_totales, 80);
        assert_eq!(entry.goles_totales, 1);
        assert_eq!(entry.partidos_jugados, 1);
    }

    #[test]
    fn test_processed_store_settled_semantics() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed_matches.json");

        let mut store = ProcessedStore::load(&path).unwrap();
        store.mark("a", MatchStatus::NoLineup);
        store.mark("b", MatchStatus::Failed);
        store.mark("c", MatchStatus::FailedParse);
        let m = Match {
            jornada: 1,
            fecha: "17/08/2024".to_string(),
            local: "Real Betis".to_string(),
            visitante: "Girona FC".to_string(),
            resultado: Some((1, 1)),
            lineup_url: Some("https://example.com/lineup".to_string()),
        };
        store.mark_done("d", &m);
        store.save().unwrap();

        let store = ProcessedStore::load(&path).unwrap();
        assert!(store.is_settled("a"));
        assert!(!store.is_settled("b"));
        assert!(!store.is_settled("c"));
        assert!(store.is_settled("d"));
        assert!(!store.is_settled("unknown"));

        let done = store.get("d").unwrap();
        assert_eq!(done.resultado.as_deref(), Some("1:1"));
        assert_eq!(done.local.as_deref(), Some("Real Betis"));
    }
}
