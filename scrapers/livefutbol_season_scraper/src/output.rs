use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::features::{FeatureTable, RESULT_METRICS};
use crate::types::{Match, StatValue, TeamStatRow};
use crate::utils::parse_score;

pub const RESULTS_CSV: &str = "resultados_partidos.csv";
pub const PLAYERS_CSV: &str = "players_stats.csv";
pub const TEAM_STATS_CSV: &str = "team_stats.csv";
pub const PROCESSED_JSON: &str = "processed_matches.json";
pub const TEAM_JORNADAS_REDUCED_CSV: &str = "dfequipos.csv";
pub const TEAM_JORNADAS_FULL_CSV: &str = "equipos_jornadas.csv";
pub const STREAK_REDUCED_CSV: &str = "dfequiposracha.csv";
pub const STREAK_FULL_CSV: &str = "equipos_jornadasracha.csv";

#[derive(Debug, Serialize, Deserialize)]
struct ResultsRow {
    jornada: u32,
    fecha: String,
    local: String,
    visitante: String,
    resultado: String,
    lineup_url: String,
}

pub fn write_results(path: impl AsRef<Path>, matches: &[Match]) -> Result<()> {
    ensure_parent(path.as_ref())?;
    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to write {:?}", path.as_ref()))?;
    for m in matches {
        writer.serialize(ResultsRow {
            jornada: m.jornada,
            fecha: m.fecha.clone(),
            local: m.local.clone(),
            visitante: m.visitante.clone(),
            resultado: m.resultado_text(),
            lineup_url: m.lineup_url.clone().unwrap_or_default(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_results(path: impl AsRef<Path>) -> Result<Vec<Match>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("Failed to open {:?}", path.as_ref()))?;
    let mut matches = Vec::new();
    for row in reader.deserialize() {
        let row: ResultsRow = row.context("Malformed results row")?;
        matches.push(Match {
            jornada: row.jornada,
            fecha: row.fecha,
            local: row.local,
            visitante: row.visitante,
            resultado: parse_score(&row.resultado).ok(),
            lineup_url: if row.lineup_url.is_empty() {
                None
            } else {
                Some(row.lineup_url)
            },
        });
    }
    Ok(matches)
}

#[derive(Debug, Serialize, Deserialize)]
struct TeamStatsRowCsv {
    jornada: u32,
    fecha: String,
    local: String,
    visitante: String,
    stat: String,
    valor_local: String,
    valor_visitante: String,
}

pub fn write_team_stats(path: impl AsRef<Path>, rows: &[TeamStatRow]) -> Result<()> {
    ensure_parent(path.as_ref())?;
    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to write {:?}", path.as_ref()))?;
    for row in rows {
        writer.serialize(TeamStatsRowCsv {
            jornada: row.jornada,
            fecha: row.fecha.clone(),
            local: row.local.clone(),
            visitante: row.visitante.clone(),
            stat: row.stat.clone(),
            valor_local: row.valor_local.to_string(),
            valor_visitante: row.valor_visitante.to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_team_stats(path: impl AsRef<Path>) -> Result<Vec<TeamStatRow>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("Failed to open {:?}", path.as_ref()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: TeamStatsRowCsv = row.context("Malformed team stats row")?;
        rows.push(TeamStatRow {
            jornada: row.jornada,
            fecha: row.fecha,
            local: row.local,
            visitante: row.visitante,
            stat: row.stat,
            valor_local: StatValue::coerce(&row.valor_local),
            valor_visitante: StatValue::coerce(&row.valor_visitante),
        });
    }
    Ok(rows)
}

const BASE_COLUMNS: [&str; 20] = [
    "jornada",
    "equipo",
    "Localía",
    "goles_marcados",
    "goles_encajados",
    "resultado",
    "victoria",
    "empate",
    "derrota",
    "goles_marcados_tot",
    "goles_encajados_tot",
    "victorias_tot",
    "empates_tot",
    "derrotas_tot",
    "partidos_jugados",
    "goles_marcados_pp",
    "goles_encajados_pp",
    "victorias_pp",
    "empates_pp",
    "derrotas_pp",
];

/// Full table: identity, per-match values, cumulative totals and averages,
/// own stat values, career averages and rolling rachas.
pub fn write_feature_full(path: impl AsRef<Path>, table: &FeatureTable) -> Result<()> {
    ensure_parent(path.as_ref())?;
    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to write {:?}", path.as_ref()))?;

    let mut header: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(table.stat_names.iter().cloned());
    header.extend(table.stat_names.iter().map(|s| format!("{}_pp", s)));
    header.extend(RESULT_METRICS.iter().map(|m| format!("{}_racha", m)));
    header.extend(table.stat_names.iter().map(|s| format!("{}_racha", s)));
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record: Vec<String> = vec![
            row.jornada.to_string(),
            row.equipo.clone(),
            row.es_visitante.to_string(),
            row.goles_marcados.to_string(),
            row.goles_encajados.to_string(),
            row.resultado.letter().to_string(),
            row.victoria.to_string(),
            row.empate.to_string(),
            row.derrota.to_string(),
            row.goles_marcados_tot.to_string(),
            row.goles_encajados_tot.to_string(),
            row.victorias_tot.to_string(),
            row.empates_tot.to_string(),
            row.derrotas_tot.to_string(),
            row.partidos_jugados.to_string(),
            row.goles_marcados_pp.to_string(),
            row.goles_encajados_pp.to_string(),
            row.victorias_pp.to_string(),
            row.empates_pp.to_string(),
            row.derrotas_pp.to_string(),
        ];
        record.extend(table.stat_names.iter().map(|s| fmt_opt(row.stats[s])));
        record.extend(table.stat_names.iter().map(|s| fmt_opt(row.stat_pp[s])));
        record.extend(
            RESULT_METRICS
                .iter()
                .map(|m| fmt_opt(row.racha[*m])),
        );
        record.extend(table.stat_names.iter().map(|s| fmt_opt(row.racha[s])));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reduced table: identity plus the per-match-played averages.
pub fn write_feature_reduced(path: impl AsRef<Path>, table: &FeatureTable) -> Result<()> {
    ensure_parent(path.as_ref())?;
    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to write {:?}", path.as_ref()))?;

    let mut header: Vec<String> = [
        "jornada",
        "equipo",
        "Localía",
        "partidos_jugados",
        "goles_marcados_pp",
        "goles_encajados_pp",
        "victorias_pp",
        "empates_pp",
        "derrotas_pp",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    header.extend(table.stat_names.iter().map(|s| format!("{}_pp", s)));
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record: Vec<String> = vec![
            row.jornada.to_string(),
            row.equipo.clone(),
            row.es_visitante.to_string(),
            row.partidos_jugados.to_string(),
            row.goles_marcados_pp.to_string(),
            row.goles_encajados_pp.to_string(),
            row.victorias_pp.to_string(),
            row.empates_pp.to_string(),
            row.derrotas_pp.to_string(),
        ];
        record.extend(table.stat_names.iter().map(|s| fmt_opt(row.stat_pp[s])));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reduced streak table: identity, averages and every racha column.
pub fn write_streak_reduced(path: impl AsRef<Path>, table: &FeatureTable) -> Result<()> {
    ensure_parent(path.as_ref())?;
    let mut writer = csv::Writer::from_path(path.as_ref())
        .with_context(|| format!("Failed to write {:?}", path.as_ref()))?;

    let mut header: Vec<String> = [
        "jornada",
        "equipo",
        "partidos_jugados",
        "goles_marcados_pp",
        "goles_encajados_pp",
        "victorias_pp",
        "empates_pp",
        "derrotas_pp",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    header.extend(table.stat_names.iter().map(|s| format!("{}_pp", s)));
    header.extend(RESULT_METRICS.iter().map(|m| format!("{}_racha", m)));
    header.extend(table.stat_names.iter().map(|s| format!("{}_racha", s)));
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record: Vec<String> = vec![
            row.jornada.to_string(),
            row.equipo.clone(),
            row.partidos_jugados.to_string(),
            row.goles_marcados_pp.to_string(),
            row.goles_encajados_pp.to_string(),
            row.victorias_pp.to_string(),
            row.empates_pp.to_string(),
            row.derrotas_pp.to_string(),
        ];
        record.extend(table.stat_names.iter().map(|s| fmt_opt(row.stat_pp[s])));
        record.extend(
            RESULT_METRICS
                .iter()
                .map(|m| fmt_opt(row.racha[*m])),
        );
        record.extend(table.stat_names.iter().map(|s| fmt_opt(row.racha[s])));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
