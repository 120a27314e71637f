use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::types::{Match, TeamStatRow};

/// Result-derived metrics that get a rolling "racha" column alongside the
/// per-metric stat columns.
pub const RESULT_METRICS: [&str; 5] = [
    "goles_marcados",
    "goles_encajados",
    "victoria",
    "empate",
    "derrota",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victoria,
    Empate,
    Derrota,
}

impl Outcome {
    pub fn from_goals(goles_marcados: u32, goles_encajados: u32) -> Self {
        if goles_marcados > goles_encajados {
            Outcome::Victoria
        } else if goles_marcados < goles_encajados {
            Outcome::Derrota
        } else {
            Outcome::Empate
        }
    }

    pub fn letter(&self) -> &'static str {
        match self {
            Outcome::Victoria => "V",
            Outcome::Empate => "E",
            Outcome::Derrota => "D",
        }
    }
}

/// One output row per (team, matchday). Stat maps are keyed by metric name;
/// `None` means the value was missing or non-numeric, or (for trailing
/// columns) that the team had no prior observations.
#[derive(Debug, Clone)]
pub struct TeamMatchdayRow {
    pub equipo: String,
    pub jornada: u32,
    pub es_visitante: u8,
    pub goles_marcados: u32,
    pub goles_encajados: u32,
    pub resultado: Outcome,
    pub victoria: u8,
    pub empate: u8,
    pub derrota: u8,
    pub goles_marcados_tot: u32,
    pub goles_encajados_tot: u32,
    pub victorias_tot: u32,
    pub empates_tot: u32,
    pub derrotas_tot: u32,
    pub partidos_jugados: u32,
    pub goles_marcados_pp: f64,
    pub goles_encajados_pp: f64,
    pub victorias_pp: f64,
    pub empates_pp: f64,
    pub derrotas_pp: f64,
    /// The match's own stat values, re-oriented to this team's side.
    pub stats: BTreeMap<String, Option<f64>>,
    /// Expanding career mean over strictly prior matchdays.
    pub stat_pp: BTreeMap<String, Option<f64>>,
    /// Rolling mean over the last N strictly prior matchdays. Keys are the
    /// result metrics plus every stat name.
    pub racha: BTreeMap<String, Option<f64>>,
}

#[derive(Debug)]
pub struct FeatureTable {
    pub window: usize,
    pub stat_names: Vec<String>,
    pub rows: Vec<TeamMatchdayRow>,
}

/// Turns a season's match results and team-stat rows into a long-format
/// per-team per-matchday table with cumulative and trailing statistics.
/// All trailing columns exclude the current matchday: the series is shifted
/// one position before averaging.
pub struct FeatureEngine {
    window: usize,
}

impl FeatureEngine {
    /// Plain dataset window.
    pub fn new() -> Self {
        Self { window: 3 }
    }

    /// "Racha" (streak) dataset window.
    pub fn streak() -> Self {
        Self { window: 5 }
    }

    pub fn with_window(window: usize) -> Self {
        Self { window }
    }

    pub fn build(&self, matches: &[Match], stats: &[TeamStatRow]) -> FeatureTable {
        let finished: Vec<&Match> = matches.iter().filter(|m| m.resultado.is_some()).collect();

        let played: HashSet<(u32, &str, &str)> = finished
            .iter()
            .map(|m| (m.jornada, m.local.as_str(), m.visitante.as_str()))
            .collect();

        // Inner join: stat rows without a finished match are dropped.
        type SideValues = (Option<f64>, Option<f64>);
        let mut stat_lookup: HashMap<(u32, String, String), BTreeMap<String, SideValues>> =
            HashMap::new();
        let mut stat_names = BTreeSet::new();
        for row in stats {
            if !played.contains(&(row.jornada, row.local.as_str(), row.visitante.as_str())) {
                continue;
            }
            stat_names.insert(row.stat.clone());
            stat_lookup
                .entry((row.jornada, row.local.clone(), row.visitante.clone()))
                .or_default()
                .insert(
                    row.stat.clone(),
                    (row.valor_local.as_f64(), row.valor_visitante.as_f64()),
                );
        }
        let stat_names: Vec<String> = stat_names.into_iter().collect();

        let mut rows = Vec::with_capacity(finished.len() * 2);
        for m in &finished {
            let Some((goles_local, goles_visitante)) = m.resultado else {
                continue;
            };
            let match_stats = stat_lookup.get(&(m.jornada, m.local.clone(), m.visitante.clone()));

            for (es_visitante, equipo) in [(0u8, &m.local), (1u8, &m.visitante)] {
                let (goles_marcados, goles_encajados) = if es_visitante == 0 {
                    (goles_local, goles_visitante)
                } else {
                    (goles_visitante, goles_local)
                };
                let resultado = Outcome::from_goals(goles_marcados, goles_encajados);

                let mut own = BTreeMap::new();
                for name in &stat_names {
                    let value = match_stats
                        .and_then(|s| s.get(name))
                        .and_then(|(home, away)| if es_visitante == 0 { *home } else { *away });
                    own.insert(name.clone(), value);
                }

                rows.push(TeamMatchdayRow {
                    equipo: equipo.to_string(),
                    jornada: m.jornada,
                    es_visitante,
                    goles_marcados,
                    goles_encajados,
                    resultado,
                    victoria: (resultado == Outcome::Victoria) as u8,
                    empate: (resultado == Outcome::Empate) as u8,
                    derrota: (resultado == Outcome::Derrota) as u8,
                    goles_marcados_tot: 0,
                    goles_encajados_tot: 0,
                    victorias_tot: 0,
                    empates_tot: 0,
                    derrotas_tot: 0,
                    partidos_jugados: 0,
                    goles_marcados_pp: 0.0,
                    goles_encajados_pp: 0.0,
                    victorias_pp: 0.0,
                    empates_pp: 0.0,
                    derrotas_pp: 0.0,
                    stats: own,
                    stat_pp: BTreeMap::new(),
                    racha: BTreeMap::new(),
                });
            }
        }

        // Cumulative and trailing computations require this ordering.
        rows.sort_by(|a, b| {
            (a.equipo.as_str(), a.jornada).cmp(&(b.equipo.as_str(), b.jornada))
        });

        let mut start = 0;
        while start < rows.len() {
            let mut end = start + 1;
            while end < rows.len() && rows[end].equipo == rows[start].equipo {
                end += 1;
            }
            self.compute_team_block(&mut rows[start..end], &stat_names);
            start = end;
        }

        FeatureTable {
            window: self.window,
            stat_names,
            rows,
        }
    }

    fn compute_team_block(&self, block: &mut [TeamMatchdayRow], stat_names: &[String]) {
        let mut goles_marcados_tot = 0u32;
        let mut goles_encajados_tot = 0u32;
        let mut victorias_tot = 0u32;
        let mut empates_tot = 0u32;
        let mut derrotas_tot = 0u32;

        for (i, row) in block.iter_mut().enumerate() {
            goles_marcados_tot += row.goles_marcados;
            goles_encajados_tot += row.goles_encajados;
            victorias_tot += row.victoria as u32;
            empates_tot += row.empate as u32;
            derrotas_tot += row.derrota as u32;

            row.goles_marcados_tot = goles_marcados_tot;
            row.goles_encajados_tot = goles_encajados_tot;
            row.victorias_tot = victorias_tot;
            row.empates_tot = empates_tot;
            row.derrotas_tot = derrotas_tot;
            row.partidos_jugados = (i + 1) as u32;

            let played = row.partidos_jugados as f64;
            row.goles_marcados_pp = goles_marcados_tot as f64 / played;
            row.goles_encajados_pp = goles_encajados_tot as f64 / played;
            row.victorias_pp = victorias_tot as f64 / played;
            row.empates_pp = empates_tot as f64 / played;
            row.derrotas_pp = derrotas_tot as f64 / played;
        }

        let result_series: Vec<(&str, Vec<Option<f64>>)> = vec![
            (
                "goles_marcados",
                block.iter().map(|r| Some(r.goles_marcados as f64)).collect(),
            ),
            (
                "goles_encajados",
                block.iter().map(|r| Some(r.goles_encajados as f64)).collect(),
            ),
            (
                "victoria",
                block.iter().map(|r| Some(r.victoria as f64)).collect(),
            ),
            (
                "empate",
                block.iter().map(|r| Some(r.empate as f64)).collect(),
            ),
            (
                "derrota",
                block.iter().map(|r| Some(r.derrota as f64)).collect(),
            ),
        ];
        for (name, series) in &result_series {
            let rolling = rolling_mean_prior(series, self.window);
            for (row, value) in block.iter_mut().zip(rolling) {
                row.racha.insert((*name).to_string(), value);
            }
        }

        for stat in stat_names {
            let series: Vec<Option<f64>> = block.iter().map(|r| r.stats[stat]).collect();
            let career = expanding_mean_prior(&series);
            let rolling = rolling_mean_prior(&series, self.window);
            for ((row, c), r) in block.iter_mut().zip(career).zip(rolling) {
                row.stat_pp.insert(stat.clone(), c);
                row.racha.insert(stat.clone(), r);
            }
        }
    }
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean over strictly prior entries; `None` when no prior numeric value
/// exists, never 0.
fn expanding_mean_prior(series: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..series.len()).map(|k| mean_of(&series[..k])).collect()
}

/// Mean over the last `window` strictly prior entries.
fn rolling_mean_prior(series: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..series.len())
        .map(|k| mean_of(&series[k.saturating_sub(window)..k]))
        .collect()
}

fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let nums: Vec<f64> = values.iter().flatten().copied().collect();
    if nums.is_empty() {
        None
    } else {
        Some(nums.iter().sum::<f64>() / nums.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatValue;
    use pretty_assertions::assert_eq;

    fn mk_match(jornada: u32, local: &str, visitante: &str, score: (u32, u32)) -> Match {
        Match {
            jornada,
            fecha: String::new(),
            local: local.to_string(),
            visitante: visitante.to_string(),
            resultado: Some(score),
            lineup_url: None,
        }
    }

    fn mk_stat(
        jornada: u32,
        local: &str,
        visitante: &str,
        stat: &str,
        home: i64,
        away: i64,
    ) -> TeamStatRow {
        TeamStatRow {
            jornada,
            fecha: String::new(),
            local: local.to_string(),
            visitante: visitante.to_string(),
            stat: stat.to_string(),
            valor_local: StatValue::Int(home),
            valor_visitante: StatValue::Int(away),
        }
    }

    fn season() -> (Vec<Match>, Vec<TeamStatRow>) {
        let matches = vec![
            mk_match(1, "A", "B", (2, 0)),
            mk_match(2, "B", "A", (1, 1)),
            mk_match(3, "A", "C", (0, 3)),
            // Unplayed fixture: must be ignored everywhere.
            Match {
                jornada: 4,
                fecha: String::new(),
                local: "B".to_string(),
                visitante: "C".to_string(),
                resultado: None,
                lineup_url: None,
            },
        ];
        let stats = vec![
            mk_stat(1, "A", "B", "Tiros a puerta", 6, 2),
            mk_stat(2, "B", "A", "Tiros a puerta", 3, 5),
            // Jornada 3 has no stats: join drops it from the stat path only.
            // Stat row for the unplayed fixture: dropped by the inner join.
            mk_stat(4, "B", "C", "Tiros a puerta", 9, 9),
        ];
        (matches, stats)
    }

    fn team_rows<'a>(table: &'a FeatureTable, equipo: &str) -> Vec<&'a TeamMatchdayRow> {
        table.rows.iter().filter(|r| r.equipo == equipo).collect()
    }

    #[test]
    fn test_rows_sorted_by_team_then_matchday() {
        let (matches, stats) = season();
        let table = FeatureEngine::new().build(&matches, &stats);

        let order: Vec<(&str, u32)> = table
            .rows
            .iter()
            .map(|r| (r.equipo.as_str(), r.jornada))
            .collect();
        assert_eq!(
            order,
            vec![("A", 1), ("A", 2), ("A", 3), ("B", 1), ("B", 2), ("C", 3)]
        );
    }

    #[test]
    fn test_outcomes_and_orientation() {
        let (matches, stats) = season();
        let table = FeatureEngine::new().build(&matches, &stats);
        let a = team_rows(&table, "A");

        assert_eq!(a[0].es_visitante, 0);
        assert_eq!(a[0].goles_marcados, 2);
        assert_eq!(a[0].resultado.letter(), "V");

        assert_eq!(a[1].es_visitante, 1);
        assert_eq!(a[1].goles_marcados, 1);
        assert_eq!(a[1].resultado.letter(), "E");

        assert_eq!(a[2].resultado.letter(), "D");
        assert_eq!(a[2].derrota, 1);
    }

    #[test]
    fn test_cumulative_totals_and_averages() {
        let (matches, stats) = season();
        let table = FeatureEngine::new().build(&matches, &stats);
        let a = team_rows(&table, "A");

        assert_eq!(a[2].goles_marcados_tot, 3);
        assert_eq!(a[2].goles_encajados_tot, 4);
        assert_eq!(a[2].victorias_tot, 1);
        assert_eq!(a[2].empates_tot, 1);
        assert_eq!(a[2].derrotas_tot, 1);
        assert_eq!(a[2].partidos_jugados, 3);
        assert_eq!(a[2].goles_marcados_pp, 1.0);
        assert_eq!(a[1].goles_marcados_pp, 1.5);

        // Cumulative equals the sum over the team's finished matches.
        let sum: u32 = a.iter().map(|r| r.goles_marcados).sum();
        assert_eq!(a.last().unwrap().goles_marcados_tot, sum);
    }

    #[test]
    fn test_stat_reorientation() {
        let (matches, stats) = season();
        let table = FeatureEngine::new().build(&matches, &stats);
        let a = team_rows(&table, "A");

        // Home in jornada 1, away in jornada 2.
        assert_eq!(a[0].stats["Tiros a puerta"], Some(6.0));
        assert_eq!(a[1].stats["Tiros a puerta"], Some(5.0));
        // Jornada 3 has no stat rows.
        assert_eq!(a[2].stats["Tiros a puerta"], None);
    }

    #[test]
    fn test_career_average_is_strictly_prior() {
        let (matches, stats) = season();
        let table = FeatureEngine::new().build(&matches, &stats);
        let a = team_rows(&table, "A");

        assert_eq!(a[0].stat_pp["Tiros a puerta"], None);
        assert_eq!(a[1].stat_pp["Tiros a puerta"], Some(6.0));
        assert_eq!(a[2].stat_pp["Tiros a puerta"], Some(5.5));
    }

    #[test]
    fn test_career_average_never_reads_own_row() {
        let (matches, stats) = season();
        let baseline = FeatureEngine::new().build(&matches, &stats);

        // Poison A's jornada 2 value; jornada 2's own career average must
        // not move, only later rows may.
        let mut poisoned = stats.clone();
        poisoned[1].valor_visitante = StatValue::Int(1_000_000);
        let table = FeatureEngine::new().build(&matches, &poisoned);

        let before = team_rows(&baseline, "A");
        let after = team_rows(&table, "A");
        assert_eq!(
            before[1].stat_pp["Tiros a puerta"],
            after[1].stat_pp["Tiros a puerta"]
        );
        assert_ne!(
            before[2].stat_pp["Tiros a puerta"],
            after[2].stat_pp["Tiros a puerta"]
        );
    }

    #[test]
    fn test_rolling_window_means() {
        let series = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let rolling = rolling_mean_prior(&series, 2);
        assert_eq!(rolling, vec![None, Some(1.0), Some(1.5), Some(2.5)]);

        let expanding = expanding_mean_prior(&series);
        assert_eq!(expanding, vec![None, Some(1.0), Some(1.5), Some(2.0)]);
    }

    #[test]
    fn test_rolling_skips_missing_values() {
        let series = vec![Some(2.0), None, Some(4.0)];
        let rolling = rolling_mean_prior(&series, 3);
        assert_eq!(rolling, vec![None, Some(2.0), Some(2.0)]);
        // A window with only missing values stays undefined.
        let gap = vec![None, None, Some(1.0)];
        assert_eq!(rolling_mean_prior(&gap, 2), vec![None, None, None]);
    }

    #[test]
    fn test_result_metric_rachas() {
        let (matches, stats) = season();
        let table = FeatureEngine::streak().build(&matches, &stats);
        let a = team_rows(&table, "A");

        assert_eq!(a[0].racha["goles_marcados"], None);
        assert_eq!(a[1].racha["goles_marcados"], Some(2.0));
        assert_eq!(a[2].racha["goles_marcados"], Some(1.5));
        assert_eq!(a[2].racha["victoria"], Some(0.5));
    }

    #[test]
    fn test_unplayed_and_unjoined_rows_are_dropped() {
        let (matches, stats) = season();
        let table = FeatureEngine::new().build(&matches, &stats);

        // The jornada 4 fixture never produced rows.
        assert!(table.rows.iter().all(|r| r.jornada != 4));
        // C only appears through its finished jornada 3 match.
        assert_eq!(team_rows(&table, "C").len(), 1);
    }
}
