use anyhow::{Context, Result};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use nonzero_ext::nonzero;
use std::{
    num::NonZeroU32,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};
use tracing::{info, warn};

use crate::{
    config::ScraperConfig,
    features::FeatureEngine,
    fetch::Fetcher,
    ledger::{PlayerLedger, ProcessedStore},
    lineup::LineupExtractor,
    match_list::MatchListExtractor,
    output,
    team_stats::{find_team_stats_link, TeamStatsExtractor},
    types::{MatchStatus, TeamStatRow},
};

/// Drives one season end to end: fetch the index, then sequentially fold
/// each match's lineup into the ledger and collect its team statistics,
/// persisting after every match so a crash loses at most the in-flight one.
pub struct SeasonScraper {
    config: ScraperConfig,
    fetcher: Fetcher,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    ledger: PlayerLedger,
    processed: ProcessedStore,
}

impl SeasonScraper {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.rate_limits.requests_per_second).unwrap_or(nonzero!(1u32)),
        );
        let rate_limiter = RateLimiter::direct(quota);

        let data_dir = PathBuf::from(&config.output.data_dir);
        let ledger = PlayerLedger::load(data_dir.join(output::PLAYERS_CSV))?;
        let processed = ProcessedStore::load(data_dir.join(output::PROCESSED_JSON))?;

        Ok(Self {
            config,
            fetcher,
            rate_limiter,
            ledger,
            processed,
        })
    }

    pub fn run(&mut self, limit: Option<usize>) -> Result<()> {
        info!("Fetching season index {}", self.config.site.season_url);
        let html = self
            .fetcher
            .fetch(&self.config.site.season_url, Some("module-gameplan"))
            .context("Season index fetch failed, nothing to process")?;

        let extractor = MatchListExtractor::new(&self.config.site.base_url);
        let matches = extractor.extract(&html)?;
        info!("Found {} matches on the season index", matches.len());

        // A limit only narrows the processing loop; the results table always
        // carries the full season so build-features never sees a shrunk file.
        let process_count = limit.map_or(matches.len(), |l| l.min(matches.len()));
        if process_count < matches.len() {
            info!(
                "Limited to processing {} of {} matches",
                process_count,
                matches.len()
            );
        }

        let data_dir = PathBuf::from(&self.config.output.data_dir);
        let results_path = data_dir.join(output::RESULTS_CSV);
        let stats_path = data_dir.join(output::TEAM_STATS_CSV);

        // Stat rows accumulate across runs; the results table is derived
        // wholly from the index page and rewritten each run.
        let mut team_stats_rows: Vec<TeamStatRow> = if stats_path.exists() {
            output::read_team_stats(&stats_path)?
        } else {
            Vec::new()
        };
        output::write_results(&results_path, &matches)?;

        let lineup_extractor = LineupExtractor::new();
        let stats_extractor = TeamStatsExtractor::new();
        let total = process_count;

        for (i, m) in matches.iter().take(process_count).enumerate() {
            info!("[{}/{}] Processing {} vs {}", i + 1, total, m.local, m.visitante);
            let key = m.key();

            if self.processed.is_settled(&key) {
                info!("Already processed, skipping");
                continue;
            }

            let Some(lineup_url) = &m.lineup_url else {
                // Known source limitation, not retryable.
                warn!("No lineup link for {} vs {}", m.local, m.visitante);
                self.processed.mark(&key, MatchStatus::NoLineup);
                self.processed.save()?;
                continue;
            };

            self.pace();
            let lineup_html = match self.fetcher.fetch(lineup_url, None) {
                Ok(html) => html,
                Err(e) => {
                    warn!("Lineup fetch failed for {}: {}", lineup_url, e);
                    self.processed.mark(&key, MatchStatus::Failed);
                    self.processed.save()?;
                    continue;
                }
            };

            let appearances = lineup_extractor.parse(&lineup_html);
            if appearances.is_empty() {
                warn!("No players extracted from {}", lineup_url);
                self.processed.mark(&key, MatchStatus::FailedParse);
                self.processed.save()?;
                continue;
            }
            for appearance in appearances.values() {
                self.ledger.fold(appearance);
            }

            match find_team_stats_link(&lineup_html, &self.config.site.base_url) {
                Some(link) => {
                    self.pace();
                    match self.fetcher.fetch(&link, Some("hs-comparison")) {
                        Ok(stats_html) => {
                            let lines = stats_extractor.parse(&stats_html);
                            if lines.is_empty() {
                                warn!(
                                    "No team statistics for {} vs {}",
                                    m.local, m.visitante
                                );
                            }
                            for line in lines {
                                team_stats_rows.push(TeamStatRow {
                                    jornada: m.jornada,
                                    fecha: m.fecha.clone(),
                                    local: m.local.clone(),
                                    visitante: m.visitante.clone(),
                                    stat: line.stat,
                                    valor_local: line.home,
                                    valor_visitante: line.away,
                                });
                            }
                        }
                        // Soft failure: the match keeps an empty stat set.
                        Err(e) => warn!("Team statistics fetch failed for {}: {}", link, e),
                    }
                }
                None => warn!(
                    "No team-statistics link for {} vs {}",
                    m.local, m.visitante
                ),
            }

            self.processed.mark_done(&key, m);

            // Write-through after every match. The processed store goes to
            // disk first: a crash between the two saves loses the in-flight
            // match instead of double-folding it on the next run.
            self.processed.save()?;
            self.ledger.save()?;
            output::write_results(&results_path, &matches)?;
            output::write_team_stats(&stats_path, &team_stats_rows)?;
        }

        info!(
            "Season run complete: {} ledger entries, {} stat rows",
            self.ledger.len(),
            team_stats_rows.len()
        );
        Ok(())
    }

    fn pace(&self) {
        while self.rate_limiter.check().is_err() {
            thread::sleep(Duration::from_millis(100));
        }
    }
}

/// Post-processing stage: reads the flat season tables back from disk and
/// writes the four per-team-per-matchday feature tables.
pub fn build_features(data_dir: impl AsRef<Path>) -> Result<()> {
    let data_dir = data_dir.as_ref();
    let matches = output::read_results(data_dir.join(output::RESULTS_CSV))
        .context("Results table missing; run scrape-season first")?;
    let stats_path = data_dir.join(output::TEAM_STATS_CSV);
    let stats = if stats_path.exists() {
        output::read_team_stats(&stats_path)?
    } else {
        Vec::new()
    };

    let finished = matches.iter().filter(|m| m.resultado.is_some()).count();
    info!(
        "Building features from {} matches ({} finished) and {} stat rows",
        matches.len(),
        finished,
        stats.len()
    );

    let plain = FeatureEngine::new().build(&matches, &stats);
    output::write_feature_full(data_dir.join(output::TEAM_JORNADAS_FULL_CSV), &plain)?;
    output::write_feature_reduced(data_dir.join(output::TEAM_JORNADAS_REDUCED_CSV), &plain)?;

    let streak = FeatureEngine::streak().build(&matches, &stats);
    output::write_feature_full(data_dir.join(output::STREAK_FULL_CSV), &streak)?;
    output::write_streak_reduced(data_dir.join(output::STREAK_REDUCED_CSV), &streak)?;

    info!(
        "Wrote {} team-matchday rows across four tables",
        plain.rows.len()
    );
    Ok(())
}
