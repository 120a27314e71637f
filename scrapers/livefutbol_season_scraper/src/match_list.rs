use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::types::Match;
use crate::utils::{absolutize, normalize_matchday, parse_score};

/// One child of the schedule container, typed by a single normalizing pass
/// so the round grouping becomes a plain scan over an ordered sequence.
#[derive(Debug)]
enum ScheduleBlock {
    RoundMarker(String),
    DateMarker(String),
    Match(MatchBlock),
    Other,
}

#[derive(Debug)]
struct MatchBlock {
    local: String,
    visitante: String,
    resultado: String,
    lineup_href: Option<String>,
    finished: bool,
}

/// Parses the season index page into an ordered list of matches grouped by
/// matchday. Blocks are classified by class-list membership ("round-head",
/// "date-head", "match"); a round marker always closes the previous round.
pub struct MatchListExtractor {
    base_url: String,
    finished_only: bool,
}

impl MatchListExtractor {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            finished_only: true,
        }
    }

    /// With the filter off, fixtures without a "finished" marker are kept
    /// and represented with `resultado = None`.
    pub fn with_finished_filter(mut self, finished_only: bool) -> Self {
        self.finished_only = finished_only;
        self
    }

    pub fn extract(&self, html: &str) -> Result<Vec<Match>> {
        let document = Html::parse_document(html);
        let container_selector = Selector::parse("div.module-gameplan").unwrap();
        let container = document
            .select(&container_selector)
            .next()
            .context("Schedule container div.module-gameplan not found")?;

        let mut matches = Vec::new();
        let mut current_round: Option<u32> = None;
        let mut current_date = String::new();

        for child in container.children().filter_map(ElementRef::wrap) {
            match classify_block(child) {
                ScheduleBlock::RoundMarker(label) => {
                    current_round = Some(
                        normalize_matchday(&label)
                            .with_context(|| format!("Bad round label: {}", label))?,
                    );
                }
                ScheduleBlock::DateMarker(text) => {
                    current_date = text;
                }
                ScheduleBlock::Match(block) => {
                    let Some(jornada) = current_round else {
                        warn!(
                            "Match {} vs {} appears before any round marker, skipping",
                            block.local, block.visitante
                        );
                        continue;
                    };
                    if self.finished_only && !block.finished {
                        continue;
                    }
                    matches.push(Match {
                        jornada,
                        fecha: current_date.clone(),
                        local: block.local,
                        visitante: block.visitante,
                        resultado: parse_score(&block.resultado).ok(),
                        lineup_url: block
                            .lineup_href
                            .map(|href| absolutize(&self.base_url, &href)),
                    });
                }
                ScheduleBlock::Other => {}
            }
        }

        Ok(matches)
    }
}

fn classify_block(el: ElementRef) -> ScheduleBlock {
    let classes: Vec<&str> = el.value().classes().collect();

    if classes.iter().any(|c| *c == "round-head") {
        return ScheduleBlock::RoundMarker(element_text(el));
    }
    if classes.iter().any(|c| *c == "date-head") {
        return ScheduleBlock::DateMarker(element_text(el));
    }
    if classes.iter().any(|c| *c == "match") {
        let finished = classes.iter().any(|c| *c == "finished");
        return match parse_match_block(el, finished) {
            Some(block) => ScheduleBlock::Match(block),
            None => {
                warn!("Match block without team names, ignoring");
                ScheduleBlock::Other
            }
        };
    }
    ScheduleBlock::Other
}

fn parse_match_block(el: ElementRef, finished: bool) -> Option<MatchBlock> {
    let home_selector = Selector::parse("div.team-name-home").unwrap();
    let away_selector = Selector::parse("div.team-name-away").unwrap();
    let result_selector = Selector::parse("div.match-result").unwrap();
    let more_selector = Selector::parse("div.match-more a[href]").unwrap();
    let anchor_selector = Selector::parse("a[href]").unwrap();

    let local = el.select(&home_selector).next().map(element_text)?;
    let visitante = el.select(&away_selector).next().map(element_text)?;
    let resultado = el
        .select(&result_selector)
        .next()
        .map(element_text)
        .unwrap_or_default();

    // Prefer the dedicated "more" cell, then widen to the whole block.
    let lineup_href = el
        .select(&more_selector)
        .chain(el.select(&anchor_selector))
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains("lineup"))
        .map(str::to_string);

    Some(MatchBlock {
        local,
        visitante,
        resultado,
        lineup_href,
        finished,
    })
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}
