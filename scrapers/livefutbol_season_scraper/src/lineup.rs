use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

use crate::types::{PlayerAppearance, PlayerKey};
use crate::utils::extract_minute;

const MATCH_LENGTH: u32 = 90;

/// Minutes a player was on the pitch. The rule order is load-bearing:
/// a starter with a recorded exit minute played exactly that many minutes,
/// because starters always enter at 0.
pub fn minutes_played(
    enter: Option<u32>,
    leave: Option<u32>,
    is_bench: bool,
    length: u32,
) -> u32 {
    if is_bench && enter.is_none() {
        return 0;
    }
    if !is_bench && enter == Some(0) && leave.is_none() {
        return length;
    }
    if !is_bench {
        if let Some(out) = leave {
            return out;
        }
    }
    if is_bench && leave.is_none() {
        if let Some(entered) = enter {
            return length.saturating_sub(entered);
        }
    }
    if let (Some(entered), Some(out)) = (enter, leave) {
        return out.saturating_sub(entered);
    }
    0
}

/// Parses a lineup page into per-player appearances for both sides.
pub struct LineupExtractor;

impl LineupExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, html: &str) -> HashMap<PlayerKey, PlayerAppearance> {
        let document = Html::parse_document(html);
        let mut players = HashMap::new();

        for (idx, side) in ["home", "away"].iter().enumerate() {
            let team_name = resolve_team_name(&document, side, idx);
            self.parse_group(&document, side, &team_name, false, &mut players);
            self.parse_group(&document, side, &team_name, true, &mut players);
        }

        players
    }

    fn parse_group(
        &self,
        document: &Html,
        side: &str,
        team_name: &str,
        is_bench: bool,
        players: &mut HashMap<PlayerKey, PlayerAppearance>,
    ) {
        let group = if is_bench {
            "hs-lineup--bench"
        } else {
            "hs-lineup--starter"
        };
        let event_selector =
            Selector::parse(&format!("div.{}.{} div.event", group, side)).unwrap();
        let name_selector = Selector::parse("div.person-name").unwrap();
        let sub_out_selector = Selector::parse("div.playing.substitute-out").unwrap();
        let sub_in_selector = Selector::parse("div.playing.substitute-in").unwrap();

        for event in document.select(&event_selector) {
            let Some(name_el) = event.select(&name_selector).next() else {
                continue;
            };
            let nombre = element_text(name_el);

            let (enter, leave) = if is_bench {
                let entered = event
                    .select(&sub_in_selector)
                    .next()
                    .and_then(|el| extract_minute(&element_text(el)));
                (entered, None)
            } else {
                let out = event
                    .select(&sub_out_selector)
                    .next()
                    .and_then(|el| extract_minute(&element_text(el)));
                (Some(0), out)
            };

            let minutos = minutes_played(enter, leave, is_bench, MATCH_LENGTH);
            let goles = count_goals(event);

            let key = PlayerKey {
                nombre: nombre.clone(),
                equipo: team_name.to_string(),
            };
            let entry = players.entry(key).or_insert_with(|| PlayerAppearance {
                nombre,
                equipo: team_name.to_string(),
                minutos: 0,
                goles: 0,
            });
            entry.minutos += minutos;
            entry.goles += goles;
        }
    }
}

impl Default for LineupExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Badge alt text, then a heading carrying "Team (formation)", then the
/// literal side token.
fn resolve_team_name(document: &Html, side: &str, side_index: usize) -> String {
    let badge_selector = Selector::parse(&format!(
        "div.team-image.team-image-{} img[alt]",
        side
    ))
    .unwrap();
    if let Some(alt) = document
        .select(&badge_selector)
        .next()
        .and_then(|img| img.value().attr("alt"))
    {
        let alt = alt.trim();
        if !alt.is_empty() {
            return alt.to_string();
        }
    }

    let heading_selector = Selector::parse("h2, h3").unwrap();
    let mut headings = document
        .select(&heading_selector)
        .map(element_text)
        .filter(|text| text.contains('('));
    if let Some(heading) = headings.nth(side_index) {
        if let Some((name, _)) = heading.split_once('(') {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }

    side.to_string()
}

fn count_goals(event: ElementRef) -> u32 {
    let div_selector = Selector::parse("div").unwrap();
    event
        .select(&div_selector)
        .filter(|el| el.value().classes().any(|c| c.contains("goal")))
        .count() as u32
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}
