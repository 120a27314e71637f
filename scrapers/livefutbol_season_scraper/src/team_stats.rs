use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::types::StatValue;
use crate::utils::absolutize;

/// One metric row from the comparison block, before it is attached to a
/// match. Home/away orientation is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct StatLine {
    pub stat: String,
    pub home: StatValue,
    pub away: StatValue,
    pub home_team: String,
    pub away_team: String,
}

/// Parses a team-statistics page. A missing comparison block is a soft
/// failure and yields an empty list.
pub struct TeamStatsExtractor;

impl TeamStatsExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, html: &str) -> Vec<StatLine> {
        let document = Html::parse_document(html);

        let Some(block) = find_comparison_block(&document) else {
            warn!("No hs-comparison block found, skipping team statistics");
            return Vec::new();
        };

        let (home_team, away_team) = resolve_team_names(block);

        let li_selector = Selector::parse("li").unwrap();
        let name_selector = Selector::parse("div.hs-name").unwrap();

        let mut rows = Vec::new();
        for item in block.select(&li_selector) {
            if item.value().classes().any(|c| c.contains("hs-head")) {
                continue;
            }
            let Some(name_el) = item.select(&name_selector).next() else {
                continue;
            };
            let stat = element_text(name_el);

            let home_value = find_value(item, "home");
            let away_value = find_value(item, "away");
            let (Some(hv), Some(av)) = (home_value, away_value) else {
                warn!("Stat '{}' is missing a home or away value, skipping", stat);
                continue;
            };

            rows.push(StatLine {
                stat,
                home: StatValue::coerce(&hv),
                away: StatValue::coerce(&av),
                home_team: home_team.clone(),
                away_team: away_team.clone(),
            });
        }

        if rows.is_empty() {
            warn!("Comparison block present but no stat rows extracted");
        }
        rows
    }
}

impl Default for TeamStatsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the team-statistics URL from a match's lineup page. Only the
/// match-scoped navigation menu is searched, so competition-level links
/// elsewhere in the document cannot be picked up.
pub fn find_team_stats_link(lineup_html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(lineup_html);

    let article_selector = Selector::parse("article#hs-content").unwrap();
    let Some(article) = document.select(&article_selector).next() else {
        warn!("No article#hs-content on lineup page (JS not rendered?)");
        return None;
    };

    let sub_selector = Selector::parse("nav.hs-menu-level-sub").unwrap();
    let match_selector = Selector::parse("nav.hs-menu-level-match").unwrap();
    let nav = article
        .select(&sub_selector)
        .next()
        .or_else(|| article.select(&match_selector).next());
    let Some(nav) = nav else {
        warn!("No match-level nav menu on lineup page");
        return None;
    };

    let list_selector = Selector::parse("ul.hs-menu--list").unwrap();
    let Some(list) = nav.select(&list_selector).next() else {
        warn!("No ul.hs-menu--list inside the match nav");
        return None;
    };

    let anchor_selector = Selector::parse("a[href]").unwrap();
    let link = list
        .select(&anchor_selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| href.contains("/match-report/") && href.contains("team-statistics"))
        .map(|href| absolutize(base_url, href));

    if link.is_none() {
        warn!("No team-statistics link inside the match nav");
    }
    link
}

/// The site uses slight class variants for the comparison block, so match
/// on a class-substring over both ul and div candidates.
fn find_comparison_block(document: &Html) -> Option<ElementRef<'_>> {
    let ul_selector = Selector::parse("ul").unwrap();
    let div_selector = Selector::parse("div").unwrap();

    document
        .select(&ul_selector)
        .find(|el| el.value().classes().any(|c| c.contains("hs-comparison")))
        .or_else(|| {
            document
                .select(&div_selector)
                .find(|el| el.value().classes().any(|c| c.contains("hs-comparison")))
        })
}

fn resolve_team_names(block: ElementRef) -> (String, String) {
    let li_selector = Selector::parse("li").unwrap();
    let img_selector = Selector::parse("img[alt]").unwrap();

    let mut home = None;
    let mut away = None;

    if let Some(head) = block
        .select(&li_selector)
        .find(|el| el.value().classes().any(|c| c.contains("hs-head")))
    {
        home = side_name(head, "hs-home");
        away = side_name(head, "hs-away");
    }

    // Fall back to the first two badge alts anywhere in the block.
    if home.is_none() || away.is_none() {
        let alts: Vec<String> = block
            .select(&img_selector)
            .filter_map(|img| img.value().attr("alt"))
            .map(|alt| alt.trim().to_string())
            .filter(|alt| !alt.is_empty())
            .collect();
        if home.is_none() {
            home = alts.first().cloned();
        }
        if away.is_none() {
            away = alts.get(1).cloned();
        }
    }

    (
        home.unwrap_or_else(|| "home".to_string()),
        away.unwrap_or_else(|| "away".to_string()),
    )
}

/// Value cell for one side, tolerating class variants like
/// "hs-value hs-value-home" or "hs-value--home".
fn find_value(item: ElementRef, side: &str) -> Option<String> {
    let div_selector = Selector::parse("div").unwrap();
    item.select(&div_selector)
        .find(|el| {
            let classes: Vec<&str> = el.value().classes().collect();
            classes.iter().any(|c| c.contains("hs-value"))
                && classes.iter().any(|c| c.contains(side))
        })
        .map(element_text)
}

fn side_name(head: ElementRef, side_class: &str) -> Option<String> {
    let div_selector = Selector::parse("div").unwrap();
    let img_selector = Selector::parse("img[alt]").unwrap();

    let side_el = head
        .select(&div_selector)
        .find(|el| el.value().classes().any(|c| c.contains(side_class)))?;

    let shortname = side_el
        .select(&div_selector)
        .find(|el| el.value().classes().any(|c| c.contains("team-shortname")))
        .map(element_text)
        .filter(|text| !text.is_empty());
    if shortname.is_some() {
        return shortname;
    }

    side_el
        .select(&img_selector)
        .next()
        .and_then(|img| img.value().attr("alt"))
        .map(|alt| alt.trim().to_string())
        .filter(|alt| !alt.is_empty())
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STATS_HTML: &str = r#"
        <ul class="hs-comparison hs-comparison--wide">
          <li class="hs-head">
            <div class="hs-home">
              <div class="team-shortname">Betis</div>
            </div>
            <div class="hs-away">
              <img src="/b.png" alt="Girona FC">
            </div>
          </li>
          <li>
            <div class="hs-name">Posesión de balón en %</div>
            <div class="hs-value hs-value-home">55%</div>
            <div class="hs-value hs-value-away">45%</div>
          </li>
          <li>
            <div class="hs-name">Tiros a puerta</div>
            <div class="hs-value hs-value-home">6</div>
            <div class="hs-value hs-value-away">3</div>
          </li>
          <li>
            <div class="hs-name">xG</div>
            <div class="hs-value hs-value-home">1,4</div>
            <div class="hs-value hs-value-away">0,8</div>
          </li>
          <li>
            <div class="hs-name">Incompleta</div>
            <div class="hs-value hs-value-home">2</div>
          </li>
        </ul>
    "#;

    #[test]
    fn test_parse_team_stats() {
        let rows = TeamStatsExtractor::new().parse(STATS_HTML);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].stat, "Posesión de balón en %");
        assert_eq!(rows[0].home, StatValue::Int(55));
        assert_eq!(rows[0].away, StatValue::Int(45));
        assert_eq!(rows[0].home_team, "Betis");
        assert_eq!(rows[0].away_team, "Girona FC");

        assert_eq!(rows[1].home, StatValue::Int(6));
        assert_eq!(rows[2].home, StatValue::Float(1.4));
    }

    #[test]
    fn test_missing_block_is_soft_failure() {
        let rows = TeamStatsExtractor::new().parse("<div class='other'></div>");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_row_missing_a_value_is_skipped() {
        let rows = TeamStatsExtractor::new().parse(STATS_HTML);
        assert!(rows.iter().all(|r| r.stat != "Incompleta"));
    }

    const LINEUP_NAV_HTML: &str = r#"
        <nav class="hs-menu-level-top">
          <ul class="hs-menu--list">
            <li><a href="/competition/co97/team-statistics/">Competition stats</a></li>
          </ul>
        </nav>
        <article id="hs-content">
          <nav class="hs-menu-level-sub">
            <ul class="hs-menu--list">
              <li><a href="/match-report/ma123/lineup/">Lineup</a></li>
              <li><a href="/match-report/ma123/team-statistics/">Team statistics</a></li>
            </ul>
          </nav>
        </article>
    "#;

    #[test]
    fn test_find_team_stats_link_scoped_to_match_nav() {
        let link = find_team_stats_link(LINEUP_NAV_HTML, "https://www.livefutbol.com");
        assert_eq!(
            link.as_deref(),
            Some("https://www.livefutbol.com/match-report/ma123/team-statistics/")
        );
    }

    #[test]
    fn test_find_team_stats_link_missing_article() {
        let html = r#"<nav class="hs-menu-level-sub"><ul class="hs-menu--list">
            <li><a href="/match-report/ma1/team-statistics/">x</a></li>
        </ul></nav>"#;
        assert_eq!(find_team_stats_link(html, "https://www.livefutbol.com"), None);
    }
}
