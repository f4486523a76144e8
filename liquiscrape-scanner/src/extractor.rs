use crate::fetcher::Document;
use crate::result::{AchievementEntry, Fields, HistoryEntry, ProfileRecord};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Settings headings containing any of these (case-insensitive) are section
/// titles rather than field names.
pub const IGNORE_HEADING_LIST: [&str; 4] = [
    "mouse settings",
    "hardware",
    "crosshair settings",
    "last updated",
];

/// Column inserted before the last achievements heading; its value is the
/// opposing team's icon alt text.
pub const TEAM_2_HEADING: &str = "Team 2";

const TIMEFRAME_SEPARATOR: char = '\u{2014}';
const COMPLETE_LIST_MARKER: &str = "complete list";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h1#firstHeading"));
static BIO_CELL: LazyLock<Selector> = LazyLock::new(|| selector("div.infobox-cell-2"));
static ICON_BOX: LazyLock<Selector> =
    LazyLock::new(|| selector("div.infobox-center.infobox-icons"));
static EXTERNAL_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.external"));
static ICON: LazyLock<Selector> = LazyLock::new(|| selector("i"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static BODY_ROW: LazyLock<Selector> = LazyLock::new(|| selector("tbody tr"));
static TIMEFRAME_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td.th-mono"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| selector("th"));
static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static TEAM_ICON_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td.results-team-icon"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static INFOBOX_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| selector("div.infobox-image a.image img"));
static ANY_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("div a.image img"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("missing {0}")]
    MissingElement(&'static str),

    #[error("{element} has no {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("malformed {what}: '{value}'")]
    Malformed { what: &'static str, value: String },
}

/// `Ok(None)` means the section is not on the page, which is normal.
/// `Err` means it is there but not in the shape we understand.
pub type StageResult<T> = std::result::Result<Option<T>, StageError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Extracted(usize),
    Absent,
    Malformed(StageError),
}

impl StageStatus {
    fn of<T>(result: &StageResult<T>, count: impl FnOnce(&T) -> usize) -> Self {
        match result {
            Ok(Some(value)) => StageStatus::Extracted(count(value)),
            Ok(None) => StageStatus::Absent,
            Err(e) => StageStatus::Malformed(e.clone()),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, StageStatus::Malformed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    pub external_links: StageStatus,
    pub history: StageStatus,
    pub settings: StageStatus,
    pub achievements: Vec<StageStatus>,
}

impl ExtractionReport {
    pub fn malformed(&self) -> impl Iterator<Item = (&'static str, &StageError)> {
        let single = [
            ("external links", &self.external_links),
            ("history", &self.history),
            ("settings", &self.settings),
        ];
        single
            .into_iter()
            .chain(self.achievements.iter().map(|s| ("achievements", s)))
            .filter_map(|(stage, status)| match status {
                StageStatus::Malformed(e) => Some((stage, e)),
                _ => None,
            })
    }
}

/// Everything pulled from one player page.
#[derive(Debug, Clone)]
pub struct PageRecords {
    pub profile: ProfileRecord,
    pub history: Vec<HistoryEntry>,
    pub achievements: Vec<AchievementEntry>,
    pub image_source: Option<String>,
    pub report: ExtractionReport,
}

impl PageRecords {
    pub fn name(&self) -> &str {
        self.profile.id()
    }
}

/// Tables on a player page, bucketed by role. The first table on the page
/// is always taken as team history, whatever its class.
#[derive(Debug, Default)]
pub struct SortedTables<'a> {
    pub history: Option<ElementRef<'a>>,
    pub settings: Vec<ElementRef<'a>>,
    pub achievements: Vec<ElementRef<'a>>,
}

/// Turns a player page into records. Stages run independently; only a
/// missing title rejects the whole page.
#[derive(Debug, Clone)]
pub struct Extractor {
    ignore_headings: Vec<String>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            ignore_headings: IGNORE_HEADING_LIST.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignored_headings(mut self, headings: Vec<String>) -> Self {
        self.ignore_headings = headings.into_iter().map(|h| h.to_lowercase()).collect();
        self
    }

    /// Returns `None` when the page has no player title, which usually means
    /// the proxy served something other than the wiki page.
    pub fn extract(&self, document: &Document, profile_url: &str) -> Option<PageRecords> {
        let html = document.parse();
        self.extract_html(&html, profile_url)
    }

    pub fn extract_html(&self, html: &Html, profile_url: &str) -> Option<PageRecords> {
        let (name, bio) = extract_bio(html)?;
        let mut profile = ProfileRecord::new(name.clone(), profile_url);
        profile.merge(bio);

        let links = extract_external_links(html);
        let links_status = StageStatus::of(&links, Fields::len);
        if let Ok(Some(links)) = links {
            profile.merge(links);
        }

        let tables = sort_tables(html);

        let history = match tables.history {
            Some(table) => extract_history(table, &name),
            None => Ok(None),
        };
        let history_status = StageStatus::of(&history, Vec::len);
        let history = history.ok().flatten().unwrap_or_default();

        let mut achievements = Vec::new();
        let mut achievement_statuses = Vec::with_capacity(tables.achievements.len());
        for table in &tables.achievements {
            let result = extract_achievements(*table, &name);
            achievement_statuses.push(StageStatus::of(&result, Vec::len));
            if let Ok(Some(entries)) = result {
                achievements.extend(entries);
            }
        }

        let settings = extract_settings(&tables.settings, &self.ignore_headings);
        let settings_status = StageStatus::of(&settings, Fields::len);
        if let Ok(Some(settings)) = settings {
            profile.merge(settings);
        }

        let report = ExtractionReport {
            external_links: links_status,
            history: history_status,
            settings: settings_status,
            achievements: achievement_statuses,
        };
        for (stage, error) in report.malformed() {
            debug!("{}: {} stage skipped: {}", name, stage, error);
        }

        Some(PageRecords {
            profile,
            history,
            achievements,
            image_source: extract_image_source(html),
            report,
        })
    }
}

/// Page title and the infobox label/value pairs. Cells alternate label,
/// value; a trailing unpaired label is dropped.
pub fn extract_bio(html: &Html) -> Option<(String, Fields)> {
    let title = html.select(&TITLE).next()?;
    let name = stripped_text(title);
    if name.is_empty() {
        return None;
    }

    let mut labels = Vec::new();
    let mut values = Vec::new();
    for (index, cell) in html.select(&BIO_CELL).enumerate() {
        let text = stripped_text(cell).replace('\u{a0}', " ");
        if index % 2 == 0 {
            labels.push(text);
        } else {
            values.push(text);
        }
    }

    Some((name, labels.into_iter().zip(values).collect()))
}

/// Social links from the infobox icon strip, keyed by site name. Any link
/// that does not fit the expected markup discards the whole stage.
pub fn extract_external_links(html: &Html) -> StageResult<Fields> {
    let Some(container) = html.select(&ICON_BOX).next() else {
        return Ok(None);
    };

    let mut links = Fields::new();
    for link in container.select(&EXTERNAL_LINK) {
        let href = link.value().attr("href").ok_or(StageError::MissingAttribute {
            element: "external link",
            attribute: "href",
        })?;
        let icon = link
            .select(&ICON)
            .next()
            .ok_or(StageError::MissingElement("external link icon"))?;
        let class = icon.value().attr("class").unwrap_or_default();
        let site = class.split_whitespace().nth(1).ok_or_else(|| StageError::Malformed {
            what: "external link icon class",
            value: class.to_string(),
        })?;
        links.insert(site.replace("lp-", ""), href);
    }

    Ok(Some(links))
}

pub fn sort_tables(html: &Html) -> SortedTables<'_> {
    let mut sorted = SortedTables::default();
    for table in html.select(&TABLE) {
        if sorted.history.is_none() {
            sorted.history = Some(table);
        }

        let classes: Vec<&str> = table
            .value()
            .attr("class")
            .unwrap_or_default()
            .split_whitespace()
            .collect();
        if classes == ["wikitable"] {
            sorted.settings.push(table);
        } else if classes.contains(&"wikitable-striped") {
            sorted.achievements.push(table);
        }
    }
    sorted
}

/// Team history rows look like `<td class="th-mono">from — to</td>` followed
/// by a link whose title is the team name.
pub fn extract_history(table: ElementRef<'_>, name: &str) -> StageResult<Vec<HistoryEntry>> {
    let mut entries = Vec::new();
    for row in table.select(&ROW) {
        let cell = row
            .select(&TIMEFRAME_CELL)
            .next()
            .ok_or(StageError::MissingElement("history timeframe cell"))?;
        let timeframe = stripped_text(cell);
        let parts: Vec<&str> = timeframe.split(TIMEFRAME_SEPARATOR).collect();
        let [from, to] = parts.as_slice() else {
            return Err(StageError::Malformed {
                what: "history timeframe",
                value: timeframe.clone(),
            });
        };

        let team = row
            .select(&LINK)
            .next()
            .ok_or(StageError::MissingElement("history team link"))?
            .value()
            .attr("title")
            .ok_or(StageError::MissingAttribute {
                element: "history team link",
                attribute: "title",
            })?;

        entries.push(HistoryEntry::new(name, from.trim(), to.trim(), team));
    }

    if entries.is_empty() {
        Ok(None)
    } else {
        Ok(Some(entries))
    }
}

/// Pairs every kept heading with every non-empty cell by position, across
/// all settings tables. Headings and values that do not line up are
/// silently mispaired; the surplus of the longer list is dropped.
pub fn extract_settings(tables: &[ElementRef<'_>], ignore_headings: &[String]) -> StageResult<Fields> {
    if tables.is_empty() {
        return Ok(None);
    }

    let mut headings = Vec::new();
    let mut values = Vec::new();
    for table in tables {
        for heading in table.select(&HEADER_CELL) {
            let text = stripped_text(heading);
            let lowered = text.to_lowercase();
            if !ignore_headings.iter().any(|ignored| lowered.contains(ignored.as_str())) {
                headings.push(text);
            }
        }
        for cell in table.select(&DATA_CELL) {
            let text = stripped_text(cell);
            if !text.is_empty() {
                values.push(text);
            }
        }
    }

    Ok(Some(headings.into_iter().zip(values).collect()))
}

/// One entry per body row. Repeated cell texts within a row collapse to
/// their first occurrence. The opposing team's icon cell is kept out of that
/// collapse and its alt text is always stored under `Team 2`, which sits
/// before the last heading.
pub fn extract_achievements(table: ElementRef<'_>, name: &str) -> StageResult<Vec<AchievementEntry>> {
    let headings: Vec<String> = table
        .select(&HEADER_CELL)
        .map(spaced_text)
        .filter(|h| !h.to_lowercase().contains(COMPLETE_LIST_MARKER))
        .collect();
    let team_2_position = headings.len().saturating_sub(1);

    let mut entries = Vec::new();
    for row in table.select(&BODY_ROW) {
        let mut data: Vec<String> = Vec::new();
        let mut icon = None;
        for cell in row.select(&DATA_CELL) {
            if icon.is_none() && TEAM_ICON_CELL.matches(&cell) {
                icon = Some(cell);
                continue;
            }
            let text = spaced_text(cell).replace('\u{a0}', "");
            if !data.contains(&text) {
                data.push(text);
            }
        }
        if data.is_empty() && icon.is_none() {
            continue;
        }

        let alt = icon
            .and_then(|cell| cell.select(&IMAGE).next())
            .ok_or(StageError::MissingElement("opposing team icon"))?
            .value()
            .attr("alt")
            .ok_or(StageError::MissingAttribute {
                element: "opposing team icon",
                attribute: "alt",
            })?;

        let mut pairs: Vec<(String, String)> = headings.iter().cloned().zip(data).collect();
        pairs.insert(
            team_2_position.min(pairs.len()),
            (TEAM_2_HEADING.to_string(), alt.to_string()),
        );
        entries.push(AchievementEntry::new(name, pairs.into_iter().collect()));
    }

    if entries.is_empty() {
        return Ok(None);
    }
    Ok(Some(entries))
}

/// `src` of the infobox image, or of the first linked image in any div.
pub fn extract_image_source(html: &Html) -> Option<String> {
    html.select(&INFOBOX_IMAGE)
        .chain(html.select(&ANY_IMAGE))
        .find_map(|img| img.value().attr("src"))
        .map(str::to_string)
}

/// All text nodes, trimmed and concatenated with nothing between them.
pub(crate) fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// All text nodes, trimmed and joined with single spaces.
pub(crate) fn spaced_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const PLAYER_PAGE: &str = r#"
        <html><body>
        <h1 id="firstHeading"><span>PlayerA</span></h1>
        <div class="infobox-image"><a class="image" href="/File:PlayerA.png"><img src="/commons/images/playerA.png" alt="PlayerA"></a></div>
        <div class="infobox-cell-2">Name:</div><div class="infobox-cell-2">Alex&nbsp;Smith</div>
        <div class="infobox-cell-2">Team:</div><div class="infobox-cell-2">TeamX</div>
        <div class="infobox-center infobox-icons">
            <a class="external text" href="https://twitter.com/a"><i class="lp-icon lp-twitter"></i></a>
            <a class="external text" href="https://twitch.tv/a"><i class="lp-icon lp-twitch"></i></a>
        </div>
        <table>
            <tr><td class="th-mono">2019-01-01 — 2020-06-30</td><td><a href="/TeamW" title="TeamW">W</a></td></tr>
            <tr><td class="th-mono">2020-07-01 — Present</td><td><a href="/TeamX" title="TeamX">X</a></td></tr>
        </table>
        <table class="wikitable">
            <tr><th>Mouse Settings</th></tr>
            <tr><th>DPI</th><th>Sensitivity</th></tr>
            <tr><td>800</td><td>0.4</td></tr>
        </table>
        <table class="wikitable-striped">
            <thead><tr><th>Date</th><th>Tournament</th><th>Result</th><th>Complete list of results</th></tr></thead>
            <tbody>
                <tr><td>2024-01-01</td><td>Cup</td><td class="results-team-icon"><img alt="TeamZ" src="/z.png"></td><td>2 : 1</td></tr>
            </tbody>
        </table>
        </body></html>
    "#;

    fn document(body: &str) -> Document {
        Document::new(Url::parse("https://site/playerA").unwrap(), body)
    }

    fn extract(body: &str) -> Option<PageRecords> {
        Extractor::new().extract(&document(body), "https://site/playerA")
    }

    #[test]
    fn test_full_player_page() {
        let records = extract(PLAYER_PAGE).unwrap();
        let profile = &records.profile;

        assert_eq!(records.name(), "PlayerA");
        assert_eq!(profile.get("ID"), Some("PlayerA"));
        assert_eq!(profile.get("Profile URL"), Some("https://site/playerA"));
        assert_eq!(profile.get("Name:"), Some("Alex Smith"));
        assert_eq!(profile.get("Team:"), Some("TeamX"));
        assert_eq!(profile.get("twitter"), Some("https://twitter.com/a"));
        assert_eq!(profile.get("twitch"), Some("https://twitch.tv/a"));
        assert_eq!(profile.get("DPI"), Some("800"));
        assert_eq!(profile.get("Sensitivity"), Some("0.4"));
        assert!(!profile.fields().contains_key("Mouse Settings"));

        assert_eq!(
            records.history,
            vec![
                HistoryEntry::new("PlayerA", "2019-01-01", "2020-06-30", "TeamW"),
                HistoryEntry::new("PlayerA", "2020-07-01", "Present", "TeamX"),
            ]
        );

        assert_eq!(records.achievements.len(), 1);
        let achievement = &records.achievements[0];
        assert_eq!(achievement.get("Date"), Some("2024-01-01"));
        assert_eq!(achievement.get("Tournament"), Some("Cup"));
        assert_eq!(achievement.get("Team 2"), Some("TeamZ"));
        assert_eq!(achievement.get("Result"), Some("2 : 1"));
        assert!(achievement.get("Complete list of results").is_none());

        assert_eq!(records.image_source.as_deref(), Some("/commons/images/playerA.png"));
        assert_eq!(records.report.history, StageStatus::Extracted(2));
        assert_eq!(records.report.external_links, StageStatus::Extracted(2));
        assert!(records.report.malformed().next().is_none());
    }

    #[test]
    fn test_single_settings_table_page() {
        let page = r#"<h1 id="firstHeading">PlayerA</h1>
            <table class="wikitable"><tr><th>Team:</th></tr><tr><td>TeamX</td></tr></table>"#;
        let records = extract(page).unwrap();

        let fields: Vec<(&str, &str)> = records.profile.fields().iter().collect();
        assert_eq!(
            fields,
            vec![
                ("ID", "PlayerA"),
                ("Profile URL", "https://site/playerA"),
                ("Team:", "TeamX"),
            ]
        );
        assert!(records.history.is_empty());
        assert!(records.report.history.is_malformed());
    }

    #[test]
    fn test_missing_title_rejects_page() {
        assert!(extract("<html><body><div class=\"infobox-cell-2\">Name:</div></body></html>").is_none());
        assert!(extract("<html><h1 id=\"firstHeading\">  </h1></html>").is_none());
    }

    #[test]
    fn test_title_only_page_has_identity_fields() {
        let records = extract("<html><h1 id=\"firstHeading\">Solo</h1></html>").unwrap();
        assert_eq!(records.profile.fields().len(), 2);
        assert!(records.history.is_empty());
        assert!(records.achievements.is_empty());
        assert_eq!(records.report.history, StageStatus::Absent);
        assert_eq!(records.report.settings, StageStatus::Absent);
        assert!(records.image_source.is_none());
    }

    #[test]
    fn test_odd_bio_cell_is_dropped() {
        let html = Html::parse_document(
            r#"<h1 id="firstHeading">P</h1>
               <div class="infobox-cell-2">Born:</div><div class="infobox-cell-2">2000</div>
               <div class="infobox-cell-2">Status:</div>"#,
        );
        let (_, bio) = extract_bio(&html).unwrap();
        assert_eq!(bio.len(), 1);
        assert_eq!(bio.get("Born:"), Some("2000"));
    }

    #[test]
    fn test_settings_skip_ignored_headings() {
        let html = Html::parse_document(
            r#"<table class="wikitable">
                 <tr><th>Crosshair Settings</th><th>Color</th><th>Last updated 2024</th></tr>
                 <tr><td>Green</td><td></td></tr>
               </table>"#,
        );
        let tables = sort_tables(&html);
        let ignored: Vec<String> = IGNORE_HEADING_LIST.iter().map(|h| h.to_string()).collect();
        let settings = extract_settings(&tables.settings, &ignored).unwrap().unwrap();

        assert_eq!(settings.len(), 1);
        assert_eq!(settings.get("Color"), Some("Green"));
    }

    #[test]
    fn test_settings_pair_by_position_across_tables() {
        let html = Html::parse_document(
            r#"<table class="wikitable"><tr><th>Mouse</th><th>DPI</th></tr><tr><td>M1</td><td>400</td></tr></table>
               <table class="wikitable"><tr><th>Monitor</th></tr><tr><td>X27</td><td>extra</td></tr></table>"#,
        );
        let tables = sort_tables(&html);
        let settings = extract_settings(&tables.settings, &[]).unwrap().unwrap();

        assert_eq!(settings.keys().collect::<Vec<_>>(), vec!["Mouse", "DPI", "Monitor"]);
        assert_eq!(settings.get("Monitor"), Some("X27"));
    }

    #[test]
    fn test_first_table_is_history_even_when_it_is_settings() {
        let html = Html::parse_document(
            r#"<table class="wikitable"><tr><th>DPI</th></tr><tr><td>800</td></tr></table>"#,
        );
        let tables = sort_tables(&html);
        assert!(tables.history.is_some());
        assert_eq!(tables.settings.len(), 1);

        let history = extract_history(tables.history.unwrap(), "P");
        assert_eq!(history, Err(StageError::MissingElement("history timeframe cell")));
    }

    #[test]
    fn test_history_without_separator_is_malformed() {
        let html = Html::parse_document(
            r#"<table><tr><td class="th-mono">2019-01-01</td><td><a title="T">T</a></td></tr></table>"#,
        );
        let table = sort_tables(&html).history.unwrap();
        match extract_history(table, "P") {
            Err(StageError::Malformed { what, value }) => {
                assert_eq!(what, "history timeframe");
                assert_eq!(value, "2019-01-01");
            }
            other => panic!("expected malformed timeframe, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_links_do_not_reject_page() {
        let page = r#"<h1 id="firstHeading">P</h1>
            <div class="infobox-center infobox-icons">
                <a class="external" href="https://x/a"><i class="lp-x"></i></a>
            </div>"#;
        let records = extract(page).unwrap();
        assert!(records.report.external_links.is_malformed());
        assert_eq!(records.profile.fields().len(), 2);
    }

    #[test]
    fn test_achievement_row_without_icon_discards_table() {
        let html = Html::parse_document(
            r#"<table class="wikitable-striped">
                 <tr><th>Date</th><th>Result</th></tr>
                 <tr><td>2024</td><td>1st</td></tr>
               </table>"#,
        );
        let tables = sort_tables(&html);
        let result = extract_achievements(tables.achievements[0], "P");
        assert_eq!(result, Err(StageError::MissingElement("opposing team icon")));
    }

    #[test]
    fn test_achievement_duplicate_cells_collapse() {
        let html = Html::parse_document(
            r#"<table class="wikitable-striped">
                 <thead><tr><th>Place</th><th>Event</th><th>Score</th></tr></thead>
                 <tbody><tr><td>1st</td><td>1st</td><td class="results-team-icon"><img alt="Rival"></td><td>3-0</td></tr></tbody>
               </table>"#,
        );
        let tables = sort_tables(&html);
        let entries = extract_achievements(tables.achievements[0], "P").unwrap().unwrap();

        // "1st" appears once, so the remaining values are [1st, 3-0]
        let entry = &entries[0];
        assert_eq!(entry.fields.keys().collect::<Vec<_>>(), vec!["Place", "Event", "Team 2"]);
        assert_eq!(entry.get("Place"), Some("1st"));
        assert_eq!(entry.get("Event"), Some("3-0"));
        assert_eq!(entry.get("Team 2"), Some("Rival"));
    }

    #[test]
    fn test_achievement_team_2_survives_empty_cell_before_icon() {
        let html = Html::parse_document(
            r#"<table class="wikitable-striped">
                 <thead><tr><th>Date</th><th>Tier</th><th>Tournament</th><th>Score</th></tr></thead>
                 <tbody><tr>
                   <td>2024-01-01</td><td><img alt="S"></td><td>Cup</td>
                   <td class="results-team-icon"><img alt="Rival"></td><td>2 : 1</td>
                 </tr></tbody>
               </table>"#,
        );
        let tables = sort_tables(&html);
        let entries = extract_achievements(tables.achievements[0], "P").unwrap().unwrap();

        let entry = &entries[0];
        assert_eq!(
            entry.fields.keys().collect::<Vec<_>>(),
            vec!["Date", "Tier", "Tournament", "Team 2", "Score"]
        );
        assert_eq!(entry.get("Tier"), Some(""));
        assert_eq!(entry.get("Tournament"), Some("Cup"));
        assert_eq!(entry.get("Team 2"), Some("Rival"));
        assert_eq!(entry.get("Score"), Some("2 : 1"));
    }

    #[test]
    fn test_image_source_falls_back_to_any_linked_image() {
        let html = Html::parse_document(
            r#"<div class="content"><a class="image"><img src="/fallback.png"></a></div>"#,
        );
        assert_eq!(extract_image_source(&html).as_deref(), Some("/fallback.png"));
    }
}
