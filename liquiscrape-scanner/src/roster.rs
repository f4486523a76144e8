// Organization ranking and active-squad extraction

use crate::error::{Result, ScanError};
use crate::extractor::stripped_text;
use crate::fetcher::Fetcher;
use crate::result::Fields;
use futures::future::join_all;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_STATISTICS_URL: &str = "https://liquipedia.net/valorant/Portal:Statistics";
pub const ORGANIZATION_HEADING: &str = "Organization";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static DIV_TABLE: LazyLock<Selector> = LazyLock::new(|| selector("div.divTable"));
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| selector("div.divHeaderRow div"));
static DIV_ROW: LazyLock<Selector> = LazyLock::new(|| selector("div.divRow"));
static DIV_CELL: LazyLock<Selector> = LazyLock::new(|| selector("div.divCell"));
static SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static PLAYER_ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr.Player"));
static ID_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td.ID"));

/// A ranked organization and the link to its roster page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub name: String,
    pub active_url: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivePlayer {
    #[serde(rename = "Organization")]
    pub organization: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub player_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct RosterResults {
    pub organizations: Vec<Organization>,
    pub players: Vec<ActivePlayer>,
    pub failed: Vec<(String, String)>,
}

/// Reads the organization ranking from the statistics portal. Rows without
/// an organization name or a roster link are skipped.
pub fn extract_top_organizations(html: &Html, base: &Url) -> Vec<Organization> {
    let Some(table) = html
        .select(&DIV_TABLE)
        .filter(|table| table.html().to_lowercase().contains("organization"))
        .last()
    else {
        return Vec::new();
    };

    let headings: Vec<String> = table
        .select(&HEADER_CELL)
        .map(stripped_text)
        .filter(|heading| !heading.is_empty())
        .collect();

    let mut organizations = Vec::new();
    for row in table.select(&DIV_ROW) {
        let mut values = Vec::new();
        let mut active_url = None;
        for cell in row.select(&DIV_CELL) {
            let text = stripped_text(cell);
            if text.is_empty() {
                continue;
            }
            if cell.select(&SPAN).next().is_some()
                && let Some(href) = cell.select(&LINK).next().and_then(|a| a.value().attr("href"))
            {
                active_url = base.join(href).ok().map(String::from);
            }
            values.push(text);
        }

        let fields: Fields = headings.iter().cloned().zip(values).collect();
        let name = fields.get(ORGANIZATION_HEADING).map(str::to_string);
        match (name, active_url) {
            (Some(name), Some(active_url)) => organizations.push(Organization {
                name,
                active_url,
                fields,
            }),
            _ => debug!("Skipping ranking row without organization link: {:?}", fields),
        }
    }
    organizations
}

/// Players listed in any "active squad" table of an organization page.
pub fn extract_active_players(html: &Html, organization: &str, base: &Url) -> Vec<ActivePlayer> {
    let mut seen = HashSet::new();
    let mut players = Vec::new();

    for table in html
        .select(&TABLE)
        .filter(|table| table.html().to_lowercase().contains("active squad"))
    {
        for row in table.select(&PLAYER_ROW) {
            let Some(cell) = row.select(&ID_CELL).next() else {
                continue;
            };
            let Some(player_url) = cell
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| base.join(href).ok())
            else {
                continue;
            };

            // Wrapper tables repeat their inner rows.
            if !seen.insert(player_url.to_string()) {
                continue;
            }
            players.push(ActivePlayer {
                organization: organization.to_string(),
                id: stripped_text(cell),
                player_url: player_url.to_string(),
            });
        }
    }
    players
}

/// Walks the ranking portal and every ranked organization's roster page.
pub struct RosterScraper {
    fetcher: Arc<Fetcher>,
    base: Url,
    statistics_url: String,
    workers: usize,
}

impl RosterScraper {
    pub fn new(fetcher: Fetcher, base: Url) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            base,
            statistics_url: DEFAULT_STATISTICS_URL.to_string(),
            workers: 10,
        }
    }

    pub fn with_statistics_url(mut self, url: impl Into<String>) -> Self {
        self.statistics_url = url.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub async fn top_organizations(&self) -> Result<Vec<Organization>> {
        let base = &self.base;
        let (_, organizations) = self
            .fetcher
            .fetch_until(&self.statistics_url, |document| {
                let organizations = extract_top_organizations(&document.parse(), base);
                (!organizations.is_empty()).then_some(organizations)
            })
            .await?;
        info!("Found {} ranked organizations", organizations.len());
        Ok(organizations)
    }

    pub async fn run(&self) -> Result<RosterResults> {
        let organizations = self.top_organizations().await?;
        let semaphore = Arc::new(Semaphore::new(self.workers));

        let tasks = organizations.iter().cloned().map(|organization| {
            let fetcher = self.fetcher.clone();
            let base = self.base.clone();
            let semaphore = semaphore.clone();
            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| ScanError::Other(e.to_string()))?;
                let players = fetch_roster(&fetcher, &base, &organization).await;
                Ok::<_, ScanError>((organization, players))
            })
        });

        let mut results = RosterResults::default();
        let total = organizations.len();
        for joined in join_all(tasks).await {
            let (organization, players) = joined??;
            match players {
                Ok(players) => {
                    info!("{}: {} active players", organization.name, players.len());
                    results.players.extend(players);
                }
                Err(e) => {
                    warn!("Giving up on {}: {}", organization.name, e);
                    results.failed.push((organization.active_url.clone(), e.to_string()));
                }
            }
            info!(
                "Queue: {} || Crawled: {}",
                total - results.organizations.len() - 1,
                results.organizations.len() + 1
            );
            results.organizations.push(organization);
        }
        Ok(results)
    }
}

async fn fetch_roster(
    fetcher: &Fetcher,
    base: &Url,
    organization: &Organization,
) -> Result<Vec<ActivePlayer>> {
    let (_, players) = fetcher
        .fetch_until(&organization.active_url, |document| {
            let html = document.parse();
            html.select(&TABLE)
                .next()
                .is_some()
                .then(|| extract_active_players(&html, &organization.name, base))
        })
        .await?;
    Ok(players)
}
