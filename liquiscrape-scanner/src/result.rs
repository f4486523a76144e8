use crate::extractor::PageRecords;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Serialize as DeriveSerialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const ID_FIELD: &str = "ID";
pub const PROFILE_URL_FIELD: &str = "Profile URL";

/// Field name to value, in first-insertion order. Re-inserting a key
/// replaces its value without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn merge(&mut self, other: Fields) {
        for (key, value) in other.0 {
            self.insert(key, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Everything known about one crawled player. `ID` and `Profile URL` are
/// always present.
#[derive(Debug, Clone, PartialEq, Eq, DeriveSerialize)]
pub struct ProfileRecord {
    #[serde(skip)]
    id: String,
    #[serde(flatten)]
    fields: Fields,
}

impl ProfileRecord {
    pub fn new(id: impl Into<String>, profile_url: impl Into<String>) -> Self {
        let id = id.into();
        let mut fields = Fields::new();
        fields.insert(ID_FIELD, id.clone());
        fields.insert(PROFILE_URL_FIELD, profile_url);
        Self { id, fields }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn profile_url(&self) -> &str {
        self.fields.get(PROFILE_URL_FIELD).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn merge(&mut self, fields: Fields) {
        self.fields.merge(fields);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, DeriveSerialize)]
pub struct HistoryEntry {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Team")]
    pub team: String,
}

impl HistoryEntry {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        team: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            team: team.into(),
        }
    }
}

/// One tournament result row, keyed by the achievements table headers.
#[derive(Debug, Clone, PartialEq, Eq, DeriveSerialize)]
pub struct AchievementEntry {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl AchievementEntry {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, DeriveSerialize)]
pub struct ImageAsset {
    pub name: String,
    pub source_url: String,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, DeriveSerialize)]
pub struct FailedJob {
    pub url: String,
    pub error: String,
}

/// Everything a crawl produced, in completion order.
#[derive(Debug, Clone, Default, DeriveSerialize)]
pub struct CrawlResults {
    pub profiles: Vec<ProfileRecord>,
    pub history: Vec<HistoryEntry>,
    pub achievements: Vec<AchievementEntry>,
    pub images: Vec<ImageAsset>,
    pub crawled: Vec<String>,
    pub failed: Vec<FailedJob>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlProgress {
    pub crawled: usize,
    pub failed: usize,
    pub images: usize,
}

/// Shared sink for worker output. Every method takes the lock once, so a
/// page's profile, history and achievements land together.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    inner: Arc<Mutex<CrawlResults>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_page(&self, records: PageRecords) {
        let PageRecords {
            profile,
            history,
            achievements,
            ..
        } = records;
        let mut results = self.inner.lock().await;
        results.profiles.push(profile);
        results.history.extend(history);
        results.achievements.extend(achievements);
    }

    pub async fn record_image(&self, asset: ImageAsset) {
        self.inner.lock().await.images.push(asset);
    }

    pub async fn record_failure(&self, url: &str, error: impl ToString) {
        self.inner.lock().await.failed.push(FailedJob {
            url: url.to_string(),
            error: error.to_string(),
        });
    }

    pub async fn mark_crawled(&self, url: &str) -> CrawlProgress {
        let mut results = self.inner.lock().await;
        results.crawled.push(url.to_string());
        Self::progress_of(&results)
    }

    pub async fn progress(&self) -> CrawlProgress {
        Self::progress_of(&*self.inner.lock().await)
    }

    pub async fn snapshot(&self) -> CrawlResults {
        self.inner.lock().await.clone()
    }

    fn progress_of(results: &CrawlResults) -> CrawlProgress {
        CrawlProgress {
            crawled: results.crawled.len(),
            failed: results.failed.len(),
            images: results.images.len(),
        }
    }
}
