// Export of crawl results to CSV or JSON files

use chrono::NaiveDate;
use liquiscrape_scanner::ActivePlayer;
use liquiscrape_scanner::result::{AchievementEntry, CrawlResults, HistoryEntry, ID_FIELD, ProfileRecord};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Profile columns in output order. Fields not listed here are not exported;
/// listed fields that no profile has are left out of the sheet.
pub const PROFILE_COLUMNS: &[&str] = &[
    "ID",
    "Name:",
    "Romanized Name:",
    "Nationality:",
    "Born:",
    "Status:",
    "Years Active (Player):",
    "Team:",
    "Approx. Total Winnings:",
    "Profile URL",
    "faceit",
    "twitter",
    "twitch",
    "youtube",
    "Mouse",
    "eDPI",
    "DPI",
    "Polling Rate",
    "Sensitivity",
    "Zoom",
    "Raw Input",
    "Curvature",
    "Circumference",
    "Mouse Setup",
    "Raw.",
    "Mousepad",
    "Monitor",
    "Refresh rate",
    "In-game resolution",
    "Keyboard",
    "Headset",
    "Color",
    "Outlines",
    "Center Dot",
    "MoveErr",
    "FiringErr",
    "Fade",
    "Inner Lines",
    "Alternate IDs:",
    "instagram",
    "steam",
    "Main Agents:",
    "esea",
    "facebook",
    "Role:",
    "Scaling",
    "tiktok",
    "reddit",
    "bilibili",
    "vk",
    "Pointer Speed",
    "Outer Lines",
    "esl",
    "5ewin",
];

pub const HISTORY_COLUMNS: [&str; 4] = ["ID", "From", "To", "Team"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// One table of output. A `None` cell is written empty in CSV and omitted
/// in JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: &'static str,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    fn write_csv(&self, path: &Path) -> Result<(), ExportError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Serialize for Sheet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&SheetRow {
                columns: &self.columns,
                cells: row,
            })?;
        }
        seq.end()
    }
}

struct SheetRow<'a> {
    columns: &'a [String],
    cells: &'a [Option<String>],
}

impl Serialize for SheetRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            if let Some(value) = cell {
                map.serialize_entry(column, value)?;
            }
        }
        map.end()
    }
}

struct Workbook<'a>(&'a [Sheet]);

impl Serialize for Workbook<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for sheet in self.0 {
            map.serialize_entry(sheet.name, sheet)?;
        }
        map.end()
    }
}

pub fn profile_sheet(profiles: &[ProfileRecord]) -> Sheet {
    let columns: Vec<String> = PROFILE_COLUMNS
        .iter()
        .filter(|column| profiles.iter().any(|p| p.get(column).is_some()))
        .map(|column| column.to_string())
        .collect();
    let rows = profiles
        .iter()
        .map(|profile| {
            columns
                .iter()
                .map(|column| profile.get(column).map(str::to_string))
                .collect()
        })
        .collect();
    Sheet {
        name: "profiles",
        columns,
        rows,
    }
}

pub fn history_sheet(history: &[HistoryEntry]) -> Sheet {
    Sheet {
        name: "history",
        columns: HISTORY_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: history
            .iter()
            .map(|entry| {
                [&entry.id, &entry.from, &entry.to, &entry.team]
                    .into_iter()
                    .map(|value| Some(value.clone()))
                    .collect()
            })
            .collect(),
    }
}

/// `ID` followed by every achievement column in the order first seen.
pub fn achievement_sheet(entries: &[AchievementEntry]) -> Sheet {
    let mut columns = vec![ID_FIELD.to_string()];
    for entry in entries {
        for key in entry.fields.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.to_string());
            }
        }
    }

    let rows = entries
        .iter()
        .map(|entry| {
            columns
                .iter()
                .map(|column| {
                    if column == ID_FIELD {
                        Some(entry.id.clone())
                    } else {
                        entry.get(column).map(str::to_string)
                    }
                })
                .collect()
        })
        .collect();

    Sheet {
        name: "achievements",
        columns,
        rows,
    }
}

pub fn build_sheets(results: &CrawlResults) -> Vec<Sheet> {
    vec![
        profile_sheet(&results.profiles),
        history_sheet(&results.history),
        achievement_sheet(&results.achievements),
    ]
}

/// Writes the profiles, history and achievements sheets into `dir` and
/// returns the files created.
pub fn export_results(
    results: &CrawlResults,
    dir: &Path,
    format: ExportFormat,
    date: NaiveDate,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;
    let sheets = build_sheets(results);

    let written = match format {
        ExportFormat::Csv => {
            let mut written = Vec::with_capacity(sheets.len());
            for sheet in &sheets {
                let path = dir.join(format!("scraped_data_{}_{}.csv", date, sheet.name));
                sheet.write_csv(&path)?;
                written.push(path);
            }
            written
        }
        ExportFormat::Json => {
            let path = dir.join(format!("scraped_data_{}.json", date));
            let writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(writer, &Workbook(&sheets))?;
            vec![path]
        }
    };

    info!("Records saved to {}", dir.display());
    Ok(written)
}

/// Writes `active_players_<date>.csv`, which can be fed straight back in
/// as a seed file.
pub fn export_active_players(
    players: &[ActivePlayer],
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("active_players_{}.csv", date));
    let mut writer = csv::Writer::from_path(&path)?;
    if players.is_empty() {
        writer.write_record(["Organization", "ID", "player_url"])?;
    }
    for player in players {
        writer.serialize(player)?;
    }
    writer.flush()?;
    info!("Saved {} active players to {}", players.len(), path.display());
    Ok(path)
}
