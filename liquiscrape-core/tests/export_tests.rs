// Tests for result export

use chrono::NaiveDate;
use liquiscrape_core::export::{
    ExportFormat, HISTORY_COLUMNS, achievement_sheet, export_active_players, export_results, profile_sheet,
};
use liquiscrape_scanner::result::{AchievementEntry, CrawlResults, HistoryEntry, ProfileRecord};
use liquiscrape_scanner::{ActivePlayer, Fields};
use tempfile::TempDir;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn profile(id: &str, extra: &[(&str, &str)]) -> ProfileRecord {
    let mut record = ProfileRecord::new(id, format!("https://liquipedia.net/valorant/{}", id));
    record.merge(extra.iter().copied().collect());
    record
}

fn sample_results() -> CrawlResults {
    CrawlResults {
        profiles: vec![
            profile("PlayerA", &[("Team:", "TeamX"), ("twitter", "https://twitter.com/a")]),
            profile("PlayerB", &[("Born:", "2000")]),
        ],
        history: vec![HistoryEntry::new("PlayerA", "2020-01-01", "Present", "TeamX")],
        achievements: vec![AchievementEntry::new(
            "PlayerA",
            [("Date", "2023-05-01"), ("Placement", "1st")].into_iter().collect(),
        )],
        ..Default::default()
    }
}

// ============================================================================
// Format Tests
// ============================================================================

#[test]
fn test_export_format_from_str() {
    assert_eq!(ExportFormat::from_str("csv"), Some(ExportFormat::Csv));
    assert_eq!(ExportFormat::from_str("JSON"), Some(ExportFormat::Json));
    assert_eq!(ExportFormat::from_str("xlsx"), None);
}

#[test]
fn test_export_format_extension() {
    assert_eq!(ExportFormat::Csv.extension(), "csv");
    assert_eq!(ExportFormat::Json.extension(), "json");
}

// ============================================================================
// Sheet Tests
// ============================================================================

#[test]
fn test_profile_sheet_keeps_only_present_columns_in_order() {
    let sheet = profile_sheet(&sample_results().profiles);
    assert_eq!(
        sheet.columns,
        vec!["ID", "Born:", "Team:", "Profile URL", "twitter"]
    );
    assert_eq!(sheet.rows[1][0].as_deref(), Some("PlayerB"));
    assert_eq!(sheet.rows[1][2], None);
}

#[test]
fn test_profile_sheet_drops_unlisted_fields() {
    let sheet = profile_sheet(&[profile("PlayerA", &[("Some Label:", "x")])]);
    assert!(!sheet.columns.iter().any(|c| c == "Some Label:"));
}

#[test]
fn test_achievement_sheet_unions_columns() {
    let entries = vec![
        AchievementEntry::new("A", [("Date", "1"), ("Placement", "2nd")].into_iter().collect()),
        AchievementEntry::new("B", [("Date", "2"), ("Prize", "$100")].into_iter().collect::<Fields>()),
    ];
    let sheet = achievement_sheet(&entries);
    assert_eq!(sheet.columns, vec!["ID", "Date", "Placement", "Prize"]);
    assert_eq!(sheet.rows[0][3], None);
    assert_eq!(sheet.rows[1][3].as_deref(), Some("$100"));
}

// ============================================================================
// File Export Tests
// ============================================================================

#[test]
fn test_export_csv_writes_one_file_per_sheet() {
    let dir = TempDir::new().unwrap();
    let written = export_results(&sample_results(), dir.path(), ExportFormat::Csv, date()).unwrap();

    assert_eq!(written.len(), 3);
    let history = dir.path().join("scraped_data_2024-03-01_history.csv");
    assert!(written.contains(&history));

    let content = std::fs::read_to_string(history).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some(HISTORY_COLUMNS.join(",").as_str()));
    assert_eq!(lines.next(), Some("PlayerA,2020-01-01,Present,TeamX"));
}

#[test]
fn test_export_json_writes_workbook() {
    let dir = TempDir::new().unwrap();
    let written = export_results(&sample_results(), dir.path(), ExportFormat::Json, date()).unwrap();
    assert_eq!(written, vec![dir.path().join("scraped_data_2024-03-01.json")]);

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
    assert_eq!(value["profiles"][0]["Team:"], "TeamX");
    // Missing cells are omitted
    assert!(value["profiles"][1].get("Team:").is_none());
    assert_eq!(value["achievements"][0]["Placement"], "1st");
}

#[test]
fn test_export_creates_output_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("out").join("today");
    export_results(&CrawlResults::default(), &nested, ExportFormat::Csv, date()).unwrap();
    assert!(nested.join("scraped_data_2024-03-01_profiles.csv").exists());
}

#[test]
fn test_export_active_players() {
    let dir = TempDir::new().unwrap();
    let players = vec![ActivePlayer {
        organization: "TeamX".to_string(),
        id: "PlayerA".to_string(),
        player_url: "https://liquipedia.net/valorant/PlayerA".to_string(),
    }];
    let path = export_active_players(&players, dir.path(), date()).unwrap();

    assert_eq!(path, dir.path().join("active_players_2024-03-01.csv"));
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(
        content,
        "Organization,ID,player_url\nTeamX,PlayerA,https://liquipedia.net/valorant/PlayerA\n"
    );
}

#[test]
fn test_export_active_players_empty_has_header() {
    let dir = TempDir::new().unwrap();
    let path = export_active_players(&[], dir.path(), date()).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "Organization,ID,player_url\n");
}
