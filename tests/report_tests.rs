// tests/report_tests.rs

use chrono::NaiveDate;
use docweave::config::ReportConfig;
use docweave::document::{Block, Document};
use docweave::host::{WorkbookHost, workbook_bindings};
use docweave::report::{ReportError, ReportJob, ReportSummary, generate, produce_report};
use docweave::value::Bindings;
use docweave::workbook::Workbook;
use pretty_assertions::assert_eq;
use std::fs;

const WORKBOOK: &str = r#"{
    "sheets": [
        {"name": "Summary", "code_name": "Home", "cells": {
            "A1": "Client", "B1": "Acme Ltd",
            "B2": 2,
            "B3": {"value": 1250.5, "formula": "SUM(Data!C2:C40)"},
            "B4": 45291
        }},
        {"name": "Q1 Data", "cells": {"A1": 10}}
    ],
    "names": {"Count": "Summary!$B$2", "Total": "Summary!$B$3", "Signed": "Summary!$B$4"}
}"#;

fn bindings() -> Bindings {
    let workbook = Workbook::from_json(WORKBOOK).unwrap();
    let now = NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    workbook_bindings(&workbook, now)
}

fn doc(lines: &[&str]) -> Document {
    Document::new(lines.iter().map(|line| Block::paragraph(*line)).collect())
}

fn fill(lines: &[&str]) -> (Vec<String>, ReportSummary) {
    fill_with(lines, &ReportConfig::default())
}

fn fill_with(lines: &[&str], config: &ReportConfig) -> (Vec<String>, ReportSummary) {
    let mut document = doc(lines);
    let summary = generate(&mut document, bindings(), &WorkbookHost, config).unwrap();
    (document.paragraph_texts(), summary)
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn test_full_template() {
    let (texts, summary) = fill(&[
        "<<<NUMBER_OF_CONTRACTS = int.Count>>>",
        "Client: <<Home.B1>>",
        "repeat_start",
        "Contract <<CN_Ord>>",
        "repeat_end",
        "Total: <<num.Total:curr>>",
        "remove_start",
        "Template notes: <<Home.B1>>",
        "remove_end",
    ]);

    assert_eq!(
        texts,
        vec![
            "",
            "Client: Acme Ltd",
            "Contract 1",
            "Contract 2",
            "Total: £ 1,250.50",
        ]
    );
    assert_eq!(
        summary,
        ReportSummary {
            special_tags: 1,
            tags: 5,
            failed: 0,
            repeat_count: 2,
        }
    );
}

#[test]
fn test_bindings_persist_across_tags() {
    let (texts, _) = fill(&["<<let a = 5>> then <<a * 2>>"]);
    assert_eq!(texts, vec!["5 then 10"]);
}

#[test]
fn test_failing_tag_stays_in_place() {
    let (texts, summary) = fill(&["<<let b = 1>>", "<<b = b + 1; nowhere>>", "<<b>> <<missing + 1>>"]);
    // The assignment before the failure still counts
    assert_eq!(texts, vec!["1", "<<b = b + 1; nowhere>>", "2 <<missing + 1>>"]);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.tags, 4);
}

#[test]
fn test_failed_tag_is_not_reused_by_a_later_one() {
    let (texts, summary) = fill(&["A=<<x>> <<let x = 7>> B=<<x>>"]);
    assert_eq!(texts, vec!["A=<<x>> 7 B=7"]);
    assert_eq!(summary.failed, 1);
}

#[test]
fn test_null_renders_empty() {
    let (texts, _) = fill(&["[<<empty>>]", "[<<Home.Z99>>]"]);
    assert_eq!(texts, vec!["[]", "[]"]);
}

#[test]
fn test_format_failure_keeps_tag() {
    let (texts, summary) = fill(&["<<\"text\":sdate>>"]);
    assert_eq!(texts, vec!["<<\"text\":sdate>>"]);
    assert_eq!(summary.failed, 1);
}

#[test]
fn test_conversions() {
    let (texts, _) = fill(&[
        "<<date.Signed:sdate>>",
        "<<formula.Total>>",
        "<<row.Total>>/<<col.Total>>",
        "<<str.Count>>",
        "<<tostr.Count>>",
    ]);
    assert_eq!(texts[0], "31/12/2023");
    assert_eq!(texts[1], "SUM(Data!C2:C40)");
    assert_eq!(texts[2], "3/2");
    // Not text: the tag fails
    assert_eq!(texts[3], "<<str.Count>>");
    assert_eq!(texts[4], "2.0");
}

#[test]
fn test_sheet_access_by_name_and_address_variable() {
    let (texts, _) = fill(&["<<let where = \"A1\">><<Home.where>> <<Sheet2.R1C1>>"]);
    assert_eq!(texts, vec!["A1Client 10.0"]);
}

#[test]
fn test_now_is_bound() {
    let (texts, _) = fill(&["<<Now:sdate>>"]);
    assert_eq!(texts, vec!["15/01/2024"]);
}

// ============================================================================
// Repetition Count
// ============================================================================

#[test]
fn test_unset_count_removes_sections() {
    let (texts, summary) = fill(&["a", "repeat_start", "<<CN_Ord>>", "repeat_end", "b"]);
    assert_eq!(texts, vec!["a", "b"]);
    assert_eq!(summary.repeat_count, 0);
}

#[test]
fn test_double_count_is_truncated() {
    let (texts, _) = fill(&[
        "<<<NUMBER_OF_CONTRACTS = 2.7>>>",
        "repeat_start",
        "<<C2_Ord>>",
        "repeat_end",
    ]);
    assert_eq!(texts, vec!["", "2", "2"]);
}

#[test]
fn test_count_variable_is_configurable() {
    let config = ReportConfig {
        repeat_count_variable: "LOTS".to_string(),
        ..ReportConfig::default()
    };
    let (_, summary) = fill_with(&["<<<LOTS = 3>>>", "<<<NUMBER_OF_CONTRACTS = 1>>>"], &config);
    assert_eq!(summary.repeat_count, 3);
    assert_eq!(summary.special_tags, 2);
}

#[test]
fn test_ordinals_are_bound() {
    let (texts, _) = fill(&["<<<let NUMBER_OF_CONTRACTS = 3>>>", "<<C1_Ord + C2_Ord + C3_Ord>>"]);
    assert_eq!(texts[1], "6");
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_produce_report_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let workbook_path = dir.path().join("acme.json");
    let template_path = dir.path().join("letter.json");
    fs::write(&workbook_path, WORKBOOK).unwrap();
    doc(&["Dear <<Home.B1>>,", "You owe <<num.Total:%.1f>>."])
        .save(&template_path)
        .unwrap();

    let job = ReportJob::new(&template_path, &workbook_path);
    assert_eq!(job.output, dir.path().join("acme output.json"));

    let summary = produce_report(&job, &ReportConfig::default()).unwrap();
    assert_eq!(summary.tags, 2);

    let output = Document::load(&job.output).unwrap();
    assert_eq!(output.paragraph_texts(), vec!["Dear Acme Ltd,", "You owe 1250.5."]);
}

#[test]
fn test_missing_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let job = ReportJob::new(dir.path().join("letter.json"), dir.path().join("none.json"));
    let err = produce_report(&job, &ReportConfig::default()).unwrap_err();
    assert!(matches!(err, ReportError::Workbook(_)));
    assert!(!job.output.exists());
}
