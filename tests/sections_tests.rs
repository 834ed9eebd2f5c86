// tests/sections_tests.rs

use docweave::document::{Block, Cell, Document, Paragraph, Row, Run, Table};
use docweave::sections::{remove_sections, repeat_sections};
use pretty_assertions::assert_eq;

fn doc(lines: &[&str]) -> Document {
    Document::new(lines.iter().map(|line| Block::paragraph(*line)).collect())
}

fn texts(doc: &Document) -> Vec<String> {
    doc.paragraph_texts()
}

// ============================================================================
// Repetition
// ============================================================================

#[test]
fn test_repeat_with_override() {
    let mut doc = doc(&[
        "Intro",
        "repeat_start_3",
        "Contract <<CN_Ord>>: <<CN_Value:curr>>",
        "repeat_end",
        "Outro",
    ]);
    repeat_sections(&mut doc, 1);
    assert_eq!(
        texts(&doc),
        vec![
            "Intro",
            "Contract <<C1_Ord>>: <<C1_Value:curr>>",
            "Contract <<C2_Ord>>: <<C2_Value:curr>>",
            "Contract <<C3_Ord>>: <<C3_Value:curr>>",
            "Outro",
        ]
    );
}

#[test]
fn test_repeat_with_learned_count() {
    let mut doc = doc(&["REPEAT_START", "<<CN_Name>>", "<<CN_Date>>", "Repeat_End"]);
    repeat_sections(&mut doc, 2);
    assert_eq!(
        texts(&doc),
        vec!["<<C1_Name>>", "<<C1_Date>>", "<<C2_Name>>", "<<C2_Date>>"]
    );
}

#[test]
fn test_placeholder_outside_tags_is_kept() {
    let mut doc = doc(&["repeat_start", "CNN news: <<CN_Title>>", "repeat_end"]);
    repeat_sections(&mut doc, 1);
    assert_eq!(texts(&doc), vec!["CNN news: <<C1_Title>>"]);
}

#[test]
fn test_placeholder_split_over_runs() {
    let split = Paragraph::new(vec![Run::new("<"), Run::new("<C"), Run::new("N_Ord>>")]);
    let mut doc = Document::new(vec![
        Block::paragraph("repeat_start"),
        Block::Paragraph(split),
        Block::paragraph("repeat_end"),
    ]);
    repeat_sections(&mut doc, 2);
    assert_eq!(texts(&doc), vec!["<<C1_Ord>>", "<<C2_Ord>>"]);

    // Run structure survives
    let Block::Paragraph(second) = &doc.body[1] else {
        panic!("Expected a paragraph");
    };
    let runs: Vec<&str> = second.runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(runs, vec!["<", "<C", "2_Ord>>"]);
}

#[test]
fn test_zero_count_removes_section() {
    let mut doc = doc(&["a", "repeat_start", "<<CN_Ord>>", "repeat_end", "b"]);
    repeat_sections(&mut doc, 0);
    assert_eq!(texts(&doc), vec!["a", "b"]);
}

#[test]
fn test_several_sections() {
    let mut doc = doc(&[
        "repeat_start_2",
        "<<CN_A>>",
        "repeat_end",
        "middle",
        "repeat_start",
        "<<CN_B>>",
        "repeat_end",
    ]);
    repeat_sections(&mut doc, 1);
    assert_eq!(
        texts(&doc),
        vec!["<<C1_A>>", "<<C2_A>>", "middle", "<<C1_B>>"]
    );
}

#[test]
fn test_repeat_tables() {
    let table = Table::new(vec![Row::new(vec![
        Cell::new(vec![Block::paragraph("Item <<CN_Ord>>")]),
        Cell::new(vec![Block::paragraph("<<CN_Price:curr>>")]),
    ])]);
    let mut doc = Document::new(vec![
        Block::paragraph("repeat_start"),
        Block::Table(table),
        Block::paragraph("repeat_end"),
    ]);
    repeat_sections(&mut doc, 2);
    assert_eq!(doc.body.len(), 2);

    let cell_texts = |block: &Block| -> Vec<String> {
        let Block::Table(t) = block else {
            panic!("Expected a table");
        };
        t.cells()
            .flat_map(|c| c.blocks.iter())
            .filter_map(|b| b.as_paragraph().map(Paragraph::text))
            .collect()
    };
    assert_eq!(cell_texts(&doc.body[0]), vec!["Item <<C1_Ord>>", "<<C1_Price:curr>>"]);
    assert_eq!(cell_texts(&doc.body[1]), vec!["Item <<C2_Ord>>", "<<C2_Price:curr>>"]);
}

#[test]
fn test_orphan_end_marker_is_ignored() {
    let mut doc = doc(&["a", "repeat_end", "b"]);
    repeat_sections(&mut doc, 3);
    assert_eq!(texts(&doc), vec!["a", "repeat_end", "b"]);
}

// ============================================================================
// Removal
// ============================================================================

#[test]
fn test_remove_sections() {
    let mut doc = doc(&[
        "keep",
        "Remove_Start",
        "author notes",
        "remove_end",
        "keep too",
        "remove_start",
        "more notes",
        "REMOVE_END",
    ]);
    remove_sections(&mut doc);
    assert_eq!(texts(&doc), vec!["keep", "keep too"]);
}

#[test]
fn test_remove_without_start() {
    let mut doc = doc(&["a", "remove_end"]);
    remove_sections(&mut doc);
    assert_eq!(texts(&doc), vec!["a", "remove_end"]);
}
