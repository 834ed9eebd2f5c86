// tests/replace_tests.rs

use docweave::document::{Block, Cell, ContentControl, Document, Paragraph, Row, Run, Table};
use docweave::replace::{ReplaceError, Replacer, ordered_replace};
use pretty_assertions::assert_eq;
use serde_json::json;

fn replacer(bookmark: &str, replacement: &str) -> Replacer {
    Replacer::new(bookmark, replacement).unwrap()
}

fn runs(block: &Block) -> Vec<String> {
    match block {
        Block::Paragraph(p) => p.runs.iter().map(|r| r.text.clone()).collect(),
        other => panic!("Expected a paragraph, got {other:?}"),
    }
}

fn bold(text: &str) -> Run {
    let mut run = Run::new(text);
    run.props.insert("bold".to_string(), json!(true));
    run
}

// ============================================================================
// Paragraphs
// ============================================================================

#[test]
fn test_tag_split_over_runs() {
    let paragraph = Paragraph::new(vec![Run::new("Hello "), Run::new("<<na"), Run::new("me>> !")]);
    let mut doc = Document::new(vec![Block::Paragraph(paragraph)]);

    ordered_replace(&mut doc, &[replacer("<<name>>", "John")]).unwrap();
    assert_eq!(doc.paragraph_texts(), vec!["Hello John !"]);
}

#[test]
fn test_tag_inside_one_run() {
    let mut doc = Document::new(vec![Block::paragraph("Total: <<t>> EUR")]);
    ordered_replace(&mut doc, &[replacer("<<t>>", "12")]).unwrap();
    assert_eq!(doc.paragraph_texts(), vec!["Total: 12 EUR"]);
    assert_eq!(runs(&doc.body[0]), vec!["Total: ", "12 EUR"]);
}

#[test]
fn test_replacement_takes_first_run_formatting() {
    let paragraph = Paragraph::new(vec![Run::new("x "), bold("<<a"), Run::new(">> y")]);
    let mut doc = Document::new(vec![Block::Paragraph(paragraph)]);
    ordered_replace(&mut doc, &[replacer("<<a>>", "A")]).unwrap();

    let Block::Paragraph(p) = &doc.body[0] else {
        panic!("Expected a paragraph");
    };
    let inserted = p.runs.iter().find(|r| r.text == "A").unwrap();
    assert_eq!(inserted.props.get("bold"), Some(&json!(true)));
    assert_eq!(p.text(), "x A y");
}

#[test]
fn test_multi_line_replacement() {
    let mut doc = Document::new(vec![Block::paragraph("<<address>>")]);
    ordered_replace(&mut doc, &[replacer("<<address>>", "1 High St\nLeeds")]).unwrap();
    assert_eq!(runs(&doc.body[0]), vec!["", "1 High St", "\n", "Leeds"]);
}

#[test]
fn test_empty_replacement() {
    let mut doc = Document::new(vec![Block::paragraph("a<<<let n = 2>>>b")]);
    ordered_replace(&mut doc, &[replacer("<<<let n = 2>>>", "")]).unwrap();
    assert_eq!(doc.paragraph_texts(), vec!["ab"]);

    let mut doc = Document::new(vec![Block::paragraph("<<a>>")]);
    ordered_replace(&mut doc, &[replacer("<<a>>", "")]).unwrap();
    assert_eq!(runs(&doc.body[0]), vec![""]);
}

#[test]
fn test_same_tag_twice_in_paragraph() {
    let mut doc = Document::new(vec![Block::paragraph("<<x>> and <<x>>")]);
    ordered_replace(&mut doc, &[replacer("<<x>>", "1"), replacer("<<x>>", "2")]).unwrap();
    assert_eq!(doc.paragraph_texts(), vec!["1 and 2"]);
}

#[test]
fn test_search_resumes_after_previous_replacement() {
    // The first replacement produces the next bookmark's text
    let mut doc = Document::new(vec![Block::paragraph("<<a>> <<b>> <<a>>")]);
    ordered_replace(&mut doc, &[replacer("<<a>>", "<<b>>"), replacer("<<b>>", "B")]).unwrap();
    assert_eq!(doc.paragraph_texts(), vec!["<<b>> B <<a>>"]);

    // A skipped occurrence is not revisited
    let paragraph = Paragraph::new(vec![Run::new("<<x"), Run::new(">> <<y>> "), Run::new("<<x>>")]);
    let mut doc = Document::new(vec![Block::Paragraph(paragraph)]);
    ordered_replace(&mut doc, &[replacer("<<y>>", "Y"), replacer("<<x>>", "X")]).unwrap();
    assert_eq!(doc.paragraph_texts(), vec!["<<x>> Y X"]);
}

#[test]
fn test_false_start_before_match() {
    let mut doc = Document::new(vec![Block::paragraph("a << b <<c>>")]);
    ordered_replace(&mut doc, &[replacer("<<c>>", "C")]).unwrap();
    assert_eq!(doc.paragraph_texts(), vec!["a << b C"]);
}

#[test]
fn test_replacers_apply_in_order() {
    let mut doc = Document::new(vec![
        Block::paragraph("<<a>>"),
        Block::paragraph("plain"),
        Block::paragraph("<<b>> <<c>>"),
    ]);
    let replacers = [replacer("<<a>>", "1"), replacer("<<b>>", "2"), replacer("<<c>>", "3")];
    ordered_replace(&mut doc, &replacers).unwrap();
    assert_eq!(doc.paragraph_texts(), vec!["1", "plain", "2 3"]);
}

// ============================================================================
// Tables and Content Controls
// ============================================================================

#[test]
fn test_tables_are_recursed() {
    let table = Table::new(vec![
        Row::new(vec![
            Cell::new(vec![Block::paragraph("<<a>>")]),
            Cell::new(vec![Block::paragraph("<<b>>")]),
        ]),
        Row::new(vec![Cell::new(vec![Block::paragraph("<<c>>")])]),
    ]);
    let mut doc = Document::new(vec![Block::Table(table), Block::paragraph("<<d>>")]);
    let replacers = [
        replacer("<<a>>", "1"),
        replacer("<<b>>", "2"),
        replacer("<<c>>", "3"),
        replacer("<<d>>", "4"),
    ];
    ordered_replace(&mut doc, &replacers).unwrap();

    let Block::Table(t) = &doc.body[0] else {
        panic!("Expected a table");
    };
    let cells: Vec<String> = t
        .cells()
        .map(|c| runs(&c.blocks[0]).concat())
        .collect();
    assert_eq!(cells, vec!["1", "2", "3"]);
    assert_eq!(doc.paragraph_texts(), vec!["4"]);
}

#[test]
fn test_content_control_consumes_without_editing() {
    let mut doc = Document::new(vec![
        Block::ContentControl(ContentControl {
            text: "Locked <<x>>".to_string(),
        }),
        Block::paragraph("<<y>>"),
    ]);
    ordered_replace(&mut doc, &[replacer("<<x>>", "1"), replacer("<<y>>", "2")]).unwrap();

    let Block::ContentControl(c) = &doc.body[0] else {
        panic!("Expected a content control");
    };
    assert_eq!(c.text, "Locked <<x>>");
    assert_eq!(doc.paragraph_texts(), vec!["2"]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unconsumed_replacers() {
    let mut doc = Document::new(vec![Block::paragraph("<<a>>")]);
    let err = ordered_replace(&mut doc, &[replacer("<<a>>", "1"), replacer("<<gone>>", "2")])
        .unwrap_err();
    assert_eq!(
        err,
        ReplaceError::Unconsumed {
            remaining: 1,
            total: 2
        }
    );
    assert_eq!(
        err.to_string(),
        "The replacers were not fully consumed: 1 of 2 remain"
    );
}

#[test]
fn test_blank_bookmark() {
    assert_eq!(Replacer::new("  ", "x"), Err(ReplaceError::BlankBookmark));
}
