//! Per-document report pipeline.
//!
//! 1. Special tags (`<<<...>>>`) run first, in order, and are replaced
//!    with nothing. They typically set the repetition count.
//! 2. Repeated sections are expanded and `C<i>_Ord` is bound for each copy.
//! 3. Ordinary tags (`<<...>>`) of the expanded document run in order,
//!    sharing global bindings from one tag to the next.
//! 4. Results replace the tags, removed sections are dropped and the
//!    document is saved.
//!
//! A failing tag is logged and left in place; it never aborts the
//! document.
use crate::{
    config::ReportConfig,
    document::{Document, DocumentError},
    format::{self, FormatError},
    host::{WorkbookHost, workbook_bindings},
    interpreter::{Interpreter, MemberHost, ScriptError},
    replace::{ReplaceError, Replacer, ordered_replace},
    sections::{remove_sections, repeat_sections},
    tags::{ORDINARY, SPECIAL, Tag, extract_tags},
    value::{Bindings, Value},
    workbook::{Workbook, WorkbookError},
};
use chrono::Local;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Workbook(#[from] WorkbookError),

    #[error(transparent)]
    Replace(#[from] ReplaceError),
}

/// Why a single tag produced no replacement.
#[derive(Debug, Error)]
enum TagFailure {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub special_tags: usize,
    pub tags: usize,
    pub failed: usize,
    pub repeat_count: usize,
}

/// One template filled from one workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportJob {
    pub template: PathBuf,
    pub workbook: PathBuf,
    pub output: PathBuf,
}

impl ReportJob {
    /// A job writing next to the workbook, see [`default_output_path`].
    pub fn new(template: impl Into<PathBuf>, workbook: impl Into<PathBuf>) -> Self {
        let workbook = workbook.into();
        ReportJob {
            template: template.into(),
            output: default_output_path(&workbook),
            workbook,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}

/// `<dir>/<stem> output.json` for a workbook at `<dir>/<stem>.<ext>`.
pub fn default_output_path(workbook: &Path) -> PathBuf {
    let stem = workbook
        .file_stem()
        .map_or_else(|| "report".into(), |s| s.to_string_lossy());
    let name = format!("{stem} output.json");
    match workbook.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Loads the workbook and template of `job`, fills the template and saves
/// it.
#[tracing::instrument(level = "debug", skip_all, fields(workbook = %job.workbook.display()))]
pub fn produce_report(job: &ReportJob, config: &ReportConfig) -> Result<ReportSummary, ReportError> {
    let workbook = Workbook::load(&job.workbook)?;
    let bindings = workbook_bindings(&workbook, Local::now().naive_local());
    let mut document = Document::load(&job.template)?;

    let summary = generate(&mut document, bindings, &WorkbookHost, config)?;

    document.save(&job.output)?;
    debug!("Saved {}", job.output.display());
    Ok(summary)
}

/// Runs the tag pipeline over an in-memory document.
pub fn generate(
    document: &mut Document,
    bindings: Bindings,
    host: &dyn MemberHost,
    config: &ReportConfig,
) -> Result<ReportSummary, ReportError> {
    let mut pass = Pass {
        vars: bindings,
        host,
        config,
        summary: ReportSummary::default(),
    };

    pass.run_special_tags(document)?;

    let count = pass.repeat_count();
    pass.summary.repeat_count = count;
    debug!("Repeating sections {count} times");
    repeat_sections(document, count);
    for i in 1..=count {
        pass.vars.insert(format!("C{i}_Ord"), Value::Integer(i as i64));
    }

    pass.run_ordinary_tags(document)?;

    remove_sections(document);
    Ok(pass.summary)
}

struct Pass<'a> {
    vars: Bindings,
    host: &'a dyn MemberHost,
    config: &'a ReportConfig,
    summary: ReportSummary,
}

impl Pass<'_> {
    /// Runs `program` with the shared bindings as its global scope, taking
    /// the globals back afterwards whether or not it succeeded.
    fn interpret(&mut self, program: &str) -> Result<Value, ScriptError> {
        let globals = std::mem::take(&mut self.vars);
        let mut interpreter = Interpreter::new(globals)
            .with_host(self.host)
            .with_options(self.config.interpreter_options());
        let result = interpreter.run(program);
        self.vars = interpreter.into_globals();
        result
    }

    fn run_special_tags(&mut self, document: &mut Document) -> Result<(), ReportError> {
        let tags = extract_tags(document, SPECIAL);
        debug!("Found {} special tags", tags.len());
        self.summary.special_tags = tags.len();

        let mut replacers = Vec::with_capacity(tags.len());
        for tag in &tags {
            match self.interpret(tag.body()) {
                Ok(_) => replacers.push(Replacer::new(tag.raw(), "")?),
                Err(e) => self.failed(tag, &e.into()),
            }
        }

        ordered_replace(document, &replacers)?;
        Ok(())
    }

    fn run_ordinary_tags(&mut self, document: &mut Document) -> Result<(), ReportError> {
        let tags = extract_tags(document, ORDINARY);
        debug!("Found {} tags", tags.len());
        self.summary.tags = tags.len();

        let mut replacers = Vec::with_capacity(tags.len());
        for tag in &tags {
            match self.evaluate(tag) {
                Ok(text) => {
                    if self.config.log_tags {
                        info!("{} -> {}", self.preview(tag), text.trim());
                    }
                    replacers.push(Replacer::new(tag.raw(), text)?);
                }
                Err(e) => self.failed(tag, &e),
            }
        }

        ordered_replace(document, &replacers)?;
        Ok(())
    }

    fn evaluate(&mut self, tag: &Tag) -> Result<String, TagFailure> {
        let value = self.interpret(tag.program())?;
        if value.is_null() {
            return Ok(String::new());
        }
        Ok(format::render(&value, tag.format_spec())?)
    }

    /// The count set by the special tags; 0 when they did not set one.
    fn repeat_count(&self) -> usize {
        let name = &self.config.repeat_count_variable;
        match self.vars.get(name) {
            None => 0,
            Some(Value::Integer(n)) => usize::try_from(*n).unwrap_or(0),
            Some(Value::Double(n)) if n.is_finite() && *n > 0.0 => n.trunc() as usize,
            Some(Value::Double(_)) => 0,
            Some(other) => {
                warn!("{name} should be a number, found {}; not repeating", other.type_name());
                0
            }
        }
    }

    fn failed(&mut self, tag: &Tag, error: &TagFailure) {
        self.summary.failed += 1;
        let message = error.to_string().replace('\n', " ");
        warn!("{} -> Error: {message}", self.preview(tag));
    }

    fn preview(&self, tag: &Tag) -> String {
        preview(tag.raw(), self.config.preview_width)
    }
}

/// Multi-line tags are cut to the start of their first line.
pub fn preview(tag: &str, width: usize) -> String {
    match tag.split_once('\n') {
        Some((first, _)) => {
            let head: String = first.chars().take(width).collect();
            format!("{head}...\\n>>")
        }
        None => tag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_previews_are_cut() {
        assert_eq!(preview("<<a + b>>", 16), "<<a + b>>");
        assert_eq!(
            preview("<<let total = 0\nwhile x {}>>", 16),
            "<<let total = 0...\\n>>"
        );
        assert_eq!(preview("<<if x {\n1 }>>", 4), "<<if...\\n>>");
    }

    #[test]
    fn output_path_sits_next_to_workbook() {
        assert_eq!(
            default_output_path(Path::new("/data/acme.json")),
            PathBuf::from("/data/acme output.json")
        );
    }
}
