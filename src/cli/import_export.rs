use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::config::ConfigError;
use crate::storage::ser::{self, ReadOptions};
use crate::storage::{PageRecord, PageStore};
use crate::types::{PageId, RouteError, WikiError};

/// Column names understood by the importer and written by the exporter.
pub const COLUMNS: [&str; 4] = ["id", "title", "redirect", "links"];
const LINK_SEPARATOR: char = '|';

/// Configuration for turning a page table into a serialized graph.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// CSV or TSV file with one row per page.
    pub input: PathBuf,
    /// Graph file to write.
    pub output: PathBuf,
    /// Field delimiter of `input`.
    pub delimiter: u8,
}

impl ImportConfig {
    /// Import from `input` into `output`, picking a tab delimiter for `.tsv` inputs.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let delimiter = delimiter_for(&input);
        Self {
            input,
            output: output.into(),
            delimiter,
        }
    }
}

/// Summary statistics from an import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    /// Pages written.
    pub pages: u64,
    /// Of which redirects.
    pub redirects: u64,
    /// Links across all pages.
    pub links: u64,
    /// Size of the written graph file.
    pub bytes_written: u64,
}

/// Configuration for writing a serialized graph back out as a page table.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Graph file to read.
    pub graph: PathBuf,
    /// CSV or TSV file to write.
    pub output: PathBuf,
    /// Field delimiter of `output`.
    pub delimiter: u8,
    /// How the graph is mapped.
    pub read: ReadOptions,
}

impl ExportConfig {
    /// Export `graph` to `output`, picking a tab delimiter for `.tsv` outputs.
    pub fn new(graph: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let delimiter = delimiter_for(&output);
        Self {
            graph: graph.into(),
            output,
            delimiter,
            read: ReadOptions::default(),
        }
    }
}

/// Summary statistics from an export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    /// Rows written.
    pub pages: u64,
}

/// Error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV parsing or writing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Graph encoding, decoding or indexing error.
    #[error(transparent)]
    Graph(#[from] WikiError),
    /// Route query without a route.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// Config file error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}

/// Reads the page table, encodes every row and writes the graph sorted by title.
///
/// Links are deduplicated and sorted per page. Fails on duplicate ids or titles, and on
/// redirects that do not carry exactly one link.
pub fn run_import(cfg: &ImportConfig) -> Result<ImportSummary, CliError> {
    let pages = read_pages(&cfg.input, cfg.delimiter)?;
    let store = PageStore::new(pages)?;
    for pair in store.pages().windows(2) {
        if pair[0].title_bytes() == pair[1].title_bytes() {
            return Err(CliError::Message(format!(
                "duplicate title '{}'",
                pair[0].title()
            )));
        }
    }
    let mut summary = ImportSummary::default();
    for page in store.pages() {
        summary.pages += 1;
        summary.links += page.link_count() as u64;
        if page.is_redirect() {
            summary.redirects += 1;
        }
    }
    summary.bytes_written = ser::save(&cfg.output, store.pages())?;
    info!(
        input = %cfg.input.display(),
        output = %cfg.output.display(),
        pages = summary.pages,
        "import finished"
    );
    Ok(summary)
}

/// Writes every page of a serialized graph as one row, in stored order.
pub fn run_export(cfg: &ExportConfig) -> Result<ExportSummary, CliError> {
    let pages = ser::open(&cfg.graph, &cfg.read)?;
    let mut writer = WriterBuilder::new()
        .delimiter(cfg.delimiter)
        .from_path(&cfg.output)?;
    writer.write_record(COLUMNS)?;
    for page in &pages {
        writer.write_record(export_row(page))?;
    }
    writer.flush()?;
    Ok(ExportSummary {
        pages: pages.len() as u64,
    })
}

/// Parses a page table into records.
pub fn read_pages(path: &Path, delimiter: u8) -> Result<Vec<PageRecord>, CliError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = Columns {
        id: find_column(&headers, "id")?,
        title: find_column(&headers, "title")?,
        redirect: find_column(&headers, "redirect")?,
        links: find_column(&headers, "links")?,
    };
    let mut pages = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        // Row numbers are 1-based and count the header.
        pages.push(parse_row(&record, &columns, row + 2)?);
    }
    Ok(pages)
}

struct Columns {
    id: usize,
    title: usize,
    redirect: usize,
    links: usize,
}

fn parse_row(record: &StringRecord, columns: &Columns, row: usize) -> Result<PageRecord, CliError> {
    let raw_id = get_required(record, columns.id, "id")?;
    let id: u32 = raw_id
        .parse()
        .map_err(|_| CliError::Message(format!("row {row}: invalid page id '{raw_id}'")))?;
    let title = record
        .get(columns.title)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Message(format!("row {row}: missing title")))?;
    let is_redirect = parse_flag(record.get(columns.redirect).unwrap_or(""))
        .ok_or_else(|| CliError::Message(format!("row {row}: invalid redirect flag")))?;
    let mut links = parse_links(record.get(columns.links).unwrap_or(""))
        .map_err(|bad| CliError::Message(format!("row {row}: invalid link id '{bad}'")))?;
    links.sort_unstable();
    links.dedup();
    if is_redirect && links.len() != 1 {
        return Err(CliError::Message(format!(
            "row {row}: redirect '{title}' must have exactly one link"
        )));
    }
    Ok(PageRecord::encode(PageId(id), &links, title, is_redirect)?)
}

fn export_row(page: &PageRecord) -> [String; 4] {
    let links: Vec<String> = page.links().map(|id| id.0.to_string()).collect();
    [
        page.id().0.to_string(),
        page.title().into_owned(),
        page.is_redirect().to_string(),
        links.join("|"),
    ]
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize, CliError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| CliError::Message(format!("column '{}' not found", name)))
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, CliError> {
    record
        .get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Message(format!("missing value for column '{}'", name)))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Some(false),
        "1" | "true" | "yes" => Some(true),
        _ => None,
    }
}

fn parse_links(raw: &str) -> Result<Vec<PageId>, String> {
    raw.split(LINK_SEPARATOR)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>().map(PageId).map_err(|_| s.to_string()))
        .collect()
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}
