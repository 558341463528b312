//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, QuireArgs};
use crate::engine::AddOutcome;
use crate::error::Result;
use crate::index::document::TermCount;
use crate::search::SearchHit;
use crate::summary::{SummaryParagraph, SummarySentence};

/// Result structure for index creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexCreationResult {
    pub path: String,
    pub variant: String,
    pub proximity_indexing: bool,
    pub stop_words: usize,
    pub min_term_length: usize,
    pub file_size_bytes: u64,
}

/// Result structure for document addition.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentAdditionResult {
    pub uris: Vec<String>,
    pub outcome: Option<AddOutcome>,
    pub documents_indexed: usize,
}

/// Result structure for document removal.
#[derive(Debug, Serialize, Deserialize)]
pub struct RemovalResult {
    pub uri: String,
    pub removed: bool,
}

/// Result structure for pruning.
#[derive(Debug, Serialize, Deserialize)]
pub struct PruneResult {
    pub documents_pruned: usize,
}

/// Result structure for compaction.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompactionResult {
    pub documents_reclaimed: usize,
    pub postings_reclaimed: usize,
    pub file_size_bytes: u64,
}

/// Documents listed by the `documents` command.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentList {
    pub documents: Vec<String>,
}

/// Terms listed by the `terms` command, most frequent first.
#[derive(Debug, Serialize, Deserialize)]
pub struct TermList {
    pub uri: String,
    pub terms: Vec<TermCount>,
}

/// Result structure for search operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchOutput {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub more_available: bool,
    pub duration_ms: u64,
}

/// Result structure for summaries.
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub sentences: Option<Vec<SummarySentence>>,
    pub paragraphs: Option<Vec<SummaryParagraph>>,
}

/// Output a result in the requested format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &QuireArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &QuireArgs) -> Result<()> {
    let value = serde_json::to_value(result)?;
    let type_name = std::any::type_name::<T>();

    // Listings print bare lines so they can be piped.
    if type_name.ends_with("DocumentList") {
        return output_document_list_human(&value);
    }
    if type_name.ends_with("TermList") {
        return output_term_list_human(&value);
    }

    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    match type_name {
        name if name.ends_with("SearchOutput") => output_search_results_human(&value),
        name if name.ends_with("SummaryOutput") => output_summary_human(&value),
        _ => output_generic_human(&value),
    }
}

/// Output search results in human format.
fn output_search_results_human(value: &serde_json::Value) -> Result<()> {
    if let Some(obj) = value.as_object()
        && let Some(hits) = obj.get("hits").and_then(|h| h.as_array())
    {
        for hit in hits {
            println!(
                "{}: {:.3}",
                hit.get("uri").and_then(|u| u.as_str()).unwrap_or_default(),
                hit.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0)
            );
        }

        println!();
        println!("Hits: {}", hits.len());
        if obj.get("more_available").and_then(|m| m.as_bool()) == Some(true) {
            println!("More results available");
        }
        if let Some(duration) = obj.get("duration_ms").and_then(|d| d.as_u64()) {
            println!("Search time: {duration}ms");
        }
    }
    Ok(())
}

fn output_document_list_human(value: &serde_json::Value) -> Result<()> {
    if let Some(documents) = value.get("documents").and_then(|d| d.as_array()) {
        for document in documents {
            println!("{}", format_value(document));
        }
    }
    Ok(())
}

fn output_term_list_human(value: &serde_json::Value) -> Result<()> {
    if let Some(terms) = value.get("terms").and_then(|t| t.as_array()) {
        for term in terms {
            println!(
                "{}: {}",
                term.get("term").and_then(|t| t.as_str()).unwrap_or_default(),
                term.get("count").and_then(|c| c.as_u64()).unwrap_or(0)
            );
        }
    }
    Ok(())
}

/// Output a summary in human format.
fn output_summary_human(value: &serde_json::Value) -> Result<()> {
    if let Some(obj) = value.as_object() {
        let units = obj
            .get("sentences")
            .and_then(|s| s.as_array())
            .or_else(|| obj.get("paragraphs").and_then(|p| p.as_array()));
        if let Some(units) = units {
            for unit in units {
                println!(
                    "[{}] {}",
                    unit.get("rank").and_then(|r| r.as_u64()).unwrap_or(0),
                    unit.get("text").and_then(|t| t.as_str()).unwrap_or_default()
                );
            }
            println!();
        }
        if let Some(count) = obj.get("sentence_count").and_then(|c| c.as_u64()) {
            println!("Sentences: {count}");
        }
        if let Some(count) = obj.get("paragraph_count").and_then(|c| c.as_u64()) {
            println!("Paragraphs: {count}");
        }
    }
    Ok(())
}

/// Output generic data in human format.
fn output_generic_human(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                let formatted_val = if key.ends_with("_bytes") {
                    val.as_u64().map(format_bytes).unwrap_or_else(|| format_value(val))
                } else {
                    format_value(val)
                };
                println!("{key}: {formatted_val}");
            }
        }
        _ => {
            let formatted_value = format_value(value);
            println!("{formatted_value}");
        }
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &QuireArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "-".to_string(),
    }
}

/// Format bytes into human-readable format.
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let unit = UNITS[unit_index];
    if unit_index == 0 {
        format!("{bytes} {unit}")
    } else {
        format!("{size:.1} {unit}")
    }
}
