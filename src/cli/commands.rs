//! Command implementations for the quire CLI.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::engine::Index;
use crate::error::{QuireError, Result};
use crate::index::config::IndexConfig;
use crate::summary::Summarizer;

/// Execute a CLI command.
pub fn execute_command(args: QuireArgs) -> Result<()> {
    match &args.command {
        Command::Create(create_args) => create_index(create_args, &args),
        Command::AddText(add_args) => add_text(add_args, &args),
        Command::AddFile(add_args) => add_file(add_args, &args),
        Command::AddFolder(add_args) => add_folder(add_args, &args),
        Command::Remove(remove_args) => remove_document(remove_args, &args),
        Command::Prune(index_args) => prune_index(index_args, &args),
        Command::Compact(index_args) => compact_index(index_args, &args),
        Command::Documents(documents_args) => list_documents(documents_args, &args),
        Command::Terms(terms_args) => list_terms(terms_args, &args),
        Command::Search(search_args) => search_index(search_args, &args),
        Command::Summarize(summarize_args) => summarize_file(summarize_args, &args),
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Build the configuration for `create` from the file and flags.
pub fn build_config(args: &CreateArgs) -> Result<IndexConfig> {
    let mut config = match &args.config {
        Some(path) => IndexConfig::from_json_file(path)?,
        None => IndexConfig::default(),
    };
    if args.proximity {
        config = config.with_proximity_indexing(true);
    }
    if !args.stop_words.is_empty() {
        let mut words: Vec<String> = config.stop_words.iter().cloned().collect();
        words.extend(args.stop_words.iter().cloned());
        config = config.with_stop_words(words);
    }
    if args.english_stop_words {
        config = config.with_english_stop_words();
    }
    if let Some(min) = args.min_term_length {
        config = config.with_min_term_length(min);
    }
    if let Some(variant) = args.variant {
        config = config.with_variant(variant.into());
    }
    config.validated()
}

/// Open a writable index, run `f`, then flush and close (which saves).
fn with_writable_index<T>(path: &Path, f: impl FnOnce(&Index) -> Result<T>) -> Result<T> {
    let index = Index::open_file(path, true)?;
    let result = f(&index)?;
    index.flush()?;
    index.close()?;
    Ok(result)
}

/// Create a new index file.
fn create_index(args: &CreateArgs, cli_args: &QuireArgs) -> Result<()> {
    let config = build_config(args)?;
    let index = Index::create_file(&args.index, config)?;
    let config = index.config().clone();
    index.close()?;

    output_result(
        "Index created successfully",
        &IndexCreationResult {
            path: args.index.display().to_string(),
            variant: format!("{:?}", config.variant),
            proximity_indexing: config.proximity_indexing,
            stop_words: config.stop_words.len(),
            min_term_length: config.min_term_length,
            file_size_bytes: file_size(&args.index),
        },
        cli_args,
    )
}

/// Add a text document.
fn add_text(args: &AddTextArgs, cli_args: &QuireArgs) -> Result<()> {
    let (outcome, indexed) = with_writable_index(&args.index, |index| {
        let outcome = index.add_text(&args.uri, &args.text, !args.no_replace)?;
        Ok((outcome, index.flush()?))
    })?;

    output_result(
        "Document added",
        &DocumentAdditionResult {
            uris: vec![args.uri.clone()],
            outcome: Some(outcome),
            documents_indexed: indexed,
        },
        cli_args,
    )
}

/// Add a file.
fn add_file(args: &AddFileArgs, cli_args: &QuireArgs) -> Result<()> {
    let uri = crate::extract::file_uri(&args.path)?;
    let (outcome, indexed) = with_writable_index(&args.index, |index| {
        let outcome = index.add_file(&args.path, args.mimetype.as_deref(), !args.no_replace)?;
        Ok((outcome, index.flush()?))
    })?;

    output_result(
        "File added",
        &DocumentAdditionResult {
            uris: vec![uri],
            outcome: Some(outcome),
            documents_indexed: indexed,
        },
        cli_args,
    )
}

/// Add every file under a folder.
fn add_folder(args: &AddFolderArgs, cli_args: &QuireArgs) -> Result<()> {
    if !args.path.is_dir() {
        return Err(QuireError::invalid_argument(format!(
            "{} is not a directory",
            args.path.display()
        )));
    }
    let (uris, indexed) = with_writable_index(&args.index, |index| {
        let uris = index.add_folder(&args.path, !args.no_replace)?;
        Ok((uris, index.flush()?))
    })?;

    output_result(
        "Folder added",
        &DocumentAdditionResult {
            uris,
            outcome: None,
            documents_indexed: indexed,
        },
        cli_args,
    )
}

/// Remove a document.
fn remove_document(args: &RemoveArgs, cli_args: &QuireArgs) -> Result<()> {
    let removed = with_writable_index(&args.index, |index| index.remove(&args.uri))?;
    output_result(
        "Document removed",
        &RemovalResult {
            uri: args.uri.clone(),
            removed,
        },
        cli_args,
    )
}

/// Remove documents without terms.
fn prune_index(args: &IndexArgs, cli_args: &QuireArgs) -> Result<()> {
    let verbose = cli_args.verbosity() > 1;
    let progress = |total: usize, done: usize| {
        if verbose {
            eprintln!("Pruned {done}/{total}");
        }
    };
    let pruned = with_writable_index(&args.index, |index| index.prune(Some(&progress)))?;
    output_result(
        "Index pruned",
        &PruneResult {
            documents_pruned: pruned,
        },
        cli_args,
    )
}

/// Reclaim space held by removed documents.
fn compact_index(args: &IndexArgs, cli_args: &QuireArgs) -> Result<()> {
    let stats = with_writable_index(&args.index, |index| index.compact())?;
    output_result(
        "Index compacted",
        &CompactionResult {
            documents_reclaimed: stats.documents,
            postings_reclaimed: stats.postings,
            file_size_bytes: file_size(&args.index),
        },
        cli_args,
    )
}

/// List indexed documents.
fn list_documents(args: &DocumentsArgs, cli_args: &QuireArgs) -> Result<()> {
    let index = Index::open_file(&args.index, false)?;
    let documents = index.documents(args.state.into())?;
    index.close()?;
    output_result("Documents", &DocumentList { documents }, cli_args)
}

/// List the terms of a document.
fn list_terms(args: &TermsArgs, cli_args: &QuireArgs) -> Result<()> {
    let index = Index::open_file(&args.index, false)?;
    let mut terms = index.terms(&args.uri)?;
    index.close()?;
    terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));

    output_result(
        "Terms",
        &TermList {
            uri: args.uri.clone(),
            terms,
        },
        cli_args,
    )
}

/// Search an index.
fn search_index(args: &SearchArgs, cli_args: &QuireArgs) -> Result<()> {
    let index = Index::open_file(&args.index, false)?;
    let query = args.effective_query();
    let start_time = Instant::now();
    let results = index.search(&query, args.limit, args.timeout_ms.map(Duration::from_millis))?;
    let duration = start_time.elapsed();
    index.close()?;

    output_result(
        "Search Results",
        &SearchOutput {
            query,
            hits: results.hits,
            more_available: results.more_available,
            duration_ms: duration.as_millis() as u64,
        },
        cli_args,
    )
}

/// Summarize a text file.
fn summarize_file(args: &SummarizeArgs, cli_args: &QuireArgs) -> Result<()> {
    let text = crate::extract::extract_text(&args.file, None)?;
    let summarizer = Summarizer::new(&text);

    let (sentences, paragraphs) = match (args.sentences, args.paragraphs) {
        (_, Some(count)) => (None, Some(summarizer.paragraph_summary(count))),
        (count, None) => (Some(summarizer.sentence_summary(count.unwrap_or(3))), None),
    };

    output_result(
        "Summary",
        &SummaryOutput {
            sentence_count: summarizer.sentence_count(),
            paragraph_count: summarizer.paragraph_count(),
            sentences,
            paragraphs,
        },
        cli_args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(args: &[&str]) -> Result<()> {
        let mut full = vec!["quire", "--quiet"];
        full.extend_from_slice(args);
        execute_command(QuireArgs::try_parse_from(full).unwrap())
    }

    #[test]
    fn test_build_config() {
        let args = QuireArgs::try_parse_from([
            "quire",
            "create",
            "x.idx",
            "--stop-words",
            "The,A",
            "--min-term-length",
            "2",
        ])
        .unwrap();
        let Command::Create(create) = args.command else {
            panic!("Expected Create command");
        };
        let config = build_config(&create).unwrap();
        assert!(config.stop_words.contains("the"));
        assert!(config.stop_words.contains("a"));
        assert_eq!(config.min_term_length, 2);
        assert!(!config.proximity_indexing);
    }

    #[test]
    fn test_command_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("cli.idx");
        let index = index.to_str().unwrap();

        run(&["create", index, "--proximity"]).unwrap();
        assert!(run(&["create", index]).is_err());

        run(&["add_text", index, "doc://1", "Today I am feeling fine"]).unwrap();
        run(&["add_text", index, "doc://2", ""]).unwrap();
        run(&["search", index, "feel"]).unwrap();
        run(&["prune", index]).unwrap();
        run(&["remove", index, "doc://1"]).unwrap();
        run(&["compact", index]).unwrap();

        let reopened = Index::open_file(index, false).unwrap();
        assert_eq!(reopened.document_count().unwrap(), 0);
    }

    #[test]
    fn test_missing_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.idx");
        assert!(matches!(
            run(&["documents", missing.to_str().unwrap()]),
            Err(QuireError::NotFound(_))
        ));
    }
}
