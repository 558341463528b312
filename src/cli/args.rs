//! Command line argument parsing for the quire CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::index::config::IndexVariant;
use crate::index::document::TermState;

/// quire - an embeddable full-text index
#[derive(Parser, Debug, Clone)]
#[command(name = "quire")]
#[command(about = "Create, update and search full-text index files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct QuireArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl QuireArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a new index file
    Create(CreateArgs),

    /// Add a text document
    #[command(name = "add_text")]
    AddText(AddTextArgs),

    /// Add a file
    #[command(name = "add_file")]
    AddFile(AddFileArgs),

    /// Add every file under a folder
    #[command(name = "add_folder")]
    AddFolder(AddFolderArgs),

    /// Remove a document
    Remove(RemoveArgs),

    /// Remove documents without terms
    Prune(IndexArgs),

    /// Reclaim space held by removed documents
    Compact(IndexArgs),

    /// List indexed documents
    Documents(DocumentsArgs),

    /// List the terms of a document
    Terms(TermsArgs),

    /// Search an index
    Search(SearchArgs),

    /// Summarize a text file
    Summarize(SummarizeArgs),
}

/// Arguments for creating an index
#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Path of the index file to create
    #[arg(value_name = "INDEX")]
    pub index: PathBuf,

    /// Store term positions for proximity and phrase search
    #[arg(long)]
    pub proximity: bool,

    /// Stop words (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub stop_words: Vec<String>,

    /// Add the built-in English stop words
    #[arg(long)]
    pub english_stop_words: bool,

    /// Minimum term length
    #[arg(long, value_name = "N")]
    pub min_term_length: Option<usize>,

    /// Index variant
    #[arg(long, value_name = "VARIANT")]
    pub variant: Option<VariantArg>,

    /// Configuration file (JSON); flags override its values
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments naming only an index
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Path of the index file
    #[arg(value_name = "INDEX")]
    pub index: PathBuf,
}

/// Arguments for adding text
#[derive(Args, Debug, Clone)]
pub struct AddTextArgs {
    #[arg(value_name = "INDEX")]
    pub index: PathBuf,

    /// Document URI
    #[arg(value_name = "URI")]
    pub uri: String,

    /// Document text
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Keep an existing document with the same URI
    #[arg(long)]
    pub no_replace: bool,
}

/// Arguments for adding a file
#[derive(Args, Debug, Clone)]
pub struct AddFileArgs {
    #[arg(value_name = "INDEX")]
    pub index: PathBuf,

    /// File to add
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// MIME type (guessed from the extension when absent)
    #[arg(value_name = "MIMETYPE")]
    pub mimetype: Option<String>,

    /// Keep an existing document with the same URI
    #[arg(long)]
    pub no_replace: bool,
}

/// Arguments for adding a folder
#[derive(Args, Debug, Clone)]
pub struct AddFolderArgs {
    #[arg(value_name = "INDEX")]
    pub index: PathBuf,

    /// Folder to walk
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Keep existing documents with the same URI
    #[arg(long)]
    pub no_replace: bool,
}

/// Arguments for removing a document
#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    #[arg(value_name = "INDEX")]
    pub index: PathBuf,

    #[arg(value_name = "URI")]
    pub uri: String,
}

/// Arguments for listing documents
#[derive(Args, Debug, Clone)]
pub struct DocumentsArgs {
    #[arg(value_name = "INDEX")]
    pub index: PathBuf,

    /// Which documents to list
    #[arg(long, default_value = "all")]
    pub state: StateArg,
}

/// Arguments for listing terms
#[derive(Args, Debug, Clone)]
pub struct TermsArgs {
    #[arg(value_name = "INDEX")]
    pub index: PathBuf,

    #[arg(value_name = "URI")]
    pub uri: String,
}

/// Arguments for searching
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[arg(value_name = "INDEX")]
    pub index: PathBuf,

    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Maximum number of results to return
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Search time budget in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Match words exactly instead of as prefixes
    #[arg(long)]
    pub exact: bool,
}

impl SearchArgs {
    /// The query sent to the index.
    ///
    /// Unless `--exact` is given, every plain word becomes a prefix.
    pub fn effective_query(&self) -> String {
        if self.exact {
            return self.query.clone();
        }
        self.query
            .split_whitespace()
            .map(|word| {
                let is_operator = matches!(word, "AND" | "OR" | "NOT" | "|" | "&");
                if is_operator || word.ends_with('*') || word.contains('"') || word.ends_with(')') {
                    word.to_string()
                } else {
                    format!("{word}*")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Arguments for summarizing
#[derive(Args, Debug, Clone)]
pub struct SummarizeArgs {
    /// Text file to summarize
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Number of sentences to keep
    #[arg(long, value_name = "N", conflicts_with = "paragraphs")]
    pub sentences: Option<usize>,

    /// Number of paragraphs to keep
    #[arg(long, value_name = "N")]
    pub paragraphs: Option<usize>,
}

/// Index variants selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantArg {
    Inverted,
    Vector,
    InvertedAndVector,
}

impl From<VariantArg> for IndexVariant {
    fn from(value: VariantArg) -> Self {
        match value {
            VariantArg::Inverted => IndexVariant::Inverted,
            VariantArg::Vector => IndexVariant::Vector,
            VariantArg::InvertedAndVector => IndexVariant::InvertedAndVector,
        }
    }
}

/// Document filters for `documents`
#[derive(ValueEnum, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateArg {
    All,
    Empty,
    NotEmpty,
}

impl From<StateArg> for TermState {
    fn from(value: StateArg) -> Self {
        match value {
            StateArg::All => TermState::All,
            StateArg::Empty => TermState::Empty,
            StateArg::NotEmpty => TermState::NotEmpty,
        }
    }
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_args() {
        let args = QuireArgs::try_parse_from([
            "quire",
            "create",
            "/tmp/test.idx",
            "--proximity",
            "--stop-words",
            "the,a",
            "--min-term-length",
            "3",
            "--variant",
            "inverted-and-vector",
        ])
        .unwrap();

        if let Command::Create(create) = args.command {
            assert_eq!(create.index, PathBuf::from("/tmp/test.idx"));
            assert!(create.proximity);
            assert_eq!(create.stop_words, vec!["the", "a"]);
            assert_eq!(create.min_term_length, Some(3));
            assert!(matches!(create.variant, Some(VariantArg::InvertedAndVector)));
        } else {
            panic!("Expected Create command");
        }
    }

    #[test]
    fn test_underscore_command_names() {
        let args =
            QuireArgs::try_parse_from(["quire", "add_text", "x.idx", "doc://1", "hello"]).unwrap();
        assert!(matches!(args.command, Command::AddText(_)));

        let args = QuireArgs::try_parse_from(["quire", "add_file", "x.idx", "a.txt", "text/plain"])
            .unwrap();
        if let Command::AddFile(add) = args.command {
            assert_eq!(add.mimetype.as_deref(), Some("text/plain"));
        } else {
            panic!("Expected AddFile command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let args = QuireArgs::try_parse_from(["quire", "prune", "x.idx"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = QuireArgs::try_parse_from(["quire", "-vv", "prune", "x.idx"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args = QuireArgs::try_parse_from(["quire", "--quiet", "prune", "x.idx"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            QuireArgs::try_parse_from(["quire", "--format", "json", "compact", "x.idx"]).unwrap();
        assert!(matches!(args.output_format, OutputFormat::Json));
    }

    #[test]
    fn test_search_query_prefixes() {
        let args = QuireArgs::try_parse_from(["quire", "search", "x.idx", "fee than OR blue*"])
            .unwrap();
        let Command::Search(search) = args.command else {
            panic!("Expected Search command");
        };
        assert_eq!(search.effective_query(), "fee* than* OR blue*");

        let args =
            QuireArgs::try_parse_from(["quire", "search", "x.idx", "fee than", "--exact"]).unwrap();
        let Command::Search(search) = args.command else {
            panic!("Expected Search command");
        };
        assert_eq!(search.effective_query(), "fee than");
    }

    #[test]
    fn test_summarize_conflicts() {
        assert!(
            QuireArgs::try_parse_from([
                "quire",
                "summarize",
                "a.txt",
                "--sentences",
                "2",
                "--paragraphs",
                "1"
            ])
            .is_err()
        );
    }
}
