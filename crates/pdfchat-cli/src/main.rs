//! PDFChat CLI - Command-line interface
//!
//! Usage:
//!   pdfchat extract <file>
//!   pdfchat chunks <file> [--chunk-size N] [--chunk-overlap N]
//!   pdfchat ask <file> <question>
//!   pdfchat chat <file> [--export-dir DIR]

use anyhow::Context;
use clap::{Parser, Subcommand};
use pdfchat_core::{AppConfig, LoggingConfig, PdfChatError, TextChunk};
use pdfchat_parser::{extract_text, Document, RecursiveCharacterSplitter};
use pdfchat_rag::{ChatSession, DocumentIndexer, QaAnswer, RetrievalQa};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdfchat")]
#[command(about = "Chat with a PDF or text document")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "PDFCHAT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the extracted text of a document
    Extract {
        /// PDF or .txt file
        file: PathBuf,
    },
    /// Show how a document would be chunked
    Chunks {
        /// PDF or .txt file
        file: PathBuf,
        /// Maximum characters per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Characters shared between consecutive chunks
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },
    /// Index a document and answer one question
    Ask {
        /// PDF or .txt file
        file: PathBuf,
        /// Question to ask
        question: String,
    },
    /// Interactive chat about a document
    Chat {
        /// PDF or .txt file
        file: PathBuf,
        /// Directory for /save exports
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.clone())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Extract { file } => {
            let document = Document::from_path(&file)?;
            let text = extract_text(&document)?;
            println!("{text}");
        }
        Commands::Chunks {
            file,
            chunk_size,
            chunk_overlap,
        } => {
            let mut rag = config.rag;
            if let Some(size) = chunk_size {
                rag.chunk_size = size;
            }
            if let Some(overlap) = chunk_overlap {
                rag.chunk_overlap = overlap;
            }
            rag.validate()?;

            let document = Document::from_path(&file)?;
            let text = extract_text(&document)?;
            let chunks = RecursiveCharacterSplitter::from_config(&rag)?.split(&text);
            print_chunks(&chunks);
        }
        Commands::Ask { file, question } => {
            config.validate()?;
            let (qa, mut session) = open_session(&config, &file).await?;

            let answer = session.ask(&qa, &question).await?;
            print_answer(&answer);
        }
        Commands::Chat { file, export_dir } => {
            config.validate()?;
            let export_dir = export_dir.unwrap_or_else(|| config.history.export_dir.clone());
            let (qa, mut session) = open_session(&config, &file).await?;

            chat_loop(&qa, &mut session, &export_dir).await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only answers
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the QA chain and a session with `file` indexed
async fn open_session(config: &AppConfig, file: &Path) -> anyhow::Result<(RetrievalQa, ChatSession)> {
    let qa = RetrievalQa::from_config(&config.llm, &config.rag)?;
    let indexer = DocumentIndexer::from_config(&config.rag, qa.embedder())?;

    let document = Document::from_path(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let loaded = indexer.ingest(document).await?;
    tracing::info!(
        document = %loaded.name,
        chars = loaded.char_count,
        chunks = loaded.chunk_count(),
        "Document ready"
    );

    let mut session = ChatSession::new("cli");
    session.load(loaded);
    Ok((qa, session))
}

async fn chat_loop(qa: &RetrievalQa, session: &mut ChatSession, export_dir: &Path) -> anyhow::Result<()> {
    println!("Ask a question about the document. Commands: /history, /save, /quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => print_history(session),
            "/save" => match session.export_history(export_dir) {
                Ok(path) => println!("Saved chat history to {}", path.display()),
                Err(PdfChatError::EmptyHistory) => println!("Nothing to save yet."),
                Err(e) => eprintln!("Error: {e}"),
            },
            question => match session.ask(qa, question).await {
                Ok(answer) => print_answer(&answer),
                Err(e) => eprintln!("Error: {e}"),
            },
        }
    }

    Ok(())
}

fn print_answer(answer: &QaAnswer) {
    println!("\n{}\n", answer.answer);
    println!("Sources ({} ms):", answer.processing_time_ms);
    for source in &answer.sources {
        println!(
            "  [{}] score {:.3}: {}",
            source.chunk.index,
            source.score,
            preview(&source.chunk.content, 80)
        );
    }
    println!();
}

fn print_history(session: &ChatSession) {
    if session.messages().is_empty() {
        println!("No messages yet.");
        return;
    }
    for message in session.messages() {
        println!("{}: {}", message.role, message.content);
    }
}

fn print_chunks(chunks: &[TextChunk]) {
    println!("{:>5}  {:>8}  {:>8}  {:>7}  {:>6}  preview", "index", "start", "end", "overlap", "chars");
    for chunk in chunks {
        println!(
            "{:>5}  {:>8}  {:>8}  {:>7}  {:>6}  {}",
            chunk.index,
            chunk.start_offset,
            chunk.end_offset,
            chunk.overlap,
            chunk.char_len(),
            preview(&chunk.content, 60)
        );
    }
    println!("{} chunks", chunks.len());
}

/// First `max` characters on one line
fn preview(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .take(max)
        .collect();
    if text.chars().count() > max {
        format!("{flat}...")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("a\nb", 10), "a b");
        assert_eq!(preview("abcdef", 3), "abc...");
    }

    #[test]
    fn test_cli_parses_chunk_flags() {
        let cli = Cli::try_parse_from([
            "pdfchat",
            "chunks",
            "doc.pdf",
            "--chunk-size",
            "500",
            "--chunk-overlap",
            "50",
        ])
        .unwrap();

        match cli.command {
            Commands::Chunks {
                file,
                chunk_size,
                chunk_overlap,
            } => {
                assert_eq!(file, PathBuf::from("doc.pdf"));
                assert_eq!(chunk_size, Some(500));
                assert_eq!(chunk_overlap, Some(50));
            }
            _ => panic!("expected chunks command"),
        }
    }
}
