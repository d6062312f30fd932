use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use finqa_core::FileParser;
use finqa_rag::{
    ChatProvider, EmbedProvider, LlmClient, ProcessReport, QueryOutcome, Session, Settings,
    Speaker, Upload, TOP_K_RANGE, TRANSCRIPT_WINDOW,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const VERSION_LONG: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (features: ",
    env!("FINQA_FEATURES"),
    ")"
);

const DEFAULT_CONFIG: &str = "finqa.toml";
const TABLE_PREVIEW_LIMIT: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "finqa", version = VERSION, long_version = VERSION_LONG, about = "Ask questions about financial PDFs and spreadsheets")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(flatten)]
    models: ModelArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct ModelArgs {
    #[arg(long = "ollama-url", global = true)]
    ollama_url: Option<String>,
    #[arg(long = "chat-model", global = true)]
    chat_model: Option<String>,
    #[arg(long = "embed-model", global = true)]
    embed_model: Option<String>,
    #[arg(long = "top-k", global = true)]
    top_k: Option<usize>,
    #[arg(long = "chunk-size", global = true)]
    chunk_size: Option<usize>,
    #[arg(long = "chat-provider", global = true, value_parser = parse_chat_provider)]
    chat_provider: Option<ChatProvider>,
    #[arg(long = "embed-provider", global = true, value_parser = parse_embed_provider)]
    embed_provider: Option<EmbedProvider>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse and index files, then print what was extracted.
    Process {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Index files and answer one or more questions.
    Ask {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long = "question", required = true)]
        questions: Vec<String>,
        #[arg(long = "show-context", action = ArgAction::SetTrue)]
        show_context: bool,
    },
    /// Interactive session; type :help for commands.
    Chat { files: Vec<PathBuf> },
    /// Print the resolved configuration.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let settings = resolve_settings(&config_path, &cli.models)?;

    match cli.command {
        Commands::Process { files, json } => {
            let mut session = Session::new();
            let report = process_files(&mut session, &settings, &files)?;
            if json {
                let summary = ProcessSummary {
                    report: &report,
                    metrics: session.metrics(),
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_report(&report);
                print_metrics(&session);
            }
        }
        Commands::Ask {
            files,
            questions,
            show_context,
        } => {
            let mut session = Session::new();
            let report = process_files(&mut session, &settings, &files)?;
            print_report(&report);
            let chat = settings.chat_client()?;
            for question in &questions {
                ask_and_print(&mut session, &chat, &settings, question, show_context)?;
            }
        }
        Commands::Chat { files } => {
            run_chat(&settings, files)?;
        }
        Commands::Config => {
            print!(
                "{}",
                toml::to_string_pretty(&settings).context("serializing settings")?
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn resolve_settings(path: &Path, overrides: &ModelArgs) -> Result<Settings> {
    let mut settings = Settings::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    if let Some(url) = &overrides.ollama_url {
        settings.ollama_url = url.clone();
    }
    if let Some(model) = &overrides.chat_model {
        settings.chat_model = model.clone();
    }
    if let Some(model) = &overrides.embed_model {
        settings.embed_model = model.clone();
    }
    if let Some(top_k) = overrides.top_k {
        settings.top_k = top_k;
    }
    if let Some(size) = overrides.chunk_size {
        settings.chunk_size = size;
    }
    if let Some(provider) = overrides.chat_provider {
        settings.chat_provider = provider;
    }
    if let Some(provider) = overrides.embed_provider {
        settings.embed_provider = provider;
    }
    settings.validate()?;
    Ok(settings)
}

fn parse_chat_provider(value: &str) -> Result<ChatProvider, String> {
    ChatProvider::parse(value).map_err(|e| e.to_string())
}

fn parse_embed_provider(value: &str) -> Result<EmbedProvider, String> {
    EmbedProvider::parse(value).map_err(|e| e.to_string())
}

fn load_uploads(files: &[PathBuf]) -> Result<Vec<Upload>> {
    files
        .iter()
        .map(|path| {
            Upload::from_path(path).with_context(|| format!("failed to read {}", path.display()))
        })
        .collect()
}

fn process_files(
    session: &mut Session,
    settings: &Settings,
    files: &[PathBuf],
) -> Result<ProcessReport> {
    let uploads = load_uploads(files)?;
    let embeddings = settings.embedding_client()?;
    session
        .process_documents(&uploads, &FileParser, &embeddings, settings.chunk_size)
        .context("processing documents")
}

#[derive(Serialize)]
struct ProcessSummary<'a> {
    report: &'a ProcessReport,
    metrics: &'a finqa_core::FinancialMetrics,
}

fn print_report(report: &ProcessReport) {
    for name in &report.skipped {
        eprintln!("skipped unsupported file: {name}");
    }
    println!(
        "processed: files={} chunks={} tables={} metrics={}",
        report.parsed.len(),
        report.chunks,
        report.tables,
        report.metrics
    );
}

fn print_metrics(session: &Session) {
    if session.metrics().is_empty() {
        println!("No metrics found.");
        return;
    }
    println!("{}", session.metrics().to_pretty_json());
}

fn print_tables(session: &Session) -> Result<()> {
    if session.tables().is_empty() {
        println!("No tables extracted.");
        return Ok(());
    }
    for (idx, table) in session.tables().iter().take(TABLE_PREVIEW_LIMIT).enumerate() {
        println!("Table {}", idx + 1);
        print!("{}", table.to_tsv()?);
        println!();
    }
    Ok(())
}

fn print_history(session: &Session) {
    for turn in session.conversation().recent(TRANSCRIPT_WINDOW) {
        let who = match turn.speaker {
            Speaker::User => "you",
            Speaker::Assistant => "assistant",
        };
        println!("[{who}] {}", turn.content);
    }
}

fn ask_and_print(
    session: &mut Session,
    chat: &LlmClient,
    settings: &Settings,
    question: &str,
    show_context: bool,
) -> Result<()> {
    let Some(outcome) = session.ask(question, chat, settings.top_k)? else {
        return Ok(());
    };
    if show_context {
        if let QueryOutcome::Answered(answer) = &outcome {
            for (rank, hit) in answer.retrieved.iter().enumerate() {
                eprintln!("#{} score={:.3}\n{}\n", rank + 1, hit.score, hit.text);
            }
        }
    }
    println!("{}", outcome.message());
    Ok(())
}

fn run_chat(settings: &Settings, files: Vec<PathBuf>) -> Result<()> {
    let chat = settings.chat_client()?;
    let mut session = Session::new();
    let mut pending = files;
    if !pending.is_empty() {
        process_interactive(&mut session, settings, &pending);
    }
    println!(
        "finqa chat (top_k={}, chat model {}). Type :help for commands.",
        settings.top_k,
        chat.model()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        stdout.flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();
        match ReplCommand::parse(input) {
            ReplCommand::Quit => break,
            ReplCommand::Help => print_help(),
            ReplCommand::Add(paths) => {
                pending.extend(paths);
                println!("{} file(s) staged; run :process to index.", pending.len());
            }
            ReplCommand::Process => process_interactive(&mut session, settings, &pending),
            ReplCommand::Clear => {
                session.clear();
                pending.clear();
                println!("Session cleared.");
            }
            ReplCommand::Tables => print_tables(&session)?,
            ReplCommand::Metrics => print_metrics(&session),
            ReplCommand::History => print_history(&session),
            ReplCommand::Unknown(cmd) => println!("unknown command {cmd}; try :help"),
            ReplCommand::Question(question) => {
                if let Err(err) = ask_and_print(&mut session, &chat, settings, question, false) {
                    println!("Error: {err}");
                }
            }
        }
    }
    Ok(())
}

fn process_interactive(session: &mut Session, settings: &Settings, files: &[PathBuf]) {
    if files.is_empty() {
        println!("No files staged; use :add <path>...");
        return;
    }
    match process_files(session, settings, files) {
        Ok(report) => print_report(&report),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "processing failed");
            println!("Error processing documents: {err:#}");
        }
    }
}

fn print_help() {
    println!(":add <path>...  stage files for processing");
    println!(":process        rebuild the index from staged files");
    println!(":clear          reset the session and staged files");
    println!(":tables         show up to {TABLE_PREVIEW_LIMIT} extracted tables");
    println!(":metrics        show extracted metrics");
    println!(":history        show the last {TRANSCRIPT_WINDOW} turns");
    println!(":quit           leave");
    println!(
        "anything else is asked as a question (top_k {}-{})",
        TOP_K_RANGE.start(),
        TOP_K_RANGE.end()
    );
}

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Quit,
    Help,
    Add(Vec<PathBuf>),
    Process,
    Clear,
    Tables,
    Metrics,
    History,
    Unknown(&'a str),
    Question(&'a str),
}

impl<'a> ReplCommand<'a> {
    fn parse(input: &'a str) -> Self {
        let Some(rest) = input.strip_prefix(':') else {
            return ReplCommand::Question(input);
        };
        let mut parts = rest.split_whitespace();
        match parts.next().unwrap_or_default() {
            "q" | "quit" | "exit" => ReplCommand::Quit,
            "h" | "help" => ReplCommand::Help,
            "add" => ReplCommand::Add(parts.map(PathBuf::from).collect()),
            "process" => ReplCommand::Process,
            "clear" => ReplCommand::Clear,
            "tables" => ReplCommand::Tables,
            "metrics" => ReplCommand::Metrics,
            "history" => ReplCommand::History,
            _ => ReplCommand::Unknown(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repl_commands_parse() {
        assert_eq!(ReplCommand::parse(":quit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse(":process"), ReplCommand::Process);
        assert_eq!(
            ReplCommand::parse(":add a.pdf b.xlsx"),
            ReplCommand::Add(vec![PathBuf::from("a.pdf"), PathBuf::from("b.xlsx")])
        );
        assert_eq!(ReplCommand::parse(":bogus"), ReplCommand::Unknown(":bogus"));
        assert_eq!(
            ReplCommand::parse("What is the revenue?"),
            ReplCommand::Question("What is the revenue?")
        );
    }

    #[test]
    fn cli_flags_override_settings() {
        let missing = std::env::temp_dir().join("finqa-cli-missing-config.toml");
        let overrides = ModelArgs {
            chat_model: Some("mistral".to_string()),
            top_k: Some(9),
            embed_provider: Some(EmbedProvider::Hash),
            ..ModelArgs::default()
        };
        let settings = resolve_settings(&missing, &overrides).unwrap();
        assert_eq!(settings.chat_model, "mistral");
        assert_eq!(settings.top_k, 9);
        assert_eq!(settings.embed_provider, EmbedProvider::Hash);
    }

    #[test]
    fn out_of_range_top_k_is_rejected() {
        let missing = std::env::temp_dir().join("finqa-cli-missing-config.toml");
        for top_k in [0, 21] {
            let overrides = ModelArgs {
                top_k: Some(top_k),
                ..ModelArgs::default()
            };
            assert!(resolve_settings(&missing, &overrides).is_err());
        }
    }

    #[test]
    fn cli_parses_ask_command() {
        let cli = Cli::try_parse_from([
            "finqa",
            "--top-k",
            "3",
            "ask",
            "report.pdf",
            "-q",
            "What is the revenue?",
        ])
        .unwrap();
        assert_eq!(cli.models.top_k, Some(3));
        match cli.command {
            Commands::Ask { files, questions, .. } => {
                assert_eq!(files, vec![PathBuf::from("report.pdf")]);
                assert_eq!(questions, vec!["What is the revenue?"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
