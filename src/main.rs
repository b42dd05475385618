use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finbot::assistant::{Assistant, AssistantSettings};
use finbot::db::{migrate, Db};
use finbot::{graph, Config, OllamaClient};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "finbot")]
#[command(about = "Ask questions about the financial knowledge graph")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat on stdin (default)
    Chat,
    /// Answer a single question and exit
    Ask {
        /// Question text
        question: Vec<String>,
    },
    /// Apply migrations and check the graph schema
    Verify,
}

/// Open the store and bring its schema up to date
async fn open_db(config: &Config) -> Result<Db> {
    let db = Db::open(config.db_path())
        .with_context(|| format!("Failed to open database {}", config.db_path().display()))?;
    let migrations_dir = config.migrations_dir().to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.finbot.log_level.as_str())
    ).init();

    log::info!("Starting FinBot v{}", env!("CARGO_PKG_VERSION"));
    let db = open_db(&config).await?;
    log::info!("Database path: {}", db.path().display());

    let result = match args.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(&db, &config).await,
        Command::Ask { question } => run_ask(&db, &config, &question.join(" ")).await,
        Command::Verify => run_verify(&db).await,
    };

    db.close()?;
    result
}

async fn run_ask(db: &Db, config: &Config, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("Usage: finbot ask <question>");
    }
    let completer = OllamaClient::from_config(&config.completion)?;
    let mut assistant = Assistant::new(db, completer, AssistantSettings::from(config));
    println!("{}", assistant.ask(question).await);
    Ok(())
}

async fn run_chat(db: &Db, config: &Config) -> Result<()> {
    let completer = OllamaClient::from_config(&config.completion)?;
    log::info!("Completion model: {} at {}", completer.model(), config.completion.url);
    let mut assistant = Assistant::new(db, completer, AssistantSettings::from(config));

    println!("FinBot - ask a question about the financial data.");
    println!("Commands: /refresh (show graph data), /history (show conversation), /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();

        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/refresh" => match assistant.snapshot().await {
                Ok(text) => println!("{}", text),
                Err(e) => println!("Error querying knowledge graph: {}", e),
            },
            "/history" => {
                if assistant.transcript().is_empty() {
                    println!("(no messages yet)");
                } else {
                    println!("{}", assistant.transcript().render());
                }
            }
            _ => {
                let reply = assistant.ask(question).await;
                println!("\n{}", reply);
            }
        }
    }

    log::info!("Chat ended after {} transcript entries", assistant.transcript().len());
    Ok(())
}

async fn run_verify(db: &Db) -> Result<()> {
    db.with_connection(|conn| migrate::verify_schema(conn)).await?;
    log::info!("✓ Graph schema present");

    let years = graph::year_values(db).await?;
    let facts = graph::count_facts(db).await?;
    log::info!("✓ {} year(s), {} fact(s) in the graph", years.len(), facts);

    if facts == 0 {
        log::warn!("Graph is empty. Run the `load` binary with a tables JSON file first.");
    }
    Ok(())
}
