use app::{AppState, config::Config};
use services::{CatalogImport, Clock, ProgressServices};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- serve [--db <sqlite_url>] [--bind <addr>] [--port <port>]");
    eprintln!("  cargo run -p app -- seed  [--db <sqlite_url>] --catalog <file.json>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://dev.sqlite3");
    eprintln!("  --bind 0.0.0.0 --port 8080");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EDU_DB_URL, EDU_BIND, EDU_PORT, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means serve.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Serve,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Serve,
        Some(first) => {
            let cmd = Command::from_arg(first).ok_or_else(|| {
                eprintln!("unknown subcommand: {first}");
                print_usage();
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
            })?;
            argv.remove(0);
            cmd
        }
    };

    if argv.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let config = Config::from_env()?
        .apply_args(&mut argv.into_iter())
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;

    app::config::prepare_sqlite_file(&config.db_url)?;
    let services = ProgressServices::new_sqlite(&config.db_url, Clock::system()).await?;
    info!(db = %config.db_url, "storage ready");

    match cmd {
        Command::Serve => {
            app::serve(&config.address(), AppState::new(services)).await?;
            Ok(())
        }
        Command::Seed => {
            let Some(path) = config.catalog else {
                eprintln!("seed requires --catalog <file.json>");
                print_usage();
                return Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "missing --catalog",
                )));
            };
            let raw = tokio::fs::read_to_string(&path).await?;
            let import = CatalogImport::from_json(&raw)?;
            let summary = services.catalog().import(import).await?;
            info!(
                subjects = summary.subjects,
                topics = summary.topics,
                lessons = summary.lessons,
                "catalog seeded from {}",
                path.display()
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
