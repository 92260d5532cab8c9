mod config;
mod lesson_cmds;
mod routes;
mod serve_cmd;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};

use topicmark_core::generation::RagClient;
use topicmark_core::validate;
use topicmark_db::pool;

use config::{CliOverrides, TopicmarkConfig};

#[derive(Parser)]
#[command(name = "topicmark", about = "Lesson plan topic hierarchies with generated MDX content")]
struct Cli {
    /// Database URL (overrides TOPICMARK_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Generation service URL (overrides TOPICMARK_RAG_URL env var)
    #[arg(long, global = true)]
    rag_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> CliOverrides<'_> {
        CliOverrides {
            database_url: self.database_url.as_deref(),
            rag_url: self.rag_url.as_deref(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a topicmark config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = topicmark_db::config::DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Generation service base URL
        #[arg(long = "rag", default_value = config::DEFAULT_RAG_URL)]
        rag: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the topicmark database
    DbInit,
    /// Serve the HTTP API
    Serve {
        /// Address to bind (defaults to server.bind from the config file)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (defaults to server.port from the config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Inspect stored lesson plans
    Lesson {
        #[command(subcommand)]
        command: LessonCommands,
    },
    /// Print shell completions to stdout
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum LessonCommands {
    /// List lesson plans (all owners unless filtered)
    List {
        /// Only plans owned by this user id
        #[arg(long)]
        user: Option<String>,
        /// Only public plans
        #[arg(long)]
        public: bool,
    },
    /// Show one lesson plan as a topic tree
    Show {
        id: i32,
        /// Print each topic's MDX content under it
        #[arg(long)]
        content: bool,
    },
}

fn cmd_init(db_url: &str, rag_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }
    validate::url("rag", rag_url)?;

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_owned(),
        },
        rag: config::RagSection {
            url: rag_url.to_owned(),
            ..Default::default()
        },
        server: config::ServerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  rag.url = {rag_url}");
    println!();
    println!("Next: run `topicmark db-init` to create and migrate the database.");

    Ok(())
}

async fn cmd_db_init(resolved: &TopicmarkConfig) -> anyhow::Result<()> {
    println!("Initializing topicmark database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let (applied, embedded) = pool::migration_status(&db_pool).await?;
    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready ({applied}/{embedded} migrations applied). Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("topicmark db-init complete.");
    Ok(())
}

async fn cmd_serve(resolved: TopicmarkConfig, bind: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let rag = RagClient::new(&resolved.rag_url, resolved.rag_timeout)
        .context("failed to build generation client")?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let bind = bind.unwrap_or(resolved.bind);
    let port = port.unwrap_or(resolved.port);
    let state = routes::AppState {
        pool: db_pool.clone(),
        rag,
    };
    let result = serve_cmd::run_serve(state, &bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let overrides = cli.overrides();

    match cli.command {
        Commands::Init { ref db_url, ref rag, force } => {
            cmd_init(db_url, rag, force)?;
        }
        Commands::DbInit => {
            let resolved = TopicmarkConfig::resolve(overrides)?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Serve { ref bind, port } => {
            let resolved = TopicmarkConfig::resolve(overrides)?;
            cmd_serve(resolved, bind.clone(), port).await?;
        }
        Commands::Lesson { ref command } => {
            let resolved = TopicmarkConfig::resolve(overrides)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = lesson_cmds::run_lesson_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "topicmark", &mut std::io::stdout());
        }
    }

    Ok(())
}
