use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use config::ServerConfig;
use flags::MediaTypeFlag;
use shadowcaster_indexer::{check_all, IndexCoordinator, IndexStore, PATHS_BUCKET};
use std::io;
use std::path::PathBuf;

mod config;
mod flags;
mod http_api;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "shadowcaster")]
#[command(about = "Media library indexer and web server", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML settings file (flags override its values)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the index files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for results)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every index, then serve the web UI and media API
    Serve(ServeArgs),

    /// Index one directory and wait for the run to finish
    Index(IndexArgs),

    /// Run the index consistency check
    Check,

    /// Print the entries stored in one index file
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address and port to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Document root for static web files
    #[arg(long)]
    root: Option<PathBuf>,
}

#[derive(Args)]
struct IndexArgs {
    /// Media directory to index
    path: PathBuf,

    /// Media type of the directory
    #[arg(long = "type", value_enum, default_value = "movie")]
    kind: MediaTypeFlag,
}

#[derive(Args)]
struct InspectArgs {
    /// Index file to read
    file: PathBuf,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args, config).await?,
        Commands::Index(args) => run_index(args, config).await?,
        Commands::Check => run_check(&config)?,
        Commands::Inspect(args) => run_inspect(&args)?,
    }

    Ok(())
}

async fn run_serve(args: ServeArgs, mut config: ServerConfig) -> Result<()> {
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(root) = args.root {
        config.docroot = root;
    }

    config.ensure_data_dir()?;
    log::debug!("Running consistency check on {}", config.data_dir.display());
    let checked = check_all(&config.data_dir).context("Index consistency check failed")?;
    log::debug!("Index consistency check passed ({checked} files)");

    let coordinator = IndexCoordinator::new(config.indexer_config());
    let app = http_api::router(coordinator, &config.docroot);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Cannot listen on {}", config.bind))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("ShadowCaster offline");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("Cannot listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

async fn run_index(args: IndexArgs, config: ServerConfig) -> Result<()> {
    config.ensure_data_dir()?;
    let coordinator = IndexCoordinator::new(config.indexer_config());
    let task = coordinator
        .index_directory(&args.path, args.kind.as_domain())
        .await
        .with_context(|| format!("Cannot start indexing {}", args.path.display()))?;
    let index_path = task.index_path().to_path_buf();
    let stats = task
        .wait()
        .await
        .with_context(|| format!("Indexing {} failed", args.path.display()))?;

    let output = serde_json::json!({
        "index": index_path,
        "stats": stats,
    });
    print_stdout(&serde_json::to_string_pretty(&output)?)
}

fn run_check(config: &ServerConfig) -> Result<()> {
    let checked = check_all(&config.data_dir).context("Index consistency check failed")?;
    print_stdout(&format!("Checked {checked} index files"))
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let store = IndexStore::open_for_check(&args.file)
        .with_context(|| format!("Cannot open index {}", args.file.display()))?;
    let entries = store.entries(PATHS_BUCKET);
    store.close();
    let entries = entries.with_context(|| format!("Cannot read index {}", args.file.display()))?;
    print_stdout(&serde_json::to_string_pretty(&entries)?)
}
