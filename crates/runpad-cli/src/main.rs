//! Runpad CLI
//!
//! A command-line tool for running code on TIO, Piston and the Rust playground.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runpad::{
    Config, EXAMPLE_CONFIG, FileSettingsStore, MystBinClient, PistonClient, PistonFile,
    PlaygroundClient, ReqwestTransport, RunOptions, RustChannel, RustEdition, RustMode,
    RustSettingsUpdate, SettingsStore, Source, SourceInput, TioClient, Transport, render,
};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runpad")]
#[command(about = "Run code on remote execution backends")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print output as-is instead of pasting long output to MystBin
    #[arg(long, global = true)]
    no_paste: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: runpad.toml)
        #[arg(short, long, default_value = "runpad.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    ShowConfig,

    /// Run code on TIO
    Tio {
        /// Source file, code block or MystBin link (default: stdin)
        #[arg(value_name = "FILE")]
        source: Option<PathBuf>,

        /// Language name (default: the code block's language tag)
        #[arg(short, long)]
        language: Option<String>,

        /// Input file passed to the program's stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Compiler flag (repeatable)
        #[arg(long = "flag", allow_hyphen_values = true)]
        flags: Vec<String>,

        /// Interpreter option (repeatable)
        #[arg(long = "option", allow_hyphen_values = true)]
        options: Vec<String>,

        /// Program arguments
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// List TIO languages
    Languages {
        /// Only show languages starting with this prefix
        prefix: Option<String>,
    },

    /// Run code on Piston
    Run {
        /// Source file, code block or MystBin link (default: stdin)
        #[arg(value_name = "FILE")]
        source: Option<PathBuf>,

        /// Language or alias (default: the code block's language tag)
        #[arg(short, long)]
        language: Option<String>,

        /// Input file passed to the program's stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Program arguments
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// List Piston runtimes
    Runtimes,

    /// Run Rust code on the playground
    Rust {
        /// Source file, code block or MystBin link (default: stdin)
        #[arg(value_name = "FILE")]
        source: Option<PathBuf>,

        #[command(flatten)]
        toolchain: ToolchainArgs,

        /// Use the stored preferences of this user
        #[arg(short, long)]
        user: Option<u64>,
    },

    /// Format Rust code with rustfmt
    Rustfmt(ToolArgs),

    /// Lint Rust code with clippy
    Clippy(ToolArgs),

    /// Expand macros in Rust code
    ExpandMacros(ToolArgs),

    /// Fetch or create MystBin pastes
    #[command(subcommand)]
    Paste(PasteCommand),

    /// Show or change stored playground preferences
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(clap::Args)]
struct ToolArgs {
    /// Source file, code block or MystBin link (default: stdin)
    #[arg(value_name = "FILE")]
    source: Option<PathBuf>,

    /// Edition (default: the user's stored edition, else 2018)
    #[arg(short, long)]
    edition: Option<RustEdition>,

    /// Use the stored edition of this user
    #[arg(short, long)]
    user: Option<u64>,
}

#[derive(clap::Args)]
struct ToolchainArgs {
    /// Release channel (stable, beta, nightly)
    #[arg(long)]
    channel: Option<RustChannel>,

    /// Edition (2015, 2018, 2021)
    #[arg(long)]
    edition: Option<RustEdition>,

    /// Build mode (debug, release)
    #[arg(long)]
    mode: Option<RustMode>,
}

impl ToolchainArgs {
    fn update(&self) -> RustSettingsUpdate {
        RustSettingsUpdate {
            channel: self.channel,
            edition: self.edition,
            mode: self.mode,
        }
    }
}

#[derive(Subcommand)]
enum PasteCommand {
    /// Print a paste
    Get {
        /// Paste id or URL
        id: String,
    },

    /// Upload a file as a paste
    Create {
        /// File to upload (default: stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Syntax highlighting
        #[arg(short, long)]
        syntax: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Show a user's preferences
    Show {
        #[arg(short, long)]
        user: u64,
    },

    /// Change a user's Rust preferences
    Set {
        #[arg(short, long)]
        user: u64,

        #[command(flatten)]
        toolchain: ToolchainArgs,
    },
}

/// Clients built from the loaded configuration
struct App {
    config: Config,
    transport: Arc<dyn Transport>,
    mystbin: MystBinClient,
    no_paste: bool,
}

impl App {
    fn new(config: Config, no_paste: bool) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(
            ReqwestTransport::new(&config.http.user_agent, config.http.timeout())
                .context("failed to create HTTP client")?,
        );
        let mystbin = MystBinClient::new(Arc::clone(&transport), &config.mystbin);
        Ok(Self {
            config,
            transport,
            mystbin,
            no_paste,
        })
    }

    fn settings_store(&self) -> FileSettingsStore {
        FileSettingsStore::new(&self.config.settings.path)
    }

    /// Read the source argument and resolve code blocks and paste links
    async fn source(&self, path: Option<&Path>) -> Result<Source> {
        let text = read_input(path).await?;
        SourceInput::parse(&text)?
            .resolve(&self.mystbin)
            .await
            .context("failed to read source")
    }

    /// Source code and edition for the rustfmt, clippy and macro expansion tools
    async fn tool_input(&self, tool: &ToolArgs) -> Result<(String, RustEdition)> {
        let code = self.source(tool.source.as_deref()).await?.code;
        let stored = match (tool.edition, tool.user) {
            (None, Some(user)) => Some(
                self.settings_store()
                    .get(user)
                    .await
                    .context("failed to read settings")?
                    .rust_edition,
            ),
            _ => None,
        };
        Ok((code, pick_edition(tool.edition, stored)))
    }

    async fn emit(&self, output: &str, syntax: &str) -> Result<()> {
        if self.no_paste {
            println!("{output}");
            return Ok(());
        }
        let rendered = render(output, syntax, &self.config.output, &self.mystbin)
            .await
            .context("failed to upload output")?;
        println!("{rendered}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
    } else {
        debug!("using default configuration");
    }
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    let app = App::new(config, cli.no_paste)?;

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::ShowConfig => {
            show_config(&app.config);
            Ok(())
        }
        Commands::Tio {
            source,
            language,
            input,
            flags,
            options,
            args,
        } => {
            let options = RunOptions::new()
                .with_input(read_optional(input.as_deref()).await?)
                .with_flags(flags)
                .with_options(options)
                .with_args(args);
            run_tio(&app, source.as_deref(), language, &options).await
        }
        Commands::Languages { prefix } => list_languages(&app, prefix.as_deref()).await,
        Commands::Run {
            source,
            language,
            input,
            args,
        } => run_piston(&app, source.as_deref(), language, input.as_deref(), args).await,
        Commands::Runtimes => list_runtimes(&app).await,
        Commands::Rust {
            source,
            toolchain,
            user,
        } => run_rust(&app, source.as_deref(), &toolchain, user).await,
        Commands::Rustfmt(tool) => {
            let (code, edition) = app.tool_input(&tool).await?;
            let response = playground(&app)
                .format(&code, edition)
                .await
                .context("rustfmt failed")?;
            app.emit(&response.to_string(), "rs").await
        }
        Commands::Clippy(tool) => {
            let (code, edition) = app.tool_input(&tool).await?;
            let response = playground(&app)
                .clippy(&code, edition)
                .await
                .context("clippy failed")?;
            app.emit(&response.to_string(), "rs").await
        }
        Commands::ExpandMacros(tool) => {
            let (code, edition) = app.tool_input(&tool).await?;
            let response = playground(&app)
                .expand_macros(&code, edition)
                .await
                .context("macro expansion failed")?;
            app.emit(&response.to_string(), "rs").await
        }
        Commands::Paste(command) => run_paste(&app, command).await,
        Commands::Settings(command) => run_settings(&app, command).await,
    }
}

/// Read a file, or stdin when no path is given
async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display())),
        None => {
            use tokio::io::AsyncReadExt;

            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Read a file if one is given, empty otherwise
async fn read_optional(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => read_input(Some(path)).await,
        None => Ok(String::new()),
    }
}

fn playground(app: &App) -> PlaygroundClient {
    PlaygroundClient::new(Arc::clone(&app.transport), &app.config.playground)
}

fn pick_language(flag: Option<String>, source: &Source) -> Result<String> {
    flag.or_else(|| source.language.clone())
        .context("no language given; pass --language or tag the code block")
}

async fn run_tio(
    app: &App,
    source: Option<&Path>,
    language: Option<String>,
    options: &RunOptions,
) -> Result<()> {
    let source = app.source(source).await?;
    let language = pick_language(language, &source)?;

    let client = TioClient::new(Arc::clone(&app.transport), &app.config.tio);
    info!(%language, "running on TIO");
    let result = client.run(&source.code, &language, options).await?;

    app.emit(&result.output, "txt").await?;

    info!(
        language = %result.language,
        real_time = format_args!("{:.3}s", result.real_time),
        user_time = format_args!("{:.3}s", result.user_time),
        sys_time = format_args!("{:.3}s", result.sys_time),
        cpu_share = format_args!("{:.2}%", result.cpu_share),
        exit_code = result.exit_code,
        "execution result"
    );

    if result.is_success() {
        Ok(())
    } else {
        std::process::exit(exit_status(result.exit_code));
    }
}

async fn list_languages(app: &App, prefix: Option<&str>) -> Result<()> {
    let client = TioClient::new(Arc::clone(&app.transport), &app.config.tio);
    let languages = client.languages().await;
    if languages.is_empty() {
        anyhow::bail!("the TIO language list is unavailable");
    }

    let prefix = prefix.map(str::to_lowercase).unwrap_or_default();
    let mut matching: Vec<_> = languages
        .iter()
        .filter(|id| id.starts_with(&prefix))
        .collect();
    matching.sort();

    println!("Available languages:\n");
    for id in matching {
        println!("  {id}");
    }
    Ok(())
}

async fn run_piston(
    app: &App,
    source: Option<&Path>,
    language: Option<String>,
    input: Option<&Path>,
    args: Vec<String>,
) -> Result<()> {
    let source = app.source(source).await?;
    let language = pick_language(language, &source)?;

    let client = PistonClient::new(Arc::clone(&app.transport), &app.config.piston);
    let runtime = client.get_runtime(&language).await?;
    let options = client
        .default_options()
        .with_stdin(read_optional(input).await?)
        .with_args(args);

    info!(language = %runtime.language, version = %runtime.version, "running on Piston");
    let files = [PistonFile::new("main", source.code)];
    let response = client
        .execute(&runtime, &files, &options)
        .await
        .context("execution failed")?;

    app.emit(&response.output(), "txt").await?;
    info!(outcome = ?response.outcome(), code = ?response.code(), "execution result");

    if response.outcome().is_success() {
        Ok(())
    } else {
        std::process::exit(exit_status(response.code().unwrap_or(1)));
    }
}

async fn list_runtimes(app: &App) -> Result<()> {
    let client = PistonClient::new(Arc::clone(&app.transport), &app.config.piston);
    let runtimes = client
        .runtimes()
        .await
        .context("failed to fetch runtimes")?;

    let mut runtimes: Vec<_> = runtimes.iter().collect();
    runtimes.sort_by(|a, b| a.language.cmp(&b.language));

    println!("Available runtimes:\n");
    for runtime in runtimes {
        if runtime.aliases.is_empty() {
            println!("  {:<15} {}", runtime.language, runtime.version);
        } else {
            println!(
                "  {:<15} {} ({})",
                runtime.language,
                runtime.version,
                runtime.aliases.join(", ")
            );
        }
    }
    Ok(())
}

async fn run_rust(
    app: &App,
    source: Option<&Path>,
    toolchain: &ToolchainArgs,
    user: Option<u64>,
) -> Result<()> {
    let code = app.source(source).await?.code;

    // Flags override stored preferences for this run only
    let mut entry = match user {
        Some(user) => app
            .settings_store()
            .get(user)
            .await
            .context("failed to read settings")?,
        None => runpad::SettingsEntry::new(0),
    };
    toolchain.update().apply(&mut entry);
    let settings = entry.playground_settings();

    info!(
        channel = %settings.channel,
        edition = %settings.edition,
        mode = %settings.mode,
        "running on the playground"
    );
    let response = playground(app)
        .execute(&code, settings)
        .await
        .context("execution failed")?;

    app.emit(&response.to_string(), "rs").await?;
    if response.success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

async fn run_paste(app: &App, command: PasteCommand) -> Result<()> {
    match command {
        PasteCommand::Get { id } => {
            let id = match SourceInput::parse(&id)? {
                SourceInput::Paste { id, .. } => id,
                _ => id,
            };
            let paste = app
                .mystbin
                .get_paste(&id)
                .await
                .context("failed to fetch paste")?;
            println!("{}", paste.content);
        }
        PasteCommand::Create { file, syntax } => {
            let content = read_input(file.as_deref()).await?;
            let paste = app
                .mystbin
                .create_paste(&content, syntax.as_deref())
                .await
                .context("failed to create paste")?;
            println!("{}", app.mystbin.url_for(&paste));
        }
    }
    Ok(())
}

async fn run_settings(app: &App, command: SettingsCommand) -> Result<()> {
    let store = app.settings_store();
    let entry = match command {
        SettingsCommand::Show { user } => store.get(user).await?,
        SettingsCommand::Set { user, toolchain } => {
            let update = toolchain.update();
            if update.is_empty() {
                anyhow::bail!("nothing to change; pass --channel, --edition or --mode");
            }
            store.update_rust(user, update).await?
        }
    };

    println!("Settings for user {}:", entry.user_id);
    println!("  Rust channel: {}", entry.rust_channel);
    println!("  Rust edition: {}", entry.rust_edition);
    println!("  Rust mode: {}", entry.rust_mode);
    Ok(())
}

/// An explicit edition wins over the stored one
fn pick_edition(explicit: Option<RustEdition>, stored: Option<RustEdition>) -> RustEdition {
    explicit.or(stored).unwrap_or(RustEdition::E2018)
}

/// Process status for a program exit code
///
/// Statuses are truncated to 8 bits, so a failing code that is a multiple
/// of 256 is reported as 1 instead of 0.
fn exit_status(code: i32) -> i32 {
    if code != 0 && code & 0xff == 0 {
        1
    } else {
        code
    }
}

fn show_config(config: &Config) {
    println!("TIO:");
    println!("  Run URL: {}", config.tio.run_url);
    println!("  Languages URL: {}", config.tio.languages_url);
    println!("  Catalog TTL: {:?}", config.tio.catalog_ttl());
    println!("  Extra aliases: {}", config.tio.aliases.len());
    println!();
    println!("Piston: {}", config.piston.base_url);
    println!("  Compile timeout: {}s", config.piston.compile_timeout);
    println!("  Run timeout: {}s", config.piston.run_timeout);
    println!();
    println!("Playground: {}", config.playground.base_url);
    println!("MystBin: {}", config.mystbin.api_url);
    println!();
    println!(
        "Inline output limit: {} characters, {} lines",
        config.output.max_chars, config.output.max_lines
    );
    println!("Settings file: {}", config.settings.path.display());
}

async fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
