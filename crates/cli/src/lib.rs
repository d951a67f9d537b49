pub mod commands;
pub mod logging;
pub mod view;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use clientela_core::config::{ConfigOverrides, LoadOptions, StoreBackend};

use commands::customers::{CreateArgs, UpdateArgs};

#[derive(Debug, Parser)]
#[command(
    name = "clientela",
    about = "Clientela customer registry CLI",
    long_about = "Browse and edit the customer registry interactively, or run one-shot store commands with JSON output.",
    after_help = "Examples:\n  clientela ui\n  clientela list\n  clientela search gar\n  clientela --backend sqlite migrate"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a clientela.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Store backend override (local|memory|sqlite|rest)")]
    backend: Option<StoreBackend>,
    #[arg(long, global = true, help = "Directory holding local store slots")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Inject network-like latency into the local store")]
    simulate_latency: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Open the interactive customer list and form")]
    Ui,
    #[command(about = "List every customer in insertion order")]
    List,
    #[command(about = "Show one customer by id")]
    Show { id: String },
    #[command(about = "Create a customer")]
    Create(CreateArgs),
    #[command(about = "Update the given fields of a customer")]
    Update(UpdateArgs),
    #[command(about = "Delete a customer by id")]
    Delete { id: String },
    #[command(about = "Case-insensitive search on first name, last name, or email")]
    Search { term: String },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Apply pending database migrations for the sqlite backend")]
    Migrate,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                store_backend: self.backend,
                data_dir: self.data_dir.clone(),
                simulate_latency: self.simulate_latency.then_some(true),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();
    logging::init(&options);

    let result = match cli.command {
        Command::Ui => commands::ui::run(options),
        Command::List => commands::customers::list(options),
        Command::Show { id } => commands::customers::show(options, id),
        Command::Create(args) => commands::customers::create(options, args),
        Command::Update(args) => commands::customers::update(options, args),
        Command::Delete { id } => commands::customers::delete(options, id),
        Command::Search { term } => commands::customers::search(options, term),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Migrate => commands::migrate::run(options),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
