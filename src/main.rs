//! SaveSwap CLI - Manage game save profiles from the command line

use clap::{crate_name, Parser, Subcommand};
use dialoguer::Confirm;
use saveswap::{
    config::config_path, Config, Error, Formatters, Operation, Outcome, ProfileSession,
    SeedContent,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "saveswap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Game save directory, the one containing "sys" (defaults to the configured one)
    #[arg(global = true, short = 'd', long, value_name = "DIR")]
    save_dir: Option<PathBuf>,

    /// Path to settings file
    #[arg(global = true, short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory with template winsys.dxb and winsys.dxg for new profiles
    #[arg(global = true, long, value_name = "DIR")]
    seed_dir: Option<PathBuf>,

    /// Output formatter (shell, text, json)
    #[arg(global = true, short, long, default_value = "shell")]
    formatter: String,

    /// Increase log level (will be overridden by --log-level).
    #[arg(global = true, short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log level
    #[arg(global = true, long, value_name = "LEVEL")]
    log_level: Option<log::LevelFilter>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the stored profiles
    List,
    /// Show the name of the profile currently in the game
    Current,
    /// Create a new profile from the template save files
    Create { name: String },
    /// Rename a profile
    Rename { name: String, new_name: String },
    /// Delete a profile and its files
    Delete {
        name: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Put a profile into the game, keeping the current save as a profile
    Activate { name: String },
    /// Rescan the save directory
    Reload,
    /// Remember the game save directory
    SelectDir { dir: PathBuf },
}

impl Commands {
    fn operation(&self) -> Operation {
        match self {
            Commands::List => Operation::List,
            Commands::Current => Operation::Current,
            Commands::Create { .. } => Operation::Create,
            Commands::Rename { .. } => Operation::Rename,
            Commands::Delete { .. } => Operation::Delete,
            Commands::Activate { .. } => Operation::Activate,
            Commands::Reload => Operation::Reload,
            Commands::SelectDir { .. } => Operation::SelectDir,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logger(&cli, &config) {
        eprintln!("Logger error: {}", e);
    }
    log::debug!("parsed options: {cli:#?}");

    let outcome = match run(&cli, config) {
        Ok(outcome) => outcome,
        Err(e) => Outcome::failure(cli.command.operation(), &e),
    };

    let formatter = Formatters::by_name(&cli.formatter);
    let mut stdout = std::io::stdout();
    if let Err(e) = formatter.write_to(&outcome, &mut stdout) {
        eprintln!("Output error: {}", e);
    }

    if outcome.is_failure() {
        std::process::exit(1);
    }
}

fn init_logger(cli: &Cli, config: &Config) -> Result<(), log::SetLoggerError> {
    let crate_name = crate_name!();
    let mut logger_builder = pretty_env_logger::formatted_builder();

    let default_log_level = config.log_level.unwrap_or(log::LevelFilter::Info);
    logger_builder.filter_module(crate_name, default_log_level);
    if let Ok(filter) = std::env::var("RUST_LOG") {
        logger_builder.parse_filters(&filter);
    }
    if cli.verbose != 0 {
        let mut iter = log::LevelFilter::iter().fuse();
        iter.find(|level| *level == default_log_level);
        for _ in 0..(cli.verbose - 1) {
            iter.next();
        }
        let level = iter.next().unwrap_or(log::LevelFilter::max());
        logger_builder.filter_module(crate_name, level);
    }
    if let Some(level) = cli.log_level {
        logger_builder.filter_module(crate_name, level);
    }
    logger_builder.try_init()
}

fn run(cli: &Cli, config: Config) -> saveswap::Result<Outcome> {
    if let Commands::SelectDir { dir } = &cli.command {
        return select_dir(cli, config, dir);
    }

    let save_dir = cli
        .save_dir
        .clone()
        .or_else(|| config.save_dir.clone())
        .ok_or(Error::NoSaveDir)?;
    let mut session = ProfileSession::open(save_dir)?;

    let outcome = match &cli.command {
        Commands::List | Commands::Reload => {
            if matches!(cli.command, Commands::Reload) {
                session.reload()?;
            }
            listing(&session, cli.command.operation())
        }
        Commands::Current => {
            let name = session.current_active_name();
            let mut outcome =
                Outcome::success(Operation::Current, format!("Current Profile: {name}"));
            if let Some(profile) = session.current_profile() {
                outcome.add_detail("id", Value::from(profile.id()));
            }
            outcome
        }
        Commands::Create { name } => {
            let seed_dir = cli.seed_dir.clone().or_else(|| config.seed_dir.clone());
            if let Some(seed_dir) = seed_dir {
                session.set_seed(load_seed(&seed_dir)?);
            }
            let profile = session.create_profile(name)?;
            let mut outcome =
                Outcome::success(Operation::Create, format!("Created profile {name}"));
            outcome.add_detail("id", Value::from(profile.id()));
            outcome
        }
        Commands::Rename { name, new_name } => {
            let id = profile_id(&session, name)?;
            session.rename_profile(&id, new_name)?;
            Outcome::success(Operation::Rename, format!("Renamed {name} to {new_name}"))
        }
        Commands::Delete { name, yes } => {
            let id = profile_id(&session, name)?;
            if !yes && !confirm_delete(name)? {
                return Ok(Outcome::success(Operation::Delete, "Nothing deleted"));
            }
            session.delete_profile(&id)?;
            Outcome::success(Operation::Delete, format!("Deleted profile {name}"))
        }
        Commands::Activate { name } => {
            let id = profile_id(&session, name)?;
            let activation = session.activate_profile(&id)?;
            let mut outcome = Outcome::success(
                Operation::Activate,
                format!(
                    "Activated {}, previous save kept as {}",
                    activation.activated, activation.archived_as
                ),
            );
            outcome.add_detail("materialized", Value::Bool(activation.materialized));
            outcome
        }
        Commands::SelectDir { dir } => return select_dir(cli, config, dir),
    };
    Ok(outcome)
}

fn select_dir(cli: &Cli, mut config: Config, dir: &Path) -> saveswap::Result<Outcome> {
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    let path = cli.config.clone().unwrap_or_else(config_path);

    let session = ProfileSession::open_selected(dir, |root| {
        config.save_dir = Some(root.to_path_buf());
        config.save_to(&path)
    })?;
    log::info!("save directory set to {:?}", session.root());

    Ok(listing(&session, Operation::SelectDir))
}

fn listing(session: &ProfileSession, operation: Operation) -> Outcome {
    let profiles = session.list_profiles();
    let mut outcome = Outcome::success(operation, format!("{} profiles", profiles.len()))
        .with_profiles(profiles);
    outcome.add_detail("current", Value::from(session.current_active_name()));
    outcome.add_detail(
        "save_dir",
        Value::from(session.root().to_string_lossy().to_string()),
    );
    outcome
}

fn profile_id(session: &ProfileSession, name: &str) -> saveswap::Result<String> {
    session
        .find_by_name(name)
        .map(|profile| profile.id().to_string())
        .ok_or_else(|| Error::NotFound(name.to_string()))
}

fn load_seed(dir: &Path) -> saveswap::Result<SeedContent> {
    SeedContent::from_dir(dir).map_err(|e| Error::InitFailed {
        dir: dir.to_path_buf(),
        reason: format!("can not read template save files: {e}"),
    })
}

fn confirm_delete(name: &str) -> saveswap::Result<bool> {
    Confirm::new()
        .with_prompt(format!(
            "Delete profile {name}? This operation can not be reverted."
        ))
        .default(false)
        .interact()
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
}
