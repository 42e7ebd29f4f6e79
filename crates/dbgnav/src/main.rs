use std::path::PathBuf;
use std::sync::Arc;
use std::{fs, process};

use clap::{Parser, Subcommand};
use dbgnav_core::snapshot::SnapshotSymbols;
use dbgnav_core::types::Address;
use dbgnav_core::{DbgObject, ListStep, NavError, Navigator};
use dbgnav_utils::{info, init_logging, LogFormat, LogLevel, LoggingConfig};

mod config;

use config::Config;

/// Navigate typed memory of a debuggee snapshot.
#[derive(Parser, Debug)]
#[command(name = "dbgnav")]
#[command(version)]
#[command(about = "Navigate typed memory of a debuggee snapshot", long_about = None)]
struct Cli
{
    /// Debuggee snapshot (JSON: types, globals, symbols, frames, memory)
    #[arg(short, long, value_name = "FILE")]
    snapshot: PathBuf,
    /// TOML configuration with module filters, field overrides and logging
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log level (overrides the configuration file)
    #[arg(long)]
    log_level: Option<LogLevel>,
    /// Log format: pretty or json
    #[arg(long)]
    log_format: Option<LogFormat>,
    /// Also write logs to this file
    #[arg(long, value_name = "FILE", conflicts_with = "log_dir")]
    log_file: Option<PathBuf>,
    /// Also write logs to a dated file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Resolve a global variable and print it
    Global
    {
        /// Module defining the global
        module: String,
        /// Symbol name
        symbol: String,
        /// Read the global as this type instead of its declared one
        #[arg(long = "type")]
        type_name: Option<String>,
        /// Field path to follow, pointers included; repeat for fallbacks
        #[arg(short, long = "path")]
        paths: Vec<String>,
    },
    /// List the fields of an object, sorted by position
    Fields
    {
        /// Object as module!Type@address
        target: String,
        /// Include fields inherited from base types
        #[arg(long, default_value_t = false)]
        bases: bool,
    },
    /// Walk a linked list
    List
    {
        /// First node as module!Type@address
        target: String,
        /// Field path to the next node; repeat for fallbacks
        #[arg(short, long = "next", default_value = "next")]
        next: Vec<String>,
        /// Stop after this many nodes
        #[arg(long)]
        max: Option<usize>,
    },
    /// Read a narrow or wide character string
    String
    {
        /// First character as module!char@address or module!wchar_t@address
        target: String,
        /// Number of characters; reads up to the terminator when omitted
        #[arg(short, long)]
        length: Option<u64>,
    },
    /// Cast an object to its dynamic type, or to a related type
    Cast
    {
        /// Object as module!Type@address
        target: String,
        /// Related type for a checked cast; the vtable type when omitted
        #[arg(long)]
        to: Option<String>,
    },
    /// Print a local variable from every frame of a function
    Locals
    {
        /// Module defining the function
        module: String,
        /// Function name
        method: String,
        /// Local variable name
        symbol: String,
    },
}

fn main()
{
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(Config::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let _guard = match init_logging(&logging_config(&cli, &config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run_command(cli, &config)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Environment first, then the configuration file, then command line flags.
fn logging_config(cli: &Cli, config: &Config) -> LoggingConfig
{
    let mut logging = config.apply_logging(LoggingConfig::from_env());
    if let Some(level) = cli.log_level {
        logging = logging.with_level(level);
    }
    if let Some(format) = cli.log_format {
        logging = logging.with_format(format);
    }
    if let Some(file) = &cli.log_file {
        logging = logging.with_file(file.clone());
    }
    if let Some(dir) = &cli.log_dir {
        logging = logging.with_default_file(dir);
    }
    logging
}

async fn run_command(cli: Cli, config: &Config) -> Result<(), Box<dyn std::error::Error>>
{
    info!("Loading snapshot {}", cli.snapshot.display());
    let symbols = SnapshotSymbols::from_json(&fs::read_to_string(&cli.snapshot)?)?;
    let nav = Navigator::new(Arc::new(symbols), config.registry_builder().build());

    match cli.command {
        Commands::Global {
            module,
            symbol,
            type_name,
            paths,
        } => {
            let global = nav.global(&module, &symbol, type_name.as_deref()).await?;
            let object = if paths.is_empty() {
                global
            } else {
                let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
                global.f_any(&paths).await?
            };
            print_object(&object).await?;
        }
        Commands::Fields { target, bases } => {
            let object = target_object(&nav, &target)?;
            for field in object.fields(bases).await? {
                println!(
                    "+0x{:03x} {:<24} {:<20} {}",
                    field.offset,
                    field.name,
                    field.value.type_descriptor().full_name(),
                    field.value.desc().await?
                );
            }
        }
        Commands::List { target, next, max } => {
            let head = target_object(&nav, &target)?;
            let nodes = head.list(ListStep::paths(next), None, max).await?;
            for (index, node) in nodes.iter().enumerate() {
                println!("[{}] {} {}", index, node, node.desc().await?);
            }
        }
        Commands::String { target, length } => {
            let object = target_object(&nav, &target)?;
            println!("{:?}", object.string(length).await?);
        }
        Commands::Cast { target, to } => {
            let object = target_object(&nav, &target)?;
            let cast = match to {
                Some(to) => object.dcast(&to).await,
                None => object.vcast().await?,
            };
            print_object(&cast).await?;
        }
        Commands::Locals { module, method, symbol } => {
            let locals = nav.locals(&module, &method, &symbol).await?;
            if locals.is_empty() {
                println!("No frame of {}!{} has a local named {}", module, method, symbol);
            }
            for local in &locals {
                print_object(local).await?;
            }
        }
    }

    Ok(())
}

async fn print_object(object: &DbgObject) -> Result<(), NavError>
{
    println!("{} = {}", object, object.desc().await?);
    Ok(())
}

fn target_object(nav: &Navigator, target: &str) -> Result<DbgObject, NavError>
{
    let (type_name, address) = parse_target(target)?;
    Ok(nav.create(&nav.type_descriptor(type_name), address))
}

/// Split `module!Type@address`.
fn parse_target(target: &str) -> Result<(&str, Address), NavError>
{
    let (type_name, address) = target
        .rsplit_once('@')
        .ok_or_else(|| NavError::invalid(format!("expected TYPE@ADDRESS, got {target:?}")))?;
    let type_name = type_name.trim();
    if type_name.is_empty() {
        return Err(NavError::invalid(format!("missing type in {target:?}")));
    }
    Ok((type_name, address.parse()?))
}
