use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use scriptweave_core::{ModeSetting, ReferenceScanner, ScriptWeave, WeaveConfig};
use scriptweave_host::ReferenceHost;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = "scriptweave.toml";

fn project_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (default: <root>/scriptweave.toml if present)"),
        )
        .arg(
            Arg::new("root")
                .long("root")
                .value_parser(value_parser!(PathBuf))
                .help("Project root"),
        )
        .arg(
            Arg::new("document")
                .long("document")
                .help("Entry document relative to the root"),
        )
}

fn cli() -> Command {
    Command::new("scriptweave")
        .version(scriptweave_core::VERSION)
        .about("Pull classic script references into a staged build")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            project_args(Command::new("build").about("Build the project through the reference host"))
                .arg(
                    Arg::new("out-dir")
                        .long("out-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output directory"),
                )
                .arg(
                    Arg::new("passthrough")
                        .long("passthrough")
                        .action(ArgAction::SetTrue)
                        .help("Emit scripts unchanged instead of delegating to the host"),
                )
                .arg(
                    Arg::new("minify")
                        .long("minify")
                        .action(ArgAction::SetTrue)
                        .help("Ask the host to minify compiled units"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the build report as JSON"),
                ),
        )
        .subcommand(
            project_args(Command::new("scan").about("List script references in the entry document"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("build", args)) => build(args).await,
        Some(("scan", args)) => scan(args).await,
        _ => unreachable!("subcommand required"),
    }
}

/// Config file, then command line overrides
fn load_config(args: &ArgMatches) -> Result<WeaveConfig> {
    let root_flag = args.get_one::<PathBuf>("root");
    let config_path = args.get_one::<PathBuf>("config").cloned().or_else(|| {
        let candidate = root_flag.map_or_else(|| PathBuf::from(CONFIG_FILE), |r| r.join(CONFIG_FILE));
        candidate.is_file().then_some(candidate)
    });

    let mut config = match &config_path {
        Some(path) => WeaveConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WeaveConfig::default(),
    };

    if let Some(root) = root_flag {
        config.root.clone_from(root);
    }
    if let Some(document) = args.get_one::<String>("document") {
        config.document.clone_from(document);
    }
    if let Ok(Some(out_dir)) = args.try_get_one::<PathBuf>("out-dir") {
        config.out_dir.clone_from(out_dir);
    }
    if args.try_get_one::<bool>("passthrough").ok().flatten() == Some(&true) {
        config.mode = ModeSetting::Passthrough;
    }
    if args.try_get_one::<bool>("minify").ok().flatten() == Some(&true) {
        config.minify = true;
    }

    config.root = absolute(&config.root)?;
    config.validate()?;
    Ok(config)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).with_context(|| format!("project root {}", path.display()))
}

async fn build(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);

    let report = host.run(&mut plugin).await.context("build failed")?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("References:");
    for record in plugin.records() {
        let location = record
            .is_finalized()
            .then(|| record.final_location().ok())
            .flatten();
        match location {
            Some(location) => println!("  {} -> /{}", record.original_path(), location),
            None => println!("  {} (unchanged)", record.original_path()),
        }
    }
    println!();
    println!("Outputs: {}", report.outputs.len());
    for output in &report.outputs {
        println!("  {} ({} bytes)", output.file_name, output.bytes);
    }
    if let Some(rewrite) = plugin.last_rewrite() {
        println!("Rewritten attributes: {}", rewrite.replacements);
    }
    println!(
        "Failed units: {}  Warnings: {}  Errors: {}",
        report.failed.len(),
        report.warnings(),
        report.errors()
    );
    Ok(())
}

async fn scan(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    let scanner = ReferenceScanner::new(&config.root).with_extensions(&config.extensions);
    let records = scanner.scan(&config.document_path()).await;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No script references in {}", config.document_path().display());
    }
    for record in &records {
        println!("{} -> {}", record.original_path(), record.resolved_path().display());
    }
    Ok(())
}
