//! # mediavc CLI
//!
//! Manage versioned media collections stored in a local `SQLite` database
//! and share them through a relay.

use anyhow::{Context, Result};
use mediavc_collection::{Ed25519Signer, PullOutcome};
use mediavc_relay::HttpRelay;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod config;
mod persistence;
mod workspace;

use config::CliConfig;
use workspace::Workspace;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "keygen" => {
            let signer = Ed25519Signer::generate();
            println!("{}", signer.encoded_seed());
            eprintln!("Set MEDIAVC_SIGNING_KEY to this value to sign commits.");
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            let config = CliConfig::from_env()?;
            run(cmd, &args[2..], &config).await?;
        }
    }

    Ok(())
}

async fn run(cmd: &str, args: &[String], config: &CliConfig) -> Result<()> {
    match cmd {
        "add" => {
            let (name, file) = two_args(args, "add <collection> <file> [comment]");
            let comment = args.get(2).map_or("", String::as_str);
            let mut ws = Workspace::open(config)?;
            let summary = ws.add_file(name, Path::new(file), comment)?;
            if let Some(root) = summary.current_root {
                println!("{name} {root}");
            }
        }
        "list" => {
            let name = one_arg(args, "list <collection>");
            let mut ws = Workspace::open(config)?;
            for (index, node) in ws.list(name)?.iter().enumerate() {
                println!(
                    "{index:>4}  {}  {:<24}  {:<24}  {:>10}  {}",
                    node.id,
                    node.media.name,
                    node.media.mime_type,
                    node.media.data.len(),
                    node.comment
                );
            }
        }
        "log" => {
            let name = one_arg(args, "log <collection>");
            let mut ws = Workspace::open(config)?;
            for version in ws.log(name)? {
                let when = chrono::DateTime::from_timestamp_millis(version.details.timestamp)
                    .map_or_else(|| version.details.timestamp.to_string(), |t| t.to_rfc3339());
                let signed = if version.details.signature.is_some() {
                    "signed"
                } else {
                    "unsigned"
                };
                println!(
                    "{}  {when}  {signed}  {}",
                    version.root,
                    version.details.comment.as_deref().unwrap_or("")
                );
            }
        }
        "export" => {
            let (name, out) = two_args(args, "export <collection> <out> [--complete]");
            let complete = has_flag(args, "--complete");
            let mut ws = Workspace::open(config)?;
            let bundle = ws.export(name, complete)?;
            std::fs::write(out, &bundle.bytes).with_context(|| format!("Failed to write {out}"))?;
            println!("{} {out}", bundle.cid);
        }
        "import" => {
            let (name, file) = two_args(args, "import <name> <bundle> [--complete]");
            let complete = has_flag(args, "--complete");
            let bytes = std::fs::read(file).with_context(|| format!("Failed to read {file}"))?;
            let mut ws = Workspace::open(config)?;
            let summary = ws.import(name, &bytes, complete)?;
            if let Some(root) = summary.version_store_root {
                println!("{name} registry {root}");
            }
        }
        "push" => {
            let name = one_arg(args, "push <collection>");
            let relay = HttpRelay::new(config.relay.clone())?;
            let mut ws = Workspace::open(config)?;
            let store_id = ws.push(name, &relay).await?;
            println!("{name} {store_id}");
        }
        "pull" => {
            let name = one_arg(args, "pull <collection>");
            let relay = HttpRelay::new(config.relay.clone())?;
            let mut ws = Workspace::open(config)?;
            let outcome = ws.pull(name, &relay).await?;
            let message = match outcome {
                PullOutcome::NotFound => "not published",
                PullOutcome::UpToDate => "up to date",
                PullOutcome::FastForward => "updated",
                PullOutcome::Overwrote => "updated (local head replaced)",
            };
            println!("{name} {message}");
        }
        "status" => {
            let name = one_arg(args, "status <collection>");
            let relay = HttpRelay::new(config.relay.clone())?;
            let mut ws = Workspace::open(config)?;
            if ws.has_remote_updates(name, &relay).await? {
                println!("{name} has remote updates");
            } else {
                println!("{name} up to date");
            }
        }
        "verify" => {
            let name = one_arg(args, "verify <collection>");
            let mut ws = Workspace::open(config)?;
            if ws.verify(name)? {
                println!("{name} signature OK");
            } else {
                eprintln!("{name} signature INVALID");
                std::process::exit(2);
            }
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn one_arg<'a>(args: &'a [String], usage: &str) -> &'a str {
    args.first()
        .map_or_else(|| usage_exit(usage), String::as_str)
}

fn two_args<'a>(args: &'a [String], usage: &str) -> (&'a str, &'a str) {
    match args {
        [first, second, ..] => (first.as_str(), second.as_str()),
        _ => usage_exit(usage),
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

fn usage_exit(usage: &str) -> ! {
    eprintln!("Usage: mediavc {usage}");
    std::process::exit(1);
}

fn print_help() {
    println!(
        r"mediavc

USAGE:
    mediavc <COMMAND> [OPTIONS]

COMMANDS:
    add <collection> <file> [comment]       Add a file and commit the collection
    list <collection>                       List records of a collection
    log <collection>                        Show the version log, newest first
    export <collection> <out> [--complete]  Write the head (or full lineage) bundle
    import <name> <bundle> [--complete]     Register a bundle as a collection
    push <collection>                       Upload a collection and the registry
    pull <collection>                       Fast-forward a collection from the relay
    status <collection>                     Check the relay for newer versions
    verify <collection>                     Check the head signature
    keygen                                  Print a new signing key
    help                                    Show this help message

ENVIRONMENT:
    MEDIAVC_DB_PATH             SQLite database (default ./mediavc.db)
    MEDIAVC_CHUNK_SIZE          Chunk size in bytes (default 262144)
    MEDIAVC_RELAY_URL           Relay base URL (default http://localhost:8787)
    MEDIAVC_RELAY_TIMEOUT_SECS  Relay request timeout
    MEDIAVC_BEARER_TOKEN        Relay bearer token
    MEDIAVC_SIGNING_KEY         Signing key from `mediavc keygen`
    RUST_LOG                    Log filter (default info)

EXAMPLES:
    mediavc add /holiday beach.jpg 'first day'
    mediavc export /holiday holiday.bundle --complete
"
    );
}
