mod prompt;
mod registry;

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use codex_rename_core::{
    ActiveContext, FallbackChoice, FlowOutcome, MatchOutcome, PatchApplicationOutcome,
    PatchApplier, RenameConfig, RenameFlow, conversation_id_from_str, match_layout,
    rename_candidates,
};

use crate::prompt::TerminalPrompter;
use crate::registry::{SnapshotRegistry, parse_command_list};

#[derive(Parser)]
#[command(name = "codex-rename", version, about = "Add thread renaming to the Codex editor extension")]
struct Args {
    /// Config file (default ~/.codex-rename/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extension to patch, `publisher.name`
    #[arg(long, global = true, env = "CODEX_RENAME_EXTENSION_ID")]
    extension_id: Option<String>,

    /// Extra extension directory to search, scanned before configured ones
    #[arg(long = "extensions-dir", global = true, env = "CODEX_RENAME_EXTENSIONS_DIR")]
    extensions_dirs: Vec<PathBuf>,

    /// More logging (-v info, -vv debug); overrides CODEX_RENAME_LOG
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Patch the installed extension so it registers the rename command
    Patch {
        /// Report what would happen without writing
        #[arg(long)]
        dry_run: bool,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the layout matcher on a bundle file
    Inspect {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the rename candidates for a dump of registered command ids
    Candidates {
        /// One id per line or a JSON array; stdin when omitted
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Print the conversation id carried by a Codex URI
    ConversationId { uri: String },
    /// Run the full rename flow against a command registry dump
    Rename {
        /// Registered command ids, one per line or a JSON array
        #[arg(long)]
        commands: PathBuf,
        /// URI of the active Codex conversation
        #[arg(long)]
        uri: Option<String>,
    },
    /// Show or initialize the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config, overrides applied
    Show,
    /// Write a default config file unless one exists
    Init,
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let filter = match verbose {
        0 => EnvFilter::try_from_env("CODEX_RENAME_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(&args)?;

    match args.command {
        Command::Patch { dry_run, json } => {
            let applier = applier_for(&config).dry_run(dry_run);
            let extension_id = applier.extension_id().to_string();
            let outcome = tokio::task::spawn_blocking(move || applier.apply()).await??;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", describe_patch(&outcome, &extension_id));
            }
            Ok(if patch_failed(&outcome) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Inspect { file, json } => inspect(&file, json),
        Command::Candidates { from } => {
            let text = read_input(from.as_deref())?;
            for id in rename_candidates(&parse_command_list(&text)?) {
                println!("{id}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::ConversationId { uri } => match conversation_id_from_str(&uri) {
            Some(id) => {
                println!("{id}");
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("error: no conversation id in {uri}");
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Rename { commands, uri } => {
            let text = read_input(Some(commands.as_path()))?;
            let registry = SnapshotRegistry::new(parse_command_list(&text)?);
            let flow = RenameFlow::new(
                Arc::new(registry),
                Arc::new(TerminalPrompter),
                applier_for(&config),
            );
            let context = ActiveContext {
                editor_uri: uri,
                tab_input_uri: None,
            };
            let outcome = flow.run(&context).await;
            println!("{}", describe_flow(&outcome));
            Ok(match outcome {
                FlowOutcome::Failed { .. } => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            })
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigAction::Init => {
                let path = match args.config {
                    Some(path) => path,
                    None => RenameConfig::default_path().context("cannot locate home directory")?,
                };
                if path.exists() {
                    eprintln!("{} already exists", path.display());
                    return Ok(ExitCode::FAILURE);
                }
                RenameConfig::default().save_to(&path)?;
                println!("wrote {}", path.display());
                Ok(ExitCode::SUCCESS)
            }
        },
    }
}

/// Config file first, then env and flag overrides.
fn load_config(args: &Args) -> anyhow::Result<RenameConfig> {
    let mut config = match &args.config {
        Some(path) => RenameConfig::load_from(path)?,
        None => RenameConfig::load()?,
    };
    if let Some(id) = &args.extension_id {
        config.extension_id = id.clone();
    }
    if !args.extensions_dirs.is_empty() {
        let mut roots = args.extensions_dirs.clone();
        roots.append(&mut config.extension_roots);
        config.extension_roots = roots;
    }
    Ok(config)
}

fn applier_for(config: &RenameConfig) -> PatchApplier {
    PatchApplier::new(Arc::new(config.catalog()), config.extension_id.clone())
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn inspect(file: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let outcome = match_layout(&source);

    if json {
        let value = match &outcome {
            MatchOutcome::AlreadyPatched => serde_json::json!({ "status": "already_patched" }),
            MatchOutcome::Matched(found) => {
                serde_json::json!({ "status": "matched", "match": found })
            }
            MatchOutcome::Unsupported(reason) => {
                serde_json::json!({ "status": "unsupported_layout", "reason": reason })
            }
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match &outcome {
            MatchOutcome::AlreadyPatched => println!("already patched"),
            MatchOutcome::Matched(found) => {
                println!("global state:          {}", found.global_state_var);
                println!("constants:             {}", found.constants_var);
                println!("panel creation:        {}", found.panel_creation_var);
                println!("new chat:              {}", found.new_chat_var);
                println!("chat session provider: {}", found.chat_session_provider_var);
                println!("insertion point:       {}", found.insertion_point);
            }
            MatchOutcome::Unsupported(reason) => println!("unsupported layout: {reason}"),
        }
    }

    Ok(match outcome {
        MatchOutcome::Unsupported(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn describe_patch(outcome: &PatchApplicationOutcome, extension_id: &str) -> String {
    match outcome {
        PatchApplicationOutcome::NotInstalled => format!("{extension_id} extension not found."),
        PatchApplicationOutcome::ExtensionFileMissing { extension_file, .. } => {
            format!("Codex runtime file not found: {}", extension_file.display())
        }
        PatchApplicationOutcome::AlreadyPatched {
            extension_version, ..
        } => format!("Codex runtime already patched on disk ({extension_version})."),
        PatchApplicationOutcome::UnsupportedLayout {
            extension_version,
            reason,
            ..
        } => format!("Codex runtime layout not recognized ({extension_version}): {reason}"),
        PatchApplicationOutcome::WouldPatch {
            extension_version,
            extension_file,
        } => format!(
            "Would patch {} ({extension_version}).",
            extension_file.display()
        ),
        PatchApplicationOutcome::Patched {
            extension_version,
            backup_path,
            ..
        } => format!(
            "Patched Codex runtime ({extension_version}). Backup: {}",
            backup_path.display()
        ),
    }
}

/// Outcomes that leave the extension without a rename command.
fn patch_failed(outcome: &PatchApplicationOutcome) -> bool {
    matches!(
        outcome,
        PatchApplicationOutcome::NotInstalled
            | PatchApplicationOutcome::ExtensionFileMissing { .. }
            | PatchApplicationOutcome::UnsupportedLayout { .. }
    )
}

fn describe_flow(outcome: &FlowOutcome) -> String {
    match outcome {
        FlowOutcome::Renamed { command_id } => format!("renamed via {command_id}"),
        FlowOutcome::PatchReady { outcome, reloaded } => {
            let version = outcome.extension_version().unwrap_or("unknown");
            if *reloaded {
                format!("{} ({version}), reload requested", outcome.status())
            } else {
                format!("{} ({version}), reload pending", outcome.status())
            }
        }
        FlowOutcome::Fallback { patch, choice, .. } => match choice {
            FallbackChoice::OpenedSidebar => format!("{}, opened sidebar", patch.status()),
            FallbackChoice::RanCandidate(id) => format!("{}, ran {id}", patch.status()),
            FallbackChoice::Dismissed => format!("{}, dismissed", patch.status()),
        },
        FlowOutcome::Failed { message } => format!("failed: {message}"),
    }
}
