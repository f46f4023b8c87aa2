//! Overture - one MCP configuration for every AI client
//!
//! Usage:
//!   overture sync                 # Write the unified config into every client
//!   overture sync --dry-run       # Preview without touching client files
//!   overture audit                # List client entries overture does not manage
//!   overture import --detect      # Report importable entries and conflicts
//!   overture backup list          # Show client config backups

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use overture_core::audit::{AuditEntry, audit_clients};
use overture_core::backup::BackupMetadata;
use overture_core::client::{AdapterRegistry, configured_path};
use overture_core::config::paths::PROJECT_CONFIG_DIR;
use overture_core::config::{ConfigLoader, ConfigStore, OvertureConfig};
use overture_core::context::AppContext;
use overture_core::discovery::PathDetector;
use overture_core::env::process_env;
use overture_core::error::OvertureError;
use overture_core::import::{ConflictReason, ImportPlan, ImportScanner};
use overture_core::sync::{ClientSyncResult, SyncOptions, SyncOrchestrator, SyncReport};
use overture_core::types::{ClientId, ConfigScope, Platform};

#[derive(Parser)]
#[command(name = "overture")]
#[command(about = "Sync one MCP configuration into every AI client", long_about = None)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the unified configuration into client config files
    Sync(SyncArgs),

    /// List client entries that are not in the unified configuration
    Audit {
        /// Only audit these clients
        #[arg(long = "client", value_name = "CLIENT")]
        clients: Vec<ClientId>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Import hand-written client entries into the unified configuration
    Import(ImportArgs),

    /// Manage client config backups
    Backup(BackupArgs),
}

#[derive(Args)]
struct SyncArgs {
    /// Only sync these clients
    #[arg(long = "client", value_name = "CLIENT")]
    clients: Vec<ClientId>,

    /// Write previews under the state directory instead of client files
    #[arg(long)]
    dry_run: bool,

    /// Only sync one scope (global or project)
    #[arg(long)]
    scope: Option<ConfigScope>,

    /// Resolve platform rules as if running on this platform
    #[arg(long)]
    platform: Option<Platform>,

    /// Write MCPs even to clients that cannot speak their transport
    #[arg(long, short)]
    force: bool,

    /// Do not look for client binaries
    #[arg(long)]
    skip_binary_detection: bool,

    /// Skip clients whose binary cannot be found
    #[arg(long)]
    skip_undetected: bool,

    /// Output format
    #[arg(short = 'o', long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args)]
struct ImportArgs {
    /// Only report; exit 1 on unreadable files, 2 on conflicts
    #[arg(long)]
    detect: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: ImportFormat,

    /// Only scan these clients
    #[arg(long = "client", value_name = "CLIENT")]
    clients: Vec<ClientId>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(Args)]
struct BackupArgs {
    #[command(subcommand)]
    command: BackupSubcommand,
}

#[derive(Subcommand)]
enum BackupSubcommand {
    /// List backups, oldest first
    List {
        /// Only list backups of this client
        #[arg(long)]
        client: Option<ClientId>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Restore a backup over a client config
    Restore {
        /// Client whose config is restored
        client: ClientId,

        /// Backup file to restore (default: the newest for the client)
        #[arg(long)]
        backup: Option<PathBuf>,

        /// Config scope to restore into
        #[arg(long, default_value = "global")]
        scope: ConfigScope,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable output
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum ImportFormat {
    #[default]
    Text,
    Json,
    Table,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "overture=debug" } else { "overture=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let ctx = app_context()?;
    let exit_code = match cli.command {
        Commands::Sync(args) => run_sync(&ctx, args).await?,
        Commands::Audit { clients, format } => run_audit(&ctx, clients, format).await?,
        Commands::Import(args) => run_import(&ctx, args).await?,
        Commands::Backup(args) => run_backup(&ctx, args).await?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// The current directory counts as a project when it holds `.overture/`.
fn app_context() -> Result<AppContext> {
    let home_dir = dirs::home_dir().context("Could not determine home directory")?;
    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let project_root = cwd.join(PROJECT_CONFIG_DIR).is_dir().then_some(cwd);
    let state_dir = AppContext::default_state_dir(&home_dir);
    tracing::debug!(home = %home_dir.display(), project = ?project_root, "Resolved paths");

    Ok(AppContext::new(home_dir, project_root, state_dir).with_platform_dirs(
        std::env::var_os("APPDATA").map(PathBuf::from),
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
    ))
}

/// Load the unified config, treating a missing one as empty.
async fn load_or_empty(store: &ConfigStore) -> Result<OvertureConfig> {
    match store.load().await {
        Ok(config) => Ok(config),
        Err(OvertureError::ConfigNotFound { .. }) => Ok(OvertureConfig::new()),
        Err(e) => Err(e).context("Failed to load overture configuration"),
    }
}

// =============================================================================
// sync
// =============================================================================

async fn run_sync(ctx: &AppContext, args: SyncArgs) -> Result<i32> {
    let config = ctx
        .config_store()
        .load()
        .await
        .context("Failed to load overture configuration")?;

    let env = process_env();
    let registry = AdapterRegistry::with_default_clients();
    let detector = PathDetector::new(ctx.fs())
        .with_timeout(Duration::from_millis(config.discovery.timeout_ms));

    let options = SyncOptions {
        clients: (!args.clients.is_empty()).then(|| args.clients.clone()),
        dry_run: args.dry_run,
        scope: args.scope,
        platform: args.platform,
        force: args.force,
        skip_binary_detection: args.skip_binary_detection || !config.discovery.enabled,
        skip_undetected: args.skip_undetected,
    };

    let report = SyncOrchestrator::new(&registry, &detector, ctx, &env)
        .sync(&config, &options)
        .await;

    match args.format {
        OutputFormat::Text => print_sync_report(&report, args.dry_run),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(report.exit_code())
}

fn print_sync_report(report: &SyncReport, dry_run: bool) {
    if dry_run {
        println!("{}", style("Dry run: client files were not modified").dim());
    }

    for result in &report.results {
        print_sync_result(result);
    }

    println!();
    let summary = format!(
        "{} synced, {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped()
    );
    if report.is_success() {
        println!("{}", style(summary).green());
    } else {
        println!("{}", style(summary).red());
    }
}

fn print_sync_result(result: &ClientSyncResult) {
    let symbol = if result.skipped {
        style("-").dim()
    } else if result.success {
        style("✓").green()
    } else {
        style("✗").red()
    };
    let path = result
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("{} {} ({}) {}", symbol, result.client, result.scope, style(path).dim());

    if let Some(diff) = &result.diff {
        if diff.has_changes {
            println!(
                "    +{} ~{} -{}",
                diff.added.len(),
                diff.modified.len(),
                diff.removed.len()
            );
            for entry in &diff.modified {
                let fields: Vec<_> = entry.field_changes.iter().map(|c| c.field.as_str()).collect();
                println!("    ~ {} ({})", entry.name, fields.join(", "));
            }
        } else {
            println!("    {}", style("no changes").dim());
        }
    }
    if let Some(preview) = result.written_path.as_ref().filter(|p| Some(*p) != result.config_path.as_ref()) {
        println!("    preview: {}", preview.display());
    }
    if let Some(backup) = &result.backup_path {
        println!("    backup: {}", backup.display());
    }
    for warning in &result.warnings {
        println!("    {} {}", style("⚠").yellow(), warning);
    }
    for failure in &result.failures {
        println!("    {} {}: {}", style("✗").red(), failure.name, failure.error);
    }
    if let Some(error) = &result.error {
        println!("    {} {}", style("error:").red(), error);
    }
}

// =============================================================================
// audit
// =============================================================================

async fn run_audit(ctx: &AppContext, clients: Vec<ClientId>, format: OutputFormat) -> Result<i32> {
    let config = load_or_empty(&ctx.config_store()).await?;
    let clients = if clients.is_empty() {
        config.enabled_clients()
    } else {
        clients
    };

    let registry = AdapterRegistry::with_default_clients();
    let fs = ctx.fs();
    let entries = audit_clients(&registry, fs.as_ref(), &ctx.client_context(), &config, &clients).await;

    match format {
        OutputFormat::Text => print_audit(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(0)
}

fn print_audit(entries: &[AuditEntry]) {
    if entries.is_empty() {
        println!("No client config files found.");
        return;
    }

    for entry in entries {
        println!("{} ({}) {}", entry.client, entry.scope, style(entry.path.display()).dim());
        if let Some(error) = &entry.error {
            println!("    {} {}", style("error:").red(), error);
        } else if entry.unmanaged.is_empty() {
            println!("    {}", style("all entries managed").green());
        } else {
            for name in &entry.unmanaged {
                println!("    {} {}", style("?").yellow(), name);
            }
        }
    }

    let unmanaged: usize = entries.iter().map(|e| e.unmanaged.len()).sum();
    if unmanaged > 0 {
        println!();
        println!("{unmanaged} unmanaged entries (run 'overture import' to adopt them)");
    }
}

// =============================================================================
// import
// =============================================================================

async fn run_import(ctx: &AppContext, args: ImportArgs) -> Result<i32> {
    let store = ctx.config_store();
    let config = load_or_empty(&store).await?;
    let clients = if args.clients.is_empty() {
        ClientId::ALL.to_vec()
    } else {
        args.clients.clone()
    };

    let registry = AdapterRegistry::with_default_clients();
    let fs = ctx.fs();
    let client_ctx = ctx.client_context();
    let plan = ImportScanner::new(&registry, fs.as_ref(), &client_ctx)
        .scan(&clients, &config)
        .await;

    match args.format {
        ImportFormat::Text => print_import_text(&plan),
        ImportFormat::Table => print_import_table(&plan),
        ImportFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }

    if args.detect {
        return Ok(plan.exit_code());
    }
    if plan.importable.is_empty() {
        return Ok(0);
    }

    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Add the non-conflicting entries to the overture configuration?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Import cancelled.");
            return Ok(0);
        }
    }

    let added = plan.apply_to_store(&store).await?;
    if added.is_empty() {
        println!("Nothing imported.");
    } else {
        println!("{} Imported {}", style("✓").green(), added.join(", "));
    }
    Ok(0)
}

fn conflict_reason(reason: ConflictReason) -> &'static str {
    match reason {
        ConflictReason::DifferentCommand => "different command",
        ConflictReason::DifferentArgs => "different args",
        ConflictReason::DifferentEnv => "different env",
    }
}

fn print_import_text(plan: &ImportPlan) {
    if plan.importable.is_empty() && plan.parse_errors.is_empty() {
        println!("No unmanaged MCP servers found.");
        return;
    }

    for mcp in &plan.importable {
        println!(
            "{} {} from {} ({})",
            style("+").green(),
            mcp.name,
            mcp.source.client,
            mcp.source.location_type
        );
    }
    for conflict in &plan.conflicts {
        let clients: Vec<_> = conflict.sources.iter().map(|s| s.client.as_str()).collect();
        println!(
            "{} {}: {} across {}",
            style("!").yellow(),
            conflict.name,
            conflict_reason(conflict.reason),
            clients.join(", ")
        );
    }
    for error in &plan.parse_errors {
        println!(
            "{} {} {}: {}",
            style("✗").red(),
            error.client,
            error.file_path.display(),
            error.message
        );
    }
}

fn print_import_table(plan: &ImportPlan) {
    println!(
        "  {:<20} {:<15} {:<8} {:<10} Status",
        "Name", "Client", "Scope", "Transport"
    );
    println!("  {}", "-".repeat(70));

    let conflicted: BTreeSet<&str> = plan.conflicts.iter().map(|c| c.name.as_str()).collect();
    for mcp in &plan.importable {
        let status = if conflicted.contains(mcp.name.as_str()) {
            "Conflict"
        } else {
            "Importable"
        };
        println!(
            "  {:<20} {:<15} {:<8} {:<10} {}",
            truncate(&mcp.name, 20),
            mcp.source.client,
            mcp.source.location_type,
            mcp.transport,
            status
        );
    }
    for error in &plan.parse_errors {
        println!(
            "  {:<20} {:<15} {:<8} {:<10} Unreadable",
            "-", error.client, "-", "-"
        );
    }
}

// =============================================================================
// backup
// =============================================================================

async fn run_backup(ctx: &AppContext, args: BackupArgs) -> Result<i32> {
    let config = load_or_empty(&ctx.config_store()).await?;
    let service = ctx.backup_service(&config.sync);

    match args.command {
        BackupSubcommand::List { client, format } => {
            let backups = service.list_backups(client).await?;
            match format {
                OutputFormat::Text => print_backups(&backups),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&backups)?),
            }
            Ok(0)
        }
        BackupSubcommand::Restore {
            client,
            backup,
            scope,
        } => {
            let registry = AdapterRegistry::with_default_clients();
            let adapter = registry
                .get(client)
                .ok_or(OvertureError::AdapterMissing { client })?;
            let paths = configured_path(adapter, &ctx.client_context(), &config);
            let Some(target) = paths.for_scope(scope) else {
                eprintln!("{} has no {} config path", client, scope);
                return Ok(1);
            };

            let restored = match backup {
                Some(path) => service.restore(&path, target).await.map(|()| path.clone()),
                None => service
                    .restore_latest(client, target)
                    .await
                    .map(|metadata| metadata.path),
            };
            match restored {
                Ok(path) => {
                    println!(
                        "{} Restored {} to {}",
                        style("✓").green(),
                        path.display(),
                        target.display()
                    );
                    Ok(0)
                }
                Err(OvertureError::BackupNotFound { client }) => {
                    eprintln!("No backups found for {client}");
                    Ok(1)
                }
                Err(e) => Err(e).context("Failed to restore backup"),
            }
        }
    }
}

fn print_backups(backups: &[BackupMetadata]) {
    if backups.is_empty() {
        println!("No backups.");
        return;
    }

    println!("  {:<15} {:<26} {:>8} Path", "Client", "Timestamp", "Size");
    println!("  {}", "-".repeat(80));
    for backup in backups {
        println!(
            "  {:<15} {:<26} {:>8} {}",
            backup.client,
            backup.timestamp,
            backup.size,
            backup.path.display()
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
