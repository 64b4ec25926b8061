//! Vigil - resource status watcher
//!
//! Polls cloud runtimes, apps, and workspaces and prints a notification the
//! first time each one enters an interesting state.
//!
//! ## Usage
//!
//! ```bash
//! # Watch the runtimes and apps of a workspace
//! vigil watch --workspace-id 3f9c1c2e --namespace billing --name my-ws
//!
//! # Follow workspaces being deleted
//! vigil deletions --workspace billing/old-ws --workspace billing/older-ws
//!
//! # Follow bucket migrations of a billing project
//! vigil migrations --billing-project billing
//!
//! # With verbose logging
//! vigil -v watch --project terra-proj
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vigil_client::ResourceClient;
use vigil_core::logging::vigil_home;
use vigil_core::session::JsonFileSessionStore;
use vigil_core::{
    DayGate, Ledger, LogGuard, MemorySessionStore, PollHandle, Poller, ResourceRecord, SessionStore,
    VigilConfig, VigilError, WorkspaceRef, init_logging,
};
use vigil_notify::list::ListUpdateReceiver;
use vigil_notify::{
    DeletionTracker, DisplayEvent, ErrorDetailResolver, MigrationTracker, Notification,
    NotificationAction, NotificationBody, NotificationCenter, NotificationPolicy,
    ResourceObserver, list_channel,
};

/// Vigil resource status watcher
///
/// Turns runtime, app, workspace, and migration state changes into
/// one-shot notifications.
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.vigil/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.vigil/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Remember once-a-day warnings across restarts (~/.vigil/session.json)
    #[arg(long)]
    persist_session: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the runtimes and apps of one workspace
    Watch {
        /// Workspace id (preferred over --project)
        #[arg(long, required_unless_present = "project")]
        workspace_id: Option<String>,

        /// Cloud project the workspace's runtimes are billed to
        #[arg(long)]
        project: Option<String>,

        /// Workspace namespace, used in launch links
        #[arg(long, default_value = "-")]
        namespace: String,

        /// Workspace name, used in launch links
        #[arg(long)]
        name: Option<String>,
    },

    /// Follow workspaces that are being deleted
    Deletions {
        /// Workspace as namespace/name (repeatable)
        #[arg(long = "workspace", required = true)]
        workspaces: Vec<String>,
    },

    /// Follow bucket migrations of a billing project
    Migrations {
        #[arg(long)]
        billing_project: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    info!("Starting vigil");

    match run(cli).await {
        Ok(()) => {
            info!("vigil exited normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("vigil error: {:#}", e);
            eprintln!("Error: {:#}", e);
            if let Some(hint) = e.downcast_ref::<VigilError>().and_then(VigilError::guidance) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> vigil_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

fn load_config(cli: &Cli) -> vigil_core::Result<VigilConfig> {
    match &cli.config {
        Some(path) => VigilConfig::load_from(path),
        None => VigilConfig::load(),
    }
}

fn session_store(persist: bool) -> vigil_core::Result<Arc<dyn SessionStore>> {
    if persist {
        let store = JsonFileSessionStore::open(vigil_home()?.join("session.json"))?;
        Ok(Arc::new(store))
    } else {
        Ok(Arc::new(MemorySessionStore::new()))
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let client = Arc::new(
        ResourceClient::from_config(&config.api).context("Failed to create resource client")?,
    );

    let center = NotificationCenter::new(config.notifications.max_notifications);
    let ledger = Ledger::new();
    let day_gate = DayGate::new(session_store(cli.persist_session)?);
    let (list_tx, list_rx) = list_channel();
    let token = CancellationToken::new();

    let renderer = tokio::spawn(render(
        center.clone(),
        list_rx,
        ErrorDetailResolver::new(client.clone()),
        ledger.clone(),
        token.child_token(),
    ));

    let handles: Vec<PollHandle> = match cli.command {
        Command::Watch {
            workspace_id,
            project,
            namespace,
            name,
        } => {
            let label = name
                .or_else(|| workspace_id.clone())
                .or_else(|| project.clone())
                .ok_or_else(|| anyhow!("--workspace-id or --project is required"))?;
            let mut scope = WorkspaceRef::new(namespace, label);
            scope.workspace_id = workspace_id;
            scope.project = project;

            let observer = ResourceObserver::new(
                scope,
                client.clone(),
                NotificationPolicy::from_config(&config),
                ledger.clone(),
                center.clone(),
                day_gate,
            )
            .with_list_updates(list_tx.clone());
            vec![Poller::new(config.polling.resource_interval()).spawn(observer, token.child_token())]
        }
        Command::Deletions { workspaces } => {
            let mut tracker = DeletionTracker::new(client.clone()).with_list_updates(list_tx.clone());
            for raw in &workspaces {
                let workspace = WorkspaceRef::parse(raw)
                    .ok_or_else(|| anyhow!("Invalid workspace '{}', expected namespace/name", raw))?;
                tracker.track(workspace);
            }
            vec![Poller::new(config.polling.deletion_interval()).spawn(tracker, token.child_token())]
        }
        Command::Migrations { billing_project } => {
            let tracker =
                MigrationTracker::new(billing_project, client.clone(), ledger.clone(), center.clone());
            vec![Poller::new(config.polling.migration_interval()).spawn(tracker, token.child_token())]
        }
    };
    drop(list_tx);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    token.cancel();
    let dismissed = center.clear_all();
    debug!(dismissed, "Dismissed notifications");

    for handle in handles {
        debug!(cycles = handle.stats().cycles(), failures = handle.stats().failures(), "Poller finished");
        handle.stop().await;
    }
    if let Err(e) = renderer.await {
        warn!("Renderer ended abnormally: {}", e);
    }
    Ok(())
}

/// Print notifications and list updates until cancelled.
async fn render(
    center: NotificationCenter,
    mut list_updates: ListUpdateReceiver,
    resolver: ErrorDetailResolver,
    ledger: Ledger,
    token: CancellationToken,
) {
    let mut events = center.subscribe();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = events.recv() => match event {
                Ok(DisplayEvent::Shown(notification)) => {
                    if let Some(record) = show(&notification) {
                        tokio::spawn(print_error_details(record, resolver.clone(), token.clone()));
                    }
                }
                Ok(DisplayEvent::Cleared(id)) => debug!(id, "Notification cleared"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Renderer fell behind"),
                Err(RecvError::Closed) => break,
            },
            Some(update) = list_updates.recv() => {
                println!("{} {}: {}", update.kind, update.resource_id, update.state);
                if let Some(message) = &update.error_message {
                    println!("    {}", message);
                }
                update.acknowledge(&ledger);
            }
        }
    }
}

/// Print a notification. Returns the record whose error details still
/// need fetching, if any.
fn show(notification: &Notification) -> Option<ResourceRecord> {
    println!("{}", notification.format_compact());
    if let Some(message) = notification.body.message() {
        println!("    {}", message);
    }

    match &notification.body {
        NotificationBody::Action {
            action: NotificationAction::ErrorDetails { record },
            ..
        } => Some(record.as_ref().clone()),
        NotificationBody::Action {
            action: NotificationAction::Launch { label, url },
            ..
        } => {
            println!("    {}: {}", label, url);
            None
        }
        _ => None,
    }
}

async fn print_error_details(
    record: ResourceRecord,
    resolver: ErrorDetailResolver,
    token: CancellationToken,
) {
    let report = tokio::select! {
        _ = token.cancelled() => return,
        report = resolver.resolve(&record) => report,
    };
    if let Some(report) = report {
        println!("    {}", report.title);
        for line in report.message.lines() {
            println!("    | {}", line);
        }
    }
}
