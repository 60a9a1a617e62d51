mod action;
mod anthropic;
mod cli;
mod config;
mod error;
mod export;
mod intake;
mod permission;
mod store;
mod suggest;
mod ui;

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use action::LifecycleManager;
use anthropic::AnthropicClient;
use cli::{Cli, Command};
use config::CapaConfig;
use intake::PlanOrigin;
use permission::{Permission, require};
use store::JsonStore;
use suggest::{SuggestionError, SuggestionService};
use ui::{Printer, with_spinner};

type Manager = LifecycleManager<JsonStore>;
type Suggestions = SuggestionService<AnthropicClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = CapaConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let manager = LifecycleManager::new(JsonStore::open(&config.data_dir))
        .with_folio_prefix(config.folio_prefix.clone());
    let suggestions = Suggestions::from_api_key(config.api_key(), config.sampling())?;
    let printer = Printer::default();

    run(cli.command, &config, &manager, &suggestions, &printer).await
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "capa=debug" } else { "capa=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(
    command: Command,
    config: &CapaConfig,
    manager: &Manager,
    suggestions: &Suggestions,
    printer: &Printer,
) -> Result<()> {
    match command {
        Command::Create(args) => {
            require(&config.permissions, Permission::Create)?;
            if args.plan.is_some() && args.suggest_plan {
                printer.notice("--plan given, not requesting a suggestion");
            }
            let (record, origin) = intake::create_action(manager, suggestions, args).await?;
            if origin == PlanOrigin::Drafted {
                printer.notice("Plan drafted by AI; review it with `capa show`.");
            }
            printer.success(&format!("Created {} ({})", record.folio, record.id));
        }
        Command::Update(args) => {
            require(&config.permissions, Permission::Edit)?;
            let update = args.content_update();
            if update.is_empty() {
                bail!("nothing to update: pass at least one field flag");
            }
            let record = manager.update_content(&args.id, update).await?;
            printer.success(&format!("Updated {}", record.folio));
        }
        Command::Transition { id, status, notes } => {
            require(&config.permissions, Permission::Transition)?;
            let status = cli::parse_status(&status)?;
            let record = manager
                .transition_status(&id, status, notes.as_deref())
                .await?;
            printer.success(&format!("{} is now {}", record.folio, record.status));
        }
        Command::Delete { id, yes } => {
            require(&config.permissions, Permission::Delete)?;
            let record = manager.find(&id).await?;
            if !yes && !confirm(&format!("Delete {} permanently? [y/N] ", record.folio))? {
                printer.notice("Aborted");
                return Ok(());
            }
            manager.delete(&record.id).await?;
            printer.success(&format!("Deleted {}", record.folio));
        }
        Command::List { status } => {
            let mut records = manager.list_all().await?;
            if let Some(status) = status {
                let status = cli::parse_status(&status)?;
                records.retain(|r| r.status == status);
            }
            let users = manager.users().await?;
            printer.table(&records, &users, manager.today());
        }
        Command::Show { id } => {
            let record = manager.find(&id).await?;
            let users = manager.users().await?;
            printer.detail(&record, &users, manager.today());
        }
        Command::Users => {
            printer.users(&manager.users().await?);
        }
        Command::Export { output } => {
            require(&config.permissions, Permission::Export)?;
            let records = manager.list_all().await?;
            let users = manager.users().await?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    export::write_csv(&records, &users, BufWriter::new(file))?;
                    printer.success(&format!(
                        "Exported {} actions to {}",
                        records.len(),
                        path.display()
                    ));
                }
                None => export::write_csv(&records, &users, std::io::stdout().lock())?,
            }
        }
        Command::SuggestPlan { problem } => {
            let result = with_spinner(
                suggestions.is_enabled(),
                "Drafting action plan...",
                suggestions.plan_suggestion(&problem),
            )
            .await;
            print_suggestion(printer, result);
        }
        Command::Summarize { description } => {
            let result = with_spinner(
                suggestions.is_enabled(),
                "Summarizing incident...",
                suggestions.incident_summary(&description),
            )
            .await;
            print_suggestion(printer, result);
        }
    }
    Ok(())
}

fn print_suggestion(
    printer: &Printer,
    result: std::result::Result<String, SuggestionError>,
) {
    match result {
        Ok(text) => println!("{text}"),
        Err(e) => printer.notice(e.fallback_message()),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    let term = console::Term::stdout();
    term.write_str(prompt)?;
    term.flush()?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
