use clap::{Arg, ArgAction, ArgMatches, Command};
use color_eyre::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

mod adapters;
mod application;
mod domain;
mod ports;

use adapters::{
    config::FileProviderStore,
    notify::ConsoleNotifier,
    render::render_issue_content,
    store::JsonTaskStore,
    youtrack::{
        validate_youtrack_cfg, youtrack_issue_content, YoutrackClient, YoutrackIssueService,
        YOUTRACK_CONFIG_FORM,
    },
};
use application::{
    AppError, AppResult, ImportOutcome, IssuePoller, IssueServiceRegistry, IssueSyncService,
};
use domain::{IssueData, IssueId, IssueProvider, ProviderId, ProviderSettings, TaskId};
use ports::{AppConfig, ConfigError, NotificationSink, ProviderConfigStore};

fn cli() -> Command {
    let provider_arg = || {
        Arg::new("provider")
            .help("Issue provider ID")
            .required(true)
            .index(1)
    };
    let issue_arg = || {
        Arg::new("issue")
            .help("Remote issue ID")
            .required(true)
            .index(2)
    };
    let task_arg = || {
        Arg::new("task_id")
            .help("Local task ID")
            .required(true)
            .index(1)
    };

    Command::new("issue-bridge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Import issues from remote trackers as local tasks")
        .long_about("Search remote issue trackers, import issues as local tasks and keep them in sync.\n\nTokens are stored in the system keyring when available. For YouTrack the\nYOUTRACK_TOKEN env var is used when no token is stored.")
        .subcommand_required(true)
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Read configuration from DIR instead of the user config directory")
                .global(true),
        )
        .subcommand(
            Command::new("provider")
                .about("Issue provider configuration")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("Add a YouTrack provider")
                        .args(YOUTRACK_CONFIG_FORM.iter().map(|field| {
                            Arg::new(field.key)
                                .long(field.key)
                                .help(field.label)
                                .required(field.required)
                        }))
                        .arg(
                            Arg::new("project")
                                .long("project")
                                .value_name("PROJECT_ID")
                                .help("Local project for imported tasks"),
                        )
                        .arg(
                            Arg::new("pinned-search")
                                .long("pinned-search")
                                .value_name("QUERY")
                                .help("Query used to pick backlog issues"),
                        )
                        .arg(
                            Arg::new("no-auto-poll")
                                .long("no-auto-poll")
                                .help("Do not refresh imported tasks automatically")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("auto-backlog")
                                .long("auto-backlog")
                                .help("Import new issues into the backlog when polling")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(Command::new("list").about("List providers as JSON"))
                .subcommand(Command::new("kinds").about("List supported provider kinds"))
                .subcommand(
                    Command::new("remove")
                        .about("Remove a provider and its stored token")
                        .arg(provider_arg()),
                )
                .subcommand(
                    Command::new("test")
                        .about("Check that a provider's connection works")
                        .arg(provider_arg()),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Application settings")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Show settings"))
                .subcommand(
                    Command::new("set")
                        .about("Change settings")
                        .arg(
                            Arg::new("timeout")
                                .long("timeout")
                                .value_name("SECONDS")
                                .help("HTTP request timeout")
                                .value_parser(clap::value_parser!(u64)),
                        )
                        .arg(
                            Arg::new("poll-delay")
                                .long("poll-delay")
                                .value_name("MILLISECONDS")
                                .help("Delay before the first poll")
                                .value_parser(clap::value_parser!(u64)),
                        ),
                ),
        )
        .subcommand(
            Command::new("search")
                .about("Search issues as JSON")
                .arg(
                    Arg::new("term")
                        .help("Search term")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("provider")
                        .long("provider")
                        .short('p')
                        .value_name("PROVIDER_ID")
                        .help("Only search this provider"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show an issue")
                .arg(provider_arg())
                .arg(issue_arg()),
        )
        .subcommand(
            Command::new("link")
                .about("Print the web link of an issue")
                .arg(provider_arg())
                .arg(issue_arg()),
        )
        .subcommand(
            Command::new("import")
                .about("Import an issue as a task")
                .arg(provider_arg())
                .arg(issue_arg()),
        )
        .subcommand(
            Command::new("tasks")
                .about("Task operations")
                .subcommand_required(true)
                .subcommand(
                    Command::new("list").about("List tasks as JSON").arg(
                        Arg::new("updated")
                            .long("updated")
                            .help("Only tasks whose issue changed remotely")
                            .action(ArgAction::SetTrue),
                    ),
                )
                .subcommand(
                    Command::new("ack")
                        .about("Clear the updated flag of a task")
                        .arg(task_arg()),
                )
                .subcommand(
                    Command::new("push")
                        .about("Send task changes to its issue")
                        .arg(task_arg()),
                ),
        )
        .subcommand(
            Command::new("refresh")
                .about("Pull remote changes into imported tasks")
                .arg(
                    Arg::new("provider")
                        .long("provider")
                        .short('p')
                        .value_name("PROVIDER_ID")
                        .help("Only refresh this provider"),
                ),
        )
        .subcommand(
            Command::new("backlog")
                .about("Import new issues into the backlog")
                .arg(provider_arg()),
        )
        .subcommand(Command::new("poll").about("Keep tasks in sync until interrupted"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| AppError::Application(e.to_string()))?;
    println!("{json}");
    Ok(())
}

fn provider_id(matches: &ArgMatches) -> ProviderId {
    matches
        .get_one::<String>("provider")
        .map(|id| ProviderId::from(id.as_str()))
        .unwrap_or_else(|| ProviderId::from(""))
}

fn issue_id(matches: &ArgMatches) -> IssueId {
    matches
        .get_one::<String>("issue")
        .map(|id| IssueId::from(id.as_str()))
        .unwrap_or_else(|| IssueId::from(""))
}

fn task_id(matches: &ArgMatches) -> TaskId {
    matches
        .get_one::<String>("task_id")
        .map(|id| TaskId::from(id.as_str()))
        .unwrap_or_else(|| TaskId::from(""))
}

async fn add_provider(
    matches: &ArgMatches,
    config_store: &FileProviderStore,
) -> AppResult<IssueProvider> {
    let mut provider = IssueProvider::default_youtrack();
    let ProviderSettings::Youtrack(cfg) = &mut provider.settings;
    cfg.server = matches
        .get_one::<String>("server")
        .cloned()
        .unwrap_or_default();
    cfg.token = matches.get_one::<String>("token").cloned();
    validate_youtrack_cfg(cfg).map_err(ConfigError::from)?;

    provider.is_enabled = true;
    provider.default_project_id = matches.get_one::<String>("project").cloned();
    provider.pinned_search = matches.get_one::<String>("pinned-search").cloned();
    provider.is_auto_poll = !matches.get_flag("no-auto-poll");
    provider.is_auto_add_to_backlog = matches.get_flag("auto-backlog");

    config_store.save_provider(&provider).await?;
    Ok(provider)
}

async fn run(
    matches: &ArgMatches,
    config: AppConfig,
    config_store: Arc<FileProviderStore>,
    registry: &IssueServiceRegistry,
    sync: Arc<IssueSyncService>,
) -> AppResult<()> {
    match matches.subcommand() {
        Some(("provider", provider_matches)) => match provider_matches.subcommand() {
            Some(("add", add_matches)) => {
                let provider = add_provider(add_matches, &config_store).await?;
                println!("{}", provider.id);
                sync.test_connection(&provider.id).await?;
            }
            Some(("list", _)) => {
                let mut providers = sync.list_providers().await?;
                for provider in &mut providers {
                    provider.settings.set_token(None);
                }
                print_json(&providers)?;
            }
            Some(("kinds", _)) => {
                for key in registry.keys() {
                    println!("{}\t{}", key, key.humanized());
                }
            }
            Some(("remove", remove_matches)) => {
                let id = provider_id(remove_matches);
                config_store.remove_provider(&id).await?;
                println!("✅ Removed provider {id}");
            }
            Some(("test", test_matches)) => {
                if !sync.test_connection(&provider_id(test_matches)).await? {
                    std::process::exit(1);
                }
            }
            _ => return Err(AppError::Application("Unknown provider subcommand".to_string())),
        },
        Some(("config", config_matches)) => match config_matches.subcommand() {
            Some(("show", _)) => {
                println!("path: {}", config_store.config_path().display());
                println!("request timeout: {}s", config.request_timeout_secs);
                println!("initial poll delay: {}ms", config.initial_poll_delay_ms);
            }
            Some(("set", set_matches)) => {
                let mut config = config;
                if let Some(timeout) = set_matches.get_one::<u64>("timeout") {
                    config.request_timeout_secs = *timeout;
                }
                if let Some(delay) = set_matches.get_one::<u64>("poll-delay") {
                    config.initial_poll_delay_ms = *delay;
                }
                config_store.save_config(&config).await?;
            }
            _ => return Err(AppError::Application("Unknown config subcommand".to_string())),
        },
        Some(("search", search_matches)) => {
            let term = search_matches
                .get_one::<String>("term")
                .map(String::as_str)
                .unwrap_or_default();
            let results = match search_matches.get_one::<String>("provider") {
                Some(id) => sync.search_issues(&ProviderId::from(id.as_str()), term).await?,
                None => sync.search_all(term).await?,
            };
            print_json(&results)?;
        }
        Some(("show", show_matches)) => {
            let provider_id = provider_id(show_matches);
            let issue_id = issue_id(show_matches);

            let IssueData::Youtrack(issue) = sync.get_by_id(&provider_id, &issue_id).await?;
            let link = sync.issue_link(&provider_id, &issue_id).await?;
            let content = youtrack_issue_content(&issue, Some(link));
            println!("{}", render_issue_content(&content));
        }
        Some(("link", link_matches)) => {
            let link = sync
                .issue_link(&provider_id(link_matches), &issue_id(link_matches))
                .await?;
            println!("{link}");
        }
        Some(("import", import_matches)) => {
            let outcome = sync
                .add_task_from_issue(&provider_id(import_matches), &issue_id(import_matches))
                .await?;
            let (ImportOutcome::Created(task) | ImportOutcome::AlreadyImported(task)) = outcome;
            print_json(&task)?;
        }
        Some(("tasks", tasks_matches)) => match tasks_matches.subcommand() {
            Some(("list", list_matches)) => {
                let mut tasks = sync.list_tasks().await?;
                if list_matches.get_flag("updated") {
                    tasks.retain(|task| task.issue_was_updated);
                }
                print_json(&tasks)?;
            }
            Some(("ack", ack_matches)) => {
                let task = sync.acknowledge_update(&task_id(ack_matches)).await?;
                print_json(&task)?;
            }
            Some(("push", push_matches)) => {
                sync.update_issue_from_task(&task_id(push_matches)).await?;
            }
            _ => return Err(AppError::Application("Unknown tasks subcommand".to_string())),
        },
        Some(("refresh", refresh_matches)) => {
            let updated = match refresh_matches.get_one::<String>("provider") {
                Some(id) => sync.refresh_issue_tasks(&ProviderId::from(id.as_str())).await?,
                None => sync.refresh_all().await?,
            };
            println!("{updated} task(s) updated");
        }
        Some(("backlog", backlog_matches)) => {
            let added = sync
                .add_new_issues_to_backlog(&provider_id(backlog_matches))
                .await?;
            print_json(&added)?;
        }
        Some(("poll", _)) => {
            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for ctrl-c: {}", e);
                }
                let _ = shutdown_tx.send(true);
            });

            let poller = IssuePoller::new(
                sync.clone(),
                Duration::from_millis(config.initial_poll_delay_ms),
            );
            poller.run(shutdown_rx).await?;
        }
        _ => return Err(AppError::Application("Unknown command".to_string())),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize color-eyre for better error reporting
    color_eyre::install()?;

    // Initialize logging to file
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("issue-bridge.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let matches = cli().get_matches();

    // Load configuration
    let config_store = Arc::new(match matches.get_one::<String>("config-dir") {
        Some(dir) => FileProviderStore::at(dir),
        None => FileProviderStore::new()?,
    });
    let config = config_store.load_config().await?;

    // Create dependencies
    let notifier: Arc<dyn NotificationSink> = Arc::new(ConsoleNotifier);
    let youtrack_client = Arc::new(YoutrackClient::new(
        Duration::from_secs(config.request_timeout_secs),
        notifier.clone(),
    )?);
    let registry = IssueServiceRegistry::new().with(Arc::new(YoutrackIssueService::new(
        youtrack_client,
        config_store.clone(),
    )));
    let task_store = Arc::new(JsonTaskStore::open_default().await?);

    let sync = Arc::new(IssueSyncService::new(
        registry.clone(),
        config_store.clone(),
        task_store,
        notifier,
    ));

    if let Err(e) = run(&matches, config, config_store, &registry, sync.clone()).await {
        sync.report_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
