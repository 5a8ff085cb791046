use anyhow::{anyhow, bail, Result};
use std::fs;

use crate::cli::{
    BoardsArgs, Cli, Commands, ConfigArgs, ConfigAction, ExportArgs, GenerateArgs, MembersArgs,
};
use crate::confluence::ConfluenceClient;
use crate::error::{handle_action, ActionResult};
use crate::jira_client::{JiraClient, JiraConfig};
use crate::notes::{self, NoteRequest};
use crate::resolver;
use crate::settings::{Settings, SettingsStore};
use crate::worklog;

pub async fn route_command(cli: Cli, store: &SettingsStore) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => handle_generate(args, store).await,
        Commands::Projects => handle_projects(store).await,
        Commands::Boards(args) => handle_boards(args, store).await,
        Commands::Sprints => handle_sprints(store).await,
        Commands::Members(args) => handle_members(args, store).await,
        Commands::Users => handle_users(store).await,
        Commands::Export(args) => handle_export(args, store).await,
        Commands::Config(args) => handle_config(args, store),
    }
}

/// Unwrap the structured result handed over by the core, turning
/// non-200 outcomes into CLI errors.
fn into_data<T>(result: ActionResult<T>) -> Result<T> {
    if result.status == 200 {
        result.data.ok_or_else(|| anyhow!("missing result data"))
    } else {
        bail!("{} (status {})", result.message, result.status)
    }
}

fn print_json<T: serde::Serialize>(data: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn jira_client(settings: &Settings) -> Result<JiraClient> {
    Ok(JiraClient::new(JiraConfig::from_settings(settings)?)?)
}

async fn handle_generate(args: GenerateArgs, store: &SettingsStore) -> Result<()> {
    let settings = store.get()?;
    let request = NoteRequest {
        project: args.project,
        board: args.board,
        sprint_id: args.sprint_id,
        start_date: args.start_date,
        end_date: args.end_date,
        users: args.users,
    };

    let markup =
        into_data(handle_action(notes::generate_meeting_notes(&settings, &request)).await)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &markup)?;
            println!("Notes written to {}", path.display());
        }
        None => println!("{}", markup),
    }

    if args.publish {
        let confluence = ConfluenceClient::new(JiraConfig::from_settings(&settings)?)?;
        let title = notes::notes_title(&request);
        let page = into_data(
            handle_action(confluence.publish(&args.space_key, &args.space_name, &title, &markup))
                .await,
        )?;
        println!("Published page {} (id {})", page.title, page.id);
    }

    Ok(())
}

async fn handle_projects(store: &SettingsStore) -> Result<()> {
    let settings = store.get()?;
    let jira = jira_client(&settings)?;

    let projects = into_data(handle_action(async { jira.get_projects().await }).await)?;
    print_json(&projects)
}

async fn handle_boards(args: BoardsArgs, store: &SettingsStore) -> Result<()> {
    let settings = store.get()?;
    let jira = jira_client(&settings)?;

    match args.project {
        Some(project) => {
            let boards = into_data(
                handle_action(async {
                    let key = resolver::resolve_project_key(&jira, &project).await?;
                    jira.get_boards(Some(&key)).await
                })
                .await,
            )?;
            print_json(&boards)
        }
        None => {
            let boards =
                into_data(handle_action(resolver::list_boards_for_all_projects(&jira)).await)?;
            print_json(&boards)
        }
    }
}

async fn handle_sprints(store: &SettingsStore) -> Result<()> {
    let settings = store.get()?;
    let jira = jira_client(&settings)?;

    let sprints = into_data(handle_action(resolver::list_sprints_for_all_boards(&jira)).await)?;
    print_json(&sprints)
}

async fn handle_members(args: MembersArgs, store: &SettingsStore) -> Result<()> {
    let settings = store.get()?;
    let jira = jira_client(&settings)?;

    let members = into_data(
        handle_action(async {
            let key = resolver::resolve_project_key(&jira, &args.project).await?;
            resolver::list_project_members(&jira, &key).await
        })
        .await,
    )?;
    print_json(&members)
}

async fn handle_users(store: &SettingsStore) -> Result<()> {
    let settings = store.get()?;
    let jira = jira_client(&settings)?;

    let users = into_data(handle_action(async { jira.get_users().await }).await)?;
    print_json(&users)
}

async fn handle_export(args: ExportArgs, store: &SettingsStore) -> Result<()> {
    let settings = store.get()?;
    let jira = jira_client(&settings)?;

    let path = into_data(
        handle_action(worklog::export_work_logs(
            &jira,
            &args.start_date,
            &args.end_date,
            &args.out_dir,
        ))
        .await,
    )?;
    println!("Work log data saved to {}", path.display());
    Ok(())
}

fn handle_config(args: ConfigArgs, store: &SettingsStore) -> Result<()> {
    match args.action {
        ConfigAction::Init => {
            if store.path().exists() {
                println!("Settings file already exists at: {}", store.path().display());
                return Ok(());
            }
            store.save(&Settings::sample())?;
            println!("Created sample settings file at: {}", store.path().display());
            println!("Edit the file, or set values with: relic config set <key> <value>");
            println!("Available keys: {}", Settings::available_keys().join(", "));
        }
        ConfigAction::Show => {
            let settings = store.get()?;
            println!("{}", settings.summary());
        }
        ConfigAction::Set { key, value } => {
            let mut settings = store.get().unwrap_or_else(|_| Settings::sample());
            settings.set_value(&key, &value)?;
            store.save(&settings)?;
            println!("Updated {}", key);
        }
    }
    Ok(())
}
