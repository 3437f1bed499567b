use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;

use crate::cli::args::{CliArgs, Command, GroupCommand};
use crate::cli::validation;
use crate::client::ApiClient;
use crate::config::{self, ConfigFile};
use crate::export::{self, ExportScope};
use crate::notify;
use crate::records::{EditField, RecordSet};
use crate::server;
use crate::state::{AppState, OrphanPolicy, TagPolicy};
use crate::store::StateStore;

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

#[derive(Clone, Debug)]
struct RunConfig {
    command: Command,
    api_url: String,
    state_path: PathBuf,
    data_file: String,
    port: u16,
    timeout: u64,
    tag_policy: TagPolicy,
    orphan_policy: OrphanPolicy,
    export_scope: ExportScope,
    no_color: bool,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let api_url = args
        .api_url
        .or(cfg.api_url)
        .unwrap_or_else(|| "http://127.0.0.1:3000".to_string());

    let state_path = args
        .state_file
        .or(cfg.state_file)
        .map(|p| config::expand_tilde(&p))
        .unwrap_or_else(config::default_state_path);

    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);

    let tag_policy = match args.tag_policy.or(cfg.tag_policy) {
        Some(raw) => TagPolicy::parse(&raw)
            .ok_or_else(|| format!("invalid tag_policy '{raw}' in config"))?,
        None => TagPolicy::MultiTag,
    };
    let orphan_policy = match args.orphan_policy.or(cfg.orphan_policy) {
        Some(raw) => OrphanPolicy::parse(&raw)
            .ok_or_else(|| format!("invalid orphan_policy '{raw}' in config"))?,
        None => OrphanPolicy::Retag,
    };
    let export_scope = match args.export_scope.or(cfg.export_scope) {
        Some(raw) => ExportScope::parse(&raw)
            .ok_or_else(|| format!("invalid export_scope '{raw}' in config"))?,
        None => ExportScope::AllGroups,
    };

    let (data_file, port) = match &args.command {
        Command::Serve { data_file, port } => {
            let data_file = data_file
                .clone()
                .or(cfg.data_file)
                .map(|p| config::expand_tilde_string(&p))
                .unwrap_or_else(|| "./records.json".to_string());
            let env_port = std::env::var("PORT").ok().and_then(|p| p.parse().ok());
            let port = (*port).or(cfg.port).or(env_port).unwrap_or(3000);
            (data_file, port)
        }
        _ => (String::new(), cfg.port.unwrap_or(3000)),
    };

    Ok(RunConfig {
        command: args.command,
        api_url,
        state_path,
        data_file,
        port,
        timeout,
        tag_policy,
        orphan_policy,
        export_scope,
        no_color,
    })
}

/// Fetch the record list, degrading to an empty set with a visible error
/// when the API is unreachable. Nothing downstream treats that as fatal.
async fn fetch_records(client: &ApiClient) -> RecordSet {
    match client.fetch_all().await {
        Ok(records) => RecordSet::new(records),
        Err(e) => {
            notify::error(&format!("could not load records: {e}"));
            RecordSet::default()
        }
    }
}

fn render_groups(state: &AppState) {
    println!();
    println!("Groups:");
    for group in state.groups.iter() {
        let tagged = state
            .membership
            .values()
            .filter(|tags| tags.contains(group))
            .count();
        let marker = if *group == state.active_group {
            "*".bold().green().to_string()
        } else {
            " ".to_string()
        };
        println!("  {} {} ({})", marker, group, tagged);
    }
}

fn render_table(records: &RecordSet, state: &AppState, filter: &str) {
    if records.is_empty() {
        notify::info("no records to show");
        return;
    }
    println!();
    for record in records.filtered(filter) {
        let marker = if state.is_selected(record.id) {
            "[x]".bold().green().to_string()
        } else {
            "[ ]".to_string()
        };
        println!(
            "  {} {:>5}  {} - {}",
            marker, record.id, record.name, record.address
        );
    }
}

fn render_selected(state: &AppState, records: &RecordSet) {
    if state.selection.is_empty() {
        notify::info("no records selected yet");
        return;
    }
    for group in state.groups.iter() {
        let mut lines: Vec<String> = Vec::new();
        for &id in state.selection.iter() {
            if !state.tags_for(id).contains(group) {
                continue;
            }
            let line = match records.find_by_id(id) {
                Some(record) => format!("{} - {}", record.name, record.address),
                None => format!("#{id}"),
            };
            if !lines.contains(&line) {
                lines.push(line);
            }
        }
        if lines.is_empty() {
            continue;
        }
        println!();
        println!("{}", format!("--- {} ---", group).bold());
        for line in lines {
            println!("  {line}");
        }
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn run_serve(run: &RunConfig) -> Result<(), String> {
    let addr: SocketAddr = format!("0.0.0.0:{}", run.port)
        .parse()
        .map_err(|e| format!("invalid listen address: {e}"))?;
    let options = server::ServerOptions {
        addr,
        data_file: PathBuf::from(&run.data_file),
    };
    server::run(options).await.map_err(|e| e.to_string())
}

async fn run_edit(
    run: &RunConfig,
    state: &AppState,
    id: i64,
    field: EditField,
    value: &str,
) -> Result<(), String> {
    let client = ApiClient::new(&run.api_url, run.timeout).map_err(|e| e.to_string())?;
    let mut records = fetch_records(&client).await;

    let value = value.trim();
    let current = match records.find_by_id(id) {
        Some(record) => record.field(field).to_string(),
        None => {
            notify::warning(&format!("record {id} is not in the loaded list"));
            return Ok(());
        }
    };
    if current == value {
        notify::info("value unchanged, nothing to submit");
        return Ok(());
    }

    // Optimistic: the local copy is updated before the server answers,
    // and stays updated even when it does not.
    records.apply_edit(id, field, value);
    match client.submit_edit(id, field, value).await {
        Ok(()) => notify::success(&format!("{} of record {id} saved remotely", field.as_str())),
        Err(e) => notify::error(&format!(
            "remote save failed ({e}); local and server state diverge until the next reload"
        )),
    }
    render_table(&records, state, "");
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    if let Command::Serve { .. } = run.command {
        return run_serve(&run).await;
    }

    let store = StateStore::new(run.state_path.clone());
    let mut state = store.load(run.tag_policy, run.orphan_policy);

    match run.command.clone() {
        Command::Serve { .. } => unreachable!(),

        Command::List { filter } => {
            let client = ApiClient::new(&run.api_url, run.timeout).map_err(|e| e.to_string())?;
            let records = fetch_records(&client).await;
            format_kv_line("Records", &records.len().to_string());
            format_kv_line("Active", &state.active_group);
            render_table(&records, &state, filter.as_deref().unwrap_or(""));
        }

        Command::Toggle { id } => {
            state.toggle_selection(id);
            store.save(&state);
            if state.is_selected(id) {
                notify::success(&format!(
                    "record {id} tagged into [{}]",
                    state.tags_for(id).join(", ")
                ));
            } else {
                notify::success(&format!("record {id} removed from the selection"));
            }
            render_groups(&state);
        }

        Command::Group(group_command) => {
            run_group_command(&store, &mut state, group_command);
        }

        Command::Edit { id, field, value } => {
            // Validated up front; parse cannot fail here.
            let field = EditField::parse(&field)
                .ok_or_else(|| format!("invalid field '{field}'"))?;
            run_edit(&run, &state, id, field, &value).await?;
        }

        Command::Show => {
            let client = ApiClient::new(&run.api_url, run.timeout).map_err(|e| e.to_string())?;
            let records = fetch_records(&client).await;
            render_groups(&state);
            render_selected(&state, &records);
        }

        Command::Export { stdout } => {
            let client = ApiClient::new(&run.api_url, run.timeout).map_err(|e| e.to_string())?;
            let records = fetch_records(&client).await;
            match export::build_text(&state, &records, run.export_scope) {
                Ok(text) if stdout => println!("{text}"),
                Ok(text) => match export::copy_to_clipboard(&text) {
                    Ok(()) => notify::success("grouped selection copied to the clipboard"),
                    Err(e) => notify::error(&e.to_string()),
                },
                Err(e) => notify::info(&e.to_string()),
            }
        }
    }

    Ok(())
}

fn run_group_command(store: &StateStore, state: &mut AppState, command: GroupCommand) {
    match command {
        GroupCommand::Create { name } => match state.create_group(&name) {
            Ok(()) => {
                store.save(state);
                notify::success(&format!("group '{}' created and made active", name.trim()));
                render_groups(state);
            }
            Err(e) => notify::warning(&e.to_string()),
        },

        GroupCommand::Rename { old, new } => match state.rename_group(&old, &new) {
            Ok(()) => {
                store.save(state);
                notify::success(&format!("group '{old}' renamed to '{}'", new.trim()));
                render_groups(state);
            }
            Err(e) => notify::warning(&e.to_string()),
        },

        GroupCommand::Delete { name, yes } => {
            if state.groups.len() <= 1 {
                notify::warning("cannot delete the only remaining group");
                return;
            }
            if !yes && !confirm(&format!("permanently delete group '{name}'?")) {
                notify::info("delete cancelled");
                return;
            }
            match state.delete_group(&name) {
                Ok(()) => {
                    store.save(state);
                    notify::success(&format!("group '{name}' deleted"));
                    render_groups(state);
                }
                Err(e) => notify::warning(&e.to_string()),
            }
        }

        GroupCommand::Move { source, target } => {
            state.reorder_groups(&source, &target);
            store.save(state);
            render_groups(state);
        }

        GroupCommand::Use { name } => match state.set_active_group(&name) {
            Ok(()) => {
                store.save(state);
                notify::success(&format!("active group is now '{name}'"));
                render_groups(state);
            }
            Err(e) => notify::warning(&e.to_string()),
        },
    }
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{e}");
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => {
                config::ensure_default_config_file(&path)?;
                config::load_config(&path, true)?
            }
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
