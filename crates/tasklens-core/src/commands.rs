use std::io::{self, Read};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::parse_date_expr;
use crate::render::Renderer;
use crate::store::{MemStore, TaskDraft};
use crate::suggest::{RuleBasedProvider, SuggestionProvider};
use crate::task::{Priority, Task};
use crate::view::{
    FocusSettings, SortKey, ViewConfig, derive_visible_tasks, group_by_status, select_focus_task,
    summarize,
};

const DEFAULT_CATEGORY_COLOR: &str = "#6366f1";

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "list",
        "board",
        "summary",
        "show",
        "done",
        "start",
        "reopen",
        "modify",
        "delete",
        "categories",
        "focus",
        "breakdown",
        "history",
        "export",
        "import",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut MemStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let user_id = cfg.get_u64("user.id").unwrap_or(1);
    let command = inv.command.as_str();

    debug!(command, args = ?inv.args, user_id, "dispatching command");

    let mutated = match command {
        "add" => cmd_add(store, &inv.args, now, user_id)?,
        "list" => cmd_list(store, cfg, renderer, &inv.args, now, user_id)?,
        "board" => cmd_board(store, cfg, renderer, &inv.args, now, user_id)?,
        "summary" => cmd_summary(store, renderer, now, user_id)?,
        "show" => cmd_show(store, renderer, &inv.args, now)?,
        "done" => cmd_done(store, &inv.args, now)?,
        "start" => cmd_start(store, &inv.args, now)?,
        "reopen" => cmd_reopen(store, &inv.args, now)?,
        "modify" => cmd_modify(store, &inv.args, now, user_id)?,
        "delete" => cmd_delete(store, &inv.args)?,
        "categories" => cmd_categories(store, renderer, &inv.args, now, user_id)?,
        "focus" => cmd_focus(store, cfg, &inv.args, now, user_id)?,
        "breakdown" => cmd_breakdown(store, &inv.args, now)?,
        "history" => cmd_history(store, renderer, &inv.args, user_id)?,
        "export" => cmd_export(store, user_id)?,
        "import" => cmd_import(store)?,
        "help" => cmd_help()?,
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            false
        }
        other => return Err(anyhow!("unknown command: {other}")),
    };

    if mutated {
        store.persist()?;
    }
    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_add(
    store: &mut MemStore,
    args: &[String],
    now: DateTime<Utc>,
    user_id: u64,
) -> anyhow::Result<bool> {
    info!("command add");

    let (title_tokens, mods) = parse_title_and_mods(args, now)?;
    if title_tokens.is_empty() {
        return Err(anyhow!("add: a title is required"));
    }

    let mut draft = TaskDraft::new(title_tokens.join(" "), user_id);
    apply_mods_to_draft(store, &mut draft, &mods, user_id, now);

    let task = store.create_task(draft, now);
    println!("Created task {}.", task.id);
    Ok(true)
}

#[instrument(skip(store, cfg, renderer, args, now))]
fn cmd_list(
    store: &mut MemStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
    user_id: u64,
) -> anyhow::Result<bool> {
    info!("command list");

    let config = build_view_config(store, cfg, args, user_id)?;
    let focus_settings = focus_settings_from_config(cfg);
    let focus = if store.preferences(user_id).focus_mode_enabled {
        Some(&focus_settings)
    } else {
        None
    };

    let tasks = store.tasks_for_user(user_id);
    let categories = store.categories_for_user(user_id);
    let rows = derive_visible_tasks(&tasks, &categories, &config, focus, now);

    renderer.print_task_table(&rows, &categories, now)?;
    Ok(false)
}

#[instrument(skip(store, cfg, renderer, args, now))]
fn cmd_board(
    store: &mut MemStore,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
    user_id: u64,
) -> anyhow::Result<bool> {
    info!("command board");

    // The board has a completed column, so completed tasks always show.
    let mut config = build_view_config(store, cfg, args, user_id)?;
    config.show_completed = true;

    let tasks = store.tasks_for_user(user_id);
    let categories = store.categories_for_user(user_id);
    let rows = derive_visible_tasks(&tasks, &categories, &config, None, now);

    renderer.print_board(&group_by_status(&rows), &categories, now)?;
    Ok(false)
}

#[instrument(skip(store, renderer, now))]
fn cmd_summary(
    store: &mut MemStore,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
    user_id: u64,
) -> anyhow::Result<bool> {
    info!("command summary");

    let tasks = store.tasks_for_user(user_id);
    renderer.print_summary(&summarize(&tasks, now))?;
    Ok(false)
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_show(
    store: &mut MemStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    info!("command show");

    let id = single_id(args, "show")?;
    let task = store
        .get_task(id)
        .cloned()
        .ok_or_else(|| anyhow!("no such task: {id}"))?;
    let category = task.category_id.and_then(|cid| store.get_category(cid)).cloned();

    renderer.print_task_detail(&task, category.as_ref())?;

    let subtasks = store.subtasks_of(id);
    if !subtasks.is_empty() {
        println!();
        println!("Subtasks:");
        let categories = store.categories_for_user(task.user_id);
        renderer.print_task_table(&subtasks, &categories, now)?;
    }

    Ok(false)
}

#[instrument(skip(store, args, now))]
fn cmd_done(store: &mut MemStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<bool> {
    info!("command done");

    let ids = parse_ids(args, "done")?;
    for id in &ids {
        store.complete_task(*id, now)?;
    }
    println!("Completed {} task(s).", ids.len());
    Ok(!ids.is_empty())
}

#[instrument(skip(store, args, now))]
fn cmd_start(store: &mut MemStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<bool> {
    info!("command start");

    let ids = parse_ids(args, "start")?;
    for id in &ids {
        store.start_task(*id, now)?;
    }
    println!("Started {} task(s).", ids.len());
    Ok(!ids.is_empty())
}

#[instrument(skip(store, args, now))]
fn cmd_reopen(store: &mut MemStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<bool> {
    info!("command reopen");

    let ids = parse_ids(args, "reopen")?;
    for id in &ids {
        store.reopen_task(*id, now)?;
    }
    println!("Reopened {} task(s).", ids.len());
    Ok(!ids.is_empty())
}

#[instrument(skip(store, args, now))]
fn cmd_modify(
    store: &mut MemStore,
    args: &[String],
    now: DateTime<Utc>,
    user_id: u64,
) -> anyhow::Result<bool> {
    info!("command modify");

    if args.is_empty() {
        return Err(anyhow!("modify: a task id is required"));
    }
    let id: u64 = args[0]
        .parse()
        .with_context(|| format!("modify: invalid task id: {}", args[0]))?;

    let (title_tokens, mods) = parse_title_and_mods(&args[1..], now)?;
    if title_tokens.is_empty() && mods.is_empty() {
        return Err(anyhow!("modify: nothing to change"));
    }

    let resolved = resolve_mod_categories(store, &mods, user_id, now);
    store.modify_task(id, now, |task| {
        if !title_tokens.is_empty() {
            task.title = title_tokens.join(" ");
        }
        apply_mods_to_task(task, &resolved);
    })?;

    println!("Modified task {id}.");
    Ok(true)
}

#[instrument(skip(store, args))]
fn cmd_delete(store: &mut MemStore, args: &[String]) -> anyhow::Result<bool> {
    info!("command delete");

    let ids = parse_ids(args, "delete")?;
    for id in &ids {
        store.delete_task(*id)?;
    }
    println!("Deleted {} task(s).", ids.len());
    Ok(!ids.is_empty())
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_categories(
    store: &mut MemStore,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
    user_id: u64,
) -> anyhow::Result<bool> {
    info!("command categories");

    if args.is_empty() {
        let mut categories = store.categories_for_user(user_id);
        categories.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        renderer.print_categories(&categories)?;
        return Ok(false);
    }

    match args[0].as_str() {
        "add" => {
            let name = args
                .get(1)
                .ok_or_else(|| anyhow!("categories add: a name is required"))?;
            let color = args.get(2).map(String::as_str).unwrap_or(DEFAULT_CATEGORY_COLOR);
            if store.find_category(user_id, name).is_some() {
                return Err(anyhow!("category already exists: {name}"));
            }
            let category = store.create_category(name, color, user_id, now);
            println!("Created category {} ({}).", category.id, category.name);
            Ok(true)
        }
        "rename" => {
            let id: u64 = args
                .get(1)
                .ok_or_else(|| anyhow!("categories rename: an id is required"))?
                .parse()
                .context("categories rename: invalid id")?;
            let name = args
                .get(2)
                .ok_or_else(|| anyhow!("categories rename: a new name is required"))?
                .clone();
            let category = store.update_category(id, |c| c.name = name)?;
            println!("Renamed category {} to {}.", category.id, category.name);
            Ok(true)
        }
        "delete" => {
            let id: u64 = args
                .get(1)
                .ok_or_else(|| anyhow!("categories delete: an id is required"))?
                .parse()
                .context("categories delete: invalid id")?;
            let category = store.delete_category(id)?;
            println!("Deleted category {} ({}).", category.id, category.name);
            Ok(true)
        }
        other => Err(anyhow!("categories: unknown subcommand: {other}")),
    }
}

#[instrument(skip(store, cfg, args, now))]
fn cmd_focus(
    store: &mut MemStore,
    cfg: &Config,
    args: &[String],
    now: DateTime<Utc>,
    user_id: u64,
) -> anyhow::Result<bool> {
    info!("command focus");

    let settings = focus_settings_from_config(cfg);
    let sub = args.first().map(String::as_str).unwrap_or("status");

    match sub {
        "on" => {
            let tasks = store.tasks_for_user(user_id);
            let picked = select_focus_task(&tasks, None).map(|t| t.id);
            store.update_preferences(user_id, |prefs| {
                prefs.focus_mode_enabled = true;
                prefs.focus_mode_duration = settings.duration_minutes;
                prefs.focus_task_id = picked;
            });
            match picked.and_then(|id| store.get_task(id)) {
                Some(task) => println!(
                    "Focus on: {} (task {}, {} min).",
                    task.title, task.id, settings.duration_minutes
                ),
                None => println!("Focus mode on, but every task is done."),
            }
            Ok(true)
        }
        "off" => {
            store.update_preferences(user_id, |prefs| {
                prefs.focus_mode_enabled = false;
                prefs.focus_task_id = None;
            });
            println!("Focus mode off.");
            Ok(true)
        }
        "skip" => {
            let prefs = store.preferences(user_id);
            if !prefs.focus_mode_enabled {
                return Err(anyhow!("focus skip: focus mode is not on"));
            }
            let tasks = store.tasks_for_user(user_id);
            let picked = select_focus_task(&tasks, prefs.focus_task_id).map(|t| t.id);
            store.update_preferences(user_id, |p| p.focus_task_id = picked);
            match picked.and_then(|id| store.get_task(id)) {
                Some(task) => println!("Focus on: {} (task {}).", task.title, task.id),
                None => println!("Nothing else to focus on."),
            }
            Ok(true)
        }
        "done" => {
            let prefs = store.preferences(user_id);
            let Some(current) = prefs.focus_task_id else {
                return Err(anyhow!("focus done: no task in focus"));
            };
            let finished = store.complete_task(current, now)?;
            println!("Completed: {} (task {}).", finished.title, finished.id);

            let tasks = store.tasks_for_user(user_id);
            let picked = select_focus_task(&tasks, Some(current)).map(|t| t.id);
            store.update_preferences(user_id, |p| p.focus_task_id = picked);
            match picked.and_then(|id| store.get_task(id)) {
                Some(task) => println!("Focus on: {} (task {}).", task.title, task.id),
                None => println!("All tasks done."),
            }
            Ok(true)
        }
        "status" => {
            let prefs = store.preferences(user_id);
            if !prefs.focus_mode_enabled {
                println!("Focus mode off.");
                return Ok(false);
            }
            match prefs.focus_task_id.and_then(|id| store.get_task(id)) {
                Some(task) => println!(
                    "Focus on: {} (task {}, {} min).",
                    task.title, task.id, prefs.focus_mode_duration
                ),
                None => println!("Focus mode on, no task selected."),
            }
            Ok(false)
        }
        other => Err(anyhow!("focus: unknown subcommand: {other}")),
    }
}

#[instrument(skip(store, args, now))]
fn cmd_breakdown(
    store: &mut MemStore,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<bool> {
    info!("command breakdown");

    let id = single_id(args, "breakdown")?;
    let task = store
        .get_task(id)
        .cloned()
        .ok_or_else(|| anyhow!("no such task: {id}"))?;

    let provider = RuleBasedProvider::default();
    let drafts = provider.suggest_subtasks(&task)?;

    for suggestion in &drafts {
        let mut draft = TaskDraft::new(suggestion.title.clone(), task.user_id);
        draft.description = suggestion.description.clone();
        draft.priority = task.priority;
        draft.category_id = task.category_id;
        draft.parent_task_id = Some(task.id);
        draft.ai_generated = true;
        let created = store.create_task(draft, now);
        println!("Created subtask {}: {}", created.id, created.title);
    }

    println!("Added {} subtask(s) under task {id}.", drafts.len());
    Ok(!drafts.is_empty())
}

#[instrument(skip(store, renderer, args))]
fn cmd_history(
    store: &mut MemStore,
    renderer: &mut Renderer,
    args: &[String],
    user_id: u64,
) -> anyhow::Result<bool> {
    info!("command history");

    if args.is_empty() {
        renderer.print_history_table(&store.history_for_user(user_id))?;
        return Ok(false);
    }

    let id = single_id(args, "history")?;
    if store.get_task(id).is_none() {
        return Err(anyhow!("no such task: {id}"));
    }

    renderer.print_history_table(&store.history_for_task(id))?;
    Ok(false)
}

#[instrument(skip(store))]
fn cmd_export(store: &mut MemStore, user_id: u64) -> anyhow::Result<bool> {
    info!("command export");

    let tasks = store.tasks_for_user(user_id);
    let out = serde_json::to_string(&tasks)?;
    println!("{out}");
    Ok(false)
}

#[instrument(skip(store))]
fn cmd_import(store: &mut MemStore) -> anyhow::Result<bool> {
    info!("command import");

    let mut stdin = String::new();
    io::stdin()
        .read_to_string(&mut stdin)
        .context("failed reading stdin")?;

    let trimmed = stdin.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("import: empty input"));
    }

    let tasks = parse_import_tasks(trimmed)?;
    let count = store.import_tasks(tasks);
    println!("Imported {count} task(s).");
    Ok(count > 0)
}

fn parse_import_tasks(trimmed: &str) -> anyhow::Result<Vec<Task>> {
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("failed parsing JSON array");
    }

    let mut out = Vec::new();
    for (idx, line) in trimmed.lines().enumerate() {
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let task: Task = serde_json::from_str(token)
            .with_context(|| format!("failed parsing import line {}", idx + 1))?;
        out.push(task);
    }

    if out.is_empty() {
        return Err(anyhow!("import: empty input"));
    }

    Ok(out)
}

fn cmd_help() -> anyhow::Result<bool> {
    println!(
        "Implemented commands: add, list, board, summary, show, done, start, reopen, modify, delete, categories, focus, breakdown, history, export, import"
    );
    Ok(false)
}

pub fn focus_settings_from_config(cfg: &Config) -> FocusSettings {
    let defaults = FocusSettings::default();
    FocusSettings {
        show_high_priority: cfg.get_bool("focus.high").unwrap_or(defaults.show_high_priority),
        show_today_tasks: cfg.get_bool("focus.today").unwrap_or(defaults.show_today_tasks),
        show_medium_priority: cfg
            .get_bool("focus.medium")
            .unwrap_or(defaults.show_medium_priority),
        duration_minutes: cfg
            .get_u64("focus.duration")
            .map(|n| n as u32)
            .unwrap_or(defaults.duration_minutes),
    }
}

#[instrument(skip(store, cfg, args))]
fn build_view_config(
    store: &MemStore,
    cfg: &Config,
    args: &[String],
    user_id: u64,
) -> anyhow::Result<ViewConfig> {
    let mut config = ViewConfig::default();

    if let Some(raw) = cfg.get("view.sort") {
        config.sort_by = SortKey::parse(&raw)
            .ok_or_else(|| anyhow!("invalid view.sort setting: {raw}"))?;
    }
    if let Some(show) = cfg.get_bool("view.show_completed") {
        config.show_completed = show;
    }

    let mut search_tokens = Vec::new();
    for arg in args {
        if arg == "all" {
            config.show_completed = true;
            continue;
        }
        if let Some(raw) = arg.strip_prefix("sort:") {
            config.sort_by = SortKey::parse(raw)
                .ok_or_else(|| anyhow!("invalid sort key: {raw}"))?;
            continue;
        }
        if let Some(raw) = arg.strip_prefix("search:") {
            search_tokens.push(raw.to_string());
            continue;
        }
        if let Some(name) = arg.strip_prefix("cat:").or_else(|| arg.strip_prefix("category:")) {
            let category = store
                .find_category(user_id, name)
                .ok_or_else(|| anyhow!("unknown category: {name}"))?;
            config.categories.insert(category.id);
            continue;
        }
        search_tokens.push(arg.clone());
    }
    config.search_query = search_tokens.join(" ");

    Ok(config)
}

/// One `key:value` modifier from the command line. An empty value clears
/// the field.
#[derive(Debug, Clone)]
enum Mod {
    Due(Option<DateTime<Utc>>),
    Priority(Priority),
    Category(Option<String>),
    Note(Option<String>),
    Parent(Option<u64>),
}

/// Resolved form with category names turned into ids.
#[derive(Debug, Clone)]
enum ResolvedMod {
    Due(Option<DateTime<Utc>>),
    Priority(Priority),
    Category(Option<u64>),
    Note(Option<String>),
    Parent(Option<u64>),
}

#[instrument(skip(args, now))]
fn parse_title_and_mods(
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<(Vec<String>, Vec<Mod>)> {
    let mut title_tokens = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
            continue;
        }

        title_tokens.push(arg.clone());
    }

    Ok((title_tokens, mods))
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    let (key, value) = if let Some((k, v)) = tok.split_once(':') {
        (k, v)
    } else if let Some((k, v)) = tok.split_once('=') {
        (k, v)
    } else {
        return Ok(None);
    };

    let key = key.to_ascii_lowercase();

    match key.as_str() {
        "due" => {
            if value.is_empty() {
                Ok(Some(Mod::Due(None)))
            } else {
                Ok(Some(Mod::Due(Some(parse_date_expr(value, now)?))))
            }
        }
        "pri" | "priority" => {
            let priority = Priority::parse(value)
                .ok_or_else(|| anyhow!("invalid priority: {value}"))?;
            Ok(Some(Mod::Priority(priority)))
        }
        "cat" | "category" => {
            if value.is_empty() {
                Ok(Some(Mod::Category(None)))
            } else {
                Ok(Some(Mod::Category(Some(value.to_string()))))
            }
        }
        "note" | "desc" => {
            if value.is_empty() {
                Ok(Some(Mod::Note(None)))
            } else {
                Ok(Some(Mod::Note(Some(value.to_string()))))
            }
        }
        "parent" => {
            if value.is_empty() {
                Ok(Some(Mod::Parent(None)))
            } else {
                let id = value
                    .parse()
                    .with_context(|| format!("invalid parent id: {value}"))?;
                Ok(Some(Mod::Parent(Some(id))))
            }
        }
        _ => Ok(None),
    }
}

fn resolve_mod_categories(
    store: &mut MemStore,
    mods: &[Mod],
    user_id: u64,
    now: DateTime<Utc>,
) -> Vec<ResolvedMod> {
    mods.iter()
        .map(|one_mod| match one_mod {
            Mod::Due(value) => ResolvedMod::Due(*value),
            Mod::Priority(value) => ResolvedMod::Priority(*value),
            Mod::Category(None) => ResolvedMod::Category(None),
            Mod::Category(Some(name)) => {
                ResolvedMod::Category(Some(category_id_for(store, user_id, name, now)))
            }
            Mod::Note(value) => ResolvedMod::Note(value.clone()),
            Mod::Parent(value) => ResolvedMod::Parent(*value),
        })
        .collect()
}

fn category_id_for(store: &mut MemStore, user_id: u64, name: &str, now: DateTime<Utc>) -> u64 {
    if let Some(category) = store.find_category(user_id, name) {
        return category.id;
    }
    warn!(name, "category not found, creating it");
    store.create_category(name, DEFAULT_CATEGORY_COLOR, user_id, now).id
}

fn apply_mods_to_draft(
    store: &mut MemStore,
    draft: &mut TaskDraft,
    mods: &[Mod],
    user_id: u64,
    now: DateTime<Utc>,
) {
    for one_mod in resolve_mod_categories(store, mods, user_id, now) {
        match one_mod {
            ResolvedMod::Due(value) => draft.due_date = value,
            ResolvedMod::Priority(value) => draft.priority = value,
            ResolvedMod::Category(value) => draft.category_id = value,
            ResolvedMod::Note(value) => draft.description = value,
            ResolvedMod::Parent(value) => draft.parent_task_id = value,
        }
    }
}

fn apply_mods_to_task(task: &mut Task, mods: &[ResolvedMod]) {
    for one_mod in mods {
        match one_mod {
            ResolvedMod::Due(value) => task.due_date = *value,
            ResolvedMod::Priority(value) => task.priority = *value,
            ResolvedMod::Category(value) => task.category_id = *value,
            ResolvedMod::Note(value) => task.description = value.clone(),
            ResolvedMod::Parent(value) => task.parent_task_id = *value,
        }
    }
}

fn single_id(args: &[String], command: &str) -> anyhow::Result<u64> {
    let raw = args
        .first()
        .ok_or_else(|| anyhow!("{command}: a task id is required"))?;
    raw.parse()
        .with_context(|| format!("{command}: invalid task id: {raw}"))
}

fn parse_ids(args: &[String], command: &str) -> anyhow::Result<Vec<u64>> {
    if args.is_empty() {
        return Err(anyhow!("{command}: at least one task id is required"));
    }

    let mut ids = Vec::new();
    for arg in args {
        for token in arg.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let id = token
                .parse()
                .with_context(|| format!("{command}: invalid task id: {token}"))?;
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Err(anyhow!("{command}: at least one task id is required"));
    }
    Ok(ids)
}
