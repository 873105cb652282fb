use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use camwiki_core::config::{WikiSettings, load_config};
use camwiki_core::error::WikiError;
use camwiki_core::migrate::{MIGRATIONS_POLICY_MESSAGE, pending_migration_count, run_migrations};
use camwiki_core::permissions::{Caller, Permission, PermissionSet};
use camwiki_core::routes::{RouteMap, SitePaths};
use camwiki_core::runtime::{
    InitOptions, PathOverrides, SiteLayout, init_layout, resolve_layout,
};
use camwiki_core::store::WikiStore;
use camwiki_core::workflow::{
    self, DeleteIntent, DeleteOutcome, EditSubmission, PageOutcome,
};
use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "camwiki",
    version,
    about = "CamelCase wiki engine: pages, revision history, and diffs over SQLite"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    site_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "NAME", help = "Act as this signed-in user")]
    user: Option<String>,
    #[arg(
        long,
        global = true,
        value_name = "ADDR",
        help = "Origin address stamped into new revisions"
    )]
    address: Option<String>,
    #[arg(
        long = "grant",
        global = true,
        value_name = "PERMISSION",
        help = "Grant one permission (repeatable); a named user defaults to all"
    )]
    grants: Vec<String>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    site_root: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    user: Option<String>,
    address: Option<String>,
    grants: Vec<String>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            site_root: cli.site_root.clone(),
            data_dir: cli.data_dir.clone(),
            config: cli.config.clone(),
            user: cli.user.clone(),
            address: cli.address.clone(),
            grants: cli.grants.clone(),
            diagnostics: cli.diagnostics,
        }
    }

    fn caller(&self) -> Caller {
        match &self.user {
            Some(user) => Caller::named(user, self.address.as_deref()),
            None => Caller::anonymous(),
        }
    }

    fn checker(&self) -> Result<PermissionSet> {
        if self.grants.is_empty() {
            return Ok(if self.user.is_some() {
                PermissionSet::all()
            } else {
                PermissionSet::none()
            });
        }
        let mut checker = PermissionSet::none();
        for grant in &self.grants {
            let permission = Permission::parse(grant)
                .ok_or_else(|| anyhow::anyhow!("unknown permission: {grant}"))?;
            checker = checker.grant(permission);
        }
        Ok(checker)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Create the site layout and a commented config file")]
    Init(InitArgs),
    #[command(about = "Show a page, optionally pinned to a revision")]
    Page(PageArgs),
    #[command(about = "Show the edit form pre-fill for a page")]
    Edit(EditArgs),
    #[command(about = "Save page content from a file or stdin")]
    Save(SaveArgs),
    #[command(about = "Delete a revision or a whole page")]
    Delete(DeleteArgs),
    #[command(about = "List all pages")]
    Pages(PagesArgs),
    #[command(about = "List revisions, newest first")]
    History(HistoryArgs),
    #[command(about = "Unified diff between two revisions")]
    Changes(ChangesArgs),
    #[command(about = "Print where the home page lives")]
    Index,
    Db(DbArgs),
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "Overwrite an existing config file")]
    force: bool,
    #[arg(long, help = "Skip writing the config file")]
    no_config: bool,
}

#[derive(Debug, Args)]
struct PageArgs {
    slug: String,
    #[arg(long, value_name = "ID")]
    rev: Option<i64>,
    #[arg(long, help = "Print the view model as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct EditArgs {
    slug: String,
    #[arg(long, value_name = "ID", help = "Pre-fill from this revision (revert)")]
    rev: Option<i64>,
}

#[derive(Debug, Args)]
struct SaveArgs {
    slug: String,
    #[arg(long, value_name = "ID", help = "Submit as a revert of this revision")]
    rev: Option<i64>,
    #[arg(short, long, default_value = "", help = "Change message")]
    message: String,
    #[arg(long, value_name = "PATH", help = "Read content from this file instead of stdin")]
    content_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    slug: String,
    #[arg(long, value_name = "ID", help = "Target revision; defaults to current")]
    rev: Option<i64>,
    #[arg(long, value_name = "CHOICE", help = "What to delete: rev or page")]
    intent: String,
}

#[derive(Debug, Args)]
struct PagesArgs {
    #[arg(long, help = "Print the listing as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    slug: Option<String>,
    #[arg(long, help = "Print the listing as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct ChangesArgs {
    slug: String,
    #[arg(short = 'a', value_name = "ID", help = "Current-side revision id")]
    rev_a: Option<i64>,
    #[arg(short = 'b', value_name = "ID", help = "Original-side revision id")]
    rev_b: Option<i64>,
}

#[derive(Debug, Args)]
struct DbArgs {
    #[command(subcommand)]
    command: DbSubcommand,
}

#[derive(Debug, Subcommand)]
enum DbSubcommand {
    Migrate,
    Status,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Init(args)) => run_init(&runtime, args),
        Some(Commands::Page(args)) => run_page(&runtime, args),
        Some(Commands::Edit(args)) => run_edit(&runtime, args),
        Some(Commands::Save(args)) => run_save(&runtime, args),
        Some(Commands::Delete(args)) => run_delete(&runtime, args),
        Some(Commands::Pages(args)) => run_pages(&runtime, args),
        Some(Commands::History(args)) => run_history(&runtime, args),
        Some(Commands::Changes(args)) => run_changes(&runtime, args),
        Some(Commands::Index) => run_index(&runtime),
        Some(Commands::Db(DbArgs { command })) => match command {
            DbSubcommand::Migrate => run_db_migrate(&runtime),
            DbSubcommand::Status => run_db_status(&runtime),
        },
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<SiteLayout> {
    let overrides = PathOverrides {
        site_root: runtime.site_root.clone(),
        data_dir: runtime.data_dir.clone(),
        config: runtime.config.clone(),
    };
    let paths = resolve_layout(&overrides)?;
    if runtime.diagnostics {
        eprintln!("[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(paths)
}

fn load_settings(paths: &SiteLayout) -> Result<WikiSettings> {
    load_config(&paths.config_path)?.settings()
}

fn open_store(paths: &SiteLayout) -> Result<WikiStore> {
    if pending_migration_count(&paths.db_path)? > 0 {
        bail!("schema is out of date. {MIGRATIONS_POLICY_MESSAGE}");
    }
    WikiStore::open(&paths.db_path).context("failed to open wiki store")
}

fn require_valid_slug(settings: &WikiSettings, slug: &str) -> Result<()> {
    if !settings.is_valid_slug(slug) {
        bail!("not a valid wiki slug: {slug}");
    }
    Ok(())
}

fn run_init(runtime: &RuntimeOptions, args: InitArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let report = init_layout(
        &paths,
        &InitOptions {
            materialize_config: !args.no_config,
            force: args.force,
        },
    )?;

    println!("Initialized camwiki site layout");
    println!("site_root: {}", paths.site_root.display());
    println!("state_dir: {}", paths.state_dir.display());
    println!("db_path: {}", paths.db_path.display());
    println!("config_path: {}", paths.config_path.display());
    println!("created_dirs: {}", report.created_dirs.len());
    println!("wrote_config: {}", report.wrote_config);
    println!("policy: {MIGRATIONS_POLICY_MESSAGE}");
    Ok(())
}

fn run_db_migrate(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let report = run_migrations(&paths.db_path)?;
    for migration in &report.applied {
        println!("applied v{:03}_{}", migration.version, migration.name);
    }
    println!("schema_version: {}", report.current_version);
    Ok(())
}

fn run_db_status(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let pending = pending_migration_count(&paths.db_path)?;
    println!("db_path: {}", paths.db_path.display());
    println!("db_exists: {}", paths.db_path.exists());
    println!("pending_migrations: {pending}");
    if pending > 0 {
        println!("policy: {MIGRATIONS_POLICY_MESSAGE}");
    }
    Ok(())
}

fn run_page(runtime: &RuntimeOptions, args: PageArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let settings = load_settings(&paths)?;
    require_valid_slug(&settings, &args.slug)?;
    let store = open_store(&paths)?;

    let outcome = workflow::view_page(
        &store,
        &settings,
        &SitePaths,
        &runtime.caller(),
        &args.slug,
        args.rev,
    )?;
    match outcome {
        PageOutcome::View(view) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }
            println!("page: {}", view.page.slug);
            println!("revision: {}", view.revision.id);
            println!("is_current: {}", view.is_current);
            println!("creator: {}", view.revision.creator.as_deref().unwrap_or("-"));
            println!("---");
            println!("{}", view.rendered_content);
        }
        PageOutcome::StartEdit { slug } => {
            println!(
                "page {slug} does not exist; create it at {}",
                SitePaths.edit_path(&slug)
            );
        }
    }
    Ok(())
}

fn run_edit(runtime: &RuntimeOptions, args: EditArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let settings = load_settings(&paths)?;
    require_valid_slug(&settings, &args.slug)?;
    let store = open_store(&paths)?;

    let screen = workflow::edit_screen(
        &store,
        &runtime.checker()?,
        &runtime.caller(),
        &args.slug,
        args.rev,
    )?;

    println!("slug: {}", screen.slug);
    println!("exists: {}", screen.page.is_some());
    if let Some(revision) = &screen.revision {
        println!("revision: {}", revision.revision.id);
        println!("is_current: {}", revision.is_current);
    }
    println!("message: {}", screen.initial_message);
    match &screen.delete_choices {
        Some(choices) => println!(
            "delete_choices: rev={} page={}",
            choices.can_delete_revision, choices.can_delete_page
        ),
        None => println!("delete_choices: none"),
    }
    println!("---");
    println!("{}", screen.initial_content);
    Ok(())
}

fn run_save(runtime: &RuntimeOptions, args: SaveArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let settings = load_settings(&paths)?;
    require_valid_slug(&settings, &args.slug)?;
    let mut store = open_store(&paths)?;

    let content = match &args.content_file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read content from stdin")?;
            buffer
        }
    };

    let submission = EditSubmission {
        content,
        message: args.message.clone(),
    };
    let saved = match workflow::submit_edit(
        &mut store,
        &runtime.checker()?,
        &runtime.caller(),
        &args.slug,
        args.rev,
        &submission,
    ) {
        Ok(saved) => saved,
        // Validation problems re-display the form instead of failing the
        // process.
        Err(WikiError::ValidationFailed { field, message }) => {
            println!("{field}: {message}");
            println!("nothing was saved; edit {} and try again", args.slug);
            return Ok(());
        }
        Err(error) => return Err(error.into()),
    };

    println!("{}", saved.notice);
    println!("revision: {}", saved.revision.id);
    println!("view: {}", saved.destination.path(&SitePaths));
    Ok(())
}

fn run_delete(runtime: &RuntimeOptions, args: DeleteArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let settings = load_settings(&paths)?;
    require_valid_slug(&settings, &args.slug)?;
    let mut store = open_store(&paths)?;

    let page = store.get_page(&args.slug)?;
    let revision = match args.rev {
        Some(id) => store.get_revision(id)?,
        None => store.current_revision(&page)?,
    };

    let outcome = workflow::delete_wiki(
        &mut store,
        &runtime.checker()?,
        DeleteIntent::parse(&args.intent),
        &page,
        &revision,
    )?;
    match outcome {
        DeleteOutcome::RevisionDeleted { notice, destination }
        | DeleteOutcome::PageDeleted { notice, destination } => {
            println!("{notice}");
            println!("next: {}", destination.path(&SitePaths));
        }
        DeleteOutcome::Ignored { destination } => {
            println!("nothing was deleted");
            println!("next: {}", destination.path(&SitePaths));
        }
    }
    Ok(())
}

fn run_pages(runtime: &RuntimeOptions, args: PagesArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let settings = load_settings(&paths)?;
    let store = open_store(&paths)?;

    let index = workflow::page_list(&store, &settings)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }
    println!("index_slug: {}", index.index_slug);
    for page in &index.pages {
        println!("{}", page.slug);
    }
    Ok(())
}

fn run_history(runtime: &RuntimeOptions, args: HistoryArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let settings = load_settings(&paths)?;
    if let Some(slug) = &args.slug {
        require_valid_slug(&settings, slug)?;
    }
    let store = open_store(&paths)?;

    let revisions = workflow::revision_list(&store, args.slug.as_deref())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&revisions)?);
        return Ok(());
    }

    let pages = store.list_pages()?;
    for revision in &revisions {
        let slug = pages
            .iter()
            .find(|page| page.id == revision.page_id)
            .map(|page| page.slug.as_str())
            .unwrap_or("?");
        println!(
            "{} ({}, {})",
            revision.label(slug),
            revision.creator.as_deref().unwrap_or("anonymous"),
            if revision.message.is_empty() {
                "no message"
            } else {
                revision.message.as_str()
            },
        );
    }
    Ok(())
}

fn run_changes(runtime: &RuntimeOptions, args: ChangesArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let settings = load_settings(&paths)?;
    require_valid_slug(&settings, &args.slug)?;
    let store = open_store(&paths)?;

    let view = workflow::changes(&store, &args.slug, args.rev_a, args.rev_b)?;
    println!(
        "comparing revision {} against revision {}",
        view.revision_a.id, view.revision_b.id
    );
    println!("{}", view.text);
    Ok(())
}

fn run_index(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let settings = load_settings(&paths)?;
    let destination = workflow::index_destination(&settings);
    println!("{}", destination.path(&SitePaths));
    Ok(())
}
