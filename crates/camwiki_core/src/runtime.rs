use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{DEFAULT_INDEX_SLUG, DEFAULT_SLUG_PATTERN};

pub const STATE_DIR_NAME: &str = ".camwiki";
pub const DB_FILENAME: &str = "camwiki.db";

/// Where a resolved path came from; reported by `diagnostics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

/// Paths pinned on the command line; anything left `None` falls through to
/// the environment and then the defaults.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub site_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Resolved site layout: the site root, its `.camwiki/` state directory,
/// the SQLite database, and the config file, each tagged with where its
/// value came from.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub site_root: PathBuf,
    pub state_dir: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
    pub root_source: ValueSource,
    pub data_source: ValueSource,
    pub config_source: ValueSource,
}

impl SiteLayout {
    pub fn diagnostics(&self) -> String {
        format!(
            "site_root={} ({})\nstate_dir={}\ndata_dir={} ({})\ndb_path={}\nconfig_path={} ({})",
            self.site_root.display(),
            self.root_source.as_str(),
            self.state_dir.display(),
            self.data_dir.display(),
            self.data_source.as_str(),
            self.db_path.display(),
            self.config_path.display(),
            self.config_source.as_str(),
        )
    }
}

/// Resolve the layout for the current process: flags beat environment
/// variables, which beat the nearest ancestor directory holding a
/// `.camwiki/` state dir, which beats the working directory itself.
pub fn resolve_layout(overrides: &PathOverrides) -> Result<SiteLayout> {
    let cwd = env::current_dir().context("failed to read current directory")?;
    resolve_layout_in(&cwd, overrides, |key| env::var(key).ok())
}

fn resolve_layout_in<F>(cwd: &Path, overrides: &PathOverrides, env: F) -> Result<SiteLayout>
where
    F: Fn(&str) -> Option<String>,
{
    let (site_root, root_source) = match (&overrides.site_root, env("CAMWIKI_SITE_ROOT")) {
        (Some(path), _) => (absolutize(path, cwd), ValueSource::Flag),
        (None, Some(value)) => (absolutize(Path::new(value.trim()), cwd), ValueSource::Env),
        (None, None) => match nearest_state_dir(cwd) {
            Some(root) => (root, ValueSource::Heuristic),
            None => (cwd.to_path_buf(), ValueSource::Default),
        },
    };
    let state_dir = site_root.join(STATE_DIR_NAME);

    let (data_dir, data_source) = pick_path(
        overrides.data_dir.as_deref(),
        env("CAMWIKI_DATA_DIR"),
        &site_root,
        || state_dir.join("data"),
    );
    let (config_path, config_source) = pick_path(
        overrides.config.as_deref(),
        env("CAMWIKI_CONFIG"),
        &site_root,
        || state_dir.join("config.toml"),
    );

    Ok(SiteLayout {
        db_path: data_dir.join(DB_FILENAME),
        site_root,
        state_dir,
        data_dir,
        config_path,
        root_source,
        data_source,
        config_source,
    })
}

fn pick_path(
    flag: Option<&Path>,
    env_value: Option<String>,
    base: &Path,
    default: impl FnOnce() -> PathBuf,
) -> (PathBuf, ValueSource) {
    if let Some(path) = flag {
        return (absolutize(path, base), ValueSource::Flag);
    }
    if let Some(value) = env_value {
        return (absolutize(Path::new(value.trim()), base), ValueSource::Env);
    }
    (default(), ValueSource::Default)
}

fn nearest_state_dir(start: &Path) -> Option<PathBuf> {
    let mut cursor = Some(start);
    while let Some(dir) = cursor {
        if dir.join(STATE_DIR_NAME).exists() {
            return Some(dir.to_path_buf());
        }
        cursor = dir.parent();
    }
    None
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub materialize_config: bool,
    pub force: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            materialize_config: true,
            force: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InitReport {
    pub created_dirs: Vec<PathBuf>,
    pub wrote_config: bool,
}

/// Create the state layout under the resolved site root and materialize a
/// commented config file. Does not touch the database schema; that stays
/// with `migrate`.
pub fn init_layout(layout: &SiteLayout, options: &InitOptions) -> Result<InitReport> {
    let mut created_dirs = Vec::new();
    for dir in [
        layout.state_dir.clone(),
        layout.data_dir.clone(),
        layout.state_dir.join("logs"),
    ] {
        if dir.exists() {
            continue;
        }
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        created_dirs.push(dir);
    }

    let wrote_config =
        options.materialize_config && write_config_once(&layout.config_path, options.force)?;

    Ok(InitReport {
        created_dirs,
        wrote_config,
    })
}

pub fn render_materialized_config() -> String {
    format!(
        "# camwiki runtime configuration (materialized by `camwiki init`)\n# Run `camwiki db migrate` to apply pending schema migrations.\n\n[wiki]\n# default_index = \"{DEFAULT_INDEX_SLUG}\"\n# slug_pattern = \"{DEFAULT_SLUG_PATTERN}\"\n"
    )
}

fn write_config_once(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, render_materialized_config())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
