//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".tablemig/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub markup: Markup,
    #[serde(default)]
    pub ignore: Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Glob selecting documents, relative to the root.
    #[serde(default = "Defaults::default_pattern")]
    pub pattern: String,
    /// Worker threads; 0 lets the pool decide.
    #[serde(default)]
    pub jobs: usize,
}

impl Defaults {
    fn default_pattern() -> String {
        "**/*.vue".to_owned()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            pattern: Self::default_pattern(),
            jobs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markup {
    #[serde(default = "Markup::default_table_element")]
    pub table_element: String,
    #[serde(default = "Markup::default_column_element")]
    pub column_element: String,
    #[serde(default = "Markup::default_columns_variable")]
    pub columns_variable: String,
    #[serde(default)]
    drop_header_templates: Option<bool>,
}

impl Markup {
    fn default_table_element() -> String {
        "a-table".into()
    }

    fn default_column_element() -> String {
        "a-table-column".into()
    }

    fn default_columns_variable() -> String {
        "tableColumns".into()
    }

    fn default_drop_header_templates() -> bool {
        true
    }

    pub fn drop_header_templates(&self) -> bool {
        self.drop_header_templates
            .unwrap_or_else(Self::default_drop_header_templates)
    }
}

impl Default for Markup {
    fn default() -> Self {
        Self {
            table_element: Self::default_table_element(),
            column_element: Self::default_column_element(),
            columns_variable: Self::default_columns_variable(),
            drop_header_templates: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ignore {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub globs: Vec<String>,
}

impl Default for Ignore {
    fn default() -> Self {
        Self {
            paths: vec!["node_modules/".into(), "dist/".into(), ".git/".into()],
            globs: Vec::new(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pattern: Option<String>,
    jobs: Option<usize>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        let jobs = env::var("TABLEMIG_JOBS").ok().and_then(|raw| match raw.trim().parse() {
            Ok(jobs) => Some(jobs),
            Err(err) => {
                tracing::warn!(value = %raw, error = %err, "ignoring invalid TABLEMIG_JOBS");
                None
            }
        });
        Self {
            pattern: env::var("TABLEMIG_PATTERN").ok(),
            jobs,
        }
    }

    #[cfg(test)]
    fn for_tests(pattern: &str, jobs: usize) -> Self {
        Self {
            pattern: Some(pattern.to_owned()),
            jobs: Some(jobs),
        }
    }
}

impl Config {
    /// Load configuration for the documents under `root` from defaults,
    /// user/global config, workspace config, and env overrides.
    pub fn load(root: &Path) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path(root);
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading global config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            markup: merge_markup(self.markup, other.markup),
            ignore: merge_ignore(self.ignore, other.ignore),
        }
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        pattern: if overlay.pattern != Defaults::default_pattern() {
            overlay.pattern
        } else {
            base.pattern
        },
        jobs: if overlay.jobs != 0 {
            overlay.jobs
        } else {
            base.jobs
        },
    }
}

fn merge_markup(mut base: Markup, overlay: Markup) -> Markup {
    base.table_element = choose(
        base.table_element,
        overlay.table_element,
        Markup::default_table_element,
    );
    base.column_element = choose(
        base.column_element,
        overlay.column_element,
        Markup::default_column_element,
    );
    base.columns_variable = choose(
        base.columns_variable,
        overlay.columns_variable,
        Markup::default_columns_variable,
    );
    if let Some(value) = overlay.drop_header_templates {
        base.drop_header_templates = Some(value);
    }
    base
}

fn choose(base: String, overlay: String, default_fn: fn() -> String) -> String {
    if overlay != default_fn() {
        overlay
    } else {
        base
    }
}

fn merge_ignore(base: Ignore, overlay: Ignore) -> Ignore {
    let mut paths: BTreeSet<String> = base.paths.into_iter().collect();
    paths.extend(overlay.paths);

    let mut globs: BTreeSet<String> = base.globs.into_iter().collect();
    globs.extend(overlay.globs);

    Ignore {
        paths: paths.into_iter().collect(),
        globs: globs.into_iter().collect(),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("tablemig/config.toml"))
}

/// The root's own config, falling back to the enclosing repository's.
fn workspace_config_path(root: &Path) -> Option<PathBuf> {
    let local = root.join(DEFAULT_WORKSPACE_CONFIG_PATH);
    if local.exists() {
        return Some(local);
    }
    find_repo_root(root).map(|repo| repo.join(DEFAULT_WORKSPACE_CONFIG_PATH))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(pattern) = env.pattern {
        config.defaults.pattern = pattern;
    }
    if let Some(jobs) = env.jobs {
        config.defaults.jobs = jobs;
    }
    config
}
