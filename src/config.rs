use std::{
    env,
    fs::{self, create_dir_all},
    path::{Path, PathBuf},
};

use directories::ProjectDirs;

const DEFAULT_CONFIG: &str = "\
# zei configuration
#
# where snippets are kept
#store = \"~/.local/share/zei/snippets.json\"
# colour in listings
#color = true
# log filter, overridden by ZEI_LOG
#log = \"warn\"
";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub store: PathBuf,
    pub color: bool,
    pub log: Option<String>,
    /// Problems found while loading, reported once logging is up.
    pub problems: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: default_store_path(),
            color: true,
            log: None,
            problems: Vec::new(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "zei")
}

//config file
pub fn config_file_path() -> PathBuf {
    if let Some(path) = env::var_os("ZEI_CONFIG") {
        return PathBuf::from(path);
    }
    project_dirs()
        .map(|dirs| dirs.config_dir().join("zei.conf"))
        .unwrap_or_else(|| PathBuf::from(".zei.conf"))
}

//snippet file
pub fn default_store_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("snippets.json"))
        .unwrap_or_else(|| PathBuf::from("snippets.json"))
}

/// Loads the config file, writing a commented default first if there is none.
pub fn init() -> Config {
    let config_path = config_file_path();

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            let _ = create_dir_all(parent);
        }
        if let Err(e) = fs::write(&config_path, DEFAULT_CONFIG) {
            let mut config = Config::default();
            config
                .problems
                .push(format!("could not write default config to {}: {e}", config_path.display()));
            return config;
        }
    }
    load_config(&config_path)
}

pub fn load_config(path: &Path) -> Config {
    let content = fs::read_to_string(path).unwrap_or_default();
    parse_config(&content)
}

fn parse_config(content: &str) -> Config {
    let mut config = Config::default();

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            config.problems.push(format!("ignoring line without '=': {line}"));
            continue;
        };
        let value = value.trim().trim_matches('"');

        match key.trim() {
            "store" => config.store = expand_path(value),
            "color" => match value.parse::<bool>() {
                Ok(color) => config.color = color,
                Err(_) => config
                    .problems
                    .push(format!("color must be true or false, got '{value}'")),
            },
            "log" => config.log = Some(value.to_string()),
            other => config.problems.push(format!("unknown key '{other}'")),
        }
    }
    config
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
