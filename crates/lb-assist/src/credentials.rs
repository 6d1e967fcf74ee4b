// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Anthropic API key lookup
//!
//! Keys live in Claude's own settings files under `env.ANTHROPIC_API_KEY`,
//! first in the project (`<project>/.claude/settings.json`), then in the
//! user's home directory.

use crate::error::{AssistError, AssistResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

const SETTINGS_DIR: &str = ".claude";
const SETTINGS_FILE: &str = "settings.json";
const KEY_NAME: &str = "ANTHROPIC_API_KEY";

/// Provides the API key for generation calls
pub trait ApiKeySource: Send + Sync {
    fn lookup(&self, project_root: &Path) -> AssistResult<String>;
}

/// Reads the key from project and home `.claude/settings.json`
#[derive(Debug, Clone)]
pub struct SettingsFileKeySource {
    home: Option<PathBuf>,
}

impl SettingsFileKeySource {
    pub fn new() -> Self {
        Self { home: dirs::home_dir() }
    }

    /// Use `home` instead of the user's home directory
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: Some(home.into()) }
    }

    fn candidates(&self, project_root: &Path) -> Vec<PathBuf> {
        let mut paths = vec![settings_path(project_root)];
        if let Some(home) = &self.home {
            paths.push(settings_path(home));
        }
        paths
    }
}

impl Default for SettingsFileKeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeySource for SettingsFileKeySource {
    fn lookup(&self, project_root: &Path) -> AssistResult<String> {
        self.candidates(project_root)
            .iter()
            .find_map(|path| read_api_key(path))
            .ok_or(AssistError::ApiKeyNotFound)
    }
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_DIR).join(SETTINGS_FILE)
}

fn read_api_key(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let settings: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            debug!("Ignoring unreadable settings file {:?}: {}", path, e);
            return None;
        }
    };
    let key = settings.get("env")?.get(KEY_NAME)?.as_str()?.trim();
    (!key.is_empty()).then(|| key.to_string())
}

/// Store `api_key` in the project's `.claude/settings.json`.
///
/// Other settings already present in the file are kept.
pub fn write_project_settings(project_root: &Path, api_key: &str) -> AssistResult<PathBuf> {
    let path = settings_path(project_root);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let mut settings = match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
        Err(e) => return Err(e.into()),
    };

    let env = settings
        .entry("env")
        .or_insert_with(|| Value::Object(Map::new()));
    if !env.is_object() {
        *env = Value::Object(Map::new());
    }
    if let Value::Object(env) = env {
        env.insert(KEY_NAME.to_string(), Value::String(api_key.to_string()));
    }

    std::fs::write(&path, serde_json::to_string_pretty(&Value::Object(settings))?)?;
    Ok(path)
}
