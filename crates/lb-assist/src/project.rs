// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Project context detection
//!
//! The control verbs tell the agent which framework and styling approach the
//! project uses so generated code matches what is already there.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Directories never worth scanning for source files
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", ".next", "coverage"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Vue,
    Svelte,
    Angular,
    #[default]
    Html,
}

impl Framework {
    pub fn as_str(self) -> &'static str {
        match self {
            Framework::React => "react",
            Framework::Vue => "vue",
            Framework::Svelte => "svelte",
            Framework::Angular => "angular",
            Framework::Html => "html",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Styling {
    Tailwind,
    StyledComponents,
    Emotion,
    CssModules,
    #[default]
    Css,
}

impl Styling {
    pub fn as_str(self) -> &'static str {
        match self {
            Styling::Tailwind => "tailwind",
            Styling::StyledComponents => "styled-components",
            Styling::Emotion => "emotion",
            Styling::CssModules => "css-modules",
            Styling::Css => "css",
        }
    }
}

/// What the project is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectContext {
    pub framework: Framework,
    pub styling: Styling,
    pub typescript: bool,
}

impl ProjectContext {
    /// Extension new component files should use
    pub fn file_extension(&self) -> &'static str {
        match (self.framework, self.typescript) {
            (Framework::React, true) => ".tsx",
            (Framework::React, false) => ".jsx",
            (Framework::Vue, _) => ".vue",
            (Framework::Svelte, _) => ".svelte",
            (Framework::Angular, _) => ".component.ts",
            (Framework::Html, true) => ".ts",
            (Framework::Html, false) => ".js",
        }
    }
}

impl std::fmt::Display for ProjectContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let language = if self.typescript { "TypeScript" } else { "JavaScript" };
        write!(
            f,
            "{} + {} ({})",
            self.framework.as_str(),
            self.styling.as_str(),
            language
        )
    }
}

/// Detects the project context. Detection never fails; unknown projects
/// get [`ProjectContext::default`].
pub trait ProjectDetector: Send + Sync {
    fn detect(&self, root: &Path) -> ProjectContext;
}

/// Detection from `package.json` dependencies plus a scan for telltale files
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageJsonDetector;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PackageManifest {
    dependencies: serde_json::Map<String, serde_json::Value>,
    dev_dependencies: serde_json::Map<String, serde_json::Value>,
}

impl ProjectDetector for PackageJsonDetector {
    fn detect(&self, root: &Path) -> ProjectContext {
        let mut context = ProjectContext::default();

        let manifest = match std::fs::read_to_string(root.join("package.json")) {
            Ok(raw) => match serde_json::from_str::<PackageManifest>(&raw) {
                Ok(manifest) => manifest,
                Err(e) => {
                    debug!("Invalid package.json in {:?}: {}", root, e);
                    return context;
                }
            },
            // Plain HTML project
            Err(_) => return context,
        };

        let deps: HashSet<&str> = manifest
            .dependencies
            .keys()
            .chain(manifest.dev_dependencies.keys())
            .map(String::as_str)
            .collect();
        let has = |name: &str| deps.contains(name);

        context.framework = if has("react") || has("react-dom") {
            Framework::React
        } else if has("vue") {
            Framework::Vue
        } else if has("svelte") {
            Framework::Svelte
        } else if has("@angular/core") {
            Framework::Angular
        } else {
            Framework::Html
        };

        context.styling = if has("tailwindcss") {
            Styling::Tailwind
        } else if has("styled-components") {
            Styling::StyledComponents
        } else if has("@emotion/react") || has("@emotion/styled") {
            Styling::Emotion
        } else if has_file_with_suffix(root, &[".module.css", ".module.scss"]) {
            Styling::CssModules
        } else {
            Styling::Css
        };

        context.typescript = has("typescript") || has_file_with_suffix(root, &[".ts", ".tsx"]);

        debug!("Detected project context: {}", context);
        context
    }
}

/// Depth-first search for any file ending in one of `suffixes`
fn has_file_with_suffix(root: &Path, suffixes: &[&str]) -> bool {
    let Ok(entries) = std::fs::read_dir(root) else {
        return false;
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if SKIPPED_DIRS.iter().any(|skipped| *skipped == name) {
                continue;
            }
            if has_file_with_suffix(&entry.path(), suffixes) {
                return true;
            }
        } else if suffixes.iter().any(|suffix| name.ends_with(suffix)) {
            return true;
        }
    }
    false
}
