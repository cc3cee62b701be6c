//! `package.json` handling for scaffold templates.
//!
//! Parses project manifests, merges a freshly fetched template manifest into
//! the manifest of an existing project, validates new project names, and
//! names the files a template update touches.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::LazyLock;

// ============================================================================
// Project layout
// ============================================================================

/// The manifest file at the root of every project and template.
pub const MANIFEST_FILE: &str = "package.json";

/// Scratch directory, relative to the project root, that `update` downloads
/// the template into.
pub const SCRATCH_DIR: &str = ".temp";

/// Files and directories copied from the template over the project on every
/// update, relative to the project root.
pub const SYNC_PATHS: &[&str] = &[
    ".eslintignore",
    ".eslintrc.js",
    ".prettierrc.js",
    ".vscode",
    "public/index.html",
];

/// Install state removed after an update so the next install starts clean.
pub const STALE_PATHS: &[&str] = &["package-lock.json", "node_modules"];

/// Manifest fields owned by the template. An update always replaces them
/// wholesale with the template's values, whatever the project had.
pub const REPLACED_FIELDS: [&str; 3] = ["scripts", "dependencies", "devDependencies"];

// ============================================================================
// Error type
// ============================================================================

/// Errors that can occur when reading, validating, or writing manifests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed JSON in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} must contain a JSON object at the top level")]
    NotAnObject { path: String },

    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "invalid app name '{name}': it must be at least two characters, start with a letter, \
         end with a letter or digit, and contain only letters, digits, '-' and '_'"
    )]
    InvalidAppName { name: String },
}

// ============================================================================
// Manifest
// ============================================================================

/// A parsed `package.json`.
///
/// Keys keep the order they were read in, so rewriting a manifest only moves
/// the entries that actually changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Map<String, Value>);

impl Manifest {
    /// Parse manifest text. `origin` only labels errors.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, Error> {
        let parse_err = |source| Error::Parse {
            path: origin.display().to_string(),
            source,
        };
        let value: Value = serde_json::from_str(content).map_err(parse_err)?;
        if !value.is_object() {
            return Err(Error::NotAnObject {
                path: origin.display().to_string(),
            });
        }
        serde_json::from_value(value).map_err(parse_err)
    }

    /// Read and parse the manifest at `path`.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Write the manifest to `path` as pretty-printed JSON, replacing
    /// whatever was there. Missing parent directories are created.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let write_err = |source| Error::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, self.to_pretty_string()).map_err(write_err)
    }

    /// Render as JSON with two-space indentation and a trailing newline.
    pub fn to_pretty_string(&self) -> String {
        // Serializing a map of `Value`s cannot fail.
        let mut out = serde_json::to_string_pretty(self).unwrap_or_default();
        out.push('\n');
        out
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// The `name` field, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    /// Stamp a freshly created project: both `name` and `description`
    /// become the project name.
    pub fn rename(&mut self, project_name: &str) {
        self.insert("name", Value::String(project_name.to_string()));
        self.insert("description", Value::String(project_name.to_string()));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for Manifest {
    fn from(map: Map<String, Value>) -> Self {
        Manifest(map)
    }
}

// ============================================================================
// Merging
// ============================================================================

/// Result of merging a template manifest into a project manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The project already has the template's scripts and dependencies.
    UpToDate,
    /// The manifest the project should be rewritten with.
    Merged(Manifest),
}

/// True when `local` already carries the template's values for every
/// [`REPLACED_FIELDS`] entry. Values are compared structurally; object key
/// order does not matter, and a field missing on both sides matches.
pub fn is_up_to_date(local: &Manifest, remote: &Manifest) -> bool {
    REPLACED_FIELDS
        .iter()
        .all(|field| local.get(field) == remote.get(field))
}

/// Merge the template manifest `remote` into the project manifest `local`.
///
/// | field | merged value |
/// |---|---|
/// | `scripts`, `dependencies`, `devDependencies` | always `remote`'s; dropped if `remote` has none |
/// | any other key present in `local` | `local`'s |
/// | any other key only in `remote` | `remote`'s |
///
/// Keys appear in `remote`'s order, followed by keys only `local` has.
pub fn merge_manifests(local: &Manifest, remote: &Manifest) -> MergeOutcome {
    if is_up_to_date(local, remote) {
        return MergeOutcome::UpToDate;
    }

    let mut merged = remote.0.clone();
    for (key, value) in &local.0 {
        if !REPLACED_FIELDS.contains(&key.as_str()) {
            merged.insert(key.clone(), value.clone());
        }
    }

    MergeOutcome::Merged(Manifest(merged))
}

/// Merge the template manifest at `remote_path` into the project manifest at
/// `local_path`, rewriting `local_path` unless it is already up to date.
pub fn apply_template_manifest(local_path: &Path, remote_path: &Path) -> Result<MergeOutcome, Error> {
    let local = Manifest::read(local_path)?;
    let remote = Manifest::read(remote_path)?;
    let outcome = merge_manifests(&local, &remote);
    if let MergeOutcome::Merged(merged) = &outcome {
        merged.write(local_path)?;
    }
    Ok(outcome)
}

// ============================================================================
// App names
// ============================================================================

static APP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*[A-Za-z0-9]$").expect("app name pattern is valid")
});

/// Check that `name` can be used as a project or component name.
pub fn validate_app_name(name: &str) -> Result<(), Error> {
    if APP_NAME.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidAppName {
            name: name.to_string(),
        })
    }
}
