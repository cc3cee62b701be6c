//! scaffold: create projects from templates and keep them in sync.
//!
//! The `scaffold-cli` binary creates a project (`init`) from a template and
//! later pulls template changes back into it (`update`). This library exposes
//! the manifest side of that: reading `package.json`, and merging a template
//! manifest into a project manifest.
//!
//! # Merging a template into a project
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let outcome = scaffold::apply_template_manifest(
//!     Path::new("package.json"),
//!     Path::new(".temp/package.json"),
//! )?;
//! if outcome == scaffold::MergeOutcome::UpToDate {
//!     println!("nothing to do");
//! }
//! # Ok::<(), scaffold::Error>(())
//! ```
//!
//! The template always owns `scripts`, `dependencies` and `devDependencies`;
//! every other field the project sets is kept.

pub use sfhelper_manifest::{
    Error, MANIFEST_FILE, Manifest, MergeOutcome, REPLACED_FIELDS, SCRATCH_DIR, STALE_PATHS,
    SYNC_PATHS, apply_template_manifest, is_up_to_date, merge_manifests, validate_app_name,
};

#[cfg(feature = "cli")]
pub use sfhelper_cli as cli;
