//! Template fetching: resolving template references and materializing
//! templates on disk.

use flate2::read::GzDecoder;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::debug;

const USER_AGENT: &str = concat!("scaffold-cli/", env!("CARGO_PKG_VERSION"));
const DEFAULT_GITHUB_REF: &str = "master";

/// Errors from resolving or fetching a template.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("template reference is empty")]
    EmptyReference,

    #[error(
        "unsupported template reference '{0}' \
         (expected direct:<url>, github:<owner>/<repo>[#<ref>], or file:<path>)"
    )]
    Unsupported(String),

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("requesting {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("downloading {url}: server responded with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("unpacking template archive from {url}: {source}")]
    Unpack {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("template directory {path} does not exist")]
    MissingLocal { path: String },

    #[error("materializing template at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> FetchError + '_ {
    move |source| FetchError::Io {
        path: path.display().to_string(),
        source,
    }
}

// ============================================================================
// Template references
// ============================================================================

/// Where a template lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A gzip tarball served over HTTP(S). A single top-level directory in
    /// the archive is stripped.
    Archive { url: String },
    /// A template directory on the local filesystem.
    Local { path: PathBuf },
}

impl TemplateSource {
    /// Resolve a template reference. Relative local paths are taken relative
    /// to `base`.
    ///
    /// Accepted forms:
    /// - `direct:<url>`: an HTTP(S) tarball
    /// - `github:<owner>/<repo>[#<ref>]`, or the bare `<owner>/<repo>[#<ref>]`
    /// - `file:<path>`, or the path of an existing directory
    pub fn parse(reference: &str, base: &Path) -> Result<Self, FetchError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(FetchError::EmptyReference);
        }
        let unsupported = || FetchError::Unsupported(reference.to_string());

        if let Some(url) = reference.strip_prefix("direct:") {
            let url = url.trim();
            if url.starts_with("https://") || url.starts_with("http://") {
                return Ok(TemplateSource::Archive {
                    url: url.to_string(),
                });
            }
            return Err(unsupported());
        }
        if let Some(path) = reference.strip_prefix("file:") {
            return Ok(TemplateSource::Local {
                path: base.join(path.trim()),
            });
        }
        if let Some(repo) = reference.strip_prefix("github:") {
            return github_archive(repo.trim()).ok_or_else(unsupported);
        }

        let local = base.join(reference);
        if local.is_dir() {
            return Ok(TemplateSource::Local { path: local });
        }
        github_archive(reference).ok_or_else(unsupported)
    }
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::Archive { url } => write!(f, "{url}"),
            TemplateSource::Local { path } => write!(f, "{}", path.display()),
        }
    }
}

/// `owner/repo[#ref]` to the GitHub archive tarball of that ref.
fn github_archive(repo: &str) -> Option<TemplateSource> {
    let (repo, git_ref) = repo.split_once('#').unwrap_or((repo, DEFAULT_GITHUB_REF));
    let (owner, name) = repo.split_once('/')?;
    let is_segment = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if !is_segment(owner) || !is_segment(name) || git_ref.is_empty() {
        return None;
    }
    Some(TemplateSource::Archive {
        url: format!("https://github.com/{owner}/{name}/archive/{git_ref}.tar.gz"),
    })
}

// ============================================================================
// Fetching
// ============================================================================

/// Materializes templates on disk.
pub trait Fetcher {
    /// Place the template's files directly inside `dest`, which must be
    /// missing or empty.
    ///
    /// The template is staged next to `dest` first, and the staging
    /// directory is removed whatever happens. A failed download, unpack or
    /// copy leaves `dest` as it was; a failure while moving the staged files
    /// into `dest` can leave it holding part of the template.
    fn fetch(&self, source: &TemplateSource, dest: &Path) -> Result<(), FetchError>;
}

/// The default fetcher: downloads archives over HTTP and copies local
/// template directories.
pub struct TemplateFetcher {
    client: reqwest::blocking::Client,
}

impl TemplateFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url, "downloading template archive");
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(http_err)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let bytes = response.bytes().map_err(http_err)?;
        debug!(url, size = bytes.len(), "downloaded template archive");
        Ok(bytes.to_vec())
    }
}

impl Fetcher for TemplateFetcher {
    fn fetch(&self, source: &TemplateSource, dest: &Path) -> Result<(), FetchError> {
        // Stage next to `dest` so the final move is a rename on one filesystem.
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(io_err(&parent))?;
        let staging = tempfile::Builder::new()
            .prefix(".scaffold-")
            .tempdir_in(&parent)
            .map_err(io_err(&parent))?;

        let root = match source {
            TemplateSource::Archive { url } => {
                let bytes = self.download(url)?;
                let unpack_err = |source| FetchError::Unpack {
                    url: url.clone(),
                    source,
                };
                unpack_archive(&bytes, staging.path()).map_err(unpack_err)?;
                template_root(staging.path()).map_err(unpack_err)?
            }
            TemplateSource::Local { path } => {
                if !path.is_dir() {
                    return Err(FetchError::MissingLocal {
                        path: path.display().to_string(),
                    });
                }
                debug!(path = %path.display(), "copying local template");
                crate::sync::copy_tree(path, staging.path()).map_err(io_err(path))?;
                staging.path().to_path_buf()
            }
        };

        move_contents(&root, dest).map_err(io_err(dest))?;
        staging.close().map_err(io_err(&parent))
    }
}

/// Unpack a gzip tarball into `dest`.
pub fn unpack_archive(bytes: &[u8], dest: &Path) -> io::Result<()> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = Archive::new(decoder);
    archive.unpack(dest)
}

/// The directory holding the template inside an unpacked archive: the single
/// top-level directory if the archive has exactly one entry and it is a
/// directory, otherwise `dir` itself.
pub fn template_root(dir: &Path) -> io::Result<PathBuf> {
    let entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    if let [only] = entries.as_slice() {
        if only.file_type()?.is_dir() {
            return Ok(only.path());
        }
    }
    Ok(dir.to_path_buf())
}

fn move_contents(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        fs::rename(entry.path(), to.join(entry.file_name()))?;
    }
    Ok(())
}
