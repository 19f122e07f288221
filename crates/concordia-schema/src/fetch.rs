//! # Fetch Collaborators
//!
//! Transport for `$ref` documents. The resolver only sees the
//! [`SchemaFetcher`] trait: one blocking call from a URL to a status code and
//! an optional body. Status and body interpretation (2xx, empty body,
//! malformed JSON) belongs to the resolver, not the fetcher.
//!
//! | Fetcher | Serves |
//! |---------|--------|
//! | [`NoFetcher`] | nothing; the default for a bare compile |
//! | [`StaticFetcher`] | an in-memory URL table |
//! | [`FileFetcher`] | `file://` URLs and plain paths |
//! | `HttpFetcher` | `http://` and `https://` (feature `http`) |
//! | [`RoutingFetcher`] | local mirrors first, then by scheme |

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// What a fetch collaborator returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl FetchResponse {
    pub fn new(status: u16, body: Option<String>) -> Self {
        Self { status, body }
    }

    /// A `200` response carrying `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, Some(body.into()))
    }

    /// A bodiless response with the given status.
    pub fn status(status: u16) -> Self {
        Self::new(status, None)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Synchronous transport for referenced schema documents.
pub trait SchemaFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

// -- NoFetcher ----------------------------------------------------------------

/// Refuses every fetch. Schemas containing `$ref` do not compile with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetcher;

impl SchemaFetcher for NoFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        Err(FetchError::Unsupported {
            url: url.to_string(),
            reason: "no schema fetcher is configured".to_string(),
        })
    }
}

// -- StaticFetcher ------------------------------------------------------------

/// In-memory URL table. Unknown URLs answer `404` with no body.
///
/// Every request is counted, which lets callers check how often a URL was
/// actually fetched.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, FetchResponse>,
    requests: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status `200` at `url`.
    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) -> &mut Self {
        self.responses.insert(url.into(), FetchResponse::ok(body));
        self
    }

    /// Serve an arbitrary response at `url`.
    pub fn insert_status(
        &mut self,
        url: impl Into<String>,
        status: u16,
        body: Option<String>,
    ) -> &mut Self {
        self.responses
            .insert(url.into(), FetchResponse::new(status, body));
        self
    }

    /// Number of times `url` has been fetched.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().get(url).copied().unwrap_or(0)
    }
}

impl SchemaFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        *self.requests.lock().entry(url.to_string()).or_insert(0) += 1;
        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::status(404)))
    }
}

// -- FileFetcher --------------------------------------------------------------

/// Reads `file://` URLs and plain paths from disk. Relative paths resolve
/// against `base_dir` when one is set. A missing file answers `404`.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    base_dir: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn path_for(&self, url: &str) -> Result<PathBuf, FetchError> {
        let path = if url.starts_with("file:") {
            let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            parsed.to_file_path().map_err(|()| FetchError::InvalidUrl {
                url: url.to_string(),
                reason: "not a local file path".to_string(),
            })?
        } else {
            PathBuf::from(url)
        };
        Ok(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        })
    }
}

impl SchemaFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let path = self.path_for(url)?;
        read_file(&path)
    }
}

fn read_file(path: &Path) -> Result<FetchResponse, FetchError> {
    match std::fs::read_to_string(path) {
        Ok(body) => Ok(FetchResponse::ok(body)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FetchResponse::status(404)),
        Err(e) => Err(FetchError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

// -- HttpFetcher --------------------------------------------------------------

/// Blocking HTTP(S) fetcher. The whole response is read into memory.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(timeout: std::time::Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl SchemaFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().map_err(http_err)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(http_err)?;
        Ok(FetchResponse::new(status, Some(body)))
    }
}

// -- RoutingFetcher -----------------------------------------------------------

/// Dispatches each URL to the right transport.
///
/// URLs under a configured mirror prefix are served from the mirror
/// directory. Everything else is routed by scheme: `http`/`https` over the
/// network (when allowed), `file` or no scheme from disk.
#[derive(Debug)]
pub struct RoutingFetcher {
    /// Longest prefix first.
    mirrors: Vec<(String, PathBuf)>,
    files: FileFetcher,
    #[cfg(feature = "http")]
    http: Option<HttpFetcher>,
}

impl RoutingFetcher {
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut mirrors: Vec<_> = config
            .mirrors
            .iter()
            .map(|(prefix, dir)| (prefix.clone(), dir.clone()))
            .collect();
        mirrors.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        let files = match &config.base_dir {
            Some(dir) => FileFetcher::with_base_dir(dir),
            None => FileFetcher::new(),
        };

        Ok(Self {
            mirrors,
            files,
            #[cfg(feature = "http")]
            http: if config.allow_http {
                Some(HttpFetcher::new(config.timeout())?)
            } else {
                None
            },
        })
    }

    /// The file backing `url` if it falls under a mirror prefix. The
    /// remainder must stay inside the mirror directory.
    fn mirror_path(&self, url: &str) -> Option<Result<PathBuf, FetchError>> {
        let (rest, dir) = self.mirrors.iter().find_map(|(prefix, dir)| {
            url.strip_prefix(prefix.as_str()).map(|rest| (rest, dir))
        })?;
        let rest = Path::new(rest.trim_start_matches('/'));
        let contained = rest
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Some(Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: "path escapes the mirror directory".to_string(),
            }));
        }
        Some(Ok(dir.join(rest)))
    }

    fn fetch_remote(&self, url: &str) -> Result<FetchResponse, FetchError> {
        #[cfg(feature = "http")]
        if let Some(http) = &self.http {
            return http.fetch(url);
        }
        Err(FetchError::Unsupported {
            url: url.to_string(),
            reason: "remote fetching is disabled".to_string(),
        })
    }
}

impl SchemaFetcher for RoutingFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        if let Some(path) = self.mirror_path(url) {
            let path = path?;
            tracing::trace!(url, path = %path.display(), "serving reference from mirror");
            return read_file(&path);
        }
        match Url::parse(url) {
            Ok(parsed) => match parsed.scheme() {
                "http" | "https" => self.fetch_remote(url),
                "file" => self.files.fetch(url),
                // Windows drive letters parse as one-letter schemes.
                scheme if scheme.len() == 1 => self.files.fetch(url),
                scheme => Err(FetchError::Unsupported {
                    url: url.to_string(),
                    reason: format!("unsupported scheme '{scheme}'"),
                }),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => self.files.fetch(url),
            Err(e) => Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
