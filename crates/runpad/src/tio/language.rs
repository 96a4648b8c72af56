//! Language resolution for TIO
//!
//! TIO identifies languages by canonical ids such as `python38pr`. Users
//! type informal names, so a query is matched against the cached catalog
//! first and a static alias table second.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::tio::TioError;
use crate::transport::{HttpRequest, Transport};

/// Maximum number of "did you mean" suggestions
pub const MAX_SUGGESTIONS: usize = 10;
/// Number of leading characters a suggestion must share with the query
const SUGGESTION_PREFIX: usize = 3;

/// Informal language names and the TIO id they stand for
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("python", "python38pr"),
    ("python3", "python38pr"),
    ("python3.7", "python3"),
    ("py", "python38pr"),
    ("py3", "python38pr"),
    ("py3.7", "python3"),
    ("py2", "python2"),
    ("py1", "python1"),
    ("pypy", "python3-pypy"),
    ("cython", "python3-cython"),
    ("pyx", "python3-cython"),
    ("javascript", "javascript-node"),
    ("js", "javascript-node"),
    ("node", "javascript-node"),
    ("babel", "javascript-babel-node"),
    ("javascript8", "javascript-v8"),
    ("js8", "javascript-v8"),
    ("ts", "typescript"),
    ("rs", "rust"),
    ("ferris-lang", "rust"),
    ("sh", "bash"),
    ("shell", "bash"),
    ("asm", "assembly"),
    ("c#", "cs"),
    ("c++", "cpp"),
    ("csharp", "cs"),
    ("f#", "fs"),
    ("nimrod", "nim"),
    ("q#", "qs"),
    ("jl", "julia"),
    ("hs", "haskell"),
];

/// Alias lookup table
#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    /// Table holding only the built-in aliases
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in aliases plus `extra`, which wins on conflicts
    pub fn with_extra<'a>(extra: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut table = Self::default();
        for (alias, target) in extra {
            table.aliases.insert(alias.to_lowercase(), target.clone());
        }
        table
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(alias, target)| ((*alias).to_owned(), (*target).to_owned()))
                .collect(),
        }
    }
}

/// Resolve a user-supplied language name against a catalog
///
/// Alias targets are not checked against the catalog.
pub fn resolve(query: &str, catalog: &[String], aliases: &AliasTable) -> Result<String, TioError> {
    let language = query.to_lowercase();

    if catalog.contains(&language) {
        return Ok(language);
    }

    if let Some(target) = aliases.get(&language) {
        return Ok(target.to_owned());
    }

    let prefix: String = language.chars().take(SUGGESTION_PREFIX).collect();
    let close_matches = catalog
        .iter()
        .filter(|candidate| candidate.starts_with(&prefix))
        .take(MAX_SUGGESTIONS)
        .cloned()
        .collect();

    Err(TioError::LanguageUnavailable {
        query: language,
        close_matches,
    })
}

#[derive(Debug)]
struct Snapshot {
    languages: Arc<[String]>,
    fetched_at: Instant,
}

/// Cached copy of the TIO language catalog
///
/// The catalog is fetched on first use. Without a TTL it is kept until
/// [`invalidate`](Self::invalidate) is called. A failed fetch yields an empty
/// catalog and is not cached.
#[derive(Debug)]
pub struct LanguageCatalog {
    url: String,
    ttl: Option<Duration>,
    state: RwLock<Option<Snapshot>>,
}

impl LanguageCatalog {
    pub fn new(url: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            ttl,
            state: RwLock::new(None),
        }
    }

    /// Catalog pre-populated with `languages`, never refreshed unless a TTL is set
    pub fn seeded(
        url: impl Into<String>,
        ttl: Option<Duration>,
        languages: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            url: url.into(),
            ttl,
            state: RwLock::new(Some(Snapshot {
                languages: languages.into_iter().collect(),
                fetched_at: Instant::now(),
            })),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn is_fresh(&self, snapshot: &Snapshot) -> bool {
        match self.ttl {
            Some(ttl) => snapshot.fetched_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Cached languages, if present and fresh
    pub async fn cached(&self) -> Option<Arc<[String]>> {
        let state = self.state.read().await;
        state
            .as_ref()
            .filter(|snapshot| self.is_fresh(snapshot))
            .map(|snapshot| Arc::clone(&snapshot.languages))
    }

    /// Drop the cached catalog so the next lookup refetches it
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }

    /// Return the catalog, fetching it when missing or stale
    pub async fn languages(&self, transport: &dyn Transport) -> Arc<[String]> {
        if let Some(languages) = self.cached().await {
            return languages;
        }

        match self.fetch(transport).await {
            Some(languages) => {
                let languages: Arc<[String]> = languages.into();
                *self.state.write().await = Some(Snapshot {
                    languages: Arc::clone(&languages),
                    fetched_at: Instant::now(),
                });
                debug!(count = languages.len(), "cached language catalog");
                languages
            }
            // Serve a stale catalog over an empty one
            None => match self.state.read().await.as_ref() {
                Some(stale) => Arc::clone(&stale.languages),
                None => Arc::from(Vec::new()),
            },
        }
    }

    async fn fetch(&self, transport: &dyn Transport) -> Option<Vec<String>> {
        let response = match transport.send(HttpRequest::get(&self.url)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %self.url, "language catalog unavailable: {e}");
                return None;
            }
        };

        if !response.is_success() {
            warn!(
                url = %self.url,
                status = response.status,
                "language catalog request failed"
            );
            return None;
        }

        match response.json::<serde_json::Map<String, serde_json::Value>>() {
            Ok(map) => Some(map.into_iter().map(|(id, _)| id).collect()),
            Err(e) => {
                warn!(url = %self.url, "language catalog is not a JSON object: {e}");
                None
            }
        }
    }
}
