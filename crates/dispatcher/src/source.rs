//! Destination sources and the validity filter applied to them

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use contracts::{ContractError, DestinationId, DestinationSource, SenderGateway};
use observability::record_enumeration_error;
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Source listing the entries of a directory, one destination per entry
///
/// Hidden entries (leading `.`) and names that are not valid UTF-8 are
/// ignored. With `dirs_only`, plain files are ignored too.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    root: PathBuf,
    dirs_only: bool,
}

impl DirectorySource {
    /// Create a source over `root`, listing only sub-directories
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            name: format!("dir:{}", root.display()),
            root,
            dirs_only: true,
        }
    }

    /// Include plain files as candidates
    pub fn with_dirs_only(mut self, dirs_only: bool) -> Self {
        self.dirs_only = dirs_only;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a directory entry qualifies as a candidate
    async fn accept(&self, path: &Path) -> Result<bool, std::io::Error> {
        if !self.dirs_only {
            return Ok(true);
        }
        // follows symlinks so linked session dirs still count
        Ok(fs::metadata(path).await?.is_dir())
    }
}

impl DestinationSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "directory_source_enumerate", skip(self), fields(root = %self.root.display()))]
    async fn enumerate(&self) -> Result<Vec<DestinationId>, ContractError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| ContractError::enumeration(&self.name, e.to_string()))?;

        let mut ids = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(source = %self.name, error = %e, "Directory listing interrupted");
                    break;
                }
            };

            let Ok(name) = entry.file_name().into_string() else {
                debug!(path = %entry.path().display(), "Skipping non UTF-8 entry");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            match self.accept(&entry.path()).await {
                Ok(true) => ids.push(DestinationId::from(name)),
                Ok(false) => {}
                Err(e) => {
                    warn!(source = %self.name, entry = %name, error = %e, "Skipping unreadable entry");
                }
            }
        }

        ids.sort();
        debug!(source = %self.name, candidates = ids.len(), "Directory enumerated");
        Ok(ids)
    }
}

/// In-memory source over a fixed list
///
/// Duplicates are dropped at construction, first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    name: String,
    ids: Vec<DestinationId>,
}

impl StaticSource {
    pub fn new<I, D>(ids: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DestinationId>,
    {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for id in ids {
            let id: DestinationId = id.into();
            if seen.insert(id.clone()) {
                unique.push(id);
            }
        }
        Self {
            name: "static".to_string(),
            ids: unique,
        }
    }

    /// Numbered ids `<prefix>-0 .. <prefix>-(count-1)`
    pub fn numbered(prefix: &str, count: usize) -> Self {
        Self::new((0..count).map(|i| format!("{prefix}-{i}")))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl DestinationSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enumerate(&self) -> Result<Vec<DestinationId>, ContractError> {
        Ok(self.ids.clone())
    }
}

/// Lazy sequence of destinations that currently resolve to a sender
///
/// Each candidate is checked against the gateway only when pulled, so
/// discovery interleaves with delivery. Lookup errors exclude the candidate
/// and never end the sequence.
pub struct ValidDestinations<'a, G> {
    gateway: &'a G,
    candidates: std::vec::IntoIter<DestinationId>,
    seen: HashSet<DestinationId>,
    excluded: u64,
    lookup_errors: u64,
}

impl<'a, G: SenderGateway> ValidDestinations<'a, G> {
    pub fn new(gateway: &'a G, candidates: Vec<DestinationId>) -> Self {
        Self {
            gateway,
            candidates: candidates.into_iter(),
            seen: HashSet::new(),
            excluded: 0,
            lookup_errors: 0,
        }
    }

    /// Next valid destination, or None once the snapshot is exhausted
    pub async fn next(&mut self) -> Option<DestinationId> {
        while let Some(candidate) = self.candidates.next() {
            if !self.seen.insert(candidate.clone()) {
                continue;
            }

            match self.gateway.resolve(&candidate).await {
                Ok(Some(_)) => return Some(candidate),
                Ok(None) => {
                    self.excluded += 1;
                    debug!(destination = %candidate, "No usable session, excluded");
                }
                Err(e) => {
                    self.excluded += 1;
                    self.lookup_errors += 1;
                    record_enumeration_error();
                    warn!(destination = %candidate, error = %e, "Session lookup failed, excluded");
                }
            }
        }
        None
    }

    /// Drain the remaining sequence
    pub async fn collect(mut self) -> Vec<DestinationId> {
        let mut valid = Vec::new();
        while let Some(id) = self.next().await {
            valid.push(id);
        }
        valid
    }

    /// Candidates excluded so far (no session or lookup error)
    pub fn excluded(&self) -> u64 {
        self.excluded
    }

    /// Candidates excluded because their lookup errored
    pub fn lookup_errors(&self) -> u64 {
        self.lookup_errors
    }
}

/// Enumerate `source` and wrap the snapshot in the validity filter
///
/// # Errors
/// Returns the source's enumeration error when the store cannot be read
pub async fn list_valid_destinations<'a, S, G>(
    source: &S,
    gateway: &'a G,
) -> Result<ValidDestinations<'a, G>, ContractError>
where
    S: DestinationSource + Sync,
    G: SenderGateway,
{
    let candidates = source.enumerate().await?;
    debug!(source = source.name(), candidates = candidates.len(), "Candidates enumerated");
    Ok(ValidDestinations::new(gateway, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::{FileGateway, MockConfig, MockGateway, Session};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_directory_source_lists_dirs_sorted() {
        let dir = tempdir().unwrap();
        for name in ["charlie", "alpha", "bravo", ".hidden"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("stray.txt"), "x").unwrap();

        let source = DirectorySource::new(dir.path());
        let ids = source.enumerate().await.unwrap();

        assert_eq!(ids, vec!["alpha".into(), "bravo".into(), DestinationId::from("charlie")]);
    }

    #[tokio::test]
    async fn test_directory_source_files_when_not_dirs_only() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("conv-1"), "").unwrap();

        let source = DirectorySource::new(dir.path()).with_dirs_only(false);
        assert_eq!(source.enumerate().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_directory_source_missing_root() {
        let source = DirectorySource::new("/nonexistent/fanout/sessions");
        let err = source.enumerate().await.unwrap_err();
        assert!(matches!(err, ContractError::Enumeration { .. }));
    }

    #[tokio::test]
    async fn test_static_source_dedups() {
        let source = StaticSource::new(["a", "b", "a", "c", "b"]);
        assert_eq!(source.len(), 3);
        assert_eq!(
            source.enumerate().await.unwrap(),
            vec!["a".into(), "b".into(), DestinationId::from("c")]
        );
    }

    #[tokio::test]
    async fn test_valid_destinations_filters_and_swallows_errors() {
        let gateway = MockGateway::with_config(
            MockConfig::default()
                .with_missing(["stale"])
                .with_fail_resolve(["corrupt"]),
        );
        let source = StaticSource::new(["ok-1", "stale", "corrupt", "ok-2"]);

        let mut valid = list_valid_destinations(&source, &gateway).await.unwrap();
        let mut ids = Vec::new();
        while let Some(id) = valid.next().await {
            ids.push(id);
        }

        assert_eq!(ids, vec!["ok-1".into(), DestinationId::from("ok-2")]);
        assert_eq!(valid.excluded(), 2);
        assert_eq!(valid.lookup_errors(), 1);
    }

    #[tokio::test]
    async fn test_valid_destinations_over_file_store() {
        let dir = tempdir().unwrap();
        let gateway = FileGateway::new(dir.path());
        gateway
            .register(&"live".into(), &Session { recipients: vec!["alice".into()] })
            .await
            .unwrap();
        std::fs::create_dir(dir.path().join("expired")).unwrap();

        let source = DirectorySource::new(dir.path());
        let ids = list_valid_destinations(&source, &gateway)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(ids, vec![DestinationId::from("live")]);
    }
}
