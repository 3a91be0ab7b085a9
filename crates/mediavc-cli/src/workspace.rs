//! Local state behind the CLI: one registry of media collections persisted
//! in `SQLite`.

use crate::config::CliConfig;
use crate::persistence::SqliteStore;
use anyhow::{anyhow, Context, Result};
use mediavc_collection::{
    import_collection_complete, import_collection_version, retrieve_registry, CollectionConfig,
    CommitOptions, CommitSummary, ContentAddressable, Ed25519Signer, LoadRange, Media,
    MediaCollection, MediaNode, MediaRegistry, NamedCollection, PullOutcome, RegistryView,
};
use mediavc_core::{Block, Version};
use mediavc_relay::HttpRelay;
use std::path::Path;
use std::sync::Arc;

/// Ref under which the registry's store root is saved.
pub const REGISTRY_REF: &str = "registry";

/// Registry plus the stores it lives in.
pub struct Workspace {
    store: Arc<SqliteStore>,
    collections: CollectionConfig,
    registry: MediaRegistry,
    signer: Option<Ed25519Signer>,
}

impl Workspace {
    /// Open the database named by `config`, creating the registry on first use.
    ///
    /// # Errors
    ///
    /// Returns error if the database, the signing key or the saved registry
    /// cannot be read.
    pub fn open(config: &CliConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.db_path)
            .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
        Self::with_store(Arc::new(store), config)
    }

    fn with_store(store: Arc<SqliteStore>, config: &CliConfig) -> Result<Self> {
        let signer = config
            .signing_key
            .as_deref()
            .map(Ed25519Signer::from_encoded_seed)
            .transpose()
            .context("Invalid MEDIAVC_SIGNING_KEY")?;

        let collections = CollectionConfig::with_chunk_size(store.clone(), config.chunk_size);
        let registry = match store.load_ref(REGISTRY_REF)? {
            Some(root) => retrieve_registry(root, &collections)?,
            None => MediaRegistry::create(&collections),
        };

        Ok(Self {
            store,
            collections,
            registry,
            signer,
        })
    }

    /// Whether commits are signed.
    #[must_use]
    pub fn is_signing(&self) -> bool {
        self.signer.is_some()
    }

    fn named(&mut self, name: &str) -> Result<&mut NamedCollection<MediaNode>> {
        RegistryView::new(&mut self.registry)
            .into_named(name)?
            .ok_or_else(|| anyhow!("No collection named {name}"))
    }

    /// Commit the registry pointer for `name` and save the registry root.
    fn register(&mut self, name: &str, comment: &str) -> Result<CommitSummary> {
        let options = commit_options(self.signer.as_ref(), comment);
        let summary = RegistryView::new(&mut self.registry).commit(name, &options)?;
        if let Some(root) = self.registry.version_store_root() {
            self.store.save_ref(REGISTRY_REF, &root)?;
        }
        Ok(summary)
    }

    /// Add a file to the collection `name`, creating the collection if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a commit fails.
    pub fn add_file(&mut self, name: &str, path: &Path, comment: &str) -> Result<CommitSummary> {
        let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let node = MediaNode::new(
            uuid::Uuid::new_v4().to_string(),
            chrono::Utc::now().timestamp_millis(),
            comment,
            Media::new(file_name, guess_mime_type(path), data),
        );
        self.add_node(name, node, comment)
    }

    fn add_node(&mut self, name: &str, node: MediaNode, comment: &str) -> Result<CommitSummary> {
        let options = commit_options(self.signer.as_ref(), comment);
        let mut view = RegistryView::new(&mut self.registry);

        let summary = match view.get_by_name(name)? {
            Some(named) => {
                named.add(node);
                named.commit(&options)?
            }
            None => {
                let mut collection = MediaCollection::create(&self.collections);
                collection.add(node);
                let summary = collection.commit(&options)?;
                view.add(name, collection);
                summary
            }
        };

        self.register(name, &format!("update {name}"))?;
        tracing::info!(name, current_root = ?summary.current_root, "Added media");
        Ok(summary)
    }

    /// Records of the collection `name`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the collection is unknown or cannot be loaded.
    pub fn list(&mut self, name: &str) -> Result<Vec<MediaNode>> {
        let named = self.named(name)?;
        Ok(named.load(LoadRange::all())?.into_iter().cloned().collect())
    }

    /// Version log of the collection `name`, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the collection is unknown.
    pub fn log(&mut self, name: &str) -> Result<Vec<Version>> {
        Ok(self.named(name)?.log())
    }

    /// Bundle of the collection `name`.
    ///
    /// # Errors
    ///
    /// Returns error if the collection is unknown or has nothing committed.
    pub fn export(&mut self, name: &str, complete: bool) -> Result<Block> {
        let named = self.named(name)?;
        let block = if complete {
            named.export_complete()?
        } else {
            named.export_current_version()?
        };
        Ok(block)
    }

    /// Register a bundle's collection as `name`.
    ///
    /// A complete bundle keeps its lineage. A version bundle has none, so its
    /// records are copied into a new collection.
    ///
    /// # Errors
    ///
    /// Returns error if the bundle is malformed or a commit fails.
    pub fn import(&mut self, name: &str, bundle: &[u8], complete: bool) -> Result<CommitSummary> {
        let collection: MediaCollection = if complete {
            import_collection_complete(bundle, &self.collections)?
        } else {
            let mut imported: MediaCollection = import_collection_version(bundle, &self.collections)?;
            let records: Vec<MediaNode> =
                imported.load(LoadRange::all())?.into_iter().cloned().collect();
            let mut collection = MediaCollection::create(&self.collections);
            for record in records {
                collection.add(record);
            }
            collection.commit(&commit_options(self.signer.as_ref(), &format!("import {name}")))?;
            collection
        };

        RegistryView::new(&mut self.registry).add(name, collection);
        self.register(name, &format!("import {name}"))
    }

    /// Upload the collection `name` and the registry to a relay.
    ///
    /// Returns the collection's store id.
    ///
    /// # Errors
    ///
    /// Returns error if the collection is unknown or the relay fails.
    pub async fn push(&mut self, name: &str, relay: &HttpRelay) -> Result<String> {
        let response = self.named(name)?.push(relay).await?;
        self.registry.push(relay).await?;
        Ok(response.store_id)
    }

    /// Fast-forward the collection `name` from a relay and record the new head.
    ///
    /// # Errors
    ///
    /// Returns error if the collection is unknown or the relay fails.
    pub async fn pull(&mut self, name: &str, relay: &HttpRelay) -> Result<PullOutcome> {
        let outcome = self.named(name)?.pull(relay).await?;
        if matches!(outcome, PullOutcome::FastForward | PullOutcome::Overwrote) {
            self.register(name, &format!("pull {name}"))?;
        }
        Ok(outcome)
    }

    /// Whether the relay has versions of `name` not held locally.
    ///
    /// # Errors
    ///
    /// Returns error if the collection is unknown.
    pub async fn has_remote_updates(&mut self, name: &str, relay: &HttpRelay) -> Result<bool> {
        self.named(name)?;
        Ok(self
            .registry
            .are_remote_updates_for_loaded_collection(name, relay)
            .await)
    }

    /// Whether the head of `name` carries a valid signature from the
    /// configured key.
    ///
    /// # Errors
    ///
    /// Returns error if no signing key is configured or the collection is
    /// unknown.
    pub fn verify(&mut self, name: &str) -> Result<bool> {
        let key = self
            .signer
            .as_ref()
            .map(Ed25519Signer::verifying_key)
            .context("MEDIAVC_SIGNING_KEY is not set")?;
        Ok(self.named(name)?.verify(&key))
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("collections", &self.collections)
            .field("signing", &self.is_signing())
            .finish_non_exhaustive()
    }
}

fn commit_options<'a>(signer: Option<&'a Ed25519Signer>, comment: &str) -> CommitOptions<'a> {
    let options = CommitOptions::comment(comment);
    match signer {
        Some(signer) => options.with_signer(signer),
        None => options,
    }
}

fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediavc_core::BlockStore;

    fn workspace(store: &Arc<SqliteStore>, signing_key: Option<String>) -> Workspace {
        let config = CliConfig {
            chunk_size: 64,
            signing_key,
            ..CliConfig::default()
        };
        Workspace::with_store(store.clone(), &config).unwrap()
    }

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn added_files_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let mut ws = workspace(&store, None);
        let photo = write_file(dir.path(), "cat.jpg", &[7u8; 200]);
        let clip = write_file(dir.path(), "clip.mp4", b"moov");
        ws.add_file("/pets", &photo, "first").unwrap();
        ws.add_file("/pets", &clip, "second").unwrap();
        ws.add_file("/work", &photo, "other").unwrap();

        let mut reopened = workspace(&store, None);
        let records = reopened.list("/pets").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].media.name, "cat.jpg");
        assert_eq!(records[0].media.mime_type, "image/jpeg");
        assert_eq!(records[0].media.data, vec![7u8; 200]);
        assert_eq!(records[1].media.mime_type, "video/mp4");
        assert_eq!(reopened.log("/pets").unwrap().len(), 2);
        assert_eq!(reopened.list("/work").unwrap().len(), 1);
    }

    #[test]
    fn unknown_collection_is_an_error() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut ws = workspace(&store, None);
        assert!(ws.list("/missing").is_err());
        assert!(ws.export("/missing", true).is_err());
    }

    #[test]
    fn export_then_import_under_new_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut ws = workspace(&store, None);
        let file = write_file(dir.path(), "note.txt", b"hello");
        ws.add_file("/a", &file, "one").unwrap();
        ws.add_file("/a", &file, "two").unwrap();

        let complete = ws.export("/a", true).unwrap();
        let single = ws.export("/a", false).unwrap();

        let other = Arc::new(SqliteStore::in_memory().unwrap());
        let mut target = workspace(&other, None);
        target.import("/copy", &complete.bytes, true).unwrap();
        target.import("/snapshot", &single.bytes, false).unwrap();

        assert_eq!(target.log("/copy").unwrap().len(), 2);
        assert_eq!(target.list("/copy").unwrap().len(), 2);
        assert_eq!(target.log("/snapshot").unwrap().len(), 1);
        assert_eq!(target.list("/snapshot").unwrap().len(), 2);
        assert!(other.size().unwrap() > 0);
    }

    #[test]
    fn signed_commits_verify() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let seed = Ed25519Signer::generate().encoded_seed();
        let mut ws = workspace(&store, Some(seed));
        let file = write_file(dir.path(), "a.png", b"png");
        ws.add_file("/signed", &file, "").unwrap();
        assert!(ws.verify("/signed").unwrap());

        let other_seed = Ed25519Signer::generate().encoded_seed();
        let mut stranger = workspace(&store, Some(other_seed));
        assert!(!stranger.verify("/signed").unwrap());

        let mut unsigned = workspace(&store, None);
        assert!(unsigned.verify("/signed").is_err());
    }

    #[test]
    fn invalid_signing_key_is_rejected() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let config = CliConfig {
            signing_key: Some("not a key".to_string()),
            ..CliConfig::default()
        };
        assert!(Workspace::with_store(store, &config).is_err());
    }

    #[test]
    fn mime_types_follow_extension() {
        assert_eq!(guess_mime_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(guess_mime_type(Path::new("a.webm")), "video/webm");
        assert_eq!(guess_mime_type(Path::new("noext")), "application/octet-stream");
    }
}
