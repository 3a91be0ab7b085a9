//! Name-based access to a registry.

use crate::collection::Collection;
use crate::engine::{CommitSummary, ContentAddressable, LoadRange};
use crate::error::CollectionError;
use crate::registry::{NamedCollection, Registry};
use mediavc_core::CommitOptions;
use mediavc_proto::Record;

/// Records per page when scanning the persisted registry backwards.
pub const VIEW_PAGE_SIZE: usize = 10;

/// Looks collections up by name, newest registration first.
pub struct RegistryView<'a, R> {
    registry: &'a mut Registry<R>,
}

impl<'a, R: Record> RegistryView<'a, R> {
    /// Wrap a registry.
    #[must_use]
    pub fn new(registry: &'a mut Registry<R>) -> Self {
        Self { registry }
    }

    /// The wrapped registry.
    #[must_use]
    pub fn registry(&self) -> &Registry<R> {
        self.registry
    }

    /// Most recent collection registered as `name`.
    ///
    /// Looks at staged collections first, then the loaded page, then scans
    /// the persisted registry from the end in pages of [`VIEW_PAGE_SIZE`].
    /// A scan leaves the matching page loaded.
    ///
    /// # Errors
    ///
    /// Returns error if a page cannot be loaded.
    pub fn get_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<&mut NamedCollection<R>>, CollectionError> {
        RegistryView::new(&mut *self.registry).into_named(name)
    }

    /// Like [`RegistryView::get_by_name`], but consumes the view so the
    /// collection borrows the registry itself.
    ///
    /// # Errors
    ///
    /// Returns error if a page cannot be loaded.
    pub fn into_named(
        self,
        name: &str,
    ) -> Result<Option<&'a mut NamedCollection<R>>, CollectionError> {
        let registry = self.registry;
        if let Some(pos) = registry.last_added_position(name) {
            return Ok(registry.get_by_index_added_mut(pos));
        }
        if let Some(pos) = registry.last_loaded_position(name) {
            return Ok(registry.get_by_index_loaded_mut(pos));
        }

        let len = registry.persisted_size()?;
        let mut found = None;
        for page in 0..len.div_ceil(VIEW_PAGE_SIZE) {
            let end = len - page * VIEW_PAGE_SIZE;
            let start = end.saturating_sub(VIEW_PAGE_SIZE);
            registry.load(LoadRange::new(start, end - start))?;
            found = registry.last_loaded_position(name);
            if found.is_some() {
                tracing::debug!(name, page, start, "Found collection in registry page");
                break;
            }
        }
        Ok(match found {
            Some(pos) => registry.get_by_index_loaded_mut(pos),
            None => None,
        })
    }

    /// Stage `collection` under `name`.
    pub fn add(&mut self, name: impl Into<String>, collection: Collection<R>) {
        self.registry.add_collection(name, collection);
    }

    /// Commit only the collection registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns error if a pointer cannot be encoded or a write fails.
    pub fn commit(
        &mut self,
        name: &str,
        options: &CommitOptions<'_>,
    ) -> Result<CommitSummary, CollectionError> {
        self.registry.commit_collection(Some(name), options)
    }

    /// See [`Registry::load`].
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot be loaded.
    pub fn load(&mut self, range: LoadRange) -> Result<Vec<&NamedCollection<R>>, CollectionError> {
        self.registry.load(range)
    }
}
