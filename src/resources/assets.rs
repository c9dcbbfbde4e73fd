//! Asset handles and the shared asset store
//!
//! Assets stream in asynchronously: a handle can exist long before the asset
//! behind it is ready, and a ready asset can be evicted again. Renderers only
//! ever ask "is it ready?" and skip what is not.

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Marker for types stored in [`Assets`]
pub trait Asset: Send + Sync + 'static {
    const KIND: &'static str;
}

/// Typed reference to an asset that may or may not be loaded
pub struct Handle<T> {
    id: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Sentinel that refers to nothing and is never ready
    pub const NONE: Self = Self {
        id: 0,
        _marker: PhantomData,
    };

    pub(crate) const fn from_id(id: u64) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_none(&self) -> bool {
        self.id == 0
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NONE
    }
}

impl<T: Asset> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Handle<{}>(none)", T::KIND)
        } else {
            write!(f, "Handle<{}>({})", T::KIND, self.id)
        }
    }
}

struct Slot<T> {
    path: String,
    value: Option<Arc<T>>,
}

struct Storage<T> {
    slots: BTreeMap<u64, Slot<T>>,
    by_path: HashMap<String, u64>,
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
            by_path: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct AssetsInner {
    storages: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    next_id: u64,
}

impl AssetsInner {
    fn storage<T: Asset>(&self) -> Option<&Storage<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|s| s.downcast_ref::<Storage<T>>())
    }

    fn storage_mut<T: Asset>(&mut self) -> &mut Storage<T> {
        self.storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Storage::<T>::default()))
            .downcast_mut::<Storage<T>>()
            .expect("asset storage registered under the wrong type id")
    }

    fn handle_for_path<T: Asset>(&mut self, path: &str) -> Handle<T> {
        if let Some(id) = self.storage::<T>().and_then(|s| s.by_path.get(path)) {
            return Handle::from_id(*id);
        }

        self.next_id += 1;
        let id = self.next_id;
        let storage = self.storage_mut::<T>();
        storage.by_path.insert(path.to_string(), id);
        storage.slots.insert(
            id,
            Slot {
                path: path.to_string(),
                value: None,
            },
        );
        Handle::from_id(id)
    }
}

/// Thread-safe asset store shared between loaders and the renderer
#[derive(Clone, Default)]
pub struct Assets {
    inner: Arc<RwLock<AssetsInner>>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `path`, registering it as pending on first request
    pub fn request<T: Asset>(&self, path: &str) -> Handle<T> {
        self.inner.write().handle_for_path(path)
    }

    /// Register `value` under `path` as ready
    pub fn insert<T: Asset>(&self, path: &str, value: T) -> Handle<T> {
        let mut inner = self.inner.write();
        let handle = inner.handle_for_path::<T>(path);
        if let Some(slot) = inner.storage_mut::<T>().slots.get_mut(&handle.id) {
            slot.value = Some(Arc::new(value));
        }
        handle
    }

    /// Complete a pending request. Returns false for unknown handles.
    pub fn fulfill<T: Asset>(&self, handle: Handle<T>, value: T) -> bool {
        let mut inner = self.inner.write();
        match inner.storage_mut::<T>().slots.get_mut(&handle.id) {
            Some(slot) => {
                slot.value = Some(Arc::new(value));
                true
            }
            None => false,
        }
    }

    /// Drop the loaded value; the handle stays valid but is no longer ready
    pub fn evict<T: Asset>(&self, handle: Handle<T>) -> Option<Arc<T>> {
        let mut inner = self.inner.write();
        inner
            .storage_mut::<T>()
            .slots
            .get_mut(&handle.id)
            .and_then(|slot| slot.value.take())
    }

    pub fn is_ready<T: Asset>(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn get<T: Asset>(&self, handle: Handle<T>) -> Option<Arc<T>> {
        if handle.is_none() {
            return None;
        }
        let inner = self.inner.read();
        inner
            .storage::<T>()?
            .slots
            .get(&handle.id)?
            .value
            .clone()
    }

    pub fn path<T: Asset>(&self, handle: Handle<T>) -> Option<String> {
        let inner = self.inner.read();
        inner
            .storage::<T>()?
            .slots
            .get(&handle.id)
            .map(|slot| slot.path.clone())
    }

    /// Handles of every ready asset of kind `T`, in registration order
    pub fn enumerate_loaded<T: Asset>(&self) -> Vec<Handle<T>> {
        let inner = self.inner.read();
        inner.storage::<T>().map_or_else(Vec::new, |storage| {
            storage
                .slots
                .iter()
                .filter(|(_, slot)| slot.value.is_some())
                .map(|(id, _)| Handle::from_id(*id))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Blob(u32);

    impl Asset for Blob {
        const KIND: &'static str = "Blob";
    }

    struct Other;

    impl Asset for Other {
        const KIND: &'static str = "Other";
    }

    #[test]
    fn test_none_handle_is_never_ready() {
        let assets = Assets::new();
        assert!(Handle::<Blob>::NONE.is_none());
        assert!(!assets.is_ready(Handle::<Blob>::NONE));
        assert_eq!(Handle::<Blob>::default(), Handle::NONE);
    }

    #[test]
    fn test_request_is_idempotent_and_pending() {
        let assets = Assets::new();
        let a = assets.request::<Blob>("meshes/cube.obj");
        let b = assets.request::<Blob>("meshes/cube.obj");

        assert_eq!(a, b);
        assert!(!a.is_none());
        assert!(!assets.is_ready(a));
        assert_eq!(assets.path(a).as_deref(), Some("meshes/cube.obj"));
    }

    #[test]
    fn test_fulfill_then_evict() {
        let assets = Assets::new();
        let handle = assets.request::<Blob>("blob");

        assert!(assets.fulfill(handle, Blob(7)));
        assert_eq!(*assets.get(handle).unwrap(), Blob(7));

        assets.evict(handle);
        assert!(!assets.is_ready(handle));
        assert!(!assets.fulfill(Handle::<Blob>::from_id(999), Blob(1)));
    }

    #[test]
    fn test_enumerate_loaded_in_order() {
        let assets = Assets::new();
        let first = assets.insert("a", Blob(1));
        let _pending = assets.request::<Blob>("b");
        let third = assets.insert("c", Blob(3));
        assets.insert("other", Other);

        assert_eq!(assets.enumerate_loaded::<Blob>(), vec![first, third]);
        assert_eq!(assets.enumerate_loaded::<Other>().len(), 1);
    }

    #[test]
    fn test_kinds_are_separate() {
        let assets = Assets::new();
        let blob = assets.insert("shared", Blob(1));
        let other = assets.request::<Other>("shared");

        assert_ne!(blob.id(), other.id());
        assert!(!assets.is_ready(other));
    }

    #[test]
    fn test_store_is_shared_across_threads() {
        let assets = Assets::new();
        let handle = assets.request::<Blob>("late");

        let loader = assets.clone();
        std::thread::spawn(move || {
            loader.fulfill(handle, Blob(42));
        })
        .join()
        .unwrap();

        assert!(assets.is_ready(handle));
    }
}
