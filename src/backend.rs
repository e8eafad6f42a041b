//! Backend capability contract and backend registries
//!
//! A backend adapts one file (one simulation step) of some on-disk format.
//! Datasets never parse files themselves; they consume the values a backend
//! exposes through [`GridBackend`] or [`ParticleBackend`].

use crate::error::{NataError, Result};
use crate::types::{ArrayData, DataType};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// One step of grid data as exposed by a file-format reader
pub trait GridBackend: fmt::Debug {
    /// Backend identifier
    fn name(&self) -> &str;

    /// Simulation iteration of this step
    fn iteration(&self) -> u64;

    /// Simulation time of this step
    fn time_step(&self) -> f64;

    fn time_unit(&self) -> String;

    /// One entry per spatial dimension
    fn axes_names(&self) -> Vec<String>;
    fn axes_labels(&self) -> Vec<String>;
    fn axes_units(&self) -> Vec<String>;
    fn axes_min(&self) -> Vec<f64>;
    fn axes_max(&self) -> Vec<f64>;

    /// Read the raw array of this step
    fn dataset(&self) -> Result<ArrayData>;

    fn dataset_name(&self) -> String;
    fn dataset_label(&self) -> String;
    fn dataset_unit(&self) -> String;

    /// Source this step was read from
    fn location(&self) -> Option<&Path>;

    fn shape(&self) -> Vec<usize>;

    fn dim(&self) -> usize {
        self.shape().len()
    }

    fn dtype(&self) -> DataType;
}

/// One step of particle data as exposed by a file-format reader
pub trait ParticleBackend: fmt::Debug {
    /// Backend identifier
    fn name(&self) -> &str;

    fn iteration(&self) -> u64;

    fn time_step(&self) -> f64;

    fn time_unit(&self) -> String;

    /// Species name
    fn dataset_name(&self) -> String;

    fn location(&self) -> Option<&Path>;

    fn num_particles(&self) -> usize;

    /// One entry per particle quantity
    fn quantity_names(&self) -> Vec<String>;
    fn quantity_labels(&self) -> Vec<String>;
    fn quantity_units(&self) -> Vec<String>;

    /// Read one 1-d array per quantity, in `quantity_names` order
    fn dataset(&self) -> Result<Vec<ArrayData>>;
}

/// Backends that can recognise and open a source on their own
pub trait DetectBackend: Sized {
    /// Name under which the backend is registered
    const NAME: &'static str;

    /// Cheap check whether `source` is readable by this backend
    fn is_valid_backend(source: &Path) -> bool;

    /// Open `source`
    fn open(source: &Path) -> Result<Self>;
}

/// A registered backend: its detection check and an opener producing `B`
pub struct BackendEntry<B: ?Sized> {
    name: &'static str,
    is_valid: fn(&Path) -> bool,
    open: fn(&Path) -> Result<Box<B>>,
}

impl<B: ?Sized> BackendEntry<B> {
    pub fn new(
        name: &'static str,
        is_valid: fn(&Path) -> bool,
        open: fn(&Path) -> Result<Box<B>>,
    ) -> Self {
        Self {
            name,
            is_valid,
            open,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_valid_backend(&self, source: &Path) -> bool {
        (self.is_valid)(source)
    }

    pub fn open(&self, source: &Path) -> Result<Box<B>> {
        (self.open)(source)
    }
}

impl<B: ?Sized> Clone for BackendEntry<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ?Sized> Copy for BackendEntry<B> {}

impl<B: ?Sized> fmt::Debug for BackendEntry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendEntry")
            .field("name", &self.name)
            .finish()
    }
}

/// Ordered list of candidate backends for one dataset kind
///
/// Detection scans the entries in registration order and picks the first
/// whose validity check accepts the source.
pub struct BackendRegistry<B: ?Sized> {
    entries: Vec<BackendEntry<B>>,
}

/// Registry of grid backends
pub type GridBackendRegistry = BackendRegistry<dyn GridBackend>;

/// Registry of particle backends
pub type ParticleBackendRegistry = BackendRegistry<dyn ParticleBackend>;

impl<B: ?Sized> Default for BackendRegistry<B> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<B: ?Sized> Clone for BackendRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<B: ?Sized> fmt::Debug for BackendRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<B: ?Sized> BackendRegistry<B> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the end of the scan order
    pub fn push(&mut self, entry: BackendEntry<B>) {
        tracing::debug!(backend = entry.name, "registering backend");
        self.entries.push(entry);
    }

    /// Remove every entry registered under `name`, returning how many were removed
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.name != name);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered backend names in scan order
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// First entry whose validity check accepts `source`
    pub fn detect(&self, source: &Path) -> Result<&BackendEntry<B>> {
        for entry in &self.entries {
            tracing::trace!(backend = entry.name, source = %source.display(), "checking backend");
            if entry.is_valid_backend(source) {
                tracing::debug!(backend = entry.name, source = %source.display(), "backend detected");
                return Ok(entry);
            }
        }
        Err(NataError::NoBackendFound(source.to_path_buf()))
    }

    /// Detect and open the backend for `source`
    pub fn open(&self, source: &Path) -> Result<Box<B>> {
        self.detect(source)?.open(source)
    }

    /// Temporarily empty the registry
    ///
    /// The current entries are restored when the returned handle is dropped.
    pub fn scoped(&mut self) -> RegistryScope<'_, B> {
        let saved = std::mem::take(&mut self.entries);
        RegistryScope {
            registry: self,
            saved,
        }
    }
}

fn open_grid<T>(source: &Path) -> Result<Box<dyn GridBackend>>
where
    T: GridBackend + DetectBackend + 'static,
{
    Ok(Box::new(T::open(source)?))
}

fn open_particle<T>(source: &Path) -> Result<Box<dyn ParticleBackend>>
where
    T: ParticleBackend + DetectBackend + 'static,
{
    Ok(Box::new(T::open(source)?))
}

impl GridBackendRegistry {
    /// Register a grid backend type
    pub fn register<T>(&mut self)
    where
        T: GridBackend + DetectBackend + 'static,
    {
        self.push(BackendEntry::new(T::NAME, T::is_valid_backend, open_grid::<T>));
    }
}

impl ParticleBackendRegistry {
    /// Register a particle backend type
    pub fn register<T>(&mut self)
    where
        T: ParticleBackend + DetectBackend + 'static,
    {
        self.push(BackendEntry::new(
            T::NAME,
            T::is_valid_backend,
            open_particle::<T>,
        ));
    }
}

/// Handle returned by [`BackendRegistry::scoped`]
///
/// Derefs to the (initially empty) registry; restores the saved entries on drop.
pub struct RegistryScope<'a, B: ?Sized> {
    registry: &'a mut BackendRegistry<B>,
    saved: Vec<BackendEntry<B>>,
}

impl<B: ?Sized> Deref for RegistryScope<'_, B> {
    type Target = BackendRegistry<B>;

    fn deref(&self) -> &Self::Target {
        &*self.registry
    }
}

impl<B: ?Sized> DerefMut for RegistryScope<'_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.registry
    }
}

impl<B: ?Sized> Drop for RegistryScope<'_, B> {
    fn drop(&mut self) {
        self.registry.entries = std::mem::take(&mut self.saved);
    }
}
