//! Artifacts -- flagged, type-erased data slots exchanged between
//! operations.
//!
//! All artifacts live in one [`ArtifactStore`] arena; operations refer to
//! them by [`ArtifactId`]. Typed access goes through the phantom-typed
//! [`Slot`] handle, so a payload written as one type can only be read back
//! as that type.

use std::any::Any;
use std::marker::PhantomData;

use crate::error::{GraphError, Result};

/// Stable index of an artifact inside the store.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArtifactId(u32);

impl ArtifactId {
    fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// A typed handle to an artifact.
///
/// `Slot<T>` is `Copy` regardless of `T`; it only carries the id and the
/// payload type.
pub struct Slot<T> {
    id: ArtifactId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Slot<T> {
    /// The untyped id, as referenced from operation port lists.
    pub fn id(&self) -> ArtifactId {
        self.id
    }
}

impl<T> Copy for Slot<T> {}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> std::fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Slot").field(&self.id).finish()
    }
}

/// The four flag states of an artifact.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArtifactState {
    /// Invalid and not demanded.
    IdleStale,
    /// Invalid but demanded; work is outstanding.
    Pending,
    /// Valid but not demanded.
    IdleFresh,
    /// Valid and demanded.
    FreshInUse,
}

struct ArtifactCell {
    name: String,
    valid: bool,
    needed: bool,
    payload: Option<Box<dyn Any>>,
}

/// Arena of artifacts with their freshness/demand flags.
#[derive(Default)]
pub struct ArtifactStore {
    cells: Vec<ArtifactCell>,
}

impl ArtifactStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an artifact slot for payloads of type `T`. New artifacts start
    /// invalid and not needed.
    pub fn add<T: 'static>(&mut self, name: impl Into<String>) -> Slot<T> {
        let id = ArtifactId(self.cells.len() as u32);
        self.cells.push(ArtifactCell {
            name: name.into(),
            valid: false,
            needed: false,
            payload: None,
        });
        Slot {
            id,
            _marker: PhantomData,
        }
    }

    /// Number of artifacts in the store.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// `true` when no artifact has been added.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The artifact's diagnostic name.
    pub fn name(&self, id: ArtifactId) -> &str {
        &self.cells[id.as_index()].name
    }

    /// Freshness flag: the payload reflects its current inputs.
    pub fn is_valid(&self, id: ArtifactId) -> bool {
        self.cells[id.as_index()].valid
    }

    /// Demand flag: some consumer currently requires this artifact.
    pub fn is_needed(&self, id: ArtifactId) -> bool {
        self.cells[id.as_index()].needed
    }

    /// Sets the freshness flag.
    pub fn set_valid(&mut self, id: ArtifactId, valid: bool) {
        self.cells[id.as_index()].valid = valid;
    }

    /// Sets the demand flag.
    pub fn set_needed(&mut self, id: ArtifactId, needed: bool) {
        self.cells[id.as_index()].needed = needed;
    }

    /// The combined flag state.
    pub fn state(&self, id: ArtifactId) -> ArtifactState {
        let cell = &self.cells[id.as_index()];
        match (cell.valid, cell.needed) {
            (false, false) => ArtifactState::IdleStale,
            (false, true) => ArtifactState::Pending,
            (true, false) => ArtifactState::IdleFresh,
            (true, true) => ArtifactState::FreshInUse,
        }
    }

    /// Stores a payload. Only the owning operation writes an artifact; all
    /// consumers read it through [`get`](Self::get).
    pub fn put<T: 'static>(&mut self, slot: Slot<T>, value: T) {
        self.cells[slot.id.as_index()].payload = Some(Box::new(value));
    }

    /// Reads a payload back with its registered type.
    pub fn get<T: 'static>(&self, slot: Slot<T>) -> Result<&T> {
        let cell = &self.cells[slot.id.as_index()];
        let payload = cell.payload.as_ref().ok_or_else(|| GraphError::NotProduced {
            name: cell.name.clone(),
        })?;
        payload
            .downcast_ref::<T>()
            .ok_or_else(|| GraphError::TypeMismatch {
                name: cell.name.clone(),
            })
    }
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (i, cell) in self.cells.iter().enumerate() {
            map.entry(
                &cell.name,
                &format_args!(
                    "#{i} valid={} needed={} produced={}",
                    cell.valid,
                    cell.needed,
                    cell.payload.is_some()
                ),
            );
        }
        map.finish()
    }
}
