//! Quantities -- named, formula-backed scalar values.

use std::fmt;

use crate::formula::CompiledFormula;
use crate::group::Group;

/// Stable index of a quantity inside a resolver's arena.
///
/// Registered quantities keep their handle for the lifetime of the
/// resolver; variant clones occupy the arena tail and are purged on every
/// reset, so their handles never outlive one update cycle.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct QuantityHandle(u32);

impl QuantityHandle {
    /// Creates a handle from a raw arena index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The arena index this handle refers to.
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// A named scalar value computed from a formula.
///
/// The compiled state (`compiled`, `bindings`) is transient: it is rebuilt
/// from `formula` on every resolver update and never persisted.
pub struct Quantity {
    /// Unique name within one binding context.
    pub name: String,
    /// Optional numeric identity used by external lookups.
    pub id: Option<u32>,
    /// Variant tag; `Group::Global` means visible to every variant.
    pub group: Group,
    /// Originally registered as global (pre-clone). Base quantities answer
    /// lookups for every group and have their group reset to global before
    /// each update.
    pub base: bool,
    /// Created by variant cloning; purged on every reset.
    pub extra: bool,
    /// Formula source text.
    pub formula: String,
    /// Cached result of the last calculation.
    pub value: f64,
    /// Stale marker: `true` until the quantity has been recomputed after
    /// the last upstream change.
    pub modified: bool,

    /// Compiled formula, if compilation has happened this cycle.
    pub compiled: Option<Box<dyn CompiledFormula>>,
    /// One binding per compiled read slot, parallel to
    /// `compiled.reads()`. `None` means the slot is still unbound.
    pub bindings: Vec<Option<QuantityHandle>>,
}

impl Quantity {
    /// Creates a freshly registered quantity. The `base` flag is derived
    /// from the group: quantities registered without a group are base.
    pub fn new(name: impl Into<String>, formula: impl Into<String>, id: Option<u32>, group: Group) -> Self {
        let base = group.is_global();
        Self {
            name: name.into(),
            id,
            group,
            base,
            extra: false,
            formula: formula.into(),
            value: 0.0,
            modified: true,
            compiled: None,
            bindings: Vec::new(),
        }
    }

    /// Creates a per-variant clone of this quantity for `group`.
    ///
    /// The clone shares name, id and formula but is flagged `extra` and is
    /// not base; its compiled state starts empty.
    pub fn clone_for_group(&self, group: Group) -> Self {
        Self {
            name: self.name.clone(),
            id: self.id,
            group,
            base: false,
            extra: true,
            formula: self.formula.clone(),
            value: 0.0,
            modified: true,
            compiled: None,
            bindings: Vec::new(),
        }
    }

    /// Drops compiled state so the next update rebinds from scratch.
    pub fn clear_compiled(&mut self) {
        self.compiled = None;
        self.bindings.clear();
    }

    /// `true` once every read slot has been bound.
    pub fn fully_bound(&self) -> bool {
        match &self.compiled {
            Some(c) => {
                self.bindings.len() == c.reads().len() && self.bindings.iter().all(Option::is_some)
            }
            None => false,
        }
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quantity")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("group", &self.group)
            .field("base", &self.base)
            .field("extra", &self.extra)
            .field("formula", &self.formula)
            .field("value", &self.value)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_registration_is_base() {
        let q = Quantity::new("heel_height", "40", None, Group::Global);
        assert!(q.base);
        assert!(!q.extra);
        assert!(q.modified);
    }

    #[test]
    fn grouped_registration_is_not_base() {
        let q = Quantity::new("girth", "240", Some(7), Group::tag("left"));
        assert!(!q.base);
        assert!(!q.extra);
        assert_eq!(q.id, Some(7));
    }

    #[test]
    fn clone_for_group_flags() {
        let q = Quantity::new("wedge", "heel_height / 2", Some(3), Group::Global);
        let c = q.clone_for_group(Group::tag("right"));
        assert!(c.extra);
        assert!(!c.base);
        assert_eq!(c.group, Group::tag("right"));
        assert_eq!(c.formula, q.formula);
        assert_eq!(c.id, Some(3));
        assert!(c.compiled.is_none());
    }

    #[test]
    fn fully_bound_requires_compiled() {
        let q = Quantity::new("x", "1", None, Group::Global);
        assert!(!q.fully_bound());
    }
}
