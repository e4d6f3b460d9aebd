//! Deferred binding, variant promotion and ordered evaluation.
//!
//! The resolver owns all quantities in a single arena indexed by
//! [`QuantityHandle`]. Registered quantities keep stable handles; variant
//! clones are appended at the tail during [`Resolver::update`] and purged
//! again by [`Resolver::reset`], so they never survive one update cycle.

use tracing::debug;

use lastform_core::expr::ExprCompiler;
use lastform_core::formula::FormulaCompiler;
use lastform_core::group::Group;
use lastform_core::quantity::{Quantity, QuantityHandle};

use crate::error::{ResolveError, Result};

/// One quantity registration.
///
/// The group is explicit per call; there is no resolver-wide current
/// group.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Quantity name, unique within the resolver.
    pub name: String,
    /// Formula source text.
    pub formula: String,
    /// Optional numeric identity for external lookups.
    pub id: Option<u32>,
    /// Variant group; `None` registers a global (base) quantity.
    pub group: Option<Group>,
}

impl Registration {
    /// Registers a global quantity.
    pub fn global(name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formula: formula.into(),
            id: None,
            group: None,
        }
    }

    /// Registers a quantity in a specific variant group.
    pub fn grouped(
        name: impl Into<String>,
        formula: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            formula: formula.into(),
            id: None,
            group: Some(Group::tag(group)),
        }
    }

    /// Attaches a numeric id.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }
}

/// Outcome of one binding attempt during a resolution pass.
enum BindOutcome {
    /// Every read slot bound; the quantity joins the evaluation order.
    Bound(Vec<Option<QuantityHandle>>),
    /// At least one slot has no resolved provider yet.
    Deferred,
    /// A global reader hit a grouped provider and was split per variant.
    Promoted { clones: Vec<usize> },
}

/// Result of searching the evaluation order for a variable's provider.
enum Provider {
    Found(QuantityHandle),
    /// Only grouped, non-base providers are resolved so far.
    GroupedOnly,
    Missing,
}

/// Resolves a set of named quantities into a safe evaluation order and
/// executes their formulas.
pub struct Resolver {
    compiler: Box<dyn FormulaCompiler>,
    quantities: Vec<Quantity>,
    /// Arena watermark: entries below this index are registered
    /// quantities, entries at or above it are per-update clones.
    registered_len: usize,
    evaluation_order: Vec<QuantityHandle>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Box::new(ExprCompiler))
    }
}

impl Resolver {
    /// Creates a resolver with the given formula compiler.
    pub fn new(compiler: Box<dyn FormulaCompiler>) -> Self {
        Self {
            compiler,
            quantities: Vec::new(),
            registered_len: 0,
            evaluation_order: Vec::new(),
        }
    }

    /// Adds a quantity and returns its stable handle.
    pub fn register(&mut self, registration: Registration) -> QuantityHandle {
        // Clones occupy the arena tail; drop them so the new handle is
        // stable across resets.
        self.purge_clones();
        let group = registration.group.unwrap_or(Group::Global);
        let quantity = Quantity::new(
            registration.name,
            registration.formula,
            registration.id,
            group,
        );
        let handle = QuantityHandle::new(self.quantities.len() as u32);
        self.quantities.push(quantity);
        self.registered_len = self.quantities.len();
        handle
    }

    /// Number of quantities currently in the arena, clones included.
    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Read access to a quantity.
    pub fn quantity(&self, handle: QuantityHandle) -> &Quantity {
        &self.quantities[handle.as_index()]
    }

    /// The cached value of a quantity.
    pub fn value(&self, handle: QuantityHandle) -> f64 {
        self.quantities[handle.as_index()].value
    }

    /// Replaces a quantity's formula text. The change takes effect on the
    /// next [`update`](Self::update).
    pub fn set_formula(&mut self, handle: QuantityHandle, formula: impl Into<String>) {
        let q = &mut self.quantities[handle.as_index()];
        q.formula = formula.into();
        q.modified = true;
        q.clear_compiled();
    }

    /// The current evaluation order, topological over formula reads.
    pub fn evaluation_order(&self) -> &[QuantityHandle] {
        &self.evaluation_order
    }

    /// Ordered, deduplicated non-global groups across all quantities.
    pub fn known_groups(&self) -> Vec<Group> {
        let mut groups: Vec<Group> = Vec::new();
        for q in &self.quantities {
            if !q.group.is_global() && !groups.contains(&q.group) {
                groups.push(q.group.clone());
            }
        }
        groups
    }

    /// Discards all variant clones, resets every base quantity's group to
    /// global, and clears compiled state and the evaluation order.
    ///
    /// Called at the start of every [`update`](Self::update), which makes
    /// update idempotent when no formulas changed.
    pub fn reset(&mut self) {
        self.purge_clones();
        for q in &mut self.quantities {
            if q.base {
                q.group = Group::Global;
            }
            q.clear_compiled();
            q.modified = true;
        }
        self.evaluation_order.clear();
    }

    /// Resolves every quantity into the evaluation order.
    ///
    /// Runs full passes over the open set, binding each quantity's reads
    /// to already-resolved providers. A global quantity that reads a
    /// grouped provider is split into one instance per known group. If a
    /// full pass neither resolves nor promotes anything, the remaining
    /// quantities are reported as undefined-variable or cyclic-reference
    /// failures.
    pub fn update(&mut self) -> Result<()> {
        self.reset();

        let mut open: Vec<usize> = (0..self.quantities.len()).collect();
        let mut pass = 0usize;
        while !open.is_empty() {
            pass += 1;
            let mut resolved = 0usize;
            let mut promoted = 0usize;

            let mut i = 0;
            while i < open.len() {
                let idx = open[i];
                self.ensure_compiled(idx)?;
                match self.try_bind(idx)? {
                    BindOutcome::Bound(bindings) => {
                        self.quantities[idx].bindings = bindings;
                        self.evaluation_order.push(QuantityHandle::new(idx as u32));
                        open.remove(i);
                        resolved += 1;
                    }
                    BindOutcome::Promoted { clones } => {
                        open.extend(clones);
                        promoted += 1;
                        i += 1;
                    }
                    BindOutcome::Deferred => {
                        i += 1;
                    }
                }
            }

            debug!(pass, resolved, promoted, open = open.len(), "resolution pass");
            if resolved == 0 && promoted == 0 {
                return Err(self.stall_error(&open));
            }
        }
        Ok(())
    }

    /// Executes every resolved formula in evaluation order, writing each
    /// result into the quantity's cached value.
    pub fn calculate(&mut self) -> Result<()> {
        for pos in 0..self.evaluation_order.len() {
            let idx = self.evaluation_order[pos].as_index();

            let q = &self.quantities[idx];
            if !q.fully_bound() {
                return Err(ResolveError::NotResolved {
                    name: q.name.clone(),
                });
            }
            let inputs: Vec<f64> = q
                .bindings
                .iter()
                .flatten()
                .map(|&provider| self.quantities[provider.as_index()].value)
                .collect();

            let compiled = q.compiled.as_ref().ok_or_else(|| ResolveError::NotResolved {
                name: q.name.clone(),
            })?;
            let value = compiled.eval(&inputs).map_err(|source| ResolveError::Eval {
                name: q.name.clone(),
                source,
            })?;

            let q = &mut self.quantities[idx];
            q.value = value;
            q.modified = false;
        }
        Ok(())
    }

    /// Looks up a quantity by numeric id, scoped to a group.
    ///
    /// An exact group match wins; base quantities answer for every group.
    pub fn get_quantity(&self, id: u32, group: &Group) -> Result<QuantityHandle> {
        if let Some(idx) = self
            .quantities
            .iter()
            .position(|q| q.id == Some(id) && q.group == *group)
        {
            return Ok(QuantityHandle::new(idx as u32));
        }
        if let Some(idx) = self
            .quantities
            .iter()
            .position(|q| q.id == Some(id) && q.base)
        {
            return Ok(QuantityHandle::new(idx as u32));
        }
        Err(ResolveError::NotFound {
            id,
            group: group.clone(),
        })
    }

    /// Looks up a quantity by name, scoped to a group, with the same
    /// base fallback as [`get_quantity`](Self::get_quantity).
    pub fn get_by_name(&self, name: &str, group: &Group) -> Result<QuantityHandle> {
        if let Some(idx) = self
            .quantities
            .iter()
            .position(|q| q.name == name && q.group == *group)
        {
            return Ok(QuantityHandle::new(idx as u32));
        }
        if let Some(idx) = self.quantities.iter().position(|q| q.name == name && q.base) {
            return Ok(QuantityHandle::new(idx as u32));
        }
        Err(ResolveError::NameNotFound {
            name: name.to_string(),
            group: group.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Truncates the arena back to the registered watermark.
    fn purge_clones(&mut self) {
        self.quantities.truncate(self.registered_len);
    }

    /// Compiles the quantity's formula if it has not been compiled this
    /// cycle.
    fn ensure_compiled(&mut self, idx: usize) -> Result<()> {
        if self.quantities[idx].compiled.is_some() {
            return Ok(());
        }
        let compiled = self
            .compiler
            .compile(&self.quantities[idx].formula)
            .map_err(|source| ResolveError::Compile {
                name: self.quantities[idx].name.clone(),
                source,
            })?;
        self.quantities[idx].compiled = Some(compiled);
        Ok(())
    }

    /// Attempts to bind every read slot of the quantity at `idx` to a
    /// provider already in the evaluation order.
    fn try_bind(&mut self, idx: usize) -> Result<BindOutcome> {
        let reads: Vec<String> = match &self.quantities[idx].compiled {
            Some(c) => c.reads().to_vec(),
            None => {
                return Err(ResolveError::NotResolved {
                    name: self.quantities[idx].name.clone(),
                });
            }
        };
        let reader_group = self.quantities[idx].group.clone();

        let mut bindings = Vec::with_capacity(reads.len());
        for name in &reads {
            match self.find_provider(name, &reader_group) {
                Provider::Found(handle) => bindings.push(Some(handle)),
                Provider::GroupedOnly if reader_group.is_global() => {
                    let clones = self.promote(idx);
                    return Ok(BindOutcome::Promoted { clones });
                }
                Provider::GroupedOnly | Provider::Missing => return Ok(BindOutcome::Deferred),
            }
        }
        Ok(BindOutcome::Bound(bindings))
    }

    /// Searches the evaluation order for a provider of `name` visible from
    /// `reader_group`.
    fn find_provider(&self, name: &str, reader_group: &Group) -> Provider {
        // Exact group match wins over a base fallback.
        for &handle in &self.evaluation_order {
            let q = &self.quantities[handle.as_index()];
            if q.name == name && q.group == *reader_group {
                return Provider::Found(handle);
            }
        }
        for &handle in &self.evaluation_order {
            let q = &self.quantities[handle.as_index()];
            if q.name == name && q.base {
                return Provider::Found(handle);
            }
        }
        // Resolved, but only under variant groups: the reader has to be
        // specialized per group to see it.
        for &handle in &self.evaluation_order {
            let q = &self.quantities[handle.as_index()];
            if q.name == name && !q.base {
                return Provider::GroupedOnly;
            }
        }
        Provider::Missing
    }

    /// Splits the global quantity at `idx` into one instance per known
    /// group: the original is reassigned to the first group, and an extra
    /// clone is appended for every other group. Returns the clones' arena
    /// indices so they can join the open set.
    fn promote(&mut self, idx: usize) -> Vec<usize> {
        let groups = self.known_groups();
        let mut clones = Vec::new();

        let Some((first, rest)) = groups.split_first() else {
            return clones;
        };
        debug!(
            name = %self.quantities[idx].name,
            groups = groups.len(),
            "promoting global quantity to per-variant instances"
        );

        self.quantities[idx].group = first.clone();
        self.quantities[idx].clear_compiled();
        for group in rest {
            let clone = self.quantities[idx].clone_for_group(group.clone());
            clones.push(self.quantities.len());
            self.quantities.push(clone);
        }
        clones
    }

    /// Whether any registered provider of `name` could ever satisfy a
    /// reader in `reader_group`: same group, base, or (for a global
    /// reader) any group at all, since promotion specializes the reader
    /// per known group.
    fn provider_reachable(&self, name: &str, reader_group: &Group) -> bool {
        self.quantities
            .iter()
            .any(|q| q.name == name && (q.group == *reader_group || q.base || reader_group.is_global()))
    }

    /// Builds the diagnostic for a stalled resolution pass: reads with no
    /// reachable provider are reported as undefined variables first,
    /// otherwise every stalled quantity is named as part of a reference
    /// cycle.
    fn stall_error(&self, open: &[usize]) -> ResolveError {
        for &idx in open {
            let Some(compiled) = &self.quantities[idx].compiled else {
                continue;
            };
            for name in compiled.reads() {
                if self.provider_reachable(name, &self.quantities[idx].group) {
                    continue;
                }
                let referenced_by = open
                    .iter()
                    .filter(|&&i| {
                        self.quantities[i].compiled.as_ref().is_some_and(|c| {
                            c.reads().contains(name)
                                && !self.provider_reachable(name, &self.quantities[i].group)
                        })
                    })
                    .map(|&i| self.quantities[i].name.clone())
                    .collect();
                return ResolveError::UndefinedVariable {
                    name: name.clone(),
                    referenced_by,
                };
            }
        }
        ResolveError::CyclicReference {
            names: open.iter().map(|&i| self.quantities[i].name.clone()).collect(),
        }
    }
}
