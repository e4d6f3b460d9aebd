//! The builder drives the operation graph to completion.
//!
//! `update` works in three stages: propagate freshness/demand flags to a
//! fixed point, gate on every runnable operation's preconditions, then
//! repeatedly scan and run. The scan discovers a topologically valid
//! execution order implicitly -- an operation only becomes runnable once
//! its upstream has run -- so no explicit sort is needed. The graph must be
//! acyclic; that is an assembly precondition, not a runtime check.

use tracing::debug;

use crate::artifact::{ArtifactId, ArtifactStore, Slot};
use crate::error::{GraphError, Result};
use crate::operation::Operation;

/// Owns the artifact store and an ordered set of operations wired into a
/// DAG, and drives flag propagation and execution to completion.
#[derive(Default)]
pub struct Builder {
    store: ArtifactStore,
    operations: Vec<Box<dyn Operation>>,
    error: String,
    setup_done: bool,
}

impl Builder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the artifact store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Write access to the artifact store, for feeding externally supplied
    /// artifacts.
    pub fn store_mut(&mut self) -> &mut ArtifactStore {
        &mut self.store
    }

    /// The aggregated precondition report of the last `update`. Empty
    /// means every demanded artifact is now valid.
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Number of operations in the graph.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Constructs and wires the graph exactly once.
    ///
    /// `assemble` receives the artifact store to create slots in and
    /// returns the wired operations. Subsequent calls are no-ops.
    pub fn setup<F>(&mut self, assemble: F)
    where
        F: FnOnce(&mut ArtifactStore) -> Vec<Box<dyn Operation>>,
    {
        if self.setup_done {
            return;
        }
        self.operations = assemble(&mut self.store);
        self.setup_done = true;
        debug!(
            operations = self.operations.len(),
            artifacts = self.store.len(),
            "graph assembled"
        );
    }

    /// Registers external demand for an artifact.
    pub fn mark_needed(&mut self, id: ArtifactId) {
        self.store.set_needed(id, true);
        debug!(artifact = ?id, state = ?self.store.state(id), "demand registered");
    }

    /// Marks an artifact stale, e.g. after an external edit of the data it
    /// was computed from.
    pub fn invalidate(&mut self, id: ArtifactId) {
        self.store.set_valid(id, false);
    }

    /// Convenience read of a produced artifact payload.
    pub fn get<T: 'static>(&self, slot: Slot<T>) -> Result<&T> {
        self.store.get(slot)
    }

    /// Settles the whole graph: propagates flags to a fixed point, gates
    /// on preconditions, then runs every demanded, stale operation whose
    /// inputs are fresh until a full scan executes nothing.
    ///
    /// On a precondition failure the aggregated report is returned as
    /// [`GraphError::Preconditions`] (also available through
    /// [`error`](Self::error)). A failure visible at the upfront gate
    /// stops the update before anything executes; one that only becomes
    /// checkable after upstream stages ran leaves those stages' artifacts
    /// valid, so a later update resumes from the blocked stage.
    pub fn update(&mut self) -> Result<()> {
        self.error.clear();

        self.propagate_to_fixed_point()?;

        // Precondition gate: if any runnable operation cannot run, stop
        // before executing anything.
        self.collect_precondition_failures()?;

        // Scan and run until a full scan executes nothing. Each run
        // strictly reduces the set of operations with has_to_run, so this
        // terminates.
        loop {
            let mut ran = 0usize;
            for op in &mut self.operations {
                if !op.has_to_run(&self.store) {
                    continue;
                }
                if op.can_run(&self.store)?.is_some() {
                    // Became unmet after upstream ran; reported below.
                    continue;
                }
                debug!(operation = op.name(), "running");
                op.run(&mut self.store)?;
                for (_, id) in op.outputs() {
                    if let Some(id) = id {
                        self.store.set_valid(id, true);
                        self.store.set_needed(id, false);
                    }
                }
                ran += 1;
            }
            if ran == 0 {
                break;
            }
        }

        // Operations left stale and demanded can only be blocked on a
        // precondition that surfaced mid-run.
        self.collect_precondition_failures()
    }

    /// Runs `propagate` across all operations until a full pass changes no
    /// flag. Converges within one round per operation on a chain; the cap
    /// only trips on a non-monotone `propagate` implementation.
    fn propagate_to_fixed_point(&mut self) -> Result<()> {
        let max_rounds = self.operations.len() + 1;
        for round in 1.. {
            let mut changed = false;
            for op in &self.operations {
                changed |= op.propagate(&mut self.store)?;
            }
            if !changed {
                debug!(rounds = round, "flags settled");
                return Ok(());
            }
            if round > max_rounds {
                return Err(GraphError::Divergent { rounds: round });
            }
        }
        unreachable!("loop only exits via return")
    }

    /// Collects `"<name>: <reason>"` lines for every runnable operation
    /// with an unmet precondition into the aggregated error string.
    fn collect_precondition_failures(&mut self) -> Result<()> {
        let mut report = String::new();
        for op in &self.operations {
            if !op.has_to_run(&self.store) {
                continue;
            }
            if let Some(reason) = op.can_run(&self.store)? {
                report.push_str(op.name());
                report.push_str(": ");
                report.push_str(&reason);
                report.push('\n');
            }
        }
        if report.is_empty() {
            Ok(())
        } else {
            self.error = report.clone();
            Err(GraphError::Preconditions(report))
        }
    }
}
