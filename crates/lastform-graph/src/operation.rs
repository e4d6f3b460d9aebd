//! The operation contract.
//!
//! An operation is a computation step with named input and output ports,
//! each wired to an artifact at assembly time. The scheduler only ever
//! needs the four-method contract: `propagate`, `can_run`, `has_to_run`,
//! `run`. Flag propagation and the run condition are derived from the port
//! lists, so most implementations only provide ports and `run`.

use crate::artifact::{ArtifactId, ArtifactStore};
use crate::error::{GraphError, Result};

/// A computation step in the operation graph.
///
/// Port lists pair a port name with the wired artifact, `None` while
/// unwired. Unwired ports are a configuration error and surface as
/// [`GraphError::NotWired`] the first time the operation is touched.
pub trait Operation {
    /// Operation name, used in error aggregation and logs.
    fn name(&self) -> &str;

    /// Input ports. The artifacts are owned by upstream operations.
    fn inputs(&self) -> Vec<(&'static str, Option<ArtifactId>)>;

    /// Output ports. This operation is the exclusive writer of these
    /// artifacts.
    fn outputs(&self) -> Vec<(&'static str, Option<ArtifactId>)>;

    /// Operation-specific precondition, e.g. a required parameter being
    /// non-empty. An `Err` is recoverable: the reason is aggregated into
    /// the builder's error string and nothing is executed.
    fn precondition(&self, store: &ArtifactStore) -> std::result::Result<(), String> {
        let _ = store;
        Ok(())
    }

    /// Recomputes the output payloads from the current input payloads.
    ///
    /// Only called when [`has_to_run`](Operation::has_to_run) held at
    /// scheduling time; the scheduler marks every output `valid = true,
    /// needed = false` afterwards.
    fn run(&mut self, store: &mut ArtifactStore) -> Result<()>;

    /// Port names that were never wired.
    fn missing_connections(&self) -> Vec<&'static str> {
        self.inputs()
            .iter()
            .chain(self.outputs().iter())
            .filter(|(_, id)| id.is_none())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Propagates staleness forward and demand backward by one hop.
    ///
    /// Monotone: flags only move towards invalid/needed, so repeated calls
    /// across the whole graph converge. Returns `true` iff a flag changed.
    fn propagate(&self, store: &mut ArtifactStore) -> Result<bool> {
        let (inputs, outputs) = self.wired_ports()?;
        let mut changed = false;

        // Staleness forward: any invalid input invalidates the outputs.
        if inputs.iter().any(|&id| !store.is_valid(id)) {
            for &id in &outputs {
                if store.is_valid(id) {
                    store.set_valid(id, false);
                    changed = true;
                }
            }
        }

        // Demand backward: a needed output makes every input needed.
        if outputs.iter().any(|&id| store.is_needed(id)) {
            for &id in &inputs {
                if !store.is_needed(id) {
                    store.set_needed(id, true);
                    changed = true;
                }
            }
        }

        Ok(changed)
    }

    /// `true` iff every input is valid and some output is both invalid and
    /// needed.
    fn has_to_run(&self, store: &ArtifactStore) -> bool {
        let Ok((inputs, outputs)) = self.wired_ports() else {
            return false;
        };
        inputs.iter().all(|&id| store.is_valid(id))
            && outputs
                .iter()
                .any(|&id| !store.is_valid(id) && store.is_needed(id))
    }

    /// Validates wiring (hard [`GraphError::NotWired`]) and the
    /// precondition (soft). Returns `Ok(None)` when the operation may run,
    /// `Ok(Some(reason))` when the precondition is unmet.
    fn can_run(&self, store: &ArtifactStore) -> Result<Option<String>> {
        let missing = self.missing_connections();
        if !missing.is_empty() {
            return Err(GraphError::NotWired {
                operation: self.name().to_string(),
                ports: missing.iter().map(|p| p.to_string()).collect(),
            });
        }
        Ok(self.precondition(store).err())
    }

    /// The wired input and output ids, erroring on dangling ports.
    fn wired_ports(&self) -> Result<(Vec<ArtifactId>, Vec<ArtifactId>)> {
        let missing = self.missing_connections();
        if !missing.is_empty() {
            return Err(GraphError::NotWired {
                operation: self.name().to_string(),
                ports: missing.iter().map(|p| p.to_string()).collect(),
            });
        }
        let inputs = self.inputs().iter().filter_map(|(_, id)| *id).collect();
        let outputs = self.outputs().iter().filter_map(|(_, id)| *id).collect();
        Ok((inputs, outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Slot;

    /// Doubles its input into its output.
    struct Double {
        input: Option<Slot<f64>>,
        output: Option<Slot<f64>>,
    }

    impl Operation for Double {
        fn name(&self) -> &str {
            "double"
        }

        fn inputs(&self) -> Vec<(&'static str, Option<ArtifactId>)> {
            vec![("input", self.input.map(|s| s.id()))]
        }

        fn outputs(&self) -> Vec<(&'static str, Option<ArtifactId>)> {
            vec![("output", self.output.map(|s| s.id()))]
        }

        fn run(&mut self, store: &mut ArtifactStore) -> Result<()> {
            let input = self.input.ok_or_else(|| GraphError::NotWired {
                operation: self.name().to_string(),
                ports: vec!["input".to_string()],
            })?;
            let output = self.output.ok_or_else(|| GraphError::NotWired {
                operation: self.name().to_string(),
                ports: vec!["output".to_string()],
            })?;
            let value = *store.get(input)?;
            store.put(output, value * 2.0);
            Ok(())
        }
    }

    fn wired(store: &mut ArtifactStore) -> Double {
        let input = store.add::<f64>("in");
        let output = store.add::<f64>("out");
        Double {
            input: Some(input),
            output: Some(output),
        }
    }

    #[test]
    fn unwired_port_is_a_configuration_error() {
        let mut store = ArtifactStore::new();
        let output = store.add::<f64>("out");
        let op = Double {
            input: None,
            output: Some(output),
        };
        let err = op.can_run(&store).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("input"));
    }

    #[test]
    fn propagate_invalidates_downstream() {
        let mut store = ArtifactStore::new();
        let op = wired(&mut store);
        let (inputs, outputs) = op.wired_ports().unwrap();
        store.set_valid(outputs[0], true);

        // Input invalid -> output must go invalid.
        assert!(op.propagate(&mut store).unwrap());
        assert!(!store.is_valid(outputs[0]));

        // Already settled: a second call changes nothing.
        assert!(!op.propagate(&mut store).unwrap());
        let _ = inputs;
    }

    #[test]
    fn propagate_demands_upstream() {
        let mut store = ArtifactStore::new();
        let op = wired(&mut store);
        let (inputs, outputs) = op.wired_ports().unwrap();

        store.set_needed(outputs[0], true);
        assert!(op.propagate(&mut store).unwrap());
        assert!(store.is_needed(inputs[0]));
    }

    #[test]
    fn has_to_run_requires_valid_inputs_and_demanded_stale_output() {
        let mut store = ArtifactStore::new();
        let op = wired(&mut store);
        let (inputs, outputs) = op.wired_ports().unwrap();

        assert!(!op.has_to_run(&store)); // input invalid
        store.set_valid(inputs[0], true);
        assert!(!op.has_to_run(&store)); // output not needed
        store.set_needed(outputs[0], true);
        assert!(op.has_to_run(&store));
        store.set_valid(outputs[0], true);
        assert!(!op.has_to_run(&store)); // output already fresh
    }
}
