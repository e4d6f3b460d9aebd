//! The evaluation pipeline: three operations wired through the graph
//! scheduler.
//!
//! `LoadDocument` reads the quantity document, `BuildQuantities` resolves
//! and calculates it, `TabulateValues` flattens the result into printable
//! rows. Demanding the value table and calling `Builder::update` settles
//! the whole chain; a second update with nothing invalidated executes
//! nothing.

use std::path::PathBuf;

use serde::Serialize;

use lastform_config::QuantityDoc;
use lastform_graph::{ArtifactId, ArtifactStore, Builder, GraphError, Operation, Result, Slot};
use lastform_resolve::Resolver;

/// One evaluated quantity, flattened for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRow {
    pub name: String,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub value: f64,
}

/// The pipeline's final artifact.
pub type ValueTable = Vec<ValueRow>;

/// Reads the quantity document from disk.
struct LoadDocument {
    path: PathBuf,
    out: Option<Slot<QuantityDoc>>,
}

impl Operation for LoadDocument {
    fn name(&self) -> &str {
        "LoadDocument"
    }

    fn inputs(&self) -> Vec<(&'static str, Option<ArtifactId>)> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<(&'static str, Option<ArtifactId>)> {
        vec![("document", self.out.map(|s| s.id()))]
    }

    fn precondition(&self, _store: &ArtifactStore) -> std::result::Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err("document path is empty".to_string());
        }
        Ok(())
    }

    fn run(&mut self, store: &mut ArtifactStore) -> Result<()> {
        let out = wired(self.out, self.name(), "document")?;
        let doc = QuantityDoc::load(&self.path)
            .map_err(|e| GraphError::execution(self.name(), e.to_string()))?;
        store.put(out, doc);
        Ok(())
    }
}

/// Registers, resolves and calculates every quantity of the document.
struct BuildQuantities {
    document: Option<Slot<QuantityDoc>>,
    out: Option<Slot<Resolver>>,
}

impl Operation for BuildQuantities {
    fn name(&self) -> &str {
        "BuildQuantities"
    }

    fn inputs(&self) -> Vec<(&'static str, Option<ArtifactId>)> {
        vec![("document", self.document.map(|s| s.id()))]
    }

    fn outputs(&self) -> Vec<(&'static str, Option<ArtifactId>)> {
        vec![("resolver", self.out.map(|s| s.id()))]
    }

    fn run(&mut self, store: &mut ArtifactStore) -> Result<()> {
        let document = wired(self.document, self.name(), "document")?;
        let out = wired(self.out, self.name(), "resolver")?;

        let doc = store.get(document)?;
        let mut resolver = Resolver::default();
        doc.register_all(&mut resolver);
        resolver
            .update()
            .and_then(|()| resolver.calculate())
            .map_err(|e| GraphError::execution(self.name(), e.to_string()))?;
        store.put(out, resolver);
        Ok(())
    }
}

/// Flattens the calculated quantities into ordered rows.
struct TabulateValues {
    resolver: Option<Slot<Resolver>>,
    out: Option<Slot<ValueTable>>,
}

impl Operation for TabulateValues {
    fn name(&self) -> &str {
        "TabulateValues"
    }

    fn inputs(&self) -> Vec<(&'static str, Option<ArtifactId>)> {
        vec![("resolver", self.resolver.map(|s| s.id()))]
    }

    fn outputs(&self) -> Vec<(&'static str, Option<ArtifactId>)> {
        vec![("values", self.out.map(|s| s.id()))]
    }

    fn run(&mut self, store: &mut ArtifactStore) -> Result<()> {
        let resolver = wired(self.resolver, self.name(), "resolver")?;
        let out = wired(self.out, self.name(), "values")?;

        let r = store.get(resolver)?;
        let table: ValueTable = r
            .evaluation_order()
            .iter()
            .map(|&handle| {
                let q = r.quantity(handle);
                ValueRow {
                    name: q.name.clone(),
                    group: q.group.to_string(),
                    id: q.id,
                    value: q.value,
                }
            })
            .collect();
        store.put(out, table);
        Ok(())
    }
}

fn wired<T>(slot: Option<Slot<T>>, operation: &str, port: &str) -> Result<Slot<T>> {
    slot.ok_or_else(|| GraphError::NotWired {
        operation: operation.to_string(),
        ports: vec![port.to_string()],
    })
}

/// The assembled evaluation pipeline.
pub struct EvalPipeline {
    pub builder: Builder,
    pub table: Slot<ValueTable>,
}

impl EvalPipeline {
    /// Wires the three-stage pipeline for one document.
    pub fn new(path: PathBuf) -> Self {
        let mut builder = Builder::new();
        let document = builder.store_mut().add::<QuantityDoc>("document");
        let resolver = builder.store_mut().add::<Resolver>("resolver");
        let values = builder.store_mut().add::<ValueTable>("values");
        builder.setup(|_store| {
            vec![
                Box::new(LoadDocument {
                    path,
                    out: Some(document),
                }) as Box<dyn Operation>,
                Box::new(BuildQuantities {
                    document: Some(document),
                    out: Some(resolver),
                }),
                Box::new(TabulateValues {
                    resolver: Some(resolver),
                    out: Some(values),
                }),
            ]
        });
        Self {
            builder,
            table: values,
        }
    }

    /// Demands the value table and settles the graph.
    pub fn evaluate(&mut self) -> Result<ValueTable> {
        self.builder.mark_needed(self.table.id());
        self.builder.update()?;
        let table = self.builder.get(self.table)?;
        tracing::debug!(rows = table.len(), "pipeline settled");
        Ok(table.clone())
    }
}
