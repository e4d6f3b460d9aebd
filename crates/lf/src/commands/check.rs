//! `lf check` -- resolve a document without evaluating it.

use anyhow::Context;

use lastform_config::QuantityDoc;
use lastform_resolve::Resolver;

use crate::cli::{CheckArgs, GlobalArgs};

pub fn run(global: &GlobalArgs, args: &CheckArgs) -> anyhow::Result<()> {
    let doc = QuantityDoc::load(&args.file)
        .with_context(|| format!("loading {}", args.file.display()))?;

    let mut resolver = Resolver::default();
    doc.register_all(&mut resolver);
    resolver
        .update()
        .with_context(|| format!("resolving {}", args.file.display()))?;

    let instances = resolver.evaluation_order().len();
    if global.json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "quantities": doc.entries.len(),
                "instances": instances,
            })
        );
    } else {
        println!(
            "ok: {} quantities, {} evaluated instances",
            doc.entries.len(),
            instances
        );
    }
    Ok(())
}
