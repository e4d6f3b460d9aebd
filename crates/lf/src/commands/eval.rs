//! `lf eval` -- evaluate a quantity document and print the values.

use anyhow::Context;

use crate::cli::{EvalArgs, GlobalArgs};
use crate::pipeline::EvalPipeline;

pub fn run(global: &GlobalArgs, args: &EvalArgs) -> anyhow::Result<()> {
    let mut pipeline = EvalPipeline::new(args.file.clone());
    let mut table = pipeline
        .evaluate()
        .with_context(|| format!("evaluating {}", args.file.display()))?;

    if let Some(group) = &args.group {
        table.retain(|row| row.group == *group || row.group == "global");
    }

    if global.json {
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else {
        for row in &table {
            println!("{}@{} = {}", row.name, row.group, row.value);
        }
    }
    Ok(())
}
