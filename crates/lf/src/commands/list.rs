//! `lf list` -- print the raw entries of a quantity document.

use anyhow::Context;

use lastform_config::QuantityDoc;
use lastform_core::group::Group;

use crate::cli::{GlobalArgs, ListArgs};

pub fn run(global: &GlobalArgs, args: &ListArgs) -> anyhow::Result<()> {
    let doc = QuantityDoc::load(&args.file)
        .with_context(|| format!("loading {}", args.file.display()))?;

    if global.json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    for (key, entry) in &doc.entries {
        let mut line = format!("{} = {}", entry.name(key), entry.formula());
        if let Group::Tag(tag) = entry.group() {
            line.push_str(&format!("  [group: {tag}]"));
        }
        if let Some(id) = entry.id() {
            line.push_str(&format!("  [id: {id}]"));
        }
        println!("{line}");
    }
    Ok(())
}
