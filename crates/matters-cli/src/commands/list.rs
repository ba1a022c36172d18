use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use matters_core::{Filter, MatterRef, StoreConfig};

pub fn run(
    file: &Path,
    conditions: &[String],
    standalone: bool,
    descends_from: Option<&str>,
) -> Result<(), String> {
    let store = super::load_store(file, StoreConfig::default())?;

    let mut filter = Filter::new();
    for condition in conditions {
        let (key, matcher) = super::parse_condition(condition)?;
        filter = filter.resolved(key, matcher);
    }
    if standalone {
        filter = filter.standalone();
    }
    if let Some(ancestor) = descends_from {
        filter = filter.descends_from(super::resolve_id(&store, ancestor)?);
    }

    let results = store.find(&filter);

    if results.is_empty() {
        println!("  No matters found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Parent", "Owner", "Dependents", "Own", "Inherited"]);

    for matter in &results {
        let parent = matter.inherites().map_or("-", |id| id.short());
        let owner = matter.owner().map_or("-", |id| id.short());
        let inherited = inherited_count(matter);

        table.add_row(vec![
            matter.id().short().to_string(),
            parent.to_string(),
            owner.to_string(),
            matter.dependents().to_string(),
            matter.properties().len().to_string(),
            inherited.to_string(),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} matters", results.len());

    Ok(())
}

fn inherited_count(matter: &MatterRef<'_>) -> usize {
    matter
        .resolved_fields()
        .iter()
        .filter(|field| field.is_inherited())
        .count()
}
