use std::path::Path;

use colored::Colorize;
use matters_core::{MatterRef, MattersStore, Provenance, ResolvedField, StoreConfig};

pub fn run(file: &Path, id: &str) -> Result<(), String> {
    let store = super::load_store(file, StoreConfig::default())?;
    let id = super::resolve_id(&store, id)?;
    let matter = store.matter(&id).map_err(|e| e.to_string())?;

    // Header
    println!("  {}", matter.id().as_str().bold());
    if let Some(parent) = matter.inherites() {
        println!("  parent:     {parent}");
    }
    if let Some(owner) = matter.owner() {
        println!("  owner:      {owner}");
    }
    println!("  dependents: {}", matter.dependents());
    println!();

    // Resolved fields
    let fields = matter.resolved_fields();
    if fields.is_empty() {
        println!("  {} (none)", "Fields:".dimmed());
    } else {
        println!("  {}", "Fields:".dimmed());
        let width = fields.iter().map(|f| f.key.len()).max().unwrap_or(0);
        for field in &fields {
            let marker = field_marker(&store, &matter, field);
            let value = field.value.to_string();
            let value = if field.is_inherited() {
                value.dimmed().to_string()
            } else {
                value
            };
            println!("    {:width$}  {value}{marker}", field.key);
        }
    }

    // Structure
    let heirs = store.heirs(&id);
    if !heirs.is_empty() {
        println!();
        println!("  {}", "Inherited by:".dimmed());
        for heir in heirs {
            println!("    {}", heir.id());
        }
    }

    let owned = store.owned(&id);
    if !owned.is_empty() {
        println!();
        println!("  {}", "Composes:".dimmed());
        for part in owned {
            println!("    {}", part.id());
        }
    }

    let referrers = store.referrers(&id);
    if !referrers.is_empty() {
        println!();
        println!("  {}", "Referenced by:".dimmed());
        for (source, key) in referrers {
            println!("    {source}.{key}");
        }
    }

    Ok(())
}

/// Affordance text shown after a field's value.
fn field_marker(store: &MattersStore, matter: &MatterRef<'_>, field: &ResolvedField<'_>) -> String {
    let mut marks: Vec<String> = Vec::new();

    match &field.provenance {
        Provenance::Inherited { from } => marks.push(format!("(inherited from {})", from.short())),
        Provenance::Own => {
            if let Some(definer) = matter.parent().and_then(|p| p.defined_by(field.key)) {
                marks.push(format!("(overrides {})", definer.id().short()));
            }
        }
        Provenance::Absent => {}
    }

    if let Some(target) = field.value.as_link() {
        match store.get(target) {
            Some(t) if t.owner() == Some(matter.id()) => marks.push("[composition]".to_string()),
            Some(_) => {}
            None => marks.push("[missing]".red().to_string()),
        }
    }

    marks.iter().map(|m| format!("  {m}")).collect()
}
