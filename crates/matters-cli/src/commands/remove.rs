use std::path::Path;

use colored::Colorize;
use matters_core::{CompositionPolicy, Conflict, MatterError, StoreConfig};

pub fn run(file: &Path, id: &str, write: bool, block_owners: bool) -> Result<(), String> {
    let policy = if block_owners {
        CompositionPolicy::Block
    } else {
        CompositionPolicy::Cascade
    };
    let mut store = super::load_store(file, StoreConfig::default().with_composition(policy))?;
    let id = super::resolve_id(&store, id)?;

    let changes = match store.remove(&id) {
        Ok(changes) => changes,
        Err(MatterError::Conflict { id: member, conflict }) => {
            // Links and heirs inside the removal set do not block it.
            let removing = store.composition(&id);
            let blockers: Vec<String> = match conflict {
                Conflict::Dependents(_) => store
                    .referrers(&member)
                    .into_iter()
                    .filter(|(source, _)| !removing.contains(source))
                    .map(|(source, key)| format!("{source}.{key}"))
                    .collect(),
                Conflict::Heirs(_) => store
                    .heirs(&member)
                    .iter()
                    .filter(|m| !removing.contains(m.id()))
                    .map(|m| m.id().to_string())
                    .collect(),
                Conflict::Owned(_) => store.owned(&member).iter().map(|m| m.id().to_string()).collect(),
                Conflict::InheritanceCycle | Conflict::OwnershipCycle => Vec::new(),
            };
            for blocker in blockers {
                eprintln!("  {} {blocker}", "blocked by".yellow());
            }
            return Err(MatterError::Conflict { id: member, conflict }.to_string());
        }
        Err(e) => return Err(e.to_string()),
    };

    println!(
        "  {} {} matter{}",
        if write { "Removed" } else { "Would remove" },
        changes.removed.len(),
        if changes.removed.len() == 1 { "" } else { "s" }
    );
    for removed in &changes.removed {
        println!("    {removed}");
    }
    if !changes.dependents.is_empty() {
        println!("  Released links on:");
        for target in &changes.dependents {
            if let Some(matter) = store.get(target) {
                println!("    {target} ({} dependents left)", matter.dependents());
            }
        }
    }

    if write {
        super::save_store(file, &store)?;
    } else {
        println!();
        println!("  {}", "Dry run; pass --write to apply.".dimmed());
    }

    Ok(())
}
