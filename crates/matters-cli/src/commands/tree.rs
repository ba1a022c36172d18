use std::path::Path;

use colored::Colorize;
use matters_core::{LinkVisit, Provenance, Relation, StoreConfig, Walk};

pub fn run(file: &Path, id: &str, max_depth: Option<usize>) -> Result<(), String> {
    let store = super::load_store(file, StoreConfig::default())?;
    let root = super::resolve_id(&store, id)?;

    println!("  {}", root.as_str().bold());

    let mut links = 0usize;
    store
        .traverse(&root, |visit| {
            if max_depth.is_some_and(|max| visit.depth >= max) {
                return Walk::Skip;
            }
            links += 1;
            println!("{}", render(visit));

            if max_depth.is_some_and(|max| visit.depth + 1 >= max) {
                Walk::Skip
            } else {
                Walk::Continue
            }
        })
        .map_err(|e| e.to_string())?;

    if links == 0 {
        println!("    (no links)");
    }

    Ok(())
}

fn render(visit: &LinkVisit<'_>) -> String {
    let indent = "  ".repeat(visit.depth + 2);
    let mut line = format!("{indent}{} → {}", visit.key, visit.target_id.short());

    if visit.relation == Relation::Composition {
        line.push_str(&format!(" {}", "[composition]".cyan()));
    }
    if let Provenance::Inherited { from } = &visit.provenance {
        line.push_str(&format!(" {}", format!("(inherited from {})", from.short()).dimmed()));
    }
    if visit.target.is_none() {
        line.push_str(&format!(" {}", "[missing]".red()));
    }
    if visit.cyclic {
        line.push_str(&format!(" {}", "[cycle]".yellow()));
    }
    if visit.revisit {
        line.push_str(&format!(" {}", "(shown above)".dimmed()));
    }
    line
}
