use std::path::Path;

use colored::Colorize;
use matters_core::{MattersStore, StoreConfig};

pub fn run(file: &Path) -> Result<(), String> {
    let matters = super::read_matters(file)?;

    let store = match MattersStore::load(matters.clone()) {
        Ok(store) => store,
        Err(load_error) => {
            // Assemble without validation so every issue can be listed.
            let issues = MattersStore::assemble(StoreConfig::default(), matters).verify();
            if issues.is_empty() {
                return Err(load_error.to_string());
            }
            for issue in &issues {
                eprintln!("  {} {issue}", "issue:".red().bold());
            }
            return Err(format!(
                "{} integrity issue{}",
                issues.len(),
                if issues.len() == 1 { "" } else { "s" }
            ));
        }
    };

    let links: usize = store.iter().map(|m| m.own_links().count()).sum();
    let composed = store.iter().filter(|m| m.owner().is_some()).count();
    let variants = store.iter().filter(|m| m.inherites().is_some()).count();

    println!("  All checks passed for '{}'.", file.display());
    println!(
        "  {} matters, {} links, {} variants, {} composed",
        store.len(),
        links,
        variants,
        composed
    );

    Ok(())
}
