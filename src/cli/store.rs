//! Store maintenance commands: select-best and clear.

use super::CliError;
use cartneat::neat::{BEST, GenomeStore};
use std::path::Path;

/// Promote the fittest generation snapshot to `best`.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub(crate) fn select_best(dir: &Path) -> Result<(), CliError> {
    let store = GenomeStore::new(dir);
    match store.select_best()? {
        Some(fitness) => println!("Promoted snapshot with fitness {fitness:.4} to {BEST}"),
        None => match store.fitness_of(BEST)? {
            Some(fitness) => println!("Kept {BEST} (fitness {fitness:.4})"),
            None => println!("No snapshots found in {}", dir.display()),
        },
    }
    Ok(())
}

/// Delete every saved specimen except `best`.
///
/// # Errors
///
/// Returns an error if a file cannot be removed.
pub(crate) fn clear(dir: &Path) -> Result<(), CliError> {
    let removed = GenomeStore::new(dir).clear()?;
    println!("Removed {removed} file(s) from {}", dir.display());
    Ok(())
}
