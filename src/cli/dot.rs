//! Dot command implementation.

use super::CliError;
use cartneat::neat::{Sequencer, load_genome, to_dot};
use std::fs;
use std::path::Path;

/// Execute the dot command.
///
/// # Errors
///
/// Returns an error if the genome cannot be loaded or the output written.
pub(crate) fn execute(file: &Path, output: Option<&Path>) -> Result<(), CliError> {
    let genome = load_genome(file, &mut Sequencer::new())?;
    let dot = to_dot(&genome);

    match output {
        Some(path) => {
            fs::write(path, dot).map_err(|e| {
                CliError::new(format!("Failed to write {}: {e}", path.display()))
            })?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{dot}"),
    }

    Ok(())
}
