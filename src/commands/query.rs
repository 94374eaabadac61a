//! Query command - evaluate an expression and print matching files

use colored::Colorize;

use super::OutputMode;
use crate::fs::TagFs;
use crate::output::MatchView;
use crate::TagfsError;

type Result<T> = std::result::Result<T, TagfsError>;

/// Evaluate `expr` and print the matching filenames
///
/// # Errors
/// Returns an error for malformed queries or unknown tags.
pub fn execute(fs: &TagFs, expr: &str, mode: OutputMode) -> Result<()> {
    let matches = fs.query_files(expr)?;

    if mode.json {
        let views: Vec<MatchView> = matches
            .into_iter()
            .map(|(id, name)| MatchView { id, name })
            .collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if mode.chatty() {
        println!("{} file(s) match {}", matches.len(), expr.cyan());
    }
    for (id, name) in &matches {
        if mode.quiet {
            println!("{name}");
        } else {
            println!("  {name} {}", format!("(id {id})").dimmed());
        }
    }
    Ok(())
}
