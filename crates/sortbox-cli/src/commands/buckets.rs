//! `sortbox buckets` -- print the default bucket set.
//!
//! Outputs the buckets a new user is seeded with, as a JSON array of
//! `{ "name", "description" }` objects, ready to edit into a mailbox file.

use sortbox_core::buckets::default_definitions;

/// Run the buckets command.
pub fn run() -> anyhow::Result<()> {
    println!("{}", render()?);
    Ok(())
}

fn render() -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&default_definitions())?)
}
