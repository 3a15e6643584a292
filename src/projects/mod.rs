/// # Everything around the analysis that a user of the `vni` tool touches
/// Argument parsing, the infer report and the `vni.toml` configuration.

// The CLI for running name inference over IR snapshots
pub(crate) mod cli;

pub(crate) mod settings;
