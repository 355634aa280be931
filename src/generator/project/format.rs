use anyhow::Context;
use std::path::PathBuf;
use std::process::Command;

/// Run `rustfmt` over the generated files.
pub fn format_files(files: &[PathBuf]) -> anyhow::Result<()> {
    if files.is_empty() {
        return Ok(());
    }

    // Allow tests to override the rustfmt binary path without mutating PATH
    let rustfmt = std::env::var("SWAGGERGEN_RUSTFMT").unwrap_or_else(|_| "rustfmt".to_string());

    let status = Command::new(&rustfmt)
        .args(["--edition", "2021"])
        .args(files)
        .status()
        .with_context(|| format!("Failed to run {rustfmt}"))?;
    if !status.success() {
        anyhow::bail!("rustfmt failed on generated files");
    }
    Ok(())
}
