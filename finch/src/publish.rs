use std::path::Path;
use std::process::Command;

use vireo::{Chainable, Result};

/// Publishes the output directory to the `gh-pages` branch of the
/// surrounding repository's `origin` remote. The branch history is
/// replaced with a single fresh commit on every publish.
pub fn publish(output: &Path) -> Result<()> {
    let remote = git_in(Path::new("."), &["config", "--get", "remote.origin.url"])
        .chain_with(|| vireo::error!("couldn't determine the origin remote url"))?;

    git_in(output, &["init", "--quiet"])?;
    git_in(output, &["checkout", "--quiet", "-B", "gh-pages"])?;
    git_in(output, &["add", "-A"])?;
    git_in(output, &["commit", "--quiet", "--allow-empty", "-m", "publish site"])?;
    git_in(output, &["push", "--force", &remote, "gh-pages:gh-pages"])?;

    tracing::info!(remote = %remote, "site published to gh-pages");
    Ok(())
}

fn git_in(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .chain_with(|| vireo::error!("couldn't run git", "command" => args.join(" ")))?;

    if !output.status.success() {
        return vireo::err!(
            "a git command failed",
            "command" => args.join(" "),
            "stderr" => String::from_utf8_lossy(&output.stderr).trim(),
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
