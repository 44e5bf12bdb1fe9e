//! Check that the dataset checkout is at a known git revision.
//!
//! The dataset is distributed as a git repository. Results are only
//! reproducible if the checkout is clean and at the expected commit.

use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use std::path::Path;
use std::process::Command;

fn git(repo: &Path, args: &[&str]) -> Result<std::process::Output> {
    Ok(Command::new("git").arg("-C").arg(repo).args(args).output()?)
}

fn rev_parse(repo: &Path, version: &str) -> Result<String> {
    let output = git(repo, &["rev-parse", "--verify", "--quiet", &format!("{version}^{{commit}}")])?;
    if !output.status.success() {
        return Err(DatasetError::Revision(format!(
            "the expected version {version} is not a valid git revision or git hash"
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Fail unless the dataset checkout is clean and `HEAD` resolves to the
/// same commit as `version`.
///
/// Returns the commit hash of `HEAD`.
pub fn ensure_git_revision(config: &DatasetConfig, version: &str) -> Result<String> {
    let repo = config.root();
    let status = git(repo, &["status", "--porcelain", "--untracked-files=all"])?;
    if !status.status.success() {
        return Err(DatasetError::Revision(format!(
            "{repo:?} is not a git repository: {}",
            String::from_utf8_lossy(&status.stderr).trim()
        )));
    }
    if !status.stdout.iter().all(u8::is_ascii_whitespace) {
        return Err(DatasetError::Revision(
            "the dataset repo has uncommitted changes".to_string(),
        ));
    }

    let expected = rev_parse(repo, version)?;
    let head = rev_parse(repo, "HEAD")?;
    if head != expected {
        return Err(DatasetError::Revision(format!(
            "the dataset is not at the expected version {version} ({expected}) but at {head}"
        )));
    }
    tracing::debug!("Dataset is at revision {}", head);
    Ok(head)
}
