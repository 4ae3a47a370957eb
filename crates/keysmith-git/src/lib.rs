//! keysmith Git - version control checks for written secrets
//!
//! Credentials written to disk (keystores, certificates, profiles,
//! `credentials.json`) must never end up in a commit. This crate answers
//! whether a path is protected by the repository's ignore rules.

mod repository;

use std::path::PathBuf;

pub use repository::GitRepo;

/// Git errors
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// Path cannot be expressed relative to the work tree
    #[error("Path is outside the repository: {0}")]
    OutsideRepository(PathBuf),

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),
}

/// Result type for git operations
pub type Result<T> = std::result::Result<T, GitError>;
