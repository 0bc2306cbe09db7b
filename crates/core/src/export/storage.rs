//! Export artifacts on local storage via Apache OpenDAL.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use opendal::{Operator, services};

use super::csv::export_file_name;
use super::error::ExportError;

/// A written export artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredExport {
    /// Name offered to the downloader.
    pub file_name: String,
    /// Path relative to the export root.
    pub rel_path: String,
    /// Size of the artifact.
    pub size_bytes: u64,
}

/// The single directory export artifacts are written to and served from.
#[derive(Debug, Clone)]
pub struct ExportStorage {
    operator: Operator,
    root: PathBuf,
}

impl ExportStorage {
    /// Opens (and creates, if missing) the export root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the operator
    /// cannot be built.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let root_str = root
            .to_str()
            .ok_or_else(|| ExportError::Configuration("export root is not valid UTF-8".into()))?;
        let operator = Operator::new(services::Fs::default().root(root_str))?.finish();

        Ok(Self { operator, root })
    }

    /// The configured export root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `contents` under a fresh name derived from `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn store(&self, base: &str, contents: Vec<u8>) -> Result<StoredExport, ExportError> {
        let file_name = export_file_name(base);
        let size_bytes = u64::try_from(contents.len()).unwrap_or(u64::MAX);

        self.operator.write(&file_name, contents).await?;

        Ok(StoredExport {
            rel_path: file_name.clone(),
            file_name,
            size_bytes,
        })
    }

    /// Removes an artifact. Missing artifacts are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid paths or failed deletes.
    pub async fn delete(&self, rel_path: &str) -> Result<(), ExportError> {
        check_relative(rel_path)?;
        self.operator.delete(rel_path).await?;
        Ok(())
    }

    /// Resolves `rel_path` to a canonical path that is guaranteed to lie
    /// inside the export root.
    ///
    /// # Errors
    ///
    /// - `InvalidPath` for empty, absolute, or `..` paths
    /// - `NotFound` when nothing exists at the path
    /// - `OutsideRoot` when the canonical target (after following symlinks)
    ///   is not under the canonical root
    pub async fn resolve_contained(&self, rel_path: &str) -> Result<PathBuf, ExportError> {
        check_relative(rel_path)?;

        let root = tokio::fs::canonicalize(&self.root).await?;
        let target = match tokio::fs::canonicalize(self.root.join(rel_path)).await {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ExportError::NotFound(rel_path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if target == root || !target.starts_with(&root) {
            return Err(ExportError::OutsideRoot(rel_path.to_string()));
        }
        Ok(target)
    }

    /// Reads an artifact after checking containment.
    ///
    /// # Errors
    ///
    /// See [`ExportStorage::resolve_contained`]; also fails if the read fails.
    pub async fn read(&self, rel_path: &str) -> Result<Vec<u8>, ExportError> {
        let path = self.resolve_contained(rel_path).await?;
        Ok(tokio::fs::read(path).await?)
    }
}

fn check_relative(rel_path: &str) -> Result<(), ExportError> {
    let path = Path::new(rel_path);
    let only_normal = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if rel_path.is_empty() || !only_normal {
        return Err(ExportError::InvalidPath(rel_path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
