use std::fs::File;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("product image `{name}` unavailable under `{root}`: {reason}")]
pub struct AssetNotFoundError {
    pub name: String,
    pub root: String,
    pub reason: String,
}

/// Maps a record's `file_name` to a static image under `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Path of a readable image file. Only bare file names are accepted.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf, AssetNotFoundError> {
        let fail = |reason: String| AssetNotFoundError {
            name: file_name.to_string(),
            root: self.root.display().to_string(),
            reason,
        };
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(fail("not a plain file name".into())),
        }
        let path = self.root.join(file_name);
        if !path.is_file() { return Err(fail("file does not exist".into())); }
        File::open(&path).map_err(|e| fail(e.to_string()))?;
        Ok(path)
    }
}
