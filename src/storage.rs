use std::{
    io,
    path::{Path, PathBuf},
};

use rocket::tokio::fs;
use uuid::Uuid;

use crate::{upload_options::DEFAULT_FIELD_NAME, IncomingFile};

/// The directory used when no destination is given.
pub const DEFAULT_DESTINATION: &str = "uploads";

/// Decides where an incoming file is stored and how it is named.
#[rocket::async_trait]
pub trait StorageStrategy: Send + Sync {
    /// Get the directory for the file. The directory must exist when this method returns.
    async fn resolve_destination(&self, file: &IncomingFile<'_>) -> io::Result<PathBuf>;

    /// Get the name of the stored file.
    fn resolve_filename(&self, file: &IncomingFile<'_>) -> String;
}

/// Stores files in one directory with `{uuid}-{field name}{extension}` names.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    destination: PathBuf,
}

impl DiskStorage {
    #[inline]
    pub fn new(destination: Option<PathBuf>) -> DiskStorage {
        DiskStorage {
            destination: destination.unwrap_or_else(|| PathBuf::from(DEFAULT_DESTINATION)),
        }
    }

    #[inline]
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl Default for DiskStorage {
    #[inline]
    fn default() -> Self {
        DiskStorage::new(None)
    }
}

#[rocket::async_trait]
impl StorageStrategy for DiskStorage {
    async fn resolve_destination(&self, _file: &IncomingFile<'_>) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.destination).await?;

        Ok(self.destination.clone())
    }

    fn resolve_filename(&self, file: &IncomingFile<'_>) -> String {
        let field_name =
            if file.field_name.is_empty() { DEFAULT_FIELD_NAME } else { file.field_name };

        format!(
            "{}-{}{}",
            Uuid::new_v4(),
            field_name.replace('\\', "/"),
            extension(file.original_name)
        )
    }
}

/// Get the extension of a file name, including the leading dot. Backslashes are treated as path separators.
pub(crate) fn extension(original_name: &str) -> String {
    let normalized = original_name.replace('\\', "/");
    let base = normalized.rsplit('/').next().unwrap_or_default();

    if base == ".." {
        return String::new();
    }

    match base.rfind('.') {
        Some(i) if i > 0 => base[i..].to_string(),
        _ => String::new(),
    }
}
