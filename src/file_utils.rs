use std::{io, path::Path};

use log::error;
use rocket::tokio::fs;

/// Delete a file. Returns `false` and logs the reason if the file does not exist or cannot be removed.
pub async fn delete_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();

    match remove_existing(path).await {
        Ok(()) => true,
        Err(err) => {
            error!("Error deleting file {}: {}", path.display(), err);

            false
        },
    }
}

async fn remove_existing(path: &Path) -> io::Result<()> {
    fs::metadata(path).await?;
    fs::remove_file(path).await
}
