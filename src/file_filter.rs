use std::sync::Arc;

use crate::{IncomingFile, UploadError};

/// Decides whether an incoming file is accepted.
pub trait FileFilter: Send + Sync {
    fn accepts(&self, file: &IncomingFile<'_>) -> Result<(), UploadError>;
}

/// Accepts files whose declared MIME type is one of the allowed types.
///
/// Only the content type sent by the client is checked. The content of the file is not inspected.
#[derive(Debug, Clone)]
pub struct MimeTypeFilter {
    allowed: Arc<[String]>,
}

impl MimeTypeFilter {
    #[inline]
    pub fn new(allowed: Vec<String>) -> MimeTypeFilter {
        MimeTypeFilter {
            allowed: Arc::from(allowed)
        }
    }

    #[inline]
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

impl FileFilter for MimeTypeFilter {
    fn accepts(&self, file: &IncomingFile<'_>) -> Result<(), UploadError> {
        let mime_type = file.mime_type();

        if self.allowed.iter().any(|allowed| allowed == mime_type) {
            Ok(())
        } else {
            Err(UploadError::InvalidFileType {
                allowed: self.allowed.clone()
            })
        }
    }
}
