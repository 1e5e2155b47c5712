use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::mime::Mime;

/// The content type assumed for a file part which declares none.
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "text/plain";

/// A file part which is about to be stored.
#[derive(Debug, Clone, Copy)]
pub struct IncomingFile<'a> {
    pub field_name:    &'a str,
    /// The client-supplied file name. Only the last path segment unless `preserve_path` is enabled.
    pub original_name: &'a str,
    /// The client-declared content type.
    pub content_type:  Option<&'a Mime>,
}

impl<'a> IncomingFile<'a> {
    /// The declared MIME type without parameters, such as `image/png`.
    #[inline]
    pub fn mime_type(&self) -> &'a str {
        match self.content_type {
            Some(content_type) => content_type.essence_str(),
            None => DEFAULT_FILE_CONTENT_TYPE,
        }
    }
}

/// A file which has been stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name:    Arc<str>,
    pub original_name: String,
    pub content_type:  Option<Mime>,
    /// The directory the file is stored in.
    pub destination:   PathBuf,
    /// The generated file name.
    pub file_name:     String,
    pub path:          PathBuf,
    pub size:          u64,
}

/// The stored files and text fields of a request.
#[derive(Debug, Default)]
pub struct UploadedFiles {
    pub files: HashMap<Arc<str>, Vec<UploadedFile>>,
    pub texts: HashMap<Arc<str>, Vec<String>>,
}

impl UploadedFiles {
    /// The first file of a field. For handlers built by `upload_single`, this is the only file.
    #[inline]
    pub fn single(&self, field_name: &str) -> Option<&UploadedFile> {
        self.files.get(field_name).and_then(|files| files.first())
    }

    /// The first value of a text field.
    #[inline]
    pub fn text(&self, field_name: &str) -> Option<&str> {
        self.texts.get(field_name).and_then(|texts| texts.first()).map(String::as_str)
    }

    /// Count the stored files of every field.
    #[inline]
    pub fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub(crate) fn push_file(&mut self, file: UploadedFile) {
        self.files.entry(file.field_name.clone()).or_default().push(file);
    }

    pub(crate) fn push_text(&mut self, field_name: Arc<str>, text: String) {
        self.texts.entry(field_name).or_default().push(text);
    }

    pub(crate) fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.values().flatten().map(|f| f.path.as_path())
    }
}
