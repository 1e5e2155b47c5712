use std::path::PathBuf;

use rocket::{
    figment::{self, Figment},
    serde::Deserialize,
};

use crate::{MimeCategory, DEFAULT_DESTINATION};

/// The size limit used when no non-zero limit is given, 50 MiB.
pub const DEFAULT_FILE_SIZE_LIMIT: u64 = 50 * 1024 * 1024;
/// The field name used by `upload_single` when none is given.
pub const DEFAULT_FIELD_NAME: &str = "file";
/// The key of the table which `UploadOptions::from_figment` reads.
pub const FIGMENT_KEY: &str = "upload";

/// Options for building an upload handler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(crate = "rocket::serde", default)]
pub struct UploadOptions {
    /// The directory where the uploaded files will be stored. `uploads` if not set.
    pub destination:       Option<PathBuf>,
    /// The field name for single file uploads. `file` if not set.
    #[serde(alias = "filename")]
    pub field_name:        Option<String>,
    /// Names of `MimeCategory`. Unknown names are ignored.
    pub file_types:        Vec<String>,
    /// Explicit MIME types. If not empty, `file_types` is not consulted.
    pub custom_mime_types: Vec<String>,
    /// The max size of one file in bytes. Zero is treated as not set.
    pub file_size_limit:   Option<u64>,
    /// Whether to keep the directories of the client-supplied file name.
    pub preserve_path:     bool,
    /// Fields for multiple file uploads.
    pub fields:            Vec<FieldConfig>,
    /// The max size of all non-file fields of a request together. 2 MiB if not set.
    pub max_text_bytes:    Option<u64>,
    /// The max size of a request body. If not set, it is derived from the file size limit, the max counts of the fields and `max_text_bytes`.
    pub max_data_bytes:    Option<u64>,
}

impl UploadOptions {
    /// Create a default `UploadOptions` instance.
    #[inline]
    pub fn new() -> UploadOptions {
        UploadOptions::default()
    }

    /// Create an `UploadOptions` instance with existing field configurations.
    #[inline]
    pub fn with_fields(fields: Vec<FieldConfig>) -> UploadOptions {
        UploadOptions {
            fields,
            ..UploadOptions::default()
        }
    }

    /// Read the `upload` table of a figment, such as `rocket.figment()`. Default options are returned if the table is absent.
    pub fn from_figment(figment: &Figment) -> Result<UploadOptions, figment::Error> {
        if figment.contains(FIGMENT_KEY) {
            figment.extract_inner(FIGMENT_KEY)
        } else {
            Ok(UploadOptions::default())
        }
    }

    #[inline]
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> UploadOptions {
        self.destination = Some(destination.into());
        self
    }

    #[inline]
    pub fn field_name(mut self, field_name: impl Into<String>) -> UploadOptions {
        self.field_name = Some(field_name.into());
        self
    }

    /// Allow a category. This method can be used multiple times.
    #[inline]
    pub fn file_type(mut self, category: MimeCategory) -> UploadOptions {
        self.file_types.push(category.as_str().to_string());
        self
    }

    /// Allow categories by name. Unknown names are kept but have no effect.
    pub fn file_types<I, S>(mut self, names: I) -> UploadOptions
    where
        I: IntoIterator<Item = S>,
        S: Into<String>, {
        self.file_types.extend(names.into_iter().map(Into::into));
        self
    }

    /// Allow an explicit MIME type. This method can be used multiple times.
    #[inline]
    pub fn custom_mime_type(mut self, mime_type: impl Into<String>) -> UploadOptions {
        self.custom_mime_types.push(mime_type.into());
        self
    }

    #[inline]
    pub fn file_size_limit(mut self, file_size_limit: u64) -> UploadOptions {
        self.file_size_limit = Some(file_size_limit);
        self
    }

    #[inline]
    pub fn preserve_path(mut self, preserve_path: bool) -> UploadOptions {
        self.preserve_path = preserve_path;
        self
    }

    #[inline]
    pub fn field(mut self, field: FieldConfig) -> UploadOptions {
        self.fields.push(field);
        self
    }

    #[inline]
    pub fn max_text_bytes(mut self, max_text_bytes: u64) -> UploadOptions {
        self.max_text_bytes = Some(max_text_bytes);
        self
    }

    #[inline]
    pub fn max_data_bytes(mut self, max_data_bytes: u64) -> UploadOptions {
        self.max_data_bytes = Some(max_data_bytes);
        self
    }

    /// The directory where the files are stored, `uploads` if `destination` is not set.
    #[inline]
    pub fn destination_or_default(&self) -> PathBuf {
        self.destination.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DESTINATION))
    }

    /// The explicit size limit, if it is set to a non-zero value.
    #[inline]
    pub(crate) fn explicit_size_limit(&self) -> Option<u64> {
        self.file_size_limit.filter(|&n| n > 0)
    }
}

/// A named field for multiple file uploads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct FieldConfig {
    pub name:            String,
    /// The max number of files of this field. 1 if not set.
    #[serde(default)]
    pub max_count:       Option<u32>,
    /// Names of `MimeCategory`.
    #[serde(default)]
    pub file_types:      Vec<String>,
    #[serde(default)]
    pub file_size_limit: Option<u64>,
}

impl FieldConfig {
    /// Create a field which accepts one file.
    #[inline]
    pub fn new(name: impl Into<String>) -> FieldConfig {
        FieldConfig {
            name:            name.into(),
            max_count:       None,
            file_types:      Vec::new(),
            file_size_limit: None,
        }
    }

    #[inline]
    pub fn max_count(mut self, max_count: u32) -> FieldConfig {
        self.max_count = Some(max_count);
        self
    }

    /// Add a category for this field. This method can be used multiple times.
    #[inline]
    pub fn file_type(mut self, category: MimeCategory) -> FieldConfig {
        self.file_types.push(category.as_str().to_string());
        self
    }

    #[inline]
    pub fn file_size_limit(mut self, file_size_limit: u64) -> FieldConfig {
        self.file_size_limit = Some(file_size_limit);
        self
    }
}
