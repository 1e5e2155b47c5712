extern crate tokio_util;

use std::{
    fmt::{self, Debug, Formatter},
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use log::{debug, warn};
use rocket::{
    futures::StreamExt,
    http::ContentType,
    tokio::{
        fs::{self, File},
        io::AsyncWriteExt,
    },
    Data,
};

use crate::{
    add_progress_monitoring,
    multer::{Field, Multipart},
    FileFilter, IncomingFile, StorageStrategy, UploadError, UploadProgress, UploadedFile,
    UploadedFiles,
};

/// The size limit of a non-file field, 1 MiB.
pub const TEXT_FIELD_SIZE_LIMIT: u64 = 1024 * 1024;
/// The size limit of all non-file fields of a request together, 2 MiB.
pub const DEFAULT_MAX_TEXT_BYTES: u64 = 2 * 1024 * 1024;
/// Room for boundaries and part headers when the body limit is derived from the other limits.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// A field which accepts files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadField {
    pub name:      Arc<str>,
    /// The max number of files of this field.
    pub max_count: u32,
}

impl UploadField {
    #[inline]
    pub fn new(name: impl Into<Arc<str>>, max_count: u32) -> UploadField {
        let name = name.into();

        let max_count = if max_count == 0 {
            warn!("The max count of field `{}` should be bigger than 0. Use 1 instead.", name);

            1
        } else {
            max_count
        };

        UploadField {
            name,
            max_count,
        }
    }
}

/// Stores the files of `multipart/form-data` requests.
///
/// Built by `upload_single` or `upload_multiple`, or by `with_strategies` for custom storage and filtering. Cloning is cheap.
#[derive(Clone)]
pub struct UploadHandler {
    storage:        Arc<dyn StorageStrategy>,
    filter:         Arc<dyn FileFilter>,
    size_limit:     u64,
    preserve_path:  bool,
    max_text_bytes: u64,
    max_data_bytes: Option<u64>,
    fields:         Vec<UploadField>,
}

impl UploadHandler {
    /// Create an `UploadHandler` instance from strategies. `size_limit` applies to every file.
    pub fn with_strategies(
        storage: Arc<dyn StorageStrategy>,
        filter: Arc<dyn FileFilter>,
        size_limit: u64,
        mut fields: Vec<UploadField>,
    ) -> UploadHandler {
        fields.sort_by(|a, b| a.name.cmp(&b.name));

        UploadHandler {
            storage,
            filter,
            size_limit,
            preserve_path: false,
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            max_data_bytes: None,
            fields,
        }
    }

    /// Set whether to keep the directories of the client-supplied file names.
    #[inline]
    pub fn preserve_path(mut self, preserve_path: bool) -> UploadHandler {
        self.preserve_path = preserve_path;
        self
    }

    /// Set the max number of bytes of all non-file fields of a request together.
    #[inline]
    pub fn max_text_bytes(mut self, max_text_bytes: u64) -> UploadHandler {
        self.max_text_bytes = max_text_bytes;
        self
    }

    /// Set the max number of bytes to read from a request body.
    #[inline]
    pub fn max_data_bytes(mut self, max_data_bytes: u64) -> UploadHandler {
        self.max_data_bytes = Some(max_data_bytes);
        self
    }

    /// The max number of bytes to read from a request body. If not set, it is derived from the size limit, the max counts of the fields and `max_text_bytes`.
    pub fn data_limit(&self) -> u64 {
        self.max_data_bytes.unwrap_or_else(|| {
            let max_files: u64 = self.fields.iter().map(|f| u64::from(f.max_count)).sum();

            self.size_limit
                .saturating_mul(max_files)
                .saturating_add(self.max_text_bytes)
                .saturating_add(MULTIPART_OVERHEAD)
        })
    }

    #[inline]
    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    /// The accepted fields, sorted by name.
    #[inline]
    pub fn fields(&self) -> &[UploadField] {
        &self.fields
    }

    /// Store the files of a request.
    #[inline]
    pub async fn handle(
        &self,
        content_type: &ContentType,
        data: Data<'_>,
    ) -> Result<UploadedFiles, UploadError> {
        self.handle_with_progress(content_type, data, &UploadProgress::new(0)).await
    }

    /// Store the files of a request and record the received bytes to `progress`.
    ///
    /// If an error occurs, the files which have been stored for this request are removed.
    pub async fn handle_with_progress(
        &self,
        content_type: &ContentType,
        data: Data<'_>,
        progress: &UploadProgress,
    ) -> Result<UploadedFiles, UploadError> {
        if !content_type.is_form_data() {
            return Err(UploadError::NotFormDataError);
        }

        let (_, boundary) = match content_type.params().find(|&(k, _)| k == "boundary") {
            Some(s) => s,
            None => return Err(UploadError::BoundaryNotFoundError),
        };

        let data_limit = self.data_limit();

        let read = Arc::new(AtomicU64::new(0));

        let stream = {
            let read = read.clone();

            tokio_util::io::ReaderStream::new(data.open(data_limit.into())).inspect(move |chunk| {
                if let Ok(bytes) = chunk {
                    read.fetch_add(bytes.len() as u64, Ordering::Relaxed);
                }
            })
        };

        let mut multipart = Multipart::new(add_progress_monitoring(stream, progress), boundary);

        let mut fields = self.fields.clone();
        let mut uploaded = UploadedFiles::default();

        match self.read_entries(&mut multipart, &mut fields, &mut uploaded).await {
            Ok(()) => Ok(uploaded),
            Err(err) => {
                for path in uploaded.paths() {
                    try_delete(path).await;
                }

                while let Ok(Some(_)) = multipart.next_field().await {}

                // The body stream ends at the limit, which the parser sees as a broken body.
                match err {
                    UploadError::MulterError(_) if read.load(Ordering::Relaxed) >= data_limit => {
                        Err(UploadError::DataTooLargeError {
                            limit: data_limit
                        })
                    },
                    err => Err(err),
                }
            },
        }
    }

    async fn read_entries(
        &self,
        multipart: &mut Multipart<'_>,
        fields: &mut Vec<UploadField>,
        uploaded: &mut UploadedFiles,
    ) -> Result<(), UploadError> {
        let mut text_budget = self.max_text_bytes;

        while let Some(mut entry) = multipart.next_field().await? {
            let field_name: Arc<str> = match entry.name() {
                Some(name) => Arc::from(name),
                None => continue,
            };

            let original_name = match entry.file_name() {
                Some(file_name) => file_name.to_string(),
                None => {
                    let text = read_text(&mut entry, &field_name, text_budget).await?;

                    text_budget -= text.len() as u64;

                    uploaded.push_text(field_name, text);

                    continue;
                },
            };

            // An empty file input of an HTML form is sent with an empty file name.
            if original_name.is_empty() {
                continue;
            }

            let index = match fields.binary_search_by(|f| f.name.cmp(&field_name)) {
                Ok(index) => index,
                Err(_) => return Err(UploadError::UnexpectedField(field_name)),
            };

            let original_name = if self.preserve_path {
                original_name
            } else {
                base_name(&original_name).to_string()
            };

            let content_type = entry.content_type().cloned();

            let file = IncomingFile {
                field_name:    &field_name,
                original_name: &original_name,
                content_type:  content_type.as_ref(),
            };

            self.filter.accepts(&file)?;

            let destination = self.storage.resolve_destination(&file).await?;
            let file_name = self.storage.resolve_filename(&file);
            let path = destination.join(&file_name);

            let size = self.write_file(&mut entry, &path, &field_name).await?;

            debug!(
                "stored `{}` of field `{}` at {} ({} bytes)",
                original_name,
                field_name,
                path.display(),
                size
            );

            uploaded.push_file(UploadedFile {
                field_name: field_name.clone(),
                original_name,
                content_type,
                destination,
                file_name,
                path,
                size,
            });

            fields[index].max_count -= 1;

            if fields[index].max_count == 0 {
                fields.remove(index);
            }
        }

        Ok(())
    }

    async fn write_file(
        &self,
        entry: &mut Field<'_>,
        path: &Path,
        field_name: &Arc<str>,
    ) -> Result<u64, UploadError> {
        let mut file = File::create(path).await?;

        let mut sum_c = 0u64;

        let result = loop {
            match entry.chunk().await {
                Ok(Some(bytes)) => {
                    sum_c += bytes.len() as u64;

                    if sum_c > self.size_limit {
                        break Err(UploadError::SizeLimitExceeded {
                            field: field_name.clone(),
                            limit: self.size_limit,
                        });
                    }

                    if let Err(err) = file.write_all(bytes.as_ref()).await {
                        break Err(err.into());
                    }
                },
                Ok(None) => break file.flush().await.map(|_| sum_c).map_err(UploadError::from),
                Err(err) => break Err(err.into()),
            }
        };

        if result.is_err() {
            drop(file);

            try_delete(path).await;
        }

        result
    }
}

impl Debug for UploadHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadHandler")
            .field("size_limit", &self.size_limit)
            .field("preserve_path", &self.preserve_path)
            .field("max_text_bytes", &self.max_text_bytes)
            .field("max_data_bytes", &self.max_data_bytes)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Read a non-file field. It must fit in both `TEXT_FIELD_SIZE_LIMIT` and the remaining `budget` of the request.
async fn read_text(
    entry: &mut Field<'_>,
    field_name: &Arc<str>,
    budget: u64,
) -> Result<String, UploadError> {
    let mut text_buffer = Vec::new();

    while let Some(bytes) = entry.chunk().await? {
        let len = text_buffer.len() as u64 + bytes.len() as u64;

        if len > TEXT_FIELD_SIZE_LIMIT || len > budget {
            return Err(UploadError::SizeLimitExceeded {
                field: field_name.clone(),
                limit: TEXT_FIELD_SIZE_LIMIT.min(budget),
            });
        }

        text_buffer.extend_from_slice(bytes.as_ref());
    }

    Ok(String::from_utf8(text_buffer)?)
}

/// The last segment of a client-supplied file name. Both kinds of slashes are separators.
#[inline]
fn base_name(file_name: &str) -> &str {
    file_name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(file_name)
}

#[inline]
async fn try_delete<P: AsRef<Path>>(path: P) {
    if fs::remove_file(path.as_ref()).await.is_err() {}
}
