use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
    string::FromUtf8Error,
    sync::Arc,
};

use log::{log, Level};
use rocket::{
    http::Status,
    response::{self, Responder},
    Request,
};

use crate::multer;

#[derive(Debug)]
pub enum UploadError {
    NotFormDataError,
    BoundaryNotFoundError,
    /// The declared content type of a file is not allowed.
    InvalidFileType {
        allowed: Arc<[String]>,
    },
    /// A file is larger than the configured limit.
    SizeLimitExceeded {
        field: Arc<str>,
        limit: u64,
    },
    /// The request body is larger than the limit of the handler.
    DataTooLargeError {
        limit: u64,
    },
    /// A file is sent with a field name which is not accepted, or too many files are sent with it.
    UnexpectedField(Arc<str>),
    /// The destination directory or the file cannot be created or written.
    StorageIOError(io::Error),
    MulterError(multer::Error),
    FromUtf8Error(FromUtf8Error),
}

impl UploadError {
    /// The HTTP status which this error is responded with.
    pub fn status(&self) -> Status {
        match self {
            UploadError::NotFormDataError
            | UploadError::BoundaryNotFoundError
            | UploadError::UnexpectedField(_)
            | UploadError::MulterError(_)
            | UploadError::FromUtf8Error(_) => Status::BadRequest,
            UploadError::InvalidFileType {
                ..
            } => Status::UnsupportedMediaType,
            UploadError::SizeLimitExceeded {
                ..
            }
            | UploadError::DataTooLargeError {
                ..
            } => Status::PayloadTooLarge,
            UploadError::StorageIOError(_) => Status::InternalServerError,
        }
    }

    /// The level this error is logged at when it is responded. Storage and parser failures are errors, and rejected requests are warnings.
    pub fn log_level(&self) -> Level {
        match self {
            UploadError::StorageIOError(_) | UploadError::MulterError(_) => Level::Error,
            _ => Level::Warn,
        }
    }
}

impl From<io::Error> for UploadError {
    #[inline]
    fn from(err: io::Error) -> UploadError {
        UploadError::StorageIOError(err)
    }
}

impl From<multer::Error> for UploadError {
    #[inline]
    fn from(err: multer::Error) -> UploadError {
        UploadError::MulterError(err)
    }
}

impl From<FromUtf8Error> for UploadError {
    #[inline]
    fn from(err: FromUtf8Error) -> UploadError {
        UploadError::FromUtf8Error(err)
    }
}

impl Display for UploadError {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        match self {
            UploadError::NotFormDataError => {
                f.write_str("The content type is not `multipart/form-data`.")
            },
            UploadError::BoundaryNotFoundError => f.write_str(
                "The boundary cannot be found. Maybe the multipart form data is incorrect.",
            ),
            UploadError::InvalidFileType {
                allowed,
            } => f.write_fmt(format_args!(
                "Invalid file type. Allowed types: {}",
                allowed.join(", ")
            )),
            UploadError::SizeLimitExceeded {
                field,
                limit,
            } => f.write_fmt(format_args!(
                "The file of field `{}` is too large. The limit is {} bytes.",
                field, limit
            )),
            UploadError::DataTooLargeError {
                limit,
            } => f.write_fmt(format_args!(
                "The request body is too large. The limit is {} bytes.",
                limit
            )),
            UploadError::UnexpectedField(field) => {
                f.write_fmt(format_args!("Unexpected field `{}`.", field))
            },
            UploadError::StorageIOError(err) => Display::fmt(err, f),
            UploadError::MulterError(err) => Display::fmt(err, f),
            UploadError::FromUtf8Error(err) => Display::fmt(err, f),
        }
    }
}

impl Error for UploadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            UploadError::StorageIOError(err) => Some(err),
            UploadError::MulterError(err) => Some(err),
            UploadError::FromUtf8Error(err) => Some(err),
            _ => None,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for UploadError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'o> {
        log!(self.log_level(), "{} {}: {}", request.method(), request.uri(), self);

        (self.status(), self.to_string()).respond_to(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_file_type_lists_allowed_types() {
        let err = UploadError::InvalidFileType {
            allowed: Arc::from(vec!["image/png".to_string(), "image/gif".to_string()]),
        };

        assert_eq!(err.to_string(), "Invalid file type. Allowed types: image/png, image/gif");
        assert_eq!(err.status(), Status::UnsupportedMediaType);
    }

    #[test]
    fn test_status() {
        let err = UploadError::SizeLimitExceeded {
            field: Arc::from("file"), limit: 10
        };
        assert_eq!(err.status(), Status::PayloadTooLarge);

        let err: UploadError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.status(), Status::InternalServerError);
        assert!(err.source().is_some());

        assert_eq!(UploadError::UnexpectedField(Arc::from("x")).status(), Status::BadRequest);

        let err = UploadError::DataTooLargeError {
            limit: 10
        };
        assert_eq!(err.status(), Status::PayloadTooLarge);
        assert_eq!(err.to_string(), "The request body is too large. The limit is 10 bytes.");
    }

    #[test]
    fn test_log_level() {
        let err: UploadError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.log_level(), Level::Error);

        let err: UploadError = multer::Error::IncompleteStream.into();
        assert_eq!(err.log_level(), Level::Error);
        assert_eq!(err.status(), Status::BadRequest);

        assert_eq!(UploadError::NotFormDataError.log_level(), Level::Warn);
        assert_eq!(UploadError::UnexpectedField(Arc::from("x")).log_level(), Level::Warn);
        assert_eq!(
            UploadError::SizeLimitExceeded {
                field: Arc::from("file"), limit: 10
            }
            .log_level(),
            Level::Warn
        );
    }
}
