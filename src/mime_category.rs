use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

const IMAGE_MIME_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];

const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/mpeg",
    "video/ogg",
    "video/webm",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-ms-wmv",
];

const PDF_MIME_TYPES: &[&str] = &["application/pdf"];

const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
];

const ALL_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/mpeg",
    "video/ogg",
    "video/webm",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-ms-wmv",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
];

/// The names of the recognized file categories.
pub const ALLOWED_FILE_TYPES: [&str; 5] = ["images", "videos", "pdfs", "documents", "all"];

/// A named set of MIME types which can be allowed for uploading.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MimeCategory {
    /// JPEG, PNG, GIF and WebP images.
    Images,
    /// Common video containers.
    Videos,
    /// PDF only.
    Pdfs,
    /// PDF, Office documents and plain text.
    Documents,
    /// Every type of the other categories.
    All,
}

impl MimeCategory {
    /// Every category, in the same order as `ALLOWED_FILE_TYPES`.
    pub const VARIANTS: [MimeCategory; 5] = [
        MimeCategory::Images,
        MimeCategory::Videos,
        MimeCategory::Pdfs,
        MimeCategory::Documents,
        MimeCategory::All,
    ];

    /// The MIME types of this category.
    #[inline]
    pub const fn mime_types(self) -> &'static [&'static str] {
        match self {
            MimeCategory::Images => IMAGE_MIME_TYPES,
            MimeCategory::Videos => VIDEO_MIME_TYPES,
            MimeCategory::Pdfs => PDF_MIME_TYPES,
            MimeCategory::Documents => DOCUMENT_MIME_TYPES,
            MimeCategory::All => ALL_MIME_TYPES,
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            MimeCategory::Images => "images",
            MimeCategory::Videos => "videos",
            MimeCategory::Pdfs => "pdfs",
            MimeCategory::Documents => "documents",
            MimeCategory::All => "all",
        }
    }
}

impl Display for MimeCategory {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        f.write_str(self.as_str())
    }
}

/// The category name is not one of `ALLOWED_FILE_TYPES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMimeCategory(pub String);

impl Display for UnknownMimeCategory {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> Result<(), fmt::Error> {
        f.write_fmt(format_args!("`{}` is not a known file category.", self.0))
    }
}

impl Error for UnknownMimeCategory {}

impl FromStr for MimeCategory {
    type Err = UnknownMimeCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MimeCategory::VARIANTS
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownMimeCategory(s.to_string()))
    }
}
