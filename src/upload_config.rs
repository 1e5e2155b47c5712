use std::{collections::HashSet, sync::Arc};

use log::debug;

use crate::{
    upload_options::{DEFAULT_FIELD_NAME, DEFAULT_FILE_SIZE_LIMIT},
    DiskStorage, MimeCategory, MimeTypeFilter, UploadField, UploadHandler, UploadOptions,
    DEFAULT_MAX_TEXT_BYTES,
};

/// Get the allowed MIME types of the options.
///
/// `custom_mime_types` is returned as is if it is not empty. Otherwise the types of the categories in `file_types` are joined in order, without duplicates. Unknown category names are ignored. If `file_types` is empty too, every type of `MimeCategory::All` is allowed.
pub fn resolve_allowed_mime_types(options: &UploadOptions) -> Vec<String> {
    if !options.custom_mime_types.is_empty() {
        return options.custom_mime_types.clone();
    }

    if options.file_types.is_empty() {
        return MimeCategory::All.mime_types().iter().map(|s| s.to_string()).collect();
    }

    let mut seen = HashSet::new();

    options
        .file_types
        .iter()
        .filter_map(|name| name.parse::<MimeCategory>().ok())
        .flat_map(|category| category.mime_types().iter().copied())
        .filter(|mime_type| seen.insert(*mime_type))
        .map(String::from)
        .collect()
}

/// The storage, filter and limit derived from `UploadOptions`.
#[derive(Debug, Clone)]
pub struct ResolvedUploadConfig {
    pub allowed_mime_types: Vec<String>,
    pub size_limit:         u64,
    pub storage:            DiskStorage,
    pub preserve_path:      bool,
    pub max_text_bytes:     u64,
    pub max_data_bytes:     Option<u64>,
}

impl ResolvedUploadConfig {
    /// Resolve the options as they are.
    pub fn resolve(options: &UploadOptions) -> ResolvedUploadConfig {
        let resolved = ResolvedUploadConfig {
            allowed_mime_types: resolve_allowed_mime_types(options),
            size_limit:         options.explicit_size_limit().unwrap_or(DEFAULT_FILE_SIZE_LIMIT),
            storage:            DiskStorage::new(Some(options.destination_or_default())),
            preserve_path:      options.preserve_path,
            max_text_bytes:     options.max_text_bytes.unwrap_or(DEFAULT_MAX_TEXT_BYTES),
            max_data_bytes:     options.max_data_bytes,
        };

        debug!(
            "resolved upload config: {} allowed types, size limit {} bytes, destination {}",
            resolved.allowed_mime_types.len(),
            resolved.size_limit,
            resolved.storage.destination().display()
        );

        resolved
    }

    /// Resolve the options for multiple fields.
    ///
    /// The size limit is the largest of the top-level limit and the limits of the fields. The `file_types` of the fields replace the top-level `file_types`, but the top-level `custom_mime_types` still take precedence.
    pub fn resolve_multiple(options: &UploadOptions) -> ResolvedUploadConfig {
        let max_file_size = options
            .fields
            .iter()
            .map(|field| field.file_size_limit.unwrap_or(0))
            .fold(options.file_size_limit.unwrap_or(0), u64::max);

        let mut file_types: Vec<String> = Vec::new();

        for field in options.fields.iter() {
            for file_type in field.file_types.iter() {
                if !file_types.contains(file_type) {
                    file_types.push(file_type.clone());
                }
            }
        }

        let combined = UploadOptions {
            file_types,
            file_size_limit: Some(max_file_size),
            ..options.clone()
        };

        ResolvedUploadConfig::resolve(&combined)
    }

    /// Build a handler which accepts the given fields.
    pub fn into_handler(self, fields: Vec<UploadField>) -> UploadHandler {
        let handler = UploadHandler::with_strategies(
            Arc::new(self.storage),
            Arc::new(MimeTypeFilter::new(self.allowed_mime_types)),
            self.size_limit,
            fields,
        )
        .preserve_path(self.preserve_path)
        .max_text_bytes(self.max_text_bytes);

        match self.max_data_bytes {
            Some(max_data_bytes) => handler.max_data_bytes(max_data_bytes),
            None => handler,
        }
    }
}

/// Build a handler which accepts one file in the field named by `options.field_name`, or `file`.
pub fn upload_single(options: &UploadOptions) -> UploadHandler {
    let field_name = options.field_name.as_deref().unwrap_or(DEFAULT_FIELD_NAME);

    ResolvedUploadConfig::resolve(options).into_handler(vec![UploadField::new(field_name, 1)])
}

/// Build a handler which accepts the fields of `options.fields`.
///
/// Each field accepts `max_count` files, or one.
pub fn upload_multiple(options: &UploadOptions) -> UploadHandler {
    let fields = options
        .fields
        .iter()
        .map(|field| UploadField::new(field.name.as_str(), field.max_count.unwrap_or(1)))
        .collect();

    ResolvedUploadConfig::resolve_multiple(options).into_handler(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldConfig, MULTIPART_OVERHEAD};

    fn strings(mime_types: &[&str]) -> Vec<String> {
        mime_types.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_each_category() {
        for category in MimeCategory::VARIANTS {
            let options = UploadOptions::new().file_types([category.as_str()]);

            assert_eq!(resolve_allowed_mime_types(&options), strings(category.mime_types()));
        }
    }

    #[test]
    fn test_custom_types_override_categories() {
        let options = UploadOptions::new()
            .file_type(MimeCategory::Images)
            .custom_mime_type("application/x-custom");

        assert_eq!(resolve_allowed_mime_types(&options), vec!["application/x-custom"]);
    }

    #[test]
    fn test_no_types_allows_all() {
        assert_eq!(
            resolve_allowed_mime_types(&UploadOptions::new()),
            strings(MimeCategory::All.mime_types())
        );
    }

    #[test]
    fn test_unknown_categories_are_ignored() {
        let options = UploadOptions::new().file_types(["archives", "pdfs"]);
        assert_eq!(resolve_allowed_mime_types(&options), vec!["application/pdf"]);

        let options = UploadOptions::new().file_types(["archives"]);
        assert!(resolve_allowed_mime_types(&options).is_empty());
    }

    #[test]
    fn test_union_keeps_order_without_duplicates() {
        let options = UploadOptions::new().file_types(["pdfs", "documents", "pdfs"]);

        assert_eq!(
            resolve_allowed_mime_types(&options),
            strings(MimeCategory::Documents.mime_types())
        );
    }

    #[test]
    fn test_default_size_limit() {
        assert_eq!(
            ResolvedUploadConfig::resolve(&UploadOptions::new()).size_limit,
            50 * 1024 * 1024
        );
        assert_eq!(
            ResolvedUploadConfig::resolve(&UploadOptions::new().file_size_limit(0)).size_limit,
            50 * 1024 * 1024
        );
        assert_eq!(
            ResolvedUploadConfig::resolve(&UploadOptions::new().file_size_limit(10)).size_limit,
            10
        );
    }

    #[test]
    fn test_upload_single_field_name() {
        let handler = upload_single(&UploadOptions::new());
        assert_eq!(handler.fields(), &[UploadField::new("file", 1)]);

        let handler = upload_single(&UploadOptions::new().field_name("avatar"));
        assert_eq!(handler.fields()[0].name.as_ref(), "avatar");
    }

    #[test]
    fn test_multiple_size_limit_is_max_of_fields() {
        let options = UploadOptions::with_fields(vec![
            FieldConfig::new("a").file_size_limit(10),
            FieldConfig::new("b").file_size_limit(100),
        ]);

        assert_eq!(upload_multiple(&options).size_limit(), 100);
    }

    #[test]
    fn test_multiple_size_limit_includes_top_level() {
        let options = UploadOptions::with_fields(vec![FieldConfig::new("a").file_size_limit(10)])
            .file_size_limit(1000);

        assert_eq!(upload_multiple(&options).size_limit(), 1000);
    }

    #[test]
    fn test_multiple_size_limit_defaults() {
        let options = UploadOptions::with_fields(vec![FieldConfig::new("a")]);

        assert_eq!(upload_multiple(&options).size_limit(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_multiple_types_are_union_of_fields() {
        let options = UploadOptions::with_fields(vec![
            FieldConfig::new("cover").file_type(MimeCategory::Images),
            FieldConfig::new("manual").file_type(MimeCategory::Pdfs),
        ]);

        let resolved = ResolvedUploadConfig::resolve_multiple(&options);

        let mut expected = strings(MimeCategory::Images.mime_types());
        expected.push("application/pdf".to_string());
        assert_eq!(resolved.allowed_mime_types, expected);
    }

    #[test]
    fn test_multiple_replaces_top_level_file_types() {
        let options = UploadOptions::with_fields(vec![
            FieldConfig::new("cover").file_type(MimeCategory::Images),
        ])
        .file_type(MimeCategory::Videos);

        let resolved = ResolvedUploadConfig::resolve_multiple(&options);

        assert_eq!(resolved.allowed_mime_types, strings(MimeCategory::Images.mime_types()));
    }

    #[test]
    fn test_multiple_keeps_top_level_custom_types() {
        let options = UploadOptions::with_fields(vec![
            FieldConfig::new("cover").file_type(MimeCategory::Images),
        ])
        .custom_mime_type("application/zip");

        let resolved = ResolvedUploadConfig::resolve_multiple(&options);

        assert_eq!(resolved.allowed_mime_types, vec!["application/zip"]);
    }

    #[test]
    fn test_multiple_without_field_types_allows_all() {
        let options = UploadOptions::with_fields(vec![FieldConfig::new("a")])
            .file_type(MimeCategory::Pdfs);

        let resolved = ResolvedUploadConfig::resolve_multiple(&options);

        assert_eq!(resolved.allowed_mime_types, strings(MimeCategory::All.mime_types()));
    }

    #[test]
    fn test_multiple_max_counts() {
        let options = UploadOptions::with_fields(vec![
            FieldConfig::new("photos").max_count(4),
            FieldConfig::new("cover"),
        ]);

        let handler = upload_multiple(&options);

        assert_eq!(handler.fields(), &[
            UploadField::new("cover", 1),
            UploadField::new("photos", 4),
        ]);
    }

    #[test]
    fn test_request_limits() {
        let handler = upload_single(&UploadOptions::new().file_size_limit(100));
        assert_eq!(handler.data_limit(), 100 + DEFAULT_MAX_TEXT_BYTES + MULTIPART_OVERHEAD);

        let options = UploadOptions::with_fields(vec![FieldConfig::new("photos").max_count(3)])
            .file_size_limit(100)
            .max_text_bytes(0);
        assert_eq!(upload_multiple(&options).data_limit(), 300 + MULTIPART_OVERHEAD);

        let handler = upload_single(&UploadOptions::new().max_data_bytes(1024));
        assert_eq!(handler.data_limit(), 1024);
    }

    #[test]
    fn test_default_destination() {
        let resolved = ResolvedUploadConfig::resolve(&UploadOptions::new());
        assert_eq!(resolved.storage.destination(), std::path::Path::new("uploads"));
    }
}
