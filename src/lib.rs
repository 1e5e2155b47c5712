/*!
# Multipart File Uploads for Rocket Framework

This crate turns a few upload options (destination, allowed file categories, size limits and fields) into a configured handler which stores the files of `multipart/form-data` requests on disk. The multipart data is parsed by [`multer`](https://crates.io/crates/multer).

Stored files are named `{uuid}-{field name}{extension}`. A file whose declared content type is not allowed fails with `UploadError::InvalidFileType`, and a file over the size limit fails with `UploadError::SizeLimitExceeded`. `UploadError` is a Rocket responder.

## Example

```rust,no_run
use rocket::{http::ContentType, Build, Data, Rocket, State};

use rocket_multipart_upload::{
    upload_single, MimeCategory, UploadError, UploadHandler, UploadOptions,
};

#[rocket::post("/avatar", data = "<data>")]
async fn avatar(
    handler: &State<UploadHandler>,
    content_type: &ContentType,
    data: Data<'_>,
) -> Result<String, UploadError> {
    let uploaded = handler.handle(content_type, data).await?;

    match uploaded.single("avatar") {
        Some(file) => Ok(file.file_name.clone()), // such as "5b6f...-avatar.png"
        None => Ok(String::from("Please input a file.")),
    }
}

fn rocket() -> Rocket<Build> {
    let options = UploadOptions::new()
        .destination("uploads/avatars")
        .field_name("avatar")
        .file_type(MimeCategory::Images)
        .file_size_limit(2 * 1024 * 1024);

    rocket::build().manage(upload_single(&options)).mount("/", rocket::routes![avatar])
}

fn main() {
    let _ = rocket();
}
```

Options can also be read from the `upload` table of `Rocket.toml` with `UploadOptions::from_figment`.

Also see `demos`.
*/

pub extern crate mime;
pub extern crate multer;

mod fields;
mod file_filter;
mod file_utils;
mod mime_category;
mod progress;
mod storage;
mod upload_config;
mod upload_errors;
mod upload_handler;
mod upload_options;

pub use fields::*;
pub use file_filter::*;
pub use file_utils::*;
pub use mime_category::*;
pub use progress::*;
pub use storage::*;
pub use upload_config::*;
pub use upload_errors::*;
pub use upload_handler::*;
pub use upload_options::*;
