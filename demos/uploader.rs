#[macro_use]
extern crate rocket;

use std::path::PathBuf;

use rocket::{fairing::AdHoc, http::ContentType, Data, State};
use rocket_multipart_upload::{
    delete_file, upload_multiple, upload_single, FieldConfig, MimeCategory, UploadError,
    UploadHandler, UploadOptions, UploadProgress,
};

struct Avatar(UploadHandler);

/// The directory the avatars are stored in.
struct AvatarDirectory(PathBuf);

struct Gallery(UploadHandler);

#[post("/avatar", data = "<data>")]
async fn avatar(
    handler: &State<Avatar>,
    progress: UploadProgress,
    content_type: &ContentType,
    data: Data<'_>,
) -> Result<String, UploadError> {
    let uploaded = handler.0.handle_with_progress(content_type, data, &progress).await?;

    log::info!("avatar upload finished at {:?}%", progress.percentage());

    let lines: Vec<String> = uploaded
        .files
        .values()
        .flatten()
        .map(|f| format!("{} => {}", f.original_name, f.file_name))
        .collect();

    Ok(lines.join("\n"))
}

#[post("/gallery", data = "<data>")]
async fn gallery(
    handler: &State<Gallery>,
    content_type: &ContentType,
    data: Data<'_>,
) -> Result<String, UploadError> {
    let uploaded = handler.0.handle(content_type, data).await?;

    let title = uploaded.text("title").unwrap_or("Untitled");

    Ok(format!("{}: {} files", title, uploaded.file_count()))
}

#[delete("/uploads/<name>")]
async fn remove(directory: &State<AvatarDirectory>, name: &str) -> &'static str {
    if delete_file(directory.0.join(name)).await {
        "deleted"
    } else {
        "not deleted"
    }
}

#[launch]
fn rocket() -> _ {
    rocket::build()
        .attach(AdHoc::try_on_ignite("Upload Handlers", |rocket| async move {
            // The `[default.upload]` table of Rocket.toml, or `ROCKET_UPLOAD={...}`.
            let options = match UploadOptions::from_figment(rocket.figment()) {
                Ok(options) => options,
                Err(err) => {
                    log::error!("invalid upload options: {}", err);

                    return Err(rocket);
                },
            };

            let gallery_options = UploadOptions::with_fields(vec![
                FieldConfig::new("cover").file_type(MimeCategory::Images),
                FieldConfig::new("photos").max_count(10).file_type(MimeCategory::Images),
                FieldConfig::new("clips")
                    .max_count(3)
                    .file_type(MimeCategory::Videos)
                    .file_size_limit(200 * 1024 * 1024),
            ]);

            Ok(rocket
                .manage(AvatarDirectory(options.destination_or_default()))
                .manage(Avatar(upload_single(&options)))
                .manage(Gallery(upload_multiple(&gallery_options))))
        }))
        .mount("/", routes![avatar, gallery, remove])
}
