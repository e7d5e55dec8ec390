pub mod repo;
pub mod services;

pub use repo::{delete_images_tx, insert_images_tx, list_images, ImageOwner};
pub use services::{
    check_images, upload_limit, FormOrJson, ImageView, UploadItem, MAX_IMAGES,
};
