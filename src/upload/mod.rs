//! Product image uploads to Cloudinary.

pub mod cloudinary;

pub use cloudinary::{public_id, sign, CloudinaryUploader, UploadError, UPLOAD_FOLDER};

/// Largest accepted image.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
