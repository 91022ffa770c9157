pub mod channel;
pub mod history;
pub mod media_store;
pub mod session;

pub use media_store::{MediaStore, S3MediaStore};
