//! Persistence Facade (C2): combined access to the metadata store, blob
//! store, and cache (spec §4.2).

pub mod blob_store;
pub mod cache;
pub mod images_repo;
pub mod recognitions_repo;

pub use blob_store::{BlobStore, S3BlobStore};
pub use cache::{Cache, RedisCache};
pub use images_repo::ImagesRepo;
pub use recognitions_repo::{NewRecognition, RecognitionsRepo};
