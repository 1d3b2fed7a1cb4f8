//! # pinnote-store
//!
//! Object storage for image variants: the [`ObjectStore`] collaborator
//! trait with in-memory and hosted-HTTP backends, the signed-URL cache, the
//! [`ImageStoreClient`] (upload, signed-URL issuance, deletion, bounded
//! retry), and the in-memory [`ImageRegistry`] used by the content
//! transformer.
//!
//! The backing bucket is private: note content only ever references images
//! by opaque storage path, and display URLs are short-lived signed URLs
//! issued (and cached) on demand.

pub mod backend;
pub mod cache;
pub mod client;
pub mod http;
pub mod memory;
pub mod registry;

pub use backend::ObjectStore;
pub use cache::SignedUrlCache;
pub use client::{ImageStoreClient, StoreClientConfig};
pub use http::{HttpObjectStore, HttpStoreConfig};
pub use memory::MemoryObjectStore;
pub use registry::{normalize_url, ImageRegistry};
