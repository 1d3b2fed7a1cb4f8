//! # pinnote-content
//!
//! Rewrites note text between the two image grammars:
//!
//! - **storage form** — the persisted representation embeds opaque
//!   placeholder tokens `{{img:<uuid>}}` in the note body
//! - **editor form** — the transient display representation substitutes
//!   each placeholder with standard inline-image markdown
//!   `![image](<signed-url>)`
//!
//! The two grammars are never mixed in persisted storage. The rewrite is
//! lossless for placeholders that resolve, and leaves externally-hosted
//! markdown images untouched in the reverse direction.

pub mod transform;

pub use transform::{
    extract_image_ids, has_display_images, has_placeholders, to_editor_form, to_storage_form,
};
