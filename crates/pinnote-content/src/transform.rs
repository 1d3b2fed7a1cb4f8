//! Placeholder ↔ markdown rewriting.
//!
//! `to_editor_form` resolves every `{{img:<uuid>}}` token to a live signed
//! URL (one batched issuance for all misses) and substitutes the display
//! markdown; `to_storage_form` reverses the substitution via the registry.
//! For content whose placeholders all resolve, the round trip is the
//! identity.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use pinnote_core::Result;
use pinnote_store::{ImageRegistry, ImageStoreClient};

/// Storage-of-record token: a UUID wrapped in double braces with an
/// `img:` tag. Case-insensitive hex, hyphens as in standard UUID format.
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{img:([0-9a-fA-F-]+)\}\}").unwrap());

/// Display token: standard markdown inline image `![alt](url)`.
static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").unwrap());

/// Whether `content` contains any image placeholder.
pub fn has_placeholders(content: &str) -> bool {
    PLACEHOLDER_RE.is_match(content)
}

/// Whether `content` contains any markdown inline image.
pub fn has_display_images(content: &str) -> bool {
    MARKDOWN_IMAGE_RE.is_match(content)
}

/// Image UUIDs referenced by `content`, in document order, duplicates
/// preserved. Tokens whose payload is not a valid UUID are skipped.
pub fn extract_image_ids(content: &str) -> Vec<Uuid> {
    PLACEHOLDER_RE
        .captures_iter(content)
        .filter_map(|caps| Uuid::parse_str(&caps[1]).ok())
        .collect()
}

/// Rewrite storage form to editor form.
///
/// Every placeholder whose UUID appears in `storage_paths` gets a signed
/// URL (issued in a single batch through `store`, which serves cache hits
/// locally), is registered in `registry`, and is substituted with
/// `![image](<url>)`. A placeholder whose UUID is missing from the map, or
/// whose URL could not be issued, is left in place unresolved rather than
/// dropped, so the renderer can show a missing-asset state.
pub async fn to_editor_form(
    content: &str,
    storage_paths: &HashMap<Uuid, String>,
    registry: &mut ImageRegistry,
    store: &ImageStoreClient,
) -> Result<String> {
    let ids = extract_image_ids(content);
    if ids.is_empty() {
        return Ok(content.to_string());
    }

    // Unique paths to sign, preserving first-seen order.
    let mut paths: Vec<String> = Vec::new();
    for id in &ids {
        if let Some(path) = storage_paths.get(id) {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
    }

    let urls = store.get_signed_urls(&paths).await?;
    debug!(
        path_count = paths.len(),
        resolved = urls.len(),
        "resolved signed URLs for editor form"
    );

    for caps in PLACEHOLDER_RE.captures_iter(content) {
        let Ok(id) = Uuid::parse_str(&caps[1]) else {
            continue;
        };
        if let Some(path) = storage_paths.get(&id) {
            if let Some(url) = urls.get(path) {
                registry.register(id, url, path);
                // Keep the verbatim token so the reverse rewrite restores
                // the original spelling (UUID hex case included).
                registry.remember_placeholder(id, &caps[0]);
            } else {
                warn!(image_id = %id, storage_path = %path, "signed URL unavailable");
            }
        }
    }

    let rewritten = PLACEHOLDER_RE.replace_all(content, |caps: &regex::Captures<'_>| {
        let resolved = Uuid::parse_str(&caps[1])
            .ok()
            .and_then(|id| registry.get_url(id));
        match resolved {
            Some(url) => format!("![image]({})", url),
            // Unresolved placeholders survive verbatim.
            None => caps[0].to_string(),
        }
    });
    Ok(rewritten.into_owned())
}

/// Rewrite editor form back to storage form.
///
/// Markdown images whose URL reverse-resolves through the registry become
/// placeholders again; any other markdown image (externally hosted, pasted
/// by the user) passes through untouched.
pub fn to_storage_form(content: &str, registry: &ImageRegistry) -> String {
    MARKDOWN_IMAGE_RE
        .replace_all(content, |caps: &regex::Captures<'_>| {
            match registry.get_uuid(&caps[2]) {
                Some(id) => match registry.get_placeholder(id) {
                    Some(token) => token.to_string(),
                    None => format!("{{{{img:{}}}}}", id),
                },
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
