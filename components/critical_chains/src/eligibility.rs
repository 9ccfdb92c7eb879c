//! Which requests may appear in a critical chain

use trace_types::NetworkRecord;

use crate::types::{ChainOptions, NavigationContext};

const ICON_MIME_TYPES: [&str; 2] = ["image/x-icon", "image/vnd.microsoft.icon"];
const FAVICON_EXTENSIONS: [&str; 7] = ["ico", "png", "svg", "gif", "jpg", "jpeg", "webp"];

/// Whether the request fetched a site icon
///
/// Matches a path ending in `/favicon.ico`, an icon MIME type, or an image leaf
/// whose name starts with `favicon` (`favicon-32x32.png`).
pub fn is_favicon(record: &NetworkRecord) -> bool {
    let path = record.url_path();
    if path.ends_with("/favicon.ico") {
        return true;
    }

    let mime_type = record.mime_type.to_ascii_lowercase();
    if ICON_MIME_TYPES.contains(&mime_type.as_str()) {
        return true;
    }

    let leaf = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    match leaf.rsplit_once('.') {
        Some((stem, extension)) => {
            stem.starts_with("favicon") && FAVICON_EXTENSIONS.contains(&extension)
        }
        None => false,
    }
}

/// Whether a request may appear in a chain on its own merits
pub fn is_eligible(record: &NetworkRecord, context: &NavigationContext, options: &ChainOptions) -> bool {
    if !record.finished || record.is_link_preload || is_favicon(record) {
        return false;
    }
    if let Some(frame_id) = record.frame_id.as_deref() {
        if frame_id != context.main_frame_id {
            return false;
        }
    }
    if options.exclude_before_time_origin && record.start_time < context.time_origin {
        return false;
    }
    true
}
