//! Object storage buckets and workspace asset naming.

use crate::types::DbId;

pub const BUCKET_AVATARS: &str = "avatars";
pub const BUCKET_REFERENCE_IMAGES: &str = "reference_images";
pub const BUCKET_SYSTEM_ASSETS: &str = "system_assets";
pub const BUCKET_USER_LIBRARY: &str = "user-library";
pub const BUCKET_VIDEOS: &str = "videos";
/// Private bucket holding freshly generated assets awaiting save/discard.
pub const BUCKET_WORKSPACE_TEMP: &str = "workspace-temp";

/// All buckets the platform provisions.
pub const ALL_BUCKETS: [&str; 6] = [
    BUCKET_AVATARS,
    BUCKET_REFERENCE_IMAGES,
    BUCKET_SYSTEM_ASSETS,
    BUCKET_USER_LIBRARY,
    BUCKET_VIDEOS,
    BUCKET_WORKSPACE_TEMP,
];

/// Default lifetime of a signed result URL.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;

/// Default lifetime of a workspace asset before it expires.
pub const DEFAULT_WORKSPACE_ASSET_TTL_HOURS: i64 = 48;

/// Object path of a workspace asset: `{user_id}/{job_id}_{index}.{ext}`.
pub fn workspace_asset_path(user_id: DbId, job_id: DbId, index: usize, ext: &str) -> String {
    format!("{user_id}/{job_id}_{index}.{ext}")
}

/// Pick a file extension for a downloaded asset.
///
/// The content type wins; the URL path's extension is the fallback, and
/// `fallback` (derived from the job format) is used when neither is usable.
pub fn asset_extension(content_type: Option<&str>, url: &str, fallback: &str) -> String {
    if let Some(ext) = content_type.and_then(extension_for_mime) {
        return ext.to_string();
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    if let Some((_, ext)) = file.rsplit_once('.') {
        let ext = ext.to_ascii_lowercase();
        if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext;
        }
    }

    fallback.to_string()
}

/// Default extension for a job format when nothing better is known.
pub fn default_extension(format: &str) -> &'static str {
    match format {
        "video" => "mp4",
        _ => "png",
    }
}

fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "video/mp4" => Some("mp4"),
        "video/webm" => Some("webm"),
        "video/quicktime" => Some("mov"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_layout() {
        let user = uuid::Uuid::nil();
        let job = uuid::Uuid::nil();
        assert_eq!(
            workspace_asset_path(user, job, 0, "png"),
            format!("{user}/{job}_0.png")
        );
    }

    #[test]
    fn content_type_wins() {
        assert_eq!(
            asset_extension(Some("image/webp; charset=binary"), "https://x/out.png", "png"),
            "webp"
        );
    }

    #[test]
    fn url_extension_is_fallback() {
        assert_eq!(
            asset_extension(Some("application/octet-stream"), "https://x/y/out.MP4?sig=1", "png"),
            "mp4"
        );
    }

    #[test]
    fn format_default_when_unknown() {
        assert_eq!(asset_extension(None, "https://x/download", "mp4"), "mp4");
        assert_eq!(default_extension("video"), "mp4");
        assert_eq!(default_extension("image"), "png");
    }
}
