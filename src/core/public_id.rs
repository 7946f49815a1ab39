//! Recovers a media host identifier from a stored secure URL.
//!
//! Only used for records that predate the `profile_image_public_id` column.
//! The identifier is the last two path segments with the file extension of
//! the final segment removed: `https://host/profile-images/abc123.jpg`
//! becomes `profile-images/abc123`.

use url::Url;

pub fn derive_public_id(reference: &str) -> Option<String> {
    let segments: Vec<String> = match Url::parse(reference) {
        Ok(url) => url
            .path_segments()?
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        // legacy rows may hold a bare path
        Err(_) => reference
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    };

    let [.., folder, file] = segments.as_slice() else {
        return None;
    };
    let stem = file.split('.').next().unwrap_or(file);
    if stem.is_empty() {
        return None;
    }

    Some(format!("{}/{}", folder, stem))
}
