//! Local path resolution for file links
//!
//! A file's `link` may be an absolute http(s) URL into this platform's media
//! or staging area, a bare `/media/...` or `/temp/...` path, or an
//! already-local path. Resolution is pure: no filesystem access, same input
//! always yields the same normalized path.

use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Link resolution errors
#[derive(Debug, Error)]
pub enum PathError {
    #[error("File link is empty")]
    EmptyLink,

    #[error("Unparseable link: {0}")]
    InvalidLink(String),
}

/// Convert a file link to an absolute local filesystem path.
pub fn link_to_local_path(
    link: &str,
    media_root: &Path,
    temp_root: &Path,
) -> Result<PathBuf, PathError> {
    let link = link.trim();
    if link.is_empty() {
        return Err(PathError::EmptyLink);
    }

    // Absolute URLs keep only their path component
    let path_part = if link.starts_with("http://") || link.starts_with("https://") {
        let url = url::Url::parse(link).map_err(|e| PathError::InvalidLink(e.to_string()))?;
        url.path().to_string()
    } else {
        link.to_string()
    };

    let decoded = percent_decode_str(&path_part)
        .decode_utf8()
        .map_err(|e| PathError::InvalidLink(e.to_string()))?
        .into_owned();

    let resolved = if let Some(rest) = decoded.strip_prefix("/media/") {
        media_root.join(rest)
    } else if let Some(rest) = decoded.strip_prefix("/temp/") {
        temp_root.join(rest)
    } else {
        PathBuf::from(decoded)
    };

    Ok(normalize(&resolved))
}

/// Collapse `.` and `..` segments without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots() -> (PathBuf, PathBuf) {
        (
            PathBuf::from("/srv/mousetube/media"),
            PathBuf::from("/srv/mousetube/temp"),
        )
    }

    #[test]
    fn empty_link_is_rejected() {
        let (media, temp) = roots();
        assert!(matches!(
            link_to_local_path("", &media, &temp),
            Err(PathError::EmptyLink)
        ));
        assert!(matches!(
            link_to_local_path("   ", &media, &temp),
            Err(PathError::EmptyLink)
        ));
    }

    #[test]
    fn http_media_link_maps_under_media_root() {
        let (media, temp) = roots();
        let path =
            link_to_local_path("https://mousetube.org/media/lab1/rec.wav", &media, &temp).unwrap();
        assert_eq!(path, PathBuf::from("/srv/mousetube/media/lab1/rec.wav"));
    }

    #[test]
    fn http_temp_link_maps_under_temp_root() {
        let (media, temp) = roots();
        let path =
            link_to_local_path("http://mousetube.org/temp/upload_3.wav", &media, &temp).unwrap();
        assert_eq!(path, PathBuf::from("/srv/mousetube/temp/upload_3.wav"));
    }

    #[test]
    fn bare_media_and_temp_prefixes_map() {
        let (media, temp) = roots();
        assert_eq!(
            link_to_local_path("/media/a/b.flac", &media, &temp).unwrap(),
            PathBuf::from("/srv/mousetube/media/a/b.flac")
        );
        assert_eq!(
            link_to_local_path("/temp/b.flac", &media, &temp).unwrap(),
            PathBuf::from("/srv/mousetube/temp/b.flac")
        );
    }

    #[test]
    fn local_path_passes_through() {
        let (media, temp) = roots();
        assert_eq!(
            link_to_local_path("/data/archive/x.wav", &media, &temp).unwrap(),
            PathBuf::from("/data/archive/x.wav")
        );
    }

    #[test]
    fn percent_encoding_is_decoded() {
        let (media, temp) = roots();
        let path = link_to_local_path(
            "https://mousetube.org/media/lab%20one/rec%201.wav",
            &media,
            &temp,
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/srv/mousetube/media/lab one/rec 1.wav"));
    }

    #[test]
    fn dot_segments_are_collapsed() {
        let (media, temp) = roots();
        let path = link_to_local_path("/media/a/./b/../c.wav", &media, &temp).unwrap();
        assert_eq!(path, PathBuf::from("/srv/mousetube/media/a/c.wav"));
    }

    #[test]
    fn resolution_is_deterministic() {
        let (media, temp) = roots();
        let link = "https://mousetube.org/temp/u%c3%a9.wav";
        let first = link_to_local_path(link, &media, &temp).unwrap();
        let second = link_to_local_path(link, &media, &temp).unwrap();
        assert_eq!(first, second);
    }
}
