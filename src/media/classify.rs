//! URL format classification.
//!
//! The precedence below is part of the stored data contract: records saved by
//! earlier versions were classified with it, so reordering the checks would
//! reclassify existing bookmarks differently from new ones.

use super::{MediaFormat, MediaType};

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "avif", "ico", "tiff",
];
const IMAGE_QUERY_MARKERS: &[&str] = &["format=webp", "format=png", "fm=webp", "fm=png"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "mkv", "avi", "m3u8"];
const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "twitch.tv",
    "dailymotion.com",
    "tiktok.com",
];

/// Maps a URL and its type hint to a format. First match wins:
/// image, video, document, website, other.
///
/// ```
/// use mediashelf::media::{detect_format, MediaFormat, MediaType};
///
/// assert_eq!(detect_format("https://x.com/a.png", MediaType::Image), MediaFormat::Image);
/// assert_eq!(detect_format("https://youtu.be/abc", MediaType::Video), MediaFormat::Video);
/// assert_eq!(detect_format("https://x.com/doc.pdf", MediaType::Other), MediaFormat::Document);
/// assert_eq!(detect_format("https://example.com", MediaType::Other), MediaFormat::Website);
/// assert_eq!(detect_format("ftp://x", MediaType::Other), MediaFormat::Other);
/// ```
pub fn detect_format(url: &str, type_hint: MediaType) -> MediaFormat {
    let lower = url.trim().to_lowercase();
    let (path, query) = split_path_and_query(&lower);

    if type_hint == MediaType::Image
        || has_extension(path, IMAGE_EXTENSIONS)
        || lower.contains("image")
        || IMAGE_QUERY_MARKERS
            .iter()
            .any(|marker| query_has_param(query, marker))
    {
        return MediaFormat::Image;
    }

    if type_hint == MediaType::Video
        || has_extension(path, VIDEO_EXTENSIONS)
        || VIDEO_HOSTS.iter().any(|host| lower.contains(host))
        || lower.contains("video")
    {
        return MediaFormat::Video;
    }

    if path.ends_with(".pdf") || lower.contains("pdf") {
        return MediaFormat::Document;
    }

    if lower.starts_with("http://") || lower.starts_with("https://") {
        return MediaFormat::Website;
    }

    MediaFormat::Other
}

fn split_path_and_query(url: &str) -> (&str, &str) {
    let without_fragment = url.split('#').next().unwrap_or(url);
    match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    }
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    // A dot in the host ("example.com") is not an extension.
    if ext.contains('/') {
        return false;
    }
    extensions.contains(&ext)
}

fn query_has_param(query: &str, marker: &str) -> bool {
    query.split('&').any(|pair| pair == marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scenarios() {
        assert_eq!(
            detect_format("https://x.com/a.png", MediaType::Image),
            MediaFormat::Image
        );
        assert_eq!(
            detect_format("https://youtu.be/abc", MediaType::Video),
            MediaFormat::Video
        );
        assert_eq!(
            detect_format("https://x.com/doc.pdf", MediaType::Other),
            MediaFormat::Document
        );
        assert_eq!(
            detect_format("https://example.com", MediaType::Other),
            MediaFormat::Website
        );
        assert_eq!(detect_format("ftp://x", MediaType::Other), MediaFormat::Other);
    }

    #[test]
    fn test_image_by_extension_ignores_query_and_fragment() {
        assert_eq!(
            detect_format("https://cdn.test/pic.JPEG?w=200#top", MediaType::Other),
            MediaFormat::Image
        );
    }

    #[test]
    fn test_image_by_output_format_query() {
        assert_eq!(
            detect_format("https://cdn.test/render?id=4&fm=webp", MediaType::Other),
            MediaFormat::Image
        );
        assert_eq!(
            detect_format("https://cdn.test/render?format=png", MediaType::Other),
            MediaFormat::Image
        );
    }

    #[test]
    fn test_image_substring_beats_video_host() {
        // Image checks run first, so an "image" substring wins over a video host.
        assert_eq!(
            detect_format("https://youtube.com/image/123", MediaType::Other),
            MediaFormat::Image
        );
    }

    #[test]
    fn test_video_by_host_extension_and_substring() {
        assert_eq!(
            detect_format("https://www.youtube.com/watch?v=1", MediaType::Other),
            MediaFormat::Video
        );
        assert_eq!(
            detect_format("https://cdn.test/clip.webm", MediaType::Other),
            MediaFormat::Video
        );
        assert_eq!(
            detect_format("https://cdn.test/videos/42", MediaType::Other),
            MediaFormat::Video
        );
    }

    #[test]
    fn test_video_before_document() {
        assert_eq!(
            detect_format("https://vimeo.com/pdf-tutorial", MediaType::Other),
            MediaFormat::Video
        );
    }

    #[test]
    fn test_document_substring() {
        assert_eq!(
            detect_format("https://papers.test/download?type=pdf", MediaType::Other),
            MediaFormat::Document
        );
    }

    #[test]
    fn test_host_dot_is_not_extension() {
        assert_eq!(
            detect_format("https://example.png.test/", MediaType::Other),
            MediaFormat::Website
        );
    }

    #[test]
    fn test_non_http_without_markers_is_other() {
        assert_eq!(
            detect_format("mailto:someone@example.com", MediaType::Other),
            MediaFormat::Other
        );
        assert_eq!(detect_format("", MediaType::Other), MediaFormat::Other);
    }

    #[test]
    fn test_hint_forces_category() {
        assert_eq!(
            detect_format("https://example.com/page", MediaType::Video),
            MediaFormat::Video
        );
        assert_eq!(
            detect_format("file:///tmp/x", MediaType::Image),
            MediaFormat::Image
        );
    }
}
