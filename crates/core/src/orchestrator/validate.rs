//! Submission validation.

use crate::error::JobError;

/// Image formats recognised by their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    Tiff,
}

/// Sniffs the image format from magic bytes.
pub fn detect_image_kind(bytes: &[u8]) -> Option<ImageKind> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some(ImageKind::Jpeg),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageKind::Png),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(ImageKind::Gif),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageKind::WebP),
        [b'B', b'M', ..] => Some(ImageKind::Bmp),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(ImageKind::Tiff),
        _ => None,
    }
}

/// Rejects empty, oversized and non-image submissions.
///
/// A declared content type must be `image/*` (or the generic
/// `application/octet-stream` some clients send); the bytes must be a
/// recognised image either way.
pub fn validate_submission(
    bytes: &[u8],
    content_type: Option<&str>,
    max_bytes: usize,
) -> Result<ImageKind, JobError> {
    if bytes.is_empty() {
        return Err(JobError::validation("No image was provided"));
    }

    if bytes.len() > max_bytes {
        return Err(JobError::validation(format!(
            "Image exceeds the maximum size of {} bytes",
            max_bytes
        )));
    }

    if let Some(ct) = content_type {
        let essence = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        if !essence.starts_with("image/") && essence != "application/octet-stream" {
            return Err(JobError::validation("The uploaded file is not an image"));
        }
    }

    detect_image_kind(bytes)
        .ok_or_else(|| JobError::validation("The uploaded file is not a supported image"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_detects_common_formats() {
        assert_eq!(detect_image_kind(JPEG), Some(ImageKind::Jpeg));
        assert_eq!(
            detect_image_kind(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(ImageKind::Png)
        );
        assert_eq!(detect_image_kind(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(detect_image_kind(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::WebP));
        assert_eq!(detect_image_kind(b"BM\0\0"), Some(ImageKind::Bmp));
        assert_eq!(detect_image_kind(b"II*\0"), Some(ImageKind::Tiff));
        assert_eq!(detect_image_kind(b"%PDF-1.7"), None);
        assert_eq!(detect_image_kind(b""), None);
    }

    #[test]
    fn test_accepts_jpeg() {
        assert_eq!(
            validate_submission(JPEG, Some("image/jpeg"), 1024).unwrap(),
            ImageKind::Jpeg
        );
        assert!(validate_submission(JPEG, None, 1024).is_ok());
        assert!(validate_submission(JPEG, Some("application/octet-stream"), 1024).is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        let err = validate_submission(b"", Some("image/jpeg"), 1024).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailure);
    }

    #[test]
    fn test_rejects_oversized() {
        let err = validate_submission(JPEG, None, 4).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailure);
        assert!(err.message.contains("maximum size"));
    }

    #[test]
    fn test_rejects_non_image_content_type() {
        let err = validate_submission(JPEG, Some("text/plain; charset=utf-8"), 1024).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailure);
    }

    #[test]
    fn test_rejects_non_image_bytes() {
        let err = validate_submission(b"#!/bin/sh\nrm -rf /", Some("image/png"), 1024).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailure);
    }
}
