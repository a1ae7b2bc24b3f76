//! Product image uploads.
//!
//! Images are identified by their leading magic bytes, never by the file
//! name or the client's content type, and come back as `data:` URLs ready
//! to store in a product's `image_url`. No resizing or thumbnails.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use thiserror::Error;

/// Why an upload was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("no file was uploaded")]
    Missing,
    #[error("uploaded file is empty")]
    Empty,
    #[error("file exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },
    #[error("only PNG, JPEG, GIF and WebP images are accepted")]
    UnsupportedType,
}

/// Image formats the console accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    /// Identify an image from its first bytes.
    #[must_use]
    pub fn sniff(data: &[u8]) -> Option<Self> {
        match data {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// An accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedImage {
    pub data_url: String,
    pub mime: &'static str,
    /// Size of the original file.
    pub bytes: usize,
}

/// Validate an uploaded file and encode it as a `data:` URL.
///
/// # Errors
///
/// Returns `UploadError` if the file is empty, over `limit` bytes or not a
/// recognised image.
pub fn encode_image(data: &[u8], limit: usize) -> Result<EncodedImage, UploadError> {
    if data.is_empty() {
        return Err(UploadError::Empty);
    }
    if data.len() > limit {
        return Err(UploadError::TooLarge { limit });
    }
    let kind = ImageKind::sniff(data).ok_or(UploadError::UnsupportedType)?;

    Ok(EncodedImage {
        data_url: format!("data:{};base64,{}", kind.mime(), STANDARD.encode(data)),
        mime: kind.mime(),
        bytes: data.len(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn test_sniff_formats() {
        assert_eq!(ImageKind::sniff(PNG_HEADER), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF\x24\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"RIFF\x24\0\0\0WAVEfmt "), None);
        assert_eq!(ImageKind::sniff(b"<svg xmlns="), None);
    }

    #[test]
    fn test_encode_png() {
        let image = encode_image(PNG_HEADER, 1024).unwrap();
        assert_eq!(image.mime, "image/png");
        assert_eq!(image.bytes, PNG_HEADER.len());
        assert!(image.data_url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_encode_rejections() {
        assert_eq!(encode_image(&[], 10), Err(UploadError::Empty));
        assert_eq!(
            encode_image(PNG_HEADER, 4),
            Err(UploadError::TooLarge { limit: 4 })
        );
        assert_eq!(
            encode_image(b"%PDF-1.7", 1024),
            Err(UploadError::UnsupportedType)
        );
    }
}
