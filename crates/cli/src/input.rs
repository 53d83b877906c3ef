//! Reading slides, images and positions supplied on the command line.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use medislide_core::{InlineImage, SlideValidator, ValidatedSlides};
use std::fs;
use std::path::{Path, PathBuf};

/// `<data dir>/medislide/cases`, when the platform has a data directory.
pub fn default_store_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("medislide").join("cases"))
}

/// Image MIME type from a file extension.
pub fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

/// Read an image file as a base64 inline image.
pub fn load_image(path: &Path) -> Result<InlineImage> {
    let mime_type = image_mime(path)
        .with_context(|| format!("Unsupported image type: {}", path.display()))?;
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))?;
    log::debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(InlineImage::new(mime_type, STANDARD.encode(bytes)))
}

pub fn load_images(paths: &[PathBuf]) -> Result<Vec<InlineImage>> {
    paths.iter().map(|p| load_image(p)).collect()
}

/// Parse and validate a slide JSON file.
pub fn read_slides_file(path: &Path) -> Result<ValidatedSlides> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    SlideValidator::new()
        .validate_text(&text)
        .with_context(|| format!("Invalid slide document: {}", path.display()))
}

/// Convert 1-based slide positions to indices into a deck of `len` slides.
pub fn to_indices(positions: &[usize], len: usize) -> Result<Vec<usize>> {
    positions
        .iter()
        .map(|&position| {
            if position == 0 || position > len {
                bail!("Slide {} does not exist (deck has {} slides)", position, len);
            }
            Ok(position - 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("scan.PNG")), Some("image/png"));
        assert_eq!(image_mime(Path::new("a/b/xray.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime(Path::new("notes.txt")), None);
        assert_eq!(image_mime(Path::new("noext")), None);
    }

    #[test]
    fn test_load_image_encodes_base64() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"abc").unwrap();

        let image = load_image(file.path()).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "YWJj");
    }

    #[test]
    fn test_load_image_rejects_unknown_type() {
        let file = tempfile::Builder::new().suffix(".bmp").tempfile().unwrap();
        assert!(load_image(file.path()).is_err());
    }

    #[test]
    fn test_to_indices() {
        assert_eq!(to_indices(&[1, 3], 3).unwrap(), vec![0, 2]);
        assert!(to_indices(&[0], 3).is_err());
        assert!(to_indices(&[4], 3).is_err());
        assert!(to_indices(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_read_slides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"Here you go: {{"slides":[{{"title":"Asthma","content":[{{"type":"paragraph","text":"**Reversible** obstruction"}}]}}]}}"#
        )
        .unwrap();

        let validated = read_slides_file(file.path()).unwrap();
        assert_eq!(validated.slides.len(), 1);
        assert_eq!(validated.slides[0].title, "Asthma");
    }

    #[test]
    fn test_default_store_dir_ends_with_cases() {
        if let Some(dir) = default_store_dir() {
            assert!(dir.ends_with("medislide/cases"));
        }
    }
}
