use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;

use crate::error::Result;

/// Default target width for callers without a more specific limit. The
/// recipe save hook passes its own, wider value.
pub const DEFAULT_MAX_WIDTH: u32 = 800;

const JPEG_QUALITY: u8 = 50;

/// Downscale the image at `path` in place so its width does not exceed
/// `new_width`, preserving aspect ratio with Lanczos resampling.
///
/// An image already at or below the target width is left untouched. JPEG
/// files are re-encoded at a fixed lossy quality; other formats keep their
/// native encoder. The original file is overwritten with no backup, and no
/// locking is taken against concurrent writers of the same path.
///
/// A missing source file surfaces as an I/O error; callers that consider
/// that case non-fatal should check for the file before calling.
pub fn resize_to_width(path: &Path, new_width: u32) -> Result<()> {
    let img = image::open(path)?;
    let (original_width, original_height) = img.dimensions();

    if original_width <= new_width {
        return Ok(());
    }

    let new_height =
        ((new_width as f64 * original_height as f64) / original_width as f64).round() as u32;
    let resized = img.resize_exact(new_width, new_height, FilterType::Lanczos3);

    match image::ImageFormat::from_path(path) {
        Ok(image::ImageFormat::Jpeg) => {
            let mut encoded = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY);
            resized.write_with_encoder(encoder)?;
            fs::write(path, encoded)?;
        }
        _ => resized.save(path)?,
    }

    Ok(())
}

/// Relative media path for a newly uploaded cover, partitioned by upload
/// date: `recipes/covers/YYYY/MM/DD/<file_name>`.
pub fn cover_upload_path(file_name: &str, uploaded_on: NaiveDate) -> String {
    format!(
        "recipes/covers/{}/{}",
        uploaded_on.format("%Y/%m/%d"),
        file_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::path::PathBuf;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let img = ImageBuffer::from_pixel(width, height, Rgb::<u8>([180, 120, 40]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn narrow_image_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "small.png", 640, 480);
        let before = fs::read(&path).unwrap();

        resize_to_width(&path, DEFAULT_MAX_WIDTH).unwrap();

        let after = fs::read(&path).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn exact_target_width_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "exact.png", 800, 600);
        let before = fs::read(&path).unwrap();

        resize_to_width(&path, 800).unwrap();

        assert_eq!(before, fs::read(&path).unwrap());
    }

    #[test]
    fn wide_image_is_downscaled_preserving_aspect_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "wide.png", 1600, 900);

        resize_to_width(&path, 800).unwrap();

        let resized = image::open(&path).unwrap();
        assert_eq!(resized.dimensions(), (800, 450));
    }

    #[test]
    fn jpeg_is_reencoded_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.jpg");
        let img = ImageBuffer::from_pixel(1600, 900, Rgb::<u8>([180, 120, 40]));
        img.save(&path).unwrap();
        let original_len = fs::read(&path).unwrap().len();

        resize_to_width(&path, 800).unwrap();

        let resized = image::open(&path).unwrap();
        assert_eq!(resized.dimensions(), (800, 450));
        assert!(fs::read(&path).unwrap().len() < original_len);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.png");
        assert!(resize_to_width(&path, 800).is_err());
    }

    #[test]
    fn cover_path_is_date_partitioned() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            cover_upload_path("feijoada.jpg", date),
            "recipes/covers/2024/03/05/feijoada.jpg"
        );
    }
}
