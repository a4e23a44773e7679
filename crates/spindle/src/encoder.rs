//! A dependency-free PPM image encoder.
//!
//! Binary P6 covers the headless snapshot tool and the tests without
//! pulling a compression stack into the workspace. The encoder trait
//! boundary is where a PNG library would slot in.

use std::fs::File;
use std::io::{BufWriter, Write};

use spindle_rendering::backend::Pixmap;
use spindle_rendering::error::EncoderError;
use spindle_rendering::export::ImageEncoder;

/// Writes binary PPM (P6) files.
#[derive(Clone, Copy, Debug, Default)]
pub struct PpmEncoder;

impl ImageEncoder for PpmEncoder {
    fn supports(&self, format: &str) -> bool {
        format.eq_ignore_ascii_case("ppm")
    }

    fn write(
        &self,
        name: &str,
        format: &str,
        image: &Pixmap,
        downsample: u32,
    ) -> Result<(), EncoderError> {
        if !self.supports(format) {
            return Err(EncoderError::UnsupportedFormat(format.to_owned()));
        }
        let image = image.downsampled(downsample);

        let file = File::create(name)?;
        let mut out = BufWriter::new(file);
        write!(out, "P6\n{} {}\n255\n", image.width(), image.height())?;
        // P6 carries no alpha channel
        for px in image.data().chunks_exact(4) {
            out.write_all(&px[..3])?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ppm_supports() {
        let enc = PpmEncoder;
        assert!(enc.supports("ppm"));
        assert!(enc.supports("PPM"));
        assert!(!enc.supports("png"));
    }

    #[test]
    fn test_ppm_write_and_header() {
        let enc = PpmEncoder;
        let mut image = Pixmap::new(3, 2);
        image.set_pixel(0, 0, [255, 0, 0, 255]);

        let path = std::env::temp_dir().join("spindle_ppm_header_test.ppm");
        let path_str = path.to_string_lossy().into_owned();
        enc.write(&path_str, "ppm", &image, 1).expect("write");

        let bytes = std::fs::read(&path).expect("read back");
        assert!(bytes.starts_with(b"P6\n3 2\n255\n"));
        // 3 bytes per pixel after the header
        assert_eq!(bytes.len(), 11 + 3 * 2 * 3);
        assert_eq!(&bytes[11..14], &[255, 0, 0]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_ppm_rejects_other_formats() {
        let enc = PpmEncoder;
        let image = Pixmap::new(1, 1);
        assert!(matches!(
            enc.write("never_created.png", "png", &image, 1),
            Err(EncoderError::UnsupportedFormat(_))
        ));
    }
}
