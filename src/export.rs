//! Export encoder: turns a full-resolution sheet into a downloadable file.
//!
//! | Format | Encoding |
//! |---|---|
//! | PNG | lossless RGBA (`image::codecs::png`) |
//! | JPG | RGB at [`Quality::MAX`] (`image::codecs::jpeg`) |
//! | PDF | one page, one Flate-compressed DeviceRGB image XObject (`lopdf`) |
//!
//! The PDF page box is the page raster's own pixel size (2480×3508 for the
//! print layout), one unit per pixel, with the image painted edge to edge.
//!
//! Files are always named `passport_photos.<ext>`.

use crate::imaging::{Quality, RasterError, encode_png};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Base name of every exported file.
pub const EXPORT_STEM: &str = "passport_photos";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding failed: {0}")]
    Raster(#[from] RasterError),
    #[error("Image encoding failed: {0}")]
    Codec(#[from] image::ImageError),
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Jpg,
    Png,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Pdf, ExportFormat::Jpg, ExportFormat::Png];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Png => "png",
        }
    }

    pub fn file_name(self) -> String {
        format!("{EXPORT_STEM}.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encode a rendered page in `format`.
pub fn encode(page: &RgbaImage, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Png => Ok(encode_png(page)?),
        ExportFormat::Jpg => encode_jpeg(page, Quality::MAX),
        ExportFormat::Pdf => encode_pdf(page),
    }
}

/// Write encoded bytes to `<dir>/passport_photos.<ext>`, creating `dir` if
/// needed.
pub fn write_export(dir: &Path, format: ExportFormat, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format.file_name());
    std::fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Exported {format}");
    Ok(path)
}

pub fn encode_jpeg(page: &RgbaImage, quality: Quality) -> Result<Vec<u8>> {
    let rgb = drop_alpha(page);
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.value() as u8).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

/// Single-page PDF with the page raster as its only content.
pub fn encode_pdf(page: &RgbaImage) -> Result<Vec<u8>> {
    let (width, height) = (page.width() as i64, page.height() as i64);
    let rgb = drop_alpha(page);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
        },
        rgb.into_raw(),
    );
    let image_id = doc.add_object(image);

    // Scale the unit image square to the full page
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1_i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}

/// The sheet is opaque white paper, so alpha carries nothing worth keeping.
fn drop_alpha(page: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(page.width(), page.height(), |x, y| {
        let [r, g, b, _] = page.get_pixel(x, y).0;
        Rgb([r, g, b])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::decode_image;
    use crate::test_helpers::gradient_image;
    use image::Rgba;

    #[test]
    fn file_names() {
        assert_eq!(ExportFormat::Pdf.file_name(), "passport_photos.pdf");
        assert_eq!(ExportFormat::Jpg.file_name(), "passport_photos.jpg");
        assert_eq!(ExportFormat::Png.file_name(), "passport_photos.png");
    }

    #[test]
    fn format_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&ExportFormat::Jpg).unwrap(), "\"jpg\"");
        let parsed: ExportFormat = serde_json::from_str("\"png\"").unwrap();
        assert_eq!(parsed, ExportFormat::Png);
    }

    #[test]
    fn png_export_is_lossless() {
        let page = gradient_image(64, 90);
        let bytes = encode(&page, ExportFormat::Png).unwrap();
        assert_eq!(decode_image(&bytes).unwrap(), page);
    }

    #[test]
    fn jpeg_export_is_rgb_and_close_to_source() {
        let page = RgbaImage::from_pixel(32, 48, Rgba([180, 60, 20, 255]));
        let bytes = encode(&page, ExportFormat::Jpg).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        let p = decoded.to_rgb8().get_pixel(16, 24).0;
        for (got, want) in p.iter().zip([180u8, 60, 20]) {
            assert!((*got as i32 - want as i32).abs() <= 3, "{p:?}");
        }
    }

    #[test]
    fn pdf_export_has_one_page_sized_to_raster() {
        let page = gradient_image(248, 350);
        let bytes = encode(&page, ExportFormat::Pdf).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page_id = *pages.values().next().unwrap();
        let page_dict = doc.get_dictionary(page_id).unwrap();
        let media_box: Vec<i64> = page_dict
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect();
        assert_eq!(media_box, vec![0, 0, 248, 350]);
    }

    #[test]
    fn pdf_image_is_compressed_device_rgb() {
        let page = gradient_image(40, 60);
        let bytes = encode_pdf(&page).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();

        let page_id = *doc.get_pages().values().next().unwrap();
        let resources = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap();
        let image_id = resources
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Im0")
            .unwrap()
            .as_reference()
            .unwrap();
        let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();

        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 40);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 60);
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceRGB"
        );
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"FlateDecode"
        );
    }

    #[test]
    fn write_export_creates_directory_and_names_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("out/nested");
        let path = write_export(&dir, ExportFormat::Png, b"data").unwrap();
        assert_eq!(path, dir.join("passport_photos.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"data");
    }
}
