//! First-page access for PDF reports.
//!
//! Only page 1 is ever read. The text layer comes from pdf-extract; scanned
//! pages are recovered by decoding the largest image XObject on the page
//! with lopdf.

use crate::error::PdfError;
use image::DynamicImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::panic::{catch_unwind, AssertUnwindSafe};

const FIRST_PAGE: u32 = 1;

/// Extract the text layer of page 1. Later pages are never interpreted, so a
/// broken font elsewhere in the file cannot hide a good first page.
pub fn first_page_text(bytes: &[u8]) -> Result<String, PdfError> {
    // pdf-extract panics on some malformed font tables
    catch_unwind(AssertUnwindSafe(|| page_text(bytes, FIRST_PAGE)))
        .map_err(|_| PdfError::Parse("text extraction panicked".to_string()))?
}

fn page_text(bytes: &[u8], page_num: u32) -> Result<String, PdfError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;

    // Owner-locked reports open with an empty user password
    if doc.is_encrypted() {
        doc.decrypt("").map_err(|e| PdfError::Parse(e.to_string()))?;
    }

    if !doc.get_pages().contains_key(&page_num) {
        return Err(PdfError::NoPages);
    }

    let mut text = String::new();
    {
        let mut output = pdf_extract::PlainTextOutput::new(&mut text);
        pdf_extract::output_doc_page(&doc, &mut output, page_num)
            .map_err(|e| PdfError::Parse(e.to_string()))?;
    }

    Ok(text)
}

/// Decode the main image of page 1 (the page scan, for image-only PDFs)
pub fn first_page_image(bytes: &[u8]) -> Result<DynamicImage, PdfError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;

    let page_id = *doc
        .get_pages()
        .get(&FIRST_PAGE)
        .ok_or(PdfError::NoPages)?;

    let mut largest: Option<DynamicImage> = None;

    for (name, stream) in page_image_streams(&doc, page_id) {
        match decode_image_stream(&doc, stream) {
            Ok(img) => {
                let area = img.width() as u64 * img.height() as u64;
                let is_larger = largest
                    .as_ref()
                    .map_or(true, |prev| area > prev.width() as u64 * prev.height() as u64);
                if is_larger {
                    largest = Some(img);
                }
            }
            Err(e) => {
                tracing::warn!("Skipping image /{} on page 1: {}", name, e);
            }
        }
    }

    largest.ok_or(PdfError::NoImage(FIRST_PAGE))
}

/// Image XObjects reachable from a page's resources, with their names.
fn page_image_streams(doc: &Document, page_id: ObjectId) -> Vec<(String, &Stream)> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Vec::new();
    };

    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, obj)| {
            let stream = resolve(doc, obj).as_stream().ok()?;
            is_image(&stream.dict).then(|| (String::from_utf8_lossy(name).to_string(), stream))
        })
        .collect()
}

/// Resources of a page, following the /Parent chain for inherited entries
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;

    // Page trees are shallow; the bound guards against reference cycles
    for _ in 0..32 {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources).as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }

    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn is_image(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(|obj| obj.as_name())
        .map(|name| name == b"Image")
        .unwrap_or(false)
}

fn has_filter(dict: &Dictionary, filter: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == filter,
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|f| matches!(f, Object::Name(name) if name == filter)),
        _ => false,
    }
}

/// Decode an image XObject into a raster
fn decode_image_stream(doc: &Document, stream: &Stream) -> Result<DynamicImage, PdfError> {
    // DCTDecode: the stream body is a complete JPEG file
    if has_filter(&stream.dict, b"DCTDecode") {
        return image::load_from_memory(&stream.content)
            .map_err(|e| PdfError::ImageDecode(format!("invalid JPEG stream: {}", e)));
    }

    let width = dimension(&stream.dict, b"Width")?;
    let height = dimension(&stream.dict, b"Height")?;
    let bits_per_component = int_entry(&stream.dict, b"BitsPerComponent").unwrap_or(8);

    // Unfiltered streams fail to "decompress"; their content is already raw
    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = color_space_name(doc, &stream.dict);

    tracing::debug!(
        "PDF image: {}x{}, {} bits, color_space={}, data_len={}",
        width,
        height,
        bits_per_component,
        color_space,
        data.len()
    );

    if bits_per_component != 8 {
        return Err(PdfError::ImageDecode(format!(
            "unsupported bit depth: {}",
            bits_per_component
        )));
    }

    let channels = match color_space.as_str() {
        "DeviceGray" => 1,
        "DeviceRGB" | "ICCBased" => 3,
        "DeviceCMYK" => 4,
        other => {
            return Err(PdfError::ImageDecode(format!(
                "unsupported color space {}",
                other
            )))
        }
    };

    let needed = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(channels))
        .ok_or_else(|| {
            PdfError::ImageDecode(format!("image too large: {}x{}", width, height))
        })?;

    if data.len() < needed {
        return Err(PdfError::ImageDecode(format!(
            "{} bytes of image data for {}x{} {}, expected {}",
            data.len(),
            width,
            height,
            color_space,
            needed
        )));
    }

    let image = match channels {
        1 => image::GrayImage::from_raw(width, height, data[..needed].to_vec())
            .map(DynamicImage::ImageLuma8),
        3 => image::RgbImage::from_raw(width, height, data[..needed].to_vec())
            .map(DynamicImage::ImageRgb8),
        _ => {
            let rgb: Vec<u8> = data[..needed]
                .chunks_exact(4)
                .flat_map(|cmyk| {
                    let k = 1.0 - cmyk[3] as f32 / 255.0;
                    [cmyk[0], cmyk[1], cmyk[2]]
                        .map(|c| ((1.0 - c as f32 / 255.0) * k * 255.0) as u8)
                })
                .collect();
            image::RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
    };

    image.ok_or_else(|| PdfError::ImageDecode(format!("invalid {} image data", color_space)))
}

/// A positive image dimension that fits in `u32`
fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32, PdfError> {
    let value = int_entry(dict, key)?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            PdfError::ImageDecode(format!(
                "invalid /{} {} in image dictionary",
                String::from_utf8_lossy(key),
                value
            ))
        })
}

fn int_entry(dict: &Dictionary, key: &[u8]) -> Result<i64, PdfError> {
    dict.get(key).and_then(|obj| obj.as_i64()).map_err(|_| {
        PdfError::ImageDecode(format!(
            "missing /{} in image dictionary",
            String::from_utf8_lossy(key)
        ))
    })
}

/// Color space name of an image, resolving references and `[/ICCBased ref]`
/// style arrays. Defaults to DeviceRGB.
fn color_space_name(doc: &Document, dict: &Dictionary) -> String {
    let Ok(cs) = dict.get(b"ColorSpace") else {
        return "DeviceRGB".to_string();
    };

    let name = match resolve(doc, cs) {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(items) => items.first().and_then(|first| first.as_name().ok()),
        _ => None,
    };

    name.map(|n| String::from_utf8_lossy(n).to_string())
        .unwrap_or_else(|| "DeviceRGB".to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::dictionary;

    /// A single- or multi-page PDF. Each page is `(text, images)` where images
    /// are raw 8-bit grayscale `(width, height, fill)` XObjects.
    pub(crate) fn build_pdf(pages: &[(Option<&str>, Vec<(u32, u32, u8)>)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for (text, images) in pages {
            let mut xobjects = Dictionary::new();
            let mut ops = String::new();

            for (i, (width, height, fill)) in images.iter().enumerate() {
                let mut stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => *width as i64,
                        "Height" => *height as i64,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    vec![*fill; (*width * *height) as usize],
                );
                stream.allows_compression = false;
                let image_id = doc.add_object(stream);
                let name = format!("Im{}", i);
                ops.push_str(&format!("q 612 0 0 792 0 0 cm /{} Do Q\n", name));
                xobjects.set(name, image_id);
            }

            if let Some(text) = text {
                ops.push_str(&format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET\n", text));
            }

            let content_id = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                    "XObject" => xobjects,
                },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_text_layer_of_first_page() {
        let pdf = build_pdf(&[(Some("Name: Asha Rao"), vec![])]);
        let text = first_page_text(&pdf).unwrap();
        assert!(text.contains("Asha"), "got {:?}", text);
    }

    #[test]
    fn test_text_layer_ignores_later_pages() {
        let pdf = build_pdf(&[
            (Some("Haemoglobin 13.2"), vec![]),
            (Some("Name: Asha Rao"), vec![]),
        ]);
        let text = first_page_text(&pdf).unwrap();
        assert!(text.contains("Haemoglobin"), "got {:?}", text);
        assert!(!text.contains("Asha"), "got {:?}", text);
    }

    #[test]
    fn test_broken_later_page_keeps_first_page_text() {
        let pdf = build_pdf(&[
            (Some("Name: Asha Rao"), vec![]),
            (Some("Page two"), vec![]),
        ]);

        // pdf-extract panics on a page without any MediaBox
        let mut doc = Document::load_mem(&pdf).unwrap();
        let second = doc.get_pages()[&2];
        doc.get_object_mut(second)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .remove(b"MediaBox");
        let mut broken = Vec::new();
        doc.save_to(&mut broken).unwrap();

        let text = first_page_text(&broken).unwrap();
        assert!(text.contains("Asha Rao"), "got {:?}", text);
    }

    #[test]
    fn test_scanned_page_has_blank_text_layer() {
        let pdf = build_pdf(&[(None, vec![(30, 20, 200)])]);
        let text = first_page_text(&pdf).unwrap_or_default();
        assert!(text.trim().is_empty(), "got {:?}", text);
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(
            first_page_text(b"definitely not a pdf"),
            Err(PdfError::Parse(_))
        ));
        assert!(matches!(
            first_page_image(b"definitely not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_first_page_image_picks_largest() {
        let pdf = build_pdf(&[(None, vec![(8, 8, 10), (40, 30, 220)])]);
        let img = first_page_image(&pdf).unwrap();
        assert_eq!((img.width(), img.height()), (40, 30));
        assert_eq!(img.to_luma8().get_pixel(0, 0).0[0], 220);
    }

    #[test]
    fn test_first_page_image_ignores_later_pages() {
        let pdf = build_pdf(&[(Some("cover"), vec![]), (None, vec![(40, 30, 220)])]);
        assert!(matches!(first_page_image(&pdf), Err(PdfError::NoImage(1))));
    }

    #[test]
    fn test_dct_stream_decodes_as_jpeg() {
        let jpeg = {
            let img = image::RgbImage::from_pixel(16, 12, image::Rgb([90, 90, 90]));
            let mut buf = std::io::Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(img)
                .write_to(&mut buf, image::ImageFormat::Jpeg)
                .unwrap();
            buf.into_inner()
        };

        let doc = Document::with_version("1.4");
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 16,
                "Height" => 12,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        );

        let img = decode_image_stream(&doc, &stream).unwrap();
        assert_eq!((img.width(), img.height()), (16, 12));
    }

    #[test]
    fn test_cmyk_stream_converts_to_rgb() {
        let doc = Document::with_version("1.4");
        // Pure cyan
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8,
            },
            vec![255, 0, 0, 0, 255, 0, 0, 0],
        );

        let img = decode_image_stream(&doc, &stream).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [0, 255, 255]);
    }

    #[test]
    fn test_bogus_dimensions_are_decode_errors() {
        let doc = Document::with_version("1.4");
        let cases: [(i64, i64, &str); 4] = [
            (-1, -1, "DeviceRGB"),
            (0, 10, "DeviceGray"),
            (i64::MAX, 2, "DeviceGray"),
            (4_000_000_000, 4_000_000_000, "DeviceCMYK"),
        ];

        for (width, height, color_space) in cases {
            let stream = Stream::new(
                dictionary! {
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => color_space,
                    "BitsPerComponent" => 8,
                },
                vec![0; 64],
            );

            let result = decode_image_stream(&doc, &stream);
            assert!(
                matches!(result, Err(PdfError::ImageDecode(_))),
                "{}x{} {}",
                width,
                height,
                color_space
            );
        }
    }

    #[test]
    fn test_short_image_data_is_a_decode_error() {
        let doc = Document::with_version("1.4");
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 10,
                "Height" => 10,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            vec![0; 299],
        );

        assert!(matches!(
            decode_image_stream(&doc, &stream),
            Err(PdfError::ImageDecode(_))
        ));
    }
}
