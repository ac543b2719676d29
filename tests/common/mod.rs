#![allow(dead_code)]

use image::{DynamicImage, GrayImage, Luma};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use report_filer::{Config, OcrEngine, OcrError, ReportProcessor};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Engine double: counts calls and answers with fixed text
pub struct StubEngine {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl StubEngine {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn description(&self) -> &'static str {
        "fixed answers for tests"
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| OcrError::ProcessingError("stub failure".to_string()))
    }
}

pub fn processor(engine: Arc<StubEngine>, config: &Config) -> ReportProcessor {
    ReportProcessor::new(engine, config)
}

/// A small PNG "scan"; its pixels are irrelevant to the stub engine
pub fn png_bytes() -> Vec<u8> {
    let img = GrayImage::from_fn(40, 20, |x, y| Luma([((x * 5 + y * 3) % 256) as u8]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn jpeg_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(24, 24, image::Rgb([200, 180, 160]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

/// One-page PDF with an optional text line and an optional grayscale scan image
pub fn single_page_pdf(text: Option<&str>, scan: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut xobjects = Dictionary::new();
    let mut ops = String::new();

    if scan {
        let (width, height) = (30u32, 40u32);
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![170; (width * height) as usize],
        );
        stream.allows_compression = false;
        xobjects.set("Scan", doc.add_object(stream));
        ops.push_str("q 612 0 0 792 0 0 cm /Scan Do Q\n");
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

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
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
