use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use pdf_images::convert::{DecodeTask, place_decoded, spawn_decoders};
use pdf_images::*;
use std::io::Cursor;

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([10, 120, 240]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

fn cmyk_jpeg(width: u16, height: u16) -> Vec<u8> {
    let pixels: Vec<u8> = (0..usize::from(width) * usize::from(height))
        .flat_map(|_| [0u8, 200, 200, 20])
        .collect();
    let mut bytes = Vec::new();
    jpeg_encoder::Encoder::new(&mut bytes, 90)
        .encode(&pixels, width, height, jpeg_encoder::ColorType::Cmyk)
        .unwrap();
    bytes
}

fn translucent_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([0, 255, 0, 128]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

fn sources(images: Vec<(&str, Vec<u8>)>) -> Vec<ImageSource> {
    images
        .into_iter()
        .map(|(name, bytes)| ImageSource::memory(name, bytes))
        .collect()
}

/// Records backend calls instead of building a document
struct RecordingBackend {
    calls: Vec<String>,
    pages: usize,
}

impl RecordingBackend {
    fn new() -> Self {
        Self {
            calls: Vec::new(),
            pages: 1,
        }
    }
}

impl PdfBackend for RecordingBackend {
    fn add_page(&mut self) -> Result<()> {
        self.pages += 1;
        self.calls.push("add_page".to_string());
        Ok(())
    }

    fn draw_image(&mut self, image: &EncodedImage, placement: &Placement) -> Result<()> {
        self.calls.push(format!(
            "draw {}x{} at {},{}",
            image.width_px, image.height_px, placement.x, placement.y
        ));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages
    }
}

/// Backend whose drawing always fails
struct FullDiskBackend;

impl PdfBackend for FullDiskBackend {
    fn add_page(&mut self) -> Result<()> {
        Ok(())
    }

    fn draw_image(&mut self, _image: &EncodedImage, _placement: &Placement) -> Result<()> {
        Err(ConvertError::Config("disk full".to_string()))
    }

    fn page_count(&self) -> usize {
        1
    }
}

#[test]
fn test_output_file_name() {
    assert_eq!(output_file_name(Some("Alice")), "Alice_images.pdf");
    assert_eq!(output_file_name(None), "images.pdf");
    assert_eq!(output_file_name(Some("")), DEFAULT_FILE_NAME);
}

#[test]
fn test_request_trims_display_name() {
    let request = ConversionRequest::new(Vec::new(), Some("  Bob  "));
    assert_eq!(request.display_name.as_deref(), Some("Bob"));
    assert_eq!(request.file_name(), "Bob_images.pdf");

    let blank = ConversionRequest::new(Vec::new(), Some("   "));
    assert_eq!(blank.display_name, None);
    assert_eq!(blank.file_name(), "images.pdf");
}

#[test]
fn test_request_validation() {
    let empty = ConversionRequest::new(Vec::new(), None);
    assert!(matches!(empty.validate(), Err(ConvertError::NoImages)));

    let bad_name = ConversionRequest::new(sources(vec![("a.png", png(4, 4))]), Some("../etc"));
    assert!(matches!(bad_name.validate(), Err(ConvertError::Config(_))));
}

#[test]
fn test_decode_png_is_flate_encoded() {
    let decoded = decode_image(&png(40, 30)).unwrap();
    assert_eq!(decoded.dimensions, ImageDimensions::new(40.0, 30.0).unwrap());
    assert_eq!(decoded.encoded.filter, decode::ImageFilter::FlateDecode);
    assert_eq!(decoded.encoded.color_space, decode::ImageColorSpace::DeviceRgb);
    assert!(decoded.encoded.soft_mask.is_none());
}

#[test]
fn test_decode_jpeg_is_passed_through() {
    let bytes = jpeg(16, 8);
    let decoded = decode_image(&bytes).unwrap();
    assert_eq!(decoded.encoded.filter, decode::ImageFilter::DctDecode);
    assert_eq!(decoded.encoded.data, bytes);
    assert_eq!((decoded.encoded.width_px, decoded.encoded.height_px), (16, 8));
}

#[test]
fn test_decode_cmyk_jpeg_is_reencoded() {
    let bytes = cmyk_jpeg(8, 6);
    let decoded = decode_image(&bytes).unwrap();
    assert_eq!(decoded.dimensions, ImageDimensions::new(8.0, 6.0).unwrap());
    assert_eq!(decoded.encoded.filter, decode::ImageFilter::FlateDecode);
    assert_eq!(decoded.encoded.color_space, decode::ImageColorSpace::DeviceRgb);
    assert_ne!(decoded.encoded.data, bytes);
}

#[test]
fn test_decode_alpha_gets_soft_mask() {
    let decoded = decode_image(&translucent_png(10, 10)).unwrap();
    assert!(decoded.encoded.soft_mask.is_some());
}

#[test]
fn test_decode_garbage_fails() {
    let result = decode_image(b"definitely not an image");
    assert!(matches!(result, Err(ImageFailure::Decode(_))));
}

#[tokio::test]
async fn test_load_missing_file_is_read_error() {
    let source = ImageSource::Path("does/not/exist.png".into());
    let result = load_image(&source).await;
    assert!(matches!(result, Err(ImageFailure::Read(_))));
}

#[tokio::test]
async fn test_pipeline_adds_page_before_every_image_but_first() {
    let sources = sources(vec![
        ("a.png", png(800, 600)),
        ("b.png", png(600, 2000)),
        ("c.png", png(500, 500)),
    ]);
    let mut backend = RecordingBackend::new();
    let mut events = Vec::new();

    let summary = place_decoded(
        &mut backend,
        &sources,
        spawn_decoders(&sources),
        &ConversionOptions::default(),
        |event| events.push(event),
    )
    .await
    .unwrap();

    assert_eq!(summary.placed, 3);
    assert!(summary.skipped.is_empty());
    assert_eq!(backend.calls[0], "draw 800x600 at 10,77.25");
    assert_eq!(backend.calls[1], "add_page");
    assert!(backend.calls[2].starts_with("draw 600x2000"));
    assert_eq!(backend.calls[3], "add_page");
    assert_eq!(backend.calls[4], "draw 500x500 at 10,53.5");
    assert_eq!(backend.pages, 3);

    let pages: Vec<usize> = events
        .iter()
        .map(|e| match e {
            ConversionEvent::ImagePlaced { page, .. } => *page,
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
    assert_eq!(pages, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_abort_policy_stops_at_first_failure() {
    let sources = sources(vec![
        ("good.png", png(10, 10)),
        ("broken.png", b"garbage".to_vec()),
        ("later.png", png(10, 10)),
    ]);
    let mut backend = RecordingBackend::new();

    let result = place_decoded(
        &mut backend,
        &sources,
        spawn_decoders(&sources),
        &ConversionOptions::default(),
        |_| {},
    )
    .await;

    match result {
        Err(ConvertError::Image { index, label, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(label, "broken.png");
        }
        other => panic!("expected image error, got {:?}", other),
    }
    // Only the first image was drawn
    assert_eq!(backend.calls.len(), 1);
}

#[tokio::test]
async fn test_skip_policy_continues_after_failure() {
    let sources = sources(vec![
        ("broken.png", b"garbage".to_vec()),
        ("a.png", png(10, 20)),
        ("b.png", png(20, 10)),
    ]);
    let options = ConversionOptions {
        failure_policy: FailurePolicy::SkipImage,
        ..Default::default()
    };
    let mut backend = RecordingBackend::new();
    let mut events = Vec::new();

    let summary = place_decoded(
        &mut backend,
        &sources,
        spawn_decoders(&sources),
        &options,
        |event| events.push(event),
    )
    .await
    .unwrap();

    assert_eq!(summary.placed, 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].index, 0);
    assert_eq!(summary.skipped[0].label, "broken.png");

    // The first image that actually decodes goes on the initial page
    assert!(backend.calls[0].starts_with("draw 10x20"));
    assert_eq!(backend.calls[1], "add_page");
    assert_eq!(backend.pages, 2);
    assert!(matches!(
        events[0],
        ConversionEvent::ImageSkipped { index: 0, total: 3, .. }
    ));
}

#[tokio::test]
async fn test_backend_failure_cancels_pending_decodes() {
    let sources = sources(vec![("a.png", png(10, 10)), ("slow.png", png(10, 10))]);
    let first = decode_image(&png(10, 10)).unwrap();
    let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();

    let decoded: Vec<DecodeTask> = vec![
        tokio::spawn(async move { Ok(first) }),
        tokio::spawn(async move {
            // Held until the task is dropped by cancellation
            let _alive = alive_tx;
            std::future::pending().await
        }),
    ];

    let result = place_decoded(
        &mut FullDiskBackend,
        &sources,
        decoded,
        &ConversionOptions::default(),
        |_| {},
    )
    .await;
    assert!(matches!(result, Err(ConvertError::Config(_))));

    let cancelled = tokio::time::timeout(std::time::Duration::from_secs(5), alive_rx).await;
    assert!(matches!(cancelled, Ok(Err(_))), "pending decode was not aborted");
}

#[tokio::test]
async fn test_skip_policy_with_nothing_usable() {
    let sources = sources(vec![("broken.png", b"garbage".to_vec())]);
    let options = ConversionOptions {
        failure_policy: FailurePolicy::SkipImage,
        ..Default::default()
    };
    let mut backend = RecordingBackend::new();

    let result = place_decoded(
        &mut backend,
        &sources,
        spawn_decoders(&sources),
        &options,
        |_| {},
    )
    .await;
    assert!(matches!(result, Err(ConvertError::NoImages)));
}

#[tokio::test]
async fn test_convert_writes_named_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let options = ConversionOptions {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let request = ConversionRequest::new(
        sources(vec![
            ("photo.jpg", jpeg(64, 48)),
            ("scan.png", png(30, 100)),
            ("logo.png", translucent_png(20, 20)),
        ]),
        Some("Alice"),
    );

    let report = convert_images(&request, &options, |_| {}).await.unwrap();

    assert_eq!(report.file_name, "Alice_images.pdf");
    assert_eq!(report.output_path, dir.path().join("Alice_images.pdf"));
    assert_eq!(report.pages, 3);

    let doc = lopdf::Document::load(&report.output_path).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[tokio::test]
async fn test_convert_without_name_uses_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let options = ConversionOptions {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let request = ConversionRequest::new(sources(vec![("one.png", png(5, 5))]), None);

    let report = convert_images(&request, &options, |_| {}).await.unwrap();
    assert_eq!(report.file_name, "images.pdf");
    assert!(dir.path().join("images.pdf").exists());
}

#[tokio::test]
async fn test_aborted_convert_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let options = ConversionOptions {
        output_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let request = ConversionRequest::new(
        sources(vec![("a.png", png(5, 5)), ("b.png", b"nope".to_vec())]),
        None,
    );

    let result = convert_images(&request, &options, |_| {}).await;
    assert!(result.is_err());
    assert!(!dir.path().join("images.pdf").exists());
}

#[tokio::test]
async fn test_lopdf_backend_page_geometry() {
    let mut backend = LopdfBackend::new(PageSpec::A4);
    let decoded = decode_image(&png(800, 600)).unwrap();
    let plan = compute_placement(decoded.dimensions, &PageSpec::A4, true);
    backend.draw_image(&decoded.encoded, &plan.placement).unwrap();
    backend.add_page().unwrap();
    assert_eq!(backend.page_count(), 2);

    let doc = backend.finish().unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 2);

    let first = doc.get_dictionary(pages[&1]).unwrap();
    let media_box = first.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = media_box[2].as_float().unwrap();
    let height = media_box[3].as_float().unwrap();
    assert!((width - 595.28).abs() < 0.1);
    assert!((height - 841.89).abs() < 0.1);
}
