//! End-to-end integration tests for pixelsift.
//!
//! Most tests here run entirely in memory on generated images and need no
//! network or external library. Tests that exercise the PDF-input path need
//! the PDFium engine on disk (auto-downloaded on first use), so they are
//! gated behind the `PIXELSIFT_E2E` environment variable and do not run in
//! CI unless explicitly requested.
//!
//! Run everything:
//!   PIXELSIFT_E2E=1 cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   cargo test --test e2e standard_batch -- --nocapture

use futures::StreamExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pixelsift::{
    convert_image, convert_images, convert_stream, pdf_page_count, BatchProgressCallback,
    ConversionOptions, InputFile, OutputFormat, PageSelection,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless PIXELSIFT_E2E is set (PDFium engine required).
macro_rules! e2e_skip_unless_engine {
    () => {
        if std::env::var("PIXELSIFT_E2E").is_err() {
            println!("SKIP — set PIXELSIFT_E2E=1 to run pdfium-backed e2e tests");
            return;
        }
    };
}

fn gradient_image(w: u32, h: u32) -> DynamicImage {
    let mut img = RgbImage::from_pixel(w, h, Rgb([200, 0, 0]));
    for (x, y, px) in img.enumerate_pixels_mut() {
        px[1] = ((x * 255) / w.max(1)) as u8;
        px[2] = ((y * 255) / h.max(1)) as u8;
    }
    DynamicImage::ImageRgb8(img)
}

fn input_as(name: &str, format: ImageFormat, w: u32, h: u32) -> InputFile {
    let mut buf = Vec::new();
    gradient_image(w, h)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    InputFile::from_bytes(name, buf)
}

fn png_input(name: &str, w: u32, h: u32) -> InputFile {
    input_as(name, ImageFormat::Png, w, h)
}

fn options(format: OutputFormat) -> ConversionOptions {
    ConversionOptions::builder().format(format).build().unwrap()
}

/// Build an in-memory multi-page PDF by running the assembler over
/// generated images. Returns it as a named PDF input.
async fn pdf_fixture(name: &str, pages: usize) -> InputFile {
    let files: Vec<InputFile> = (0..pages)
        .map(|i| png_input(&format!("p{i}.png"), 64 + i as u32 * 8, 64))
        .collect();
    let outcome = convert_images(&files, &options(OutputFormat::Pdf))
        .await
        .unwrap();
    assert_eq!(outcome.results.len(), 1, "fixture assembly must succeed");
    InputFile::from_bytes(name, outcome.results[0].data.clone())
}

// ── Standard batch (in-memory, always run) ──────────────────────────────────

#[tokio::test]
async fn standard_batch_mixed_success_and_failure() {
    let files = vec![
        input_as("a.jpg", ImageFormat::Jpeg, 40, 30),
        InputFile::from_bytes("corrupt.png", &b"\x89PNG but not really"[..]),
        png_input("c.png", 20, 20),
    ];

    let outcome = convert_images(&files, &options(OutputFormat::Jpeg))
        .await
        .unwrap();

    // Successes in input order, one message per failed input.
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].original_name, "a.jpg");
    assert_eq!(outcome.results[1].original_name, "c.png");
    assert_eq!(outcome.errors.len(), 1);
    assert!(
        outcome.errors[0].starts_with("Failed to convert corrupt.png:"),
        "got: {}",
        outcome.errors[0]
    );

    assert_eq!(outcome.stats.total_files, 3);
    assert_eq!(outcome.stats.converted, 2);
    assert_eq!(outcome.stats.failed, 1);
    assert!(outcome.stats.output_bytes > 0);
}

#[tokio::test]
async fn width_only_resize_preserves_aspect_ratio() {
    let file = png_input("wide.png", 200, 100);
    let opts = ConversionOptions::builder()
        .format(OutputFormat::Png)
        .width(50)
        .build()
        .unwrap();

    let record = convert_image(&file, &opts).await.unwrap();
    assert_eq!(record.width, Some(50));
    assert_eq!(record.height, Some(25));

    // The output actually decodes to those dimensions.
    let out = image::load_from_memory(&record.data).unwrap();
    assert_eq!((out.width(), out.height()), (50, 25));
}

#[tokio::test]
async fn png_output_is_identical_across_quality_settings() {
    let file = png_input("still.png", 32, 32);
    let low = ConversionOptions::builder()
        .format(OutputFormat::Png)
        .quality(0.1)
        .build()
        .unwrap();
    let high = ConversionOptions::builder()
        .format(OutputFormat::Png)
        .quality(1.0)
        .build()
        .unwrap();

    let a = convert_image(&file, &low).await.unwrap();
    let b = convert_image(&file, &high).await.unwrap();
    assert_eq!(a.data, b.data, "PNG is lossless; quality must not matter");
}

#[tokio::test]
async fn records_carry_distinct_ids() {
    let files = vec![png_input("a.png", 8, 8), png_input("a.png", 8, 8)];
    let outcome = convert_images(&files, &options(OutputFormat::Png))
        .await
        .unwrap();
    assert_eq!(outcome.results.len(), 2);
    assert_ne!(outcome.results[0].id, outcome.results[1].id);
}

#[tokio::test]
async fn webp_and_avif_targets_produce_their_containers() {
    let file = png_input("pic.png", 24, 24);

    let webp = convert_image(&file, &options(OutputFormat::Webp))
        .await
        .unwrap();
    assert_eq!(&webp.data[..4], b"RIFF");
    assert_eq!(&webp.data[8..12], b"WEBP");
    assert_eq!(webp.download_name(), "pic.webp");

    let avif = convert_image(&file, &options(OutputFormat::Avif))
        .await
        .unwrap();
    assert_eq!(&avif.data[4..8], b"ftyp");
    assert_eq!(avif.download_name(), "pic.avif");
}

#[tokio::test]
async fn empty_batch_yields_empty_outcome() {
    let outcome = convert_images(&[], &options(OutputFormat::Jpeg))
        .await
        .unwrap();
    assert!(outcome.results.is_empty());
    assert!(outcome.errors.is_empty());
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.stats.total_files, 0);
}

// ── Images-to-PDF (printpdf, always run) ─────────────────────────────────────

#[tokio::test]
async fn images_to_pdf_single_atomic_record() {
    let files = vec![
        png_input("cover.png", 100, 140),
        input_as("body.jpg", ImageFormat::Jpeg, 100, 100),
        png_input("back.png", 100, 60),
    ];
    let input_total: u64 = files.iter().map(InputFile::size).sum();

    let outcome = convert_images(&files, &options(OutputFormat::Pdf))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.errors.is_empty());

    let record = &outcome.results[0];
    assert_eq!(&record.data[..5], b"%PDF-");
    assert_eq!(record.original_name, "converted.pdf");
    assert_eq!(record.download_name(), "converted.pdf");
    assert_eq!(record.original_size, input_total);
    assert_eq!(record.format, OutputFormat::Pdf);
    assert!((record.quality - 1.0).abs() < f32::EPSILON);
    assert!(record.width.is_none() && record.height.is_none());
}

#[tokio::test]
async fn images_to_pdf_one_bad_file_loses_the_batch() {
    let files = vec![
        png_input("ok.png", 16, 16),
        InputFile::from_bytes("nope.png", &b"not an image"[..]),
        png_input("ok2.png", 16, 16),
    ];

    let outcome = convert_images(&files, &options(OutputFormat::Pdf))
        .await
        .unwrap();

    assert!(outcome.results.is_empty(), "assembly is atomic");
    assert_eq!(outcome.errors, vec!["Failed to convert images to PDF"]);
    assert_eq!(outcome.stats.failed, 1);
}

// ── Streaming API (always run) ───────────────────────────────────────────────

#[tokio::test]
async fn stream_emits_items_in_input_order() {
    let files = vec![
        png_input("one.png", 8, 8),
        png_input("two.png", 8, 8),
        InputFile::from_bytes("broken.png", &b"xx"[..]),
    ];
    let mut s = convert_stream(files, options(OutputFormat::Jpeg))
        .await
        .unwrap();

    assert_eq!(s.next().await.unwrap().unwrap().original_name, "one.png");
    assert_eq!(s.next().await.unwrap().unwrap().original_name, "two.png");
    assert!(s.next().await.unwrap().is_err());
    assert!(s.next().await.is_none());
}

// ── Progress callbacks (always run) ──────────────────────────────────────────

struct CountingCallback {
    batch_started: AtomicUsize,
    starts: AtomicUsize,
    completes: AtomicUsize,
    errors: AtomicUsize,
    succeeded: AtomicUsize,
}

impl BatchProgressCallback for CountingCallback {
    fn on_batch_start(&self, total: usize) {
        self.batch_started.store(total, Ordering::SeqCst);
    }
    fn on_item_start(&self, _item: usize, _total: usize) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }
    fn on_item_complete(&self, _item: usize, _total: usize, _bytes: u64) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_item_error(&self, _item: usize, _total: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
    fn on_batch_complete(&self, _total: usize, succeeded: usize) {
        self.succeeded.store(succeeded, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_callbacks_fire_per_item() {
    let cb = Arc::new(CountingCallback {
        batch_started: AtomicUsize::new(0),
        starts: AtomicUsize::new(0),
        completes: AtomicUsize::new(0),
        errors: AtomicUsize::new(0),
        succeeded: AtomicUsize::new(0),
    });

    let opts = ConversionOptions::builder()
        .format(OutputFormat::Jpeg)
        .progress(Arc::clone(&cb) as Arc<dyn BatchProgressCallback>)
        .build()
        .unwrap();

    let files = vec![
        png_input("a.png", 8, 8),
        InputFile::from_bytes("bad.png", &b"zz"[..]),
        png_input("b.png", 8, 8),
    ];
    let outcome = convert_images(&files, &opts).await.unwrap();

    assert_eq!(cb.batch_started.load(Ordering::SeqCst), 3);
    assert_eq!(cb.starts.load(Ordering::SeqCst), 3);
    assert_eq!(cb.completes.load(Ordering::SeqCst), 2);
    assert_eq!(cb.errors.load(Ordering::SeqCst), 1);
    assert_eq!(cb.succeeded.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.stats.converted, 2);
}

// ── PDF input (needs the PDFium engine, gated) ───────────────────────────────

#[tokio::test]
async fn pdf_page_count_matches_assembled_pages() {
    e2e_skip_unless_engine!();

    let pdf = pdf_fixture("fixture.pdf", 3).await;
    let pages = pdf_page_count(&pdf).await.expect("page count");
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn pdf_input_extracts_every_page_as_png() {
    e2e_skip_unless_engine!();

    let pdf = pdf_fixture("scan.pdf", 3).await;
    let outcome = convert_images(std::slice::from_ref(&pdf), &options(OutputFormat::Png))
        .await
        .unwrap();

    assert!(outcome.errors.is_empty(), "errors: {:?}", outcome.errors);
    assert_eq!(outcome.results.len(), 3);

    for (i, record) in outcome.results.iter().enumerate() {
        assert_eq!(record.original_name, format!("scan-page{}.png", i + 1));
        assert_eq!(record.format, OutputFormat::Png);
        assert_eq!(record.original_size, pdf.size());
        assert_eq!(&record.data[..4], &[0x89, b'P', b'N', b'G']);
        assert!(record.width.unwrap() > 0 && record.height.unwrap() > 0);
    }
}

#[tokio::test]
async fn pdf_input_page_subset_selection() {
    e2e_skip_unless_engine!();

    let pdf = pdf_fixture("doc.pdf", 4).await;
    let opts = ConversionOptions::builder()
        .format(OutputFormat::Jpeg)
        .pages(PageSelection::Set(vec![1, 3]))
        .build()
        .unwrap();

    let outcome = convert_images(std::slice::from_ref(&pdf), &opts)
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].original_name, "doc-page1.jpg");
    assert_eq!(outcome.results[1].original_name, "doc-page3.jpg");
    assert_eq!(&outcome.results[0].data[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn pdf_to_pdf_downgrades_pages_to_png_with_warnings() {
    e2e_skip_unless_engine!();

    let pdf = pdf_fixture("again.pdf", 2).await;
    let outcome = convert_images(std::slice::from_ref(&pdf), &options(OutputFormat::Pdf))
        .await
        .unwrap();

    // A lone PDF input always takes the extraction route; the pdf target
    // has no raster encoder, so every page falls back to PNG.
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].original_name, "again-page1.png");
    assert_eq!(outcome.results[0].format, OutputFormat::Png);
    assert_eq!(outcome.warnings.len(), 2);
    assert_eq!(
        outcome.warnings[0],
        "Format pdf not supported, used PNG for page 1"
    );
}

#[tokio::test]
async fn disguised_pdf_is_routed_by_magic_bytes() {
    e2e_skip_unless_engine!();

    let pdf = pdf_fixture("fixture.pdf", 2).await;
    // A PDF handed over with an image name still takes the PDF-input path.
    let disguised = InputFile::from_bytes("scan.png", pdf.bytes.clone());
    assert!(disguised.is_pdf());

    let outcome = convert_images(&[disguised], &options(OutputFormat::Png))
        .await
        .unwrap();
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].original_name, "scan.png-page1.png");
}

#[tokio::test]
async fn corrupt_pdf_records_one_aggregate_error() {
    e2e_skip_unless_engine!();

    let broken = InputFile::from_bytes("broken.pdf", &b"%PDF-1.7 truncated"[..]);
    let outcome = convert_images(&[broken], &options(OutputFormat::Png))
        .await
        .unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.errors, vec!["Failed to convert PDF"]);
}

#[tokio::test]
async fn pdf_stream_yields_one_item_per_page() {
    e2e_skip_unless_engine!();

    let pdf = pdf_fixture("streamed.pdf", 3).await;
    let mut s = convert_stream(vec![pdf], options(OutputFormat::Png))
        .await
        .unwrap();

    let mut names = Vec::new();
    while let Some(item) = s.next().await {
        names.push(item.expect("page should convert").original_name);
    }
    assert_eq!(
        names,
        vec![
            "streamed-page1.png",
            "streamed-page2.png",
            "streamed-page3.png"
        ]
    );
}
