//! Ground-truth table fixtures rendered to JPEG, PDF and plain text

use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::error::FixtureError;

/// Header row of the embedded table
pub const HEADERS: [&str; 4] = ["Product", "Price", "Quantity", "Total"];

/// Data rows of the embedded table
pub const ROWS: [[&str; 4]; 4] = [
    ["Laptop", "$999", "2", "$1998"],
    ["Mouse", "$25", "5", "$125"],
    ["Keyboard", "$75", "3", "$225"],
    ["Monitor", "$300", "1", "$300"],
];

/// Body of the unsupported-media upload
pub const TEXT_FIXTURE_BODY: &[u8] = b"This is not an image or PDF";

/// Left edge of each column, shared by the image (px) and PDF (pt) layouts
const COLUMN_X: [u32; 4] = [50, 200, 350, 500];

const IMAGE_WIDTH: u32 = 800;
const IMAGE_HEIGHT: u32 = 600;
const IMAGE_HEADER_Y: u32 = 100;
const IMAGE_FIRST_ROW_Y: u32 = 140;
const IMAGE_ROW_PITCH: u32 = 30;
const IMAGE_TEXT_PX: f32 = 16.0;
const JPEG_QUALITY: u8 = 90;

/// font8x8 glyphs are scaled up to roughly match the TrueType size
const BITMAP_SCALE: u32 = 2;

// US Letter, origin bottom-left
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const PDF_TITLE: &str = "Sales Report";
const PDF_TITLE_Y: i64 = PAGE_HEIGHT - 50;
const PDF_HEADER_Y: i64 = PAGE_HEIGHT - 100;
const PDF_ROW_PITCH: i64 = 20;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// A table with known contents
///
/// Every row is as wide as the header and no cell is empty, so an extractor's
/// output can be checked by exact string comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFixture {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableFixture {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, FixtureError> {
        if headers.is_empty() {
            return Err(FixtureError::InvalidTable("table has no headers".to_string()));
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(FixtureError::InvalidTable(format!(
                    "row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    headers.len()
                )));
            }
        }

        let has_empty = headers
            .iter()
            .chain(rows.iter().flatten())
            .any(|cell| cell.trim().is_empty());
        if has_empty {
            return Err(FixtureError::InvalidTable("table contains an empty cell".to_string()));
        }

        Ok(Self { headers, rows })
    }

    /// The embedded product/price/quantity/total table
    pub fn ground_truth() -> Self {
        Self {
            headers: HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: ROWS
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

/// On-disk format of a rendered artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Image,
    Pdf,
    /// Only used to check unsupported-media handling
    Text,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Image => "jpg",
            ArtifactFormat::Pdf => "pdf",
            ArtifactFormat::Text => "txt",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ArtifactFormat::Image => "image/jpeg",
            ArtifactFormat::Pdf => "application/pdf",
            ArtifactFormat::Text => "text/plain",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactFormat::Image => "image",
            ArtifactFormat::Pdf => "pdf",
            ArtifactFormat::Text => "text",
        };
        f.write_str(name)
    }
}

/// A fixture written to a temporary file
///
/// The backing file is removed when the artifact is dropped, whichever way
/// the scope holding it exits.
pub struct RenderedArtifact {
    format: ArtifactFormat,
    upload_name: String,
    file: NamedTempFile,
}

impl RenderedArtifact {
    fn new(format: ArtifactFormat, file: NamedTempFile) -> Self {
        Self {
            format,
            upload_name: format!("test_table.{}", format.extension()),
            file,
        }
    }

    /// Use a different file name in the multipart upload
    pub fn renamed(mut self, upload_name: impl Into<String>) -> Self {
        self.upload_name = upload_name.into();
        self
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn upload_name(&self) -> &str {
        &self.upload_name
    }

    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.path())
    }

    /// Hex SHA-256 of the file contents
    pub fn sha256(&self) -> std::io::Result<String> {
        let data = self.read_bytes()?;
        let mut hasher = Sha256::new();
        hasher.update(&data);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Copy the artifact to `dir/<upload name>`; the temp file is untouched
    pub fn persist(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let target = dir.join(&self.upload_name);
        std::fs::copy(self.path(), &target)?;
        Ok(target)
    }
}

impl fmt::Debug for RenderedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedArtifact")
            .field("format", &self.format)
            .field("upload_name", &self.upload_name)
            .field("path", &self.path())
            .finish()
    }
}

impl Drop for RenderedArtifact {
    fn drop(&mut self) {
        debug!("Removing {} artifact {}", self.format, self.path().display());
    }
}

/// Glyph source for the image renderer
enum Glyphs {
    TrueType(FontVec),
    Bitmap,
}

/// Renders the ground-truth table into upload-ready artifacts
#[derive(Debug, Clone)]
pub struct FixtureGenerator {
    table: TableFixture,
    font_paths: Vec<PathBuf>,
    /// Where artifacts are created; the system temp dir when unset
    temp_dir: Option<PathBuf>,
}

impl Default for FixtureGenerator {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

impl FixtureGenerator {
    pub fn new(font_paths: Vec<PathBuf>) -> Self {
        Self {
            table: TableFixture::ground_truth(),
            font_paths,
            temp_dir: None,
        }
    }

    /// Create artifacts under `dir` instead of the system temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.font_paths.clone())
    }

    pub fn table(&self) -> &TableFixture {
        &self.table
    }

    /// JPEG rendering of the table
    pub fn make_image_fixture(&self) -> Result<RenderedArtifact, FixtureError> {
        let canvas = self.render_image();
        let mut file = self.temp_file(ArtifactFormat::Image)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(&canvas)?;
            writer.flush()?;
        }
        finish(ArtifactFormat::Image, file)
    }

    /// Single-page PDF rendering of the table
    pub fn make_pdf_fixture(&self) -> Result<RenderedArtifact, FixtureError> {
        let mut doc = self.render_pdf()?;
        let mut file = self.temp_file(ArtifactFormat::Pdf)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            doc.save_to(&mut writer)?;
            writer.flush()?;
        }
        finish(ArtifactFormat::Pdf, file)
    }

    /// Plain-text file the service must refuse as unsupported media
    pub fn make_text_fixture(&self) -> Result<RenderedArtifact, FixtureError> {
        let mut file = self.temp_file(ArtifactFormat::Text)?;
        file.write_all(TEXT_FIXTURE_BODY)?;
        file.flush()?;
        finish(ArtifactFormat::Text, file)
    }

    /// Draw the table on a white canvas. Never fails: a missing font falls
    /// back to the built-in bitmap glyphs.
    pub fn render_image(&self) -> RgbImage {
        let glyphs = self.load_glyphs();
        let mut canvas = RgbImage::from_pixel(IMAGE_WIDTH, IMAGE_HEIGHT, WHITE);

        for (col, header) in self.table.headers.iter().enumerate() {
            draw_text(&mut canvas, &glyphs, column_x(col), IMAGE_HEADER_Y, header);
        }

        for (row_idx, row) in self.table.rows.iter().enumerate() {
            let y = IMAGE_FIRST_ROW_Y + row_idx as u32 * IMAGE_ROW_PITCH;
            for (col, cell) in row.iter().enumerate() {
                draw_text(&mut canvas, &glyphs, column_x(col), y, cell);
            }
        }

        canvas
    }

    /// Build the PDF document: a bold title, bold headers, regular cells
    pub fn render_pdf(&self) -> Result<Document, FixtureError> {
        let mut doc = Document::with_version("1.5");

        let pages_id = doc.new_object_id();
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => bold_id,
                "F2" => regular_id,
            },
        });

        let mut operations = Vec::new();
        show_text(&mut operations, "F1", 16, COLUMN_X[0] as i64, PDF_TITLE_Y, PDF_TITLE);

        for (col, header) in self.table.headers.iter().enumerate() {
            show_text(&mut operations, "F1", 12, column_x(col) as i64, PDF_HEADER_Y, header);
        }

        for (row_idx, row) in self.table.rows.iter().enumerate() {
            let y = PDF_HEADER_Y - PDF_ROW_PITCH * (row_idx as i64 + 1);
            for (col, cell) in row.iter().enumerate() {
                show_text(&mut operations, "F2", 10, column_x(col) as i64, y, cell);
            }
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(PAGE_WIDTH),
                    Object::Integer(PAGE_HEIGHT),
                ],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Ok(doc)
    }

    fn temp_file(&self, format: ArtifactFormat) -> std::io::Result<NamedTempFile> {
        let suffix = format!(".{}", format.extension());
        let mut builder = tempfile::Builder::new();
        builder.prefix("tablecheck-").suffix(&suffix);
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    fn load_glyphs(&self) -> Glyphs {
        for path in &self.font_paths {
            match std::fs::read(path) {
                Ok(bytes) => match FontVec::try_from_vec(bytes) {
                    Ok(font) => {
                        debug!("Using font {}", path.display());
                        return Glyphs::TrueType(font);
                    }
                    Err(e) => warn!("Unusable font {}: {}", path.display(), e),
                },
                Err(e) => debug!("Font {} not available: {}", path.display(), e),
            }
        }

        warn!("No TrueType font could be loaded; falling back to built-in bitmap font");
        Glyphs::Bitmap
    }
}

/// Columns past the fixed layout keep the same spacing
fn column_x(col: usize) -> u32 {
    COLUMN_X.get(col).copied().unwrap_or_else(|| {
        let last = COLUMN_X[COLUMN_X.len() - 1];
        last + (col as u32 + 1 - COLUMN_X.len() as u32) * 150
    })
}

fn finish(format: ArtifactFormat, file: NamedTempFile) -> Result<RenderedArtifact, FixtureError> {
    let artifact = RenderedArtifact::new(format, file);
    debug!("Rendered {} fixture at {}", format, artifact.path().display());
    Ok(artifact)
}

fn draw_text(canvas: &mut RgbImage, glyphs: &Glyphs, x: u32, y: u32, text: &str) {
    match glyphs {
        Glyphs::TrueType(font) => {
            draw_text_mut(canvas, BLACK, x as i32, y as i32, PxScale::from(IMAGE_TEXT_PX), font, text);
        }
        Glyphs::Bitmap => draw_bitmap_text(canvas, x, y, text),
    }
}

fn draw_bitmap_text(canvas: &mut RgbImage, x: u32, y: u32, text: &str) {
    let mut cursor = x;
    for ch in text.chars() {
        if let Some(glyph) = BASIC_FONTS.get(ch) {
            for (dy, bits) in glyph.iter().enumerate() {
                for dx in 0..8u32 {
                    // font8x8 stores the leftmost pixel in the low bit
                    if bits & (1 << dx) != 0 {
                        let rect = Rect::at(
                            (cursor + dx * BITMAP_SCALE) as i32,
                            (y + dy as u32 * BITMAP_SCALE) as i32,
                        )
                        .of_size(BITMAP_SCALE, BITMAP_SCALE);
                        draw_filled_rect_mut(canvas, rect, BLACK);
                    }
                }
            }
        }
        cursor += 8 * BITMAP_SCALE;
    }
}

fn show_text(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(font.as_bytes().to_vec()), Object::Integer(size)],
    ));
    ops.push(Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    ops.push(Operation::new("ET", vec![]));
}
