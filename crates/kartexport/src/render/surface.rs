//! Drawing surface abstraction and its PDF backend
//!
//! Page furnishing code only talks to [`DrawingSurface`]. Coordinates are PDF
//! points with the origin in the bottom-left corner of the page.

use crate::constants::HELVETICA_CHAR_WIDTH_RATIO;
use crate::types::{Color, Result};
use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::HashMap;

/// A point on the page, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Horizontal anchoring of a text run relative to its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Paint applied to a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStyle {
    pub fill: Option<Color>,
    pub stroke: Option<(Color, f32)>,
    /// Opacity of fill and stroke (0.0..=1.0)
    pub alpha: f32,
    pub close: bool,
}

impl PathStyle {
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(color),
            stroke: None,
            alpha: 1.0,
            close: true,
        }
    }

    pub fn stroked(color: Color, width: f32) -> Self {
        Self {
            fill: None,
            stroke: Some((color, width)),
            alpha: 1.0,
            close: false,
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }
}

/// Vector drawing target for one page
pub trait DrawingSurface {
    /// Page width and height in points
    fn page_size(&self) -> (f32, f32);

    fn line(&mut self, from: Point, to: Point, width: f32, color: Color);

    fn path(&mut self, points: &[Point], style: PathStyle);

    fn text(&mut self, text: &str, origin: Point, size: f32, align: TextAlign, color: Color);

    /// Draw `image` stretched into the rectangle with bottom-left corner `origin`
    fn image(&mut self, image: &RgbaImage, origin: Point, width: f32, height: f32) -> Result<()>;

    /// Advance width of `text` at `size`
    fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * HELVETICA_CHAR_WIDTH_RATIO
    }

    fn rect(&mut self, origin: Point, width: f32, height: f32, style: PathStyle) {
        let points = [
            origin,
            Point::new(origin.x + width, origin.y),
            Point::new(origin.x + width, origin.y + height),
            Point::new(origin.x, origin.y + height),
        ];
        self.path(&points, PathStyle { close: true, ..style });
    }
}

// =============================================================================
// PDF Backend
// =============================================================================

/// Single-page PDF built with `lopdf`
pub struct PdfSurface {
    doc: Document,
    width: f32,
    height: f32,
    ops: String,
    xobjects: Dictionary,
    graphics_states: Dictionary,
    alpha_states: HashMap<u16, String>,
    uses_font: bool,
    title: Option<String>,
}

impl PdfSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            doc: Document::with_version("1.7"),
            width,
            height,
            ops: String::new(),
            xobjects: Dictionary::new(),
            graphics_states: Dictionary::new(),
            alpha_states: HashMap::new(),
            uses_font: false,
            title: None,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Name of an ExtGState with the given constant alpha
    fn alpha_state(&mut self, alpha: f32) -> String {
        let key = (alpha * 1000.0).round() as u16;
        if let Some(name) = self.alpha_states.get(&key) {
            return name.clone();
        }
        let name = format!("GS{}", self.alpha_states.len());
        let value = Object::Real(f32::from(key) / 1000.0);
        let state = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"ExtGState".to_vec())),
            ("ca", value.clone()),
            ("CA", value),
        ]);
        self.graphics_states
            .set(name.as_bytes().to_vec(), Object::Dictionary(state));
        self.alpha_states.insert(key, name.clone());
        name
    }

    fn add_image_xobject(&mut self, image: &RgbaImage) -> ObjectId {
        let (width, height) = image.dimensions();
        let pixels = image.pixels();
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        let mut alpha = Vec::with_capacity(width as usize * height as usize);
        for px in pixels {
            rgb.extend_from_slice(&px.0[..3]);
            alpha.push(px.0[3]);
        }

        let mut dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(width))),
            ("Height", Object::Integer(i64::from(height))),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ]);

        if alpha.iter().any(|&a| a < 255) {
            let mask = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Image".to_vec())),
                ("Width", Object::Integer(i64::from(width))),
                ("Height", Object::Integer(i64::from(height))),
                ("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
                ("BitsPerComponent", Object::Integer(8)),
            ]);
            let mask_id = self.doc.add_object(Stream::new(mask, alpha));
            dict.set("SMask", Object::Reference(mask_id));
        }

        self.doc.add_object(Stream::new(dict, rgb))
    }

    /// Assemble page, page tree, catalog and document info
    pub fn finish(mut self) -> Result<Document> {
        let pages_id = self.doc.new_object_id();

        let mut resources = Dictionary::new();
        if !self.xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(self.xobjects));
        }
        if !self.graphics_states.is_empty() {
            resources.set("ExtGState", Object::Dictionary(self.graphics_states));
        }
        if self.uses_font {
            let font_id = self.doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(b"Helvetica".to_vec())),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ]));
            let fonts = Dictionary::from_iter(vec![("F1", Object::Reference(font_id))]);
            resources.set("Font", Object::Dictionary(fonts));
        }

        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), self.ops.into_bytes()));

        let page_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(self.width),
                    Object::Real(self.height),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
        ]));

        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ]);
        self.doc
            .objects
            .insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        let created = chrono::Local::now().format("D:%Y%m%d%H%M%S").to_string();
        let mut info = Dictionary::from_iter(vec![
            (
                "Producer",
                Object::String(b"kartexport".to_vec(), StringFormat::Literal),
            ),
            (
                "CreationDate",
                Object::String(created.into_bytes(), StringFormat::Literal),
            ),
        ]);
        if let Some(title) = &self.title {
            info.set(
                "Title",
                Object::String(encode_win_ansi(title), StringFormat::Hexadecimal),
            );
        }
        let info_id = self.doc.add_object(info);
        self.doc.trailer.set("Info", info_id);

        self.doc.compress();
        Ok(self.doc)
    }
}

impl DrawingSurface for PdfSurface {
    fn page_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn line(&mut self, from: Point, to: Point, width: f32, color: Color) {
        let [r, g, b] = color.to_pdf_components();
        self.ops.push_str(&format!(
            "q {} {} {} RG {} w 0 J {} {} m {} {} l S Q\n",
            r, g, b, width, from.x, from.y, to.x, to.y
        ));
    }

    fn path(&mut self, points: &[Point], style: PathStyle) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        if style.fill.is_none() && style.stroke.is_none() {
            return;
        }

        let mut ops = String::from("q ");
        if style.alpha < 1.0 {
            let state = self.alpha_state(style.alpha);
            ops.push_str(&format!("/{} gs ", state));
        }
        if let Some(fill) = style.fill {
            let [r, g, b] = fill.to_pdf_components();
            ops.push_str(&format!("{} {} {} rg ", r, g, b));
        }
        if let Some((stroke, width)) = style.stroke {
            let [r, g, b] = stroke.to_pdf_components();
            ops.push_str(&format!("{} {} {} RG {} w ", r, g, b, width));
        }

        ops.push_str(&format!("{} {} m ", first.x, first.y));
        for p in rest {
            ops.push_str(&format!("{} {} l ", p.x, p.y));
        }
        if style.close {
            ops.push_str("h ");
        }

        let paint = match (style.fill.is_some(), style.stroke.is_some()) {
            (true, true) => "B",
            (true, false) => "f",
            _ => "S",
        };
        ops.push_str(paint);
        ops.push_str(" Q\n");
        self.ops.push_str(&ops);
    }

    fn text(&mut self, text: &str, origin: Point, size: f32, align: TextAlign, color: Color) {
        if text.is_empty() {
            return;
        }
        self.uses_font = true;

        let width = self.text_width(text, size);
        let x = match align {
            TextAlign::Left => origin.x,
            TextAlign::Center => origin.x - width / 2.0,
            TextAlign::Right => origin.x - width,
        };
        let [r, g, b] = color.to_pdf_components();
        let hex: String = encode_win_ansi(text)
            .iter()
            .map(|byte| format!("{:02X}", byte))
            .collect();

        self.ops.push_str(&format!(
            "q {} {} {} rg BT /F1 {} Tf {} {} Td <{}> Tj ET Q\n",
            r, g, b, size, x, origin.y, hex
        ));
    }

    fn image(&mut self, image: &RgbaImage, origin: Point, width: f32, height: f32) -> Result<()> {
        let name = format!("Im{}", self.xobjects.len());
        let image_id = self.add_image_xobject(image);
        self.xobjects
            .set(name.as_bytes().to_vec(), Object::Reference(image_id));
        self.ops.push_str(&format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            width, height, origin.x, origin.y, name
        ));
        Ok(())
    }
}

/// Serialize a finished document
pub fn encode_pdf(mut doc: Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Encode text for a standard font with `WinAnsiEncoding`.
///
/// Latin-1 maps onto itself; a handful of typographic characters live in the
/// 0x80..0x9F block; everything else becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_keeps_latin1() {
        assert_eq!(encode_win_ansi("Straße ©"), b"Stra\xdfe \xa9".to_vec());
        assert_eq!(encode_win_ansi("€ ✓"), vec![0x80, b' ', b'?']);
    }

    #[test]
    fn test_finished_document_has_one_page() {
        let mut surface = PdfSurface::new(200.0, 100.0);
        surface.text("Hello", Point::new(10.0, 10.0), 12.0, TextAlign::Left, Color::BLACK);
        surface.line(
            Point::new(0.0, 0.0),
            Point::new(200.0, 100.0),
            1.0,
            Color::BLACK,
        );
        let doc = surface.finish().unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_transparent_image_gets_soft_mask() {
        let mut surface = PdfSurface::new(100.0, 100.0);
        let mut image = RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        image.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        surface
            .image(&image, Point::new(0.0, 0.0), 50.0, 50.0)
            .unwrap();
        let doc = surface.finish().unwrap();

        let has_smask = doc.objects.values().any(|object| {
            matches!(object, Object::Stream(stream) if stream.dict.has(b"SMask"))
        });
        assert!(has_smask);
    }

    #[test]
    fn test_path_paint_operators() {
        let mut surface = PdfSurface::new(100.0, 100.0);
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        surface.path(&square, PathStyle::stroked(Color::BLACK, 0.5));
        assert!(surface.ops.ends_with("0.5 w 0 0 m 10 0 l 10 10 l S Q\n"));

        surface.rect(
            Point::new(0.0, 0.0),
            5.0,
            5.0,
            PathStyle::filled(Color::WHITE).with_alpha(0.8),
        );
        assert!(surface.ops.contains("/GS0 gs"));
        assert!(surface.ops.ends_with("h f Q\n"));
    }

    #[test]
    fn test_encoded_pdf_starts_with_header() {
        let surface = PdfSurface::new(10.0, 10.0);
        let bytes = encode_pdf(surface.finish().unwrap()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
    }
}
