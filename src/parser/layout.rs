//! Content-stream walk producing page primitives.
//!
//! Extracts the two primitive families the detection core needs: words with
//! bounding boxes (from the text-showing operators, tracking the text
//! matrix) and placed raster images (from `Do` on image XObjects, tracking
//! the graphics-state CTM through `q`/`cm`/`Q`).
//!
//! Raw PDF coordinates are bottom-up; everything emitted here is flipped to
//! the model's top-left-origin convention once, on output.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::model::{PlacedImage, Rect, Word};

use super::backend::{value_as_number, ContentOp, PageId, PdfBackend, PdfValue};

/// Text matrix for tracking position in the content stream.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32, // X translation
    f: f32, // Y translation
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self) {
        // Default line leading (could be set by TL operator)
        self.f -= 12.0 * self.d;
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

/// Current transformation matrix for the graphics state.
///
/// Only translation and scale are carried through to image placement;
/// rotation/skew components are folded into the axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
struct Ctm {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for Ctm {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl Ctm {
    /// Concatenate `m` onto this matrix (PDF `cm` semantics: new = m × old).
    fn concat(&self, m: [f32; 6]) -> Ctm {
        let [a, b, c, d, e, f] = m;
        Ctm {
            a: a * self.a + b * self.c,
            b: a * self.b + b * self.d,
            c: c * self.a + d * self.c,
            d: c * self.b + d * self.d,
            e: e * self.a + f * self.c + self.e,
            f: e * self.b + f * self.d + self.f,
        }
    }

    /// Map a point from user space through the matrix.
    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Axis-aligned bounding box of the transformed unit square. Image
    /// XObjects paint exactly the unit square in their own space, so this is
    /// the placed image rectangle (still in bottom-up PDF coordinates).
    fn unit_square_bbox(&self) -> (f32, f32, f32, f32) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        (min_x, min_y, max_x, max_y)
    }
}

/// Extracts words and placed images from one page's content stream.
pub struct PrimitiveExtractor<'a> {
    backend: &'a dyn PdfBackend,
}

impl<'a> PrimitiveExtractor<'a> {
    /// Create an extractor over a backend.
    pub fn new(backend: &'a dyn PdfBackend) -> Self {
        Self { backend }
    }

    /// Extract all primitives from a page.
    ///
    /// `page_height` is needed to flip coordinates to top-left origin.
    pub fn extract_page(
        &self,
        page_id: PageId,
        page_height: f32,
    ) -> Result<(Vec<Word>, Vec<PlacedImage>)> {
        // A page with no font resources (image-only pages) still has
        // placements worth extracting
        let fonts: HashMap<Vec<u8>, String> = self
            .backend
            .page_fonts(page_id)
            .unwrap_or_default()
            .into_iter()
            .collect();
        let image_names = self.backend.image_xobjects(page_id);

        let content = self.backend.page_content(page_id)?;
        let ops = self.backend.decode_content(&content)?;

        Ok(self.walk(page_id, page_height, &ops, &fonts, &image_names))
    }

    fn walk(
        &self,
        page_id: PageId,
        page_height: f32,
        ops: &[ContentOp],
        fonts: &HashMap<Vec<u8>, String>,
        image_names: &HashSet<Vec<u8>>,
    ) -> (Vec<Word>, Vec<PlacedImage>) {
        let mut words = Vec::new();
        let mut images = Vec::new();

        let mut current_font = String::new();
        let mut current_font_name: Vec<u8> = Vec::new();
        let mut current_font_size: f32 = 12.0;
        let mut text_matrix = TextMatrix::default();
        let mut in_text_block = false;

        let mut ctm = Ctm::default();
        let mut ctm_stack: Vec<Ctm> = Vec::new();

        for op in ops {
            match op.operator.as_str() {
                "q" => ctm_stack.push(ctm),
                "Q" => {
                    if let Some(prev) = ctm_stack.pop() {
                        ctm = prev;
                    }
                }
                "cm" => {
                    if op.operands.len() >= 6 {
                        let mut m = [0.0f32; 6];
                        for (i, slot) in m.iter_mut().enumerate() {
                            *slot = value_as_number(&op.operands[i])
                                .unwrap_or(if i == 0 || i == 3 { 1.0 } else { 0.0 });
                        }
                        ctm = ctm.concat(m);
                    }
                }
                "Do" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        if image_names.contains(name) {
                            let (x0, y0, x1, y1) = ctm.unit_square_bbox();
                            images.push(PlacedImage {
                                name: String::from_utf8_lossy(name).to_string(),
                                bbox: Rect::new(
                                    x0,
                                    page_height - y1,
                                    x1,
                                    page_height - y0,
                                ),
                            });
                        }
                    }
                }
                "BT" => {
                    in_text_block = true;
                    text_matrix = TextMatrix::default();
                }
                "ET" => {
                    in_text_block = false;
                }
                "Tf" => {
                    if op.operands.len() >= 2 {
                        if let PdfValue::Name(font_name) = &op.operands[0] {
                            current_font_name = font_name.clone();
                            current_font = fonts
                                .get(font_name.as_slice())
                                .cloned()
                                .unwrap_or_else(|| {
                                    String::from_utf8_lossy(font_name.as_slice()).to_string()
                                });
                        }
                        current_font_size = value_as_number(&op.operands[1]).unwrap_or(12.0);
                    }
                }
                "Td" | "TD" => {
                    if op.operands.len() >= 2 {
                        let tx = value_as_number(&op.operands[0]).unwrap_or(0.0);
                        let ty = value_as_number(&op.operands[1]).unwrap_or(0.0);
                        text_matrix.translate(tx, ty);
                    }
                }
                "Tm" => {
                    if op.operands.len() >= 6 {
                        text_matrix.set(
                            value_as_number(&op.operands[0]).unwrap_or(1.0),
                            value_as_number(&op.operands[1]).unwrap_or(0.0),
                            value_as_number(&op.operands[2]).unwrap_or(0.0),
                            value_as_number(&op.operands[3]).unwrap_or(1.0),
                            value_as_number(&op.operands[4]).unwrap_or(0.0),
                            value_as_number(&op.operands[5]).unwrap_or(0.0),
                        );
                    }
                }
                "T*" => text_matrix.next_line(),
                "Tj" | "TJ" => {
                    if in_text_block {
                        let text = self.decode_shown_text(page_id, &current_font_name, op);
                        if !text.trim().is_empty() {
                            let (x, y) = text_matrix.position();
                            let size = current_font_size * text_matrix.scale();
                            emit_words(
                                &mut words,
                                &text,
                                x,
                                y,
                                size,
                                &current_font,
                                page_height,
                            );
                        }
                    }
                }
                "'" | "\"" => {
                    text_matrix.next_line();
                    if in_text_block {
                        let text_idx = if op.operator == "\"" { 2 } else { 0 };
                        if let Some(PdfValue::Str(bytes)) = op.operands.get(text_idx) {
                            let text =
                                self.backend.decode_text(page_id, &current_font_name, bytes);
                            if !text.trim().is_empty() {
                                let (x, y) = text_matrix.position();
                                let size = current_font_size * text_matrix.scale();
                                emit_words(
                                    &mut words,
                                    &text,
                                    x,
                                    y,
                                    size,
                                    &current_font,
                                    page_height,
                                );
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        log::debug!(
            "extracted {} words and {} placed images from page content",
            words.len(),
            images.len()
        );

        (words, images)
    }

    /// Decode the text of a `Tj` or `TJ` operator.
    ///
    /// For `TJ`, positioning adjustments in 1/1000 text-space units larger
    /// than the space threshold are rendered as word spaces.
    fn decode_shown_text(&self, page_id: PageId, font_name: &[u8], op: &ContentOp) -> String {
        if op.operator == "TJ" {
            let Some(PdfValue::Array(arr)) = op.operands.first() else {
                return String::new();
            };
            let mut combined = String::new();
            let space_threshold = 200.0;

            for item in arr {
                match item {
                    PdfValue::Str(bytes) => {
                        combined.push_str(&self.backend.decode_text(page_id, font_name, bytes));
                    }
                    PdfValue::Integer(n) => {
                        if -(*n as f32) > space_threshold && !combined.ends_with(' ') {
                            combined.push(' ');
                        }
                    }
                    PdfValue::Real(n) => {
                        if -n > space_threshold && !combined.ends_with(' ') {
                            combined.push(' ');
                        }
                    }
                    _ => {}
                }
            }
            combined
        } else {
            match op.operands.first() {
                Some(PdfValue::Str(bytes)) => {
                    self.backend.decode_text(page_id, font_name, bytes)
                }
                _ => String::new(),
            }
        }
    }
}

/// Split decoded text into words and emit them with estimated boxes.
///
/// Widths are estimated from character count at roughly half the font size
/// per glyph; good enough for alignment analysis, not for typesetting.
fn emit_words(
    words: &mut Vec<Word>,
    text: &str,
    x: f32,
    y: f32,
    font_size: f32,
    font_name: &str,
    page_height: f32,
) {
    let char_width = font_size * 0.5;
    let ascent = font_size * 0.8;
    let descent = font_size * 0.2;

    let mut cursor = x;
    for token in text.split(' ') {
        let char_count = token.chars().count();
        if char_count == 0 {
            cursor += char_width;
            continue;
        }
        let width = char_count as f32 * char_width;
        words.push(Word {
            text: token.to_string(),
            bbox: Rect::new(
                cursor,
                page_height - y - ascent,
                cursor + width,
                page_height - y + descent,
            ),
            font_size,
            font_name: font_name.to_string(),
        });
        cursor += width + char_width;
    }
}
