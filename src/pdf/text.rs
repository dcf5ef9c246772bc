use std::cmp::Ordering;

use lopdf::content::Content;
use lopdf::Object;

use crate::model::{Rect, TextFragment};

use super::PdfError;

/// Fallback when no Tf has been seen before the first show-text operator.
const DEFAULT_FONT_SIZE: f32 = 10.0;

/// Average glyph advance as a fraction of the font size. OCR text layers
/// carry no reliable width metrics, and only the vertical extent of a
/// fragment matters for boundary computation; the horizontal extent is an
/// estimate.
const GLYPH_WIDTH_RATIO: f32 = 0.5;

/// Minimal text-object state: enough of the PDF text machinery (BT/ET,
/// Td/TD/Tm/T*, Tf/TL, Tj/TJ/'/") to position each shown string on the
/// page. General transforms (cm) and font metrics are out of scope; OCR
/// text layers place lines with plain translations.
#[derive(Debug, Clone, Copy)]
struct TextState {
    line_x: f32,
    line_y: f32,
    x: f32,
    y: f32,
    font_size: f32,
    scale_y: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            line_x: 0.0,
            line_y: 0.0,
            x: 0.0,
            y: 0.0,
            font_size: DEFAULT_FONT_SIZE,
            scale_y: 1.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn effective_font_size(&self) -> f32 {
        (self.font_size * self.scale_y).abs().max(1.0)
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_x += tx;
        self.line_y += ty;
        self.x = self.line_x;
        self.y = self.line_y;
    }

    fn next_line(&mut self) {
        self.line_y -= self.leading;
        self.x = self.line_x;
        self.y = self.line_y;
    }
}

/// Decode one page's content stream into positioned text fragments, sorted
/// top to bottom, then left to right.
pub(crate) fn fragments_from_content(data: &[u8]) -> Result<Vec<TextFragment>, PdfError> {
    let content = Content::decode(data).map_err(PdfError::Parse)?;

    let mut state = TextState::default();
    let mut fragments = Vec::new();

    for operation in &content.operations {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "BT" => state = TextState {
                font_size: state.font_size,
                leading: state.leading,
                ..TextState::default()
            },
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    state.leading = leading;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "Tm" => {
                if operands.len() == 6 {
                    if let (Some(scale_y), Some(e), Some(f)) = (
                        operands.get(3).and_then(number),
                        operands.get(4).and_then(number),
                        operands.get(5).and_then(number),
                    ) {
                        state.scale_y = scale_y;
                        state.line_x = e;
                        state.line_y = f;
                        state.x = e;
                        state.y = f;
                    }
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(text) = operands.first().and_then(decoded_string) {
                    emit(&mut fragments, &mut state, &text, 0.0);
                }
            }
            "'" => {
                state.next_line();
                if let Some(text) = operands.first().and_then(decoded_string) {
                    emit(&mut fragments, &mut state, &text, 0.0);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(text) = operands.get(2).and_then(decoded_string) {
                    emit(&mut fragments, &mut state, &text, 0.0);
                }
            }
            "TJ" => {
                if let Some(Object::Array(elements)) = operands.first() {
                    let mut text = String::new();
                    let mut adjustment = 0.0_f32;
                    for element in elements {
                        match element {
                            Object::String(..) => {
                                if let Some(part) = decoded_string(element) {
                                    text.push_str(&part);
                                }
                            }
                            _ => {
                                if let Some(value) = number(element) {
                                    adjustment -= value / 1000.0;
                                }
                            }
                        }
                    }
                    if !text.is_empty() {
                        emit(&mut fragments, &mut state, &text, adjustment);
                    }
                }
            }
            _ => {}
        }
    }

    fragments.sort_by(|a, b| {
        b.rect
            .top
            .partial_cmp(&a.rect.top)
            .unwrap_or(Ordering::Equal)
            .then(
                a.rect
                    .left
                    .partial_cmp(&b.rect.left)
                    .unwrap_or(Ordering::Equal),
            )
    });

    Ok(fragments)
}

fn emit(fragments: &mut Vec<TextFragment>, state: &mut TextState, text: &str, adjustment: f32) {
    let font_size = state.effective_font_size();
    let advance =
        (text.chars().count() as f32 * GLYPH_WIDTH_RATIO + adjustment).max(0.0) * font_size;

    let rect = Rect::new(state.x, state.y, state.x + advance, state.y + font_size);
    fragments.push(TextFragment {
        text: text.to_string(),
        rect,
    });
    state.x += advance;
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

fn decoded_string(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(match String::from_utf8(bytes.clone()) {
            Ok(text) => text,
            Err(_) => bytes.iter().map(|&byte| byte as char).collect(),
        }),
        _ => None,
    }
}
