//! Text wrapping and text operator emission.
//!
//! [`wrap`] breaks text into lines greedily against a width and an optional
//! height. [`render`] turns wrapped lines into `BT ... ET` operators with
//! alignment, justification, rotation and underline/strikeout strokes.

use super::content_stream::ContentStreamOp;
use super::font_manager::{encode_win_ansi, Font};
use super::graphics_state::{Color, FillPaint, Pen, StateCache};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

// Absorbs float noise when summing glyph widths
const WIDTH_EPSILON: f64 = 1e-9;

/// Horizontal alignment of wrapped lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Flush left
    #[default]
    Left,
    /// Flush right
    Right,
    /// Centered
    Center,
    /// Stretched to both edges by word spacing
    Justify,
}

/// One wrapped line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Text without trailing blanks
    pub text: String,
    /// Measured width in points
    pub width: f64,
    /// Width the line was wrapped against
    pub available: f64,
    /// Number of words
    pub word_count: usize,
    /// Ended by an explicit newline or the end of the text
    pub paragraph_end: bool,
}

/// Output of [`wrap`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrapResult {
    /// Lines that fit
    pub lines: Vec<Line>,
    /// Text that did not fit vertically
    pub remainder: Option<String>,
}

impl WrapResult {
    /// Height the lines occupy.
    pub fn height(&self, font: &Font) -> f64 {
        self.lines.len() as f64 * font.line_height()
    }

    /// Width of the widest line.
    pub fn width(&self) -> f64 {
        self.lines.iter().map(|l| l.width).fold(0.0, f64::max)
    }
}

impl Line {
    /// Number of ASCII spaces, the characters `Tw` widens.
    pub fn space_count(&self) -> usize {
        self.text.chars().filter(|&c| c == ' ').count()
    }
}

/// Break `text` into lines no wider than `width`.
///
/// The first line starts `start_offset` points in. Lines break at the last
/// blank before the overflow, or mid-word when a word alone is too wide.
/// `\n` always breaks. Lines stop once the next one would pass `height`; the
/// rest of the text is returned as the remainder.
///
/// # Errors
///
/// [`Error::TextRegionTooSmall`] if a single character is wider than an
/// empty line.
///
/// # Examples
///
/// ```
/// use pdf_pagesmith::writer::{wrap, Font, FontFamily};
///
/// let font = Font::new(FontFamily::Courier, 10.0);
/// // Courier is 6pt per character at 10pt
/// let result = wrap("aaa bbb ccc", 45.0, f64::INFINITY, &font, 0.0).unwrap();
/// let lines: Vec<_> = result.lines.iter().map(|l| l.text.as_str()).collect();
/// assert_eq!(lines, ["aaa bbb", "ccc"]);
/// ```
pub fn wrap(text: &str, width: f64, height: f64, font: &Font, start_offset: f64) -> Result<WrapResult> {
    let chars: Vec<char> = text.chars().collect();
    let line_height = font.line_height();
    let max_lines = if height.is_finite() && line_height > 0.0 {
        ((height + WIDTH_EPSILON) / line_height).floor().max(0.0) as usize
    } else {
        usize::MAX
    };

    let mut result = WrapResult::default();
    let mut pos = 0;
    while pos < chars.len() {
        if result.lines.len() >= max_lines {
            result.remainder = Some(chars[pos..].iter().collect());
            break;
        }

        let first = result.lines.is_empty();
        let available = if first { width - start_offset } else { width };
        let (end, next, paragraph_end) = break_line(&chars, pos, available, font, first && start_offset > 0.0, width)?;

        let raw: String = chars[pos..end].iter().collect();
        let text = raw.trim_end().to_string();
        result.lines.push(Line {
            width: font.text_width(&text),
            available,
            word_count: text.split_whitespace().count(),
            paragraph_end,
            text,
        });
        pos = next;
    }
    Ok(result)
}

/// Lay out `text` without a width limit, breaking only at `\n`.
///
/// Every line's available width is the widest line, so alignment places
/// lines inside the block the text occupies.
pub fn wrap_unbounded(text: &str, font: &Font) -> Result<WrapResult> {
    let mut result = wrap(text, f64::INFINITY, f64::INFINITY, font, 0.0)?;
    let width = result.width();
    for line in &mut result.lines {
        line.available = width;
    }
    Ok(result)
}

/// Find where the line starting at `pos` ends.
///
/// Returns (end of line text, start of next line, ended by newline or end of text).
fn break_line(
    chars: &[char],
    pos: usize,
    available: f64,
    font: &Font,
    indented: bool,
    full_width: f64,
) -> Result<(usize, usize, bool)> {
    let mut acc = 0.0;
    let mut last_blank = None;
    for (i, &ch) in chars.iter().enumerate().skip(pos) {
        if ch == '\n' {
            return Ok((i, i + 1, true));
        }
        let cw = font.char_width(ch);
        if acc + cw <= available + WIDTH_EPSILON {
            acc += cw;
            if ch == ' ' || ch == '\t' {
                last_blank = Some(i);
            }
            continue;
        }

        if ch == ' ' || ch == '\t' {
            return Ok((i, i + 1, false));
        }
        if let Some(blank) = last_blank {
            return Ok((blank, blank + 1, false));
        }
        if i > pos {
            return Ok((i, i, false));
        }
        // Nothing fits after the cursor; continue on a fresh full-width line
        if indented && cw <= full_width + WIDTH_EPSILON {
            return Ok((pos, pos, false));
        }
        return Err(Error::TextRegionTooSmall {
            ch,
            needed: cw,
            available: available.max(0.0),
        });
    }
    Ok((chars.len(), chars.len(), true))
}

/// Offset of a line of width `line_width` inside `available`.
pub fn alignment_offset(alignment: Alignment, available: f64, line_width: f64) -> f64 {
    match alignment {
        Alignment::Left | Alignment::Justify => 0.0,
        Alignment::Right => available - line_width,
        Alignment::Center => (available - line_width) / 2.0,
    }
}

/// Extra space per ASCII space that stretches `line` to its available width.
///
/// Zero for single-word lines, for lines that end a paragraph (unless
/// `justify_last_line`), and for lines already at full width. Tabs and
/// other blanks are not widened by `Tw`, so only `' '` counts as a gap.
pub fn justify_spacing(line: &Line, justify_last_line: bool) -> f64 {
    let spaces = line.space_count();
    if line.word_count < 2 || spaces == 0 || (line.paragraph_end && !justify_last_line) {
        return 0.0;
    }
    let slack = line.available - line.width;
    if !slack.is_finite() {
        return 0.0;
    }
    (slack / spaces as f64).max(0.0)
}

/// Appearance of a block of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Font, including underline/strikeout bits
    pub font: Font,
    /// Fill color of the glyphs and decoration strokes
    pub color: Color,
    /// Line alignment
    pub alignment: Alignment,
    /// Stretch the last line of justified paragraphs as well
    pub justify_last_line: bool,
    /// Rotation in degrees, counter-clockwise about the frame center
    pub angle: f64,
}

impl TextStyle {
    /// Left-aligned, black, unrotated.
    pub fn new(font: Font) -> Self {
        Self {
            font,
            color: Color::BLACK,
            alignment: Alignment::Left,
            justify_last_line: false,
            angle: 0.0,
        }
    }

    /// Replace the alignment.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Replace the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Replace the rotation.
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }
}

/// Emit operators for `lines` laid out in `frame` (PDF space, y up).
///
/// The first line's baseline sits one ascent below the frame top, offset by
/// `first_line_offset`; each later line starts at the frame's left edge.
pub fn render(
    lines: &[Line],
    font_name: &str,
    style: &TextStyle,
    frame: Rect,
    first_line_offset: f64,
    cache: &mut StateCache,
) -> Vec<ContentStreamOp> {
    let mut ops = Vec::new();
    if lines.is_empty() {
        return ops;
    }

    let rotated = style.angle.rem_euclid(360.0) != 0.0;
    if rotated {
        ops.push(cache.save());
        ops.push(rotation_about_center(&frame, style.angle));
    }

    let font = &style.font;
    let top = frame.y + frame.height;
    let line_height = font.line_height();
    let mut decorations = Vec::new();

    ops.extend(cache.apply_fill(FillPaint::Color(style.color)));
    ops.push(ContentStreamOp::BeginText);
    ops.extend(cache.apply_font(font_name, font.size));
    for (i, line) in lines.iter().enumerate() {
        let indent = if i == 0 { first_line_offset } else { 0.0 };
        let available = if line.available.is_finite() { line.available } else { line.width };
        let x = frame.x + indent + alignment_offset(style.alignment, available, line.width);
        let baseline = top - font.ascent() - i as f64 * line_height;

        let spacing = if style.alignment == Alignment::Justify {
            justify_spacing(line, style.justify_last_line)
        } else {
            0.0
        };
        ops.extend(cache.apply_word_spacing(spacing));
        ops.push(ContentStreamOp::SetTextMatrix(1.0, 0.0, 0.0, 1.0, x, baseline));
        ops.push(ContentStreamOp::ShowText(encode_win_ansi(&line.text)));

        let drawn_width = line.width + spacing * line.space_count() as f64;
        if font.is_underline() {
            let y = baseline + font.metrics().underline_position(font.size);
            decorations.push((x, y, drawn_width));
        }
        if font.is_strikeout() {
            let y = baseline + font.metrics().strikeout_position(font.size);
            decorations.push((x, y, drawn_width));
        }
    }
    ops.push(ContentStreamOp::EndText);

    if !decorations.is_empty() {
        let thickness = font.metrics().underline_thickness(font.size);
        ops.extend(cache.apply_pen(&Pen::new(style.color, thickness)));
        for (x, y, w) in decorations {
            ops.push(ContentStreamOp::MoveTo(x, y));
            ops.push(ContentStreamOp::LineTo(x + w, y));
        }
        ops.push(ContentStreamOp::Stroke);
    }

    if rotated {
        ops.push(cache.restore());
    }
    ops
}

/// `cm` rotating by `angle` degrees counter-clockwise about the center of `frame`.
pub fn rotation_about_center(frame: &Rect, angle: f64) -> ContentStreamOp {
    let (sin, cos) = angle.to_radians().sin_cos();
    let c = frame.center();
    ContentStreamOp::Transform(
        cos,
        sin,
        -sin,
        cos,
        c.x - cos * c.x + sin * c.y,
        c.y - sin * c.x - cos * c.y,
    )
}
