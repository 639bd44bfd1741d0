//! Standard Type 1 fonts and their metrics.
//!
//! The fourteen standard fonts need no embedding, so a [`Font`] is just a
//! family, style flags and a size. Layout goes through the [`FontMetrics`]
//! trait; [`StandardFont`] implements it from AFM width tables for the
//! printable ASCII range.

use crate::object::Object;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::object_serializer::ObjectSerializer;

/// Font family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    /// Helvetica (sans-serif)
    #[default]
    Helvetica,
    /// Times (serif)
    Times,
    /// Courier (monospace)
    Courier,
    /// Symbol
    Symbol,
    /// Zapf Dingbats
    ZapfDingbats,
}

bitflags! {
    /// Font style bits. Bold and italic select the face; underline and
    /// strikeout are drawn as separate strokes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontStyle: u8 {
        /// Bold face
        const BOLD = 0b0001;
        /// Italic or oblique face
        const ITALIC = 0b0010;
        /// Underline decoration
        const UNDERLINE = 0b0100;
        /// Strikeout decoration
        const STRIKEOUT = 0b1000;
    }
}

/// Font measurement interface used by text layout.
///
/// All results are in points for the given font size. Descent and
/// underline position are negative (below the baseline).
pub trait FontMetrics: std::fmt::Debug + Send + Sync {
    /// Advance width of a single character.
    fn char_width(&self, ch: char, size: f64) -> f64;

    /// Advance width of a string.
    fn text_width(&self, text: &str, size: f64) -> f64 {
        text.chars().map(|c| self.char_width(c, size)).sum()
    }

    /// Height above the baseline.
    fn ascent(&self, size: f64) -> f64;

    /// Depth below the baseline, negative.
    fn descent(&self, size: f64) -> f64;

    /// Baseline-to-baseline distance.
    fn line_height(&self, size: f64) -> f64 {
        self.ascent(size) - self.descent(size)
    }

    /// Offset of the underline from the baseline, negative.
    fn underline_position(&self, size: f64) -> f64;

    /// Underline stroke width.
    fn underline_thickness(&self, size: f64) -> f64;

    /// Offset of the strikeout line from the baseline.
    fn strikeout_position(&self, size: f64) -> f64 {
        self.ascent(size) * 0.36
    }
}

/// One of the fourteen standard PDF fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    /// Helvetica
    Helvetica,
    /// Helvetica-Bold
    HelveticaBold,
    /// Helvetica-Oblique
    HelveticaOblique,
    /// Helvetica-BoldOblique
    HelveticaBoldOblique,
    /// Times-Roman
    TimesRoman,
    /// Times-Bold
    TimesBold,
    /// Times-Italic
    TimesItalic,
    /// Times-BoldItalic
    TimesBoldItalic,
    /// Courier
    Courier,
    /// Courier-Bold
    CourierBold,
    /// Courier-Oblique
    CourierOblique,
    /// Courier-BoldOblique
    CourierBoldOblique,
    /// Symbol
    Symbol,
    /// ZapfDingbats
    ZapfDingbats,
}

enum Widths {
    /// Printable ASCII (32..=126) plus the width used for everything else
    Ascii(&'static [u16; 95], u16),
    Fixed(u16),
}

struct AfmMetrics {
    ascent: f64,
    descent: f64,
    underline_position: f64,
    underline_thickness: f64,
    widths: Widths,
}

impl StandardFont {
    /// Pick the face for a family and style.
    pub fn resolve(family: FontFamily, style: FontStyle) -> Self {
        let bold = style.contains(FontStyle::BOLD);
        let italic = style.contains(FontStyle::ITALIC);
        match (family, bold, italic) {
            (FontFamily::Helvetica, false, false) => StandardFont::Helvetica,
            (FontFamily::Helvetica, true, false) => StandardFont::HelveticaBold,
            (FontFamily::Helvetica, false, true) => StandardFont::HelveticaOblique,
            (FontFamily::Helvetica, true, true) => StandardFont::HelveticaBoldOblique,
            (FontFamily::Times, false, false) => StandardFont::TimesRoman,
            (FontFamily::Times, true, false) => StandardFont::TimesBold,
            (FontFamily::Times, false, true) => StandardFont::TimesItalic,
            (FontFamily::Times, true, true) => StandardFont::TimesBoldItalic,
            (FontFamily::Courier, false, false) => StandardFont::Courier,
            (FontFamily::Courier, true, false) => StandardFont::CourierBold,
            (FontFamily::Courier, false, true) => StandardFont::CourierOblique,
            (FontFamily::Courier, true, true) => StandardFont::CourierBoldOblique,
            (FontFamily::Symbol, _, _) => StandardFont::Symbol,
            (FontFamily::ZapfDingbats, _, _) => StandardFont::ZapfDingbats,
        }
    }

    /// PostScript name used as `/BaseFont`.
    pub fn base_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Text encoding, or `None` for the symbolic fonts' built-in encoding.
    pub fn encoding(self) -> Option<&'static str> {
        match self {
            StandardFont::Symbol | StandardFont::ZapfDingbats => None,
            _ => Some("WinAnsiEncoding"),
        }
    }

    fn afm(self) -> AfmMetrics {
        let (ascent, descent, widths) = match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => {
                (718.0, -207.0, Widths::Ascii(&HELVETICA_WIDTHS, 556))
            },
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => {
                (718.0, -207.0, Widths::Ascii(&HELVETICA_BOLD_WIDTHS, 556))
            },
            StandardFont::TimesRoman => (683.0, -217.0, Widths::Ascii(&TIMES_ROMAN_WIDTHS, 500)),
            StandardFont::TimesItalic => (683.0, -217.0, Widths::Ascii(&TIMES_ITALIC_WIDTHS, 500)),
            StandardFont::TimesBold => (676.0, -205.0, Widths::Ascii(&TIMES_BOLD_WIDTHS, 500)),
            StandardFont::TimesBoldItalic => {
                (676.0, -205.0, Widths::Ascii(&TIMES_BOLD_ITALIC_WIDTHS, 500))
            },
            StandardFont::Courier | StandardFont::CourierOblique => {
                (629.0, -157.0, Widths::Fixed(600))
            },
            StandardFont::CourierBold | StandardFont::CourierBoldOblique => {
                (626.0, -142.0, Widths::Fixed(600))
            },
            // Symbolic faces have no ASCII semantics; a flat width keeps layout usable
            StandardFont::Symbol => (1010.0, -293.0, Widths::Fixed(600)),
            StandardFont::ZapfDingbats => (820.0, -143.0, Widths::Fixed(788)),
        };
        AfmMetrics {
            ascent,
            descent,
            underline_position: -100.0,
            underline_thickness: 50.0,
            widths,
        }
    }

    /// Width of a character in 1/1000 em.
    pub fn glyph_width(self, ch: char) -> u16 {
        match self.afm().widths {
            Widths::Fixed(w) => w,
            Widths::Ascii(table, fallback) => match ch as u32 {
                code @ 32..=126 => table[(code - 32) as usize],
                // Tabs and other blanks measure as a space
                _ if ch.is_whitespace() => table[0],
                _ => fallback,
            },
        }
    }
}

impl FontMetrics for StandardFont {
    fn char_width(&self, ch: char, size: f64) -> f64 {
        self.glyph_width(ch) as f64 * size / 1000.0
    }

    fn ascent(&self, size: f64) -> f64 {
        self.afm().ascent * size / 1000.0
    }

    fn descent(&self, size: f64) -> f64 {
        self.afm().descent * size / 1000.0
    }

    fn underline_position(&self, size: f64) -> f64 {
        self.afm().underline_position * size / 1000.0
    }

    fn underline_thickness(&self, size: f64) -> f64 {
        self.afm().underline_thickness * size / 1000.0
    }
}

/// A standard font at a given size.
///
/// ```
/// use pdf_pagesmith::writer::{Font, FontFamily, FontStyle};
///
/// let font = Font::new(FontFamily::Helvetica, 10.0);
/// assert!((font.text_width("Hello World") - 51.67).abs() < 1e-9);
///
/// let heading = font.with_style(FontStyle::BOLD).with_size(14.0);
/// assert_eq!(heading.standard().base_name(), "Helvetica-Bold");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    /// Family
    pub family: FontFamily,
    /// Style bits
    pub style: FontStyle,
    /// Size in points
    pub size: f64,
}

impl Default for Font {
    fn default() -> Self {
        Self::new(FontFamily::Helvetica, 12.0)
    }
}

impl Font {
    /// Regular font of the given family and size.
    pub fn new(family: FontFamily, size: f64) -> Self {
        Self {
            family,
            style: FontStyle::empty(),
            size,
        }
    }

    /// Replace the style bits.
    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    /// Replace the size.
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    /// The face selected by family, bold and italic.
    pub fn standard(&self) -> StandardFont {
        StandardFont::resolve(self.family, self.style)
    }

    /// Metrics for this face.
    pub fn metrics(&self) -> &'static dyn FontMetrics {
        standard_metrics(self.standard())
    }

    /// Width of `text` at this size.
    pub fn text_width(&self, text: &str) -> f64 {
        self.metrics().text_width(text, self.size)
    }

    /// Width of one character at this size.
    pub fn char_width(&self, ch: char) -> f64 {
        self.metrics().char_width(ch, self.size)
    }

    /// Baseline-to-baseline distance at this size.
    pub fn line_height(&self) -> f64 {
        self.metrics().line_height(self.size)
    }

    /// Ascent at this size.
    pub fn ascent(&self) -> f64 {
        self.metrics().ascent(self.size)
    }

    /// Whether underline is requested.
    pub fn is_underline(&self) -> bool {
        self.style.contains(FontStyle::UNDERLINE)
    }

    /// Whether strikeout is requested.
    pub fn is_strikeout(&self) -> bool {
        self.style.contains(FontStyle::STRIKEOUT)
    }

    /// Bytes identifying this font as a page resource: family, style, size, encoding.
    pub fn fingerprint_bytes(&self) -> Vec<u8> {
        let face = self.standard();
        let mut out = face.base_name().as_bytes().to_vec();
        out.push(0);
        out.push(self.style.bits());
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(face.encoding().unwrap_or("builtin").as_bytes());
        out
    }

    /// The font dictionary written for this resource.
    pub fn resource_object(&self) -> Object {
        let face = self.standard();
        let mut entries = vec![
            ("Type", ObjectSerializer::name("Font")),
            ("Subtype", ObjectSerializer::name("Type1")),
            ("BaseFont", ObjectSerializer::name(face.base_name())),
        ];
        if let Some(encoding) = face.encoding() {
            entries.push(("Encoding", ObjectSerializer::name(encoding)));
        }
        ObjectSerializer::dict(entries)
    }
}

fn standard_metrics(face: StandardFont) -> &'static dyn FontMetrics {
    static FACES: [StandardFont; 14] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
        StandardFont::Symbol,
        StandardFont::ZapfDingbats,
    ];
    let idx = FACES.iter().position(|f| *f == face).unwrap_or(0);
    &FACES[idx]
}

/// Encode text for a WinAnsiEncoding font; unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch as u32 {
            0x20..=0x7E | 0xA0..=0xFF => ch as u32 as u8,
            0x09 => b' ',
            _ => win_ansi_extra(ch).unwrap_or(b'?'),
        })
        .collect()
}

fn win_ansi_extra(ch: char) -> Option<u8> {
    Some(match ch {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    })
}

// AFM advance widths for characters 32..=126, in 1/1000 em.

#[rustfmt::skip]
static HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

#[rustfmt::skip]
static TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

#[rustfmt::skip]
static TIMES_BOLD_WIDTHS: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 930,
    722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944,
    722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
    333, 278, 333, 581, 500, 333,
    500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833,
    556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
    394, 220, 394, 520,
];

#[rustfmt::skip]
static TIMES_ITALIC_WIDTHS: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 675, 675, 675, 500, 920,
    611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833,
    667, 722, 611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556,
    389, 278, 389, 422, 500, 333,
    500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722,
    500, 500, 500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389,
    400, 275, 400, 541,
];

#[rustfmt::skip]
static TIMES_BOLD_ITALIC_WIDTHS: [u16; 95] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 832,
    667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889,
    722, 722, 611, 722, 667, 556, 611, 722, 667, 889, 667, 611, 611,
    333, 278, 333, 570, 500, 333,
    500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778,
    556, 500, 500, 500, 389, 389, 278, 556, 444, 667, 500, 444, 389,
    348, 220, 348, 570,
];
