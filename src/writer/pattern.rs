//! Tiling patterns for hatched fills.
//!
//! A hatched brush becomes a colored tiling pattern (PatternType 1) whose cell
//! draws the hatch lines. The page selects it with `/Pattern cs /Pn scn`.

use super::content_stream::{ContentStreamBuilder, ContentStreamOp};
use super::graphics_state::{Color, FillPattern};
use super::resources::Fingerprint;
use crate::object::{Dictionary, Object};

/// Side length of a hatch cell in points.
pub const HATCH_CELL: f64 = 5.0;

const HATCH_LINE_WIDTH: f64 = 0.5;

/// Pattern paint type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatternPaintType {
    /// Colors come from the cell content
    #[default]
    Colored = 1,
    /// Color is supplied when the pattern is selected
    Uncolored = 2,
}

/// Pattern tiling type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatternTilingType {
    /// Cell spacing is constant
    #[default]
    ConstantSpacing = 1,
    /// Cell may be distorted to align with device pixels
    NoDistortion = 2,
    /// Constant spacing with faster tiling
    ConstantSpacingFaster = 3,
}

/// Builder for tiling patterns (Type 1).
#[derive(Debug, Clone)]
pub struct TilingPatternBuilder {
    bbox: [f64; 4],
    x_step: f64,
    y_step: f64,
    paint_type: PatternPaintType,
    tiling_type: PatternTilingType,
    content: Vec<u8>,
}

impl Default for TilingPatternBuilder {
    fn default() -> Self {
        Self {
            bbox: [0.0, 0.0, HATCH_CELL, HATCH_CELL],
            x_step: HATCH_CELL,
            y_step: HATCH_CELL,
            paint_type: PatternPaintType::Colored,
            tiling_type: PatternTilingType::ConstantSpacing,
            content: Vec::new(),
        }
    }
}

impl TilingPatternBuilder {
    /// Create a new tiling pattern builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bounding box of the pattern cell.
    pub fn bbox(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bbox = [x, y, x + width, y + height];
        self
    }

    /// Set both steps at once.
    pub fn step(mut self, x: f64, y: f64) -> Self {
        self.x_step = x;
        self.y_step = y;
        self
    }

    /// Set the paint type.
    pub fn paint_type(mut self, paint_type: PatternPaintType) -> Self {
        self.paint_type = paint_type;
        self
    }

    /// Set the tiling type.
    pub fn tiling_type(mut self, tiling: PatternTilingType) -> Self {
        self.tiling_type = tiling;
        self
    }

    /// Set the cell content from operators.
    pub fn content(mut self, ops: Vec<ContentStreamOp>) -> Self {
        let mut builder = ContentStreamBuilder::new();
        builder.ops(ops);
        self.content = builder.build();
        self
    }

    /// Build the pattern dictionary and cell content.
    pub fn build(&self) -> (Dictionary, Vec<u8>) {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::Name("Pattern".to_string()));
        dict.insert("PatternType".to_string(), Object::Integer(1));
        dict.insert("PaintType".to_string(), Object::Integer(self.paint_type as i64));
        dict.insert("TilingType".to_string(), Object::Integer(self.tiling_type as i64));
        dict.insert(
            "BBox".to_string(),
            Object::Array(self.bbox.iter().map(|&v| Object::Real(v)).collect()),
        );
        dict.insert("XStep".to_string(), Object::Real(self.x_step));
        dict.insert("YStep".to_string(), Object::Real(self.y_step));
        dict.insert("Resources".to_string(), Object::Dictionary(Dictionary::new()));
        (dict, self.content.clone())
    }
}

/// A tiling pattern ready to be registered as a page resource.
#[derive(Debug, Clone, PartialEq)]
pub struct HatchPattern {
    /// Pattern dictionary without `/Length`
    pub dict: Dictionary,
    /// Cell content stream
    pub content: Vec<u8>,
    /// Identity of the pattern for deduplication
    pub fingerprint: Fingerprint,
}

impl HatchPattern {
    /// The pattern stream object.
    pub fn object(&self) -> Object {
        Object::Stream {
            dict: self.dict.clone(),
            data: bytes::Bytes::from(self.content.clone()),
        }
    }
}

/// Cell definition for a hatched fill, or `None` for a solid fill.
pub fn hatch_cell(pattern: FillPattern, color: Color) -> Option<HatchPattern> {
    let s = HATCH_CELL;
    let segments: Vec<[f64; 4]> = match pattern {
        FillPattern::Solid => return None,
        FillPattern::Horizontal => vec![[0.0, s / 2.0, s, s / 2.0]],
        FillPattern::Vertical => vec![[s / 2.0, 0.0, s / 2.0, s]],
        FillPattern::Cross => vec![[0.0, s / 2.0, s, s / 2.0], [s / 2.0, 0.0, s / 2.0, s]],
        FillPattern::ForwardDiagonal => vec![[0.0, 0.0, s, s]],
        FillPattern::BackwardDiagonal => vec![[0.0, s, s, 0.0]],
        FillPattern::DiagonalCross => vec![[0.0, 0.0, s, s], [0.0, s, s, 0.0]],
    };

    let mut ops = vec![
        ContentStreamOp::SetStrokeColor(color),
        ContentStreamOp::SetLineWidth(HATCH_LINE_WIDTH),
    ];
    for [x1, y1, x2, y2] in segments {
        ops.push(ContentStreamOp::MoveTo(x1, y1));
        ops.push(ContentStreamOp::LineTo(x2, y2));
    }
    ops.push(ContentStreamOp::Stroke);

    let (dict, content) = TilingPatternBuilder::new()
        .bbox(0.0, 0.0, s, s)
        .step(s, s)
        .content(ops)
        .build();

    let fingerprint = Fingerprint::of(&[b"pattern", &content]);
    Some(HatchPattern {
        dict,
        content,
        fingerprint,
    })
}
