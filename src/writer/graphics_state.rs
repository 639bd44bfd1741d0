//! Pen, brush and the emitted-state cache.
//!
//! A page keeps one [`StateCache`] per content segment. Before painting, the
//! compiler asks the cache for the operators that move the emitted graphics
//! state to the requested pen or brush; unchanged parameters produce nothing.
//!
//! ```
//! use pdf_pagesmith::writer::{Color, Pen, StateCache};
//!
//! let mut cache = StateCache::new();
//! let pen = Pen::new(Color::rgb(1.0, 0.0, 0.0), 2.0);
//! assert_eq!(cache.apply_pen(&pen).len(), 2); // RG and w
//! assert!(cache.apply_pen(&pen).is_empty());
//! ```

use super::content_stream::{ContentStreamOp, LineCap, LineJoin};

/// Device color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    /// DeviceGray, 0 = black
    Gray(f64),
    /// DeviceRGB
    Rgb(f64, f64, f64),
    /// DeviceCMYK
    Cmyk(f64, f64, f64, f64),
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Color {
    /// Black in DeviceGray.
    pub const BLACK: Color = Color::Gray(0.0);
    /// White in DeviceGray.
    pub const WHITE: Color = Color::Gray(1.0);

    /// RGB color with components in `0.0..=1.0`.
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color::Rgb(r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0))
    }

    /// RGB color from 8-bit components.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }

    /// Gray level in `0.0..=1.0`.
    pub fn gray(level: f64) -> Self {
        Color::Gray(level.clamp(0.0, 1.0))
    }

    /// Components in color-space order.
    pub fn components(&self) -> Vec<f64> {
        match *self {
            Color::Gray(g) => vec![g],
            Color::Rgb(r, g, b) => vec![r, g, b],
            Color::Cmyk(c, m, y, k) => vec![c, m, y, k],
        }
    }

    /// Stable byte encoding used in resource fingerprints.
    pub fn fingerprint_bytes(&self) -> Vec<u8> {
        let tag = match self {
            Color::Gray(_) => b'g',
            Color::Rgb(..) => b'r',
            Color::Cmyk(..) => b'k',
        };
        let mut out = vec![tag];
        for c in self.components() {
            out.extend_from_slice(&c.to_le_bytes());
        }
        out
    }
}

/// Named dash styles, scaled by line width.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DashStyle {
    /// Continuous line
    #[default]
    Solid,
    /// Long dashes
    Dash,
    /// Dots
    Dot,
    /// Alternating dash and dot
    DashDot,
    /// Explicit on/off lengths in points
    Custom(Vec<f64>),
}

impl DashStyle {
    /// Dash array for a line of the given width.
    pub fn dash_array(&self, width: f64) -> Vec<f64> {
        let w = if width > 0.0 { width } else { 1.0 };
        match self {
            DashStyle::Solid => Vec::new(),
            DashStyle::Dash => vec![3.0 * w, w],
            DashStyle::Dot => vec![w, w],
            DashStyle::DashDot => vec![3.0 * w, w, w, w],
            DashStyle::Custom(lengths) => lengths.clone(),
        }
    }
}

/// Stroke parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Pen {
    /// Stroke color
    pub color: Color,
    /// Line width in points
    pub width: f64,
    /// Dash style
    pub dash: DashStyle,
    /// Line cap
    pub cap: LineCap,
    /// Line join
    pub join: LineJoin,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            dash: DashStyle::Solid,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
        }
    }
}

impl Pen {
    /// Solid pen of the given color and width.
    pub fn new(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            ..Self::default()
        }
    }

    /// Set the dash style.
    pub fn with_dash(mut self, dash: DashStyle) -> Self {
        self.dash = dash;
        self
    }

    /// Set the line cap.
    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    /// Set the line join.
    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }
}

/// Hatch patterns for non-solid fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillPattern {
    /// Plain color fill
    #[default]
    Solid,
    /// Horizontal lines
    Horizontal,
    /// Vertical lines
    Vertical,
    /// Horizontal and vertical lines
    Cross,
    /// Lines rising left to right
    ForwardDiagonal,
    /// Lines falling left to right
    BackwardDiagonal,
    /// Both diagonals
    DiagonalCross,
}

/// Fill parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Brush {
    /// Fill color (pattern line color for hatched fills)
    pub color: Color,
    /// Fill pattern
    pub pattern: FillPattern,
}

impl Brush {
    /// Solid brush.
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            pattern: FillPattern::Solid,
        }
    }

    /// Hatched brush.
    pub fn hatched(color: Color, pattern: FillPattern) -> Self {
        Self { color, pattern }
    }
}

/// What the non-stroking color is currently set to.
#[derive(Debug, Clone, PartialEq)]
pub enum FillPaint {
    /// A device color
    Color(Color),
    /// A pattern resource, by resource name
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq)]
struct EmittedState {
    stroke_color: Color,
    line_width: f64,
    dash: (Vec<f64>, f64),
    cap: LineCap,
    join: LineJoin,
    fill: FillPaint,
    font: Option<(String, f64)>,
    word_spacing: f64,
}

impl Default for EmittedState {
    // Initial graphics state of a fresh content stream
    fn default() -> Self {
        Self {
            stroke_color: Color::BLACK,
            line_width: 1.0,
            dash: (Vec::new(), 0.0),
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            fill: FillPaint::Color(Color::BLACK),
            font: None,
            word_spacing: 0.0,
        }
    }
}

/// Tracks the last emitted graphics state of one content segment.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    current: EmittedState,
    saved: Vec<EmittedState>,
}

impl StateCache {
    /// Cache describing a fresh content stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Operators needed to switch to `pen`, without committing them.
    pub fn diff_pen(&self, pen: &Pen) -> Vec<ContentStreamOp> {
        let mut ops = Vec::new();
        let cur = &self.current;
        if cur.stroke_color != pen.color {
            ops.push(ContentStreamOp::SetStrokeColor(pen.color));
        }
        if cur.line_width != pen.width {
            ops.push(ContentStreamOp::SetLineWidth(pen.width));
        }
        let dash = (pen.dash.dash_array(pen.width), 0.0);
        if cur.dash != dash {
            ops.push(ContentStreamOp::SetDashPattern(dash.0, dash.1));
        }
        if cur.cap != pen.cap {
            ops.push(ContentStreamOp::SetLineCap(pen.cap));
        }
        if cur.join != pen.join {
            ops.push(ContentStreamOp::SetLineJoin(pen.join));
        }
        ops
    }

    /// Diff against `pen` and record it as emitted.
    pub fn apply_pen(&mut self, pen: &Pen) -> Vec<ContentStreamOp> {
        let ops = self.diff_pen(pen);
        self.current.stroke_color = pen.color;
        self.current.line_width = pen.width;
        self.current.dash = (pen.dash.dash_array(pen.width), 0.0);
        self.current.cap = pen.cap;
        self.current.join = pen.join;
        ops
    }

    /// Operators needed to switch the fill paint, without committing them.
    pub fn diff_fill(&self, fill: &FillPaint) -> Vec<ContentStreamOp> {
        if &self.current.fill == fill {
            return Vec::new();
        }
        match fill {
            FillPaint::Color(color) => vec![ContentStreamOp::SetFillColor(*color)],
            FillPaint::Pattern(name) => vec![
                ContentStreamOp::SetFillColorSpace("Pattern".to_string()),
                ContentStreamOp::SetFillPattern(name.clone()),
            ],
        }
    }

    /// Diff against `fill` and record it as emitted.
    pub fn apply_fill(&mut self, fill: FillPaint) -> Vec<ContentStreamOp> {
        let ops = self.diff_fill(&fill);
        self.current.fill = fill;
        ops
    }

    /// `Tf` if the font resource or size changed.
    pub fn apply_font(&mut self, name: &str, size: f64) -> Option<ContentStreamOp> {
        let wanted = (name.to_string(), size);
        if self.current.font.as_ref() == Some(&wanted) {
            return None;
        }
        self.current.font = Some(wanted);
        Some(ContentStreamOp::SetFont(name.to_string(), size))
    }

    /// `Tw` if word spacing changed.
    pub fn apply_word_spacing(&mut self, spacing: f64) -> Option<ContentStreamOp> {
        if self.current.word_spacing == spacing {
            return None;
        }
        self.current.word_spacing = spacing;
        Some(ContentStreamOp::SetWordSpacing(spacing))
    }

    /// `q`, remembering the state to return to.
    pub fn save(&mut self) -> ContentStreamOp {
        self.saved.push(self.current.clone());
        ContentStreamOp::SaveState
    }

    /// `Q`, returning to the state saved by the matching [`save`](Self::save).
    pub fn restore(&mut self) -> ContentStreamOp {
        if let Some(state) = self.saved.pop() {
            self.current = state;
        } else {
            log::warn!("Unbalanced restore on graphics state cache");
        }
        ContentStreamOp::RestoreState
    }

    /// Nesting depth of saved states.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pen_emits_nothing() {
        let cache = StateCache::new();
        assert!(cache.diff_pen(&Pen::default()).is_empty());
    }

    #[test]
    fn test_pen_diff_is_minimal() {
        let mut cache = StateCache::new();
        let thick = Pen::new(Color::BLACK, 3.0);
        assert_eq!(cache.apply_pen(&thick), vec![ContentStreamOp::SetLineWidth(3.0)]);

        let red = Pen::new(Color::rgb(1.0, 0.0, 0.0), 3.0);
        assert_eq!(
            cache.diff_pen(&red),
            vec![ContentStreamOp::SetStrokeColor(Color::Rgb(1.0, 0.0, 0.0))]
        );
    }

    #[test]
    fn test_diff_does_not_commit() {
        let cache = StateCache::new();
        let pen = Pen::new(Color::BLACK, 2.0);
        assert_eq!(cache.diff_pen(&pen).len(), 1);
        assert_eq!(cache.diff_pen(&pen).len(), 1);
    }

    #[test]
    fn test_dash_scales_with_width() {
        let mut cache = StateCache::new();
        let pen = Pen::new(Color::BLACK, 2.0).with_dash(DashStyle::Dash);
        let ops = cache.apply_pen(&pen);
        assert!(ops.contains(&ContentStreamOp::SetDashPattern(vec![6.0, 2.0], 0.0)));
    }

    #[test]
    fn test_fill_pattern_switch() {
        let mut cache = StateCache::new();
        assert!(cache.apply_fill(FillPaint::Color(Color::BLACK)).is_empty());

        let ops = cache.apply_fill(FillPaint::Pattern("P1".to_string()));
        assert_eq!(
            ops,
            vec![
                ContentStreamOp::SetFillColorSpace("Pattern".to_string()),
                ContentStreamOp::SetFillPattern("P1".to_string()),
            ]
        );
        assert!(cache.apply_fill(FillPaint::Pattern("P1".to_string())).is_empty());
    }

    #[test]
    fn test_save_restore_rolls_back_state() {
        let mut cache = StateCache::new();
        assert_eq!(cache.save(), ContentStreamOp::SaveState);
        cache.apply_pen(&Pen::new(Color::WHITE, 4.0));
        assert_eq!(cache.restore(), ContentStreamOp::RestoreState);
        assert_eq!(cache.depth(), 0);
        assert!(cache.diff_pen(&Pen::default()).is_empty());
    }

    #[test]
    fn test_font_and_word_spacing_cache() {
        let mut cache = StateCache::new();
        assert!(cache.apply_font("F1", 10.0).is_some());
        assert!(cache.apply_font("F1", 10.0).is_none());
        assert!(cache.apply_font("F1", 12.0).is_some());
        assert!(cache.apply_word_spacing(0.0).is_none());
        assert_eq!(
            cache.apply_word_spacing(1.5),
            Some(ContentStreamOp::SetWordSpacing(1.5))
        );
    }
}
