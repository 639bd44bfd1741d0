//! PDF content stream operators.
//!
//! Every drawing and text call on a page ends up as a list of
//! [`ContentStreamOp`]s collected in a [`ContentStreamBuilder`]. The builder
//! writes one operator per line with single spaces between operands.

use super::graphics_state::Color;
use super::object_serializer::format_number;

/// Operations that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Concatenate matrix (cm)
    Transform(f64, f64, f64, f64, f64, f64),
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Select font resource and size (Tf)
    SetFont(String, f64),
    /// Set text matrix (Tm)
    SetTextMatrix(f64, f64, f64, f64, f64, f64),
    /// Move text position (Td)
    MoveText(f64, f64),
    /// Show encoded text (Tj)
    ShowText(Vec<u8>),
    /// Set word spacing (Tw)
    SetWordSpacing(f64),
    /// Set non-stroking color (g / rg / k)
    SetFillColor(Color),
    /// Set stroking color (G / RG / K)
    SetStrokeColor(Color),
    /// Select non-stroking color space (cs)
    SetFillColorSpace(String),
    /// Select a pattern as non-stroking color (scn)
    SetFillPattern(String),
    /// Set line width (w)
    SetLineWidth(f64),
    /// Set dash pattern (d)
    SetDashPattern(Vec<f64>, f64),
    /// Set line cap (J)
    SetLineCap(LineCap),
    /// Set line join (j)
    SetLineJoin(LineJoin),
    /// Begin subpath (m)
    MoveTo(f64, f64),
    /// Straight segment (l)
    LineTo(f64, f64),
    /// Cubic Bézier segment (c)
    CurveTo(f64, f64, f64, f64, f64, f64),
    /// Rectangle subpath (re)
    Rectangle(f64, f64, f64, f64),
    /// Close subpath (h)
    ClosePath,
    /// Stroke path (S)
    Stroke,
    /// Fill path, nonzero winding (f)
    Fill,
    /// Fill and stroke path (B)
    FillStroke,
    /// End path without painting (n)
    EndPath,
    /// Paint XObject (Do)
    PaintXObject(String),
    /// Bytes copied verbatim (existing page content)
    Raw(Vec<u8>),
}

/// Line cap style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    /// Butt cap
    #[default]
    Butt = 0,
    /// Round cap
    Round = 1,
    /// Projecting square cap
    Square = 2,
}

/// Line join style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    /// Miter join
    #[default]
    Miter = 0,
    /// Round join
    Round = 1,
    /// Bevel join
    Bevel = 2,
}

impl ContentStreamOp {
    /// True for operators that add a Bézier curve to the current path.
    pub fn is_curve(&self) -> bool {
        matches!(self, ContentStreamOp::CurveTo(..))
    }

    /// Append this operator's bytes, without the trailing newline.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            ContentStreamOp::SaveState => buf.push(b'q'),
            ContentStreamOp::RestoreState => buf.push(b'Q'),
            ContentStreamOp::Transform(a, b, c, d, e, f) => {
                write_operands(buf, &[*a, *b, *c, *d, *e, *f]);
                buf.extend_from_slice(b"cm");
            },
            ContentStreamOp::BeginText => buf.extend_from_slice(b"BT"),
            ContentStreamOp::EndText => buf.extend_from_slice(b"ET"),
            ContentStreamOp::SetFont(name, size) => {
                buf.extend_from_slice(format!("/{} {} Tf", name, format_number(*size)).as_bytes())
            },
            ContentStreamOp::SetTextMatrix(a, b, c, d, e, f) => {
                write_operands(buf, &[*a, *b, *c, *d, *e, *f]);
                buf.extend_from_slice(b"Tm");
            },
            ContentStreamOp::MoveText(tx, ty) => {
                write_operands(buf, &[*tx, *ty]);
                buf.extend_from_slice(b"Td");
            },
            ContentStreamOp::ShowText(text) => {
                buf.push(b'(');
                write_escaped_string(buf, text);
                buf.extend_from_slice(b") Tj");
            },
            ContentStreamOp::SetWordSpacing(spacing) => {
                write_operands(buf, &[*spacing]);
                buf.extend_from_slice(b"Tw");
            },
            ContentStreamOp::SetFillColor(color) => write_color(buf, color, false),
            ContentStreamOp::SetStrokeColor(color) => write_color(buf, color, true),
            ContentStreamOp::SetFillColorSpace(name) => {
                buf.extend_from_slice(format!("/{} cs", name).as_bytes())
            },
            ContentStreamOp::SetFillPattern(name) => {
                buf.extend_from_slice(format!("/{} scn", name).as_bytes())
            },
            ContentStreamOp::SetLineWidth(width) => {
                write_operands(buf, &[*width]);
                buf.push(b'w');
            },
            ContentStreamOp::SetDashPattern(array, phase) => {
                let parts: Vec<String> = array.iter().map(|v| format_number(*v)).collect();
                buf.extend_from_slice(
                    format!("[{}] {} d", parts.join(" "), format_number(*phase)).as_bytes(),
                );
            },
            ContentStreamOp::SetLineCap(cap) => {
                buf.extend_from_slice(format!("{} J", *cap as u8).as_bytes())
            },
            ContentStreamOp::SetLineJoin(join) => {
                buf.extend_from_slice(format!("{} j", *join as u8).as_bytes())
            },
            ContentStreamOp::MoveTo(x, y) => {
                write_operands(buf, &[*x, *y]);
                buf.push(b'm');
            },
            ContentStreamOp::LineTo(x, y) => {
                write_operands(buf, &[*x, *y]);
                buf.push(b'l');
            },
            ContentStreamOp::CurveTo(x1, y1, x2, y2, x3, y3) => {
                write_operands(buf, &[*x1, *y1, *x2, *y2, *x3, *y3]);
                buf.push(b'c');
            },
            ContentStreamOp::Rectangle(x, y, w, h) => {
                write_operands(buf, &[*x, *y, *w, *h]);
                buf.extend_from_slice(b"re");
            },
            ContentStreamOp::ClosePath => buf.push(b'h'),
            ContentStreamOp::Stroke => buf.push(b'S'),
            ContentStreamOp::Fill => buf.push(b'f'),
            ContentStreamOp::FillStroke => buf.push(b'B'),
            ContentStreamOp::EndPath => buf.push(b'n'),
            ContentStreamOp::PaintXObject(name) => {
                buf.extend_from_slice(format!("/{} Do", name).as_bytes())
            },
            ContentStreamOp::Raw(bytes) => {
                let body = bytes.strip_suffix(b"\n").unwrap_or(bytes.as_slice());
                buf.extend_from_slice(body);
            },
        }
    }
}

fn write_operands(buf: &mut Vec<u8>, values: &[f64]) {
    for v in values {
        buf.extend_from_slice(format_number(*v).as_bytes());
        buf.push(b' ');
    }
}

fn write_color(buf: &mut Vec<u8>, color: &Color, stroke: bool) {
    let (components, op): (Vec<f64>, &str) = match *color {
        Color::Gray(g) => (vec![g], if stroke { "G" } else { "g" }),
        Color::Rgb(r, g, b) => (vec![r, g, b], if stroke { "RG" } else { "rg" }),
        Color::Cmyk(c, m, y, k) => (vec![c, m, y, k], if stroke { "K" } else { "k" }),
    };
    write_operands(buf, &components);
    buf.extend_from_slice(op.as_bytes());
}

fn write_escaped_string(buf: &mut Vec<u8>, text: &[u8]) {
    for &byte in text {
        match byte {
            b'(' => buf.extend_from_slice(b"\\("),
            b')' => buf.extend_from_slice(b"\\)"),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            _ => buf.push(byte),
        }
    }
}

/// Ordered list of operators making up one content segment.
#[derive(Debug, Clone, Default)]
pub struct ContentStreamBuilder {
    operations: Vec<ContentStreamOp>,
}

impl ContentStreamBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one operator.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Append several operators in order.
    pub fn ops<I>(&mut self, ops: I) -> &mut Self
    where
        I: IntoIterator<Item = ContentStreamOp>,
    {
        self.operations.extend(ops);
        self
    }

    /// Operators collected so far.
    pub fn operations(&self) -> &[ContentStreamOp] {
        &self.operations
    }

    /// True when nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Drop every collected operator.
    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Write all operators, one per line.
    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_into(&mut buf);
        buf
    }

    /// Append all operators to an existing buffer, one per line.
    pub fn write_into(&self, buf: &mut Vec<u8>) {
        for op in &self.operations {
            op.write_to(buf);
            buf.push(b'\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(ops: Vec<ContentStreamOp>) -> String {
        let mut builder = ContentStreamBuilder::new();
        builder.ops(ops);
        String::from_utf8_lossy(&builder.build()).to_string()
    }

    #[test]
    fn test_path_operators() {
        let content = render(vec![
            ContentStreamOp::MoveTo(0.0, 0.0),
            ContentStreamOp::LineTo(100.5, 20.0),
            ContentStreamOp::CurveTo(1.0, 2.0, 3.0, 4.0, 5.0, 6.0),
            ContentStreamOp::ClosePath,
            ContentStreamOp::FillStroke,
        ]);
        assert_eq!(content, "0 0 m\n100.5 20 l\n1 2 3 4 5 6 c\nh\nB\n");
    }

    #[test]
    fn test_text_operators() {
        let content = render(vec![
            ContentStreamOp::BeginText,
            ContentStreamOp::SetFont("F1".to_string(), 10.0),
            ContentStreamOp::SetTextMatrix(1.0, 0.0, 0.0, 1.0, 72.0, 700.25),
            ContentStreamOp::ShowText(b"Hello (World)".to_vec()),
            ContentStreamOp::EndText,
        ]);
        assert!(content.contains("/F1 10 Tf\n"));
        assert!(content.contains("1 0 0 1 72 700.25 Tm\n"));
        assert!(content.contains("(Hello \\(World\\)) Tj\n"));
    }

    #[test]
    fn test_color_operators() {
        let content = render(vec![
            ContentStreamOp::SetFillColor(Color::Rgb(1.0, 0.0, 0.5)),
            ContentStreamOp::SetStrokeColor(Color::Gray(0.25)),
            ContentStreamOp::SetStrokeColor(Color::Cmyk(0.0, 0.0, 0.0, 1.0)),
        ]);
        assert_eq!(content, "1 0 0.5 rg\n0.25 G\n0 0 0 1 K\n");
    }

    #[test]
    fn test_line_style_operators() {
        let content = render(vec![
            ContentStreamOp::SetLineWidth(0.5),
            ContentStreamOp::SetDashPattern(vec![3.0, 1.5], 0.0),
            ContentStreamOp::SetDashPattern(vec![], 0.0),
            ContentStreamOp::SetLineCap(LineCap::Round),
            ContentStreamOp::SetLineJoin(LineJoin::Bevel),
        ]);
        assert_eq!(content, "0.5 w\n[3 1.5] 0 d\n[] 0 d\n1 J\n2 j\n");
    }

    #[test]
    fn test_pattern_and_xobject_operators() {
        let content = render(vec![
            ContentStreamOp::SetFillColorSpace("Pattern".to_string()),
            ContentStreamOp::SetFillPattern("P1".to_string()),
            ContentStreamOp::PaintXObject("Im1".to_string()),
        ]);
        assert_eq!(content, "/Pattern cs\n/P1 scn\n/Im1 Do\n");
    }

    #[test]
    fn test_raw_bytes_keep_single_newline() {
        let content = render(vec![
            ContentStreamOp::Raw(b"0 0 m 10 10 l S\n".to_vec()),
            ContentStreamOp::SaveState,
        ]);
        assert_eq!(content, "0 0 m 10 10 l S\nq\n");
    }
}
