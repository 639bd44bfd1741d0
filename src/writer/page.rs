//! Page content compiler.
//!
//! A [`Page`] owns its geometry, the content segments drawing calls write
//! into, the resources those segments use, and the page's annotations and
//! actions. The document driver runs it through the two-phase protocol:
//!
//! ```text
//! Unset --assign_numbers--> Numbered --serialize--> Written --reset--> Unset
//! ```
//!
//! Caller coordinates are top-left based, y down, in the page's current
//! [`Unit`], and relative to the writable area: the crop box shrunk by the
//! margins and the header/footer bands. Geometry outside the writable area
//! is clamped, or skipped by the entry points that must not distort it.

use super::annotation_builder::{
    lock_annotation, Action, Annotation, NumberedAction, PageActionTrigger, SharedAnnotation,
};
use super::content_stream::{ContentStreamBuilder, ContentStreamOp};
use super::font_manager::Font;
use super::graphics_state::{Brush, Color, FillPaint, Pen, StateCache};
use super::image_handler::ImageData;
use super::page_tree::{NodeId, PageTree};
use super::path_encoder::{PaintMode, PathEncoder};
use super::pattern::hatch_cell;
use super::resources::{lock_registry, ResourceKind, ResourceRegistry, SharedRegistry};
use super::serialization::{translate_object, write_indirect, DocumentId, ReferenceTranslator, SerializationContext};
use super::text_layout::{self, Alignment, TextStyle};
use super::units::{clamp_point, clamp_rect, ClampResult, Unit};
use crate::config::PageConfig;
use crate::error::{Error, Result};
use crate::geometry::{Insets, Point, Rect};
use crate::object::{Dictionary, Object, ObjectRef};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// A page behind a mutex, for callers that build pages on several threads.
pub type SharedPage = Arc<Mutex<Page>>;

/// Page rotation, clockwise as displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// Upright
    #[default]
    None,
    /// 90° clockwise
    Clockwise90,
    /// Upside down
    Clockwise180,
    /// 270° clockwise
    Clockwise270,
}

impl Rotation {
    /// Rotation from degrees; any multiple of 90 is accepted.
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Clockwise90),
            180 => Ok(Rotation::Clockwise180),
            270 => Ok(Rotation::Clockwise270),
            _ => Err(Error::InvalidArgument(format!(
                "rotation must be a multiple of 90 degrees, got {}",
                degrees
            ))),
        }
    }

    /// Value written as `/Rotate`.
    pub fn degrees(self) -> i64 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }

    /// Whether displayed width and height are swapped.
    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::Clockwise270)
    }
}

/// Segment a watermark is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Below the page body
    Underlay,
    /// Above the page body
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SerializationState {
    Unset,
    Numbered,
    Written,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentId {
    Underlay,
    Body,
    Overlay,
}

/// Operators of one content segment plus the state they leave behind.
#[derive(Debug, Default)]
struct Segment {
    builder: ContentStreamBuilder,
    cache: StateCache,
}

impl Segment {
    fn write_wrapped(&self, out: &mut Vec<u8>) {
        if self.builder.is_empty() {
            return;
        }
        out.extend_from_slice(b"q\n");
        self.builder.write_into(out);
        out.extend_from_slice(b"Q\n");
    }
}

/// State taken over from a parsed source page.
#[derive(Debug, Clone)]
struct Inherited {
    source: DocumentId,
    resources: Dictionary,
    additional_actions: Option<Dictionary>,
}

/// One page being compiled.
#[derive(Debug)]
pub struct Page {
    width: f64,
    height: f64,
    margins: Insets,
    header_height: f64,
    footer_height: f64,
    crop: Insets,
    rotation: Rotation,
    unit: Unit,
    justify_last_line: bool,

    font: Font,
    pen: Pen,
    brush: Brush,
    text_color: Color,
    cursor: Point,

    underlay: Segment,
    raw_content: Vec<u8>,
    body: Segment,
    overlay: Segment,

    registry: SharedRegistry,
    used_resources: IndexSet<String>,
    annotations: Vec<SharedAnnotation>,
    page_actions: IndexMap<PageActionTrigger, NumberedAction>,
    inherited: Option<Inherited>,

    state: SerializationState,
    content_number: Option<u32>,
    page_number: Option<u32>,
}

impl Page {
    /// Fresh page in writing mode.
    pub fn new(config: &PageConfig) -> Result<Self> {
        let unit = config.unit;
        let width = unit.to_internal(config.width);
        let height = unit.to_internal(config.height);
        if !(width > 0.0 && height > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "page size must be positive, got {}x{}",
                config.width, config.height
            )));
        }
        let font = Font::new(config.font_family, config.font_size);
        let mut page = Self::blank(width, height, font);
        page.unit = unit;
        page.rotation = Rotation::from_degrees(config.rotation as i64)?;
        page.margins = config.margins.scaled(unit.points_per_unit());
        page.crop = config.crop.scaled(unit.points_per_unit());
        page.header_height = unit.to_internal(config.header_height);
        page.footer_height = unit.to_internal(config.footer_height);
        page.justify_last_line = config.justify_last_line;
        page.check_geometry()?;
        Ok(page)
    }

    fn blank(width: f64, height: f64, font: Font) -> Self {
        Self {
            width,
            height,
            margins: Insets::default(),
            header_height: 0.0,
            footer_height: 0.0,
            crop: Insets::default(),
            rotation: Rotation::None,
            unit: Unit::Point,
            justify_last_line: false,
            font,
            pen: Pen::default(),
            brush: Brush::default(),
            text_color: Color::BLACK,
            cursor: Point::default(),
            underlay: Segment::default(),
            raw_content: Vec::new(),
            body: Segment::default(),
            overlay: Segment::default(),
            registry: ResourceRegistry::shared(),
            used_resources: IndexSet::new(),
            annotations: Vec::new(),
            page_actions: IndexMap::new(),
            inherited: None,
            state: SerializationState::Unset,
            content_number: None,
            page_number: None,
        }
    }

    /// Page in reading mode: geometry, resources, content and annotations
    /// are taken from `node` of a parsed page tree.
    ///
    /// `objects` resolves the annotation references of the source page.
    pub fn from_tree(tree: &PageTree, node: NodeId, objects: &HashMap<ObjectRef, Object>) -> Result<Self> {
        let source = tree
            .source()
            .ok_or_else(|| Error::InvalidArgument("page tree was not read from a document".to_string()))?;
        let page_node = tree
            .node(node)
            .ok_or_else(|| Error::InvalidArgument(format!("no page tree node {}", node.index())))?;

        let media = match tree.inherited(node, "MediaBox").and_then(|m| m.as_rect()) {
            Some(media) => media,
            None => {
                log::warn!("page {:?} has no usable /MediaBox, assuming Letter", page_node.source_ref);
                [0.0, 0.0, 612.0, 792.0]
            },
        };
        let [mx0, my0, mx1, my1] = media;
        let mut page = Self::blank((mx1 - mx0).abs(), (my1 - my0).abs(), Font::default());

        page.rotation = match tree.inherited(node, "Rotate").and_then(|r| r.as_integer()) {
            Some(degrees) => Rotation::from_degrees(degrees).unwrap_or_else(|_| {
                log::warn!("ignoring /Rotate {} on {:?}", degrees, page_node.source_ref);
                Rotation::None
            }),
            None => Rotation::None,
        };

        if let Some([cx0, cy0, cx1, cy1]) = tree.inherited(node, "CropBox").and_then(|c| c.as_rect()) {
            let unrotated = [
                (cx0.min(cx1) - mx0.min(mx1)).max(0.0),
                (cy0.min(cy1) - my0.min(my1)).max(0.0),
                (mx0.max(mx1) - cx0.max(cx1)).max(0.0),
                (my0.max(my1) - cy0.max(cy1)).max(0.0),
            ];
            page.crop = visual_insets(page.rotation, unrotated);
        }

        let resources = tree
            .inherited(node, "Resources")
            .and_then(|r| r.as_dict())
            .cloned()
            .unwrap_or_default();
        {
            let mut registry = lock_registry(&page.registry);
            for sub in resources.values().filter_map(|v| v.as_dict()) {
                registry.reserve_names(sub.keys().cloned());
            }
        }

        if let Some(annots) = page_node.attributes.get("Annots").and_then(|a| a.as_array()) {
            for item in annots {
                let resolved = match item {
                    Object::Reference(r) => objects.get(r),
                    other => Some(other),
                };
                let Some(mut dict) = resolved.and_then(|o| o.as_dict()).cloned() else {
                    log::warn!("skipping unresolvable annotation {:?}", item);
                    continue;
                };
                // Points at the source page, which is not written
                dict.remove("P");
                match Annotation::raw(dict, source) {
                    Ok(annotation) => page.annotations.push(annotation.into_shared()),
                    Err(e) => log::warn!("skipping annotation: {}", e),
                }
            }
        }

        page.raw_content = page_node.contents.clone();
        page.inherited = Some(Inherited {
            source,
            resources,
            additional_actions: page_node.attributes.get("AA").and_then(|a| a.as_dict()).cloned(),
        });
        Ok(page)
    }

    /// Use a registry shared with other pages.
    ///
    /// Only valid before anything has been drawn.
    pub fn with_registry(mut self, registry: SharedRegistry) -> Result<Self> {
        if !self.used_resources.is_empty() {
            return Err(Error::InvalidState(
                "cannot switch registries after resources were used".to_string(),
            ));
        }
        if let Some(inherited) = &self.inherited {
            let mut shared = lock_registry(&registry);
            for sub in inherited.resources.values().filter_map(|v| v.as_dict()) {
                shared.reserve_names(sub.keys().cloned());
            }
        }
        self.registry = registry;
        Ok(self)
    }

    /// Registry this page draws its resources from.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Wrap for sharing between threads.
    pub fn into_shared(self) -> SharedPage {
        Arc::new(Mutex::new(self))
    }

    // ---- geometry ------------------------------------------------------

    fn check_geometry(&self) -> Result<()> {
        let (w, h) = self.writable_size_points();
        if w < 0.0 || h < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "margins, bands and crop leave no writable area ({:.2}x{:.2}pt)",
                w, h
            )));
        }
        Ok(())
    }

    fn ensure_unset(&self, what: &str) -> Result<()> {
        if self.state != SerializationState::Unset {
            return Err(Error::InvalidState(format!(
                "cannot {} while the page is {:?}",
                what, self.state
            )));
        }
        Ok(())
    }

    /// Page size in points as displayed (swapped for 90°/270°).
    fn effective_size(&self) -> (f64, f64) {
        if self.rotation.is_sideways() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    fn writable_origin(&self) -> Point {
        Point::new(
            self.crop.left + self.margins.left,
            self.crop.top + self.margins.top + self.header_height,
        )
    }

    fn writable_size_points(&self) -> (f64, f64) {
        let (w, h) = self.effective_size();
        (
            w - self.crop.horizontal() - self.margins.horizontal(),
            h - self.crop.vertical() - self.margins.vertical() - self.header_height - self.footer_height,
        )
    }

    fn writable_area(&self) -> Rect {
        let (w, h) = self.writable_size_points();
        Rect::new(0.0, 0.0, w.max(0.0), h.max(0.0))
    }

    /// Writable area in points, in caller space (origin at its own top-left).
    pub fn writable_rect(&self) -> Rect {
        self.writable_area()
    }

    /// Writable width in the current unit.
    pub fn writable_width(&self) -> f64 {
        self.unit.to_external(self.writable_area().width)
    }

    /// Writable height in the current unit.
    pub fn writable_height(&self) -> f64 {
        self.unit.to_external(self.writable_area().height)
    }

    /// Unrotated page width in points.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Unrotated page height in points.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Current rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Current unit.
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Change the unit used by every later call.
    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    /// Switch units until the returned guard is dropped.
    ///
    /// ```
    /// use pdf_pagesmith::config::PageConfig;
    /// use pdf_pagesmith::writer::{Page, Unit};
    ///
    /// let mut page = Page::new(&PageConfig::letter()).unwrap();
    /// {
    ///     let scoped = page.in_unit(Unit::Inch);
    ///     assert_eq!(scoped.writable_width(), 8.5);
    /// }
    /// assert_eq!(page.unit(), Unit::Point);
    /// ```
    pub fn in_unit(&mut self, unit: Unit) -> UnitScope<'_> {
        let previous = self.unit;
        self.unit = unit;
        UnitScope { page: self, previous }
    }

    /// Set the margins, in the current unit.
    pub fn set_margins(&mut self, margins: Insets) -> Result<()> {
        self.ensure_unset("change margins")?;
        let old = self.margins;
        self.margins = margins.scaled(self.unit.points_per_unit());
        self.check_geometry().inspect_err(|_| self.margins = old)
    }

    /// Set the header and footer band heights, in the current unit.
    pub fn set_bands(&mut self, header_height: f64, footer_height: f64) -> Result<()> {
        self.ensure_unset("change header/footer bands")?;
        let old = (self.header_height, self.footer_height);
        self.header_height = self.unit.to_internal(header_height);
        self.footer_height = self.unit.to_internal(footer_height);
        self.check_geometry().inspect_err(|_| {
            (self.header_height, self.footer_height) = old;
        })
    }

    /// Set the crop insets, in the current unit.
    pub fn set_crop(&mut self, crop: Insets) -> Result<()> {
        self.ensure_unset("change the crop box")?;
        let old = self.crop;
        self.crop = crop.scaled(self.unit.points_per_unit());
        self.check_geometry().inspect_err(|_| self.crop = old)
    }

    /// Set the rotation.
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<()> {
        self.ensure_unset("rotate")?;
        let old = self.rotation;
        self.rotation = rotation;
        self.check_geometry().inspect_err(|_| self.rotation = old)
    }

    /// Stretch the last line of justified paragraphs.
    pub fn set_justify_last_line(&mut self, justify: bool) {
        self.justify_last_line = justify;
    }

    // ---- drawing state -------------------------------------------------

    /// Set the pen; its width is in the current unit.
    pub fn set_pen(&mut self, pen: Pen) {
        let width = self.unit.to_internal(pen.width);
        self.pen = Pen { width, ..pen };
    }

    /// Current pen (width in points).
    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    /// Set the brush.
    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    /// Set the font; sizes are always in points.
    pub fn set_font(&mut self, font: Font) {
        self.font = font;
    }

    /// Current font.
    pub fn font(&self) -> Font {
        self.font
    }

    /// Set the text color.
    pub fn set_text_color(&mut self, color: Color) {
        self.text_color = color;
    }

    /// Cursor position in the current unit.
    pub fn cursor(&self) -> Point {
        Point::new(self.unit.to_external(self.cursor.x), self.unit.to_external(self.cursor.y))
    }

    /// Move the cursor, in the current unit.
    pub fn move_to(&mut self, x: f64, y: f64) {
        let p = self.unit.point_to_internal(Point::new(x, y));
        self.cursor = clamp_point(&self.writable_area(), p);
    }

    // ---- coordinate mapping ----------------------------------------------

    fn to_pdf_point(&self, p: Point) -> Point {
        let origin = self.writable_origin();
        let (_, eff_h) = self.effective_size();
        Point::new(origin.x + p.x, eff_h - (origin.y + p.y))
    }

    fn to_pdf_rect(&self, r: Rect) -> Rect {
        let origin = self.writable_origin();
        let (_, eff_h) = self.effective_size();
        Rect::new(origin.x + r.x, eff_h - (origin.y + r.y) - r.height, r.width, r.height)
    }

    /// Page-absolute caller rect (top-left origin) to PDF space.
    fn absolute_to_pdf(&self, r: Rect) -> Rect {
        let (_, eff_h) = self.effective_size();
        Rect::new(r.x, eff_h - r.y - r.height, r.width, r.height)
    }

    fn rect_in_unit(&self, x: f64, y: f64, w: f64, h: f64) -> Rect {
        self.unit.rect_to_internal(Rect::new(x, y, w, h))
    }

    fn clamped(&self, r: Rect, what: &str) -> Option<Rect> {
        match clamp_rect(&self.writable_area(), r) {
            ClampResult::Fits(r) => Some(r),
            ClampResult::Shrunk(r) => {
                log::debug!("{} clamped to writable area", what);
                Some(r)
            },
            ClampResult::OutOfArea => {
                log::warn!("{} lies outside the writable area, skipped", what);
                None
            },
        }
    }

    fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        match id {
            SegmentId::Underlay => &mut self.underlay,
            SegmentId::Body => &mut self.body,
            SegmentId::Overlay => &mut self.overlay,
        }
    }

    fn use_resource(&mut self, name: String) -> String {
        self.used_resources.insert(name.clone());
        name
    }

    // ---- vector graphics -------------------------------------------------

    fn emit_path(&mut self, segment: SegmentId, path: PathEncoder, mode: PaintMode) -> Result<()> {
        self.ensure_unset("draw")?;
        if path.is_empty() {
            return Ok(());
        }
        let fill = if mode.fills() {
            match hatch_cell(self.brush.pattern, self.brush.color) {
                None => Some(FillPaint::Color(self.brush.color)),
                Some(cell) => {
                    let name = lock_registry(&self.registry).register_pattern(&cell);
                    Some(FillPaint::Pattern(self.use_resource(name)))
                },
            }
        } else {
            None
        };
        let pen = self.pen.clone();

        let seg = self.segment_mut(segment);
        let mut ops = Vec::new();
        if mode.strokes() {
            ops.extend(seg.cache.apply_pen(&pen));
        }
        if let Some(fill) = fill {
            ops.extend(seg.cache.apply_fill(fill));
        }
        let mut path = path;
        path.paint(mode);
        ops.extend(path.finish());
        seg.builder.ops(ops);
        Ok(())
    }

    fn draw_shape<F>(&mut self, r: Rect, mode: PaintMode, clamp: bool, what: &str, build: F) -> Result<()>
    where
        F: FnOnce(&mut PathEncoder, Rect),
    {
        self.ensure_unset("draw")?;
        let r = if clamp {
            match self.clamped(r, what) {
                Some(r) => r,
                None => return Ok(()),
            }
        } else {
            r.normalized()
        };
        let mut path = PathEncoder::new();
        build(&mut path, self.to_pdf_rect(r));
        self.emit_path(SegmentId::Body, path, mode)
    }

    /// Straight line between two points, clamped to the writable area.
    pub fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        let area = self.writable_area();
        let a = clamp_point(&area, self.unit.point_to_internal(Point::new(x1, y1)));
        let b = clamp_point(&area, self.unit.point_to_internal(Point::new(x2, y2)));
        self.line_between(a, b)
    }

    /// Straight line without clamping.
    pub fn draw_line_unclamped(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        let a = self.unit.point_to_internal(Point::new(x1, y1));
        let b = self.unit.point_to_internal(Point::new(x2, y2));
        self.line_between(a, b)
    }

    fn line_between(&mut self, a: Point, b: Point) -> Result<()> {
        self.ensure_unset("draw")?;
        let mut path = PathEncoder::new();
        path.line(self.to_pdf_point(a), self.to_pdf_point(b));
        self.emit_path(SegmentId::Body, path, PaintMode::Stroke)
    }

    /// Rectangle, shrunk to the writable area.
    ///
    /// ```
    /// use pdf_pagesmith::config::PageConfig;
    /// use pdf_pagesmith::writer::{Page, PaintMode};
    ///
    /// let mut page = Page::new(&PageConfig::letter()).unwrap();
    /// page.draw_rect(0.0, 0.0, 100.0, 50.0, PaintMode::FillStroke).unwrap();
    /// let content = String::from_utf8(page.content_bytes()).unwrap();
    /// assert!(content.contains("0 742 100 50 re\nB\n"));
    /// ```
    pub fn draw_rect(&mut self, x: f64, y: f64, w: f64, h: f64, mode: PaintMode) -> Result<()> {
        let r = self.rect_in_unit(x, y, w, h);
        self.draw_shape(r, mode, true, "rectangle", |p, r| {
            p.rect(r);
        })
    }

    /// Rectangle without clamping.
    pub fn draw_rect_unclamped(&mut self, x: f64, y: f64, w: f64, h: f64, mode: PaintMode) -> Result<()> {
        let r = self.rect_in_unit(x, y, w, h);
        self.draw_shape(r, mode, false, "rectangle", |p, r| {
            p.rect(r);
        })
    }

    /// Rectangle with rounded corners.
    pub fn draw_round_rect(&mut self, x: f64, y: f64, w: f64, h: f64, radius: f64, mode: PaintMode) -> Result<()> {
        let r = self.rect_in_unit(x, y, w, h);
        let radius = self.unit.to_internal(radius);
        self.draw_shape(r, mode, true, "rounded rectangle", |p, r| {
            p.rounded_rect(r, radius);
        })
    }

    /// Ellipse inscribed in the given box.
    pub fn draw_ellipse(&mut self, x: f64, y: f64, w: f64, h: f64, mode: PaintMode) -> Result<()> {
        let r = self.rect_in_unit(x, y, w, h);
        self.draw_shape(r, mode, true, "ellipse", |p, r| {
            p.ellipse(r);
        })
    }

    /// Ellipse without clamping.
    pub fn draw_ellipse_unclamped(&mut self, x: f64, y: f64, w: f64, h: f64, mode: PaintMode) -> Result<()> {
        let r = self.rect_in_unit(x, y, w, h);
        self.draw_shape(r, mode, false, "ellipse", |p, r| {
            p.ellipse(r);
        })
    }

    /// Circle around a center point.
    pub fn draw_circle(&mut self, cx: f64, cy: f64, radius: f64, mode: PaintMode) -> Result<()> {
        self.draw_ellipse(cx - radius, cy - radius, radius * 2.0, radius * 2.0, mode)
    }

    /// Open polyline through `points`, each clamped.
    pub fn draw_polyline(&mut self, points: &[Point]) -> Result<()> {
        self.poly(points, false, PaintMode::Stroke)
    }

    /// Closed polygon through `points`, each clamped.
    pub fn draw_polygon(&mut self, points: &[Point], mode: PaintMode) -> Result<()> {
        self.poly(points, true, mode)
    }

    fn poly(&mut self, points: &[Point], close: bool, mode: PaintMode) -> Result<()> {
        self.ensure_unset("draw")?;
        let area = self.writable_area();
        let pdf: Vec<Point> = points
            .iter()
            .map(|&p| self.to_pdf_point(clamp_point(&area, self.unit.point_to_internal(p))))
            .collect();
        let mut path = PathEncoder::new();
        path.polyline(&pdf, close)?;
        self.emit_path(SegmentId::Body, path, mode)
    }

    /// Cubic Bézier from `p0` to `p3`, each point clamped.
    pub fn draw_bezier(&mut self, p0: Point, c1: Point, c2: Point, p3: Point) -> Result<()> {
        self.ensure_unset("draw")?;
        let area = self.writable_area();
        let map = |p: Point| self.to_pdf_point(clamp_point(&area, self.unit.point_to_internal(p)));
        let (p0, c1, c2, p3) = (map(p0), map(c1), map(c2), map(p3));
        let mut path = PathEncoder::new();
        path.bezier(p0, c1, c2, p3);
        self.emit_path(SegmentId::Body, path, PaintMode::Stroke)
    }

    /// Arc on the ellipse inscribed in the box.
    ///
    /// Angles are degrees clockwise from the +x axis as seen on the page;
    /// negative sweeps run counter-clockwise.
    pub fn draw_arc(&mut self, x: f64, y: f64, w: f64, h: f64, start: f64, sweep: f64) -> Result<()> {
        let r = self.rect_in_unit(x, y, w, h);
        self.draw_shape(r, PaintMode::Stroke, true, "arc", |p, r| {
            p.arc(r, -start, -sweep);
        })
    }

    /// Pie slice: arc closed back to the ellipse center.
    pub fn draw_pie(&mut self, x: f64, y: f64, w: f64, h: f64, start: f64, sweep: f64, mode: PaintMode) -> Result<()> {
        let r = self.rect_in_unit(x, y, w, h);
        self.draw_shape(r, mode, true, "pie", |p, r| {
            p.pie(r, -start, -sweep);
        })
    }

    // ---- images ----------------------------------------------------------

    fn place_image(&mut self, segment: SegmentId, image: &ImageData, pdf_rect: Rect) {
        let name = lock_registry(&self.registry).register_image(image);
        let name = self.use_resource(name);
        let seg = self.segment_mut(segment);
        let ops = vec![
            seg.cache.save(),
            ContentStreamOp::Transform(pdf_rect.width, 0.0, 0.0, pdf_rect.height, pdf_rect.x, pdf_rect.y),
            ContentStreamOp::PaintXObject(name),
            seg.cache.restore(),
        ];
        seg.builder.ops(ops);
    }

    /// Image scaled into the box, shrunk to the writable area.
    pub fn draw_image(&mut self, image: &ImageData, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.ensure_unset("draw")?;
        let r = self.rect_in_unit(x, y, w, h);
        if let Some(r) = self.clamped(r, "image") {
            if !r.is_empty() {
                let pdf = self.to_pdf_rect(r);
                self.place_image(SegmentId::Body, image, pdf);
            }
        }
        Ok(())
    }

    /// Image at its box only if the box fits entirely; otherwise nothing.
    pub fn draw_image_at(&mut self, image: &ImageData, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.ensure_unset("draw")?;
        let r = self.rect_in_unit(x, y, w, h);
        match clamp_rect(&self.writable_area(), r) {
            ClampResult::Fits(r) if !r.is_empty() => {
                let pdf = self.to_pdf_rect(r);
                self.place_image(SegmentId::Body, image, pdf);
            },
            _ => log::warn!("image box does not fit the writable area, skipped"),
        }
        Ok(())
    }

    /// Image without clamping.
    pub fn draw_image_unclamped(&mut self, image: &ImageData, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.ensure_unset("draw")?;
        let r = self.rect_in_unit(x, y, w, h).normalized();
        if !r.is_empty() {
            let pdf = self.to_pdf_rect(r);
            self.place_image(SegmentId::Body, image, pdf);
        }
        Ok(())
    }

    // ---- text --------------------------------------------------------------

    fn text_style(&self, alignment: Alignment) -> TextStyle {
        TextStyle {
            font: self.font,
            color: self.text_color,
            alignment,
            justify_last_line: self.justify_last_line,
            angle: 0.0,
        }
    }

    fn emit_text(
        &mut self,
        segment: SegmentId,
        lines: &[text_layout::Line],
        style: &TextStyle,
        pdf_frame: Rect,
        first_line_offset: f64,
    ) {
        if lines.is_empty() {
            return;
        }
        let name = lock_registry(&self.registry).register_font(&style.font);
        let name = self.use_resource(name);
        let seg = self.segment_mut(segment);
        let ops = text_layout::render(lines, &name, style, pdf_frame, first_line_offset, &mut seg.cache);
        seg.builder.ops(ops);
    }

    fn require_text(text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(Error::InvalidArgument("text must not be empty".to_string()));
        }
        Ok(())
    }

    /// Flowing left-aligned text at the cursor.
    ///
    /// Text wraps at the right edge of the writable area and continues on
    /// following lines; the cursor ends after the last glyph. Text that runs
    /// past the bottom is dropped.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        self.ensure_unset("write text")?;
        Self::require_text(text)?;
        let area = self.writable_area();
        let line_height = self.font.line_height();
        if self.cursor.x > 0.0 && self.cursor.x >= area.width {
            self.cursor = Point::new(0.0, self.cursor.y + line_height);
        }
        let frame = Rect::new(0.0, self.cursor.y, area.width, (area.height - self.cursor.y).max(0.0));
        let result = text_layout::wrap(text, frame.width, frame.height, &self.font, self.cursor.x)?;
        if let Some(rest) = &result.remainder {
            log::warn!("{} characters did not fit below the cursor", rest.chars().count());
        }

        let style = self.text_style(Alignment::Left);
        let pdf = self.to_pdf_rect(frame);
        let offset = self.cursor.x;
        self.emit_text(SegmentId::Body, &result.lines, &style, pdf, offset);

        if let Some(last) = result.lines.last() {
            let n = result.lines.len();
            let mut x = if n == 1 { self.cursor.x + last.width } else { last.width };
            let mut y = self.cursor.y + (n - 1) as f64 * line_height;
            if last.paragraph_end && text.ends_with('\n') {
                x = 0.0;
                y += line_height;
            }
            if x >= area.width {
                x = 0.0;
                y += line_height;
            }
            self.cursor = Point::new(x, y);
        }
        Ok(())
    }

    /// [`write_text`](Self::write_text) followed by a line break.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        self.write_text(text)?;
        self.new_line();
        Ok(())
    }

    /// Move the cursor to the start of the next line.
    pub fn new_line(&mut self) {
        self.cursor = Point::new(0.0, self.cursor.y + self.font.line_height());
    }

    /// Paragraph across the full writable width starting at the cursor line.
    ///
    /// The cursor advances one line height per line.
    pub fn write_paragraph(&mut self, text: &str, alignment: Alignment) -> Result<()> {
        self.ensure_unset("write text")?;
        Self::require_text(text)?;
        let area = self.writable_area();
        let top = if self.cursor.x > 0.0 {
            self.cursor.y + self.font.line_height()
        } else {
            self.cursor.y
        };
        let frame = Rect::new(0.0, top, area.width, (area.height - top).max(0.0));
        let result = text_layout::wrap(text, frame.width, frame.height, &self.font, 0.0)?;
        if result.remainder.is_some() {
            log::warn!("paragraph runs past the bottom of the writable area");
        }
        let style = self.text_style(alignment);
        let pdf = self.to_pdf_rect(frame);
        self.emit_text(SegmentId::Body, &result.lines, &style, pdf, 0.0);
        self.cursor = Point::new(0.0, top + result.height(&self.font));
        Ok(())
    }

    /// Single unwrapped line with its top-left corner at a point.
    pub fn write_text_at(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        self.ensure_unset("write text")?;
        Self::require_text(text)?;
        let p = clamp_point(&self.writable_area(), self.unit.point_to_internal(Point::new(x, y)));
        let result = text_layout::wrap_unbounded(text, &self.font)?;
        let height = result.height(&self.font);
        let width = result.width();
        let frame = Rect::new(p.x, p.y, width, height);
        let style = self.text_style(Alignment::Left);
        let pdf = self.to_pdf_rect(frame);
        self.emit_text(SegmentId::Body, &result.lines, &style, pdf, 0.0);
        Ok(())
    }

    /// Text wrapped inside a box; whatever does not fit is dropped.
    ///
    /// `angle` rotates the block counter-clockwise about the box center.
    pub fn write_text_in_rect(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        alignment: Alignment,
        angle: f64,
    ) -> Result<()> {
        self.ensure_unset("write text")?;
        Self::require_text(text)?;
        let r = self.rect_in_unit(x, y, w, h);
        let Some(r) = self.clamped(r, "text box") else {
            return Ok(());
        };
        let result = text_layout::wrap(text, r.width, r.height, &self.font, 0.0)?;
        if result.remainder.is_some() {
            log::debug!("text box overflow dropped");
        }
        let style = self.text_style(alignment).with_angle(angle);
        let pdf = self.to_pdf_rect(r);
        self.emit_text(SegmentId::Body, &result.lines, &style, pdf, 0.0);
        Ok(())
    }

    /// Text wrapped inside a box, returning what did not fit.
    pub fn write_text_fitting(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        alignment: Alignment,
    ) -> Result<Option<String>> {
        self.ensure_unset("write text")?;
        Self::require_text(text)?;
        let r = self.rect_in_unit(x, y, w, h);
        let Some(r) = self.clamped(r, "text box") else {
            return Ok(Some(text.to_string()));
        };
        let result = text_layout::wrap(text, r.width, r.height, &self.font, 0.0)?;
        let style = self.text_style(alignment);
        let pdf = self.to_pdf_rect(r);
        self.emit_text(SegmentId::Body, &result.lines, &style, pdf, 0.0);
        Ok(result.remainder)
    }

    /// Width of `text` in the current font and unit.
    pub fn measure_text(&self, text: &str) -> f64 {
        self.unit.to_external(self.font.text_width(text))
    }

    // ---- headers, footers, watermarks -----------------------------------

    fn header_band(&self) -> Rect {
        let (w, _) = self.effective_size();
        Rect::new(
            self.crop.left + self.margins.left,
            self.crop.top + self.margins.top,
            w - self.crop.horizontal() - self.margins.horizontal(),
            self.header_height,
        )
    }

    fn footer_band(&self) -> Rect {
        let (w, h) = self.effective_size();
        Rect::new(
            self.crop.left + self.margins.left,
            h - self.crop.bottom - self.margins.bottom - self.footer_height,
            w - self.crop.horizontal() - self.margins.horizontal(),
            self.footer_height,
        )
    }

    fn crop_area(&self) -> Rect {
        let (w, h) = self.effective_size();
        Rect::new(
            self.crop.left,
            self.crop.top,
            w - self.crop.horizontal(),
            h - self.crop.vertical(),
        )
    }

    fn band_text(&mut self, band: Rect, text: &str, alignment: Alignment, what: &str) -> Result<()> {
        self.ensure_unset("write text")?;
        Self::require_text(text)?;
        if band.is_empty() {
            log::warn!("{} band has no height, {} text skipped", what, what);
            return Ok(());
        }
        let result = text_layout::wrap(text, band.width, band.height, &self.font, 0.0)?;
        let style = self.text_style(alignment);
        let pdf = self.absolute_to_pdf(band);
        self.emit_text(SegmentId::Overlay, &result.lines, &style, pdf, 0.0);
        Ok(())
    }

    fn band_image(&mut self, band: Rect, image: &ImageData, what: &str) -> Result<()> {
        self.ensure_unset("draw")?;
        if band.is_empty() {
            log::warn!("{} band has no height, {} image skipped", what, what);
            return Ok(());
        }
        let (w, h) = image.fit_to_box(band.width, band.height);
        let placed = Rect::new(band.x + (band.width - w) / 2.0, band.y + (band.height - h) / 2.0, w, h);
        let pdf = self.absolute_to_pdf(placed);
        self.place_image(SegmentId::Overlay, image, pdf);
        Ok(())
    }

    /// Text in the header band, over the body.
    pub fn add_header_text(&mut self, text: &str, alignment: Alignment) -> Result<()> {
        let band = self.header_band();
        self.band_text(band, text, alignment, "header")
    }

    /// Text in the footer band, over the body.
    pub fn add_footer_text(&mut self, text: &str, alignment: Alignment) -> Result<()> {
        let band = self.footer_band();
        self.band_text(band, text, alignment, "footer")
    }

    /// Image fitted and centered in the header band.
    pub fn add_header_image(&mut self, image: &ImageData) -> Result<()> {
        let band = self.header_band();
        self.band_image(band, image, "header")
    }

    /// Image fitted and centered in the footer band.
    pub fn add_footer_image(&mut self, image: &ImageData) -> Result<()> {
        let band = self.footer_band();
        self.band_image(band, image, "footer")
    }

    /// Text centered on the visible page, rotated by `angle` degrees
    /// counter-clockwise.
    pub fn add_watermark_text(&mut self, text: &str, font: Font, color: Color, angle: f64, layer: Layer) -> Result<()> {
        self.ensure_unset("write text")?;
        Self::require_text(text)?;
        let area = self.crop_area();
        let result = text_layout::wrap_unbounded(text, &font)?;
        let width = result.width();
        let height = result.height(&font);
        let c = area.center();
        let frame = Rect::new(c.x - width / 2.0, c.y - height / 2.0, width, height);
        let style = TextStyle {
            font,
            color,
            alignment: Alignment::Center,
            justify_last_line: false,
            angle,
        };
        let pdf = self.absolute_to_pdf(frame);
        self.emit_text(layer_segment(layer), &result.lines, &style, pdf, 0.0);
        Ok(())
    }

    /// Image fitted and centered on the visible page.
    pub fn add_watermark_image(&mut self, image: &ImageData, layer: Layer) -> Result<()> {
        self.ensure_unset("draw")?;
        let area = self.crop_area();
        let (w, h) = image.fit_to_box(area.width, area.height);
        let c = area.center();
        let pdf = self.absolute_to_pdf(Rect::new(c.x - w / 2.0, c.y - h / 2.0, w, h));
        self.place_image(layer_segment(layer), image, pdf);
        Ok(())
    }

    // ---- annotations and actions ------------------------------------------

    /// Clickable area firing `action`.
    pub fn add_link(&mut self, x: f64, y: f64, w: f64, h: f64, action: Action) -> Result<()> {
        self.ensure_unset("add a link")?;
        let r = self.rect_in_unit(x, y, w, h);
        if let Some(r) = self.clamped(r, "link") {
            let pdf = self.to_pdf_rect(r);
            self.annotations.push(Annotation::link(pdf, action).into_shared());
        }
        Ok(())
    }

    /// Sticky note with its icon's top-left corner at a point.
    pub fn add_text_note(&mut self, x: f64, y: f64, contents: &str) -> Result<()> {
        self.ensure_unset("add a note")?;
        Self::require_text(contents)?;
        let p = clamp_point(&self.writable_area(), self.unit.point_to_internal(Point::new(x, y)));
        let pdf = self.to_pdf_rect(Rect::new(p.x, p.y, 24.0, 24.0));
        self.annotations.push(Annotation::text_note(pdf, contents).into_shared());
        Ok(())
    }

    /// Attach an annotation built elsewhere (rectangle in PDF space).
    pub fn add_annotation(&mut self, annotation: SharedAnnotation) -> Result<()> {
        self.ensure_unset("add an annotation")?;
        self.annotations.push(annotation);
        Ok(())
    }

    /// Number of annotations attached.
    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }

    /// Action fired when the page is opened.
    pub fn set_open_action(&mut self, action: Action) -> Result<()> {
        self.set_page_action(PageActionTrigger::Open, action)
    }

    /// Action fired when the page is closed.
    pub fn set_close_action(&mut self, action: Action) -> Result<()> {
        self.set_page_action(PageActionTrigger::Close, action)
    }

    fn set_page_action(&mut self, trigger: PageActionTrigger, action: Action) -> Result<()> {
        self.ensure_unset("set a page action")?;
        self.page_actions.insert(trigger, NumberedAction::new(action));
        Ok(())
    }

    // ---- serialization -------------------------------------------------------

    /// Resource names used by this page, in first-use order.
    pub fn resource_names(&self) -> Vec<String> {
        self.used_resources.iter().cloned().collect()
    }

    /// Reference to the page object, once numbered.
    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.page_number.map(|n| ObjectRef::new(n, 0))
    }

    /// Whether the page has been numbered and not yet reset.
    pub fn is_numbered(&self) -> bool {
        self.state != SerializationState::Unset
    }

    /// Concatenated content: rotation start, underlay, inherited content,
    /// body, overlay, rotation end.
    pub fn content_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let rotation = self.rotation_matrix();
        if let Some(op) = &rotation {
            out.extend_from_slice(b"q\n");
            op.write_to(&mut out);
            out.push(b'\n');
        }
        self.underlay.write_wrapped(&mut out);
        if !self.raw_content.is_empty() {
            out.extend_from_slice(b"q\n");
            out.extend_from_slice(&self.raw_content);
            if !self.raw_content.ends_with(b"\n") {
                out.push(b'\n');
            }
            out.extend_from_slice(b"Q\n");
        }
        self.body.write_wrapped(&mut out);
        self.overlay.write_wrapped(&mut out);
        if rotation.is_some() {
            out.extend_from_slice(b"Q\n");
        }
        out
    }

    /// Maps displayed coordinates onto the unrotated page.
    fn rotation_matrix(&self) -> Option<ContentStreamOp> {
        let (w, h) = (self.width, self.height);
        match self.rotation {
            Rotation::None => None,
            Rotation::Clockwise90 => Some(ContentStreamOp::Transform(0.0, 1.0, -1.0, 0.0, w, 0.0)),
            Rotation::Clockwise180 => Some(ContentStreamOp::Transform(-1.0, 0.0, 0.0, -1.0, w, h)),
            Rotation::Clockwise270 => Some(ContentStreamOp::Transform(0.0, -1.0, 1.0, 0.0, 0.0, h)),
        }
    }

    /// Numbering pass: resources, actions, annotations, content, page.
    pub fn assign_numbers(&mut self, ctx: &mut dyn SerializationContext) -> Result<()> {
        if self.state != SerializationState::Unset {
            return Err(Error::InvalidState(format!("page already {:?}", self.state)));
        }
        let names = self.resource_names();
        lock_registry(&self.registry).assign_numbers(ctx, &names)?;

        for action in self.page_actions.values_mut() {
            action.assign_number(ctx);
        }
        for annotation in &self.annotations {
            lock_annotation(annotation).assign_actions(ctx);
        }
        for annotation in &self.annotations {
            lock_annotation(annotation).assign_number(ctx);
        }
        self.content_number = Some(ctx.next_object_number());
        let page_number = ctx.next_object_number();
        self.page_number = Some(page_number);
        self.state = SerializationState::Numbered;
        log::debug!(
            "page numbered as {} with {} resources and {} annotations",
            page_number,
            names.len(),
            self.annotations.len()
        );
        Ok(())
    }

    /// Writing pass: every owned object, then the page dictionary.
    pub fn serialize(&mut self, ctx: &mut dyn SerializationContext, translator: &dyn ReferenceTranslator) -> Result<()> {
        match self.state {
            SerializationState::Numbered => {},
            SerializationState::Written => {
                return Err(Error::SerializationFault(
                    "page was already written in this pass".to_string(),
                ));
            },
            SerializationState::Unset => {
                return Err(Error::InvalidState("page must be numbered before writing".to_string()));
            },
        }
        let (Some(content_number), Some(page_number)) = (self.content_number, self.page_number) else {
            return Err(Error::SerializationFault("page numbers missing".to_string()));
        };
        let parent = ctx
            .page_tree_root()
            .ok_or_else(|| Error::SerializationFault("no page tree root to attach the page to".to_string()))?;

        let names = self.resource_names();
        let own_resources = {
            let mut registry = lock_registry(&self.registry);
            registry.write(ctx, &names)?;
            registry.resource_dict(&names)?
        };

        for action in self.page_actions.values() {
            action.write(ctx, translator)?;
        }
        let mut annot_refs = Vec::with_capacity(self.annotations.len());
        for annotation in &self.annotations {
            let mut annotation = lock_annotation(annotation);
            annotation.write(ctx, translator)?;
            if let Some(n) = annotation.number() {
                annot_refs.push(Object::Reference(ObjectRef::new(n, 0)));
            }
        }

        let content = Object::Stream {
            dict: Dictionary::new(),
            data: self.content_bytes().into(),
        };
        write_indirect(ctx, content_number, &content)?;

        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::Name("Page".to_string()));
        dict.insert("Parent".to_string(), Object::Reference(parent));
        dict.insert(
            "MediaBox".to_string(),
            Object::Array(vec![
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(self.width),
                Object::Real(self.height),
            ]),
        );
        if self.crop != Insets::default() {
            let [l, b, r, t] = unrotated_insets(self.rotation, &self.crop);
            dict.insert(
                "CropBox".to_string(),
                Object::Array(vec![
                    Object::Real(l),
                    Object::Real(b),
                    Object::Real(self.width - r),
                    Object::Real(self.height - t),
                ]),
            );
        }
        if self.rotation != Rotation::None {
            dict.insert("Rotate".to_string(), Object::Integer(self.rotation.degrees()));
        }
        dict.insert(
            "Resources".to_string(),
            Object::Dictionary(self.merged_resources(own_resources, translator)?),
        );
        dict.insert(
            "Contents".to_string(),
            Object::Reference(ObjectRef::new(content_number, 0)),
        );
        if !annot_refs.is_empty() {
            dict.insert("Annots".to_string(), Object::Array(annot_refs));
        }
        if let Some(aa) = self.additional_actions(translator)? {
            dict.insert("AA".to_string(), Object::Dictionary(aa));
        }
        write_indirect(ctx, page_number, &Object::Dictionary(dict))?;

        self.state = SerializationState::Written;
        log::debug!("page {} written", page_number);
        Ok(())
    }

    fn merged_resources(
        &self,
        own: IndexMap<ResourceKind, Dictionary>,
        translator: &dyn ReferenceTranslator,
    ) -> Result<Dictionary> {
        let mut merged = match &self.inherited {
            Some(inherited) if !inherited.resources.is_empty() => {
                match translate_object(&Object::Dictionary(inherited.resources.clone()), inherited.source, translator)? {
                    Object::Dictionary(dict) => dict,
                    _ => Dictionary::new(),
                }
            },
            _ => Dictionary::new(),
        };
        for (kind, entries) in own {
            let sub = merged
                .entry(kind.dict_key().to_string())
                .or_insert_with(|| Object::Dictionary(Dictionary::new()));
            match sub {
                Object::Dictionary(existing) => existing.extend(entries),
                other => {
                    log::warn!("inherited /{} is not a dictionary, replacing it", kind.dict_key());
                    *other = Object::Dictionary(entries);
                },
            }
        }
        Ok(merged)
    }

    fn additional_actions(&self, translator: &dyn ReferenceTranslator) -> Result<Option<Dictionary>> {
        let mut aa = match &self.inherited {
            Some(Inherited {
                additional_actions: Some(dict),
                source,
                ..
            }) => match translate_object(&Object::Dictionary(dict.clone()), *source, translator)? {
                Object::Dictionary(dict) => dict,
                _ => Dictionary::new(),
            },
            _ => Dictionary::new(),
        };
        for (trigger, action) in &self.page_actions {
            if let Some(n) = action.number() {
                aa.insert(trigger.key().to_string(), Object::Reference(ObjectRef::new(n, 0)));
            }
        }
        Ok(if aa.is_empty() { None } else { Some(aa) })
    }

    /// Return to the unset state so the page can be drawn and written again.
    ///
    /// Drawn segments and non-reusable annotations are discarded; reusable
    /// annotations and page actions keep their content but lose their
    /// numbers. Resetting an unset page does nothing.
    ///
    /// A registry shared with other pages is left numbered: siblings may
    /// still be waiting to be written. Whoever drives the write resets it
    /// once every page is done, as [`PdfWriter`](super::PdfWriter) does.
    pub fn reset(&mut self) {
        if self.state == SerializationState::Unset {
            return;
        }
        if Arc::strong_count(&self.registry) == 1 {
            lock_registry(&self.registry).reset();
        }
        self.annotations.retain(|a| {
            let mut annotation = lock_annotation(a);
            annotation.reset();
            annotation.is_reusable()
        });
        for action in self.page_actions.values_mut() {
            action.reset();
        }
        self.underlay = Segment::default();
        self.body = Segment::default();
        self.overlay = Segment::default();
        self.used_resources.clear();
        self.cursor = Point::default();
        self.content_number = None;
        self.page_number = None;
        self.state = SerializationState::Unset;
    }
}

fn layer_segment(layer: Layer) -> SegmentId {
    match layer {
        Layer::Underlay => SegmentId::Underlay,
        Layer::Overlay => SegmentId::Overlay,
    }
}

/// Displayed (left, top, right, bottom) insets as unrotated (left, bottom, right, top).
fn unrotated_insets(rotation: Rotation, v: &Insets) -> [f64; 4] {
    match rotation {
        Rotation::None => [v.left, v.bottom, v.right, v.top],
        Rotation::Clockwise90 => [v.top, v.left, v.bottom, v.right],
        Rotation::Clockwise180 => [v.right, v.top, v.left, v.bottom],
        Rotation::Clockwise270 => [v.bottom, v.right, v.top, v.left],
    }
}

/// Inverse of [`unrotated_insets`].
fn visual_insets(rotation: Rotation, [l, b, r, t]: [f64; 4]) -> Insets {
    match rotation {
        Rotation::None => Insets::new(l, t, r, b),
        Rotation::Clockwise90 => Insets::new(b, l, t, r),
        Rotation::Clockwise180 => Insets::new(r, b, l, t),
        Rotation::Clockwise270 => Insets::new(t, r, b, l),
    }
}

/// Restores the page's previous unit when dropped.
#[derive(Debug)]
pub struct UnitScope<'a> {
    page: &'a mut Page,
    previous: Unit,
}

impl Deref for UnitScope<'_> {
    type Target = Page;

    fn deref(&self) -> &Page {
        self.page
    }
}

impl DerefMut for UnitScope<'_> {
    fn deref_mut(&mut self) -> &mut Page {
        self.page
    }
}

impl Drop for UnitScope<'_> {
    fn drop(&mut self) {
        self.page.unit = self.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::font_manager::FontFamily;
    use crate::writer::graphics_state::FillPattern;
    use crate::writer::image_handler::ColorSpace;
    use crate::writer::serialization::{NoTranslation, WriteContext};

    fn letter() -> Page {
        Page::new(&PageConfig::letter()).unwrap()
    }

    fn content(page: &Page) -> String {
        String::from_utf8(page.content_bytes()).unwrap()
    }

    fn write(page: &mut Page) -> Result<WriteContext> {
        let mut ctx = WriteContext::new();
        ctx.set_page_tree_root(ObjectRef::new(999, 0));
        page.assign_numbers(&mut ctx)?;
        page.serialize(&mut ctx, &NoTranslation)?;
        Ok(ctx)
    }

    #[test]
    fn test_rect_is_flipped_into_pdf_space() {
        let mut page = letter();
        page.draw_rect(0.0, 0.0, 100.0, 50.0, PaintMode::FillStroke).unwrap();
        assert_eq!(content(&page), "q\n0 742 100 50 re\nB\nQ\n");
    }

    #[test]
    fn test_margins_shift_origin() {
        let config = PageConfig::letter().with_margins(Insets::uniform(72.0)).with_bands(18.0, 0.0);
        let mut page = Page::new(&config).unwrap();
        assert_eq!(page.writable_width(), 468.0);
        assert_eq!(page.writable_height(), 630.0);
        page.draw_rect(0.0, 0.0, 10.0, 10.0, PaintMode::Stroke).unwrap();
        assert!(content(&page).contains("72 692 10 10 re\nS\n"));
    }

    #[test]
    fn test_rect_is_shrunk_not_enlarged() {
        let mut page = letter();
        page.draw_rect(600.0, 0.0, 100.0, 10.0, PaintMode::Stroke).unwrap();
        assert!(content(&page).contains("600 782 12 10 re"));
    }

    #[test]
    fn test_out_of_area_is_silent() {
        let mut page = letter();
        page.draw_rect(1000.0, 1000.0, 10.0, 10.0, PaintMode::Stroke).unwrap();
        assert_eq!(content(&page), "");
        page.draw_rect_unclamped(1000.0, 0.0, 10.0, 10.0, PaintMode::Stroke).unwrap();
        assert!(content(&page).contains("1000 782 10 10 re"));
    }

    #[test]
    fn test_pen_changes_are_minimal() {
        let mut page = letter();
        page.set_pen(Pen::new(Color::rgb(1.0, 0.0, 0.0), 2.0));
        page.draw_line(0.0, 0.0, 10.0, 0.0).unwrap();
        page.draw_line(0.0, 10.0, 10.0, 10.0).unwrap();
        let text = content(&page);
        assert_eq!(text.matches("1 0 0 RG").count(), 1);
        assert_eq!(text.matches("2 w").count(), 1);
    }

    #[test]
    fn test_hatched_fill_registers_pattern_once() {
        let mut page = letter();
        page.set_brush(Brush::hatched(Color::BLACK, FillPattern::Cross));
        page.draw_rect(0.0, 0.0, 50.0, 50.0, PaintMode::Fill).unwrap();
        page.draw_rect(60.0, 0.0, 50.0, 50.0, PaintMode::Fill).unwrap();
        let text = content(&page);
        assert_eq!(text.matches("/Pattern cs\n/P1 scn").count(), 1);
        assert_eq!(page.resource_names(), vec!["P1".to_string()]);
    }

    #[test]
    fn test_same_image_twice_one_resource() {
        let mut page = letter();
        let img = ImageData::from_raw(2, 2, ColorSpace::DeviceGray, vec![0, 255, 255, 0]).unwrap();
        page.draw_image(&img, 0.0, 0.0, 20.0, 20.0).unwrap();
        page.draw_image(&img, 50.0, 0.0, 20.0, 20.0).unwrap();
        assert_eq!(content(&page).matches("/Im1 Do").count(), 2);
        assert_eq!(page.resource_names().len(), 1);
    }

    #[test]
    fn test_draw_image_at_requires_full_fit() {
        let mut page = letter();
        let img = ImageData::from_raw(1, 1, ColorSpace::DeviceGray, vec![0]).unwrap();
        page.draw_image_at(&img, 600.0, 0.0, 20.0, 20.0).unwrap();
        assert_eq!(content(&page), "");
        page.draw_image(&img, 600.0, 0.0, 20.0, 20.0).unwrap();
        assert!(content(&page).contains("12 0 0 20 600 772 cm"));
    }

    #[test]
    fn test_empty_text_is_rejected_without_mutation() {
        let mut page = letter();
        assert!(matches!(page.write_text(""), Err(Error::InvalidArgument(_))));
        assert_eq!(content(&page), "");
        assert!(page.resource_names().is_empty());
    }

    #[test]
    fn test_write_text_advances_cursor() {
        let mut page = letter();
        page.set_font(Font::new(FontFamily::Courier, 10.0));
        page.write_text("abc").unwrap();
        assert_eq!(page.cursor(), Point::new(18.0, 0.0));
        page.write_line("de").unwrap();
        let lh = page.font().line_height();
        assert!((page.cursor().y - lh).abs() < 1e-9);
        assert_eq!(page.cursor().x, 0.0);
    }

    #[test]
    fn test_too_narrow_region_discards_line() {
        let mut page = letter();
        page.set_font(Font::new(FontFamily::Courier, 10.0));
        let err = page
            .write_text_in_rect("W", 0.0, 0.0, 3.0, 50.0, Alignment::Left, 0.0)
            .unwrap_err();
        assert!(matches!(err, Error::TextRegionTooSmall { .. }));
        assert_eq!(content(&page), "");
    }

    #[test]
    fn test_fitting_returns_remainder() {
        let mut page = letter();
        page.set_font(Font::new(FontFamily::Courier, 10.0));
        let lh = page.font().line_height();
        let rest = page
            .write_text_fitting("aaa bbb ccc", 0.0, 0.0, 20.0, lh, Alignment::Left)
            .unwrap();
        assert_eq!(rest.as_deref(), Some("bbb ccc"));
    }

    #[test]
    fn test_rotation_swaps_writable_area_and_wraps_content() {
        let config = PageConfig::letter().with_rotation(90);
        let mut page = Page::new(&config).unwrap();
        assert_eq!(page.writable_width(), 792.0);
        assert_eq!(page.writable_height(), 612.0);
        page.draw_line(0.0, 0.0, 10.0, 10.0).unwrap();
        let text = content(&page);
        assert!(text.starts_with("q\n0 1 -1 0 612 0 cm\n"));
        assert!(text.ends_with("Q\nQ\n"));
    }

    #[test]
    fn test_header_goes_to_overlay() {
        let config = PageConfig::letter().with_margins(Insets::uniform(36.0)).with_bands(20.0, 20.0);
        let mut page = Page::new(&config).unwrap();
        page.write_text("body").unwrap();
        page.add_header_text("head", Alignment::Center).unwrap();
        let text = content(&page);
        let body = text.find("(body) Tj").unwrap();
        let head = text.find("(head) Tj").unwrap();
        assert!(head > body);
    }

    #[test]
    fn test_unit_scope_restores_unit() {
        let mut page = letter();
        {
            let mut scoped = page.in_unit(Unit::Inch);
            scoped.draw_rect(1.0, 1.0, 1.0, 1.0, PaintMode::Stroke).unwrap();
        }
        assert_eq!(page.unit(), Unit::Point);
        assert!(content(&page).contains("72 648 72 72 re"));
    }

    #[test]
    fn test_protocol_states() {
        let mut page = letter();
        page.write_text("hi").unwrap();
        let mut ctx = WriteContext::new();
        ctx.set_page_tree_root(ObjectRef::new(50, 0));

        assert!(matches!(
            page.serialize(&mut ctx, &NoTranslation),
            Err(Error::InvalidState(_))
        ));
        page.assign_numbers(&mut ctx).unwrap();
        assert!(matches!(page.assign_numbers(&mut ctx), Err(Error::InvalidState(_))));
        assert!(matches!(page.write_text("more"), Err(Error::InvalidState(_))));

        page.serialize(&mut ctx, &NoTranslation).unwrap();
        // Font 1, content 2, page 3
        assert_eq!(page.object_ref(), Some(ObjectRef::new(3, 0)));
        let out = String::from_utf8_lossy(ctx.output()).to_string();
        assert!(out.contains("/F1 1 0 R"));
        assert!(out.contains("/Contents 2 0 R"));
        assert!(out.contains("/Parent 50 0 R"));

        page.reset();
        page.reset();
        assert!(!page.is_numbered());
        assert_eq!(content(&page), "");
        page.write_text("again").unwrap();
    }

    #[test]
    fn test_reset_keeps_reusable_annotations() {
        let mut page = letter();
        let shared = Annotation::link_uri(Rect::new(0.0, 0.0, 10.0, 10.0), "https://a.example")
            .reusable()
            .into_shared();
        page.add_annotation(Arc::clone(&shared)).unwrap();
        page.add_link(0.0, 0.0, 10.0, 10.0, Action::Named("NextPage".to_string())).unwrap();
        page.set_open_action(Action::Named("FirstPage".to_string())).unwrap();
        assert_eq!(page.annotation_count(), 2);

        let ctx = write(&mut page).unwrap();
        let out = String::from_utf8_lossy(ctx.output()).to_string();
        assert!(out.contains("/AA"));
        assert!(out.contains("/Annots"));

        page.reset();
        assert_eq!(page.annotation_count(), 1);
        assert_eq!(lock_annotation(&shared).number(), None);
    }

    #[test]
    fn test_inherited_reader_mode() {
        let mut objects = HashMap::new();
        let root = ObjectRef::new(1, 0);
        let leaf = ObjectRef::new(2, 0);
        let font = ObjectRef::new(3, 0);
        let mut resources = Dictionary::new();
        let mut fonts = Dictionary::new();
        fonts.insert("F1".to_string(), Object::Reference(font));
        resources.insert("Font".to_string(), Object::Dictionary(fonts));

        let mut root_dict = Dictionary::new();
        root_dict.insert("Type".to_string(), Object::Name("Pages".to_string()));
        root_dict.insert("Kids".to_string(), Object::Array(vec![Object::Reference(leaf)]));
        root_dict.insert(
            "MediaBox".to_string(),
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(300), Object::Integer(400)]),
        );
        root_dict.insert("Resources".to_string(), Object::Dictionary(resources));
        objects.insert(root, Object::Dictionary(root_dict));
        let mut leaf_dict = Dictionary::new();
        leaf_dict.insert("Type".to_string(), Object::Name("Page".to_string()));
        objects.insert(leaf, Object::Dictionary(leaf_dict));

        let source = DocumentId(5);
        let tree = PageTree::from_objects(&objects, root, source).unwrap();
        let mut page = Page::from_tree(&tree, tree.pages()[0], &objects).unwrap();
        assert_eq!((page.width(), page.height()), (300.0, 400.0));

        page.write_text("new").unwrap();
        // F1 is inherited, so the page's own font is renamed
        assert_eq!(page.resource_names(), vec!["F1_1".to_string()]);

        let mut table = crate::writer::serialization::ReferenceTable::new();
        table.insert(source, font, ObjectRef::new(77, 0));
        let mut ctx = WriteContext::new();
        ctx.set_page_tree_root(ObjectRef::new(90, 0));
        page.assign_numbers(&mut ctx).unwrap();
        page.serialize(&mut ctx, &table).unwrap();
        let out = String::from_utf8_lossy(ctx.output()).to_string();
        assert!(out.contains("/F1 77 0 R"));
        assert!(out.contains("/F1_1 1 0 R"));
    }

    #[test]
    fn test_inherited_reference_without_translation_faults() {
        let mut objects = HashMap::new();
        let root = ObjectRef::new(1, 0);
        let mut fonts = Dictionary::new();
        fonts.insert("F1".to_string(), Object::Reference(ObjectRef::new(3, 0)));
        let mut resources = Dictionary::new();
        resources.insert("Font".to_string(), Object::Dictionary(fonts));
        let mut page_dict = Dictionary::new();
        page_dict.insert("Type".to_string(), Object::Name("Page".to_string()));
        page_dict.insert("Resources".to_string(), Object::Dictionary(resources));
        let mut root_dict = Dictionary::new();
        root_dict.insert("Type".to_string(), Object::Name("Pages".to_string()));
        root_dict.insert("Kids".to_string(), Object::Array(vec![Object::Reference(ObjectRef::new(2, 0))]));
        objects.insert(root, Object::Dictionary(root_dict));
        objects.insert(ObjectRef::new(2, 0), Object::Dictionary(page_dict));

        let tree = PageTree::from_objects(&objects, root, DocumentId(1)).unwrap();
        let mut page = Page::from_tree(&tree, tree.pages()[0], &objects).unwrap();
        let err = write(&mut page).unwrap_err();
        assert!(matches!(err, Error::SerializationFault(_)));
        assert!(err.is_fatal_to_write());
    }
}
