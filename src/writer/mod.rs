//! Page compilation and PDF serialization.
//!
//! ## Architecture
//!
//! ```text
//! drawing / text / annotation calls
//!     ↓
//! [Page] (clamps to the writable area, converts units, flips y)
//!     ↓                         ↓
//! [PathEncoder] [text_layout]   [ResourceRegistry] (fonts, images, patterns)
//!     ↓                         ↓
//! [ContentStreamBuilder] ← [StateCache] (only changed state is emitted)
//!     ↓
//! [PdfWriter] (numbering pass, writing pass, xref, trailer)
//!     ↓
//! [ObjectSerializer] → PDF bytes
//! ```
//!
//! ## Example
//!
//! ```
//! use pdf_pagesmith::config::PageConfig;
//! use pdf_pagesmith::writer::{Alignment, PaintMode, PdfWriter};
//!
//! let mut writer = PdfWriter::new();
//! let page = writer.new_page(&PageConfig::letter()).unwrap();
//! page.write_paragraph("Hello, World!", Alignment::Center).unwrap();
//! page.draw_rect(0.0, 20.0, 200.0, 1.0, PaintMode::Fill).unwrap();
//! let bytes = writer.finish().unwrap();
//! assert!(bytes.starts_with(b"%PDF-1.7"));
//! ```

mod annotation_builder;
mod content_stream;
mod filters;
mod font_manager;
mod graphics_state;
mod image_handler;
mod object_serializer;
mod page;
mod page_tree;
mod path_encoder;
mod pattern;
mod pdf_writer;
mod resources;
pub mod serialization;
pub mod text_layout;
mod units;

pub use annotation_builder::{
    lock_annotation, Action, Annotation, AnnotationKind, BorderStyle, HighlightMode, NumberedAction,
    PageActionTrigger, SharedAnnotation,
};
pub use content_stream::{ContentStreamBuilder, ContentStreamOp, LineCap, LineJoin};
pub use filters::Filter;
pub use font_manager::{encode_win_ansi, Font, FontFamily, FontMetrics, FontStyle, StandardFont};
pub use graphics_state::{Brush, Color, DashStyle, FillPaint, FillPattern, Pen, StateCache};
pub use image_handler::{ColorSpace, ImageData, ImageError, ImageFormat};
pub use object_serializer::{format_number, ObjectSerializer};
pub use page::{Layer, Page, Rotation, SharedPage, UnitScope};
pub use page_tree::{NodeId, NodeKind, PageTree, PageTreeNode};
pub use path_encoder::{arc_segment_count, PaintMode, PathEncoder, ELLIPSE_KAPPA};
pub use pattern::{hatch_cell, HatchPattern, PatternPaintType, PatternTilingType, TilingPatternBuilder};
pub use pdf_writer::{PdfWriter, PdfWriterConfig};
pub use resources::{lock_registry, Fingerprint, ResourceKind, ResourceRegistry, SharedRegistry};
pub use serialization::{
    DocumentId, NoTranslation, ReferenceTable, ReferenceTranslator, SerializationContext, WriteContext,
};
pub use text_layout::{wrap, Alignment, Line, TextStyle, WrapResult};
pub use units::{clamp_point, clamp_rect, ClampResult, Unit};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _serializer = ObjectSerializer::new();
        let _builder = ContentStreamBuilder::new();
        let _registry = ResourceRegistry::new();
    }
}
