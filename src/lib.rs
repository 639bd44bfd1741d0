// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::new_without_default)]

//! # PDF Pagesmith
//!
//! Page content compilation and two-phase PDF serialization.
//!
//! ## Core Features
//!
//! - **Drawing**: lines, rectangles, rounded rectangles, ellipses, arcs, pies,
//!   polygons and Bézier curves with pens, solid brushes and hatch patterns
//! - **Text**: greedy word wrapping, left/center/right/justified alignment,
//!   underline and strikeout, rotated text blocks, header and footer bands
//! - **Images**: JPEG pass-through, PNG with alpha as soft mask, deduplicated
//!   by content fingerprint
//! - **Units**: points, inches, millimeters, centimeters, picas, twips and
//!   pixels, with scoped unit switches
//! - **Pages**: margins, crop box, rotation, watermarks, link and note
//!   annotations, page open/close actions
//! - **Serialization**: numbering pass then writing pass, exact xref offsets,
//!   pages reusable after a reset
//! - **Import**: pages of a parsed document keep their content, resources and
//!   annotations, with references translated into the new document
//!
//! ## Coordinates
//!
//! Callers work top-left based with y growing down, relative to the page's
//! writable area. Everything is converted to PDF space (bottom-left origin,
//! points) before it reaches a content stream.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_pagesmith::config::PageConfig;
//! use pdf_pagesmith::geometry::Insets;
//! use pdf_pagesmith::writer::{Alignment, PdfWriter, Unit};
//!
//! # fn main() -> pdf_pagesmith::Result<()> {
//! let config = PageConfig::letter()
//!     .with_margins(Insets::uniform(72.0))
//!     .with_bands(24.0, 24.0);
//! let mut writer = PdfWriter::new();
//! let page = writer.new_page(&config)?;
//! page.add_header_text("Quarterly report", Alignment::Center)?;
//! {
//!     let mut page = page.in_unit(Unit::Inch);
//!     page.write_text_in_rect("Body text", 0.0, 0.5, 6.5, 2.0, Alignment::Justify, 0.0)?;
//! }
//! writer.save("report.pdf")?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Error types
pub mod error;

/// PDF object model shared by reader and writer
pub mod object;

/// Points, rectangles and insets
pub mod geometry;

/// Page configuration
pub mod config;

/// Page compilation and serialization
pub mod writer;

pub use config::PageConfig;
pub use error::{Error, Result};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
