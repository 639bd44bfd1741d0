//! Document driver.
//!
//! [`PdfWriter`] owns the pages of one output document and runs them through
//! the two-phase protocol: every page is numbered first, then every page is
//! written, then the page tree, catalog, info dictionary, cross-reference
//! table and trailer close the file. Pages are reset afterwards, whether the
//! write succeeded or not, so the same writer can produce the document again.

use super::object_serializer::ObjectSerializer;
use super::page::Page;
use super::resources::{lock_registry, ResourceRegistry, SharedRegistry};
use super::serialization::{write_indirect, NoTranslation, ReferenceTranslator, SerializationContext, WriteContext};
use crate::config::PageConfig;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::sync::Arc;

/// PDF writer configuration.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// PDF version (e.g., "1.7")
    pub version: String,
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Document keywords
    pub keywords: Option<String>,
    /// Creator application
    pub creator: Option<String>,
    /// Whether to compress streams
    pub compress: bool,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            title: None,
            author: None,
            subject: None,
            keywords: None,
            creator: Some("pdf_pagesmith".to_string()),
            compress: false,
        }
    }
}

impl PdfWriterConfig {
    /// Set document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set document subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set document keywords.
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Set or clear the creator application.
    pub fn with_creator(mut self, creator: Option<String>) -> Self {
        self.creator = creator;
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Writer for one output document.
pub struct PdfWriter {
    config: PdfWriterConfig,
    pages: Vec<Page>,
    registry: SharedRegistry,
    translator: Box<dyn ReferenceTranslator + Send>,
}

impl std::fmt::Debug for PdfWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfWriter")
            .field("config", &self.config)
            .field("pages", &self.pages.len())
            .finish_non_exhaustive()
    }
}

impl PdfWriter {
    /// Create a new PDF writer with default config.
    pub fn new() -> Self {
        Self::with_config(PdfWriterConfig::default())
    }

    /// Create a PDF writer with custom config.
    pub fn with_config(config: PdfWriterConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            registry: ResourceRegistry::shared(),
            translator: Box::new(NoTranslation),
        }
    }

    /// Translator for references inherited from source documents.
    pub fn with_translator(mut self, translator: impl ReferenceTranslator + Send + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    /// Registry shared by pages created through [`new_page`](Self::new_page).
    pub fn shared_registry(&self) -> SharedRegistry {
        SharedRegistry::clone(&self.registry)
    }

    /// Append a page sharing this writer's resources and return it.
    pub fn new_page(&mut self, config: &PageConfig) -> Result<&mut Page> {
        let page = Page::new(config)?.with_registry(self.shared_registry())?;
        let index = self.pages.len();
        self.pages.push(page);
        self.page_mut(index)
    }

    /// Append a page built elsewhere.
    pub fn add_page(&mut self, page: Page) -> Result<usize> {
        if page.is_numbered() {
            return Err(Error::InvalidState("cannot add a page in the middle of a write".to_string()));
        }
        self.pages.push(page);
        Ok(self.pages.len() - 1)
    }

    /// Page at `index`.
    pub fn page_mut(&mut self, index: usize) -> Result<&mut Page> {
        let count = self.pages.len();
        self.pages
            .get_mut(index)
            .ok_or_else(|| Error::InvalidArgument(format!("page {} out of range ({} pages)", index, count)))
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Build the document; pages are reset afterwards and can be reused.
    pub fn write(&mut self) -> Result<Vec<u8>> {
        let result = self.write_document();
        for page in &mut self.pages {
            page.reset();
        }
        // Shared registries outlive the page resets; also covers a pass that
        // failed before any page left the unset state
        let mut registries: Vec<SharedRegistry> = vec![self.shared_registry()];
        for page in &self.pages {
            if !registries.iter().any(|r| Arc::ptr_eq(r, page.registry())) {
                registries.push(SharedRegistry::clone(page.registry()));
            }
        }
        for registry in &registries {
            lock_registry(registry).reset();
        }
        if let Err(e) = &result {
            log::error!("document write failed: {}", e);
        }
        result
    }

    /// Build the document and consume the writer.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.write()
    }

    /// Write the document to a file.
    pub fn save(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let bytes = self.write()?;
        std::fs::write(path.as_ref(), bytes)?;
        log::info!("wrote {} pages to {}", self.pages.len(), path.as_ref().display());
        Ok(())
    }

    fn write_document(&mut self) -> Result<Vec<u8>> {
        let mut ctx = WriteContext::new().with_compression(self.config.compress);
        let mut header = format!("%PDF-{}\n", self.config.version).into_bytes();
        // Binary marker
        header.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        ctx.append_bytes(&header);

        let catalog_id = ctx.next_object_number();
        let pages_id = ctx.next_object_number();
        let info_id = ctx.next_object_number();
        ctx.set_page_tree_root(ObjectRef::new(pages_id, 0));

        for page in &mut self.pages {
            page.assign_numbers(&mut ctx)?;
        }
        let page_refs = self
            .pages
            .iter()
            .map(|p| {
                p.object_ref()
                    .ok_or_else(|| Error::SerializationFault("page left unnumbered".to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        ctx.set_page_references(page_refs.clone());

        for page in &mut self.pages {
            page.serialize(&mut ctx, self.translator.as_ref())?;
        }

        let pages_obj = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Pages")),
            ("Kids", Object::Array(page_refs.into_iter().map(Object::Reference).collect())),
            ("Count", ObjectSerializer::integer(self.pages.len() as i64)),
        ]);
        write_indirect(&mut ctx, pages_id, &pages_obj)?;

        let catalog_obj = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Catalog")),
            ("Pages", ObjectSerializer::reference(pages_id, 0)),
        ]);
        write_indirect(&mut ctx, catalog_id, &catalog_obj)?;

        let mut info_entries = Vec::new();
        let fields = [
            ("Title", &self.config.title),
            ("Author", &self.config.author),
            ("Subject", &self.config.subject),
            ("Keywords", &self.config.keywords),
            ("Creator", &self.config.creator),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                info_entries.push((key, ObjectSerializer::string(value)));
            }
        }
        info_entries.push(("Producer", ObjectSerializer::string("pdf_pagesmith")));
        write_indirect(&mut ctx, info_id, &ObjectSerializer::dict(info_entries))?;

        let xref_start = ctx.write_xref()?;
        let trailer = ObjectSerializer::dict(vec![
            ("Size", ObjectSerializer::integer(ctx.size() as i64)),
            ("Root", ObjectSerializer::reference(catalog_id, 0)),
            ("Info", ObjectSerializer::reference(info_id, 0)),
        ]);
        let mut tail = b"trailer\n".to_vec();
        tail.extend_from_slice(&ObjectSerializer::compact().serialize(&trailer));
        tail.extend_from_slice(format!("\nstartxref\n{}\n%%EOF", xref_start).as_bytes());
        ctx.append_bytes(&tail);

        log::debug!("document of {} pages, {} objects", self.pages.len(), ctx.size() - 1);
        Ok(ctx.into_output())
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::annotation_builder::Action;
    use crate::writer::path_encoder::PaintMode;

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn test_create_empty_pdf() {
        let bytes = PdfWriter::new().finish().unwrap();
        let content = text(&bytes);
        assert!(content.starts_with("%PDF-1.7"));
        assert!(content.contains("/Type /Catalog"));
        assert!(content.contains("/Count 0"));
        assert!(content.ends_with("%%EOF"));
    }

    #[test]
    fn test_pdf_with_metadata() {
        let config = PdfWriterConfig::default()
            .with_title("Report")
            .with_author("Ops")
            .with_keywords("pages");
        let mut writer = PdfWriter::with_config(config);
        writer.new_page(&PageConfig::letter()).unwrap();
        let content = text(&writer.finish().unwrap());
        assert!(content.contains("/Title (Report)"));
        assert!(content.contains("/Author (Ops)"));
        assert!(content.contains("/Keywords (pages)"));
    }

    #[test]
    fn test_pages_share_resources() {
        let mut writer = PdfWriter::new();
        for _ in 0..2 {
            let page = writer.new_page(&PageConfig::letter()).unwrap();
            page.write_text("Hello").unwrap();
        }
        let content = text(&writer.finish().unwrap());
        assert_eq!(content.matches("/BaseFont /Helvetica").count(), 1);
        assert!(content.contains("/Count 2"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut writer = PdfWriter::new();
        writer
            .new_page(&PageConfig::letter())
            .unwrap()
            .draw_rect(10.0, 10.0, 50.0, 50.0, PaintMode::Stroke)
            .unwrap();
        let bytes = writer.finish().unwrap();
        let content = text(&bytes);
        let xref = content.rfind("\nxref\n").unwrap() + 1;
        let entries: Vec<&str> = content[xref..].lines().skip(3).take_while(|l| l.ends_with(" n ")).collect();
        assert!(!entries.is_empty());
        for (i, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            let expected = format!("{} 0 obj", i + 1);
            assert!(bytes[offset..].starts_with(expected.as_bytes()), "object {} at {}", i + 1, offset);
        }
    }

    #[test]
    fn test_write_twice_is_identical() {
        let mut writer = PdfWriter::new();
        let page = writer.new_page(&PageConfig::letter()).unwrap();
        page.set_open_action(Action::Named("FirstPage".to_string())).unwrap();
        page.draw_circle(100.0, 100.0, 20.0, PaintMode::Fill).unwrap();
        let first = writer.write().unwrap();
        // Drawn content is discarded on reset
        let second = writer.write().unwrap();
        assert_ne!(first, second);
        let third = writer.write().unwrap();
        assert_eq!(second, third);
    }

    #[test]
    fn test_go_to_page_resolves_to_page_object() {
        let mut writer = PdfWriter::new();
        writer.new_page(&PageConfig::letter()).unwrap();
        let second = writer.new_page(&PageConfig::letter()).unwrap();
        second.add_link(0.0, 0.0, 50.0, 20.0, Action::GoToPage(0)).unwrap();
        let content = text(&writer.finish().unwrap());
        assert!(content.contains("/S /GoTo"));
        assert!(content.contains("/Subtype /Link"));
    }

    #[test]
    fn test_out_of_range_page() {
        let mut writer = PdfWriter::new();
        assert!(matches!(writer.page_mut(3), Err(Error::InvalidArgument(_))));
    }
}
