//! Integration tests for the two-phase serialization protocol.
//!
//! Covers numbering order, offset tables, resets between passes, shared
//! resources and annotations, and pages imported from a parsed document.

use flate2::read::ZlibDecoder;
use pdf_pagesmith::config::PageConfig;
use pdf_pagesmith::object::{Dictionary, Object, ObjectRef};
use pdf_pagesmith::writer::{
    lock_annotation, Action, Annotation, DocumentId, NoTranslation, Page, PageTree, PaintMode, PdfWriter,
    PdfWriterConfig, ReferenceTable, ResourceRegistry, SerializationContext, WriteContext,
};
use pdf_pagesmith::geometry::Rect;
use pdf_pagesmith::Error;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

/// Every xref entry must point at the matching `n 0 obj` header.
fn assert_xref_valid(bytes: &[u8]) {
    let text = lossy(bytes);
    let startxref = text.rfind("startxref\n").unwrap();
    let xref_offset: usize = text[startxref + 10..].lines().next().unwrap().trim().parse().unwrap();
    assert!(bytes[xref_offset..].starts_with(b"xref\n"));

    let table = lossy(&bytes[xref_offset..]);
    let mut lines = table.lines().skip(1);
    let header = lines.next().unwrap();
    let count: usize = header.split_whitespace().nth(1).unwrap().parse().unwrap();
    let entries: Vec<&str> = lines.take(count).collect();
    assert_eq!(entries[0], "0000000000 65535 f ");
    for (number, entry) in entries.iter().enumerate().skip(1) {
        let offset: usize = entry[..10].parse().unwrap();
        let expected = format!("{} 0 obj\n", number);
        assert!(
            bytes[offset..].starts_with(expected.as_bytes()),
            "xref entry {} points at {:?}",
            number,
            lossy(&bytes[offset..(offset + 12).min(bytes.len())])
        );
    }
    assert!(text.contains(&format!("/Size {}", count)));
}

fn rect(x: i64, y: i64, w: i64, h: i64) -> Object {
    Object::Array(vec![Object::Integer(x), Object::Integer(y), Object::Integer(w), Object::Integer(h)])
}

fn name(n: &str) -> Object {
    Object::Name(n.to_string())
}

mod protocol_tests {
    use super::*;

    #[test]
    fn test_numbering_order_resources_actions_annotations_content_page() {
        init_logging();
        let mut page = Page::new(&PageConfig::letter()).unwrap();
        page.write_text("Hi").unwrap();
        page.add_link(0.0, 0.0, 20.0, 10.0, Action::Uri("https://example.com".to_string()))
            .unwrap();
        page.set_open_action(Action::Named("FirstPage".to_string())).unwrap();

        let mut ctx = WriteContext::new();
        ctx.set_page_tree_root(ObjectRef::new(100, 0));
        page.assign_numbers(&mut ctx).unwrap();
        // font 1, open action 2, link action 3, annotation 4, content 5, page 6
        assert_eq!(page.object_ref(), Some(ObjectRef::new(6, 0)));
        assert_eq!(ctx.size(), 7);

        page.serialize(&mut ctx, &NoTranslation).unwrap();
        let out = lossy(ctx.output());
        assert!(out.contains("/O 2 0 R"));
        assert!(out.contains("/A 3 0 R"));
        assert!(out.contains("/Annots [4 0 R]"));
        assert!(out.contains("/Contents 5 0 R"));
        for n in 1..=6 {
            assert!(ctx.offset_of(n).is_some(), "object {} has no offset", n);
        }
    }

    #[test]
    fn test_serialize_without_numbering_is_invalid_state() {
        let mut page = Page::new(&PageConfig::letter()).unwrap();
        let mut ctx = WriteContext::new();
        let err = page.serialize(&mut ctx, &NoTranslation).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert!(!err.is_fatal_to_write());
    }

    #[test]
    fn test_second_serialize_in_one_pass_is_fault() {
        let mut page = Page::new(&PageConfig::letter()).unwrap();
        page.write_text("once").unwrap();
        let mut ctx = WriteContext::new();
        ctx.set_page_tree_root(ObjectRef::new(9, 0));
        page.assign_numbers(&mut ctx).unwrap();
        page.serialize(&mut ctx, &NoTranslation).unwrap();

        let err = page.serialize(&mut ctx, &NoTranslation).unwrap_err();
        assert!(matches!(err, Error::SerializationFault(_)));
        assert!(err.is_fatal_to_write());
    }

    #[test]
    fn test_reset_keeps_shared_registry_numbered_for_siblings() {
        let registry = ResourceRegistry::shared();
        let mut first = Page::new(&PageConfig::letter())
            .unwrap()
            .with_registry(Arc::clone(&registry))
            .unwrap();
        let mut second = Page::new(&PageConfig::letter())
            .unwrap()
            .with_registry(Arc::clone(&registry))
            .unwrap();
        first.write_text("one").unwrap();
        second.write_text("two").unwrap();

        let mut ctx = WriteContext::new();
        ctx.set_page_tree_root(ObjectRef::new(50, 0));
        first.assign_numbers(&mut ctx).unwrap();
        second.assign_numbers(&mut ctx).unwrap();
        first.serialize(&mut ctx, &NoTranslation).unwrap();
        first.reset();

        second.serialize(&mut ctx, &NoTranslation).unwrap();
        let out = lossy(ctx.output());
        assert_eq!(out.matches("/Subtype /Type1").count(), 1);
        assert_eq!(out.matches("/F1 1 0 R").count(), 2);
    }

    #[test]
    fn test_missing_page_tree_root_is_fault() {
        let mut page = Page::new(&PageConfig::letter()).unwrap();
        let mut ctx = WriteContext::new();
        page.assign_numbers(&mut ctx).unwrap();
        let err = page.serialize(&mut ctx, &NoTranslation).unwrap_err();
        assert!(matches!(err, Error::SerializationFault(_)));
    }

    #[test]
    fn test_reset_twice_is_noop() {
        let mut page = Page::new(&PageConfig::letter()).unwrap();
        page.draw_rect(0.0, 0.0, 10.0, 10.0, PaintMode::Stroke).unwrap();
        page.reset();
        // Unset pages keep their content
        assert!(!page.content_bytes().is_empty());

        let mut ctx = WriteContext::new();
        ctx.set_page_tree_root(ObjectRef::new(9, 0));
        page.assign_numbers(&mut ctx).unwrap();
        page.serialize(&mut ctx, &NoTranslation).unwrap();
        page.reset();
        let after_first = (page.content_bytes(), page.resource_names(), page.object_ref());
        page.reset();
        let after_second = (page.content_bytes(), page.resource_names(), page.object_ref());
        assert_eq!(after_first, after_second);
        assert_eq!(after_first.2, None);
    }

    #[test]
    fn test_mutation_after_numbering_is_rejected() {
        let mut page = Page::new(&PageConfig::letter()).unwrap();
        let mut ctx = WriteContext::new();
        page.assign_numbers(&mut ctx).unwrap();
        assert!(matches!(
            page.draw_rect(0.0, 0.0, 5.0, 5.0, PaintMode::Fill),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            page.set_close_action(Action::Named("LastPage".to_string())),
            Err(Error::InvalidState(_))
        ));
    }
}

mod document_tests {
    use super::*;

    #[test]
    fn test_document_xref_is_exact() {
        init_logging();
        let mut writer = PdfWriter::with_config(PdfWriterConfig::default().with_title("Offsets"));
        for i in 0..3 {
            let page = writer.new_page(&PageConfig::letter()).unwrap();
            page.write_text(&format!("Page {}", i + 1)).unwrap();
            page.draw_ellipse(100.0, 100.0, 50.0, 30.0, PaintMode::FillStroke).unwrap();
        }
        let bytes = writer.finish().unwrap();
        assert_xref_valid(&bytes);
        assert!(lossy(&bytes).contains("/Count 3"));
    }

    #[test]
    fn test_compressed_content_inflates_to_operators() {
        let mut writer = PdfWriter::with_config(PdfWriterConfig::default().with_compress(true));
        writer
            .new_page(&PageConfig::letter())
            .unwrap()
            .draw_rect(0.0, 0.0, 100.0, 50.0, PaintMode::FillStroke)
            .unwrap();
        let bytes = writer.finish().unwrap();
        assert_xref_valid(&bytes);

        let text = lossy(&bytes);
        assert!(text.contains("/Filter /FlateDecode"));
        let marker = b"stream\n";
        let start = bytes.windows(marker.len()).position(|w| w == marker).unwrap() + marker.len();
        let end = bytes[start..].windows(10).position(|w| w == b"\nendstream").unwrap() + start;
        let mut decoded = String::new();
        ZlibDecoder::new(&bytes[start..end]).read_to_string(&mut decoded).unwrap();
        assert!(decoded.contains("0 742 100 50 re\nB\n"));
    }

    #[test]
    fn test_writer_is_reusable_after_write() {
        let mut writer = PdfWriter::new();
        let page = writer.new_page(&PageConfig::letter()).unwrap();
        page.add_annotation(
            Annotation::link_named(Rect::new(10.0, 10.0, 50.0, 20.0), "NextPage")
                .reusable()
                .into_shared(),
        )
        .unwrap();
        page.write_text("drawn once").unwrap();

        let first = writer.write().unwrap();
        assert!(lossy(&first).contains("(drawn once) Tj"));
        assert_xref_valid(&first);

        let second = writer.write().unwrap();
        assert_xref_valid(&second);
        let text = lossy(&second);
        assert!(!text.contains("drawn once"));
        assert!(text.contains("/N /NextPage"));
    }

    #[test]
    fn test_shared_annotation_written_once() {
        let annotation = Annotation::link_uri(Rect::new(0.0, 0.0, 100.0, 20.0), "https://example.com")
            .reusable()
            .into_shared();
        let mut writer = PdfWriter::new();
        for _ in 0..2 {
            writer
                .new_page(&PageConfig::letter())
                .unwrap()
                .add_annotation(Arc::clone(&annotation))
                .unwrap();
        }
        let bytes = writer.write().unwrap();
        assert_xref_valid(&bytes);
        let text = lossy(&bytes);
        assert_eq!(text.matches("/Subtype /Link").count(), 1);
        assert_eq!(lock_annotation(&annotation).number(), None);
    }

    #[test]
    fn test_link_to_missing_page_fails_and_resets() {
        let mut writer = PdfWriter::new();
        writer
            .new_page(&PageConfig::letter())
            .unwrap()
            .add_link(0.0, 0.0, 10.0, 10.0, Action::GoToPage(7))
            .unwrap();
        let err = writer.write().unwrap_err();
        assert!(err.is_fatal_to_write());
        assert!(!writer.page_mut(0).unwrap().is_numbered());
    }

    #[test]
    fn test_separate_registries_number_independently() {
        let mut writer = PdfWriter::new();
        let mut own = Page::new(&PageConfig::letter()).unwrap();
        own.write_text("private").unwrap();
        writer.add_page(own).unwrap();
        writer.new_page(&PageConfig::letter()).unwrap().write_text("shared").unwrap();
        let bytes = writer.finish().unwrap();
        assert_xref_valid(&bytes);
        // Both registries name their font F1; each page points at its own object
        assert_eq!(lossy(&bytes).matches("/Type /Font").count(), 2);
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let mut writer = PdfWriter::new();
        writer.new_page(&PageConfig::a4()).unwrap().write_text("saved").unwrap();
        writer.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        assert!(bytes.ends_with(b"%%EOF"));
        assert_xref_valid(&bytes);
    }

    #[test]
    fn test_save_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PdfWriter::new();
        let err = writer.save(dir.path().join("missing").join("out.pdf")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

mod import_tests {
    use super::*;

    const SOURCE: DocumentId = DocumentId(3);

    /// Two-page source: resources and MediaBox on the root, crop and rotation on page 2.
    fn source_objects() -> (HashMap<ObjectRef, Object>, ObjectRef) {
        let root = ObjectRef::new(1, 0);
        let first = ObjectRef::new(2, 0);
        let second = ObjectRef::new(3, 0);
        let font = ObjectRef::new(4, 0);
        let content = ObjectRef::new(5, 0);
        let annot = ObjectRef::new(6, 0);

        let mut fonts = Dictionary::new();
        fonts.insert("F1".to_string(), Object::Reference(font));
        let mut resources = Dictionary::new();
        resources.insert("Font".to_string(), Object::Dictionary(fonts));

        let mut root_dict = Dictionary::new();
        root_dict.insert("Type".to_string(), name("Pages"));
        root_dict.insert(
            "Kids".to_string(),
            Object::Array(vec![Object::Reference(first), Object::Reference(second)]),
        );
        root_dict.insert("Count".to_string(), Object::Integer(2));
        root_dict.insert("MediaBox".to_string(), rect(0, 0, 400, 600));
        root_dict.insert("Resources".to_string(), Object::Dictionary(resources));

        let mut first_dict = Dictionary::new();
        first_dict.insert("Type".to_string(), name("Page"));
        first_dict.insert("Parent".to_string(), Object::Reference(root));
        first_dict.insert("Contents".to_string(), Object::Reference(content));
        first_dict.insert("Annots".to_string(), Object::Array(vec![Object::Reference(annot)]));

        let mut second_dict = Dictionary::new();
        second_dict.insert("Type".to_string(), name("Page"));
        second_dict.insert("Parent".to_string(), Object::Reference(root));
        second_dict.insert("CropBox".to_string(), rect(10, 20, 390, 580));
        second_dict.insert("Rotate".to_string(), Object::Integer(90));

        let mut annot_dict = Dictionary::new();
        annot_dict.insert("Type".to_string(), name("Annot"));
        annot_dict.insert("Subtype".to_string(), name("Text"));
        annot_dict.insert("Rect".to_string(), rect(0, 0, 20, 20));
        annot_dict.insert("P".to_string(), Object::Reference(first));

        let mut objects = HashMap::new();
        objects.insert(root, Object::Dictionary(root_dict));
        objects.insert(first, Object::Dictionary(first_dict));
        objects.insert(second, Object::Dictionary(second_dict));
        objects.insert(
            content,
            Object::Stream {
                dict: Dictionary::new(),
                data: bytes::Bytes::from_static(b"BT /F1 12 Tf 10 10 Td (old) Tj ET"),
            },
        );
        objects.insert(annot, Object::Dictionary(annot_dict));
        (objects, root)
    }

    #[test]
    fn test_imported_page_keeps_content_and_renames_new_resources() {
        init_logging();
        let (objects, root) = source_objects();
        let tree = PageTree::from_objects(&objects, root, SOURCE).unwrap();
        let pages = tree.pages();
        assert_eq!(pages.len(), 2);

        let registry = ResourceRegistry::shared();
        let mut page = Page::from_tree(&tree, pages[0], &objects)
            .unwrap()
            .with_registry(Arc::clone(&registry))
            .unwrap();
        assert_eq!((page.width(), page.height()), (400.0, 600.0));
        assert_eq!(page.annotation_count(), 1);

        page.write_text("new").unwrap();
        assert_eq!(page.resource_names(), vec!["F1_1".to_string()]);
        let content = String::from_utf8(page.content_bytes()).unwrap();
        let old = content.find("(old) Tj").unwrap();
        let new = content.find("(new) Tj").unwrap();
        assert!(old < new);

        let mut table = ReferenceTable::new();
        table.insert(SOURCE, ObjectRef::new(4, 0), ObjectRef::new(40, 0));
        let mut writer = PdfWriter::new().with_translator(table);
        writer.add_page(page).unwrap();
        let bytes = writer.finish().unwrap();
        assert_xref_valid(&bytes);
        let text = lossy(&bytes);
        assert!(text.contains("/F1 40 0 R"));
        assert!(text.contains("/Subtype /Text"));
        // Back-pointer to the source page is dropped
        assert!(!text.contains("/P 2 0 R"));
    }

    #[test]
    fn test_imported_crop_and_rotation() {
        let (objects, root) = source_objects();
        let tree = PageTree::from_objects(&objects, root, SOURCE).unwrap();
        let page = Page::from_tree(&tree, tree.pages()[1], &objects).unwrap();
        // Sideways: displayed size is 600x400 minus the crop
        assert_eq!(page.writable_width(), 560.0);
        assert_eq!(page.writable_height(), 380.0);

        let mut table = ReferenceTable::new();
        table.insert(SOURCE, ObjectRef::new(4, 0), ObjectRef::new(40, 0));
        let mut ctx = WriteContext::new();
        ctx.set_page_tree_root(ObjectRef::new(50, 0));
        let mut page = page;
        page.assign_numbers(&mut ctx).unwrap();
        page.serialize(&mut ctx, &table).unwrap();
        let text = lossy(ctx.output());
        assert!(text.contains("/CropBox [10 20 390 580]"));
        assert!(text.contains("/Rotate 90"));
    }

    #[test]
    fn test_untranslated_inherited_reference_is_fault() {
        let (objects, root) = source_objects();
        let tree = PageTree::from_objects(&objects, root, SOURCE).unwrap();
        let page = Page::from_tree(&tree, tree.pages()[1], &objects).unwrap();
        let mut writer = PdfWriter::new();
        writer.add_page(page).unwrap();
        let err = writer.write().unwrap_err();
        assert!(matches!(err, Error::SerializationFault(_)));
    }

    #[test]
    fn test_page_tree_cycle_is_detected() {
        let root = ObjectRef::new(1, 0);
        let mut root_dict = Dictionary::new();
        root_dict.insert("Type".to_string(), name("Pages"));
        root_dict.insert("Kids".to_string(), Object::Array(vec![Object::Reference(root)]));
        let mut objects = HashMap::new();
        objects.insert(root, Object::Dictionary(root_dict));
        let err = PageTree::from_objects(&objects, root, SOURCE).unwrap_err();
        assert!(matches!(err, Error::CircularReference(r) if r == root));
    }

    #[test]
    fn test_custom_context_sees_every_object() {
        struct CountingContext {
            inner: WriteContext,
            recorded: Vec<u32>,
        }

        impl SerializationContext for CountingContext {
            fn next_object_number(&mut self) -> u32 {
                self.inner.next_object_number()
            }
            fn record_offset(&mut self, number: u32) -> pdf_pagesmith::Result<()> {
                self.recorded.push(number);
                self.inner.record_offset(number)
            }
            fn append_bytes(&mut self, bytes: &[u8]) -> usize {
                self.inner.append_bytes(bytes)
            }
            fn position(&self) -> usize {
                self.inner.position()
            }
            fn page_reference(&self, index: usize) -> Option<ObjectRef> {
                self.inner.page_reference(index)
            }
            fn page_tree_root(&self) -> Option<ObjectRef> {
                Some(ObjectRef::new(99, 0))
            }
        }

        let mut ctx = CountingContext {
            inner: WriteContext::new(),
            recorded: Vec::new(),
        };
        let mut page = Page::new(&PageConfig::letter()).unwrap();
        page.write_text("abc").unwrap();
        page.assign_numbers(&mut ctx).unwrap();
        page.serialize(&mut ctx, &NoTranslation).unwrap();
        let mut recorded = ctx.recorded.clone();
        recorded.sort_unstable();
        assert_eq!(recorded, vec![1, 2, 3]);
        // Page dictionary is the last object written
        assert_eq!(ctx.recorded.last(), Some(&3));
    }
}
