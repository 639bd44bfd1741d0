//! Two-phase serialization protocol.
//!
//! A document write runs in two passes over every page. The numbering pass
//! hands out object numbers from [`SerializationContext::next_object_number`];
//! the writing pass records each object's byte offset and appends its bytes.
//! Pages never hold a pointer back to the document: the context is passed in
//! by the driver on every call.

use super::filters::{self, Filter};
use super::object_serializer::ObjectSerializer;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::collections::HashMap;
use std::io::Write;

/// Services the document driver provides to pages during a write.
pub trait SerializationContext {
    /// Hand out the next unused object number.
    fn next_object_number(&mut self) -> u32;

    /// Record that object `number` starts at the current position.
    fn record_offset(&mut self, number: u32) -> Result<()>;

    /// Append bytes to the output, returning the position they start at.
    fn append_bytes(&mut self, bytes: &[u8]) -> usize;

    /// Current output position in bytes.
    fn position(&self) -> usize;

    /// Reference of the page object at `index` in document order.
    fn page_reference(&self, index: usize) -> Option<ObjectRef>;

    /// Reference of the page tree root every page points at as `/Parent`.
    fn page_tree_root(&self) -> Option<ObjectRef>;

    /// Whether streams without a filter should be Flate-compressed.
    fn compress_streams(&self) -> bool {
        false
    }
}

/// In-memory context: output buffer, object counter, offset table.
#[derive(Debug, Default)]
pub struct WriteContext {
    output: Vec<u8>,
    next_number: u32,
    offsets: HashMap<u32, usize>,
    pages: Vec<ObjectRef>,
    page_tree_root: Option<ObjectRef>,
    compress: bool,
}

impl WriteContext {
    /// Empty context; the first number handed out is 1.
    pub fn new() -> Self {
        Self {
            next_number: 1,
            ..Self::default()
        }
    }

    /// Enable Flate compression of unfiltered streams.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Tell pages where the page tree root lives.
    pub fn set_page_tree_root(&mut self, root: ObjectRef) {
        self.page_tree_root = Some(root);
    }

    /// Publish the page object references in document order.
    pub fn set_page_references(&mut self, pages: Vec<ObjectRef>) {
        self.pages = pages;
    }

    /// One past the highest number handed out (the trailer `/Size`).
    pub fn size(&self) -> u32 {
        self.next_number
    }

    /// Offset recorded for `number`.
    pub fn offset_of(&self, number: u32) -> Option<usize> {
        self.offsets.get(&number).copied()
    }

    /// Bytes written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Take the output buffer.
    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// Append the cross-reference table and return its start offset.
    ///
    /// Every number handed out must have been written; a gap means some
    /// object was numbered and then skipped, which would leave a dangling
    /// reference in the file.
    pub fn write_xref(&mut self) -> Result<usize> {
        let start = self.output.len();
        let mut table = Vec::new();
        writeln!(table, "xref")?;
        writeln!(table, "0 {}", self.next_number)?;
        writeln!(table, "0000000000 65535 f ")?;
        for number in 1..self.next_number {
            let offset = self.offsets.get(&number).ok_or_else(|| {
                Error::SerializationFault(format!("object {} was numbered but never written", number))
            })?;
            writeln!(table, "{:010} 00000 n ", offset)?;
        }
        self.output.extend_from_slice(&table);
        Ok(start)
    }
}

impl SerializationContext for WriteContext {
    fn next_object_number(&mut self) -> u32 {
        let number = self.next_number;
        self.next_number += 1;
        number
    }

    fn record_offset(&mut self, number: u32) -> Result<()> {
        if number == 0 || number >= self.next_number {
            return Err(Error::SerializationFault(format!(
                "object {} was never numbered",
                number
            )));
        }
        if self.offsets.contains_key(&number) {
            return Err(Error::SerializationFault(format!("object {} written twice", number)));
        }
        log::trace!("object {} at offset {}", number, self.output.len());
        self.offsets.insert(number, self.output.len());
        Ok(())
    }

    fn append_bytes(&mut self, bytes: &[u8]) -> usize {
        let start = self.output.len();
        self.output.extend_from_slice(bytes);
        start
    }

    fn position(&self) -> usize {
        self.output.len()
    }

    fn page_reference(&self, index: usize) -> Option<ObjectRef> {
        self.pages.get(index).copied()
    }

    fn page_tree_root(&self) -> Option<ObjectRef> {
        self.page_tree_root
    }

    fn compress_streams(&self) -> bool {
        self.compress
    }
}

/// Record the offset of object `number` and append its definition.
pub fn write_indirect(ctx: &mut dyn SerializationContext, number: u32, obj: &Object) -> Result<()> {
    let obj = match obj {
        Object::Stream { dict, data } if ctx.compress_streams() && !dict.contains_key("Filter") => {
            let mut dict = dict.clone();
            let encoded = filters::encode(data, &[Filter::Flate])?;
            if let Some(filter) = filters::filter_entry(&[Filter::Flate]) {
                dict.insert("Filter".to_string(), filter);
            }
            Object::Stream {
                dict,
                data: encoded.into(),
            }
        },
        other => other.clone(),
    };
    ctx.record_offset(number)?;
    ctx.append_bytes(&ObjectSerializer::new().serialize_indirect(number, 0, &obj));
    Ok(())
}

/// Identifies the document an inherited object was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u32);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "document {}", self.0)
    }
}

/// Maps references from a source document into the output document.
pub trait ReferenceTranslator {
    /// Output reference for `reference` in `source`, if it has been imported.
    fn translate(&self, source: DocumentId, reference: ObjectRef) -> Option<ObjectRef>;
}

/// Translator for documents built from scratch.
///
/// Objects with no source document never reach the translator, so any
/// lookup here means an inherited object slipped through.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTranslation;

impl ReferenceTranslator for NoTranslation {
    fn translate(&self, _source: DocumentId, _reference: ObjectRef) -> Option<ObjectRef> {
        None
    }
}

/// Explicit mapping table filled by whoever imports the source objects.
#[derive(Debug, Default, Clone)]
pub struct ReferenceTable {
    map: HashMap<(DocumentId, ObjectRef), ObjectRef>,
}

impl ReferenceTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `from` in `source` to `to` in the output.
    pub fn insert(&mut self, source: DocumentId, from: ObjectRef, to: ObjectRef) {
        self.map.insert((source, from), to);
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl ReferenceTranslator for ReferenceTable {
    fn translate(&self, source: DocumentId, reference: ObjectRef) -> Option<ObjectRef> {
        self.map.get(&(source, reference)).copied()
    }
}

/// Rewrite every reference inside `obj` from `source` into the output document.
pub fn translate_object(
    obj: &Object,
    source: DocumentId,
    translator: &dyn ReferenceTranslator,
) -> Result<Object> {
    obj.map_references(&mut |reference| {
        translator.translate(source, reference).ok_or_else(|| {
            Error::SerializationFault(format!(
                "unresolved reference {} from {}",
                reference, source
            ))
        })
    })
}
