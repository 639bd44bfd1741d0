//! Page resource registry.
//!
//! Fonts, images and hatch patterns are registered by content fingerprint.
//! Registering the same fingerprint again returns the name handed out the
//! first time, so a resource drawn many times is written once. A registry can
//! be shared between pages through [`SharedRegistry`].

use super::font_manager::Font;
use super::image_handler::ImageData;
use super::pattern::HatchPattern;
use super::serialization::{write_indirect, SerializationContext};
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Registry shared by several pages.
pub type SharedRegistry = Arc<Mutex<ResourceRegistry>>;

/// Lock a shared registry, recovering from a poisoned lock.
pub fn lock_registry(shared: &SharedRegistry) -> MutexGuard<'_, ResourceRegistry> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resource category; decides the name prefix and the resource sub-dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `/Font`, names `F1`, `F2`, ...
    Font,
    /// `/XObject`, names `Im1`, `Im2`, ...
    XObject,
    /// `/Pattern`, names `P1`, `P2`, ...
    Pattern,
}

impl ResourceKind {
    /// Prefix of synthesized names.
    pub fn prefix(self) -> &'static str {
        match self {
            ResourceKind::Font => "F",
            ResourceKind::XObject => "Im",
            ResourceKind::Pattern => "P",
        }
    }

    /// Key of the sub-dictionary in `/Resources`.
    pub fn dict_key(self) -> &'static str {
        match self {
            ResourceKind::Font => "Font",
            ResourceKind::XObject => "XObject",
            ResourceKind::Pattern => "Pattern",
        }
    }

    fn index(self) -> usize {
        match self {
            ResourceKind::Font => 0,
            ResourceKind::XObject => 1,
            ResourceKind::Pattern => 2,
        }
    }
}

/// SHA-256 identity of a resource's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hash the given parts; each part is length-prefixed so boundaries matter.
    pub fn of(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint(")?;
        for byte in &self.0[..6] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..)")
    }
}

/// What gets written for a resource.
#[derive(Debug, Clone)]
pub enum ResourcePayload {
    /// Standard font dictionary
    Font(Font),
    /// Image XObject, with its soft mask if any
    Image(ImageData),
    /// Tiling pattern stream
    Pattern(HatchPattern),
}

impl ResourcePayload {
    fn has_soft_mask(&self) -> bool {
        matches!(self, ResourcePayload::Image(img) if img.soft_mask.is_some())
    }
}

#[derive(Debug)]
struct ResourceEntry {
    kind: ResourceKind,
    name: String,
    payload: ResourcePayload,
    number: Option<u32>,
    mask_number: Option<u32>,
    written: bool,
}

/// Fingerprint-keyed resources with collision-free names.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: IndexMap<Fingerprint, ResourceEntry>,
    by_name: HashMap<String, Fingerprint>,
    reserved: HashSet<String>,
    counters: [u32; 3],
}

impl ResourceRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a new registry for sharing between pages.
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Names that must never be synthesized (inherited or externally owned).
    pub fn reserve_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
    }

    /// Register a resource, building the payload only if the fingerprint is new.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_pagesmith::writer::{Font, FontFamily, ResourceRegistry};
    ///
    /// let mut registry = ResourceRegistry::new();
    /// let font = Font::new(FontFamily::Helvetica, 10.0);
    /// let first = registry.register_font(&font);
    /// let again = registry.register_font(&font);
    /// assert_eq!(first, "F1");
    /// assert_eq!(first, again);
    /// assert_eq!(registry.len(), 1);
    /// ```
    pub fn register<F>(&mut self, kind: ResourceKind, fingerprint: Fingerprint, payload: F) -> String
    where
        F: FnOnce() -> ResourcePayload,
    {
        if let Some(entry) = self.entries.get(&fingerprint) {
            return entry.name.clone();
        }

        let name = self.synthesize_name(kind);
        log::debug!("registered {} resource {} ({:?})", kind.dict_key(), name, fingerprint);
        self.by_name.insert(name.clone(), fingerprint);
        self.entries.insert(
            fingerprint,
            ResourceEntry {
                kind,
                name: name.clone(),
                payload: payload(),
                number: None,
                mask_number: None,
                written: false,
            },
        );
        name
    }

    /// Register a standard font.
    pub fn register_font(&mut self, font: &Font) -> String {
        let fingerprint = Fingerprint::of(&[b"font", &font.fingerprint_bytes()]);
        self.register(ResourceKind::Font, fingerprint, || ResourcePayload::Font(*font))
    }

    /// Register an image XObject.
    pub fn register_image(&mut self, image: &ImageData) -> String {
        self.register(ResourceKind::XObject, image.fingerprint(), || {
            ResourcePayload::Image(image.clone())
        })
    }

    /// Register a hatch pattern.
    pub fn register_pattern(&mut self, pattern: &HatchPattern) -> String {
        self.register(ResourceKind::Pattern, pattern.fingerprint, || {
            ResourcePayload::Pattern(pattern.clone())
        })
    }

    fn synthesize_name(&mut self, kind: ResourceKind) -> String {
        let counter = &mut self.counters[kind.index()];
        *counter += 1;
        let base = format!("{}{}", kind.prefix(), counter);
        if !self.is_taken(&base) {
            return base;
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if !self.is_taken(&candidate) {
                log::debug!("resource name {} taken, using {}", base, candidate);
                return candidate;
            }
            suffix += 1;
        }
    }

    fn is_taken(&self, name: &str) -> bool {
        self.reserved.contains(name) || self.by_name.contains_key(name)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kind of the resource registered under `name`.
    pub fn kind_of(&self, name: &str) -> Option<ResourceKind> {
        self.entry(name).map(|e| e.kind)
    }

    /// Object reference of `name`, once numbered.
    pub fn reference_of(&self, name: &str) -> Option<ObjectRef> {
        self.entry(name)
            .and_then(|e| e.number)
            .map(|n| ObjectRef::new(n, 0))
    }

    fn entry(&self, name: &str) -> Option<&ResourceEntry> {
        self.by_name.get(name).and_then(|fp| self.entries.get(fp))
    }

    /// Number every listed resource that has no number yet.
    pub fn assign_numbers(&mut self, ctx: &mut dyn SerializationContext, names: &[String]) -> Result<()> {
        for name in names {
            let fingerprint = *self.by_name.get(name).ok_or_else(|| {
                Error::SerializationFault(format!("resource {} is not registered", name))
            })?;
            let Some(entry) = self.entries.get_mut(&fingerprint) else {
                continue;
            };
            if entry.number.is_none() {
                entry.number = Some(ctx.next_object_number());
                if entry.payload.has_soft_mask() {
                    entry.mask_number = Some(ctx.next_object_number());
                }
            }
        }
        Ok(())
    }

    /// Write every listed resource not written yet in this pass.
    pub fn write(&mut self, ctx: &mut dyn SerializationContext, names: &[String]) -> Result<()> {
        for name in names {
            let Some(fingerprint) = self.by_name.get(name).copied() else {
                return Err(Error::SerializationFault(format!("resource {} is not registered", name)));
            };
            let Some(entry) = self.entries.get_mut(&fingerprint) else {
                continue;
            };
            if entry.written {
                continue;
            }
            let number = entry.number.ok_or_else(|| {
                Error::SerializationFault(format!("resource {} written before numbering", name))
            })?;
            match &entry.payload {
                ResourcePayload::Font(font) => {
                    write_indirect(ctx, number, &font.resource_object())?;
                },
                ResourcePayload::Image(image) => {
                    let mask_ref = match (entry.mask_number, image.soft_mask_xobject()) {
                        (Some(mask_number), Some(mask)) => {
                            write_indirect(ctx, mask_number, &mask)?;
                            Some(ObjectRef::new(mask_number, 0))
                        },
                        _ => None,
                    };
                    write_indirect(ctx, number, &image.xobject(mask_ref))?;
                },
                ResourcePayload::Pattern(pattern) => {
                    write_indirect(ctx, number, &pattern.object())?;
                },
            }
            entry.written = true;
        }
        Ok(())
    }

    /// `/Resources` sub-dictionaries for the listed names.
    pub fn resource_dict(&self, names: &[String]) -> Result<IndexMap<ResourceKind, Dictionary>> {
        let mut out: IndexMap<ResourceKind, Dictionary> = IndexMap::new();
        for name in names {
            let entry = self
                .entry(name)
                .ok_or_else(|| Error::SerializationFault(format!("resource {} is not registered", name)))?;
            let number = entry.number.ok_or_else(|| {
                Error::SerializationFault(format!("resource {} has no object number", name))
            })?;
            out.entry(entry.kind)
                .or_default()
                .insert(name.clone(), Object::Reference(ObjectRef::new(number, 0)));
        }
        Ok(out)
    }

    /// Forget numbers and written flags; entries and names are kept.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.number = None;
            entry.mask_number = None;
            entry.written = false;
        }
    }
}
