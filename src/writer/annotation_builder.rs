//! Annotations and actions attached to a page.
//!
//! Link and text-note annotations are built here, along with the actions
//! they trigger and the page open/close actions in `/AA`. Actions and
//! annotations are indirect objects numbered by the page during the
//! numbering pass. An annotation marked reusable survives
//! [`Page::reset`](super::page::Page::reset) and can be shared between
//! pages through [`SharedAnnotation`].

use super::graphics_state::Color;
use super::serialization::{translate_object, write_indirect, DocumentId, ReferenceTranslator, SerializationContext};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::object::{Dictionary, Object, ObjectRef};
use std::sync::{Arc, Mutex, MutexGuard};

/// An annotation shared between pages or kept across writes.
pub type SharedAnnotation = Arc<Mutex<Annotation>>;

/// Lock a shared annotation, recovering from a poisoned lock.
pub fn lock_annotation(shared: &SharedAnnotation) -> MutexGuard<'_, Annotation> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Border style for annotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderStyle {
    /// Horizontal corner radius
    pub horizontal_radius: f64,
    /// Vertical corner radius
    pub vertical_radius: f64,
    /// Border width
    pub width: f64,
    /// Dash and gap lengths (if dashed)
    pub dash: Option<(f64, f64)>,
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self {
            horizontal_radius: 0.0,
            vertical_radius: 0.0,
            width: 0.0,
            dash: None,
        }
    }
}

impl BorderStyle {
    /// No visible border.
    pub fn none() -> Self {
        Self::default()
    }

    /// Solid border with the given width.
    pub fn solid(width: f64) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    /// Dashed border.
    pub fn dashed(width: f64, dash_length: f64, gap_length: f64) -> Self {
        Self {
            width,
            dash: Some((dash_length, gap_length)),
            ..Default::default()
        }
    }

    /// The `/Border` array.
    pub fn to_border_array(&self) -> Object {
        let mut arr = vec![
            Object::Real(self.horizontal_radius),
            Object::Real(self.vertical_radius),
            Object::Real(self.width),
        ];
        if let Some((dash, gap)) = self.dash {
            arr.push(Object::Array(vec![Object::Real(dash), Object::Real(gap)]));
        }
        Object::Array(arr)
    }
}

/// Highlight mode for link annotations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HighlightMode {
    /// No highlighting (N)
    None,
    /// Invert the contents of the annotation rectangle (I)
    #[default]
    Invert,
    /// Invert the annotation's border (O)
    Outline,
    /// Display the annotation as if it were being pushed (P)
    Push,
}

impl HighlightMode {
    /// PDF name for this highlight mode.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            HighlightMode::None => "N",
            HighlightMode::Invert => "I",
            HighlightMode::Outline => "O",
            HighlightMode::Push => "P",
        }
    }
}

/// What happens when an action fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Open a URI
    Uri(String),
    /// Jump to a page of the output document (0-indexed)
    GoToPage(usize),
    /// Named action such as `NextPage` or `Print`
    Named(String),
    /// Run JavaScript
    JavaScript(String),
    /// Action dictionary taken from another document
    Raw {
        /// Action dictionary as parsed
        object: Object,
        /// Document its references belong to
        source: DocumentId,
    },
}

impl Action {
    /// Build the action dictionary for the output document.
    pub fn object(&self, ctx: &dyn SerializationContext, translator: &dyn ReferenceTranslator) -> Result<Object> {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::Name("Action".to_string()));
        match self {
            Action::Uri(uri) => {
                dict.insert("S".to_string(), Object::Name("URI".to_string()));
                dict.insert("URI".to_string(), Object::String(uri.as_bytes().to_vec()));
            },
            Action::GoToPage(page) => {
                let page_ref = ctx.page_reference(*page).ok_or_else(|| {
                    Error::SerializationFault(format!("link target page {} does not exist", page))
                })?;
                dict.insert("S".to_string(), Object::Name("GoTo".to_string()));
                dict.insert(
                    "D".to_string(),
                    Object::Array(vec![Object::Reference(page_ref), Object::Name("Fit".to_string())]),
                );
            },
            Action::Named(name) => {
                dict.insert("S".to_string(), Object::Name("Named".to_string()));
                dict.insert("N".to_string(), Object::Name(name.clone()));
            },
            Action::JavaScript(script) => {
                dict.insert("S".to_string(), Object::Name("JavaScript".to_string()));
                dict.insert("JS".to_string(), Object::String(script.as_bytes().to_vec()));
            },
            Action::Raw { object, source } => return translate_object(object, *source, translator),
        }
        Ok(Object::Dictionary(dict))
    }
}

/// An action stored as its own numbered object.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberedAction {
    /// The action
    pub action: Action,
    number: Option<u32>,
}

impl NumberedAction {
    /// Wrap an action; it has no number yet.
    pub fn new(action: Action) -> Self {
        Self { action, number: None }
    }

    /// Object number, once assigned.
    pub fn number(&self) -> Option<u32> {
        self.number
    }

    /// Take a number unless one was assigned already.
    pub fn assign_number(&mut self, ctx: &mut dyn SerializationContext) -> u32 {
        *self.number.get_or_insert_with(|| ctx.next_object_number())
    }

    /// Write the action object.
    pub fn write(&self, ctx: &mut dyn SerializationContext, translator: &dyn ReferenceTranslator) -> Result<()> {
        let number = self
            .number
            .ok_or_else(|| Error::SerializationFault("action written before numbering".to_string()))?;
        let obj = self.action.object(ctx, translator)?;
        write_indirect(ctx, number, &obj)
    }

    /// Forget the number.
    pub fn reset(&mut self) {
        self.number = None;
    }
}

/// Event that triggers a page action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageActionTrigger {
    /// The page is opened (`/O`)
    Open,
    /// The page is closed (`/C`)
    Close,
}

impl PageActionTrigger {
    /// Key in the `/AA` dictionary.
    pub fn key(self) -> &'static str {
        match self {
            PageActionTrigger::Open => "O",
            PageActionTrigger::Close => "C",
        }
    }
}

/// Annotation subtypes this crate writes.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationKind {
    /// Clickable area
    Link {
        /// Action fired on click
        action: NumberedAction,
        /// Highlight mode
        highlight: HighlightMode,
    },
    /// Sticky note
    Text {
        /// Note contents
        contents: String,
        /// Icon name (`Note`, `Comment`, ...)
        icon: String,
        /// Whether the popup starts open
        open: bool,
    },
    /// Annotation dictionary copied from another document
    Raw {
        /// Dictionary as parsed
        dict: Dictionary,
        /// Document its references belong to
        source: DocumentId,
    },
}

/// A page annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Rectangle in PDF space
    pub rect: Rect,
    /// Subtype and payload
    pub kind: AnnotationKind,
    /// Border style
    pub border: BorderStyle,
    /// Border/icon color
    pub color: Option<Color>,
    reusable: bool,
    number: Option<u32>,
    written: bool,
}

impl Annotation {
    fn with_kind(rect: Rect, kind: AnnotationKind) -> Self {
        Self {
            rect,
            kind,
            border: BorderStyle::none(),
            color: None,
            reusable: false,
            number: None,
            written: false,
        }
    }

    /// Link that opens a URI.
    pub fn link_uri(rect: Rect, uri: impl Into<String>) -> Self {
        Self::link(rect, Action::Uri(uri.into()))
    }

    /// Link that jumps to a page of the output document.
    pub fn link_to_page(rect: Rect, page: usize) -> Self {
        Self::link(rect, Action::GoToPage(page))
    }

    /// Link that runs a named action.
    pub fn link_named(rect: Rect, name: impl Into<String>) -> Self {
        Self::link(rect, Action::Named(name.into()))
    }

    /// Link with an arbitrary action.
    pub fn link(rect: Rect, action: Action) -> Self {
        Self::with_kind(
            rect,
            AnnotationKind::Link {
                action: NumberedAction::new(action),
                highlight: HighlightMode::default(),
            },
        )
    }

    /// Sticky note.
    pub fn text_note(rect: Rect, contents: impl Into<String>) -> Self {
        Self::with_kind(
            rect,
            AnnotationKind::Text {
                contents: contents.into(),
                icon: "Note".to_string(),
                open: false,
            },
        )
        .with_color(Color::rgb(1.0, 1.0, 0.0))
    }

    /// Annotation dictionary parsed from another document.
    ///
    /// The rectangle is read from `/Rect`; a missing one is an error.
    pub fn raw(dict: Dictionary, source: DocumentId) -> Result<Self> {
        let [llx, lly, urx, ury] = dict
            .get("Rect")
            .and_then(|r| r.as_rect())
            .ok_or_else(|| Error::InvalidArgument("annotation has no /Rect".to_string()))?;
        let rect = Rect::new(llx, lly, urx - llx, ury - lly).normalized();
        Ok(Self::with_kind(rect, AnnotationKind::Raw { dict, source }))
    }

    /// Set the border style.
    pub fn with_border(mut self, border: BorderStyle) -> Self {
        self.border = border;
        self
    }

    /// Set the color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Keep this annotation across page resets.
    pub fn reusable(mut self) -> Self {
        self.reusable = true;
        self
    }

    /// Wrap for sharing.
    pub fn into_shared(self) -> SharedAnnotation {
        Arc::new(Mutex::new(self))
    }

    /// Whether this annotation survives a page reset.
    pub fn is_reusable(&self) -> bool {
        self.reusable
    }

    /// Object number, once assigned.
    pub fn number(&self) -> Option<u32> {
        self.number
    }

    /// Number the link action (if any), then the annotation itself.
    ///
    /// An annotation numbered through another page keeps its numbers.
    pub fn assign_actions(&mut self, ctx: &mut dyn SerializationContext) {
        if let AnnotationKind::Link { action, .. } = &mut self.kind {
            action.assign_number(ctx);
        }
    }

    /// Number the annotation object.
    pub fn assign_number(&mut self, ctx: &mut dyn SerializationContext) -> u32 {
        *self.number.get_or_insert_with(|| ctx.next_object_number())
    }

    /// The annotation dictionary for the output document.
    pub fn object(&self, translator: &dyn ReferenceTranslator) -> Result<Object> {
        let mut dict = match &self.kind {
            AnnotationKind::Raw { dict, source } => {
                return translate_object(&Object::Dictionary(dict.clone()), *source, translator);
            },
            _ => Dictionary::new(),
        };

        dict.insert("Type".to_string(), Object::Name("Annot".to_string()));
        let r = self.rect;
        dict.insert(
            "Rect".to_string(),
            Object::Array(vec![
                Object::Real(r.left()),
                Object::Real(r.top()),
                Object::Real(r.right()),
                Object::Real(r.bottom()),
            ]),
        );
        dict.insert("Border".to_string(), self.border.to_border_array());
        if let Some(color) = self.color {
            dict.insert(
                "C".to_string(),
                Object::Array(color.components().into_iter().map(Object::Real).collect()),
            );
        }

        match &self.kind {
            AnnotationKind::Link { action, highlight } => {
                let number = action.number().ok_or_else(|| {
                    Error::SerializationFault("link action has no object number".to_string())
                })?;
                dict.insert("Subtype".to_string(), Object::Name("Link".to_string()));
                dict.insert("H".to_string(), Object::Name(highlight.pdf_name().to_string()));
                dict.insert("A".to_string(), Object::Reference(ObjectRef::new(number, 0)));
            },
            AnnotationKind::Text { contents, icon, open } => {
                dict.insert("Subtype".to_string(), Object::Name("Text".to_string()));
                dict.insert("Contents".to_string(), Object::String(contents.as_bytes().to_vec()));
                dict.insert("Name".to_string(), Object::Name(icon.clone()));
                dict.insert("Open".to_string(), Object::Boolean(*open));
            },
            AnnotationKind::Raw { .. } => {},
        }
        Ok(Object::Dictionary(dict))
    }

    /// Write the link action (if any) and the annotation, once per pass.
    pub fn write(&mut self, ctx: &mut dyn SerializationContext, translator: &dyn ReferenceTranslator) -> Result<()> {
        if self.written {
            return Ok(());
        }
        let number = self
            .number
            .ok_or_else(|| Error::SerializationFault("annotation written before numbering".to_string()))?;
        if let AnnotationKind::Link { action, .. } = &self.kind {
            action.write(ctx, translator)?;
        }
        let obj = self.object(translator)?;
        write_indirect(ctx, number, &obj)?;
        self.written = true;
        Ok(())
    }

    /// Clear numbers so the annotation can be written again.
    pub fn reset(&mut self) {
        self.number = None;
        self.written = false;
        if let AnnotationKind::Link { action, .. } = &mut self.kind {
            action.reset();
        }
    }
}
