// src/session/host.rs
//! The page the session observes. The session never owns page elements; it
//! only holds [`ElementHandle`]s, which the host may invalidate at any time.

use std::fmt;

/// A structural selector understood by the host, e.g. `div[data-question-primary]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque, non-owning reference to one rendered element. A handle goes stale
/// when the host re-renders; reads through a stale handle return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// The UI elements a quiz session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRole {
    AnswerInput,
    QuestionBox,
    PrimaryMeaning,
    SecondaryMeanings,
    PartsOfSpeech,
    SubmitControl,
}

impl ElementRole {
    pub const ALL: [ElementRole; 6] = [
        ElementRole::AnswerInput,
        ElementRole::QuestionBox,
        ElementRole::PrimaryMeaning,
        ElementRole::SecondaryMeanings,
        ElementRole::PartsOfSpeech,
        ElementRole::SubmitControl,
    ];
}

/// What the host page exposes to the session.
pub trait HostDocument {
    fn url(&self) -> String;
    /// The first element matching `locator`, if it currently exists.
    fn resolve(&self, locator: &Locator) -> Option<ElementHandle>;
    /// Every element matching `locator` inside `scope`, in document order.
    fn resolve_within(&self, scope: ElementHandle, locator: &Locator) -> Option<Vec<ElementHandle>>;
    fn parent(&self, handle: ElementHandle) -> Option<ElementHandle>;
    fn text(&self, handle: ElementHandle) -> Option<String>;
    /// The current value of an input element.
    fn value(&self, handle: ElementHandle) -> Option<String>;

    fn is_alive(&self, handle: ElementHandle) -> bool {
        self.text(handle).is_some()
    }
}

/// The only user inputs the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key press, named like `KeyboardEvent.key` ("Enter", "Backspace", "a").
    Key(String),
    /// The submit control was activated.
    SubmitActivated,
}

impl InputEvent {
    pub fn key(name: impl Into<String>) -> Self {
        InputEvent::Key(name.into())
    }
}
