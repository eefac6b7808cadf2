// src/session/memory.rs
//! An in-memory page. Cloning yields another handle onto the same page, so one
//! side can edit it while a session reads it.

use crate::session::host::{ElementHandle, HostDocument, Locator};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct Element {
    locator: Locator,
    parent: Option<ElementHandle>,
    text: String,
    value: String,
}

#[derive(Debug, Default)]
struct Page {
    url: String,
    next_id: u64,
    elements: HashMap<ElementHandle, Element>,
    /// Insertion order, used as document order.
    order: Vec<ElementHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    page: Arc<Mutex<Page>>,
}

impl MemoryDocument {
    pub fn new(url: impl Into<String>) -> Self {
        let doc = Self::default();
        doc.set_url(url);
        doc
    }

    fn page(&self) -> MutexGuard<'_, Page> {
        self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.page().url = url.into();
    }

    /// Adds an element and returns its handle.
    pub fn insert(
        &self,
        locator: &str,
        parent: Option<ElementHandle>,
        text: impl Into<String>,
    ) -> ElementHandle {
        let mut page = self.page();
        page.next_id += 1;
        let handle = ElementHandle(page.next_id);
        page.elements.insert(
            handle,
            Element {
                locator: Locator::new(locator),
                parent,
                text: text.into(),
                value: String::new(),
            },
        );
        page.order.push(handle);
        handle
    }

    /// Removes an element and everything below it.
    pub fn remove(&self, handle: ElementHandle) {
        let mut page = self.page();
        let mut doomed = vec![handle];
        while let Some(current) = doomed.pop() {
            page.elements.remove(&current);
            let children: Vec<ElementHandle> = page
                .elements
                .iter()
                .filter(|(_, e)| e.parent == Some(current))
                .map(|(h, _)| *h)
                .collect();
            doomed.extend(children);
        }
        let Page { elements, order, .. } = &mut *page;
        order.retain(|h| elements.contains_key(h));
    }

    /// Removes every element matching `locator`.
    pub fn remove_all(&self, locator: &str) {
        let matching: Vec<ElementHandle> = {
            let page = self.page();
            let matching = page
                .order
                .iter()
                .filter(|h| page.elements.get(*h).is_some_and(|e| e.locator.as_str() == locator))
                .copied()
                .collect();
            matching
        };
        for handle in matching {
            self.remove(handle);
        }
    }

    pub fn set_text(&self, handle: ElementHandle, text: impl Into<String>) -> bool {
        match self.page().elements.get_mut(&handle) {
            Some(element) => {
                element.text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn set_value(&self, handle: ElementHandle, value: impl Into<String>) -> bool {
        match self.page().elements.get_mut(&handle) {
            Some(element) => {
                element.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let mut page = self.page();
        page.elements.clear();
        page.order.clear();
    }
}

impl HostDocument for MemoryDocument {
    fn url(&self) -> String {
        self.page().url.clone()
    }

    fn resolve(&self, locator: &Locator) -> Option<ElementHandle> {
        let page = self.page();
        let found = page
            .order
            .iter()
            .find(|h| page.elements.get(*h).is_some_and(|e| &e.locator == locator))
            .copied();
        found
    }

    fn resolve_within(
        &self,
        scope: ElementHandle,
        locator: &Locator,
    ) -> Option<Vec<ElementHandle>> {
        let page = self.page();
        if !page.elements.contains_key(&scope) {
            return None;
        }
        let is_inside = |mut handle: ElementHandle| {
            while let Some(parent) = page.elements.get(&handle).and_then(|e| e.parent) {
                if parent == scope {
                    return true;
                }
                handle = parent;
            }
            false
        };
        let found = page
            .order
            .iter()
            .filter(|h| {
                page.elements.get(*h).is_some_and(|e| &e.locator == locator) && is_inside(**h)
            })
            .copied()
            .collect();
        Some(found)
    }

    fn parent(&self, handle: ElementHandle) -> Option<ElementHandle> {
        self.page().elements.get(&handle).and_then(|e| e.parent)
    }

    fn text(&self, handle: ElementHandle) -> Option<String> {
        self.page().elements.get(&handle).map(|e| e.text.clone())
    }

    fn value(&self, handle: ElementHandle) -> Option<String> {
        self.page().elements.get(&handle).map(|e| e.value.clone())
    }
}
