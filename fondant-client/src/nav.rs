//! Mobile navigation toggle.
//!
//! The open/closed state lives in [`NavToggle::is_open`]. The three places
//! the page shows it (a class on the list, a class on the header and
//! `aria-expanded` on the button) are only ever written by [`NavToggle::render`].

use tracing::debug;

use crate::dom::{Dom, NodeId};
use crate::hooks::DomHooks;

pub const ESCAPE: &str = "Escape";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavElements {
    pub toggle: NodeId,
    pub list: NodeId,
    /// Area a click must land outside of to close the menu.
    pub header: NodeId,
}

impl NavElements {
    /// Find the toggle, list and header. `None` while the header fragment has
    /// not been loaded yet.
    pub fn locate<D: Dom + ?Sized>(dom: &D, hooks: &DomHooks) -> Option<Self> {
        let root = dom.root();
        let toggle = dom.first_with_class(root, &hooks.nav_toggle_class)?;
        let list = dom.first_with_class(root, &hooks.nav_list_class)?;
        let header = dom
            .closest_with_class(toggle, &hooks.header_class)
            .or_else(|| dom.first_with_class(root, &hooks.header_class))
            .or_else(|| dom.parent(list).filter(|p| *p != root))
            .unwrap_or(list);

        Some(Self {
            toggle,
            list,
            header,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NavToggle {
    elements: NavElements,
    open: bool,
    list_open_class: String,
    header_open_class: String,
}

impl NavToggle {
    /// Take over an existing menu. Whatever the list currently shows is
    /// adopted as the starting state and written back to all three signals.
    pub fn new<D: Dom + ?Sized>(dom: &mut D, elements: NavElements, hooks: &DomHooks) -> Self {
        let mut nav = Self {
            elements,
            open: dom.has_class(elements.list, &hooks.nav_open_class),
            list_open_class: hooks.nav_open_class.clone(),
            header_open_class: hooks.header_open_class.clone(),
        };
        nav.render(dom);
        nav
    }

    pub fn elements(&self) -> NavElements {
        self.elements
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle<D: Dom + ?Sized>(&mut self, dom: &mut D) {
        self.open = !self.open;
        debug!(open = self.open, "nav toggled");
        self.render(dom);
    }

    pub fn close<D: Dom + ?Sized>(&mut self, dom: &mut D) {
        self.open = false;
        self.render(dom);
    }

    /// A click anywhere on the page. Returns whether the menu state changed.
    pub fn handle_click<D: Dom + ?Sized>(&mut self, dom: &mut D, target: NodeId) -> bool {
        if dom.contains(self.elements.toggle, target) {
            self.toggle(dom);
            return true;
        }
        if self.open && !dom.contains(self.elements.header, target) {
            debug!("nav closed by outside click");
            self.close(dom);
            return true;
        }
        false
    }

    /// A key press anywhere on the page. Escape closes an open menu and
    /// hands focus back to the toggle.
    pub fn handle_key<D: Dom + ?Sized>(&mut self, dom: &mut D, key: &str) -> bool {
        if key != ESCAPE || !self.open {
            return false;
        }
        self.close(dom);
        dom.focus(self.elements.toggle);
        true
    }

    pub fn render<D: Dom + ?Sized>(&self, dom: &mut D) {
        let NavElements {
            toggle,
            list,
            header,
        } = self.elements;

        if self.open {
            dom.add_class(list, &self.list_open_class);
            dom.add_class(header, &self.header_open_class);
        } else {
            dom.remove_class(list, &self.list_open_class);
            dom.remove_class(header, &self.header_open_class);
        }
        dom.set_attribute(toggle, "aria-expanded", if self.open { "true" } else { "false" });
    }

    /// Whether every reflection in the document agrees with the held state.
    pub fn is_consistent<D: Dom + ?Sized>(&self, dom: &D) -> bool {
        let expanded = if self.open { "true" } else { "false" };
        dom.has_class(self.elements.list, &self.list_open_class) == self.open
            && dom.has_class(self.elements.header, &self.header_open_class) == self.open
            && dom.attribute(self.elements.toggle, "aria-expanded").as_deref() == Some(expanded)
    }
}
