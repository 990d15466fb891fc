//! The boundary between the page behaviours and whatever document they run
//! against.
//!
//! Components never reach for a global document. They are handed a [`Dom`]
//! (and usually a handful of [`NodeId`]s located up front) so the same code
//! runs against a browser binding or against [`MemoryDom`] in tests.

mod markup;
mod memory;

pub use markup::{parse_fragment, serialize_children};
pub use memory::{El, MemoryDom};

/// Opaque handle to an element in a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    Auto,
    #[default]
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBlock {
    Start,
    #[default]
    Center,
    End,
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollOptions {
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

/// Element lookup and mutation, the subset of the DOM the behaviours need.
pub trait Dom {
    /// The document root. Never an element the page author wrote.
    fn root(&self) -> NodeId;

    fn by_id(&self, id: &str) -> Option<NodeId>;

    /// Element descendants of `root`, in document order, excluding `root`.
    fn descendants(&self, root: NodeId) -> Vec<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Lower-case tag name.
    fn tag(&self, node: NodeId) -> String;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);

    /// Current value of a form control. Empty for anything else.
    fn value(&self, node: NodeId) -> String;

    fn text(&self, node: NodeId) -> String;
    fn set_text(&mut self, node: NodeId, text: &str);

    fn inner_html(&self, node: NodeId) -> String;
    fn set_inner_html(&mut self, node: NodeId, html: &str);

    fn focus(&mut self, node: NodeId);
    fn focused(&self) -> Option<NodeId>;

    fn scroll_into_view(&mut self, node: NodeId, options: ScrollOptions);

    fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// True when `node` is `ancestor` or lies somewhere beneath it.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Nearest inclusive ancestor carrying `class`.
    fn closest_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if n != self.root() && self.has_class(n, class) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    fn first_with_class(&self, within: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(within)
            .into_iter()
            .find(|n| self.has_class(*n, class))
    }

    fn first_with_tag(&self, within: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(within)
            .into_iter()
            .find(|n| self.tag(*n) == tag)
    }
}
