use super::{Dom, NodeId, ScrollOptions};

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Document,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Live value of a form control once something has typed into it.
    value: Option<String>,
}

/// Element description used to grow a [`MemoryDom`] by hand.
#[derive(Debug, Clone)]
pub struct El {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
}

impl El {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            text: None,
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(mut self, class: &str) -> Self {
        match self.attributes.iter_mut().find(|(k, _)| k == "class") {
            Some((_, existing)) => {
                existing.push(' ');
                existing.push_str(class);
            }
            None => self.attributes.push(("class".into(), class.into())),
        }
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.retain(|(k, _)| k != name);
        self.attributes.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// A small arena-backed document.
///
/// Slots of removed subtrees are recycled, so a [`NodeId`] held past the
/// removal of its node may later name a different node.
///
/// Writes through the [`Dom`] trait that leave the document unchanged (adding
/// a class that is already there, setting an attribute to its current value)
/// are not counted by [`MemoryDom::mutation_count`].
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    focused: Option<NodeId>,
    scrolls: Vec<(NodeId, ScrollOptions)>,
    mutations: usize,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                value: None,
            }],
            free: Vec::new(),
            focused: None,
            scrolls: Vec::new(),
            mutations: 0,
        }
    }

    /// Build a document from markup.
    pub fn parse(html: &str) -> Self {
        let mut dom = Self::new();
        let root = dom.root();
        super::parse_fragment(&mut dom, root, html);
        dom
    }

    pub fn append(&mut self, parent: NodeId, el: El) -> NodeId {
        let node = self.push_element(parent, &el.tag, el.attributes);
        if let Some(text) = el.text {
            self.push_text(node, &text);
        }
        node
    }

    /// Simulate the user changing a control's value.
    pub fn set_value(&mut self, node: NodeId, value: &str) {
        self.nodes[node.0].value = Some(value.to_string());
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    /// Every `scroll_into_view` request, oldest first.
    pub fn scrolls(&self) -> &[(NodeId, ScrollOptions)] {
        &self.scrolls
    }

    /// Slots in the arena, live or waiting to be reused.
    pub fn allocated_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn to_html(&self) -> String {
        super::serialize_children(self, self.root())
    }

    pub(crate) fn push_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: Vec<(String, String)>,
    ) -> NodeId {
        self.push(
            parent,
            NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
                attributes,
            },
        )
    }

    pub(crate) fn push_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    pub(crate) fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.0].kind
    }

    pub(crate) fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            value: None,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        };
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Remove every child of `node` and release their subtrees' slots.
    fn detach_children(&mut self, node: NodeId) {
        let mut stack = std::mem::take(&mut self.nodes[node.0].children);
        while let Some(child) = stack.pop() {
            let released = &mut self.nodes[child.0];
            stack.append(&mut released.children);
            released.kind = NodeKind::Text(String::new());
            released.parent = None;
            released.value = None;
            if self.focused == Some(child) {
                self.focused = None;
            }
            self.free.push(child);
        }
    }

    fn attributes(&self, node: NodeId) -> Option<&Vec<(String, String)>> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    fn classes(&self, node: NodeId) -> Vec<String> {
        self.attribute(node, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn write_classes(&mut self, node: NodeId, classes: &[String]) {
        self.set_attribute(node, "class", &classes.join(" "));
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        for child in &self.nodes[node.0].children {
            match &self.nodes[child.0].kind {
                NodeKind::Text(t) => out.push_str(t),
                _ => self.collect_text(*child, out),
            }
        }
    }

    fn select_value(&self, select: NodeId) -> String {
        let options: Vec<NodeId> = self
            .descendants(select)
            .into_iter()
            .filter(|n| self.tag(*n) == "option")
            .collect();
        let chosen = options
            .iter()
            .find(|o| self.has_attribute(**o, "selected"))
            .or_else(|| options.first());
        match chosen {
            Some(option) => self
                .attribute(*option, "value")
                .unwrap_or_else(|| self.text(*option)),
            None => String::new(),
        }
    }
}

impl Dom for MemoryDom {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|n| self.attribute(*n, "id").as_deref() == Some(id))
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[root.0].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if matches!(self.nodes[node.0].kind, NodeKind::Element { .. }) {
                out.push(node);
                stack.extend(self.nodes[node.0].children.iter().rev().copied());
            }
        }
        out
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn tag(&self, node: NodeId) -> String {
        match &self.nodes[node.0].kind {
            NodeKind::Element { tag, .. } => tag.clone(),
            NodeKind::Document => "#document".into(),
            NodeKind::Text(_) => "#text".into(),
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attributes(node)?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let NodeKind::Element { attributes, .. } = &mut self.nodes[node.0].kind else {
            return;
        };
        match attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) if existing == value => return,
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
        self.mutations += 1;
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        let mut classes = self.classes(node);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.write_classes(node, &classes);
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        let mut classes = self.classes(node);
        let before = classes.len();
        classes.retain(|c| c != class);
        if classes.len() != before {
            self.write_classes(node, &classes);
        }
    }

    fn value(&self, node: NodeId) -> String {
        if let Some(value) = &self.nodes[node.0].value {
            return value.clone();
        }
        match self.tag(node).as_str() {
            "input" => self.attribute(node, "value").unwrap_or_default(),
            "textarea" => self.text(node),
            "select" => self.select_value(node),
            _ => String::new(),
        }
    }

    fn text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if self.text(node) == text {
            return;
        }
        self.detach_children(node);
        if !text.is_empty() {
            self.push_text(node, text);
        }
        self.mutations += 1;
    }

    fn inner_html(&self, node: NodeId) -> String {
        super::serialize_children(self, node)
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) {
        self.detach_children(node);
        super::parse_fragment(self, node, html);
        self.mutations += 1;
    }

    fn focus(&mut self, node: NodeId) {
        self.focused = Some(node);
    }

    fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    fn scroll_into_view(&mut self, node: NodeId, options: ScrollOptions) {
        self.scrolls.push((node, options));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendants_are_in_document_order() {
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let form = dom.append(root, El::new("form"));
        let first = dom.append(form, El::new("div"));
        let inner = dom.append(first, El::new("input"));
        let second = dom.append(form, El::new("textarea"));

        assert_eq!(dom.descendants(root), vec![form, first, inner, second]);
        assert!(dom.contains(form, inner));
        assert!(!dom.contains(second, inner));
    }

    #[test]
    fn test_class_writes_that_change_nothing_are_not_mutations() {
        let mut dom = MemoryDom::new();
        let root = dom.root();
        let group = dom.append(root, El::new("div").class("form-group"));

        dom.add_class(group, "has-error");
        assert_eq!(dom.mutation_count(), 1);
        dom.add_class(group, "has-error");
        dom.remove_class(group, "missing");
        assert_eq!(dom.mutation_count(), 1);
        assert_eq!(dom.attribute(group, "class").as_deref(), Some("form-group has-error"));
    }

    #[test]
    fn test_value_prefers_typed_value_over_markup() {
        let mut dom = MemoryDom::parse(r#"<input id="q" value="seed"><textarea id="t">hi</textarea>"#);
        let input = dom.by_id("q").unwrap();
        let textarea = dom.by_id("t").unwrap();

        assert_eq!(dom.value(input), "seed");
        assert_eq!(dom.value(textarea), "hi");
        dom.set_value(input, "typed");
        assert_eq!(dom.value(input), "typed");
    }

    #[test]
    fn test_select_value_uses_selected_option() {
        let dom = MemoryDom::parse(
            r#"<select id="s"><option value="">Pick</option><option value="b" selected>B</option></select>"#,
        );
        let select = dom.by_id("s").unwrap();
        assert_eq!(dom.value(select), "b");
    }

    #[test]
    fn test_set_inner_html_replaces_children() {
        let mut dom = MemoryDom::parse(r#"<div id="slot"><p id="old">loading</p></div>"#);
        let slot = dom.by_id("slot").unwrap();

        dom.set_inner_html(slot, r#"<nav><button class="nav-toggle">Menu</button></nav>"#);

        assert!(dom.by_id("old").is_none());
        assert!(dom.first_with_class(slot, "nav-toggle").is_some());
        assert_eq!(dom.text(slot), "Menu");
    }

    #[test]
    fn test_replacing_markup_reuses_released_slots() {
        let header = r#"<header class="header"><button class="nav-toggle">Menu</button><ul class="nav-list"><li>Shop</li></ul></header>"#;
        let mut dom = MemoryDom::parse(r#"<div id="slot"></div><input id="keep">"#);
        let slot = dom.by_id("slot").unwrap();
        let keep = dom.by_id("keep").unwrap();

        dom.set_inner_html(slot, header);
        let toggle = dom.first_with_class(slot, "nav-toggle").unwrap();
        dom.focus(toggle);
        let allocated = dom.allocated_nodes();

        for _ in 0..5 {
            dom.set_inner_html(slot, header);
        }

        assert_eq!(dom.allocated_nodes(), allocated);
        assert_eq!(dom.focused(), None);
        assert_eq!(dom.by_id("keep"), Some(keep));
        assert_eq!(dom.inner_html(slot), header);
    }
}
