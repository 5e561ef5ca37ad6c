use crate::node::{LangTag, Node, NodeData, NodeKind};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

#[derive(PartialEq, Eq, Hash, Clone)]
struct LiteralKey {
    value: Box<str>,
    datatype: Option<Node>,
    language: Option<LangTag>,
}

pub(crate) struct WorldInner {
    uris: RefCell<HashMap<Box<str>, Weak<NodeData>>>,
    blanks: RefCell<HashMap<Box<str>, Weak<NodeData>>>,
    literals: RefCell<HashMap<LiteralKey, Weak<NodeData>>>,
    languages: RefCell<HashMap<Box<str>, Weak<str>>>,
    num_nodes: Cell<usize>,
}

impl WorldInner {
    /// Called from `NodeData`'s `Drop` impl once its last handle goes away:
    /// deregisters the dead weak entry and decrements the live node count.
    /// This is the "node_free ... at zero, remove from the appropriate
    /// table" step from the spec, running automatically via RAII instead
    /// of as a caller-invoked function.
    pub(crate) fn on_node_dropped(&self, node: &NodeData) {
        self.num_nodes.set(self.num_nodes.get() - 1);
        match node.kind {
            NodeKind::Uri => {
                self.uris.borrow_mut().remove(&*node.value);
            }
            NodeKind::Blank => {
                self.blanks.borrow_mut().remove(&*node.value);
            }
            NodeKind::Literal => {
                let key = LiteralKey {
                    value: node.value.clone(),
                    datatype: node.datatype.clone(),
                    language: node.language.clone(),
                };
                self.literals.borrow_mut().remove(&key);
            }
        }
    }
}

/// The node interning authority and lifetime parent described in spec
/// section 4.1.
///
/// `World` is a cheap handle (an `Rc`): cloning it shares the same
/// interning tables. There is no explicit `free_world` — every [`Node`]
/// keeps the tables it was interned from alive, and the tables themselves
/// are dropped once the last `World` handle and the last `Node` handle
/// derived from it are both gone, so well-formed usage ("free the World
/// only after freeing every Model") is enforced by the borrow checker's
/// cousin, reference counting, rather than left as a caller obligation.
#[derive(Clone)]
pub struct World(pub(crate) Rc<WorldInner>);

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self(Rc::new(WorldInner {
            uris: RefCell::new(HashMap::new()),
            blanks: RefCell::new(HashMap::new()),
            literals: RefCell::new(HashMap::new()),
            languages: RefCell::new(HashMap::new()),
            num_nodes: Cell::new(0),
        }))
    }

    /// Number of distinct nodes currently interned (live total-ref > 0).
    pub fn num_nodes(&self) -> usize {
        self.0.num_nodes.get()
    }

    pub fn intern_uri(&self, value: impl AsRef<str>) -> Node {
        self.intern_name(NodeKind::Uri, value.as_ref())
    }

    pub fn intern_blank(&self, value: impl AsRef<str>) -> Node {
        self.intern_name(NodeKind::Blank, value.as_ref())
    }

    fn intern_name(&self, kind: NodeKind, value: &str) -> Node {
        let table = match kind {
            NodeKind::Uri => &self.0.uris,
            NodeKind::Blank => &self.0.blanks,
            NodeKind::Literal => unreachable!("literals go through intern_literal"),
        };
        if let Some(existing) = table.borrow().get(value).and_then(Weak::upgrade) {
            return Node(existing);
        }
        let node = Rc::new(NodeData {
            world: Rc::clone(&self.0),
            kind,
            value: value.into(),
            datatype: None,
            language: None,
            refs_as_object: Cell::new(0),
        });
        table
            .borrow_mut()
            .insert(value.into(), Rc::downgrade(&node));
        self.0.num_nodes.set(self.0.num_nodes.get() + 1);
        Node(node)
    }

    /// Canonicalizes a language tag, returning `None` if `tag` is `None`.
    /// Two tags equal as strings always return the same `LangTag`.
    pub fn intern_language(&self, tag: Option<&str>) -> Option<LangTag> {
        let tag = tag?;
        if let Some(existing) = self.0.languages.borrow().get(tag).and_then(Weak::upgrade) {
            return Some(LangTag(existing));
        }
        let data: Rc<str> = Rc::from(tag);
        self.0
            .languages
            .borrow_mut()
            .insert(tag.into(), Rc::downgrade(&data));
        Some(LangTag(data))
    }

    /// Interns a literal keyed by `(value, datatype, language)`. `datatype`
    /// must itself be a URI node already interned from this `World` (or
    /// any `World`, though mixing worlds defeats interning).
    pub fn intern_literal(
        &self,
        datatype: Option<&Node>,
        value: impl AsRef<str>,
        language: Option<&str>,
    ) -> Node {
        let value = value.as_ref();
        let language = self.intern_language(language);
        let datatype = datatype.cloned();
        let key = LiteralKey {
            value: value.into(),
            datatype: datatype.clone(),
            language: language.clone(),
        };
        if let Some(existing) = self.0.literals.borrow().get(&key).and_then(Weak::upgrade) {
            return Node(existing);
        }
        let node = Rc::new(NodeData {
            world: Rc::clone(&self.0),
            kind: NodeKind::Literal,
            value: value.into(),
            datatype,
            language,
            refs_as_object: Cell::new(0),
        });
        self.0.literals.borrow_mut().insert(key, Rc::downgrade(&node));
        self.0.num_nodes.set(self.0.num_nodes.get() + 1);
        Node(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_language_is_canonical() {
        let world = World::new();
        let en1 = world.intern_language(Some("en")).unwrap();
        let en2 = world.intern_language(Some("en")).unwrap();
        assert_eq!(en1, en2);
        assert!(world.intern_language(None).is_none());
    }

    #[test]
    fn literal_datatype_keeps_datatype_alive() {
        let world = World::new();
        let xsd_string = world.intern_uri("http://www.w3.org/2001/XMLSchema#string");
        let literal = world.intern_literal(Some(&xsd_string), "hello", None);
        assert_eq!(literal.datatype(), Some(&xsd_string));
        assert_eq!(xsd_string.total_refs(), 2); // our handle + the literal's
        drop(literal);
        assert_eq!(xsd_string.total_refs(), 1);
    }

    #[test]
    fn dropping_last_handle_frees_node() {
        let world = World::new();
        assert_eq!(world.num_nodes(), 0);
        let a = world.intern_uri("http://example.com/a");
        assert_eq!(world.num_nodes(), 1);
        let b = world.intern_uri("http://example.com/a");
        drop(a);
        assert_eq!(world.num_nodes(), 1, "b still holds a reference");
        drop(b);
        assert_eq!(world.num_nodes(), 0);
        // Re-interning after the node was fully released creates a fresh node.
        let c = world.intern_uri("http://example.com/a");
        assert_eq!(world.num_nodes(), 1);
        drop(c);
    }
}
