use crate::world::WorldInner;
use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// The three kinds of node a [`World`](crate::World) can intern.
///
/// Declaration order is the order used by the node comparator
/// (URI < Blank < Literal), matching the total order spelled out for
/// index keys.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Debug, Hash)]
pub enum NodeKind {
    Uri,
    Blank,
    Literal,
}

/// A canonical, interned language tag.
///
/// Two tags equal as strings are always the same `LangTag`, so comparing
/// them reduces to pointer equality; see [`World::intern_language`](crate::World::intern_language).
#[derive(Clone, Debug)]
pub struct LangTag(pub(crate) Rc<str>);

impl LangTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for LangTag {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for LangTag {}

impl Hash for LangTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const () as usize).hash(state)
    }
}

impl Ord for LangTag {
    fn cmp(&self, other: &Self) -> Ordering {
        if Rc::ptr_eq(&self.0, &other.0) {
            Ordering::Equal
        } else {
            self.0.as_ref().cmp(other.0.as_ref())
        }
    }
}

impl PartialOrd for LangTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) struct NodeData {
    pub(crate) world: Rc<WorldInner>,
    pub(crate) kind: NodeKind,
    pub(crate) value: Box<str>,
    pub(crate) datatype: Option<Node>,
    pub(crate) language: Option<LangTag>,
    pub(crate) refs_as_object: Cell<u32>,
}

impl Drop for NodeData {
    fn drop(&mut self) {
        self.world.on_node_dropped(self);
    }
}

/// A reference-counted handle to an interned node: a URI, a blank node, or
/// a literal (carrying an optional datatype and an optional language tag).
///
/// `Node`s are cheap to clone (an `Rc` bump) and compare equal only when
/// they are the exact same interned instance: within one [`World`](crate::World)
/// no two live nodes ever share `(kind, value, datatype, language)`, so
/// structural equality and pointer equality coincide. [`Node::total_refs`]
/// is the number of live clones of this handle (Rust's `Rc` strong count
/// doing the refcounting bookkeeping the spec describes manually); it
/// drops to zero, and the node is removed from its `World`'s interning
/// table, the moment the last clone is dropped.
#[derive(Clone)]
pub struct Node(pub(crate) Rc<NodeData>);

impl Node {
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0.value
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.value.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.value.is_empty()
    }

    /// The datatype node of a literal, if any. `None` for URIs, blanks,
    /// and untyped literals.
    #[inline]
    pub fn datatype(&self) -> Option<&Node> {
        self.0.datatype.as_ref()
    }

    /// The canonical language tag of a literal, if any.
    #[inline]
    pub fn language(&self) -> Option<&str> {
        self.0.language.as_ref().map(LangTag::as_str)
    }

    /// Number of live handles to this node — the spec's "total refs".
    #[inline]
    pub fn total_refs(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Number of stored quads holding this node in object position.
    #[inline]
    pub fn refs_as_object(&self) -> u32 {
        self.0.refs_as_object.get()
    }

    /// True iff this is a blank node used as the object of exactly one
    /// stored quad — a node that can be inlined at its single use site.
    #[inline]
    pub fn is_inline_object(&self) -> bool {
        self.kind() == NodeKind::Blank && self.refs_as_object() == 1
    }

    #[inline]
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn bump_object_ref(&self) {
        self.0.refs_as_object.set(self.0.refs_as_object.get() + 1);
    }

    pub(crate) fn drop_object_ref(&self) {
        self.0.refs_as_object.set(self.0.refs_as_object.get() - 1);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Uri => write!(f, "<{}>", self.as_str()),
            NodeKind::Blank => write!(f, "_:{}", self.as_str()),
            NodeKind::Literal => {
                write!(f, "{:?}", self.as_str())?;
                if let Some(lang) = self.language() {
                    write!(f, "@{lang}")?;
                } else if let Some(datatype) = self.datatype() {
                    write!(f, "^^<{}>", datatype.as_str())?;
                }
                Ok(())
            }
        }
    }
}

impl PartialEq for Node {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const () as usize).hash(state)
    }
}

/// Total order on nodes: by kind, then buffer bytes, then (for literals)
/// datatype and language — pointer equality short-circuits the common case
/// of comparing a node against itself or an identical interned handle.
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        if Rc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        self.kind()
            .cmp(&other.kind())
            .then_with(|| self.as_str().cmp(other.as_str()))
            .then_with(|| self.0.datatype.cmp(&other.0.datatype))
            .then_with(|| self.0.language.cmp(&other.0.language))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use crate::World;

    #[test]
    fn interning_returns_same_pointer() {
        let world = World::new();
        let a = world.intern_uri("http://example.com/a");
        let b = world.intern_uri("http://example.com/a");
        assert!(super::Node::ptr_eq(&a, &b));
        assert_eq!(a.total_refs(), 2);
    }

    #[test]
    fn different_kinds_are_distinct_nodes() {
        let world = World::new();
        let uri = world.intern_uri("a");
        let blank = world.intern_blank("a");
        assert_ne!(uri, blank);
        assert!(uri < blank);
    }

    #[test]
    fn literal_language_variants_are_distinct() {
        let world = World::new();
        let en1 = world.intern_literal(None, "x", Some("en"));
        let en2 = world.intern_literal(None, "x", Some("en"));
        let fr = world.intern_literal(None, "x", Some("fr"));
        assert!(super::Node::ptr_eq(&en1, &en2));
        assert!(!super::Node::ptr_eq(&en1, &fr));
        assert_eq!(en1.language(), Some("en"));
    }

    #[test]
    fn node_comparator_orders_by_kind_then_bytes() {
        let world = World::new();
        let a = world.intern_uri("http://a");
        let b = world.intern_uri("http://b");
        let blank = world.intern_blank("http://a");
        assert!(a < b);
        assert!(a < blank);
    }

    #[test]
    fn total_refs_drop_to_released_semantics() {
        let world = World::new();
        let a = world.intern_uri("http://example.com/a");
        assert_eq!(a.total_refs(), 1);
        assert_eq!(world.num_nodes(), 1);
        drop(a);
        assert_eq!(world.num_nodes(), 0);
    }
}
