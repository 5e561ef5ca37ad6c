use crate::iter::Iter;
use crate::node::Node;
use crate::world::World;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::rc::Rc;
use thiserror::Error;

/// A single indexed component slot: `None` is a wildcard in a [`Pattern`]
/// and the default graph in a stored [`Quad`]'s graph position. It never
/// appears for a stored quad's subject/predicate/object.
pub(crate) type Component = Option<Node>;

/// A quad's four node references in canonical (S, P, O, G) order — the
/// same order regardless of which index a [`Key`] is destined for.
pub(crate) type Canonical = [Component; 4];

/// An entry stored in one materialized index: the canonical (S, P, O, G)
/// components shared (via `Rc`) across every index that holds this quad,
/// plus the permutation order this particular index sorts by.
///
/// Sharing one `Rc<Canonical>` across all of a quad's materialized index
/// entries, and varying only the comparator per index, is the "shared
/// canonical tuple" alternative spec section 9 calls out as acceptable —
/// it keeps each node's [`Node::total_refs`] at one increment per stored
/// quad regardless of how many indexes are materialized, instead of one
/// increment per materialized index.
#[derive(Clone)]
pub(crate) struct Key {
    order: IndexOrder,
    data: Rc<Canonical>,
}

impl Key {
    pub(crate) fn new(order: IndexOrder, data: Rc<Canonical>) -> Self {
        Self { order, data }
    }

    pub(crate) fn component(&self, role: Role) -> &Component {
        &self.data[role.idx()]
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        debug_assert_eq!(
            self.order, other.order,
            "keys from different index orders are never compared"
        );
        for role in self.order.roles() {
            match self.component(role).cmp(other.component(role)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An ordered 4-tuple of node references, ready to insert into a [`Model`].
///
/// Subject, predicate and object are always present; `graph` is `None`
/// for the default graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quad {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
    pub graph: Option<Node>,
}

impl Quad {
    pub fn new(subject: Node, predicate: Node, object: Node, graph: Option<Node>) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// Builds the canonical (S, P, O, G) component tuple once per quad, to
    /// be shared (via `Rc`) across every materialized index's entry for it.
    fn canonical(&self) -> Canonical {
        [
            Some(self.subject.clone()),
            Some(self.predicate.clone()),
            Some(self.object.clone()),
            self.graph.clone(),
        ]
    }
}

/// A search pattern: `None` in any slot is a wildcard.
///
/// `skip_graphs` asks the matcher, when it ends up walking a non-graph-
/// prefixed index with the graph slot unbound, to suppress quads that are
/// duplicates of an already-yielded one in every component but graph — a
/// "triples only" query, as opposed to the default "every quad, graph
/// included" reading of a wildcarded graph slot.
#[derive(Clone, Debug, Default)]
pub struct Pattern {
    pub subject: Option<Node>,
    pub predicate: Option<Node>,
    pub object: Option<Node>,
    pub graph: Option<Node>,
    pub skip_graphs: bool,
}

impl Pattern {
    pub fn new(
        subject: Option<Node>,
        predicate: Option<Node>,
        object: Option<Node>,
        graph: Option<Node>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
            skip_graphs: false,
        }
    }

    #[must_use]
    pub fn with_skip_graphs(mut self, skip_graphs: bool) -> Self {
        self.skip_graphs = skip_graphs;
        self
    }

    pub(crate) fn as_canonical(&self) -> Canonical {
        [
            self.subject.clone(),
            self.predicate.clone(),
            self.object.clone(),
            self.graph.clone(),
        ]
    }
}

/// The role a key position plays: subject, predicate, object, or graph.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Role {
    S,
    P,
    O,
    G,
}

impl Role {
    pub(crate) fn idx(self) -> usize {
        match self {
            Role::S => 0,
            Role::P => 1,
            Role::O => 2,
            Role::G => 3,
        }
    }
}

/// One of the 12 permutations of (S, P, O, G) a [`Model`] can materialize
/// as a sorted index: the six triple orders (graph trailing, used for
/// triple-only queries across all graphs) and their six graph-prefixed
/// counterparts (graph leading, used once the pattern binds a graph).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(usize)]
pub enum IndexOrder {
    Spo = 0,
    Sop = 1,
    Ops = 2,
    Osp = 3,
    Pso = 4,
    Pos = 5,
    Gspo = 6,
    Gsop = 7,
    Gops = 8,
    Gosp = 9,
    Gpso = 10,
    Gpos = 11,
}

impl IndexOrder {
    pub(crate) const TRIPLE: [IndexOrder; 6] = [
        IndexOrder::Spo,
        IndexOrder::Sop,
        IndexOrder::Ops,
        IndexOrder::Osp,
        IndexOrder::Pso,
        IndexOrder::Pos,
    ];

    pub(crate) fn roles(self) -> [Role; 4] {
        use Role::{G, O, P, S};
        match self {
            IndexOrder::Spo => [S, P, O, G],
            IndexOrder::Sop => [S, O, P, G],
            IndexOrder::Ops => [O, P, S, G],
            IndexOrder::Osp => [O, S, P, G],
            IndexOrder::Pso => [P, S, O, G],
            IndexOrder::Pos => [P, O, S, G],
            IndexOrder::Gspo => [G, S, P, O],
            IndexOrder::Gsop => [G, S, O, P],
            IndexOrder::Gops => [G, O, P, S],
            IndexOrder::Gosp => [G, O, S, P],
            IndexOrder::Gpso => [G, P, S, O],
            IndexOrder::Gpos => [G, P, O, S],
        }
    }

    pub(crate) fn is_graph_prefixed(self) -> bool {
        (self as usize) >= 6
    }

    /// The graph-prefixed counterpart of a triple order (`Spo` -> `Gspo`).
    pub(crate) fn graph_variant(self) -> IndexOrder {
        debug_assert!(!self.is_graph_prefixed());
        // SAFETY-free equivalent: the graph-prefixed orders are declared
        // six discriminants after their triple counterparts, in the same
        // relative sequence.
        match self as usize + 6 {
            6 => IndexOrder::Gspo,
            7 => IndexOrder::Gsop,
            8 => IndexOrder::Gops,
            9 => IndexOrder::Gosp,
            10 => IndexOrder::Gpso,
            11 => IndexOrder::Gpos,
            _ => unreachable!(),
        }
    }
}

/// Selects which of the six triple index orders a [`Model`] materializes.
/// The SPO order is always materialized regardless of this mask.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct IndexMask(u8);

impl IndexMask {
    pub const NONE: Self = Self(0);
    pub const SPO: Self = Self(1 << 0);
    pub const SOP: Self = Self(1 << 1);
    pub const OPS: Self = Self(1 << 2);
    pub const OSP: Self = Self(1 << 3);
    pub const PSO: Self = Self(1 << 4);
    pub const POS: Self = Self(1 << 5);
    pub const ALL: Self = Self(0b0011_1111);

    fn contains_bit(self, bit: usize) -> bool {
        self.0 & (1 << bit) != 0
    }
}

impl std::ops::BitOr for IndexMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A NULL subject, predicate, or object was passed to [`Model::try_add`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AddError {
    #[error("a stored quad's subject, predicate, and object must not be null")]
    NullComponent,
}

/// A set of quads held across up to 12 sorted indexes, as described in
/// spec section 4.2.
pub struct Model {
    world: World,
    indexes: [Option<BTreeSet<Key>>; 12],
    num_quads: usize,
}

impl Model {
    pub fn new(world: &World, index_mask: IndexMask, with_graphs: bool) -> Self {
        let mut indexes: [Option<BTreeSet<Key>>; 12] = Default::default();
        indexes[IndexOrder::Spo as usize] = Some(BTreeSet::new());
        for (bit, order) in IndexOrder::TRIPLE.into_iter().enumerate() {
            if order == IndexOrder::Spo || index_mask.contains_bit(bit) {
                indexes[order as usize] = Some(BTreeSet::new());
                if with_graphs {
                    indexes[order.graph_variant() as usize] = Some(BTreeSet::new());
                }
            }
        }
        Self {
            world: world.clone(),
            indexes,
            num_quads: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn num_quads(&self) -> usize {
        self.num_quads
    }

    pub(crate) fn has_index(&self, order: IndexOrder) -> bool {
        self.indexes[order as usize].is_some()
    }

    pub(crate) fn index(&self, order: IndexOrder) -> &BTreeSet<Key> {
        self.indexes[order as usize]
            .as_ref()
            .expect("pattern matcher only selects materialized indexes")
    }

    /// Inserts `quad`, returning `true` if it was not already present.
    ///
    /// Matches the spec's per-index atomicity: only the default (SPO)
    /// index is probed for "already present"; if it rejects the quad as a
    /// duplicate, no other index is touched. Otherwise every materialized
    /// index is updated and node refcounts are adjusted uniformly.
    ///
    /// The quad's (S, P, O, G) components are cloned exactly once, into a
    /// single shared `Rc<Canonical>` (see [`Key`]) that every materialized
    /// index's entry then clones the `Rc` pointer of — so a node's
    /// [`Node::total_refs`] goes up by one per stored quad, not one per
    /// materialized index.
    pub fn add(&mut self, quad: &Quad) -> bool {
        let canonical = Rc::new(quad.canonical());
        let spo_key = Key::new(IndexOrder::Spo, Rc::clone(&canonical));
        if !self.indexes[IndexOrder::Spo as usize]
            .as_mut()
            .expect("SPO is always materialized")
            .insert(spo_key)
        {
            return false;
        }
        for i in 1..12 {
            if let Some(index) = &mut self.indexes[i] {
                // SAFETY-free: `i` maps back to an `IndexOrder` discriminant 0..=11.
                let order = INDEX_ORDERS[i];
                index.insert(Key::new(order, Rc::clone(&canonical)));
            }
        }
        quad.object.bump_object_ref();
        self.num_quads += 1;
        self.debug_assert_indexes_agree();
        true
    }

    /// Fallible counterpart of [`Model::add`] for callers that cannot
    /// statically rule out a missing subject/predicate/object.
    pub fn try_add(
        &mut self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
        graph: Option<&Node>,
    ) -> Result<bool, AddError> {
        let (Some(s), Some(p), Some(o)) = (subject, predicate, object) else {
            return Err(AddError::NullComponent);
        };
        Ok(self.add(&Quad::new(s.clone(), p.clone(), o.clone(), graph.cloned())))
    }

    /// Removes `quad`. A no-op if it was not present.
    pub fn remove(&mut self, quad: &Quad) -> bool {
        let canonical = Rc::new(quad.canonical());
        let spo_key = Key::new(IndexOrder::Spo, Rc::clone(&canonical));
        if !self.indexes[IndexOrder::Spo as usize]
            .as_mut()
            .expect("SPO is always materialized")
            .remove(&spo_key)
        {
            return false;
        }
        for i in 1..12 {
            if let Some(index) = &mut self.indexes[i] {
                let order = INDEX_ORDERS[i];
                index.remove(&Key::new(order, Rc::clone(&canonical)));
            }
        }
        quad.object.drop_object_ref();
        self.num_quads -= 1;
        self.debug_assert_indexes_agree();
        true
    }

    /// Every pair of materialized indexes holds the same number of keys,
    /// and the SPO index's size matches the tracked quad count.
    fn debug_assert_indexes_agree(&self) {
        debug_assert_eq!(self.index(IndexOrder::Spo).len(), self.num_quads);
        for i in 1..12 {
            if let Some(index) = &self.indexes[i] {
                debug_assert_eq!(
                    index.len(),
                    self.num_quads,
                    "index {:?} diverged from SPO",
                    INDEX_ORDERS[i]
                );
            }
        }
    }

    /// Iterates every stored quad in ascending SPO order.
    pub fn begin(&self) -> Iter<'_> {
        self.find(&Pattern::default())
    }

    /// Pattern matcher entry point: selects the best available index and
    /// returns an iterator over exactly the matching quads.
    pub fn find(&self, pattern: &Pattern) -> Iter<'_> {
        Iter::new(self, pattern)
    }
}

const INDEX_ORDERS: [IndexOrder; 12] = [
    IndexOrder::Spo,
    IndexOrder::Sop,
    IndexOrder::Ops,
    IndexOrder::Osp,
    IndexOrder::Pso,
    IndexOrder::Pos,
    IndexOrder::Gspo,
    IndexOrder::Gsop,
    IndexOrder::Gops,
    IndexOrder::Gosp,
    IndexOrder::Gpso,
    IndexOrder::Gpos,
];
