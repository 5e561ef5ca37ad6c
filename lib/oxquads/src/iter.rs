use crate::model::{Canonical, Component, IndexOrder, Key, Model, Pattern, Quad, Role};
use std::collections::btree_set;
use std::rc::Rc;

/// The strategy chosen by the matcher for a given pattern, per spec
/// section 4.3.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Mode {
    All,
    Single,
    Range,
    FilterRange,
    FilterAll,
}

/// Priority order the matcher tries indexes in when several achieve the
/// same bound-prefix length; arbitrary among ties (the spec's preference
/// table always lists two equally acceptable orders per case).
const PRIORITY: [IndexOrder; 12] = [
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

fn is_bound(pattern: &[Component; 4], role: Role) -> bool {
    pattern[role.idx()].is_some()
}

/// Length of the contiguous run of bound components at the head of
/// `order`'s role sequence.
fn achieved_prefix(order: IndexOrder, pattern: &[Component; 4]) -> usize {
    let roles = order.roles();
    roles
        .iter()
        .take_while(|role| is_bound(pattern, **role))
        .count()
}

fn select_order(model: &Model, pattern: &[Component; 4]) -> (IndexOrder, usize) {
    let mut best = IndexOrder::Spo;
    let mut best_len = 0;
    for order in PRIORITY {
        if !model.has_index(order) {
            continue;
        }
        let len = achieved_prefix(order, pattern);
        if len > best_len {
            best = order;
            best_len = len;
        }
    }
    (best, best_len)
}

fn mode_for(prefix_len: usize, total_bound: usize) -> Mode {
    if total_bound == 0 {
        Mode::All
    } else if prefix_len == 0 {
        Mode::FilterAll
    } else if prefix_len == total_bound {
        if prefix_len == 4 {
            Mode::Single
        } else {
            Mode::Range
        }
    } else {
        Mode::FilterRange
    }
}

/// Iterates the quads matching a [`Pattern`], walking a single chosen
/// index in ascending order as described in spec section 4.3.
///
/// Stored entries are keyed in canonical (S, P, O, G) order regardless of
/// which index produced them (see [`Key`]), so yielding a result is a
/// direct field read — no permutation step is needed to get back to
/// (S, P, O, G).
pub struct Iter<'a> {
    model: &'a Model,
    range: btree_set::Range<'a, Key>,
    order: IndexOrder,
    mode: Mode,
    prefix_len: usize,
    pattern: Canonical,
    skip_graphs: bool,
    last_triple: Option<[Component; 3]>,
    done: bool,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(model: &'a Model, pattern: &Pattern) -> Self {
        let canonical = pattern.as_canonical();
        let total_bound = canonical.iter().filter(|c| c.is_some()).count();
        let (order, prefix_len) = select_order(model, &canonical);
        let mode = mode_for(prefix_len, total_bound);
        let roles = order.roles();

        let mut bound: Canonical = Default::default();
        for (i, role) in roles.iter().enumerate() {
            if i < prefix_len {
                bound[role.idx()] = canonical[role.idx()].clone();
            }
        }
        let bound = Key::new(order, Rc::new(bound));

        let index = model.index(order);
        let range = match mode {
            Mode::Single => index.range(bound.clone()..=bound),
            Mode::Range | Mode::FilterRange => index.range(bound..),
            Mode::All | Mode::FilterAll => index.range(..),
        };

        let skip_graphs = pattern.skip_graphs && !order.is_graph_prefixed();

        Self {
            model,
            range,
            order,
            mode,
            prefix_len,
            pattern: canonical,
            skip_graphs,
            last_triple: None,
            done: false,
        }
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    fn prefix_matches(&self, key: &Key) -> bool {
        self.order
            .roles()
            .iter()
            .take(self.prefix_len)
            .all(|role| key.component(*role) == &self.pattern[role.idx()])
    }

    fn full_matches(&self, key: &Key) -> bool {
        [Role::S, Role::P, Role::O, Role::G]
            .iter()
            .all(|role| match &self.pattern[role.idx()] {
                Some(wanted) => key.component(*role).as_ref() == Some(wanted),
                None => true,
            })
    }

    fn to_quad(key: &Key) -> Quad {
        Quad {
            subject: key
                .component(Role::S)
                .clone()
                .expect("stored subject is never null"),
            predicate: key
                .component(Role::P)
                .clone()
                .expect("stored predicate is never null"),
            object: key
                .component(Role::O)
                .clone()
                .expect("stored object is never null"),
            graph: key.component(Role::G).clone(),
        }
    }

    fn triple_of(key: &Key) -> [Component; 3] {
        [
            key.component(Role::S).clone(),
            key.component(Role::P).clone(),
            key.component(Role::O).clone(),
        ]
    }
}

impl Iterator for Iter<'_> {
    type Item = Quad;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let Some(key) = self.range.next() else {
                self.done = true;
                return None;
            };

            if self.skip_graphs {
                let triple = Self::triple_of(key);
                if self.last_triple.as_ref() == Some(&triple) {
                    continue;
                }
            }

            match self.mode {
                Mode::All | Mode::Single => {
                    if self.skip_graphs {
                        self.last_triple = Some(Self::triple_of(key));
                    }
                    return Some(Self::to_quad(key));
                }
                Mode::Range => {
                    if !self.prefix_matches(key) {
                        self.done = true;
                        return None;
                    }
                    if self.skip_graphs {
                        self.last_triple = Some(Self::triple_of(key));
                    }
                    return Some(Self::to_quad(key));
                }
                Mode::FilterRange => {
                    if !self.prefix_matches(key) {
                        self.done = true;
                        return None;
                    }
                    if self.full_matches(key) {
                        if self.skip_graphs {
                            self.last_triple = Some(Self::triple_of(key));
                        }
                        return Some(Self::to_quad(key));
                    }
                }
                Mode::FilterAll => {
                    if self.full_matches(key) {
                        if self.skip_graphs {
                            self.last_triple = Some(Self::triple_of(key));
                        }
                        return Some(Self::to_quad(key));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IndexMask, Model};
    use crate::World;

    fn world_and_nodes() -> (World, crate::Node, crate::Node, crate::Node, crate::Node) {
        let world = World::new();
        let a = world.intern_uri("http://example.com/a");
        let b = world.intern_uri("http://example.com/b");
        let b2 = world.intern_uri("http://example.com/b2");
        let c = world.intern_uri("http://example.com/c1");
        (world, a, b, b2, c)
    }

    #[test]
    fn empty_store_find_is_end() {
        let world = World::new();
        let model = Model::new(&world, IndexMask::NONE, false);
        assert!(model.find(&Pattern::default()).next().is_none());
    }

    #[test]
    fn wildcard_prefix_orders_by_object() {
        let (world, a, b, _b2, _c) = world_and_nodes();
        let c1 = world.intern_uri("http://example.com/c1");
        let c2 = world.intern_uri("http://example.com/c2");
        let b2 = world.intern_uri("http://example.com/b2");
        let c3 = world.intern_uri("http://example.com/c3");
        let mut model = Model::new(&world, IndexMask::ALL, false);
        model.add(&Quad::new(a.clone(), b.clone(), c1.clone(), None));
        model.add(&Quad::new(a.clone(), b.clone(), c2.clone(), None));
        model.add(&Quad::new(a.clone(), b2.clone(), c3.clone(), None));

        let found: Vec<_> = model
            .find(&Pattern::new(Some(a.clone()), Some(b.clone()), None, None))
            .collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].object, c1);
        assert_eq!(found[1].object, c2);

        let all: Vec<_> = model
            .find(&Pattern::new(Some(a.clone()), None, None, None))
            .collect();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn graph_discrimination_without_graph_indexes_dedups_with_skip_graphs() {
        let (world, a, b, _b2, c) = world_and_nodes();
        let g1 = world.intern_uri("http://example.com/g1");
        let g2 = world.intern_uri("http://example.com/g2");
        let mut model = Model::new(&world, IndexMask::NONE, false);
        model.add(&Quad::new(a.clone(), b.clone(), c.clone(), Some(g1.clone())));
        model.add(&Quad::new(a.clone(), b.clone(), c.clone(), Some(g2.clone())));

        let deduped: Vec<_> = model
            .find(
                &Pattern::new(Some(a.clone()), Some(b.clone()), Some(c.clone()), None)
                    .with_skip_graphs(true),
            )
            .collect();
        assert_eq!(deduped.len(), 1);

        let both: Vec<_> = model
            .find(&Pattern::new(Some(a.clone()), Some(b.clone()), Some(c.clone()), None))
            .collect();
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn graph_discrimination_with_graph_indexes_finds_exact_graph() {
        let (world, a, b, _b2, c) = world_and_nodes();
        let g1 = world.intern_uri("http://example.com/g1");
        let g2 = world.intern_uri("http://example.com/g2");
        let mut model = Model::new(&world, IndexMask::ALL, true);
        model.add(&Quad::new(a.clone(), b.clone(), c.clone(), Some(g1.clone())));
        model.add(&Quad::new(a.clone(), b.clone(), c.clone(), Some(g2.clone())));

        let found: Vec<_> = model
            .find(&Pattern::new(
                Some(a.clone()),
                Some(b.clone()),
                Some(c.clone()),
                Some(g1.clone()),
            ))
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].graph, Some(g1));
    }

    #[test]
    fn pattern_matcher_soundness_and_completeness() {
        let (world, a, b, b2, c) = world_and_nodes();
        let mut model = Model::new(&world, IndexMask::ALL, false);
        let q1 = Quad::new(a.clone(), b.clone(), c.clone(), None);
        let q2 = Quad::new(a.clone(), b2.clone(), c.clone(), None);
        model.add(&q1);
        model.add(&q2);

        for pattern in [
            Pattern::new(Some(a.clone()), None, None, None),
            Pattern::new(None, Some(b.clone()), None, None),
            Pattern::new(None, None, Some(c.clone()), None),
            Pattern::default(),
        ] {
            let results: Vec<_> = model.find(&pattern).collect();
            for stored in [&q1, &q2] {
                let component_matches =
                    |p: &Option<crate::Node>, s: &crate::Node| p.as_ref().is_none_or(|p| p == s);
                let should_match = component_matches(&pattern.subject, &stored.subject)
                    && component_matches(&pattern.predicate, &stored.predicate)
                    && component_matches(&pattern.object, &stored.object);
                assert_eq!(results.contains(stored), should_match);
            }
            let mut dedup = results.clone();
            dedup.sort_by(|x, y| x.object.cmp(&y.object));
            dedup.dedup();
            assert_eq!(dedup.len(), results.len(), "each match yielded exactly once");
        }
    }
}
