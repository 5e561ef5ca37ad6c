//! An in-memory RDF-style quad store.
//!
//! Three cooperating pieces, leaves first:
//!
//! - [`World`] interns URIs, blank nodes, and literals so that equal
//!   values share a single, reference-counted [`Node`].
//! - [`Model`] holds a set of [`Quad`]s across up to twelve sorted
//!   permutation indexes.
//! - [`Pattern`] plus [`Model::find`] choose the cheapest available index
//!   for a bound/wildcard query and iterate exactly the matching quads.
//!
//! ```
//! use oxquads::{IndexMask, Model, Pattern, Quad, World};
//!
//! let world = World::new();
//! let a = world.intern_uri("http://example.com/a");
//! let b = world.intern_uri("http://example.com/b");
//! let c = world.intern_uri("http://example.com/c");
//!
//! let mut model = Model::new(&world, IndexMask::ALL, false);
//! assert!(model.add(&Quad::new(a.clone(), b.clone(), c.clone(), None)));
//! assert_eq!(model.num_quads(), 1);
//!
//! let found: Vec<_> = model
//!     .find(&Pattern::new(Some(a), None, None, None))
//!     .collect();
//! assert_eq!(found.len(), 1);
//! ```

mod iter;
mod model;
mod node;
mod world;

pub use iter::Iter;
pub use model::{AddError, IndexMask, IndexOrder, Model, Pattern, Quad};
pub use node::{LangTag, Node, NodeKind};
pub use world::World;
