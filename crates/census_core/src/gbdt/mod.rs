//! Deterministic GBDT classifier
//!
//! - Integer-only tree traversal and score accumulation at `SCALE` (1e6)
//! - Canonical JSON serialization (sorted keys) for reproducible hashing
//! - Blake3 hashing for artifact verification
//!
//! # Model Format
//!
//! ```json
//! {
//!   "bias": -1098612,
//!   "feature_count": 108,
//!   "scale": 1000000,
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"feature_idx":3,"id":0,"leaf":null,"left":1,"right":2,"threshold":7055500000},
//!         {"feature_idx":-1,"id":1,"leaf":-234,"left":-1,"right":-1,"threshold":0},
//!         {"feature_idx":-1,"id":2,"leaf":456,"left":-1,"right":-1,"threshold":0}
//!       ],
//!       "weight": 100000
//!     }
//!   ],
//!   "version": 1
//! }
//! ```

pub mod model;
pub mod tree;

pub use model::{probability, quantize, tree_contribution, GbdtClassifier, ModelError, MODEL_VERSION, SCALE};
pub use tree::{Node, Tree};
