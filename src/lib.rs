//! # Veering
//!
//! Veering is a Rust library for veering triangulations of surfaces. Its
//! primary focus is the algebra of forward flip sequences: composition,
//! powers, inversion, and the invariant data they carry (unflipped edges,
//! the pseudo-Anosov criterion, homological action matrices), together
//! with linear families of edge coordinates and their train-track and
//! geometric polytopes, all in exact rational arithmetic.

pub mod colour;
pub mod flip_sequence;
pub mod involution;
pub mod linear_family;
pub mod matrix;
pub mod permutation;
pub mod polytope;
pub mod triangulation;

pub use colour::{Colour, Slope};
pub use flip_sequence::{
    flip_sequence_from_string, flip_sequence_to_string, Flip, VeeringFlipSequence,
};
pub use involution::{EdgeIndex, Hedge, Involution};
pub use linear_family::VeeringTriangulationLinearFamily;
pub use permutation::Permutation;
pub use triangulation::VeeringTriangulation;
