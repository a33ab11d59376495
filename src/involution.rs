//! Half-edge indices and the edge involution.
//!
//! Half-edges are numbered `0..n`. The involution pairs each half-edge with
//! its opposite; a *folded* edge is paired with itself. Labelling is kept
//! canonical: edge representatives are exactly `0..ne` and the paired
//! opposite halves occupy `ne..n`.

use std::fmt;

use derive_more::{From, Into};
use thiserror::Error;

use crate::permutation::Permutation;

/// Index of a half-edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hedge(pub usize);

/// Index of an edge, always the canonical (smaller) half-edge of its pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeIndex(pub usize);

impl fmt::Display for Hedge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvolutionError {
    #[error("pairing is not an involution at half-edge {0}")]
    NotInvolutive(usize),
    #[error("pairing is not canonically labelled at half-edge {0}")]
    NotCanonical(usize),
    #[error("relabelling sends both halves of edge {0} above the representative range")]
    NonCanonicalRelabelling(usize),
    #[error("relabelling has length {got}, expected {expected}")]
    LengthMismatch { got: usize, expected: usize },
}

/// The edge involution over a canonical half-edge labelling.
///
/// # Examples
///
/// ```
/// use veering::{Hedge, EdgeIndex, Involution};
///
/// // one folded edge (0) and one plain edge (1, paired with 2)
/// let ep = Involution::from_pairing(vec![0, 2, 1]).unwrap();
/// assert_eq!(ep.num_edges(), 2);
/// assert_eq!(ep.num_folded_edges(), 1);
/// assert_eq!(ep.pair(Hedge(2)), Hedge(1));
/// assert_eq!(ep.norm(Hedge(2)), EdgeIndex(1));
/// assert_eq!(ep.render(Hedge(2)), "~1");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Involution {
    pairing: Vec<usize>,
    num_edges: usize,
}

impl Involution {
    /// Builds an involution from its pairing vector, validating that it is
    /// involutive and canonically labelled (representatives first).
    pub fn from_pairing(pairing: Vec<usize>) -> Result<Self, InvolutionError> {
        let n = pairing.len();
        for (h, &p) in pairing.iter().enumerate() {
            if p >= n || pairing[p] != h {
                return Err(InvolutionError::NotInvolutive(h));
            }
        }
        let num_edges = pairing.iter().enumerate().filter(|&(h, &p)| p >= h).count();
        for (h, &p) in pairing.iter().enumerate() {
            if (h < num_edges) != (p >= h) {
                return Err(InvolutionError::NotCanonical(h));
            }
        }
        Ok(Involution { pairing, num_edges })
    }

    pub fn num_half_edges(&self) -> usize {
        self.pairing.len()
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn num_folded_edges(&self) -> usize {
        self.pairing.iter().enumerate().filter(|&(h, &p)| p == h).count()
    }

    pub fn is_folded(&self, e: EdgeIndex) -> bool {
        self.pairing[e.0] == e.0
    }

    /// The opposite half-edge.
    pub fn pair(&self, h: Hedge) -> Hedge {
        Hedge(self.pairing[h.0])
    }

    /// Raw-index variant of [`Involution::pair`].
    pub(crate) fn pairing_image(&self, h: usize) -> usize {
        self.pairing[h]
    }

    /// The canonical edge of a half-edge.
    pub fn norm(&self, h: Hedge) -> EdgeIndex {
        if h.0 < self.num_edges {
            EdgeIndex(h.0)
        } else {
            EdgeIndex(self.pairing[h.0])
        }
    }

    /// The canonical half-edge representing an edge.
    pub fn representative(&self, e: EdgeIndex) -> Hedge {
        Hedge(e.0)
    }

    /// Renders a half-edge in `~` notation: representatives print plainly,
    /// opposite halves as `~edge`.
    pub fn render(&self, h: Hedge) -> String {
        if h.0 < self.num_edges {
            format!("{}", h.0)
        } else {
            format!("~{}", self.pairing[h.0])
        }
    }

    /// The edge-level relabelling induced by an equivariant half-edge
    /// permutation: edge `e` is sent to the canonical edge under the images
    /// of its two halves.
    ///
    /// Fails if some edge's halves both land above the representative range
    /// (the permutation would not preserve the canonical form).
    pub fn edge_relabelling(&self, r: &Permutation) -> Result<Vec<usize>, InvolutionError> {
        if r.len() != self.num_half_edges() {
            return Err(InvolutionError::LengthMismatch {
                got: r.len(),
                expected: self.num_half_edges(),
            });
        }
        let m = self.num_edges;
        let mut rr = Vec::with_capacity(m);
        for e in 0..m {
            let j = r.image(e);
            let k = r.image(self.pairing[e]);
            if j >= m && k >= m {
                return Err(InvolutionError::NonCanonicalRelabelling(e));
            }
            rr.push(j.min(k));
        }
        Ok(rr)
    }
}
