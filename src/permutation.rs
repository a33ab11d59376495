//! # Permutations of half-edges
//!
//! This module provides a `Permutation` struct for permutations of
//! `0..n`, together with the cycle-notation machinery used for
//! relabellings of triangulations.
//!
//! ## Key Features:
//!
//! - **Representation**: a `Permutation` is stored by its direct mapping
//!   (`map[i]` is the image of `i`) and its inverse mapping.
//! - **Construction**: identity (`Permutation::id(n)`), validated mapping
//!   vectors (`Permutation::from_map`), transpositions, and cycle-notation
//!   strings interpreted against an edge involution
//!   (`Permutation::from_cycle_string`).
//! - **Operations**: `inverse`, `compose` (applies the right factor
//!   first), `pow`, `is_identity`, image/preimage lookup.
//! - **Cycles**: decomposition into cycles and rendering in `~` notation
//!   (`cycle_string`), round-tripping with parsing.
//! - **Randomness**: `random_centralizer` draws a permutation commuting
//!   with a given involution, useful for relabelling-invariance tests.

use rand::Rng;
use thiserror::Error;

use crate::involution::{Hedge, Involution};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermutationError {
    #[error("mapping vector is not a bijection (value {0} repeated or out of range)")]
    NotABijection(usize),
    #[error("permutation has length {got}, expected {expected}")]
    LengthMismatch { got: usize, expected: usize },
    #[error("malformed cycle string {0:?}")]
    MalformedCycles(String),
    #[error("half-edge {0} appears twice in cycle notation")]
    RepeatedHalfEdge(usize),
    #[error("label {0} out of range in cycle notation")]
    LabelOutOfRange(usize),
    #[error("permutation does not commute with the edge involution at half-edge {0}")]
    NotEquivariant(usize),
}

/// A permutation of `0..n`, stored with its inverse for O(1) preimages.
///
/// # Examples
///
/// ```
/// use veering::Permutation;
///
/// let p = Permutation::from_map(vec![2, 0, 1, 3]).unwrap();
/// assert_eq!(p.image(0), 2);
/// assert_eq!(p.preimage(2), 0);
/// assert_eq!(p.inverse().image(2), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permutation {
    map: Vec<usize>,
    inv: Vec<usize>,
}

impl Permutation {
    /// Creates the identity permutation of length `n`.
    pub fn id(n: usize) -> Self {
        Permutation {
            map: (0..n).collect(),
            inv: (0..n).collect(),
        }
    }

    /// Creates a permutation from a mapping vector; `map[i]` is the image
    /// of `i`. Fails if the vector is not a bijection of `0..len`.
    pub fn from_map(map: Vec<usize>) -> Result<Self, PermutationError> {
        let n = map.len();
        let mut inv = vec![usize::MAX; n];
        for (i, &j) in map.iter().enumerate() {
            if j >= n || inv[j] != usize::MAX {
                return Err(PermutationError::NotABijection(j.min(n)));
            }
            inv[j] = i;
        }
        Ok(Permutation { map, inv })
    }

    /// The transposition of `i` and `j` inside `0..n`.
    pub fn transposition(n: usize, i: usize, j: usize) -> Self {
        let mut map: Vec<usize> = (0..n).collect();
        map.swap(i, j);
        Permutation {
            inv: map.clone(),
            map,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The image of `i`.
    pub fn image(&self, i: usize) -> usize {
        self.map[i]
    }

    /// The preimage of `i`.
    pub fn preimage(&self, i: usize) -> usize {
        self.inv[i]
    }

    /// The internal mapping as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.map
    }

    /// Returns the inverse of the permutation.
    pub fn inverse(&self) -> Self {
        Permutation {
            map: self.inv.clone(),
            inv: self.map.clone(),
        }
    }

    /// Composes `self` with `other`: `(self ∘ other)(i) = self[other[i]]`,
    /// i.e. `other` is applied first.
    ///
    /// # Examples
    ///
    /// ```
    /// use veering::Permutation;
    ///
    /// let p = Permutation::from_map(vec![1, 2, 0]).unwrap();
    /// let q = Permutation::from_map(vec![0, 2, 1]).unwrap();
    /// assert_eq!(p.compose(&q).image(1), p.image(q.image(1)));
    /// ```
    pub fn compose(&self, other: &Self) -> Self {
        debug_assert_eq!(self.len(), other.len());
        let map: Vec<usize> = other.map.iter().map(|&i| self.map[i]).collect();
        let inv: Vec<usize> = self.inv.iter().map(|&i| other.inv[i]).collect();
        Permutation { map, inv }
    }

    /// The `k`-th compositional power.
    pub fn pow(&self, k: usize) -> Self {
        let mut res = Permutation::id(self.len());
        for _ in 0..k {
            res = self.compose(&res);
        }
        res
    }

    pub fn is_identity(&self) -> bool {
        self.map.iter().enumerate().all(|(i, &j)| i == j)
    }

    /// Cycle decomposition; each cycle starts at its minimal element and
    /// cycles are ordered by that minimum. Fixed points are included.
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let n = self.len();
        let mut seen = vec![false; n];
        let mut out = Vec::new();
        for start in 0..n {
            if seen[start] {
                continue;
            }
            let mut cyc = Vec::new();
            let mut x = start;
            while !seen[x] {
                seen[x] = true;
                cyc.push(x);
                x = self.map[x];
            }
            out.push(cyc);
        }
        out
    }

    /// Whether the permutation commutes with the involution.
    pub fn commutes_with(&self, ep: &Involution) -> bool {
        self.len() == ep.num_half_edges()
            && (0..self.len())
                .all(|h| self.map[ep.pairing_image(h)] == ep.pairing_image(self.map[h]))
    }

    /// Renders the permutation in cycle notation with `~` labels taken
    /// from the involution.
    ///
    /// # Examples
    ///
    /// ```
    /// use veering::{Involution, Permutation};
    ///
    /// let ep = Involution::from_pairing(vec![5, 4, 3, 2, 1, 0]).unwrap();
    /// let p = Permutation::from_cycle_string("(0,5)(1,3)", &ep).unwrap();
    /// assert_eq!(p.cycle_string(&ep), "(0,~0)(1,~2)(2,~1)");
    /// ```
    pub fn cycle_string(&self, ep: &Involution) -> String {
        raw_cycle_string(&self.map, ep)
    }

    /// Parses cycle notation against an involution.
    ///
    /// Tokens are half-edge indices or `~k` for the opposite half of edge
    /// `k`. Half-edges whose partner is mentioned but which are not
    /// mentioned themselves get the induced image; all remaining
    /// half-edges are fixed. The result must be a bijection commuting with
    /// the involution.
    pub fn from_cycle_string(s: &str, ep: &Involution) -> Result<Self, PermutationError> {
        let n = ep.num_half_edges();
        let ne = ep.num_edges();
        let mut map: Vec<Option<usize>> = vec![None; n];
        for cyc in parse_cycles(s)? {
            let hs: Vec<usize> = cyc
                .iter()
                .map(|t| t.half_edge(n, ne, ep))
                .collect::<Result<_, _>>()?;
            for (i, &h) in hs.iter().enumerate() {
                let img = hs[(i + 1) % hs.len()];
                if map[h].is_some() {
                    return Err(PermutationError::RepeatedHalfEdge(h));
                }
                map[h] = Some(img);
            }
        }
        // extend over the involution, then fix the rest
        for h in 0..n {
            if map[h].is_none() {
                if let Some(img) = map[ep.pairing_image(h)] {
                    map[h] = Some(ep.pairing_image(img));
                }
            }
        }
        let map: Vec<usize> = map
            .into_iter()
            .enumerate()
            .map(|(h, v)| v.unwrap_or(h))
            .collect();
        let perm = Permutation::from_map(map)?;
        if !perm.commutes_with(ep) {
            let h = (0..n)
                .find(|&h| perm.map[ep.pairing_image(h)] != ep.pairing_image(perm.map[h]))
                .unwrap_or(0);
            return Err(PermutationError::NotEquivariant(h));
        }
        Ok(perm)
    }

    /// Draws a random permutation commuting with `ep`: folded edges are
    /// shuffled among themselves, paired edges among themselves with an
    /// independent orientation swap each.
    pub fn random_centralizer<R: Rng + ?Sized>(ep: &Involution, rng: &mut R) -> Self {
        let n = ep.num_half_edges();
        let ne = ep.num_edges();
        let folded: Vec<usize> = (0..ne).filter(|&e| ep.pairing_image(e) == e).collect();
        let paired: Vec<usize> = (0..ne).filter(|&e| ep.pairing_image(e) != e).collect();
        let mut map = vec![0usize; n];
        let mut images = folded.clone();
        shuffle(&mut images, rng);
        for (&e, &img) in folded.iter().zip(images.iter()) {
            map[e] = img;
        }
        let mut images = paired.clone();
        shuffle(&mut images, rng);
        for (&e, &img) in paired.iter().zip(images.iter()) {
            let (img, coimg) = if rng.gen_bool(0.5) {
                (img, ep.pairing_image(img))
            } else {
                (ep.pairing_image(img), img)
            };
            map[e] = img;
            map[ep.pairing_image(e)] = coimg;
        }
        // a bijection commuting with ep by construction
        debug_assert!(Permutation::from_map(map.clone()).is_ok());
        let mut inv = vec![0usize; n];
        for (i, &j) in map.iter().enumerate() {
            inv[j] = i;
        }
        Permutation { map, inv }
    }
}

fn shuffle<R: Rng + ?Sized>(xs: &mut [usize], rng: &mut R) {
    for i in (1..xs.len()).rev() {
        xs.swap(i, rng.gen_range(0..=i));
    }
}

/// One token of a cycle string: a plain half-edge index or `~edge`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CycleToken {
    pub tilde: bool,
    pub value: usize,
}

impl CycleToken {
    fn half_edge(&self, n: usize, ne: usize, ep: &Involution) -> Result<usize, PermutationError> {
        if self.tilde {
            if self.value >= ne {
                return Err(PermutationError::LabelOutOfRange(self.value));
            }
            Ok(ep.pairing_image(self.value))
        } else {
            if self.value >= n {
                return Err(PermutationError::LabelOutOfRange(self.value));
            }
            Ok(self.value)
        }
    }
}

/// Splits `"(a,b,~c)(d)"` into token cycles.
pub(crate) fn parse_cycles(s: &str) -> Result<Vec<Vec<CycleToken>>, PermutationError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    let malformed = || PermutationError::MalformedCycles(s.to_string());
    let body = s
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(malformed)?;
    let mut cycles = Vec::new();
    for part in body.split(")(") {
        let mut cyc = Vec::new();
        for tok in part.split(',') {
            let tok = tok.trim();
            let (tilde, digits) = match tok.strip_prefix('~') {
                Some(rest) => (true, rest),
                None => (false, tok),
            };
            let value: usize = digits.parse().map_err(|_| malformed())?;
            cyc.push(CycleToken { tilde, value });
        }
        cycles.push(cyc);
    }
    Ok(cycles)
}

/// Renders a raw mapping in cycle notation with `~` labels.
pub(crate) fn raw_cycle_string(map: &[usize], ep: &Involution) -> String {
    let n = map.len();
    let mut seen = vec![false; n];
    let mut out = String::new();
    for start in 0..n {
        if seen[start] {
            continue;
        }
        out.push('(');
        let mut x = start;
        let mut first = true;
        while !seen[x] {
            seen[x] = true;
            if !first {
                out.push(',');
            }
            out.push_str(&ep.render(Hedge(x)));
            first = false;
            x = map[x];
        }
        out.push(')');
    }
    out
}

#[cfg(test)]
mod test;
