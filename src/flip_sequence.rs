//! Dynamical sequences of forward flips followed by a relabelling.
//!
//! A [`VeeringFlipSequence`] records a start triangulation, an ordered log
//! of edge flips (in start coordinates) and a final relabelling
//! permutation. Sequences compose when the end of one equals the start of
//! the next, closed sequences have integer powers, and every sequence has
//! an inverse (a conjugate of the inverse mapping class). Derived data
//! (unflipped edges, pseudo-Anosov detection, homological matrices) is
//! recomputed from the log on demand, never cached.

use std::fmt;
use std::ops::{Mul, MulAssign};

use bitvec::vec::BitVec;
use thiserror::Error;

use crate::colour::Colour;
use crate::involution::{EdgeIndex, Hedge};
use crate::matrix::QMatrix;
use crate::permutation::{Permutation, PermutationError};
use crate::triangulation::{TriangulationError, VeeringTriangulation};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlipSequenceError {
    #[error("GREEN edges are not allowed in forward flip sequences")]
    GreenStart,
    #[error("composition undefined: left end does not match right start")]
    CompositionUndefined,
    #[error("{0} undefined: the flip sequence is not closed")]
    NotClosed(&'static str),
    #[error("undetermined colour on edge {0}")]
    UndeterminedColour(EdgeIndex),
    #[error("recorded old colour of edge {edge} is {colour}, expected a definite colour")]
    IndefiniteOldColour { edge: EdgeIndex, colour: Colour },
    #[error("malformed flip token {0:?}")]
    MalformedFlip(String),
    #[error("replay of the flip log diverged: {0}")]
    ReplayMismatch(&'static str),
    #[error(transparent)]
    Triangulation(#[from] TriangulationError),
    #[error(transparent)]
    Permutation(#[from] PermutationError),
}

/// One recorded flip: the edge (in start coordinates), the colour it was
/// flipped to, and the colour it had before.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flip {
    pub edge: EdgeIndex,
    pub colour: Colour,
    pub old_colour: Colour,
}

/// Renders a flip list in the compact `"1R 0R"` form.
pub fn flip_sequence_to_string<'a, I>(flips: I) -> String
where
    I: IntoIterator<Item = &'a Flip>,
{
    flips
        .into_iter()
        .map(|f| format!("{}{}", f.edge, f.colour))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses the compact flip-string form into `(half-edge, colour)` pairs.
pub fn flip_sequence_from_string(s: &str) -> Result<Vec<(Hedge, Colour)>, FlipSequenceError> {
    s.split_whitespace()
        .map(|tok| {
            let malformed = || FlipSequenceError::MalformedFlip(tok.to_string());
            let mut chars = tok.chars();
            let col = chars.next_back().ok_or_else(malformed)?;
            let edge: usize = chars.as_str().parse().map_err(|_| malformed())?;
            let colour = Colour::try_from(col).map_err(|_| malformed())?;
            Ok((Hedge(edge), colour))
        })
        .collect()
}

/// A sequence of forward flips followed by a relabelling.
///
/// # Examples
///
/// ```
/// use veering::{VeeringFlipSequence, VeeringTriangulation};
///
/// let t = VeeringTriangulation::from_string("(0,1,2)(~1,~2,~0)", "RRB").unwrap();
/// let f = VeeringFlipSequence::from_strings(&t, "1R 0R", None).unwrap();
/// assert_eq!(
///     f.to_string(),
///     r#"VeeringFlipSequence(VeeringTriangulation("(0,1,2)(~2,~0,~1)", "RRB"), "1R 0R", "(0)(1)(2)(~2)(~1)(~0)")"#,
/// );
/// assert!(f.is_closed());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VeeringFlipSequence {
    start: VeeringTriangulation,
    end: VeeringTriangulation,
    flips: Vec<Flip>,
    relabelling: Permutation,
}

impl VeeringFlipSequence {
    /// The identity sequence at `start`.
    ///
    /// `Green` edges are rejected. If the start carries `Purple` edges the
    /// sequence is *reduced* and the snapshot is fully re-forgotten (every
    /// forward flippable edge turns `Purple`).
    pub fn new(start: &VeeringTriangulation) -> Result<Self, FlipSequenceError> {
        if start.has_green() {
            return Err(FlipSequenceError::GreenStart);
        }
        let mut snapshot = start.clone();
        if snapshot.is_reduced() {
            snapshot.forget_forward_flippable_colours();
        }
        Ok(VeeringFlipSequence {
            end: snapshot.clone(),
            relabelling: Permutation::id(snapshot.num_half_edges()),
            start: snapshot,
            flips: Vec::new(),
        })
    }

    /// A sequence built by applying `flips` to `start` in order.
    pub fn with_flips(
        start: &VeeringTriangulation,
        flips: &[(Hedge, Colour)],
    ) -> Result<Self, FlipSequenceError> {
        let mut seq = Self::new(start)?;
        for &(e, col) in flips {
            seq.flip(e, col)?;
        }
        Ok(seq)
    }

    /// A sequence from the compact flip string and an optional relabelling
    /// in cycle notation.
    ///
    /// ```
    /// use veering::{VeeringFlipSequence, VeeringTriangulation};
    ///
    /// let t = VeeringTriangulation::from_string("(0,1,2)(~0,~1,~2)", "PBR").unwrap();
    /// let b = VeeringFlipSequence::from_strings(&t, "0B", Some("(1,0,~1,~0)(2,~2)")).unwrap();
    /// assert!(b.is_closed());
    /// ```
    pub fn from_strings(
        start: &VeeringTriangulation,
        flips: &str,
        relabelling: Option<&str>,
    ) -> Result<Self, FlipSequenceError> {
        let mut seq = Self::with_flips(start, &flip_sequence_from_string(flips)?)?;
        if let Some(r) = relabelling {
            seq.relabel_str(r)?;
        }
        Ok(seq)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn start(&self) -> &VeeringTriangulation {
        &self.start
    }

    pub fn end(&self) -> &VeeringTriangulation {
        &self.end
    }

    pub fn flips(&self) -> &[Flip] {
        &self.flips
    }

    pub fn relabelling(&self) -> &Permutation {
        &self.relabelling
    }

    pub fn is_closed(&self) -> bool {
        self.start == self.end
    }

    /// Whether the start carries undetermined (`Purple`) colours.
    pub fn is_reduced(&self) -> bool {
        self.start.is_reduced()
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    /// Appends a flip of edge `e` (either half accepted) to `colour`.
    ///
    /// The log entry is expressed in start coordinates: the edge is pulled
    /// back through the current relabelling before being recorded.
    pub fn flip(&mut self, e: Hedge, colour: Colour) -> Result<(), FlipSequenceError> {
        if e.0 >= self.end.num_half_edges() {
            return Err(TriangulationError::HalfEdgeOutOfRange(e.0).into());
        }
        let e = self.end.norm(e);
        let old_colour = self.end.edge_colour(e);
        self.end.flip(Hedge(e.0), colour)?;
        let logged = self
            .start
            .involution()
            .norm(Hedge(self.relabelling.preimage(e.0)));
        self.flips.push(Flip {
            edge: logged,
            colour,
            old_colour,
        });
        Ok(())
    }

    /// Applies a relabelling to the end and folds it into the running net
    /// relabelling.
    pub fn relabel(&mut self, r: &Permutation) -> Result<(), FlipSequenceError> {
        self.end.relabel(r)?;
        self.relabelling = r.compose(&self.relabelling);
        Ok(())
    }

    /// Cycle-notation variant of [`VeeringFlipSequence::relabel`].
    pub fn relabel_str(&mut self, s: &str) -> Result<(), FlipSequenceError> {
        let r = self.end.parse_relabelling(s)?;
        self.relabel(&r)
    }

    /// Swaps the orientation labels of edge `e`, touching only the
    /// relabelling bookkeeping (no geometric flip).
    pub fn swap(&mut self, e: EdgeIndex) -> Result<(), FlipSequenceError> {
        let ee = self.end.involution().pair(Hedge(e.0)).0;
        let t = Permutation::transposition(self.end.num_half_edges(), e.0, ee);
        self.relabel(&t)?;
        self.debug_verify();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Algebra
    // ------------------------------------------------------------------

    /// Composes `self` followed by `other`; defined iff `self.end()`
    /// equals `other.start()` structurally.
    pub fn try_compose(&self, other: &Self) -> Result<Self, FlipSequenceError> {
        let mut res = self.clone();
        res.try_compose_assign(other)?;
        Ok(res)
    }

    /// In-place composition (`*=`).
    pub fn try_compose_assign(&mut self, other: &Self) -> Result<(), FlipSequenceError> {
        if self.end != other.start {
            return Err(FlipSequenceError::CompositionUndefined);
        }
        let ep = self.start.involution();
        for f in &other.flips {
            let pulled = ep.norm(Hedge(self.relabelling.preimage(f.edge.0)));
            self.flips.push(Flip { edge: pulled, ..*f });
        }
        self.end = other.end.clone();
        self.relabelling = other.relabelling.compose(&self.relabelling);
        self.debug_verify();
        Ok(())
    }

    /// The `k`-th power of a closed sequence. `k = 0` is the identity at
    /// the start; negative powers are unrepresentable (use
    /// [`VeeringFlipSequence::inverse`]).
    pub fn pow(&self, k: u32) -> Result<Self, FlipSequenceError> {
        if !self.is_closed() {
            return Err(FlipSequenceError::NotClosed("power"));
        }
        if k == 0 {
            return Self::new(&self.start);
        }
        if k == 1 {
            return Ok(self.clone());
        }
        let mut res = self.clone();
        res.relabelling = self.relabelling.pow(k as usize);
        let m = self.flips.len();
        let ep = self.start.involution();
        for _ in 0..m * (k as usize - 1) {
            let f = res.flips[res.flips.len() - m];
            let pulled = ep.norm(Hedge(self.relabelling.preimage(f.edge.0)));
            res.flips.push(Flip { edge: pulled, ..f });
        }
        res.debug_verify();
        Ok(res)
    }

    /// A conjugate of the inverse mapping class, as a flip sequence.
    ///
    /// The recorded `(edge, old colour)` pairs are undone in reverse
    /// order; for reduced sequences the fully coloured log is first
    /// reconstructed through [`VeeringFlipSequence::coloured_start`]. The
    /// resulting sequence starts from the rotated end.
    ///
    /// ```
    /// use veering::{VeeringFlipSequence, VeeringTriangulation};
    ///
    /// let v = VeeringTriangulation::from_string("(0,6,5)(1,2,~6)(3,4,~5)", "BPBBRPR").unwrap();
    /// let b = VeeringFlipSequence::from_strings(&v, "1B", Some("(1,2)")).unwrap();
    /// let r = VeeringFlipSequence::from_strings(&v, "1R 5R", Some("(0,2,3)(1,4)(5,6)")).unwrap();
    /// let inv = b.try_compose(&r).unwrap().inverse().unwrap();
    /// assert_eq!(
    ///     inv.to_string(),
    ///     r#"VeeringFlipSequence(VeeringTriangulation("(0,6,5)(1,2,~6)(3,4,~5)", "RBRRPBP"), "6B 4R 3B", "(0,3,1,4,2)(5,6,~5,~6)")"#,
    /// );
    /// ```
    pub fn inverse(&self) -> Result<Self, FlipSequenceError> {
        let reduced = self.is_reduced();
        let (coloured_flips, mut end) = if reduced {
            let mut v = self.coloured_start()?;
            let mut coloured = Vec::with_capacity(self.flips.len());
            for f in &self.flips {
                coloured.push(Flip {
                    old_colour: v.edge_colour(f.edge),
                    ..*f
                });
                v.flip(Hedge(f.edge.0), f.colour)?;
            }
            v.relabel(&self.relabelling)?;
            (coloured, v)
        } else {
            (self.flips.clone(), self.end.clone())
        };

        let n = self.start.num_half_edges();
        let ep = self.start.involution();
        let mut inverse_flips = Vec::with_capacity(coloured_flips.len());
        for f in coloured_flips.iter().rev() {
            let colour = f.old_colour.opposite().ok_or(FlipSequenceError::IndefiniteOldColour {
                edge: f.edge,
                colour: f.old_colour,
            })?;
            inverse_flips.push((Hedge(self.relabelling.image(f.edge.0)), colour));
        }

        // edges flipped an odd number of times need an orientation swap
        // folded into the inverse relabelling
        let mut correction: Vec<usize> = (0..n).collect();
        for &(h, _) in &inverse_flips {
            correction.swap(h.0, ep.pairing_image(h.0));
        }
        let correction = Permutation::from_map(correction)?;
        let r = self.relabelling.inverse().compose(&correction);

        end.rotate();
        if reduced {
            end.forget_forward_flippable_colours();
        }
        let mut res = Self::with_flips(&end, &inverse_flips)?;
        res.relabel(&r)?;
        res.debug_verify();
        Ok(res)
    }

    // ------------------------------------------------------------------
    // Colour back-propagation
    // ------------------------------------------------------------------

    /// The end colouring forced by the flip log: still-`Purple` edges are
    /// resolved by a backward scan of the log, then from the start
    /// colouring through the relabelling. Edges neither determines stay
    /// `Purple`.
    pub fn end_colouring(&self) -> Vec<Colour> {
        let ne = self.end.num_edges();
        let mut colours: Vec<Colour> =
            (0..ne).map(|e| self.end.edge_colour(EdgeIndex(e))).collect();
        let mut undetermined: BitVec = BitVec::repeat(false, ne);
        let mut remaining = 0usize;
        for (e, &c) in colours.iter().enumerate() {
            if c == Colour::Purple {
                undetermined.set(e, true);
                remaining += 1;
            }
        }
        for f in self.flips.iter().rev() {
            if remaining == 0 {
                break;
            }
            let e = self
                .end
                .involution()
                .norm(Hedge(self.relabelling.image(f.edge.0)));
            if undetermined[e.0] {
                undetermined.set(e.0, false);
                remaining -= 1;
                colours[e.0] = f.colour;
            }
        }
        for e in undetermined.iter_ones() {
            let re = self.relabelling.preimage(e);
            let c = self.start.colour(Hedge(re));
            if c != Colour::Purple {
                colours[e] = c;
            }
        }
        colours
    }

    /// The start triangulation with every `Purple` edge resolved to the
    /// colour forced by the sequence; fails when some colour stays
    /// undetermined.
    pub fn coloured_start(&self) -> Result<VeeringTriangulation, FlipSequenceError> {
        let mut v = self.start.clone();
        if !v.is_reduced() {
            return Ok(v);
        }
        let colours = self.end_colouring();
        for e in 0..v.num_edges() {
            let e = EdgeIndex(e);
            if v.edge_colour(e) == Colour::Purple {
                if colours[e.0] == Colour::Purple {
                    return Err(FlipSequenceError::UndeterminedColour(e));
                }
                v.set_edge_colour(e, colours[e.0]);
            }
        }
        Ok(v)
    }

    // ------------------------------------------------------------------
    // Invariant analysis
    // ------------------------------------------------------------------

    /// The edges never reached by the flip log, even through iterated
    /// relabelling. Defined for closed sequences only.
    ///
    /// Worklist closure: seed with the logged edges, propagate through the
    /// relabelling action until stable.
    pub fn unflipped_edges(&self) -> Result<Vec<EdgeIndex>, FlipSequenceError> {
        if !self.is_closed() {
            return Err(FlipSequenceError::NotClosed("unflipped edge analysis"));
        }
        let ne = self.start.num_edges();
        let mut flipped: BitVec = BitVec::repeat(false, ne);
        let mut work: Vec<usize> = Vec::new();
        for f in &self.flips {
            if !flipped[f.edge.0] {
                flipped.set(f.edge.0, true);
                work.push(f.edge.0);
            }
        }
        let ep = self.start.involution();
        while let Some(e) = work.pop() {
            let img = ep.norm(Hedge(self.relabelling.image(e))).0;
            if !flipped[img] {
                flipped.set(img, true);
                work.push(img);
            }
        }
        Ok((0..ne).filter(|&e| !flipped[e]).map(EdgeIndex).collect())
    }

    /// Whether the sequence is closed and every edge is eventually flipped
    /// under the periodic relabelling action, the combinatorial
    /// pseudo-Anosov criterion.
    pub fn is_pseudo_anosov(&self) -> bool {
        match self.unflipped_edges() {
            Ok(unflipped) => unflipped.is_empty(),
            Err(_) => false,
        }
    }

    // ------------------------------------------------------------------
    // Homological action
    // ------------------------------------------------------------------

    /// The matrix of the induced action on edge coordinates: the identity
    /// transformed by each flip in order, then by the relabelling. With
    /// `twist` the entries along forward sequences are non-negative
    /// (train-track convention); composition satisfies
    /// `(f * g).matrix(t) == g.matrix(t) * f.matrix(t)`.
    pub fn matrix(&self, twist: bool) -> Result<QMatrix, FlipSequenceError> {
        let mut m = QMatrix::identity(self.start.num_edges());
        let mut v = self.start.clone();
        for f in &self.flips {
            v.flip_homological_action(f.edge, &mut m, twist);
            v.flip(Hedge(f.edge.0), f.colour)?;
        }
        v.relabel_homological_action(&self.relabelling, &mut m, twist)?;
        Ok(m)
    }

    /// The matrix of the inverse sequence.
    pub fn matrix_inverse(&self, twist: bool) -> Result<QMatrix, FlipSequenceError> {
        self.inverse()?.matrix(twist)
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    /// Replays the recorded log from the start and checks that it
    /// reproduces the end, the log and the relabelling exactly.
    pub fn verify(&self) -> Result<(), FlipSequenceError> {
        let pairs: Vec<(Hedge, Colour)> = self
            .flips
            .iter()
            .map(|f| (Hedge(f.edge.0), f.colour))
            .collect();
        let mut replay = Self::with_flips(&self.start, &pairs)?;
        replay.relabel(&self.relabelling)?;
        if replay.start != self.start {
            return Err(FlipSequenceError::ReplayMismatch("start"));
        }
        if replay.flips != self.flips {
            return Err(FlipSequenceError::ReplayMismatch("flip log"));
        }
        if replay.relabelling != self.relabelling {
            return Err(FlipSequenceError::ReplayMismatch("relabelling"));
        }
        if replay.end != self.end {
            return Err(FlipSequenceError::ReplayMismatch("end"));
        }
        Ok(())
    }

    fn debug_verify(&self) {
        #[cfg(debug_assertions)]
        if let Err(err) = self.verify() {
            panic!("flip sequence invariant broken: {err}");
        }
    }
}

/// Composition of flip sequences.
///
/// # Panics
///
/// Panics when the composition is undefined; use
/// [`VeeringFlipSequence::try_compose`] for a fallible variant.
impl Mul for &VeeringFlipSequence {
    type Output = VeeringFlipSequence;

    fn mul(self, rhs: Self) -> VeeringFlipSequence {
        match self.try_compose(rhs) {
            Ok(res) => res,
            Err(err) => panic!("{err}"),
        }
    }
}

/// In-place composition; panics like `Mul` when undefined.
impl MulAssign<&VeeringFlipSequence> for VeeringFlipSequence {
    fn mul_assign(&mut self, rhs: &VeeringFlipSequence) {
        if let Err(err) = self.try_compose_assign(rhs) {
            panic!("{err}");
        }
    }
}

impl fmt::Display for VeeringFlipSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VeeringFlipSequence({}, \"{}\", \"{}\")",
            self.start,
            flip_sequence_to_string(&self.flips),
            self.relabelling.cycle_string(self.end.involution())
        )
    }
}

#[cfg(test)]
mod test;
