//! Coloured (veering) triangulations of surfaces.
//!
//! A triangulation is a face permutation over half-edges (all cycles of
//! length 3), an edge involution, and a colouring. Edges with no opposite
//! half are *folded*. The structure mutates in place under `flip`,
//! `flip_back`, `relabel`, `swap` and `rotate`; every mutation validates
//! its arguments before touching anything.

use std::fmt;

use thiserror::Error;

use crate::colour::{Colour, InvalidColour};
use crate::involution::{EdgeIndex, Hedge, Involution, InvolutionError};
use crate::matrix::QMatrix;
use crate::permutation::{parse_cycles, raw_cycle_string, Permutation, PermutationError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriangulationError {
    #[error("malformed face permutation string {0:?}")]
    MalformedFaces(String),
    #[error("face cycles must have length 3 (got one of length {0})")]
    NotATriangle(usize),
    #[error("edge labels must be exactly 0..{expected} (problem near label {got})")]
    BadEdgeLabels { got: usize, expected: usize },
    #[error("half-edge {0} is missing from the face permutation")]
    MissingHalfEdge(usize),
    #[error("colour string has length {got}, expected one colour per edge ({expected})")]
    ColourCount { got: usize, expected: usize },
    #[error("colouring differs on the two halves of edge {0}")]
    UnpairedColour(usize),
    #[error("face at half-edge {0} is monochromatic")]
    MonochromaticFace(usize),
    #[error("face at half-edge {0} has two {1} edges")]
    DoubledDegenerateColour(usize, Colour),
    #[error("half-edge index {0} out of range")]
    HalfEdgeOutOfRange(usize),
    #[error("edge {0} is not flippable (its two faces coincide along it)")]
    NotFlippable(EdgeIndex),
    #[error("edge {0} is not forward flippable")]
    NotForwardFlippable(EdgeIndex),
    #[error("edge {0} is not backward flippable")]
    NotBackwardFlippable(EdgeIndex),
    #[error("flip colour must be RED or BLUE, got {0}")]
    IndefiniteFlipColour(Colour),
    #[error("GREEN edges admit no vertical switch equation (edge {0})")]
    GreenSwitch(EdgeIndex),
    #[error("face at half-edge {0} has no unique large edge")]
    NoLargeEdge(usize),
    #[error(transparent)]
    Involution(#[from] InvolutionError),
    #[error(transparent)]
    Permutation(#[from] PermutationError),
    #[error(transparent)]
    Colour(#[from] InvalidColour),
}

/// A triangulated surface with a veering colouring.
///
/// # Examples
///
/// ```
/// use veering::{Colour, Hedge, VeeringTriangulation};
///
/// let t = VeeringTriangulation::from_string("(0,1,2)(~0,~1,~2)", "RRB").unwrap();
/// assert_eq!(t.num_edges(), 3);
/// assert_eq!(t.to_string(), r#"VeeringTriangulation("(0,1,2)(~2,~0,~1)", "RRB")"#);
/// assert_eq!(t.angles(), vec![2]);
///
/// let mut t = t;
/// t.flip(Hedge(1), Colour::Red).unwrap();
/// assert_eq!(t.to_string(), r#"VeeringTriangulation("(0,~2,1)(2,~1,~0)", "RRB")"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VeeringTriangulation {
    fp: Vec<usize>,
    ep: Involution,
    colouring: Vec<Colour>,
}

impl VeeringTriangulation {
    /// Parses a face permutation in cycle notation plus a colour string
    /// (one character per edge).
    ///
    /// Plain labels are edge representatives and must cover `0..ne`
    /// exactly; `~k` denotes the opposite half of edge `k`. Opposite
    /// halves are numbered downward from `n-1` by decreasing edge label,
    /// so `"(0,1,2)(~0,~1,~2)"` has `~2 = 3`, `~1 = 4`, `~0 = 5`. Edges
    /// without a `~` half are folded.
    pub fn from_string(faces: &str, colours: &str) -> Result<Self, TriangulationError> {
        let cycles =
            parse_cycles(faces).map_err(|_| TriangulationError::MalformedFaces(faces.into()))?;
        let mut plain = Vec::new();
        let mut tilded = Vec::new();
        for cyc in &cycles {
            if cyc.len() != 3 {
                return Err(TriangulationError::NotATriangle(cyc.len()));
            }
            for t in cyc {
                if t.tilde {
                    tilded.push(t.value);
                } else {
                    plain.push(t.value);
                }
            }
        }
        let ne = plain.len();
        let mut seen = vec![false; ne];
        for &e in &plain {
            if e >= ne || std::mem::replace(&mut seen[e], true) {
                return Err(TriangulationError::BadEdgeLabels { got: e, expected: ne });
            }
        }
        tilded.sort_unstable_by(|a, b| b.cmp(a));
        let mut opposite = vec![usize::MAX; ne];
        for (i, &e) in tilded.iter().enumerate() {
            if e >= ne || opposite[e] != usize::MAX {
                return Err(TriangulationError::BadEdgeLabels { got: e, expected: ne });
            }
            opposite[e] = ne + i;
        }
        let n = ne + tilded.len();
        let mut pairing: Vec<usize> = (0..n).collect();
        for (e, &o) in opposite.iter().enumerate() {
            if o != usize::MAX {
                pairing[e] = o;
                pairing[o] = e;
            }
        }
        let ep = Involution::from_pairing(pairing)?;

        let mut fp = vec![usize::MAX; n];
        for cyc in &cycles {
            let hs: Vec<usize> = cyc
                .iter()
                .map(|t| if t.tilde { opposite[t.value] } else { t.value })
                .collect();
            for (i, &h) in hs.iter().enumerate() {
                fp[h] = hs[(i + 1) % 3];
            }
        }
        if let Some(h) = fp.iter().position(|&v| v == usize::MAX) {
            return Err(TriangulationError::MissingHalfEdge(h));
        }

        let cols: Vec<Colour> = colours
            .chars()
            .map(Colour::try_from)
            .collect::<Result<_, _>>()?;
        if cols.len() != ne {
            return Err(TriangulationError::ColourCount {
                got: cols.len(),
                expected: ne,
            });
        }
        let mut colouring = vec![Colour::Red; n];
        for (e, &c) in cols.iter().enumerate() {
            colouring[e] = c;
            colouring[ep.pairing_image(e)] = c;
        }
        Self::new(fp, ep, colouring)
    }

    /// Validated raw construction from a face permutation, involution and
    /// per-half-edge colouring.
    pub fn new(
        fp: Vec<usize>,
        ep: Involution,
        colouring: Vec<Colour>,
    ) -> Result<Self, TriangulationError> {
        let n = ep.num_half_edges();
        if fp.len() != n || colouring.len() != n {
            return Err(TriangulationError::MissingHalfEdge(fp.len().min(colouring.len())));
        }
        Permutation::from_map(fp.clone())?;
        for h in 0..n {
            if colouring[h] != colouring[ep.pairing_image(h)] {
                return Err(TriangulationError::UnpairedColour(ep.norm(Hedge(h)).0));
            }
        }
        let t = VeeringTriangulation { fp, ep, colouring };
        t.check_faces()?;
        Ok(t)
    }

    fn check_faces(&self) -> Result<(), TriangulationError> {
        let n = self.num_half_edges();
        let mut seen = vec![false; n];
        for h in 0..n {
            if seen[h] {
                continue;
            }
            let (i, j, k) = (h, self.fp[h], self.fp[self.fp[h]]);
            if self.fp[k] != i || i == j || j == k || i == k {
                let mut len = 1;
                let mut x = self.fp[h];
                while x != h {
                    x = self.fp[x];
                    len += 1;
                }
                return Err(TriangulationError::NotATriangle(len));
            }
            seen[i] = true;
            seen[j] = true;
            seen[k] = true;
            let cols = [self.colouring[i], self.colouring[j], self.colouring[k]];
            if cols[0] == cols[1] && cols[1] == cols[2] {
                return Err(TriangulationError::MonochromaticFace(h));
            }
            for degenerate in [Colour::Purple, Colour::Green] {
                if cols.iter().filter(|&&c| c == degenerate).count() > 1 {
                    return Err(TriangulationError::DoubledDegenerateColour(h, degenerate));
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn num_half_edges(&self) -> usize {
        self.ep.num_half_edges()
    }

    pub fn num_edges(&self) -> usize {
        self.ep.num_edges()
    }

    pub fn num_folded_edges(&self) -> usize {
        self.ep.num_folded_edges()
    }

    pub fn involution(&self) -> &Involution {
        &self.ep
    }

    /// Next half-edge around the face.
    pub fn face_next(&self, h: Hedge) -> Hedge {
        Hedge(self.fp[h.0])
    }

    /// Canonical edge of a half-edge.
    pub fn norm(&self, h: Hedge) -> EdgeIndex {
        self.ep.norm(h)
    }

    pub fn colour(&self, h: Hedge) -> Colour {
        self.colouring[h.0]
    }

    pub fn edge_colour(&self, e: EdgeIndex) -> Colour {
        self.colouring[e.0]
    }

    pub fn set_edge_colour(&mut self, e: EdgeIndex, col: Colour) {
        self.colouring[e.0] = col;
        let p = self.ep.pairing_image(e.0);
        self.colouring[p] = col;
    }

    /// Whether some edge carries the undetermined (`Purple`) colour.
    pub fn is_reduced(&self) -> bool {
        self.colouring.iter().any(|&c| c == Colour::Purple)
    }

    pub fn has_green(&self) -> bool {
        self.colouring.iter().any(|&c| c == Colour::Green)
    }

    /// The vertex permutation `vp = ep ∘ fp⁻¹`.
    pub fn vertex_permutation(&self) -> Permutation {
        let n = self.num_half_edges();
        let mut fp_inv = vec![0usize; n];
        for (h, &img) in self.fp.iter().enumerate() {
            fp_inv[img] = h;
        }
        let map: Vec<usize> = (0..n).map(|h| self.ep.pairing_image(fp_inv[h])).collect();
        // a permutation by construction
        Permutation::from_map(map).unwrap_or_else(|_| Permutation::id(n))
    }

    /// Total angle at each vertex in multiples of π, followed by one entry
    /// `1` per folded edge.
    ///
    /// Walking around a vertex, each step advances the direction by the
    /// difference of the colour quarter-positions; a full π corresponds to
    /// four quarters.
    pub fn angles(&self) -> Vec<usize> {
        let vp = self.vertex_permutation();
        let n = self.num_half_edges();
        let mut seen = vec![false; n];
        let mut out = Vec::new();
        for start in 0..n {
            if seen[start] {
                continue;
            }
            let mut quarters = 0;
            let mut x = start;
            while !seen[x] {
                seen[x] = true;
                let y = vp.image(x);
                quarters += (self.colouring[y].quarter() + 4 - self.colouring[x].quarter()) % 4;
                x = y;
            }
            out.push(quarters / 4);
        }
        out.extend(std::iter::repeat(1).take(self.num_folded_edges()));
        out
    }

    /// The square about an edge: sides `(a, b, c, d)` of the two faces
    /// `(e, a, b)` and `(ep e, c, d)`. For folded edges `c = a`, `d = b`.
    pub fn square_about_edge(&self, e: EdgeIndex) -> (Hedge, Hedge, Hedge, Hedge) {
        let ee = self.ep.pairing_image(e.0);
        let a = self.fp[e.0];
        let b = self.fp[a];
        let c = self.fp[ee];
        let d = self.fp[c];
        (Hedge(a), Hedge(b), Hedge(c), Hedge(d))
    }

    pub fn is_forward_flippable(&self, e: EdgeIndex) -> bool {
        match self.colouring[e.0] {
            Colour::Purple => true,
            Colour::Green => false,
            _ => {
                let (a, b, c, d) = self.square_about_edge(e);
                self.colour(a) == Colour::Blue
                    && self.colour(b) == Colour::Red
                    && self.colour(c) == Colour::Blue
                    && self.colour(d) == Colour::Red
            }
        }
    }

    pub fn is_backward_flippable(&self, e: EdgeIndex) -> bool {
        match self.colouring[e.0] {
            Colour::Green => true,
            Colour::Purple => false,
            _ => {
                let (a, b, c, d) = self.square_about_edge(e);
                self.colour(a) == Colour::Red
                    && self.colour(b) == Colour::Blue
                    && self.colour(c) == Colour::Red
                    && self.colour(d) == Colour::Blue
            }
        }
    }

    pub fn forward_flippable_edges(&self) -> Vec<EdgeIndex> {
        (0..self.num_edges())
            .map(EdgeIndex)
            .filter(|&e| self.is_forward_flippable(e))
            .collect()
    }

    pub fn backward_flippable_edges(&self) -> Vec<EdgeIndex> {
        (0..self.num_edges())
            .map(EdgeIndex)
            .filter(|&e| self.is_backward_flippable(e))
            .collect()
    }

    /// Forgets the colour of every forward flippable edge (sets it to
    /// `Purple`), turning the triangulation into its reduced form.
    pub fn forget_forward_flippable_colours(&mut self) {
        for e in self.forward_flippable_edges() {
            self.set_edge_colour(e, Colour::Purple);
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    fn half_edge(&self, h: Hedge) -> Result<EdgeIndex, TriangulationError> {
        if h.0 >= self.num_half_edges() {
            return Err(TriangulationError::HalfEdgeOutOfRange(h.0));
        }
        Ok(self.ep.norm(h))
    }

    /// Flips edge `e` forward, recolouring it to `col`.
    ///
    /// Either half-edge of the pair is accepted. In a reduced
    /// triangulation the side edges of the new square that become forward
    /// flippable are re-forgotten to `Purple`.
    pub fn flip(&mut self, e: Hedge, col: Colour) -> Result<(), TriangulationError> {
        self.flip_with_subspace(e, col, None)
    }

    pub(crate) fn flip_with_subspace(
        &mut self,
        e: Hedge,
        col: Colour,
        subspace: Option<&mut QMatrix>,
    ) -> Result<(), TriangulationError> {
        let e = self.half_edge(e)?;
        if !col.is_definite() {
            return Err(TriangulationError::IndefiniteFlipColour(col));
        }
        if !self.is_forward_flippable(e) {
            return Err(TriangulationError::NotForwardFlippable(e));
        }
        let ee = self.ep.pairing_image(e.0);
        let a = self.fp[e.0];
        let b = self.fp[a];
        if a == ee || b == ee {
            return Err(TriangulationError::NotFlippable(e));
        }
        let c = self.fp[ee];
        let d = self.fp[c];

        if let Some(m) = subspace {
            // coordinate change: the new diagonal measures the difference
            // of the opposite sides, sign fixed by the new colour
            let ea = self.ep.norm(Hedge(a)).0;
            let ed = self.ep.norm(Hedge(d)).0;
            for i in 0..m.nrows() {
                let v = if col == Colour::Red {
                    m.entry(i, ed) - m.entry(i, ea)
                } else {
                    m.entry(i, ea) - m.entry(i, ed)
                };
                let mut row = m.row(i).to_vec();
                row[e.0] = v;
                m.set_row(i, row);
            }
        }

        let reduced = self.is_reduced();
        self.fp[e.0] = b;
        self.fp[b] = c;
        self.fp[c] = e.0;
        self.fp[a] = ee;
        self.fp[ee] = d;
        self.fp[d] = a;
        self.colouring[e.0] = col;
        self.colouring[ee] = col;

        if reduced {
            let mut sides: Vec<EdgeIndex> =
                [a, b, c, d].iter().map(|&h| self.ep.norm(Hedge(h))).collect();
            sides.sort_unstable();
            sides.dedup();
            // evaluate against the post-flip snapshot, then recolour
            let newly: Vec<EdgeIndex> = sides
                .into_iter()
                .filter(|&x| self.edge_colour(x).is_definite() && self.is_forward_flippable(x))
                .collect();
            for x in newly {
                self.set_edge_colour(x, Colour::Purple);
            }
        }
        Ok(())
    }

    /// Undoes a forward flip of edge `e`, recolouring it to `col`.
    pub fn flip_back(&mut self, e: Hedge, col: Colour) -> Result<(), TriangulationError> {
        self.flip_back_with_subspace(e, col, None)
    }

    pub(crate) fn flip_back_with_subspace(
        &mut self,
        e: Hedge,
        col: Colour,
        subspace: Option<&mut QMatrix>,
    ) -> Result<(), TriangulationError> {
        let e = self.half_edge(e)?;
        if !col.is_definite() {
            return Err(TriangulationError::IndefiniteFlipColour(col));
        }
        if !self.is_backward_flippable(e) {
            return Err(TriangulationError::NotBackwardFlippable(e));
        }
        let ee = self.ep.pairing_image(e.0);
        let u = self.fp[e.0];
        let v = self.fp[u];
        if u == ee || v == ee {
            return Err(TriangulationError::NotFlippable(e));
        }
        let s = self.fp[ee];
        let t = self.fp[s];

        if let Some(m) = subspace {
            // the restored diagonal is large again: sum of its square sides
            let eu = self.ep.norm(Hedge(u)).0;
            let et = self.ep.norm(Hedge(t)).0;
            for i in 0..m.nrows() {
                let val = m.entry(i, eu) + m.entry(i, et);
                let mut row = m.row(i).to_vec();
                row[e.0] = val;
                m.set_row(i, row);
            }
        }

        self.fp[e.0] = t;
        self.fp[t] = u;
        self.fp[u] = e.0;
        self.fp[ee] = v;
        self.fp[v] = s;
        self.fp[s] = ee;
        self.colouring[e.0] = col;
        self.colouring[ee] = col;
        Ok(())
    }

    /// Relabels the half-edges by an equivariant permutation.
    pub fn relabel(&mut self, r: &Permutation) -> Result<(), TriangulationError> {
        if r.len() != self.num_half_edges() {
            return Err(PermutationError::LengthMismatch {
                got: r.len(),
                expected: self.num_half_edges(),
            }
            .into());
        }
        if !r.commutes_with(&self.ep) {
            let h = (0..r.len())
                .find(|&h| r.image(self.ep.pairing_image(h)) != self.ep.pairing_image(r.image(h)))
                .unwrap_or(0);
            return Err(PermutationError::NotEquivariant(h).into());
        }
        let n = self.num_half_edges();
        let mut fp = vec![0usize; n];
        let mut colouring = vec![Colour::Red; n];
        for h in 0..n {
            fp[r.image(h)] = r.image(self.fp[h]);
            colouring[r.image(h)] = self.colouring[h];
        }
        self.fp = fp;
        self.colouring = colouring;
        Ok(())
    }

    /// Parses a relabelling in cycle notation against this triangulation's
    /// involution.
    pub fn parse_relabelling(&self, s: &str) -> Result<Permutation, TriangulationError> {
        Ok(Permutation::from_cycle_string(s, &self.ep)?)
    }

    /// Swaps the two half-edge labels of one edge.
    pub fn swap(&mut self, e: EdgeIndex) -> Result<(), TriangulationError> {
        let ee = self.ep.pairing_image(e.0);
        let t = Permutation::transposition(self.num_half_edges(), e.0, ee);
        self.relabel(&t)
    }

    /// Quarter turn of the underlying surface: every colour is rotated,
    /// the face structure is unchanged.
    pub fn rotate(&mut self) {
        for c in self.colouring.iter_mut() {
            *c = c.rotated();
        }
    }

    // ------------------------------------------------------------------
    // Train track structure
    // ------------------------------------------------------------------

    /// The large half-edge of the face through `h` for the vertical train
    /// track: the `Purple` edge if the face has one, else the unique
    /// corner followed by Blue then Red.
    fn large_corner(&self, h: usize) -> Result<usize, TriangulationError> {
        let face = [h, self.fp[h], self.fp[self.fp[h]]];
        for &x in &face {
            if self.colouring[x] == Colour::Green {
                return Err(TriangulationError::GreenSwitch(self.ep.norm(Hedge(x))));
            }
        }
        if let Some(&x) = face.iter().find(|&&x| self.colouring[x] == Colour::Purple) {
            return Ok(x);
        }
        let mut large = None;
        for &x in &face {
            if self.colouring[self.fp[x]] == Colour::Blue
                && self.colouring[self.fp[self.fp[x]]] == Colour::Red
            {
                if large.is_some() {
                    return Err(TriangulationError::NoLargeEdge(h));
                }
                large = Some(x);
            }
        }
        large.ok_or(TriangulationError::NoLargeEdge(h))
    }

    /// The vertical switch conditions, one row `x_large − x_s1 − x_s2`
    /// per face.
    pub fn switch_matrix(&self) -> Result<QMatrix, TriangulationError> {
        let n = self.num_half_edges();
        let ne = self.num_edges();
        let mut seen = vec![false; n];
        let mut m = QMatrix::zero(0, ne);
        for h in 0..n {
            if seen[h] {
                continue;
            }
            seen[h] = true;
            seen[self.fp[h]] = true;
            seen[self.fp[self.fp[h]]] = true;
            let l = self.large_corner(h)?;
            let mut row = vec![crate::matrix::rational(0); ne];
            let idx = |x: usize| self.ep.norm(Hedge(x)).0;
            let one = crate::matrix::rational(1);
            row[idx(l)] += &one;
            row[idx(self.fp[l])] -= &one;
            row[idx(self.fp[self.fp[l]])] -= &one;
            m.push_row(row);
        }
        Ok(m)
    }

    // ------------------------------------------------------------------
    // Homological action
    // ------------------------------------------------------------------

    /// Multiplies `m` (rows indexed by current edges, expressed in the
    /// start basis) by the action of flipping `e`. Must be called *before*
    /// the flip mutates the triangulation.
    ///
    /// With `twist` the action is on unoriented train-track coordinates
    /// (`row e ← row a + row d`, entrywise non-negative along forward
    /// sequences); without it, orientation signs apply.
    pub fn flip_homological_action(&self, e: EdgeIndex, m: &mut QMatrix, twist: bool) {
        let ne = self.num_edges();
        let (a, _, _, d) = self.square_about_edge(e);
        let (ea, sa) = if a.0 < ne { (a.0, 1) } else { (self.ep.pairing_image(a.0), -1) };
        let (ed, sd) = if d.0 < ne { (d.0, 1) } else { (self.ep.pairing_image(d.0), -1) };
        let mut row = Vec::with_capacity(m.ncols());
        for j in 0..m.ncols() {
            let va = m.entry(ea, j);
            let vd = m.entry(ed, j);
            row.push(if twist {
                va + vd
            } else {
                let va = if sa < 0 { -va.clone() } else { va.clone() };
                let vd = if sd < 0 { -vd.clone() } else { vd.clone() };
                va + vd
            });
        }
        m.set_row(e.0, row);
    }

    /// Applies the relabelling action on `m`: rows move to their image
    /// edges, with a sign when the orientation reverses (untwisted only).
    pub fn relabel_homological_action(
        &self,
        r: &Permutation,
        m: &mut QMatrix,
        twist: bool,
    ) -> Result<(), TriangulationError> {
        if r.len() != self.num_half_edges() {
            return Err(PermutationError::LengthMismatch {
                got: r.len(),
                expected: self.num_half_edges(),
            }
            .into());
        }
        let ne = self.num_edges();
        let mut rows: Vec<Vec<_>> = vec![Vec::new(); ne];
        for e in 0..ne {
            let img = r.image(e);
            let (img, reversed) = if img < ne {
                (img, false)
            } else {
                (self.ep.pairing_image(img), true)
            };
            let row = m.row(e).to_vec();
            rows[img] = if reversed && !twist {
                row.into_iter().map(|v| -v).collect()
            } else {
                row
            };
        }
        for (e, row) in rows.into_iter().enumerate() {
            m.set_row(e, row);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// The face permutation in cycle notation.
    pub fn face_cycle_string(&self) -> String {
        raw_cycle_string(&self.fp, &self.ep)
    }

    /// The colouring as one character per edge.
    pub fn colour_string(&self) -> String {
        (0..self.num_edges())
            .map(|e| self.colouring[e].to_char())
            .collect()
    }
}

impl fmt::Display for VeeringTriangulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VeeringTriangulation(\"{}\", \"{}\")",
            self.face_cycle_string(),
            self.colour_string()
        )
    }
}

#[cfg(test)]
mod test;
