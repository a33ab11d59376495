//! Linear families of coordinates on a veering triangulation.
//!
//! A [`VeeringTriangulationLinearFamily`] pairs a triangulation with a
//! full-rank rational subspace of edge coordinates, kept in reduced row
//! echelon form and satisfying the vertical switch condition row by row.
//! The subspace follows every structural mutation (`flip`, `flip_back`,
//! `relabel`, `rotate`), and the polytope layer answers core-ness and
//! geometric-flip questions about it.

use std::fmt;

use ahash::RandomState;
use indexmap::IndexMap;
use itertools::Itertools;
use num_rational::BigRational;
use num_traits::Zero;
use thiserror::Error;

use crate::colour::{Colour, Slope};
use crate::involution::{EdgeIndex, Hedge};
use crate::matrix::QMatrix;
use crate::permutation::Permutation;
use crate::polytope::{Cone, ConeKey};
use crate::triangulation::{TriangulationError, VeeringTriangulation};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinearFamilyError {
    #[error("subspace has {got} columns, expected one per edge ({expected})")]
    ColumnCount { got: usize, expected: usize },
    #[error("subspace matrix is not of full rank")]
    NotFullRank,
    #[error("subspace row {0} violates the switch condition")]
    SwitchCondition(usize),
    #[error("family is not geometric: polytope dimension {got}, expected {expected}")]
    NotGeometric { got: usize, expected: usize },
    #[error(transparent)]
    Triangulation(#[from] TriangulationError),
}

/// A veering triangulation with an invariant subspace of edge coordinates.
///
/// # Examples
///
/// ```
/// use veering::{VeeringTriangulation, VeeringTriangulationLinearFamily};
///
/// let vt = VeeringTriangulation::from_string("(0,1,2)(~0,~1,~2)", "RRB").unwrap();
/// let family = VeeringTriangulationLinearFamily::ambient(&vt).unwrap();
/// assert_eq!(
///     family.to_string(),
///     r#"VeeringTriangulationLinearFamily("(0,1,2)(~2,~0,~1)", "RRB", [(1, 0, -1), (0, 1, 1)])"#,
/// );
/// assert!(family.is_core());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VeeringTriangulationLinearFamily {
    vt: VeeringTriangulation,
    subspace: QMatrix,
}

impl VeeringTriangulationLinearFamily {
    /// Builds a family from generators; the matrix is echelonized and must
    /// be full rank with every row satisfying the switch conditions.
    pub fn new(
        vt: &VeeringTriangulation,
        mut subspace: QMatrix,
    ) -> Result<Self, LinearFamilyError> {
        if subspace.ncols() != vt.num_edges() {
            return Err(LinearFamilyError::ColumnCount {
                got: subspace.ncols(),
                expected: vt.num_edges(),
            });
        }
        let pivots = subspace.echelonize();
        if pivots.len() != subspace.nrows() {
            return Err(LinearFamilyError::NotFullRank);
        }
        let family = VeeringTriangulationLinearFamily {
            vt: vt.clone(),
            subspace,
        };
        family.verify()?;
        Ok(family)
    }

    /// Integer-row convenience constructor.
    pub fn from_int_rows<R: AsRef<[i64]>>(
        vt: &VeeringTriangulation,
        rows: &[R],
    ) -> Result<Self, LinearFamilyError> {
        Self::new(vt, QMatrix::from_int_rows(rows))
    }

    /// The ambient family: the full solution space of the vertical switch
    /// conditions.
    pub fn ambient(vt: &VeeringTriangulation) -> Result<Self, LinearFamilyError> {
        let subspace = vt.switch_matrix()?.right_kernel();
        Self::new(vt, subspace)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn triangulation(&self) -> &VeeringTriangulation {
        &self.vt
    }

    pub fn subspace(&self) -> &QMatrix {
        &self.subspace
    }

    /// The dimension of the family (number of subspace generators).
    pub fn dimension(&self) -> usize {
        self.subspace.nrows()
    }

    pub fn num_edges(&self) -> usize {
        self.vt.num_edges()
    }

    /// The subspace with the coordinates of `Blue` edges negated, i.e. the
    /// same family in horizontal coordinates.
    pub fn horizontal_subspace(&self) -> QMatrix {
        let mut mat = self.subspace.clone();
        for j in 0..self.num_edges() {
            if self.vt.edge_colour(EdgeIndex(j)) == Colour::Blue {
                for i in 0..mat.nrows() {
                    let v = -mat.entry(i, j).clone();
                    let mut row = mat.row(i).to_vec();
                    row[j] = v;
                    mat.set_row(i, row);
                }
            }
        }
        mat
    }

    /// Checks the family invariants: column count, full rank, echelon
    /// form, switch conditions on every row.
    pub fn verify(&self) -> Result<(), LinearFamilyError> {
        if self.subspace.ncols() != self.vt.num_edges() {
            return Err(LinearFamilyError::ColumnCount {
                got: self.subspace.ncols(),
                expected: self.vt.num_edges(),
            });
        }
        if !self.subspace.is_echelonized() || self.subspace.rank() != self.subspace.nrows() {
            return Err(LinearFamilyError::NotFullRank);
        }
        let switches = self.vt.switch_matrix()?;
        for (i, row) in self.subspace.rows().iter().enumerate() {
            for eq in switches.rows() {
                let dot: BigRational = eq.iter().zip(row.iter()).map(|(a, b)| a * b).sum();
                if !dot.is_zero() {
                    return Err(LinearFamilyError::SwitchCondition(i));
                }
            }
        }
        Ok(())
    }

    fn debug_verify(&self) {
        #[cfg(debug_assertions)]
        if let Err(err) = self.verify() {
            panic!("linear family invariant broken: {err}");
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Flips edge `e` forward, transporting and re-echelonizing the
    /// subspace.
    pub fn flip(&mut self, e: Hedge, col: Colour) -> Result<(), LinearFamilyError> {
        self.vt.flip_with_subspace(e, col, Some(&mut self.subspace))?;
        self.subspace.echelonize();
        self.debug_verify();
        Ok(())
    }

    /// Undoes a forward flip of edge `e`.
    pub fn flip_back(&mut self, e: Hedge, col: Colour) -> Result<(), LinearFamilyError> {
        self.vt
            .flip_back_with_subspace(e, col, Some(&mut self.subspace))?;
        self.subspace.echelonize();
        self.debug_verify();
        Ok(())
    }

    /// Relabels the half-edges, permuting the subspace columns
    /// accordingly.
    pub fn relabel(&mut self, r: &Permutation) -> Result<(), LinearFamilyError> {
        let rr = self.vt.involution().edge_relabelling(r).map_err(TriangulationError::from)?;
        self.vt.relabel(r)?;
        self.subspace.permute_columns(&rr);
        self.subspace.echelonize();
        self.debug_verify();
        Ok(())
    }

    /// Cycle-notation variant of [`VeeringTriangulationLinearFamily::relabel`].
    pub fn relabel_str(&mut self, s: &str) -> Result<(), LinearFamilyError> {
        let r = self.vt.parse_relabelling(s)?;
        self.relabel(&r)
    }

    /// Quarter turn: the subspace becomes its horizontal version and the
    /// triangulation rotates.
    ///
    /// ```
    /// use veering::{VeeringTriangulation, VeeringTriangulationLinearFamily};
    ///
    /// let vt = VeeringTriangulation::from_string(
    ///     "(0,1,2)(~0,~4,~2)(3,4,5)(~3,~1,~5)",
    ///     "BRRBRR",
    /// )
    /// .unwrap();
    /// let mut family = VeeringTriangulationLinearFamily::ambient(&vt).unwrap();
    /// family.rotate();
    /// assert_eq!(
    ///     family.to_string(),
    ///     r#"VeeringTriangulationLinearFamily("(0,1,2)(3,4,5)(~5,~3,~1)(~4,~2,~0)", "RBBRBB", [(1, 0, -1, 0, 0, 0), (0, 1, 1, 0, 1, 1), (0, 0, 0, 1, 0, -1)])"#,
    /// );
    /// ```
    pub fn rotate(&mut self) {
        let mut subspace = self.horizontal_subspace();
        subspace.echelonize();
        self.vt.rotate();
        self.subspace = subspace;
        self.debug_verify();
    }

    // ------------------------------------------------------------------
    // Polytopes
    // ------------------------------------------------------------------

    fn subspace_membership_equations(
        &self,
        cone: &mut Cone,
        offset: usize,
        slope: Slope,
    ) {
        let subspace = match slope {
            Slope::Vertical => self.subspace.clone(),
            Slope::Horizontal => self.horizontal_subspace(),
        };
        let ne = self.num_edges();
        for kernel_row in subspace.right_kernel().rows() {
            let mut v = vec![BigRational::zero(); cone.ambient_dimension()];
            v[offset..offset + ne].clone_from_slice(kernel_row);
            cone.push_equality(v);
        }
    }

    /// The cone of non-negative vectors of the subspace, in vertical or
    /// horizontal coordinates.
    pub fn train_track_polytope(&self, slope: Slope) -> Cone {
        let ne = self.num_edges();
        let mut cone = Cone::nonnegative_orthant(ne);
        self.subspace_membership_equations(&mut cone, 0, slope);
        cone
    }

    /// A family is core when no coordinate is forced to vanish across the
    /// whole non-negative locus, i.e. the train-track polytope is full
    /// dimensional inside the subspace.
    ///
    /// ```
    /// use veering::{VeeringTriangulation, VeeringTriangulationLinearFamily};
    ///
    /// let vt = VeeringTriangulation::from_string("(0,1,2)(~0,~1,~2)", "RRB").unwrap();
    /// let thin = VeeringTriangulationLinearFamily::from_int_rows(&vt, &[vec![1, 0, -1]]).unwrap();
    /// assert!(!thin.is_core());
    /// ```
    pub fn is_core(&self) -> bool {
        self.train_track_polytope(Slope::Vertical).dimension() == self.dimension()
    }

    /// The geometric (L∞-Delaunay) polytope in doubled coordinates:
    /// vertical weights `x`, horizontal weights `y`, both non-negative and
    /// in the family, with `y_a + y_d >= x_e` per forward flippable edge
    /// and `x_a + x_d >= y_e` per backward flippable edge.
    pub fn geometric_polytope(&self) -> Cone {
        let ne = self.num_edges();
        let mut cone = Cone::nonnegative_orthant(2 * ne);
        self.subspace_membership_equations(&mut cone, 0, Slope::Vertical);
        self.subspace_membership_equations(&mut cone, ne, Slope::Horizontal);
        for e in self.vt.forward_flippable_edges() {
            let (a, _, _, d) = self.vt.square_about_edge(e);
            let mut v = vec![BigRational::zero(); 2 * ne];
            v[ne + self.vt.norm(a).0] += crate::matrix::rational(1);
            v[ne + self.vt.norm(d).0] += crate::matrix::rational(1);
            v[e.0] -= crate::matrix::rational(1);
            cone.push_inequality(v);
        }
        for e in self.vt.backward_flippable_edges() {
            let (a, _, _, d) = self.vt.square_about_edge(e);
            let mut v = vec![BigRational::zero(); 2 * ne];
            v[self.vt.norm(a).0] += crate::matrix::rational(1);
            v[self.vt.norm(d).0] += crate::matrix::rational(1);
            v[ne + e.0] -= crate::matrix::rational(1);
            cone.push_inequality(v);
        }
        cone
    }

    /// The geometric flips: subsets of forward flippable edges crossing a
    /// common facet of the geometric polytope, with the colour assignments
    /// that keep the facet full dimensional.
    ///
    /// Facets are grouped by the canonical form of their supporting face;
    /// for each group every Red/Blue assignment of its edges is tested
    /// against the side constraints (`x_a <= x_d` for Red, `x_a >= x_d`
    /// for Blue).
    pub fn geometric_flips(
        &self,
    ) -> Result<Vec<Vec<(EdgeIndex, Colour)>>, LinearFamilyError> {
        let ne = self.num_edges();
        let dim = self.dimension();
        let polytope = self.geometric_polytope();
        let full = polytope.dimension();
        if full != 2 * dim {
            return Err(LinearFamilyError::NotGeometric {
                got: full,
                expected: 2 * dim,
            });
        }

        let mut facets: IndexMap<ConeKey, (Cone, Vec<EdgeIndex>), RandomState> =
            IndexMap::default();
        for e in self.vt.forward_flippable_edges() {
            let (a, _, _, d) = self.vt.square_about_edge(e);
            let mut v = vec![BigRational::zero(); 2 * ne];
            v[e.0] += crate::matrix::rational(1);
            v[ne + self.vt.norm(a).0] -= crate::matrix::rational(1);
            v[ne + self.vt.norm(d).0] -= crate::matrix::rational(1);
            let face = polytope.with_equality(v);
            let face_dim = face.dimension();
            if face_dim == 2 * dim - 1 {
                facets
                    .entry(face.canonical_key())
                    .or_insert_with(|| (face, Vec::new()))
                    .1
                    .push(e);
            }
        }

        let mut neighbours = Vec::new();
        for (face, edges) in facets.values() {
            for cols in edges
                .iter()
                .map(|_| [Colour::Blue, Colour::Red])
                .multi_cartesian_product()
            {
                let mut candidate = face.clone();
                for (&e, &col) in edges.iter().zip(cols.iter()) {
                    let (a, _, _, d) = self.vt.square_about_edge(e);
                    let mut v = vec![BigRational::zero(); 2 * ne];
                    if col == Colour::Red {
                        v[self.vt.norm(d).0] += crate::matrix::rational(1);
                        v[self.vt.norm(a).0] -= crate::matrix::rational(1);
                    } else {
                        v[self.vt.norm(a).0] += crate::matrix::rational(1);
                        v[self.vt.norm(d).0] -= crate::matrix::rational(1);
                    }
                    candidate.push_inequality(v);
                }
                if candidate.dimension() == 2 * dim - 1 {
                    neighbours.push(edges.iter().copied().zip(cols).collect());
                }
            }
        }
        Ok(neighbours)
    }
}

impl fmt::Display for VeeringTriangulationLinearFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self
            .subspace
            .rows()
            .iter()
            .map(|row| {
                let inner = row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                format!("({inner})")
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "VeeringTriangulationLinearFamily(\"{}\", \"{}\", [{}])",
            self.vt.face_cycle_string(),
            self.vt.colour_string(),
            rows
        )
    }
}
