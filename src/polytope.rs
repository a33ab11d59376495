//! Exact polyhedral cones in H-representation.
//!
//! A [`Cone`] is a homogeneous system of rational equalities and `>= 0`
//! inequalities. The layer stays in H-representation throughout: dimension
//! queries reduce to implicit-equality detection by exact linear
//! programming, and canonical (hashable) forms are echelonized linear
//! hulls. No vertex or ray enumeration anywhere.

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::matrix::QMatrix;

/// A polyhedral cone `{ x : E x = 0, I x >= 0 }` over the rationals.
///
/// # Examples
///
/// ```
/// use veering::polytope::Cone;
/// use veering::matrix::rational;
///
/// // the non-negative quadrant cut to the line x = y
/// let mut cone = Cone::nonnegative_orthant(2);
/// cone.push_equality(vec![rational(1), rational(-1)]);
/// assert_eq!(cone.dimension(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Cone {
    dim: usize,
    equalities: Vec<Vec<BigRational>>,
    inequalities: Vec<Vec<BigRational>>,
}

/// Hashable canonical form of a cone: the echelonized equations of its
/// linear hull. Two faces of one polytope coincide exactly when their
/// hulls do.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConeKey(QMatrix);

impl Cone {
    /// The full space of the given dimension.
    pub fn new(dim: usize) -> Self {
        Cone {
            dim,
            equalities: Vec::new(),
            inequalities: Vec::new(),
        }
    }

    /// The cone `x >= 0` coordinatewise.
    pub fn nonnegative_orthant(dim: usize) -> Self {
        let mut cone = Cone::new(dim);
        for i in 0..dim {
            let mut v = vec![BigRational::zero(); dim];
            v[i] = BigRational::one();
            cone.inequalities.push(v);
        }
        cone
    }

    pub fn ambient_dimension(&self) -> usize {
        self.dim
    }

    /// Adds the constraint `v · x = 0`.
    ///
    /// # Panics
    ///
    /// Panics if `v` has the wrong length.
    pub fn push_equality(&mut self, v: Vec<BigRational>) {
        assert_eq!(v.len(), self.dim, "equality has wrong dimension");
        self.equalities.push(v);
    }

    /// Adds the constraint `v · x >= 0`.
    ///
    /// # Panics
    ///
    /// Panics if `v` has the wrong length.
    pub fn push_inequality(&mut self, v: Vec<BigRational>) {
        assert_eq!(v.len(), self.dim, "inequality has wrong dimension");
        self.inequalities.push(v);
    }

    /// A copy with one more equality.
    pub fn with_equality(&self, v: Vec<BigRational>) -> Self {
        let mut cone = self.clone();
        cone.push_equality(v);
        cone
    }

    /// A copy with one more inequality.
    pub fn with_inequality(&self, v: Vec<BigRational>) -> Self {
        let mut cone = self.clone();
        cone.push_inequality(v);
        cone
    }

    /// Whether some point of the cone has `target · x > 0`.
    ///
    /// Homogeneity lets the strict inequality be normalized to
    /// `target · x = 1`; the question is then pure feasibility.
    fn admits_positive(&self, target: &[BigRational]) -> bool {
        simplex_feasible(&self.equalities, &self.inequalities, target, self.dim)
    }

    /// The equations of the linear hull: explicit equalities plus every
    /// inequality that the cone cannot make strictly positive, in reduced
    /// echelon form.
    pub fn span_equations(&self) -> QMatrix {
        let mut eqs = QMatrix::from_rows(self.equalities.clone(), self.dim);
        for iq in &self.inequalities {
            if !self.admits_positive(iq) {
                eqs.push_row(iq.clone());
            }
        }
        eqs.echelonize();
        eqs.drop_zero_rows();
        eqs
    }

    /// The dimension of the cone as a subset of ambient space.
    pub fn dimension(&self) -> usize {
        self.dim - self.span_equations().nrows()
    }

    /// The hashable canonical form.
    pub fn canonical_key(&self) -> ConeKey {
        ConeKey(self.span_equations())
    }
}

/// Exact phase-1 simplex with Bland's rule: is there `x` with
/// `eq · x = 0` for all equalities, `iq · x >= 0` for all inequalities and
/// `target · x = 1`?
///
/// Free variables are split as `x = u − w` with `u, w >= 0` and every
/// inequality gets a slack, so the system is in equality standard form;
/// one artificial variable per row is then driven to zero. Bland's rule
/// guarantees termination, exact arithmetic removes tolerance questions.
fn simplex_feasible(
    equalities: &[Vec<BigRational>],
    inequalities: &[Vec<BigRational>],
    target: &[BigRational],
    dim: usize,
) -> bool {
    let num_slack = inequalities.len();
    let nv = 2 * dim + num_slack;
    let num_rows = equalities.len() + num_slack + 1;

    let mut rows: Vec<Vec<BigRational>> = Vec::with_capacity(num_rows);
    let mut rhs: Vec<BigRational> = Vec::with_capacity(num_rows);
    let split = |v: &[BigRational], slack: Option<usize>| -> Vec<BigRational> {
        let mut row = Vec::with_capacity(nv);
        row.extend(v.iter().cloned());
        row.extend(v.iter().map(|c| -c));
        row.extend((0..num_slack).map(|k| {
            if Some(k) == slack {
                -BigRational::one()
            } else {
                BigRational::zero()
            }
        }));
        row
    };
    for eq in equalities {
        rows.push(split(eq, None));
        rhs.push(BigRational::zero());
    }
    for (k, iq) in inequalities.iter().enumerate() {
        rows.push(split(iq, Some(k)));
        rhs.push(BigRational::zero());
    }
    rows.push(split(target, None));
    rhs.push(BigRational::one());

    let m = rows.len();
    for i in 0..m {
        if rhs[i].is_negative() {
            for v in rows[i].iter_mut() {
                *v = -v.clone();
            }
            let flipped = -rhs[i].clone();
            rhs[i] = flipped;
        }
    }

    // tableau columns: structural variables, artificials, right-hand side
    let ncols = nv + m;
    let mut tab: Vec<Vec<BigRational>> = Vec::with_capacity(m);
    for (i, row) in rows.into_iter().enumerate() {
        let mut t = row;
        t.extend((0..m).map(|j| {
            if j == i {
                BigRational::one()
            } else {
                BigRational::zero()
            }
        }));
        t.push(rhs[i].clone());
        tab.push(t);
    }
    let mut basis: Vec<usize> = (nv..nv + m).collect();

    // reduced costs for minimizing the artificial sum
    let mut cost = vec![BigRational::zero(); ncols + 1];
    for row in &tab {
        for (c, v) in cost.iter_mut().zip(row.iter()) {
            *c = &*c - v;
        }
    }
    for j in nv..nv + m {
        cost[j] = BigRational::zero();
    }

    loop {
        let Some(enter) = (0..ncols).find(|&j| cost[j].is_negative()) else {
            break;
        };
        let mut leave: Option<usize> = None;
        let mut best: Option<BigRational> = None;
        for i in 0..m {
            if tab[i][enter].is_positive() {
                let ratio = &tab[i][ncols] / &tab[i][enter];
                let better = match &best {
                    None => true,
                    Some(b) => {
                        ratio < *b
                            || (ratio == *b
                                && leave.map_or(true, |l| basis[i] < basis[l]))
                    }
                };
                if better {
                    best = Some(ratio);
                    leave = Some(i);
                }
            }
        }
        let Some(leave) = leave else {
            // the artificial objective is bounded below by zero, so an
            // unbounded pivot cannot occur on a well-formed tableau
            return false;
        };
        let pivot = tab[leave][enter].clone();
        for v in tab[leave].iter_mut() {
            *v = &*v / &pivot;
        }
        let pivot_row = tab[leave].clone();
        for (i, row) in tab.iter_mut().enumerate() {
            if i != leave && !row[enter].is_zero() {
                let f = row[enter].clone();
                for (v, p) in row.iter_mut().zip(pivot_row.iter()) {
                    *v = &*v - &(&f * p);
                }
            }
        }
        let f = cost[enter].clone();
        if !f.is_zero() {
            for (v, p) in cost.iter_mut().zip(pivot_row.iter()) {
                *v = &*v - &(&f * p);
            }
        }
        basis[leave] = enter;
    }
    cost[ncols].is_zero()
}
