use similar_asserts::assert_eq;

use super::*;
use crate::matrix::QMatrix;

fn vt(faces: &str, colours: &str) -> VeeringTriangulation {
    VeeringTriangulation::from_string(faces, colours).unwrap()
}

fn seq(start: &VeeringTriangulation, flips: &str, relabelling: &str) -> VeeringFlipSequence {
    let r = if relabelling.is_empty() {
        None
    } else {
        Some(relabelling)
    };
    VeeringFlipSequence::from_strings(start, flips, r).unwrap()
}

fn unflipped(f: &VeeringFlipSequence) -> Vec<usize> {
    f.unflipped_edges().unwrap().into_iter().map(|e| e.0).collect()
}

// ---------------------------------------------------------------- rendering

#[test]
fn identity_sequence_display() {
    let t = vt("(0,1,2)(~1,~2,~0)", "RRB");
    let f = VeeringFlipSequence::new(&t).unwrap();
    assert_eq!(
        f.to_string(),
        r#"VeeringFlipSequence(VeeringTriangulation("(0,1,2)(~2,~0,~1)", "RRB"), "", "(0)(1)(2)(~2)(~1)(~0)")"#
    );
}

#[test]
fn reduced_snapshot_forgets_colours() {
    let mut t = vt("(0,1,2)(~1,~2,~0)", "RRB");
    t.forget_forward_flippable_colours();
    let f = seq(&t, "1R 0R", "(0,5)(1,3)");
    assert_eq!(f.start().colour_string(), "RPB");
    assert_eq!(
        f.relabelling().cycle_string(f.end().involution()),
        "(0,~0)(1,~2)(2,~1)"
    );
}

#[test]
fn flip_string_round_trip() {
    let t = vt("(0,1,2)(~1,~2,~0)", "RRB");
    let f = seq(&t, "1R 0R", "");
    let rendered = flip_sequence_to_string(f.flips());
    assert_eq!(rendered, "1R 0R");
    let reparsed = VeeringFlipSequence::with_flips(
        &t,
        &flip_sequence_from_string(&rendered).unwrap(),
    )
    .unwrap();
    assert_eq!(f, reparsed);
    assert!(flip_sequence_from_string("3X").is_err());
    assert!(flip_sequence_from_string("R").is_err());
}

// ---------------------------------------------------------------- the torus

fn torus_b_r() -> (VeeringFlipSequence, VeeringFlipSequence) {
    let t = vt("(0,1,2)(~0,~1,~2)", "PBR");
    let b = seq(&t, "0B", "(1,0,~1,~0)(2,~2)");
    let r = seq(&t, "0R", "(0,2)(1,~1)");
    (b, r)
}

#[test]
fn torus_twists_are_closed() {
    let (b, r) = torus_b_r();
    assert!(b.is_closed());
    assert!(r.is_closed());
    b.verify().unwrap();
    r.verify().unwrap();
}

#[test]
fn torus_unflipped_edges() {
    let (b, r) = torus_b_r();
    assert_eq!(unflipped(&b), vec![2]);
    assert_eq!(unflipped(&r), vec![1]);
    assert_eq!(unflipped(&b.pow(3).unwrap()), vec![2]);
    assert_eq!(unflipped(&(&b * &r)), Vec::<usize>::new());
    assert_eq!(unflipped(&(&r * &b)), Vec::<usize>::new());
    assert!((&b * &r).is_pseudo_anosov());
    assert!(!b.is_pseudo_anosov());
}

#[test]
fn identity_element_laws() {
    let (b, _) = torus_b_r();
    let id = VeeringFlipSequence::new(b.end()).unwrap();
    assert_eq!(&b * &id, b);
    assert_eq!(&id * &b, b);
    assert_eq!(b.pow(0).unwrap(), id);
}

#[test]
fn power_is_iterated_composition() {
    let (b, _) = torus_b_r();
    assert_eq!(b.pow(2).unwrap(), &b * &b);
    assert_eq!(b.pow(1).unwrap(), b);
    assert_eq!(b.pow(3).unwrap(), &(&b * &b) * &b);
}

#[test]
fn pseudo_anosov_powers_stay_pseudo_anosov() {
    let (b, r) = torus_b_r();
    let f = &b * &r;
    for k in 1..=4 {
        assert!(f.pow(k).unwrap().is_pseudo_anosov());
    }
}

#[test]
fn power_of_open_sequence_fails() {
    let t = vt("(0,1,2)(~0,~1,~2)", "PBR");
    let mut f = VeeringFlipSequence::new(&t).unwrap();
    f.flip(Hedge(0), Colour::Blue).unwrap();
    assert!(!f.is_closed());
    assert_eq!(f.pow(2), Err(FlipSequenceError::NotClosed("power")));
    assert!(matches!(
        f.unflipped_edges(),
        Err(FlipSequenceError::NotClosed(_))
    ));
    assert!(!f.is_pseudo_anosov());
}

#[test]
fn composition_requires_matching_ends() {
    let (b, _) = torus_b_r();
    let other = VeeringFlipSequence::new(&vt("(0,1,2)(~0,~1,~2)", "RRB")).unwrap();
    assert_eq!(
        b.try_compose(&other),
        Err(FlipSequenceError::CompositionUndefined)
    );
}

#[test]
fn green_start_is_rejected() {
    let t = vt("(0,1,2)", "GRB");
    assert_eq!(
        VeeringFlipSequence::new(&t),
        Err(FlipSequenceError::GreenStart)
    );
}

// ---------------------------------------------------------------- the sphere

fn sphere_vc() -> VeeringTriangulation {
    vt("(0,~5,4)(3,5,6)(1,2,~6)", "PPBPRBR")
}

fn sphere_vr() -> VeeringTriangulation {
    vt("(0,6,5)(1,2,~6)(3,4,~5)", "BPBBRPR")
}

#[test]
fn sphere_cycles_are_closed() {
    let vc = sphere_vc();
    for (flips, relabelling) in [
        ("1B", "(1,2)"),
        ("0R", "(0,4)"),
        ("0B 3B 5B", "(0,3)"),
        ("1R 3R 6R", "(1,3)(6,~6)"),
    ] {
        let f = seq(&vc, flips, relabelling);
        assert!(f.is_closed(), "{flips} with {relabelling}");
        f.verify().unwrap();
    }
}

#[test]
fn sphere_unflipped_edges() {
    let vc = sphere_vc();
    let cr5 = seq(&vc, "1B", "(1,2)");
    let cl5 = seq(&vc, "0R", "(0,4)");
    let r3 = seq(&vc, "0B 3B", "(0,3)");
    let r2 = seq(&sphere_vr(), "5B", "");
    assert_eq!(unflipped(&cr5), vec![0, 3, 4, 5, 6]);
    assert_eq!(unflipped(&cl5), vec![1, 2, 3, 5, 6]);
    assert_eq!(unflipped(&(&cl5 * &cr5)), vec![3, 5, 6]);
    // r3 ends exactly at r2's start, and back
    assert_eq!(unflipped(&(&r3 * &r2)), vec![1, 2, 4, 6]);
    let chain = &(&(&(&(&(&r3 * &r2) * &cl5) * &r3) * &r2) * &cr5) * &cl5;
    assert_eq!(unflipped(&chain), vec![6]);
}

#[test]
fn end_colouring_resolves_forced_colours() {
    let vc = sphere_vc();
    let l32 = seq(&vc, "1R 3R 6R", "(1,3)(6,~6)");
    let cr5 = seq(&vc, "1B", "(1,2)");
    let cl5 = seq(&vc, "0R", "(0,4)");
    use Colour::{Blue as B, Purple as P, Red as R};
    assert_eq!(l32.end_colouring(), vec![P, R, B, R, R, B, R]);
    assert_eq!(
        (&(&l32 * &cr5) * &cl5).end_colouring(),
        vec![R, B, B, R, R, B, R]
    );
}

#[test]
fn coloured_start_fails_on_undetermined_edges() {
    let vc = sphere_vc();
    let r32 = seq(&vc, "0B 3B 5B", "(0,3)");
    assert_eq!(
        r32.coloured_start(),
        Err(FlipSequenceError::UndeterminedColour(EdgeIndex(1)))
    );
    assert_eq!(
        r32.inverse(),
        Err(FlipSequenceError::UndeterminedColour(EdgeIndex(1)))
    );
}

// ------------------------------------------------------ pseudo-Anosov family

#[test]
fn pseudo_anosov_family() {
    let v2 = vt("(0,3,4)(1,~3,5)(2,6,~4)", "PPPBRRB");
    let v3 = vt("(0,4,3)(1,5,~3)(2,6,~4)", "BBPPRRB");
    let f2 = seq(&v2, "0B 1B", "");
    let f3 = seq(&v3, "3B", "(0,1)");
    let f4 = seq(&v3, "2R 3R", "(0,6,1)(2,5)(3,4)");
    let f6 = seq(&v3, "2B", "(2,6)");

    assert!((&(&f2 * &f4) * &f3).is_pseudo_anosov());
    assert!((&f4 * &f6).is_pseudo_anosov());
    assert!((&(&f4 * &f4) * &f6).is_pseudo_anosov());

    assert!(!f2.is_pseudo_anosov());
    assert!(!(&f2 * &f3).is_pseudo_anosov());
    assert!(!(&f3 * &f2).is_pseudo_anosov());
    assert!(!(&(&(&f4 * &f4) * &f4) * &f6).is_pseudo_anosov());
}

#[test]
fn composition_is_associative() {
    let v2 = vt("(0,3,4)(1,~3,5)(2,6,~4)", "PPPBRRB");
    let v3 = vt("(0,4,3)(1,5,~3)(2,6,~4)", "BBPPRRB");
    let f2 = seq(&v2, "0B 1B", "");
    let f3 = seq(&v3, "3B", "(0,1)");
    let a = &(&f2 * &f3) * &(&f2 * &f3);
    let b = &(&f2 * &(&f3 * &f2)) * &f3;
    let c = &f2 * &(&(&f3 * &f2) * &f3);
    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[test]
fn in_place_composition_pulls_flips_back() {
    let v0 = vt("(0,3,4)(1,~3,5)(2,6,~4)", "PPPBRRB");
    let mut f = seq(&v0, "2B", "(2,6)");
    assert!(f.is_closed());
    let g = f.clone();
    f *= &g;
    assert_eq!(flip_sequence_to_string(f.flips()), "2B 6B");
    assert!(f.relabelling().is_identity());
}

// ----------------------------------------------------------------- inversion

#[test]
fn inverse_of_non_reduced_sequence() {
    let t = vt("(0,1,2)(~1,~2,~0)", "RRB");
    let f = seq(&t, "1R 0R", "");
    assert!(f.is_closed());
    let inv = f.inverse().unwrap();
    assert_eq!(
        inv.to_string(),
        r#"VeeringFlipSequence(VeeringTriangulation("(0,1,2)(~2,~0,~1)", "BBR"), "0B 1B", "(0,~0)(1,~1)(2)(~2)")"#
    );
    assert!(inv.is_closed());
    assert_eq!(inv.inverse().unwrap(), f);
}

#[test]
fn inverse_of_reduced_sequence() {
    let v = sphere_vr();
    let b = seq(&v, "1B", "(1,2)");
    let r = seq(&v, "1R 5R", "(0,2,3)(1,4)(5,6)");
    let inv = (&b * &r).inverse().unwrap();
    let expected = seq(&vt("(0,6,5)(1,2,~6)(3,4,~5)", "RBRRPBP"), "6B 4R 3B", "(0,3,1,4,2)(5,6,~5,~6)");
    assert_eq!(inv, expected);
}

#[test]
fn double_inverse_is_identity_on_closed_reduced_sequences() {
    let (b, r) = torus_b_r();
    for f in [&b, &r, &(&b * &r)] {
        let inv = f.inverse().unwrap();
        assert!(inv.is_closed());
        assert_eq!(&inv.inverse().unwrap(), f);
    }
}

// ------------------------------------------------------------------ matrices

fn torus_matrices() -> (QMatrix, QMatrix) {
    let (b, r) = torus_b_r();
    (b.matrix(true).unwrap(), r.matrix(true).unwrap())
}

#[test]
fn twisted_matrices_of_the_torus_twists() {
    let (mb, mr) = torus_matrices();
    assert_eq!(
        mb,
        QMatrix::from_int_rows(&[vec![0, 1, 0], vec![0, 1, 1], vec![0, 0, 1]])
    );
    assert_eq!(
        mr,
        QMatrix::from_int_rows(&[vec![0, 0, 1], vec![0, 1, 0], vec![0, 1, 1]])
    );
}

#[test]
fn matrix_of_composition_is_reversed_product() {
    let (b, r) = torus_b_r();
    let (mb, mr) = torus_matrices();
    let br = &b * &r;
    assert_eq!(br.matrix(true).unwrap(), mr.mul(&mb));
    assert_eq!(
        br.matrix(true).unwrap(),
        QMatrix::from_int_rows(&[vec![0, 0, 1], vec![0, 1, 1], vec![0, 1, 2]])
    );
    assert_eq!(b.pow(2).unwrap().matrix(true).unwrap(), mb.mul(&mb));
    // untwisted version satisfies the same law
    let ub = b.matrix(false).unwrap();
    let ur = r.matrix(false).unwrap();
    assert_eq!(br.matrix(false).unwrap(), ur.mul(&ub));
    assert_eq!(
        ub,
        QMatrix::from_int_rows(&[vec![0, 1, 0], vec![0, -1, 1], vec![0, 0, -1]])
    );
}

#[test]
fn sphere_matrices() {
    let vc = sphere_vc();
    let r32 = seq(&vc, "0B 3B 5B", "(0,3)");
    let l32 = seq(&vc, "1R 3R 6R", "(1,3)(6,~6)");
    let mr = r32.matrix(true).unwrap();
    let ml = l32.matrix(true).unwrap();
    assert_eq!(
        mr,
        QMatrix::from_int_rows(&[
            vec![0, 0, 0, 0, 0, 1, 1],
            vec![0, 1, 0, 0, 0, 0, 0],
            vec![0, 0, 1, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 1, 1, 0],
            vec![0, 0, 0, 0, 1, 0, 0],
            vec![0, 0, 0, 0, 1, 1, 1],
            vec![0, 0, 0, 0, 0, 0, 1],
        ])
    );
    assert_eq!(
        ml,
        QMatrix::from_int_rows(&[
            vec![1, 0, 0, 0, 0, 0, 0],
            vec![0, 0, 0, 0, 0, 1, 1],
            vec![0, 0, 1, 0, 0, 0, 0],
            vec![0, 0, 1, 0, 0, 0, 1],
            vec![0, 0, 0, 0, 1, 0, 0],
            vec![0, 0, 0, 0, 0, 1, 0],
            vec![0, 0, 1, 0, 0, 1, 1],
        ])
    );
    assert_eq!((&r32 * &l32).matrix(true).unwrap(), ml.mul(&mr));
}

#[test]
fn matrix_inverse_matches_inverse_matrix() {
    let (b, _) = torus_b_r();
    assert_eq!(
        b.matrix_inverse(true).unwrap(),
        b.inverse().unwrap().matrix(true).unwrap()
    );
}

// ------------------------------------------------------------- swap and misc

#[test]
fn swap_changes_only_the_bookkeeping() {
    let t = vt("(0,1,2)(~1,~2,~0)", "RRB");
    let mut f = seq(&t, "1R 0R", "");
    f.swap(EdgeIndex(0)).unwrap();
    assert_eq!(
        f.relabelling().cycle_string(f.end().involution()),
        "(0,~0)(1)(2)(~2)(~1)"
    );
    assert_eq!(flip_sequence_to_string(f.flips()), "1R 0R");
    f.verify().unwrap();
}

#[test]
fn flips_after_relabelling_stay_in_start_coordinates() {
    // interleaving a relabelling and more flips must replay correctly
    let vc = sphere_vc();
    let mut f = seq(&vc, "1B", "(1,2)");
    f.flip(Hedge(1), Colour::Blue).unwrap();
    f.verify().unwrap();
    // the second flip of end-edge 1 is logged at its preimage 2
    assert_eq!(flip_sequence_to_string(f.flips()), "1B 2B");
}
