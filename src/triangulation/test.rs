use similar_asserts::assert_eq;

use super::*;
use crate::matrix::QMatrix;

fn vt(faces: &str, colours: &str) -> VeeringTriangulation {
    VeeringTriangulation::from_string(faces, colours).unwrap()
}

#[test]
fn triangle_angles() {
    for cols in ["RRB", "BBR", "PBR", "GRB", "RPG", "BGP"] {
        let t = vt("(0,1,2)", cols);
        assert_eq!(t.angles(), vec![1, 1, 1, 1], "colouring {cols}");
    }
}

#[test]
fn torus_angles() {
    for cols in ["RRB", "BBR", "PBR", "GRB", "RPG", "BGP"] {
        let t = vt("(0,1,2)(~0,~1,~2)", cols);
        assert_eq!(t.angles(), vec![2], "colouring {cols}");
    }
}

#[test]
fn half_edge_numbering() {
    // ~ halves are numbered downward from n-1 by decreasing edge label
    let t = vt("(0,~5,4)(3,5,6)(1,2,~6)", "PPBPRBR");
    assert_eq!(t.num_half_edges(), 9);
    assert_eq!(t.num_edges(), 7);
    assert_eq!(t.num_folded_edges(), 5);
    assert_eq!(t.involution().pair(Hedge(5)), Hedge(8));
    assert_eq!(t.involution().pair(Hedge(6)), Hedge(7));
    assert_eq!(t.face_cycle_string(), "(0,~5,4)(1,2,~6)(3,5,6)");
}

#[test]
fn square_about_a_folded_edge_repeats() {
    let t = vt("(0,~5,4)(3,5,6)(1,2,~6)", "PPBPRBR");
    let (a, b, c, d) = t.square_about_edge(EdgeIndex(1));
    assert_eq!((a, b), (c, d));
    assert_eq!((a.0, b.0), (2, 7));
}

#[test]
fn forward_flippable_edges() {
    assert_eq!(
        vt("(0,1,2)(~0,~1,~2)", "RRB").forward_flippable_edges(),
        vec![EdgeIndex(1)]
    );
    assert_eq!(
        vt("(0,1,2)(~0,~1,~2)", "PBR").forward_flippable_edges(),
        vec![EdgeIndex(0)]
    );
    // purple edges are forward flippable, green edges never are
    assert!(vt("(0,1,2)", "PBR").is_forward_flippable(EdgeIndex(0)));
    assert!(!vt("(0,1,2)", "GRB").is_forward_flippable(EdgeIndex(0)));
}

#[test]
fn backward_flippable_edges() {
    assert_eq!(
        vt("(0,1,2)(~0,~1,~2)", "RRB").backward_flippable_edges(),
        vec![EdgeIndex(0)]
    );
}

#[test]
fn forgetting_forward_colours() {
    let mut t = vt("(0,1,2)(~1,~2,~0)", "RRB");
    t.forget_forward_flippable_colours();
    assert_eq!(t.colour_string(), "RPB");
    assert!(t.is_reduced());
    // idempotent
    let before = t.clone();
    t.forget_forward_flippable_colours();
    assert_eq!(t, before);
}

#[test]
fn flip_rotates_the_diagonal() {
    let mut t = vt("(0,1,2)(~0,~1,~2)", "RRB");
    t.flip(Hedge(1), Colour::Red).unwrap();
    assert_eq!(
        t.to_string(),
        r#"VeeringTriangulation("(0,~2,1)(2,~1,~0)", "RRB")"#
    );
    // the opposite half addresses the same edge
    let mut s = vt("(0,1,2)(~0,~1,~2)", "RRB");
    s.flip(Hedge(4), Colour::Red).unwrap();
    assert_eq!(s, t);
}

#[test]
fn flip_back_undoes_flip() {
    let original = vt("(0,1,2)(~0,~1,~2)", "RRB");
    let mut t = original.clone();
    t.flip(Hedge(1), Colour::Blue).unwrap();
    t.flip_back(Hedge(1), Colour::Red).unwrap();
    assert_eq!(t, original);
}

#[test]
fn flip_validation() {
    let mut t = vt("(0,1,2)(~0,~1,~2)", "RRB");
    assert_eq!(
        t.flip(Hedge(0), Colour::Red),
        Err(TriangulationError::NotForwardFlippable(EdgeIndex(0)))
    );
    assert_eq!(
        t.flip(Hedge(1), Colour::Purple),
        Err(TriangulationError::IndefiniteFlipColour(Colour::Purple))
    );
    assert_eq!(
        t.flip(Hedge(17), Colour::Red),
        Err(TriangulationError::HalfEdgeOutOfRange(17))
    );
    // nothing was mutated
    assert_eq!(t, vt("(0,1,2)(~0,~1,~2)", "RRB"));
}

#[test]
fn reduced_flip_reforgets_sides() {
    // flipping the purple edge pushes the forgotten colour along
    let mut t = vt("(0,1,2)(~0,~1,~2)", "PBR");
    t.flip(Hedge(0), Colour::Blue).unwrap();
    assert_eq!(t.colour_string(), "BPR");
}

#[test]
fn rotation_swaps_colours_in_place() {
    let mut t = vt("(0,1,2)(~0,~1,~2)", "RRB");
    let faces = t.face_cycle_string();
    t.rotate();
    assert_eq!(t.colour_string(), "BBR");
    assert_eq!(t.face_cycle_string(), faces);
    let mut p = vt("(0,1,2)", "RPG");
    p.rotate();
    assert_eq!(p.colour_string(), "BGP");
}

#[test]
fn relabelling_conjugates_faces() {
    let mut t = vt("(0,1,2)(~0,~1,~2)", "RRB");
    let r = t.parse_relabelling("(0,1)").unwrap();
    t.relabel(&r).unwrap();
    assert_eq!(t.face_cycle_string(), "(0,2,1)(~2,~1,~0)");
    assert_eq!(t.colour_string(), "RRB");
}

#[test]
fn swap_is_an_involution() {
    let original = vt("(0,1,2)(~0,~1,~2)", "RRB");
    let mut t = original.clone();
    t.swap(EdgeIndex(1)).unwrap();
    assert_ne!(t, original);
    t.swap(EdgeIndex(1)).unwrap();
    assert_eq!(t, original);
}

#[test]
fn switch_kernel_of_the_torus() {
    let t = vt("(0,1,2)(~0,~1,~2)", "RRB");
    let kernel = t.switch_matrix().unwrap().right_kernel();
    assert_eq!(
        kernel,
        QMatrix::from_int_rows(&[vec![1, 0, -1], vec![0, 1, 1]])
    );
}

#[test]
fn switch_matrix_rejects_green() {
    let t = vt("(0,1,2)", "GRB");
    assert!(matches!(
        t.switch_matrix(),
        Err(TriangulationError::GreenSwitch(_))
    ));
}

#[test]
fn construction_errors() {
    assert!(matches!(
        VeeringTriangulation::from_string("(0,1,2)(~0,~1,~2)", "RRR"),
        Err(TriangulationError::MonochromaticFace(_))
    ));
    assert!(matches!(
        VeeringTriangulation::from_string("(0,1,2)", "RR"),
        Err(TriangulationError::ColourCount { got: 2, expected: 3 })
    ));
    assert!(matches!(
        VeeringTriangulation::from_string("(0,2,3)", "RRB"),
        Err(TriangulationError::BadEdgeLabels { .. })
    ));
    assert!(matches!(
        VeeringTriangulation::from_string("(0,1,2,3)", "RRBB"),
        Err(TriangulationError::NotATriangle(4))
    ));
}

#[test]
fn display_round_trips() {
    for (faces, cols) in [
        ("(0,1,2)(~0,~1,~2)", "RRB"),
        ("(0,~5,4)(3,5,6)(1,2,~6)", "PPBPRBR"),
        ("(0,1,2)(~0,~4,~2)(3,4,5)(~3,~1,~5)", "BRRBRR"),
    ] {
        let t = vt(faces, cols);
        let again = vt(&t.face_cycle_string(), &t.colour_string());
        assert_eq!(t, again);
    }
}
