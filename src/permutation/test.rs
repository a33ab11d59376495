use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

use super::*;

fn torus_involution() -> Involution {
    Involution::from_pairing(vec![5, 4, 3, 2, 1, 0]).unwrap()
}

fn random_perm(n: usize, seed: u64) -> Permutation {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut map: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        map.swap(i, rng.gen_range(0..=i));
    }
    Permutation::from_map(map).unwrap()
}

#[test]
fn compose_applies_right_factor_first() {
    let p = Permutation::from_map(vec![1, 2, 0]).unwrap();
    let q = Permutation::from_map(vec![0, 2, 1]).unwrap();
    let pq = p.compose(&q);
    for i in 0..3 {
        assert_eq!(pq.image(i), p.image(q.image(i)));
    }
}

#[test]
fn from_map_rejects_non_bijections() {
    assert!(Permutation::from_map(vec![0, 0, 1]).is_err());
    assert!(Permutation::from_map(vec![0, 3]).is_err());
}

#[test]
fn identity_cycle_string_shows_fixed_points() {
    let ep = torus_involution();
    let id = Permutation::id(6);
    assert_eq!(id.cycle_string(&ep), "(0)(1)(2)(~2)(~1)(~0)");
}

#[test]
fn cycle_parsing_extends_over_the_involution() {
    let ep = torus_involution();
    let p = Permutation::from_cycle_string("(0,5)(1,3)", &ep).unwrap();
    assert_eq!(p.as_slice(), &[5, 3, 4, 1, 2, 0]);
    assert_eq!(p.cycle_string(&ep), "(0,~0)(1,~2)(2,~1)");
    // round trip
    let q = Permutation::from_cycle_string(&p.cycle_string(&ep), &ep).unwrap();
    assert_eq!(p, q);
}

#[test]
fn cycle_parsing_rejects_pairing_breakers() {
    let ep = torus_involution();
    assert!(Permutation::from_cycle_string("(0,1,5)", &ep).is_err());
}

#[test]
fn cycle_parsing_accepts_raw_half_edges_and_tildes() {
    let ep = torus_involution();
    let a = Permutation::from_cycle_string("(1,0,~1,~0)(2,~2)", &ep).unwrap();
    let b = Permutation::from_cycle_string("(1,0,4,5)(2,3)", &ep).unwrap();
    assert_eq!(a, b);
    assert!(a.commutes_with(&ep));
}

#[test]
fn random_centralizer_commutes() {
    // a mix of folded and paired edges
    let ep = Involution::from_pairing(vec![0, 1, 2, 3, 4, 8, 7, 6, 5]).unwrap();
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..50 {
        let p = Permutation::random_centralizer(&ep, &mut rng);
        assert!(p.commutes_with(&ep));
    }
}

proptest! {
    #[test]
    fn inverse_law(n in 1usize..40, seed in any::<u64>()) {
        let p = random_perm(n, seed);
        prop_assert!(p.compose(&p.inverse()).is_identity());
        prop_assert!(p.inverse().compose(&p).is_identity());
    }

    #[test]
    fn composition_inverse_reverses(n in 1usize..40, s1 in any::<u64>(), s2 in any::<u64>()) {
        let p = random_perm(n, s1);
        let q = random_perm(n, s2);
        prop_assert_eq!(p.compose(&q).inverse(), q.inverse().compose(&p.inverse()));
    }

    #[test]
    fn power_is_iterated_composition(n in 1usize..20, seed in any::<u64>()) {
        let p = random_perm(n, seed);
        prop_assert_eq!(p.pow(3), p.compose(&p.compose(&p)));
        prop_assert!(p.pow(0).is_identity());
    }

    #[test]
    fn cycles_partition(n in 1usize..40, seed in any::<u64>()) {
        let p = random_perm(n, seed);
        let mut all: Vec<usize> = p.cycles().into_iter().flatten().collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
    }
}
