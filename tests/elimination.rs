use std::collections::HashMap;

use num_rational::BigRational;
use test_log::test;

use xadd_rs::builder::Builder;
use xadd_rs::diagram::Diagram;
use xadd_rs::expr::int;
use xadd_rs::xadd::Xadd;

fn at(pairs: &[(&str, i64)]) -> HashMap<String, BigRational> {
    pairs.iter().map(|&(v, x)| (v.to_string(), int(x))).collect()
}

fn between<'a>(b: &Builder<'a>, var: &str, lower: &str, upper: &str) -> Diagram<'a> {
    b.test(var, ">=", lower)
        .unwrap()
        .and(&b.test(var, "<=", upper).unwrap())
        .unwrap()
}

#[test]
fn test_summation_one_var() {
    let xadd = Xadd::default();
    let b = Builder::new(&xadd);
    b.ints(&["x"]).unwrap();

    let f = b.ite(&between(&b, "x", "0", "10"), &b.exp("x").unwrap(), &b.terminal(0)).unwrap();
    let total = f.eliminate("x").unwrap();
    assert!(total.is_terminal());
    assert_eq!(total.constant_value(), Some(int(55)));
}

#[test]
fn test_summation_symbolic_lower_bound() {
    let xadd = Xadd::default();
    let b = Builder::new(&xadd);
    b.ints(&["x", "y"]).unwrap();

    let region = b.test("x", ">=", "y").unwrap().and(&b.test("x", "<=", "10").unwrap()).unwrap();
    let f = region.product(&b.exp("x").unwrap()).unwrap();
    let g = f.eliminate("x").unwrap();
    assert!(!g.variables().contains("x"));

    assert_eq!(g.evaluate(&at(&[("y", 0)])).unwrap(), int(55));
    assert_eq!(g.evaluate(&at(&[("y", 1)])).unwrap(), int(55));
    for y in -3..14 {
        let expected: i64 = (y..=10).sum();
        assert_eq!(g.evaluate(&at(&[("y", y)])).unwrap(), int(expected), "y = {}", y);
    }
}

#[test]
fn test_two_var_sum_with_inner_test() {
    let xadd = Xadd::default();
    let b = Builder::new(&xadd);
    b.ints(&["x", "y"]).unwrap();

    let bounds = between(&b, "x", "0", "1").and(&between(&b, "y", "1", "3")).unwrap();
    let inner = b
        .ite(&b.test("x", ">=", "y").unwrap(), &b.exp("x").unwrap(), &b.terminal(10))
        .unwrap();
    let f = b.ite(&bounds, &inner, &b.terminal(0)).unwrap();
    let g = f.eliminate("x").unwrap().reduce_over(&["y"]);
    assert!(!g.variables().contains("x"));

    for y in 1..=3 {
        let expected: i64 = (0..=1).map(|x| if x >= y { x } else { 10 }).sum();
        assert_eq!(g.evaluate(&at(&[("y", y)])).unwrap(), int(expected), "y = {}", y);
    }
    assert_eq!(g.evaluate(&at(&[("y", 1)])).unwrap(), int(11));

    for y in -20..20 {
        let mut expected = int(0);
        for x in -20..20 {
            expected += f.evaluate(&at(&[("x", x), ("y", y)])).unwrap();
        }
        assert_eq!(g.evaluate(&at(&[("y", y)])).unwrap(), expected, "y = {}", y);
    }
}

#[test]
fn test_mixed_symbolic_bounds() {
    let xadd = Xadd::default();
    let b = Builder::new(&xadd);
    b.ints(&["x", "y"]).unwrap();

    let domain = between(&b, "x", "0", "8").product(&between(&b, "y", "1", "10")).unwrap();
    let body = b
        .ite(
            &b.test("x", ">=", "y").unwrap(),
            &b.exp("2*x + 3*y").unwrap(),
            &b.exp("3*x + 2*y").unwrap(),
        )
        .unwrap();
    let f = domain.product(&body).unwrap();
    let g = f.eliminate("x").unwrap().reduce_over(&["y"]);

    for y in 0..12 {
        let expected: i64 = if (1..=10).contains(&y) {
            (0..=8).map(|x| if x >= y { 2 * x + 3 * y } else { 3 * x + 2 * y }).sum()
        } else {
            0
        };
        assert_eq!(g.evaluate(&at(&[("y", y)])).unwrap(), int(expected), "y = {}", y);
    }
}

#[test]
fn test_partial_assignment() {
    let xadd = Xadd::default();
    let b = Builder::new(&xadd);
    b.ints(&["x", "y"]).unwrap();

    let outside = b.test("x", "<", "0").unwrap().or(&b.test("x", ">", "8").unwrap()).unwrap();
    let inside = b
        .ite(
            &b.test("x", ">", "y").unwrap(),
            &b.exp("2*x + 3*y").unwrap(),
            &b.exp("3*x + 2*y").unwrap(),
        )
        .unwrap();
    let f = b.ite(&outside, &b.terminal(0), &inside).unwrap();

    let g = f.restrict(&at(&[("y", 2)])).unwrap();
    assert!(!g.variables().contains("y"));
    for x in -2..11 {
        let expected = if !(0..=8).contains(&x) {
            0
        } else if x > 2 {
            2 * x + 6
        } else {
            3 * x + 4
        };
        assert_eq!(g.evaluate(&at(&[("x", x)])).unwrap(), int(expected), "x = {}", x);
    }
}

#[test]
fn test_eliminate_all_nested() {
    let xadd = Xadd::default();
    let b = Builder::new(&xadd);
    b.ints(&["x", "y"]).unwrap();

    // #{(x, y) : 0 <= x <= 3, 0 <= y <= x} = 1 + 2 + 3 + 4
    let f = between(&b, "x", "0", "3").product(&between(&b, "y", "0", "x")).unwrap();
    for order in [["x", "y"], ["y", "x"]] {
        let count = f.eliminate_all(order).unwrap();
        assert_eq!(count.constant_value(), Some(int(10)), "order {:?}", order);
    }
}

#[test]
fn test_integration_continuous() {
    let xadd = Xadd::default();
    let b = Builder::new(&xadd);
    b.reals(&["t"]).unwrap();

    let f = between(&b, "t", "0", "2").product(&b.exp("t").unwrap()).unwrap();
    let area = f.eliminate("t").unwrap();
    assert_eq!(area.constant_value(), Some(int(2)));
}

#[test]
fn test_elimination_removes_variable() {
    let xadd = Xadd::default();
    let b = Builder::new(&xadd);
    b.ints(&["x", "y", "z"]).unwrap();

    let f = between(&b, "x", "y", "z").product(&b.exp("x*y + z").unwrap()).unwrap();
    let g = f.eliminate("x").unwrap();
    let vars = g.variables();
    assert!(!vars.contains("x"));
    assert!(vars.contains("y"));
    assert!(vars.contains("z"));

    for y in -2..3 {
        for z in -2..3 {
            let expected: i64 = (y..=z).map(|x| x * y + z).sum();
            assert_eq!(g.evaluate(&at(&[("y", y), ("z", z)])).unwrap(), int(expected));
        }
    }
}
