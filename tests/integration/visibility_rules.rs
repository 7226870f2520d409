#![allow(clippy::uninlined_format_args)]

use penumbra::{
    Authorizations, FetchHints, Graph, GraphElement, GraphError, GraphOptions, Visibility,
};
use proptest::prelude::*;

fn vis(expr: &str) -> Visibility {
    Visibility::new(expr).unwrap()
}

fn auths(labels: &[&str]) -> Authorizations {
    Authorizations::new(labels.iter().copied())
}

fn lenient_graph() -> Graph {
    Graph::open(GraphOptions::in_memory().strict_write_visibility(false)).unwrap()
}

#[test]
fn element_visibility_gates_every_read() {
    let graph = Graph::in_memory().unwrap();
    let a = auths(&["a"]);
    graph.add_vertex(Some("v1"), &vis("a"), &a).unwrap();

    assert!(graph.get_vertex("v1", &FetchHints::ALL, &a).unwrap().is_some());
    assert!(graph
        .get_vertex("v1", &FetchHints::ALL, &auths(&["b"]))
        .unwrap()
        .is_none());
    assert!(!graph.does_vertex_exist("v1", &Authorizations::empty()).unwrap());
    assert_eq!(
        graph
            .get_all_vertices(&FetchHints::ALL, &auths(&["b"]))
            .unwrap()
            .len(),
        0
    );
}

#[test]
fn properties_are_filtered_per_cell() {
    let graph = lenient_graph();
    let writer = auths(&["a", "b"]);
    graph
        .prepare_vertex(Some("v1"), None, &Visibility::empty(), "")
        .set_property("name", "joe", &vis("a"))
        .set_property("ssn", "123", &vis("b"))
        .set_property("age", 25i64, &vis("(a&b)|c"))
        .save(&writer)
        .unwrap();

    let as_a = graph
        .get_vertex("v1", &FetchHints::ALL, &auths(&["a"]))
        .unwrap()
        .unwrap();
    let names: Vec<&str> = as_a.properties().unwrap().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["name"]);

    let as_both = graph
        .get_vertex("v1", &FetchHints::ALL, &writer)
        .unwrap()
        .unwrap();
    assert_eq!(as_both.properties().unwrap().len(), 3);

    let as_c = graph
        .get_vertex("v1", &FetchHints::ALL, &auths(&["c"]))
        .unwrap()
        .unwrap();
    assert_eq!(
        as_c.property_value("age").unwrap().and_then(|v| v.as_int()),
        Some(25)
    );
    assert!(as_c.property("ssn").unwrap().is_none());
}

#[test]
fn strict_writes_reject_unreadable_visibilities() {
    let graph = Graph::in_memory().unwrap();
    let a = auths(&["a"]);
    graph.add_vertex(Some("v1"), &vis("a"), &a).unwrap();

    let err = graph
        .mutate_vertex("v1")
        .set_property("secret", "x", &vis("b"))
        .save(&a)
        .unwrap_err();
    assert!(matches!(err, GraphError::Security(_)), "got {:?}", err);

    let err = graph.add_vertex(Some("v2"), &vis("b"), &a).unwrap_err();
    assert!(matches!(err, GraphError::Security(_)));
    assert!(!graph.does_vertex_exist("v2", &auths(&["b"])).unwrap());
}

#[test]
fn malformed_and_ungranted_authorizations_fail() {
    let graph = Graph::in_memory().unwrap();
    let err = graph
        .get_vertex("v1", &FetchHints::ALL, &auths(&[""]))
        .unwrap_err();
    assert!(matches!(err, GraphError::Security(_)));

    let restricted =
        Graph::open(GraphOptions::in_memory().granted_authorizations(["a", "b"])).unwrap();
    assert!(restricted
        .get_vertex("v1", &FetchHints::ALL, &auths(&["a"]))
        .unwrap()
        .is_none());
    let err = restricted
        .get_vertex("v1", &FetchHints::ALL, &auths(&["a", "z"]))
        .unwrap_err();
    assert!(err.to_string().contains("z"));
}

#[test]
fn invalid_expressions_are_rejected() {
    for bad in ["a&", "(a", "a&b|c", "a||b", "&"] {
        let err = Visibility::new(bad).unwrap_err();
        assert!(
            matches!(err, GraphError::InvalidVisibility { .. }),
            "{} gave {:?}",
            bad,
            err
        );
    }
    assert!(Visibility::new("\"quoted label\"&b").is_ok());
}

#[test]
fn hidden_vertex_needs_hidden_hints() {
    let graph = Graph::in_memory().unwrap();
    let a = auths(&["a"]);
    graph.add_vertex(Some("v1"), &vis("a"), &a).unwrap();
    graph.mark_vertex_hidden("v1", &vis("a"), &a).unwrap();

    assert!(graph.get_vertex("v1", &FetchHints::ALL, &a).unwrap().is_none());
    let hidden = graph
        .get_vertex("v1", &FetchHints::ALL_INCLUDING_HIDDEN, &a)
        .unwrap()
        .unwrap();
    assert!(hidden.is_hidden(&a));
    assert_eq!(hidden.hidden_visibilities(), &[vis("a")]);

    graph.mark_vertex_visible("v1", &vis("a"), &a).unwrap();
    let shown = graph.get_vertex("v1", &FetchHints::ALL, &a).unwrap().unwrap();
    assert!(!shown.is_hidden(&a));
}

#[test]
fn hiding_is_scoped_to_the_exact_visibility() {
    let graph = lenient_graph();
    let ab = auths(&["a", "b"]);
    graph.add_vertex(Some("v1"), &Visibility::empty(), &ab).unwrap();
    graph.mark_vertex_hidden("v1", &vis("b"), &ab).unwrap();

    assert!(graph
        .get_vertex("v1", &FetchHints::ALL, &auths(&["a"]))
        .unwrap()
        .is_some());
    assert!(graph.get_vertex("v1", &FetchHints::ALL, &ab).unwrap().is_none());
}

#[test]
fn hidden_properties_can_be_toggled_repeatedly() {
    let graph = Graph::in_memory().unwrap();
    let a = auths(&["a"]);
    graph
        .prepare_vertex(Some("v1"), None, &vis("a"), "")
        .set_property("name", "joe", &vis("a"))
        .save(&a)
        .unwrap();

    for _ in 0..3 {
        graph
            .mutate_vertex("v1")
            .mark_property_hidden("", "name", &vis("a"), &vis("a"))
            .save(&a)
            .unwrap();
        let v = graph.get_vertex("v1", &FetchHints::ALL, &a).unwrap().unwrap();
        assert!(v.property("name").unwrap().is_none());
        let v = graph
            .get_vertex("v1", &FetchHints::ALL_INCLUDING_HIDDEN, &a)
            .unwrap()
            .unwrap();
        assert!(v.property("name").unwrap().unwrap().is_hidden(&a));

        graph
            .mutate_vertex("v1")
            .mark_property_visible("", "name", &vis("a"), &vis("a"))
            .save(&a)
            .unwrap();
        let v = graph.get_vertex("v1", &FetchHints::ALL, &a).unwrap().unwrap();
        assert!(v.property("name").unwrap().is_some());
    }

    let history = graph
        .get_historical_property_values(
            &penumbra::ElementId::vertex("v1"),
            &penumbra::HistoryFilter::new(),
            &a,
        )
        .unwrap();
    assert_eq!(history.len(), 1);
}

fn label() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_owned)
}

proptest! {
    #[test]
    fn conjunction_requires_every_label(
        x in label(),
        y in label(),
        held in prop::collection::btree_set(label(), 0..4),
    ) {
        let auths = Authorizations::new(held.iter().cloned());
        let expr = vis(&format!("{}&{}", x, y));
        prop_assert_eq!(expr.evaluate(&auths), held.contains(&x) && held.contains(&y));
    }

    #[test]
    fn disjunction_requires_any_label(
        x in label(),
        y in label(),
        held in prop::collection::btree_set(label(), 0..4),
    ) {
        let auths = Authorizations::new(held.iter().cloned());
        let expr = vis(&format!("{}|{}", x, y));
        prop_assert_eq!(expr.evaluate(&auths), held.contains(&x) || held.contains(&y));
    }

    #[test]
    fn negation_inverts(x in label(), held in prop::collection::btree_set(label(), 0..4)) {
        let auths = Authorizations::new(held.iter().cloned());
        prop_assert_eq!(vis(&format!("!{}", x)).evaluate(&auths), !held.contains(&x));
    }

    #[test]
    fn empty_visibility_is_public(held in prop::collection::btree_set(label(), 0..4)) {
        let auths = Authorizations::new(held.iter().cloned());
        prop_assert!(Visibility::empty().evaluate(&auths));
    }
}

#[test]
fn is_visibility_valid_checks_the_caller() {
    let graph = Graph::in_memory().unwrap();
    assert!(graph
        .is_visibility_valid(&vis("a&b"), &auths(&["a", "b"]))
        .unwrap());
    assert!(!graph.is_visibility_valid(&vis("a&b"), &auths(&["a"])).unwrap());
    assert!(graph.is_visibility_valid(&vis(""), &auths(&[])).unwrap());
}

#[test]
fn edges_can_be_hidden_and_shown_again() {
    let graph = Graph::in_memory().unwrap();
    let a = auths(&["a"]);
    graph.add_vertex(Some("v1"), &vis("a"), &a).unwrap();
    graph.add_vertex(Some("v2"), &vis("a"), &a).unwrap();
    graph
        .add_edge(Some("e1"), "v1", "v2", "knows", &vis("a"), &a)
        .unwrap();

    graph.mark_edge_hidden("e1", &vis("a"), &a).unwrap();
    assert!(graph.get_edge("e1", &FetchHints::ALL, &a).unwrap().is_none());
    graph.mark_edge_visible("e1", &vis("a"), &a).unwrap();
    assert!(graph.get_edge("e1", &FetchHints::ALL, &a).unwrap().is_some());
}
