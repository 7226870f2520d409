use penumbra::{Authorizations, FetchHints, Graph, GraphElement, PropValue, Visibility};
use proptest::prelude::*;

fn vis(expr: &str) -> Visibility {
    Visibility::new(expr).unwrap()
}

fn graph_with_values(values: &[(String, String)]) -> Graph {
    let graph = Graph::in_memory().unwrap();
    let auths = Authorizations::new(["a"]);
    let mut mutation = graph.prepare_vertex(Some("v1"), None, &vis("a"), "");
    for (key, value) in values {
        mutation = mutation.add_property_value(key, "tag", value.as_str(), &vis("a"));
    }
    mutation.save(&auths).unwrap();
    graph
}

fn tags(graph: &Graph) -> Vec<String> {
    let v = graph
        .get_vertex("v1", &FetchHints::ALL, &Authorizations::new(["a"]))
        .unwrap()
        .unwrap();
    v.property_values("tag")
        .unwrap()
        .into_iter()
        .filter_map(|value| value.as_str().map(str::to_owned))
        .collect()
}

#[test]
fn multivalued_properties_sort_by_value_bytes() {
    let graph = graph_with_values(&[
        ("k1".into(), "pear".into()),
        ("k2".into(), "Apple".into()),
        ("k3".into(), "apple".into()),
        ("k4".into(), "banana".into()),
    ]);
    assert_eq!(tags(&graph), vec!["Apple", "apple", "banana", "pear"]);

    let v = graph
        .get_vertex("v1", &FetchHints::ALL, &Authorizations::new(["a"]))
        .unwrap()
        .unwrap();
    assert_eq!(v.property_value_at("tag", 2).unwrap(), Some(&PropValue::from("banana")));
    assert!(v.property_value_at("tag", 4).unwrap().is_none());
}

#[test]
fn mixed_case_values_follow_ascii_order() {
    let values: Vec<(String, String)> = ["a", "aa", "b", "0", "A", "Z"]
        .iter()
        .enumerate()
        .map(|(i, v)| (format!("k{}", i), (*v).to_owned()))
        .collect();
    let graph = graph_with_values(&values);
    assert_eq!(tags(&graph), vec!["0", "A", "Z", "a", "aa", "b"]);
}

#[test]
fn ties_on_value_fall_back_to_key_then_visibility() {
    let graph = Graph::in_memory().unwrap();
    let auths = Authorizations::new(["a", "b"]);
    graph
        .prepare_vertex(Some("v1"), None, &vis("a"), "")
        .add_property_value("k2", "tag", "same", &vis("a"))
        .add_property_value("k1", "tag", "same", &vis("b"))
        .add_property_value("k1", "tag", "same", &vis("a"))
        .save(&auths)
        .unwrap();
    let v = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    let order: Vec<(String, String)> = v
        .properties_named("tag")
        .unwrap()
        .into_iter()
        .map(|p| (p.key().to_owned(), p.visibility().to_string()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("k1".to_owned(), "a".to_owned()),
            ("k1".to_owned(), "b".to_owned()),
            ("k2".to_owned(), "a".to_owned()),
        ]
    );
}

#[test]
fn names_group_before_values() {
    let graph = Graph::in_memory().unwrap();
    let auths = Authorizations::new(["a"]);
    graph
        .prepare_vertex(Some("v1"), None, &vis("a"), "")
        .set_property("zeta", "a", &vis("a"))
        .set_property("alpha", "z", &vis("a"))
        .save(&auths)
        .unwrap();
    let v = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    let names: Vec<&str> = v.properties().unwrap().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn order_does_not_depend_on_insertion_order(
        values in proptest::collection::btree_map("[a-z]{1,6}", "[a-zA-Z0-9]{0,8}", 1..8)
    ) {
        let forward: Vec<(String, String)> = values.clone().into_iter().collect();
        let mut backward = forward.clone();
        backward.reverse();

        let first = tags(&graph_with_values(&forward));
        let second = tags(&graph_with_values(&backward));
        prop_assert_eq!(&first, &second);

        let mut expected: Vec<String> = values.into_values().collect();
        expected.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        prop_assert_eq!(first, expected);
    }
}
