use penumbra::{
    Authorizations, Direction, ElementId, FetchHints, Graph, GraphElement, HistoryFilter,
    PropValue, Visibility,
};

fn vis(expr: &str) -> Visibility {
    Visibility::new(expr).unwrap()
}

fn auths_a() -> Authorizations {
    Authorizations::new(["a"])
}

fn two_vertices_and_an_edge() -> Graph {
    let graph = Graph::in_memory().unwrap();
    let a = auths_a();
    graph.add_vertex(Some("v1"), &vis("a"), &a).unwrap();
    graph.add_vertex(Some("v2"), &vis("a"), &a).unwrap();
    graph
        .prepare_edge(Some("e1"), "v1", "v2", "label1", &vis("a"))
        .set_property("weight", 3i64, &vis("a"))
        .save(&a)
        .unwrap();
    graph.flush().unwrap();
    graph
}

#[test]
fn soft_deleted_edge_is_readable_only_in_the_past() {
    let graph = two_vertices_and_an_edge();
    let a = auths_a();
    let before = graph.current_time();

    graph.soft_delete_edge("e1", None, &a).unwrap();
    graph.flush().unwrap();

    assert!(graph.get_edge("e1", &FetchHints::ALL, &a).unwrap().is_none());
    assert!(graph
        .get_edge("e1", &FetchHints::ALL_INCLUDING_HIDDEN, &a)
        .unwrap()
        .is_none());

    let past = graph
        .get_edge_at("e1", &FetchHints::ALL_INCLUDING_HIDDEN, Some(before), &a)
        .unwrap()
        .unwrap();
    assert_eq!(past.label(), "label1");
    assert_eq!(past.out_vertex_id(), "v1");
    assert_eq!(
        past.property_value("weight").unwrap(),
        Some(&PropValue::from(3i64))
    );

    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &a).unwrap().unwrap();
    assert_eq!(v1.edge_count(Direction::Out).unwrap(), 0);
    let v1_then = graph
        .get_vertex_at("v1", &FetchHints::ALL, Some(before), &a)
        .unwrap()
        .unwrap();
    assert_eq!(v1_then.edge_ids(Direction::Out).unwrap(), vec!["e1"]);
}

#[test]
fn soft_deleting_a_vertex_cascades_to_its_edges() {
    let graph = two_vertices_and_an_edge();
    let a = auths_a();
    graph.soft_delete_vertex("v1", None, &a).unwrap();

    assert!(!graph.does_vertex_exist("v1", &a).unwrap());
    assert!(!graph.does_edge_exist("e1", &a).unwrap());
    assert!(graph.does_vertex_exist("v2", &a).unwrap());
    assert!(graph
        .get_vertex_edges("v2", Direction::Both, &FetchHints::ALL, &a)
        .unwrap()
        .is_empty());
}

#[test]
fn soft_deleted_element_keeps_history() {
    let graph = Graph::in_memory().unwrap();
    let a = auths_a();
    graph
        .prepare_vertex(Some("v1"), None, &vis("a"), "")
        .set_property("name", "joe", &vis("a"))
        .save(&a)
        .unwrap();
    graph.soft_delete_vertex("v1", None, &a).unwrap();

    let history = graph
        .get_historical_property_values(&ElementId::vertex("v1"), &HistoryFilter::new(), &a)
        .unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].is_deleted);
    assert_eq!(history[1].value, Some(PropValue::from("joe")));
}

#[test]
fn recreating_a_soft_deleted_id_starts_clean() {
    let graph = Graph::in_memory().unwrap();
    let a = auths_a();
    graph
        .prepare_vertex(Some("v1"), None, &vis("a"), "")
        .set_property("name", "joe", &vis("a"))
        .save(&a)
        .unwrap();
    graph.mark_vertex_hidden("v1", &vis("a"), &a).unwrap();
    graph.soft_delete_vertex("v1", None, &a).unwrap();

    let fresh = graph.add_vertex(Some("v1"), &vis("a"), &a).unwrap();
    assert!(fresh.properties().unwrap().is_empty());
    let read = graph.get_vertex("v1", &FetchHints::ALL, &a).unwrap().unwrap();
    assert!(!read.is_hidden(&a));
    assert!(read.properties().unwrap().is_empty());
}

#[test]
fn soft_deleted_property_is_gone_now_but_present_before() {
    let graph = Graph::in_memory().unwrap();
    let a = auths_a();
    graph
        .prepare_vertex(Some("v1"), None, &vis("a"), "")
        .set_property("name", "joe", &vis("a"))
        .set_property("age", 30i64, &vis("a"))
        .save(&a)
        .unwrap();
    let before = graph.current_time();
    graph
        .mutate_vertex("v1")
        .soft_delete_property("", "name", Some(&vis("a")))
        .save(&a)
        .unwrap();

    let now = graph.get_vertex("v1", &FetchHints::ALL, &a).unwrap().unwrap();
    assert!(now.property("name").unwrap().is_none());
    assert!(now.property("age").unwrap().is_some());

    let then = graph
        .get_vertex_at("v1", &FetchHints::ALL, Some(before), &a)
        .unwrap()
        .unwrap();
    assert_eq!(
        then.property_value("name").unwrap(),
        Some(&PropValue::from("joe"))
    );
}

#[test]
fn hidden_and_soft_deleted_are_independent() {
    let graph = two_vertices_and_an_edge();
    let a = auths_a();
    graph.mark_edge_hidden("e1", &vis("a"), &a).unwrap();
    let before = graph.current_time();
    graph.soft_delete_edge("e1", None, &a).unwrap();

    assert!(graph
        .get_edge_at("e1", &FetchHints::ALL, Some(before), &a)
        .unwrap()
        .is_none());
    let past = graph
        .get_edge_at("e1", &FetchHints::ALL_INCLUDING_HIDDEN, Some(before), &a)
        .unwrap()
        .unwrap();
    assert!(past.is_hidden(&a));
}

#[test]
fn delete_of_unknown_or_unreadable_elements_is_a_no_op() {
    let graph = two_vertices_and_an_edge();
    let b = Authorizations::new(["b"]);
    graph.soft_delete_vertex("missing", None, &auths_a()).unwrap();
    graph.soft_delete_edge("e1", None, &b).unwrap();
    graph.delete_vertex("v1", &b).unwrap();
    assert!(graph.does_edge_exist("e1", &auths_a()).unwrap());
    assert!(graph.does_vertex_exist("v1", &auths_a()).unwrap());
}

#[test]
fn hard_delete_removes_history_and_adjacency() {
    let graph = two_vertices_and_an_edge();
    let a = auths_a();
    let before = graph.current_time();
    graph.delete_vertex("v1", &a).unwrap();

    assert!(graph
        .get_vertex_at("v1", &FetchHints::ALL_INCLUDING_HIDDEN, Some(before), &a)
        .unwrap()
        .is_none());
    assert!(graph
        .get_edge_at("e1", &FetchHints::ALL_INCLUDING_HIDDEN, Some(before), &a)
        .unwrap()
        .is_none());
    let v2 = graph
        .get_vertex_at("v2", &FetchHints::ALL, Some(before), &a)
        .unwrap()
        .unwrap();
    assert_eq!(v2.edge_count(Direction::Both).unwrap(), 0);
    assert!(graph
        .get_historical_property_values(&ElementId::edge("e1"), &HistoryFilter::new(), &a)
        .unwrap()
        .is_empty());
}

#[test]
fn explicit_soft_delete_timestamp_is_honoured() {
    let graph = two_vertices_and_an_edge();
    let a = auths_a();
    let at = graph.current_time() + 10_000;
    graph.soft_delete_edge("e1", Some(at), &a).unwrap();

    assert!(graph
        .get_edge_at("e1", &FetchHints::ALL, Some(at - 1), &a)
        .unwrap()
        .is_some());
    assert!(graph
        .get_edge_at("e1", &FetchHints::ALL, Some(at), &a)
        .unwrap()
        .is_none());
    assert!(graph.current_time() > at);
}
