#![allow(clippy::uninlined_format_args)]

use penumbra::{
    Authorizations, Direction, ElementId, FetchHints, Graph, GraphElement, GraphError,
    HistoryFilter, Metadata, PropValue, Visibility,
};

fn vis(expr: &str) -> Visibility {
    Visibility::new(expr).unwrap()
}

fn setup() -> (Graph, Authorizations) {
    let graph = Graph::in_memory().unwrap();
    let auths = Authorizations::new(["a", "b"]);
    graph
        .prepare_vertex(Some("v1"), None, &vis("a"), "person")
        .set_property("name", "joe", &vis("a"))
        .save(&auths)
        .unwrap();
    (graph, auths)
}

#[test]
fn updates_append_history_newest_first() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .set_property("name", "joseph", &vis("a"))
        .save(&auths)
        .unwrap();

    let history = graph
        .get_historical_property_values(&ElementId::vertex("v1"), &HistoryFilter::new(), &auths)
        .unwrap();
    let values: Vec<Option<&str>> = history
        .iter()
        .map(|h| h.value.as_ref().and_then(PropValue::as_str))
        .collect();
    assert_eq!(values, vec![Some("joseph"), Some("joe")]);
    assert!(history[0].timestamp > history[1].timestamp);

    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert_eq!(v1.property_values("name").unwrap().len(), 1);
    assert_eq!(v1.concept_type(), "person");
}

#[test]
fn history_is_filtered_by_name_and_visibility() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .set_property("age", 30i64, &vis("b"))
        .save(&auths)
        .unwrap();

    let id = ElementId::vertex("v1");
    let only_age = graph
        .get_historical_property_values(&id, &HistoryFilter::new().name("age"), &auths)
        .unwrap();
    assert_eq!(only_age.len(), 1);
    assert_eq!(only_age[0].visibility, vis("b"));

    let as_a = graph
        .get_historical_property_values(&id, &HistoryFilter::new(), &Authorizations::new(["a"]))
        .unwrap();
    assert!(as_a.iter().all(|h| h.name == "name"));
}

#[test]
fn set_property_replaces_metadata() {
    let (graph, auths) = setup();
    let meta = Metadata::new().with("source", "ingest", vis("a"));
    graph
        .mutate_vertex("v1")
        .set_property_with_metadata("name", "joe", meta, &vis("a"))
        .save(&auths)
        .unwrap();
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    let prop = v1.property("name").unwrap().unwrap();
    assert_eq!(
        prop.metadata().unwrap().value("source"),
        Some(&PropValue::from("ingest"))
    );

    graph
        .mutate_vertex("v1")
        .set_property("name", "joe", &vis("a"))
        .save(&auths)
        .unwrap();
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert!(v1.property("name").unwrap().unwrap().metadata().unwrap().is_empty());
}

#[test]
fn metadata_round_trips_with_its_visibility() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .set_property_metadata("", "name", &vis("a"), "confidence", 0.5f64, &vis("b"))
        .save(&auths)
        .unwrap();

    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    let meta = v1.property("name").unwrap().unwrap().metadata().unwrap();
    let entry = meta.entry("confidence", &vis("b")).unwrap();
    assert_eq!(entry.value, PropValue::from(0.5f64));
    assert_eq!(entry.visibility, vis("b"));

    let as_a = graph
        .get_vertex("v1", &FetchHints::ALL, &Authorizations::new(["a"]))
        .unwrap()
        .unwrap();
    assert!(as_a
        .property("name")
        .unwrap()
        .unwrap()
        .metadata()
        .unwrap()
        .is_empty());

    let no_meta = graph
        .get_vertex(
            "v1",
            &FetchHints::builder()
                .include_all_properties(true)
                .build()
                .unwrap(),
            &auths,
        )
        .unwrap()
        .unwrap();
    let err = no_meta.property("name").unwrap().unwrap().metadata().unwrap_err();
    assert!(matches!(err, GraphError::FetchHintViolation(_)));
}

#[test]
fn metadata_is_visible_to_as_of_reads_of_the_current_value() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .set_property_metadata("", "name", &vis("a"), "confidence", 0.5f64, &vis("a"))
        .save(&auths)
        .unwrap();
    let now = graph.current_time();

    let live = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    let as_of = graph
        .get_vertex_at("v1", &FetchHints::ALL, Some(now), &auths)
        .unwrap()
        .unwrap();
    for v in [&live, &as_of] {
        let meta = v.property("name").unwrap().unwrap().metadata().unwrap();
        assert_eq!(meta.value("confidence"), Some(&PropValue::from(0.5f64)));
    }

    graph
        .mutate_vertex("v1")
        .set_property("name", "joseph", &vis("a"))
        .save(&auths)
        .unwrap();
    let rewritten = graph
        .get_vertex_at("v1", &FetchHints::ALL, Some(graph.current_time()), &auths)
        .unwrap()
        .unwrap();
    let name = rewritten.property("name").unwrap().unwrap();
    assert_eq!(name.value(), &PropValue::from("joseph"));
    assert!(name.metadata().unwrap().is_empty());
}

#[test]
fn altering_visibility_onto_an_existing_value_retires_it() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .add_property_value("", "name", "bob", &vis("b"))
        .save(&auths)
        .unwrap();
    graph
        .mutate_vertex("v1")
        .alter_property_visibility("", "name", Some(&vis("a")), &vis("b"))
        .save(&auths)
        .unwrap();

    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert_eq!(v1.property_values("name").unwrap(), vec![&PropValue::from("joe")]);

    let history = graph
        .get_historical_property_values(
            &ElementId::vertex("v1"),
            &HistoryFilter::new().visibility(vis("b")),
            &auths,
        )
        .unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().any(|h| h.is_deleted));
    assert_eq!(history[0].value, Some(PropValue::from("joe")));
}

#[test]
fn altering_visibility_moves_the_value() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .alter_property_visibility("", "name", Some(&vis("a")), &vis("b"))
        .save(&auths)
        .unwrap();

    let as_a = graph
        .get_vertex("v1", &FetchHints::ALL, &Authorizations::new(["a"]))
        .unwrap()
        .unwrap();
    assert!(as_a.property("name").unwrap().is_none());
    let as_b = graph
        .get_vertex("v1", &FetchHints::ALL, &auths)
        .unwrap()
        .unwrap();
    assert_eq!(as_b.property("name").unwrap().unwrap().visibility(), &vis("b"));

    let history = graph
        .get_historical_property_values(&ElementId::vertex("v1"), &HistoryFilter::new(), &auths)
        .unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().any(|h| h.is_deleted && h.visibility == vis("a")));
}

#[test]
fn deletes_keep_history() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .delete_property("", "name", None)
        .save(&auths)
        .unwrap();
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert!(v1.properties().unwrap().is_empty());

    let history = graph
        .get_historical_property_values(&ElementId::vertex("v1"), &HistoryFilter::new(), &auths)
        .unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].is_deleted);
    assert!(history[0].value.is_none());
}

#[test]
fn deletes_skip_properties_the_caller_cannot_read() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .add_property_value("k2", "name", "hidden-from-a", &vis("b"))
        .save(&auths)
        .unwrap();
    let only_a = Authorizations::new(["a"]);
    graph
        .mutate_vertex("v1")
        .delete_properties("name")
        .save(&only_a)
        .unwrap();
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    let values = v1.property_values("name").unwrap();
    assert_eq!(values, vec![&PropValue::from("hidden-from-a")]);
}

#[test]
fn null_values_are_rejected_with_the_property_name() {
    let (graph, auths) = setup();
    let err = graph
        .mutate_vertex("v1")
        .set_property("nickname", PropValue::Null, &vis("a"))
        .save(&auths)
        .unwrap_err();
    assert!(err.to_string().contains("nickname"));
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert!(v1.property("nickname").unwrap().is_none());
}

#[test]
fn older_explicit_timestamps_do_not_override_the_live_value() {
    let (graph, auths) = setup();
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    let current_ts = v1.property("name").unwrap().unwrap().timestamp();

    graph
        .mutate_vertex("v1")
        .add_property_value_with("", "name", "stale", None, Some(current_ts - 1000), &vis("a"))
        .save(&auths)
        .unwrap();
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert_eq!(
        v1.property_value("name").unwrap(),
        Some(&PropValue::from("joe"))
    );

    let history = graph
        .get_historical_property_values(&ElementId::vertex("v1"), &HistoryFilter::new(), &auths)
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].value, Some(PropValue::from("stale")));
}

#[test]
fn explicit_timestamps_advance_the_clock() {
    let (graph, auths) = setup();
    let future = graph.current_time() + 60_000;
    graph
        .mutate_vertex("v1")
        .add_property_value_with("", "name", "later", None, Some(future), &vis("a"))
        .save(&auths)
        .unwrap();
    assert!(graph.current_time() > future);
}

#[test]
fn the_largest_timestamp_is_rejected_and_the_clock_keeps_going() {
    let (graph, auths) = setup();
    let err = graph
        .mutate_vertex("v1")
        .add_property_value_with("", "name", "forever", None, Some(i64::MAX), &vis("a"))
        .save(&auths)
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
    assert!(graph.soft_delete_vertex("v1", Some(i64::MAX), &auths).is_err());

    graph
        .mutate_vertex("v1")
        .add_property_value_with("", "name", "late", None, Some(i64::MAX - 1), &vis("a"))
        .save(&auths)
        .unwrap();
    let v2 = graph.add_vertex(Some("v2"), &vis("a"), &auths).unwrap();
    assert_eq!(v2.timestamp(), i64::MAX);
}

#[test]
fn concept_type_and_element_visibility_changes() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .alter_concept_type("company")
        .alter_element_visibility(&vis("b"))
        .save(&auths)
        .unwrap();
    assert!(graph
        .get_vertex("v1", &FetchHints::ALL, &Authorizations::new(["a"]))
        .unwrap()
        .is_none());
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert_eq!(v1.concept_type(), "company");
    assert_eq!(v1.visibility(), &vis("b"));
}

#[test]
fn mutating_an_unknown_element_is_not_found() {
    let (graph, auths) = setup();
    let err = graph
        .mutate_vertex("missing")
        .set_property("x", 1i64, &vis("a"))
        .save(&auths)
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound { .. }));
}

#[test]
fn batch_saves_fail_per_element() {
    let (graph, auths) = setup();
    let plans = vec![
        graph
            .prepare_vertex(Some("v2"), None, &vis("a"), "")
            .set_property("name", "ann", &vis("a"))
            .into_plan(),
        graph
            .mutate_vertex("missing")
            .set_property("name", "x", &vis("a"))
            .into_plan(),
    ];
    let results = graph.save_element_mutations(plans, &auths);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap(), &ElementId::vertex("v2"));
    assert!(results[1].is_err());
    assert!(graph.does_vertex_exist("v2", &auths).unwrap());
}

#[test]
fn fetch_hints_guard_unrequested_data() {
    let (graph, auths) = setup();
    let bare = graph.get_vertex("v1", &FetchHints::NONE, &auths).unwrap().unwrap();
    assert!(matches!(
        bare.properties().unwrap_err(),
        GraphError::FetchHintViolation(_)
    ));
    assert!(bare.edge_infos(penumbra::Direction::Out).is_err());

    let named = FetchHints::builder().property_names(["name"]).build().unwrap();
    let v1 = graph.get_vertex("v1", &named, &auths).unwrap().unwrap();
    assert!(v1.property("name").unwrap().is_some());
    assert!(v1.property("age").is_err());
}

#[test]
fn edge_labels_can_change_and_filter_refs() {
    let (graph, auths) = setup();
    graph.add_vertex(Some("v2"), &vis("a"), &auths).unwrap();
    graph
        .add_edge(Some("e1"), "v1", "v2", "knows", &vis("a"), &auths)
        .unwrap();
    graph
        .add_edge(Some("e2"), "v1", "v2", "likes", &vis("a"), &auths)
        .unwrap();

    let e1 = graph
        .mutate_edge("e1")
        .alter_edge_label("met")
        .save(&auths)
        .unwrap();
    assert_eq!(e1.label(), "met");

    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert_eq!(
        v1.edge_ids_with_labels(Direction::Out, &["met"]).unwrap(),
        vec!["e1"]
    );
    assert!(v1
        .edge_ids_with_labels(Direction::Out, &["knows"])
        .unwrap()
        .is_empty());

    let err = graph
        .mutate_edge("e1")
        .alter_edge_label("")
        .save(&auths)
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
}

#[test]
fn soft_delete_properties_removes_every_readable_value() {
    let (graph, auths) = setup();
    graph
        .mutate_vertex("v1")
        .add_property_value("k2", "name", "jo", &vis("b"))
        .save(&auths)
        .unwrap();
    let before = graph.current_time();
    graph
        .mutate_vertex("v1")
        .soft_delete_properties("name")
        .save(&auths)
        .unwrap();

    let now = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert!(now.property_values("name").unwrap().is_empty());
    let then = graph
        .get_vertex_at("v1", &FetchHints::ALL, Some(before), &auths)
        .unwrap()
        .unwrap();
    assert_eq!(then.property_values("name").unwrap().len(), 2);
}

#[test]
fn generated_ids_batch_reads_and_bulk_deletes() {
    let (graph, auths) = setup();
    let generated = graph.add_vertex(None, &vis("a"), &auths).unwrap();
    assert!(!generated.id().is_empty());
    assert_ne!(generated.id(), graph.generate_id());
    let edge = graph
        .add_edge(None, "v1", generated.id(), "knows", &vis("a"), &auths)
        .unwrap();

    let found = graph
        .get_vertices(&["v1", "missing", generated.id()], &FetchHints::NONE, &auths)
        .unwrap();
    let ids: Vec<&str> = found.iter().map(|v| v.id()).collect();
    assert_eq!(ids, vec!["v1", generated.id()]);
    assert_eq!(
        graph
            .get_edges(&[edge.id()], &FetchHints::NONE, &auths)
            .unwrap()
            .len(),
        1
    );

    graph
        .delete_elements(
            [ElementId::edge(edge.id()), ElementId::vertex(generated.id())],
            &auths,
        )
        .unwrap();
    assert!(!graph.does_edge_exist(edge.id(), &auths).unwrap());
    assert!(!graph.does_vertex_exist(generated.id(), &auths).unwrap());
    assert!(graph.does_vertex_exist("v1", &auths).unwrap());
}
