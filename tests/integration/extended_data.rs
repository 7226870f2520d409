use penumbra::{
    Authorizations, ElementKind, ExtendedDataRowId, ExtendedDataScan, FetchHints, Graph,
    GraphElement, GraphError, IdRange, PropValue, Visibility,
};

fn vis(expr: &str) -> Visibility {
    Visibility::new(expr).unwrap()
}

fn populated() -> (Graph, Authorizations) {
    let graph = Graph::in_memory().unwrap();
    let auths = Authorizations::new(["a", "b"]);
    graph
        .prepare_vertex(Some("v1"), None, &vis("a"), "")
        .add_extended_data("table1", "row1", "name", "value 1", &vis("a"))
        .add_extended_data("table1", "row1", "secret", "s1", &vis("b"))
        .add_extended_data("table1", "row2", "name", "value 2", &vis("a"))
        .add_extended_data("table2", "row3", "name", "value 3", &vis("a"))
        .save(&auths)
        .unwrap();
    graph
        .prepare_vertex(Some("v2"), None, &vis("a"), "")
        .add_extended_data("table1", "row1", "name", "other", &vis("a"))
        .save(&auths)
        .unwrap();
    (graph, auths)
}

#[test]
fn table_names_are_listed_on_the_element() {
    let (graph, auths) = populated();
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert_eq!(
        v1.extended_data_table_names().unwrap(),
        &["table1".to_owned(), "table2".to_owned()]
    );
    let bare = graph.get_vertex("v1", &FetchHints::NONE, &auths).unwrap().unwrap();
    assert!(matches!(
        bare.extended_data_table_names().unwrap_err(),
        GraphError::FetchHintViolation(_)
    ));
}

#[test]
fn rows_are_narrowed_positionally() {
    let (graph, auths) = populated();
    assert_eq!(graph.get_extended_data(None, None, None, &auths).unwrap().len(), 4);
    assert_eq!(
        graph
            .get_extended_data(Some(ElementKind::Vertex), Some("v1"), None, &auths)
            .unwrap()
            .len(),
        3
    );
    let rows = graph
        .get_extended_data(Some(ElementKind::Vertex), Some("v1"), Some("table1"), &auths)
        .unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.id().row_id.as_str()).collect();
    assert_eq!(ids, vec!["row1", "row2"]);
    assert!(graph
        .get_extended_data(Some(ElementKind::Edge), None, None, &auths)
        .unwrap()
        .is_empty());
}

#[test]
fn gaps_in_the_narrowing_are_rejected() {
    let (graph, auths) = populated();
    let err = graph
        .get_extended_data(None, None, Some("table1"), &auths)
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("nulls to the left of a value is not allowed"));
    assert!(graph
        .get_extended_data(None, Some("v1"), None, &auths)
        .is_err());
}

#[test]
fn cells_carry_their_own_visibility() {
    let (graph, _) = populated();
    let only_a = Authorizations::new(["a"]);
    let row = graph
        .get_extended_data_row(
            &ExtendedDataRowId::new(ElementKind::Vertex, "v1", "table1", "row1"),
            &only_a,
        )
        .unwrap()
        .unwrap();
    assert_eq!(row.column_names(), vec!["name"]);
    assert!(row.property_value("secret").is_none());

    let none = Authorizations::new(["c"]);
    assert!(graph.get_extended_data(None, None, None, &none).unwrap().is_empty());
}

#[test]
fn range_scans_cover_element_ids() {
    let (graph, auths) = populated();
    let rows = graph
        .get_extended_data_in_range(ElementKind::Vertex, IdRange::new(Some("v2"), None), &auths)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].property_value("name"), Some(&PropValue::from("other")));

    let prefix = graph
        .get_extended_data_in_range(ElementKind::Vertex, IdRange::prefix("v"), &auths)
        .unwrap();
    assert_eq!(prefix.len(), 4);

    let scan = ExtendedDataScan::new(Some(ElementKind::Vertex), Some("v1"), Some("table1"))
        .unwrap()
        .rows(IdRange::new(Some("row2"), None));
    assert_eq!(graph.scan_extended_data(&scan, &auths).unwrap().len(), 1);
}

#[test]
fn cells_and_rows_can_be_deleted() {
    let (graph, auths) = populated();
    graph
        .mutate_vertex("v1")
        .delete_extended_data("table1", "row1", "secret", "", &vis("b"))
        .delete_extended_data_row("table2", "row3")
        .save(&auths)
        .unwrap();

    let row = graph
        .get_extended_data_row(
            &ExtendedDataRowId::new(ElementKind::Vertex, "v1", "table1", "row1"),
            &auths,
        )
        .unwrap()
        .unwrap();
    assert_eq!(row.column_names(), vec!["name"]);
    let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert_eq!(v1.extended_data_table_names().unwrap(), &["table1".to_owned()]);
}

#[test]
fn deleting_the_element_drops_its_rows() {
    let (graph, auths) = populated();
    graph.soft_delete_vertex("v1", None, &auths).unwrap();
    assert!(graph
        .get_extended_data(Some(ElementKind::Vertex), Some("v1"), None, &auths)
        .unwrap()
        .is_empty());

    graph.delete_vertex("v2", &auths).unwrap();
    assert!(graph.get_extended_data(None, None, None, &auths).unwrap().is_empty());
}

#[test]
fn older_cell_writes_lose() {
    let (graph, auths) = populated();
    graph
        .mutate_vertex("v2")
        .add_extended_data_with("table1", "row1", "name", "", "stale", Some(1), &vis("a"))
        .save(&auths)
        .unwrap();
    let row = graph
        .get_extended_data_row(
            &ExtendedDataRowId::new(ElementKind::Vertex, "v2", "table1", "row1"),
            &auths,
        )
        .unwrap()
        .unwrap();
    assert_eq!(row.property_value("name"), Some(&PropValue::from("other")));
}

#[test]
fn unreadable_cell_visibility_is_rejected_on_write() {
    let (graph, _) = populated();
    let only_a = Authorizations::new(["a"]);
    let err = graph
        .mutate_vertex("v1")
        .add_extended_data("table1", "row9", "x", "y", &vis("b"))
        .save(&only_a)
        .unwrap_err();
    assert!(matches!(err, GraphError::Security(_)));
    assert!(graph
        .get_extended_data_row(
            &ExtendedDataRowId::new(ElementKind::Vertex, "v1", "table1", "row9"),
            &Authorizations::new(["a", "b"]),
        )
        .unwrap()
        .is_none());
}
