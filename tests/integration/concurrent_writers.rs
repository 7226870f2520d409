#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;
use std::thread;

use penumbra::{
    Authorizations, CounterMetrics, ElementId, FetchHints, Graph, GraphElement, GraphOptions,
    HistoryFilter, PropValue, Visibility,
};

const THREADS: usize = 8;
const WRITES_PER_THREAD: usize = 50;

fn vis(expr: &str) -> Visibility {
    Visibility::new(expr).unwrap()
}

#[test]
fn independent_vertices_from_many_threads() {
    let metrics = Arc::new(CounterMetrics::default());
    let graph = Arc::new(Graph::open(GraphOptions::in_memory().metrics(metrics.clone())).unwrap());
    let auths = Authorizations::new(["a"]);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let graph = Arc::clone(&graph);
            let auths = auths.clone();
            thread::spawn(move || {
                for i in 0..WRITES_PER_THREAD {
                    let id = format!("t{}-v{}", t, i);
                    graph
                        .prepare_vertex(Some(id.as_str()), None, &vis("a"), "")
                        .set_property("n", i as i64, &vis("a"))
                        .save(&auths)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    graph.flush().unwrap();
    let all = graph.get_all_vertices(&FetchHints::NONE, &auths).unwrap();
    assert_eq!(all.len(), THREADS * WRITES_PER_THREAD);
    assert_eq!(
        CounterMetrics::get(&metrics.vertices_saved),
        (THREADS * WRITES_PER_THREAD) as u64
    );
    assert_eq!(
        CounterMetrics::get(&metrics.property_writes),
        (THREADS * WRITES_PER_THREAD) as u64
    );
}

#[test]
fn same_property_from_many_threads_keeps_every_write_in_history() {
    let graph = Arc::new(Graph::in_memory().unwrap());
    let auths = Authorizations::new(["a"]);
    graph.add_vertex(Some("shared"), &vis("a"), &auths).unwrap();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let graph = &graph;
            let auths = &auths;
            scope.spawn(move || {
                for i in 0..WRITES_PER_THREAD {
                    graph
                        .mutate_vertex("shared")
                        .set_property("counter", format!("{}:{}", t, i), &vis("a"))
                        .save(auths)
                        .unwrap();
                }
            });
        }
    });

    let history = graph
        .get_historical_property_values(&ElementId::vertex("shared"), &HistoryFilter::new(), &auths)
        .unwrap();
    assert_eq!(history.len(), THREADS * WRITES_PER_THREAD);
    let mut stamps: Vec<i64> = history.iter().map(|h| h.timestamp).collect();
    stamps.dedup();
    assert_eq!(stamps.len(), history.len(), "commit timestamps must be unique");

    let shared = graph
        .get_vertex("shared", &FetchHints::ALL, &auths)
        .unwrap()
        .unwrap();
    assert_eq!(shared.property_values("counter").unwrap().len(), 1);
    assert_eq!(shared.property_value("counter").unwrap(), history[0].value.as_ref());
}

#[test]
fn readers_never_observe_a_partial_commit() {
    let graph = Arc::new(Graph::in_memory().unwrap());
    let auths = Authorizations::new(["a"]);
    graph
        .prepare_vertex(Some("v1"), None, &vis("a"), "")
        .set_property("left", 0i64, &vis("a"))
        .set_property("right", 0i64, &vis("a"))
        .save(&auths)
        .unwrap();

    thread::scope(|scope| {
        let writer_graph = &graph;
        let writer_auths = &auths;
        scope.spawn(move || {
            for i in 1..=200i64 {
                writer_graph
                    .mutate_vertex("v1")
                    .set_property("left", i, &vis("a"))
                    .set_property("right", i, &vis("a"))
                    .save(writer_auths)
                    .unwrap();
            }
        });
        for _ in 0..2 {
            let reader_graph = &graph;
            let reader_auths = &auths;
            scope.spawn(move || {
                for _ in 0..200 {
                    let v = reader_graph
                        .get_vertex("v1", &FetchHints::ALL, reader_auths)
                        .unwrap()
                        .unwrap();
                    let left = v.property_value("left").unwrap().cloned();
                    let right = v.property_value("right").unwrap().cloned();
                    assert_eq!(left, right);
                }
            });
        }
    });

    let v = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
    assert_eq!(
        v.property_value("left").unwrap(),
        Some(&PropValue::from(200i64))
    );
}

#[test]
fn clock_ticks_are_unique_across_threads() {
    let graph = Arc::new(Graph::in_memory().unwrap());
    let mut stamps: Vec<i64> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let graph = &graph;
                scope.spawn(move || (0..500).map(|_| graph.current_time()).collect::<Vec<_>>())
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });
    let total = stamps.len();
    stamps.sort_unstable();
    stamps.dedup();
    assert_eq!(stamps.len(), total);
}

#[test]
fn concurrent_soft_deletes_and_edge_writes_stay_consistent() {
    let graph = Arc::new(Graph::in_memory().unwrap());
    let auths = Authorizations::new(["a"]);
    for i in 0..20 {
        graph
            .add_vertex(Some(format!("v{}", i).as_str()), &vis("a"), &auths)
            .unwrap();
    }

    thread::scope(|scope| {
        let g = &graph;
        let a = &auths;
        scope.spawn(move || {
            for i in 0..19 {
                let id = format!("e{}", i);
                let out = format!("v{}", i);
                let inv = format!("v{}", i + 1);
                // Either endpoint may already be gone.
                let _ = g.add_edge(Some(id.as_str()), &out, &inv, "next", &vis("a"), a);
            }
        });
        scope.spawn(move || {
            for i in (0..20).step_by(3) {
                g.soft_delete_vertex(&format!("v{}", i), None, a).unwrap();
            }
        });
    });

    for edge in graph.get_all_edges(&FetchHints::ALL, &auths).unwrap() {
        assert!(graph.does_vertex_exist(edge.out_vertex_id(), &auths).unwrap());
        assert!(graph.does_vertex_exist(edge.in_vertex_id(), &auths).unwrap());
    }
}
