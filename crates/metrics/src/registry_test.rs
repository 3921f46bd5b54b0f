//! Tests for the metrics registry

use std::thread;

use super::*;

#[test]
fn test_get_or_create_returns_same_counter() {
    let registry = MetricsRegistry::new();
    let a = registry.counter("ingress", &[]);
    let b = registry.counter("ingress", &[]);

    a.inc();
    b.add(2);

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.counter_value("ingress", &[]), Some(3));
}

#[test]
fn test_label_sets_are_independent() {
    let registry = MetricsRegistry::new();
    registry.counter("dropped", &[("direction", "ingress")]).add(5);
    registry.counter("dropped", &[("direction", "egress")]).add(1);

    assert_eq!(
        registry.counter_value("dropped", &[("direction", "ingress")]),
        Some(5)
    );
    assert_eq!(
        registry.counter_value("dropped", &[("direction", "egress")]),
        Some(1)
    );
    assert_eq!(registry.counter_value("dropped", &[]), None);
}

#[test]
fn test_label_order_is_irrelevant() {
    let registry = MetricsRegistry::new();
    registry.counter("m", &[("a", "1"), ("b", "2")]).inc();

    assert_eq!(registry.counter_value("m", &[("b", "2"), ("a", "1")]), Some(1));
}

#[test]
fn test_counters_and_gauges_do_not_collide() {
    let registry = MetricsRegistry::new();
    registry.counter("x", &[]).add(7);
    registry.gauge("x", &[]).set(2);

    assert_eq!(registry.counter_value("x", &[]), Some(7));
    assert_eq!(registry.gauge_value("x", &[]), Some(2));
}

#[test]
fn test_snapshot_sorted() {
    let registry = MetricsRegistry::new();
    registry.counter("b", &[]).inc();
    registry.counter("a", &[("k", "2")]).inc();
    registry.counter("a", &[("k", "1")]).inc();
    registry.gauge("active_bindings", &[]).set(3);

    let snapshot = registry.snapshot();
    let names: Vec<String> = snapshot.counters.iter().map(|s| s.key.to_string()).collect();

    assert_eq!(names, vec!["a{k=1}", "a{k=2}", "b"]);
    assert_eq!(snapshot.gauges.len(), 1);
    assert_eq!(snapshot.gauges[0].value, 3);
}

#[test]
fn test_counter_delta() {
    let registry = MetricsRegistry::new();
    let ingress = registry.counter("ingress", &[]);
    ingress.add(10);
    let before = registry.snapshot();
    ingress.add(5);
    registry.counter("new", &[]).inc();
    let after = registry.snapshot();

    let deltas: Vec<Option<u64>> = after
        .counters
        .iter()
        .map(|s| after.counter_delta(s, &before))
        .collect();
    assert_eq!(deltas, vec![Some(5), None]);
}

#[test]
fn test_concurrent_get_or_create() {
    let registry = Arc::new(MetricsRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..1000 {
                    registry.counter("hits", &[("direction", "ingress")]).inc();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        registry.counter_value("hits", &[("direction", "ingress")]),
        Some(8000)
    );
}
