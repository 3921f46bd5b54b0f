//! Tests for the counter aggregator

use std::sync::Arc;
use std::thread;

use super::*;

#[test]
fn test_accumulates_totals_in_order() {
    let aggregator = CounterAggregator::new();

    let mut first = Envelope::counter("some-id", "requests", 20);
    let mut second = Envelope::counter("some-id", "requests", 20);
    aggregator.process(&mut first).unwrap();
    aggregator.process(&mut second).unwrap();

    let first = first.counter_payload().unwrap();
    let second = second.counter_payload().unwrap();
    assert_eq!(first.total, 20);
    assert_eq!(second.total, 40);
    // Delta is preserved for consumers that want the increment
    assert_eq!(first.delta, 20);
    assert_eq!(second.delta, 20);
}

#[test]
fn test_producer_total_is_overwritten() {
    let aggregator = CounterAggregator::new();
    let mut env = Envelope::counter("s", "n", 5);
    env.counter_payload_mut().unwrap().total = 999;

    aggregator.process(&mut env).unwrap();

    assert_eq!(env.counter_payload().unwrap().total, 5);
}

#[test]
fn test_keys_are_independent() {
    let aggregator = CounterAggregator::new();

    assert_eq!(aggregator.add("a", "x", 1), 1);
    assert_eq!(aggregator.add("a", "y", 10), 10);
    assert_eq!(aggregator.add("b", "x", 100), 100);
    assert_eq!(aggregator.add("a", "x", 1), 2);

    assert_eq!(aggregator.total("a", "x"), Some(2));
    assert_eq!(aggregator.total("a", "y"), Some(10));
    assert_eq!(aggregator.total("b", "x"), Some(100));
    assert_eq!(aggregator.total("b", "y"), None);
    assert_eq!(aggregator.key_count(), 3);
}

#[test]
fn test_non_counter_passes_through() {
    let aggregator = CounterAggregator::new();
    let mut log = Envelope::log("s", "hello").with_tag("k", "v");
    let mut gauge = Envelope::gauge("s", "cpu", "percent", 3.0);
    let (log_before, gauge_before) = (log.clone(), gauge.clone());

    aggregator.process(&mut log).unwrap();
    aggregator.process(&mut gauge).unwrap();

    assert_eq!(log, log_before);
    assert_eq!(gauge, gauge_before);
    assert_eq!(aggregator.key_count(), 0);
}

#[test]
fn test_reset() {
    let aggregator = CounterAggregator::new();
    aggregator.add("s", "n", 7);

    assert_eq!(aggregator.reset("s", "n"), Some(7));
    assert_eq!(aggregator.total("s", "n"), Some(0));
    assert_eq!(aggregator.add("s", "n", 3), 3);
    assert_eq!(aggregator.reset("s", "missing"), None);
}

#[test]
fn test_total_wraps_on_overflow() {
    let aggregator = CounterAggregator::new();
    aggregator.add("s", "n", u64::MAX);
    assert_eq!(aggregator.add("s", "n", 2), 1);
}

#[test]
fn test_concurrent_same_key_no_lost_updates() {
    let aggregator = Arc::new(CounterAggregator::new());
    let mut handles = Vec::new();

    for _ in 0..8 {
        let aggregator = Arc::clone(&aggregator);
        handles.push(thread::spawn(move || {
            for _ in 0..1000 {
                let mut env = Envelope::counter("shared", "hits", 1);
                aggregator.process(&mut env).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(aggregator.total("shared", "hits"), Some(8000));
}

#[test]
fn test_concurrent_distinct_keys() {
    let aggregator = Arc::new(CounterAggregator::new());
    let mut handles = Vec::new();

    for worker in 0..4 {
        let aggregator = Arc::clone(&aggregator);
        handles.push(thread::spawn(move || {
            let source = format!("source-{}", worker);
            let mut last = 0;
            for _ in 0..500 {
                let mut env = Envelope::counter(source.as_str(), "n", 2);
                aggregator.process(&mut env).unwrap();
                let total = env.counter_payload().unwrap().total;
                // Each key is only written by its own worker, so totals are monotonic
                assert_eq!(total, last + 2);
                last = total;
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(aggregator.key_count(), 4);
    for worker in 0..4 {
        assert_eq!(
            aggregator.total(&format!("source-{}", worker), "n"),
            Some(1000)
        );
    }
}
