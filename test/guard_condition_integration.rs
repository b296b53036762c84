//! Guard Condition Integration Tests
//!
//! Cross-thread wakeups of a blocked spin and shutdown of a spinning node.

mod common;

use common::loopback_context;
use rclspin::{spin, spin_once, Context, ReactorConfig, SpinOutcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_trigger_wakes_infinite_wait() {
    let (context, _transport) = loopback_context();
    let mut node = context.create_node("sleeper", "").unwrap();
    let woken = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&woken);
    let trigger = node
        .create_guard_condition(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let waker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        trigger.trigger().unwrap();
    });

    let started = Instant::now();
    let outcome = spin_once(&mut node, -1).unwrap();
    let elapsed = started.elapsed();
    waker.join().unwrap();

    assert!(matches!(outcome, SpinOutcome::Dispatched(s) if s.guard_conditions == 1));
    assert_eq!(woken.load(Ordering::SeqCst), 1);
    assert!(elapsed < Duration::from_secs(5));

    // The trigger was consumed by the cycle that observed it.
    assert_eq!(spin_once(&mut node, 0).unwrap(), SpinOutcome::TimedOut);
}

#[test]
fn test_multiple_triggers_collapse_into_one_wakeup() {
    let (context, _transport) = loopback_context();
    let mut node = context.create_node("collapse", "").unwrap();
    let woken = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&woken);
    let trigger = node
        .create_guard_condition(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    for _ in 0..3 {
        trigger.trigger().unwrap();
    }
    spin_once(&mut node, 0).unwrap();
    assert_eq!(spin_once(&mut node, 0).unwrap(), SpinOutcome::TimedOut);
    assert_eq!(woken.load(Ordering::SeqCst), 1);
}

#[test]
fn test_removed_guard_condition_cannot_be_triggered() {
    let (context, _transport) = loopback_context();
    let mut node = context.create_node("removed", "").unwrap();
    let trigger = node.create_guard_condition(|| Ok(())).unwrap();
    assert!(node.remove_guard_condition(trigger.id()));
    assert!(trigger.trigger().is_err());
}

#[test]
fn test_shutdown_stops_spin() {
    let mut config = ReactorConfig::default();
    config.executor.spin_timeout_ms = -1;
    let context = Arc::new(Context::loopback(config));
    let mut node = context.create_node("spinner", "").unwrap();
    let woken = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&woken);
    let trigger = node
        .create_guard_condition(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let controller = Arc::clone(&context);
    let observed = Arc::clone(&woken);
    let handle = thread::spawn(move || {
        trigger.trigger().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while observed.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        controller.shutdown().unwrap();
    });

    spin(&mut node).unwrap();
    handle.join().unwrap();

    assert!(!context.ok());
    assert_eq!(woken.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failing_guard_callback_surfaces() {
    let (context, transport) = loopback_context();
    let mut node = context.create_node("failing", "").unwrap();
    let trigger = node
        .create_guard_condition(|| Err("wake handler failed".into()))
        .unwrap();
    trigger.trigger().unwrap();

    let err = spin_once(&mut node, 0).unwrap_err();
    assert!(err.is_callback_failure());
    assert_eq!(transport.stats().live_wait_sets, 0);
}

#[test]
fn test_trigger_survives_failed_cycle() {
    let (context, _transport) = loopback_context();
    let mut node = context.create_node("retry", "").unwrap();
    node.create_subscription::<rclspin::interfaces::StringMessage, _>("topic", |_| {
        Err("subscriber failed".into())
    })
    .unwrap();
    let woken = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&woken);
    let trigger = node
        .create_guard_condition(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    let publisher = node
        .create_publisher::<rclspin::interfaces::StringMessage>("topic")
        .unwrap();
    publisher.publish(&Default::default()).unwrap();
    trigger.trigger().unwrap();

    assert!(spin_once(&mut node, 0).unwrap_err().is_callback_failure());
    assert_eq!(woken.load(Ordering::SeqCst), 0);

    let outcome = spin_once(&mut node, 0).unwrap();
    assert!(matches!(outcome, SpinOutcome::Dispatched(s) if s.guard_conditions == 1));
    assert_eq!(woken.load(Ordering::SeqCst), 1);
}
