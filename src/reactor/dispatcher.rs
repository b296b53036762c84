use super::{CorrelationToken, SlotIndex, WaitSet};
use crate::endpoint::{ClientBase, PayloadHandle, ServiceBase, SubscriptionBase};
use crate::error::{RclError, RclResult, TransportResult};
use crate::node::NodeRegistry;
use crate::transport::{Category, Timeout, Transport, WaitOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinOutcome {
    /// Nothing registered, no wait happened.
    Idle,
    TimedOut,
    Dispatched(DispatchSummary),
}

/// Per-category callback counts of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub messages: usize,
    pub requests: usize,
    pub responses: usize,
    pub guard_conditions: usize,
    /// Ready slots whose take found nothing.
    pub skipped: usize,
}

impl DispatchSummary {
    pub fn callbacks(&self) -> usize {
        self.messages + self.requests + self.responses + self.guard_conditions
    }
}

/// Slot assignments of one cycle, parallel to the registry sequences.
struct CycleSlots {
    subscriptions: Vec<SlotIndex>,
    services: Vec<SlotIndex>,
    clients: Vec<SlotIndex>,
    guard_conditions: Vec<SlotIndex>,
}

impl CycleSlots {
    fn populate(wait_set: &mut WaitSet<'_>, registry: &NodeRegistry) -> TransportResult<Self> {
        let subscriptions = registry
            .subscriptions
            .iter()
            .map(|s| wait_set.add(Category::Subscription, s.id().raw()))
            .collect::<TransportResult<Vec<_>>>()?;
        let services = registry
            .services
            .iter()
            .map(|s| wait_set.add(Category::Service, s.id().raw()))
            .collect::<TransportResult<Vec<_>>>()?;
        let clients = registry
            .clients
            .iter()
            .map(|c| wait_set.add(Category::Client, c.id().raw()))
            .collect::<TransportResult<Vec<_>>>()?;
        let guard_conditions = registry
            .guard_conditions
            .iter()
            .map(|g| wait_set.add(Category::GuardCondition, g.id().raw()))
            .collect::<TransportResult<Vec<_>>>()?;
        Ok(Self {
            subscriptions,
            services,
            clients,
            guard_conditions,
        })
    }
}

/// Dispatch state of one cycle after the wait reported readiness.
struct Cycle<'c, 't> {
    transport: &'t dyn Transport,
    wait_set: &'c WaitSet<'t>,
    slots: &'c CycleSlots,
    token: CorrelationToken,
    summary: DispatchSummary,
    /// Guard conditions up to and including the last one invoked.
    guards_visited: usize,
}

impl Cycle<'_, '_> {
    fn dispatch(&mut self, category: Category, registry: &mut NodeRegistry) -> RclResult<()> {
        let transport = self.transport;
        let wait_set = self.wait_set;
        match category {
            Category::Subscription => {
                for (subscription, slot) in
                    registry.subscriptions.iter_mut().zip(&self.slots.subscriptions)
                {
                    if !wait_set.is_ready(*slot) {
                        continue;
                    }
                    if take_message(transport, subscription.as_mut())? {
                        self.summary.messages += 1;
                    } else {
                        self.summary.skipped += 1;
                    }
                }
            }
            Category::Service => {
                for (service, slot) in registry.services.iter_mut().zip(&self.slots.services) {
                    if !wait_set.is_ready(*slot) {
                        continue;
                    }
                    if take_request(transport, service.as_mut(), &mut self.token)? {
                        self.summary.requests += 1;
                    } else {
                        self.summary.skipped += 1;
                    }
                }
            }
            Category::Client => {
                for (client, slot) in registry.clients.iter().zip(&self.slots.clients) {
                    if !wait_set.is_ready(*slot) {
                        continue;
                    }
                    if take_response(transport, client.as_ref(), &mut self.token)? {
                        self.summary.responses += 1;
                    } else {
                        self.summary.skipped += 1;
                    }
                }
            }
            Category::GuardCondition => {
                for (position, (guard_condition, slot)) in registry
                    .guard_conditions
                    .iter_mut()
                    .zip(&self.slots.guard_conditions)
                    .enumerate()
                {
                    if !wait_set.is_ready(*slot) {
                        continue;
                    }
                    self.guards_visited = position + 1;
                    guard_condition.invoke()?;
                    self.summary.guard_conditions += 1;
                }
            }
        }
        Ok(())
    }

    /// The wait consumed the trigger of every ready guard condition. Trigger
    /// again those an aborted cycle never invoked.
    fn rearm_guard_conditions(&self, registry: &NodeRegistry) {
        for (guard_condition, slot) in registry
            .guard_conditions
            .iter()
            .zip(&self.slots.guard_conditions)
            .skip(self.guards_visited)
        {
            if !self.wait_set.is_ready(*slot) {
                continue;
            }
            let raw = guard_condition.id().raw();
            match self.transport.trigger_guard_condition(raw) {
                Ok(()) => trace!(guard_condition = %raw, "re-armed after aborted cycle"),
                Err(e) => warn!(guard_condition = %raw, error = %e, "failed to re-arm guard condition"),
            }
        }
    }
}

/// Drives spin cycles over a [`NodeRegistry`].
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Run exactly one cycle.
    ///
    /// `WouldBlock` takes are skipped and `TimedOut` ends the cycle quietly.
    /// Any other failure, including a failing callback, aborts the cycle
    /// after the payloads, the token and the wait set have been released.
    /// Ready guard conditions the aborted cycle did not reach stay triggered.
    pub fn run_once(
        &self,
        registry: &mut NodeRegistry,
        timeout: Timeout,
    ) -> RclResult<SpinOutcome> {
        let capacity = registry.counts();
        if capacity.is_empty() {
            trace!("nothing registered, skipping cycle");
            return Ok(SpinOutcome::Idle);
        }

        let transport = &*self.transport;
        let mut wait_set = WaitSet::build(transport, capacity)?;
        wait_set.clear()?;
        let slots = CycleSlots::populate(&mut wait_set, registry)?;

        trace!(?capacity, ?timeout, "waiting");
        if wait_set.wait(timeout)? == WaitOutcome::TimedOut {
            trace!("wait timed out");
            return Ok(SpinOutcome::TimedOut);
        }

        let mut cycle = Cycle {
            transport,
            wait_set: &wait_set,
            slots: &slots,
            token: CorrelationToken::acquire(),
            summary: DispatchSummary::default(),
            guards_visited: 0,
        };
        for category in Category::ALL {
            if let Err(e) = cycle.dispatch(category, registry) {
                cycle.rearm_guard_conditions(registry);
                return Err(e);
            }
        }

        let summary = cycle.summary;
        trace!(?summary, "cycle complete");
        Ok(SpinOutcome::Dispatched(summary))
    }

    /// Run cycles while the transport is active.
    pub fn run_forever(&self, registry: &mut NodeRegistry, timeout: Timeout) -> RclResult<()> {
        while self.transport.is_active() {
            if self.run_once(registry, timeout)? == SpinOutcome::Idle {
                std::thread::sleep(idle_backoff(timeout));
            }
        }
        Ok(())
    }
}

/// Pause between cycles when nothing is registered. Without it an empty
/// node would spin hot.
fn idle_backoff(timeout: Timeout) -> Duration {
    match timeout {
        Timeout::Immediate => Duration::ZERO,
        Timeout::Bounded(duration) => duration,
        Timeout::Infinite => super::DEFAULT_SPIN_TIMEOUT,
    }
}

/// Returns `false` when the take found nothing.
fn take_message(transport: &dyn Transport, subscription: &mut dyn SubscriptionBase) -> RclResult<bool> {
    let id = subscription.id();
    let payload = PayloadHandle::acquire(transport, subscription.message_type())?;
    match transport.take(id.raw(), payload.raw()) {
        Ok(()) => {}
        Err(e) if e.is_would_block() => {
            trace!(subscription = %id.raw(), "take would block");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }
    subscription.handle_message(&payload)?;
    Ok(true)
}

fn take_request(
    transport: &dyn Transport,
    service: &mut dyn ServiceBase,
    token: &mut CorrelationToken,
) -> RclResult<bool> {
    let id = service.id();
    let request = PayloadHandle::acquire(transport, service.request_type())?;
    let response = PayloadHandle::acquire(transport, service.response_type())?;

    token.clear();
    match transport.take_request(id.raw(), token, request.raw()) {
        Ok(()) => {}
        Err(e) if e.is_would_block() => {
            trace!(service = %id.raw(), "take_request would block");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }
    if !token.is_filled() {
        return Err(RclError::MissingSequenceNumber(Category::Service));
    }

    service.handle_request(&request, &response)?;
    transport.send_response(id.raw(), token, response.raw())?;
    trace!(
        service = %id.raw(),
        sequence_number = ?token.sequence_number(),
        "response sent"
    );
    Ok(true)
}

fn take_response(
    transport: &dyn Transport,
    client: &dyn ClientBase,
    token: &mut CorrelationToken,
) -> RclResult<bool> {
    let id = client.id();
    let response = PayloadHandle::acquire(transport, client.response_type())?;

    token.clear();
    match transport.take_response(id.raw(), token, response.raw()) {
        Ok(()) => {}
        Err(e) if e.is_would_block() => {
            trace!(client = %id.raw(), "take_response would block");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }
    let sequence_number = token
        .sequence_number()
        .ok_or(RclError::MissingSequenceNumber(Category::Client))?;

    client.handle_response(sequence_number, &response)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{GuardCondition, Publisher, Subscription};
    use crate::interfaces::Int64Message;
    use crate::qos::QosProfile;
    use crate::transport::{LoopbackTransport, RawHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<LoopbackTransport>, Arc<dyn Transport>, RawHandle) {
        let loopback = Arc::new(LoopbackTransport::new());
        loopback.init().unwrap();
        let transport: Arc<dyn Transport> = loopback.clone();
        let node = transport.create_node("dispatcher_test", "").unwrap();
        (loopback, transport, node)
    }

    #[test]
    fn test_empty_registry_is_idle() {
        let (loopback, transport, _) = setup();
        let dispatcher = Dispatcher::new(transport);
        let mut registry = NodeRegistry::default();

        let outcome = dispatcher
            .run_once(&mut registry, Timeout::Infinite)
            .unwrap();
        assert_eq!(outcome, SpinOutcome::Idle);
        assert_eq!(loopback.stats().wait_sets_created, 0);
        assert_eq!(loopback.stats().waits, 0);
    }

    #[test]
    fn test_timeout_runs_no_callback() {
        let (loopback, transport, node) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut registry = NodeRegistry::default();
        registry.add_subscription(Box::new(
            Subscription::<Int64Message>::create(
                &transport,
                node,
                "numbers",
                &QosProfile::default(),
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
            )
            .unwrap(),
        ));

        let dispatcher = Dispatcher::new(transport);
        let outcome = dispatcher
            .run_once(&mut registry, Timeout::from_millis(10))
            .unwrap();
        assert_eq!(outcome, SpinOutcome::TimedOut);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(loopback.stats().live_wait_sets, 0);
    }

    #[test]
    fn test_message_and_guard_in_one_cycle() {
        let (loopback, transport, node) = setup();
        let seen = Arc::new(AtomicUsize::new(0));
        let woken = Arc::new(AtomicUsize::new(0));

        let mut registry = NodeRegistry::default();
        let seen_in_callback = Arc::clone(&seen);
        registry.add_subscription(Box::new(
            Subscription::<Int64Message>::create(
                &transport,
                node,
                "numbers",
                &QosProfile::default(),
                move |msg| {
                    seen_in_callback.fetch_add(msg.data as usize, Ordering::SeqCst);
                    Ok(())
                },
            )
            .unwrap(),
        ));
        let woken_in_callback = Arc::clone(&woken);
        let guard = GuardCondition::create(&transport, node, move || {
            woken_in_callback.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        let trigger = guard.trigger_handle();
        registry.add_guard_condition(guard);

        let publisher =
            Publisher::<Int64Message>::create(&transport, node, "numbers", &QosProfile::default())
                .unwrap();
        publisher.publish(&Int64Message { data: 7 }).unwrap();
        trigger.trigger().unwrap();

        let dispatcher = Dispatcher::new(transport);
        let outcome = dispatcher
            .run_once(&mut registry, Timeout::from_millis(100))
            .unwrap();
        let SpinOutcome::Dispatched(summary) = outcome else {
            panic!("expected a dispatch, got {:?}", outcome);
        };
        assert_eq!(summary.messages, 1);
        assert_eq!(summary.guard_conditions, 1);
        assert_eq!(summary.callbacks(), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert_eq!(woken.load(Ordering::SeqCst), 1);
        assert_eq!(loopback.stats().live_payloads, 0);
    }

    #[test]
    fn test_failing_callback_aborts_cycle() {
        let (loopback, transport, node) = setup();
        let mut registry = NodeRegistry::default();
        registry.add_subscription(Box::new(
            Subscription::<Int64Message>::create(
                &transport,
                node,
                "numbers",
                &QosProfile::default(),
                |_| Err("rejected".into()),
            )
            .unwrap(),
        ));
        let publisher =
            Publisher::<Int64Message>::create(&transport, node, "numbers", &QosProfile::default())
                .unwrap();
        publisher.publish(&Int64Message { data: 1 }).unwrap();

        let dispatcher = Dispatcher::new(transport);
        let err = dispatcher
            .run_once(&mut registry, Timeout::Immediate)
            .unwrap_err();
        assert!(err.is_callback_failure());
        assert_eq!(err.to_string(), "subscription callback failed: rejected");

        let stats = loopback.stats();
        assert_eq!(stats.live_payloads, 0);
        assert_eq!(stats.live_wait_sets, 0);
    }

    #[test]
    fn test_aborted_cycle_keeps_guard_triggered() {
        let (loopback, transport, node) = setup();
        let mut registry = NodeRegistry::default();
        registry.add_subscription(Box::new(
            Subscription::<Int64Message>::create(
                &transport,
                node,
                "numbers",
                &QosProfile::default(),
                |_| Err("rejected".into()),
            )
            .unwrap(),
        ));
        let woken = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&woken);
        let guard = GuardCondition::create(&transport, node, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        let trigger = guard.trigger_handle();
        registry.add_guard_condition(guard);

        let publisher =
            Publisher::<Int64Message>::create(&transport, node, "numbers", &QosProfile::default())
                .unwrap();
        publisher.publish(&Int64Message { data: 1 }).unwrap();
        trigger.trigger().unwrap();

        let dispatcher = Dispatcher::new(transport);
        let err = dispatcher
            .run_once(&mut registry, Timeout::Immediate)
            .unwrap_err();
        assert!(err.is_callback_failure());
        assert_eq!(woken.load(Ordering::SeqCst), 0);

        let outcome = dispatcher
            .run_once(&mut registry, Timeout::Immediate)
            .unwrap();
        let SpinOutcome::Dispatched(summary) = outcome else {
            panic!("expected a dispatch, got {:?}", outcome);
        };
        assert_eq!(summary.guard_conditions, 1);
        assert_eq!(summary.messages, 0);
        assert_eq!(woken.load(Ordering::SeqCst), 1);

        assert_eq!(
            dispatcher
                .run_once(&mut registry, Timeout::Immediate)
                .unwrap(),
            SpinOutcome::TimedOut
        );
        assert_eq!(loopback.stats().live_wait_sets, 0);
    }

    #[test]
    fn test_failing_guard_rearms_only_later_guards() {
        let (_loopback, transport, node) = setup();
        let mut registry = NodeRegistry::default();
        let failing = GuardCondition::create(&transport, node, || Err("wake failed".into())).unwrap();
        let failing_trigger = failing.trigger_handle();
        registry.add_guard_condition(failing);

        let woken = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&woken);
        let later = GuardCondition::create(&transport, node, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        let later_trigger = later.trigger_handle();
        registry.add_guard_condition(later);

        failing_trigger.trigger().unwrap();
        later_trigger.trigger().unwrap();

        let dispatcher = Dispatcher::new(transport);
        assert!(dispatcher
            .run_once(&mut registry, Timeout::Immediate)
            .unwrap_err()
            .is_callback_failure());

        // The failing guard was delivered; only the later one fires again.
        let outcome = dispatcher
            .run_once(&mut registry, Timeout::Immediate)
            .unwrap();
        assert!(matches!(outcome, SpinOutcome::Dispatched(s) if s.guard_conditions == 1));
        assert_eq!(woken.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_idle_backoff() {
        assert_eq!(idle_backoff(Timeout::Immediate), Duration::ZERO);
        assert_eq!(
            idle_backoff(Timeout::from_millis(20)),
            Duration::from_millis(20)
        );
        assert_eq!(
            idle_backoff(Timeout::Infinite),
            crate::reactor::DEFAULT_SPIN_TIMEOUT
        );
    }
}
