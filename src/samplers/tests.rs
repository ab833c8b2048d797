#![cfg(test)]

use super::{poll, BackgroundScheduler, Sampler, SamplerError, SamplerKind, SamplerSet};
use super::{POLL_PERIOD, SAMPLER_METRIC};
use crate::metrics::MetricStatsTable;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

struct Probe<const K: u8> {
    id: &'static str,
    fail: AtomicBool,
    polls: AtomicUsize,
}

impl<const K: u8> Probe<K> {
    fn ok(id: &'static str) -> Arc<Self> {
        Arc::new(Probe {
            id,
            fail: AtomicBool::new(false),
            polls: AtomicUsize::new(0),
        })
    }

    fn failing(id: &'static str) -> Arc<Self> {
        let probe = Self::ok(id);
        probe.fail.store(true, Ordering::SeqCst);
        probe
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl<const K: u8> Sampler for Probe<K> {
    fn poll(&self) -> Result<(), SamplerError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err(SamplerError::failed(format!("{} exploded", self.id)))
        } else {
            Ok(())
        }
    }

    fn id(&self) -> String {
        self.id.to_string()
    }
}

struct Panicker;

impl Sampler for Panicker {
    fn poll(&self) -> Result<(), SamplerError> {
        panic!("sampler went sideways");
    }
}

// Registers another sampler into the set it is being polled from.
struct Recruiter {
    set: Arc<SamplerSet>,
}

impl Sampler for Recruiter {
    fn poll(&self) -> Result<(), SamplerError> {
        self.set.insert(Probe::<9>::ok("recruit"));
        Ok(())
    }
}

// Looks at its own set from `kind()` and `id()`.
struct Introspective {
    set: Arc<SamplerSet>,
}

impl Sampler for Introspective {
    fn poll(&self) -> Result<(), SamplerError> {
        Ok(())
    }

    fn kind(&self) -> SamplerKind {
        let _ = self.set.len();
        SamplerKind::of::<Self>()
    }

    fn id(&self) -> String {
        format!("introspective-{}", self.set.len())
    }
}

#[test]
fn kind_follows_concrete_type() {
    let a = Probe::<1>::ok("a");
    let other_a = Probe::<1>::ok("a2");
    let b = Probe::<2>::ok("b");

    assert_eq!(a.kind(), other_a.kind());
    assert_ne!(a.kind(), b.kind());
    assert_eq!(Panicker.kind(), SamplerKind::of::<Panicker>());
    assert_eq!(Panicker.kind().short_name(), "Panicker");
    assert_eq!(a.kind().short_name(), "Probe");
    assert_eq!(Panicker.id(), "Panicker");
}

#[test]
fn sampler_error_messages() {
    assert_eq!(SamplerError::failed("no data").to_string(), "no data");
    assert_eq!(
        SamplerError::Unavailable("/proc/self/status").to_string(),
        "/proc/self/status is not available"
    );
    let io: SamplerError = std::io::Error::new(std::io::ErrorKind::Other, "closed").into();
    assert!(matches!(io, SamplerError::Io(_)));
    assert!(std::error::Error::source(&io).is_some());
}

#[test]
fn set_rejects_second_sampler_of_same_kind() {
    let set = SamplerSet::new();
    assert!(set.is_empty());

    assert!(set.insert(Probe::<1>::ok("a")));
    assert!(set.insert(Probe::<2>::ok("b")));
    assert!(!set.insert(Probe::<1>::ok("a-prime")));

    assert_eq!(set.len(), 2);
    assert_eq!(set.ids(), vec!["a".to_string(), "b".to_string()]);
    assert!(set.contains_kind(SamplerKind::of::<Probe<2>>()));
    assert!(!set.contains_kind(SamplerKind::of::<Panicker>()));
}

#[test]
fn sampler_methods_may_call_back_into_their_set() {
    let set = Arc::new(SamplerSet::new());
    let sampler = Arc::new(Introspective {
        set: Arc::clone(&set),
    });

    assert!(set.insert(sampler.clone()));
    assert!(!set.insert(sampler));
    assert_eq!(set.ids(), vec!["introspective-1".to_string()]);
    assert_eq!(set.kinds(), vec![SamplerKind::of::<Introspective>()]);
    assert!(poll(&set).is_clean());
}

#[test]
fn accept_hook_runs_only_for_new_kinds() {
    let set = SamplerSet::new();
    let mut accepted = Vec::new();

    assert!(set.insert_with(Probe::<1>::ok("a"), |s| accepted.push(s.id())));
    assert!(!set.insert_with(Probe::<1>::ok("a-prime"), |s| accepted.push(s.id())));
    assert!(set.insert_with(Probe::<2>::ok("b"), |s| accepted.push(s.id())));

    assert_eq!(accepted, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn poll_removes_only_failing_samplers_in_order() {
    let set = SamplerSet::new();
    let a = Probe::<1>::ok("a");
    let b = Probe::<2>::failing("b");
    let c = Probe::<3>::ok("c");
    let d = Probe::<4>::failing("d");
    set.insert(a.clone());
    set.insert(b.clone());
    set.insert(c.clone());
    set.insert(d.clone());

    let report = poll(&set);

    assert_eq!(report.polled, 4);
    assert_eq!(report.removed, vec!["b".to_string(), "d".to_string()]);
    assert!(!report.is_clean());
    assert_eq!(set.ids(), vec!["a".to_string(), "c".to_string()]);
    for polls in [a.polls(), b.polls(), c.polls(), d.polls()] {
        assert_eq!(polls, 1);
    }

    let second = poll(&set);
    assert!(second.is_clean());
    assert_eq!(second.polled, 2);
    assert_eq!(b.polls(), 1, "removed samplers are never polled again");
    assert_eq!(a.polls(), 2);
}

#[test]
fn removed_kind_can_be_registered_again_by_hand() {
    let set = SamplerSet::new();
    set.insert(Probe::<1>::failing("first"));
    poll(&set);
    assert!(set.is_empty());

    assert!(set.insert(Probe::<1>::ok("second")));
    assert_eq!(set.ids(), vec!["second".to_string()]);
}

#[test]
fn poll_treats_panics_as_faults() {
    let set = SamplerSet::new();
    let a = Probe::<1>::ok("a");
    set.insert(Arc::new(Panicker));
    set.insert(a.clone());

    let report = poll(&set);

    assert_eq!(report.removed, vec!["Panicker".to_string()]);
    assert_eq!(set.ids(), vec!["a".to_string()]);
    assert_eq!(a.polls(), 1);
}

#[test]
fn poll_on_empty_set_is_clean() {
    let report = poll(&SamplerSet::new());
    assert_eq!(report.polled, 0);
    assert!(report.is_clean());
}

#[test]
fn sampler_may_register_into_the_set_it_is_polled_from() {
    let set = Arc::new(SamplerSet::new());
    set.insert(Arc::new(Recruiter { set: Arc::clone(&set) }));

    let report = poll(&set);

    assert_eq!(report.polled, 1);
    assert_eq!(set.ids(), vec!["Recruiter".to_string(), "recruit".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn scheduler_polls_after_one_period_and_records_duration() {
    let set = Arc::new(SamplerSet::new());
    let a = Probe::<1>::ok("a");
    let b = Probe::<2>::failing("b");
    set.insert(a.clone());
    set.insert(b.clone());
    let table = Arc::new(MetricStatsTable::new());

    let scheduler =
        BackgroundScheduler::spawn(Arc::clone(&set), table.clone()).expect("spawn scheduler");

    sleep(POLL_PERIOD - Duration::from_secs(1)).await;
    assert_eq!(a.polls(), 0);
    assert_eq!(table.call_count(SAMPLER_METRIC), 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(a.polls(), 1);
    assert_eq!(b.polls(), 1);
    assert_eq!(set.ids(), vec!["a".to_string()]);

    let stats = table.get(SAMPLER_METRIC).expect("duration recorded");
    assert_eq!(stats.call_count, 1);
    assert!(stats.total >= POLL_PERIOD.as_secs_f64());
    assert!(scheduler.is_alive());
}

#[tokio::test(start_paused = true)]
async fn every_cycle_records_one_duration_even_when_all_fail() {
    let set = Arc::new(SamplerSet::new());
    set.insert(Probe::<1>::failing("a"));
    set.insert(Probe::<2>::failing("b"));
    let table = Arc::new(MetricStatsTable::new());

    let _scheduler =
        BackgroundScheduler::spawn(Arc::clone(&set), table.clone()).expect("spawn scheduler");

    sleep(POLL_PERIOD + Duration::from_secs(1)).await;
    assert!(set.is_empty());
    assert_eq!(table.call_count(SAMPLER_METRIC), 1);

    sleep(POLL_PERIOD).await;
    assert_eq!(table.call_count(SAMPLER_METRIC), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_scheduler_stops_the_loop() {
    let set = Arc::new(SamplerSet::new());
    let a = Probe::<1>::ok("a");
    set.insert(a.clone());
    let table = Arc::new(MetricStatsTable::new());

    let scheduler =
        BackgroundScheduler::spawn(Arc::clone(&set), table.clone()).expect("spawn scheduler");
    sleep(POLL_PERIOD + Duration::from_secs(1)).await;
    assert_eq!(a.polls(), 1);

    drop(scheduler);
    sleep(POLL_PERIOD * 3).await;
    assert_eq!(a.polls(), 1);
    assert_eq!(table.call_count(SAMPLER_METRIC), 1);
}

#[test]
fn scheduler_outside_a_runtime_owns_one() {
    let set = Arc::new(SamplerSet::new());
    set.insert(Probe::<1>::ok("a"));
    let table = Arc::new(MetricStatsTable::new());

    let scheduler =
        BackgroundScheduler::spawn(Arc::clone(&set), table.clone()).expect("spawn scheduler");
    assert!(scheduler.is_alive());
    drop(scheduler);
}
