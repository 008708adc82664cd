mod common;

use std::fs;
use std::sync::Arc;

use common::{at, date, importer, rate, MockGateway, MockSource};
use fxbridge_core::run_state::{FileRunStateLedger, InMemoryRunStateLedger, RunStateLedger};
use fxbridge_core::schedule::{
    FileScheduleStore, InMemoryScheduleSource, RunKey, ScheduleEntry, ScheduleFile,
    ValidationRules,
};
use fxbridge_core::scheduler::{FixedClock, LedgerPolicy, RunScheduler};
use rust_decimal_macros::dec;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn schedule(entries: Vec<ScheduleEntry>) -> Arc<InMemoryScheduleSource> {
    Arc::new(InMemoryScheduleSource::new(ScheduleFile::new(entries)))
}

#[tokio::test]
async fn test_due_entry_runs_once_per_day() {
    let dir = tempdir().unwrap();
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["USD"]);
    let clock = Arc::new(FixedClock::new(at(day, 1, 59)));
    let ledger = Arc::new(FileRunStateLedger::new(dir.path().join("worker-run-state.json")));

    let scheduler = RunScheduler::new(
        schedule(vec![ScheduleEntry::new("TEST", "KFT", None, "02:00")]),
        ledger.clone(),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(clock.clone());
    let cancel = CancellationToken::new();

    // Not yet due
    assert_eq!(scheduler.poll(&cancel).await.started, 0);

    clock.set(at(day, 2, 0));
    let summary = scheduler.poll(&cancel).await;
    assert_eq!(summary.started, 1);
    assert_eq!(summary.succeeded, 1);

    // Further polls the same day are no-ops
    clock.set(at(day, 2, 30));
    assert_eq!(scheduler.poll(&cancel).await.started, 0);
    clock.set(at(day, 23, 59));
    assert_eq!(scheduler.poll(&cancel).await.started, 0);
    assert_eq!(mnb.gateway.submissions().len(), 1);
    assert_eq!(
        ledger.read().get(&RunKey::new("TEST", "KFT", "MNB")),
        Some(&day)
    );

    // Next day, due again
    let next = date(2024, 3, 6);
    mnb.source.set_rates(vec![rate(next, "USD", dec!(361))]);
    clock.set(at(next, 2, 0));
    assert_eq!(scheduler.poll(&cancel).await.succeeded, 1);
    assert_eq!(mnb.gateway.submissions().len(), 2);
}

#[tokio::test]
async fn test_restart_does_not_repeat_todays_run() {
    let dir = tempdir().unwrap();
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["USD"]);
    let ledger_path = dir.path().join("worker-run-state.json");
    let entries = vec![ScheduleEntry::new("TEST", "KFT", None, "02:00")];
    let cancel = CancellationToken::new();

    let first = RunScheduler::new(
        schedule(entries.clone()),
        Arc::new(FileRunStateLedger::new(&ledger_path)),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(Arc::new(FixedClock::new(at(day, 3, 0))));
    assert_eq!(first.poll(&cancel).await.succeeded, 1);

    let second = RunScheduler::new(
        schedule(entries),
        Arc::new(FileRunStateLedger::new(&ledger_path)),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(Arc::new(FixedClock::new(at(day, 3, 1))));
    assert_eq!(second.poll(&cancel).await.started, 0);

    assert_eq!(mnb.gateway.submissions().len(), 1);
}

#[tokio::test]
async fn test_removed_entry_is_pruned_and_rearmed() {
    let dir = tempdir().unwrap();
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["USD"]);
    let ledger = Arc::new(FileRunStateLedger::new(dir.path().join("worker-run-state.json")));
    let source = schedule(vec![
        ScheduleEntry::new("TEST", "KFT", None, "02:00"),
        ScheduleEntry::new("PROD", "ZRT", None, "02:00"),
    ]);
    let clock = Arc::new(FixedClock::new(at(day, 9, 0)));
    let cancel = CancellationToken::new();

    let scheduler = RunScheduler::new(
        source.clone(),
        ledger.clone(),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(clock.clone());

    assert_eq!(scheduler.poll(&cancel).await.succeeded, 2);
    assert_eq!(ledger.read().len(), 2);

    // Entry removed from the live schedule
    source.replace(ScheduleFile::new(vec![ScheduleEntry::new(
        "PROD", "ZRT", None, "02:00",
    )]));
    let summary = scheduler.poll(&cancel).await;
    assert_eq!(summary.pruned, 1);
    assert_eq!(summary.started, 0);
    assert!(!ledger.read().contains_key(&RunKey::new("TEST", "KFT", "MNB")));

    // Re-added with a later run time: idle until then
    source.replace(ScheduleFile::new(vec![
        ScheduleEntry::new("PROD", "ZRT", None, "02:00"),
        ScheduleEntry::new("test", "kft", Some("mnb"), "18:00"),
    ]));
    assert_eq!(scheduler.poll(&cancel).await.started, 0);

    clock.set(at(day, 18, 0));
    let summary = scheduler.poll(&cancel).await;
    assert_eq!(summary.started, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(mnb.gateway.submissions().len(), 3);
}

#[tokio::test]
async fn test_missing_currency_does_not_abort_run() {
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["USD", "GBP"]);
    let ledger = Arc::new(InMemoryRunStateLedger::default());

    let scheduler = RunScheduler::new(
        schedule(vec![ScheduleEntry::new("TEST", "KFT", None, "02:00")]),
        ledger.clone(),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(Arc::new(FixedClock::new(at(day, 2, 0))));

    let summary = scheduler.poll(&CancellationToken::new()).await;
    assert_eq!(summary.succeeded, 1);

    let submissions = mnb.gateway.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].1.rates.len(), 1);
    assert_eq!(submissions[0].1.rates[0].currency_code, "USD");
    assert_eq!(ledger.read().len(), 1);
}

#[tokio::test]
async fn test_empty_intersection_is_not_persisted_and_not_retried() {
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["GBP"]);
    let ledger = Arc::new(InMemoryRunStateLedger::default());
    let clock = Arc::new(FixedClock::new(at(day, 2, 0)));
    let cancel = CancellationToken::new();

    let scheduler = RunScheduler::new(
        schedule(vec![ScheduleEntry::new("TEST", "KFT", None, "02:00")]),
        ledger.clone(),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(clock.clone());

    let summary = scheduler.poll(&cancel).await;
    assert_eq!(summary.failed, 1);
    assert!(ledger.read().is_empty());
    assert!(mnb.gateway.submissions().is_empty());

    clock.set(at(day, 12, 0));
    assert_eq!(scheduler.poll(&cancel).await.started, 0);
    assert_eq!(mnb.source.fetch_count(), 1);
}

#[tokio::test]
async fn test_failing_source_does_not_block_other_entries() {
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["USD"]);
    let ecb = MockSource::new("ECB", "EUR");
    ecb.set_failing(true);
    let cancel = CancellationToken::new();

    for (policy, persisted) in [(LedgerPolicy::Success, 1), (LedgerPolicy::Attempt, 2)] {
        let ledger = Arc::new(InMemoryRunStateLedger::default());
        let scheduler = RunScheduler::new(
            schedule(vec![
                ScheduleEntry::new("TEST", "KFT", Some("ECB"), "02:00"),
                ScheduleEntry::new("TEST", "KFT", Some("MNB"), "02:00"),
            ]),
            ledger.clone(),
            importer(vec![mnb.source.clone(), ecb.clone()], mnb.gateway.clone()),
        )
        .with_clock(Arc::new(FixedClock::new(at(day, 2, 0))))
        .with_policy(policy);

        let summary = scheduler.poll(&cancel).await;
        assert_eq!(summary.started, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(ledger.read().len(), persisted);
    }
}

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["USD"]);

    let scheduler = RunScheduler::new(
        schedule(vec![
            ScheduleEntry::new("TEST", "KFT", None, "two o'clock"),
            ScheduleEntry::new("", "KFT", None, "02:00"),
            ScheduleEntry::new("PROD", "ZRT", None, "02:00"),
        ]),
        Arc::new(InMemoryRunStateLedger::default()),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(Arc::new(FixedClock::new(at(day, 2, 0))));

    let summary = scheduler.poll(&CancellationToken::new()).await;
    assert_eq!(summary.started, 1);
    assert_eq!(mnb.gateway.submissions()[0].0, "PROD");
}

#[tokio::test]
async fn test_shutdown_stops_poll_without_recording_attempt() {
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["USD"]);
    let ledger = Arc::new(InMemoryRunStateLedger::default());
    let scheduler = RunScheduler::new(
        schedule(vec![ScheduleEntry::new("TEST", "KFT", None, "02:00")]),
        ledger.clone(),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(Arc::new(FixedClock::new(at(day, 2, 0))));

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(scheduler.poll(&cancel).await.started, 0);
    assert!(ledger.read().is_empty());

    // A fresh token after restart runs the entry
    assert_eq!(scheduler.poll(&CancellationToken::new()).await.succeeded, 1);
}

#[tokio::test]
async fn test_cancel_during_fetch_is_not_an_attempt() {
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["USD"]);
    let ledger = Arc::new(InMemoryRunStateLedger::default());
    let scheduler = RunScheduler::new(
        schedule(vec![ScheduleEntry::new("TEST", "KFT", None, "02:00")]),
        ledger.clone(),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(Arc::new(FixedClock::new(at(day, 2, 0))))
    .with_policy(LedgerPolicy::Attempt);

    let cancel = CancellationToken::new();
    mnb.source.cancel_on_next_fetch(cancel.clone());
    let summary = scheduler.poll(&cancel).await;
    assert_eq!(summary.started, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(mnb.source.fetch_count(), 1);
    assert!(ledger.read().is_empty());
    assert!(mnb.gateway.submissions().is_empty());

    let summary = scheduler.poll(&CancellationToken::new()).await;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(mnb.gateway.submissions().len(), 1);
    assert_eq!(
        ledger.read().get(&RunKey::new("TEST", "KFT", "MNB")),
        Some(&day)
    );
}

#[tokio::test]
async fn test_unreadable_schedule_skips_poll_without_pruning() {
    let dir = tempdir().unwrap();
    let day = date(2024, 3, 5);
    let mnb = MnbFixture::new(day, &["USD"]);
    let store = Arc::new(FileScheduleStore::new(dir.path().join("worker-schedule.json")));
    let schedule = ScheduleFile::new(vec![ScheduleEntry::new("TEST", "KFT", None, "02:00")]);
    store.save(&schedule, &ValidationRules::default()).unwrap();
    let saved = fs::read_to_string(store.path()).unwrap();

    let ledger_path = dir.path().join("worker-run-state.json");
    let ledger = Arc::new(FileRunStateLedger::new(&ledger_path));
    let clock = Arc::new(FixedClock::new(at(day, 3, 0)));
    let key = RunKey::new("TEST", "KFT", "MNB");
    let cancel = CancellationToken::new();

    let scheduler = RunScheduler::new(
        store.clone(),
        ledger.clone(),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(clock.clone());
    assert_eq!(scheduler.poll(&cancel).await.succeeded, 1);

    // Truncated mid-write
    fs::write(store.path(), &saved[..saved.len() / 2]).unwrap();
    clock.set(at(day, 3, 1));
    let summary = scheduler.poll(&cancel).await;
    assert!(summary.schedule_unreadable);
    assert_eq!(summary.pruned, 0);
    assert_eq!(summary.started, 0);
    assert_eq!(ledger.read().get(&key), Some(&day));

    // Emptied
    fs::write(store.path(), "").unwrap();
    clock.set(at(day, 3, 2));
    assert!(scheduler.poll(&cancel).await.schedule_unreadable);
    assert_eq!(ledger.read().get(&key), Some(&day));

    // Restored: still done for today
    fs::write(store.path(), &saved).unwrap();
    clock.set(at(day, 3, 3));
    let summary = scheduler.poll(&cancel).await;
    assert!(!summary.schedule_unreadable);
    assert_eq!(summary.started, 0);
    assert_eq!(mnb.gateway.submissions().len(), 1);

    // Also after a restart
    let restarted = RunScheduler::new(
        store,
        Arc::new(FileRunStateLedger::new(&ledger_path)),
        importer(vec![mnb.source.clone()], mnb.gateway.clone()),
    )
    .with_clock(Arc::new(FixedClock::new(at(day, 3, 4))));
    assert_eq!(restarted.poll(&cancel).await.started, 0);
    assert_eq!(mnb.gateway.submissions().len(), 1);
}

struct MnbFixture {
    source: Arc<MockSource>,
    gateway: Arc<MockGateway>,
}

impl MnbFixture {
    /// MNB source publishing USD and EUR on `day`, and a gateway whose
    /// company uses `currencies`.
    fn new(day: chrono::NaiveDate, currencies: &[&str]) -> Self {
        let source = MockSource::new("MNB", "HUF");
        source.set_rates(vec![
            rate(day, "USD", dec!(360.5)),
            rate(day, "EUR", dec!(392.81)),
        ]);
        Self {
            source,
            gateway: MockGateway::with_currencies(currencies),
        }
    }
}
