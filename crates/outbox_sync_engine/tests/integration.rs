//! End-to-end tests: client, engine and a real authority.

use outbox_authority::{Authority, RunningAuthority};
use outbox_core::{
    Method, Mutation, NewRecord, Record, RecordId, RecordPatch, RemoteAuthority, RemoteError,
    RemoteResult, StoreConfig,
};
use outbox_sync_engine::{
    Client, ConnectivityMonitor, Delivery, HttpRemote, Notice, StaticProbe, SyncConfig,
    SyncWorker, Transition,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Wraps the in-process authority, records every call and can fail on demand.
struct Flaky {
    inner: Authority,
    down: AtomicBool,
    /// Record ids (as the authority sees them) whose calls fail.
    failing: Mutex<Vec<RecordId>>,
    calls: Mutex<Vec<(Method, String)>>,
}

impl Flaky {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Authority::in_memory(),
            down: AtomicBool::new(false),
            failing: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn fail_for(&self, id: RecordId) {
        self.failing.lock().push(id);
    }

    fn heal(&self) {
        self.failing.lock().clear();
        self.set_down(false);
    }

    fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().clone()
    }

    fn check(&self, method: Method, target: &str) -> RemoteResult<()> {
        self.calls.lock().push((method, target.to_string()));
        let targeted = self.failing.lock().iter().any(|id| id.as_str() == target);
        if self.down.load(Ordering::SeqCst) || targeted {
            return Err(RemoteError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

impl RemoteAuthority for Flaky {
    fn list(&self) -> RemoteResult<Vec<Record>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("connection refused".into()));
        }
        self.inner.list()
    }

    fn create(&self, fields: &NewRecord) -> RemoteResult<Record> {
        self.check(Method::Create, &fields.name)?;
        self.inner.create(fields)
    }

    fn update(&self, id: &RecordId, patch: &RecordPatch) -> RemoteResult<Record> {
        self.check(Method::Update, id.as_str())?;
        self.inner.update(id, patch)
    }

    fn delete(&self, id: &RecordId) -> RemoteResult<()> {
        self.check(Method::Delete, id.as_str())?;
        self.inner.delete(id)
    }
}

fn client(online: bool) -> (Client<Arc<Flaky>>, Arc<Flaky>) {
    let remote = Flaky::new();
    let monitor = Arc::new(ConnectivityMonitor::new(online));
    let client = Client::in_memory(Arc::clone(&remote), monitor).unwrap();
    (client, remote)
}

fn remote_names(remote: &Flaky) -> Vec<String> {
    remote.inner.list().unwrap().into_iter().map(|r| r.name).collect()
}

#[test]
fn offline_add_then_drain_reaches_authority() {
    let (client, remote) = client(false);

    let outcome = client.add_record("Ana", "ana@x.com", "pw1").unwrap();
    assert_eq!(outcome.notice, Notice::SavedLocally);
    assert_eq!(client.list_records().unwrap().len(), 1);

    let pending = client.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].method(), Method::Create);
    assert!(remote.calls().is_empty());

    client.monitor().set_online(true);
    let report = client.sync_now().unwrap();
    assert_eq!(report.applied, 1);
    assert!(client.pending().is_empty());
    assert_eq!(remote_names(&remote), vec!["Ana"]);
}

#[test]
fn online_add_is_synced_immediately() {
    let (client, remote) = client(true);

    let outcome = client.add_record("Bo", "bo@x.com", "pw").unwrap();
    assert_eq!(outcome.notice, Notice::Synced);
    assert!(client.pending().is_empty());
    assert_eq!(remote_names(&remote), vec!["Bo"]);
}

#[test]
fn validation_rejects_before_any_write() {
    let (client, remote) = client(true);

    for (name, email, password) in [("", "a@x.com", "pw"), ("Ana", "  ", "pw"), ("Ana", "a@x.com", "")] {
        let err = client.add_record(name, email, password).unwrap_err();
        assert!(err.is_validation());
    }
    assert!(client.list_records().unwrap().is_empty());
    assert!(client.pending().is_empty());
    assert!(remote.calls().is_empty());
}

#[test]
fn delete_of_missing_record_is_not_found_and_queues_nothing() {
    let (client, remote) = client(false);

    let err = client.delete_record(&RecordId::new("nope")).unwrap_err();
    assert!(err.is_not_found());
    assert!(client.pending().is_empty());
    assert!(remote.calls().is_empty());
}

#[test]
fn draining_empty_log_never_calls_remote() {
    let (client, remote) = client(true);

    let report = client.sync_now().unwrap();
    assert_eq!(report.attempted, 0);
    assert!(report.is_clean());
    assert!(remote.calls().is_empty());
}

#[test]
fn remote_failure_queues_then_recovers() {
    let (client, remote) = client(true);
    remote.set_down(true);

    let outcome = client.add_record("Cy", "cy@x.com", "pw").unwrap();
    assert_eq!(outcome.notice, Notice::SavedLocally);
    assert_eq!(client.pending().len(), 1);
    let queued = client.pending()[0].id;

    remote.heal();
    client.monitor().set_online(true);
    let report = client.sync_now().unwrap();
    assert_eq!(report.applied, 1);
    assert!(!client.pending().iter().any(|m| m.id == queued));
    assert_eq!(remote_names(&remote), vec!["Cy"]);
}

#[test]
fn failing_mutation_does_not_block_independent_ones() {
    let (client, remote) = client(false);
    client.add_record("Dee", "dee@x.com", "pw").unwrap();
    client.add_record("Eve", "eve@x.com", "pw").unwrap();
    remote.fail_for(RecordId::new("Dee"));

    client.monitor().set_online(true);
    let report = client.sync_now().unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.applied, 1);

    let pending = client.pending();
    assert_eq!(pending.len(), 1);
    assert!(matches!(&pending[0].payload, outbox_core::Payload::Create(r) if r.name == "Dee"));
    assert_eq!(remote_names(&remote), vec!["Eve"]);
}

#[test]
fn same_record_replays_in_order_with_adopted_id() {
    let (client, remote) = client(false);
    let ana = client.add_record("Ana", "ana@x.com", "pw").unwrap().value;
    client.edit_record(&ana.id, "Ana Maria").unwrap();
    client.edit_record(&ana.id, "Ana M.").unwrap();

    client.monitor().set_online(true);
    let report = client.sync_now().unwrap();
    assert_eq!(report.applied, 3);

    let calls = remote.calls();
    assert_eq!(
        calls,
        vec![
            (Method::Create, "Ana".to_string()),
            (Method::Update, "1".to_string()),
            (Method::Update, "1".to_string()),
        ]
    );
    assert_eq!(remote_names(&remote), vec!["Ana M."]);
}

#[test]
fn failed_create_defers_its_update() {
    let (client, remote) = client(false);
    let ana = client.add_record("Ana", "ana@x.com", "pw").unwrap().value;
    client.edit_record(&ana.id, "Ana Maria").unwrap();
    remote.fail_for(RecordId::new("Ana"));

    let report = client.sync_now().unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.deferred, 1);
    assert_eq!(client.pending().len(), 2);
    // The update was never sent ahead of its create.
    assert!(remote.calls().iter().all(|(m, _)| *m == Method::Create));
}

#[test]
fn edit_behind_queued_mutations_waits_its_turn() {
    let (client, remote) = client(false);
    let ana = client.add_record("Ana", "ana@x.com", "pw").unwrap().value;

    // Back online, but no transition has drained the queue yet.
    client.monitor().set_online(true);
    let outcome = client.edit_record(&ana.id, "Ana Maria").unwrap();
    assert_eq!(outcome.notice, Notice::Synced);

    let methods: Vec<Method> = remote.calls().into_iter().map(|(m, _)| m).collect();
    assert_eq!(methods, vec![Method::Create, Method::Update]);
    assert!(client.pending().is_empty());
}

#[test]
fn delete_of_record_gone_on_remote_is_discarded() {
    let (client, remote) = client(true);
    let ana = client.add_record("Ana", "ana@x.com", "pw").unwrap().value;
    remote.inner.delete_user("1").unwrap();

    client.monitor().set_online(false);
    client.delete_record(&ana.id).unwrap();
    assert_eq!(client.pending().len(), 1);

    client.monitor().set_online(true);
    let report = client.sync_now().unwrap();
    assert_eq!(report.discarded, 1);
    assert!(client.pending().is_empty());
}

#[test]
fn immediate_update_of_record_gone_on_remote_is_reported() {
    let (client, remote) = client(true);
    let ana = client.add_record("Ana", "ana@x.com", "pw").unwrap().value;
    remote.inner.delete_user("1").unwrap();

    let outcome = client.edit_record(&ana.id, "Ana Maria").unwrap();
    assert_eq!(outcome.notice, Notice::Discarded);
    assert!(client.pending().is_empty());
    assert_eq!(client.get_record(&ana.id).unwrap().name, "Ana Maria");
}

#[test]
fn uncoalesced_update_after_delete_is_still_replayed() {
    let (client, remote) = client(false);
    let ana = client.add_record("Ana", "ana@x.com", "pw").unwrap().value;
    client.delete_record(&ana.id).unwrap();

    let engine = client.engine();
    engine
        .apply_or_queue(Mutation::update(ana.id.clone(), RecordPatch::name("ghost")))
        .unwrap();
    assert_eq!(engine.pending_len(), 3);

    let report = client.sync_now().unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.applied, 2);
    assert_eq!(report.discarded, 1);
    assert!(remote_names(&remote).is_empty());
}

#[test]
fn offline_queue_survives_restart() {
    let temp = tempdir().unwrap();
    let remote = Flaky::new();
    {
        let client = Client::open(
            temp.path(),
            &StoreConfig::default(),
            Arc::clone(&remote),
            Arc::new(ConnectivityMonitor::new(false)),
        )
        .unwrap();
        client.add_record("Ana", "ana@x.com", "pw").unwrap();
    }

    let client = Client::open(
        temp.path(),
        &StoreConfig::default(),
        Arc::clone(&remote),
        Arc::new(ConnectivityMonitor::new(false)),
    )
    .unwrap();
    assert_eq!(client.list_records().unwrap().len(), 1);
    assert_eq!(client.pending().len(), 1);

    let report = client.poll_connectivity(&StaticProbe(true)).unwrap().unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(remote_names(&remote), vec!["Ana"]);
}

#[test]
fn corrupt_pending_log_degrades_instead_of_failing() {
    let temp = tempdir().unwrap();
    let remote = Flaky::new();
    let monitor = || Arc::new(ConnectivityMonitor::new(false));
    {
        let client =
            Client::open(temp.path(), &StoreConfig::default(), Arc::clone(&remote), monitor())
                .unwrap();
        client.add_record("Ana", "ana@x.com", "pw").unwrap();
    }
    let pending = temp.path().join("pending.log");
    let mut bytes = std::fs::read(&pending).unwrap();
    bytes.extend_from_slice(b"scribbled over by something else");
    std::fs::write(&pending, bytes).unwrap();

    let client =
        Client::open(temp.path(), &StoreConfig::default(), Arc::clone(&remote), monitor())
            .unwrap();
    assert_eq!(client.warnings().len(), 1);
    assert!(client.warnings()[0].to_string().contains("pending.log"));
    assert_eq!(client.pending().len(), 1);
    assert!(temp.path().join("pending.log.corrupt").exists());
}

#[test]
fn refresh_imports_authority_records() {
    let (client, remote) = client(true);
    remote.inner.create(&NewRecord::new("Zed", "zed@x.com", "pw")).unwrap();

    assert_eq!(client.refresh().unwrap(), Some(1));
    let records = client.list_records().unwrap();
    assert_eq!(records[0].id, RecordId::new("1"));

    // Imported ids are already the authority's.
    let outcome = client.edit_record(&RecordId::new("1"), "Zoe").unwrap();
    assert_eq!(outcome.notice, Notice::Synced);
    assert_eq!(remote_names(&remote), vec!["Zoe"]);
}

#[test]
fn refresh_waits_for_pending_mutations() {
    let (client, _remote) = client(false);
    client.add_record("Ana", "ana@x.com", "pw").unwrap();
    assert!(client.refresh().is_err());

    client.monitor().set_online(true);
    client.engine().remote().set_down(true);
    assert_eq!(client.refresh().unwrap(), None);
}

#[test]
fn worker_drains_on_went_online() {
    let (client, remote) = client(false);
    client.add_record("Ana", "ana@x.com", "pw").unwrap();

    let worker = SyncWorker::spawn(Arc::clone(client.engine()));
    assert_eq!(client.monitor().set_online(true), Some(Transition::WentOnline));

    let mut drained = false;
    for _ in 0..100 {
        if client.pending().is_empty() {
            drained = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    worker.stop();
    assert!(drained);
    assert_eq!(remote_names(&remote), vec!["Ana"]);
}

#[test]
fn http_remote_against_served_authority() {
    let server = RunningAuthority::start(
        Arc::new(Authority::in_memory()),
        SocketAddr::from(([127, 0, 0, 1], 0)),
    )
    .unwrap();
    let config = SyncConfig::new(server.url()).with_remote_timeout(Duration::from_secs(5));
    let remote = HttpRemote::new(&config).unwrap();
    assert!(outbox_sync_engine::ConnectivityProbe::probe(&remote));

    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let client = Client::in_memory(remote, Arc::clone(&monitor)).unwrap();
    let ana = client.add_record("Ana", "ana@x.com", "pw1").unwrap().value;
    client.edit_record(&ana.id, "Ana Maria").unwrap();

    let report = client
        .poll_connectivity(client.engine().remote())
        .unwrap()
        .unwrap();
    assert_eq!(report.applied, 2);

    let listed = client.engine().remote().list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Ana Maria");
    assert_eq!(listed[0].id, RecordId::new("1"));

    let gone = client
        .engine()
        .apply_or_queue(Mutation::delete(RecordId::new("99")))
        .unwrap();
    assert!(matches!(gone, Delivery::Discarded { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn add_record_lists_exactly_one_match(
        name in "[A-Za-z][A-Za-z ]{0,15}",
        email in "[a-z]{1,8}@[a-z]{1,8}\\.com",
        password in "[!-~]{1,16}",
        online in any::<bool>(),
    ) {
        let (client, _remote) = client(online);
        let existing = client.add_record("Other", "other@x.com", "pw").unwrap().value;

        let added = client.add_record(&name, &email, &password).unwrap().value;
        prop_assert_ne!(&added.id, &existing.id);

        let matches: Vec<Record> = client
            .list_records()
            .unwrap()
            .into_iter()
            .filter(|r| r.name == name && r.email == email && r.password == password)
            .collect();
        prop_assert_eq!(matches.len(), 1);
        prop_assert_eq!(&matches[0].id, &added.id);
    }
}
