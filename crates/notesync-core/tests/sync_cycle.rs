mod common;

use common::{
    fast_config, note, progress_recorder, remote_row, synced, synced_counts, tombstoned,
    RecordingStore, OWNER,
};
use notesync_core::models::{BinaryField, SyncStatus};
use notesync_core::remote::{MemoryRemoteService, RemoteCall, RemoteError};
use notesync_core::store::MemoryNoteStore;
use notesync_core::sync::{CommitMode, DroppedField, SyncEngine, SyncRequest};
use notesync_core::SyncState;
use pretty_assertions::assert_eq;

const ELEVEN_MB: usize = 11 * 1024 * 1024;

#[tokio::test]
async fn scenario_skips_synced_deletes_tombstone_and_upserts_pending() {
    let a = note("A", 3_000);
    let b = tombstoned(note("B", 2_000));
    let c = synced(note("C", 1_000));

    let remote = MemoryRemoteService::new();
    remote.put_row(remote_row(&b)).await;
    remote.put_row(remote_row(&c)).await;
    let store = MemoryNoteStore::with_notes([a.clone(), b.clone(), c.clone()]);
    let engine = SyncEngine::new(store, remote, fast_config());

    let (log, on_progress) = progress_recorder();
    let report = engine
        .run_sync_cycle(&SyncRequest::new(OWNER), on_progress)
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.synced, 2);
    assert_eq!(report.deleted, 1);
    assert!(report.is_complete());

    let remote = engine.remote();
    assert_eq!(
        remote.calls_for(a.id).await,
        vec![RemoteCall::Exists(a.id), RemoteCall::Insert(a.id)]
    );
    assert_eq!(remote.calls_for(b.id).await, vec![RemoteCall::Delete(b.id)]);
    assert!(remote.calls_for(c.id).await.is_empty());
    assert!(remote.row(OWNER, b.id).await.is_none());
    assert!(remote.row(OWNER, a.id).await.is_some());

    let log = log.lock().unwrap().clone();
    assert!(log.iter().all(|progress| progress.total_notes == 2));
    let statuses: Vec<&str> = log.iter().map(|p| p.current_status.as_str()).collect();
    assert_eq!(
        statuses,
        vec![
            "Preparing to sync 2 notes",
            "Syncing note 1 of 2",
            "Syncing note 2 of 2",
            "Sync complete: 2 of 2 notes synced",
        ]
    );
    let counts: Vec<usize> = log.iter().map(|p| p.synced_notes).collect();
    assert_eq!(counts, vec![0, 1, 2, 2]);

    let store = engine.store();
    assert_eq!(store.get(&a.id).await.unwrap().sync_status, SyncStatus::Synced);
    assert_eq!(store.get(&b.id).await.unwrap().sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn second_cycle_without_changes_syncs_nothing() {
    let engine = SyncEngine::new(
        MemoryNoteStore::with_notes([note("First", 2_000), note("Second", 1_000)]),
        MemoryRemoteService::new(),
        fast_config(),
    );
    let request = SyncRequest::new(OWNER);

    let first = engine.run_sync_cycle(&request, |_| {}).await.unwrap();
    assert_eq!(first.synced, 2);

    engine.remote().clear_calls().await;
    let second = engine.run_sync_cycle(&request, |_| {}).await.unwrap();

    assert_eq!(second.total, 0);
    assert_eq!(second.synced, 0);
    assert!(engine.remote().calls().await.is_empty());
}

#[tokio::test]
async fn edited_note_is_updated_on_next_cycle() {
    let original = note("Draft", 1_000);
    let engine = SyncEngine::new(
        MemoryNoteStore::with_notes([original.clone()]),
        MemoryRemoteService::new(),
        fast_config(),
    );
    let request = SyncRequest::new(OWNER);
    engine.run_sync_cycle(&request, |_| {}).await.unwrap();

    let mut edited = engine.store().get(&original.id).await.unwrap();
    edited.title = "Final".to_string();
    edited.touch();
    engine.store().put(edited).await;
    engine.remote().clear_calls().await;

    let report = engine.run_sync_cycle(&request, |_| {}).await.unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(
        engine.remote().calls_for(original.id).await,
        vec![
            RemoteCall::Exists(original.id),
            RemoteCall::Update(original.id)
        ]
    );
    assert_eq!(
        engine.remote().row(OWNER, original.id).await.unwrap().title,
        "Final"
    );
}

#[tokio::test(start_paused = true)]
async fn failing_record_does_not_block_the_others() {
    let notes: Vec<_> = (0..5)
        .map(|index| note(&format!("Note {index}"), 1_000 + index))
        .collect();
    let broken = notes[2].clone();

    let remote = MemoryRemoteService::new();
    remote
        .fail_always(broken.id, RemoteError::from_status(503, "service unavailable"))
        .await;
    let engine = SyncEngine::new(MemoryNoteStore::with_notes(notes.clone()), remote, fast_config());

    let report = engine
        .run_sync_cycle(&SyncRequest::new(OWNER), |_| {})
        .await
        .unwrap();

    assert_eq!(report.total, 5);
    assert_eq!(report.synced, 4);
    assert!(report.any_synced());
    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].note_id, broken.id);
    assert!(report.failures[0].error.contains("check note 'Note 2'"));
    assert!(report.failures[0].error.contains("3 attempt(s)"));

    for note in &notes {
        let stored = engine.store().get(&note.id).await.unwrap();
        let expected = if note.id == broken.id {
            SyncStatus::Pending
        } else {
            SyncStatus::Synced
        };
        assert_eq!(stored.sync_status, expected, "{}", note.title);
    }
    assert_eq!(engine.state(), SyncState::Error);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_recover_within_the_cycle() {
    let flaky = note("Flaky", 1_000);
    let remote = MemoryRemoteService::new();
    remote
        .fail_times(flaky.id, 2, RemoteError::transport_retryable("connection reset"))
        .await;
    let engine = SyncEngine::new(MemoryNoteStore::with_notes([flaky.clone()]), remote, fast_config());

    let report = engine
        .run_sync_cycle(&SyncRequest::new(OWNER), |_| {})
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(
        engine.remote().calls_for(flaky.id).await,
        vec![
            RemoteCall::Exists(flaky.id),
            RemoteCall::Exists(flaky.id),
            RemoteCall::Exists(flaky.id),
            RemoteCall::Insert(flaky.id),
        ]
    );
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let locked = note("Locked", 1_000);
    let remote = MemoryRemoteService::new();
    remote
        .fail_always(locked.id, RemoteError::from_status(401, "JWT expired"))
        .await;
    let engine = SyncEngine::new(MemoryNoteStore::with_notes([locked.clone()]), remote, fast_config());

    let report = engine
        .run_sync_cycle(&SyncRequest::new(OWNER), |_| {})
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(engine.remote().calls_for(locked.id).await.len(), 1);
}

#[tokio::test]
async fn oversized_primary_content_fails_the_record() {
    let mut huge = note("Recording", 2_000);
    huge.content = vec![0u8; ELEVEN_MB];
    let small = note("Memo", 1_000);

    let engine = SyncEngine::new(
        MemoryNoteStore::with_notes([huge.clone(), small.clone()]),
        MemoryRemoteService::new(),
        fast_config(),
    );
    let report = engine
        .run_sync_cycle(&SyncRequest::new(OWNER).with_binary_data(true), |_| {})
        .await
        .unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].note_id, huge.id);
    assert!(report.failures[0].error.contains("content payload"));
    assert!(engine.remote().calls_for(huge.id).await.is_empty());
    assert_eq!(
        engine.store().get(&huge.id).await.unwrap().sync_status,
        SyncStatus::Failed
    );
    assert_eq!(
        engine.store().get(&small.id).await.unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn oversized_optional_field_is_omitted() {
    let mut lecture = note("Lecture", 1_000);
    lecture.sections = Some(vec![1u8; ELEVEN_MB]);
    lecture.mind_map = Some(b"{\"root\":\"Lecture\"}".to_vec());

    let engine = SyncEngine::new(
        MemoryNoteStore::with_notes([lecture.clone()]),
        MemoryRemoteService::new(),
        fast_config(),
    );
    let report = engine
        .run_sync_cycle(&SyncRequest::new(OWNER).with_binary_data(true), |_| {})
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(
        report.dropped_fields,
        vec![DroppedField {
            note_id: lecture.id,
            field: BinaryField::Sections,
        }]
    );

    let row = engine.remote().row(OWNER, lecture.id).await.unwrap();
    assert!(row.content.is_some());
    assert!(row.mind_map.is_some());
    assert!(row.sections.is_none());
    assert_eq!(
        engine.store().get(&lecture.id).await.unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn tombstone_takes_precedence_over_pending_edits() {
    let mut edited = note("Edited then deleted", 1_000);
    edited.content = b"new content that should never be uploaded".to_vec();
    let deleted = tombstoned(edited);

    let remote = MemoryRemoteService::new();
    remote.put_row(remote_row(&deleted)).await;
    let engine = SyncEngine::new(MemoryNoteStore::with_notes([deleted.clone()]), remote, fast_config());

    let report = engine
        .run_sync_cycle(&SyncRequest::new(OWNER).with_binary_data(true), |_| {})
        .await
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(
        engine.remote().calls_for(deleted.id).await,
        vec![RemoteCall::Delete(deleted.id)]
    );
    assert_eq!(engine.remote().row_count().await, 0);
}

#[tokio::test]
async fn deleting_a_missing_remote_row_succeeds() {
    let never_uploaded = tombstoned(note("Scratch", 1_000));
    let engine = SyncEngine::new(
        MemoryNoteStore::with_notes([never_uploaded.clone()]),
        MemoryRemoteService::new(),
        fast_config(),
    );

    let report = engine
        .run_sync_cycle(&SyncRequest::new(OWNER), |_| {})
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(
        engine.store().get(&never_uploaded.id).await.unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test(start_paused = true)]
async fn progress_is_monotonic_and_ends_at_success_count() {
    let notes: Vec<_> = (0..20)
        .map(|index| note(&format!("Note {index}"), 1_000 + index))
        .collect();
    let remote = MemoryRemoteService::new();
    for broken in [&notes[3], &notes[11]] {
        remote
            .fail_always(broken.id, RemoteError::transport_retryable("timeout"))
            .await;
    }
    let engine = SyncEngine::new(MemoryNoteStore::with_notes(notes), remote, fast_config());

    let (log, on_progress) = progress_recorder();
    let report = engine
        .run_sync_cycle(&SyncRequest::new(OWNER), on_progress)
        .await
        .unwrap();

    let counts = synced_counts(&log);
    assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]), "{counts:?}");
    assert_eq!(counts.last().copied(), Some(report.synced));
    assert_eq!(report.synced, 18);
}

#[tokio::test]
async fn batched_commit_saves_once_at_the_end() {
    let notes = vec![note("One", 3_000), note("Two", 2_000), tombstoned(note("Three", 1_000))];
    let store = RecordingStore::with_notes(notes.clone());
    let engine = SyncEngine::new(store, MemoryRemoteService::new(), fast_config());

    let report = engine
        .run_sync_cycle(
            &SyncRequest::new(OWNER).with_commit_mode(CommitMode::Batched),
            |_| {},
        )
        .await
        .unwrap();

    assert!(report.is_complete());
    let saves = engine.store().saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(
        saves[0],
        notes.iter().map(|note| note.id).collect::<Vec<_>>()
    );
    for note in &notes {
        assert_eq!(
            engine.store().inner.get(&note.id).await.unwrap().sync_status,
            SyncStatus::Synced
        );
    }
}

#[tokio::test]
async fn immediate_commit_saves_each_record() {
    let notes = vec![note("One", 2_000), note("Two", 1_000)];
    let store = RecordingStore::with_notes(notes.clone());
    let engine = SyncEngine::new(store, MemoryRemoteService::new(), fast_config());

    engine
        .run_sync_cycle(
            &SyncRequest::new(OWNER).with_commit_mode(CommitMode::Immediate),
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(
        engine.store().saves(),
        vec![vec![notes[0].id], vec![notes[1].id]]
    );
}

#[tokio::test]
async fn purge_removes_propagated_tombstones_only() {
    let gone = tombstoned(note("Gone", 2_000));
    let kept = note("Kept", 1_000);
    let engine = SyncEngine::new(
        MemoryNoteStore::with_notes([gone.clone(), kept.clone()]),
        MemoryRemoteService::new(),
        fast_config(),
    );

    assert_eq!(engine.purge_propagated_tombstones().await.unwrap(), 0);

    engine
        .run_sync_cycle(&SyncRequest::new(OWNER), |_| {})
        .await
        .unwrap();

    assert_eq!(engine.purge_propagated_tombstones().await.unwrap(), 1);
    assert!(engine.store().get(&gone.id).await.is_none());
    assert!(engine.store().get(&kept.id).await.is_some());
}
