mod common;

use common::{harness, USER};
use garden_core::sync::{CallOutcome, Entity, Fields, PageRequest, SyncError};
use garden_core::{EntryType, JournalEntry, LocalStore, Plant, TaskTemplate, TaskType};
use serde_json::{json, Value};

fn seed_plants(h: &common::Harness) {
    h.remote.seed(
        "plants",
        USER,
        json!({"id": "p1", "name": "Basil", "deleted": false, "createdAt": "2025-04-01T09:00:00Z"}),
    );
    h.remote.seed(
        "plants",
        USER,
        json!({"id": "p2", "name": "Dead fern", "deleted": true, "createdAt": "2025-04-02T09:00:00Z"}),
    );
    h.remote.seed(
        "plants",
        USER,
        json!({"id": "p3", "name": "Tomato", "photoUri": "file:///old/Documents/plants/tomato.jpg"}),
    );
    h.remote
        .seed("plants", "someone-else", json!({"id": "p9", "name": "Not mine"}));
}

#[tokio::test]
async fn test_list_replaces_cache_with_filtered_records() {
    let h = harness();
    seed_plants(&h);

    let plants = h.repos.plants.list().await.unwrap();

    let ids: Vec<&str> = plants.iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec!["p1", "p3"]);

    let expected: Vec<_> = plants.iter().map(|p| p.to_cached().unwrap()).collect();
    assert_eq!(h.cached("plants").await, expected);
}

#[tokio::test]
async fn test_legacy_uri_is_upgraded_in_memory_only() {
    let h = harness();
    seed_plants(&h);

    let plants = h.repos.plants.list().await.unwrap();
    let tomato = plants.iter().find(|p| p.id == "p3").unwrap();
    assert_eq!(tomato.photo_filenames, vec!["tomato.jpg"]);

    // The remote copy keeps its legacy shape.
    let remote = h.remote.document("plants", "p3").unwrap();
    assert!(remote.fields.contains_key("photoUri"));
    assert!(!remote.fields.contains_key("photoFilenames"));
}

#[tokio::test]
async fn test_offline_read_serves_last_snapshot() {
    let h = harness();
    seed_plants(&h);
    let online = h.repos.plants.list().await.unwrap();

    h.remote.set_offline(true);
    let offline = h.repos.plants.list().await.unwrap();

    assert_eq!(offline, online);
    assert_eq!(h.sink.categories(), vec!["sync.read"]);
}

#[tokio::test]
async fn test_offline_read_filters_mixed_cache() {
    let h = harness();
    h.store
        .set(
            "plants",
            json!([
                {"id": "p1", "name": "Basil", "deleted": false},
                {"id": "p2", "name": "Trashed", "deleted": true},
                {"id": "p3", "name": "Legacy", "photoUris": ["file:///old/plants/legacy.jpg"]}
            ])
            .to_string(),
        )
        .await
        .unwrap();
    h.remote.set_offline(true);

    let plants = h.repos.plants.list().await.unwrap();

    let names: Vec<&str> = plants.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Basil", "Legacy"]);
    assert_eq!(plants[1].photo_filenames, vec!["legacy.jpg"]);
}

#[tokio::test]
async fn test_corrupt_cache_reads_empty_when_offline() {
    let h = harness();
    h.store
        .set("plants", "{\"not\": \"an array\"}".to_string())
        .await
        .unwrap();
    h.remote.set_offline(true);

    let plants = h.repos.plants.list().await.unwrap();

    assert!(plants.is_empty());
    assert!(h.cached_raw("plants").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_remote_times_out_then_falls_back() {
    let h = harness();
    seed_plants(&h);
    h.repos.plants.list().await.unwrap();
    let calls_before = h.remote.calls();

    h.remote.set_hang(true);
    let plants = h.repos.plants.list().await.unwrap();

    assert_eq!(plants.len(), 2);
    assert_eq!(h.remote.calls() - calls_before, 3);
}

#[tokio::test]
async fn test_not_authenticated_short_circuits() {
    let h = harness();
    seed_plants(&h);
    h.session.sign_out();

    let err = h.repos.plants.list().await.unwrap_err();
    assert!(matches!(err, SyncError::NotAuthenticated));
    let err = h.repos.plants.create(Plant::new("Mint")).await.unwrap_err();
    assert!(matches!(err, SyncError::NotAuthenticated));
    let err = h.repos.journal.hard_delete("j1").await.unwrap_err();
    assert!(matches!(err, SyncError::NotAuthenticated));

    assert_eq!(h.remote.calls(), 0);
    assert!(h.cached_raw("plants").await.is_none());
}

#[tokio::test]
async fn test_create_requires_remote() {
    let h = harness();
    h.remote.set_offline(true);

    let err = h.repos.plants.create(Plant::new("Mint")).await.unwrap_err();

    assert!(matches!(err, SyncError::RemoteOperationFailed(_)));
    assert_eq!(h.remote.calls(), 3);
    assert!(h.cached("plants").await.is_empty());
}

#[tokio::test]
async fn test_create_appends_to_cache() {
    let h = harness();
    seed_plants(&h);
    h.repos.plants.list().await.unwrap();

    let created = h
        .repos
        .plants
        .create(Plant::new("Mint").with_location("Pot 2"))
        .await
        .unwrap();

    assert!(!created.id.is_empty());
    let ids: Vec<String> = h.cached("plants").await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["p1".to_string(), "p3".to_string(), created.id.clone()]);

    let remote = h.remote.document("plants", &created.id).unwrap();
    assert_eq!(remote.fields.get("location"), Some(&json!("Pot 2")));
}

#[tokio::test]
async fn test_update_uses_refetched_state() {
    let h = harness();
    let created = h
        .repos
        .tasks
        .create(TaskTemplate::new(TaskType::Watering, "Water basil").with_frequency_days(2))
        .await
        .unwrap();

    let mut edited = created.clone();
    edited.frequency_days = Some(3);
    let updated = h.repos.tasks.update(&edited).await.unwrap();

    assert_eq!(updated.frequency_days, Some(3));
    let cached = h.cached("tasks").await;
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].fields.get("frequencyDays"), Some(&json!(3)));
}

#[tokio::test]
async fn test_update_of_vanished_record_is_not_found() {
    let h = harness();
    let created = h
        .repos
        .tasks
        .create(TaskTemplate::new(TaskType::Pruning, "Prune roses"))
        .await
        .unwrap();
    h.remote.forget("tasks", &created.id);
    let calls_before = h.remote.calls();

    let err = h.repos.tasks.update(&created).await.unwrap_err();

    // One write attempt, no retries and no re-fetch.
    assert_eq!(h.remote.calls() - calls_before, 1);

    match err {
        SyncError::NotFound { collection, id } => {
            assert_eq!(collection, "tasks");
            assert_eq!(id, created.id);
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_falls_back_to_cache() {
    let h = harness();
    seed_plants(&h);
    h.repos.plants.list().await.unwrap();

    h.remote.set_offline(true);
    let basil = h.repos.plants.get("p1").await.unwrap().unwrap();
    assert_eq!(basil.name, "Basil");
    assert!(h.repos.plants.get("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_page_does_not_touch_cache() {
    let h = harness();
    seed_plants(&h);

    let page = h.repos.plants.list_page(PageRequest::new(0, 2)).await.unwrap();

    // p2 is on the first page but soft-deleted.
    assert_eq!(page.len(), 1);
    assert!(h.cached_raw("plants").await.is_none());
}

#[tokio::test]
async fn test_list_fetches_every_page() {
    let h = harness();
    for i in 0..150 {
        h.remote
            .seed("taskLogs", USER, json!({"id": format!("l{}", i), "templateId": "t1"}));
    }

    let logs = h.repos.task_logs.list().await.unwrap();

    assert_eq!(logs.len(), 150);
    assert_eq!(h.remote.calls(), 2);
}

#[tokio::test]
async fn test_list_stops_when_remote_repeats_a_page() {
    let h = harness();
    for i in 0..100 {
        h.remote
            .seed("taskLogs", USER, json!({"id": format!("l{}", i), "templateId": "t1"}));
    }
    h.remote.set_ignore_offset(true);

    let logs = h.repos.task_logs.list().await.unwrap();

    assert_eq!(logs.len(), 100);
    assert_eq!(h.remote.calls(), 2);
    assert_eq!(h.cached("task_logs").await.len(), 100);
}

#[tokio::test]
async fn test_malformed_remote_record_is_skipped() {
    let h = harness();
    seed_plants(&h);
    h.remote
        .seed("plants", USER, json!({"id": "p4", "name": 42}));

    let plants = h.repos.plants.list().await.unwrap();

    assert_eq!(plants.len(), 2);
    assert!(h.sink.categories().contains(&"sync.transform".to_string()));
}

#[tokio::test]
async fn test_patch_metadata_soft_fails_offline() {
    let h = harness();
    seed_plants(&h);
    h.repos.plants.list().await.unwrap();
    let before = h.cached_raw("plants").await;

    h.remote.set_offline(true);
    let mut fields = Fields::new();
    fields.insert("notes".to_string(), json!("Pinched back"));
    let outcome = h.repos.plants.patch_metadata("p1", fields).await.unwrap();

    assert!(matches!(outcome, CallOutcome::SoftFailed(_)));
    assert_eq!(h.cached_raw("plants").await, before);
}

#[tokio::test]
async fn test_patch_metadata_updates_cache() {
    let h = harness();
    seed_plants(&h);
    h.repos.plants.list().await.unwrap();

    let mut fields = Fields::new();
    fields.insert("notes".to_string(), json!("Pinched back"));
    let outcome = h.repos.plants.patch_metadata("p1", fields).await.unwrap();

    assert!(outcome.is_completed());
    let cached = h.cached("plants").await;
    assert_eq!(cached[0].fields.get("notes"), Some(&json!("Pinched back")));
}

#[tokio::test]
async fn test_media_uris_resolved_on_read() {
    let h = harness();
    let photo = h.media.store(b"jpeg", "journal", "jpg").await.unwrap();
    h.remote.seed(
        "journal",
        USER,
        json!({
            "id": "j1",
            "type": "observation",
            "title": "Buds",
            "photoFilenames": [photo.filename, "missing.jpg"]
        }),
    );

    let entries = h.repos.journal.list().await.unwrap();

    let photos = &entries[0].photos;
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0].filename, photo.filename);
    assert!(photos[0]
        .resolved_uri
        .as_deref()
        .is_some_and(|uri| uri.starts_with("file://")));
    assert_eq!(photos[1].filename, "missing.jpg");
    assert!(photos[1].resolved_uri.is_none());

    let cached = h.cached("journal").await;
    assert!(!cached[0].fields.contains_key("photoUris"));
}

#[tokio::test]
async fn test_hard_delete_removes_media_and_cache_entry() {
    let h = harness();
    let photo = h.media.store(b"jpeg", "journal", "jpg").await.unwrap();
    let entry = h
        .repos
        .journal
        .create(JournalEntry::new(EntryType::Harvest, "Tomatoes").with_photo(&photo.filename))
        .await
        .unwrap();
    assert!(entry.photos[0].resolved_uri.is_some());

    h.repos.journal.hard_delete(&entry.id).await.unwrap();

    assert!(h.media.resolve(&photo.filename, "journal").is_none());
    assert!(h.cached("journal").await.is_empty());
    assert!(h.remote.document("journal", &entry.id).is_none());
}

#[tokio::test]
async fn test_task_type_survives_remote_round_trip() {
    let h = harness();
    h.repos
        .tasks
        .create(TaskTemplate::new(TaskType::PestControl, "Check for aphids"))
        .await
        .unwrap();

    let tasks = h.repos.tasks.list().await.unwrap();
    assert_eq!(tasks[0].task_type, TaskType::PestControl);

    let cached = h.cached("tasks").await;
    assert_eq!(cached[0].fields.get("type"), Some(&Value::from("pest_control")));
}
