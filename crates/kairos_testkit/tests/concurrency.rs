//! Competing transactions, retry, and commit failures.

use kairos_core::{events, history, Config, CoreError, Database, EventUpdate, Role};
use kairos_testkit::prelude::*;
use kairos_testkit::scenarios::{standup, team};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn second_writer_of_a_version_number_loses() {
    with_temp_db(|db| {
        let team = team(db);
        let event = standup(db, team.owner.id);

        let mut first = db.begin();
        let mut second = db.begin();
        events::update_event(
            &mut first,
            event.id,
            team.owner.id,
            &EventUpdate::new().title("First"),
        )
        .unwrap();
        events::update_event(
            &mut second,
            event.id,
            team.owner.id,
            &EventUpdate::new().title("Second"),
        )
        .unwrap();

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(
            err,
            CoreError::VersionConflict {
                version_number: 1,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert!(!second.is_active());

        assert_eq!(db.get_event(event.id).unwrap().title, "First");
        assert_eq!(db.list_versions(event.id).unwrap().len(), 1);
        assert_eq!(db.get_changelog(event.id).unwrap().len(), 1);
    });
}

#[test]
fn retry_lands_on_the_next_version_number() {
    with_temp_db(|db| {
        let team = team(db);
        let owner = team.owner.id;
        let event = standup(db, owner);

        let mut attempts = 0;
        let updated = db
            .transaction_with_retry(|txn| {
                attempts += 1;
                let updated = events::update_event(
                    txn,
                    event.id,
                    owner,
                    &EventUpdate::new().title("Mine"),
                )?;
                if attempts == 1 {
                    db.update_event(event.id, owner, &EventUpdate::new().title("Theirs"))?;
                }
                Ok(updated)
            })
            .unwrap();

        assert_eq!(attempts, 2);
        assert_eq!(updated.title, "Mine");
        let versions = db.list_versions(event.id).unwrap();
        let numbers: Vec<u32> = versions.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(versions[1].data.get("title"), Some(&"Theirs".into()));
    });
}

#[test]
fn zero_retries_surfaces_the_conflict() {
    let db = Database::open_with_backend(
        Config::new().conflict_retries(0),
        Box::new(kairos_storage::InMemoryBackend::new()),
    )
    .unwrap();
    let team = team(&db);
    let owner = team.owner.id;
    let event = standup(&db, owner);

    let mut attempts = 0;
    let err = db
        .transaction_with_retry(|txn| {
            attempts += 1;
            let updated = events::update_event(txn, event.id, owner, &EventUpdate::new())?;
            db.update_event(event.id, owner, &EventUpdate::new())?;
            Ok(updated)
        })
        .unwrap_err();
    assert_eq!(attempts, 1);
    assert!(err.is_retryable());
}

#[test]
fn updates_to_different_events_do_not_conflict() {
    with_temp_db(|db| {
        let team = team(db);
        let owner = team.owner.id;
        let a = standup(db, owner);
        let b = standup(db, owner);

        let mut first = db.begin();
        let mut second = db.begin();
        events::update_event(&mut first, a.id, owner, &EventUpdate::new().title("A")).unwrap();
        events::update_event(&mut second, b.id, owner, &EventUpdate::new().title("B")).unwrap();
        first.commit().unwrap();
        second.commit().unwrap();

        assert_eq!(history::count_versions(&db.begin(), a.id), 1);
        assert_eq!(history::count_versions(&db.begin(), b.id), 1);
    });
}

#[test]
fn concurrent_grants_of_the_same_pair() {
    with_temp_db(|db| {
        let team = team(db);
        let event = standup(db, team.owner.id);
        let mut first = db.begin();
        let mut second = db.begin();
        kairos_core::access::grant(&mut first, event.id, team.viewer.id, Role::Viewer).unwrap();
        kairos_core::access::grant(&mut second, event.id, team.viewer.id, Role::Editor).unwrap();
        first.commit().unwrap();
        assert!(matches!(
            second.commit().unwrap_err(),
            CoreError::PermissionExists { .. }
        ));
        assert_eq!(db.list_permissions(event.id).unwrap()[0].role_name, "viewer");
    });
}

#[test]
fn update_cannot_resurrect_a_concurrently_deleted_event() {
    with_temp_db(|db| {
        let team = team(db);
        let owner = team.owner.id;
        let event = standup(db, owner);

        let mut edit = db.begin();
        events::update_event(&mut edit, event.id, owner, &EventUpdate::new().title("Edited"))
            .unwrap();
        db.delete_event(event.id, owner).unwrap();

        let err = edit.commit().unwrap_err();
        assert!(matches!(err, CoreError::Stale { table: "events", .. }), "{err}");
        assert!(err.is_retryable());
        assert!(db.get_event(event.id).unwrap_err().is_not_found());
        let stats = db.stats().unwrap();
        assert_eq!(stats.events, 0);
        assert_eq!(stats.versions, 0);
        assert_eq!(stats.changelogs, 0);
    });
}

#[test]
fn retried_update_of_a_deleted_event_reports_not_found() {
    with_temp_db(|db| {
        let team = team(db);
        let owner = team.owner.id;
        let event = standup(db, owner);

        let mut attempts = 0;
        let err = db
            .transaction_with_retry(|txn| {
                attempts += 1;
                let updated =
                    events::update_event(txn, event.id, owner, &EventUpdate::new().title("Late"))?;
                if attempts == 1 {
                    db.delete_event(event.id, owner)?;
                }
                Ok(updated)
            })
            .unwrap_err();
        assert_eq!(attempts, 2);
        assert!(err.is_not_found(), "{err}");
        assert_eq!(db.stats().unwrap().versions, 0);
    });
}

#[test]
fn grant_on_a_concurrently_deleted_event_is_rejected() {
    with_temp_db(|db| {
        let team = team(db);
        let event = standup(db, team.owner.id);

        let mut share = db.begin();
        kairos_core::access::grant(&mut share, event.id, team.viewer.id, Role::Viewer).unwrap();
        db.delete_event(event.id, team.owner.id).unwrap();

        assert!(share.commit().unwrap_err().is_retryable());
        assert_eq!(db.stats().unwrap().permissions, 0);
        assert!(!db.has_access(event.id, team.viewer.id));
    });
}

#[test]
fn delete_reruns_to_cover_history_written_meanwhile() {
    with_temp_db(|db| {
        let team = team(db);
        let owner = team.owner.id;
        let event = standup(db, owner);

        let mut attempts = 0;
        db.transaction_with_retry(|txn| {
            attempts += 1;
            events::delete_event(txn, event.id, owner)?;
            if attempts == 1 {
                db.update_event(event.id, owner, &EventUpdate::new().title("Meanwhile"))?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(attempts, 2);
        let stats = db.stats().unwrap();
        assert_eq!(stats.events, 0);
        assert_eq!(stats.versions, 0);
        assert_eq!(stats.changelogs, 0);
    });
}

#[test]
fn deleting_a_user_reruns_after_a_grant_to_them() {
    with_temp_db(|db| {
        let team = team(db);
        let event = standup(db, team.owner.id);

        let mut attempts = 0;
        db.transaction_with_retry(|txn| {
            attempts += 1;
            kairos_core::access::delete_user(txn, team.viewer.id)?;
            if attempts == 1 {
                db.grant_permission(event.id, team.viewer.id, Role::Viewer)?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(attempts, 2);
        assert!(db.list_permissions(event.id).unwrap().is_empty());
        assert_eq!(db.stats().unwrap().users, 2);
    });
}

#[test]
fn threads_updating_one_event_get_consecutive_versions() {
    const WRITERS: usize = 4;
    let test_db = Arc::new(TestDatabase::memory());
    let team = team(&test_db);
    let event = standup(&test_db, team.owner.id);
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let test_db = Arc::clone(&test_db);
            let barrier = Arc::clone(&barrier);
            let owner = team.owner.id;
            thread::spawn(move || {
                barrier.wait();
                let update = EventUpdate::new().title(format!("Writer {i}"));
                // Losers may need more than the default single retry.
                loop {
                    match test_db.update_event(event.id, owner, &update) {
                        Err(err) if err.is_retryable() => continue,
                        other => break other,
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let numbers: Vec<u32> = test_db
        .list_versions(event.id)
        .unwrap()
        .iter()
        .map(|v| v.version_number)
        .collect();
    assert_eq!(numbers, (1..=WRITERS as u32).collect::<Vec<_>>());
}

#[test]
fn failed_journal_append_leaves_state_untouched() {
    let journal = SharedJournal::new();
    let db = journal.open().unwrap();
    let team = team(&db);
    let event = standup(&db, team.owner.id);
    let before = db.stats().unwrap();

    journal.reject_appends(true);
    let err = db
        .update_event(event.id, team.owner.id, &EventUpdate::new().title("Nope"))
        .unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    assert_eq!(db.stats().unwrap(), before);
    assert_eq!(db.get_event(event.id).unwrap().title, "Standup");

    journal.reject_appends(false);
    db.update_event(event.id, team.owner.id, &EventUpdate::new().title("Yes"))
        .unwrap();
    assert_eq!(db.list_versions(event.id).unwrap()[0].version_number, 1);
}
