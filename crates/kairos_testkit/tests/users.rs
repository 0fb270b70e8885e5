//! User directory and the effects of deleting a user.

use kairos_core::{CoreError, EventUpdate, NewUser, Role};
use kairos_testkit::prelude::*;
use kairos_testkit::scenarios::{retitle, standup, team};

#[test]
fn usernames_and_emails_are_unique() {
    with_temp_db(|db| {
        team(db);
        let err = db
            .create_user(NewUser::new("ada", "new@example.com"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Duplicate { field: "username", .. }));
        assert!(err.is_conflict());

        let err = db
            .create_user(NewUser::new("dee", "bob@example.com"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Duplicate { field: "email", .. }));
        assert_eq!(db.stats().unwrap().users, 3);
    });
}

#[test]
fn invalid_users_are_rejected() {
    with_temp_db(|db| {
        for (username, email) in [("", "x@example.com"), ("x", ""), ("x", "no-at-sign")] {
            let err = db.create_user(NewUser::new(username, email)).unwrap_err();
            assert!(matches!(err, CoreError::Validation { .. }), "{err}");
        }
        assert!(db.find_user_by_username("x").is_none());
    });
}

#[test]
fn deleting_a_collaborator_keeps_their_edits_anonymously() {
    with_temp_db(|db| {
        let team = team(db);
        let event = standup(db, team.owner.id);
        db.grant_permission(event.id, team.editor.id, Role::Editor)
            .unwrap();
        retitle(db, event.id, team.editor.id, &["Edited by bob"]);

        db.delete_user(team.editor.id).unwrap();

        assert!(db.get_user(team.editor.id).unwrap_err().is_not_found());
        assert!(db.list_permissions(event.id).unwrap().is_empty());
        let versions = db.list_versions(event.id).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].changed_by_user_id, None);
        let changelog = db.get_changelog(event.id).unwrap();
        assert_eq!(changelog.len(), 1);
        assert_eq!(changelog[0].changelog.user_id, None);
        assert!(changelog[0].user_details.is_none());
        assert_eq!(db.get_event(event.id).unwrap().title, "Edited by bob");
    });
}

#[test]
fn deleting_an_owner_removes_their_events() {
    with_temp_db(|db| {
        let team = team(db);
        let owned = standup(db, team.editor.id);
        let shared = standup(db, team.owner.id);
        db.grant_permission(owned.id, team.viewer.id, Role::Viewer)
            .unwrap();
        db.update_event(owned.id, team.editor.id, &EventUpdate::new().title("Gone"))
            .unwrap();
        db.grant_permission(shared.id, team.editor.id, Role::Editor)
            .unwrap();

        db.delete_user(team.editor.id).unwrap();

        assert!(db.get_event(owned.id).unwrap_err().is_not_found());
        assert!(db.get_event(shared.id).is_ok());
        let stats = db.stats().unwrap();
        assert_eq!(stats.users, 2);
        assert_eq!(stats.events, 1);
        assert_eq!(stats.permissions, 0);
        assert_eq!(stats.versions, 0);
        assert_eq!(stats.changelogs, 0);

        let again = db
            .create_user(NewUser::new("bob", "bob@example.com"))
            .unwrap();
        assert_ne!(again.id, team.editor.id);
    });
}

#[test]
fn events_need_an_existing_owner() {
    with_temp_db(|db| {
        let err = db
            .create_event(
                kairos_testkit::scenarios::standup_event(),
                kairos_core::UserId::new(77),
            )
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(db.stats().unwrap().events, 0);
    });
}
