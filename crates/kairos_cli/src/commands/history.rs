//! History commands: versions, changelog, diff and rollback.

use super::{CliResult, Context};
use kairos_codec::{format_timestamp, ChangeSet};
use kairos_core::{EventId, VersionId};

fn print_changes(changes: &ChangeSet) {
    for (field, change) in changes {
        println!("    {field}: {} -> {}", change.old, change.new);
    }
}

fn author(user: Option<impl std::fmt::Display>) -> String {
    user.map_or_else(|| "(deleted user)".to_string(), |user| user.to_string())
}

/// Lists the stored versions of an event.
pub fn versions(ctx: &Context, event: u64) -> CliResult<()> {
    let event_id = EventId::new(event);
    ctx.db.get_event_with_permission(event_id, ctx.acting_user()?)?;
    let versions = ctx.db.list_versions(event_id)?;
    ctx.emit(&versions, |versions| {
        for version in versions {
            let title = version.data.get("title").map(ToString::to_string);
            println!(
                "#{:<3} {}  {}  by {}  title {}",
                version.version_number,
                version.id,
                format_timestamp(&version.timestamp),
                author(version.changed_by_user_id),
                title.as_deref().unwrap_or("-")
            );
        }
    })
}

/// Prints the changelog of an event, oldest first.
pub fn changelog(ctx: &Context, event: u64) -> CliResult<()> {
    let event_id = EventId::new(event);
    ctx.db.get_event_with_permission(event_id, ctx.acting_user()?)?;
    let entries = ctx.db.get_changelog(event_id)?;
    ctx.emit(&entries, |entries| {
        for entry in entries {
            let who = entry
                .user_details
                .as_ref()
                .map(|user| user.username.clone());
            let version = entry
                .changelog
                .version_id
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            println!(
                "{}  {}  by {}  ({version})",
                entry.changelog.id,
                format_timestamp(&entry.changelog.timestamp),
                author(who)
            );
            print_changes(&entry.changelog.changes);
        }
    })
}

/// Compares two versions of an event.
pub fn diff(ctx: &Context, event: u64, left: u64, right: u64) -> CliResult<()> {
    let event_id = EventId::new(event);
    ctx.db.get_event_with_permission(event_id, ctx.acting_user()?)?;
    let diff = ctx
        .db
        .get_diff(event_id, VersionId::new(left), VersionId::new(right))?;
    ctx.emit(&diff, |diff| {
        if diff.is_empty() {
            println!("{} and {} are identical", diff.left, diff.right);
        } else {
            println!("{} -> {}", diff.left, diff.right);
            print_changes(&diff.changes);
        }
    })
}

/// Restores an event to a stored version.
pub fn rollback(ctx: &Context, event: u64, version: u64) -> CliResult<()> {
    let user = ctx.acting_user()?;
    let event_id = EventId::new(event);
    ctx.db.get_event_with_permission(event_id, user)?;
    let event = ctx
        .db
        .rollback_to_version(event_id, VersionId::new(version), user)?;
    ctx.emit(&event, |event| {
        println!("{} restored from version:{version}", event.id);
        println!("  title: {}", event.title);
    })
}
