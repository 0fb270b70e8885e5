//! Sharing commands.

use super::{CliResult, Context};
use clap::Subcommand;
use kairos_core::{CoreError, EventId, Resource, Role, UserId};

/// `kairos share ...`
#[derive(Subcommand)]
pub enum ShareCommand {
    /// Give a user a role on an event
    Grant {
        /// Event id
        event: u64,
        /// User id to share with
        member: u64,
        /// Role name or id (owner, editor, viewer)
        #[arg(default_value = "viewer")]
        role: String,
    },

    /// Change an existing grant's role
    Update {
        /// Event id
        event: u64,
        /// User id
        member: u64,
        /// Role name or id
        role: String,
    },

    /// Remove a user's grant
    Revoke {
        /// Event id
        event: u64,
        /// User id
        member: u64,
    },

    /// List who an event is shared with
    List {
        /// Event id
        event: u64,
    },
}

/// Runs a sharing command. Only the event's owner may change grants.
pub fn run(ctx: &Context, command: ShareCommand) -> CliResult<()> {
    let acting = ctx.acting_user()?;
    let owned = |event_id: EventId| -> CliResult<()> {
        let event = ctx.db.get_event(event_id)?;
        if event.owner_id != acting {
            return Err(CoreError::not_found(Resource::Event, event_id).into());
        }
        Ok(())
    };

    match command {
        ShareCommand::Grant { event, member, role } => {
            let event_id = EventId::new(event);
            owned(event_id)?;
            let role: Role = role.parse()?;
            let grant = ctx.db.grant_permission(event_id, UserId::new(member), role)?;
            ctx.emit(&grant, |grant| {
                println!("{}  {} is {} on {}", grant.id, grant.user_id, grant.role, grant.event_id);
            })
        }
        ShareCommand::Update { event, member, role } => {
            let event_id = EventId::new(event);
            owned(event_id)?;
            let role: Role = role.parse()?;
            let grant = ctx.db.update_permission(event_id, UserId::new(member), role)?;
            ctx.emit(&grant, |grant| {
                println!("{}  {} is {} on {}", grant.id, grant.user_id, grant.role, grant.event_id);
            })
        }
        ShareCommand::Revoke { event, member } => {
            let event_id = EventId::new(event);
            owned(event_id)?;
            ctx.db.revoke_permission(event_id, UserId::new(member))?;
            tracing::info!(event, member, "revoked grant");
            Ok(())
        }
        ShareCommand::List { event } => {
            let event_id = EventId::new(event);
            ctx.db.get_event_with_permission(event_id, acting)?;
            let grants = ctx.db.list_permissions(event_id)?;
            ctx.emit(&grants, |grants| {
                for grant in grants {
                    println!(
                        "{}  {} <{}>  {} ({})",
                        grant.user_id, grant.username, grant.email, grant.role_name, grant.role_id
                    );
                }
            })
        }
    }
}
