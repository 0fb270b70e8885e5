//! User commands.

use super::{CliResult, Context};
use clap::Subcommand;
use kairos_core::{NewUser, User, UserId};

/// `kairos user ...`
#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user
    Add {
        /// Unique username
        username: String,
        /// Unique email address
        email: String,
    },

    /// Show a user
    Show {
        /// User id
        id: u64,
    },

    /// Delete a user, their events and their grants
    Delete {
        /// User id
        id: u64,
    },
}

/// Runs a user command.
pub fn run(ctx: &Context, command: UserCommand) -> CliResult<()> {
    match command {
        UserCommand::Add { username, email } => {
            let user = ctx.db.create_user(NewUser::new(username, email))?;
            ctx.emit(&user, print_user)
        }
        UserCommand::Show { id } => {
            let user = ctx.db.get_user(UserId::new(id))?;
            ctx.emit(&user, print_user)
        }
        UserCommand::Delete { id } => {
            ctx.db.delete_user(UserId::new(id))?;
            tracing::info!(user = id, "deleted user");
            Ok(())
        }
    }
}

fn print_user(user: &User) {
    println!("{}  {} <{}>", user.id, user.username, user.email);
    println!("  created {}", user.created_at.to_rfc3339());
}
