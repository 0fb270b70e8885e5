//! Event commands.

use super::{or_dash, CliError, CliResult, Context};
use clap::{Args, Subcommand};
use kairos_codec::{format_timestamp, parse_timestamp, Value};
use kairos_core::{Event, EventId, EventUpdate, NewEvent};

/// `kairos event ...`
#[derive(Subcommand)]
pub enum EventCommand {
    /// Create an event owned by the acting user
    Create {
        /// Title
        #[arg(long)]
        title: String,
        /// Start, as an ISO-8601 datetime
        #[arg(long)]
        start: String,
        /// End, as an ISO-8601 datetime
        #[arg(long)]
        end: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Location
        #[arg(long)]
        location: Option<String>,
        /// Recurrence rule as JSON; marks the event recurring
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Update fields of an event, storing its current state as a version
    Update(UpdateArgs),

    /// Show an event the acting user can see
    Show {
        /// Event id
        id: u64,
    },

    /// List events the acting user owns or has been granted
    List,

    /// Delete an event and its history
    Delete {
        /// Event id
        id: u64,
    },
}

/// Fields accepted by `event update`. Omitted fields are left alone.
#[derive(Args)]
pub struct UpdateArgs {
    /// Event id
    id: u64,
    /// New title
    #[arg(long)]
    title: Option<String>,
    /// New description
    #[arg(long, conflicts_with = "clear_description")]
    description: Option<String>,
    /// Remove the description
    #[arg(long)]
    clear_description: bool,
    /// New start
    #[arg(long)]
    start: Option<String>,
    /// New end
    #[arg(long)]
    end: Option<String>,
    /// New location
    #[arg(long, conflicts_with = "clear_location")]
    location: Option<String>,
    /// Remove the location
    #[arg(long)]
    clear_location: bool,
    /// Whether the event repeats
    #[arg(long)]
    recurring: Option<bool>,
    /// New recurrence rule as JSON
    #[arg(long, conflicts_with = "clear_pattern")]
    pattern: Option<String>,
    /// Remove the recurrence rule
    #[arg(long)]
    clear_pattern: bool,
}

impl UpdateArgs {
    fn into_update(self) -> CliResult<EventUpdate> {
        let mut update = EventUpdate::new();
        if let Some(title) = self.title {
            update = update.title(title);
        }
        if self.description.is_some() || self.clear_description {
            update = update.description(self.description);
        }
        if let Some(start) = self.start {
            update = update.start_time(parse_timestamp(&start)?);
        }
        if let Some(end) = self.end {
            update = update.end_time(parse_timestamp(&end)?);
        }
        if self.location.is_some() || self.clear_location {
            update = update.location(self.location);
        }
        if let Some(recurring) = self.recurring {
            update = update.is_recurring(recurring);
        }
        if let Some(pattern) = self.pattern {
            update = update.recurrence_pattern(Some(parse_pattern(&pattern)?));
        } else if self.clear_pattern {
            update = update.recurrence_pattern(None);
        }
        if update.is_empty() {
            return Err(CliError::InvalidArgument(
                "nothing to update; pass at least one field".into(),
            ));
        }
        Ok(update)
    }
}

fn parse_pattern(text: &str) -> CliResult<Value> {
    Ok(serde_json::from_str(text)?)
}

/// Runs an event command.
pub fn run(ctx: &Context, command: EventCommand) -> CliResult<()> {
    let user = ctx.acting_user()?;
    match command {
        EventCommand::Create {
            title,
            start,
            end,
            description,
            location,
            pattern,
        } => {
            let mut new = NewEvent::new(title, parse_timestamp(&start)?, parse_timestamp(&end)?);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            if let Some(location) = location {
                new = new.with_location(location);
            }
            if let Some(pattern) = pattern {
                new = new.with_recurrence(parse_pattern(&pattern)?);
            }
            let event = ctx.db.create_event(new, user)?;
            ctx.emit(&event, print_event)
        }
        EventCommand::Update(args) => {
            let id = EventId::new(args.id);
            let update = args.into_update()?;
            ctx.db.get_event_with_permission(id, user)?;
            let event = ctx.db.update_event(id, user, &update)?;
            ctx.emit(&event, print_event)
        }
        EventCommand::Show { id } => {
            let event = ctx.db.get_event_with_permission(EventId::new(id), user)?;
            ctx.emit(&event, print_event)
        }
        EventCommand::List => {
            let events = ctx.db.list_accessible_events(user);
            ctx.emit(&events, |events| {
                for event in events {
                    println!(
                        "{}  {}  {} .. {}",
                        event.id,
                        event.title,
                        format_timestamp(&event.start_time),
                        format_timestamp(&event.end_time)
                    );
                }
            })
        }
        EventCommand::Delete { id } => {
            ctx.db.delete_event(EventId::new(id), user)?;
            tracing::info!(event = id, "deleted event");
            Ok(())
        }
    }
}

fn print_event(event: &Event) {
    println!("{}  {}", event.id, event.title);
    println!("  start:       {}", format_timestamp(&event.start_time));
    println!("  end:         {}", format_timestamp(&event.end_time));
    println!("  location:    {}", or_dash(event.location.as_deref()));
    println!("  description: {}", or_dash(event.description.as_deref()));
    println!("  owner:       {}", event.owner_id);
    if event.is_recurring {
        let pattern = event
            .recurrence_pattern
            .as_ref()
            .map_or_else(|| "-".to_string(), Value::to_string);
        println!("  recurs:      {pattern}");
    }
    println!("  updated:     {}", format_timestamp(&event.updated_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: UpdateArgs,
    }

    fn parse(argv: &[&str]) -> CliResult<EventUpdate> {
        Harness::try_parse_from(std::iter::once("update").chain(argv.iter().copied()))
            .unwrap()
            .args
            .into_update()
    }

    #[test]
    fn clear_flags_set_null() {
        let update = parse(&["7", "--clear-location", "--title", "Retro"]).unwrap();
        assert_eq!(update.location, Some(None));
        assert_eq!(update.title.as_deref(), Some("Retro"));
        assert_eq!(update.description, None);
    }

    #[test]
    fn pattern_is_json() {
        let update = parse(&["7", "--pattern", r#"{"freq":"weekly"}"#]).unwrap();
        assert_eq!(
            update.recurrence_pattern,
            Some(Some(serde_json::json!({"freq": "weekly"})))
        );
        assert!(matches!(
            parse(&["7", "--pattern", "weekly"]),
            Err(CliError::Json(_))
        ));
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(matches!(parse(&["7"]), Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        assert!(matches!(
            parse(&["7", "--start", "soon"]),
            Err(CliError::Codec(_))
        ));
    }
}
