//! Users and per-event access.

pub mod permissions;
pub mod users;

pub use permissions::{
    find_permission, get_permission, grant, has_access, list_for_event, revoke, update_role,
};
pub use users::{create_user, delete_user, find_user_by_username, get_user};
