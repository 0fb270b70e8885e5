//! Version history: stored snapshots, changelogs and diffs.

pub mod changelog;
pub mod diff;
pub mod versions;

pub use changelog::{diff_and_record, get_changelog, record_changes};
pub use diff::diff_versions;
pub use versions::{
    append_version, count_versions, get_version, get_version_for_event, list_versions,
    next_version_number,
};
