mod backup;
mod rollback;
mod service;
mod status;
mod watch;

pub use backup::{run_backup, run_list_backups, run_restore, run_verify};
pub use rollback::{run_rollback_history, run_rollback_to};
pub use service::{run_service_history, run_service_recover, run_service_status};
pub use status::run_status;
pub use watch::run_watch;
