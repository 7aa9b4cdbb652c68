// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod attendance;
mod checkin;
mod health;
mod metrics;
mod root;
mod shared_types;
mod wallet;

// Core handlers
pub use health::health_check;
pub use metrics::{metrics_handler, track_http_requests};
pub use root::root_handler;

// Check-in handlers
pub use checkin::{current_key, list_subjects, verify_location};

// Attendance log handlers
pub use attendance::{delete_attendance, list_attendance, submit_attendance};

// Wallet handlers
pub use wallet::{connect_wallet, disconnect_wallet, wallet_status};
