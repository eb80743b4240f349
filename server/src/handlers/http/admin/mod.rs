//! Admin API.  Every route here sits behind the protected-admin-api class,
//! so handlers only run for a verified admin session.

pub mod invite;
pub mod overview;
pub mod payouts;
pub mod stats;

pub use invite::handle_invite;
pub use overview::{handle_list_enrollments, handle_list_partners, handle_list_transactions};
pub use payouts::{handle_pending_payouts, handle_record_payout};
pub use stats::handle_stats;
