//! Partner API.  The router resolves the calling affiliate before any of
//! these run, so handlers receive the row directly.

pub mod history;
pub mod referrals;
pub mod stats;

pub use history::{handle_earnings, handle_enrollments};
pub use referrals::{handle_create_referral, handle_list_referrals};
pub use stats::handle_stats;
