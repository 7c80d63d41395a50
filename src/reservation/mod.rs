//! The seat-reservation core: the seat ledger guarding per-trip
//! capacity, the booking state machine, and the expiry sweeper that
//! releases stale pending reservations.
//!
//! All capacity mutation goes through [`ledger::reserve`] and
//! [`ledger::release`] inside a transaction holding the trip row lock,
//! so concurrent reservations against the same trip serialize on the
//! database rather than on anything in-process.

pub mod ledger;
pub mod machine;
pub mod sweeper;
