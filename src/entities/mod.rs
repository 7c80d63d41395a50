pub mod booking;
pub mod bus;
pub mod route;
pub mod seat_assignment;
pub mod trip;
pub mod user;
