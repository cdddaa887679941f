pub mod booking;
pub mod event;
pub mod hold;
pub mod seat;

pub use booking::{Booking, BookingStatus};
pub use event::{Event, NewEvent};
pub use hold::{HoldToken, SeatHold};
pub use seat::SeatLabel;
