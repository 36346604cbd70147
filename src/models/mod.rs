pub mod booking;
pub mod common;
pub mod form;
