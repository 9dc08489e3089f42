pub mod booking;
pub mod driver;
pub mod lenient;
pub mod presence;
pub mod report;
pub mod user;
