pub mod drivers;
pub mod earnings;
pub mod map;
pub mod passengers;
pub mod reconcile;
pub mod reports;
pub mod roster;
pub mod stats;
pub mod usage;
pub mod worker;
