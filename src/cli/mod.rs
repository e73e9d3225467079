pub mod load;
pub mod preview;
pub mod setup;
pub mod ui;
