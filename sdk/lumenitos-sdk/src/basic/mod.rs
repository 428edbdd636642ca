pub mod actions;
pub mod history;
pub mod lifecycle;
pub mod wallet;
