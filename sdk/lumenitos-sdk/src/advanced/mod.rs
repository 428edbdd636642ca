pub mod auth;
pub mod budget;
pub mod instructions;
pub mod simulation;
pub mod submission;
