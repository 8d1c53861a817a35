pub mod catalog;
pub mod config;
pub mod io;
pub mod outcome;
pub mod state;
