//! Host implementations for running the overlay without a browser
//!
//! The CLI fetches the watch page once, drives a simulated video clock and
//! prints the panel to a terminal.

mod page;
mod terminal;
mod video;

pub use page::{extract_initial_state, extract_scripts, FetchedPage, PageError};
pub use terminal::TerminalView;
pub use video::{SimulatedVideo, StaticScanner};
