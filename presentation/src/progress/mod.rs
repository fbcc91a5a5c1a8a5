//! Round progress display

pub mod reporter;
