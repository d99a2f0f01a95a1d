//! Small helpers shared by the command-line front end.

pub mod progress;
