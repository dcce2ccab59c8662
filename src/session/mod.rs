//! Host-facing player session.

pub(crate) mod player;

pub use player::{Player, prepare_animation};
