pub mod controller;
pub mod lifecycle;
#[cfg(unix)]
pub mod mpv;
pub mod nowplaying;
pub mod player;
pub mod socket;
pub mod ui;
