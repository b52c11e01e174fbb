pub mod arcsets;
pub mod career;
pub mod demo_feed;
pub mod persist;
pub mod playback;
pub mod players;
pub mod provider;
pub mod render;
pub mod state;
pub mod transfer_fetch;
pub mod year_cache;
