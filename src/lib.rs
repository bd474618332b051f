pub mod constants;
pub mod engine;
pub mod game_loop;
pub mod ghost;
pub mod high_score_store;
pub mod levels;
pub mod movement;
pub mod pickup;
pub mod player;
pub mod rng;
pub mod server_protocol;
pub mod timer;
pub mod types;
pub mod world;
