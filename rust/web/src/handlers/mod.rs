pub mod game;
pub mod health;
pub mod ws;

pub use game::{delete_game, get_game};
pub use health::health;
pub use ws::{dispatch, handle_socket};
