pub mod editor;
pub mod error;
pub mod render;
pub mod roster;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
