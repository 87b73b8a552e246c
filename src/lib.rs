pub mod config;
pub mod culling;
pub mod edit_mode;
pub mod error;
pub mod history;
pub mod io;
pub mod math;
pub mod model;
pub mod operations;
pub mod session;
pub mod store;

pub use error::{Result, SegEditError};
pub use session::EditorSession;
