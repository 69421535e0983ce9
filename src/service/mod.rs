pub mod error;
pub mod page;
pub mod protocol;
pub mod registry;
pub mod server;

pub use page::PageRenderer;
pub use registry::SessionRegistry;
pub use server::{router, serve, AppState};
