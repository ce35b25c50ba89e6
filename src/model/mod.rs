pub mod category;
pub mod config;
pub mod store;
pub mod task;
pub mod view;

pub use category::*;
pub use config::*;
pub use store::*;
pub use task::*;
pub use view::*;
