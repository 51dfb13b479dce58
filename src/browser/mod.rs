pub mod cdp;
pub mod chrome;
pub mod context;
pub mod error;
pub mod instance;
pub mod pool;
pub mod protocol;

pub use chrome::find_chrome;
pub use context::{BrowsingContext, RequestHook};
pub use error::BrowserError;
pub use instance::BrowserInstance;
pub use pool::{BrowserPool, RoundRobin};
