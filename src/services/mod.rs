pub mod app_services;
pub mod channel_list_services;
pub mod orchestrator_services;
pub mod playlist_services;
pub mod resolver_services;

pub use app_services::{AppServices, RunOutcome};
pub use channel_list_services::DynChannelListService;
pub use orchestrator_services::ResolutionOrchestrator;
pub use playlist_services::PlaylistWriter;
pub use resolver_services::{DynResolverLauncher, DynStreamResolver};
