pub mod config_service;
pub mod memory_session_repository;
pub mod paths;
pub mod storage;
pub mod toml_experience_repository;
pub mod toml_session_repository;

pub use crate::config_service::ConfigService;
pub use crate::memory_session_repository::InMemorySessionRepository;
pub use crate::paths::GuestflowPaths;
pub use crate::toml_experience_repository::TomlExperienceRepository;
pub use crate::toml_session_repository::TomlSessionRepository;
