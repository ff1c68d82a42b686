pub mod adoption;
pub mod config;
pub mod flows;
pub mod participants;
pub mod roles;
