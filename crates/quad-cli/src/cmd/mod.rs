pub mod circle;
pub mod config;
pub mod flow;
pub mod init;
pub mod participant;
pub mod role;
pub mod serve;
pub mod zone;
