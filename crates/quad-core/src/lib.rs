pub mod adoption;
pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod io;
pub mod participant;
pub mod paths;
pub mod registry;
pub mod state;
pub mod types;

pub use engine::{Engine, FlowView, TransitionRequest};
pub use error::{QuadError, Result};
