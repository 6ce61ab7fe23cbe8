// Engine 抽象层
pub mod engine;

pub use engine::{Engine, InMemoryEngine};
