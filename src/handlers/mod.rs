pub mod lifecycle;

pub use lifecycle::{InvocationOutcome, LifecycleHandler};
