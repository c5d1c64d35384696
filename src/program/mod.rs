//! User program execution: one thread per process, a shared motor control
//! loop, and the controller library handed to user code.

pub mod clock;
pub mod create;
pub mod error;
pub mod library;
pub mod motors;
pub mod process;
pub mod registry;
pub mod runtime;

pub use error::{Fault, ProgramResult};
pub use library::Botball;
pub use registry::{ProgramFn, ProgramRegistry};
pub use runtime::Runtime;
