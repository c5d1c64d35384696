// Faults raised by user program threads

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The thread was killed or the program stopped; unwinds quietly
    #[error("thread was killed")]
    Killed,
    #[error("Function {0} not found")]
    FunctionNotFound(String),
    /// Error returned by user code
    #[error("{0}")]
    Runtime(String),
    #[error("panic: {0}")]
    Panicked(String),
}

pub type ProgramResult<T = ()> = Result<T, Fault>;
