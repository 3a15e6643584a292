//! The IR the engine reads, the name inference analysis over it, and the diagnostics
//! shared by both.

pub(crate) mod compiler_messages {
    pub(crate) mod compiler_dev_logging;
    pub(crate) mod compiler_errors;
    pub(crate) mod display_messages;
}
pub(crate) use compiler_messages::compiler_errors;
pub(crate) use compiler_messages::display_messages;
pub(crate) mod string_interning;

pub(crate) mod ir;

pub(crate) mod analysis;
