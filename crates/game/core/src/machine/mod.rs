//! The agent state machine: data-driven transition tables and the runtime
//! machine that walks them.
//!
//! A [`TransitionTable`] is plain data (loadable from files). Compiling it
//! yields a shareable [`CompiledTable`]; each agent phase drives its own
//! [`StateMachine`] over one.
mod state_machine;
mod table;

pub use state_machine::{Origin, StateMachine};
pub use table::{CompiledState, CompiledTable, Movement, StateSpec, Transition, TransitionTable};
