//! # Pipeline
//!
//! The minimal surface a step needs from the pipeline that runs it: a [Step] trait, the
//! [StateBag] shared between steps, and a sequential [BasicRunner].
//!
mod runner;
mod state;

pub use runner::*;
pub use state::*;

use async_trait::async_trait;

/// What the pipeline should do after a step ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepAction {
    Continue,
    Halt,
}

#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, state: &StateBag) -> StepAction;

    /// Called once the pipeline is done, for every step that ran, in reverse order.
    async fn cleanup(&self, _state: &StateBag) {}
}
