//! # mirrorfetch
//!
//! The artifact-acquisition step of an image build pipeline. Given a list of mirror URLs for
//! a single large file (an installation ISO, a guest-tools package), the [`StepDownload`]
//! step fetches exactly one verified copy of it into a shared, lock-protected cache.
//!
//! The flow begins by creating a `Config` and using it to build a `StepDownload`. The step is
//! then handed to a pipeline runner (such as [`pipeline::BasicRunner`]) which supplies a
//! [`pipeline::StateBag`] for results, errors and cancellation. Everything the step has to say
//! to a human is sent as an [`events::event::Event`] over the configured [`events::EventChannel`].
//!
//! [`StepDownload`]: step::StepDownload

pub mod cache;
pub mod checksum;
mod config;
pub mod events;
pub mod fetch;
pub mod pipeline;
pub mod step;

pub use config::*;

#[macro_use]
extern crate derive_builder;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;
