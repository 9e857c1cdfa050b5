//! Core types and decision logic for stagesync.
//!
//! Raw checklist facts about a tracked person are folded into a single
//! [`view::PersonView`] by [`aggregate::aggregate`], then classified into a
//! pipeline [`classify::Stage`] and [`classify::Substage`].
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::FactStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod classify;
pub mod diff;
pub mod error;
pub mod fact;
pub mod normalize;
pub mod store;
pub mod sync;
pub mod view;

pub use error::{Error, Result};
