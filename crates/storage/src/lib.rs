// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gaffer-storage: the persistent job store.
//!
//! On disk the store is an append-only JSON-lines ledger of [`Event`]s plus a
//! sidecar lock file. Every opener (the supervisor and each worker process)
//! replays the ledger into a [`ReplayState`] and catches up incrementally
//! under a file lock, so all handles observe one serialized history.
//!
//! [`Event`]: gaffer_core::Event

mod error;
mod ledger;
mod state;
mod store;

pub use error::StoreError;
pub use state::ReplayState;
pub use store::{JobStore, ListFilter};
