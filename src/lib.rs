//! Podguard — scope containment for protected pod templates.
//!
//! Pods created from a protected template carry elevated credentials. Any job
//! can name any pod, so this crate guards every process launch and file
//! handle on a pod and allows it only from a scope that provisioned the
//! template. It also decides which service accounts a scope may grant to new
//! protected pods.
//!
//! See `DESIGN.md` for the architecture.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod config;
pub mod guard;
pub mod launcher;
pub mod logging;
pub mod node;
pub mod provision;
pub mod scope;
pub mod selector;
pub mod step;
