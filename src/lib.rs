//! Deferred playback queues for voice-assistant sessions.
//!
//! Playback requests made during a [`session`] are collected by a
//! [`queue_builder`] and only sent to the device when the session ends. The
//! [`manager`] plays the first item and drains the rest into the device
//! queue in the background. Remote calls go through the traits in
//! [`remote`], implemented for the Web API by [`web`].
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod config;
pub mod device;
pub mod error;
pub mod http;
pub mod manager;
pub mod playable;
pub mod protocol;
pub mod queue_builder;
pub mod remote;
pub mod session;
pub mod token;
pub mod uri;
pub mod web;

#[cfg(test)]
mod testing;
