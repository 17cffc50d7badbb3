#![doc = "subsync-core: core pipeline library for subsync."]

//! This crate contains every stage of the subscription aggregation pipeline:
//! fetching sources, classifying payloads, merging nodes, converting `vmess://`
//! links, assembling the Clash configuration and encoding the output artifacts.
//! The Gist transport and the CLI live in the `subsync` crate.
//!
//! # Usage
//! Build a [`config::SyncConfig`], pick a [`contract::Fetcher`] and a
//! [`contract::Publisher`], then call [`synchronise::synchronise`].

pub mod clash;
pub mod codec;
pub mod config;
pub mod contract;
pub mod encode;
pub mod fetch;
pub mod merge;
pub mod normalize;
pub mod synchronise;
pub mod vmess;
