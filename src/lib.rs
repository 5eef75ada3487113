// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod error;
pub mod server;
pub mod kubernetes;
pub mod pipeline;
pub mod policy;
pub mod registry;
pub mod types;

#[cfg(test)]
pub mod test_utils;
