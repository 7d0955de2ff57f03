/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub mod build;
pub mod log;
pub mod opts;
pub mod signal;

pub mod config;
pub mod document;
pub mod fetch;
pub mod flatten;
pub mod job;
pub mod schedule;
pub mod store;
pub mod types;
