// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

pub mod client;
pub mod config;
pub mod proxy;
pub mod rate_limit;
pub mod session;
pub mod storage;
pub mod stream;
pub mod upstream;
pub mod waitlist;
