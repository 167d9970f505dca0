// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

pub mod config;
pub mod digest;
pub mod expiry;
pub mod nhk_api;
pub mod report;
pub mod scan;

pub use config::Config;
pub use digest::Digest;
pub use expiry::ExpiringProgramme;
pub use nhk_api::NhkApi;
pub use scan::{ScanOptions, scan};
