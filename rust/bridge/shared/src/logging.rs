//
// Copyright 2024 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

/// An implementation of [`log::Log::enabled`] that only forwards the bridge's own records.
///
/// Host A may apply additional filters on top of what the bridge reports.
pub fn log_enabled_for_bridge(metadata: &log::Metadata) -> bool {
    let target = metadata.target();

    // Accept both "crate_name" and "crate_name::something".
    let check = |crate_name: &str| {
        target
            .strip_prefix(crate_name)
            .is_some_and(|remainder| remainder.is_empty() || remainder.starts_with("::"))
    };

    match target.as_bytes().first() {
        Some(b'j') => check("jic_bridge") || check("jic_bridge_jni") || check("jic_jni"),
        _ => false,
    }
}
