// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-settings inspection for data-collection gating.
//!
//! The engine only needs two facts from the run-settings XML: whether
//! out-of-process or in-process data collection is configured. A tag scan is
//! enough; full settings parsing belongs to the operation provider.

/// True when the run settings configure at least one out-of-process data
/// collector.
pub fn data_collection_enabled(run_settings: &str) -> bool {
    section_has_collector(run_settings, "<DataCollectionRunSettings", "<DataCollector ")
}

/// True when the run settings configure at least one in-process data
/// collector.
pub fn in_proc_data_collection_enabled(run_settings: &str) -> bool {
    section_has_collector(
        run_settings,
        "<InProcDataCollectionRunSettings",
        "<InProcDataCollector ",
    )
}

fn section_has_collector(run_settings: &str, section_tag: &str, collector_tag: &str) -> bool {
    let Some(start) = run_settings.find(section_tag) else {
        return false;
    };
    // An empty section configures nothing
    run_settings[start..].contains(collector_tag)
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
