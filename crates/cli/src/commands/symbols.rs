use anyhow::{Context, Result};

use crate::commands::{filter_records, print_records, LoadArgs};

/// List the exported symbols of a loaded library.
///
/// With `matching`, only records the resolver would consider for that query
/// are listed.
pub fn symbols_command(
    load: &LoadArgs,
    matching: Option<&str>,
    cpp_only: bool,
    loadable_only: bool,
    json: bool,
) -> Result<()> {
    let library = load.open()?;
    let records = library
        .symbols()
        .with_context(|| format!("Failed to enumerate symbols of {}", library.path().display()))?;
    let records = match matching {
        Some(query) => {
            library.resolver().find_matches(query, &records).into_iter().cloned().collect()
        }
        None => records,
    };
    let records = filter_records(records, cpp_only, loadable_only);
    print_records(&records, json)
}
