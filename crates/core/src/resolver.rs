//! Matching of user-supplied names against demangled signatures.

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::format::format_signature;
use crate::model::SymbolRecord;

/// Resolves a query such as `tools::adder` or `tools::adder(double, double)`
/// to exactly one catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolver {
    /// Ignore records the loader cannot resolve to an address.
    pub loadable_only: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self { loadable_only: true }
    }
}

impl Resolver {
    pub fn new(loadable_only: bool) -> Self {
        Self { loadable_only }
    }

    /// Records whose demangled name is `query` itself or `query` followed
    /// by a parameter list.
    pub fn find_matches<'a>(
        &self,
        query: &str,
        catalog: &'a [SymbolRecord],
    ) -> Vec<&'a SymbolRecord> {
        let query = format_signature(query);
        catalog
            .iter()
            .filter(|record| !self.loadable_only || record.loadable)
            .filter(|record| matches_query(&record.demangled_name, &query))
            .collect()
    }

    /// Resolve `query` to a single record.
    ///
    /// `native_error` is the loader's message from the direct lookup that
    /// failed before resolution was attempted; it is carried by
    /// [`Error::SymbolNotFound`].
    pub fn resolve<'a>(
        &self,
        query: &str,
        catalog: &'a [SymbolRecord],
        native_error: &str,
    ) -> Result<&'a SymbolRecord> {
        if query.is_empty() {
            return Err(Error::InvalidArgument(
                "The symbol name to lookup is an empty string".into(),
            ));
        }
        let matches = self.find_matches(query, catalog);
        trace!("'{query}' matched {} of {} records", matches.len(), catalog.len());
        match matches.as_slice() {
            [] => Err(Error::SymbolNotFound {
                name: query.to_string(),
                native: native_error.to_string(),
            }),
            [record] => {
                debug!("resolved '{query}' to '{}'", record.name);
                Ok(record)
            }
            many => Err(Error::MultipleMatches {
                name: query.to_string(),
                candidates: many.iter().map(|record| record.name.clone()).collect(),
            }),
        }
    }
}

/// [`Resolver::find_matches`] with the default resolver.
pub fn find_matches<'a>(query: &str, catalog: &'a [SymbolRecord]) -> Vec<&'a SymbolRecord> {
    Resolver::default().find_matches(query, catalog)
}

/// Prefix match with a boundary check: `foo` matches `foo` and `foo(int)`,
/// never `foobar(int)`.
pub fn matches_query(demangled: &str, query: &str) -> bool {
    match demangled.strip_prefix(query) {
        Some(rest) => rest.is_empty() || rest.starts_with('('),
        None => false,
    }
}
