//! Cross-crate integration tests for the shared-object bus.

#[cfg(test)]
mod layout_scenarios;

#[cfg(test)]
mod runtime_scenarios;
