//! Property-based tests: invariants that hold for any input, not only the fixtures
//! the unit tests spell out.

mod generators;
mod invariants;
