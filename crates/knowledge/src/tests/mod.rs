//! Engine-level tests with in-crate fakes.
