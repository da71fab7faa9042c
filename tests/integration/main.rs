//! Integration test harness
//!
//! The scenarios live in submodules; this file makes the directory one
//! test binary.

mod crawl_tests;
