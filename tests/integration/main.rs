//! Integration tests for the crawler

mod common;
mod crawl_tests;
