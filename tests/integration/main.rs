//! Integration tests for the stage loop
//!
//! These tests use wiremock to stand up a checkpoint service and a bypass
//! service and walk the chain end-to-end.

mod stage_loop_tests;
