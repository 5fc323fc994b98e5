//! E2E scenarios for the tether sync engine.

mod harness;
mod scenarios;
