mod failures;
mod offline;
mod pull_flow;
mod push_flow;
mod round_trip;
mod sessions;
