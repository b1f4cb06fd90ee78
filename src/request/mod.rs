//! Request building
//!
//! Turns an endpoint plus collected values into a [`RequestPlan`].

mod plan;

pub use plan::{join_url, substitute_path, RequestPlan, USER_AGENT_STRING};
