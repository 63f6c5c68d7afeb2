//! Path dispatch
//!
//! ```text
//!   payload --PathWalker--> (path, leaf) --coerce--> (path, value)
//!                                                        |
//!                              TopicDispatchTable (first match)
//!                              /                          \
//!                     direct rule                      handler rule
//!                 store.set(name, value)     Handler::process(template, value, captures)
//! ```

pub mod handlers;
pub mod mapping;
pub mod table;
pub mod walker;

pub use handlers::{Handler, HandlerContext};
pub use mapping::{TopicFilter, NM2_RULES, NM2_SUBSCRIPTIONS};
pub use table::{DispatchOutcome, Rule, RuleSpec, TopicDispatchTable};
pub use walker::{PathWalker, MAX_DEPTH};
