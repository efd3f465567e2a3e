//! `pd-agent` — the deliberation loop of one parcel-courier agent.
//!
//! # Event loop
//!
//! ```text
//! loop (biased select):
//!   ① Shutdown   : token cancelled → cancel running plan, leave collaboration
//!   ② Step event : executor reports an attempt; successful moves update
//!                  the believed position and are shared with teammates
//!   ③ Plan done  : Achieved / Cancelled / PlanFailed (+ one fallback replan)
//!   ④ Perception : beliefs, negotiation messages, intention revision
//!   ⑤ Tick       : collaboration timeout, availability announcement,
//!                  abort if requested, otherwise desire → intention → plan
//! ```
//!
//! Planning never happens on the perception path, and at most one plan is
//! in flight per agent.  Whenever a plan ends, finished or aborted, the step
//! events it left in the channel are applied before anything is replanned.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use pd_agent::{AgentBuilder, NoopObserver};
//!
//! let (gateway, perceptions) = world.connect(id.clone(), "alice", start).await?;
//! let gateway = Arc::new(gateway);
//! let agent = AgentBuilder::standard(id, config, gateway.clone(), gateway)
//!     .teammates([bob])
//!     .build()?;
//! let summary = agent.run(perceptions, &mut NoopObserver).await;
//! ```

pub mod agent;
pub mod builder;
pub mod error;
pub mod observer;

#[cfg(test)]
mod tests;

pub use agent::{Agent, RunSummary};
pub use builder::AgentBuilder;
pub use error::{AgentError, AgentResult};
pub use observer::{AgentObserver, NoopObserver};
