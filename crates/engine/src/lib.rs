//! Prosecution case-intake engine.
//!
//! Submissions from every channel are normalized into one canonical shape,
//! evaluated against the rule set and folded into a per-case aggregate.
//! Materials wait on their case under expiry timers and CPS court forms are
//! matched onto case defendants. Every outcome is published as paired
//! internal and public events.

pub mod collaborators;
pub mod config;
pub mod cps;
pub mod engine;
pub mod feed;
pub mod local;
pub mod mailgun;
pub mod material;
pub mod normalizer;
pub mod notify;
pub mod publisher;
pub mod reference;
pub mod retry;
pub mod store;
pub mod telemetry;
pub mod validation;
pub mod workflow;

pub use collaborators::{
    AttachDocumentRequest, CaseManagementSystem, Collaborators, CreateCaseRequest, DocumentStore,
    Notifier, ValidationFailureNotice,
};
pub use engine::IntakeEngine;
pub use material::{Scheduler, TimerFired, TokioScheduler};
pub use publisher::{BroadcastSink, EventSink, Outcome, Publisher, RecordingSink};
pub use reference::{ReferenceData, StaticReferenceData};
