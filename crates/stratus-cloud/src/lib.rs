//! Stratus Cloud
//!
//! This crate provides the engine-facing side of Stratus: the seam to the
//! external reconcile engine, the recorded state of past reconciliations,
//! and the resolution of declared outputs against that state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  Stratus CLI                    │
//! │           (stratus synth/outputs)               │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               stratus-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Engine Abstraction              │   │
//! │  │  trait ReconcileEngine { ... }           │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │  State Mgmt  │  │   Outputs    │             │
//! │  └──────────────┘  └──────────────┘             │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │   external    │
//! │ deploy engine │
//! └───────────────┘
//! ```
//!
//! The engine itself lives outside this repository. It receives the
//! serialized desired-state graph, converges infrastructure towards it,
//! and reports per-resource outcomes which are folded into
//! `.stratus/state.json`. The `Catalog` hydrated from that state is what
//! lets a re-declared stack resolve already-existing resources instead
//! of creating them again.

pub mod engine;
pub mod error;
pub mod outputs;
pub mod state;

// Re-exports
pub use engine::{ReconcileEngine, ReconcileReport, ResourceOutcome};
pub use error::{CloudError, Result};
pub use outputs::{OutputState, ResolvedOutput, resolve_outputs};
pub use state::{DeployState, RecordStatus, ResourceRecord, StateStore};
