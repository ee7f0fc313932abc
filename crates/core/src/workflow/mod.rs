//! The patient matching workflow: views, the controller that moves between them, and the async
//! session that runs simulated work on the controller's behalf.

pub mod controller;
pub mod session;
pub mod state;

pub use controller::{
    ConsentTask, EhrSearchRequest, IntakeProgress, MatchRequest, WorkflowController,
    WorkflowSnapshot,
};
pub use session::WorkflowSession;
pub use state::{next_step, Event, Step, StepKind, View};
