pub mod appointment;
pub mod decision;
pub mod proposal;
pub mod session;

pub use appointment::AppointmentDetails;
pub use decision::RoutingDecision;
pub use proposal::{ProposalReason, SchedulingProposal};
pub use session::{CallSession, CallStage, CallTurn};
