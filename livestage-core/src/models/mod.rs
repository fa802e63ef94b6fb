pub mod id;
pub mod participant;
pub mod room;
pub mod session;

pub use id::{generate_id, Identity, RoomName};
pub use participant::{ParticipantMetadata, StageEvent, StageState};
pub use room::RoomMetadata;
pub use session::{Actor, AuthenticatedSession};
