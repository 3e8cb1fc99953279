pub mod province;
pub mod record;
pub mod stage;

pub use province::{is_known_province, PROVINCES};
pub use record::{ClassifiedSchool, DatabaseFormat, SchoolRecord};
pub use stage::{Stage, StageSet, STAGE_SEPARATOR};
