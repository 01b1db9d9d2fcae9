// Declare submodules
mod common;
mod extraction;
mod impact;

pub use common::current_date;
pub use extraction::{extraction_system_prompt, extraction_user_prompt};
pub use impact::{impact_system_prompt, impact_user_prompt};
