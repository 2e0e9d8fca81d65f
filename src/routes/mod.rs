mod health_check;
mod submit;

pub use health_check::health_check;
pub use submit::{handle_submit, SubmitResponse};
