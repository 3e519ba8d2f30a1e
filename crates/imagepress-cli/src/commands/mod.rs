mod build;
mod ci;
mod clean;
mod doctor;
mod pipeline;
mod publish;
mod run;
mod stamp;
mod validate;

pub use build::build;
pub use ci::{ci_init, ci_setup};
pub use clean::clean;
pub use doctor::doctor;
pub use publish::publish;
pub use run::run;
pub use stamp::stamp;
pub use validate::validate;
