pub mod onboard;
pub mod patients;
pub mod session;
pub mod status;
pub mod summarize;
pub mod templates;
