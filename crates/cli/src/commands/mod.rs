pub mod chat;
pub mod doctor;
pub mod onboard;
pub mod questions;
pub mod serve;
pub mod status;
