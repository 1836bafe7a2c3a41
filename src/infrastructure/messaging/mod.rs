pub mod evolution;
pub mod zapi;
