pub mod ami;
pub mod deploy;
