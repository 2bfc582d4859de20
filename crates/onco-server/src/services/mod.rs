pub mod analysis;
pub mod supervisor;
