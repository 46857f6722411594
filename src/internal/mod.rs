// Internal support shared by every module

pub mod error;
