pub mod clear;
pub mod export;
pub mod serve;
