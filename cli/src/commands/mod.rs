pub mod branch;
pub mod export;
pub mod reassign;
pub mod scenarios;
pub mod switch;
pub mod validate;
