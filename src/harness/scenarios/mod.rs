//! Scenario implementations

pub mod catch;
pub mod disassemble;
pub mod expression;
pub mod registers;
pub mod step;
