//! Unit tests for pure logic

mod menu_order;
mod scheduler;
mod validation;
