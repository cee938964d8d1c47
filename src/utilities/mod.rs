//! Output recovery and prompt text helpers.

pub mod converter;
pub mod string_utils;
