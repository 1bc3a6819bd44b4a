#![allow(dead_code)]

pub mod common;
pub mod fixtures;
