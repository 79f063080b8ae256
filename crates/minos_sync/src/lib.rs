#![no_std]

mod spin;

pub use spin::{Spin, SpinGuard};
