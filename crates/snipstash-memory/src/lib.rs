#![doc = include_str!("../README.md")]

mod adapter;

pub use adapter::{MemoryAdapter, MemoryTransaction, Tables};
