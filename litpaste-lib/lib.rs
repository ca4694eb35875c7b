use smartstring::{LazyCompact, SmartString};

pub mod clipboard;
pub mod config;
pub mod copy;
pub mod edit;
pub mod escape;
pub mod indent;
pub mod literal;
pub mod parts;
pub mod paste;

pub type Tendril = SmartString<LazyCompact>;
