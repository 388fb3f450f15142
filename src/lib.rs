#![forbid(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod collect;
pub mod config;
pub mod folding;
pub mod formats;
pub mod group;
pub mod html;
pub mod list;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod source;
