mod actions;
mod config;
mod filtering;
mod harness;
mod navigation;
