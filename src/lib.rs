// Editor session persistence library - exposes all core modules for hosts and tests

pub mod app;
pub mod config;
pub mod model;
pub mod services;
pub mod view;
