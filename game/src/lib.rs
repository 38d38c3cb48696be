pub mod api;
pub mod bag;
pub mod board;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod garbage;
pub mod http_client;
pub mod input;
pub mod piece;
pub mod playtest;
pub mod reporting;
pub mod scoring;
pub mod session;
pub mod view;
