
mod concurrency;
mod config;
mod sender;
