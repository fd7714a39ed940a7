pub mod config;
pub mod console;
pub mod log;
pub mod proto;
pub mod session;
pub mod transport;
pub mod wire;

#[cfg(test)]
mod test;
