mod board;
mod command;
mod common;
mod config;
mod frame;
mod game;
mod logging;
mod registry;
mod relay;
mod render;
pub mod server;
mod ship;
pub mod transport;

pub use board::*;
pub use command::*;
pub use common::*;
pub use config::*;
pub use frame::*;
pub use game::*;
pub use logging::init_logging;
pub use registry::*;
pub use relay::*;
pub use render::*;
pub use ship::*;
pub use transport::tcp::TcpTransport;
