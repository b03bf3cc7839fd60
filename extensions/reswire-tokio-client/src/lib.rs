mod tcp_client;

pub use tcp_client::{TcpClient, TransportError};
