//! A connected UDP datagram socket with per-call write/read deadlines.

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::{SnmpError, SnmpResult};

pub struct DatagramSocket {
    socket: UdpSocket,
    timeout: Duration,
}

impl DatagramSocket {
    pub async fn connect(address: &str, deadline: Duration) -> SnmpResult<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        match timeout(deadline, socket.connect(address)).await {
            Ok(Ok(())) => Ok(Self {
                socket,
                timeout: deadline,
            }),
            Ok(Err(e)) => Err(SnmpError::Network(e)),
            Err(_) => Err(SnmpError::Timeout(deadline)),
        }
    }

    pub async fn send(&self, packet: &[u8]) -> SnmpResult<()> {
        match timeout(self.timeout, self.socket.send(packet)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(SnmpError::Network(e)),
            Err(_) => Err(SnmpError::Timeout(self.timeout)),
        }
    }

    pub async fn recv(&self, buf_size: usize) -> SnmpResult<Vec<u8>> {
        let mut buf = vec![0u8; buf_size];
        match timeout(self.timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                buf.truncate(len);
                Ok(buf)
            }
            Ok(Err(e)) => Err(SnmpError::Network(e)),
            Err(_) => Err(SnmpError::Timeout(self.timeout)),
        }
    }
}
