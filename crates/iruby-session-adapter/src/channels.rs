// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Binding the five kernel channels through an adapter
//!
//! shell, control and stdin are ROUTER sockets, iopub is PUB and heartbeat is
//! REP. Ports of 0 in the connection info are assigned by the transport and
//! written back into [`KernelChannels::resolved_connection`] so the frontend
//! can be told where to connect.

use iruby_config::{ConnectionConfig, KernelChannel};
use tracing::info;

use crate::adapter::SessionAdapter;
use crate::error::SocketResult;
use crate::socket::{SessionSocket, SocketPattern};

/// Socket pattern each channel uses
pub fn pattern_for(channel: KernelChannel) -> SocketPattern {
    match channel {
        KernelChannel::Shell | KernelChannel::Control | KernelChannel::Stdin => SocketPattern::Router,
        KernelChannel::IoPub => SocketPattern::Pub,
        KernelChannel::Heartbeat => SocketPattern::Rep,
    }
}

/// One bound channel
#[derive(Debug)]
pub struct ChannelSocket {
    pub channel: KernelChannel,
    pub socket: Box<dyn SessionSocket>,
    pub port: u16,
}

/// All five channels of a kernel session
#[derive(Debug)]
pub struct KernelChannels {
    sockets: Vec<ChannelSocket>,
    connection: ConnectionConfig,
}

impl KernelChannels {
    /// Bind every channel using the adapter's connection info
    ///
    /// # Errors
    ///
    /// Returns the first socket error; channels bound before it are dropped.
    pub fn bind(adapter: &mut dyn SessionAdapter) -> SocketResult<Self> {
        let mut connection = adapter.config().clone();
        let mut sockets = Vec::with_capacity(KernelChannel::ALL.len());

        for channel in KernelChannel::ALL {
            let (socket, port) = adapter.open_socket(
                pattern_for(channel),
                &connection.transport,
                &connection.ip,
                connection.port(channel),
            )?;
            connection.set_port(channel, port);
            sockets.push(ChannelSocket {
                channel,
                socket,
                port,
            });
        }

        info!(
            adapter = adapter.name(),
            shell = connection.shell_port,
            iopub = connection.iopub_port,
            stdin = connection.stdin_port,
            control = connection.control_port,
            hb = connection.hb_port,
            "kernel channels bound"
        );

        Ok(Self {
            sockets,
            connection,
        })
    }

    /// Connection info with every port set to the bound value
    pub fn resolved_connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    pub fn port(&self, channel: KernelChannel) -> u16 {
        self.connection.port(channel)
    }

    pub fn socket_mut(&mut self, channel: KernelChannel) -> Option<&mut (dyn SessionSocket + 'static)> {
        self.sockets
            .iter_mut()
            .find(|bound| bound.channel == channel)
            .map(|bound| bound.socket.as_mut())
    }

    pub fn into_sockets(self) -> Vec<ChannelSocket> {
        self.sockets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSession;
    use std::sync::Arc;

    #[test]
    fn test_channel_patterns() {
        assert_eq!(pattern_for(KernelChannel::Shell), SocketPattern::Router);
        assert_eq!(pattern_for(KernelChannel::Control), SocketPattern::Router);
        assert_eq!(pattern_for(KernelChannel::Stdin), SocketPattern::Router);
        assert_eq!(pattern_for(KernelChannel::IoPub), SocketPattern::Pub);
        assert_eq!(pattern_for(KernelChannel::Heartbeat), SocketPattern::Rep);
    }

    #[test]
    fn test_wildcard_ports_written_back() {
        let mut adapter = MockSession::new("mock", Arc::new(ConnectionConfig::default()));

        let channels = KernelChannels::bind(&mut adapter).unwrap();
        let resolved = channels.resolved_connection();

        let first = MockSession::FIRST_ASSIGNED_PORT;
        assert_eq!(resolved.shell_port, first);
        assert_eq!(resolved.control_port, first + 1);
        assert_eq!(resolved.stdin_port, first + 2);
        assert_eq!(resolved.iopub_port, first + 3);
        assert_eq!(resolved.hb_port, first + 4);
        // the adapter's own config is left untouched
        assert_eq!(adapter.config().shell_port, 0);
    }

    #[test]
    fn test_fixed_ports_kept() {
        let config = ConnectionConfig {
            shell_port: 50001,
            hb_port: 50005,
            ..ConnectionConfig::default()
        };
        let mut adapter = MockSession::new("mock", Arc::new(config));

        let mut channels = KernelChannels::bind(&mut adapter).unwrap();

        assert_eq!(channels.port(KernelChannel::Shell), 50001);
        assert_eq!(channels.port(KernelChannel::Heartbeat), 50005);
        let iopub = channels.socket_mut(KernelChannel::IoPub).unwrap();
        assert_eq!(iopub.pattern(), SocketPattern::Pub);
        assert_eq!(channels.into_sockets().len(), 5);
    }

    #[test]
    fn test_invalid_transport_propagates() {
        let config = ConnectionConfig {
            transport: "udp".to_string(),
            ..ConnectionConfig::default()
        };
        let mut adapter = MockSession::new("mock", Arc::new(config));

        assert!(KernelChannels::bind(&mut adapter).is_err());
    }
}
