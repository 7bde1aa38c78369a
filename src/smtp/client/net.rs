//! The network stream a session runs on: plain TCP, TLS after the
//! STARTTLS upgrade, or a mock for tests

use std::{
    io::{self, Read, Write},
    mem,
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::TlsStream;

use super::{MockStream, TlsParameters};
use crate::error::{self, Error};

/// A network stream
#[derive(Debug)]
pub struct NetworkStream {
    inner: InnerNetworkStream,
}

/// Represents the different types of underlying network streams
#[derive(Debug)]
enum InnerNetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    Tls(Box<TlsStream<TcpStream>>),
    /// In-memory stream for tests
    Mock(MockStream),
    /// Can't be built
    None,
}

impl NetworkStream {
    fn new(inner: InnerNetworkStream) -> Self {
        if let InnerNetworkStream::None = inner {
            debug_assert!(false, "InnerNetworkStream::None must never be built");
        }

        NetworkStream { inner }
    }

    pub(crate) fn mock(stream: MockStream) -> Self {
        NetworkStream::new(InnerNetworkStream::Mock(stream))
    }

    /// Opens a TCP connection, trying every resolved address until one
    /// accepts within the timeout.
    pub fn connect<T: ToSocketAddrs>(
        server: T,
        timeout: Option<Duration>,
    ) -> Result<NetworkStream, Error> {
        let addrs = server.to_socket_addrs().map_err(error::connect)?;

        let mut last_err = None;
        for addr in addrs {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    return Ok(NetworkStream::new(InnerNetworkStream::Tcp(stream)));
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) => error::connect(err),
            None => error::connect("could not resolve to any address"),
        })
    }

    /// Performs the TLS handshake over the existing TCP stream.
    ///
    /// The mock variant upgrades to itself so the whole state machine can
    /// be exercised in tests.
    pub fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        match &self.inner {
            InnerNetworkStream::Tcp(_) => {
                // get owned TcpStream
                let tcp_stream = mem::replace(&mut self.inner, InnerNetworkStream::None);
                let InnerNetworkStream::Tcp(tcp_stream) = tcp_stream else {
                    unreachable!()
                };

                let stream = tls_parameters
                    .connector
                    .connect(tls_parameters.domain(), tcp_stream)
                    .map_err(error::tls)?;
                self.inner = InnerNetworkStream::Tls(Box::new(stream));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Shutdowns the connection
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match &self.inner {
            InnerNetworkStream::Tcp(s) => s.shutdown(how),
            InnerNetworkStream::Tls(s) => s.get_ref().shutdown(how),
            InnerNetworkStream::Mock(_) => Ok(()),
            InnerNetworkStream::None => {
                debug_assert!(false, "InnerNetworkStream::None must never be built");
                Ok(())
            }
        }
    }

    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match &mut self.inner {
            InnerNetworkStream::Tcp(stream) => stream.set_read_timeout(duration),
            InnerNetworkStream::Tls(stream) => stream.get_ref().set_read_timeout(duration),
            InnerNetworkStream::Mock(_) => Ok(()),
            InnerNetworkStream::None => {
                debug_assert!(false, "InnerNetworkStream::None must never be built");
                Ok(())
            }
        }
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match &mut self.inner {
            InnerNetworkStream::Tcp(stream) => stream.set_write_timeout(duration),
            InnerNetworkStream::Tls(stream) => stream.get_ref().set_write_timeout(duration),
            InnerNetworkStream::Mock(_) => Ok(()),
            InnerNetworkStream::None => {
                debug_assert!(false, "InnerNetworkStream::None must never be built");
                Ok(())
            }
        }
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            InnerNetworkStream::Tcp(s) => s.read(buf),
            InnerNetworkStream::Tls(s) => s.read(buf),
            InnerNetworkStream::Mock(s) => s.read(buf),
            InnerNetworkStream::None => {
                debug_assert!(false, "InnerNetworkStream::None must never be built");
                Ok(0)
            }
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            InnerNetworkStream::Tcp(s) => s.write(buf),
            InnerNetworkStream::Tls(s) => s.write(buf),
            InnerNetworkStream::Mock(s) => s.write(buf),
            InnerNetworkStream::None => {
                debug_assert!(false, "InnerNetworkStream::None must never be built");
                Ok(0)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            InnerNetworkStream::Tcp(s) => s.flush(),
            InnerNetworkStream::Tls(s) => s.flush(),
            InnerNetworkStream::Mock(s) => s.flush(),
            InnerNetworkStream::None => {
                debug_assert!(false, "InnerNetworkStream::None must never be built");
                Ok(())
            }
        }
    }
}
