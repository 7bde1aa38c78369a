#![allow(missing_docs)]
// Comes from https://github.com/inre/rust-mq/blob/master/netopt

use std::{
    io::{self, Cursor, Read, Write},
    sync::{Arc, Mutex},
};

pub type MockCursor = Cursor<Vec<u8>>;

/// In-memory stand-in for a network stream.
///
/// Clones share the same buffers, so a test can keep a clone around and
/// inspect what the client wrote after handing the stream over.
#[derive(Clone, Debug, Default)]
pub struct MockStream {
    reader: Arc<Mutex<MockCursor>>,
    writer: Arc<Mutex<MockCursor>>,
}

impl MockStream {
    pub fn new() -> MockStream {
        MockStream::default()
    }

    /// A stream that will replay `vec` to the reader
    pub fn with_vec(vec: Vec<u8>) -> MockStream {
        MockStream {
            reader: Arc::new(Mutex::new(MockCursor::new(vec))),
            writer: Arc::new(Mutex::new(MockCursor::new(Vec::new()))),
        }
    }

    /// Drains and returns everything written so far
    pub fn take_vec(&mut self) -> Vec<u8> {
        let mut cursor = self.writer.lock().unwrap();
        let vec = cursor.get_ref().to_vec();
        cursor.set_position(0);
        cursor.get_mut().clear();
        vec
    }
}

impl Write for MockStream {
    fn write(&mut self, msg: &[u8]) -> io::Result<usize> {
        self.writer.lock().unwrap().write(msg)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.lock().unwrap().flush()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.lock().unwrap().read(buf)
    }
}
