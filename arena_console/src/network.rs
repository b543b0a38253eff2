use std::io::{self, Read, Write};

use arena_chess::wire::{Frame, FrameReader};


pub fn write_frame(writer: &mut impl Write, frame: &Frame) -> io::Result<()> {
    writer.write_all(&frame.encode())?;
    writer.flush()
}

pub enum ReadEvent {
    Frame(Frame),
    Closed,
}

// Blocking frame reader over a raw byte stream.
pub struct FrameStream<R: Read> {
    reader: R,
    frames: FrameReader,
    buf: [u8; 4096],
}

impl<R: Read> FrameStream<R> {
    pub fn new(reader: R) -> Self {
        FrameStream { reader, frames: FrameReader::new(), buf: [0; 4096] }
    }

    pub fn next_event(&mut self) -> anyhow::Result<ReadEvent> {
        loop {
            if let Some(frame) = self.frames.next_frame()? {
                return Ok(ReadEvent::Frame(frame));
            }
            let n = self.reader.read(&mut self.buf)?;
            if n == 0 {
                return Ok(ReadEvent::Closed);
            }
            self.frames.push(&self.buf[..n]);
        }
    }
}
