//! File and line-reader interface contracts (§6.4).
//!
//! Consumed, not specified, by the spec: these are trait shapes a host
//! embedding this crate implements for its own file/stream types, so that
//! `iface.rs`'s `FILE`/`FILE_READER`/`FILE_WRITER`/`LINE_READER` interface
//! slots have something concrete to point at. No concrete file-backed
//! implementation lives in this crate — that's environment-specific
//! (real fds, in-memory `StringIO`, etc.) and out of scope here.

use crate::status::Status;

pub trait File {
    fn open(&mut self, filename: &str, flags: i32, mode: u32) -> Result<(), Status>;
    fn close(&mut self) -> Result<(), Status>;
    fn set_fd(&mut self, fd: i32);
    fn get_name(&self) -> &str;
    fn set_name(&mut self, name: &str) -> Result<(), Status>;
}

pub trait FileReader {
    /// Reads up to `buffer.len()` bytes, returning the number read.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Status>;
}

pub trait FileWriter {
    /// Writes `data`, returning the number of bytes written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Status>;
}

pub trait LineReader {
    fn start(&mut self) -> Result<(), Status>;
    fn read_line(&mut self) -> Result<Option<String>, Status>;
    /// Reads the next line into `buf`, reusing its allocation. Returns
    /// `false` on EOF.
    fn read_line_in_place(&mut self, buf: &mut String) -> Result<bool, Status>;
    /// One-line pushback; a second call before the next `read_line`
    /// fails with `PUSHBACK_FAILED`.
    fn unread_line(&mut self) -> Result<(), Status>;
    fn line_number(&self) -> u64;
    fn stop(&mut self) -> Result<(), Status>;
}
