use core::{
    fmt::{self, Display, Formatter, Write},
    str::from_utf8_unchecked,
    sync::atomic::{AtomicUsize, Ordering},
};

use log::{Log, Metadata, Record};

use crate::sys::clock::MsClock;

/// Ring buffer retaining the most recent log output. Written from the
/// main-loop context only; [`Display`] dumps the retained text oldest first.
#[derive(Default)]
pub struct LogBuffer {
    buffer: &'static mut [u8],
    index: AtomicUsize,
}

impl Write for LogBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let size = self.buffer.len();
        if size == 0 {
            return Ok(());
        }
        let mut bytes = s.as_bytes();
        if bytes.len() > size {
            bytes = &bytes[..size];
        }
        let index = self.index.fetch_add(bytes.len(), Ordering::Relaxed) % size;
        if index + bytes.len() <= size {
            self.buffer[index..index + bytes.len()].copy_from_slice(bytes);
        } else {
            let partial = size - index;
            self.buffer[index..].copy_from_slice(&bytes[..partial]);
            self.buffer[..bytes.len() - partial].copy_from_slice(&bytes[partial..]);
        }
        Ok(())
    }
}

impl Display for LogBuffer {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let index = self.index.load(Ordering::Relaxed);
        if index <= self.buffer.len() {
            return write!(f, "{}", unsafe { from_utf8_unchecked(&self.buffer[..index]) });
        }
        let index = index % self.buffer.len();
        write!(f, "{}", unsafe { from_utf8_unchecked(&self.buffer[index..]) })?;
        write!(f, "{}", unsafe { from_utf8_unchecked(&self.buffer[..index]) })
    }
}

static mut LOG_BUFFER: LogBuffer = LogBuffer { buffer: &mut [], index: AtomicUsize::new(0) };
static mut CLOCK: Option<&'static MsClock> = None;

pub struct Logger;

impl Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let millis = unsafe { CLOCK }.map(|clock| clock.now()).unwrap_or(0);
        let log_buffer = unsafe { &mut *core::ptr::addr_of_mut!(LOG_BUFFER) };
        writeln!(
            log_buffer,
            "[{:2}.{:03}] {} {}",
            millis / 1000,
            millis % 1000,
            record.level(),
            record.args()
        )
        .ok();
    }

    fn flush(&self) {}
}

pub fn get() -> &'static LogBuffer {
    unsafe { &*core::ptr::addr_of!(LOG_BUFFER) }
}

pub fn init(buffer: &'static mut [u8], clock: &'static MsClock) {
    unsafe {
        LOG_BUFFER = LogBuffer { buffer, ..Default::default() };
        CLOCK = Some(clock);
    }
    log::set_max_level(log::LevelFilter::Trace);
    log::set_logger(&Logger).ok();
}

mod test {
    #[test]
    fn test_ring_buffer_retention() {
        use core::fmt::Write;
        use std::{boxed::Box, string::ToString, vec};

        use super::LogBuffer;

        let buffer: &'static mut [u8] = Box::leak(vec![0u8; 32].into_boxed_slice());
        let mut log_buffer = LogBuffer { buffer, ..Default::default() };

        write!(log_buffer, "first ").unwrap();
        write!(log_buffer, "second").unwrap();
        assert_eq!("first second", log_buffer.to_string());

        // overflow drops the oldest bytes
        write!(log_buffer, " and then a tail overflowing it").unwrap();
        let dump = log_buffer.to_string();
        assert_eq!(32, dump.len());
        assert!(dump.ends_with("overflowing it"), "{}", dump);
    }
}
