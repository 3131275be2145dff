use core::cell::RefCell;
use core::fmt::{self, Display, Formatter, Write};

use critical_section::Mutex;
use log::{LevelFilter, Log, Metadata, Record};

/// Keeps the most recent log text, older text is overwritten
pub struct LogBuffer {
    buffer: &'static mut [u8],
    index: usize,
}

impl LogBuffer {
    pub fn new(buffer: &'static mut [u8]) -> Self {
        Self { buffer, index: 0 }
    }

    /// Buffered bytes, oldest first
    pub fn bytes(&self) -> impl Iterator<Item = &u8> {
        let size = self.buffer.len();
        let (older, newer) = match self.index {
            index if index <= size => (&self.buffer[..index], &self.buffer[..0]),
            index => {
                let (newer, older) = self.buffer.split_at(index % size);
                (older, newer)
            }
        };
        older.iter().chain(newer.iter())
    }
}

impl Write for LogBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let size = self.buffer.len();
        if size == 0 {
            return Ok(());
        }
        let mut bytes = s.as_bytes();
        if bytes.len() > size {
            self.index += bytes.len() - size;
            bytes = &bytes[bytes.len() - size..];
        }
        let index = self.index % size;
        let partial_size = core::cmp::min(size - index, bytes.len());
        self.buffer[index..index + partial_size].copy_from_slice(&bytes[..partial_size]);
        self.buffer[..bytes.len() - partial_size].copy_from_slice(&bytes[partial_size..]);
        self.index += bytes.len();
        Ok(())
    }
}

impl Display for LogBuffer {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.bytes().try_for_each(|&byte| f.write_char(byte as char))
    }
}

static LOG_BUFFER: Mutex<RefCell<Option<LogBuffer>>> = Mutex::new(RefCell::new(None));

pub struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        critical_section::with(|cs| {
            if let Some(buffer) = LOG_BUFFER.borrow_ref_mut(cs).as_mut() {
                writeln!(buffer, "[{:5}] {}", record.level(), record.args()).ok();
            }
        })
    }

    fn flush(&self) {}
}

/// Copies buffered log text, oldest first, returns the number of bytes copied
pub fn read(out: &mut [u8]) -> usize {
    critical_section::with(|cs| {
        let log_buffer = LOG_BUFFER.borrow_ref(cs);
        let bytes = log_buffer.iter().flat_map(|buffer| buffer.bytes());
        let mut size = 0;
        for (slot, &byte) in out.iter_mut().zip(bytes) {
            *slot = byte;
            size += 1;
        }
        size
    })
}

pub fn init(buffer: &'static mut [u8], level: LevelFilter) {
    critical_section::with(|cs| LOG_BUFFER.borrow_ref_mut(cs).replace(LogBuffer::new(buffer)));
    log::set_max_level(level);
    log::set_logger(&Logger).ok();
}

mod test {
    #[test]
    fn test_log_buffer() {
        use core::fmt::Write;

        use super::LogBuffer;

        let mut buffer = LogBuffer::new(Box::leak(Box::new([0u8; 8])));
        write!(buffer, "abc").unwrap();
        assert_eq!(buffer.to_string(), "abc");
        write!(buffer, "defgh").unwrap();
        assert_eq!(buffer.to_string(), "abcdefgh");
        write!(buffer, "ij").unwrap();
        assert_eq!(buffer.to_string(), "cdefghij");
        write!(buffer, "0123456789").unwrap();
        assert_eq!(buffer.to_string(), "23456789");

        let mut empty = LogBuffer::new(Box::leak(Box::new([0u8; 0])));
        write!(empty, "abc").unwrap();
        assert_eq!(empty.to_string(), "");
    }

    #[test]
    #[serial_test::serial]
    fn test_logger() {
        use log::LevelFilter;

        super::init(Box::leak(Box::new([0u8; 4096])), LevelFilter::Info);
        info!("optical flow sensor ready");
        debug!("filtered out");

        let mut out = [0u8; 4096];
        let size = super::read(&mut out);
        let text = core::str::from_utf8(&out[..size]).unwrap();
        assert!(text.contains("[INFO ] optical flow sensor ready\n"));
        assert!(!text.contains("filtered out"));
    }
}
