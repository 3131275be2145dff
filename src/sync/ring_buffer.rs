use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use embedded_hal::serial;

const BITS_PER_BYTE: u64 = 10;

/// Bytes a UART at `baudrate` delivers within `micros`, rounded up
pub fn burst_size(baudrate: u32, micros: u32) -> usize {
    let bits = baudrate as u64 * micros as u64;
    let denominator = BITS_PER_BYTE * 1_000_000;
    ((bits + denominator - 1) / denominator) as usize
}

/// Single producer single consumer byte queue.
///
/// Indexes run over `0..2N` so that full and empty stay distinguishable
/// without sacrificing a slot. When full the newest byte is dropped and
/// counted.
pub struct ByteRing<const N: usize> {
    buffer: UnsafeCell<[u8; N]>,
    write: AtomicUsize,
    read: AtomicUsize,
    overflows: AtomicUsize,
}

unsafe impl<const N: usize> Sync for ByteRing<N> {}

impl<const N: usize> Default for ByteRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteRing<N> {
    pub const fn new() -> Self {
        Self {
            buffer: UnsafeCell::new([0u8; N]),
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            overflows: AtomicUsize::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Whether the bytes received between two loop iterations fit in
    pub fn fits_burst(&self, baudrate: u32, loop_micros: u32) -> bool {
        burst_size(baudrate, loop_micros) <= N
    }

    fn advance(index: usize) -> usize {
        (index + 1) % (2 * N)
    }

    fn distance(write: usize, read: usize) -> usize {
        (write + 2 * N - read) % (2 * N)
    }

    pub fn len(&self) -> usize {
        if N == 0 {
            return 0;
        }
        Self::distance(self.write.load(Ordering::Acquire), self.read.load(Ordering::Acquire))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes dropped because the consumer fell behind
    pub fn overflows(&self) -> usize {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Producer side, returns false when the byte got dropped
    pub fn push(&self, byte: u8) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        if N == 0 || Self::distance(write, self.read.load(Ordering::Acquire)) >= N {
            self.overflows.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let buffer = unsafe { &mut *self.buffer.get() };
        buffer[write % N] = byte;
        self.write.store(Self::advance(write), Ordering::Release);
        true
    }

    /// Consumer side
    pub fn pop(&self) -> Option<u8> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }
        let buffer = unsafe { &*self.buffer.get() };
        let byte = buffer[read % N];
        self.read.store(Self::advance(read), Ordering::Release);
        Some(byte)
    }

    /// Moves whatever the serial receiver holds into the ring,
    /// meant to be called from the receive interrupt
    pub fn fill_from<R: serial::Read<u8>>(&self, reader: &mut R) -> usize {
        let mut count = 0;
        loop {
            match reader.read() {
                Ok(byte) => {
                    self.push(byte);
                    count += 1;
                }
                Err(nb::Error::WouldBlock) => return count,
                Err(nb::Error::Other(_)) => {
                    trace!("Serial receive error");
                    return count;
                }
            }
        }
    }
}

mod test {
    #[test]
    fn test_ring_buffer() {
        use super::ByteRing;

        let ring: ByteRing<4> = ByteRing::new();
        assert_eq!(ring.pop(), None);

        for round in 0..10u8 {
            assert!(ring.push(round));
            assert!(ring.push(round + 100));
            assert_eq!(ring.len(), 2);
            assert_eq!(ring.pop(), Some(round));
            assert_eq!(ring.pop(), Some(round + 100));
            assert!(ring.is_empty());
        }
        assert_eq!(ring.overflows(), 0);
    }

    #[test]
    fn test_overflow() {
        use super::ByteRing;

        let ring: ByteRing<4> = ByteRing::new();
        for byte in b"$GPRMC".iter() {
            ring.push(*byte);
        }
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.overflows(), 2);
        let drained: Vec<u8> = core::iter::from_fn(|| ring.pop()).collect();
        assert_eq!(drained, b"$GPR".to_vec());

        let ring: ByteRing<0> = ByteRing::new();
        assert!(!ring.push(0));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_fill_from() {
        use embedded_hal::serial::Read;

        use super::ByteRing;

        struct Uart<'a>(&'a [u8]);

        impl<'a> Read<u8> for Uart<'a> {
            type Error = ();

            fn read(&mut self) -> nb::Result<u8, ()> {
                let (&first, rest) = self.0.split_first().ok_or(nb::Error::WouldBlock)?;
                self.0 = rest;
                Ok(first)
            }
        }

        let ring: ByteRing<8> = ByteRing::new();
        assert_eq!(ring.fill_from(&mut Uart(b"$GP")), 3);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pop(), Some(b'$'));
    }

    #[test]
    fn test_burst() {
        use super::{burst_size, ByteRing};

        assert_eq!(burst_size(38400, 1000), 4);
        assert_eq!(burst_size(9600, 1000), 1);
        assert_eq!(burst_size(115200, 10_000), 116);
        let ring: ByteRing<4> = ByteRing::new();
        assert!(ring.fits_burst(38400, 1000));
        assert!(!ring.fits_burst(115200, 1000));
    }
}
