pub mod ring_buffer;

use core::cell::Cell;

use critical_section::Mutex;

/// Value shared between the main loop and interrupt handlers,
/// every access happens inside one critical section
pub struct Shared<T>(Mutex<Cell<T>>);

impl<T: Copy + Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy> Shared<T> {
    pub const fn new(value: T) -> Self {
        Self(Mutex::new(Cell::new(value)))
    }

    pub fn get(&self) -> T {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }

    pub fn set(&self, value: T) {
        critical_section::with(|cs| self.0.borrow(cs).set(value))
    }

    /// Read-modify-write as a whole, returns the new value
    pub fn update<F: FnOnce(T) -> T>(&self, f: F) -> T {
        critical_section::with(|cs| {
            let cell = self.0.borrow(cs);
            let value = f(cell.get());
            cell.set(value);
            value
        })
    }
}

mod test {
    #[test]
    fn test_shared() {
        use super::Shared;

        let shared: Shared<(i16, i16)> = Shared::default();
        shared.set((1, 2));
        assert_eq!(shared.update(|(x, y)| (x + 1, y - 1)), (2, 1));
        assert_eq!(shared.get(), (2, 1));
    }
}
