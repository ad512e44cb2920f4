use crate::error::ExecError;
use crate::value::{Cell, Value};
use num_traits::ToPrimitive;

/// Index of a heap cell.
pub type Address = usize;

/// Flat, growable cell storage.
///
/// Cell 0 is the null sentinel; it exists so that no allocation ever starts at
/// address 0, and any access to it is rejected.
#[derive(Debug, Clone)]
pub struct Heap {
    cells: Vec<Cell>,
}

impl Default for Heap {
    fn default() -> Self {
        Self {
            cells: vec![Cell::Uninit],
        }
    }
}

impl Heap {
    /// Upper bound on the number of cells, null sentinel included.
    pub const MAX_CELLS: usize = 1 << 22;

    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `count` uninitialized cells (at least one) and returns the first index.
    ///
    /// Fails with [`ExecError::OutOfMemory`] if the heap would grow past
    /// [`Heap::MAX_CELLS`]; the heap is left unchanged.
    pub fn allocate(&mut self, count: usize) -> Result<Address, ExecError> {
        let base = self.cells.len();
        let end = base
            .checked_add(count.max(1))
            .filter(|end| *end <= Self::MAX_CELLS)
            .ok_or(ExecError::OutOfMemory {
                requested: count,
                size: base,
                limit: Self::MAX_CELLS,
            })?;
        self.cells.resize(end, Cell::Uninit);
        Ok(base)
    }

    /// Converts a pointer value into a valid cell index.
    pub fn checked(&self, raw: i64) -> Result<Address, ExecError> {
        if raw == 0 {
            return Err(ExecError::NullAccess);
        }
        raw.to_usize()
            .filter(|address| *address < self.cells.len())
            .ok_or(ExecError::Bounds {
                address: raw,
                size: self.cells.len(),
            })
    }

    pub fn read(&self, address: Address) -> Result<&Cell, ExecError> {
        let address = self.check(address)?;
        Ok(&self.cells[address])
    }

    pub fn write(&mut self, address: Address, value: Value) -> Result<(), ExecError> {
        let address = self.check(address)?;
        self.cells[address] = Cell::Value(value);
        Ok(())
    }

    /// Number of cells, including the null sentinel.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.len() <= 1
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn check(&self, address: Address) -> Result<Address, ExecError> {
        match address {
            0 => Err(ExecError::NullAccess),
            a if a >= self.cells.len() => Err(ExecError::Bounds {
                address: a.to_i64().unwrap_or(i64::MAX),
                size: self.cells.len(),
            }),
            a => Ok(a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_round_trip() {
        let mut heap = Heap::new();
        let base = heap.allocate(4).unwrap();
        assert_eq!(base, 1);

        for i in 0..4 {
            assert_eq!(heap.read(base + i).unwrap(), &Cell::Uninit);
        }
        for i in 0..4 {
            heap.write(base + i, Value::Int(i as i64 * 10)).unwrap();
        }
        for i in 0..4 {
            assert_eq!(heap.read(base + i).unwrap(), &Cell::Value(Value::Int(i as i64 * 10)));
        }
    }

    #[test]
    fn test_allocate_minimum_one_cell() {
        let mut heap = Heap::new();
        let first = heap.allocate(0).unwrap();
        let second = heap.allocate(1).unwrap();
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_null_access() {
        let mut heap = Heap::new();
        heap.allocate(1).unwrap();
        assert_eq!(heap.read(0), Err(ExecError::NullAccess));
        assert_eq!(heap.write(0, Value::Int(1)), Err(ExecError::NullAccess));
        assert_eq!(heap.checked(0), Err(ExecError::NullAccess));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut heap = Heap::new();
        heap.allocate(2).unwrap();
        assert!(matches!(heap.read(3), Err(ExecError::Bounds { address: 3, size: 3 })));
        assert!(matches!(heap.checked(-2), Err(ExecError::Bounds { address: -2, .. })));
        assert_eq!(heap.checked(2), Ok(2));
    }

    #[test]
    fn test_allocation_limit() {
        let mut heap = Heap::new();
        assert!(matches!(
            heap.allocate(usize::MAX).map_err(|err| (err.is_fatal(), err)),
            Err((true, ExecError::OutOfMemory { requested: usize::MAX, size: 1, .. }))
        ));
        assert!(matches!(
            heap.allocate(Heap::MAX_CELLS),
            Err(ExecError::OutOfMemory { .. })
        ));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.allocate(3), Ok(1));
    }
}
