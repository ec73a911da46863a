//! State shared by the three numeric contexts.
//!
//! A [`ContextCore`] owns one kind's handle pool and talks to the binding.
//! Every value creation goes through [`ContextCore::produce`]: allocate,
//! fill, register. A structure whose fill fails is released on the spot
//! and never becomes visible.

use crate::error::{CalcError, CalcResult};
use crate::pool::{Handle, HandlePool};
use crate::registry::SharedRecord;
use crate::value::ValueKind;
use calcnum_binding::{Binding, Ptr, read_cstr};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

pub(crate) type SharedBinding = Rc<RefCell<dyn Binding>>;

pub(crate) struct ContextCore {
    kind: ValueKind,
    binding: SharedBinding,
    pool: RefCell<HandlePool>,
    record: Rc<SharedRecord>,
}

impl ContextCore {
    pub fn new(kind: ValueKind, binding: SharedBinding, record: Rc<SharedRecord>) -> Self {
        tracing::debug!(%kind, "numeric context created");
        Self {
            kind,
            binding,
            pool: RefCell::new(HandlePool::default()),
            record,
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn record(&self) -> &SharedRecord {
        &self.record
    }

    pub fn binding(&self) -> Ref<'_, dyn Binding + 'static> {
        self.binding.borrow()
    }

    pub fn binding_mut(&self) -> RefMut<'_, dyn Binding + 'static> {
        self.binding.borrow_mut()
    }

    pub fn shares_binding(&self, other: &ContextCore) -> bool {
        Rc::ptr_eq(&self.binding, &other.binding)
    }

    /// Fail with [`CalcError::ForeignValue`] unless both contexts sit on
    /// the same binding.
    pub fn check_binding(&self, other: &ContextCore) -> CalcResult<()> {
        if self.shares_binding(other) {
            Ok(())
        } else {
            Err(CalcError::ForeignValue)
        }
    }

    pub fn resolve(&self, handle: Handle) -> CalcResult<Ptr> {
        self.pool
            .borrow()
            .get(handle)
            .ok_or(CalcError::UseAfterRelease { kind: self.kind })
    }

    /// Handles currently registered.
    pub fn live(&self) -> usize {
        self.pool.borrow().len()
    }

    /// Create an integer or rational structure.
    pub fn produce(
        &self,
        fill: impl FnOnce(&mut dyn Binding, Ptr) -> CalcResult<()>,
    ) -> CalcResult<Handle> {
        self.produce_with(0, fill)
    }

    /// Create a float structure of `precision` bits.
    pub fn produce_float(
        &self,
        precision: u32,
        fill: impl FnOnce(&mut dyn Binding, Ptr) -> CalcResult<()>,
    ) -> CalcResult<Handle> {
        self.produce_with(precision, fill)
    }

    fn produce_with(
        &self,
        precision: u32,
        fill: impl FnOnce(&mut dyn Binding, Ptr) -> CalcResult<()>,
    ) -> CalcResult<Handle> {
        let ptr = {
            let mut binding = self.binding.borrow_mut();
            let ptr = self.allocate(&mut *binding, precision)?;
            if let Err(err) = fill(&mut *binding, ptr) {
                self.release(&mut *binding, ptr);
                return Err(err);
            }
            ptr
        };
        let handle = self.pool.borrow_mut().insert(ptr);
        tracing::trace!(kind = %self.kind, ptr, index = handle.index(), "handle registered");
        Ok(handle)
    }

    fn allocate(&self, binding: &mut dyn Binding, precision: u32) -> CalcResult<Ptr> {
        let ptr = match self.kind {
            ValueKind::Integer => binding.mpz_t(),
            ValueKind::Rational => binding.mpq_t(),
            ValueKind::Float => binding.mpfr_t(),
        }
        .map_err(CalcError::allocation)?;
        match self.kind {
            ValueKind::Integer => binding.mpz_init(ptr),
            ValueKind::Rational => binding.mpq_init(ptr),
            ValueKind::Float => binding.mpfr_init2(ptr, precision),
        }
        Ok(ptr)
    }

    fn release(&self, binding: &mut dyn Binding, ptr: Ptr) {
        match self.kind {
            ValueKind::Integer => {
                binding.mpz_clear(ptr);
                binding.mpz_t_free(ptr);
            }
            ValueKind::Rational => {
                binding.mpq_clear(ptr);
                binding.mpq_t_free(ptr);
            }
            ValueKind::Float => {
                binding.mpfr_clear(ptr);
                binding.mpfr_t_free(ptr);
            }
        }
    }

    /// Run `op`. If it fails, whatever it registered in this context is
    /// released again, leaving the pool as it was before the call.
    pub fn atomically<T>(&self, op: impl FnOnce() -> CalcResult<T>) -> CalcResult<T> {
        let (mark, generation) = {
            let pool = self.pool.borrow();
            (pool.len(), pool.generation())
        };
        let result = op();
        if result.is_err() {
            let stale = {
                let mut pool = self.pool.borrow_mut();
                if pool.generation() == generation {
                    pool.truncate(mark)
                } else {
                    Vec::new()
                }
            };
            if !stale.is_empty() {
                let mut binding = self.binding.borrow_mut();
                for &ptr in &stale {
                    self.release(&mut *binding, ptr);
                }
                tracing::trace!(
                    kind = %self.kind,
                    released = stale.len(),
                    "failed operation rolled back"
                );
            }
        }
        result
    }

    /// Release every registered structure in creation order. Returns how
    /// many were released; a second call releases nothing.
    pub fn destroy(&self) -> usize {
        let ptrs = self.pool.borrow_mut().drain();
        let mut binding = self.binding.borrow_mut();
        for &ptr in &ptrs {
            self.release(&mut *binding, ptr);
        }
        tracing::debug!(kind = %self.kind, released = ptrs.len(), "context destroyed");
        ptrs.len()
    }
}

impl Drop for ContextCore {
    fn drop(&mut self) {
        let ptrs = self.pool.get_mut().drain();
        if ptrs.is_empty() {
            return;
        }
        let Ok(mut binding) = self.binding.try_borrow_mut() else {
            tracing::warn!(
                kind = %self.kind,
                leaked = ptrs.len(),
                "binding busy, handles not released"
            );
            return;
        };
        for &ptr in &ptrs {
            self.release(&mut *binding, ptr);
        }
        tracing::debug!(
            kind = %self.kind,
            released = ptrs.len(),
            "context dropped with live handles"
        );
    }
}

/// Decode and free a string buffer returned by a `*_get_str` primitive.
pub(crate) fn take_cstr(binding: &mut dyn Binding, ptr: Ptr) -> CalcResult<String> {
    let text = read_cstr(binding, ptr);
    binding.free(ptr);
    text.map_err(CalcError::Native)
}

/// Copy `text` into native memory, run `f` on it, and free it again.
pub(crate) fn with_cstr<T>(
    binding: &mut dyn Binding,
    text: &str,
    f: impl FnOnce(&mut dyn Binding, Ptr) -> T,
) -> CalcResult<T> {
    let ptr = calcnum_binding::write_cstr(binding, text).map_err(CalcError::allocation)?;
    let out = f(binding, ptr);
    binding.free(ptr);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcnum_soft::SoftBinding;

    fn integer_core(binding: &Rc<RefCell<SoftBinding>>) -> ContextCore {
        let shared: SharedBinding = binding.clone();
        ContextCore::new(ValueKind::Integer, shared, Rc::new(SharedRecord::default()))
    }

    #[test]
    fn failed_fill_leaves_nothing_behind() {
        let binding = Rc::new(RefCell::new(SoftBinding::new()));
        let core = integer_core(&binding);
        let err = core.produce(|_, _| Err(CalcError::DivisionByZero)).unwrap_err();
        assert!(matches!(err, CalcError::DivisionByZero));
        assert_eq!(core.live(), 0);
        assert_eq!(binding.borrow().live_allocations(), 0);
        assert_eq!(binding.borrow().live_integers(), 0);
    }

    #[test]
    fn text_buffers_are_freed() {
        let binding = Rc::new(RefCell::new(SoftBinding::new()));
        let core = integer_core(&binding);
        let handle = core
            .produce(|b, rop| {
                assert_eq!(with_cstr(b, "-99", |b, s| b.mpz_set_str(rop, s, 10))?, 0);
                Ok(())
            })
            .unwrap();
        let ptr = core.resolve(handle).unwrap();
        let mut b = binding.borrow_mut();
        let s = b.mpz_get_str(16, ptr).unwrap();
        assert_eq!(take_cstr(&mut *b, s).unwrap(), "-63");
        assert_eq!(b.live_allocations(), 1);
    }

    #[test]
    fn drop_releases_what_destroy_did_not() {
        let binding = Rc::new(RefCell::new(SoftBinding::new()));
        let core = integer_core(&binding);
        let first = core.produce(|_, _| Ok(())).unwrap();
        assert_eq!(core.destroy(), 1);
        assert!(matches!(
            core.resolve(first),
            Err(CalcError::UseAfterRelease { kind: ValueKind::Integer })
        ));
        core.produce(|_, _| Ok(())).unwrap();
        core.produce(|_, _| Ok(())).unwrap();
        assert_eq!(binding.borrow().live_allocations(), 2);
        drop(core);
        assert_eq!(binding.borrow().live_allocations(), 0);
    }

    #[test]
    fn failed_atomic_operations_roll_back() {
        let binding = Rc::new(RefCell::new(SoftBinding::new()));
        let core = integer_core(&binding);
        let kept = core.produce(|_, _| Ok(())).unwrap();
        let err = core
            .atomically(|| {
                core.produce(|_, _| Ok(()))?;
                core.produce(|_, _| Ok(()))?;
                Err::<(), _>(CalcError::DivisionByZero)
            })
            .unwrap_err();
        assert!(matches!(err, CalcError::DivisionByZero));
        assert_eq!(core.live(), 1);
        assert_eq!(binding.borrow().live_integers(), 1);
        assert!(core.resolve(kept).is_ok());

        let made = core.atomically(|| core.produce(|_, _| Ok(()))).unwrap();
        assert!(core.resolve(made).is_ok());
        assert_eq!(core.live(), 2);

        // A destroy inside the operation leaves nothing to roll back.
        let err = core.atomically(|| {
            core.destroy();
            core.produce(|_, _| Err::<(), _>(CalcError::DivisionByZero))
        });
        assert!(err.is_err());
        assert_eq!(core.live(), 0);
        assert_eq!(binding.borrow().live_allocations(), 0);
    }
}
