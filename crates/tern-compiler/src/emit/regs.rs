//! Virtual register pool.
//!
//! Registers are handed out with an acquire/release protocol:
//! [`Registers::prepare_free`] makes room for a new register, spilling the
//! oldest live registers the caller does not need, [`Registers::alloc`] binds
//! it, and [`Registers::dealloc_restore`] releases it and pops whatever was
//! spilled for it. Acquisitions nest strictly; the code generator wraps each
//! one in a guard so the release runs on every exit path.

use tern_core::RegClass;
use tracing::trace;

use super::EmitError;
use super::backend::{Backend, Reg};

/// Registers pushed to make room for one allocation.
#[derive(Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct Spill {
    regs: Vec<(Reg, RegClass)>,
}

impl Spill {
    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }
}

/// The register pool of one method.
#[derive(Debug)]
pub struct Registers {
    in_use: Vec<bool>,
    /// Live registers, oldest first.
    live: Vec<(Reg, RegClass)>,
    pointer_bytes: u32,
    allocs: u32,
    deallocs: u32,
    /// Registers currently spilled to the stack.
    spilled: u32,
    violations: u32,
}

impl Registers {
    pub fn new(count: u16, pointer_bytes: u32) -> Self {
        Self {
            in_use: vec![false; count as usize],
            live: Vec::new(),
            pointer_bytes,
            allocs: 0,
            deallocs: 0,
            spilled: 0,
            violations: 0,
        }
    }

    /// Slots a value of `class` occupies.
    pub fn slots_for(&self, class: RegClass) -> u8 {
        match class {
            RegClass::DoublePtr => 2,
            RegClass::Long | RegClass::Double if self.pointer_bytes == 4 => 2,
            _ => 1,
        }
    }

    /// Make room for a register of `class`, spilling live registers other
    /// than those in `keep`.
    pub fn prepare_free<B: Backend>(
        &mut self,
        backend: &mut B,
        class: RegClass,
        keep: &[Reg],
    ) -> Result<Spill, EmitError> {
        let slots = self.slots_for(class);
        let mut spill = Spill::default();
        while self.find_free(slots).is_none() {
            let Some(pos) = self.live.iter().position(|(reg, _)| !keep.contains(reg)) else {
                return Err(EmitError::RegistersExhausted {
                    live: self.live.len(),
                });
            };
            let (reg, reg_class) = self.live.remove(pos);
            trace!(%reg, "spilling register");
            backend.gen_push(reg, reg_class);
            self.mark(reg, false);
            self.spilled += 1;
            spill.regs.push((reg, reg_class));
        }
        Ok(spill)
    }

    /// Bind a free register of `class`. Call [`Registers::prepare_free`] first.
    pub fn alloc(&mut self, class: RegClass) -> Result<Reg, EmitError> {
        let slots = self.slots_for(class);
        let index = self.find_free(slots).ok_or(EmitError::RegistersExhausted {
            live: self.live.len(),
        })?;
        let reg = Reg { index, slots };
        self.mark(reg, true);
        self.live.push((reg, class));
        self.allocs += 1;
        Ok(reg)
    }

    pub fn dealloc(&mut self, reg: Reg) {
        match self.live.iter().rposition(|(live, _)| *live == reg) {
            Some(pos) => {
                self.live.remove(pos);
                self.mark(reg, false);
                self.deallocs += 1;
            }
            None => self.violations += 1,
        }
    }

    /// Pop the registers `spill` pushed, newest first.
    pub fn restore<B: Backend>(&mut self, backend: &mut B, spill: Spill) {
        for (reg, class) in spill.regs.into_iter().rev() {
            if self.overlaps_live(reg) {
                self.violations += 1;
            }
            backend.gen_pop(reg, class);
            self.mark(reg, true);
            // spilled registers are older than anything allocated since
            self.live.insert(0, (reg, class));
            self.spilled = self.spilled.saturating_sub(1);
        }
    }

    pub fn dealloc_restore<B: Backend>(&mut self, backend: &mut B, reg: Reg, spill: Spill) {
        self.dealloc(reg);
        self.restore(backend, spill);
    }

    /// Push every live register except `keep`, for a call that clobbers them.
    pub fn spill_all<B: Backend>(&mut self, backend: &mut B, keep: &[Reg]) -> Spill {
        let mut spill = Spill::default();
        let mut kept = Vec::with_capacity(self.live.len());
        for (reg, class) in std::mem::take(&mut self.live) {
            if keep.contains(&reg) {
                kept.push((reg, class));
                continue;
            }
            backend.gen_push(reg, class);
            self.mark(reg, false);
            self.spilled += 1;
            spill.regs.push((reg, class));
        }
        self.live = kept;
        spill
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, reg: Reg) -> bool {
        self.live.iter().any(|(live, _)| *live == reg)
    }

    pub fn alloc_count(&self) -> u32 {
        self.allocs
    }

    /// Every acquire was released and every spill restored.
    pub fn check_balanced(&self) -> Result<(), EmitError> {
        if self.allocs != self.deallocs
            || !self.live.is_empty()
            || self.spilled != 0
            || self.violations != 0
        {
            return Err(EmitError::UnbalancedRegisters {
                allocs: self.allocs,
                deallocs: self.deallocs,
                live: self.live.len(),
                violations: self.violations,
            });
        }
        Ok(())
    }

    fn find_free(&self, slots: u8) -> Option<u16> {
        let slots = slots as usize;
        (0..self.in_use.len().saturating_sub(slots - 1))
            .find(|start| self.in_use[*start..*start + slots].iter().all(|used| !used))
            .map(|start| start as u16)
    }

    fn overlaps_live(&self, reg: Reg) -> bool {
        let span = reg.index as usize..(reg.index + reg.slots as u16) as usize;
        span.into_iter().any(|slot| self.in_use.get(slot).copied().unwrap_or(true))
    }

    fn mark(&mut self, reg: Reg, used: bool) {
        let start = reg.index as usize;
        for slot in start..start + reg.slots as usize {
            if let Some(flag) = self.in_use.get_mut(slot) {
                *flag = used;
            }
        }
    }
}
