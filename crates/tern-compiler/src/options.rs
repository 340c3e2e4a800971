//! Compiler configuration.
//!
//! [`CompileOptions`] carries the switches that change generated code
//! (runtime checks, assertions, dynamic addressing); [`ArchConstants`]
//! carries the target facts the code generator needs.

use tern_core::{DataType, RegClass};

/// Switches that change what the code generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Check array indices against the stored length.
    pub array_bound_checks: bool,
    /// Check receivers and arrays for null before dereferencing.
    pub null_checks: bool,
    /// Check downcasts at runtime.
    pub runtime_cast_checks: bool,
    /// Emit code for `assert` statements.
    pub assertions: bool,
    /// Static data is addressed relative to a class-context register that
    /// must be saved around calls.
    pub dynamic_addressing: bool,
    /// Deepest expression or statement nesting accepted.
    pub max_nesting_depth: usize,
    /// Report the first warning of a method as an error.
    pub warnings_as_errors: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            array_bound_checks: true,
            null_checks: true,
            runtime_cast_checks: true,
            assertions: false,
            dynamic_addressing: false,
            max_nesting_depth: 256,
            warnings_as_errors: false,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_array_bound_checks(mut self, enabled: bool) -> Self {
        self.array_bound_checks = enabled;
        self
    }

    pub fn with_null_checks(mut self, enabled: bool) -> Self {
        self.null_checks = enabled;
        self
    }

    pub fn with_runtime_cast_checks(mut self, enabled: bool) -> Self {
        self.runtime_cast_checks = enabled;
        self
    }

    pub fn with_assertions(mut self, enabled: bool) -> Self {
        self.assertions = enabled;
        self
    }

    pub fn with_dynamic_addressing(mut self, enabled: bool) -> Self {
        self.dynamic_addressing = enabled;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }
}

/// Target facts used by the code generator.
///
/// Arrays are laid out as `[type pointer][int length][elements]`, with the
/// element area aligned to the element size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchConstants {
    pub pointer_bytes: u32,
    /// Registers available to the expression generator.
    pub register_count: u16,
    /// Frame sizes are rounded up with this mask.
    pub stack_align_mask: u32,
    /// Words of one stack-resident throw frame.
    pub throw_frame_words: u32,
}

impl ArchConstants {
    /// 32-bit x86.
    pub const fn ia32() -> Self {
        Self {
            pointer_bytes: 4,
            register_count: 6,
            stack_align_mask: 3,
            throw_frame_words: 5,
        }
    }

    /// x86-64.
    pub const fn amd64() -> Self {
        Self {
            pointer_bytes: 8,
            register_count: 14,
            stack_align_mask: 15,
            throw_frame_words: 5,
        }
    }

    pub fn with_register_count(mut self, count: u16) -> Self {
        self.register_count = count;
        self
    }

    /// Integral type an address is held in.
    pub fn address_type(&self) -> DataType {
        if self.pointer_bytes == 8 {
            DataType::LONG
        } else {
            DataType::INT
        }
    }

    pub fn address_class(&self) -> RegClass {
        if self.pointer_bytes == 8 {
            RegClass::Long
        } else {
            RegClass::Int
        }
    }

    /// Byte offset of the length word of an array.
    pub fn array_length_offset(&self) -> i32 {
        self.pointer_bytes as i32
    }

    /// Byte offset of element 0 of an array with `element_size`-byte elements.
    pub fn array_data_offset(&self, element_size: u32) -> i32 {
        let header = self.pointer_bytes + 4;
        let align = element_size.clamp(1, 8);
        (header.div_ceil(align) * align) as i32
    }

    /// Frame words occupied by a value of `data_type`.
    pub fn words_for(&self, data_type: &DataType) -> u32 {
        data_type
            .storage_size(self.pointer_bytes)
            .div_ceil(self.pointer_bytes)
            .max(1)
    }

    /// Frame size in bytes for `words` frame words, rounded to the stack alignment.
    pub fn frame_bytes(&self, words: u32) -> u32 {
        let bytes = words * self.pointer_bytes;
        (bytes + self.stack_align_mask) & !self.stack_align_mask
    }
}

impl Default for ArchConstants {
    fn default() -> Self {
        Self::ia32()
    }
}
