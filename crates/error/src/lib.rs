//! Driver error handling infrastructure.
//!
//! Provides the `define_driver_error!` macro for consistent error type definitions.
//! Every variant carries a subsystem-scoped code for logs and the Linux errno
//! the kernel-facing API reports for it.
//!
//! ## Usage
//!
//! ### Simple errors (errno listed per variant)
//! ```ignore
//! define_driver_error! {
//!     pub enum AuxError(0x0D) {
//!         Busy = 0x01 [EBUSY] => "AUX channel busy",
//!         Io = 0x02 [EIO] => "AUX transaction failed",
//!     }
//! }
//! ```
//!
//! ### Nested errors (errno taken from the inner value)
//! ```ignore
//! define_driver_error! {
//!     pub enum AuxError(0x0D) {
//!         Transport(Errno) = 0x10 => "Transport error",
//!     }
//! }
//! ```

#![no_std]

/// Errno constants, re-exported so macro expansions resolve them through `$crate`.
pub use linux_raw_sys::errno;

/// Conversion of an error value into a negative Linux errno.
pub trait AsErrno {
    /// Negative errno, e.g. `-5` for `EIO`.
    fn as_errno(&self) -> i32;
}

/// A raw errno reported by an external collaborator, kept verbatim.
///
/// Stored positive (`Errno(110)` is `ETIMEDOUT`); [`AsErrno`] negates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Errno(pub u32);

impl AsErrno for Errno {
    fn as_errno(&self) -> i32 {
        -(self.0 as i32)
    }
}

impl core::fmt::Display for Errno {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "errno {}", self.0)
    }
}

/// Macro to define a driver error type with consistent handling.
///
/// Supports both simple variants (with an errno name from [`errno`]) and nested
/// variants containing an inner value that implements [`AsErrno`].
#[macro_export]
macro_rules! define_driver_error {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($subsystem:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(($inner:ty))? = $code:literal $([$errno:ident])? => $desc:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $(($inner))?,
            )*
        }

        impl $name {
            /// Subsystem identifier for this error type.
            pub const SUBSYSTEM: u8 = $subsystem;

            /// Get numeric error code for debugging.
            pub const fn code(&self) -> u16 {
                match self {
                    $(
                        $crate::define_driver_error!(@pattern $variant $(($inner))? _unused) => {
                            (($subsystem as u16) << 8) | $code
                        }
                    )*
                }
            }

            /// Get error name for logging.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(
                        $crate::define_driver_error!(@pattern $variant $(($inner))? _unused) => {
                            $desc
                        }
                    )*
                }
            }

            /// Negative Linux errno for this error.
            pub fn errno(&self) -> i32 {
                match self {
                    $(
                        $crate::define_driver_error!(@pattern $variant $(($inner))? inner) => {
                            $crate::define_driver_error!(@errno inner $(($inner))? $([$errno])?)
                        }
                    )*
                }
            }
        }

        impl $crate::AsErrno for $name {
            fn as_errno(&self) -> i32 {
                self.errno()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(
                        $crate::define_driver_error!(@pattern $variant $(($inner))? inner) => {
                            $crate::define_driver_error!(@display_body self f $desc $(($inner))? inner)
                        }
                    )*
                }
            }
        }

        impl core::error::Error for $name {}
    };

    // Helper to generate patterns
    (@pattern $variant:ident ($inner:ty) $bind:ident) => { Self::$variant($bind) };
    (@pattern $variant:ident $bind:ident) => { Self::$variant };

    // Helper to resolve the errno of a variant
    (@errno $bind:ident ($inner:ty)) => { $crate::AsErrno::as_errno($bind) };
    (@errno $bind:ident [$errno:ident]) => { -($crate::errno::$errno as i32) };

    // Helper to generate display bodies
    (@display_body $self:ident $f:ident $desc:literal ($inner:ty) $bind:ident) => {
        write!($f, "E{:04X}: {} ({})", $self.code(), $desc, $bind)
    };
    (@display_body $self:ident $f:ident $desc:literal $bind:ident) => {
        write!($f, "E{:04X}: {}", $self.code(), $desc)
    };
}
