//! Kernel error type and the UNIX error number table.

use core::fmt;

/// UNIX error numbers.
///
/// These are the numeric codes exposed wherever the kernel speaks to code
/// that expects classic errno values. The numbers are part of the ABI and
/// must not change.
pub mod errno {
    /// Operation not permitted
    pub const EPERM: i32 = 1;
    /// No such file or directory
    pub const ENOENT: i32 = 2;
    /// No such process
    pub const ESRCH: i32 = 3;
    /// Interrupted system call
    pub const EINTR: i32 = 4;
    /// Input/output error
    pub const EIO: i32 = 5;
    /// Device not configured
    pub const ENXIO: i32 = 6;
    /// Argument list too long
    pub const E2BIG: i32 = 7;
    /// Exec format error
    pub const ENOEXEC: i32 = 8;
    /// Bad file descriptor
    pub const EBADF: i32 = 9;
    /// No child processes
    pub const ECHILD: i32 = 10;
    /// Try again
    pub const EAGAIN: i32 = 11;
    /// Cannot allocate memory
    pub const ENOMEM: i32 = 12;
    /// Permission denied
    pub const EACCES: i32 = 13;
    /// Bad address
    pub const EFAULT: i32 = 14;
    /// Block device required
    pub const ENOTBLK: i32 = 15;
    /// Device busy
    pub const EBUSY: i32 = 16;
    /// File exists
    pub const EEXIST: i32 = 17;
    /// Cross-device link
    pub const EXDEV: i32 = 18;
    /// Operation not supported by device
    pub const ENODEV: i32 = 19;
    /// Not a directory
    pub const ENOTDIR: i32 = 20;
    /// Is a directory
    pub const EISDIR: i32 = 21;
    /// Invalid argument
    pub const EINVAL: i32 = 22;
    /// Too many open files in system
    pub const ENFILE: i32 = 23;
    /// Too many open files
    pub const EMFILE: i32 = 24;
    /// Inappropriate ioctl for device
    pub const ENOTTY: i32 = 25;
    /// Text file busy
    pub const ETXTBSY: i32 = 26;
    /// File too large
    pub const EFBIG: i32 = 27;
    /// No space left on device
    pub const ENOSPC: i32 = 28;
    /// Illegal seek
    pub const ESPIPE: i32 = 29;
    /// Read-only file system
    pub const EROFS: i32 = 30;
    /// Too many links
    pub const EMLINK: i32 = 31;
    /// Broken pipe
    pub const EPIPE: i32 = 32;
    /// Numerical argument out of domain
    pub const EDOM: i32 = 33;
    /// Result too large
    pub const ERANGE: i32 = 34;
    /// Resource deadlock avoided
    pub const EDEADLK: i32 = 35;
    /// Operation now in progress
    pub const EINPROGRESS: i32 = 36;
    /// Operation already in progress
    pub const EALREADY: i32 = 37;
    /// No locks available
    pub const ENOLCK: i32 = 77;
    /// Function not implemented
    pub const ENOSYS: i32 = 100;
    /// Too many levels of symbolic links
    pub const ELOOP: i32 = 101;
    /// File name too long
    pub const ENAMETOOLONG: i32 = 102;
    /// Operation would block
    pub const EWOULDBLOCK: i32 = EAGAIN;
}

/// Errors surfaced by the kernel core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "kernel errors must be handled, not silently discarded"]
pub enum KernelError {
    /// An object pool or frame pool was exhausted.
    OutOfMemory,
    /// No free virtual range of the requested size exists.
    AddressSpaceExhausted,
    /// A segment with the same base address is already present.
    AlreadyExists,
    /// Malformed request (zero size, unknown address).
    InvalidArgument,
    /// The resource is held elsewhere.
    Busy,
    /// The operation would have to wait.
    WouldBlock,
    /// A subsystem was used before its init ran.
    NotInitialized {
        subsystem: &'static str,
    },
}

impl KernelError {
    /// The numeric code this error maps to at UNIX-style boundaries.
    pub const fn errno(self) -> i32 {
        match self {
            KernelError::OutOfMemory => errno::ENOMEM,
            KernelError::AddressSpaceExhausted => errno::ENOSPC,
            KernelError::AlreadyExists => errno::EEXIST,
            KernelError::InvalidArgument => errno::EINVAL,
            KernelError::Busy => errno::EBUSY,
            KernelError::WouldBlock => errno::EAGAIN,
            KernelError::NotInitialized { .. } => errno::EAGAIN,
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::OutOfMemory => write!(f, "out of memory"),
            KernelError::AddressSpaceExhausted => write!(f, "address space exhausted"),
            KernelError::AlreadyExists => write!(f, "segment already exists"),
            KernelError::InvalidArgument => write!(f, "invalid argument"),
            KernelError::Busy => write!(f, "resource busy"),
            KernelError::WouldBlock => write!(f, "operation would block"),
            KernelError::NotInitialized { subsystem } => {
                write!(f, "subsystem not initialized: {}", subsystem)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_values_are_stable() {
        assert_eq!(errno::EAGAIN, 11);
        assert_eq!(errno::ENOMEM, 12);
        assert_eq!(errno::EBUSY, 16);
        assert_eq!(errno::EEXIST, 17);
        assert_eq!(errno::EINVAL, 22);
        assert_eq!(errno::ENOSPC, 28);
        assert_eq!(errno::EWOULDBLOCK, errno::EAGAIN);
    }

    #[test]
    fn kernel_errors_map_to_errno() {
        assert_eq!(KernelError::OutOfMemory.errno(), 12);
        assert_eq!(KernelError::AddressSpaceExhausted.errno(), 28);
        assert_eq!(KernelError::AlreadyExists.errno(), 17);
        assert_eq!(KernelError::InvalidArgument.errno(), 22);
        assert_eq!(KernelError::Busy.errno(), 16);
    }
}
