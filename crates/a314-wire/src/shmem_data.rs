use std::{
    borrow::Borrow,
    ops::{Deref, DerefMut},
    path::Path,
    ptr::NonNull,
};

use shared_memory::{Shmem, ShmemConf, ShmemError};

/// Thin pointer into a POSIX shared-memory region holding a single `T`,
/// created (and initialised) by whichever side attaches first, opened by
/// whichever side attaches second.
#[repr(C)]
pub struct ShmemData<T> {
    inner: NonNull<T>,
}

impl<T> ShmemData<T> {
    /// Creates the backing file at `path` and initialises it with `init_f`
    /// if no other process has done so yet; otherwise opens the existing
    /// region as-is (so a second attacher never re-runs `init_f`).
    pub fn open_or_init(path: &Path, init_f: impl FnOnce() -> T) -> Result<Self, ShmemError> {
        std::fs::create_dir_all(
            path.parent().unwrap_or_else(|| panic!("no parent dir for {}", path.display())),
        )
        .unwrap_or_else(|_| panic!("couldn't create shmem dir for {}", path.display()));

        match ShmemConf::new().size(std::mem::size_of::<T>()).flink(path).create() {
            Ok(shmem) => {
                let inner = Self::shmem_ptr(shmem);
                unsafe { std::ptr::write(inner.as_ptr(), init_f()) };
                Ok(Self { inner })
            }
            Err(ShmemError::LinkExists) => {
                let shmem = ShmemConf::new()
                    .flink(path)
                    .open()
                    .unwrap_or_else(|_| panic!("couldn't open shmem file {}", path.display()));
                Ok(Self { inner: Self::shmem_ptr(shmem) })
            }
            Err(e) => Err(e),
        }
    }

    fn shmem_ptr(shmem: Shmem) -> NonNull<T> {
        let shmem_ptr = shmem.as_ptr() as *mut T;

        // Don't drop shmem on exit; a restart picks up the same flink.
        std::mem::forget(shmem);

        NonNull::new(shmem_ptr)
            .expect("shmem pointer is null somehow. Probably regression in shared_memory crate.")
    }

    pub fn copy_ptr(&self) -> Self {
        Self { inner: self.inner }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ShmemData<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.inner)
    }
}

unsafe impl<T: Send> Send for ShmemData<T> {}
unsafe impl<T: Sync> Sync for ShmemData<T> {}

impl<T> Borrow<T> for ShmemData<T> {
    fn borrow(&self) -> &T {
        unsafe { self.inner.as_ref() }
    }
}

impl<T> Deref for ShmemData<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { self.inner.as_ref() }
    }
}

impl<T> DerefMut for ShmemData<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { self.inner.as_mut() }
    }
}

impl<T> AsRef<T> for ShmemData<T> {
    fn as_ref(&self) -> &T {
        unsafe { self.inner.as_ref() }
    }
}
