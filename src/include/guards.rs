//! RAII guard for the include stack
//!
//! Ensures a pushed include path is always popped when the guard goes out of
//! scope, including early returns through `?`.

use core::cell::RefCell;
use std::path::PathBuf;

pub(crate) struct IncludeGuard<'a> {
    include_stack: &'a RefCell<Vec<PathBuf>>,
    include_stack_len: usize,
}

impl<'a> IncludeGuard<'a> {
    /// Pushes `path` and records the stack length to restore
    pub(crate) fn push(
        include_stack: &'a RefCell<Vec<PathBuf>>,
        path: PathBuf,
    ) -> Self {
        let include_stack_len = include_stack.borrow().len();
        include_stack.borrow_mut().push(path);
        Self {
            include_stack,
            include_stack_len,
        }
    }
}

impl Drop for IncludeGuard<'_> {
    fn drop(&mut self) {
        self.include_stack
            .borrow_mut()
            .truncate(self.include_stack_len);
    }
}
