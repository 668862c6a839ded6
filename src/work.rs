//! Work items: the unit of dispatch.
//!
//! A [`WorkItem`] pairs an opaque procedure with the raw parts of the
//! submitter's input and output buffers. The pool copies items by value
//! into mailbox slots; the buffers themselves are never copied and never
//! owned by the pool; their lifetimes are the submitter's responsibility.

use std::slice;

/// An opaque work procedure.
///
/// Reads any prefix of `input`, writes any prefix of `output`, and returns.
/// It must not retain either slice beyond return and should not block
/// indefinitely, as there is no preemption inside a worker.
pub type WorkFn = fn(input: &[u8], output: &mut [u8]);

/// A procedure plus borrowed input/output buffers, captured as raw parts
/// so the item can sit in a mailbox slot independent of borrow lifetimes.
#[derive(Clone, Copy, Debug)]
pub struct WorkItem {
    func: WorkFn,
    input: *const u8,
    input_len: usize,
    output: *mut u8,
    output_len: usize,
}

// SAFETY: The pointers come from slices the submitter promised (via the
// `WorkItem::new` contract) to keep valid and unaliased until the
// procedure returns, so handing the item to the worker thread is sound.
unsafe impl Send for WorkItem {}

impl WorkItem {
    /// Capture a procedure and its buffers.
    ///
    /// # Safety
    ///
    /// The caller must guarantee, until `func` has returned on the worker
    /// thread:
    ///
    /// - `input` remains valid for reads, and
    /// - `output` remains valid for writes and is not read, written, or
    ///   reborrowed by anyone else.
    ///
    /// The pool does not track completion; the caller coordinates (for
    /// example by having `func` set a flag the caller waits on).
    #[must_use]
    pub unsafe fn new(func: WorkFn, input: &[u8], output: &mut [u8]) -> Self {
        Self {
            func,
            input: input.as_ptr(),
            input_len: input.len(),
            output: output.as_mut_ptr(),
            output_len: output.len(),
        }
    }

    /// Invoke the captured procedure on the captured buffers.
    ///
    /// # Safety
    ///
    /// The buffer contract of [`WorkItem::new`] must still hold.
    pub(crate) unsafe fn run(self) {
        // SAFETY: The submit contract guarantees both regions are live;
        // the output region is exclusively ours until `func` returns.
        let (input, output) = unsafe {
            (
                slice::from_raw_parts(self.input, self.input_len),
                slice::from_raw_parts_mut(self.output, self.output_len),
            )
        };
        (self.func)(input, output);
    }
}
