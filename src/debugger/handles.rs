//! Thread and frame views taken at a stop
//!
//! A view remembers the stop generation it was taken at. The owning process
//! bumps the shared counter on every resume, which invalidates every older
//! view without the process having to track them.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::StopReason;

/// Shared stop generation counter
#[derive(Debug, Clone, Default)]
pub struct StopGeneration(Arc<AtomicU64>);

impl StopGeneration {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidate every view taken so far
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn stamp(&self) -> Stamp {
        Stamp {
            taken_at: self.current(),
            live: self.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Stamp {
    taken_at: u64,
    live: StopGeneration,
}

impl Stamp {
    fn is_current(&self) -> bool {
        self.taken_at == self.live.current()
    }
}

/// A thread of a stopped process
#[derive(Debug, Clone)]
pub struct Thread {
    id: i64,
    index: usize,
    name: String,
    stop_reason: Option<StopReason>,
    stamp: Stamp,
}

impl Thread {
    pub(crate) fn new(
        id: i64,
        index: usize,
        name: String,
        stop_reason: Option<StopReason>,
        stamp: Stamp,
    ) -> Self {
        Self {
            id,
            index,
            name,
            stop_reason,
            stamp,
        }
    }

    /// Adapter thread id
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Position in the process's thread list
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Why this thread stopped; `None` for threads that were only halted
    /// along with the one that stopped
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.stamp.is_current()
    }
}

/// One frame of a stopped thread
#[derive(Debug, Clone)]
pub struct Frame {
    id: i64,
    index: usize,
    thread_id: i64,
    function_name: String,
    source_path: Option<String>,
    line: u32,
    pc: Option<u64>,
    stamp: Stamp,
}

impl Frame {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: i64,
        index: usize,
        thread_id: i64,
        function_name: String,
        source_path: Option<String>,
        line: u32,
        pc: Option<u64>,
        stamp: Stamp,
    ) -> Self {
        Self {
            id,
            index,
            thread_id,
            function_name,
            source_path,
            line,
            pc,
            stamp,
        }
    }

    /// Adapter frame id, only meaningful to the adapter
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Frame number as `frame select` expects it (0 is innermost)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn thread_id(&self) -> i64 {
        self.thread_id
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Source file name without directories
    pub fn file_name(&self) -> Option<&str> {
        let path = self.source_path.as_deref()?;
        Path::new(path).file_name().and_then(|n| n.to_str())
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Program counter; `None` when the adapter did not report one
    pub fn pc(&self) -> Option<u64> {
        self.pc
    }

    pub fn is_valid(&self) -> bool {
        self.stamp.is_current()
    }
}

/// Parse an adapter memory reference such as `0x7fff5fbff8a0`
pub fn parse_address(reference: &str) -> Option<u64> {
    let reference = reference.trim();
    match reference
        .strip_prefix("0x")
        .or_else(|| reference.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => reference.parse().ok(),
    }
}
