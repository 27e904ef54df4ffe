//! Segmented Simulated Memory.
//!
//! This module implements the 32-bit address space of the simulated hart. It provides:
//! 1. **Segments:** Text, data, stack, and memory-mapped I/O regions carved out by an
//!    [`AddressLayout`], each backed by a lazily allocated block table.
//! 2. **Access:** Unaligned `get`/`set` plus naturally aligned byte, half, word, double-word,
//!    raw-word, and statement accessors, all little-endian.
//! 3. **Self-modifying code:** Optional stores into the text segment that rebuild the
//!    affected instructions through a [`StatementDecoder`].
//! 4. **Observation:** Synchronous access notices for subscribed tools and devices, and undo
//!    records for the backstepper.
//! 5. **Heap:** A bump-pointer allocator over the data segment.

/// Address layout presets.
pub mod layout;

/// Decoded instruction storage for the text segment.
pub mod statement;

/// Lazily allocated block tables.
pub mod table;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use self::layout::AddressLayout;
use self::statement::{ProgramStatement, RawDecoder, StatementDecoder};
use self::table::BlockTable;
use crate::common::constants::{
    BLOCK_TABLE_LENGTH, BYTE_LENGTH_BYTES, DOUBLEWORD_LENGTH_BYTES, HALF_LENGTH_BYTES, MMIO_CAPACITY_BYTES,
    MMIO_TABLE_LENGTH, SEGMENT_CAPACITY_BYTES, SIGNED_BOUNDARY, WORD_LENGTH_BYTES,
};
use crate::common::{
    AccessType, ConfigError, Exception, ExceptionCause, HeapError, MemoryAccessNotice,
    MemoryObserver, SubscriptionId,
};
use crate::sim::undo::{StoreWidth, UndoRecorder};

/// The region an address resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Program instructions.
    Text,
    /// Static data, `.extern`, and the heap.
    Data,
    /// The downward-growing stack.
    Stack,
    /// Memory-mapped device registers.
    Mmio,
}

/// Effective segment bounds after clamping the layout to block-table capacity.
///
/// All bounds are inclusive except `stack_limit`, which is the exclusive lower end of the
/// stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentBounds {
    /// First text address.
    pub text_base: u32,
    /// Last text address.
    pub text_limit: u32,
    /// First data segment address.
    pub data_base: u32,
    /// Last data segment address.
    pub data_limit: u32,
    /// Highest stack word.
    pub stack_base: u32,
    /// Addresses must be strictly above this to be on the stack.
    pub stack_limit: u32,
    /// First memory-mapped I/O address.
    pub mmio_base: u32,
    /// Last memory-mapped I/O address.
    pub mmio_limit: u32,
}

impl SegmentBounds {
    /// Derives the effective bounds of a layout.
    pub fn new(layout: &AddressLayout) -> Self {
        let clamp = |base: u32, limit: u32, capacity: u64| -> u32 {
            (u64::from(base) + capacity - 1).min(u64::from(limit)) as u32
        };
        let stack_top = layout.stack_base & !(WORD_LENGTH_BYTES - 1);
        let deepest = u64::from(stack_top).saturating_sub(SEGMENT_CAPACITY_BYTES) as u32 + 3;
        Self {
            text_base: layout.text_base,
            text_limit: clamp(layout.text_base, layout.text_limit, SEGMENT_CAPACITY_BYTES),
            data_base: layout.data_segment_base,
            data_limit: clamp(
                layout.data_segment_base,
                layout.data_segment_limit,
                SEGMENT_CAPACITY_BYTES,
            ),
            stack_base: layout.stack_base,
            stack_limit: layout.stack_limit.max(deepest),
            mmio_base: layout.mmio_base,
            mmio_limit: clamp(layout.mmio_base, layout.mmio_limit, MMIO_CAPACITY_BYTES),
        }
    }

    /// Returns `true` if `address` is in the text segment.
    pub const fn in_text(&self, address: u32) -> bool {
        address >= self.text_base && address <= self.text_limit
    }

    /// Returns `true` if `address` is in the data segment.
    pub const fn in_data(&self, address: u32) -> bool {
        address >= self.data_base && address <= self.data_limit
    }

    /// Returns `true` if `address` is on the stack.
    pub const fn in_stack(&self, address: u32) -> bool {
        address > self.stack_limit && address <= self.stack_base
    }

    /// Returns `true` if `address` is in the memory-mapped I/O region.
    pub const fn in_mmio(&self, address: u32) -> bool {
        address >= self.mmio_base && address <= self.mmio_limit
    }

    /// Resolves the segment of `address`.
    ///
    /// Resolution order is data, stack, text, then MMIO, so overlapping layouts still map
    /// every address to exactly one segment.
    pub const fn segment_of(&self, address: u32) -> Option<Segment> {
        if self.in_data(address) {
            Some(Segment::Data)
        } else if self.in_stack(address) {
            Some(Segment::Stack)
        } else if self.in_text(address) {
            Some(Segment::Text)
        } else if self.in_mmio(address) {
            Some(Segment::Mmio)
        } else {
            None
        }
    }
}

#[derive(Clone)]
struct MemorySubscription {
    id: SubscriptionId,
    /// Inclusive word range `[low, high]`; `None` watches everything.
    range: Option<(u32, u32)>,
    observer: Arc<dyn MemoryObserver>,
}

impl MemorySubscription {
    fn matches(&self, notice: &MemoryAccessNotice) -> bool {
        match self.range {
            None => true,
            Some((low, high)) => {
                u64::from(notice.address) <= u64::from(high) + u64::from(WORD_LENGTH_BYTES) - 1
                    && notice.last_address() >= u64::from(low)
            }
        }
    }
}

/// The simulated address space.
#[derive(Clone)]
pub struct Memory {
    layout: AddressLayout,
    bounds: SegmentBounds,
    text: BlockTable<Option<ProgramStatement>>,
    data: BlockTable<u32>,
    stack: BlockTable<u32>,
    mmio: BlockTable<u32>,
    heap_address: u32,
    self_modifying_code: bool,
    decoder: Arc<dyn StatementDecoder>,
    subscriptions: Vec<MemorySubscription>,
    undo: Option<Arc<dyn UndoRecorder>>,
}

impl Memory {
    /// Creates an empty memory for `layout`.
    ///
    /// No storage is allocated until the first write.
    pub fn new(layout: AddressLayout) -> Self {
        Self {
            layout,
            bounds: SegmentBounds::new(&layout),
            text: BlockTable::new(BLOCK_TABLE_LENGTH),
            data: BlockTable::new(BLOCK_TABLE_LENGTH),
            stack: BlockTable::new(BLOCK_TABLE_LENGTH),
            mmio: BlockTable::new(MMIO_TABLE_LENGTH),
            heap_address: layout.heap_base,
            self_modifying_code: false,
            decoder: Arc::new(RawDecoder),
            subscriptions: Vec::new(),
            undo: None,
        }
    }

    /// Replaces the decoder used to rebuild rewritten instructions.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn StatementDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// The decoder used to rebuild rewritten instructions.
    pub fn decoder(&self) -> &Arc<dyn StatementDecoder> {
        &self.decoder
    }

    /// Sets the decoder used to rebuild rewritten instructions.
    pub fn set_decoder(&mut self, decoder: Arc<dyn StatementDecoder>) {
        self.decoder = decoder;
    }

    /// Returns the layout this memory was built for.
    pub const fn layout(&self) -> &AddressLayout {
        &self.layout
    }

    /// Returns the effective segment bounds.
    pub const fn bounds(&self) -> &SegmentBounds {
        &self.bounds
    }

    /// Discards all contents and switches to `layout`.
    ///
    /// Subscriptions, the decoder, and the self-modifying-code flag are kept.
    pub fn reconfigure(&mut self, layout: AddressLayout) {
        debug!(text_base = layout.text_base, "memory reconfigured");
        self.layout = layout;
        self.bounds = SegmentBounds::new(&layout);
        self.clear();
    }

    /// Discards all contents and resets the heap cursor.
    pub fn clear(&mut self) {
        self.text.clear();
        self.data.clear();
        self.stack.clear();
        self.mmio.clear();
        self.heap_address = self.layout.heap_base;
        debug!("memory cleared");
    }

    /// Enables or disables stores into (and loads from) the text segment.
    pub fn set_self_modifying_code(&mut self, enabled: bool) {
        self.self_modifying_code = enabled;
    }

    /// Returns `true` if self-modifying code is enabled.
    pub const fn self_modifying_code(&self) -> bool {
        self.self_modifying_code
    }

    /// Installs (or removes) the backstep recorder.
    pub fn set_undo_recorder(&mut self, recorder: Option<Arc<dyn UndoRecorder>>) {
        self.undo = recorder;
    }

    /// Returns `true` if `address` is in the text segment.
    pub const fn in_text_segment(&self, address: u32) -> bool {
        self.bounds.in_text(address)
    }

    /// Returns `true` if `address` is in the data segment.
    pub const fn in_data_segment(&self, address: u32) -> bool {
        self.bounds.in_data(address)
    }

    /// Returns `true` if `address` is in the memory-mapped I/O segment.
    pub const fn in_mmio_segment(&self, address: u32) -> bool {
        self.bounds.in_mmio(address)
    }

    /// Returns `true` if `address` is in kernel space.
    pub const fn in_kernel_space(&self, address: u32) -> bool {
        address >= self.layout.kernel_base && address <= self.layout.kernel_high
    }

    /// Resolves the segment of `address`.
    pub const fn segment_of(&self, address: u32) -> Option<Segment> {
        self.bounds.segment_of(address)
    }

    /// Reads `length` bytes starting at `address` without alignment checks.
    ///
    /// Bytes are assembled little-endian. Observers are notified.
    ///
    /// # Arguments
    ///
    /// * `address` - First byte address.
    /// * `length` - Number of bytes: 1, 2, 4, or 8.
    ///
    /// # Errors
    ///
    /// Returns a load access fault for addresses outside every segment, and for the text
    /// segment unless self-modifying code is enabled.
    pub fn get(&self, address: u32, length: u32) -> Result<u64, Exception> {
        let value = self.get_no_notify(address, length)?;
        self.notify(AccessType::Read, address, length, value);
        Ok(value)
    }

    /// Same as [`Memory::get`] without notifying observers.
    ///
    /// # Errors
    ///
    /// See [`Memory::get`].
    pub fn get_no_notify(&self, address: u32, length: u32) -> Result<u64, Exception> {
        check_length(length);
        match self.segment_of(address) {
            Some(Segment::Text) if !self.self_modifying_code => Err(Exception::address_error(
                ExceptionCause::LoadAccessFault,
                address,
                "Cannot read directly from text segment!",
            )),
            Some(segment) => self.read_bytes(segment, address, length).ok_or_else(|| {
                Exception::address_error(
                    ExceptionCause::LoadAccessFault,
                    address,
                    "address out of range",
                )
            }),
            None => Err(Exception::address_error(
                ExceptionCause::LoadAccessFault,
                address,
                "address out of range",
            )),
        }
    }

    /// Writes the low `length` bytes of `value` starting at `address` without alignment checks.
    ///
    /// Observers are notified; the backstepper is not.
    ///
    /// # Arguments
    ///
    /// * `address` - First byte address.
    /// * `value` - Value to store, little-endian.
    /// * `length` - Number of bytes: 1, 2, 4, or 8.
    ///
    /// # Returns
    ///
    /// The value previously held by the same bytes.
    ///
    /// # Errors
    ///
    /// Returns a store access fault for addresses outside every segment, and for the text
    /// segment unless self-modifying code is enabled.
    pub fn set(&mut self, address: u32, value: u64, length: u32) -> Result<u64, Exception> {
        check_length(length);
        let value = truncate(value, length);
        let old = match self.segment_of(address) {
            Some(Segment::Text) => {
                if !self.self_modifying_code {
                    return Err(Exception::address_error(
                        ExceptionCause::StoreAccessFault,
                        address,
                        "Cannot write directly to text segment!",
                    ));
                }
                self.rewrite_text(address, value, length)?
            }
            Some(segment) => self
                .write_bytes(segment, address, value, length)
                .ok_or_else(|| {
                    Exception::address_error(
                        ExceptionCause::StoreAccessFault,
                        address,
                        "address out of range",
                    )
                })?,
            None => {
                return Err(Exception::address_error(
                    ExceptionCause::StoreAccessFault,
                    address,
                    "address out of range",
                ));
            }
        };
        trace!(address, length, value, "memory write");
        self.notify(AccessType::Write, address, length, value);
        Ok(old)
    }

    /// Reads an aligned word.
    ///
    /// # Errors
    ///
    /// Returns a load-misaligned address error unless `address` is a multiple of 4, and
    /// any error of [`Memory::get`].
    pub fn get_word(&self, address: u32) -> Result<u32, Exception> {
        check_load_aligned(address, WORD_LENGTH_BYTES)?;
        Ok(self.get(address, WORD_LENGTH_BYTES)? as u32)
    }

    /// Reads an aligned word without notifying observers.
    ///
    /// # Errors
    ///
    /// See [`Memory::get_word`].
    pub fn get_word_no_notify(&self, address: u32) -> Result<u32, Exception> {
        check_load_aligned(address, WORD_LENGTH_BYTES)?;
        Ok(self.get_no_notify(address, WORD_LENGTH_BYTES)? as u32)
    }

    /// Writes an aligned word and records the old value for backstepping.
    ///
    /// # Returns
    ///
    /// The previous word.
    ///
    /// # Errors
    ///
    /// Returns a store-misaligned address error unless `address` is a multiple of 4, and
    /// any error of [`Memory::set`].
    pub fn set_word(&mut self, address: u32, value: u32) -> Result<u32, Exception> {
        check_store_aligned(address, WORD_LENGTH_BYTES)?;
        let old = self.set(address, u64::from(value), WORD_LENGTH_BYTES)?;
        self.record(address, StoreWidth::Word, old);
        Ok(old as u32)
    }

    /// Reads an aligned half-word.
    ///
    /// # Errors
    ///
    /// Returns a load-misaligned address error for odd addresses.
    pub fn get_half(&self, address: u32) -> Result<u16, Exception> {
        check_load_aligned(address, HALF_LENGTH_BYTES)?;
        Ok(self.get(address, HALF_LENGTH_BYTES)? as u16)
    }

    /// Writes an aligned half-word and records the old value for backstepping.
    ///
    /// # Errors
    ///
    /// Returns a store-misaligned address error for odd addresses.
    pub fn set_half(&mut self, address: u32, value: u16) -> Result<u16, Exception> {
        check_store_aligned(address, HALF_LENGTH_BYTES)?;
        let old = self.set(address, u64::from(value), HALF_LENGTH_BYTES)?;
        self.record(address, StoreWidth::Half, old);
        Ok(old as u16)
    }

    /// Reads a byte.
    ///
    /// # Errors
    ///
    /// See [`Memory::get`].
    pub fn get_byte(&self, address: u32) -> Result<u8, Exception> {
        Ok(self.get(address, BYTE_LENGTH_BYTES)? as u8)
    }

    /// Writes a byte and records the old value for backstepping.
    ///
    /// # Errors
    ///
    /// See [`Memory::set`].
    pub fn set_byte(&mut self, address: u32, value: u8) -> Result<u8, Exception> {
        let old = self.set(address, u64::from(value), BYTE_LENGTH_BYTES)?;
        self.record(address, StoreWidth::Byte, old);
        Ok(old as u8)
    }

    /// Reads an 8-byte aligned double-word.
    ///
    /// # Errors
    ///
    /// Returns a load-misaligned address error unless `address` is a multiple of 8.
    pub fn get_double_word(&self, address: u32) -> Result<u64, Exception> {
        check_load_aligned(address, DOUBLEWORD_LENGTH_BYTES)?;
        self.get(address, DOUBLEWORD_LENGTH_BYTES)
    }

    /// Writes an 8-byte aligned double-word and records the old value for backstepping.
    ///
    /// # Errors
    ///
    /// Returns a store-misaligned address error unless `address` is a multiple of 8.
    pub fn set_double_word(&mut self, address: u32, value: u64) -> Result<u64, Exception> {
        check_store_aligned(address, DOUBLEWORD_LENGTH_BYTES)?;
        let old = self.set(address, value, DOUBLEWORD_LENGTH_BYTES)?;
        self.record(address, StoreWidth::DoubleWord, old);
        Ok(old)
    }

    /// Reads an aligned word as stored, without reinterpretation.
    ///
    /// Text segment words read back the binary encoding of their statement, whether or not
    /// self-modifying code is enabled.
    ///
    /// # Errors
    ///
    /// Returns a load-misaligned error for unaligned addresses and a load access fault for
    /// addresses outside every segment.
    pub fn get_raw_word(&self, address: u32) -> Result<u32, Exception> {
        let value = self.raw_word_no_notify(address)?.unwrap_or(0);
        self.notify(AccessType::Read, address, WORD_LENGTH_BYTES, u64::from(value));
        Ok(value)
    }

    /// Reads an aligned word silently, distinguishing never-written storage.
    ///
    /// # Returns
    ///
    /// `None` if the word's block was never allocated (or, in the text segment, if no
    /// statement is stored there).
    ///
    /// # Errors
    ///
    /// See [`Memory::get_raw_word`].
    pub fn get_raw_word_or_null(&self, address: u32) -> Result<Option<u32>, Exception> {
        self.raw_word_no_notify(address)
    }

    /// Writes an aligned word as-is and records the old value for backstepping.
    ///
    /// # Errors
    ///
    /// Returns a store-misaligned error for unaligned addresses and a store access fault
    /// for addresses outside every segment, or in the text segment while self-modifying code
    /// is disabled.
    pub fn set_raw_word(&mut self, address: u32, value: u32) -> Result<u32, Exception> {
        check_store_aligned(address, WORD_LENGTH_BYTES)?;
        let old = self.set(address, u64::from(value), WORD_LENGTH_BYTES)? as u32;
        self.record(address, StoreWidth::RawWord, u64::from(old));
        Ok(old)
    }

    /// Fetches the statement at `address`.
    ///
    /// With self-modifying code enabled, addresses outside the text segment are fetched as
    /// data words and decoded on the fly.
    ///
    /// # Returns
    ///
    /// The statement, or `None` if nothing was stored at that text address. Observers see a
    /// word read in both cases, with value 0 for an empty slot.
    ///
    /// # Errors
    ///
    /// Returns an instruction-misaligned error for unaligned addresses and an instruction
    /// access fault for addresses outside the text segment.
    pub fn get_statement(&self, address: u32) -> Result<Option<ProgramStatement>, Exception> {
        let statement = self.get_statement_no_notify(address)?;
        let binary = statement.as_ref().map_or(0, ProgramStatement::binary);
        self.notify(AccessType::Read, address, WORD_LENGTH_BYTES, u64::from(binary));
        Ok(statement)
    }

    /// Same as [`Memory::get_statement`] without notifying observers.
    ///
    /// # Errors
    ///
    /// See [`Memory::get_statement`].
    pub fn get_statement_no_notify(
        &self,
        address: u32,
    ) -> Result<Option<ProgramStatement>, Exception> {
        if address % WORD_LENGTH_BYTES != 0 {
            return Err(Exception::address_error(
                ExceptionCause::InstructionAddressMisaligned,
                address,
                "fetch address for text segment not aligned to word boundary",
            ));
        }
        if self.in_text_segment(address) {
            let word = ((address - self.bounds.text_base) / WORD_LENGTH_BYTES) as usize;
            return Ok(self.text.get(word).cloned().flatten());
        }
        if !self.self_modifying_code {
            return Err(Exception::address_error(
                ExceptionCause::InstructionAccessFault,
                address,
                "fetch address for text segment out of range",
            ));
        }
        let binary = self.get_no_notify(address, WORD_LENGTH_BYTES)? as u32;
        self.decoder.decode(binary, address).map(Some)
    }

    /// Stores a statement in the text segment.
    ///
    /// This is how the loader places a program; it is not subject to the self-modifying
    /// code setting.
    ///
    /// # Errors
    ///
    /// Returns a store access fault unless `address` is a word-aligned text address.
    pub fn set_statement(
        &mut self,
        address: u32,
        statement: ProgramStatement,
    ) -> Result<(), Exception> {
        if address % WORD_LENGTH_BYTES != 0 || !self.in_text_segment(address) {
            return Err(Exception::address_error(
                ExceptionCause::StoreAccessFault,
                address,
                "store address to text segment out of range",
            ));
        }
        let binary = statement.binary();
        let word = ((address - self.bounds.text_base) / WORD_LENGTH_BYTES) as usize;
        if let Some(slot) = self.text.get_or_allocate(word) {
            *slot = Some(statement);
        }
        self.notify(
            AccessType::Write,
            address,
            WORD_LENGTH_BYTES,
            u64::from(binary),
        );
        Ok(())
    }

    /// Finds the first word in `[base, limit)` whose storage was never allocated.
    ///
    /// Used to find the end of a loaded program or the extent of the heap.
    ///
    /// # Returns
    ///
    /// The address of the first unallocated word, or `limit` if there is none.
    ///
    /// # Errors
    ///
    /// Propagates errors of [`Memory::get_raw_word_or_null`] for words in the range.
    pub fn address_of_first_null(&self, base: u32, limit: u32) -> Result<u32, Exception> {
        let mut address = base;
        while address < limit {
            if self.get_raw_word_or_null(address)?.is_none() {
                break;
            }
            match address.checked_add(WORD_LENGTH_BYTES) {
                Some(next) => address = next,
                None => break,
            }
        }
        Ok(address)
    }

    /// Returns `true` if the block containing `address` has been allocated.
    pub fn is_block_allocated(&self, address: u32) -> bool {
        let Some(segment) = self.segment_of(address) else {
            return false;
        };
        let Some((word, _)) = self.slot(segment, address) else {
            return false;
        };
        match segment {
            Segment::Text => self.text.is_allocated(word),
            Segment::Data => self.data.is_allocated(word),
            Segment::Stack => self.stack.is_allocated(word),
            Segment::Mmio => self.mmio.is_allocated(word),
        }
    }

    /// Total number of allocated blocks across all segments.
    pub fn allocated_block_count(&self) -> usize {
        self.text.allocated_blocks()
            + self.data.allocated_blocks()
            + self.stack.allocated_blocks()
            + self.mmio.allocated_blocks()
    }

    /// Current heap cursor.
    pub const fn heap_address(&self) -> u32 {
        self.heap_address
    }

    /// Reserves `num_bytes` of heap and returns the start of the span.
    ///
    /// The cursor is kept word aligned. Memory is never reclaimed.
    ///
    /// # Errors
    ///
    /// Fails for negative requests and for requests that would run past the data segment.
    pub fn allocate_bytes_from_heap(&mut self, num_bytes: i32) -> Result<u32, HeapError> {
        let Ok(requested) = u32::try_from(num_bytes) else {
            return Err(HeapError::NegativeRequest(num_bytes));
        };
        let result = self.heap_address;
        let next = (u64::from(result) + u64::from(requested))
            .next_multiple_of(u64::from(WORD_LENGTH_BYTES));
        if next > u64::from(self.bounds.data_limit) {
            return Err(HeapError::Exhausted(num_bytes));
        }
        self.heap_address = next as u32;
        debug!(start = result, num_bytes, "heap allocation");
        Ok(result)
    }

    /// Subscribes to every access.
    pub fn subscribe(&mut self, observer: Arc<dyn MemoryObserver>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.subscriptions.push(MemorySubscription {
            id,
            range: None,
            observer,
        });
        id
    }

    /// Subscribes to accesses overlapping the words `low..=high`.
    ///
    /// # Errors
    ///
    /// Rejects unaligned endpoints, inverted ranges, and ranges crossing `0x80000000`.
    pub fn subscribe_range(
        &mut self,
        observer: Arc<dyn MemoryObserver>,
        low: u32,
        high: u32,
    ) -> Result<SubscriptionId, ConfigError> {
        for endpoint in [low, high] {
            if endpoint % WORD_LENGTH_BYTES != 0 {
                return Err(ConfigError::MisalignedRange(endpoint));
            }
        }
        if high < low {
            return Err(ConfigError::InvertedRange { low, high });
        }
        if low < SIGNED_BOUNDARY && high >= SIGNED_BOUNDARY {
            return Err(ConfigError::RangeCrossesSignBoundary { low, high });
        }
        let id = SubscriptionId::next();
        self.subscriptions.push(MemorySubscription {
            id,
            range: Some((low, high)),
            observer,
        });
        Ok(id)
    }

    /// Removes a subscription; returns `false` if it was not found.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Removes every subscription.
    pub fn unsubscribe_all(&mut self) {
        self.subscriptions.clear();
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn notify(&self, access: AccessType, address: u32, length: u32, value: u64) {
        if self.subscriptions.is_empty() {
            return;
        }
        let notice = MemoryAccessNotice {
            access,
            address,
            length,
            value,
        };
        for subscription in self.subscriptions.iter().filter(|s| s.matches(&notice)) {
            subscription.observer.memory_accessed(&notice);
        }
    }

    fn record(&self, address: u32, width: StoreWidth, old: u64) {
        if let Some(undo) = &self.undo {
            undo.memory_written(address, width, old);
        }
    }

    fn raw_word_no_notify(&self, address: u32) -> Result<Option<u32>, Exception> {
        check_load_aligned(address, WORD_LENGTH_BYTES)?;
        let out_of_range = || {
            Exception::address_error(
                ExceptionCause::LoadAccessFault,
                address,
                "address out of range",
            )
        };
        let segment = self.segment_of(address).ok_or_else(out_of_range)?;
        let (word, _) = self.slot(segment, address).ok_or_else(out_of_range)?;
        Ok(match segment {
            Segment::Text => self
                .text
                .get(word)
                .and_then(Option::as_ref)
                .map(ProgramStatement::binary),
            Segment::Data => self.data.get(word).copied(),
            Segment::Stack => self.stack.get(word).copied(),
            Segment::Mmio => self.mmio.get(word).copied(),
        })
    }

    /// Maps a byte address to its (word index, byte lane) inside `segment`'s table.
    fn slot(&self, segment: Segment, address: u32) -> Option<(usize, u32)> {
        let (word, lane, capacity) = match segment {
            Segment::Stack => {
                let top = self.bounds.stack_base & !(WORD_LENGTH_BYTES - 1);
                let aligned = address & !(WORD_LENGTH_BYTES - 1);
                let distance = top.checked_sub(aligned)?;
                (
                    distance / WORD_LENGTH_BYTES,
                    address % WORD_LENGTH_BYTES,
                    self.stack.capacity_words(),
                )
            }
            Segment::Text | Segment::Data | Segment::Mmio => {
                let (base, capacity) = match segment {
                    Segment::Text => (self.bounds.text_base, self.text.capacity_words()),
                    Segment::Data => (self.bounds.data_base, self.data.capacity_words()),
                    _ => (self.bounds.mmio_base, self.mmio.capacity_words()),
                };
                let relative = address.checked_sub(base)?;
                (
                    relative / WORD_LENGTH_BYTES,
                    relative % WORD_LENGTH_BYTES,
                    capacity,
                )
            }
        };
        let word = word as usize;
        (word < capacity).then_some((word, lane))
    }

    fn word_table(&self, segment: Segment) -> &BlockTable<u32> {
        match segment {
            Segment::Stack => &self.stack,
            Segment::Mmio => &self.mmio,
            Segment::Data | Segment::Text => &self.data,
        }
    }

    fn word_table_mut(&mut self, segment: Segment) -> &mut BlockTable<u32> {
        match segment {
            Segment::Stack => &mut self.stack,
            Segment::Mmio => &mut self.mmio,
            Segment::Data | Segment::Text => &mut self.data,
        }
    }

    /// Current word at `word` in `segment`, zero if never written.
    fn word_at(&self, segment: Segment, word: usize) -> u32 {
        match segment {
            Segment::Text => self
                .text
                .get(word)
                .and_then(Option::as_ref)
                .map_or(0, ProgramStatement::binary),
            _ => self.word_table(segment).get(word).copied().unwrap_or(0),
        }
    }

    fn read_bytes(&self, segment: Segment, address: u32, length: u32) -> Option<u64> {
        let mut value = 0u64;
        for i in 0..length {
            let (word, lane) = self.slot(segment, address.wrapping_add(i))?;
            let byte = (self.word_at(segment, word) >> (lane * 8)) & 0xFF;
            value |= u64::from(byte) << (i * 8);
        }
        Some(value)
    }

    fn write_bytes(&mut self, segment: Segment, address: u32, value: u64, length: u32) -> Option<u64> {
        let old = self.read_bytes(segment, address, length)?;
        for i in 0..length {
            let (word, lane) = self.slot(segment, address.wrapping_add(i))?;
            let byte = ((value >> (i * 8)) & 0xFF) as u32;
            let slot = self.word_table_mut(segment).get_or_allocate(word)?;
            *slot = (*slot & !(0xFF << (lane * 8))) | (byte << (lane * 8));
        }
        Some(old)
    }

    /// Merges a store into the instructions it overlaps and re-decodes them.
    fn rewrite_text(&mut self, address: u32, value: u64, length: u32) -> Result<u64, Exception> {
        let fault = Exception::address_error(
            ExceptionCause::StoreAccessFault,
            address,
            "address out of range",
        );
        let old = self
            .read_bytes(Segment::Text, address, length)
            .ok_or_else(|| fault.clone())?;

        let mut touched: Vec<(usize, u32)> = Vec::with_capacity(3);
        for i in 0..length {
            let (word, lane) = self
                .slot(Segment::Text, address.wrapping_add(i))
                .ok_or_else(|| fault.clone())?;
            let index = match touched.iter().position(|(w, _)| *w == word) {
                Some(index) => index,
                None => {
                    touched.push((word, self.word_at(Segment::Text, word)));
                    touched.len() - 1
                }
            };
            let byte = ((value >> (i * 8)) & 0xFF) as u32;
            let binary = &mut touched[index].1;
            *binary = (*binary & !(0xFF << (lane * 8))) | (byte << (lane * 8));
        }

        // Every touched word must decode before any slot changes.
        let rebuilt = touched
            .into_iter()
            .map(|(word, binary)| {
                let word_address = self.bounds.text_base + word as u32 * WORD_LENGTH_BYTES;
                self.decoder
                    .decode(binary, word_address)
                    .map(|statement| (word, statement))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (word, statement) in rebuilt {
            debug!(
                address = statement.address(),
                binary = statement.binary(),
                "self-modifying store rebuilt statement"
            );
            if let Some(slot) = self.text.get_or_allocate(word) {
                *slot = Some(statement);
            }
        }
        Ok(old)
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("bounds", &self.bounds)
            .field("allocated_blocks", &self.allocated_block_count())
            .field("heap_address", &self.heap_address)
            .field("self_modifying_code", &self.self_modifying_code)
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(AddressLayout::default())
    }
}

fn check_length(length: u32) {
    assert!(
        matches!(length, 1 | 2 | 4 | 8),
        "memory access length must be 1, 2, 4 or 8 bytes, got {length}"
    );
}

const fn truncate(value: u64, length: u32) -> u64 {
    if length >= 8 {
        value
    } else {
        value & ((1u64 << (length * 8)) - 1)
    }
}

fn check_load_aligned(address: u32, alignment: u32) -> Result<(), Exception> {
    if address % alignment == 0 {
        Ok(())
    } else {
        Err(Exception::address_error(
            ExceptionCause::LoadAddressMisaligned,
            address,
            "address for load not aligned on boundary",
        ))
    }
}

fn check_store_aligned(address: u32, alignment: u32) -> Result<(), Exception> {
    if address % alignment == 0 {
        Ok(())
    } else {
        Err(Exception::address_error(
            ExceptionCause::StoreAddressMisaligned,
            address,
            "address for store not aligned on boundary",
        ))
    }
}
