//! Mock backstep recorder.

use mockall::mock;
use riscv_state::sim::undo::{RegisterFileKind, StoreWidth, UndoRecorder};

mock! {
    pub Undo {}
    impl UndoRecorder for Undo {
        fn memory_written(&self, address: u32, width: StoreWidth, old: u64);
        fn register_written(&self, file: RegisterFileKind, number: i32, old: u64);
        fn program_counter_written(&self, old: u32);
    }
}
