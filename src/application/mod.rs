// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case wires the other layers together for one
// command. No model math and no printing happens here;
// results are returned to the CLI layer.
//
// Every use case picks its Burn backend from DeviceKind and
// then runs generic code, so the same workflow serves wgpu
// and the CPU.

/// Load data, build tokenizer, train, checkpoint
pub mod train_use_case;

/// Mean loss of a checkpoint over a dataset file
pub mod evaluate_use_case;

/// One context → one question/answer pair
pub mod generate_use_case;

/// Document → flashcard deck JSON
pub mod flashcards_use_case;
