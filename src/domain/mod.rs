// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A single feature vector with its class label
pub mod sample;

// One few-shot task instance (support + query sets)
pub mod episode;

// Core abstractions (traits) that other layers implement
pub mod traits;
