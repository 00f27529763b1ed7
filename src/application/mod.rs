// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (training, generating, or visualizing).
//
// Rules for this layer:
//   - No ML math or tensor code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// The generation workflow
pub mod generate_use_case;

// The piano-roll dump workflow
pub mod visualize_use_case;
