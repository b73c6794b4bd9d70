// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Orchestrates the other layers to run a complete evaluation.
//
// Rules for this layer:
//   - No tensor code here (that's Layer 5)
//   - No direct file formats here (that's Layer 4 and 6)
//   - Only workflow coordination

// The evaluation workflow
pub mod evaluate_use_case;
