// ============================================================================
// COMPONENTS - tool and color state shared by the canvas and its front ends
// ============================================================================

pub mod colors;
pub mod tools;
