//! Pipeline stages for image-to-letter generation.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and the two external collaborators (model, compiler) can be swapped for
//! test doubles through their traits.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ extract ──▶ template ──▶ compile
//! (path)    (base64)   (VLM+JSON)  (.tex)       (pdflatex ×2)
//! ```
//!
//! 1. [`input`]    — validate paths and decode the posting image
//! 2. [`encode`]   — downscale, PNG-encode and base64-wrap for the request body
//! 3. [`extract`]  — [`extract::VisionModel`] seam plus the [`extract::Extractor`];
//!    [`gemini`] is the default backend
//! 4. [`template`] — literal placeholder substitution, output naming
//! 5. [`compile`]  — [`compile::DocumentCompiler`] seam and the `pdflatex` runner

pub mod compile;
pub mod encode;
pub mod extract;
pub mod gemini;
pub mod input;
pub mod template;
