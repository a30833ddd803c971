//! LogicKids core: everything needed to turn an exercise request into a
//! set of generated exercises, independent of any HTTP framework.
//!
//! - `catalog`: static age groups and exercise types.
//! - `request`: client requests and their validation against the catalog.
//! - `prompt`: per-type prompt rendering.
//! - `generation`: the generation client seam and its Gemini implementation.
//! - `normalizer`: best-effort salvage of JSON from model output.
//! - `exercise`: typed exercise payloads.
//! - `aggregator`: per-type orchestration and the response envelope.

pub mod aggregator;
pub mod catalog;
pub mod exercise;
pub mod generation;
pub mod normalizer;
pub mod prompt;
pub mod request;
