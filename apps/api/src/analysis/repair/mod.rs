//! Turns raw model text into a JSON object.
//!
//! Stages run from most principled to most aggressive and stop at the first one
//! that yields an object:
//!
//! 1. strip decoration (fences, prose around the outermost object)
//! 2. direct parse
//! 3. lenient parse
//! 4. syntactic repair, then strict parse
//! 5. structural balancing, then strict and lenient parse
//!
//! Synthesizing a result when every stage fails is the analyzer's job; see
//! [`crate::analysis::fallback`].

pub mod balance;
pub mod lenient;
pub mod strip;
pub mod syntax;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use balance::balance;
use lenient::parse_lenient;
use strip::strip_decoration;
use syntax::repair_syntax;

/// The stage that produced a parseable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    DirectParse,
    LenientParse,
    SyntacticRepair,
    StructuralRepair,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    pub value: Map<String, Value>,
    pub stage: RepairStage,
    /// Every stage that ran, in order. The last one is `stage`.
    pub attempts: Vec<RepairStage>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no repair stage produced a JSON object")]
pub struct UnparseableResponse;

pub fn repair(raw: &str) -> Result<Repaired, UnparseableResponse> {
    let stripped = strip_decoration(raw);
    let mut attempts = Vec::with_capacity(4);

    attempts.push(RepairStage::DirectParse);
    if let Some(value) = as_object(serde_json::from_str(&stripped).ok()) {
        return Ok(done(value, attempts));
    }

    attempts.push(RepairStage::LenientParse);
    if let Some(value) = as_object(parse_lenient(&stripped).ok()) {
        return Ok(done(value, attempts));
    }

    attempts.push(RepairStage::SyntacticRepair);
    let rewritten = repair_syntax(&stripped);
    if let Some(value) = as_object(serde_json::from_str(&rewritten).ok()) {
        return Ok(done(value, attempts));
    }

    attempts.push(RepairStage::StructuralRepair);
    let balanced = as_object(serde_json::from_str(&balance(&rewritten)).ok())
        .or_else(|| as_object(parse_lenient(&balance(&stripped)).ok()));
    if let Some(value) = balanced {
        return Ok(done(value, attempts));
    }

    Err(UnparseableResponse)
}

fn as_object(value: Option<Value>) -> Option<Map<String, Value>> {
    match value {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn done(value: Map<String, Value>, attempts: Vec<RepairStage>) -> Repaired {
    let stage = *attempts.last().unwrap_or(&RepairStage::DirectParse);
    Repaired {
        value,
        stage,
        attempts,
    }
}
