//! Typed function library.
//!
//! `AiFunction` is a small expression tree resolved against a frame, an entity and its
//! blackboard. Evaluation only sees shared references, so it cannot mutate anything, and it
//! never reads wall-clock time or iterates unordered containers.

use serde::{Deserialize, Serialize};

use crate::blackboard::BlackboardValue;
use crate::{Blackboard, EntityRef, FPVector2, FPVector3, Frame, FP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn apply<T: PartialOrd>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiFunction {
    Const(BlackboardValue),
    Read(u64),
    Stat(StatId),
    Sum(Vec<AiFunction>),
    Subtract(Box<AiFunction>, Box<AiFunction>),
    Multiply(Vec<AiFunction>),
    Magnitude(Box<AiFunction>),
    Negate(Box<AiFunction>),
    Min(Box<AiFunction>, Box<AiFunction>),
    Max(Box<AiFunction>, Box<AiFunction>),
    Compare {
        op: CompareOp,
        lhs: Box<AiFunction>,
        rhs: Box<AiFunction>,
    },
    Not(Box<AiFunction>),
    And(Vec<AiFunction>),
    Or(Vec<AiFunction>),
    Select {
        condition: Box<AiFunction>,
        then: Box<AiFunction>,
        otherwise: Box<AiFunction>,
    },
}

pub struct FunctionContext<'a, F: Frame> {
    pub frame: &'a F,
    pub entity: F::Entity,
    pub blackboard: &'a Blackboard,
}

impl<'a, F: Frame> FunctionContext<'a, F> {
    pub fn new(frame: &'a F, entity: F::Entity, blackboard: &'a Blackboard) -> Self {
        Self {
            frame,
            entity,
            blackboard,
        }
    }
}

impl AiFunction {
    pub fn fp(value: FP) -> Self {
        AiFunction::Const(BlackboardValue::Fp(value))
    }

    pub fn int(value: i32) -> Self {
        AiFunction::Const(BlackboardValue::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        AiFunction::Const(BlackboardValue::Bool(value))
    }

    pub fn read(key: u64) -> Self {
        AiFunction::Read(key)
    }

    pub fn compare(op: CompareOp, lhs: AiFunction, rhs: AiFunction) -> Self {
        AiFunction::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluates the expression. `None` means an operand was missing or of the wrong kind.
    pub fn resolve<F: Frame>(&self, cx: &FunctionContext<'_, F>) -> Option<BlackboardValue> {
        match self {
            AiFunction::Const(value) => Some(*value),
            AiFunction::Read(key) => cx.blackboard.value(*key),
            AiFunction::Stat(stat) => cx.frame.stat(cx.entity, *stat).map(BlackboardValue::Fp),
            AiFunction::Sum(items) => {
                let mut acc = None;
                for item in items {
                    let value = item.resolve(cx)?;
                    acc = Some(match acc {
                        None => value,
                        Some(prev) => add(prev, value)?,
                    });
                }
                Some(acc.unwrap_or(BlackboardValue::Int(0)))
            }
            AiFunction::Subtract(a, b) => add(a.resolve(cx)?, negate(b.resolve(cx)?)?),
            AiFunction::Multiply(items) => {
                let mut acc = None;
                for item in items {
                    let value = item.resolve(cx)?;
                    acc = Some(match acc {
                        None => value,
                        Some(prev) => multiply(prev, value)?,
                    });
                }
                Some(acc.unwrap_or(BlackboardValue::Int(1)))
            }
            AiFunction::Magnitude(x) => match x.resolve(cx)? {
                BlackboardValue::Vector2(v) => Some(BlackboardValue::Fp(v.magnitude())),
                BlackboardValue::Vector3(v) => Some(BlackboardValue::Fp(v.magnitude())),
                BlackboardValue::Fp(v) => Some(BlackboardValue::Fp(v.abs())),
                BlackboardValue::Int(v) => Some(BlackboardValue::Int(v.saturating_abs())),
                _ => None,
            },
            AiFunction::Negate(x) => negate(x.resolve(cx)?),
            AiFunction::Min(a, b) => min_max(a.resolve(cx)?, b.resolve(cx)?, false),
            AiFunction::Max(a, b) => min_max(a.resolve(cx)?, b.resolve(cx)?, true),
            AiFunction::Compare { op, lhs, rhs } => {
                compare(*op, lhs.resolve(cx)?, rhs.resolve(cx)?).map(BlackboardValue::Bool)
            }
            AiFunction::Not(x) => x.resolve(cx)?.as_bool().map(|b| BlackboardValue::Bool(!b)),
            AiFunction::And(items) => {
                for item in items {
                    if !item.resolve(cx)?.as_bool()? {
                        return Some(BlackboardValue::Bool(false));
                    }
                }
                Some(BlackboardValue::Bool(true))
            }
            AiFunction::Or(items) => {
                for item in items {
                    if item.resolve(cx)?.as_bool()? {
                        return Some(BlackboardValue::Bool(true));
                    }
                }
                Some(BlackboardValue::Bool(false))
            }
            AiFunction::Select {
                condition,
                then,
                otherwise,
            } => {
                if condition.resolve(cx)?.as_bool()? {
                    then.resolve(cx)
                } else {
                    otherwise.resolve(cx)
                }
            }
        }
    }

    pub fn resolve_fp<F: Frame>(&self, cx: &FunctionContext<'_, F>) -> FP {
        self.resolve(cx)
            .and_then(|v| v.as_fp())
            .unwrap_or_default()
    }

    pub fn resolve_bool<F: Frame>(&self, cx: &FunctionContext<'_, F>) -> bool {
        self.resolve(cx)
            .and_then(|v| v.as_bool())
            .unwrap_or_default()
    }

    /// Integer view; fixed-point results are floored.
    pub fn resolve_int<F: Frame>(&self, cx: &FunctionContext<'_, F>) -> i32 {
        match self.resolve(cx) {
            Some(BlackboardValue::Int(v)) => v,
            Some(BlackboardValue::Fp(v)) => v.to_int(),
            _ => 0,
        }
    }

    pub fn resolve_vector2<F: Frame>(&self, cx: &FunctionContext<'_, F>) -> FPVector2 {
        match self.resolve(cx) {
            Some(BlackboardValue::Vector2(v)) => v,
            _ => FPVector2::ZERO,
        }
    }

    pub fn resolve_vector3<F: Frame>(&self, cx: &FunctionContext<'_, F>) -> FPVector3 {
        match self.resolve(cx) {
            Some(BlackboardValue::Vector3(v)) => v,
            _ => FPVector3::ZERO,
        }
    }

    pub fn resolve_entity<F: Frame>(&self, cx: &FunctionContext<'_, F>) -> EntityRef {
        match self.resolve(cx) {
            Some(BlackboardValue::Entity(v)) => v,
            _ => EntityRef::NONE,
        }
    }

    /// Blackboard keys this expression reads, in ascending order.
    pub fn read_keys(&self) -> Vec<u64> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    fn collect_keys(&self, out: &mut Vec<u64>) {
        match self {
            AiFunction::Const(_) | AiFunction::Stat(_) => {}
            AiFunction::Read(key) => out.push(*key),
            AiFunction::Sum(items)
            | AiFunction::Multiply(items)
            | AiFunction::And(items)
            | AiFunction::Or(items) => items.iter().for_each(|i| i.collect_keys(out)),
            AiFunction::Subtract(a, b) | AiFunction::Min(a, b) | AiFunction::Max(a, b) => {
                a.collect_keys(out);
                b.collect_keys(out);
            }
            AiFunction::Compare { lhs, rhs, .. } => {
                lhs.collect_keys(out);
                rhs.collect_keys(out);
            }
            AiFunction::Magnitude(x) | AiFunction::Negate(x) | AiFunction::Not(x) => {
                x.collect_keys(out)
            }
            AiFunction::Select {
                condition,
                then,
                otherwise,
            } => {
                condition.collect_keys(out);
                then.collect_keys(out);
                otherwise.collect_keys(out);
            }
        }
    }
}

fn add(a: BlackboardValue, b: BlackboardValue) -> Option<BlackboardValue> {
    use BlackboardValue::*;
    match (a, b) {
        (Int(x), Int(y)) => Some(Int(x.saturating_add(y))),
        (Vector2(x), Vector2(y)) => Some(Vector2(x + y)),
        (Vector3(x), Vector3(y)) => Some(Vector3(x + y)),
        (x, y) => Some(Fp(x.as_fp()? + y.as_fp()?)),
    }
}

fn multiply(a: BlackboardValue, b: BlackboardValue) -> Option<BlackboardValue> {
    use BlackboardValue::*;
    match (a, b) {
        (Int(x), Int(y)) => Some(Int(x.saturating_mul(y))),
        (Vector2(v), s) | (s, Vector2(v)) => Some(Vector2(v.scale(s.as_fp()?))),
        (Vector3(v), s) | (s, Vector3(v)) => Some(Vector3(v.scale(s.as_fp()?))),
        (x, y) => Some(Fp(x.as_fp()? * y.as_fp()?)),
    }
}

fn negate(a: BlackboardValue) -> Option<BlackboardValue> {
    use BlackboardValue::*;
    match a {
        Int(x) => Some(Int(x.saturating_neg())),
        Fp(x) => Some(Fp(-x)),
        Vector2(v) => Some(Vector2(-v)),
        Vector3(v) => Some(Vector3(-v)),
        _ => None,
    }
}

fn min_max(a: BlackboardValue, b: BlackboardValue, max: bool) -> Option<BlackboardValue> {
    use BlackboardValue::*;
    match (a, b) {
        (Int(x), Int(y)) => Some(Int(if max { x.max(y) } else { x.min(y) })),
        (x, y) => {
            let (x, y) = (x.as_fp()?, y.as_fp()?);
            Some(Fp(if max { x.max(y) } else { x.min(y) }))
        }
    }
}

fn compare(op: CompareOp, a: BlackboardValue, b: BlackboardValue) -> Option<bool> {
    use BlackboardValue::*;
    match (a, b) {
        (Int(x), Int(y)) => Some(op.apply(&x, &y)),
        (Bool(x), Bool(y)) => Some(op.apply(&x, &y)),
        (Entity(x), Entity(y)) => Some(op.apply(&x, &y)),
        (Vector2(x), Vector2(y)) => equality(op, x == y),
        (Vector3(x), Vector3(y)) => equality(op, x == y),
        (x, y) => Some(op.apply(&x.as_fp()?, &y.as_fp()?)),
    }
}

fn equality(op: CompareOp, equal: bool) -> Option<bool> {
    match op {
        CompareOp::Eq => Some(equal),
        CompareOp::Ne => Some(!equal),
        _ => None,
    }
}
