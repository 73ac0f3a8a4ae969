//! Per-type sample strategies
//!
//! A parameter type is synthesizable when it has a starting value, a way
//! to draw random values and a neighbourhood the local search can walk.

use rand::Rng;
use utgen_core::{Type, Value};

/// Range random restarts draw numbers from
const RANDOM_MAGNITUDE: i64 = 1_000;
/// Longest random string
const RANDOM_STRING_LEN: usize = 8;

/// Whether the search can produce values of `ty`
pub fn supports(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Int | Type::Long | Type::Double | Type::Boolean | Type::String
    )
}

/// Starting value of a fresh search: the type's zero
pub fn initial(ty: &Type) -> Option<Value> {
    supports(ty).then(|| Value::default_for(ty)).flatten()
}

/// Random value of `ty`, biased to small magnitudes
pub fn random<R: Rng + ?Sized>(ty: &Type, rng: &mut R) -> Option<Value> {
    Some(match ty {
        Type::Int => Value::Int(rng.gen_range(-RANDOM_MAGNITUDE..=RANDOM_MAGNITUDE) as i32),
        Type::Long => Value::Long(rng.gen_range(-RANDOM_MAGNITUDE..=RANDOM_MAGNITUDE)),
        Type::Double => {
            let magnitude = RANDOM_MAGNITUDE as f64;
            Value::Double(rng.gen_range(-magnitude..=magnitude))
        }
        Type::Boolean => Value::Bool(rng.gen()),
        Type::String => {
            let len = rng.gen_range(0..=RANDOM_STRING_LEN);
            Value::Str((0..len).map(|_| rng.gen_range('a'..='z')).collect())
        }
        _ => return None,
    })
}

/// Candidates derived from a constant seen in a constraint: `c - 1`, `c`, `c + 1`
/// converted to `ty`, or the constant itself for strings
pub fn around_constant(ty: &Type, constant: &Value) -> Vec<Value> {
    match (ty, constant) {
        (Type::String, Value::Str(s)) => vec![Value::Str(s.clone())],
        (Type::Boolean, Value::Bool(b)) => vec![Value::Bool(*b)],
        (Type::Int | Type::Long, _) => match constant.as_i64() {
            Some(c) => [c.wrapping_sub(1), c, c.wrapping_add(1)]
                .into_iter()
                .filter_map(|v| integral(ty, v))
                .collect(),
            None => match constant.as_f64() {
                Some(c) if c.is_finite() => [c.floor(), c.ceil()]
                    .into_iter()
                    .filter_map(|v| integral(ty, v as i64))
                    .collect(),
                _ => Vec::new(),
            },
        },
        (Type::Double, _) => match constant.as_f64() {
            Some(c) => vec![Value::Double(c - 1.0), Value::Double(c), Value::Double(c + 1.0)],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Integral value of `ty`; `None` when it does not fit an `int`
fn integral(ty: &Type, v: i64) -> Option<Value> {
    match ty {
        Type::Int => i32::try_from(v).ok().map(Value::Int),
        Type::Long => Some(Value::Long(v)),
        _ => None,
    }
}

/// `value` moved by `delta` steps, saturating at the type's bounds;
/// `None` when the type has no numeric neighbourhood
pub fn shift(value: &Value, delta: f64) -> Option<Value> {
    match value {
        Value::Int(v) => {
            let moved = (*v as f64 + delta.trunc()).clamp(i32::MIN as f64, i32::MAX as f64);
            Some(Value::Int(moved as i32))
        }
        Value::Long(v) => {
            let step = delta.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64;
            Some(Value::Long(v.saturating_add(step)))
        }
        Value::Double(v) => Some(Value::Double(v + delta)),
        _ => None,
    }
}

/// Single-edit neighbours of a string: append, drop the last char, bump each char
pub fn string_neighbours(s: &str) -> Vec<Value> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::with_capacity(chars.len() * 2 + 2);
    out.push(Value::Str(format!("{}a", s)));
    if !chars.is_empty() {
        out.push(Value::Str(chars[..chars.len() - 1].iter().collect()));
    }
    for (i, c) in chars.iter().enumerate() {
        for delta in [-1i32, 1] {
            let Some(bumped) = char::from_u32((*c as u32).wrapping_add_signed(delta)) else {
                continue;
            };
            if !(' '..='~').contains(&bumped) {
                continue;
            }
            let mut edited = chars.clone();
            edited[i] = bumped;
            out.push(Value::Str(edited.into_iter().collect()));
        }
    }
    out
}
