//! # Filtering Primitives
//!
//! The building blocks used to select documents inside a collection:
//!
//! -   _Value_: the unit of data.
//!     A wrapper ([`Value`]) that allows heterogeneous types (Integers, Floats, Strings, Booleans)
//!     to be treated uniformly. Integers and floats compare with each other numerically.
//!
//! -   _Operation_ ([`Op`]): the predicate.
//!     It represents conditions like equality (`Eq`), ranges (`Between`, `Geq`, `Leq`, ...),
//!     set membership (`In`), or existence (`Ex`).
//!
//! -   _Expression_ ([`Expr`]): a field name bound to an [`Op`] (e.g. *"height >= 180"*).
//!
//! -   _Filter_: the conjunction of expressions a document must satisfy to match.
//!

use serde_json::Map;
use std::cmp::Ordering;

use super::{Error, validate_field};

/// Floating point value type alias
pub type Float = f64;
/// Integer value type alias
pub type Integer = i64;
/// Literal type alias
pub type Text = String;

#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// Occurs when an operation is applied on a value type that does not support it
    /// (e.g. ordering on text).
    #[error("unsupported operation")]
    UnsupportedOperation,

    /// Occurs when constructing a [`Range`] where `min > max`.
    #[error("empty range")]
    EmptyRange,

    /// Occurs when an `In` operation has no candidates.
    #[error("empty value set")]
    EmptySet,
}

/// A wrapper enum to allow heterogeneous values (Numbers and Strings)
/// to coexist in the same expression list.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(Integer),
    Float(Float),
    Text(Text),
    Boolean(bool),
}

impl Value {
    /// Converts a json value into a [`Value`], returns [`None`] for `null`, arrays and objects.
    pub fn from_json(v: &serde_json::Value) -> Option<Self> {
        match v {
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            _ => None,
        }
    }

    /// Converts the value back into json, returns [`None`] for non finite floats.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Integer(n) => Some((*n).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number),
            Self::Text(s) => Some(s.clone().into()),
            Self::Boolean(b) => Some((*b).into()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => cmp_integer_float(*a, *b),
            (Self::Float(a), Self::Integer(b)) => cmp_integer_float(*b, *a).map(Ordering::reverse),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            (Self::Boolean(a), Self::Boolean(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Exact comparison between an integer and a float, without rounding the integer
/// to the nearest representable float.
fn cmp_integer_float(a: Integer, b: Float) -> Option<Ordering> {
    // 2^63, the first float above i64::MAX
    const LIMIT: Float = 9_223_372_036_854_775_808.0;

    if b.is_nan() {
        return None;
    }
    if b >= LIMIT {
        return Some(Ordering::Less);
    }
    if b < -LIMIT {
        return Some(Ordering::Greater);
    }

    let whole = b.trunc();
    match a.cmp(&(whole as Integer)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(b - whole)),
        ord => Some(ord),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<crate::types::Filetime> for Value {
    fn from(t: crate::types::Filetime) -> Self {
        Value::Integer(t.into())
    }
}

/// A trait that indicates which operations are supported by an implementing type.
///
/// By default, all operations are unsupported (`false`).
/// These checks are performed at **runtime**.
pub trait IsSupportedOp {
    fn support_eq(&self) -> bool {
        false
    }
    fn support_ordering(&self) -> bool {
        false
    }
}

impl IsSupportedOp for Value {
    fn support_eq(&self) -> bool {
        !matches!(self, Self::Float(f) if !f.is_finite())
    }

    fn support_ordering(&self) -> bool {
        self.is_numeric() && self.support_eq()
    }
}

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T> Range<T>
where
    T: PartialOrd,
{
    pub fn try_new(min: T, max: T) -> Result<Self, OpError> {
        if min > max {
            return Err(OpError::EmptyRange);
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, v: &T) -> bool {
        *v >= self.min && *v <= self.max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op<V = Value> {
    /// Equal
    Eq(V),
    /// Not equal, only matches documents holding the field
    Neq(V),
    /// Less than
    Lt(V),
    /// Less than or equal
    Leq(V),
    /// Greater than
    Gt(V),
    /// Greater than or equal
    Geq(V),
    /// Inclusive range
    Between(Range<V>),
    /// Value is one of the items
    In(Vec<V>),
    /// Field exists (and is not null)
    Ex,
    /// Field does not exist (or is null)
    Nex,
}

impl<V> Op<V>
where
    V: IsSupportedOp,
{
    pub fn check_supported(&self) -> Result<(), OpError> {
        let supported = match self {
            Op::Eq(v) | Op::Neq(v) => v.support_eq(),
            Op::Lt(v) | Op::Leq(v) | Op::Gt(v) | Op::Geq(v) => v.support_ordering(),
            Op::Between(range) => range.min.support_ordering() && range.max.support_ordering(),
            Op::In(items) => {
                if items.is_empty() {
                    return Err(OpError::EmptySet);
                }
                items.iter().all(|v| v.support_eq())
            }
            Op::Ex | Op::Nex => true,
        };

        if !supported {
            return Err(OpError::UnsupportedOperation);
        }
        Ok(())
    }
}

impl Op<Value> {
    /// Evaluates the operation against a document field, `field` is [`None`] when the
    /// field is missing or holds a non scalar value.
    pub fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            Op::Ex => field.is_some(),
            Op::Nex => field.is_none(),
            Op::Eq(x) => field.is_some_and(|v| v == x),
            Op::Neq(x) => field.is_some_and(|v| v.partial_cmp(x) != Some(Ordering::Equal)),
            Op::Lt(x) => field.is_some_and(|v| v < x),
            Op::Leq(x) => field.is_some_and(|v| v <= x),
            Op::Gt(x) => field.is_some_and(|v| v > x),
            Op::Geq(x) => field.is_some_and(|v| v >= x),
            Op::Between(range) => field.is_some_and(|v| range.contains(v)),
            Op::In(items) => field.is_some_and(|v| items.iter().any(|i| i == v)),
        }
    }
}

/// A single constraint over a document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    field: String,
    op: Op,
}

impl Expr {
    pub fn try_new(field: &str, op: Op) -> Result<Self, Error> {
        validate_field(field)?;
        op.check_supported().map_err(|err| Error::OpError {
            field: field.to_owned(),
            err,
        })?;

        Ok(Self {
            field: field.to_owned(),
            op,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn into_parts(self) -> (String, Op) {
        (self.field, self.op)
    }

    pub fn matches(&self, doc: &Map<String, serde_json::Value>) -> bool {
        let value = doc.get(&self.field).and_then(Value::from_json);
        self.op.matches(value.as_ref())
    }
}

/// Conjunction of expressions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    exprs: Vec<Expr>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint to the filter.
    pub fn and(mut self, field: &str, op: Op) -> Result<Self, Error> {
        self.exprs.push(Expr::try_new(field, op)?);
        Ok(self)
    }

    /// Adds an equality constraint.
    pub fn eq(self, field: &str, value: impl Into<Value>) -> Result<Self, Error> {
        self.and(field, Op::Eq(value.into()))
    }

    /// Adds an inclusive range constraint, `min <= field <= max`.
    pub fn between(
        self,
        field: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Result<Self, Error> {
        let range = Range::try_new(min.into(), max.into()).map_err(|err| Error::OpError {
            field: field.to_owned(),
            err,
        })?;
        self.and(field, Op::Between(range))
    }

    /// Returns true if there are no constraints
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    pub fn matches(&self, doc: &Map<String, serde_json::Value>) -> bool {
        self.exprs.iter().all(|e| e.matches(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Map<String, serde_json::Value> {
        match v {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn numeric_comparison_across_types() {
        assert_eq!(Value::Integer(3), Value::Float(3.0));
        assert!(Value::Integer(3) < Value::Float(3.5));
        assert_ne!(Value::Integer(3), Value::Text("3".into()));
        assert_eq!(Value::Integer(3).partial_cmp(&Value::Text("3".into())), None);
        assert!(Value::Float(-2.5) < Value::Integer(-2));
        assert!(Value::Integer(-3) < Value::Float(-2.5));
    }

    #[test]
    fn large_integers_keep_precision() {
        // 2^53 + 1 has no exact float representation
        let big = Value::Integer(9_007_199_254_740_993);
        let bound = Value::Float(9_007_199_254_740_992.0);

        assert_ne!(big, bound);
        assert!(big > bound);
        assert!(bound < big);
        assert_eq!(Value::Integer(9_007_199_254_740_992), bound);

        assert!(Value::Integer(i64::MAX) < Value::Float(9.3e18));
        assert!(Value::Integer(i64::MIN) > Value::Float(-9.3e18));
        assert_eq!(Value::Integer(i64::MIN), Value::Float(i64::MIN as f64));
        assert_eq!(Value::Integer(1).partial_cmp(&Value::Float(f64::NAN)), None);
    }

    #[test]
    fn between_is_inclusive() {
        let filter = Filter::new().between("height", 180, 200).unwrap();

        assert!(filter.matches(&doc(json!({"height": 180}))));
        assert!(filter.matches(&doc(json!({"height": 200}))));
        assert!(filter.matches(&doc(json!({"height": 190.5}))));
        assert!(!filter.matches(&doc(json!({"height": 179}))));
        assert!(!filter.matches(&doc(json!({"height": 201}))));
        assert!(!filter.matches(&doc(json!({"name": "a"}))));
    }

    #[test]
    fn conjunction() {
        let filter = Filter::new()
            .between("height", 180, 200)
            .unwrap()
            .between("birth", 100, 200)
            .unwrap();

        assert!(filter.matches(&doc(json!({"height": 190, "birth": 150}))));
        assert!(!filter.matches(&doc(json!({"height": 195, "birth": 5000}))));
        assert!(!filter.matches(&doc(json!({"height": 150, "birth": 100}))));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&doc(json!({}))));
    }

    #[test]
    fn existence_and_membership() {
        let d = doc(json!({"name": "mk3", "age": null}));

        assert!(Op::Ex.matches(Value::from_json(&d["name"]).as_ref()));
        assert!(Expr::try_new("age", Op::Nex).unwrap().matches(&d));
        assert!(Expr::try_new("missing", Op::Nex).unwrap().matches(&d));
        assert!(
            Expr::try_new("name", Op::In(vec!["a".into(), "mk3".into()]))
                .unwrap()
                .matches(&d)
        );
    }

    #[test]
    fn neq_requires_the_field() {
        let expr = Expr::try_new("name", Op::Neq("a".into())).unwrap();

        assert!(expr.matches(&doc(json!({"name": "b"}))));
        assert!(!expr.matches(&doc(json!({"name": "a"}))));
        assert!(!expr.matches(&doc(json!({}))));
    }

    #[test]
    fn rejected_filters() {
        assert!(matches!(
            Filter::new().between("height", 200, 180),
            Err(Error::OpError {
                err: OpError::EmptyRange,
                ..
            })
        ));
        assert!(matches!(
            Filter::new().and("name", Op::Geq("a".into())),
            Err(Error::OpError {
                err: OpError::UnsupportedOperation,
                ..
            })
        ));
        assert!(matches!(
            Filter::new().and("name", Op::In(Vec::new())),
            Err(Error::OpError {
                err: OpError::EmptySet,
                ..
            })
        ));
        assert!(matches!(
            Filter::new().eq("na me", "a"),
            Err(Error::BadField { .. })
        ));
        assert!(matches!(
            Filter::new().eq("height", f64::NAN),
            Err(Error::OpError {
                err: OpError::UnsupportedOperation,
                ..
            })
        ));
    }
}
