use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Data-driven value of a layer property or filter.
///
/// Serializes into the array notation used by the style documents of the rendering engine, e.g.
/// `["coalesce", ["get", "height"], 20]`. [`Expression::evaluate`] computes the value for one
/// feature, which lets the expressions be checked without a renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant value.
    Literal(Value),
    /// Value of the feature property, or `null` if the feature does not have it.
    Get(String),
    /// Current zoom level.
    Zoom,
    /// First argument that is not `null`.
    Coalesce(Vec<Expression>),
    /// `true` if both arguments are equal.
    Equals(Box<Expression>, Box<Expression>),
    /// Output of the first case whose label equals the input, or the fallback.
    Match {
        /// Tested value.
        input: Box<Expression>,
        /// Pairs of labels and outputs.
        cases: Vec<(Value, Expression)>,
        /// Output used when no label matches.
        fallback: Box<Expression>,
    },
    /// Linear interpolation of the outputs between stops. Stops must be sorted by input.
    Interpolate {
        /// Numeric input.
        input: Box<Expression>,
        /// Pairs of input values and outputs.
        stops: Vec<(f64, Expression)>,
    },
}

impl Expression {
    /// Constant expression.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Feature property lookup.
    pub fn get(property: impl Into<String>) -> Self {
        Self::Get(property.into())
    }

    /// Property lookup with a fallback for features that don't have the property.
    pub fn get_or(property: impl Into<String>, fallback: impl Into<Value>) -> Self {
        Self::Coalesce(vec![Self::get(property), Self::literal(fallback)])
    }

    /// Equality test.
    pub fn equals(left: Expression, right: Expression) -> Self {
        Self::Equals(Box::new(left), Box::new(right))
    }

    /// Lookup table.
    pub fn match_value(
        input: Expression,
        cases: impl IntoIterator<Item = (Value, Expression)>,
        fallback: Expression,
    ) -> Self {
        Self::Match {
            input: Box::new(input),
            cases: cases.into_iter().collect(),
            fallback: Box::new(fallback),
        }
    }

    /// Linear interpolation over the zoom level.
    pub fn zoom_interpolate(stops: impl IntoIterator<Item = (f64, Expression)>) -> Self {
        Self::Interpolate {
            input: Box::new(Self::Zoom),
            stops: stops.into_iter().collect(),
        }
    }

    /// Computes the value of the expression for a feature with the given properties at the
    /// given zoom level.
    pub fn evaluate(&self, properties: &Map<String, Value>, zoom: f64) -> Value {
        match self {
            Expression::Literal(value) => value.clone(),
            Expression::Get(name) => properties.get(name).cloned().unwrap_or(Value::Null),
            Expression::Zoom => Value::from(zoom),
            Expression::Coalesce(args) => args
                .iter()
                .map(|arg| arg.evaluate(properties, zoom))
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null),
            Expression::Equals(left, right) => {
                Value::Bool(left.evaluate(properties, zoom) == right.evaluate(properties, zoom))
            }
            Expression::Match {
                input,
                cases,
                fallback,
            } => {
                let input = input.evaluate(properties, zoom);
                cases
                    .iter()
                    .find(|(label, _)| *label == input)
                    .map(|(_, output)| output.evaluate(properties, zoom))
                    .unwrap_or_else(|| fallback.evaluate(properties, zoom))
            }
            Expression::Interpolate { input, stops } => {
                let Some(x) = input.evaluate(properties, zoom).as_f64() else {
                    return Value::Null;
                };
                interpolate(x, stops, properties, zoom)
            }
        }
    }

    /// Evaluates the expression for a feature without properties.
    pub fn evaluate_at(&self, zoom: f64) -> Value {
        self.evaluate(&Map::new(), zoom)
    }

    /// Converts the expression into the array notation.
    pub fn to_json(&self) -> Value {
        match self {
            Expression::Literal(value @ (Value::Array(_) | Value::Object(_))) => {
                Value::Array(vec!["literal".into(), value.clone()])
            }
            Expression::Literal(value) => value.clone(),
            Expression::Get(name) => Value::Array(vec!["get".into(), name.as_str().into()]),
            Expression::Zoom => Value::Array(vec!["zoom".into()]),
            Expression::Coalesce(args) => {
                let mut out = vec![Value::from("coalesce")];
                out.extend(args.iter().map(Expression::to_json));
                Value::Array(out)
            }
            Expression::Equals(left, right) => {
                Value::Array(vec!["==".into(), left.to_json(), right.to_json()])
            }
            Expression::Match {
                input,
                cases,
                fallback,
            } => {
                let mut out = vec![Value::from("match"), input.to_json()];
                for (label, output) in cases {
                    out.push(label.clone());
                    out.push(output.to_json());
                }
                out.push(fallback.to_json());
                Value::Array(out)
            }
            Expression::Interpolate { input, stops } => {
                let mut out = vec![
                    Value::from("interpolate"),
                    Value::Array(vec!["linear".into()]),
                    input.to_json(),
                ];
                for (stop, output) in stops {
                    out.push(Value::from(*stop));
                    out.push(output.to_json());
                }
                Value::Array(out)
            }
        }
    }
}

fn interpolate(
    x: f64,
    stops: &[(f64, Expression)],
    properties: &Map<String, Value>,
    zoom: f64,
) -> Value {
    let Some((first, first_out)) = stops.first() else {
        return Value::Null;
    };
    if x <= *first {
        return first_out.evaluate(properties, zoom);
    }

    for pair in stops.windows(2) {
        let (x0, out0) = &pair[0];
        let (x1, out1) = &pair[1];
        if x > *x1 {
            continue;
        }

        let v0 = out0.evaluate(properties, zoom);
        let v1 = out1.evaluate(properties, zoom);
        return match (v0.as_f64(), v1.as_f64()) {
            (Some(a), Some(b)) => {
                let t = if x1 > x0 { (x - x0) / (x1 - x0) } else { 1.0 };
                Value::from(a + (b - a) * t)
            }
            _ => v0,
        };
    }

    stops
        .last()
        .map(|(_, out)| out.evaluate(properties, zoom))
        .unwrap_or(Value::Null)
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Self::literal(value)
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Self::literal(value)
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn coalesce_falls_back() {
        let expr = Expression::get_or("height", 20);
        assert_eq!(expr.evaluate(&props(json!({"height": 35})), 15.0), json!(35));
        assert_eq!(expr.evaluate(&props(json!({})), 15.0), json!(20));
        assert_eq!(expr.evaluate(&props(json!({"height": null})), 15.0), json!(20));
    }

    #[test]
    fn interpolates_between_stops() {
        let expr = Expression::zoom_interpolate([
            (5.0, 0.8.into()),
            (10.0, 2.0.into()),
            (12.0, 3.0.into()),
            (16.0, 6.0.into()),
        ]);

        assert_abs_diff_eq!(expr.evaluate_at(2.0).as_f64().unwrap_or(f64::NAN), 0.8);
        assert_abs_diff_eq!(expr.evaluate_at(11.0).as_f64().unwrap_or(f64::NAN), 2.5);
        assert_abs_diff_eq!(expr.evaluate_at(14.0).as_f64().unwrap_or(f64::NAN), 4.5);
        assert_abs_diff_eq!(expr.evaluate_at(20.0).as_f64().unwrap_or(f64::NAN), 6.0);
    }

    #[test]
    fn match_uses_fallback() {
        let expr = Expression::match_value(
            Expression::get_or("congestion", "unknown"),
            [(json!("low"), "#43a047".into()), (json!("heavy"), "#fb8c00".into())],
            "#808080".into(),
        );

        assert_eq!(expr.evaluate(&props(json!({"congestion": "heavy"})), 10.0), json!("#fb8c00"));
        assert_eq!(expr.evaluate(&props(json!({"congestion": "jammed"})), 10.0), json!("#808080"));
        assert_eq!(expr.evaluate(&props(json!({})), 10.0), json!("#808080"));
    }

    #[test]
    fn serializes_to_array_notation() {
        let expr = Expression::equals(Expression::get("extrude"), "true".into());
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!(["==", ["get", "extrude"], "true"])
        );

        let expr = Expression::zoom_interpolate([(14.0, 0.0.into()), (14.05, Expression::get_or("height", 20))]);
        assert_eq!(
            expr.to_json(),
            json!(["interpolate", ["linear"], ["zoom"], 14.0, 0.0, 14.05, ["coalesce", ["get", "height"], 20]])
        );

        assert_eq!(
            Expression::literal(json!([1, 2])).to_json(),
            json!(["literal", [1, 2]])
        );
    }
}
