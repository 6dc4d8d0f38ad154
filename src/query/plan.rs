use crate::catalog::types::Value;
use crate::catalog::{EntityKey, EntityKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Ne,
    ];

    /// Resolves a request token (`EQ`, `GT`, `GTEQ`, `LT`, `LTEQ`, `NE`),
    /// ignoring case and surrounding whitespace.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "EQ" => Some(Operator::Eq),
            "GT" => Some(Operator::Gt),
            "GTEQ" => Some(Operator::Gte),
            "LT" => Some(Operator::Lt),
            "LTEQ" => Some(Operator::Lte),
            "NE" => Some(Operator::Ne),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Operator::Eq => "EQ",
            Operator::Gt => "GT",
            Operator::Gte => "GTEQ",
            Operator::Lt => "LT",
            Operator::Lte => "LTEQ",
            Operator::Ne => "NE",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Ne => "!=",
        }
    }

    pub fn is_inequality(self) -> bool {
        !matches!(self, Operator::Eq)
    }

    fn compare(self, lhs: &Value, rhs: &Value) -> bool {
        match self {
            Operator::Eq => lhs == rhs,
            Operator::Gt => lhs > rhs,
            Operator::Gte => lhs >= rhs,
            Operator::Lt => lhs < rhs,
            Operator::Lte => lhs <= rhs,
            Operator::Ne => lhs != rhs,
        }
    }

    /// Evaluates `property <op> operand` with store semantics: an absent
    /// property never matches, and a list property matches when any element
    /// does.
    pub fn evaluate(self, property: Option<&Value>, operand: &Value) -> bool {
        let Some(property) = property else {
            return false;
        };
        property
            .elements()
            .iter()
            .any(|element| self.compare(element, operand))
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One filter criterion exactly as a caller submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFilter {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl RawFilter {
    pub fn new(field: &str, operator: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
        }
    }
}

/// A filter node in store terms: property name, operator, typed operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub property: String,
    pub op: Operator,
    pub value: Value,
}

impl Filter {
    pub fn new(property: &str, op: Operator, value: Value) -> Self {
        Self {
            property: property.to_string(),
            op,
            value,
        }
    }
}

/// Ascending sort on one property; the store supports no other direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub property: String,
}

impl SortKey {
    pub fn asc(property: &str) -> Self {
        Self {
            property: property.to_string(),
        }
    }
}

/// Query handed to the entity store: one kind, optional ancestor scope, a
/// conjunction of filters and an ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    pub kind: EntityKind,
    pub ancestor: Option<EntityKey>,
    pub filters: Vec<Filter>,
    pub order_by: Vec<SortKey>,
}

impl StoreQuery {
    pub fn kind(kind: EntityKind) -> Self {
        Self {
            kind,
            ancestor: None,
            filters: Vec::new(),
            order_by: Vec::new(),
        }
    }

    pub fn ancestor(mut self, ancestor: EntityKey) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    pub fn filter(mut self, property: &str, op: Operator, value: Value) -> Self {
        self.filters.push(Filter::new(property, op, value));
        self
    }

    pub fn order_by(mut self, property: &str) -> Self {
        self.order_by.push(SortKey::asc(property));
        self
    }

    /// Distinct properties carrying an inequality, in first-use order.
    pub fn inequality_properties(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for filter in &self.filters {
            if filter.op.is_inequality() && !out.contains(&filter.property.as_str()) {
                out.push(&filter.property);
            }
        }
        out
    }
}
